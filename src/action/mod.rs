// src/action/mod.rs

//! Install action capability
//!
//! The actual install mechanics (downloads, silent-install invocations,
//! registry edits) live entirely behind the `InstallAction` trait. The
//! orchestrator only sees an `InstallOutcome` carrying a closed error-kind
//! tag set, which is what makes the retry policy deterministic.
//!
//! Shipped strategies:
//! - `CommandAction`: run a subprocess, map exit codes to error kinds
//! - `NoopAction`: succeed without side effects (dry runs, satisfied stubs)

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use strum_macros::{Display, EnumString};
use tracing::debug;

/// Classified failure cause, produced by install actions
///
/// This is a closed set: the recovery controller's retry policy is keyed
/// entirely off these tags, never off message text.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InstallErrorKind {
    NetworkTransient,
    Timeout,
    TemporaryResourceBusy,
    InsufficientPrivileges,
    InsufficientDiskSpace,
    ConfigurationError,
    CycleViolation,
}

impl InstallErrorKind {
    /// Whether a failure of this kind is eligible for automatic retry
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            InstallErrorKind::NetworkTransient
                | InstallErrorKind::Timeout
                | InstallErrorKind::TemporaryResourceBusy
        )
    }
}

/// Context handed to an install action for one attempt
#[derive(Debug, Clone)]
pub struct InstallContext {
    pub component_id: String,
    pub install_path: Option<PathBuf>,
    /// 1-based attempt number (retries increment this)
    pub attempt: u32,
}

/// Result of one install attempt
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub success: bool,
    pub error_kind: Option<InstallErrorKind>,
    pub message: String,
}

impl InstallOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            error_kind: None,
            message: message.into(),
        }
    }

    pub fn fail(kind: InstallErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_kind: Some(kind),
            message: message.into(),
        }
    }
}

/// Capability interface for performing one component's installation
///
/// Implementations own safe-state on failure; the orchestrator never rolls
/// back an action's partial side effects.
#[async_trait]
pub trait InstallAction: Send + Sync {
    /// Perform one installation attempt
    async fn install(&self, ctx: &InstallContext) -> InstallOutcome;

    /// Human-readable strategy name (for logging)
    fn name(&self) -> &str;
}

/// Install strategy that succeeds without side effects
#[derive(Debug, Default)]
pub struct NoopAction;

#[async_trait]
impl InstallAction for NoopAction {
    async fn install(&self, ctx: &InstallContext) -> InstallOutcome {
        debug!("noop install for {}", ctx.component_id);
        InstallOutcome::ok("no action configured")
    }

    fn name(&self) -> &str {
        "noop"
    }
}

/// Install strategy that invokes a subprocess
///
/// Exit codes follow the sysexits convention where the installer supports
/// it; unrecognized non-zero codes are configuration errors (not retried).
pub struct CommandAction {
    argv: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandAction {
    pub fn new(argv: Vec<String>) -> Self {
        Self {
            argv,
            timeout: None,
        }
    }

    /// Bound the subprocess runtime; expiry maps to `Timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn classify_exit_code(code: i32) -> InstallErrorKind {
        match code {
            69 => InstallErrorKind::NetworkTransient, // EX_UNAVAILABLE
            73 => InstallErrorKind::InsufficientDiskSpace, // EX_CANTCREAT
            75 => InstallErrorKind::TemporaryResourceBusy, // EX_TEMPFAIL
            77 => InstallErrorKind::InsufficientPrivileges, // EX_NOPERM
            _ => InstallErrorKind::ConfigurationError,
        }
    }
}

#[async_trait]
impl InstallAction for CommandAction {
    async fn install(&self, ctx: &InstallContext) -> InstallOutcome {
        let Some((program, args)) = self.argv.split_first() else {
            return InstallOutcome::fail(
                InstallErrorKind::ConfigurationError,
                format!("empty command for component {}", ctx.component_id),
            );
        };

        debug!(
            "running installer for {} (attempt {}): {}",
            ctx.component_id,
            ctx.attempt,
            self.argv.join(" ")
        );

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .env("LOADOUT_COMPONENT", &ctx.component_id);
        if let Some(path) = &ctx.install_path {
            cmd.env("LOADOUT_INSTALL_PATH", path);
        }

        let fut = cmd.status();
        let status = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(status) => status,
                Err(_) => {
                    return InstallOutcome::fail(
                        InstallErrorKind::Timeout,
                        format!("installer exceeded {:?}", limit),
                    );
                }
            },
            None => fut.await,
        };

        match status {
            Ok(status) if status.success() => {
                InstallOutcome::ok(format!("{} exited successfully", program))
            }
            Ok(status) => {
                let code = status.code().unwrap_or(-1);
                InstallOutcome::fail(
                    Self::classify_exit_code(code),
                    format!("{} exited with code {}", program, code),
                )
            }
            Err(e) => InstallOutcome::fail(
                InstallErrorKind::ConfigurationError,
                format!("failed to spawn {}: {}", program, e),
            ),
        }
    }

    fn name(&self) -> &str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(id: &str) -> InstallContext {
        InstallContext {
            component_id: id.to_string(),
            install_path: None,
            attempt: 1,
        }
    }

    #[test]
    fn test_error_kind_retryability() {
        assert!(InstallErrorKind::NetworkTransient.is_retryable());
        assert!(InstallErrorKind::Timeout.is_retryable());
        assert!(InstallErrorKind::TemporaryResourceBusy.is_retryable());
        assert!(!InstallErrorKind::InsufficientPrivileges.is_retryable());
        assert!(!InstallErrorKind::InsufficientDiskSpace.is_retryable());
        assert!(!InstallErrorKind::ConfigurationError.is_retryable());
        assert!(!InstallErrorKind::CycleViolation.is_retryable());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(
            InstallErrorKind::NetworkTransient.to_string(),
            "network-transient"
        );
        assert_eq!(
            "insufficient-privileges"
                .parse::<InstallErrorKind>()
                .unwrap(),
            InstallErrorKind::InsufficientPrivileges
        );
    }

    #[test]
    fn test_exit_code_classification() {
        assert_eq!(
            CommandAction::classify_exit_code(75),
            InstallErrorKind::TemporaryResourceBusy
        );
        assert_eq!(
            CommandAction::classify_exit_code(77),
            InstallErrorKind::InsufficientPrivileges
        );
        assert_eq!(
            CommandAction::classify_exit_code(1),
            InstallErrorKind::ConfigurationError
        );
    }

    #[tokio::test]
    async fn test_noop_action_succeeds() {
        let outcome = NoopAction.install(&ctx("a")).await;
        assert!(outcome.success);
        assert!(outcome.error_kind.is_none());
    }

    #[tokio::test]
    async fn test_command_action_success() {
        let action = CommandAction::new(vec!["true".to_string()]);
        let outcome = action.install(&ctx("a")).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn test_command_action_failure_is_configuration_error() {
        let action = CommandAction::new(vec!["false".to_string()]);
        let outcome = action.install(&ctx("a")).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_kind,
            Some(InstallErrorKind::ConfigurationError)
        );
    }

    #[tokio::test]
    async fn test_command_action_missing_binary() {
        let action = CommandAction::new(vec!["/nonexistent/installer".to_string()]);
        let outcome = action.install(&ctx("a")).await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error_kind,
            Some(InstallErrorKind::ConfigurationError)
        );
    }

    #[tokio::test]
    async fn test_empty_command_rejected() {
        let action = CommandAction::new(vec![]);
        let outcome = action.install(&ctx("a")).await;
        assert!(!outcome.success);
    }
}
