// src/commands.rs

//! CLI command implementations
//!
//! Thin rendering layer over the orchestrator: argument handling, output
//! formatting, and the Ctrl-C wiring. No planning or execution logic
//! lives here.

use anyhow::{bail, Context, Result};
use loadout::{
    BatchResult, CliProgress, ComponentCatalog, ExecuteRequest, FilesystemDetector, Orchestrator,
    PlanRequest, PlanResult, Severity, SilentProgress, ProgressTracker,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

fn open_orchestrator(catalog_path: &str) -> Result<Orchestrator> {
    let catalog = ComponentCatalog::load(catalog_path)
        .with_context(|| format!("failed to load catalog '{}'", catalog_path))?;
    let detector = FilesystemDetector::with_default_roots();
    Ok(Orchestrator::new(catalog, Box::new(detector)))
}

/// Machine-readable projection of one planned component
#[derive(Serialize)]
struct NodeOutput {
    id: String,
    level: usize,
    satisfied: bool,
}

#[derive(Serialize)]
struct PlanOutput<'a> {
    groups: Vec<Vec<NodeOutput>>,
    conflicts: &'a [loadout::ConflictRecord],
}

fn plan_output(result: &PlanResult) -> PlanOutput<'_> {
    PlanOutput {
        groups: result
            .plan
            .ordered_groups
            .iter()
            .map(|group| {
                group
                    .iter()
                    .map(|node| NodeOutput {
                        id: node.id().to_string(),
                        level: node.level,
                        satisfied: node.skip_install,
                    })
                    .collect()
            })
            .collect(),
        conflicts: result.conflicts(),
    }
}

fn print_plan_text(result: &PlanResult) {
    for (level, group) in result.plan.ordered_groups.iter().enumerate() {
        println!("level {}:", level);
        for node in group {
            let marker = if node.skip_install {
                " (already satisfied)"
            } else {
                ""
            };
            println!("  {}{}", node.id(), marker);
        }
    }
    for conflict in result.conflicts() {
        println!("{}", conflict);
    }
}

pub fn plan(catalog_path: &str, components: Vec<String>, json: bool) -> Result<()> {
    let orchestrator = open_orchestrator(catalog_path)?;
    let result = orchestrator.plan(&PlanRequest::new(components))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan_output(&result))?);
    } else {
        print_plan_text(&result);
    }

    if result.plan.has_critical_conflicts() {
        bail!("plan has critical conflicts; remove one of the offending components");
    }
    Ok(())
}

pub async fn install(
    catalog_path: &str,
    components: Vec<String>,
    max_parallel: usize,
    no_recovery: bool,
    json: bool,
) -> Result<()> {
    let orchestrator = open_orchestrator(catalog_path)?;
    let planned = orchestrator.plan(&PlanRequest::new(components))?;

    if planned.plan.has_critical_conflicts() {
        for conflict in planned.conflicts() {
            eprintln!("{}", conflict);
        }
        bail!("refusing to install: critical conflicts in plan");
    }
    for conflict in planned
        .conflicts()
        .iter()
        .filter(|c| c.severity == Severity::Warning)
    {
        warn!("{}", conflict);
    }

    // Ctrl-C requests cancellation; in-flight installs finish first
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("cancellation requested, letting in-flight installs finish");
            signal_cancel.cancel();
        }
    });

    let progress: Arc<dyn ProgressTracker> = if json {
        Arc::new(SilentProgress::new())
    } else {
        Arc::new(CliProgress::new("installing"))
    };
    let request = ExecuteRequest::new(planned.plan)
        .max_parallel(max_parallel)
        .recovery_enabled(!no_recovery)
        .with_cancel(cancel);
    let result = orchestrator.execute_with_progress(request, progress).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_batch_text(&result);
    }

    if result.cancelled {
        bail!("installation cancelled");
    }
    if !result.overall_success {
        bail!("installation finished with failures");
    }
    Ok(())
}

fn print_batch_text(result: &BatchResult) {
    for record in &result.records {
        let detail = match (&record.error_kind, &record.skipped_due_to) {
            (_, Some(ancestor)) => format!(" (dependency '{}' failed)", ancestor),
            (Some(kind), _) => format!(" ({})", kind),
            _ => String::new(),
        };
        println!(
            "{:10} attempt {} {}{}",
            record.outcome.to_string(),
            record.attempt_number,
            record.component_id,
            detail
        );
    }
    println!(
        "batch {}: {}",
        result.batch_id,
        if result.overall_success {
            "success"
        } else if result.cancelled {
            "cancelled"
        } else {
            "failed"
        }
    );
}

pub fn detect(catalog_path: &str, components: Vec<String>, json: bool) -> Result<()> {
    let orchestrator = open_orchestrator(catalog_path)?;
    let ids: Vec<String> = if components.is_empty() {
        orchestrator.catalog().ids().map(String::from).collect()
    } else {
        components
    };

    let reports = orchestrator.detect_report(&ids)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    for report in &reports {
        match &report.recommended {
            Some(best) => println!(
                "{}: {} ({}, score {:.2}){}",
                report.component_id,
                best.detection.confidence,
                best.compatibility,
                best.score.total,
                if report.is_satisfied() {
                    " - already satisfied"
                } else {
                    ""
                }
            ),
            None => println!("{}: not detected", report.component_id),
        }
    }
    Ok(())
}
