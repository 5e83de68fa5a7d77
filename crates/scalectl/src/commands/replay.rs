//! Replay a recorded metrics trace through the scaling loop.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use tracing::info;

use scalegrid_core::ScalingMetrics;

/// One entry of a trace file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TraceSample {
    Full(ScalingMetrics),
    Usage { cpu: f64, memory: f64 },
}

fn read_trace(path: &Path) -> anyhow::Result<Vec<TraceSample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading trace {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing trace {}", path.display()))
}

pub async fn replay(
    samples: &Path,
    config: Option<&Path>,
    interval_ms: u64,
    report: &str,
) -> anyhow::Result<()> {
    let trace = read_trace(samples)?;
    let manager = super::manager(config);

    info!(samples = trace.len(), interval_ms, "replaying metrics trace");

    let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    let mut processed = 0usize;

    for sample in trace {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(processed, "replay interrupted");
                break;
            }
        }

        let decision = match sample {
            TraceSample::Full(metrics) => manager.process_sample(metrics),
            TraceSample::Usage { cpu, memory } => manager.process_metrics(cpu, memory),
        };
        processed += 1;
        info!(
            action = %decision.action,
            instances = manager.current_instances(),
            status = %manager.scaling_status(),
            "tick"
        );
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&manager.generate_scaling_report(report))?
    );
    Ok(())
}
