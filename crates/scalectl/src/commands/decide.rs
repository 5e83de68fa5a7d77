use std::path::Path;

use serde_json::json;

pub fn decide(
    cpu: f64,
    memory: f64,
    instances: Option<u32>,
    config: Option<&Path>,
) -> anyhow::Result<()> {
    let manager = super::manager(config);
    if let Some(count) = instances {
        manager.set_current_instances(count);
    }

    let decision = manager.process_metrics(cpu, memory);
    let output = json!({
        "decision": decision,
        "current_instances": manager.current_instances(),
        "scaling_status": manager.scaling_status(),
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
