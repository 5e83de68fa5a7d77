use serde_json::json;

use scalegrid_core::RequestInfo;
use scalegrid_manager::ScalingManager;

pub fn route(
    strategy: &str,
    instances: &[String],
    client_ip: Option<String>,
    request_id: Option<String>,
    count: usize,
) -> anyhow::Result<()> {
    let manager = ScalingManager::default();
    let request = RequestInfo {
        client_ip,
        request_id,
    };

    let picks: Vec<String> = (0..count)
        .map(|_| manager.distribute_load_by_name(&request, strategy, instances))
        .collect();

    let output = json!({
        "strategy": strategy,
        "selections": picks,
        "stats": manager.distributor_stats(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
