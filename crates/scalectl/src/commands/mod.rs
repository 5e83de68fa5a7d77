pub mod decide;
pub mod replay;
pub mod route;

use std::path::Path;

use scalegrid_core::ScalingConfig;
use scalegrid_manager::ScalingManager;

/// Build a manager from an optional config file.
pub fn manager(config: Option<&Path>) -> ScalingManager {
    match config {
        Some(path) => ScalingManager::from_config_file(path),
        None => ScalingManager::new(ScalingConfig::default()),
    }
}
