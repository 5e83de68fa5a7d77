//! Scaling executor — applies an action to the instance count.
//!
//! Moves the count by at most one unit per call and never leaves
//! `[min_instances, max_instances]`. Provisioning is left to an external
//! executor that acts on the returned count.

use tracing::{debug, info};

use scalegrid_core::{ScalingAction, ScalingConfig, ScalingStatus};

#[derive(Debug, Clone, Copy, Default)]
pub struct ScalingExecutor;

impl ScalingExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Apply `action` to `current_instances`, returning the new count and status.
    ///
    /// A count outside the configured bounds is clamped before the action
    /// is applied.
    pub fn execute(
        &self,
        action: ScalingAction,
        current_instances: u32,
        config: &ScalingConfig,
    ) -> (u32, ScalingStatus) {
        let current = config.clamp_instances(current_instances);

        let (next, status) = match action {
            ScalingAction::ScaleUp if current < config.max_instances => {
                (current + 1, ScalingStatus::ScalingUp)
            }
            ScalingAction::ScaleDown if current > config.min_instances => {
                (current - 1, ScalingStatus::ScalingDown)
            }
            ScalingAction::Optimize => (current, ScalingStatus::Optimizing),
            _ => (current, ScalingStatus::Idle),
        };

        if next != current {
            info!(from = current, to = next, status = %status, "instance count changed");
        } else {
            debug!(instances = current, action = %action, status = %status, "no instance change");
        }

        (next, status)
    }
}
