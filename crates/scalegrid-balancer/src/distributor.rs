//! Load distributor — selects one instance per request.
//!
//! `LoadDistributor` owns the counters every strategy reads. All routing
//! state sits behind a single mutex, so one distributor can be shared by
//! the request path and feedback reporters. Construct one distributor per
//! instance pool when strict per-pool round robin is required: the round
//! robin index is shared across every pool routed through it.

use std::collections::{BTreeMap, VecDeque};
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tracing::{debug, warn};

use scalegrid_core::{
    InstanceId, RequestInfo, ScalingStrategy, NO_INSTANCES_AVAILABLE, SELECTION_ERROR,
};

use crate::error::{BalanceError, BalanceResult};
use crate::strategy::{SelectInstance, SelectionState};

/// Response-time samples kept per instance.
pub const RESPONSE_TIME_WINDOW: usize = 100;

/// Routing counters for a single instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceStats {
    pub connections: u64,
    pub average_response_time: f64,
    pub response_samples: usize,
    pub weight: f64,
}

/// Point-in-time copy of the distributor's state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributorStats {
    pub round_robin_index: usize,
    pub instances: BTreeMap<InstanceId, InstanceStats>,
}

/// Routes requests to instances using a selectable strategy.
#[derive(Debug, Default)]
pub struct LoadDistributor {
    state: Mutex<SelectionState>,
}

impl LoadDistributor {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SelectionState::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SelectionState> {
        // Routing state stays usable even if a holder panicked.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select an instance from `available` for this request.
    ///
    /// Returns [`NO_INSTANCES_AVAILABLE`] for an empty pool without touching
    /// any counter. A failing selector is logged and the first instance is
    /// returned instead. Only successful selections count as connections.
    pub fn distribute(
        &self,
        request: &RequestInfo,
        strategy: ScalingStrategy,
        available: &[InstanceId],
    ) -> String {
        if available.is_empty() {
            debug!(strategy = %strategy, "no instances available");
            return NO_INSTANCES_AVAILABLE.to_string();
        }

        let mut state = self.lock();
        let selected = strategy
            .select(&mut state, request, available)
            .and_then(|idx| {
                available.get(idx).ok_or(BalanceError::IndexOutOfRange {
                    index: idx,
                    len: available.len(),
                })
            });

        match selected {
            Ok(instance) => {
                *state.connections.entry(instance.clone()).or_insert(0) += 1;
                debug!(strategy = %strategy, %instance, pool = available.len(), "instance selected");
                instance.clone()
            }
            Err(e) => {
                warn!(strategy = %strategy, error = %e, "selection failed, using first instance");
                fallback(available)
            }
        }
    }

    /// Route by strategy name.
    ///
    /// Unknown names route to the first instance, which is counted as a
    /// connection like any other routed request.
    pub fn distribute_by_name(
        &self,
        request: &RequestInfo,
        strategy: &str,
        available: &[InstanceId],
    ) -> String {
        match ScalingStrategy::from_str(strategy) {
            Ok(strategy) => self.distribute(request, strategy, available),
            Err(e) => {
                if available.is_empty() {
                    return NO_INSTANCES_AVAILABLE.to_string();
                }
                warn!(error = %e, "unknown strategy, using first instance");
                let instance = fallback(available);
                *self.lock().connections.entry(instance.clone()).or_insert(0) += 1;
                instance
            }
        }
    }

    /// Feed back an observed response time for an instance.
    pub fn record_response_time(&self, instance: &str, millis: f64) -> BalanceResult<()> {
        if !millis.is_finite() || millis < 0.0 {
            return Err(BalanceError::InvalidResponseTime {
                instance: instance.to_string(),
                millis,
            });
        }
        let mut state = self.lock();
        let samples = state
            .response_times
            .entry(instance.to_string())
            .or_insert_with(VecDeque::new);
        if samples.len() == RESPONSE_TIME_WINDOW {
            samples.pop_front();
        }
        samples.push_back(millis);
        Ok(())
    }

    /// Set the weighted round robin weight for an instance.
    pub fn set_weight(&self, instance: &str, weight: f64) -> BalanceResult<()> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(BalanceError::InvalidWeight {
                instance: instance.to_string(),
                weight,
            });
        }
        let mut state = self.lock();
        state.weights.insert(instance.to_string(), weight);
        debug!(%instance, weight, "instance weight updated");
        Ok(())
    }

    /// Mark one connection to `instance` as finished.
    pub fn release(&self, instance: &str) {
        let mut state = self.lock();
        if let Some(count) = state.connections.get_mut(instance) {
            *count = count.saturating_sub(1);
        }
    }

    pub fn connections(&self, instance: &str) -> u64 {
        self.lock().connections(instance)
    }

    /// Copy the counters of every instance the distributor has seen.
    pub fn stats(&self) -> DistributorStats {
        let state = self.lock();
        let mut instances = BTreeMap::new();

        let known = state
            .connections
            .keys()
            .chain(state.response_times.keys())
            .chain(state.weights.keys());
        for id in known {
            instances.entry(id.clone()).or_insert_with(|| InstanceStats {
                connections: state.connections(id),
                average_response_time: state.average_response_time(id),
                response_samples: state.response_times.get(id).map_or(0, |s| s.len()),
                weight: state.weight(id),
            });
        }

        DistributorStats {
            round_robin_index: state.round_robin_index,
            instances,
        }
    }
}

fn fallback(available: &[InstanceId]) -> String {
    available
        .first()
        .cloned()
        .unwrap_or_else(|| SELECTION_ERROR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(ids: &[&str]) -> Vec<InstanceId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn round_robin_cycles() {
        let distributor = LoadDistributor::new();
        let p = pool(&["i1", "i2", "i3"]);
        let req = RequestInfo::default();

        let picks: Vec<String> = (0..4)
            .map(|_| distributor.distribute(&req, ScalingStrategy::RoundRobin, &p))
            .collect();

        assert_eq!(picks, vec!["i1", "i2", "i3", "i1"]);
    }

    #[test]
    fn round_robin_index_is_shared_across_pools() {
        let distributor = LoadDistributor::new();
        let req = RequestInfo::default();
        let small = pool(&["a", "b"]);
        let large = pool(&["x", "y", "z"]);

        assert_eq!(distributor.distribute(&req, ScalingStrategy::RoundRobin, &small), "a");
        // Index is now 1, so the large pool starts at its second entry.
        assert_eq!(distributor.distribute(&req, ScalingStrategy::RoundRobin, &large), "y");
    }

    #[test]
    fn empty_pool_returns_sentinel_and_mutates_nothing() {
        let distributor = LoadDistributor::new();
        let before = distributor.stats();

        for strategy in ScalingStrategy::ALL {
            let picked = distributor.distribute(&RequestInfo::default(), strategy, &[]);
            assert_eq!(picked, NO_INSTANCES_AVAILABLE);
        }

        assert_eq!(distributor.stats(), before);
    }

    #[test]
    fn ip_hash_is_sticky() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b", "c", "d", "e"]);
        let req = RequestInfo::with_client_ip("203.0.113.7");

        let first = distributor.distribute(&req, ScalingStrategy::IpHash, &p);
        let second = distributor.distribute(&req, ScalingStrategy::IpHash, &p);
        assert_eq!(first, second);
    }

    #[test]
    fn selection_records_connection() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b"]);
        let req = RequestInfo::default();

        distributor.distribute(&req, ScalingStrategy::RoundRobin, &p);
        distributor.distribute(&req, ScalingStrategy::RoundRobin, &p);
        distributor.distribute(&req, ScalingStrategy::RoundRobin, &p);

        assert_eq!(distributor.connections("a"), 2);
        assert_eq!(distributor.connections("b"), 1);
    }

    #[test]
    fn least_connections_balances_load() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b", "c"]);
        let req = RequestInfo::default();

        let picks: Vec<String> = (0..6)
            .map(|_| distributor.distribute(&req, ScalingStrategy::LeastConnections, &p))
            .collect();
        assert_eq!(picks, vec!["a", "b", "c", "a", "b", "c"]);

        distributor.release("b");
        distributor.release("b");
        assert_eq!(
            distributor.distribute(&req, ScalingStrategy::LeastConnections, &p),
            "b"
        );
    }

    #[test]
    fn least_response_time_follows_feedback() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b"]);
        distributor.record_response_time("a", 250.0).unwrap();
        distributor.record_response_time("b", 30.0).unwrap();

        let picked = distributor.distribute(
            &RequestInfo::default(),
            ScalingStrategy::LeastResponseTime,
            &p,
        );
        assert_eq!(picked, "b");
    }

    #[test]
    fn response_window_is_bounded() {
        let distributor = LoadDistributor::new();
        for i in 0..(RESPONSE_TIME_WINDOW + 20) {
            distributor.record_response_time("a", i as f64).unwrap();
        }
        let stats = distributor.stats();
        assert_eq!(stats.instances["a"].response_samples, RESPONSE_TIME_WINDOW);
    }

    #[test]
    fn invalid_feedback_is_rejected() {
        let distributor = LoadDistributor::new();
        assert!(distributor.record_response_time("a", f64::NAN).is_err());
        assert!(distributor.record_response_time("a", -1.0).is_err());
        assert!(distributor.set_weight("a", f64::INFINITY).is_err());
        assert!(distributor.set_weight("a", -2.0).is_err());
    }

    #[test]
    fn weighted_selector_failure_falls_back_to_first() {
        let distributor = LoadDistributor::new();
        distributor.set_weight("a", 0.0).unwrap();
        distributor.set_weight("b", 0.0).unwrap();

        let picked = distributor.distribute(
            &RequestInfo::default(),
            ScalingStrategy::WeightedRoundRobin,
            &pool(&["b", "a"]),
        );
        assert_eq!(picked, "b");
        // Fallbacks are not recorded as connections.
        assert_eq!(distributor.connections("b"), 0);
    }

    #[test]
    fn weighted_round_robin_respects_weights() {
        let distributor = LoadDistributor::new();
        distributor.set_weight("heavy", 3.0).unwrap();
        let p = pool(&["heavy", "light"]);
        let req = RequestInfo::default();

        for _ in 0..8 {
            distributor.distribute(&req, ScalingStrategy::WeightedRoundRobin, &p);
        }
        assert_eq!(distributor.connections("heavy"), 6);
        assert_eq!(distributor.connections("light"), 2);
    }

    #[test]
    fn unknown_strategy_name_uses_first_instance() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b"]);
        let req = RequestInfo::default();

        assert_eq!(distributor.distribute_by_name(&req, "random", &p), "a");
        assert_eq!(distributor.connections("a"), 1);
        assert_eq!(distributor.distribute_by_name(&req, "random", &[]), NO_INSTANCES_AVAILABLE);
        assert_eq!(distributor.distribute_by_name(&req, "round_robin", &p), "a");
        assert_eq!(distributor.distribute_by_name(&req, "round_robin", &p), "b");
    }

    #[test]
    fn result_always_in_pool() {
        let distributor = LoadDistributor::new();
        let p = pool(&["a", "b", "c"]);
        for strategy in ScalingStrategy::ALL {
            for i in 0..10 {
                let req = RequestInfo {
                    client_ip: Some(format!("10.0.0.{i}")),
                    request_id: Some(format!("req-{i}")),
                };
                let picked = distributor.distribute(&req, strategy, &p);
                assert!(p.contains(&picked), "{strategy} picked {picked}");
            }
        }
    }

    #[test]
    fn stats_include_seeded_weights() {
        let distributor = LoadDistributor::new();
        let stats = distributor.stats();
        assert_eq!(stats.instances.len(), 10);
        assert_eq!(stats.instances["instance_0"].weight, 1.0);
        assert_eq!(stats.instances["instance_0"].average_response_time, 100.0);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["round_robin_index"], 0);
    }
}
