//! Instance selectors, one per distribution strategy.
//!
//! Each selector returns an index into the pool it was given. The
//! distributor turns that index into an instance id and records the
//! connection.

use std::collections::{HashMap, VecDeque};

use md5::{Digest, Md5};

use scalegrid_core::{epoch_millis, InstanceId, RequestInfo, ScalingStrategy};

use crate::error::{BalanceError, BalanceResult};

/// Weight assumed for instances that were never weighted.
pub const DEFAULT_WEIGHT: f64 = 1.0;

/// Mean response time (ms) assumed for instances with no samples.
pub const DEFAULT_RESPONSE_TIME: f64 = 100.0;

/// Number of pre-seeded weights (`instance_0` .. `instance_9`).
pub const SEEDED_INSTANCES: usize = 10;

/// Per-instance routing state shared by all selectors.
#[derive(Debug, Clone)]
pub struct SelectionState {
    pub(crate) connections: HashMap<InstanceId, u64>,
    pub(crate) response_times: HashMap<InstanceId, VecDeque<f64>>,
    pub(crate) weights: HashMap<InstanceId, f64>,
    /// Running weights for smooth weighted round robin.
    pub(crate) current_weights: HashMap<InstanceId, f64>,
    /// Shared across every pool routed by this state.
    pub(crate) round_robin_index: usize,
}

impl SelectionState {
    pub fn new() -> Self {
        let weights = (0..SEEDED_INSTANCES)
            .map(|i| (format!("instance_{i}"), DEFAULT_WEIGHT))
            .collect();
        Self {
            connections: HashMap::new(),
            response_times: HashMap::new(),
            weights,
            current_weights: HashMap::new(),
            round_robin_index: 0,
        }
    }

    pub fn connections(&self, instance: &str) -> u64 {
        self.connections.get(instance).copied().unwrap_or(0)
    }

    pub fn weight(&self, instance: &str) -> f64 {
        self.weights.get(instance).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    /// Mean of recorded response times, or [`DEFAULT_RESPONSE_TIME`].
    pub fn average_response_time(&self, instance: &str) -> f64 {
        match self.response_times.get(instance) {
            Some(samples) if !samples.is_empty() => {
                samples.iter().sum::<f64>() / samples.len() as f64
            }
            _ => DEFAULT_RESPONSE_TIME,
        }
    }
}

impl Default for SelectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks one instance from a pool.
pub trait SelectInstance {
    /// Return the index of the chosen instance in `pool`.
    ///
    /// `pool` is never empty when called by the distributor.
    fn select(
        &self,
        state: &mut SelectionState,
        request: &RequestInfo,
        pool: &[InstanceId],
    ) -> BalanceResult<usize>;
}

impl SelectInstance for ScalingStrategy {
    fn select(
        &self,
        state: &mut SelectionState,
        request: &RequestInfo,
        pool: &[InstanceId],
    ) -> BalanceResult<usize> {
        if pool.is_empty() {
            return Err(BalanceError::EmptyPool);
        }
        match self {
            ScalingStrategy::RoundRobin => Ok(round_robin(state, pool)),
            ScalingStrategy::LeastConnections => Ok(least_connections(state, pool)),
            ScalingStrategy::WeightedRoundRobin => weighted_round_robin(state, pool),
            ScalingStrategy::IpHash => Ok(ip_hash(request, pool)),
            ScalingStrategy::LeastResponseTime => Ok(least_response_time(state, pool)),
            ScalingStrategy::ConsistentHash => Ok(consistent_hash(request, pool)),
        }
    }
}

fn round_robin(state: &mut SelectionState, pool: &[InstanceId]) -> usize {
    let idx = state.round_robin_index % pool.len();
    state.round_robin_index = state.round_robin_index.wrapping_add(1);
    idx
}

/// Fewest recorded connections; the earliest instance wins ties.
fn least_connections(state: &SelectionState, pool: &[InstanceId]) -> usize {
    pool.iter()
        .enumerate()
        .min_by_key(|(_, id)| state.connections(id))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Smooth weighted round robin.
///
/// Every instance gains its weight each round; the one with the highest
/// running weight is chosen and pays back the pool total. Over `Σw` calls
/// each instance is picked in proportion to its weight, interleaved.
fn weighted_round_robin(state: &mut SelectionState, pool: &[InstanceId]) -> BalanceResult<usize> {
    // Running weights only cover the current pool; a returning id starts at zero.
    state.current_weights.retain(|id, _| pool.contains(id));

    let total: f64 = pool.iter().map(|id| state.weight(id)).sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(BalanceError::NoPositiveWeight(total));
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, id) in pool.iter().enumerate() {
        let weight = state.weight(id);
        let current = state.current_weights.entry(id.clone()).or_insert(0.0);
        *current += weight;
        if best.is_none_or(|(_, top)| *current > top) {
            best = Some((idx, *current));
        }
    }

    let (idx, _) = best.ok_or(BalanceError::EmptyPool)?;
    if let Some(current) = state.current_weights.get_mut(&pool[idx]) {
        *current -= total;
    }
    Ok(idx)
}

fn ip_hash(request: &RequestInfo, pool: &[InstanceId]) -> usize {
    let key = request
        .client_ip
        .as_deref()
        .filter(|ip| !ip.is_empty())
        .unwrap_or("unknown");
    hash_index(key, pool.len())
}

/// Lowest mean response time; unseen instances count as the default.
fn least_response_time(state: &SelectionState, pool: &[InstanceId]) -> usize {
    pool.iter()
        .enumerate()
        .map(|(idx, id)| (idx, state.average_response_time(id)))
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(idx, _)| idx)
        .unwrap_or(0)
}

/// Keyed by request id; requests without one land on a time-derived slot.
fn consistent_hash(request: &RequestInfo, pool: &[InstanceId]) -> usize {
    match request.request_id.as_deref().filter(|id| !id.is_empty()) {
        Some(id) => hash_index(id, pool.len()),
        None => hash_index(&epoch_millis().to_string(), pool.len()),
    }
}

/// Map a key onto `0..len`: its MD5 digest read as a big-endian integer.
pub fn hash_index(key: &str, len: usize) -> usize {
    let digest = Md5::digest(key.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    (u128::from_be_bytes(bytes) % len as u128) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(ids: &[&str]) -> Vec<InstanceId> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn seeded_weights_present() {
        let state = SelectionState::new();
        assert_eq!(state.weights.len(), SEEDED_INSTANCES);
        assert_eq!(state.weight("instance_9"), 1.0);
        assert_eq!(state.weight("unseen"), DEFAULT_WEIGHT);
    }

    #[test]
    fn round_robin_wraps() {
        let mut state = SelectionState::new();
        let p = pool(&["a", "b", "c"]);
        let picks: Vec<usize> = (0..4).map(|_| round_robin(&mut state, &p)).collect();
        assert_eq!(picks, vec![0, 1, 2, 0]);
    }

    #[test]
    fn least_connections_prefers_idle() {
        let mut state = SelectionState::new();
        state.connections.insert("a".into(), 3);
        state.connections.insert("b".into(), 1);
        assert_eq!(least_connections(&state, &pool(&["a", "b", "c"])), 2);
        state.connections.insert("c".into(), 5);
        assert_eq!(least_connections(&state, &pool(&["a", "b", "c"])), 1);
    }

    #[test]
    fn smooth_weighted_round_robin_follows_weights() {
        let mut state = SelectionState::new();
        state.weights.insert("a".into(), 5.0);
        state.weights.insert("b".into(), 1.0);
        state.weights.insert("c".into(), 1.0);
        let p = pool(&["a", "b", "c"]);

        let picks: Vec<usize> = (0..7)
            .map(|_| weighted_round_robin(&mut state, &p).unwrap())
            .collect();
        // Classic smooth WRR sequence for weights 5/1/1.
        assert_eq!(picks, vec![0, 0, 1, 0, 2, 0, 0]);
    }

    #[test]
    fn weighted_round_robin_equal_weights_rotates() {
        let mut state = SelectionState::new();
        let p = pool(&["instance_0", "instance_1"]);
        let picks: Vec<usize> = (0..4)
            .map(|_| weighted_round_robin(&mut state, &p).unwrap())
            .collect();
        assert_eq!(picks, vec![0, 1, 0, 1]);
    }

    #[test]
    fn weighted_round_robin_rejects_zero_total() {
        let mut state = SelectionState::new();
        state.weights.insert("a".into(), 0.0);
        assert_eq!(
            weighted_round_robin(&mut state, &pool(&["a"])),
            Err(BalanceError::NoPositiveWeight(0.0))
        );
    }

    #[test]
    fn ip_hash_is_stable_and_unknown_defaults() {
        let p = pool(&["a", "b", "c", "d"]);
        let req = RequestInfo::with_client_ip("192.168.1.20");
        assert_eq!(ip_hash(&req, &p), ip_hash(&req, &p));
        assert_eq!(
            ip_hash(&RequestInfo::default(), &p),
            hash_index("unknown", p.len())
        );
    }

    #[test]
    fn hash_index_matches_md5_mod_len() {
        assert_eq!(hash_index("10.0.0.1", 5), 1);
        assert_eq!(hash_index("10.0.0.2", 5), 3);
        assert_eq!(hash_index("192.168.1.20", 5), 2);
        assert_eq!(hash_index("unknown", 5), 1);
        assert_eq!(hash_index("req-42", 3), 0);
    }

    #[test]
    fn empty_client_ip_hashes_as_unknown() {
        let p = pool(&["n0", "n1", "n2", "n3", "n4", "n5", "n6"]);
        let empty = RequestInfo::with_client_ip("");
        assert_eq!(ip_hash(&empty, &p), ip_hash(&RequestInfo::default(), &p));
        assert_eq!(ip_hash(&empty, &p), 1);
    }

    #[test]
    fn empty_request_id_is_treated_as_missing() {
        // A 1-slot pool makes the time-derived fallback deterministic.
        let single = pool(&["only"]);
        assert_eq!(consistent_hash(&RequestInfo::with_request_id(""), &single), 0);

        // "" would hash to a fixed slot; the fallback must not always match it.
        let p = pool(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let empty_slot = hash_index("", p.len());
        let picks: std::collections::HashSet<usize> = (0..50)
            .map(|_| {
                std::thread::sleep(std::time::Duration::from_millis(1));
                consistent_hash(&RequestInfo::with_request_id(""), &p)
            })
            .collect();
        assert!(picks.len() > 1 || !picks.contains(&empty_slot));
    }

    #[test]
    fn departed_instances_drop_running_weight() {
        let mut state = SelectionState::new();
        state.weights.insert("a".into(), 5.0);
        let full = pool(&["a", "b"]);
        weighted_round_robin(&mut state, &full).unwrap();
        assert!(state.current_weights.contains_key("a"));

        weighted_round_robin(&mut state, &pool(&["b"])).unwrap();
        assert!(!state.current_weights.contains_key("a"));

        // "a" rejoins with a fresh running weight and the heavier weight wins.
        state.current_weights.insert("b".into(), 0.0);
        assert_eq!(weighted_round_robin(&mut state, &full).unwrap(), 0);
    }

    #[test]
    fn least_response_time_uses_default_for_unseen() {
        let mut state = SelectionState::new();
        state.response_times.insert("a".into(), VecDeque::from(vec![150.0, 170.0]));
        state.response_times.insert("b".into(), VecDeque::from(vec![40.0]));
        let p = pool(&["a", "b", "c"]);
        assert_eq!(least_response_time(&state, &p), 1);

        // Unseen "c" (100ms) beats slow "a" (160ms).
        assert_eq!(least_response_time(&state, &pool(&["a", "c"])), 1);
    }

    #[test]
    fn consistent_hash_keyed_by_request_id() {
        let p = pool(&["a", "b", "c"]);
        let req = RequestInfo::with_request_id("req-42");
        assert_eq!(consistent_hash(&req, &p), hash_index("req-42", 3));
        assert!(consistent_hash(&RequestInfo::default(), &p) < 3);
    }

    #[test]
    fn hash_index_in_range() {
        for len in 1..20 {
            assert!(hash_index("10.0.0.1", len) < len);
        }
    }

    #[test]
    fn empty_pool_is_an_error() {
        let mut state = SelectionState::new();
        for strategy in ScalingStrategy::ALL {
            assert_eq!(
                strategy.select(&mut state, &RequestInfo::default(), &[]),
                Err(BalanceError::EmptyPool)
            );
        }
    }
}
