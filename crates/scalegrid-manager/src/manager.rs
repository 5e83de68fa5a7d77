//! Scaling manager — orchestrates one scaling domain.
//!
//! Loop state (monitor, histories, instance count, stored strategies) sits
//! behind one mutex. Routing state lives in the `LoadDistributor`'s own
//! mutex, so request routing never waits on a scaling tick.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use scalegrid_analytics::{
    analyze_patterns, generate_report, optimize, predict_scaling_needs, OptimizationResult,
    ReportInput, ReportKind,
};
use scalegrid_autoscale::{ResourceMonitor, ScalingDecider, ScalingExecutor};
use scalegrid_balancer::{DistributorStats, LoadDistributor};
use scalegrid_core::{
    epoch_secs, History, InstanceId, RequestInfo, ScalingConfig, ScalingDecision, ScalingMetrics,
    ScalingStatus, ScalingStrategy,
};

use crate::error::{ManagerError, ManagerResult};
use crate::intelligent::{
    EffectiveTargets, IntelligentExecution, IntelligentStrategy, IntelligentStrategyKind,
    STRATEGY_LOOKBACK,
};

/// Lookback used when forecasting, independent of the horizon.
pub const FORECAST_LOOKBACK_HOURS: u64 = 24;

/// Optimization runs retained.
const OPTIMIZATION_HISTORY: usize = 100;

struct ManagerState {
    config: ScalingConfig,
    monitor: ResourceMonitor,
    decisions: History<ScalingDecision>,
    optimizations: History<OptimizationResult>,
    strategies: HashMap<String, IntelligentStrategy>,
    current_instances: u32,
    target_instances: u32,
    status: ScalingStatus,
}

impl ManagerState {
    /// Run the decider and executor, then record the outcome.
    fn tick(
        &mut self,
        decider: &ScalingDecider,
        executor: &ScalingExecutor,
        metrics: &ScalingMetrics,
        decision_config: &ScalingConfig,
    ) -> (ScalingDecision, u32, ScalingStatus) {
        let decision = decider.decide(metrics, decision_config);
        let (instances, status) =
            executor.execute(decision.action, self.current_instances, &self.config);

        self.current_instances = instances;
        self.target_instances = instances;
        self.status = status;
        self.decisions.push(decision.clone());

        (decision, instances, status)
    }
}

/// Orchestrates monitoring, decisions, execution, routing, and analytics.
pub struct ScalingManager {
    state: Mutex<ManagerState>,
    distributor: LoadDistributor,
    decider: ScalingDecider,
    executor: ScalingExecutor,
}

impl ScalingManager {
    /// Create a manager starting at `min_instances`.
    ///
    /// The config is validated; an invalid config is replaced by defaults
    /// with a warning.
    pub fn new(config: ScalingConfig) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                warn!(error = %e, "invalid scaling config, using defaults");
                ScalingConfig::default()
            }
        };
        let capacity = config.history_capacity;

        info!(
            min = config.min_instances,
            max = config.max_instances,
            target_cpu = config.target_cpu_utilization,
            target_memory = config.target_memory_utilization,
            "scaling manager initialized"
        );

        Self {
            state: Mutex::new(ManagerState {
                current_instances: config.min_instances,
                target_instances: config.min_instances,
                status: ScalingStatus::Idle,
                monitor: ResourceMonitor::new(capacity),
                decisions: History::with_capacity(capacity),
                optimizations: History::with_capacity(OPTIMIZATION_HISTORY),
                strategies: HashMap::new(),
                config,
            }),
            distributor: LoadDistributor::new(),
            decider: ScalingDecider::new(),
            executor: ScalingExecutor::new(),
        }
    }

    /// Load config from a file, keeping defaults when it is missing or bad.
    pub fn from_config_file(path: &Path) -> Self {
        Self::new(ScalingConfig::load_or_default(path))
    }

    fn lock(&self) -> MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Core loop ─────────────────────────────────────────────────

    /// Run one scaling tick on a CPU/memory sample.
    pub fn process_metrics(&self, cpu: f64, memory: f64) -> ScalingDecision {
        let mut state = self.lock();
        let current = state.current_instances;
        let sample = state.monitor.collect(current, cpu, memory);
        let config = state.config.clone();
        let (decision, _, _) = state.tick(&self.decider, &self.executor, &sample, &config);
        decision
    }

    /// Run one scaling tick on a caller-built sample.
    pub fn process_sample(&self, sample: ScalingMetrics) -> ScalingDecision {
        let mut state = self.lock();
        state.monitor.record(sample.clone());
        let config = state.config.clone();
        let (decision, _, _) = state.tick(&self.decider, &self.executor, &sample, &config);
        decision
    }

    /// Route one request to an instance from `instances`.
    pub fn distribute_load(
        &self,
        request: &RequestInfo,
        strategy: ScalingStrategy,
        instances: &[InstanceId],
    ) -> String {
        self.distributor.distribute(request, strategy, instances)
    }

    /// Route by strategy name. Unknown names fall back to the first instance.
    pub fn distribute_load_by_name(
        &self,
        request: &RequestInfo,
        strategy: &str,
        instances: &[InstanceId],
    ) -> String {
        self.distributor.distribute_by_name(request, strategy, instances)
    }

    /// Route using the configured default strategy.
    pub fn distribute_default(&self, request: &RequestInfo, instances: &[InstanceId]) -> String {
        let strategy = self.lock().config.scaling_strategy;
        self.distributor.distribute(request, strategy, instances)
    }

    pub fn record_response_time(&self, instance: &str, millis: f64) -> ManagerResult<()> {
        Ok(self.distributor.record_response_time(instance, millis)?)
    }

    pub fn set_instance_weight(&self, instance: &str, weight: f64) -> ManagerResult<()> {
        Ok(self.distributor.set_weight(instance, weight)?)
    }

    pub fn release_connection(&self, instance: &str) {
        self.distributor.release(instance);
    }

    pub fn distributor_stats(&self) -> DistributorStats {
        self.distributor.stats()
    }

    // ── State ─────────────────────────────────────────────────────

    pub fn current_instances(&self) -> u32 {
        self.lock().current_instances
    }

    pub fn target_instances(&self) -> u32 {
        self.lock().target_instances
    }

    pub fn scaling_status(&self) -> ScalingStatus {
        self.lock().status
    }

    /// Record the live instance count reported by the external registry.
    ///
    /// The count is clamped into the configured bounds.
    pub fn set_current_instances(&self, count: u32) {
        let mut state = self.lock();
        let clamped = state.config.clamp_instances(count);
        if clamped != count {
            warn!(reported = count, clamped, "reported instance count outside bounds");
        }
        state.current_instances = clamped;
    }

    pub fn config(&self) -> ScalingConfig {
        self.lock().config.clone()
    }

    /// Replace the config; takes effect on the next tick.
    pub fn update_config(&self, config: ScalingConfig) -> ManagerResult<()> {
        config.validate()?;
        let mut state = self.lock();
        state.current_instances = config.clamp_instances(state.current_instances);
        state.config = config;
        info!("scaling config updated");
        Ok(())
    }

    pub fn latest_metrics(&self) -> Option<ScalingMetrics> {
        self.lock().monitor.latest().cloned()
    }

    pub fn metrics_history(&self) -> Vec<ScalingMetrics> {
        self.lock().monitor.history().snapshot()
    }

    pub fn decision_history(&self) -> Vec<ScalingDecision> {
        self.lock().decisions.snapshot()
    }

    pub fn optimization_history(&self) -> Vec<OptimizationResult> {
        self.lock().optimizations.snapshot()
    }

    // ── Analytics ─────────────────────────────────────────────────

    /// Pattern analysis over the last `hours` hours.
    pub fn analyze_scaling_patterns(&self, hours: u64) -> Value {
        let (samples, decisions, _) = self.snapshot();
        into_json(
            analyze_patterns(&samples, &decisions, hours, epoch_secs()).map_err(ManagerError::from),
        )
    }

    /// Predictions for the next `horizon_minutes`.
    pub fn predict_scaling_needs(&self, horizon_minutes: u64) -> Vec<Value> {
        let (samples, decisions, config) = self.snapshot();
        let predictions = analyze_patterns(&samples, &decisions, FORECAST_LOOKBACK_HOURS, epoch_secs())
            .map(|analysis| predict_scaling_needs(&analysis, &config, horizon_minutes));

        match predictions {
            Ok(predictions) => predictions
                .iter()
                .map(|p| into_json(serde_json::to_value(p).map_err(ManagerError::from)))
                .collect(),
            Err(e) => vec![error_json(&ManagerError::from(e))],
        }
    }

    /// Run an optimization pass and keep it in the optimization history.
    pub fn optimize_scaling_automatically(&self) -> Value {
        let (samples, decisions, config) = self.snapshot();
        let result = analyze_patterns(&samples, &decisions, FORECAST_LOOKBACK_HOURS, epoch_secs())
            .map(|analysis| optimize(&analysis, &config));

        match result {
            Ok(result) => {
                self.lock().optimizations.push(result.clone());
                into_json(Ok(result))
            }
            Err(e) => error_json(&ManagerError::from(e)),
        }
    }

    /// Build a `summary`, `performance`, or `comprehensive` report.
    pub fn generate_scaling_report(&self, kind: &str) -> Value {
        let report = kind.parse::<ReportKind>().and_then(|kind| {
            let state = self.lock();
            let samples = state.monitor.history().snapshot();
            let decisions = state.decisions.snapshot();
            let input = ReportInput {
                samples: &samples,
                decisions: &decisions,
                current_instances: state.current_instances,
                target_instances: state.target_instances,
                status: state.status,
                config: &state.config,
                now: epoch_secs(),
            };
            generate_report(kind, &input)
        });
        into_json(report.map_err(ManagerError::from))
    }

    fn snapshot(&self) -> (Vec<ScalingMetrics>, Vec<ScalingDecision>, ScalingConfig) {
        let state = self.lock();
        (
            state.monitor.history().snapshot(),
            state.decisions.snapshot(),
            state.config.clone(),
        )
    }

    // ── Intelligent strategies ────────────────────────────────────

    /// Store a strategy bundle and return its id.
    ///
    /// Fails on an unknown `kind` or malformed parameters.
    pub fn create_intelligent_scaling_strategy(
        &self,
        kind: &str,
        params: Map<String, Value>,
    ) -> ManagerResult<String> {
        let kind: IntelligentStrategyKind = kind.parse()?;
        let strategy = IntelligentStrategy::new(kind, params)?;
        let id = strategy.strategy_id.clone();

        self.lock().strategies.insert(id.clone(), strategy);
        info!(strategy_id = %id, kind = %kind, "intelligent scaling strategy created");
        Ok(id)
    }

    pub fn intelligent_strategy(&self, strategy_id: &str) -> Option<IntelligentStrategy> {
        self.lock().strategies.get(strategy_id).cloned()
    }

    /// Run one scaling tick through a stored strategy.
    pub fn execute_intelligent_scaling(&self, strategy_id: &str, metrics: ScalingMetrics) -> Value {
        into_json(self.try_execute_intelligent(strategy_id, metrics))
    }

    fn try_execute_intelligent(
        &self,
        strategy_id: &str,
        metrics: ScalingMetrics,
    ) -> ManagerResult<IntelligentExecution> {
        let mut state = self.lock();
        let strategy = state
            .strategies
            .get(strategy_id)
            .cloned()
            .ok_or_else(|| ManagerError::StrategyNotFound(strategy_id.to_string()))?;

        state.monitor.record(metrics.clone());
        let recent = state.monitor.history().recent(STRATEGY_LOOKBACK);
        let (effective_metrics, effective_config) = strategy.plan(&metrics, &recent, &state.config);

        let (decision, new_instances, scaling_status) =
            state.tick(&self.decider, &self.executor, &effective_metrics, &effective_config);

        let executions = match state.strategies.get_mut(strategy_id) {
            Some(stored) => {
                stored.executions += 1;
                stored.executions
            }
            None => strategy.executions + 1,
        };

        debug!(
            strategy_id,
            kind = %strategy.strategy_type,
            action = %decision.action,
            new_instances,
            "intelligent scaling executed"
        );

        Ok(IntelligentExecution {
            strategy_id: strategy_id.to_string(),
            strategy_type: strategy.strategy_type,
            decision,
            new_instances,
            scaling_status,
            effective_targets: EffectiveTargets {
                target_cpu_utilization: effective_config.target_cpu_utilization,
                target_memory_utilization: effective_config.target_memory_utilization,
            },
            executions,
        })
    }
}

impl Default for ScalingManager {
    fn default() -> Self {
        Self::new(ScalingConfig::default())
    }
}

fn into_json<T: Serialize>(result: ManagerResult<T>) -> Value {
    match result.and_then(|value| serde_json::to_value(value).map_err(ManagerError::from)) {
        Ok(value) => value,
        Err(e) => error_json(&e),
    }
}

fn error_json(e: &ManagerError) -> Value {
    warn!(error = %e, "scaling analytics failed");
    json!({ "error": e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scalegrid_core::{ScalingAction, NO_INSTANCES_AVAILABLE};

    fn test_config() -> ScalingConfig {
        ScalingConfig {
            min_instances: 1,
            max_instances: 5,
            target_cpu_utilization: 70.0,
            target_memory_utilization: 80.0,
            ..Default::default()
        }
    }

    #[test]
    fn starts_at_min_instances() {
        let manager = ScalingManager::new(ScalingConfig {
            min_instances: 2,
            ..test_config()
        });
        assert_eq!(manager.current_instances(), 2);
        assert_eq!(manager.scaling_status(), ScalingStatus::Idle);
    }

    #[test]
    fn invalid_config_falls_back_to_defaults() {
        let manager = ScalingManager::new(ScalingConfig {
            min_instances: 9,
            max_instances: 3,
            ..Default::default()
        });
        assert_eq!(manager.config(), ScalingConfig::default());
    }

    #[test]
    fn process_metrics_scales_up_and_records_history() {
        let manager = ScalingManager::new(test_config());
        let decision = manager.process_metrics(85.0, 50.0);

        assert_eq!(decision.action, ScalingAction::ScaleUp);
        assert_eq!(manager.current_instances(), 2);
        assert_eq!(manager.target_instances(), 2);
        assert_eq!(manager.scaling_status(), ScalingStatus::ScalingUp);
        assert_eq!(manager.metrics_history().len(), 1);
        assert_eq!(manager.decision_history().len(), 1);
        assert_eq!(manager.decision_history()[0].decision_id, decision.decision_id);
    }

    #[test]
    fn process_metrics_stops_at_ceiling() {
        let manager = ScalingManager::new(test_config());
        for _ in 0..10 {
            manager.process_metrics(95.0, 95.0);
        }
        assert_eq!(manager.current_instances(), 5);
        assert_eq!(manager.scaling_status(), ScalingStatus::Idle);
    }

    #[test]
    fn process_metrics_scales_down_to_floor() {
        let manager = ScalingManager::new(test_config());
        manager.set_current_instances(4);
        for _ in 0..6 {
            manager.process_metrics(10.0, 10.0);
        }
        assert_eq!(manager.current_instances(), 1);
    }

    #[test]
    fn set_current_instances_is_clamped() {
        let manager = ScalingManager::new(test_config());
        manager.set_current_instances(40);
        assert_eq!(manager.current_instances(), 5);
    }

    #[test]
    fn process_sample_keeps_rich_fields() {
        let manager = ScalingManager::new(test_config());
        let mut sample = ScalingMetrics::new(1, 50.0, 50.0);
        sample.response_time = 320.0;
        let decision = manager.process_sample(sample);

        assert_eq!(decision.action, ScalingAction::Maintain);
        assert_eq!(manager.latest_metrics().unwrap().response_time, 320.0);
    }

    #[test]
    fn history_respects_capacity() {
        let manager = ScalingManager::new(ScalingConfig {
            history_capacity: 3,
            ..test_config()
        });
        for _ in 0..7 {
            manager.process_metrics(60.0, 60.0);
        }
        assert_eq!(manager.metrics_history().len(), 3);
        assert_eq!(manager.decision_history().len(), 3);
    }

    #[test]
    fn distribute_load_delegates() {
        let manager = ScalingManager::new(test_config());
        let pool: Vec<String> = vec!["i1".into(), "i2".into()];
        let req = RequestInfo::default();

        assert_eq!(manager.distribute_load(&req, ScalingStrategy::RoundRobin, &pool), "i1");
        assert_eq!(manager.distribute_load(&req, ScalingStrategy::RoundRobin, &pool), "i2");
        assert_eq!(
            manager.distribute_load(&req, ScalingStrategy::RoundRobin, &[]),
            NO_INSTANCES_AVAILABLE
        );
        assert_eq!(manager.distributor_stats().instances["i1"].connections, 1);
    }

    #[test]
    fn distribute_default_uses_configured_strategy() {
        let manager = ScalingManager::new(ScalingConfig {
            scaling_strategy: ScalingStrategy::LeastResponseTime,
            ..test_config()
        });
        manager.record_response_time("slow", 400.0).unwrap();
        let pool: Vec<String> = vec!["slow".into(), "fast".into()];
        assert_eq!(manager.distribute_default(&RequestInfo::default(), &pool), "fast");
    }

    #[test]
    fn analyze_patterns_reports_efficiency() {
        let manager = ScalingManager::new(test_config());
        for cpu in [50.0, 60.0, 85.0] {
            manager.process_metrics(cpu, 40.0);
        }
        let analysis = manager.analyze_scaling_patterns(1);
        assert_eq!(analysis["samples_analyzed"], 3);
        assert_eq!(analysis["scaling_efficiency"], 1.0);
    }

    #[test]
    fn analytics_errors_are_reported_not_raised() {
        let manager = ScalingManager::new(test_config());
        let analysis = manager.analyze_scaling_patterns(0);
        assert!(analysis["error"].as_str().unwrap().contains("time range"));

        let report = manager.generate_scaling_report("weekly");
        assert!(report["error"].as_str().unwrap().contains("weekly"));
    }

    #[test]
    fn optimization_is_recorded() {
        let manager = ScalingManager::new(test_config());
        manager.process_metrics(50.0, 50.0);
        let result = manager.optimize_scaling_automatically();

        assert_eq!(result["recommendations"][0], "scaling is operating optimally");
        assert_eq!(manager.optimization_history().len(), 1);
    }

    #[test]
    fn predictions_flag_exhaustion() {
        let manager = ScalingManager::new(test_config());
        for _ in 0..3 {
            manager.process_metrics(95.0, 40.0);
        }
        let predictions = manager.predict_scaling_needs(30);
        assert!(predictions.iter().any(|p| p["kind"] == "resource_exhaustion"));
        assert!(predictions.iter().all(|p| p["time_horizon_minutes"] == 30));
    }

    #[test]
    fn report_summary_counts() {
        let manager = ScalingManager::new(test_config());
        manager.process_metrics(85.0, 50.0);
        manager.process_metrics(60.0, 50.0);

        let report = manager.generate_scaling_report("comprehensive");
        assert_eq!(report["summary"]["total_metrics_recorded"], 2);
        assert_eq!(report["summary"]["total_scaling_decisions"], 2);
        assert_eq!(report["summary"]["current_instances"], 2);
        assert_eq!(report["recent_decisions"]["action_counts"]["scale_up"], 1);
        assert!(report["patterns"].is_object());
    }

    #[test]
    fn unknown_strategy_kind_fails_fast() {
        let manager = ScalingManager::new(test_config());
        let err = manager
            .create_intelligent_scaling_strategy("unknown_type", Map::new())
            .unwrap_err();
        assert!(matches!(err, ManagerError::UnknownStrategyKind(_)));
    }

    #[test]
    fn create_strategy_records_config() {
        let manager = ScalingManager::new(test_config());
        let id = manager
            .create_intelligent_scaling_strategy("cost_optimized", Map::new())
            .unwrap();

        assert!(!id.is_empty());
        let stored = manager.intelligent_strategy(&id).unwrap();
        assert_eq!(stored.strategy_type, IntelligentStrategyKind::CostOptimized);
        assert_eq!(stored.executions, 0);
    }

    #[test]
    fn execute_reports_real_strategy_type() {
        let manager = ScalingManager::new(test_config());
        let id = manager
            .create_intelligent_scaling_strategy("cost_optimized", Map::new())
            .unwrap();

        // 75% CPU scales up under plain rules but not with 10% headroom.
        let result = manager.execute_intelligent_scaling(&id, ScalingMetrics::new(1, 75.0, 50.0));
        assert_eq!(result["strategy_type"], "cost_optimized");
        assert_eq!(result["decision"]["action"], "maintain");
        assert_eq!(result["new_instances"], 1);
        assert_eq!(result["executions"], 1);
        assert_eq!(manager.decision_history().len(), 1);
    }

    #[test]
    fn execute_unknown_strategy_reports_error() {
        let manager = ScalingManager::new(test_config());
        let result = manager.execute_intelligent_scaling("missing", ScalingMetrics::new(1, 50.0, 50.0));
        assert!(result["error"].as_str().unwrap().contains("missing"));
        assert!(manager.metrics_history().is_empty());
    }
}
