//! One poll cycle end to end: fetch, evaluate, commit, aggregate, trigger.

use crate::config::EngineConfig;
use crate::core::clock::Clock;
use crate::error::EngineError;
use crate::execution::dispatcher::{ActionDispatcher, DispatcherConfig};
use crate::execution::gate::{GateDecision, Rejection, TriggerGate};
use crate::metrics::Metrics;
use crate::models::action::{ActivityLogEntry, FireOrigin};
use crate::models::signal::{Direction, Timeframe, TimeframeSignal};
use crate::services::market_data::MarketDataProvider;
use crate::services::notifications::NotificationSink;
use crate::services::venue::TradeVenue;
use crate::signals::aggregation::{ConsensusAggregator, ConsensusResult};
use crate::signals::decision::{NoPlan, PlannerConfig, TradePlanner};
use crate::signals::evaluator::TimeframeEvaluator;
use crate::signals::vault::{SignalVault, VaultSnapshot};
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub timeframes: Vec<Timeframe>,
    pub fetch_timeout: Duration,
    /// Run the gate automatically after every committed cycle.
    pub auto_trigger: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeframes: Timeframe::ALL.to_vec(),
            fetch_timeout: Duration::from_secs(10),
            auto_trigger: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchFailure {
    pub timeframe: Timeframe,
    pub reason: String,
}

/// What happened when the gate was consulted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum TriggerOutcome {
    NotPlanned(NoPlan),
    Rejected(Rejection),
    Fired(ActivityLogEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub refreshed: Vec<Timeframe>,
    pub failed: Vec<FetchFailure>,
    /// Refreshed timeframes that came back without enough history to vote.
    pub unavailable: Vec<Timeframe>,
    pub consensus: ConsensusResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerOutcome>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The previous cycle still held the poll-lock; this tick was dropped.
    Skipped,
    Completed(CycleReport),
}

/// Owns the components of the engine and runs poll cycles over them.
pub struct SignalRuntime {
    config: RuntimeConfig,
    provider: Arc<dyn MarketDataProvider>,
    evaluator: TimeframeEvaluator,
    aggregator: ConsensusAggregator,
    planner: TradePlanner,
    vault: Arc<SignalVault>,
    gate: Arc<TriggerGate>,
    dispatcher: Arc<ActionDispatcher>,
    clock: Arc<dyn Clock>,
    metrics: Option<Arc<Metrics>>,
    latest: RwLock<Option<ConsensusResult>>,
}

impl SignalRuntime {
    /// Wire every component from validated configuration.
    pub fn from_config(
        config: &EngineConfig,
        provider: Arc<dyn MarketDataProvider>,
        sink: Arc<dyn NotificationSink>,
        venue: Arc<dyn TradeVenue>,
        clock: Arc<dyn Clock>,
        metrics: Option<Arc<Metrics>>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let evaluator =
            TimeframeEvaluator::new(config.fast_period, config.slow_period, config.atr_period)?;
        let aggregator = ConsensusAggregator::new(
            config.confidence_threshold,
            config.leverage_tiers.clone(),
            config.timeframes.clone(),
        );
        let planner = TradePlanner::new(PlannerConfig {
            anchor: config.anchor_timeframe,
            capital_fraction: config.capital_fraction,
            multipliers: config.range_multipliers,
            liquidation_buffer: config.liquidation_buffer,
            yield_model: config.yield_model,
            timeframes: config.timeframes.clone(),
        });
        let gate = TriggerGate::new(
            config.confidence_threshold,
            config.cooldown_seconds,
            clock.clone(),
        );

        let mut dispatcher = ActionDispatcher::new(
            DispatcherConfig {
                symbol: config.symbol.clone(),
                execution_enabled: config.execution_enabled,
                notify_retries: config.notify_retries,
                activity_log_capacity: config.activity_log_capacity,
                ..DispatcherConfig::default()
            },
            sink,
            venue,
        );
        if let Some(metrics) = &metrics {
            dispatcher = dispatcher.with_metrics(metrics.clone());
        }

        Ok(Self {
            config: RuntimeConfig {
                timeframes: config.timeframes.clone(),
                fetch_timeout: Duration::from_secs(config.fetch_timeout_seconds),
                auto_trigger: config.auto_trigger,
            },
            provider,
            evaluator,
            aggregator,
            planner,
            vault: Arc::new(SignalVault::new(clock.now())),
            gate: Arc::new(gate),
            dispatcher: Arc::new(dispatcher),
            clock,
            metrics,
            latest: RwLock::new(None),
        })
    }

    pub fn vault(&self) -> &Arc<SignalVault> {
        &self.vault
    }

    pub fn gate(&self) -> &Arc<TriggerGate> {
        &self.gate
    }

    pub fn dispatcher(&self) -> &Arc<ActionDispatcher> {
        &self.dispatcher
    }

    pub fn timeframes(&self) -> &[Timeframe] {
        &self.config.timeframes
    }

    /// Consensus of the last committed cycle, if any cycle has run.
    pub async fn latest_consensus(&self) -> Option<ConsensusResult> {
        self.latest.read().await.clone()
    }

    /// Run one poll cycle.
    ///
    /// Fetches run concurrently, each bounded by the fetch timeout. A failed
    /// or timed-out timeframe keeps its previous vault entry; nothing here
    /// aborts the cycle. Returns `Skipped` when another cycle is in flight.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(guard) = self.vault.begin_cycle() else {
            warn!("SignalRuntime: previous cycle still running, dropping tick");
            if let Some(metrics) = &self.metrics {
                metrics.cycles_skipped_total.inc();
            }
            return CycleOutcome::Skipped;
        };
        let started = Instant::now();

        let results = join_all(self.config.timeframes.iter().map(|&tf| self.fetch_one(tf))).await;

        let mut staged: HashMap<Timeframe, TimeframeSignal> = HashMap::new();
        let mut failed = Vec::new();
        for (timeframe, result) in results {
            match result {
                Ok(signal) => {
                    staged.insert(timeframe, signal);
                }
                Err(e) => {
                    warn!(
                        timeframe = %timeframe,
                        error = %e,
                        "SignalRuntime: keeping previous {} signal: {}",
                        timeframe,
                        e
                    );
                    if let Some(metrics) = &self.metrics {
                        metrics
                            .fetch_failures_total
                            .with_label_values(&[timeframe.as_str()])
                            .inc();
                    }
                    failed.push(FetchFailure {
                        timeframe,
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut refreshed: Vec<Timeframe> = staged.keys().copied().collect();
        refreshed.sort();
        let mut unavailable: Vec<Timeframe> = staged
            .values()
            .filter(|s| s.direction == Direction::Unavailable)
            .map(|s| s.timeframe)
            .collect();
        unavailable.sort();

        let snapshot = self
            .vault
            .stage_and_commit(guard, staged, self.clock.now())
            .await;

        let consensus = self.aggregator.aggregate(&snapshot);
        *self.latest.write().await = Some(consensus.clone());

        info!(
            cycle = snapshot.cycle,
            long = consensus.long_votes,
            short = consensus.short_votes,
            confidence = consensus.confidence,
            bias = ?consensus.bias,
            leverage = consensus.leverage_tier,
            "SignalRuntime: cycle {} consensus {:?} {}/{}",
            snapshot.cycle,
            consensus.bias,
            consensus.confidence,
            Timeframe::ALL.len()
        );

        let trigger = if self.config.auto_trigger {
            Some(self.fire(&consensus, &snapshot, FireOrigin::Auto, None).await)
        } else {
            None
        };

        if let Some(metrics) = &self.metrics {
            metrics.cycles_total.inc();
            metrics.unavailable_signals_total.inc_by(unavailable.len() as u64);
            metrics.consensus_confidence.set(consensus.confidence as f64);
            metrics
                .cycle_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        CycleOutcome::Completed(CycleReport {
            cycle: snapshot.cycle,
            refreshed,
            failed,
            unavailable,
            consensus,
            trigger,
        })
    }

    /// Operator-requested fire against the current vault snapshot.
    ///
    /// Goes through the same planner, gate and dispatcher as the automatic
    /// path, so it is subject to the same threshold, price condition and
    /// cooldown.
    pub async fn manual_fire(&self, entry_override: Option<f64>) -> TriggerOutcome {
        let snapshot = self.vault.snapshot().await;
        let consensus = self.aggregator.aggregate(&snapshot);
        self.fire(&consensus, &snapshot, FireOrigin::Manual, entry_override)
            .await
    }

    async fn fetch_one(
        &self,
        timeframe: Timeframe,
    ) -> (Timeframe, Result<TimeframeSignal, EngineError>) {
        let judged = tokio::time::timeout(
            self.config.fetch_timeout,
            self.evaluator
                .judge(self.provider.as_ref(), timeframe, self.clock.as_ref()),
        )
        .await;

        let result = match judged {
            Ok(result) => result,
            Err(_) => Err(EngineError::data_unavailable(
                timeframe,
                format!("fetch timed out after {:?}", self.config.fetch_timeout),
            )),
        };
        (timeframe, result)
    }

    async fn fire(
        &self,
        consensus: &ConsensusResult,
        snapshot: &VaultSnapshot,
        origin: FireOrigin,
        entry_override: Option<f64>,
    ) -> TriggerOutcome {
        let plan = match self.planner.plan(
            consensus,
            snapshot,
            origin,
            entry_override,
            self.clock.now(),
        ) {
            Ok(plan) => plan,
            Err(reason) => {
                debug!(
                    reason = %reason,
                    "SignalRuntime: no {:?} action planned: {}",
                    origin,
                    reason
                );
                return TriggerOutcome::NotPlanned(reason);
            }
        };

        match self
            .gate
            .try_fire(consensus, &plan.request, plan.current_price)
            .await
        {
            GateDecision::Fired { .. } => {
                if let Some(metrics) = &self.metrics {
                    let origin_label = match origin {
                        FireOrigin::Auto => "auto",
                        FireOrigin::Manual => "manual",
                    };
                    let side_label = plan.request.side.to_string();
                    metrics
                        .fires_total
                        .with_label_values(&[side_label.as_str(), origin_label])
                        .inc();
                }
                TriggerOutcome::Fired(self.dispatcher.dispatch(&plan.request).await)
            }
            GateDecision::Rejected(rejection) => {
                if let Some(metrics) = &self.metrics {
                    metrics
                        .fires_suppressed_total
                        .with_label_values(&[rejection.label()])
                        .inc();
                }
                TriggerOutcome::Rejected(rejection)
            }
        }
    }
}
