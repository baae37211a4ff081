//! Vote-counting consensus across timeframes

use crate::error::EngineError;
use crate::models::signal::{Bias, Direction, Timeframe, TimeframeSignal};
use crate::signals::vault::VaultSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_CONFIDENCE_THRESHOLD: u8 = 4;

/// Monotonic map from confidence score to leverage multiplier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeverageTierMap {
    tiers: BTreeMap<u8, f64>,
}

impl Default for LeverageTierMap {
    fn default() -> Self {
        Self {
            tiers: BTreeMap::from([(4, 2.0), (5, 3.0), (6, 4.0), (7, 5.0), (8, 5.0)]),
        }
    }
}

impl LeverageTierMap {
    /// Build a tier map, rejecting empty maps, keys above the timeframe count,
    /// non-positive multipliers and multipliers that shrink as confidence
    /// grows.
    pub fn new(tiers: BTreeMap<u8, f64>) -> Result<Self, EngineError> {
        if tiers.is_empty() {
            return Err(EngineError::config("leverage tier map is empty"));
        }

        let max_votes = Timeframe::ALL.len() as u8;
        let mut previous: Option<f64> = None;
        for (&confidence, &multiplier) in &tiers {
            if confidence == 0 || confidence > max_votes {
                return Err(EngineError::config(format!(
                    "leverage tier key {} outside 1..={}",
                    confidence, max_votes
                )));
            }
            if !(multiplier.is_finite() && multiplier > 0.0) {
                return Err(EngineError::config(format!(
                    "leverage multiplier for confidence {} must be > 0, got {}",
                    confidence, multiplier
                )));
            }
            if let Some(prev) = previous {
                if multiplier < prev {
                    return Err(EngineError::config(format!(
                        "leverage tiers must not decrease: {}x at confidence {} after {}x",
                        multiplier, confidence, prev
                    )));
                }
            }
            previous = Some(multiplier);
        }

        Ok(Self { tiers })
    }

    /// Smallest confidence with a tier.
    pub fn min_confidence(&self) -> u8 {
        self.tiers.keys().next().copied().unwrap_or(u8::MAX)
    }

    /// Multiplier for the largest tier key not above `confidence`.
    pub fn lookup(&self, confidence: u8) -> Option<f64> {
        self.tiers
            .range(..=confidence)
            .next_back()
            .map(|(_, &multiplier)| multiplier)
    }
}

/// Parses `"4:2,5:3,6:4"`; an `x` suffix on the multiplier is accepted.
impl FromStr for LeverageTierMap {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tiers = BTreeMap::new();
        for pair in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                EngineError::config(format!("malformed leverage tier '{}'", pair))
            })?;
            let confidence: u8 = key.trim().parse().map_err(|_| {
                EngineError::config(format!("malformed leverage tier key '{}'", key))
            })?;
            let multiplier: f64 = value
                .trim()
                .trim_end_matches(['x', 'X'])
                .parse()
                .map_err(|_| {
                    EngineError::config(format!("malformed leverage multiplier '{}'", value))
                })?;
            if tiers.insert(confidence, multiplier).is_some() {
                return Err(EngineError::config(format!(
                    "duplicate leverage tier for confidence {}",
                    confidence
                )));
            }
        }
        Self::new(tiers)
    }
}

impl fmt::Display for LeverageTierMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .tiers
            .iter()
            .map(|(c, m)| format!("{}:{}x", c, m))
            .collect();
        f.write_str(&parts.join(","))
    }
}

/// Derived consensus for one vault snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsensusResult {
    pub long_votes: u8,
    pub short_votes: u8,
    /// Timeframes that could vote (not `Unavailable`).
    pub available: u8,
    pub confidence: u8,
    pub bias: Bias,
    /// Leverage multiplier; `0.0` means no action.
    pub leverage_tier: f64,
    pub cycle: u64,
}

impl ConsensusResult {
    pub fn is_actionable(&self) -> bool {
        self.bias != Bias::Neutral && self.leverage_tier > 0.0
    }
}

/// Reduces a vault snapshot to a confidence score, bias and leverage tier.
#[derive(Debug, Clone)]
pub struct ConsensusAggregator {
    threshold: u8,
    tiers: LeverageTierMap,
    timeframes: Vec<Timeframe>,
}

impl Default for ConsensusAggregator {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONFIDENCE_THRESHOLD,
            LeverageTierMap::default(),
            Timeframe::ALL.to_vec(),
        )
    }
}

impl ConsensusAggregator {
    pub fn new(threshold: u8, tiers: LeverageTierMap, timeframes: Vec<Timeframe>) -> Self {
        Self {
            threshold,
            tiers,
            timeframes,
        }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Count Long and Short votes, ignoring `Unavailable` signals.
    /// Returns `(long, short, available)`.
    pub fn tally<'a>(signals: impl IntoIterator<Item = &'a TimeframeSignal>) -> (u8, u8, u8) {
        signals
            .into_iter()
            .fold((0, 0, 0), |(long, short, available), signal| {
                match signal.direction {
                    Direction::Long => (long + 1, short, available + 1),
                    Direction::Short => (long, short + 1, available + 1),
                    Direction::Neutral => (long, short, available + 1),
                    Direction::Unavailable => (long, short, available),
                }
            })
    }

    /// Pure reduction of signals to a consensus.
    pub fn aggregate_signals<'a>(
        &self,
        signals: impl IntoIterator<Item = &'a TimeframeSignal>,
        cycle: u64,
    ) -> ConsensusResult {
        let (long_votes, short_votes, available) = Self::tally(signals);
        let confidence = long_votes.max(short_votes);

        let (bias, leverage_tier) = if confidence < self.threshold {
            (Bias::Neutral, 0.0)
        } else {
            match self.tiers.lookup(confidence) {
                Some(multiplier) if long_votes >= short_votes => (Bias::Long, multiplier),
                Some(multiplier) => (Bias::Short, multiplier),
                None => (Bias::Neutral, 0.0),
            }
        };

        ConsensusResult {
            long_votes,
            short_votes,
            available,
            confidence,
            bias,
            leverage_tier,
            cycle,
        }
    }

    /// Consensus over the monitored timeframes of a vault snapshot.
    pub fn aggregate(&self, snapshot: &VaultSnapshot) -> ConsensusResult {
        self.aggregate_signals(snapshot.signals_for(&self.timeframes), snapshot.cycle)
    }
}
