//! Trade planning: entry trigger, take profit and stop loss from ATR ranges,
//! plus the sizing and fee-yield estimate shown with every alert.

use crate::error::EngineError;
use crate::models::action::{ActionRequest, FireOrigin, YieldEstimate};
use crate::models::signal::{Side, Timeframe};
use crate::signals::aggregation::ConsensusResult;
use crate::signals::vault::VaultSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// ATR multipliers for the recommended range, keyed by trade side.
///
/// Bearish markets get the wider range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeMultipliers {
    pub long: f64,
    pub short: f64,
}

impl Default for RangeMultipliers {
    fn default() -> Self {
        Self {
            long: 2.0,
            short: 3.0,
        }
    }
}

impl RangeMultipliers {
    pub fn for_side(&self, side: Side) -> f64 {
        match side {
            Side::Long => self.long,
            Side::Short => self.short,
        }
    }
}

/// Parses `"long,short"`, e.g. `"2.0,3.0"`.
impl FromStr for RangeMultipliers {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(|v| v.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| EngineError::config(format!("malformed range multipliers '{}'", s)))?;
        let [long, short] = values[..] else {
            return Err(EngineError::config(format!(
                "range multipliers need exactly two values, got '{}'",
                s
            )));
        };
        if [long, short].iter().any(|m| !(m.is_finite() && *m > 0.0)) {
            return Err(EngineError::config("range multipliers must be > 0"));
        }
        Ok(Self { long, short })
    }
}

/// Fee-yield heuristic for a position held inside the recommended range.
///
/// A range as wide as `reference_range_fraction` of the price earns
/// `daily_fee_rate` of the position per day; narrower ranges earn
/// proportionally more.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YieldModel {
    pub account_capital: f64,
    pub daily_fee_rate: f64,
    pub reference_range_fraction: f64,
}

impl Default for YieldModel {
    fn default() -> Self {
        Self {
            account_capital: 10_000.0,
            daily_fee_rate: 0.0018,
            reference_range_fraction: 0.4,
        }
    }
}

impl YieldModel {
    /// Notional size: the deployed share of the account times leverage.
    pub fn position_size(&self, capital_fraction: f64, leverage: f64) -> f64 {
        self.account_capital * capital_fraction * leverage
    }

    /// `None` for a zero-width range.
    pub fn estimate(
        &self,
        price: f64,
        position_size: f64,
        bands: RangeBands,
    ) -> Option<YieldEstimate> {
        let width = bands.high - bands.low;
        if !(width > 0.0) {
            return None;
        }
        let range_efficiency = price * self.reference_range_fraction / width;
        let daily = position_size * self.daily_fee_rate * range_efficiency;
        Some(YieldEstimate {
            range_efficiency,
            daily,
            weekly: daily * 7.0,
        })
    }
}

/// Recommended price range around the reference price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RangeBands {
    pub low: f64,
    pub high: f64,
}

impl RangeBands {
    pub fn around(price: f64, atr: f64, multiplier: f64) -> Self {
        Self {
            low: price - atr * multiplier,
            high: price + atr * multiplier,
        }
    }
}

/// Estimated liquidation price for a leveraged position; `None` at or below
/// 1x, where the position cannot be liquidated.
pub fn liquidation_price(side: Side, price: f64, leverage: f64, buffer: f64) -> Option<f64> {
    if leverage <= 1.0 {
        return None;
    }
    let distance = buffer / leverage;
    Some(match side {
        Side::Long => price * (1.0 - distance),
        Side::Short => price * (1.0 + distance),
    })
}

/// Why no action could be planned this time.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoPlan {
    #[error("consensus is neutral")]
    NeutralBias,
    #[error("anchor timeframe {timeframe} has no {missing} reading")]
    AnchorIncomplete {
        timeframe: Timeframe,
        missing: &'static str,
    },
    #[error("no fresh price available")]
    NoCurrentPrice,
}

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub anchor: Timeframe,
    pub capital_fraction: f64,
    pub multipliers: RangeMultipliers,
    pub liquidation_buffer: f64,
    pub yield_model: YieldModel,
    pub timeframes: Vec<Timeframe>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            anchor: Timeframe::D1,
            capital_fraction: 0.05,
            multipliers: RangeMultipliers::default(),
            liquidation_buffer: 0.45,
            yield_model: YieldModel::default(),
            timeframes: Timeframe::ALL.to_vec(),
        }
    }
}

/// A planned action plus the price it must be checked against.
#[derive(Debug, Clone, PartialEq)]
pub struct TradePlan {
    pub request: ActionRequest,
    pub current_price: f64,
}

pub struct TradePlanner {
    config: PlannerConfig,
}

impl TradePlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Latest price of the finest monitored timeframe that was refreshed in
    /// the snapshot's cycle and can vote.
    pub fn current_price(&self, snapshot: &VaultSnapshot) -> Option<f64> {
        self.config
            .timeframes
            .iter()
            .filter(|tf| !snapshot.is_stale(**tf))
            .map(|tf| snapshot.get(*tf))
            .filter(|signal| signal.direction.is_available())
            .find_map(|signal| signal.price)
    }

    /// Build the action for the consensus bias.
    ///
    /// The entry trigger is the anchor's fast average unless `entry_override`
    /// is given. Long plans take profit at the upper band and stop at the lower
    /// band; short plans mirror that.
    pub fn plan(
        &self,
        consensus: &ConsensusResult,
        snapshot: &VaultSnapshot,
        origin: FireOrigin,
        entry_override: Option<f64>,
        now: DateTime<Utc>,
    ) -> Result<TradePlan, NoPlan> {
        let side = consensus.bias.side().ok_or(NoPlan::NeutralBias)?;
        let anchor = snapshot.get(self.config.anchor);
        let incomplete = |missing| NoPlan::AnchorIncomplete {
            timeframe: self.config.anchor,
            missing,
        };

        let reference_price = anchor.price.ok_or_else(|| incomplete("price"))?;
        let atr = anchor.atr.ok_or_else(|| incomplete("ATR"))?;
        let entry_trigger = match entry_override {
            Some(entry) => entry,
            None => anchor.fast_average.ok_or_else(|| incomplete("fast average"))?,
        };
        let current_price = self.current_price(snapshot).ok_or(NoPlan::NoCurrentPrice)?;

        let multiplier = self.config.multipliers.for_side(side);
        let bands = RangeBands::around(reference_price, atr, multiplier);
        let (take_profit, stop_loss) = match side {
            Side::Long => (bands.high, bands.low),
            Side::Short => (bands.low, bands.high),
        };

        let liquidation = liquidation_price(
            side,
            reference_price,
            consensus.leverage_tier,
            self.config.liquidation_buffer,
        );
        let stop_beyond_liquidation = liquidation.is_some_and(|liq| match side {
            Side::Long => stop_loss < liq,
            Side::Short => stop_loss > liq,
        });
        if stop_beyond_liquidation {
            warn!(
                side = %side,
                stop_loss = stop_loss,
                liquidation = ?liquidation,
                "TradePlanner: stop loss {:.2} lies beyond liquidation",
                stop_loss
            );
        }

        let yield_model = &self.config.yield_model;
        let position_size =
            yield_model.position_size(self.config.capital_fraction, consensus.leverage_tier);
        let estimated_yield = yield_model.estimate(reference_price, position_size, bands);

        Ok(TradePlan {
            request: ActionRequest {
                side,
                leverage_tier: consensus.leverage_tier,
                capital_fraction: self.config.capital_fraction,
                entry_trigger,
                take_profit,
                stop_loss,
                confidence: consensus.confidence,
                reference_price,
                liquidation_price: liquidation,
                stop_beyond_liquidation,
                position_size,
                estimated_yield,
                origin,
                created_at: now,
            },
            current_price,
        })
    }
}
