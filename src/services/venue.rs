//! Order submission venues

use crate::error::EngineError;
use crate::models::signal::Side;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::info;

pub type OrderId = String;

#[async_trait::async_trait]
pub trait TradeVenue: Send + Sync {
    async fn submit_order(
        &self,
        side: Side,
        capital_fraction: f64,
        leverage: f64,
    ) -> Result<OrderId, EngineError>;
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaperOrder {
    pub order_id: OrderId,
    pub side: Side,
    pub capital_fraction: f64,
    pub leverage: f64,
}

/// Records orders in memory without touching an exchange.
#[derive(Debug, Default)]
pub struct PaperTradeVenue {
    next_id: AtomicU64,
    orders: RwLock<Vec<PaperOrder>>,
}

impl PaperTradeVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn orders(&self) -> Vec<PaperOrder> {
        self.orders.read().await.clone()
    }
}

#[async_trait::async_trait]
impl TradeVenue for PaperTradeVenue {
    async fn submit_order(
        &self,
        side: Side,
        capital_fraction: f64,
        leverage: f64,
    ) -> Result<OrderId, EngineError> {
        if !(capital_fraction > 0.0 && capital_fraction <= 1.0) {
            return Err(EngineError::ExecutionFailure(format!(
                "capital fraction {} outside (0, 1]",
                capital_fraction
            )));
        }
        if !(leverage > 0.0) {
            return Err(EngineError::ExecutionFailure(format!(
                "leverage {} must be > 0",
                leverage
            )));
        }

        let seq = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order_id = format!("paper-{:06}", seq);
        self.orders.write().await.push(PaperOrder {
            order_id: order_id.clone(),
            side,
            capital_fraction,
            leverage,
        });

        info!(
            order_id = %order_id,
            side = %side,
            leverage = leverage,
            capital_fraction = capital_fraction,
            "PaperTradeVenue: accepted {} {}x order {}",
            side,
            leverage,
            order_id
        );
        Ok(order_id)
    }
}
