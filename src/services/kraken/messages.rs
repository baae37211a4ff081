//! Kraken `/0/public/OHLC` response shapes

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

/// Top-level envelope. `result` maps the pair name to its rows and also holds
/// a `last` cursor, so it is kept loosely typed.
#[derive(Debug, Deserialize)]
pub struct OhlcResponse {
    #[serde(default)]
    pub error: Vec<String>,
    #[serde(default)]
    pub result: Option<HashMap<String, Value>>,
}

/// `[time, open, high, low, close, vwap, volume, count]`
#[derive(Debug, Clone, Deserialize)]
pub struct OhlcRow(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
);

impl OhlcResponse {
    /// Rows for the first pair in the result, ignoring the `last` cursor.
    pub fn rows(self) -> Result<Vec<OhlcRow>, String> {
        if !self.error.is_empty() {
            return Err(self.error.join("; "));
        }
        let result = self.result.ok_or_else(|| "response has no result".to_string())?;
        let (_, rows) = result
            .into_iter()
            .find(|(key, _)| key != "last")
            .ok_or_else(|| "response has no pair data".to_string())?;
        serde_json::from_value(rows).map_err(|e| format!("malformed OHLC rows: {}", e))
    }
}
