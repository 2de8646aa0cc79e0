//! Realtime event and channel model.
//!
//! Events are a closed tagged union: every variant belongs to exactly one
//! channel and carries its own payload. The matches below are exhaustive,
//! so adding a channel is a compile-time-checked change everywhere the hub
//! dispatches on it.

use serde::{Deserialize, Serialize};

/// Named category of realtime events a connection can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Signals,
    Portfolio,
    Trades,
    RiskAlerts,
    Prices,
}

impl Channel {
    pub const ALL: [Self; 5] = [
        Self::Signals,
        Self::Portfolio,
        Self::Trades,
        Self::RiskAlerts,
        Self::Prices,
    ];

    /// Channel name as it appears in `subscribe:<channel>` frames.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Signals => "signals",
            Self::Portfolio => "portfolio",
            Self::Trades => "trades",
            Self::RiskAlerts => "risk-alerts",
            Self::Prices => "prices",
        }
    }

    /// Parse a channel name. Unknown names yield `None`; the hub accepts
    /// them without error but they can never receive events.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "signals" => Some(Self::Signals),
            "portfolio" => Some(Self::Portfolio),
            "trades" => Some(Self::Trades),
            "risk-alerts" => Some(Self::RiskAlerts),
            "prices" => Some(Self::Prices),
            _ => None,
        }
    }

    /// How many recent events the hub retains for backlog snapshots on
    /// (re)subscribe. Zero disables replay for the channel.
    pub const fn replay_capacity(self) -> usize {
        match self {
            Self::Signals => 20,
            Self::Trades => 10,
            Self::RiskAlerts => 5,
            Self::Portfolio | Self::Prices => 0,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// A signal produced by one of the strategy engines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    pub engine: String,
    pub side: String,
    pub symbol: String,
    pub confidence: f64,
    pub price: f64,
    pub reasoning: String,
    pub strength: String,
    pub timeframe: String,
    pub expected_return: f64,
    pub timestamp: i64,
}

/// Aggregate portfolio valuation delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioPayload {
    pub total_value: f64,
    pub daily_pnl: f64,
    /// Open positions as reported by the producer; the hub does not
    /// interpret them.
    pub positions: serde_json::Value,
    pub timestamp: i64,
}

/// A trade executed by an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradePayload {
    pub engine: String,
    pub symbol: String,
    pub side: String,
    pub amount: f64,
    pub price: f64,
    pub profit_loss: f64,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub timestamp: i64,
}

/// Risk engine alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAlertPayload {
    pub level: String,
    pub message: String,
    pub source: String,
    pub timestamp: i64,
}

/// Market price tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePayload {
    pub symbol: String,
    pub price: f64,
    pub change_24h: f64,
    pub timestamp: i64,
}

/// Tagged union of everything the hub can deliver. Serializes directly as
/// the server frame `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    #[serde(rename = "trading:signal")]
    TradingSignal(SignalPayload),
    #[serde(rename = "portfolio:update")]
    PortfolioUpdate(PortfolioPayload),
    #[serde(rename = "trade_executed")]
    TradeExecuted(TradePayload),
    #[serde(rename = "risk_alert")]
    RiskAlert(RiskAlertPayload),
    #[serde(rename = "price_update")]
    PriceUpdate(PricePayload),
}

impl Event {
    /// The channel this event is published on.
    pub const fn channel(&self) -> Channel {
        match self {
            Self::TradingSignal(_) => Channel::Signals,
            Self::PortfolioUpdate(_) => Channel::Portfolio,
            Self::TradeExecuted(_) => Channel::Trades,
            Self::RiskAlert(_) => Channel::RiskAlerts,
            Self::PriceUpdate(_) => Channel::Prices,
        }
    }

    /// Server frame name delivered to clients.
    pub const fn frame_name(&self) -> &'static str {
        match self {
            Self::TradingSignal(_) => "trading:signal",
            Self::PortfolioUpdate(_) => "portfolio:update",
            Self::TradeExecuted(_) => "trade_executed",
            Self::RiskAlert(_) => "risk_alert",
            Self::PriceUpdate(_) => "price_update",
        }
    }
}
