//! Core engines: settlement, P&L replay, budget guard, outbound events.

pub mod budget;
pub mod events;
pub mod replay;
pub mod settlement;

pub use budget::{clamp_buy_proposals, BuyProposal, MIN_ALLOCATION};
pub use events::{ChannelEventSink, LogEventSink, PositionEventSink, PositionsChanged};
pub use replay::{replay, ProfitAnalyzer};
pub use settlement::{SettlementEngine, SettlementReport};
