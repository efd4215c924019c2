//! 发行编排核心：成分查询、报价规划、滑点缓冲与交易执行。

mod aggregator;
mod components;
mod error;
mod orchestrator;
pub(crate) mod planner;
mod quote;
mod types;

pub use components::{ComponentSource, OnchainComponentSource};
pub use error::{IssuanceError, IssuanceResult};
pub use orchestrator::{Confirmation, IssuanceOrchestrator, IssuanceOutcome, IssuanceSummary};
pub use planner::QuotePlanner;
pub use quote::ZeroExQuoter;
pub use types::{ComponentRequirement, IssuancePlan, IssuanceRequest, PositionQuote};
