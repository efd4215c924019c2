use alloy::primitives::{Address, TxHash};
use thiserror::Error;

use crate::api::zeroex::ZeroExError;
use crate::lander::LanderError;

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("查询发行成分失败: {0}")]
    ComponentQuery(String),
    #[error("成分 {component} 无法获取报价: {source}")]
    QuoteUnavailable {
        component: Address,
        #[source]
        source: ZeroExError,
    },
    #[error("滑点 {slippage_percents}% 会导致除以零或负数，必须小于 100")]
    DivisionByZeroOrNegative { slippage_percents: u8 },
    #[error("输入金额计算溢出: {0}")]
    AmountOverflow(String),
    #[error("余额或授权不足: {0}")]
    InsufficientAllowanceOrBalance(String),
    #[error("交易 {tx_hash} 已上链但执行失败，需要重新规划")]
    TransactionReverted { tx_hash: TxHash },
    #[error("交易落地失败: {0}")]
    Lander(#[from] LanderError),
    #[error("确认环节失败: {0}")]
    Confirmation(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl IssuanceError {
    pub fn describe(&self) -> String {
        use std::error::Error as _;
        let mut parts = vec![self.to_string()];
        let mut current = self.source();
        while let Some(err) = current {
            let text = err.to_string();
            if parts.last().map(|last| last == &text).unwrap_or(false) {
                current = err.source();
                continue;
            }
            parts.push(text);
            current = err.source();
        }
        parts.join(" | caused by: ")
    }
}

pub type IssuanceResult<T> = Result<T, IssuanceError>;
