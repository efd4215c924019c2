use std::fmt;

use alloy::providers::PendingTransactionError;
use alloy::transports::{RpcError, TransportErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LanderError {
    #[error("RPC 请求失败: {0}")]
    Transport(#[from] RpcError<TransportErrorKind>),
    #[error("等待交易确认失败: {0}")]
    Pending(#[from] PendingTransactionError),
    #[error("合约调用失败: {0}")]
    Contract(#[from] alloy::contract::Error),
    #[error("余额或授权不足: {0}")]
    InsufficientFunds(String),
    #[error("{0}")]
    Fatal(String),
}

const INSUFFICIENT_MARKERS: &[&str] = &[
    "insufficient funds",
    "exceeds balance",
    "exceeds allowance",
    "insufficient allowance",
    "insufficient balance",
];

impl LanderError {
    pub fn fatal(reason: impl fmt::Display) -> Self {
        Self::Fatal(reason.to_string())
    }

    /// 节点在预估或提交阶段拒绝余额/授权不足的交易，按错误文本归类。
    pub fn classify(self) -> Self {
        let text = self.to_string().to_ascii_lowercase();
        if matches!(self, LanderError::InsufficientFunds(_)) {
            return self;
        }
        if INSUFFICIENT_MARKERS.iter().any(|marker| text.contains(marker)) {
            return LanderError::InsufficientFunds(self.to_string());
        }
        self
    }
}
