//! 发行交易的落地：gas 预估、授权、提交与等待确认。

pub mod call;
pub mod error;
pub mod rpc;

use alloy::primitives::{Address, TxHash, U256};
use async_trait::async_trait;

pub use call::IssuanceCall;
pub use error::LanderError;
pub use rpc::RpcLander;

/// 实际提交时使用的 gas 参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasSettings {
    pub gas_limit: u64,
    pub gas_price: u128,
}

/// 交易上链后的摘要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub gas_used: u64,
    pub effective_gas_price: u128,
    pub success: bool,
}

impl IssuanceReceipt {
    pub fn fee(&self) -> U256 {
        U256::from(self.gas_used) * U256::from(self.effective_gas_price)
    }
}

/// 编排器依赖的链上写入端口。
#[async_trait]
pub trait IssuanceLander: Send + Sync {
    fn issuer(&self) -> Address;

    fn exchange_issuance(&self) -> Address;

    async fn gas_price(&self) -> Result<u128, LanderError>;

    async fn estimate_gas(&self, call: &IssuanceCall) -> Result<u64, LanderError>;

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, LanderError>;

    /// 提交授权并等待确认。
    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<IssuanceReceipt, LanderError>;

    async fn submit(&self, call: &IssuanceCall, gas: GasSettings) -> Result<TxHash, LanderError>;

    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<IssuanceReceipt, LanderError>;

    async fn native_balance(&self, owner: Address) -> Result<U256, LanderError>;

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, LanderError>;
}
