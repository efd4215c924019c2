use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::{DynProvider, PendingTransactionBuilder, Provider};
use alloy::rpc::types::{TransactionReceipt, TransactionRequest};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::call::IssuanceCall;
use super::error::LanderError;
use super::{GasSettings, IssuanceLander, IssuanceReceipt};
use crate::chain::contracts::IERC20;

/// 通过签名 provider 直接向节点提交交易。
#[derive(Clone)]
pub struct RpcLander {
    provider: DynProvider,
    issuer: Address,
    exchange_issuance: Address,
    required_confirmations: u64,
}

impl RpcLander {
    pub fn new(
        provider: DynProvider,
        issuer: Address,
        exchange_issuance: Address,
        required_confirmations: u64,
    ) -> Self {
        Self {
            provider,
            issuer,
            exchange_issuance,
            required_confirmations: required_confirmations.max(1),
        }
    }

    fn request_for(&self, call: &IssuanceCall) -> TransactionRequest {
        let mut request = TransactionRequest::default()
            .with_from(self.issuer)
            .with_to(self.exchange_issuance)
            .with_input(call.calldata());
        let value = call.value();
        if !value.is_zero() {
            request = request.with_value(value);
        }
        request
    }
}

fn summarize_receipt(receipt: &TransactionReceipt) -> IssuanceReceipt {
    IssuanceReceipt {
        tx_hash: receipt.transaction_hash,
        block_number: receipt.block_number,
        gas_used: receipt.gas_used,
        effective_gas_price: receipt.effective_gas_price,
        success: receipt.status(),
    }
}

#[async_trait]
impl IssuanceLander for RpcLander {
    fn issuer(&self) -> Address {
        self.issuer
    }

    fn exchange_issuance(&self) -> Address {
        self.exchange_issuance
    }

    async fn gas_price(&self) -> Result<u128, LanderError> {
        let price = self.provider.get_gas_price().await?;
        debug!(target: "lander::rpc", gas_price = price, "已获取 gas 价格");
        Ok(price)
    }

    async fn estimate_gas(&self, call: &IssuanceCall) -> Result<u64, LanderError> {
        let request = self.request_for(call);
        self.provider.estimate_gas(request).await.map_err(|err| {
            warn!(
                target: "lander::rpc",
                payment = ?call.payment(),
                error = %err,
                "发行交易 gas 预估失败"
            );
            LanderError::from(err).classify()
        })
    }

    async fn allowance(&self, token: Address, spender: Address) -> Result<U256, LanderError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.allowance(self.issuer, spender).call().await?)
    }

    async fn approve(
        &self,
        token: Address,
        spender: Address,
        amount: U256,
    ) -> Result<IssuanceReceipt, LanderError> {
        let erc20 = IERC20::new(token, &self.provider);
        let pending = erc20
            .approve(spender, amount)
            .from(self.issuer)
            .send()
            .await
            .map_err(|err| LanderError::from(err).classify())?;
        info!(
            target: "lander::rpc",
            tx_hash = %pending.tx_hash(),
            %token,
            %spender,
            amount = %amount,
            "授权交易已提交"
        );
        let receipt = pending
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await?;
        let summary = summarize_receipt(&receipt);
        if !summary.success {
            return Err(LanderError::fatal(format!(
                "approve transaction {} reverted",
                summary.tx_hash
            )));
        }
        Ok(summary)
    }

    async fn submit(&self, call: &IssuanceCall, gas: GasSettings) -> Result<TxHash, LanderError> {
        let request = self
            .request_for(call)
            .with_gas_limit(gas.gas_limit)
            .with_gas_price(gas.gas_price);
        let pending = self
            .provider
            .send_transaction(request)
            .await
            .map_err(|err| LanderError::from(err).classify())?;
        let tx_hash = *pending.tx_hash();
        info!(
            target: "lander::rpc",
            tx_hash = %tx_hash,
            gas_limit = gas.gas_limit,
            gas_price = gas.gas_price,
            "发行交易已提交"
        );
        Ok(tx_hash)
    }

    async fn wait_for_finality(&self, tx_hash: TxHash) -> Result<IssuanceReceipt, LanderError> {
        let receipt = PendingTransactionBuilder::new(self.provider.root().clone(), tx_hash)
            .with_required_confirmations(self.required_confirmations)
            .get_receipt()
            .await?;
        let summary = summarize_receipt(&receipt);
        info!(
            target: "lander::rpc",
            tx_hash = %summary.tx_hash,
            block_number = ?summary.block_number,
            gas_used = summary.gas_used,
            success = summary.success,
            "交易已确认"
        );
        Ok(summary)
    }

    async fn native_balance(&self, owner: Address) -> Result<U256, LanderError> {
        Ok(self.provider.get_balance(owner).await?)
    }

    async fn token_balance(&self, token: Address, owner: Address) -> Result<U256, LanderError> {
        let erc20 = IERC20::new(token, &self.provider);
        Ok(erc20.balanceOf(owner).call().await?)
    }
}
