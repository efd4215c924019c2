use alloy::primitives::{Address, U256};
use alloy::providers::DynProvider;
use async_trait::async_trait;
use tracing::{debug, warn};

use super::error::{IssuanceError, IssuanceResult};
use super::types::ComponentRequirement;
use crate::chain::contracts::IExchangeIssuanceZeroEx;

/// 查询铸造所需成分的只读端口。
#[async_trait]
pub trait ComponentSource: Send + Sync {
    async fn required_components(
        &self,
        issuance_module: Address,
        is_debt_issuance: bool,
        set_token: Address,
        set_amount: U256,
    ) -> IssuanceResult<Vec<ComponentRequirement>>;
}

/// 通过 ExchangeIssuanceZeroEx 合约的 `getRequiredIssuanceComponents` 查询。
#[derive(Clone)]
pub struct OnchainComponentSource {
    provider: DynProvider,
    exchange_issuance: Address,
}

impl OnchainComponentSource {
    pub fn new(provider: DynProvider, exchange_issuance: Address) -> Self {
        Self {
            provider,
            exchange_issuance,
        }
    }
}

#[async_trait]
impl ComponentSource for OnchainComponentSource {
    async fn required_components(
        &self,
        issuance_module: Address,
        is_debt_issuance: bool,
        set_token: Address,
        set_amount: U256,
    ) -> IssuanceResult<Vec<ComponentRequirement>> {
        let contract = IExchangeIssuanceZeroEx::new(self.exchange_issuance, &self.provider);
        let result = contract
            .getRequiredIssuanceComponents(issuance_module, is_debt_issuance, set_token, set_amount)
            .call()
            .await
            .map_err(|err| {
                warn!(
                    target: "engine::components",
                    %issuance_module,
                    %set_token,
                    error = %err,
                    "查询发行成分失败"
                );
                IssuanceError::ComponentQuery(err.to_string())
            })?;

        let requirements = zip_requirements(result.components, result.positions)?;
        debug!(
            target: "engine::components",
            %set_token,
            components = requirements.len(),
            "已获取发行成分"
        );
        Ok(requirements)
    }
}

/// 合约返回两个平行数组，长度不一致视为畸形响应。
pub fn zip_requirements(
    components: Vec<Address>,
    positions: Vec<U256>,
) -> IssuanceResult<Vec<ComponentRequirement>> {
    if components.len() != positions.len() {
        return Err(IssuanceError::ComponentQuery(format!(
            "成分数量 {} 与数量数组长度 {} 不一致",
            components.len(),
            positions.len()
        )));
    }
    Ok(components
        .into_iter()
        .zip(positions)
        .map(|(component, required_units)| ComponentRequirement {
            component,
            required_units,
        })
        .collect())
}
