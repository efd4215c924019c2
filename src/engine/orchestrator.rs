use std::fmt;
use std::sync::Arc;

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use tracing::{info, warn};

use super::aggregator::apply_slippage_buffer;
use super::components::ComponentSource;
use super::error::{IssuanceError, IssuanceResult};
use super::planner::QuotePlanner;
use super::types::{IssuancePlan, IssuanceRequest};
use crate::config::PaymentMode;
use crate::lander::{GasSettings, IssuanceCall, IssuanceLander, IssuanceReceipt, LanderError};

/// 一次发行尝试经历的阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssuanceState {
    Idle,
    EnumeratingComponents,
    PlanningQuotes,
    AggregatingInput,
    EstimatingGas,
    AwaitingConfirmation,
    Submitting,
    WaitingForFinality,
    Done,
    Aborted,
    Failed,
}

/// 预估 gas 上浮 20%：`estimate * 6 / 5`。
pub fn padded_gas_limit(estimate: u64) -> u64 {
    let padded = u128::from(estimate) * 6 / 5;
    u64::try_from(padded).unwrap_or(u64::MAX)
}

/// 提交前展示给操作者的发行摘要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceSummary {
    pub set_token: Address,
    pub payment: PaymentMode,
    pub input_token: Address,
    pub issuer: Address,
    pub set_amount: U256,
    pub max_input_amount: U256,
    pub component_count: usize,
    pub swap_count: usize,
    pub gas_price: u128,
    /// 授权尚未完成时无法预估发行交易的 gas。
    pub gas_estimate: Option<u64>,
    pub gas_limit: Option<u64>,
    pub approval_required: bool,
}

impl IssuanceSummary {
    pub fn gas_cost_estimate(&self) -> Option<U256> {
        self.gas_estimate
            .map(|gas| U256::from(gas) * U256::from(self.gas_price))
    }

    pub fn gas_cost_limit(&self) -> Option<U256> {
        self.gas_limit
            .map(|gas| U256::from(gas) * U256::from(self.gas_price))
    }
}

impl fmt::Display for IssuanceSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let payment = match self.payment {
            PaymentMode::Eth => "ETH".to_string(),
            PaymentMode::Token => self.input_token.to_string(),
        };
        let gas_price = format_units(U256::from(self.gas_price), "gwei")
            .unwrap_or_else(|_| self.gas_price.to_string());
        writeln!(f, "发行参数:")?;
        writeln!(f, "  setToken:        {}", self.set_token)?;
        writeln!(f, "  paymentToken:    {payment}")?;
        writeln!(f, "  issuer:          {}", self.issuer)?;
        writeln!(f, "  setAmount:       {}", format_ether(self.set_amount))?;
        writeln!(f, "  maxInputAmount:  {}", format_ether(self.max_input_amount))?;
        writeln!(
            f,
            "  quotes:          {} 个成分，其中 {} 个需要兑换",
            self.component_count, self.swap_count
        )?;
        writeln!(f, "  gasPrice:        {gas_price} gwei")?;
        match (self.gas_cost_estimate(), self.gas_cost_limit()) {
            (Some(estimate), Some(limit)) => {
                writeln!(f, "  gasCostEstimate: {} ETH", format_ether(estimate))?;
                write!(f, "  gasCostLimit:    {} ETH", format_ether(limit))?;
            }
            _ => write!(f, "  gasCostEstimate: 授权完成后重新预估")?,
        }
        if self.approval_required {
            write!(f, "\n  approval:        需要先授权 {} 给 ExchangeIssuance", payment)?;
        }
        Ok(())
    }
}

/// 人工确认端口；返回 `false` 表示放弃。
#[async_trait]
pub trait Confirmation: Send + Sync {
    async fn confirm(&self, summary: &IssuanceSummary) -> IssuanceResult<bool>;
}

/// 发行前后余额变化。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    /// ETH 支付时包含手续费；代币支付时为代币花费。
    pub input_spent: U256,
    pub set_obtained: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuanceReport {
    pub receipt: IssuanceReceipt,
    pub approval: Option<IssuanceReceipt>,
    pub gas: GasSettings,
    pub balances: BalanceDelta,
}

impl IssuanceReport {
    /// 发行交易手续费加上授权交易手续费（若有）。
    pub fn total_fee(&self) -> U256 {
        self.receipt.fee()
            + self
                .approval
                .as_ref()
                .map(IssuanceReceipt::fee)
                .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    Completed(IssuanceReport),
    /// 操作者在确认环节拒绝，没有提交发行交易。
    /// 代币支付在第二次确认被拒时，授权交易已经上链，回执保留在 `approval` 中。
    Aborted { approval: Option<IssuanceReceipt> },
}

struct BalanceSnapshot {
    input: U256,
    set: U256,
}

/// 串联成分查询、报价规划、滑点缓冲、gas 预估、人工确认与提交。
pub struct IssuanceOrchestrator {
    components: Arc<dyn ComponentSource>,
    planner: QuotePlanner,
    state: IssuanceState,
    history: Vec<IssuanceState>,
}

impl IssuanceOrchestrator {
    pub fn new(components: Arc<dyn ComponentSource>, planner: QuotePlanner) -> Self {
        Self {
            components,
            planner,
            state: IssuanceState::Idle,
            history: vec![IssuanceState::Idle],
        }
    }

    pub fn state(&self) -> IssuanceState {
        self.state
    }

    pub fn history(&self) -> &[IssuanceState] {
        &self.history
    }

    fn transition(&mut self, next: IssuanceState) {
        info!(
            target: "engine::orchestrator",
            from = ?self.state,
            to = ?next,
            "发行状态切换"
        );
        self.state = next;
        self.history.push(next);
    }

    fn fail<T>(&mut self, err: IssuanceError) -> IssuanceResult<T> {
        warn!(
            target: "engine::orchestrator",
            state = ?self.state,
            error = %err.describe(),
            "发行流程失败"
        );
        self.transition(IssuanceState::Failed);
        Err(err)
    }

    /// 生成发行计划；任何阶段失败都不会产生链上写入。
    pub async fn plan_issuance(&mut self, request: &IssuanceRequest) -> IssuanceResult<IssuancePlan> {
        if request.slippage_percents >= 100 {
            return self.fail(IssuanceError::DivisionByZeroOrNegative {
                slippage_percents: request.slippage_percents,
            });
        }

        self.transition(IssuanceState::EnumeratingComponents);
        let enumerated = self
            .components
            .required_components(
                request.issuance_module,
                request.is_debt_issuance,
                request.set_token,
                request.set_amount,
            )
            .await;
        let requirements = match enumerated {
            Ok(requirements) => requirements,
            Err(err) => return self.fail(err),
        };

        self.transition(IssuanceState::PlanningQuotes);
        let planned = self
            .planner
            .plan_positions(
                &requirements,
                request.input_token,
                request.slippage_percents,
                request.excluded_sources.as_deref(),
            )
            .await;
        let planned = match planned {
            Ok(planned) => planned,
            Err(err) => return self.fail(err),
        };

        self.transition(IssuanceState::AggregatingInput);
        let input_token_amount = match apply_slippage_buffer(planned.raw_total, request.slippage_percents) {
            Ok(amount) => amount,
            Err(err) => return self.fail(err),
        };

        info!(
            target: "engine::orchestrator",
            set_token = %request.set_token,
            components = requirements.len(),
            raw_input = %planned.raw_total,
            input_amount = %input_token_amount,
            slippage_percents = request.slippage_percents,
            "发行计划已生成"
        );

        Ok(IssuancePlan {
            set_token: request.set_token,
            set_amount: request.set_amount,
            input_token: request.input_token,
            issuance_module: request.issuance_module,
            is_debt_issuance: request.is_debt_issuance,
            requirements,
            position_quotes: planned.position_quotes,
            raw_input_amount: planned.raw_total,
            input_token_amount,
            slippage_percents: request.slippage_percents,
        })
    }

    /// 预估 gas、等待确认、提交并等待最终确认后报告余额变化。
    pub async fn execute_issuance(
        &mut self,
        plan: &IssuancePlan,
        payment: PaymentMode,
        lander: &dyn IssuanceLander,
        confirmation: &dyn Confirmation,
    ) -> IssuanceResult<IssuanceOutcome> {
        let result = self.run_execution(plan, payment, lander, confirmation).await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(err) => self.fail(err),
        }
    }

    async fn run_execution(
        &mut self,
        plan: &IssuancePlan,
        payment: PaymentMode,
        lander: &dyn IssuanceLander,
        confirmation: &dyn Confirmation,
    ) -> IssuanceResult<IssuanceOutcome> {
        let call = IssuanceCall::from_plan(plan, payment);
        let spender = lander.exchange_issuance();

        self.transition(IssuanceState::EstimatingGas);
        let gas_price = lander.gas_price().await.map_err(lander_error)?;
        let approval_required = match payment {
            PaymentMode::Eth => false,
            PaymentMode::Token => {
                let allowance = lander
                    .allowance(plan.input_token, spender)
                    .await
                    .map_err(lander_error)?;
                allowance < plan.input_token_amount
            }
        };
        let gas_estimate = if approval_required {
            None
        } else {
            Some(lander.estimate_gas(&call).await.map_err(lander_error)?)
        };

        let mut summary = IssuanceSummary {
            set_token: plan.set_token,
            payment,
            input_token: plan.input_token,
            issuer: lander.issuer(),
            set_amount: plan.set_amount,
            max_input_amount: plan.input_token_amount,
            component_count: plan.position_quotes.len(),
            swap_count: plan.swap_count(),
            gas_price,
            gas_estimate,
            gas_limit: gas_estimate.map(padded_gas_limit),
            approval_required,
        };

        self.transition(IssuanceState::AwaitingConfirmation);
        if !confirmation.confirm(&summary).await? {
            info!(target: "engine::orchestrator", "操作者取消发行");
            self.transition(IssuanceState::Aborted);
            return Ok(IssuanceOutcome::Aborted { approval: None });
        }

        let mut approval = None;
        if approval_required {
            self.transition(IssuanceState::Submitting);
            let receipt = lander
                .approve(plan.input_token, spender, plan.input_token_amount)
                .await
                .map_err(lander_error)?;
            approval = Some(receipt);

            self.transition(IssuanceState::EstimatingGas);
            let estimate = lander.estimate_gas(&call).await.map_err(lander_error)?;
            summary.gas_estimate = Some(estimate);
            summary.gas_limit = Some(padded_gas_limit(estimate));
            summary.approval_required = false;

            self.transition(IssuanceState::AwaitingConfirmation);
            if !confirmation.confirm(&summary).await? {
                if let Some(receipt) = approval.as_ref() {
                    warn!(
                        target: "engine::orchestrator",
                        approval_tx = %receipt.tx_hash,
                        token = %plan.input_token,
                        amount = %plan.input_token_amount,
                        "授权已上链，操作者取消发行"
                    );
                }
                self.transition(IssuanceState::Aborted);
                return Ok(IssuanceOutcome::Aborted { approval });
            }
        }

        let gas_limit = summary
            .gas_limit
            .ok_or_else(|| IssuanceError::Internal("gas limit missing after estimation".to_string()))?;
        let gas = GasSettings {
            gas_limit,
            gas_price,
        };

        let before = snapshot(lander, plan, payment).await?;

        self.transition(IssuanceState::Submitting);
        let tx_hash = lander.submit(&call, gas).await.map_err(lander_error)?;

        self.transition(IssuanceState::WaitingForFinality);
        let receipt = lander.wait_for_finality(tx_hash).await.map_err(lander_error)?;
        if !receipt.success {
            return Err(IssuanceError::TransactionReverted {
                tx_hash: receipt.tx_hash,
            });
        }

        let after = snapshot(lander, plan, payment).await?;
        let balances = BalanceDelta {
            input_spent: before.input.saturating_sub(after.input),
            set_obtained: after.set.saturating_sub(before.set),
        };

        info!(
            target: "engine::orchestrator",
            tx_hash = %receipt.tx_hash,
            fee = %format_ether(receipt.fee()),
            input_spent = %format_ether(balances.input_spent),
            set_obtained = %format_ether(balances.set_obtained),
            "发行完成"
        );

        self.transition(IssuanceState::Done);
        Ok(IssuanceOutcome::Completed(IssuanceReport {
            receipt,
            approval,
            gas,
            balances,
        }))
    }
}

async fn snapshot(
    lander: &dyn IssuanceLander,
    plan: &IssuancePlan,
    payment: PaymentMode,
) -> IssuanceResult<BalanceSnapshot> {
    let owner = lander.issuer();
    let input = match payment {
        PaymentMode::Eth => lander.native_balance(owner).await,
        PaymentMode::Token => lander.token_balance(plan.input_token, owner).await,
    }
    .map_err(lander_error)?;
    let set = lander
        .token_balance(plan.set_token, owner)
        .await
        .map_err(lander_error)?;
    Ok(BalanceSnapshot { input, set })
}

fn lander_error(err: LanderError) -> IssuanceError {
    match err {
        LanderError::InsufficientFunds(message) => IssuanceError::InsufficientAllowanceOrBalance(message),
        other => IssuanceError::Lander(other),
    }
}
