use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolCall;

use crate::chain::contracts::IExchangeIssuanceZeroEx;
use crate::config::PaymentMode;
use crate::engine::IssuancePlan;

/// ExchangeIssuanceZeroEx 上的一次发行调用。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceCall {
    /// `issueExactSetFromETH`，输入金额作为交易 value 附带。
    FromEth {
        set_token: Address,
        set_amount: U256,
        component_quotes: Vec<Bytes>,
        issuance_module: Address,
        is_debt_issuance: bool,
        value: U256,
    },
    /// `issueExactSetFromToken`，输入金额作为最大可花费数量，需要预先授权。
    FromToken {
        set_token: Address,
        input_token: Address,
        set_amount: U256,
        max_input_amount: U256,
        component_quotes: Vec<Bytes>,
        issuance_module: Address,
        is_debt_issuance: bool,
    },
}

impl IssuanceCall {
    pub fn from_plan(plan: &IssuancePlan, payment: PaymentMode) -> Self {
        let component_quotes = plan.encoded_quotes();
        match payment {
            PaymentMode::Eth => IssuanceCall::FromEth {
                set_token: plan.set_token,
                set_amount: plan.set_amount,
                component_quotes,
                issuance_module: plan.issuance_module,
                is_debt_issuance: plan.is_debt_issuance,
                value: plan.input_token_amount,
            },
            PaymentMode::Token => IssuanceCall::FromToken {
                set_token: plan.set_token,
                input_token: plan.input_token,
                set_amount: plan.set_amount,
                max_input_amount: plan.input_token_amount,
                component_quotes,
                issuance_module: plan.issuance_module,
                is_debt_issuance: plan.is_debt_issuance,
            },
        }
    }

    pub fn payment(&self) -> PaymentMode {
        match self {
            IssuanceCall::FromEth { .. } => PaymentMode::Eth,
            IssuanceCall::FromToken { .. } => PaymentMode::Token,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            IssuanceCall::FromEth { value, .. } => *value,
            IssuanceCall::FromToken { .. } => U256::ZERO,
        }
    }

    pub fn calldata(&self) -> Bytes {
        match self {
            IssuanceCall::FromEth {
                set_token,
                set_amount,
                component_quotes,
                issuance_module,
                is_debt_issuance,
                ..
            } => IExchangeIssuanceZeroEx::issueExactSetFromETHCall {
                setToken: *set_token,
                amountSetToken: *set_amount,
                componentQuotes: component_quotes.clone(),
                issuanceModule: *issuance_module,
                isDebtIssuance: *is_debt_issuance,
            }
            .abi_encode()
            .into(),
            IssuanceCall::FromToken {
                set_token,
                input_token,
                set_amount,
                max_input_amount,
                component_quotes,
                issuance_module,
                is_debt_issuance,
            } => IExchangeIssuanceZeroEx::issueExactSetFromTokenCall {
                setToken: *set_token,
                inputToken: *input_token,
                amountSetToken: *set_amount,
                maxAmountInputToken: *max_input_amount,
                componentQuotes: component_quotes.clone(),
                issuanceModule: *issuance_module,
                isDebtIssuance: *is_debt_issuance,
            }
            .abi_encode()
            .into(),
        }
    }
}
