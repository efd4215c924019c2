use alloy::primitives::U256;

use super::error::{IssuanceError, IssuanceResult};

const HUNDRED: U256 = U256::from_limbs([100, 0, 0, 0]);

/// 把卖出总量按滑点放大：`raw * 100 / (100 - s)`，最后一次除法向下取整。
///
/// `s` 为整数百分比，必须满足 `s < 100`。
pub fn apply_slippage_buffer(raw_total: U256, slippage_percents: u8) -> IssuanceResult<U256> {
    if slippage_percents >= 100 {
        return Err(IssuanceError::DivisionByZeroOrNegative { slippage_percents });
    }
    let denominator = HUNDRED - U256::from(slippage_percents);
    let scaled = raw_total.checked_mul(HUNDRED).ok_or_else(|| {
        IssuanceError::AmountOverflow(format!("{raw_total} * 100 超出 uint256 范围"))
    })?;
    Ok(scaled / denominator)
}

/// 逐项累加卖出数量，溢出时报错而不是回绕。
pub fn sum_amounts<I>(amounts: I) -> IssuanceResult<U256>
where
    I: IntoIterator<Item = U256>,
{
    amounts.into_iter().try_fold(U256::ZERO, |acc, amount| {
        acc.checked_add(amount)
            .ok_or_else(|| IssuanceError::AmountOverflow(format!("{acc} + {amount} 超出 uint256 范围")))
    })
}
