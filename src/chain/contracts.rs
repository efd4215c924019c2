use alloy::primitives::Bytes;
use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IExchangeIssuanceZeroEx {
        function getRequiredIssuanceComponents(
            address issuanceModule,
            bool isDebtIssuance,
            address setToken,
            uint256 amountSetToken
        ) external view returns (address[] memory components, uint256[] memory positions);

        function issueExactSetFromETH(
            address setToken,
            uint256 amountSetToken,
            bytes[] memory componentQuotes,
            address issuanceModule,
            bool isDebtIssuance
        ) external payable returns (uint256);

        function issueExactSetFromToken(
            address setToken,
            address inputToken,
            uint256 amountSetToken,
            uint256 maxAmountInputToken,
            bytes[] memory componentQuotes,
            address issuanceModule,
            bool isDebtIssuance
        ) external returns (uint256);
    }
}

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }
}

sol! {
    #[sol(rpc)]
    interface IZeroExProxy {
        function getFunctionImplementation(bytes4 selector) external view returns (address impl);
    }
}

/// 调用数据的前四个字节；不足四字节时返回 `None`。
pub fn selector_of(call_data: &Bytes) -> Option<[u8; 4]> {
    call_data.get(..4).and_then(|head| head.try_into().ok())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{Address, U256, bytes};
    use alloy::sol_types::SolCall;

    use super::*;

    #[test]
    fn selector_requires_four_bytes() {
        assert_eq!(selector_of(&bytes!("415565b0ff")), Some([0x41, 0x55, 0x65, 0xb0]));
        assert_eq!(selector_of(&bytes!("4155")), None);
    }

    #[test]
    fn issue_from_eth_call_carries_quotes_in_order() {
        let call = IExchangeIssuanceZeroEx::issueExactSetFromETHCall {
            setToken: Address::repeat_byte(0x11),
            amountSetToken: U256::from(10u64),
            componentQuotes: vec![bytes!("aa"), bytes!("bbcc")],
            issuanceModule: Address::repeat_byte(0x22),
            isDebtIssuance: false,
        };
        let encoded = call.abi_encode();
        assert_eq!(
            &encoded[..4],
            IExchangeIssuanceZeroEx::issueExactSetFromETHCall::SELECTOR.as_slice()
        );
        let decoded = IExchangeIssuanceZeroEx::issueExactSetFromETHCall::abi_decode(&encoded)
            .expect("decode call");
        assert_eq!(decoded.componentQuotes, vec![bytes!("aa"), bytes!("bbcc")]);
    }
}
