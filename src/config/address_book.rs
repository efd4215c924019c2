//! 主网合约地址簿。
//!
//! 生产与预发布两套预设以普通值的形式构造并显式传递，`[addresses]` 配置段可以逐项覆盖。

use alloy::primitives::{Address, address};
use serde::{Deserialize, Serialize};

use super::Network;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressBook {
    pub tokens: TokenAddresses,
    pub dexes: DexAddresses,
    pub set: SetAddresses,
    pub lending: LendingAddresses,
    pub exchange_issuance: ExchangeIssuanceAddresses,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAddresses {
    pub st_eth_am: Address,
    pub st_eth: Address,
    pub dai: Address,
    pub weth: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurveAddresses {
    pub calculator: Address,
    pub address_provider: Address,
    pub registry: Address,
    /// Curve 用来表示原生 ETH 的占位地址。
    pub eth_address: Address,
    pub st_eth_eth_pool: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DexAddresses {
    pub curve: CurveAddresses,
    pub sushiswap_router: Address,
    pub uni_v2_router: Address,
    pub uni_v3_router: Address,
    pub zero_ex_exchange_proxy: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetAddresses {
    pub controller: Address,
    pub basic_issuance_module: Address,
    pub debt_issuance_module: Address,
    pub debt_issuance_module_v2: Address,
    pub aave_leverage_module: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LendingAddresses {
    pub aave_address_provider: Address,
    pub aave_lending_pool: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExchangeIssuanceAddresses {
    pub zero_ex: Address,
}

impl AddressBook {
    pub fn for_network(network: Network) -> Self {
        match network {
            Network::Production => Self::production(),
            Network::Staging => Self::staging(),
        }
    }

    pub fn production() -> Self {
        Self {
            tokens: TokenAddresses {
                st_eth_am: address!("28424507fefb6f7f8E9D3860F56504E4e5f5f390"),
                st_eth: address!("ae7ab96520DE3A18E5e111B5EaAb095312D7fE84"),
                dai: address!("8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063"),
                weth: address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"),
            },
            dexes: DexAddresses {
                curve: CurveAddresses {
                    calculator: address!("c1DB00a8E5Ef7bfa476395cdbcc98235477cDE4E"),
                    address_provider: address!("0000000022D53366457F9d5E68Ec105046FC4383"),
                    registry: address!("90E00ACe148ca3b23Ac1bC8C240C2a7Dd9c2d7f5"),
                    eth_address: address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE"),
                    st_eth_eth_pool: address!("DC24316b9AE028F1497c275EB9192a3Ea0f67022"),
                },
                sushiswap_router: address!("d9e1cE17f2641f24aE83637ab66a2cca9C378B9F"),
                uni_v2_router: address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D"),
                uni_v3_router: address!("b27308f9F90D607463bb33eA1BeBb41C27CE5AB6"),
                zero_ex_exchange_proxy: address!("Def1C0ded9bec7F1a1670819833240f027b25EfF"),
            },
            set: SetAddresses {
                controller: address!("a4c8d221d8BB851f83aadd0223a8900A6921A349"),
                basic_issuance_module: address!("d8EF3cACe8b4907117a45B0b125c68560532F94D"),
                debt_issuance_module: address!("39F024d621367C044BacE2bf0Fb15Fb3612eCB92"),
                debt_issuance_module_v2: address!("69a592D2129415a4A1d1b1E309C17051B7F28d57"),
                aave_leverage_module: address!("251Bd1D42Df1f153D86a5BA2305FaADE4D5f51DC"),
            },
            lending: LendingAddresses {
                aave_address_provider: address!("B53C1a33016B2DC2fF3653530bfF1848a515c8c5"),
                aave_lending_pool: address!("7d2768dE32b0b80b7a3454c06BdAc94A69DDc7A9"),
            },
            exchange_issuance: ExchangeIssuanceAddresses {
                zero_ex: address!("f42ecdc112365ff79a745b4cf7d4c266bd6e4b25"),
            },
        }
    }

    pub fn staging() -> Self {
        let mut book = Self::production();
        book.set = SetAddresses {
            controller: address!("F1B12A7b1f0AF744ED21eEC7d3E891C48Fd3c329"),
            basic_issuance_module: book.set.basic_issuance_module,
            debt_issuance_module: address!("39F024d621367C044BacE2bf0Fb15Fb3612eCB92"),
            debt_issuance_module_v2: address!("3C0CC7624B1c408cF2cF11b3961301949f2F7820"),
            aave_leverage_module: address!("5d2B710787078B45CD7582C0423AC2fC180262e8"),
        };
        book
    }

    /// 未显式指定发行模块时的默认选择：债务发行走 DebtIssuanceModuleV2，否则走 BasicIssuanceModule。
    pub fn default_issuance_module(&self, is_debt_issuance: bool) -> Address {
        if is_debt_issuance {
            self.set.debt_issuance_module_v2
        } else {
            self.set.basic_issuance_module
        }
    }
}

/// `[addresses]` 配置段，只覆盖显式给出的条目。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressOverrides {
    #[serde(default)]
    pub weth: Option<Address>,
    #[serde(default)]
    pub zero_ex_exchange_proxy: Option<Address>,
    #[serde(default)]
    pub controller: Option<Address>,
    #[serde(default)]
    pub basic_issuance_module: Option<Address>,
    #[serde(default)]
    pub debt_issuance_module: Option<Address>,
    #[serde(default)]
    pub debt_issuance_module_v2: Option<Address>,
    #[serde(default)]
    pub aave_leverage_module: Option<Address>,
    #[serde(default)]
    pub exchange_issuance_zero_ex: Option<Address>,
}

impl AddressOverrides {
    pub fn apply(&self, book: &mut AddressBook) {
        let pairs: [(&Option<Address>, &mut Address); 8] = [
            (&self.weth, &mut book.tokens.weth),
            (
                &self.zero_ex_exchange_proxy,
                &mut book.dexes.zero_ex_exchange_proxy,
            ),
            (&self.controller, &mut book.set.controller),
            (
                &self.basic_issuance_module,
                &mut book.set.basic_issuance_module,
            ),
            (
                &self.debt_issuance_module,
                &mut book.set.debt_issuance_module,
            ),
            (
                &self.debt_issuance_module_v2,
                &mut book.set.debt_issuance_module_v2,
            ),
            (
                &self.aave_leverage_module,
                &mut book.set.aave_leverage_module,
            ),
            (
                &self.exchange_issuance_zero_ex,
                &mut book.exchange_issuance.zero_ex,
            ),
        ];
        for (value, slot) in pairs {
            if let Some(address) = value {
                *slot = *address;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_only_replaces_set_modules() {
        let production = AddressBook::production();
        let staging = AddressBook::staging();

        assert_eq!(staging.tokens, production.tokens);
        assert_eq!(staging.dexes, production.dexes);
        assert_eq!(staging.lending, production.lending);
        assert_eq!(
            staging.set.debt_issuance_module,
            production.set.debt_issuance_module
        );
        assert_ne!(staging.set.controller, production.set.controller);
        assert_eq!(
            staging.set.debt_issuance_module_v2,
            address!("3C0CC7624B1c408cF2cF11b3961301949f2F7820")
        );
    }

    #[test]
    fn overrides_touch_only_given_entries() {
        let mut book = AddressBook::production();
        let replacement = address!("1111111111111111111111111111111111111111");
        let overrides = AddressOverrides {
            debt_issuance_module_v2: Some(replacement),
            ..AddressOverrides::default()
        };
        overrides.apply(&mut book);

        assert_eq!(book.set.debt_issuance_module_v2, replacement);
        assert_eq!(
            book.set.basic_issuance_module,
            AddressBook::production().set.basic_issuance_module
        );
    }

    #[test]
    fn default_module_follows_debt_flag() {
        let book = AddressBook::staging();
        assert_eq!(
            book.default_issuance_module(true),
            book.set.debt_issuance_module_v2
        );
        assert_eq!(
            book.default_issuance_module(false),
            book.set.basic_issuance_module
        );
    }

    #[test]
    fn mixed_case_literals_match_lowercase() {
        let book = AddressBook::production();
        let lowercase: Address = "0xc02aaa39b223fe8d0a0e5c4f27ead9083c756cc2"
            .parse()
            .expect("address");
        assert_eq!(book.tokens.weth, lowercase);
    }
}
