use std::sync::Arc;

use alloy::primitives::utils::{format_ether, format_units};
use alloy::primitives::{Address, Bytes, FixedBytes, U256};
use alloy::providers::DynProvider;
use anyhow::{Result, anyhow};
use tracing::{info, warn};

use super::args::{ConfiguredCommand, InspectCmd, IssuanceArgs, IssueCmd, PlanCmd, QuoteCmd};
use super::context::{build_http_client, parse_set_amount, resolve_rpc_url};
use super::prompt::{AutoApprove, ConsolePrompt};
use crate::api::etherscan::function_signature;
use crate::api::{EtherscanClient, QuoteRequest, ZeroExApiClient};
use crate::chain::contracts::{IERC20, IZeroExProxy, selector_of};
use crate::chain::{build_provider, build_read_provider, resolve_signer};
use crate::config::{AddressBook, AppConfig, PaymentMode};
use crate::engine::{
    ComponentRequirement, ComponentSource, Confirmation, IssuanceError, IssuanceOrchestrator, IssuanceOutcome,
    IssuancePlan, IssuanceRequest, OnchainComponentSource, PositionQuote, QuotePlanner,
    ZeroExQuoter,
};
use crate::lander::{IssuanceReceipt, RpcLander};

pub async fn run(command: ConfiguredCommand, config: AppConfig) -> Result<()> {
    let book = config.address_book();
    match command {
        ConfiguredCommand::Addresses => {
            println!("{}", serde_json::to_string_pretty(&book)?);
            Ok(())
        }
        ConfiguredCommand::Components(args) => run_components(&config, &book, &args).await,
        ConfiguredCommand::Quote(cmd) => run_quote(&config, &book, cmd).await,
        ConfiguredCommand::Plan(cmd) => run_plan(&config, &book, &cmd).await,
        ConfiguredCommand::Issue(cmd) => run_issue(&config, &book, cmd).await,
        ConfiguredCommand::Inspect(cmd) => run_inspect(&config, &book, cmd).await,
    }
}

/// 命令行参数与 `[issuance]` 配置合并后的发行目标。
#[derive(Debug, Clone, PartialEq, Eq)]
struct IssuanceTarget {
    set_token: Address,
    set_amount: U256,
    issuance_module: Address,
    is_debt_issuance: bool,
    exchange_issuance: Address,
}

fn resolve_target(config: &AppConfig, book: &AddressBook, args: &IssuanceArgs) -> Result<IssuanceTarget> {
    let set_token = args
        .set_token
        .or(config.issuance.set_token)
        .ok_or_else(|| anyhow!("未指定 Set Token，请使用 --set-token 或配置 issuance.set_token"))?;
    let raw_amount = args
        .amount
        .as_deref()
        .or(config.issuance.set_amount.as_deref())
        .ok_or_else(|| anyhow!("未指定铸造数量，请使用 --amount 或配置 issuance.set_amount"))?;
    let set_amount = parse_set_amount(raw_amount)?;
    let is_debt_issuance = args.debt || config.issuance.is_debt_issuance;
    let issuance_module = args
        .issuance_module
        .or(config.issuance.issuance_module)
        .unwrap_or_else(|| book.default_issuance_module(is_debt_issuance));
    let exchange_issuance = config
        .issuance
        .exchange_issuance
        .unwrap_or(book.exchange_issuance.zero_ex);

    Ok(IssuanceTarget {
        set_token,
        set_amount,
        issuance_module,
        is_debt_issuance,
        exchange_issuance,
    })
}

fn build_request(
    config: &AppConfig,
    book: &AddressBook,
    cmd: &PlanCmd,
) -> Result<(IssuanceTarget, IssuanceRequest)> {
    let target = resolve_target(config, book, &cmd.issuance)?;
    let input_token = cmd
        .input_token
        .or(config.issuance.input_token)
        .unwrap_or(book.tokens.weth);
    let slippage_percents = cmd.slippage.unwrap_or(config.quote.slippage_percents);
    let excluded_sources = if cmd.exclude.is_empty() {
        config.quote.excluded_sources()
    } else {
        Some(cmd.exclude.join(","))
    };

    let request = IssuanceRequest {
        set_token: target.set_token,
        set_amount: target.set_amount,
        input_token,
        issuance_module: target.issuance_module,
        is_debt_issuance: target.is_debt_issuance,
        slippage_percents,
        excluded_sources,
    };
    Ok((target, request))
}

/// ETH 支付时合约内部先包装为 WETH，报价必须以 WETH 为卖出代币。
fn ensure_payment_input(payment: PaymentMode, input_token: Address, weth: Address) -> Result<()> {
    if payment == PaymentMode::Eth && input_token != weth {
        return Err(anyhow!(
            "ETH 支付要求输入代币为 WETH ({weth})，当前为 {input_token}；请改用 --payment token"
        ));
    }
    Ok(())
}

fn issuance_error(err: IssuanceError) -> anyhow::Error {
    anyhow!(err.describe())
}

fn build_orchestrator(
    config: &AppConfig,
    provider: DynProvider,
    exchange_issuance: Address,
) -> Result<IssuanceOrchestrator> {
    let http = build_http_client()?;
    let client = ZeroExApiClient::new(http, &config.quote, &config.global.logging);
    let quoter = ZeroExQuoter::new(client, &config.quote);
    let planner = QuotePlanner::new(Arc::new(quoter), config.quote.max_concurrency);
    let components: Arc<dyn ComponentSource> =
        Arc::new(OnchainComponentSource::new(provider, exchange_issuance));
    Ok(IssuanceOrchestrator::new(components, planner))
}

async fn run_components(config: &AppConfig, book: &AddressBook, args: &IssuanceArgs) -> Result<()> {
    let target = resolve_target(config, book, args)?;
    let provider = build_read_provider(&resolve_rpc_url(config)?)?;
    let source = OnchainComponentSource::new(provider, target.exchange_issuance);
    let requirements = source
        .required_components(
            target.issuance_module,
            target.is_debt_issuance,
            target.set_token,
            target.set_amount,
        )
        .await
        .map_err(issuance_error)?;

    println!(
        "铸造 {} 个 {} 需要 {} 种成分：",
        format_ether(target.set_amount),
        target.set_token,
        requirements.len()
    );
    requirements.iter().for_each(print_requirement);
    Ok(())
}

fn print_requirement(requirement: &ComponentRequirement) {
    println!("  {}  {}", requirement.component, requirement.required_units);
}

async fn run_quote(config: &AppConfig, book: &AddressBook, cmd: QuoteCmd) -> Result<()> {
    let mut request = match (cmd.buy_amount.as_deref(), cmd.sell_amount.as_deref()) {
        (Some(amount), None) => QuoteRequest::buy_exact(cmd.sell_token, cmd.buy_token, parse_wei(amount)?),
        (None, Some(amount)) => QuoteRequest::sell_exact(cmd.sell_token, cmd.buy_token, parse_wei(amount)?),
        _ => return Err(anyhow!("必须且只能指定 --buy-amount 或 --sell-amount 之一")),
    };
    request = request
        .with_slippage_percents(cmd.slippage.unwrap_or(config.quote.slippage_percents))
        .with_excluded_sources(config.quote.excluded_sources());

    let client = ZeroExApiClient::new(build_http_client()?, &config.quote, &config.global.logging);
    let response = client
        .quote(&request)
        .await
        .map_err(|err| anyhow!(err.describe()))?;
    println!("{}", serde_json::to_string_pretty(response.raw())?);
    for source in response.active_sources() {
        println!("  来源 {}: {}", source.name, source.proportion);
    }

    if cmd.decode {
        let payload = response.payload();
        let proxy = if payload.to.is_zero() {
            book.dexes.zero_ex_exchange_proxy
        } else {
            payload.to
        };
        describe_call_data(config, proxy, &payload.data).await?;
    }
    Ok(())
}

fn parse_wei(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    let amount: U256 = trimmed
        .parse()
        .map_err(|err| anyhow!("无法解析数量 `{trimmed}`: {err}"))?;
    if amount.is_zero() {
        return Err(anyhow!("报价数量必须大于 0"));
    }
    Ok(amount)
}

async fn run_plan(config: &AppConfig, book: &AddressBook, cmd: &PlanCmd) -> Result<()> {
    let (target, request) = build_request(config, book, cmd)?;
    let provider = build_read_provider(&resolve_rpc_url(config)?)?;
    let mut orchestrator = build_orchestrator(config, provider.clone(), target.exchange_issuance)?;
    let plan = orchestrator
        .plan_issuance(&request)
        .await
        .map_err(issuance_error)?;
    print_plan(&provider, &plan).await;
    if cmd.decode {
        decode_plan(config, &plan).await?;
    }
    Ok(())
}

async fn decode_plan(config: &AppConfig, plan: &IssuancePlan) -> Result<()> {
    for swap in plan.position_quotes.iter().filter_map(PositionQuote::swap) {
        println!("成分 {} 的兑换调用：", swap.buy_token);
        describe_call_data(config, swap.swap_target, &swap.call_data).await?;
    }
    Ok(())
}

async fn run_issue(config: &AppConfig, book: &AddressBook, cmd: IssueCmd) -> Result<()> {
    let payment = cmd
        .payment
        .map(PaymentMode::from)
        .unwrap_or(config.issuance.payment);
    let (target, request) = build_request(config, book, &cmd.plan)?;
    ensure_payment_input(payment, request.input_token, book.tokens.weth)?;

    let rpc_url = resolve_rpc_url(config)?;
    let signer = resolve_signer(&config.wallet)?;
    let issuer = signer.address();
    let provider = build_provider(&rpc_url, signer)?;
    info!(
        target: "engine::orchestrator",
        %issuer,
        exchange_issuance = %target.exchange_issuance,
        ?payment,
        "发行账户已就绪"
    );

    let lander = RpcLander::new(
        provider.clone(),
        issuer,
        target.exchange_issuance,
        config.wallet.required_confirmations,
    );
    let mut orchestrator = build_orchestrator(config, provider.clone(), target.exchange_issuance)?;
    let plan = orchestrator
        .plan_issuance(&request)
        .await
        .map_err(issuance_error)?;
    print_plan(&provider, &plan).await;
    if cmd.plan.decode {
        decode_plan(config, &plan).await?;
    }

    let confirmation: Box<dyn Confirmation> = if cmd.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(ConsolePrompt)
    };
    let outcome = orchestrator
        .execute_issuance(&plan, payment, &lander, &*confirmation)
        .await
        .map_err(issuance_error)?;

    match outcome {
        IssuanceOutcome::Completed(report) => {
            println!("发行交易: {}", report.receipt.tx_hash);
            if let Some(block) = report.receipt.block_number {
                println!("所在区块: {block}");
            }
            if let Some(approval) = report.approval.as_ref() {
                println!("授权交易: {} (手续费 {} ETH)", approval.tx_hash, format_ether(approval.fee()));
            }
            println!(
                "gas: 使用 {} / 上限 {}，价格 {} gwei",
                report.receipt.gas_used,
                report.gas.gas_limit,
                format_gwei(report.receipt.effective_gas_price)
            );
            println!("手续费合计: {} ETH", format_ether(report.total_fee()));
            let spent_unit = match payment {
                PaymentMode::Eth => "ETH（含手续费）".to_string(),
                PaymentMode::Token => plan.input_token.to_string(),
            };
            println!("输入花费: {} {spent_unit}", report.balances.input_spent);
            println!(
                "获得 Set Token: {}",
                format_ether(report.balances.set_obtained)
            );
            Ok(())
        }
        IssuanceOutcome::Aborted { approval } => Err(anyhow!(abort_message(approval.as_ref()))),
    }
}

async fn run_inspect(config: &AppConfig, book: &AddressBook, cmd: InspectCmd) -> Result<()> {
    let proxy = cmd.proxy.unwrap_or(book.dexes.zero_ex_exchange_proxy);
    describe_call_data(config, proxy, &cmd.call_data).await
}

/// 经 Exchange Proxy 查到选择器对应的实现合约，再从 Etherscan 拉取其 ABI 还原函数签名。
async fn describe_call_data(config: &AppConfig, proxy: Address, call_data: &Bytes) -> Result<()> {
    let selector = selector_of(call_data)
        .map(FixedBytes::from)
        .ok_or_else(|| anyhow!("调用数据不足 4 字节，无法解析选择器"))?;
    let provider = build_read_provider(&resolve_rpc_url(config)?)?;
    let implementation = IZeroExProxy::new(proxy, &provider)
        .getFunctionImplementation(selector)
        .call()
        .await?;
    println!("选择器: {selector}");
    println!("实现合约: {implementation}");
    if implementation.is_zero() {
        warn!(target: "etherscan", %proxy, %selector, "Exchange Proxy 未注册该选择器");
        return Ok(());
    }

    let etherscan = EtherscanClient::new(build_http_client()?, &config.etherscan);
    let abi = etherscan
        .fetch_abi(implementation)
        .await
        .map_err(|err| anyhow!(err.describe()))?;
    match function_signature(&abi, selector) {
        Some(signature) => println!("函数签名: {signature}"),
        None => warn!(
            target: "etherscan",
            %implementation,
            %selector,
            "实现合约 ABI 中没有匹配的函数"
        ),
    }
    Ok(())
}

async fn print_plan(provider: &DynProvider, plan: &IssuancePlan) {
    println!(
        "发行计划：{} 个 {}，{} 种成分，其中 {} 笔兑换",
        format_ether(plan.set_amount),
        plan.set_token,
        plan.position_quotes.len(),
        plan.swap_count()
    );
    for (requirement, quote) in plan.requirements.iter().zip(&plan.position_quotes) {
        match quote {
            PositionQuote::Swap(swap) => {
                let sources = swap
                    .sources
                    .iter()
                    .filter(|source| !source.proportion.is_zero())
                    .map(|source| format!("{} {}", source.name, source.proportion))
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "  {}  需要 {}，卖出 {} [{}]",
                    requirement.component, requirement.required_units, swap.sell_amount, sources
                );
            }
            PositionQuote::PassThrough => println!(
                "  {}  需要 {}，直接使用输入代币",
                requirement.component, requirement.required_units
            ),
        }
    }

    let decimals = match IERC20::new(plan.input_token, provider).decimals().call().await {
        Ok(decimals) => Some(decimals),
        Err(err) => {
            warn!(
                target: "engine::orchestrator",
                token = %plan.input_token,
                error = %err,
                "读取输入代币精度失败，按最小单位展示"
            );
            None
        }
    };
    println!(
        "输入代币 {}：报价合计 {}，含 {}% 滑点上限 {}",
        plan.input_token,
        display_amount(plan.raw_input_amount, decimals),
        plan.slippage_percents,
        display_amount(plan.input_token_amount, decimals)
    );
}

/// 授权交易已上链时，取消信息需要带上授权交易哈希与手续费。
fn abort_message(approval: Option<&IssuanceReceipt>) -> String {
    match approval {
        Some(receipt) => format!(
            "发行已取消；授权交易 {} 已上链（手续费 {} ETH），额度仍然有效",
            receipt.tx_hash,
            format_ether(receipt.fee())
        ),
        None => "发行已取消".to_string(),
    }
}

fn display_amount(amount: U256, decimals: Option<u8>) -> String {
    decimals
        .and_then(|decimals| format_units(amount, decimals).ok())
        .unwrap_or_else(|| amount.to_string())
}

fn format_gwei(wei: u128) -> String {
    format_units(U256::from(wei), "gwei").unwrap_or_else(|_| wei.to_string())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::config::Network;

    const SET_TOKEN: Address = address!("2aF1dF3AB0ab157e1E2Ad8F88A7D04fbea0c7dc6");

    fn plan_cmd(amount: Option<&str>) -> PlanCmd {
        PlanCmd {
            issuance: IssuanceArgs {
                set_token: Some(SET_TOKEN),
                amount: amount.map(str::to_string),
                issuance_module: None,
                debt: false,
            },
            input_token: None,
            slippage: None,
            exclude: Vec::new(),
            decode: false,
        }
    }

    #[test]
    fn request_falls_back_to_config_and_address_book() {
        let mut config = AppConfig::default();
        config.quote.excluded_sources = vec!["Kyber".to_string()];
        let book = AddressBook::for_network(Network::Production);

        let (target, request) = build_request(&config, &book, &plan_cmd(Some("2"))).expect("request");

        assert_eq!(request.input_token, book.tokens.weth);
        assert_eq!(request.issuance_module, book.set.basic_issuance_module);
        assert_eq!(request.slippage_percents, config.quote.slippage_percents);
        assert_eq!(request.excluded_sources.as_deref(), Some("Kyber"));
        assert_eq!(request.set_amount, U256::from(2_000_000_000_000_000_000u128));
        assert_eq!(target.exchange_issuance, book.exchange_issuance.zero_ex);
    }

    #[test]
    fn command_line_overrides_config() {
        let mut config = AppConfig::default();
        config.issuance.set_amount = Some("5".to_string());
        config.quote.excluded_sources = vec!["Kyber".to_string()];
        let book = AddressBook::for_network(Network::Production);
        let mut cmd = plan_cmd(None);
        cmd.issuance.debt = true;
        cmd.slippage = Some(3);
        cmd.exclude = vec!["Bancor".to_string(), "Mooniswap".to_string()];

        let (_, request) = build_request(&config, &book, &cmd).expect("request");

        assert!(request.is_debt_issuance);
        assert_eq!(request.issuance_module, book.set.debt_issuance_module_v2);
        assert_eq!(request.slippage_percents, 3);
        assert_eq!(request.excluded_sources.as_deref(), Some("Bancor,Mooniswap"));
        assert_eq!(request.set_amount, U256::from(5_000_000_000_000_000_000u128));
    }

    #[test]
    fn missing_amount_is_reported() {
        let book = AddressBook::for_network(Network::Production);
        let err = build_request(&AppConfig::default(), &book, &plan_cmd(None)).expect_err("missing");
        assert!(err.to_string().contains("--amount"));
    }

    #[test]
    fn eth_payment_requires_weth_input() {
        let weth = address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2");
        let dai = address!("6B175474E89094C44Da98b954EedeAC495271d0F");
        assert!(ensure_payment_input(PaymentMode::Eth, weth, weth).is_ok());
        assert!(ensure_payment_input(PaymentMode::Eth, dai, weth).is_err());
        assert!(ensure_payment_input(PaymentMode::Token, dai, weth).is_ok());
    }

    #[test]
    fn abort_message_reports_landed_approval() {
        assert_eq!(abort_message(None), "发行已取消");

        let receipt = IssuanceReceipt {
            tx_hash: alloy::primitives::TxHash::repeat_byte(0x42),
            block_number: Some(7),
            gas_used: 50_000,
            effective_gas_price: 20_000_000_000,
            success: true,
        };
        let message = abort_message(Some(&receipt));
        assert!(message.contains(&receipt.tx_hash.to_string()));
        assert!(message.contains("0.001000000000000000 ETH"));
    }

    #[test]
    fn amounts_render_with_token_decimals() {
        let amount = U256::from(1_500_000u64);
        assert_eq!(display_amount(amount, Some(6)), "1.500000");
        assert_eq!(display_amount(amount, None), "1500000");
        assert_eq!(parse_wei("1000").expect("wei"), U256::from(1000u64));
        assert!(parse_wei("0").is_err());
    }
}
