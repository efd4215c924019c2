use std::path::PathBuf;

use alloy::primitives::{Address, Bytes};
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::PaymentMode;

#[derive(Parser, Debug)]
#[command(name = "set-issuer", version, about = "通过 0x 报价一键兑换发行 Set Token")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 issuer.toml 或 config/issuer.toml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 初始化配置模版文件
    Init(InitCmd),
    /// 打印当前网络的合约地址簿
    Addresses,
    /// 查询铸造所需的成分及数量
    Components(IssuanceArgs),
    /// 请求单个交易对的 0x 报价
    Quote(QuoteCmd),
    /// 生成发行计划（不提交交易）
    Plan(PlanCmd),
    /// 生成计划、确认后提交发行交易
    Issue(IssueCmd),
    /// 解析 0x 调用数据对应的实现合约与函数签名
    Inspect(InspectCmd),
}

/// `init` 不读取配置文件，其余命令都在加载配置之后执行。
#[derive(Debug)]
pub enum Launch {
    Init(InitCmd),
    Configured(ConfiguredCommand),
}

/// 需要配置与地址簿的命令。
#[derive(Debug)]
pub enum ConfiguredCommand {
    Addresses,
    Components(IssuanceArgs),
    Quote(QuoteCmd),
    Plan(PlanCmd),
    Issue(IssueCmd),
    Inspect(InspectCmd),
}

impl From<Command> for Launch {
    fn from(command: Command) -> Self {
        let configured = match command {
            Command::Init(args) => return Launch::Init(args),
            Command::Addresses => ConfiguredCommand::Addresses,
            Command::Components(args) => ConfiguredCommand::Components(args),
            Command::Quote(cmd) => ConfiguredCommand::Quote(cmd),
            Command::Plan(cmd) => ConfiguredCommand::Plan(cmd),
            Command::Issue(cmd) => ConfiguredCommand::Issue(cmd),
            Command::Inspect(cmd) => ConfiguredCommand::Inspect(cmd),
        };
        Launch::Configured(configured)
    }
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}

/// 发行相关的公共参数；未提供时回落到配置文件 `[issuance]` 段。
#[derive(Args, Debug, Clone, Default)]
pub struct IssuanceArgs {
    #[arg(long, value_name = "ADDRESS", help = "Set Token 地址")]
    pub set_token: Option<Address>,
    #[arg(long, value_name = "AMOUNT", help = "铸造数量（以 ether 为单位，如 10 或 0.5）")]
    pub amount: Option<String>,
    #[arg(long, value_name = "ADDRESS", help = "发行模块地址（默认按债务标志从地址簿选择）")]
    pub issuance_module: Option<Address>,
    #[arg(long, help = "使用债务发行模块")]
    pub debt: bool,
}

#[derive(Args, Debug)]
pub struct QuoteCmd {
    #[arg(long, value_name = "ADDRESS", help = "卖出代币地址")]
    pub sell_token: Address,
    #[arg(long, value_name = "ADDRESS", help = "买入代币地址")]
    pub buy_token: Address,
    #[arg(long, value_name = "WEI", help = "精确买入数量（最小单位）", conflicts_with = "sell_amount")]
    pub buy_amount: Option<String>,
    #[arg(long, value_name = "WEI", help = "精确卖出数量（最小单位）")]
    pub sell_amount: Option<String>,
    #[arg(long, value_name = "PERCENT", help = "滑点整数百分比（默认取配置）")]
    pub slippage: Option<u8>,
    #[arg(long, help = "额外解析调用数据的函数签名")]
    pub decode: bool,
}

#[derive(Args, Debug)]
pub struct PlanCmd {
    #[command(flatten)]
    pub issuance: IssuanceArgs,
    #[arg(long, value_name = "ADDRESS", help = "输入代币地址（默认 WETH）")]
    pub input_token: Option<Address>,
    #[arg(long, value_name = "PERCENT", help = "滑点整数百分比（默认取配置）")]
    pub slippage: Option<u8>,
    #[arg(long, value_delimiter = ',', help = "排除的流动性来源，逗号分隔")]
    pub exclude: Vec<String>,
    #[arg(long, help = "逐个解析兑换调用数据的函数签名")]
    pub decode: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum PaymentArg {
    Eth,
    Token,
}

impl From<PaymentArg> for PaymentMode {
    fn from(value: PaymentArg) -> Self {
        match value {
            PaymentArg::Eth => PaymentMode::Eth,
            PaymentArg::Token => PaymentMode::Token,
        }
    }
}

#[derive(Args, Debug)]
pub struct IssueCmd {
    #[command(flatten)]
    pub plan: PlanCmd,
    #[arg(long, value_enum, help = "支付方式：eth 或 token（默认取配置）")]
    pub payment: Option<PaymentArg>,
    #[arg(long, short = 'y', help = "跳过交互确认")]
    pub yes: bool,
}

#[derive(Args, Debug)]
pub struct InspectCmd {
    #[arg(long, value_name = "HEX", help = "0x 返回的调用数据")]
    pub call_data: Bytes,
    #[arg(long, value_name = "ADDRESS", help = "Exchange Proxy 地址（默认取地址簿）")]
    pub proxy: Option<Address>,
}
