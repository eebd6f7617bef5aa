use clap::Parser;
use std::path::PathBuf;
use crate::error::AppError;
use crate::types::NetworkParams;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Block Cypherと署名鍵の設定ファイル (TOML) へのパス
    #[clap(short, long, value_parser, default_value = "./configs/config.toml")]
    pub config: PathBuf,

    /// 送金元UTXOと送金先を記述したJSONファイルへのパス
    #[clap(short, long, value_parser, default_value = "./configs/transaction.json")]
    pub transaction: PathBuf,

    /// 使用するネットワーク ("mainnet", "testnet")。省略時は設定ファイルのChainから決める
    #[clap(short, long, value_parser)]
    pub network: Option<String>,

    /// 生成されたraw transaction hexを保存するファイルへのパス (--dry-run時のみ)
    #[clap(short, long, value_parser, requires = "dry_run")]
    pub output_file: Option<PathBuf>,

    /// 署名まで行い、ブロードキャストはしない
    #[clap(long)]
    pub dry_run: bool,
}

pub fn parse_network(network_str: &str) -> Result<NetworkParams, AppError> {
    match network_str.to_lowercase().as_str() {
        "bitcoin" | "mainnet" | "main" => Ok(NetworkParams::Mainnet),
        "testnet" | "test3" => Ok(NetworkParams::Testnet),
        s => Err(AppError::InputValidation(format!("無効なネットワークが指定されました: {}", s))),
    }
}
