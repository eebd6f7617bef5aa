use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{cli::parse_network, error::AppError, types::{NetworkParams, TransactionRequest}};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// config.toml の最上位構造
#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(rename = "BlockCypher")]
    pub block_cypher: BlockCypherConfig,
    #[serde(rename = "Signer")]
    pub signer: SignerConfig,
}

#[derive(Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct BlockCypherConfig {
    #[serde(default)]
    pub token: String,
    pub coin: String,  // "btc"
    pub chain: String, // "main", "test3"
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct SignerConfig {
    #[serde(rename = "WIF")]
    pub wif: String,
}

// Tokenはログに出さない
impl std::fmt::Debug for BlockCypherConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockCypherConfig")
            .field("coin", &self.coin)
            .field("chain", &self.chain)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

// WIFはログに出さない
impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig").finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("設定ファイルの読み込みに失敗しました: {:?}", path);
            AppError::Io(e)
        })?;
        toml::from_str(&content).map_err(|e| AppError::ConfigParse {
            file_path: path.to_path_buf(),
            source: e,
        })
    }

    /// Block Cypherのchain名からネットワークを決める
    pub fn network(&self) -> Result<NetworkParams, AppError> {
        parse_network(&self.block_cypher.chain)
    }

    /// 使用するネットワークを決める。`--network` 指定はChainと一致する場合か、
    /// ブロードキャストしないドライラン時のみ許可する。
    pub fn resolve_network(&self, requested: Option<&str>, dry_run: bool) -> Result<NetworkParams, AppError> {
        let chain_network = self.network();
        let Some(requested) = requested else {
            return chain_network;
        };
        let network = parse_network(requested)?;
        if dry_run {
            return Ok(network);
        }
        let chain_network = chain_network?;
        if network != chain_network {
            return Err(AppError::NetworkMismatch {
                configured: format!("{:?} (Chain = {})", chain_network, self.block_cypher.chain),
                inferred: format!("{:?} (--network)", network),
            });
        }
        Ok(network)
    }
}

impl TransactionRequest {
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).map_err(|e| {
            log::error!("トランザクションファイルの読み込みに失敗しました: {:?}", path);
            AppError::Io(e)
        })?;
        serde_json::from_str(&content).map_err(|e| AppError::JsonParse {
            file_path: path.to_path_buf(),
            source: e,
        })
    }
}
