//! Block Cypher API (https://www.blockcypher.com/dev/bitcoin/) を使ったトランザクションの公開

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::{config::BlockCypherConfig, error::AppError, transaction};

const BLOCKCYPHER_API: &str = "https://api.blockcypher.com";

/// シリアライズ済みトランザクションを公開し、トランザクションID (hex) を返す
pub trait BroadcastClient {
    fn publish(&self, raw_transaction: &[u8]) -> Result<String, AppError>;
}

#[derive(Serialize)]
struct PushRequest {
    tx: String,
}

#[derive(Deserialize)]
struct PushResponse {
    tx: PushedTransaction,
}

#[derive(Deserialize)]
struct PushedTransaction {
    hash: String,
}

pub struct BlockCypherClient {
    client: Client,
    push_url: String,
    token: String,
}

impl BlockCypherClient {
    pub fn connect(config: &BlockCypherConfig) -> Result<Self, AppError> {
        Self::with_base_url(config, BLOCKCYPHER_API)
    }

    pub fn with_base_url(config: &BlockCypherConfig, base_url: &str) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Broadcast(format!("HTTPクライアントの初期化に失敗: {}", e)))?;
        Ok(BlockCypherClient {
            client,
            push_url: push_url(base_url, &config.coin, &config.chain),
            token: config.token.clone(),
        })
    }
}

fn push_url(base_url: &str, coin: &str, chain: &str) -> String {
    format!("{}/v1/{}/{}/txs/push", base_url.trim_end_matches('/'), coin, chain)
}

impl BroadcastClient for BlockCypherClient {
    fn publish(&self, raw_transaction: &[u8]) -> Result<String, AppError> {
        log::info!("トランザクションを {} に送信します。", self.push_url);
        let mut request = self.client.post(&self.push_url).json(&PushRequest {
            tx: hex::encode(raw_transaction),
        });
        if !self.token.is_empty() {
            request = request.query(&[("token", self.token.as_str())]);
        }

        let response = request.send().map_err(|e| AppError::Broadcast(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(AppError::Broadcast(format!("HTTP {}: {}", status, body)));
        }

        let pushed: PushResponse = response
            .json()
            .map_err(|e| AppError::Broadcast(format!("レスポンスのパースに失敗: {}", e)))?;
        Ok(pushed.tx.hash)
    }
}

/// ネットワークへ送信せず、raw transaction hexを出力してローカルで計算したtxidを返す
pub struct DryRunClient {
    output_file: Option<PathBuf>,
}

impl DryRunClient {
    pub fn new(output_file: Option<PathBuf>) -> Self {
        DryRunClient { output_file }
    }
}

impl BroadcastClient for DryRunClient {
    fn publish(&self, raw_transaction: &[u8]) -> Result<String, AppError> {
        let tx = transaction::deserialize(raw_transaction)?;
        let serialized_tx = hex::encode(raw_transaction);
        log::info!("ドライラン: トランザクションは送信されません。");
        println!("{}", serialized_tx);

        if let Some(path) = &self.output_file {
            let mut output_file = File::create(path).map_err(|e| {
                log::error!("出力ファイルの作成に失敗しました: {:?}", path);
                AppError::Io(e)
            })?;
            output_file.write_all(serialized_tx.as_bytes()).map_err(|e| {
                log::error!("出力ファイルへの書き込みに失敗しました。");
                AppError::Io(e)
            })?;
            log::info!("Raw transactionを {:?} に保存しました。", path);
        }
        Ok(tx.compute_txid().to_string())
    }
}
