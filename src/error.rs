use std::path::PathBuf;
use bitcoin::key::FromWifError as BitcoinKeyError; // WIFデコードエラー用
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONパースエラー ファイル: {file_path:?}, 詳細: {source}")]
    JsonParse {
        file_path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("設定ファイル(TOML)パースエラー ファイル: {file_path:?}, 詳細: {source}")]
    ConfigParse {
        file_path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("秘密鍵(WIF)のデコードに失敗しました: {0}")]
    KeyDecode(#[from] BitcoinKeyError),

    #[error("{}アドレスのデコードに失敗しました ({address}): {reason}", output_label(.output))]
    AddressDecode {
        output: Option<usize>,
        address: String,
        reason: String,
    },

    #[error("送金元トランザクションIDのパースに失敗しました ({value}): {reason}")]
    HashParse { value: String, reason: String },

    #[error("署名エラー (入力インデックス {input_index}): {reason}")]
    Signature { input_index: usize, reason: String },

    #[error("未対応のwitness program (入力インデックス {input_index}): {script_hex}")]
    UnsupportedWitnessProgram { input_index: usize, script_hex: String },

    #[error("トランザクションのシリアライズに失敗しました: {0}")]
    Serialize(String),

    #[error("資金不足: UTXO額 {available} sats < 送金額 {funding} sats + 手数料 {fee} sats")]
    InsufficientFunds {
        available: u64,
        funding: u64,
        fee: u64,
    },

    #[error("ネットワーク不整合: 設定 {configured} vs {inferred}")]
    NetworkMismatch {
        configured: String,
        inferred: String,
    },

    #[error("入力検証エラー: {0}")]
    InputValidation(String),

    #[error("トランザクションのブロードキャストに失敗しました: {0}")]
    Broadcast(String),
}

fn output_label(output: &Option<usize>) -> String {
    match output {
        Some(index) => format!("出力{}の作成に失敗しました: ", index),
        None => String::new(),
    }
}
