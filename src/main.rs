use bitcoin::secp256k1::Secp256k1;
use bitcoin::secp256k1::All as AllContext;
use clap::Parser;

mod address;
mod chain;
mod cli;
mod config;
mod error;
mod keys;
mod sign;
mod transaction;
mod types;

use chain::{BlockCypherClient, BroadcastClient, DryRunClient};
use cli::CliArgs;
use config::AppConfig;
use error::AppError;
use keys::SigningKey;
use types::TransactionRequest;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        log::error!("処理が失敗しました: {}", e);
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。引数: {:?}", args);

    let config = AppConfig::from_file(&args.config)?;
    log::debug!("設定ファイルのパース成功: {:?}", config);

    let network = config.resolve_network(args.network.as_deref(), args.dry_run)?;
    log::info!("使用するネットワーク: {:?}", network);

    let secp: Secp256k1<AllContext> = Secp256k1::new();
    let signing_key = SigningKey::from_wif(&config.signer.wif, &secp)?;
    if signing_key.network_kind() != network.network_kind() {
        return Err(AppError::NetworkMismatch {
            configured: format!("{:?}", network),
            inferred: format!("{:?} (WIF)", signing_key.network_kind()),
        });
    }
    log::info!(
        "署名鍵のP2WPKHアドレス: {}",
        address::public_key_to_witness_address(signing_key.public_key(), network)
    );

    let request = TransactionRequest::from_file(&args.transaction)?;
    log::debug!("トランザクション情報のパース成功: {:?}", request);

    let broadcast_client: Box<dyn BroadcastClient> = if args.dry_run {
        Box::new(DryRunClient::new(args.output_file.clone()))
    } else {
        Box::new(BlockCypherClient::connect(&config.block_cypher)?)
    };

    let transaction_id = transaction::create_and_publish(
        &request,
        broadcast_client.as_ref(),
        &signing_key,
        network,
        &secp,
    )?;

    log::info!("処理が正常に完了しました。");
    if args.dry_run {
        println!("Transaction hash (未送信): {}", transaction_id);
    } else {
        println!("Published transaction hash: {}", transaction_id);
    }
    Ok(())
}
