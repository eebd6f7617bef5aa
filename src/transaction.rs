use bitcoin::{
    absolute::LockTime,
    consensus::{self, Encodable},
    secp256k1::{Secp256k1, Signing, Verification},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use std::str::FromStr;

use crate::{
    address::address_to_script,
    chain::BroadcastClient,
    error::AppError,
    keys::SigningKey,
    sign::sign_input,
    types::{NetworkParams, SpentOutput, TransactionRequest},
};

// Bitcoin Coreのデフォルトダスト閾値 (P2PKH/P2WPKH出力に対して)
const DUST_THRESHOLD_SATS: u64 = 546;

/// 署名対象の入力。トランザクションは常に入力を1つだけ持つ。
pub const FUNDING_INPUT_INDEX: usize = 0;

/// おつり額 = UTXO額 - 送金額 - 手数料。不足する場合はエラー。
pub fn remainder_amount(source_amount: u64, funding_amount: u64, fee: u64) -> Result<u64, AppError> {
    funding_amount
        .checked_add(fee)
        .and_then(|required| source_amount.checked_sub(required))
        .ok_or(AppError::InsufficientFunds {
            available: source_amount,
            funding: funding_amount,
            fee,
        })
}

/// 入力1つ (sequenceはデフォルト、署名なし)、出力2つ (送金、おつりの順) の未署名トランザクションを組み立てる。
/// 金額の整合性はここでは検証しない。
pub fn build_unsigned(
    source_tx_hash: &str,
    source_output_index: u32,
    destination_address1: &str,
    amount1: u64,
    destination_address2: &str,
    amount2: u64,
    network: NetworkParams,
) -> Result<Transaction, AppError> {
    let txid = Txid::from_str(source_tx_hash).map_err(|e| AppError::HashParse {
        value: source_tx_hash.to_string(),
        reason: e.to_string(),
    })?;

    let output1 = TxOut {
        value: Amount::from_sat(amount1),
        script_pubkey: output_script(1, destination_address1, network)?,
    };
    let output2 = TxOut {
        value: Amount::from_sat(amount2),
        script_pubkey: output_script(2, destination_address2, network)?,
    };
    log::debug!("出力1: address={}, value={}", destination_address1, amount1);
    log::debug!("出力2: address={}, value={}", destination_address2, amount2);

    Ok(Transaction {
        version: Version::ONE,
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: OutPoint::new(txid, source_output_index),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        }],
        output: vec![output1, output2],
    })
}

// デコード失敗時にどの出力かをエラーに残す
fn output_script(output: usize, address: &str, network: NetworkParams) -> Result<ScriptBuf, AppError> {
    address_to_script(address, network).map_err(|e| match e {
        AppError::AddressDecode { address, reason, .. } => AppError::AddressDecode {
            output: Some(output),
            address,
            reason,
        },
        other => other,
    })
}

/// ワイヤーフォーマットへのシリアライズ。witnessがあればmarker/flag付き。
pub fn serialize(transaction: &Transaction) -> Result<Vec<u8>, AppError> {
    let mut buffer = Vec::new();
    transaction
        .consensus_encode(&mut buffer)
        .map_err(|e| AppError::Serialize(e.to_string()))?;
    Ok(buffer)
}

pub fn deserialize(raw_transaction: &[u8]) -> Result<Transaction, AppError> {
    consensus::deserialize(raw_transaction).map_err(|e| AppError::Serialize(e.to_string()))
}

/// 未署名トランザクションの構築、署名、シリアライズまでを行う
pub fn create_signed_transaction<C: Signing + Verification>(
    request: &TransactionRequest,
    signing_key: &SigningKey,
    network: NetworkParams,
    secp: &Secp256k1<C>,
) -> Result<Vec<u8>, AppError> {
    log::info!("トランザクション構築処理を開始します。");
    let remainder = remainder_amount(
        request.source_tx_output_amount,
        request.funding_amount,
        request.fee,
    )?;
    if remainder < DUST_THRESHOLD_SATS {
        log::warn!("おつり {} sats はダスト閾値 {} sats 未満です。", remainder, DUST_THRESHOLD_SATS);
    }

    let mut transaction = build_unsigned(
        &request.source_tx_hash,
        request.source_tx_output_index,
        &request.destination_address1,
        request.funding_amount,
        &request.destination_address2,
        remainder,
        network,
    )?;

    let script_bytes = hex::decode(&request.source_tx_output_script)
        .map_err(|e| AppError::InputValidation(format!("sourceTxOutputScriptのデコード失敗: {}", e)))?;
    let spent_output = SpentOutput::classify(ScriptBuf::from_bytes(script_bytes));
    log::info!(
        "入力 {} に署名します (witness: {}, script: {})。",
        FUNDING_INPUT_INDEX,
        spent_output.is_witness(),
        spent_output.script_pubkey().to_hex_string()
    );
    sign_input(
        &mut transaction,
        FUNDING_INPUT_INDEX,
        &spent_output,
        Amount::from_sat(request.source_tx_output_amount),
        signing_key,
        secp,
    )?;

    let raw_transaction = serialize(&transaction)?;
    log::info!("署名済みトランザクション txid={}", transaction.compute_txid());
    log::debug!("Raw transaction hex: {}", hex::encode(&raw_transaction));
    Ok(raw_transaction)
}

/// 署名済みトランザクションを公開し、トランザクションIDを返す。
/// どの段階で失敗しても何も公開しない。
pub fn create_and_publish<C: Signing + Verification>(
    request: &TransactionRequest,
    broadcast_client: &dyn BroadcastClient,
    signing_key: &SigningKey,
    network: NetworkParams,
    secp: &Secp256k1<C>,
) -> Result<String, AppError> {
    let raw_transaction = create_signed_transaction(request, signing_key, network, secp)?;
    let transaction_id = broadcast_client.publish(&raw_transaction)?;
    log::info!("トランザクションを公開しました: {}", transaction_id);
    Ok(transaction_id)
}
