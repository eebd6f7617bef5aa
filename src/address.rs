use bitcoin::{Address, CompressedPublicKey, ScriptBuf, WPubkeyHash};
use std::str::FromStr;

use crate::{error::AppError, types::NetworkParams};

/// RIPEMD160(SHA256(圧縮公開鍵))
pub fn witness_program(public_key: &CompressedPublicKey) -> WPubkeyHash {
    public_key.wpubkey_hash()
}

/// 公開鍵からP2WPKH (bech32, segwit v0) アドレスを導出する
pub fn public_key_to_witness_address(public_key: &CompressedPublicKey, network: NetworkParams) -> String {
    Address::p2wpkh(public_key, network.to_bitcoin_network()).to_string()
}

/// アドレス文字列をロックスクリプトへ変換する。ネットワークが一致しない場合はエラー。
pub fn address_to_script(address: &str, network: NetworkParams) -> Result<ScriptBuf, AppError> {
    let address = Address::from_str(address)
        .and_then(|addr| addr.require_network(network.to_bitcoin_network()))
        .map_err(|e| AppError::AddressDecode {
            output: None,
            address: address.to_string(),
            reason: e.to_string(),
        })?;
    Ok(address.script_pubkey())
}
