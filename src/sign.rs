use bitcoin::{
    ecdsa,
    hashes::Hash,
    script::{Builder, PushBytesBuf},
    secp256k1::{Message, Secp256k1, Signing, Verification},
    sighash::{EcdsaSighashType, SighashCache},
    Amount, PublicKey, Script, ScriptBuf, Transaction, TxIn, Witness, WitnessVersion,
};

use crate::{address::witness_program, error::AppError, keys::SigningKey, types::SpentOutput};

const SIGHASH_TYPE: EcdsaSighashType = EcdsaSighashType::All;

/// ロックスクリプトの種類に応じて署名方式を選び、指定された入力にだけ署名を書き込む。
pub fn sign_input<C: Signing + Verification>(
    transaction: &mut Transaction,
    input_index: usize,
    spent_output: &SpentOutput,
    amount: Amount,
    key: &SigningKey,
    secp: &Secp256k1<C>,
) -> Result<(), AppError> {
    match spent_output {
        SpentOutput::Legacy { script_pubkey } => {
            sign_no_witness(transaction, input_index, script_pubkey, key, secp)
        }
        // 単一鍵の署名で使えるのはsegwit v0のみ (v1以降はSchnorr署名)
        SpentOutput::Witness { version, script_pubkey } if *version != WitnessVersion::V0 => {
            Err(AppError::UnsupportedWitnessProgram {
                input_index,
                script_hex: script_pubkey.to_hex_string(),
            })
        }
        SpentOutput::Witness { script_pubkey, .. } => {
            sign_witness(transaction, input_index, script_pubkey, amount, key, secp)
        }
    }
}

/// レガシー署名。scriptSig = <署名||sighash type> <圧縮公開鍵>
pub fn sign_no_witness<C: Signing + Verification>(
    transaction: &mut Transaction,
    input_index: usize,
    script_pubkey: &Script,
    key: &SigningKey,
    secp: &Secp256k1<C>,
) -> Result<(), AppError> {
    log::debug!("入力 {} のレガシー署名ハッシュを計算します。", input_index);
    let expected = ScriptBuf::new_p2pkh(&PublicKey::from(*key.public_key()).pubkey_hash());
    if script_pubkey.is_p2pkh() && script_pubkey != expected.as_script() {
        log::warn!("入力 {} のP2PKHスクリプトは署名鍵の公開鍵ハッシュと一致しません。", input_index);
    }

    let sighash = SighashCache::new(&*transaction)
        .legacy_signature_hash(input_index, script_pubkey, SIGHASH_TYPE.to_u32())
        .map_err(|e| AppError::Signature { input_index, reason: e.to_string() })?;
    let signature = sign_digest(sighash.to_byte_array(), input_index, key, secp)?;

    let script_sig = Builder::new()
        .push_slice(PushBytesBuf::try_from(signature.to_vec())
            .map_err(|_| AppError::Signature { input_index, reason: "署名のPushBytes変換に失敗".to_string() })?)
        .push_key(&PublicKey::from(*key.public_key()))
        .into_script();

    let input = input_mut(transaction, input_index)?;
    input.script_sig = script_sig;
    input.witness = Witness::new();
    log::debug!("入力 {} (legacy) の署名適用完了。", input_index);
    Ok(())
}

/// BIP-143署名。witness = [署名||sighash type, 圧縮公開鍵]
///
/// `amount` は使用するUTXOの正確な額でなければならない。誤った額でもローカルではエラーにならず、
/// ネットワークに拒否される署名になる。
pub fn sign_witness<C: Signing + Verification>(
    transaction: &mut Transaction,
    input_index: usize,
    script_pubkey: &Script,
    amount: Amount,
    key: &SigningKey,
    secp: &Secp256k1<C>,
) -> Result<(), AppError> {
    // v0のうち単一鍵で署名できるのは20バイトprogram (P2WPKH) のみ
    if !script_pubkey.is_p2wpkh() {
        return Err(AppError::UnsupportedWitnessProgram {
            input_index,
            script_hex: script_pubkey.to_hex_string(),
        });
    }
    let expected = ScriptBuf::new_p2wpkh(&witness_program(key.public_key()));
    if script_pubkey != expected.as_script() {
        log::warn!("入力 {} のwitness programは署名鍵の公開鍵ハッシュと一致しません。", input_index);
    }

    log::debug!("入力 {} のBIP-143署名ハッシュを計算します (amount={})。", input_index, amount);
    let sighash = {
        let mut sighash_cache = SighashCache::new(&*transaction);
        sighash_cache
            .p2wpkh_signature_hash(input_index, script_pubkey, amount, SIGHASH_TYPE)
            .map_err(|e| AppError::Signature { input_index, reason: e.to_string() })?
    };
    let signature = sign_digest(sighash.to_byte_array(), input_index, key, secp)?;

    let mut witness = Witness::new();
    witness.push(signature.to_vec());
    witness.push(key.public_key().to_bytes());

    let input = input_mut(transaction, input_index)?;
    input.script_sig = ScriptBuf::new();
    input.witness = witness;
    log::debug!("入力 {} (witness) の署名適用完了。", input_index);
    Ok(())
}

// RFC6979の決定的ECDSA (low-S)。生成した署名はその場で検証する。
fn sign_digest<C: Signing + Verification>(
    digest: [u8; 32],
    input_index: usize,
    key: &SigningKey,
    secp: &Secp256k1<C>,
) -> Result<ecdsa::Signature, AppError> {
    let message = Message::from_digest(digest);
    let signature = secp.sign_ecdsa(&message, key.secret_key());
    secp.verify_ecdsa(&message, &signature, &key.public_key().0)
        .map_err(|e| AppError::Signature { input_index, reason: e.to_string() })?;
    Ok(ecdsa::Signature { signature, sighash_type: SIGHASH_TYPE })
}

fn input_mut(transaction: &mut Transaction, input_index: usize) -> Result<&mut TxIn, AppError> {
    let input_count = transaction.input.len();
    transaction.input.get_mut(input_index).ok_or_else(|| AppError::Signature {
        input_index,
        reason: format!("入力数 {} の範囲外です", input_count),
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use bitcoin::script::Instruction;
    use bitcoin::secp256k1::{All, SecretKey};
    use bitcoin::{Network, PrivateKey};

    pub fn key_from_byte(byte: u8, secp: &Secp256k1<All>) -> SigningKey {
        let sk = SecretKey::from_slice(&[byte; 32]).unwrap();
        SigningKey::from_wif(&PrivateKey::new(sk, Network::Testnet).to_wif(), secp).unwrap()
    }

    pub fn p2pkh_script(key: &SigningKey) -> ScriptBuf {
        ScriptBuf::new_p2pkh(&PublicKey::from(*key.public_key()).pubkey_hash())
    }

    pub fn p2wpkh_script(key: &SigningKey) -> ScriptBuf {
        ScriptBuf::new_p2wpkh(&key.public_key().wpubkey_hash())
    }

    /// scriptSigの署名を未署名トランザクションのレガシーsighashに対して検証する
    pub fn verify_legacy(
        signed: &Transaction,
        unsigned: &Transaction,
        input_index: usize,
        script_pubkey: &Script,
        secp: &Secp256k1<All>,
    ) -> bool {
        let pushes: Vec<Vec<u8>> = signed.input[input_index]
            .script_sig
            .instructions()
            .map(|instruction| match instruction.unwrap() {
                Instruction::PushBytes(bytes) => bytes.as_bytes().to_vec(),
                Instruction::Op(op) => panic!("unexpected opcode {:?}", op),
            })
            .collect();
        assert_eq!(pushes.len(), 2);
        let signature = ecdsa::Signature::from_slice(&pushes[0]).unwrap();
        assert_eq!(signature.sighash_type, EcdsaSighashType::All);
        let public_key = PublicKey::from_slice(&pushes[1]).unwrap();
        assert!(public_key.compressed);
        // 公開鍵はロックスクリプトのハッシュと一致する必要がある
        if script_pubkey.is_p2pkh() && ScriptBuf::new_p2pkh(&public_key.pubkey_hash()).as_script() != script_pubkey {
            return false;
        }

        let sighash = SighashCache::new(unsigned)
            .legacy_signature_hash(input_index, script_pubkey, EcdsaSighashType::All.to_u32())
            .unwrap();
        let message = Message::from_digest(sighash.to_byte_array());
        secp.verify_ecdsa(&message, &signature.signature, &public_key.inner).is_ok()
    }

    /// witnessの署名を未署名トランザクションのBIP-143 sighashに対して検証する
    pub fn verify_witness(
        signed: &Transaction,
        unsigned: &Transaction,
        input_index: usize,
        script_pubkey: &Script,
        amount: Amount,
        secp: &Secp256k1<All>,
    ) -> bool {
        let stack = signed.input[input_index].witness.to_vec();
        assert_eq!(stack.len(), 2);
        let signature = ecdsa::Signature::from_slice(&stack[0]).unwrap();
        let public_key = PublicKey::from_slice(&stack[1]).unwrap();
        assert!(public_key.compressed);

        let sighash = SighashCache::new(unsigned)
            .p2wpkh_signature_hash(input_index, script_pubkey, amount, EcdsaSighashType::All)
            .unwrap();
        let message = Message::from_digest(sighash.to_byte_array());
        secp.verify_ecdsa(&message, &signature.signature, &public_key.inner).is_ok()
    }
}
