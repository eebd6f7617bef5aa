use bitcoin::{script::ScriptBuf, Network as BitcoinNetwork, NetworkKind, WitnessVersion};
use serde::Deserialize;

/// トランザクション構築時に固定されるネットワーク
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NetworkParams {
    Mainnet,
    Testnet,
}

impl NetworkParams {
    pub fn to_bitcoin_network(self) -> BitcoinNetwork {
        match self {
            NetworkParams::Mainnet => BitcoinNetwork::Bitcoin,
            NetworkParams::Testnet => BitcoinNetwork::Testnet,
        }
    }

    pub fn network_kind(self) -> NetworkKind {
        NetworkKind::from(self.to_bitcoin_network())
    }
}

/// 使用するUTXOのロックスクリプトの分類。署名ごとに一度だけ判定する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpentOutput {
    Legacy { script_pubkey: ScriptBuf },
    Witness { version: WitnessVersion, script_pubkey: ScriptBuf },
}

impl SpentOutput {
    /// バージョンバイト + 2..40バイトのプッシュであればwitness program
    pub fn classify(script_pubkey: ScriptBuf) -> Self {
        match script_pubkey.witness_version() {
            Some(version) if script_pubkey.is_witness_program() => {
                SpentOutput::Witness { version, script_pubkey }
            }
            _ => SpentOutput::Legacy { script_pubkey },
        }
    }

    pub fn script_pubkey(&self) -> &ScriptBuf {
        match self {
            SpentOutput::Legacy { script_pubkey } | SpentOutput::Witness { script_pubkey, .. } => {
                script_pubkey
            }
        }
    }

    pub fn is_witness(&self) -> bool {
        matches!(self, SpentOutput::Witness { .. })
    }
}

/// transaction.json の内容
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRequest {
    pub source_tx_hash: String,
    pub source_tx_output_index: u32,
    pub source_tx_output_amount: u64,
    pub source_tx_output_script: String,
    #[serde(rename = "output1Address")]
    pub destination_address1: String,
    #[serde(rename = "output1Amount")]
    pub funding_amount: u64,
    #[serde(rename = "output2Address")]
    pub destination_address2: String,
    pub fee: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(hex_str: &str) -> ScriptBuf {
        ScriptBuf::from_hex(hex_str).unwrap()
    }

    #[test]
    fn p2wpkh_is_witness() {
        let spent = SpentOutput::classify(script("0014751e76e8199196d454941c45d1b3a323f1433bd6"));
        assert!(matches!(spent, SpentOutput::Witness { version: WitnessVersion::V0, .. }));
    }

    #[test]
    fn p2tr_is_witness_v1() {
        let spent = SpentOutput::classify(script(
            "5120a60869f0dbcf1dc659c9cecbaf8050135ea9e8cdc487053f1dc6880949dc684c",
        ));
        assert!(matches!(spent, SpentOutput::Witness { version: WitnessVersion::V1, .. }));
    }

    #[test]
    fn p2pkh_and_p2sh_are_legacy() {
        let p2pkh = SpentOutput::classify(script("76a914751e76e8199196d454941c45d1b3a323f1433bd688ac"));
        let p2sh = SpentOutput::classify(script("a914751e76e8199196d454941c45d1b3a323f1433bd687"));
        assert!(!p2pkh.is_witness());
        assert!(!p2sh.is_witness());
    }

    #[test]
    fn short_program_is_legacy() {
        // 1バイトのprogramはwitness programではない
        let spent = SpentOutput::classify(script("000101"));
        assert!(!spent.is_witness());
    }

    #[test]
    fn classification_is_pure() {
        let bytes = "0014751e76e8199196d454941c45d1b3a323f1433bd6";
        assert_eq!(SpentOutput::classify(script(bytes)), SpentOutput::classify(script(bytes)));
        assert_eq!(SpentOutput::classify(script(bytes)).script_pubkey(), &script(bytes));
    }

    #[test]
    fn request_uses_original_field_names() {
        let json = r#"{
            "sourceTxHash": "aa",
            "sourceTxOutputIndex": 1,
            "sourceTxOutputAmount": 100000,
            "sourceTxOutputScript": "0014",
            "output1Address": "addr1",
            "output1Amount": 50000,
            "output2Address": "addr2",
            "fee": 1000
        }"#;
        let request: TransactionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.source_tx_output_index, 1);
        assert_eq!(request.destination_address1, "addr1");
        assert_eq!(request.funding_amount, 50000);
        assert_eq!(request.destination_address2, "addr2");
        assert_eq!(request.fee, 1000);
    }
}
