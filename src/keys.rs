use std::fmt;

use bitcoin::{
    secp256k1::{Secp256k1, Signing},
    CompressedPublicKey, NetworkKind, PrivateKey,
};

use crate::error::AppError;

/// WIFから復元した署名鍵。公開鍵は常に圧縮形式で保持する。
pub struct SigningKey {
    private_key: PrivateKey,
    public_key: CompressedPublicKey,
}

impl SigningKey {
    pub fn from_wif<C: Signing>(wif: &str, secp: &Secp256k1<C>) -> Result<Self, AppError> {
        let private_key = PrivateKey::from_wif(wif)?;
        // 非圧縮WIFであっても公開鍵は圧縮形式で導出する
        let public_key = CompressedPublicKey(private_key.inner.public_key(secp));
        Ok(SigningKey { private_key, public_key })
    }

    pub fn public_key(&self) -> &CompressedPublicKey {
        &self.public_key
    }

    /// WIFのバージョンバイトが示すネットワーク
    pub fn network_kind(&self) -> NetworkKind {
        self.private_key.network
    }

    pub(crate) fn secret_key(&self) -> &bitcoin::secp256k1::SecretKey {
        &self.private_key.inner
    }
}

// 秘密鍵はログに出さない
impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key)
            .field("network", &self.private_key.network)
            .finish_non_exhaustive()
    }
}
