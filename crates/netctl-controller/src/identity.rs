use ed25519_dalek::{Signer, SigningKey};
use sha2::{Digest, Sha256};

/// The fixed 12-byte ASN.1 prefix for an Ed25519 `SubjectPublicKeyInfo`
/// (no algorithm parameters): `SEQUENCE { SEQUENCE { OID ed25519 } BIT
/// STRING }` up to the raw 32-byte key.
const ED25519_SPKI_PREFIX: [u8; 12] = [0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00];

/// Wraps the node's Ed25519 private key for request signing.
///
/// Every request is signed over `"{url}\n{nonce}\n{qs_or_body}"`; the
/// client identifies itself via `client_id`, the SHA-256 hex digest of
/// its public key's SPKI-DER encoding, so the controller can look up the
/// matching public key without the client sending it on every call.
pub struct SigningIdentity {
    signing_key: SigningKey,
    client_id: String,
}

impl SigningIdentity {
    /// Loads a signing identity from a hex-encoded raw 32-byte Ed25519
    /// private key as stored in [`NodeSettings`].
    ///
    /// [`NodeSettings`]: netctl_types::NodeSettings
    ///
    /// # Errors
    ///
    /// Returns an error if `private_key` doesn't decode to 32 bytes.
    pub fn from_hex(private_key: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(private_key.trim())?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(Self::from_bytes(&bytes))
    }

    /// Builds an identity directly from raw signing-key bytes.
    #[must_use]
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let client_id = Self::derive_client_id(&signing_key);
        Self { signing_key, client_id }
    }

    fn derive_client_id(signing_key: &SigningKey) -> String {
        let verifying_key = signing_key.verifying_key();
        let mut spki = Vec::with_capacity(ED25519_SPKI_PREFIX.len() + 32);
        spki.extend_from_slice(&ED25519_SPKI_PREFIX);
        spki.extend_from_slice(verifying_key.as_bytes());
        hex::encode(Sha256::digest(&spki))
    }

    /// `X-Client-Id`: SHA-256 hex of this identity's public key SPKI-DER.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Signs `message` and returns the hex-encoded signature for
    /// `X-Client-Sign`.
    #[must_use]
    pub fn sign_hex(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_stable_for_the_same_key() {
        let identity = SigningIdentity::from_bytes(&[7u8; 32]);
        assert_eq!(identity.client_id(), SigningIdentity::from_bytes(&[7u8; 32]).client_id());
    }

    #[test]
    fn different_keys_produce_different_client_ids() {
        let a = SigningIdentity::from_bytes(&[1u8; 32]);
        let b = SigningIdentity::from_bytes(&[2u8; 32]);
        assert_ne!(a.client_id(), b.client_id());
    }

    #[test]
    fn signature_hex_is_128_chars() {
        let identity = SigningIdentity::from_bytes(&[9u8; 32]);
        assert_eq!(identity.sign_hex(b"https://example.com/x\nabc\n").len(), 128);
    }

    #[test]
    fn from_hex_round_trips_raw_key_bytes() {
        let bytes = [3u8; 32];
        let identity = SigningIdentity::from_hex(&hex::encode(bytes)).expect("decode");
        assert_eq!(identity.client_id(), SigningIdentity::from_bytes(&bytes).client_id());
    }
}
