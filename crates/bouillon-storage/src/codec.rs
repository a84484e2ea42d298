//! Serialization of the store to bytes, optionally sealed with AES-256-CBC.
//!
//! Sealed payloads are framed as `iv || ciphertext` so a file carries the IV
//! it was written with.

use std::fmt;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{distributions::Alphanumeric, rngs::OsRng, Rng, RngCore};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// 256-bit key.
pub const KEY_SIZE: usize = 32;
/// CBC initialization vector, one AES block.
pub const IV_SIZE: usize = 16;
const BLOCK_SIZE: usize = 16;

#[derive(Debug, Error)]
pub enum CodecError {
    /// Key material is not exactly [`KEY_SIZE`] bytes.
    #[error("encryption key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    /// Wrong key or IV, or a malformed/truncated ciphertext.
    #[error("decryption failed: {reason}")]
    Decryption { reason: String },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// AES-256 key material. `Debug` never prints the bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionKey {
    bytes: [u8; KEY_SIZE],
}

impl EncryptionKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CodecError::InvalidKeyLength {
            expected: KEY_SIZE,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    /// A fresh random alphanumeric key string, suitable for config files.
    pub fn generate() -> String {
        OsRng
            .sample_iter(&Alphanumeric)
            .take(KEY_SIZE)
            .map(char::from)
            .collect()
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl TryFrom<&str> for EncryptionKey {
    type Error = CodecError;

    /// Keys given as text use their UTF-8 bytes, so the string must be 32 bytes long.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_bytes(value.as_bytes())
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey").finish_non_exhaustive()
    }
}

/// Ciphertext together with the IV it was produced under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub iv: [u8; IV_SIZE],
    pub ciphertext: Vec<u8>,
}

impl Sealed {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() < IV_SIZE + BLOCK_SIZE {
            return Err(CodecError::Decryption {
                reason: format!("payload too short: {} bytes", bytes.len()),
            });
        }
        let (iv, ciphertext) = bytes.split_at(IV_SIZE);
        let mut iv_bytes = [0u8; IV_SIZE];
        iv_bytes.copy_from_slice(iv);
        Ok(Self {
            iv: iv_bytes,
            ciphertext: ciphertext.to_vec(),
        })
    }
}

/// Encrypt under a fresh random IV.
pub fn encrypt(plaintext: &[u8], key: &EncryptionKey) -> Sealed {
    let mut iv = [0u8; IV_SIZE];
    OsRng.fill_bytes(&mut iv);
    let ciphertext = encrypt_with_iv(plaintext, key, &iv);
    Sealed { iv, ciphertext }
}

fn encrypt_with_iv(plaintext: &[u8], key: &EncryptionKey, iv: &[u8; IV_SIZE]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key.as_bytes()).into(), &(*iv).into())
        .encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

pub fn decrypt(
    ciphertext: &[u8],
    key: &EncryptionKey,
    iv: &[u8; IV_SIZE],
) -> Result<Vec<u8>, CodecError> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CodecError::Decryption {
            reason: format!(
                "ciphertext length {} is not a positive multiple of {BLOCK_SIZE}",
                ciphertext.len()
            ),
        });
    }
    Aes256CbcDec::new(&(*key.as_bytes()).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| CodecError::Decryption {
            reason: "padding check failed (wrong key or corrupted data)".to_string(),
        })
}

/// Turns the store into file bytes and back. Without a key the codec is a
/// plain JSON pass-through.
#[derive(Debug, Clone, Default)]
pub struct StoreCodec {
    key: Option<EncryptionKey>,
}

impl StoreCodec {
    pub fn new(key: Option<EncryptionKey>) -> Self {
        Self { key }
    }

    pub fn is_encrypted(&self) -> bool {
        self.key.is_some()
    }

    pub fn encode(&self, entries: &Map<String, Value>) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_vec(entries)?;
        match &self.key {
            Some(key) => {
                let sealed = encrypt(&json, key);
                debug!(plain = json.len(), sealed = sealed.ciphertext.len(), "sealed store");
                Ok(sealed.to_bytes())
            }
            None => Ok(json),
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<Map<String, Value>, CodecError> {
        let Some(key) = &self.key else {
            return Ok(serde_json::from_slice(bytes)?);
        };

        let sealed = Sealed::from_bytes(bytes)?;
        let plain = decrypt(&sealed.ciphertext, key, &sealed.iv)?;
        // A wrong key can still produce valid padding; garbage never parses as an object.
        serde_json::from_slice(&plain).map_err(|err| CodecError::Decryption {
            reason: format!("decrypted payload is not a store: {err}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const KEY: &str = "PfHJgpKNEKawuTHDCRmdTZKMyfvSZGnf";
    const OTHER_KEY: &str = "0123456789abcdef0123456789abcdef";

    fn key(text: &str) -> EncryptionKey {
        EncryptionKey::try_from(text).expect("valid key")
    }

    fn sample() -> Map<String, Value> {
        match json!({ "hello": "world", "favorites": { "book": { "series": "The Witcher" } } }) {
            Value::Object(map) => map,
            _ => unreachable!("sample is an object"),
        }
    }

    #[test]
    fn encrypt_then_decrypt_restores_bytes() {
        let key = key(KEY);
        let payloads: [&[u8]; 4] = [b"", b"x", b"exactly sixteen!", &[0u8; 100]];
        for payload in payloads {
            let sealed = encrypt(payload, &key);
            assert_eq!(sealed.ciphertext.len() % BLOCK_SIZE, 0);
            let plain = decrypt(&sealed.ciphertext, &key, &sealed.iv).expect("decrypt");
            assert_eq!(plain, payload);
        }
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let key = key(KEY);
        let first = encrypt(b"same input", &key);
        let second = encrypt(b"same input", &key);
        assert_ne!(first.iv, second.iv);
        assert_ne!(first.ciphertext, second.ciphertext);
    }

    #[test]
    fn wrong_key_fails_padding_check() {
        let iv = [7u8; IV_SIZE];
        let ciphertext = encrypt_with_iv(b"{\"hello\":\"world\"}", &key(KEY), &iv);
        let err = decrypt(&ciphertext, &key(OTHER_KEY), &iv).expect_err("wrong key");
        assert!(matches!(err, CodecError::Decryption { .. }));
    }

    #[test]
    fn truncated_ciphertext_is_rejected() {
        let key = key(KEY);
        let sealed = encrypt(b"some longer payload that spans blocks", &key);
        let cut = &sealed.ciphertext[..sealed.ciphertext.len() - 3];
        let err = decrypt(cut, &key, &sealed.iv).expect_err("truncated");
        assert!(matches!(err, CodecError::Decryption { .. }));

        let err = decrypt(&[], &key, &sealed.iv).expect_err("empty");
        assert!(matches!(err, CodecError::Decryption { .. }));
    }

    #[test]
    fn key_length_is_enforced() {
        let err = EncryptionKey::try_from("too short").expect_err("short key");
        assert!(matches!(
            err,
            CodecError::InvalidKeyLength {
                expected: 32,
                actual: 9
            }
        ));
        assert!(EncryptionKey::from_bytes(&[1u8; 33]).is_err());
        assert!(EncryptionKey::from_bytes(&[1u8; 32]).is_ok());
    }

    #[test]
    fn generated_keys_are_usable() {
        let text = EncryptionKey::generate();
        assert_eq!(text.len(), KEY_SIZE);
        assert!(text.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(EncryptionKey::try_from(text.as_str()).is_ok());
    }

    #[test]
    fn debug_hides_key_bytes() {
        assert_eq!(format!("{:?}", key(KEY)), "EncryptionKey { .. }");
    }

    #[test]
    fn plain_codec_writes_json_text() {
        let codec = StoreCodec::default();
        let bytes = codec.encode(&sample()).expect("encode");
        assert_eq!(
            std::str::from_utf8(&bytes).expect("utf8"),
            r#"{"hello":"world","favorites":{"book":{"series":"The Witcher"}}}"#
        );
        assert_eq!(codec.decode(&bytes).expect("decode"), sample());
    }

    #[test]
    fn sealed_codec_round_trips_and_hides_plaintext() {
        let codec = StoreCodec::new(Some(key(KEY)));
        let bytes = codec.encode(&sample()).expect("encode");
        assert!(!bytes.windows(5).any(|w| w == b"world"));
        assert_eq!(codec.decode(&bytes).expect("decode"), sample());
    }

    #[test]
    fn sealed_codec_with_wrong_key_reports_decryption() {
        let bytes = StoreCodec::new(Some(key(KEY)))
            .encode(&sample())
            .expect("encode");
        let err = StoreCodec::new(Some(key(OTHER_KEY)))
            .decode(&bytes)
            .expect_err("wrong key");
        assert!(matches!(err, CodecError::Decryption { .. }));
    }

    #[test]
    fn short_payload_is_rejected() {
        let err = Sealed::from_bytes(&[0u8; IV_SIZE]).expect_err("no ciphertext");
        assert!(matches!(err, CodecError::Decryption { .. }));
    }

    #[test]
    fn plain_codec_rejects_non_object_json() {
        let err = StoreCodec::default()
            .decode(b"[1,2,3]")
            .expect_err("array is not a store");
        assert!(matches!(err, CodecError::Serialization(_)));
    }
}
