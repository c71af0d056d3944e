use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use pbkdf2::pbkdf2_hmac;
use rand::{rngs::OsRng, RngCore};
use serde_derive::{Deserialize, Serialize};
use sha2::Sha256;

use crate::errors::ServiceError;

pub const KEY_SIZE: usize = 32;
pub const NONCE_SIZE: usize = 12;
pub const PBKDF2_ROUNDS: u32 = 100_000;

/// Application-wide KDF salt. A domain-separation constant, not a secret:
/// every note shares it, so two notes sealed with the same passphrase get
/// the same key. Kept fixed for envelope compatibility; per-note salts
/// would need a versioned envelope format.
const KDF_SALT: &[u8] = b"secure-note-salt";

/// One encrypted note body: the nonce and the AEAD output (ciphertext plus
/// tag), serialized as JSON with plain number arrays.
#[derive(Debug, Deserialize, Serialize)]
pub struct Envelope {
    pub iv: Vec<u8>,
    pub data: Vec<u8>,
}

fn derive_key(passphrase: &str) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), KDF_SALT, PBKDF2_ROUNDS, &mut key);
    key
}

/// Encrypts `plaintext` under a passphrase-derived AES-256-GCM key and
/// returns the serialized envelope. Fails hard on any crypto error rather
/// than degrading to plaintext; the caller decides what to do with an
/// unencryptable note.
pub fn seal(plaintext: &str, passphrase: &str) -> Result<String, ServiceError> {
    if passphrase.is_empty() {
        return Err(ServiceError::Validation("passphrase must not be empty"));
    }

    let key = derive_key(passphrase);
    let cipher = Aes256Gcm::new((&key).into());

    let mut iv = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut iv);

    let data = cipher
        .encrypt(Nonce::from_slice(&iv), plaintext.as_bytes())
        .map_err(|err| {
            // never log the passphrase or derived key
            log::error!("envelope seal failed: {}", err);
            ServiceError::Cipher
        })?;

    let envelope = Envelope {
        iv: iv.to_vec(),
        data,
    };
    serde_json::to_string(&envelope).map_err(|err| {
        log::error!("envelope serialization failed: {}", err);
        ServiceError::Cipher
    })
}

/// Inverse of [`seal`]. When `is_encrypted` is false the content is passed
/// through verbatim; the store records that flag separately. Every failure
/// on the encrypted path (missing passphrase, malformed envelope, bad tag,
/// wrong key) collapses to `Decryption` — corrupted plaintext is never
/// returned.
pub fn open(
    content: &str,
    passphrase: Option<&str>,
    is_encrypted: bool,
) -> Result<String, ServiceError> {
    if !is_encrypted {
        return Ok(content.to_string());
    }

    let passphrase = match passphrase {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ServiceError::Decryption),
    };

    let envelope: Envelope =
        serde_json::from_str(content).map_err(|_| ServiceError::Decryption)?;
    if envelope.iv.len() != NONCE_SIZE {
        return Err(ServiceError::Decryption);
    }

    let key = derive_key(passphrase);
    let cipher = Aes256Gcm::new((&key).into());
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&envelope.iv), envelope.data.as_slice())
        .map_err(|_| ServiceError::Decryption)?;

    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_restores_plaintext() {
        let sealed = seal("hello world", "p@ss").unwrap();
        assert_eq!(open(&sealed, Some("p@ss"), true).unwrap(), "hello world");
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let sealed = seal("attack at dawn", "correct horse").unwrap();
        assert_eq!(
            open(&sealed, Some("battery staple"), true),
            Err(ServiceError::Decryption)
        );
    }

    #[test]
    fn plaintext_passthrough_when_not_encrypted() {
        assert_eq!(open("just text", None, false).unwrap(), "just text");
    }

    #[test]
    fn missing_passphrase_fails_closed() {
        let sealed = seal("secret", "k").unwrap();
        assert_eq!(open(&sealed, None, true), Err(ServiceError::Decryption));
        assert_eq!(open(&sealed, Some(""), true), Err(ServiceError::Decryption));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let sealed = seal("secret", "k").unwrap();
        let mut envelope: Envelope = serde_json::from_str(&sealed).unwrap();
        let last = envelope.data.len() - 1;
        envelope.data[last] ^= 0x01;
        let tampered = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            open(&tampered, Some("k"), true),
            Err(ServiceError::Decryption)
        );
    }

    #[test]
    fn garbage_envelope_is_rejected_not_passed_through() {
        assert_eq!(
            open("not an envelope", Some("k"), true),
            Err(ServiceError::Decryption)
        );
    }

    #[test]
    fn empty_passphrase_cannot_seal() {
        assert!(matches!(
            seal("text", ""),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn each_seal_uses_a_fresh_iv() {
        let a: Envelope = serde_json::from_str(&seal("same", "same").unwrap()).unwrap();
        let b: Envelope = serde_json::from_str(&seal("same", "same").unwrap()).unwrap();
        assert_ne!(a.iv, b.iv);
        assert_eq!(a.iv.len(), NONCE_SIZE);
    }

    #[test]
    fn envelope_json_uses_number_arrays() {
        let sealed = seal("x", "k").unwrap();
        let value: serde_json::Value = serde_json::from_str(&sealed).unwrap();
        assert!(value["iv"].is_array());
        assert!(value["data"].is_array());
    }
}
