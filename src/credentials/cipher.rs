use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::RngCore;
use thiserror::Error;
use tracing::warn;

/// Prefixes identify which scheme produced a ciphertext so decryption can be
/// routed without guessing.
const SESSION_PREFIX: &str = "v1:";
const OBFUSCATED_PREFIX: &str = "obf:";

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("ciphertext is not in a recognized format")]
    UnknownFormat,
    #[error("ciphertext could not be decoded: {0}")]
    Decode(String),
    #[error("encryption capability unavailable: {0}")]
    Unavailable(String),
}

/// Pluggable encryption capability consumed by the credential store.
///
/// The concrete cipher is deliberately out of scope; anything implementing
/// this trait can be plugged in.
pub trait Encryptor: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Keystream cipher bound to a key generated once per session.
///
/// The key lives only in process memory: ciphertext persisted to disk becomes
/// unreadable once the session ends. That trade-off is intentional.
pub struct SessionCipher {
    key: Vec<u8>,
}

impl SessionCipher {
    pub fn new() -> Self {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        Self { key }
    }

    fn apply_keystream(&self, data: &[u8]) -> Vec<u8> {
        data.iter()
            .enumerate()
            .map(|(i, b)| b ^ self.key[i % self.key.len()])
            .collect()
    }
}

impl Default for SessionCipher {
    fn default() -> Self {
        Self::new()
    }
}

impl Encryptor for SessionCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let mixed = self.apply_keystream(plaintext.as_bytes());
        Ok(format!("{}{}", SESSION_PREFIX, STANDARD.encode(mixed)))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let encoded = ciphertext
            .strip_prefix(SESSION_PREFIX)
            .ok_or(CipherError::UnknownFormat)?;
        let mixed = STANDARD
            .decode(encoded)
            .map_err(|e| CipherError::Decode(e.to_string()))?;
        String::from_utf8(self.apply_keystream(&mixed))
            .map_err(|e| CipherError::Decode(e.to_string()))
    }
}

/// Reversible base64 obfuscation. Not a security guarantee, only a last
/// resort so the secret is at least never stored verbatim.
pub struct ObfuscatingEncoder;

impl Encryptor for ObfuscatingEncoder {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(format!(
            "{}{}",
            OBFUSCATED_PREFIX,
            STANDARD.encode(plaintext.as_bytes())
        ))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let encoded = ciphertext
            .strip_prefix(OBFUSCATED_PREFIX)
            .ok_or(CipherError::UnknownFormat)?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| CipherError::Decode(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| CipherError::Decode(e.to_string()))
    }
}

/// Decorator over the primary cipher that degrades to reversible obfuscation
/// when the primary capability is unavailable or fails.
///
/// Failure is expressed through the returned `Result`, never intercepted at
/// runtime; the downgrade is logged once per affected operation.
pub struct FallbackEncryptor {
    primary: Option<Box<dyn Encryptor>>,
    fallback: ObfuscatingEncoder,
}

impl FallbackEncryptor {
    pub fn new(primary: Option<Box<dyn Encryptor>>) -> Self {
        Self {
            primary,
            fallback: ObfuscatingEncoder,
        }
    }

    pub fn with_session_cipher() -> Self {
        Self::new(Some(Box::new(SessionCipher::new())))
    }
}

impl Encryptor for FallbackEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        match &self.primary {
            Some(primary) => match primary.encrypt(plaintext) {
                Ok(ciphertext) => Ok(ciphertext),
                Err(e) => {
                    warn!("encryption capability failed ({e}), downgrading to reversible obfuscation");
                    self.fallback.encrypt(plaintext)
                }
            },
            None => {
                warn!("no encryption capability configured, downgrading to reversible obfuscation");
                self.fallback.encrypt(plaintext)
            }
        }
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        if ciphertext.starts_with(OBFUSCATED_PREFIX) {
            return self.fallback.decrypt(ciphertext);
        }
        match &self.primary {
            Some(primary) => primary.decrypt(ciphertext),
            None => Err(CipherError::Unavailable(
                "session cipher required for this ciphertext".into(),
            )),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn session_cipher_round_trip() {
        let cipher = SessionCipher::new();
        let ciphertext = cipher.encrypt("s3cret").unwrap();
        assert!(ciphertext.starts_with("v1:"));
        assert!(!ciphertext.contains("s3cret"));
        assert_eq!(cipher.decrypt(&ciphertext).unwrap(), "s3cret");
    }

    #[test]
    fn different_sessions_cannot_read_each_other() {
        let first = SessionCipher::new();
        let second = SessionCipher::new();
        let ciphertext = first.encrypt("s3cret").unwrap();
        // Either the keystream garbles the bytes or utf8 decoding fails;
        // in no case does the other session recover the plaintext.
        match second.decrypt(&ciphertext) {
            Ok(recovered) => assert_ne!(recovered, "s3cret"),
            Err(_) => {}
        }
    }

    #[test]
    fn fallback_is_used_when_no_primary_exists() {
        let encryptor = FallbackEncryptor::new(None);
        let ciphertext = encryptor.encrypt("s3cret").unwrap();
        assert!(ciphertext.starts_with("obf:"));
        assert_eq!(encryptor.decrypt(&ciphertext).unwrap(), "s3cret");
    }

    #[test]
    fn decrypt_routes_on_prefix() {
        let encryptor = FallbackEncryptor::with_session_cipher();
        let obfuscated = ObfuscatingEncoder.encrypt("s3cret").unwrap();
        assert_eq!(encryptor.decrypt(&obfuscated).unwrap(), "s3cret");
        assert!(matches!(
            encryptor.decrypt("garbage"),
            Err(CipherError::UnknownFormat)
        ));
    }
}
