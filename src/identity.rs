//! # Worker Identity
//!
//! Ed25519 key material that authenticates a worker to the coordinator.
//!
//! The private key file holds the hex-encoded 32-byte signing seed. The public
//! key lives next to it with a `.pub` suffix and is sent to the server exactly
//! as persisted. Both files are read at call time, so rotating keys on disk
//! takes effect on the next registration without rebuilding the client.
//!
//! Signing uses the attached form: the value sent to the server is the 64-byte
//! signature followed by the signed phrase, hex encoded.

use ed25519_dalek::{
    Signature, Signer, SigningKey, VerifyingKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::{PUBLIC_KEY_SUFFIX, WORKER_AUTHENTICATION_PHRASE};
use crate::error::{WorkerError, WorkerResult};

/// Handle on a worker's key files
///
/// Holds paths only. Key bytes are loaded for the duration of a single call.
#[derive(Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    private_key_path: PathBuf,
}

impl fmt::Debug for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerIdentity")
            .field("private_key_path", &self.private_key_path)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

impl WorkerIdentity {
    /// Identity backed by the given private key file
    pub fn new(private_key_path: impl Into<PathBuf>) -> Self {
        Self {
            private_key_path: private_key_path.into(),
        }
    }

    /// Generate a fresh key pair and persist it
    ///
    /// Writes the hex seed to `private_key_path` and the hex verifying key to
    /// `private_key_path` + `.pub`. Existing files are overwritten.
    pub fn generate(private_key_path: impl Into<PathBuf>) -> WorkerResult<Self> {
        let identity = Self::new(private_key_path);
        let seed: [u8; SECRET_KEY_LENGTH] = rand::random();
        let signing_key = SigningKey::from_bytes(&seed);

        identity.write_key_file(&identity.private_key_path, &hex::encode(seed), true)?;
        identity.write_key_file(
            &identity.public_key_path(),
            &hex::encode(signing_key.verifying_key().to_bytes()),
            false,
        )?;

        debug!(
            private_key = %identity.private_key_path.display(),
            "Generated worker key pair"
        );
        Ok(identity)
    }

    /// Path of the private key file
    #[must_use]
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// Path of the paired public key file
    #[must_use]
    pub fn public_key_path(&self) -> PathBuf {
        let mut path = self.private_key_path.clone().into_os_string();
        path.push(PUBLIC_KEY_SUFFIX);
        PathBuf::from(path)
    }

    /// Sign the authentication phrase, returning the hex signed message
    pub fn sign_auth_phrase(&self) -> WorkerResult<String> {
        let signing_key = self.load_signing_key()?;
        let signature = signing_key.sign(WORKER_AUTHENTICATION_PHRASE);

        let mut signed = Vec::with_capacity(SIGNATURE_LENGTH + WORKER_AUTHENTICATION_PHRASE.len());
        signed.extend_from_slice(&signature.to_bytes());
        signed.extend_from_slice(WORKER_AUTHENTICATION_PHRASE);
        Ok(hex::encode(signed))
    }

    /// Public key exactly as persisted in the `.pub` file
    pub fn public_key_string(&self) -> WorkerResult<String> {
        let path = self.public_key_path();
        std::fs::read_to_string(&path)
            .map_err(|e| WorkerError::identity_error(path.display().to_string(), e.to_string()))
    }

    fn load_signing_key(&self) -> WorkerResult<SigningKey> {
        let path = self.private_key_path.display().to_string();
        let content = std::fs::read_to_string(&self.private_key_path)
            .map_err(|e| WorkerError::identity_error(&path, e.to_string()))?;

        let seed = hex::decode(content.trim())
            .map_err(|e| WorkerError::identity_error(&path, format!("invalid hex: {e}")))?;
        let seed: [u8; SECRET_KEY_LENGTH] = seed.try_into().map_err(|bytes: Vec<u8>| {
            WorkerError::identity_error(
                &path,
                format!(
                    "expected {SECRET_KEY_LENGTH} byte seed, found {} bytes",
                    bytes.len()
                ),
            )
        })?;

        Ok(SigningKey::from_bytes(&seed))
    }

    fn write_key_file(&self, path: &Path, content: &str, private: bool) -> WorkerResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .map_err(|e| WorkerError::identity_error(path.display().to_string(), e.to_string()))?;

        if private {
            restrict_to_owner(path)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> WorkerResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> WorkerResult<()> {
    Ok(())
}

/// Check a hex signed phrase against a hex public key
///
/// This is the check the coordinator performs on registration. It succeeds
/// only when the signature is valid and the attached message is the
/// authentication phrase.
#[must_use]
pub fn verify_signed_phrase(public_key_hex: &str, signed_phrase_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex.trim()) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; PUBLIC_KEY_LENGTH]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(signed) = hex::decode(signed_phrase_hex.trim()) else {
        return false;
    };
    if signed.len() < SIGNATURE_LENGTH {
        return false;
    }

    let (signature, message) = signed.split_at(SIGNATURE_LENGTH);
    let Ok(signature) = Signature::from_slice(signature) else {
        return false;
    };
    message == WORKER_AUTHENTICATION_PHRASE
        && verifying_key.verify_strict(message, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generated_identity_signs_verifiable_phrase() {
        let dir = TempDir::new().unwrap();
        let identity = WorkerIdentity::generate(dir.path().join("worker.key")).unwrap();

        let signed = identity.sign_auth_phrase().unwrap();
        let public_key = identity.public_key_string().unwrap();
        assert!(verify_signed_phrase(&public_key, &signed));
    }

    #[test]
    fn test_public_key_path_appends_suffix() {
        let identity = WorkerIdentity::new("/keys/worker_1");
        assert_eq!(identity.public_key_path(), PathBuf::from("/keys/worker_1.pub"));
    }

    #[test]
    fn test_mismatched_public_key_fails_verification() {
        let dir = TempDir::new().unwrap();
        let first = WorkerIdentity::generate(dir.path().join("a.key")).unwrap();
        let second = WorkerIdentity::generate(dir.path().join("b.key")).unwrap();

        let signed = first.sign_auth_phrase().unwrap();
        assert!(!verify_signed_phrase(
            &second.public_key_string().unwrap(),
            &signed
        ));
    }

    #[test]
    fn test_tampered_message_fails_verification() {
        let dir = TempDir::new().unwrap();
        let identity = WorkerIdentity::generate(dir.path().join("worker.key")).unwrap();
        let mut signed = hex::decode(identity.sign_auth_phrase().unwrap()).unwrap();
        let last = signed.len() - 1;
        signed[last] ^= 0x01;

        assert!(!verify_signed_phrase(
            &identity.public_key_string().unwrap(),
            &hex::encode(signed)
        ));
    }

    #[test]
    fn test_malformed_private_key_is_identity_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.key");
        std::fs::write(&path, "not-hex").unwrap();

        let err = WorkerIdentity::new(&path).sign_auth_phrase().unwrap_err();
        assert!(matches!(err, WorkerError::IdentityError { .. }));
    }

    #[test]
    fn test_missing_public_key_is_identity_error() {
        let identity = WorkerIdentity::new("/nonexistent/worker.key");
        assert!(matches!(
            identity.public_key_string(),
            Err(WorkerError::IdentityError { .. })
        ));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let identity = WorkerIdentity::new("/keys/worker.key");
        let debug = format!("{identity:?}");
        assert!(debug.contains("[REDACTED]"));
    }
}
