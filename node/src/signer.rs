// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Signing collaborator.
//!
//! A tree's [`PrivateKeyRef`] is resolved into a [`Signer`] on demand by a
//! [`SignerFactory`]. Only Ed25519 keys (PKCS#8, PEM or DER) are backed by a
//! real implementation; other schemes are valid tree configuration but fail
//! to resolve.

use std::sync::Arc;

use arbor_kernel::{HashAlgorithm, PrivateKeyRef, SignatureAlgorithm};
use async_trait::async_trait;
use ed25519_dalek::pkcs8::DecodePrivateKey;
use ed25519_dalek::SigningKey;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SignerError {
    #[error("failed to read key file {path}: {reason}")]
    KeyFile { path: String, reason: String },
    #[error("failed to decode private key: {0}")]
    Decode(String),
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait Signer: Send + Sync {
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Digest the scheme applies to the message before signing.
    fn hash_algorithm(&self) -> HashAlgorithm;

    /// Raw encoded public key.
    fn public_key(&self) -> Vec<u8>;

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError>;
}

#[async_trait]
pub trait SignerFactory: Send + Sync {
    async fn new_signer(&self, key: &PrivateKeyRef) -> Result<Arc<dyn Signer>, SignerError>;
}

pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn from_pkcs8_pem(pem: &str, password: Option<&str>) -> Result<Self, SignerError> {
        let key = match password {
            Some(password) => SigningKey::from_pkcs8_encrypted_pem(pem, password.as_bytes()),
            None => SigningKey::from_pkcs8_pem(pem),
        }
        .map_err(|e| SignerError::Decode(e.to_string()))?;
        Ok(Self::new(key))
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, SignerError> {
        let key = SigningKey::from_pkcs8_der(der).map_err(|e| SignerError::Decode(e.to_string()))?;
        Ok(Self::new(key))
    }
}

#[async_trait]
impl Signer for Ed25519Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Ed25519
    }

    fn hash_algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha512
    }

    fn public_key(&self) -> Vec<u8> {
        self.key.verifying_key().to_bytes().to_vec()
    }

    async fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        use ed25519_dalek::Signer as _;
        Ok(self.key.sign(message).to_bytes().to_vec())
    }
}

/// Resolves keys from the local filesystem or inline DER.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyFileSignerFactory;

#[async_trait]
impl SignerFactory for KeyFileSignerFactory {
    async fn new_signer(&self, key: &PrivateKeyRef) -> Result<Arc<dyn Signer>, SignerError> {
        let signer = match key {
            PrivateKeyRef::PemFile { path, password } => {
                let pem = tokio::fs::read_to_string(path).await.map_err(|e| SignerError::KeyFile {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ed25519Signer::from_pkcs8_pem(&pem, password.as_deref())?
            }
            PrivateKeyRef::PrivateKey { der } => Ed25519Signer::from_pkcs8_der(der)?,
        };
        tracing::debug!(
            "Resolved {} key, fingerprint {}",
            key.kind(),
            hex::encode(&arbor_kernel::keys::key_fingerprint(&signer.public_key())[..8])
        );
        Ok(Arc::new(signer))
    }
}
