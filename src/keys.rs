// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Private key references.
//!
//! A tree never stores key material in the clear; it stores a reference that
//! the signing collaborator resolves. The set of key sources is closed: to
//! support a new backend, add a variant here and a matching arm in the node's
//! signer factory. Existing trees keep decoding because variants are only
//! ever appended.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use serde::{Deserialize, Serialize};

/// Write-only reference to a signing key.
///
/// Re-pointing a tree at a different variant is allowed as long as it
/// resolves to the same logical key.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrivateKeyRef {
    /// PKCS#8 PEM file on the signer's filesystem, optionally encrypted.
    PemFile {
        path: String,
        #[serde(default)]
        password: Option<String>,
    },
    /// PKCS#8 DER bytes held inline.
    PrivateKey { der: Vec<u8> },
}

impl PrivateKeyRef {
    pub fn kind(&self) -> &'static str {
        match self {
            PrivateKeyRef::PemFile { .. } => "PEM_FILE",
            PrivateKeyRef::PrivateKey { .. } => "PRIVATE_KEY",
        }
    }
}

impl fmt::Debug for PrivateKeyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKeyRef::PemFile { path, password } => f
                .debug_struct("PemFile")
                .field("path", path)
                .field("password", &password.as_ref().map(|_| "<redacted>"))
                .finish(),
            PrivateKeyRef::PrivateKey { der } => f
                .debug_struct("PrivateKey")
                .field("der", &alloc::format!("<{} bytes redacted>", der.len()))
                .finish(),
        }
    }
}

/// BLAKE3 fingerprint of an encoded public key, used to identify keys in logs.
pub fn key_fingerprint(public_key: &[u8]) -> [u8; 32] {
    *blake3::hash(public_key).as_bytes()
}
