use chrono::{DateTime, SecondsFormat, Utc};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use std::fmt;

/// SHA-256 digest used for every block and transaction identity
pub type Hash = [u8; 32];

/// Encodes a timestamp the same way for the same instant, down to the nanosecond
///
/// RFC 3339 in UTC with trailing zeros of the fraction trimmed, and no
/// fraction at all on a whole second.
pub fn canonical_timestamp(timestamp: &DateTime<Utc>) -> String {
    let text = timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true);
    match text.strip_suffix('Z').and_then(|rest| rest.split_once('.')) {
        Some((seconds, fraction)) => {
            let fraction = fraction.trim_end_matches('0');
            if fraction.is_empty() {
                format!("{}Z", seconds)
            } else {
                format!("{}.{}Z", seconds, fraction)
            }
        }
        None => text,
    }
}

/// Combines a block's static hash with the fields the miner is allowed to change
pub fn full_hash(static_hash: &Hash, nonce: u32, timestamp: &DateTime<Utc>) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(static_hash);
    hasher.update(nonce.to_le_bytes());
    hasher.update(canonical_timestamp(timestamp).as_bytes());
    hasher.finalize().into()
}

/// Represents a human readable owner address (public key in base58 format)
///
/// Only used for display; hashing and verification work on the raw key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Creates a new address from a public key
    pub fn from_public_key(public_key: &VerifyingKey) -> Self {
        Address(bs58::encode(public_key.as_bytes()).into_string())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two scalar components of an Ed25519 signature made by a previous owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl OwnerSignature {
    pub fn from_signature(signature: &Signature) -> Self {
        OwnerSignature {
            r: *signature.r_bytes(),
            s: *signature.s_bytes(),
        }
    }

    pub fn to_signature(&self) -> Signature {
        Signature::from_components(self.r, self.s)
    }
}

/// Represents a wallet with a keypair
#[derive(Debug, Clone)]
pub struct Wallet {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    address: Address,
}

impl Wallet {
    /// Creates a new wallet with a random keypair
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = SigningKey::generate(&mut csprng);
        let verifying_key = signing_key.verifying_key();
        let address = Address::from_public_key(&verifying_key);

        Wallet {
            signing_key,
            verifying_key,
            address,
        }
    }

    /// Gets the wallet's address
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Gets the wallet's public key
    pub fn public_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Gets the wallet's private key
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Signs a digest with the wallet's private key
    pub fn sign(&self, digest: &Hash) -> OwnerSignature {
        sign_digest(&self.signing_key, digest)
    }
}

/// Signs a digest with the given private key
pub fn sign_digest(signing_key: &SigningKey, digest: &Hash) -> OwnerSignature {
    OwnerSignature::from_signature(&signing_key.sign(digest))
}

/// Verifies an owner signature over a digest against a public key
pub fn verify_signature(
    public_key: &VerifyingKey,
    digest: &Hash,
    signature: &OwnerSignature,
) -> bool {
    public_key
        .verify(digest, &signature.to_signature())
        .is_ok()
}
