use ed25519_dalek::{SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use std::fmt;

use super::crypto::{sign_digest, verify_signature, Address, Hash, OwnerSignature};

/// Errors that can occur during transaction operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransactionError {
    #[error("Output underflow: input value {input_value} is less than change {change} + fee {fee}")]
    OutputUnderflow {
        input_value: u32,
        change: u32,
        fee: u32,
    },

    #[error("No owner signature at input index {0}")]
    MissingSignature(usize),
}

/// The signed content of a transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBody {
    /// Body hashes of the transactions whose outputs are consumed
    pub input_transaction_hashes: Vec<Hash>,

    /// Public key allowed to spend this transaction's output
    pub next_owner: VerifyingKey,

    /// Sum of the output values of all inputs
    pub input_value: u32,

    /// Value kept back by the spender
    pub change: u32,

    /// Value left for the miner of the including block
    pub fee: u32,
}

impl TransactionBody {
    /// Calculates the body hash: inputs, compressed owner key, then the three values
    pub fn hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        for input_transaction_hash in &self.input_transaction_hashes {
            hasher.update(input_transaction_hash);
        }
        hasher.update(self.next_owner.as_bytes());
        hasher.update(self.input_value.to_le_bytes());
        hasher.update(self.change.to_le_bytes());
        hasher.update(self.fee.to_le_bytes());
        hasher.finalize().into()
    }
}

/// Wire form of a transaction
///
/// Neither the body hash nor the coinbase flag travel with it: the hash is
/// recomputed and a transaction without inputs is read back as a coinbase.
#[derive(Serialize, Deserialize)]
struct TransactionRecord {
    body: TransactionBody,
    owner_signatures: Vec<OwnerSignature>,
}

/// Represents an immutable transfer of value to a new owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TransactionRecord", into = "TransactionRecord")]
pub struct Transaction {
    body: TransactionBody,
    body_hash: Hash,
    owner_signatures: Vec<OwnerSignature>,
    is_coinbase: bool,
}

impl Transaction {
    /// Creates a new transaction
    ///
    /// # Arguments
    ///
    /// * `body` - The content to hash and sign
    /// * `signing_keys` - One key per input, in input order. Each should own the
    ///   corresponding input; that is checked during block validation, not here.
    /// * `is_coinbase` - Coinbase transactions carry no signatures
    ///
    /// # Returns
    ///
    /// A new Transaction instance
    pub fn new(body: TransactionBody, signing_keys: &[&SigningKey], is_coinbase: bool) -> Self {
        let body_hash = body.hash();

        let owner_signatures = if is_coinbase {
            Vec::new()
        } else {
            signing_keys
                .iter()
                .map(|key| sign_digest(key, &body_hash))
                .collect()
        };

        Transaction {
            body,
            body_hash,
            owner_signatures,
            is_coinbase,
        }
    }

    /// Creates a new coinbase transaction (mining reward plus fees)
    pub fn new_coinbase(next_owner: VerifyingKey, value: u32) -> Self {
        let body = TransactionBody {
            input_transaction_hashes: Vec::new(),
            next_owner,
            input_value: value,
            change: 0,
            fee: 0,
        };

        Self::new(body, &[], true)
    }

    pub fn body(&self) -> &TransactionBody {
        &self.body
    }

    pub fn body_hash(&self) -> &Hash {
        &self.body_hash
    }

    pub fn owner_signatures(&self) -> &[OwnerSignature] {
        &self.owner_signatures
    }

    pub fn is_coinbase(&self) -> bool {
        self.is_coinbase
    }

    /// Gets the value spendable by the next owner
    pub fn output_value(&self) -> Result<u32, TransactionError> {
        if self.is_coinbase {
            return Ok(self.body.input_value);
        }

        self.body
            .input_value
            .checked_sub(self.body.change)
            .and_then(|rest| rest.checked_sub(self.body.fee))
            .ok_or(TransactionError::OutputUnderflow {
                input_value: self.body.input_value,
                change: self.body.change,
                fee: self.body.fee,
            })
    }

    /// Checks that the signature at `index` was made by `owner` over this body hash
    pub fn verify_input_signature(
        &self,
        index: usize,
        owner: &VerifyingKey,
    ) -> Result<bool, TransactionError> {
        let signature = self
            .owner_signatures
            .get(index)
            .ok_or(TransactionError::MissingSignature(index))?;

        Ok(verify_signature(owner, &self.body_hash, signature))
    }
}

impl From<TransactionRecord> for Transaction {
    fn from(record: TransactionRecord) -> Self {
        Transaction {
            body_hash: record.body.hash(),
            is_coinbase: record.body.input_transaction_hashes.is_empty(),
            body: record.body,
            owner_signatures: record.owner_signatures,
        }
    }
}

impl From<Transaction> for TransactionRecord {
    fn from(transaction: Transaction) -> Self {
        TransactionRecord {
            body: transaction.body,
            owner_signatures: transaction.owner_signatures,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inputs: Vec<String> = self
            .body
            .input_transaction_hashes
            .iter()
            .map(hex::encode)
            .collect();

        writeln!(f, "txn {}", hex::encode(self.body_hash))?;
        writeln!(f, "  input txns [ {} ]", inputs.join(" "))?;
        writeln!(f, "  next owner {}", Address::from_public_key(&self.body.next_owner))?;
        writeln!(f, "  input value {}", self.body.input_value)?;
        writeln!(f, "  change {}", self.body.change)?;
        write!(f, "  fee {}", self.body.fee)
    }
}
