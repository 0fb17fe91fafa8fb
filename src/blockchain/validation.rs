// Candidate block validation
//
// Checks everything about a candidate block except its proof of work. The
// existing chain is assumed valid; historical blocks are never re-checked.

use chrono::{DateTime, Utc};
use log::debug;
use thiserror::Error;

use std::collections::HashMap;

use super::block::Block;
use super::crypto::Hash;
use super::params::{CURRENT_VERSION, GENESIS_ID, MINING_REWARD};
use super::transaction::{Transaction, TransactionError};

fn short(hash: &Hash) -> String {
    hex::encode(hash)
}

fn short_opt(hash: &Option<Hash>) -> String {
    hash.as_ref().map(short).unwrap_or_else(|| "<none>".to_string())
}

/// Reasons a candidate block is rejected, in the order they are checked
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid version {actual}, want {expected}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Invalid id {actual}, want {expected}")]
    IdMismatch { expected: u32, actual: u32 },

    #[error("Invalid prev hash {}, want {}", short_opt(.actual), short(.expected))]
    PrevHashMismatch { expected: Hash, actual: Option<Hash> },

    #[error("Timestamp {actual} is not after tip timestamp {tip}")]
    NonMonotonicTimestamp {
        tip: DateTime<Utc>,
        actual: DateTime<Utc>,
    },

    #[error("Timestamp {actual} is after current time {now}")]
    FutureTimestamp {
        now: DateTime<Utc>,
        actual: DateTime<Utc>,
    },

    #[error("Block contains no transactions")]
    EmptyBlock,

    #[error(
        "First txn {} is not a coinbase without inputs: {inputs} inputs, {signatures} signatures",
        short(.transaction)
    )]
    InvalidCoinbase {
        transaction: Hash,
        inputs: usize,
        signatures: usize,
    },

    #[error("Txn {} at index {index} is a coinbase or has no inputs", short(.transaction))]
    MisplacedCoinbase { transaction: Hash, index: usize },

    #[error("Txn {} has {inputs} inputs but {signatures} owner signatures", short(.transaction))]
    SignatureCountMismatch {
        transaction: Hash,
        inputs: usize,
        signatures: usize,
    },

    #[error("Txn {} references unknown input txn {}", short(.transaction), short(.input))]
    UnknownInput { transaction: Hash, input: Hash },

    #[error("Txn {} has an invalid owner signature for input {index}", short(.transaction))]
    InvalidSignature { transaction: Hash, index: usize },

    #[error("Txn {} declares input value {actual}, inputs carry {expected}", short(.transaction))]
    ValueMismatch {
        transaction: Hash,
        expected: u64,
        actual: u32,
    },

    #[error(
        "Txn {} has input value {input_value} less than change + fee {required}",
        short(.transaction)
    )]
    InsufficientInputValue {
        transaction: Hash,
        input_value: u32,
        required: u64,
    },

    #[error("Coinbase txn has input value {actual}, want {expected}")]
    CoinbaseValueMismatch { expected: u64, actual: u32 },

    #[error("Transaction error: {0}")]
    TransactionError(#[from] TransactionError),
}

/// Transactions a candidate may spend from, keyed by body hash
///
/// Seeded with every historical transaction plus the candidate's coinbase, and
/// grown as each candidate transaction passes so later ones may spend it.
pub struct TransactionLookup<'a> {
    transactions: HashMap<Hash, &'a Transaction>,
}

impl<'a> TransactionLookup<'a> {
    /// Indexes every transaction in the given blocks
    pub fn from_blocks(blocks: &'a [Block]) -> Self {
        let transactions = blocks
            .iter()
            .flat_map(|block| block.transactions())
            .map(|transaction| (*transaction.body_hash(), transaction))
            .collect();

        TransactionLookup { transactions }
    }

    pub fn insert(&mut self, transaction: &'a Transaction) {
        self.transactions.insert(*transaction.body_hash(), transaction);
    }

    pub fn get(&self, hash: &Hash) -> Option<&'a Transaction> {
        self.transactions.get(hash).copied()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

/// Validates a candidate against the existing chain using the current time
pub fn validate_candidate(
    existing: &[Block],
    candidate: &Block,
) -> Result<(), ValidationError> {
    validate_candidate_at(existing, candidate, Utc::now())
}

/// Validates a candidate against the existing chain, treating `now` as the current time
///
/// Checks run in a fixed order and the first violation is returned.
pub fn validate_candidate_at(
    existing: &[Block],
    candidate: &Block,
    now: DateTime<Utc>,
) -> Result<(), ValidationError> {
    let body = candidate.body();

    if body.version != CURRENT_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: CURRENT_VERSION,
            actual: body.version,
        });
    }

    check_linkage(existing.last(), candidate)?;

    if body.timestamp > now {
        return Err(ValidationError::FutureTimestamp {
            now,
            actual: body.timestamp,
        });
    }

    let (coinbase, spends) = body
        .transactions
        .split_first()
        .ok_or(ValidationError::EmptyBlock)?;

    check_coinbase_placement(coinbase, spends)?;

    let mut lookup = TransactionLookup::from_blocks(existing);
    lookup.insert(coinbase);

    let mut block_fees: u64 = 0;
    for transaction in spends {
        check_transaction(&lookup, transaction)?;
        lookup.insert(transaction);
        block_fees += u64::from(transaction.body().fee);
    }

    let expected = block_fees + u64::from(MINING_REWARD);
    if u64::from(coinbase.body().input_value) != expected {
        return Err(ValidationError::CoinbaseValueMismatch {
            expected,
            actual: coinbase.body().input_value,
        });
    }

    debug!(
        "Block {} (id {}) passed validation with {} txns",
        candidate.hash_hex(),
        body.id,
        body.transactions.len()
    );
    Ok(())
}

fn check_linkage(tip: Option<&Block>, candidate: &Block) -> Result<(), ValidationError> {
    let body = candidate.body();

    let Some(tip) = tip else {
        if body.id != GENESIS_ID {
            return Err(ValidationError::IdMismatch {
                expected: GENESIS_ID,
                actual: body.id,
            });
        }
        return Ok(());
    };

    let expected_id = tip.id().wrapping_add(1);
    if body.id != expected_id {
        return Err(ValidationError::IdMismatch {
            expected: expected_id,
            actual: body.id,
        });
    }

    if body.prev_hash.as_ref() != Some(tip.body_hash()) {
        return Err(ValidationError::PrevHashMismatch {
            expected: *tip.body_hash(),
            actual: body.prev_hash,
        });
    }

    if body.timestamp <= *tip.timestamp() {
        return Err(ValidationError::NonMonotonicTimestamp {
            tip: *tip.timestamp(),
            actual: body.timestamp,
        });
    }

    Ok(())
}

/// Only the first transaction may be a coinbase, and it must spend nothing
fn check_coinbase_placement(
    coinbase: &Transaction,
    spends: &[Transaction],
) -> Result<(), ValidationError> {
    let inputs = coinbase.body().input_transaction_hashes.len();
    let signatures = coinbase.owner_signatures().len();
    if !coinbase.is_coinbase() || inputs != 0 || signatures != 0 {
        return Err(ValidationError::InvalidCoinbase {
            transaction: *coinbase.body_hash(),
            inputs,
            signatures,
        });
    }

    for (offset, transaction) in spends.iter().enumerate() {
        if transaction.is_coinbase() || transaction.body().input_transaction_hashes.is_empty() {
            return Err(ValidationError::MisplacedCoinbase {
                transaction: *transaction.body_hash(),
                index: offset + 1,
            });
        }
    }

    Ok(())
}

fn check_transaction(
    lookup: &TransactionLookup<'_>,
    transaction: &Transaction,
) -> Result<(), ValidationError> {
    let body = transaction.body();
    let hash = *transaction.body_hash();

    let inputs = body.input_transaction_hashes.len();
    let signatures = transaction.owner_signatures().len();
    if inputs != signatures {
        return Err(ValidationError::SignatureCountMismatch {
            transaction: hash,
            inputs,
            signatures,
        });
    }

    let mut expected_input_value: u64 = 0;
    for (index, input_hash) in body.input_transaction_hashes.iter().enumerate() {
        let input = lookup.get(input_hash).ok_or(ValidationError::UnknownInput {
            transaction: hash,
            input: *input_hash,
        })?;

        if !transaction.verify_input_signature(index, &input.body().next_owner)? {
            return Err(ValidationError::InvalidSignature {
                transaction: hash,
                index,
            });
        }

        expected_input_value += u64::from(input.output_value()?);
    }

    if expected_input_value != u64::from(body.input_value) {
        return Err(ValidationError::ValueMismatch {
            transaction: hash,
            expected: expected_input_value,
            actual: body.input_value,
        });
    }

    let required = u64::from(body.change) + u64::from(body.fee);
    if u64::from(body.input_value) < required {
        return Err(ValidationError::InsufficientInputValue {
            transaction: hash,
            input_value: body.input_value,
            required,
        });
    }

    Ok(())
}
