//! A minimal proof-of-work ledger core
//!
//! Blocks and transactions are identified by SHA-256 digests, ownership moves
//! through Ed25519 signatures, and a candidate block is validated against the
//! existing chain before a nonce search makes it acceptable.
//!
//! - [`blockchain::crypto`] - hashing, signatures and wallets
//! - [`blockchain::transaction`] - signed value transfers
//! - [`blockchain::block`] - blocks with a two-phase hash
//! - [`blockchain::validation`] - candidate block checks
//! - [`blockchain::miner`] - proof-of-work search
//! - [`blockchain::chain`] - the append-only chain and longest-chain rule
//! - [`blockchain::node`] - a shared, lock-guarded handle for hosts

#![forbid(unsafe_code)]

pub mod blockchain;

pub use blockchain::{
    Block, BlockBody, Chain, ChainError, MiningError, Node, Transaction, TransactionBody,
    ValidationError, Wallet,
};
