// Blockchain module
//
// This module contains the validation-and-mining engine:
// - Cryptographic identity (hashing, signatures, wallets)
// - Transaction structure
// - Block structure
// - Candidate validation
// - Proof of work
// - Chain and the shared node handle around it

pub mod block;
pub mod chain;
pub mod crypto;
pub mod miner;
pub mod node;
pub mod params;
pub mod transaction;
pub mod validation;

// Re-export main components for easier access
pub use block::{Block, BlockBody};
pub use chain::{Chain, ChainError};
pub use crypto::{Address, Hash, OwnerSignature, Wallet};
pub use miner::{mine, mine_with_abort, MiningError};
pub use node::{Node, NodeError};
pub use transaction::{Transaction, TransactionBody, TransactionError};
pub use validation::{validate_candidate, ValidationError};
