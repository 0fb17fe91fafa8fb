use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use std::fmt;

use super::crypto::{self, Hash};
use super::transaction::Transaction;

/// The content of a block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Version of the block structure
    pub version: u32,

    /// Position of the block in the chain
    pub id: u32,

    /// Hash of the previous block, `None` for genesis
    pub prev_hash: Option<Hash>,

    /// Transactions, the first of which is the coinbase
    pub transactions: Vec<Transaction>,

    /// Proof of work, rewritten by the miner
    pub nonce: u32,

    /// Time the block was mined, rewritten by the miner
    pub timestamp: DateTime<Utc>,
}

impl BlockBody {
    /// Creates a body with a zero nonce, stamped now
    pub fn new(
        version: u32,
        id: u32,
        prev_hash: Option<Hash>,
        transactions: Vec<Transaction>,
    ) -> Self {
        BlockBody {
            version,
            id,
            prev_hash,
            transactions,
            nonce: 0,
            timestamp: Utc::now(),
        }
    }

    /// Calculates the hash of everything except nonce and timestamp
    pub fn static_hash(&self) -> Hash {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update(self.id.to_le_bytes());
        if let Some(prev_hash) = &self.prev_hash {
            hasher.update(prev_hash);
        }
        for transaction in &self.transactions {
            hasher.update(transaction.body_hash());
        }
        hasher.finalize().into()
    }
}

/// Represents a block in the blockchain
///
/// The body hash is derived from the body and never set on its own. The static
/// hash is cached so that nonce trials never re-hash the transaction list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BlockBody", into = "BlockBody")]
pub struct Block {
    body: BlockBody,
    body_hash: Hash,
    static_hash: Hash,
}

impl Block {
    /// Wraps a body, computing both hashes
    pub fn new(body: BlockBody) -> Self {
        let static_hash = body.static_hash();
        let body_hash = crypto::full_hash(&static_hash, body.nonce, &body.timestamp);

        Block {
            body,
            body_hash,
            static_hash,
        }
    }

    /// Rewrites the mining fields and recomputes only the full hash
    pub(crate) fn set_fields(&mut self, nonce: u32, timestamp: DateTime<Utc>) {
        self.body.nonce = nonce;
        self.body.timestamp = timestamp;
        self.body_hash = crypto::full_hash(&self.static_hash, nonce, &timestamp);
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn body_hash(&self) -> &Hash {
        &self.body_hash
    }

    pub fn static_hash(&self) -> &Hash {
        &self.static_hash
    }

    pub fn id(&self) -> u32 {
        self.body.id
    }

    pub fn timestamp(&self) -> &DateTime<Utc> {
        &self.body.timestamp
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.body.transactions
    }

    pub fn into_body(self) -> BlockBody {
        self.body
    }

    /// Short identity used in log lines and error messages
    pub fn hash_hex(&self) -> String {
        hex::encode(self.body_hash)
    }
}

impl From<BlockBody> for Block {
    fn from(body: BlockBody) -> Self {
        Block::new(body)
    }
}

impl From<Block> for BlockBody {
    fn from(block: Block) -> Self {
        block.body
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prev_hash = self.body.prev_hash.map(hex::encode).unwrap_or_default();

        writeln!(f, "block {}", self.hash_hex())?;
        writeln!(f, "  id {}", self.body.id)?;
        writeln!(f, "  prev hash {}", prev_hash)?;
        writeln!(f, "  nonce {}", self.body.nonce)?;
        writeln!(f, "  time {}", crypto::canonical_timestamp(&self.body.timestamp))?;
        write!(f, "  {} txns", self.body.transactions.len())?;
        for transaction in &self.body.transactions {
            for line in transaction.to_string().lines() {
                write!(f, "\n    {}", line)?;
            }
        }
        Ok(())
    }
}
