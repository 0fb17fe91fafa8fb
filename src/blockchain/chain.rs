use log::{info, warn};
use thiserror::Error;

use super::block::Block;
use super::miner::{leading_zero_bits, meets_difficulty};
use super::params::MINIMUM_REQUIRED_LEADING_ZEROS;
use super::validation::{validate_candidate, ValidationError};

/// Errors that can occur during chain operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("Invalid block: {0}")]
    InvalidBlock(#[from] ValidationError),

    #[error("Block {id} has {actual} leading zero bits, want at least {required}")]
    InsufficientWork { id: u32, required: u32, actual: u32 },

    #[error("Invalid chain at block {index}: {source}")]
    InvalidChain {
        index: usize,
        #[source]
        source: Box<ChainError>,
    },

    #[error("Competing chain of length {candidate} is not longer than local length {local}")]
    ChainNotLonger { local: usize, candidate: usize },
}

/// Append-only sequence of validated blocks; index 0 is genesis
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chain {
    blocks: Vec<Block>,
}

impl Chain {
    /// Creates an empty chain
    pub fn new() -> Self {
        Chain { blocks: Vec::new() }
    }

    /// Builds a chain by appending every block in order, starting from genesis
    pub fn from_blocks(blocks: Vec<Block>) -> Result<Self, ChainError> {
        let mut chain = Chain::new();
        for (index, block) in blocks.into_iter().enumerate() {
            chain.append(block).map_err(|err| ChainError::InvalidChain {
                index,
                source: Box::new(err),
            })?;
        }
        Ok(chain)
    }

    /// Appends a block after re-validating it and checking its proof of work
    ///
    /// On error the chain is left unchanged.
    pub fn append(&mut self, block: Block) -> Result<(), ChainError> {
        if let Err(err) = self.check(&block) {
            warn!("Rejected block {} (id {}): {}", block.hash_hex(), block.id(), err);
            return Err(err);
        }

        info!("Appended block {} (id {})", block.hash_hex(), block.id());
        self.blocks.push(block);
        Ok(())
    }

    fn check(&self, block: &Block) -> Result<(), ChainError> {
        validate_candidate(&self.blocks, block)?;

        if !meets_difficulty(block) {
            return Err(ChainError::InsufficientWork {
                id: block.id(),
                required: MINIMUM_REQUIRED_LEADING_ZEROS,
                actual: leading_zero_bits(block.body_hash()),
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Gets the last block in the chain
    pub fn tip(&self) -> Option<&Block> {
        self.blocks.last()
    }

    /// Gets every block from `index` onwards; empty if `index` is past the tip
    pub fn blocks_from(&self, index: usize) -> &[Block] {
        self.blocks.get(index..).unwrap_or(&[])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Re-validates every block from genesis
    pub fn is_valid(&self) -> bool {
        Chain::from_blocks(self.blocks.clone()).is_ok()
    }

    /// Replaces this chain with a competing one under the longest-chain rule
    ///
    /// The competing chain must be valid from genesis and strictly longer. It
    /// is adopted whole or not at all.
    pub fn replace_with(&mut self, candidate: Vec<Block>) -> Result<(), ChainError> {
        if candidate.len() <= self.blocks.len() {
            return Err(ChainError::ChainNotLonger {
                local: self.blocks.len(),
                candidate: candidate.len(),
            });
        }

        let replacement = Chain::from_blocks(candidate)?;
        info!(
            "Replaced local chain of length {} with competing chain of length {}",
            self.blocks.len(),
            replacement.len()
        );
        *self = replacement;
        Ok(())
    }
}
