use log::info;
use parking_lot::Mutex;
use thiserror::Error;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use super::block::{Block, BlockBody};
use super::chain::{Chain, ChainError};
use super::miner::{mine_with_abort, MiningError};

/// Errors that can occur while mining onto a node's chain
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NodeError {
    #[error("Mining error: {0}")]
    MiningError(#[from] MiningError),

    #[error("Chain error: {0}")]
    ChainError(#[from] ChainError),
}

/// Shared handle to a chain, safe to clone across threads
///
/// The lock is held only while reading or extending the chain. Mining works on
/// a snapshot, so a long search never blocks readers, and a block mined on a
/// stale tip is rejected when submitted.
#[derive(Debug, Clone, Default)]
pub struct Node {
    chain: Arc<Mutex<Chain>>,
}

impl Node {
    pub fn new(chain: Chain) -> Self {
        Node {
            chain: Arc::new(Mutex::new(chain)),
        }
    }

    /// Gets a copy of every block, for peers to pull
    pub fn get_chain(&self) -> Vec<Block> {
        self.chain.lock().blocks().to_vec()
    }

    pub fn len(&self) -> usize {
        self.chain.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.lock().is_empty()
    }

    /// Gets a copy of the last block
    pub fn tip(&self) -> Option<Block> {
        self.chain.lock().tip().cloned()
    }

    /// Offers a competing chain; adopted only if valid and strictly longer
    pub fn propose_chain(&self, blocks: Vec<Block>) -> Result<(), ChainError> {
        self.chain.lock().replace_with(blocks)
    }

    /// Mines a block on top of the current tip without appending it
    pub fn mine(&self, body: BlockBody) -> Result<Block, MiningError> {
        self.mine_with_abort(body, &AtomicBool::new(false))
    }

    /// Same as [`Node::mine`], stopping once `abort` is set
    pub fn mine_with_abort(
        &self,
        body: BlockBody,
        abort: &AtomicBool,
    ) -> Result<Block, MiningError> {
        let snapshot = self.get_chain();
        mine_with_abort(&snapshot, body, abort)
    }

    /// Appends a mined block, re-validating it against the tip under the lock
    pub fn submit_block(&self, block: Block) -> Result<(), ChainError> {
        self.chain.lock().append(block)
    }

    /// Mines a block and appends it
    pub fn mine_and_append(&self, body: BlockBody) -> Result<Block, NodeError> {
        let block = self.mine(body)?;
        self.submit_block(block.clone())?;
        info!("Node chain extended to length {}", self.len());
        Ok(block)
    }
}
