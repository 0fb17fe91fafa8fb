use chrono::Utc;
use log::{debug, info};
use thiserror::Error;

use std::sync::atomic::{AtomicBool, Ordering};

use super::block::{Block, BlockBody};
use super::crypto::Hash;
use super::params::MINIMUM_REQUIRED_LEADING_ZEROS;
use super::validation::{validate_candidate, ValidationError};

/// Errors that can occur while mining a block
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MiningError {
    #[error("Invalid block body: {0}")]
    Validation(#[from] ValidationError),

    /// Every 32-bit nonce was tried; the caller may re-assemble the body and retry
    #[error("Block {id} has no valid nonce")]
    NonceSpaceExhausted { id: u32 },

    #[error("Mining aborted")]
    Aborted,
}

/// Counts the most significant zero bits of a hash
pub fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut count = 0;
    for byte in hash {
        if *byte == 0 {
            count += 8;
        } else {
            count += byte.leading_zeros();
            break;
        }
    }
    count
}

/// Checks the proof-of-work predicate against the fixed difficulty
pub fn meets_difficulty(block: &Block) -> bool {
    leading_zero_bits(block.body_hash()) >= MINIMUM_REQUIRED_LEADING_ZEROS
}

/// Mines a block on top of `existing`
///
/// The body is validated once, then nonce and timestamp are rewritten until the
/// block hash satisfies the difficulty. The chain itself is not touched.
pub fn mine(existing: &[Block], body: BlockBody) -> Result<Block, MiningError> {
    mine_with_abort(existing, body, &AtomicBool::new(false))
}

/// Same as [`mine`], but gives up with [`MiningError::Aborted`] once `abort` is set
pub fn mine_with_abort(
    existing: &[Block],
    body: BlockBody,
    abort: &AtomicBool,
) -> Result<Block, MiningError> {
    let mut block = Block::new(body);

    // Timestamps sampled during the search are never earlier than this one
    block.set_fields(0, Utc::now());
    validate_candidate(existing, &block)?;

    search_nonce(&mut block, MINIMUM_REQUIRED_LEADING_ZEROS, 0, abort)?;

    info!(
        "Mined block {} (id {}) with nonce {}",
        block.hash_hex(),
        block.id(),
        block.body().nonce
    );
    Ok(block)
}

fn search_nonce(
    block: &mut Block,
    required_zeros: u32,
    start_nonce: u32,
    abort: &AtomicBool,
) -> Result<(), MiningError> {
    let mut nonce = start_nonce;
    loop {
        if abort.load(Ordering::Relaxed) {
            debug!("Mining of block {} aborted at nonce {}", block.id(), nonce);
            return Err(MiningError::Aborted);
        }

        block.set_fields(nonce, Utc::now());
        if leading_zero_bits(block.body_hash()) >= required_zeros {
            return Ok(());
        }

        nonce = nonce.wrapping_add(1);
        if nonce == 0 {
            return Err(MiningError::NonceSpaceExhausted { id: block.id() });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::crypto::Wallet;
    use crate::blockchain::params::{CURRENT_VERSION, MINING_REWARD};
    use crate::blockchain::transaction::Transaction;

    fn genesis_body(reward: u32) -> BlockBody {
        let miner = Wallet::generate();
        let coinbase = Transaction::new_coinbase(*miner.public_key(), reward);
        BlockBody::new(CURRENT_VERSION, 0, None, vec![coinbase])
    }

    #[test]
    fn test_leading_zero_bits() {
        let mut hash = [0u8; 32];
        assert_eq!(leading_zero_bits(&hash), 256);

        hash[0] = 0x80;
        assert_eq!(leading_zero_bits(&hash), 0);

        hash[0] = 0x0F;
        assert_eq!(leading_zero_bits(&hash), 4);

        hash = [0u8; 32];
        hash[1] = 0x40;
        hash[2] = 0xFF;
        assert_eq!(leading_zero_bits(&hash), 9);
    }

    #[test]
    fn test_mine_block() {
        let block = mine(&[], genesis_body(MINING_REWARD)).unwrap();

        assert!(meets_difficulty(&block));
        assert_eq!(block.id(), 0);
        assert_eq!(&block, &Block::new(block.body().clone()));
        assert_eq!(validate_candidate(&[], &block), Ok(()));
    }

    #[test]
    fn test_mine_on_top_of_chain() {
        let genesis = mine(&[], genesis_body(MINING_REWARD)).unwrap();
        let chain = vec![genesis];

        let mut body = genesis_body(MINING_REWARD);
        body.id = 1;
        body.prev_hash = Some(*chain[0].body_hash());

        let block = mine(&chain, body).unwrap();
        assert!(meets_difficulty(&block));
        assert!(block.timestamp() > chain[0].timestamp());
        assert_eq!(validate_candidate(&chain, &block), Ok(()));
    }

    #[test]
    fn test_invalid_body_is_not_mined() {
        let result = mine(&[], genesis_body(MINING_REWARD + 1));
        assert_eq!(
            result,
            Err(MiningError::Validation(ValidationError::CoinbaseValueMismatch {
                expected: u64::from(MINING_REWARD),
                actual: MINING_REWARD + 1
            }))
        );
    }

    #[test]
    fn test_nonce_space_exhausted() {
        let mut block = Block::new(genesis_body(MINING_REWARD));

        // no 256-bit hash has 257 leading zeros
        let result = search_nonce(&mut block, 257, u32::MAX - 15, &AtomicBool::new(false));
        assert_eq!(result, Err(MiningError::NonceSpaceExhausted { id: 0 }));
        assert_eq!(block.body().nonce, u32::MAX);
    }

    #[test]
    fn test_abort() {
        let abort = AtomicBool::new(true);
        let result = mine_with_abort(&[], genesis_body(MINING_REWARD), &abort);
        assert_eq!(result, Err(MiningError::Aborted));
    }
}
