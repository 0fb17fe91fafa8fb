// Protocol parameters
//
// These are fixed at compile time. Changing any of them produces a chain that
// is incompatible with blocks mined under the old values.

/// Version every new block must declare
pub const CURRENT_VERSION: u32 = 1;

/// Id of the first block in a chain
pub const GENESIS_ID: u32 = 0;

/// Value granted to the miner by the coinbase transaction, on top of fees
pub const MINING_REWARD: u32 = 10;

/// Proof-of-work difficulty: minimum number of leading zero bits in a block hash
pub const MINIMUM_REQUIRED_LEADING_ZEROS: u32 = 1;
