//! End-to-end scenarios: assemble bodies, mine them and grow a chain

use powledger::blockchain::miner::meets_difficulty;
use powledger::blockchain::params::{CURRENT_VERSION, MINING_REWARD};
use powledger::blockchain::validate_candidate;
use powledger::{
    Block, BlockBody, Chain, ChainError, MiningError, Transaction, TransactionBody,
    ValidationError, Wallet,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Alice mines the reward and pays Bob 5, keeping the rest as change
fn genesis_body(alice: &Wallet, bob: &Wallet, coinbase_value: u32) -> BlockBody {
    let coinbase = Transaction::new_coinbase(*alice.public_key(), coinbase_value);
    let payment = Transaction::new(
        TransactionBody {
            input_transaction_hashes: vec![*coinbase.body_hash()],
            next_owner: *bob.public_key(),
            input_value: coinbase_value,
            change: coinbase_value - 5,
            fee: 0,
        },
        &[alice.signing_key()],
        false,
    );

    BlockBody::new(CURRENT_VERSION, 0, None, vec![coinbase, payment])
}

fn genesis_chain(alice: &Wallet, bob: &Wallet) -> Chain {
    let mut chain = Chain::new();
    let body = genesis_body(alice, bob, MINING_REWARD);
    let block = powledger::blockchain::mine(chain.blocks(), body).unwrap();
    chain.append(block).unwrap();
    chain
}

#[test]
fn test_genesis_block_is_mined_and_appended() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();

    let chain = genesis_chain(&alice, &bob);

    assert_eq!(chain.len(), 1);
    let genesis = chain.tip().unwrap();
    assert!(meets_difficulty(genesis));
    assert_eq!(genesis.transactions()[1].output_value().unwrap(), 5);
    println!("{}", genesis);
}

#[test]
fn test_genesis_with_wrong_coinbase_value() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();

    let result = powledger::blockchain::mine(&[], genesis_body(&alice, &bob, MINING_REWARD + 1));

    assert_eq!(
        result,
        Err(MiningError::Validation(ValidationError::CoinbaseValueMismatch {
            expected: u64::from(MINING_REWARD),
            actual: MINING_REWARD + 1,
        }))
    );
}

#[test]
fn test_second_block_with_forged_signature() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let mallory = Wallet::generate();
    let chain = genesis_chain(&alice, &bob);
    let genesis = chain.tip().unwrap();

    // mallory tries to spend the output alice sent to bob
    let forged = Transaction::new(
        TransactionBody {
            input_transaction_hashes: vec![*genesis.transactions()[1].body_hash()],
            next_owner: *mallory.public_key(),
            input_value: 5,
            change: 0,
            fee: 0,
        },
        &[mallory.signing_key()],
        false,
    );
    let forged_hash = *forged.body_hash();
    let coinbase = Transaction::new_coinbase(*mallory.public_key(), MINING_REWARD);
    let body = BlockBody::new(
        CURRENT_VERSION,
        1,
        Some(*genesis.body_hash()),
        vec![coinbase, forged],
    );

    assert_eq!(
        powledger::blockchain::mine(chain.blocks(), body),
        Err(MiningError::Validation(ValidationError::InvalidSignature {
            transaction: forged_hash,
            index: 0,
        }))
    );
}

#[test]
fn test_second_block_spends_previous_output_with_fee() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let mut chain = genesis_chain(&alice, &bob);
    let genesis = chain.tip().unwrap().clone();

    // bob pays alice 3 of his 5 and leaves a fee of 2
    let payment = Transaction::new(
        TransactionBody {
            input_transaction_hashes: vec![*genesis.transactions()[1].body_hash()],
            next_owner: *alice.public_key(),
            input_value: 5,
            change: 0,
            fee: 2,
        },
        &[bob.signing_key()],
        false,
    );
    let coinbase = Transaction::new_coinbase(*bob.public_key(), MINING_REWARD + 2);
    let body = BlockBody::new(
        CURRENT_VERSION,
        1,
        Some(*genesis.body_hash()),
        vec![coinbase, payment],
    );

    let block = powledger::blockchain::mine(chain.blocks(), body).unwrap();
    chain.append(block).unwrap();

    assert_eq!(chain.len(), 2);
    assert_eq!(chain.tip().unwrap().transactions()[1].output_value().unwrap(), 3);
    assert!(chain.is_valid());
}

#[test]
fn test_tampered_transaction_fails_revalidation() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let chain = genesis_chain(&alice, &bob);
    let genesis = chain.tip().unwrap();

    let mut json = serde_json::to_value(genesis).unwrap();
    json["transactions"][1]["body"]["change"] = serde_json::json!(0);
    let tampered: Block = serde_json::from_value(json).unwrap();

    assert_ne!(tampered.static_hash(), genesis.static_hash());
    assert_eq!(
        validate_candidate(&[], &tampered),
        Err(ValidationError::InvalidSignature {
            transaction: *tampered.transactions()[1].body_hash(),
            index: 0,
        })
    );

    let mut copy = Chain::new();
    assert!(matches!(
        copy.append(tampered),
        Err(ChainError::InvalidBlock(ValidationError::InvalidSignature { .. }))
    ));
    assert!(copy.is_empty());
}

#[test]
fn test_coinbase_flag_cannot_be_set_over_the_wire() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let chain = genesis_chain(&alice, &bob);
    let genesis = chain.tip().unwrap();

    // an extra field claiming the payment is a coinbase is ignored
    let mut json = serde_json::to_value(genesis).unwrap();
    json["transactions"][1]["is_coinbase"] = serde_json::json!(true);
    let relayed: Block = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(&relayed, genesis);
    assert!(!relayed.transactions()[1].is_coinbase());
    assert_eq!(relayed.transactions()[1].output_value().unwrap(), 5);
    assert_eq!(validate_candidate(&[], &relayed), Ok(()));

    // dropping the inputs turns the payment into a second coinbase
    json["transactions"][1]["body"]["input_transaction_hashes"] = serde_json::json!([]);
    let forged: Block = serde_json::from_value(json).unwrap();
    assert!(forged.transactions()[1].is_coinbase());
    assert_eq!(
        validate_candidate(&[], &forged),
        Err(ValidationError::MisplacedCoinbase {
            transaction: *forged.transactions()[1].body_hash(),
            index: 1,
        })
    );

    let mut copy = Chain::new();
    assert!(copy.append(forged).is_err());
    assert!(copy.is_empty());
}

#[test]
fn test_accepted_block_revalidates() {
    init_logger();
    let alice = Wallet::generate();
    let bob = Wallet::generate();
    let chain = genesis_chain(&alice, &bob);

    for _ in 0..3 {
        assert_eq!(validate_candidate(&[], chain.tip().unwrap()), Ok(()));
    }
}
