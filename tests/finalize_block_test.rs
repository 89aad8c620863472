use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use log::LevelFilter;
use serde_json::json;
use stampchain::{
    app::{messages::*, ApplicationError, ApplicationSpec},
    events::DropReason,
    hash_chain::{fold, hash_from_rewards, EMPTY_FOLD},
    indexer::{BlockService, Indexer, TxRecord},
    pipeline::{event_key, FinalizeError, STATE_CHANGE_EVENT},
    state::{
        pluggables::{KVGetError, KVStore, WriteBatch},
        variables::{app_state_key, REGISTRATION_FEE, STAMP_COST},
    },
    types::{
        basic::{AccountId, BlockHeight, ChainID, CryptoHash},
        crypto_primitives::sha256,
        update_sets::ValidatorSetUpdates,
        value::{Value, MAX_NESTING},
    },
};

mod common;

use crate::common::{
    counter_app::{CounterApp, COUNTER_CONTRACT, COUNTER_KEY, INCREMENT_STAMPS},
    logging::setup_logger,
    mem_db::{MemDB, MemWriteBatch},
    node::{
        kwargs, result_of, test_configuration, test_genesis, Account, Node, CHAIN_ID, DEVELOPERS,
        FOUNDATION, GENESIS_TIME,
    },
};

fn increment(account: &mut Account) -> Vec<u8> {
    account.call(COUNTER_CONTRACT, "increment", kwargs([]))
}

fn counter(node: &Node) -> Option<i128> {
    node.value(COUNTER_KEY).and_then(|value| value.as_int())
}

#[test]
fn execute_and_report_state_changes_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));

    // 1. A successful transaction reports its writes in a StateChange event and in its data.
    let response = node.execute_block(vec![increment(&mut user), increment(&mut user)]);
    assert_eq!(response.tx_results.len(), 2);
    let tx_result = &response.tx_results[1];
    assert_eq!(tx_result.code, 0);
    assert_eq!(tx_result.gas_used, INCREMENT_STAMPS);
    assert_eq!(
        tx_result.events,
        vec![AbciEvent {
            kind: STATE_CHANGE_EVENT.to_string(),
            attributes: vec![EventAttribute {
                key: String::from("con_counter_value"),
                value: String::from("2"),
                index: true,
            }],
        }]
    );
    let data: serde_json::Value = serde_json::from_slice(&tx_result.data).unwrap();
    assert_eq!(data["status"], json!(0));
    assert_eq!(data["result"], json!(2));
    assert_eq!(data["state"], json!([{ "key": COUNTER_KEY, "value": 2 }]));
    assert_eq!(data["stamps_used"], json!(INCREMENT_STAMPS));
    assert_eq!(data["hash"].as_str().unwrap().len(), 64);
    assert_eq!(counter(&node), Some(2));

    // 2. Event keys replace '.' with '_' and ':' with '__'. Deleted values render as null.
    let response = node.execute_block(vec![
        user.call(
            COUNTER_CONTRACT,
            "set",
            kwargs([("key", Value::from("balances:alice")), ("value", Value::from("hi"))]),
        ),
        user.call(COUNTER_CONTRACT, "set", kwargs([("key", Value::from("balances:alice"))])),
    ]);
    let attributes = &response.tx_results[0].events[0].attributes;
    assert_eq!(attributes[0].key, "con_counter_balances__alice");
    assert_eq!(attributes[0].value, "hi");
    let attributes = &response.tx_results[1].events[0].attributes;
    assert_eq!(attributes[0].key, "con_counter_balances__alice");
    assert_eq!(attributes[0].value, "null");
    assert_eq!(node.value("con_counter.balances:alice"), None);
    assert_eq!(event_key("a.b:c.d"), "a_b__c_d");
}

#[test]
fn failed_transaction_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));

    node.execute_block(vec![increment(&mut user)]);

    // A failed transaction is reported without events, its writes are discarded, and its nonce is
    // consumed.
    let response = node.execute_block(vec![user.call(COUNTER_CONTRACT, "fail", kwargs([]))]);
    let tx_result = &response.tx_results[0];
    assert_eq!(tx_result.code, 1);
    assert!(tx_result.events.is_empty());
    assert_eq!(result_of(tx_result), json!("counter refused"));
    assert_eq!(counter(&node), Some(1));
    assert_eq!(node.query(&format!("/nonce/{}", user.id())), json!(1));

    let response = node.execute_block(vec![increment(&mut user)]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(counter(&node), Some(2));
}

#[test]
fn drop_transactions_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let db = MemDB::new();
    let drops = Arc::new(Mutex::new(Vec::new()));
    let app = ApplicationSpec::builder()
        .executor(CounterApp)
        .kv_store(db.clone())
        .configuration(test_configuration())
        .genesis(test_genesis(&[&member], &[&user]))
        .on_drop_tx({
            let drops = drops.clone();
            move |event| drops.lock().unwrap().push(event.reason.clone())
        })
        .build()
        .start();
    let mut node = Node::init(app, db);

    let mut tampered = user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([]));
    let last = tampered.len() - 1;
    tampered[last] ^= 0xff;

    let response = node.execute_block(vec![
        vec![0xde, 0xad, 0xbe, 0xef],
        tampered,
        user.call_with(0, "another-chain", COUNTER_CONTRACT, "increment", kwargs([])),
        user.call_with(1, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([])),
        user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "fault", kwargs([])),
        user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "reject", kwargs([])),
        user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([])),
        user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([])),
    ]);

    // Only the first transaction carrying nonce 0 that executes is reported.
    assert_eq!(response.tx_results.len(), 1);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(counter(&node), Some(1));
    assert_eq!(node.query(&format!("/nonce/{}", user.id())), json!(0));

    drop(node);
    assert_eq!(
        *drops.lock().unwrap(),
        vec![
            DropReason::Undecodable,
            DropReason::BadSignature,
            DropReason::WrongChain,
            DropReason::BadNonce,
            DropReason::EngineFault(String::from("out of memory")),
            DropReason::Rejected(String::from("not today")),
            DropReason::BadNonce,
        ]
    );
}

#[test]
fn nested_values_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let db = MemDB::new();
    let drops = Arc::new(Mutex::new(Vec::new()));
    let app = ApplicationSpec::builder()
        .executor(CounterApp)
        .kv_store(db.clone())
        .configuration(test_configuration())
        .genesis(test_genesis(&[&member], &[&user]))
        .on_drop_tx({
            let drops = drops.clone();
            move |event| drops.lock().unwrap().push(event.reason.clone())
        })
        .build()
        .start();
    let mut node = Node::init(app, db);

    // 1. Lists and maps nest inside kwargs and app state.
    let nested = Value::Map(BTreeMap::from([
        (
            String::from("owners"),
            Value::List(vec![Value::from("alice"), Value::from("bob")]),
        ),
        (
            String::from("limits"),
            Value::Map(BTreeMap::from([(String::from("daily"), Value::Int(10))])),
        ),
    ]));
    let response = node.execute_block(vec![user.call(
        COUNTER_CONTRACT,
        "set",
        kwargs([("key", Value::from("vault")), ("value", nested.clone())]),
    )]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(node.value("con_counter.vault"), Some(nested));

    // 2. A transaction nesting values deeper than the decoder allows is dropped as undecodable.
    let mut deep = Value::Null;
    for _ in 0..MAX_NESTING + 8 {
        deep = Value::List(vec![deep]);
    }
    let response = node.execute_block(vec![user.call_with(
        1,
        CHAIN_ID,
        COUNTER_CONTRACT,
        "set",
        kwargs([("value", deep)]),
    )]);
    assert!(response.tx_results.is_empty());
    assert_eq!(node.query(&format!("/nonce/{}", user.id())), json!(0));

    drop(node);
    assert_eq!(*drops.lock().unwrap(), vec![DropReason::Undecodable]);
}

#[test]
fn protected_app_state_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let db = MemDB::new();
    let drops = Arc::new(Mutex::new(Vec::new()));
    let app = ApplicationSpec::builder()
        .executor(CounterApp)
        .kv_store(db.clone())
        .configuration(test_configuration())
        .genesis(test_genesis(&[&member], &[&user]))
        .on_drop_tx({
            let drops = drops.clone();
            move |event| drops.lock().unwrap().push(event.reason.clone())
        })
        .build()
        .start();
    let mut node = Node::init(app, db);

    // 1. An executor cannot write chain parameters or governance records.
    let response = node.execute_block(vec![
        user.call_with(
            0,
            CHAIN_ID,
            COUNTER_CONTRACT,
            "overwrite",
            kwargs([("key", Value::from(STAMP_COST)), ("value", Value::from(1u64))]),
        ),
        user.call_with(
            0,
            CHAIN_ID,
            COUNTER_CONTRACT,
            "overwrite",
            kwargs([("key", Value::from("members.nodes"))]),
        ),
    ]);
    assert!(response.tx_results.is_empty());
    assert_eq!(node.query("/params")["stamp_cost"], json!(20));
    assert_eq!(node.active_members(), vec![member.id().to_string()]);

    // 2. Other contracts' state stays writable.
    let response = node.execute_block(vec![user.call_with(
        0,
        CHAIN_ID,
        COUNTER_CONTRACT,
        "overwrite",
        kwargs([("key", Value::from("con_other.value")), ("value", Value::from("x"))]),
    )]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(node.value("con_other.value"), Some(Value::from("x")));

    drop(node);
    assert_eq!(
        *drops.lock().unwrap(),
        vec![
            DropReason::Rejected(format!("Cannot write protected key {}", STAMP_COST)),
            DropReason::Rejected(String::from("Cannot write protected key members.nodes")),
        ]
    );
}

#[test]
fn missing_chain_parameter_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));
    node.execute_block(vec![increment(&mut user)]);

    // 1. Lose the registration fee from the committed store.
    let mut db = node.db().clone();
    let mut wb = MemWriteBatch::new();
    wb.delete(&app_state_key(REGISTRATION_FEE));
    db.write(wb);

    // 2. Registering needs the fee, so the block cannot be finalized.
    let request = node.next_request(vec![user.govern("register", kwargs([]))]);
    let result = node.app().consensus().finalize_block(request);
    assert!(matches!(
        result,
        Err(ApplicationError::FinalizeError(FinalizeError::KVGetError(
            KVGetError::ValueExpectedButNotFound { .. }
        )))
    ));

    // 3. Nothing was charged and no nonce was consumed.
    assert_eq!(node.balance(user.id()), 1_000_000);
    assert_eq!(node.query(&format!("/nonce/{}", user.id())), json!(0));
}

#[test]
fn nonces_in_one_block_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));

    let first = increment(&mut user);
    let second = increment(&mut user);
    let third = increment(&mut user);
    let response = node.execute_block(vec![first, second.clone(), second, third]);
    assert_eq!(response.tx_results.len(), 3);
    assert_eq!(counter(&node), Some(3));
    assert_eq!(node.query(&format!("/nonce/{}", user.id())), json!(2));
}

#[test]
fn deterministic_app_hash_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let genesis = test_genesis(&[&member], &[&user]);
    let mut node_a = Node::start(test_configuration(), genesis.clone());
    let mut node_b = Node::start(test_configuration(), genesis);

    let blocks: Vec<Vec<Vec<u8>>> = vec![
        vec![increment(&mut user)],
        vec![],
        vec![increment(&mut user), user.call(COUNTER_CONTRACT, "fail", kwargs([]))],
    ];

    let mut app_hashes = Vec::new();
    for txs in blocks {
        let a = node_a.execute_block(txs.clone());
        let b = node_b.execute_block(txs);
        assert_eq!(a, b);
        app_hashes.push(a.app_hash);
    }

    // Every block commits to its predecessor, so no two app hashes repeat.
    assert_ne!(app_hashes[0], app_hashes[1]);
    assert_ne!(app_hashes[1], app_hashes[2]);
}

#[test]
fn stepwise_and_single_step_finalization_agree_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let genesis = test_genesis(&[&member], &[&user]);
    let mut stepwise = Node::start(test_configuration(), genesis.clone());
    let mut single_step = Node::start(test_configuration(), genesis);

    let txs = vec![increment(&mut user), vec![1, 2, 3], increment(&mut user)];
    let request = stepwise.next_request(txs.clone());

    let consensus = stepwise.app().consensus();
    consensus
        .begin_block(RequestBeginBlock {
            time: request.time,
            height: request.height,
            hash: request.hash.clone(),
        })
        .unwrap();
    let delivered: Vec<Option<ExecTxResult>> = request
        .txs
        .iter()
        .map(|tx| consensus.deliver_tx(tx).unwrap().tx_result)
        .collect();
    let end_block = consensus.end_block().unwrap();
    let app_hash = consensus.pending_block().unwrap().response.app_hash;
    consensus.commit().unwrap();

    let response = single_step.execute_block(txs);
    assert!(delivered[1].is_none());
    assert_eq!(
        delivered.into_iter().flatten().collect::<Vec<ExecTxResult>>(),
        response.tx_results
    );
    assert_eq!(end_block.validator_updates, response.validator_updates);
    assert_eq!(app_hash, response.app_hash);
}

#[test]
fn hash_chain_fingerprints_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let genesis = test_genesis(&[&member], &[]);
    let genesis_hash = genesis.app_hash();
    let mut node = Node::start(test_configuration(), genesis);

    assert_eq!(EMPTY_FOLD, sha256(&[]));
    assert_eq!(fold(Vec::<Vec<u8>>::new()), EMPTY_FOLD);

    let info = node.app().info().info().unwrap();
    assert_eq!(info.last_block_height, BlockHeight::new(0));
    assert_eq!(info.last_block_app_hash, genesis_hash.bytes().to_vec());

    // An empty block without rewards folds its predecessor's app hash, the empty reward writes, and
    // the empty validator set updates.
    let request = node.next_request(vec![]);
    let response = node.app().consensus().finalize_block(request).unwrap();
    let pending = node.app().consensus().pending_block().unwrap();
    assert_eq!(pending.fingerprints.len(), 3);
    assert_eq!(pending.fingerprints[0], genesis_hash);
    assert_eq!(pending.fingerprints[1], hash_from_rewards(&[]));
    assert_eq!(hash_from_rewards(&[]), sha256(&[0, 0, 0, 0]));
    assert_ne!(hash_from_rewards(&[]), EMPTY_FOLD);
    assert_eq!(
        pending.fingerprints[2],
        stampchain::hash_chain::hash_from_validator_updates(&ValidatorSetUpdates::new())
    );
    assert_eq!(response.app_hash, fold(&pending.fingerprints));
    node.app().consensus().commit().unwrap();

    let info = node.app().info().info().unwrap();
    assert_eq!(info.last_block_height, BlockHeight::new(1));
    assert_eq!(info.last_block_app_hash, response.app_hash.bytes().to_vec());
}

#[test]
fn block_ordering_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[]));

    // 1. The chain cannot be initialized twice, nor for another chain.
    let init = |chain_id: &str| RequestInitChain {
        chain_id: ChainID::new(chain_id),
        time: GENESIS_TIME,
        initial_height: BlockHeight::new(1),
    };
    assert!(matches!(
        node.app().consensus().init_chain(init(CHAIN_ID)),
        Err(ApplicationError::AlreadyInitialized)
    ));
    assert!(matches!(
        node.app().consensus().init_chain(init("another-chain")),
        Err(ApplicationError::ChainIdMismatch { .. })
    ));

    // 2. Blocks must extend the last committed height.
    let mut request = node.next_request(vec![]);
    request.height = BlockHeight::new(5);
    assert!(matches!(
        node.app().consensus().finalize_block(request),
        Err(ApplicationError::FinalizeError(FinalizeError::UnexpectedHeight { .. }))
    ));

    // 3. Requests must arrive in order.
    assert!(matches!(
        node.app().consensus().commit(),
        Err(ApplicationError::OutOfOrder { request: "commit" })
    ));
    assert!(matches!(
        node.app().consensus().deliver_tx(&[]),
        Err(ApplicationError::OutOfOrder { request: "deliver_tx" })
    ));
    assert!(matches!(
        node.app().consensus().end_block(),
        Err(ApplicationError::OutOfOrder { request: "end_block" })
    ));

    // 4. Nothing above is persisted.
    node.execute_block(vec![]);
    assert_eq!(node.height(), 1);
    assert_eq!(
        node.app().info().info().unwrap().last_block_height,
        BlockHeight::new(1)
    );
}

#[test]
fn static_rewards_test() {
    setup_logger(LevelFilter::Info);

    let members = [Account::generate(), Account::generate()];
    let distributions = Arc::new(Mutex::new(Vec::new()));
    let mut configuration = test_configuration();
    configuration.static_rewards = Some(1_000);
    let db = MemDB::new();
    let app = ApplicationSpec::builder()
        .executor(CounterApp)
        .kv_store(db.clone())
        .configuration(configuration)
        .genesis(test_genesis(&[&members[0], &members[1]], &[]))
        .on_distribute_rewards({
            let distributions = distributions.clone();
            move |event| distributions.lock().unwrap().push((event.pool, event.payouts.unpaid))
        })
        .build()
        .start();
    let mut node = Node::init(app, db);

    node.execute_block(vec![]);
    node.execute_block(vec![]);

    // Split 50% / 25% / 15% / 10% burned, the validator bucket shared by both members.
    for member in &members {
        assert_eq!(node.balance(member.id()), 1_000_000 + 2 * 250);
    }
    assert_eq!(node.balance(&AccountId::new(FOUNDATION)), 2 * 250);
    assert_eq!(node.balance(&AccountId::new(DEVELOPERS)), 2 * 150);

    drop(node);
    assert_eq!(*distributions.lock().unwrap(), vec![(1_000, 100), (1_000, 100)]);
}

#[test]
fn transaction_fees_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut configuration = test_configuration();
    configuration.enable_tx_fee = true;
    let mut node = Node::start(configuration, test_genesis(&[&member], &[&user]));

    // 50 stamps at 20 stamps per unit cost 3 units, of which the sole validator receives half,
    // rounded down.
    let response = node.execute_block(vec![increment(&mut user)]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(node.balance(user.id()), 1_000_000 - 3);
    assert_eq!(node.balance(member.id()), 1_000_000 + 1);
    let data: serde_json::Value = serde_json::from_slice(&response.tx_results[0].data).unwrap();
    assert!(data["state"].as_array().unwrap().len() > 1);

    // Failed transactions are not charged.
    node.execute_block(vec![user.call(COUNTER_CONTRACT, "fail", kwargs([]))]);
    assert_eq!(node.balance(user.id()), 1_000_000 - 3);
}

#[test]
fn check_tx_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));
    let entries = node.db().len();

    let mempool = node.app().mempool();
    assert_eq!(mempool.check_tx(&increment(&mut user)).code, CODE_OK);
    assert_eq!(mempool.check_tx(&increment(&mut user)).code, CODE_OK);
    let mut tampered = user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([]));
    let last = tampered.len() - 1;
    tampered[last] ^= 0xff;
    let bad_signature = mempool.check_tx(&tampered);
    assert_eq!(bad_signature.code, CODE_REJECTED);
    assert_eq!(bad_signature.log, "Invalid signature");
    let wrong_chain = user.call_with(0, "another-chain", COUNTER_CONTRACT, "increment", kwargs([]));
    assert_eq!(mempool.check_tx(&wrong_chain).log, "Wrong chain ID");
    assert_eq!(
        mempool.check_tx(&[0xde, 0xad]).log,
        "Transaction could not be decoded"
    );

    // The mempool never writes.
    assert_eq!(node.db().len(), entries);

    // Once nonce 0 is committed, it is stale.
    node.execute_block(vec![user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([]))]);
    let stale = user.call_with(0, CHAIN_ID, COUNTER_CONTRACT, "increment", kwargs([]));
    let response = node.app().mempool().check_tx(&stale);
    assert_eq!(response.code, CODE_REJECTED);
    assert!(response.log.starts_with("Stale nonce"));
}

#[test]
fn query_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&user]));
    node.execute_block(vec![increment(&mut user)]);

    assert_eq!(node.query(&format!("/get/{}", COUNTER_KEY)), json!(1));
    assert_eq!(node.query("/get/con_counter.nothing"), serde_json::Value::Null);
    assert_eq!(node.query(&format!("/balance/{}", user.id())), json!(1_000_000));
    assert_eq!(node.query(&format!("/nonce/{}", member.id())), serde_json::Value::Null);
    assert_eq!(node.query("/params")["stamp_cost"], json!(20));
    assert_eq!(node.query("/params")["registration_fee"], json!(100_000));
    assert_eq!(node.active_members(), vec![member.id().to_string()]);

    let response = node.app().info().query(&RequestQuery {
        path: String::from("/unknown"),
    });
    assert_eq!(response.code, CODE_QUERY_FAILED);
    assert_eq!(response.height, BlockHeight::new(1));
    let response = node.app().info().query(&RequestQuery {
        path: String::from("/proposal/one"),
    });
    assert_eq!(response.code, CODE_QUERY_FAILED);
}

#[derive(Clone, Default)]
struct RecordingBlockService {
    records: Arc<Mutex<Vec<TxRecord>>>,
    commits: Arc<Mutex<Vec<BlockHeight>>>,
}

impl BlockService for RecordingBlockService {
    type Error = String;

    fn insert_full_data(&mut self, record: &TxRecord) -> Result<(), Self::Error> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn commit_batch(&mut self, height: BlockHeight) -> Result<(), Self::Error> {
        self.commits.lock().unwrap().push(height);
        Ok(())
    }
}

#[test]
fn block_service_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut user = Account::generate();
    let block_service = RecordingBlockService::default();
    let mut configuration = test_configuration();
    configuration.block_service_mode = true;
    let db = MemDB::new();
    let app = ApplicationSpec::builder()
        .executor(CounterApp)
        .kv_store(db.clone())
        .configuration(configuration)
        .genesis(test_genesis(&[&member], &[&user]))
        .indexer(Indexer::start(block_service.clone()))
        .build()
        .start();
    let mut node = Node::init(app, db);

    let tx = increment(&mut user);
    node.execute_block(vec![tx.clone(), vec![0]]);
    node.execute_block(vec![]);
    drop(node);

    let records = block_service.records.lock().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].height, BlockHeight::new(1));
    assert_eq!(records[0].hash, sha256(&tx).to_hex().to_uppercase());
    assert_eq!(records[0].result.result, Value::Int(1));
    assert_ne!(records[0].result.hash, CryptoHash::default());
    assert_eq!(
        *block_service.commits.lock().unwrap(),
        vec![BlockHeight::new(1), BlockHeight::new(2)]
    );
}
