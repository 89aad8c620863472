//! A single application instance driven the way a consensus engine would drive it, plus signing
//! accounts that build transactions for it.

use std::time::Duration;

use rand_core::OsRng;
use stampchain::{
    app::{messages::*, Application, ApplicationSpec},
    config::{Configuration, Genesis},
    ledger::Ledger,
    state::pluggables::KVGet,
    types::{
        basic::{AccountId, BlockHeight, ChainID, Timestamp},
        crypto_primitives::SigningKey,
        params::RewardSplit,
        transaction::{Payload, Transaction},
        value::{Kwargs, Value},
    },
};

use super::{counter_app::CounterApp, mem_db::MemDB};

pub(crate) const CHAIN_ID: &str = "stampchain-test";
pub(crate) const FOUNDATION: &str = "foundation";
pub(crate) const DEVELOPERS: &str = "developers";
pub(crate) const GENESIS_TIME: Timestamp = Timestamp::from_nanos(1_700_000_000_000_000_000);
pub(crate) const BLOCK_INTERVAL: Duration = Duration::from_secs(1);

/// A keypair that signs transactions with consecutive nonces.
pub(crate) struct Account {
    signing_key: SigningKey,
    id: AccountId,
    next_nonce: u64,
    stamps_supplied: u64,
}

impl Account {
    pub(crate) fn generate() -> Account {
        let signing_key = SigningKey::generate(&mut OsRng);
        let id = AccountId::from_verifying_key(&signing_key.verifying_key());
        Account {
            signing_key,
            id,
            next_nonce: 0,
            stamps_supplied: 1_000,
        }
    }

    pub(crate) fn id(&self) -> &AccountId {
        &self.id
    }

    pub(crate) fn set_stamps_supplied(&mut self, stamps_supplied: u64) {
        self.stamps_supplied = stamps_supplied;
    }

    /// Sign a call with the next nonce of this account.
    pub(crate) fn call(&mut self, contract: &str, function: &str, kwargs: Kwargs) -> Vec<u8> {
        let nonce = self.next_nonce;
        self.next_nonce += 1;
        self.call_with(nonce, CHAIN_ID, contract, function, kwargs)
    }

    /// Sign a call with an explicit nonce and chain ID. Does not advance the next nonce.
    pub(crate) fn call_with(
        &self,
        nonce: u64,
        chain_id: &str,
        contract: &str,
        function: &str,
        kwargs: Kwargs,
    ) -> Vec<u8> {
        let payload = Payload {
            sender: self.id.clone(),
            nonce,
            chain_id: ChainID::new(chain_id),
            contract: contract.to_string(),
            function: function.to_string(),
            kwargs,
            stamps_supplied: self.stamps_supplied,
        };
        Transaction::sign(payload, &self.signing_key).encode()
    }

    /// Sign a call to the governance contract with the next nonce of this account.
    pub(crate) fn govern(&mut self, function: &str, kwargs: Kwargs) -> Vec<u8> {
        self.call("members", function, kwargs)
    }
}

pub(crate) fn kwargs<const N: usize>(pairs: [(&str, Value); N]) -> Kwargs {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

pub(crate) fn propose(type_of_vote: &str, arg: Value) -> Kwargs {
    kwargs([("type_of_vote", Value::from(type_of_vote)), ("arg", arg)])
}

pub(crate) fn ballot(proposal_id: u64, yes: bool) -> Kwargs {
    kwargs([
        ("proposal_id", Value::from(proposal_id)),
        ("vote", Value::from(if yes { "yes" } else { "no" })),
    ])
}

pub(crate) fn test_configuration() -> Configuration {
    Configuration::builder()
        .chain_id(ChainID::new(CHAIN_ID))
        .foundation(AccountId::new(FOUNDATION))
        .developers(AccountId::new(DEVELOPERS))
        .log_events(false)
        .build()
}

/// Genesis in which every one of `members` is active and funded with 1000000.
pub(crate) fn test_genesis(members: &[&Account], funded: &[&Account]) -> Genesis {
    Genesis::builder()
        .members(members.iter().map(|member| member.id().clone()).collect())
        .reward_split(RewardSplit::new([500_000, 250_000, 150_000, 100_000]).unwrap())
        .balances(
            members
                .iter()
                .chain(funded.iter())
                .map(|account| (account.id().clone(), 1_000_000))
                .collect(),
        )
        .build()
}

pub(crate) struct Node {
    app: Application<MemDB, CounterApp>,
    db: MemDB,
    height: u64,
    time: Timestamp,
}

impl Node {
    pub(crate) fn start(configuration: Configuration, genesis: Genesis) -> Node {
        let db = MemDB::new();
        let app = ApplicationSpec::builder()
            .executor(CounterApp)
            .kv_store(db.clone())
            .configuration(configuration)
            .genesis(genesis)
            .build()
            .start();
        Node::init(app, db)
    }

    /// Initialize the chain of an application started by the caller.
    pub(crate) fn init(mut app: Application<MemDB, CounterApp>, db: MemDB) -> Node {
        app.consensus()
            .init_chain(RequestInitChain {
                chain_id: ChainID::new(CHAIN_ID),
                time: GENESIS_TIME,
                initial_height: BlockHeight::new(1),
            })
            .unwrap();
        Node {
            app,
            db,
            height: 0,
            time: GENESIS_TIME,
        }
    }

    pub(crate) fn app(&mut self) -> &mut Application<MemDB, CounterApp> {
        &mut self.app
    }

    pub(crate) fn db(&self) -> &MemDB {
        &self.db
    }

    pub(crate) fn height(&self) -> u64 {
        self.height
    }

    pub(crate) fn next_request(&mut self, txs: Vec<Vec<u8>>) -> RequestFinalizeBlock {
        self.time = self.time + BLOCK_INTERVAL;
        RequestFinalizeBlock {
            time: self.time,
            height: BlockHeight::new(self.height + 1),
            hash: (self.height + 1).to_le_bytes().to_vec(),
            txs,
        }
    }

    /// Finalize and commit the next block containing `txs`.
    pub(crate) fn execute_block(&mut self, txs: Vec<Vec<u8>>) -> ResponseFinalizeBlock {
        let request = self.next_request(txs);
        let response = self.app.consensus().finalize_block(request).unwrap();
        self.app.consensus().commit().unwrap();
        self.height += 1;
        response
    }

    /// Let `duration` pass before the next block.
    pub(crate) fn advance_time(&mut self, duration: Duration) {
        self.time = self.time + duration;
    }

    pub(crate) fn query(&self, path: &str) -> serde_json::Value {
        let response = self.app.info().query(&RequestQuery {
            path: path.to_string(),
        });
        assert_eq!(response.code, CODE_OK, "query {} failed: {}", path, response.log);
        serde_json::from_slice(&response.value).unwrap()
    }

    pub(crate) fn value(&self, key: &str) -> Option<Value> {
        self.db.value(key).unwrap()
    }

    pub(crate) fn balance(&self, account: &AccountId) -> u64 {
        Ledger::native().balance(&self.db, account).unwrap()
    }

    pub(crate) fn active_members(&self) -> Vec<String> {
        serde_json::from_value(self.query("/members")).unwrap()
    }
}

/// The `result` field of an executed transaction's data.
pub(crate) fn result_of(tx_result: &ExecTxResult) -> serde_json::Value {
    let data: serde_json::Value = serde_json::from_slice(&tx_result.data).unwrap();
    data["result"].clone()
}
