use std::time::Duration;

use log::LevelFilter;
use serde_json::json;
use stampchain::{
    app::messages::{ExecTxResult, ValidatorUpdate},
    types::{basic::AccountId, validator_set::MEMBER_POWER, value::Value},
};

mod common;

use crate::common::{
    logging::setup_logger,
    node::{ballot, kwargs, propose, result_of, test_configuration, test_genesis, Account, Node},
};

const EIGHT_DAYS: Duration = Duration::from_secs(8 * 24 * 60 * 60);

fn assert_failed(tx_result: &ExecTxResult, message: &str) {
    assert_eq!(tx_result.code, 1);
    assert_eq!(result_of(tx_result), json!(message));
}

fn no_kwargs() -> stampchain::types::value::Kwargs {
    kwargs([])
}

#[test]
fn register_and_unregister_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut candidate = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[&candidate]));

    // 1. Registering locks the registration fee in escrow.
    let response = node.execute_block(vec![candidate.govern("register", no_kwargs())]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(response.tx_results[0].gas_used, 100);
    assert_eq!(node.balance(candidate.id()), 900_000);
    assert_eq!(node.balance(&AccountId::new("members")), 100_000);
    let record = node.query(&format!("/get/members.member:{}", candidate.id()));
    assert_eq!(record["status"], json!("pending_registration"));
    assert_eq!(record["deposit"], json!(100_000));

    // 2. Registering twice fails and leaves the balance untouched.
    let response = node.execute_block(vec![candidate.govern("register", no_kwargs())]);
    assert_failed(&response.tx_results[0], "Already registered");
    assert_eq!(node.balance(candidate.id()), 900_000);

    // 3. Unregistering refunds the deposit and forgets the record.
    let response = node.execute_block(vec![candidate.govern("unregister", no_kwargs())]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(node.balance(candidate.id()), 1_000_000);
    assert_eq!(node.balance(&AccountId::new("members")), 0);
    assert_eq!(
        node.query(&format!("/get/members.member:{}", candidate.id())),
        serde_json::Value::Null
    );

    // 4. Unregistering twice fails.
    let response = node.execute_block(vec![candidate.govern("unregister", no_kwargs())]);
    assert_failed(&response.tx_results[0], "Member must have pending registration");

    // 5. Failed governance calls still consume the sender's nonce.
    assert_eq!(node.query(&format!("/nonce/{}", candidate.id())), json!(3));
}

#[test]
fn register_without_funds_test() {
    setup_logger(LevelFilter::Info);

    let member = Account::generate();
    let mut pauper = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&member], &[]));

    let response = node.execute_block(vec![pauper.govern("register", no_kwargs())]);
    assert_eq!(response.tx_results[0].code, 1);
    assert_eq!(
        node.query(&format!("/get/members.member:{}", pauper.id())),
        serde_json::Value::Null
    );
}

#[test]
fn add_member_by_majority_test() {
    setup_logger(LevelFilter::Info);

    let mut members: Vec<Account> = (0..5).map(|_| Account::generate()).collect();
    let mut candidate = Account::generate();
    let genesis = test_genesis(&members.iter().collect::<Vec<&Account>>(), &[&candidate]);
    let mut node = Node::start(test_configuration(), genesis);

    node.execute_block(vec![candidate.govern("register", no_kwargs())]);

    // 1. The proposer's ballot counts as the first yes.
    let arg = Value::from(candidate.id().as_str());
    let response = node.execute_block(vec![members[0].govern("propose_vote", propose("add_member", arg))]);
    let proposal = result_of(&response.tx_results[0]);
    assert_eq!(proposal["id"], json!(1));
    assert_eq!(proposal["yes"], json!(1));
    assert_eq!(proposal["finalized"], json!(false));
    assert!(response.validator_updates.is_empty());

    // 2. The third yes out of five members finalizes the proposal and admits the candidate.
    let response = node.execute_block(vec![
        members[1].govern("vote", ballot(1, true)),
        members[2].govern("vote", ballot(1, true)),
    ]);
    assert_eq!(result_of(&response.tx_results[0])["finalized"], json!(false));
    assert_eq!(result_of(&response.tx_results[1])["finalized"], json!(true));
    assert_eq!(
        response.validator_updates,
        vec![ValidatorUpdate {
            account: candidate.id().clone(),
            power: MEMBER_POWER,
        }]
    );
    assert_eq!(node.active_members().len(), 6);
    assert!(node.active_members().contains(&candidate.id().to_string()));
    assert_eq!(
        node.query(&format!("/get/members.member:{}", candidate.id()))["status"],
        json!("active")
    );

    // 3. Ballots on a finalized proposal fail.
    let response = node.execute_block(vec![members[3].govern("vote", ballot(1, true))]);
    assert_failed(&response.tx_results[0], "Proposal already finalized");

    // 4. The stored proposal records every ballot.
    let stored = node.query("/proposal/1");
    assert_eq!(stored["yes"], json!(3));
    assert_eq!(stored["voters"].as_array().unwrap().len(), 3);
    assert_eq!(stored["finalized"], json!(true));

    // 5. The new member can propose.
    let response = node.execute_block(vec![candidate.govern(
        "propose_vote",
        propose("topic_vote", Value::from("hello")),
    )]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(result_of(&response.tx_results[0])["id"], json!(2));
}

#[test]
fn ballot_preconditions_test() {
    setup_logger(LevelFilter::Info);

    let mut members: Vec<Account> = (0..5).map(|_| Account::generate()).collect();
    let mut outsider = Account::generate();
    let genesis = test_genesis(&members.iter().collect::<Vec<&Account>>(), &[&outsider]);
    let mut node = Node::start(test_configuration(), genesis);

    let response = node.execute_block(vec![members[0].govern(
        "propose_vote",
        propose("topic_vote", Value::from("lunch")),
    )]);
    assert_eq!(response.tx_results[0].code, 0);

    let response = node.execute_block(vec![
        outsider.govern("propose_vote", propose("topic_vote", Value::from("dinner"))),
        outsider.govern("vote", ballot(1, true)),
        members[0].govern("vote", ballot(1, true)),
        members[1].govern("vote", ballot(7, true)),
        members[1].govern("propose_vote", propose("no_such_vote", Value::Null)),
        members[1].govern("vote", kwargs([("proposal_id", Value::from(1u64)), ("vote", Value::from("maybe"))])),
        members[1].govern("vote", ballot(1, false)),
    ]);
    let results = &response.tx_results;
    assert_failed(&results[0], "Only members can propose or vote");
    assert_failed(&results[1], "Only members can propose or vote");
    assert_failed(&results[2], "Already voted");
    assert_failed(&results[3], "Proposal 7 does not exist");
    assert_failed(&results[4], "Invalid vote type: no_such_vote");
    assert_failed(&results[5], "Vote must be 'yes' or 'no'");
    assert_eq!(results[6].code, 0);
    assert_eq!(result_of(&results[6])["no"], json!(1));

    // A proposal stops accepting ballots once it expires.
    node.advance_time(EIGHT_DAYS);
    let response = node.execute_block(vec![members[2].govern("vote", ballot(1, true))]);
    assert_failed(&response.tx_results[0], "Proposal expired");

    // The refused ballot leaves the tally untouched.
    let stored = node.query("/proposal/1");
    assert_eq!(stored["yes"], json!(1));
    assert_eq!(stored["no"], json!(1));
    assert_eq!(stored["voters"].as_array().unwrap().len(), 2);
    assert_eq!(stored["finalized"], json!(false));
}

#[test]
fn quorum_counts_current_members_test() {
    setup_logger(LevelFilter::Info);

    let mut members: Vec<Account> = (0..3).map(|_| Account::generate()).collect();
    let mut candidates: Vec<Account> = (0..2).map(|_| Account::generate()).collect();
    let genesis = test_genesis(
        &members.iter().collect::<Vec<&Account>>(),
        &candidates.iter().collect::<Vec<&Account>>(),
    );
    let mut node = Node::start(test_configuration(), genesis);

    // 1. A topic is proposed while there are three members.
    let response = node.execute_block(vec![
        candidates[0].govern("register", no_kwargs()),
        candidates[1].govern("register", no_kwargs()),
        members[0].govern("propose_vote", propose("topic_vote", Value::from("lunch"))),
    ]);
    assert!(response.tx_results.iter().all(|tx_result| tx_result.code == 0));
    assert_eq!(result_of(&response.tx_results[2])["id"], json!(1));

    // 2. Two candidates are admitted, growing the member set to five.
    let arg = Value::from(candidates[0].id().as_str());
    let response = node.execute_block(vec![
        members[0].govern("propose_vote", propose("add_member", arg)),
        members[1].govern("vote", ballot(2, true)),
    ]);
    assert_eq!(result_of(&response.tx_results[1])["finalized"], json!(true));
    assert_eq!(node.active_members().len(), 4);

    let arg = Value::from(candidates[1].id().as_str());
    let response = node.execute_block(vec![
        members[0].govern("propose_vote", propose("add_member", arg)),
        members[1].govern("vote", ballot(3, true)),
        members[2].govern("vote", ballot(3, true)),
    ]);
    assert_eq!(result_of(&response.tx_results[1])["finalized"], json!(false));
    assert_eq!(result_of(&response.tx_results[2])["finalized"], json!(true));
    assert_eq!(node.active_members().len(), 5);

    // 3. Two yes out of five no longer finalize the topic, although they would have out of three.
    let response = node.execute_block(vec![members[1].govern("vote", ballot(1, true))]);
    assert_eq!(result_of(&response.tx_results[0])["yes"], json!(2));
    assert_eq!(result_of(&response.tx_results[0])["finalized"], json!(false));

    // 4. The third yes does.
    let response = node.execute_block(vec![members[2].govern("vote", ballot(1, true))]);
    assert_eq!(result_of(&response.tx_results[0])["finalized"], json!(true));
}

#[test]
fn remove_member_test() {
    setup_logger(LevelFilter::Info);

    let mut members: Vec<Account> = (0..3).map(|_| Account::generate()).collect();
    let genesis = test_genesis(&members.iter().collect::<Vec<&Account>>(), &[]);
    let mut node = Node::start(test_configuration(), genesis);
    let removed = members[2].id().clone();

    let response = node.execute_block(vec![
        members[0].govern("propose_vote", propose("remove_member", Value::from(removed.as_str()))),
        members[1].govern("vote", ballot(1, true)),
    ]);
    assert_eq!(result_of(&response.tx_results[1])["finalized"], json!(true));
    assert_eq!(
        response.validator_updates,
        vec![ValidatorUpdate {
            account: removed.clone(),
            power: stampchain::types::basic::Power::new(0),
        }]
    );
    assert!(!node.active_members().contains(&removed.to_string()));

    // The removed member can no longer take part in governance.
    let response = node.execute_block(vec![members[2].govern(
        "propose_vote",
        propose("topic_vote", Value::from("reinstate me")),
    )]);
    assert_failed(&response.tx_results[0], "Only members can propose or vote");
}

#[test]
fn announce_leave_and_leave_test() {
    setup_logger(LevelFilter::Info);

    let mut founder = Account::generate();
    let mut joiner = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&founder], &[&joiner]));

    // 1. With a single member, a proposal is finalized by its proposer's ballot.
    node.execute_block(vec![joiner.govern("register", no_kwargs())]);
    let response = node.execute_block(vec![founder.govern(
        "propose_vote",
        propose("add_member", Value::from(joiner.id().as_str())),
    )]);
    assert_eq!(result_of(&response.tx_results[0])["finalized"], json!(true));
    assert_eq!(node.active_members().len(), 2);
    assert_eq!(node.balance(joiner.id()), 900_000);

    // 2. Leaving requires an announcement, then the cooldown.
    let response = node.execute_block(vec![
        joiner.govern("leave", no_kwargs()),
        joiner.govern("announce_leave", no_kwargs()),
        joiner.govern("leave", no_kwargs()),
    ]);
    assert_failed(&response.tx_results[0], "Not pending leave");
    assert_eq!(result_of(&response.tx_results[1])["status"], json!("pending_leave"));
    assert_failed(&response.tx_results[2], "Leave announcement period not over");
    assert_eq!(node.active_members().len(), 2);

    // 3. After the cooldown, leaving refunds the deposit and removes the validator.
    node.advance_time(EIGHT_DAYS);
    let response = node.execute_block(vec![joiner.govern("leave", no_kwargs())]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_eq!(node.balance(joiner.id()), 1_000_000);
    assert_eq!(node.active_members(), vec![founder.id().to_string()]);
    assert_eq!(response.validator_updates.len(), 1);
    assert_eq!(response.validator_updates[0].account, *joiner.id());
    assert_eq!(response.validator_updates[0].power.int(), 0);

    // 4. The last member cannot leave.
    node.execute_block(vec![founder.govern("announce_leave", no_kwargs())]);
    node.advance_time(EIGHT_DAYS);
    let response = node.execute_block(vec![founder.govern("leave", no_kwargs())]);
    assert_failed(&response.tx_results[0], "Cannot remove the last member");
    assert_eq!(node.active_members(), vec![founder.id().to_string()]);
}

#[test]
fn add_member_requires_pending_registration_test() {
    setup_logger(LevelFilter::Info);

    let mut founder = Account::generate();
    let mut candidate = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&founder], &[&candidate]));

    node.execute_block(vec![
        candidate.govern("register", no_kwargs()),
        candidate.govern("unregister", no_kwargs()),
    ]);

    // The proposal finalizes on creation, so the failed admission fails the whole call.
    let response = node.execute_block(vec![founder.govern(
        "propose_vote",
        propose("add_member", Value::from(candidate.id().as_str())),
    )]);
    assert_failed(&response.tx_results[0], "Member must have pending registration");
    assert_eq!(node.query("/proposal/1"), serde_json::Value::Null);
    assert_eq!(node.active_members(), vec![founder.id().to_string()]);
}

#[test]
fn parameter_proposals_test() {
    setup_logger(LevelFilter::Info);

    let mut founder = Account::generate();
    let mut recipient = Account::generate();
    let mut genesis = test_genesis(&[&founder], &[&recipient]);
    genesis.balances.push((AccountId::new("dao"), 50_000));
    let mut node = Node::start(test_configuration(), genesis);

    let payout = Value::map()
        .with("amount", 1_000u64)
        .with("to", recipient.id().as_str())
        .with("contract_name", "currency");
    let response = node.execute_block(vec![
        founder.govern("propose_vote", propose("stamp_cost_change", Value::from(30u64))),
        founder.govern("propose_vote", propose("change_registration_fee", Value::from(5u64))),
        founder.govern(
            "propose_vote",
            propose(
                "reward_change",
                Value::from(vec![400_000u64, 300_000, 200_000, 100_000]),
            ),
        ),
        founder.govern("propose_vote", propose("dao_payout", payout)),
    ]);
    for tx_result in &response.tx_results {
        assert_eq!(tx_result.code, 0);
        assert_eq!(result_of(tx_result)["finalized"], json!(true));
    }

    let params = node.query("/params");
    assert_eq!(params["stamp_cost"], json!(30));
    assert_eq!(params["registration_fee"], json!(5));
    assert_eq!(params["reward_split"], json!([400_000, 300_000, 200_000, 100_000]));
    assert_eq!(node.balance(recipient.id()), 1_001_000);
    assert_eq!(node.balance(&AccountId::new("dao")), 49_000);

    // The new registration fee applies to later registrations.
    node.execute_block(vec![recipient.govern("register", no_kwargs())]);
    assert_eq!(node.balance(recipient.id()), 1_000_995);

    // A payout the treasury cannot cover fails the call and creates no proposal.
    let too_much = Value::map()
        .with("amount", 1_000_000u64)
        .with("to", recipient.id().as_str())
        .with("contract_name", "currency");
    let response = node.execute_block(vec![founder.govern("propose_vote", propose("dao_payout", too_much))]);
    assert_eq!(response.tx_results[0].code, 1);
    assert_eq!(node.query("/proposal/5"), serde_json::Value::Null);

    // Invalid arguments are rejected when proposing.
    let response = node.execute_block(vec![
        founder.govern("propose_vote", propose("stamp_cost_change", Value::from(0u64))),
        founder.govern(
            "propose_vote",
            propose("reward_change", Value::from(vec![1u64, 2, 3, 4])),
        ),
    ]);
    assert_eq!(response.tx_results[0].code, 1);
    assert_eq!(response.tx_results[1].code, 1);
    assert_eq!(node.query("/params")["stamp_cost"], json!(30));

    // Changing the catalog restricts later proposals.
    let response = node.execute_block(vec![
        founder.govern(
            "propose_vote",
            propose("change_types", Value::from(vec!["add_member", "remove_member"])),
        ),
        founder.govern("propose_vote", propose("stamp_cost_change", Value::from(40u64))),
    ]);
    assert_eq!(response.tx_results[0].code, 0);
    assert_failed(&response.tx_results[1], "Invalid vote type: stamp_cost_change");
    assert_eq!(
        node.query("/params")["vote_types"],
        json!(["add_member", "remove_member"])
    );
}

#[test]
fn insufficient_stamps_test() {
    setup_logger(LevelFilter::Info);

    let mut founder = Account::generate();
    let mut node = Node::start(test_configuration(), test_genesis(&[&founder], &[]));

    founder.set_stamps_supplied(99);
    let response = node.execute_block(vec![founder.govern(
        "propose_vote",
        propose("topic_vote", Value::from("cheap")),
    )]);
    assert_failed(&response.tx_results[0], "Insufficient stamps supplied");
    assert_eq!(response.tx_results[0].gas_used, 99);
    assert_eq!(node.query("/proposal/1"), serde_json::Value::Null);
}
