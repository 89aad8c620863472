/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types specific to governance: member records, proposals and ballots.
//!
//! Governance records are stored in app state as [`Value`]s, so that they can be read by contracts
//! and queried like any other contract variable. Every type here converts to and from its `Value`
//! form at the storage boundary.

use std::fmt::{self, Display, Formatter};

use crate::types::{
    basic::{AccountId, Amount, ProposalId, Timestamp},
    params::RewardSplit,
    value::Value,
};

use super::GovernanceError;

/// Lifecycle state of an account with respect to the member set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemberStatus {
    Unregistered,
    PendingRegistration,
    Active,
    PendingLeave,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Unregistered => "unregistered",
            MemberStatus::PendingRegistration => "pending_registration",
            MemberStatus::Active => "active",
            MemberStatus::PendingLeave => "pending_leave",
        }
    }

    fn from_str(status: &str) -> Option<MemberStatus> {
        match status {
            "unregistered" => Some(MemberStatus::Unregistered),
            "pending_registration" => Some(MemberStatus::PendingRegistration),
            "active" => Some(MemberStatus::Active),
            "pending_leave" => Some(MemberStatus::PendingLeave),
            _ => None,
        }
    }
}

impl Display for MemberStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Governance record of one account.
///
/// ## Invariant
///
/// `deposit` is the registration fee locked in escrow for this account, and is refunded exactly once,
/// when the account leaves the member set or withdraws its registration. Genesis members have a
/// deposit of zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MemberRecord {
    pub status: MemberStatus,
    pub deposit: Amount,
    /// Block time of the latest `announce_leave`, if the member is pending leave.
    pub announced_at: Option<Timestamp>,
}

impl MemberRecord {
    pub fn unregistered() -> MemberRecord {
        MemberRecord {
            status: MemberStatus::Unregistered,
            deposit: 0,
            announced_at: None,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::map()
            .with("status", self.status.as_str())
            .with("deposit", self.deposit)
            .with("announced_at", self.announced_at.map(|t| t.nanos()))
    }

    pub fn from_value(value: &Value) -> Option<MemberRecord> {
        let status = MemberStatus::from_str(value.get("status")?.as_str()?)?;
        let deposit = value.get("deposit")?.as_u64()?;
        let announced_at = match value.get("announced_at")? {
            Value::Null => None,
            nanos => Some(Timestamp::from_nanos(nanos.as_u64()?)),
        };
        Some(MemberRecord {
            status,
            deposit,
            announced_at,
        })
    }
}

/// The typed payload of a proposal. One variant per vote type with a built-in effect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProposalArg {
    AddMember(AccountId),
    RemoveMember(AccountId),
    ChangeRegistrationFee(Amount),
    RewardChange(RewardSplit),
    DaoPayout {
        amount: Amount,
        to: AccountId,
        contract: String,
    },
    StampCostChange(u64),
    ChangeTypes(Vec<String>),
    /// A vote type in the catalog that has no built-in effect.
    Other { kind: String, arg: Value },
}

pub const ADD_MEMBER: &str = "add_member";
pub const REMOVE_MEMBER: &str = "remove_member";
pub const CHANGE_REGISTRATION_FEE: &str = "change_registration_fee";
pub const REWARD_CHANGE: &str = "reward_change";
pub const DAO_PAYOUT: &str = "dao_payout";
pub const STAMP_COST_CHANGE: &str = "stamp_cost_change";
pub const CHANGE_TYPES: &str = "change_types";

impl ProposalArg {
    /// Validate `arg` against the shape required by `type_of_vote`.
    pub fn parse(type_of_vote: &str, arg: &Value) -> Result<ProposalArg, GovernanceError> {
        let invalid = |reason: &str| GovernanceError::InvalidArgument {
            type_of_vote: type_of_vote.to_string(),
            reason: reason.to_string(),
        };

        let parsed = match type_of_vote {
            ADD_MEMBER => ProposalArg::AddMember(AccountId::new(
                arg.as_str().ok_or_else(|| invalid("expected an account"))?,
            )),
            REMOVE_MEMBER => ProposalArg::RemoveMember(AccountId::new(
                arg.as_str().ok_or_else(|| invalid("expected an account"))?,
            )),
            CHANGE_REGISTRATION_FEE => ProposalArg::ChangeRegistrationFee(
                arg.as_u64()
                    .ok_or_else(|| invalid("expected a non-negative amount"))?,
            ),
            REWARD_CHANGE => ProposalArg::RewardChange(RewardSplit::from_value(arg)?),
            DAO_PAYOUT => {
                let amount = arg
                    .get("amount")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| invalid("expected a non-negative `amount`"))?;
                let to = arg
                    .get("to")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("expected a recipient `to`"))?;
                let contract = arg
                    .get("contract_name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| invalid("expected a `contract_name`"))?;
                ProposalArg::DaoPayout {
                    amount,
                    to: AccountId::new(to),
                    contract: contract.to_string(),
                }
            }
            STAMP_COST_CHANGE => {
                let stamp_cost = arg
                    .as_u64()
                    .ok_or_else(|| invalid("expected a positive integer"))?;
                if stamp_cost == 0 {
                    return Err(invalid("expected a positive integer"));
                }
                ProposalArg::StampCostChange(stamp_cost)
            }
            CHANGE_TYPES => {
                let list = arg.as_list().ok_or_else(|| invalid("expected a list"))?;
                let types = list
                    .iter()
                    .map(|t| t.as_str().map(String::from))
                    .collect::<Option<Vec<String>>>()
                    .ok_or_else(|| invalid("expected a list of strings"))?;
                if types.is_empty() {
                    return Err(invalid("expected at least one vote type"));
                }
                ProposalArg::ChangeTypes(types)
            }
            other => ProposalArg::Other {
                kind: other.to_string(),
                arg: arg.clone(),
            },
        };
        Ok(parsed)
    }

    pub fn to_value(&self) -> Value {
        match self {
            ProposalArg::AddMember(account) | ProposalArg::RemoveMember(account) => {
                Value::from(account.as_str())
            }
            ProposalArg::ChangeRegistrationFee(amount) => Value::from(*amount),
            ProposalArg::RewardChange(split) => split.to_value(),
            ProposalArg::DaoPayout {
                amount,
                to,
                contract,
            } => Value::map()
                .with("amount", *amount)
                .with("to", to.as_str())
                .with("contract_name", contract.as_str()),
            ProposalArg::StampCostChange(stamp_cost) => Value::from(*stamp_cost),
            ProposalArg::ChangeTypes(types) => Value::from(types.clone()),
            ProposalArg::Other { arg, .. } => arg.clone(),
        }
    }
}

/// A governance proposal and its tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    pub id: ProposalId,
    pub type_of_vote: String,
    pub arg: ProposalArg,
    pub proposer: AccountId,
    pub proposed_at: Timestamp,
    pub yes: u64,
    pub no: u64,
    /// Every member that has cast a ballot, in order. The proposer is always first.
    pub voters: Vec<AccountId>,
    pub finalized: bool,
}

impl Proposal {
    pub fn has_voted(&self, member: &AccountId) -> bool {
        self.voters.contains(member)
    }

    /// Whether `yes` is a strict majority of `active_members`.
    pub fn has_quorum(&self, active_members: usize) -> bool {
        self.yes as u128 * 2 > active_members as u128
    }

    pub fn to_value(&self) -> Value {
        Value::map()
            .with("id", self.id.int())
            .with("type_of_vote", self.type_of_vote.as_str())
            .with("arg", self.arg.to_value())
            .with("proposer", self.proposer.as_str())
            .with("proposed_at", self.proposed_at.nanos())
            .with("yes", self.yes)
            .with("no", self.no)
            .with(
                "voters",
                Value::List(self.voters.iter().map(|v| Value::from(v.as_str())).collect()),
            )
            .with("finalized", self.finalized)
    }

    pub fn from_value(value: &Value) -> Option<Proposal> {
        let type_of_vote = value.get("type_of_vote")?.as_str()?.to_string();
        let arg = ProposalArg::parse(&type_of_vote, value.get("arg")?).ok()?;
        let voters = value
            .get("voters")?
            .as_list()?
            .iter()
            .map(|v| v.as_str().map(AccountId::new))
            .collect::<Option<Vec<AccountId>>>()?;
        Some(Proposal {
            id: ProposalId::new(value.get("id")?.as_u64()?),
            type_of_vote,
            arg,
            proposer: AccountId::new(value.get("proposer")?.as_str()?),
            proposed_at: Timestamp::from_nanos(value.get("proposed_at")?.as_u64()?),
            yes: value.get("yes")?.as_u64()?,
            no: value.get("no")?.as_u64()?,
            voters,
            finalized: value.get("finalized")?.as_bool()?,
        })
    }
}

/// A member's vote on a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ballot {
    Yes,
    No,
}

impl Ballot {
    /// Parse a ballot from `"yes"`/`"no"` or a boolean.
    pub fn from_value(value: &Value) -> Option<Ballot> {
        match value {
            Value::Bool(true) => Some(Ballot::Yes),
            Value::Bool(false) => Some(Ballot::No),
            Value::Str(s) if s == "yes" => Some(Ballot::Yes),
            Value::Str(s) if s == "no" => Some(Ballot::No),
            _ => None,
        }
    }
}
