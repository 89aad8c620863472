/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The member set, its lifecycle, and the proposal-and-vote engine that governs it.
//!
//! # Members
//!
//! The active members of the chain are its validators. The set of active members is stored as the
//! ordered list [`MEMBER_NODES`](crate::state::variables::MEMBER_NODES); each account's lifecycle
//! state is stored in its [`MemberRecord`](types::MemberRecord). The lifecycle operations are
//! implemented in [`members`]:
//!
//! ```text
//! unregistered --register--> pending_registration --(add_member finalized)--> active
//! pending_registration --unregister--> unregistered
//! active --announce_leave--> pending_leave --leave (after cooldown)--> unregistered
//! active/pending_leave --(remove_member finalized)--> unregistered
//! ```
//!
//! # Proposals
//!
//! Any active member can create a proposal of a type in the vote-type catalog. The proposer's own
//! ballot counts as the first `yes`. A proposal is finalized, and its effect applied, by the first
//! ballot that makes `yes` a strict majority of the active members *at that moment*. A proposal
//! stops accepting ballots once finalized, or once it is older than the proposal expiry window. See
//! [`proposals`].
//!
//! Every time-bounded rule is evaluated against the block time passed in by the caller.
//!
//! # Calling governance
//!
//! Transactions reach governance through [`contract`], which decodes a function call on the
//! [`GOVERNANCE_CONTRACT`] into one of the operations of [`Governance`].

use std::{
    fmt::{self, Display, Formatter},
    time::Duration,
};

use crate::{
    ledger::LedgerError,
    state::{app_state::KVSet, pluggables::KVGetError},
    types::{basic::ProposalId, params::ParamsError},
};

pub mod contract;

pub mod members;

pub mod proposals;

pub mod types;

/// Name of the contract that transactions call to reach governance.
pub const GOVERNANCE_CONTRACT: &str = "members";

/// Account that holds registration deposits in escrow.
pub const ESCROW_ACCOUNT: &str = "members";

/// Account that `dao_payout` proposals pay out of.
pub const DAO_TREASURY: &str = "dao";

/// Time windows of governance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GovernanceConfig {
    /// How long after its creation a proposal accepts ballots.
    pub proposal_expiry: Duration,
    /// How long after `announce_leave` a member must wait before it can `leave`.
    pub leave_cooldown: Duration,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);
        GovernanceConfig {
            proposal_expiry: WEEK,
            leave_cooldown: WEEK,
        }
    }
}

/// Handle for running governance operations against a writable state.
pub struct Governance<'s, S: KVSet + ?Sized> {
    pub(crate) state: &'s mut S,
    pub(crate) config: &'s GovernanceConfig,
}

impl<'s, S: KVSet + ?Sized> Governance<'s, S> {
    pub fn new(state: &'s mut S, config: &'s GovernanceConfig) -> Governance<'s, S> {
        Governance { state, config }
    }
}

/// Reasons why a governance operation failed. The `Display` text of every variant except
/// `KVGetError` (also when wrapped in `LedgerError`) becomes the `result` of the failed transaction.
#[derive(Debug)]
pub enum GovernanceError {
    AlreadyRegistered,
    NotPendingRegistration,
    NotActive,
    NotPendingLeave,
    CooldownNotElapsed,
    LastMember,
    NotAMember,
    InvalidVoteType {
        type_of_vote: String,
    },
    InvalidArgument {
        type_of_vote: String,
        reason: String,
    },
    InvalidParameter(ParamsError),
    ProposalNotFound {
        proposal: ProposalId,
    },
    ProposalFinalized,
    ProposalExpired,
    AlreadyVoted,
    InvalidBallot,
    UnknownFunction {
        function: String,
    },
    MissingArgument {
        name: &'static str,
    },
    LedgerError(LedgerError),
    KVGetError(KVGetError),
}

impl From<KVGetError> for GovernanceError {
    fn from(value: KVGetError) -> Self {
        GovernanceError::KVGetError(value)
    }
}

impl From<LedgerError> for GovernanceError {
    fn from(value: LedgerError) -> Self {
        GovernanceError::LedgerError(value)
    }
}

impl From<ParamsError> for GovernanceError {
    fn from(value: ParamsError) -> Self {
        GovernanceError::InvalidParameter(value)
    }
}

impl Display for GovernanceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GovernanceError::AlreadyRegistered => write!(f, "Already registered"),
            GovernanceError::NotPendingRegistration => {
                write!(f, "Member must have pending registration")
            }
            GovernanceError::NotActive => write!(f, "Not an active member"),
            GovernanceError::NotPendingLeave => write!(f, "Not pending leave"),
            GovernanceError::CooldownNotElapsed => write!(f, "Leave announcement period not over"),
            GovernanceError::LastMember => write!(f, "Cannot remove the last member"),
            GovernanceError::NotAMember => write!(f, "Only members can propose or vote"),
            GovernanceError::InvalidVoteType { type_of_vote } => {
                write!(f, "Invalid vote type: {}", type_of_vote)
            }
            GovernanceError::InvalidArgument {
                type_of_vote,
                reason,
            } => write!(f, "Invalid argument for {}: {}", type_of_vote, reason),
            GovernanceError::InvalidParameter(err) => write!(f, "{}", err),
            GovernanceError::ProposalNotFound { proposal } => {
                write!(f, "Proposal {} does not exist", proposal)
            }
            GovernanceError::ProposalFinalized => write!(f, "Proposal already finalized"),
            GovernanceError::ProposalExpired => write!(f, "Proposal expired"),
            GovernanceError::AlreadyVoted => write!(f, "Already voted"),
            GovernanceError::InvalidBallot => write!(f, "Vote must be 'yes' or 'no'"),
            GovernanceError::UnknownFunction { function } => {
                write!(f, "Unknown function: {}", function)
            }
            GovernanceError::MissingArgument { name } => write!(f, "Missing argument: {}", name),
            GovernanceError::LedgerError(err) => write!(f, "{}", err),
            GovernanceError::KVGetError(err) => write!(f, "{}", err),
        }
    }
}
