/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The proposal-and-vote engine.
//!
//! ## Quorum
//!
//! A proposal is finalized by the first ballot (the proposer's implicit ballot included) after which
//! `2 * yes > n`, where `n` is the number of active members when the ballot is processed, not when
//! the proposal was created.
//!
//! ## Atomicity
//!
//! If the effect of a proposal fails (e.g., the candidate of an `add_member` proposal withdrew its
//! registration), the ballot that triggered finalization fails as a whole. Since governance runs
//! against a discardable view of the state, the tally is left exactly as it was before the ballot.

use crate::{
    ledger::Ledger,
    state::{
        app_state::KVSet,
        pluggables::{KVGet, KVGetError, Key},
        variables::{proposal_key, REGISTRATION_FEE, REWARD_SPLIT, STAMP_COST, TOTAL_VOTES, VOTE_TYPES},
    },
    types::{
        basic::{AccountId, ProposalId, Timestamp},
        value::Value,
    },
};

use super::{
    members::active_members,
    types::{Ballot, Proposal, ProposalArg},
    Governance, GovernanceError, DAO_TREASURY,
};

/// Get proposal `id`, if it exists.
pub fn proposal<S: KVGet + ?Sized>(state: &S, id: ProposalId) -> Result<Option<Proposal>, KVGetError> {
    let key = proposal_key(id);
    match state.value(&key)? {
        None => Ok(None),
        Some(value) => Proposal::from_value(&value)
            .map(Some)
            .ok_or(KVGetError::MalformedValue {
                key: Key::AppState { key },
            }),
    }
}

/// Get the id of the latest proposal, or 0 if no proposal was ever created.
pub fn total_votes<S: KVGet + ?Sized>(state: &S) -> Result<u64, KVGetError> {
    match state.value(TOTAL_VOTES)? {
        None => Ok(0),
        Some(value) => value.as_u64().ok_or(KVGetError::MalformedValue {
            key: Key::AppState {
                key: TOTAL_VOTES.to_string(),
            },
        }),
    }
}

fn put_proposal<S: KVSet + ?Sized>(state: &mut S, proposal: &Proposal) {
    state.set_value(&proposal_key(proposal.id), Some(proposal.to_value()));
}

impl<'s, S: KVSet + ?Sized> Governance<'s, S> {
    /// Create a proposal of `type_of_vote` with `arg`, proposed by active member `sender` at `now`.
    ///
    /// `sender`'s ballot is counted as the first `yes`, so on a chain with a single active member
    /// the proposal is finalized immediately.
    pub fn propose_vote(
        &mut self,
        sender: &AccountId,
        type_of_vote: &str,
        arg: &Value,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let members = active_members(&*self.state)?;
        if !members.contains(sender) {
            return Err(GovernanceError::NotAMember);
        }
        if !self.state.vote_types()?.iter().any(|t| t == type_of_vote) {
            return Err(GovernanceError::InvalidVoteType {
                type_of_vote: type_of_vote.to_string(),
            });
        }
        let arg = ProposalArg::parse(type_of_vote, arg)?;

        let id = ProposalId::new(total_votes(&*self.state)? + 1);
        self.state.set_value(TOTAL_VOTES, Some(Value::from(id.int())));

        let mut proposal = Proposal {
            id,
            type_of_vote: type_of_vote.to_string(),
            arg,
            proposer: sender.clone(),
            proposed_at: now,
            yes: 1,
            no: 0,
            voters: vec![sender.clone()],
            finalized: false,
        };
        if proposal.has_quorum(members.len()) {
            self.finalize(&mut proposal)?;
        }
        put_proposal(self.state, &proposal);
        Ok(proposal)
    }

    /// Cast `sender`'s `ballot` on proposal `id` at `now`.
    pub fn vote(
        &mut self,
        sender: &AccountId,
        id: ProposalId,
        ballot: Ballot,
        now: Timestamp,
    ) -> Result<Proposal, GovernanceError> {
        let members = active_members(&*self.state)?;
        if !members.contains(sender) {
            return Err(GovernanceError::NotAMember);
        }
        let mut proposal = proposal(&*self.state, id)?
            .ok_or(GovernanceError::ProposalNotFound { proposal: id })?;
        if proposal.finalized {
            return Err(GovernanceError::ProposalFinalized);
        }
        if now.duration_since(proposal.proposed_at) >= self.config.proposal_expiry {
            return Err(GovernanceError::ProposalExpired);
        }
        if proposal.has_voted(sender) {
            return Err(GovernanceError::AlreadyVoted);
        }

        match ballot {
            Ballot::Yes => proposal.yes += 1,
            Ballot::No => proposal.no += 1,
        }
        proposal.voters.push(sender.clone());

        if proposal.has_quorum(members.len()) {
            self.finalize(&mut proposal)?;
        }
        put_proposal(self.state, &proposal);
        Ok(proposal)
    }

    fn finalize(&mut self, proposal: &mut Proposal) -> Result<(), GovernanceError> {
        match &proposal.arg {
            ProposalArg::AddMember(candidate) => self.admit(candidate)?,
            ProposalArg::RemoveMember(member) => self.expel(member)?,
            ProposalArg::ChangeRegistrationFee(fee) => {
                self.state
                    .set_value(REGISTRATION_FEE, Some(Value::from(*fee)));
            }
            ProposalArg::RewardChange(split) => {
                self.state.set_value(REWARD_SPLIT, Some(split.to_value()));
            }
            ProposalArg::DaoPayout {
                amount,
                to,
                contract,
            } => {
                Ledger::new(contract).transfer(
                    self.state,
                    &AccountId::new(DAO_TREASURY),
                    to,
                    *amount,
                )?;
            }
            ProposalArg::StampCostChange(stamp_cost) => {
                self.state
                    .set_value(STAMP_COST, Some(Value::from(*stamp_cost)));
            }
            ProposalArg::ChangeTypes(types) => {
                self.state
                    .set_value(VOTE_TYPES, Some(Value::from(types.clone())));
            }
            ProposalArg::Other { .. } => {}
        }

        log::info!(
            "Finalized proposal {} ({}) with {} yes, {} no",
            proposal.id,
            proposal.type_of_vote,
            proposal.yes,
            proposal.no
        );
        proposal.finalized = true;
        Ok(())
    }
}
