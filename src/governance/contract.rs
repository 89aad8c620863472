/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Entry point of transactions calling the governance contract.
//!
//! |Function|Keyword arguments|Result|
//! |---|---|---|
//! |`register`|none|The caller's member record.|
//! |`unregister`|none|The caller's member record.|
//! |`announce_leave`|none|The caller's member record.|
//! |`leave`|none|The caller's member record.|
//! |`propose_vote`|`type_of_vote: str`, `arg: any`|The new proposal.|
//! |`vote`|`proposal_id: int`, `vote: "yes" \| "no" \| bool`|The updated proposal.|

use crate::{
    state::app_state::KVSet,
    types::{
        basic::{AccountId, ProposalId, Timestamp},
        value::{Kwargs, Value},
    },
};

use super::{types::Ballot, Governance, GovernanceError};

impl<'s, S: KVSet + ?Sized> Governance<'s, S> {
    /// Run `function` of the governance contract on behalf of `sender`, at block time `now`.
    pub fn call(
        &mut self,
        sender: &AccountId,
        function: &str,
        kwargs: &Kwargs,
        now: Timestamp,
    ) -> Result<Value, GovernanceError> {
        match function {
            "register" => Ok(self.register(sender)?.to_value()),
            "unregister" => Ok(self.unregister(sender)?.to_value()),
            "announce_leave" => Ok(self.announce_leave(sender, now)?.to_value()),
            "leave" => Ok(self.leave(sender, now)?.to_value()),
            "propose_vote" => {
                let type_of_vote_value = required(kwargs, "type_of_vote")?;
                let type_of_vote = type_of_vote_value.as_str().ok_or_else(|| {
                    GovernanceError::InvalidVoteType {
                        type_of_vote: type_of_vote_value.to_string(),
                    }
                })?;
                let arg = kwargs.get("arg").unwrap_or(&Value::Null);
                Ok(self.propose_vote(sender, type_of_vote, arg, now)?.to_value())
            }
            "vote" => {
                let proposal_id = required(kwargs, "proposal_id")?.as_u64().ok_or(
                    GovernanceError::MissingArgument {
                        name: "proposal_id",
                    },
                )?;
                let ballot = Ballot::from_value(required(kwargs, "vote")?)
                    .ok_or(GovernanceError::InvalidBallot)?;
                Ok(self
                    .vote(sender, ProposalId::new(proposal_id), ballot, now)?
                    .to_value())
            }
            other => Err(GovernanceError::UnknownFunction {
                function: other.to_string(),
            }),
        }
    }
}

fn required<'k>(kwargs: &'k Kwargs, name: &'static str) -> Result<&'k Value, GovernanceError> {
    kwargs
        .get(name)
        .ok_or(GovernanceError::MissingArgument { name })
}
