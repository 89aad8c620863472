/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Member lifecycle: registration, withdrawal, leave announcement and leave.

use crate::{
    ledger::Ledger,
    state::{
        app_state::KVSet,
        pluggables::{KVGet, KVGetError, Key},
        variables::{member_key, MEMBER_NODES},
    },
    types::{
        basic::{AccountId, Amount, Timestamp},
        value::Value,
    },
};

use super::{
    types::{MemberRecord, MemberStatus},
    Governance, GovernanceError, ESCROW_ACCOUNT,
};

/// Get the active members, in the order they joined.
pub fn active_members<S: KVGet + ?Sized>(state: &S) -> Result<Vec<AccountId>, KVGetError> {
    let malformed = || KVGetError::MalformedValue {
        key: Key::AppState {
            key: MEMBER_NODES.to_string(),
        },
    };
    match state.value(MEMBER_NODES)? {
        None => Ok(Vec::new()),
        Some(nodes) => nodes
            .as_list()
            .ok_or_else(malformed)?
            .iter()
            .map(|node| node.as_str().map(AccountId::new).ok_or_else(malformed))
            .collect(),
    }
}

/// Get the governance record of `account`. Accounts without a stored record are unregistered.
pub fn member_record<S: KVGet + ?Sized>(
    state: &S,
    account: &AccountId,
) -> Result<MemberRecord, KVGetError> {
    let key = member_key(account);
    match state.value(&key)? {
        None => Ok(MemberRecord::unregistered()),
        Some(value) => MemberRecord::from_value(&value).ok_or(KVGetError::MalformedValue {
            key: Key::AppState { key },
        }),
    }
}

fn put_active_members<S: KVSet + ?Sized>(state: &mut S, members: &[AccountId]) {
    let nodes = members.iter().map(|m| Value::from(m.as_str())).collect();
    state.set_value(MEMBER_NODES, Some(Value::List(nodes)));
}

fn put_member_record<S: KVSet + ?Sized>(state: &mut S, account: &AccountId, record: &MemberRecord) {
    let value = match record.status {
        MemberStatus::Unregistered => None,
        _ => Some(record.to_value()),
    };
    state.set_value(&member_key(account), value);
}

/// Make `members` the initial active members. Genesis members hold no deposit.
pub(crate) fn seed_members<S: KVSet + ?Sized>(state: &mut S, members: &[AccountId]) {
    put_active_members(state, members);
    for member in members {
        let record = MemberRecord {
            status: MemberStatus::Active,
            deposit: 0,
            announced_at: None,
        };
        put_member_record(state, member, &record);
    }
}

impl<'s, S: KVSet + ?Sized> Governance<'s, S> {
    /// Register `sender` as a member candidate, locking the current registration fee in escrow.
    pub fn register(&mut self, sender: &AccountId) -> Result<MemberRecord, GovernanceError> {
        let record = member_record(&*self.state, sender)?;
        if record.status != MemberStatus::Unregistered {
            return Err(GovernanceError::AlreadyRegistered);
        }

        let fee = self.state.registration_fee()?;
        Ledger::native().transfer(self.state, sender, &AccountId::new(ESCROW_ACCOUNT), fee)?;

        let record = MemberRecord {
            status: MemberStatus::PendingRegistration,
            deposit: fee,
            announced_at: None,
        };
        put_member_record(self.state, sender, &record);
        Ok(record)
    }

    /// Withdraw the pending registration of `sender`, refunding its deposit.
    pub fn unregister(&mut self, sender: &AccountId) -> Result<MemberRecord, GovernanceError> {
        let record = member_record(&*self.state, sender)?;
        if record.status != MemberStatus::PendingRegistration {
            return Err(GovernanceError::NotPendingRegistration);
        }

        self.refund(sender, record.deposit)?;
        let record = MemberRecord::unregistered();
        put_member_record(self.state, sender, &record);
        Ok(record)
    }

    /// Announce that active member `sender` will leave. Starts the leave cooldown at `now`.
    pub fn announce_leave(
        &mut self,
        sender: &AccountId,
        now: Timestamp,
    ) -> Result<MemberRecord, GovernanceError> {
        let mut record = member_record(&*self.state, sender)?;
        if record.status != MemberStatus::Active {
            return Err(GovernanceError::NotActive);
        }

        record.status = MemberStatus::PendingLeave;
        record.announced_at = Some(now);
        put_member_record(self.state, sender, &record);
        Ok(record)
    }

    /// Leave the member set, once the leave cooldown has elapsed since the announcement.
    pub fn leave(
        &mut self,
        sender: &AccountId,
        now: Timestamp,
    ) -> Result<MemberRecord, GovernanceError> {
        let record = member_record(&*self.state, sender)?;
        if record.status != MemberStatus::PendingLeave {
            return Err(GovernanceError::NotPendingLeave);
        }
        let announced_at = record.announced_at.unwrap_or_default();
        if now.duration_since(announced_at) < self.config.leave_cooldown {
            return Err(GovernanceError::CooldownNotElapsed);
        }

        self.remove_from_member_set(sender, record.deposit)
    }

    /// Effect of a finalized `add_member` proposal.
    pub(crate) fn admit(&mut self, candidate: &AccountId) -> Result<(), GovernanceError> {
        let mut record = member_record(&*self.state, candidate)?;
        if record.status != MemberStatus::PendingRegistration {
            return Err(GovernanceError::NotPendingRegistration);
        }

        let mut members = active_members(&*self.state)?;
        members.push(candidate.clone());
        put_active_members(self.state, &members);

        record.status = MemberStatus::Active;
        put_member_record(self.state, candidate, &record);
        Ok(())
    }

    /// Effect of a finalized `remove_member` proposal. Bypasses the leave cooldown.
    pub(crate) fn expel(&mut self, member: &AccountId) -> Result<(), GovernanceError> {
        let record = member_record(&*self.state, member)?;
        if !matches!(
            record.status,
            MemberStatus::Active | MemberStatus::PendingLeave
        ) {
            return Err(GovernanceError::NotActive);
        }

        self.remove_from_member_set(member, record.deposit)?;
        Ok(())
    }

    fn remove_from_member_set(
        &mut self,
        member: &AccountId,
        deposit: Amount,
    ) -> Result<MemberRecord, GovernanceError> {
        let mut members = active_members(&*self.state)?;
        members.retain(|m| m != member);
        if members.is_empty() {
            return Err(GovernanceError::LastMember);
        }
        put_active_members(self.state, &members);

        self.refund(member, deposit)?;
        let record = MemberRecord::unregistered();
        put_member_record(self.state, member, &record);
        Ok(record)
    }

    fn refund(&mut self, account: &AccountId, deposit: Amount) -> Result<(), GovernanceError> {
        Ledger::native().transfer(self.state, &AccountId::new(ESCROW_ACCOUNT), account, deposit)?;
        Ok(())
    }
}
