/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Types that exist only to store bytes or numbers, and do not have any major "active" behavior.

use std::{
    fmt::{self, Debug, Display, Formatter},
    ops::Add,
    time::Duration,
};

use borsh::{BorshDeserialize, BorshSerialize};
use ed25519_dalek::{SignatureError, VerifyingKey};
use serde::Serialize;

/// Amount of a ledger's currency.
pub type Amount = u64;

/// Unit in which the cost of executing a transaction is measured.
pub type Stamps = u64;

/// String that uniquely identifies a blockchain.
///
/// Every node replicating the same chain must be configured with the same `ChainID`. Transactions
/// name the chain they are meant for, so that a transaction signed for one chain cannot be replayed
/// on another.
#[derive(Clone, PartialEq, Eq, Hash, Debug, BorshSerialize, BorshDeserialize, Serialize)]
pub struct ChainID(String);

impl ChainID {
    /// Create a new `ChainID` wrapping `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string of this `ChainID`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ChainID {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of an account on the chain.
///
/// Accounts that sign transactions are identified by the lowercase hex encoding of their Ed25519
/// verifying key. Accounts that only ever receive funds (e.g., escrow or treasury accounts) may use
/// any other string.
#[derive(
    Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, BorshSerialize, BorshDeserialize, Serialize,
)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new `AccountId` wrapping `id`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the `AccountId` of the holder of `verifying_key`.
    pub fn from_verifying_key(verifying_key: &VerifyingKey) -> Self {
        Self(hex::encode(verifying_key.to_bytes()))
    }

    /// Get the inner string of this `AccountId`.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Try to interpret this `AccountId` as the hex encoding of an Ed25519 verifying key.
    pub fn verifying_key(&self) -> Result<VerifyingKey, SignatureError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&self.0, &mut bytes).map_err(|_| SignatureError::new())?;
        VerifyingKey::from_bytes(&bytes)
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        AccountId::new(id)
    }
}

/// Height of a block in the chain. The first block delivered after genesis has height 1.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, BorshSerialize, BorshDeserialize,
)]
pub struct BlockHeight(u64);

impl BlockHeight {
    /// Create a new `BlockHeight` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `BlockHeight`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for BlockHeight {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Add<u64> for BlockHeight {
    type Output = BlockHeight;
    fn add(self, rhs: u64) -> Self::Output {
        BlockHeight::new(self.0 + rhs)
    }
}

/// Block time, in nanoseconds since the Unix Epoch.
///
/// Every time-bounded rule of the chain (proposal expiry, leave cooldown) is evaluated against the
/// block time agreed on by consensus, never against the local clock.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default, BorshSerialize, BorshDeserialize,
)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Create a new `Timestamp` from a number of nanoseconds since the Unix Epoch.
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Get the number of nanoseconds since the Unix Epoch.
    pub const fn nanos(&self) -> u64 {
        self.0
    }

    /// Get how much time passed between `earlier` and this timestamp. Saturates to zero if `earlier`
    /// is actually later.
    pub fn duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;
    fn add(self, rhs: Duration) -> Self::Output {
        Timestamp(self.0.saturating_add(rhs.as_nanos().min(u64::MAX as u128) as u64))
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// 32-byte cryptographic hash. Within this crate, always produced by SHA256.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, BorshSerialize, BorshDeserialize)]
pub struct CryptoHash([u8; 32]);

impl CryptoHash {
    /// Create a new `CryptoHash` wrapping `bytes`.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 32]` value of this `CryptoHash`.
    pub const fn bytes(&self) -> [u8; 32] {
        self.0
    }

    /// Get the lowercase hex encoding of this hash.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl AsRef<[u8]> for CryptoHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Debug for CryptoHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "CryptoHash({})", self.to_hex())
    }
}

/// Ed25519 digital signature over a transaction's payload.
#[derive(Clone, Copy, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignatureBytes([u8; 64]);

impl SignatureBytes {
    /// Create a new `SignatureBytes` wrapping `bytes`.
    pub const fn new(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the inner `[u8; 64]` value of this `SignatureBytes`.
    pub const fn bytes(&self) -> [u8; 64] {
        self.0
    }
}

impl Debug for SignatureBytes {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "SignatureBytes({})", hex::encode(self.0))
    }
}

/// Chain-assigned number of a governance proposal. The first proposal gets id 1.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct ProposalId(u64);

impl ProposalId {
    /// Create a new `ProposalId` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `ProposalId`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}

impl Display for ProposalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Weight of a validator's votes in the consensus engine. A power of 0 in a validator update removes
/// the validator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, BorshSerialize, BorshDeserialize, Serialize)]
pub struct Power(u64);

impl Power {
    /// Create a new `Power` with an `int` inner value.
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    /// Get the inner `u64` value of this `Power`.
    pub const fn int(&self) -> u64 {
        self.0
    }
}
