/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions for the signed [`Transaction`] and its wire encoding.
//!
//! ## Wire format
//!
//! A transaction travels between the consensus engine and the application as the Borsh
//! serialization of a [`Transaction`]: a [`Payload`] followed by a 64-byte Ed25519 signature. The
//! signature covers the Borsh serialization of the payload alone.

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    basic::{AccountId, ChainID, CryptoHash, SignatureBytes, Stamps},
    crypto_primitives::{sha256, Signature, Signer, SigningKey, Verifier},
    value::Kwargs,
};

/// The signed part of a transaction.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Payload {
    pub sender: AccountId,
    pub nonce: u64,
    pub chain_id: ChainID,
    pub contract: String,
    pub function: String,
    pub kwargs: Kwargs,
    pub stamps_supplied: Stamps,
}

/// A decoded transaction. Immutable once decoded.
#[derive(Clone, Debug, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub payload: Payload,
    pub signature: SignatureBytes,
}

impl Transaction {
    /// Sign `payload` with `signing_key`.
    ///
    /// The caller is responsible for making sure that `payload.sender` is the account of
    /// `signing_key`; a mismatch produces a transaction that fails [`verify`](Self::verify).
    pub fn sign(payload: Payload, signing_key: &SigningKey) -> Transaction {
        let message = payload.try_to_vec().unwrap();
        let signature = SignatureBytes::new(signing_key.sign(&message).to_bytes());
        Transaction { payload, signature }
    }

    /// Decode a transaction from its wire encoding.
    pub fn decode(bytes: &[u8]) -> Result<Transaction, DecodeError> {
        Transaction::try_from_slice(bytes).map_err(DecodeError::Borsh)
    }

    /// Get the wire encoding of this transaction.
    pub fn encode(&self) -> Vec<u8> {
        self.try_to_vec().unwrap()
    }

    /// Check that `signature` is a valid signature over `payload` by the holder of the key named by
    /// `payload.sender`.
    pub fn verify(&self) -> bool {
        let Ok(verifying_key) = self.payload.sender.verifying_key() else {
            return false;
        };
        let Ok(message) = self.payload.try_to_vec() else {
            return false;
        };
        let signature = Signature::from_bytes(&self.signature.bytes());
        verifying_key.verify(&message, &signature).is_ok()
    }

    pub fn sender(&self) -> &AccountId {
        &self.payload.sender
    }

    pub fn nonce(&self) -> u64 {
        self.payload.nonce
    }

    /// Get the SHA256 hash of the wire encoding of this transaction.
    pub fn hash(&self) -> CryptoHash {
        sha256(&self.encode())
    }
}

/// Error when decoding a [`Transaction`] from bytes.
#[derive(Debug)]
pub enum DecodeError {
    Borsh(std::io::Error),
}
