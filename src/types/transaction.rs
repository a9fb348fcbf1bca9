/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Signed transactions, the messages they carry, and the codec used to put them into proposals.
//!
//! ## Messages
//!
//! The only message whose contents this crate interprets is the [`MsgBid`]. Messages belonging to any
//! other module are carried as [`OpaqueMessage`]s and are handed, uninterpreted, to the registered
//! [vote extension subscribers](crate::vote_extension::VoteExtensionSubscriber).
//!
//! ## Signatures
//!
//! A transaction carries zero or more [`TxSignature`]s. Each is an Ed25519 signature over the
//! [`sign_bytes`](Transaction::sign_bytes) of the transaction, i.e., the borsh encoding of its message
//! list. Only signatures that verify count towards a transaction's
//! [`verified_signers`](Transaction::verified_signers).

use std::fmt::{self, Display, Formatter};
use std::io;

use borsh::{BorshDeserialize, BorshSerialize};

use super::{
    crypto_primitives::{self, SigningKey, VerifyingKey},
    data_types::{SignatureBytes, SignerAddress, TxHash, VerifyingKeyBytes},
};

/// An amount of a single denomination.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Coin {
            denom: denom.into(),
            amount,
        }
    }
}

/// A bid in the name auction: `owner` offers `amount` for `name`, which should resolve to
/// `resolve_address` if the bid wins.
///
/// Two bids are considered the same bid by the [bid validator](crate::validation) iff their
/// [`canonical_bytes`](MsgBid::canonical_bytes) are equal.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct MsgBid {
    pub name: String,
    pub resolve_address: String,
    pub owner: String,
    pub amount: Vec<Coin>,
}

impl MsgBid {
    /// Get the deterministic field-by-field (borsh) serialization of this bid.
    ///
    /// This is the representation that is placed into vote extensions and special transactions, and
    /// the key that bids are counted under when validating proposals.
    pub fn canonical_bytes(&self) -> io::Result<Vec<u8>> {
        self.try_to_vec()
    }

    /// Deserialize a bid from its [`canonical_bytes`](MsgBid::canonical_bytes).
    pub fn from_canonical_bytes(bytes: &[u8]) -> io::Result<MsgBid> {
        MsgBid::try_from_slice(bytes)
    }
}

/// A message of some other module, carried without interpretation.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct OpaqueMessage {
    pub type_url: String,
    pub value: Vec<u8>,
}

/// A single instruction inside a [`Transaction`].
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum Message {
    Bid(MsgBid),
    Opaque(OpaqueMessage),
}

impl Message {
    /// Create an opaque message of type `type_url`.
    pub fn opaque(type_url: impl Into<String>, value: Vec<u8>) -> Message {
        Message::Opaque(OpaqueMessage {
            type_url: type_url.into(),
            value,
        })
    }
}

/// A signature over a transaction's [`sign_bytes`](Transaction::sign_bytes), together with the key
/// that supposedly produced it.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct TxSignature {
    pub verifying_key: VerifyingKeyBytes,
    pub signature: SignatureBytes,
}

/// A signer whose signature over a transaction has been verified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signer {
    pub address: SignerAddress,
    pub verifying_key: VerifyingKey,
}

/// An ordered list of [`Message`]s, plus the signatures of the accounts that authorized them.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    messages: Vec<Message>,
    signatures: Vec<TxSignature>,
}

impl Transaction {
    /// Create a transaction from already-computed parts. No signature is checked here.
    pub fn new(messages: Vec<Message>, signatures: Vec<TxSignature>) -> Transaction {
        Transaction {
            messages,
            signatures,
        }
    }

    /// Create a transaction containing `messages`, signed by every key in `signing_keys`, in order.
    pub fn sign(messages: Vec<Message>, signing_keys: &[&SigningKey]) -> io::Result<Transaction> {
        let sign_bytes = Self::sign_bytes_of(&messages)?;
        let signatures = signing_keys
            .iter()
            .map(|signing_key| TxSignature {
                verifying_key: signing_key.verifying_key().to_bytes(),
                signature: crypto_primitives::sign(signing_key, &sign_bytes),
            })
            .collect();

        Ok(Transaction {
            messages,
            signatures,
        })
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn signatures(&self) -> &[TxSignature] {
        &self.signatures
    }

    /// Iterate through the bids contained in this transaction, in message order.
    pub fn bids(&self) -> impl Iterator<Item = &MsgBid> {
        self.messages.iter().filter_map(|message| match message {
            Message::Bid(bid) => Some(bid),
            Message::Opaque(_) => None,
        })
    }

    /// Get the bytes that every signature of this transaction is over.
    pub fn sign_bytes(&self) -> io::Result<Vec<u8>> {
        Self::sign_bytes_of(&self.messages)
    }

    fn sign_bytes_of(messages: &[Message]) -> io::Result<Vec<u8>> {
        messages.try_to_vec()
    }

    /// Get the signers of this transaction whose signatures verify, in the order the signatures appear.
    ///
    /// Signatures with malformed verifying keys, or that do not verify against the transaction's
    /// [`sign_bytes`](Self::sign_bytes), are skipped.
    pub fn verified_signers(&self) -> Vec<Signer> {
        let Ok(sign_bytes) = self.sign_bytes() else {
            return Vec::new();
        };

        self.signatures
            .iter()
            .filter_map(|tx_signature| {
                let verifying_key = VerifyingKey::from_bytes(&tx_signature.verifying_key).ok()?;
                crypto_primitives::is_correct(&verifying_key, &sign_bytes, &tx_signature.signature)
                    .then(|| Signer {
                        address: SignerAddress::from_verifying_key(&verifying_key),
                        verifying_key,
                    })
            })
            .collect()
    }

    /// Compute the SHA256 hash of the canonical encoding of this transaction.
    pub fn hash(&self) -> io::Result<TxHash> {
        crypto_primitives::hash_of(self)
    }
}

/// Converts transactions to and from the bytes that are placed into block proposals.
///
/// [`BorshTxCodec`] is the default implementation. Applications that already have a wire format for
/// their transactions can plug it in by implementing this trait.
pub trait TxCodec: Send + Sync {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>, CodecError>;

    fn decode(&self, bytes: &[u8]) -> Result<Transaction, CodecError>;
}

/// A [`TxCodec`] that encodes transactions with borsh.
#[derive(Clone, Copy, Debug, Default)]
pub struct BorshTxCodec;

impl TxCodec for BorshTxCodec {
    fn encode(&self, tx: &Transaction) -> Result<Vec<u8>, CodecError> {
        tx.try_to_vec().map_err(CodecError::Encode)
    }

    fn decode(&self, bytes: &[u8]) -> Result<Transaction, CodecError> {
        Transaction::try_from_slice(bytes).map_err(CodecError::Decode)
    }
}

/// The ways encoding or decoding a transaction can fail.
#[derive(Debug)]
pub enum CodecError {
    Encode(io::Error),
    Decode(io::Error),
}

impl Display for CodecError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Encode(err) => write!(f, "failed to encode transaction: {}", err),
            CodecError::Decode(err) => write!(f, "failed to decode transaction: {}", err),
        }
    }
}
