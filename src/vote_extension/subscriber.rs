/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The pluggable trait through which other modules contribute to, and verify, vote extensions.

use super::types::{ExtendRequest, SubscriberError, VerifyStatus};

/// Methods that a module implements to attach opaque data to this validator's vote extensions and to
/// verify the data that other validators attached.
///
/// Subscribers are registered under a key with
/// [`VoteExtensionHandler::register_subscriber`](super::VoteExtensionHandler::register_subscriber). The
/// bytes returned by [`extend`](Self::extend) are placed in the vote extension's `extra_info` under that
/// key, and the same bytes are later passed to [`verify`](Self::verify) on every validator that
/// receives the vote extension.
///
/// Both methods take `&self`: subscribers that keep state across calls must use interior mutability.
pub trait VoteExtensionSubscriber: Send + Sync {
    /// Called once for every non-bid message drained from the pending pool.
    fn extend(&self, request: &ExtendRequest) -> Result<Vec<u8>, SubscriberError>;

    /// Called with the bytes that a peer's vote extension carries under this subscriber's key.
    fn verify(&self, payload: &[u8]) -> Result<VerifyStatus, SubscriberError>;
}

/// A [`VoteExtensionSubscriber`] made out of two closures.
pub struct FnSubscriber<E, V> {
    extend_fn: E,
    verify_fn: V,
}

impl<E, V> FnSubscriber<E, V>
where
    E: Fn(&ExtendRequest) -> Result<Vec<u8>, SubscriberError> + Send + Sync,
    V: Fn(&[u8]) -> Result<VerifyStatus, SubscriberError> + Send + Sync,
{
    pub fn new(extend_fn: E, verify_fn: V) -> Self {
        FnSubscriber {
            extend_fn,
            verify_fn,
        }
    }
}

impl<E, V> VoteExtensionSubscriber for FnSubscriber<E, V>
where
    E: Fn(&ExtendRequest) -> Result<Vec<u8>, SubscriberError> + Send + Sync,
    V: Fn(&[u8]) -> Result<VerifyStatus, SubscriberError> + Send + Sync,
{
    fn extend(&self, request: &ExtendRequest) -> Result<Vec<u8>, SubscriberError> {
        (self.extend_fn)(request)
    }

    fn verify(&self, payload: &[u8]) -> Result<VerifyStatus, SubscriberError> {
        (self.verify_fn)(payload)
    }
}
