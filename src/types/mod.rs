//! Types and traits that are used across multiple components of this crate.
//!
//! Other types, specific to single components, can be found in the "types" submodules of their
//! components, e.g., [`crate::vote_extension::types`].

pub mod crypto_primitives;

pub mod data_types;

pub mod transaction;
