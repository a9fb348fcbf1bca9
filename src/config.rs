/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! User-defined parameters of the proposal and vote extension handlers.
//!
//! The configuration is built using the builder pattern. Every parameter has a default, so the
//! following builds the default configuration:
//!
//! ```
//! use threshold_proposer::config::Configuration;
//! use threshold_proposer::types::data_types::BlockHeight;
//!
//! let configuration = Configuration::builder()
//!     .special_tx_min_height(BlockHeight::new(3))
//!     .run_proposal_builder(false)
//!     .reject_malformed_special_tx(false)
//!     .log_events(true)
//!     .build();
//! ```
//!
//! ## Special transaction height
//!
//! Vote extensions produced at height `h` are only available to the proposer of height `h + 1`, and the
//! first heights of a chain have no vote extension round before them. Proposals at heights below
//! `special_tx_min_height` therefore never carry a special transaction.
//!
//! ## Malformed special transactions
//!
//! By default, a proposal whose first transaction cannot be decoded as a special transaction is
//! accepted, favouring liveness. Setting `reject_malformed_special_tx` rejects such proposals at heights
//! where a special transaction is always expected (`height >= special_tx_min_height`).

use typed_builder::TypedBuilder;

use crate::types::data_types::BlockHeight;

/// Parameters shared by the [proposal handlers](crate::proposal) and the
/// [app](crate::app::ThresholdAppSpec).
#[derive(Clone, Debug, TypedBuilder)]
pub struct Configuration {
    #[builder(
        default = BlockHeight::new(3),
        setter(
            doc = "Set the lowest height whose proposal carries a special transaction. Default: 3."
        )
    )]
    pub special_tx_min_height: BlockHeight,
    #[builder(
        default = false,
        setter(
            doc = "Pass ready transactions through the configured proposal builder? Default: false."
        )
    )]
    pub run_proposal_builder: bool,
    #[builder(
        default = false,
        setter(
            doc = "Reject proposals whose expected special transaction is malformed? Default: false."
        )
    )]
    pub reject_malformed_special_tx: bool,
    #[builder(
        default,
        setter(
            strip_option,
            doc = "Set the maximum total size, in bytes, of the transactions in a proposal. Default: unlimited."
        )
    )]
    pub max_tx_bytes: Option<u64>,
    #[builder(default = true, setter(doc = "Enable logging of events? Default: true."))]
    pub log_events: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
