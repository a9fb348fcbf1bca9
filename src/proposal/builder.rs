/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The hook through which an application customizes the transactions of its proposals.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use crate::types::{data_types::BlockHeight, transaction::Transaction};

/// Turns the transactions selected from the ready pool into the transactions to propose at `height`.
///
/// Implementations may reorder, filter, or add transactions. They are only called if
/// [`run_proposal_builder`](crate::config::Configuration::run_proposal_builder) is set.
pub trait ProposalBuilder: Send {
    fn build_proposal(
        &mut self,
        height: BlockHeight,
        txs: Vec<Arc<Transaction>>,
    ) -> Result<Vec<Arc<Transaction>>, ProposalBuilderError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalBuilderError(pub String);

impl Display for ProposalBuilderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
