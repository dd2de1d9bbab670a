//! Ledger client seam

use async_trait::async_trait;
use ledger_types::ObjectId;

use crate::{
    error::LedgerError,
    types::{Confirmation, RawObject, Receipt, SignedCall},
};

/// Submission, confirmation and object reads against a ledger
///
/// Implementations own any timeout policy; callers surface whatever outcome
/// they return.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a signed call for inclusion
    async fn submit(&self, call: SignedCall) -> Result<Receipt, LedgerError>;

    /// Wait until the call behind `receipt` is included
    async fn await_confirmation(&self, receipt: &Receipt) -> Result<Confirmation, LedgerError>;

    /// Fetch the current contents of an object (`None` if it does not exist)
    async fn fetch_object(&self, id: &ObjectId) -> Result<Option<RawObject>, LedgerError>;
}
