//! The cooperative scheduling unit the Loader drives (§4.10/§5): each
//! worker looks at its own pending task queue and decides whether it has
//! anything to run this round.

use async_trait::async_trait;

use crate::connection::TripleStoreConnection;
use crate::error::StoreError;

#[async_trait]
pub trait Worker: Send + Sync {
    /// Runs one round against `connection`, returning whether it produced
    /// any work. The Loader keeps iterating while any worker returns
    /// `true`.
    async fn run(&self, connection: &dyn TripleStoreConnection) -> Result<bool, StoreError>;

    fn name(&self) -> &'static str;
}
