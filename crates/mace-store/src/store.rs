use async_trait::async_trait;
use mace_models::signal_schema::{SignalQuery, SignalRow};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;

/// Read access to persisted agent signals. Mockable for testing.
///
/// Implementations return at most `query.limit` rows for the agent/market
/// pair, newest first. The cancellation token is cancelled once the caller
/// stops waiting; implementations should stop work they have not started yet.
#[async_trait]
pub trait SignalStore: Send + Sync {
    async fn recent_signals(
        &self,
        query: &SignalQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<SignalRow>, StoreError>;
}
