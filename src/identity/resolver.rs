/// Identity Record Resolver - fetches and normalizes id/ values from the naming backend
use crate::{
    backend::NameBackend,
    error::{KeyserverError, KeyserverResult},
    identity::{IdentityName, IdentityRecord},
};
use std::sync::Arc;
use tracing::debug;

/// Resolves id/ names to parsed records
#[derive(Clone)]
pub struct IdentityRecordResolver {
    backend: Arc<dyn NameBackend>,
}

impl IdentityRecordResolver {
    pub fn new(backend: Arc<dyn NameBackend>) -> Self {
        Self { backend }
    }

    /// Resolve a name to its current record
    ///
    /// Expired names are reported as not found; the backend still knows
    /// them but their value is no longer authoritative.
    pub async fn resolve(&self, name: &IdentityName) -> KeyserverResult<IdentityRecord> {
        let entry = self.backend.name_show(name).await?;

        if entry.expired {
            debug!("{} has expired at height {}", name, entry.height);
            return Err(KeyserverError::NotFound(format!("Name expired: {}", name)));
        }

        let record = IdentityRecord::from_value(name.clone(), entry.value, entry.height)?;
        debug!("Resolved {} at height {}", name, record.height);
        Ok(record)
    }

    /// Block time of the record's last update, when the backend can tell
    ///
    /// Failures are logged and swallowed; callers fall back to a placeholder.
    pub async fn record_time(&self, record: &IdentityRecord) -> Option<i64> {
        match self.backend.block_time(record.height).await {
            Ok(time) => time,
            Err(e) => {
                debug!("No block time for {} at {}: {}", record.name, record.height, e);
                None
            }
        }
    }
}
