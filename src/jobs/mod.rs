use crate::identity::FingerprintCache;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<crate::context::AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<crate::context::AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) -> Vec<JoinHandle<()>> {
        info!("Starting background job scheduler");

        let sweep_every = Duration::from_secs(self.context.config.cache.sweep_interval_secs.max(1));
        let handles = vec![tokio::spawn(cache_sweep_job(
            self.context.cache.clone(),
            sweep_every,
        ))];

        info!("Background jobs started");
        handles
    }
}

/// Drop expired fingerprint cache entries
async fn cache_sweep_job(cache: Arc<FingerprintCache>, every: Duration) {
    let mut interval = interval(every);

    loop {
        interval.tick().await;

        let purged = cache.purge_expired();
        if purged > 0 {
            info!("Swept {} expired fingerprint cache entries", purged);
        } else {
            debug!("Fingerprint cache sweep: nothing expired");
        }
    }
}
