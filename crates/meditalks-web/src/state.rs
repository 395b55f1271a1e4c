use std::time::Duration;

use meditalks_core::Pipeline;
use tokio_util::sync::CancellationToken;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pipeline: Pipeline,
    /// Cancelled on shutdown; each request runs under a child token.
    pub shutdown: CancellationToken,
    /// Timeout for each backend health check in `/api/health`.
    pub health_timeout: Duration,
}
