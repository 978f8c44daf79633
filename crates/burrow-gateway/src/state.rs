use std::sync::Arc;

use burrow_cache::ResponseCache;
use burrow_core::ConfigResolver;
use burrow_storage::ObjectStore;
use tokio_util::task::TaskTracker;
use typed_builder::TypedBuilder;

use crate::ShortenerProxy;

/// Shared, read-only state of every request handler.
#[derive(Clone, TypedBuilder)]
pub struct AppState {
    pub resolver: Arc<ConfigResolver>,
    pub store: Arc<dyn ObjectStore>,
    pub cache: Arc<dyn ResponseCache>,
    #[builder(default)]
    pub shortener: ShortenerProxy,
    /// Detached cache writes; drained on graceful shutdown.
    #[builder(default)]
    pub tasks: TaskTracker,
}
