mod cascade;
mod catalog;
mod conflict;
mod error;
mod input;
mod lives;
mod locks;
mod scheduling;

pub use cascade::{CascadeService, SchoolCascade};
pub use catalog::CatalogService;
pub use conflict::{collides, first_conflict, has_conflict};
pub use error::{Entity, ErrorKind, ServiceError};
pub use input::{AgendaInput, LiveInput, MatchInput, SchoolInput, TeamInput};
pub use lives::LiveService;
pub use locks::LockTable;
pub use scheduling::SchedulingService;

use std::sync::Arc;

use tracing::warn;

use crate::auth::{AuthGate, Scheme};
use crate::store::ResourceStore;

/// Shared by every service: the injected store and gate, plus the write locks.
pub struct Context {
    store: Arc<dyn ResourceStore>,
    gate: Arc<dyn AuthGate>,
    locks: LockTable,
}

impl Context {
    pub fn new(store: Arc<dyn ResourceStore>, gate: Arc<dyn AuthGate>) -> Self {
        Self {
            store,
            gate,
            locks: LockTable::new(),
        }
    }

    /// Gate every mutation. Runs before any state is read.
    async fn authorize(&self, credential: Option<&str>) -> Result<(), ServiceError> {
        let result = self.gate.authorize(credential, Scheme::Bearer).await;
        if result.authorized {
            return Ok(());
        }
        warn!("rejected mutation: {}", result.reason);
        metrics::counter!(crate::observability::AUTH_FAILURES_TOTAL).increment(1);
        Err(ServiceError::Unauthorized(result.reason))
    }

    /// Whether a read should see drafts and scheduled entries.
    async fn privileged(&self, credential: Option<&str>) -> bool {
        credential.is_some() && self.gate.authorize(credential, Scheme::Bearer).await.authorized
    }
}

/// All services over one store, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub scheduling: SchedulingService,
    pub catalog: CatalogService,
    pub cascade: CascadeService,
    pub lives: LiveService,
}

impl Services {
    pub fn new(store: Arc<dyn ResourceStore>, gate: Arc<dyn AuthGate>) -> Self {
        let ctx = Arc::new(Context::new(store, gate));
        Self {
            scheduling: SchedulingService::new(ctx.clone()),
            catalog: CatalogService::new(ctx.clone()),
            cascade: CascadeService::new(ctx.clone()),
            lives: LiveService::new(ctx),
        }
    }
}
