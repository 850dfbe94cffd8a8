//! Executor lifecycle.
//!
//! One [`Executor`] owns exactly one engine instance end-to-end:
//! `Active` from successful construction until [`Executor::teardown`],
//! `Destroyed` afterwards, with no resurrection. Teardown is idempotent
//! and never blocks on pending idle callbacks; a callback already in
//! flight observes the dropped session handle and no-ops.

use crate::config::RuntimeConfig;
use crate::engine::{EngineBackend, EngineInitError, EngineSession, EngineStartup};
use crate::idle::IdleMaintenanceCoordinator;
use crate::mainloop::{IdleSource, RegistrationId};
use crate::plan::ResolvedStartupPlan;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

/// Host-visible executor name.
pub const EXECUTOR_NAME: &str = "V8Executor";

struct IdleRegistration {
    source: Arc<dyn IdleSource>,
    id: RegistrationId,
}

/// One engine instance plus its idle-loop attachment.
pub struct Executor {
    /// `Some` while active. This is the only strong reference on the
    /// lifecycle path; taking it is the Active → Destroyed transition.
    session: Option<Arc<dyn EngineSession>>,
    registration: Option<IdleRegistration>,
}

impl Executor {
    /// Construct the engine instance from resolved startup inputs.
    ///
    /// Construction is atomic: it either yields an active executor or
    /// fails with the backend's [`EngineInitError`] and nothing to
    /// release.
    pub fn start(
        backend: &dyn EngineBackend,
        config: &RuntimeConfig,
        plan: &ResolvedStartupPlan,
    ) -> Result<Self, EngineInitError> {
        let startup = EngineStartup::new(config, plan);
        let session = backend.init(&startup)?;
        info!(
            mode = ?plan.codecache_mode,
            snapshot = plan.has_snapshot(),
            codecache = plan.has_codecache(),
            "executor active"
        );
        Ok(Self {
            session: Some(session),
            registration: None,
        })
    }

    pub fn name(&self) -> &'static str {
        EXECUTOR_NAME
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Weak handle to the engine session, for maintenance plumbing.
    /// `None` once destroyed.
    pub fn session_handle(&self) -> Option<Weak<dyn EngineSession>> {
        self.session.as_ref().map(Arc::downgrade)
    }

    /// Register a maintenance coordinator for this instance on the host
    /// loop. At most one attachment per executor; repeat calls are
    /// no-ops, as are calls after teardown.
    pub fn attach_idle(&mut self, source: Arc<dyn IdleSource>) {
        if self.registration.is_some() {
            return;
        }
        let Some(handle) = self.session_handle() else {
            return;
        };
        let coordinator = IdleMaintenanceCoordinator::new(handle);
        let id = source.add_handler(Box::new(coordinator));
        self.registration = Some(IdleRegistration { source, id });
    }

    /// Release the engine instance. Idempotent: the second and later
    /// calls do nothing.
    ///
    /// Deregistration from the host loop is synchronous and precedes
    /// the session release, so no new idle delivery can begin after
    /// this returns.
    pub fn teardown(&mut self) {
        if let Some(registration) = self.registration.take() {
            registration.source.remove_handler(registration.id);
        }
        if let Some(session) = self.session.take() {
            session.shutdown();
            info!("executor destroyed");
        } else {
            debug!("teardown on already-destroyed executor ignored");
        }
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        self.teardown();
    }
}
