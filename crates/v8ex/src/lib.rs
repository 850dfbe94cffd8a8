//! v8ex - Embedded JS-Engine Executor
//!
//! Embeds a JavaScript engine in a host application and exposes it as a
//! pluggable script executor. The interesting parts are the startup
//! acceleration policy and the idle-time maintenance path:
//!
//! 1. **Startup plans**: per process start, decide which serialized
//!    heap snapshot and which compiled-bytecode cache to load, under
//!    four caching modes with different validity, fallback, and
//!    write-back rules ([`resolve`] / [`ResolvedStartupPlan`]).
//!
//! 2. **Lifecycle**: one engine instance per executor, constructed
//!    atomically, torn down idempotently, with one bounded
//!    degrade-and-retry when the engine rejects its startup inputs
//!    ([`Executor`], [`ExecutorFactory`]).
//!
//! 3. **Idle maintenance**: low-priority engine callbacks throttled to
//!    the host main loop's idle signal ([`IdleMaintenanceCoordinator`],
//!    [`MainLoop`]).
//!
//! The native engine itself and the host platform are collaborators
//! behind the [`EngineBackend`] and [`HostEnv`] seams; [`SimEngine`]
//! provides an in-process engine for tests and demos.

mod config;
mod engine;
mod env;
mod error;
mod executor;
mod factory;
mod idle;
mod mainloop;
mod plan;
mod sim;

pub use config::{CodecacheMode, RuntimeConfig};
pub use engine::{init_process, EngineBackend, EngineInitError, EngineSession, EngineStartup};
pub use env::{asset_path, path_to_string, BuildFlags, DirHostEnv, HostEnv, ASSETS_SCHEME};
pub use error::ExecutorError;
pub use executor::{Executor, EXECUTOR_NAME};
pub use factory::{ExecutorFactory, EXECUTOR_IDENTITY, STUB_BUNDLE_NAME};
pub use idle::{IdleMaintenanceCoordinator, IDLE_THROTTLE};
pub use mainloop::{IdleHandler, IdleSource, MainLoop, RegistrationId};
pub use plan::{resolve, ResolvedStartupPlan, CODECACHE_BLOB_NAME, SNAPSHOT_BLOB_NAME};
pub use sim::{SimEngine, SimSession};
