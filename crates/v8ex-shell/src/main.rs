//! v8ex-shell: demo harness for the embedded JS-engine executor.
//!
//! Builds a host environment rooted in local directories, creates an
//! executor through the factory, drives the host main loop through a
//! few idle cycles, and tears everything down. Pass a JSON config file
//! path to override the default runtime configuration.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;
use v8ex::{
    BuildFlags, DirHostEnv, ExecutorFactory, MainLoop, RuntimeConfig, SimEngine,
};

fn main() -> Result<()> {
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::DEBUG)
        .with_target(false)
        .compact()
        .init();

    info!("v8ex-shell starting");

    let root = PathBuf::from(
        std::env::var("V8EX_SHELL_DIR").unwrap_or_else(|_| "/tmp/v8ex-shell".to_string()),
    );
    let env = Arc::new(DirHostEnv::new(
        root.join("assets"),
        root.join("code_cache"),
        "arm64-v8a",
        BuildFlags::default(),
    ));

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {path}"))?;
            serde_json::from_str::<RuntimeConfig>(&raw)
                .with_context(|| format!("parsing config file {path}"))?
        }
        None => RuntimeConfig::create_default(&*env),
    };
    info!(mode = ?config.codecache_mode, timezone = %config.timezone_id, "runtime config loaded");

    let backend = Arc::new(SimEngine::new(env.clone()));
    let main_loop = Arc::new(MainLoop::new());
    let factory = ExecutorFactory::new(config, env, backend, main_loop.clone());
    info!(identity = %factory, "executor factory ready");

    if let Some(name) = factory.bundle_asset_name(false) {
        info!(bundle = %name, "warm cache found; stub bundle substituted");
    }

    let mut executor = factory.create().context("creating executor")?;
    info!(name = executor.name(), "executor created");

    // Three idle sweeps across the throttle window: the first and the
    // last forward a maintenance signal, the middle one is throttled.
    main_loop.idle();
    thread::sleep(Duration::from_millis(200));
    main_loop.idle();
    thread::sleep(Duration::from_millis(900));
    main_loop.idle();

    executor.teardown();
    info!("v8ex-shell shutting down");
    Ok(())
}
