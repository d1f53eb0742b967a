//! # lamellad — shutter automation daemon
//!
//! Composition root that wires the host gateway, the coordinator and the
//! scheduler together and runs them until shutdown.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize tracing
//! - Construct the host gateway and register every referenced item
//! - Load the automation documents and spawn coordinator and scheduler
//! - Watch the documents for edits and request reloads
//! - Handle graceful shutdown (SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;
mod watcher;

use std::collections::BTreeSet;
use std::sync::Arc;

use anyhow::Context;
use lamella_adapter_memory::MemoryHost;
use lamella_app::config::{DocumentPaths, ScheduleDocument, ShutterDocument};
use lamella_app::coordinator::Coordinator;
use lamella_app::locks::ShutterLocks;
use lamella_app::ports::item_gateway::ItemGateway;
use lamella_app::scheduler::RuleScheduler;
use lamella_domain::schedule::Trigger;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Host gateway
    let host = MemoryHost::new();
    let paths = config.document_paths();
    register_items(&host, &paths)
        .await
        .context("register host items")?;

    // Coordinator
    let locks = Arc::new(ShutterLocks::new());
    let (coordinator, ctx_rx) = Coordinator::load(host.clone(), Arc::clone(&locks), paths.clone())
        .await
        .context("load automation documents")?;
    let (reload_tx, reload_rx) = mpsc::channel(8);

    // Scheduler
    let scheduler = RuleScheduler::new(
        host.clone(),
        locks,
        ctx_rx,
        host.subscribe(),
        reload_tx.clone(),
    );

    // Watcher
    let _watcher = if config.watcher.enabled {
        Some(
            watcher::spawn(&paths, config.debounce(), reload_tx.clone())
                .context("start document watcher")?,
        )
    } else {
        None
    };
    drop(reload_tx);

    let coordinator_task = tokio::spawn(coordinator.run(reload_rx));
    let scheduler_task = tokio::spawn(scheduler.run());
    info!("lamellad running");

    tokio::signal::ctrl_c()
        .await
        .context("listen for shutdown signal")?;
    info!("shutting down");
    scheduler_task.abort();
    coordinator_task.abort();

    Ok(())
}

/// Seed the host registry with every item the documents reference.
///
/// The coordinator parses the same documents again when it loads; this
/// pass only exists so the items are registered before state seeding and
/// commands have somewhere to go. The weather and master switches start
/// `ON` so a fresh install is live immediately.
async fn register_items(host: &MemoryHost, paths: &DocumentPaths) -> anyhow::Result<()> {
    let shutters = ShutterDocument::load(&paths.shutters)?;
    let schedule = ScheduleDocument::load(&paths.schedule)?.build()?;
    let catalog = shutters.build_catalog()?;

    host.register_item(shutters.items.azimuth.clone());
    host.register_item(shutters.items.elevation.clone());
    host.register_item(shutters.items.weather_sunny.clone());
    host.register_item(shutters.items.shutter_automation.clone());
    host.post_update(&shutters.items.weather_sunny, "ON").await?;
    host.post_update(&shutters.items.shutter_automation, "ON")
        .await?;

    let mut ids: BTreeSet<_> = catalog.shutters().cloned().collect();
    for rule in schedule.rules.values() {
        ids.extend(rule.shutters.iter().cloned());
        for condition in &rule.conditions {
            host.register_item(condition.item().clone());
        }
        for trigger in &rule.triggers {
            if let Trigger::ItemChanged { item } = trigger {
                host.register_item(item.clone());
            }
        }
    }
    for shutter in ids {
        host.register_item(shutter.device_item());
        host.register_item(shutter.auto_state_item());
        host.register_item(shutter.sunlit_state_item());
    }

    Ok(())
}
