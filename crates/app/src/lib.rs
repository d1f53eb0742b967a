//! # lamella-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **port trait** that host adapters must implement
//!   (driven/outbound):
//!   - `ItemGateway` — read item state, post state updates, send
//!     shutter commands
//! - Provide the **use-cases** driving the domain:
//!   - `ExposureEngine` — evaluate sun exposure on each azimuth update
//!   - `RuleExecutor` — apply schedule rule actions to shutters
//!   - `Coordinator` — load configuration, swap contexts on reload
//!   - `RuleScheduler` — arm cron triggers, match host events, fire rules
//! - Parse and validate the two declarative configuration documents
//! - Provide **in-process infrastructure** (per-shutter locks) that
//!   doesn't need IO
//!
//! ## Dependency rule
//! Depends on `lamella-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

mod commands;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod exposure;
pub mod locks;
pub mod ports;
pub mod scheduler;
