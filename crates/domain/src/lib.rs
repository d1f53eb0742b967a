//! # lamella-domain
//!
//! Pure domain model for the lamella roller-shutter automation.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, item names
//! - Define **Sun geometry** (shade profiles, window exposure)
//! - Define **Shutter states** (automation mode, sunlit flag, commands)
//! - Define **Events** (host state changes and channel events)
//! - Define **Schedules** (rules, daily rule sets, the calendar)
//! - Contain all invariant enforcement and domain logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod event;
pub mod item;
pub mod schedule;
pub mod shutter;
pub mod sun;
