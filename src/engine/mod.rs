//! # Engine Module
//!
//! Internal runtime implementation.
//!
//! This module contains all core building blocks such as:
//! - Identities and the generational slot registry
//! - Category priorities and the priority-bucketed orderer
//! - Owning and observing handles
//! - Deferred commands and the step driver
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod types;
pub mod error;
pub mod config;
pub mod identity;
pub mod registry;
pub mod priority;
pub mod orderer;
pub mod commands;
pub mod handle;
pub mod object;
pub mod runtime;
