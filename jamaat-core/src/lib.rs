//! Jamaat Core Library
//!
//! Core functionality for Jamaat - find and join congregational prayers
//! near you. This crate provides the Rust implementation behind the
//! Flutter app: prayer times, the nearby session feed, auth, and the
//! offline action queue.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![deny(unsafe_code)]

mod api;
pub mod auth;
pub mod backend;
pub mod clock;
pub mod config;
pub mod error;
pub mod location;
pub mod logging;
pub mod offline;
pub mod platform;
pub mod prayer;
pub mod session;
pub mod storage;
pub mod university;
pub mod validation;

pub use api::{JamaatCore, MutationOutcome, DATABASE_FILE};
pub use config::CoreConfig;
pub use error::{CoreError, CoreResult, ErrorKind};
