//! Flutter-Rust bridge wrapper for jamaat-core.
//!
//! This crate serves as a thin wrapper that re-exports `jamaat-core` for
//! integration with the Flutter build system via Cargokit, plus the
//! opaque FFI types in [`api`].

pub mod api;
mod keystore;
mod notifications;

pub use jamaat_core::*;
