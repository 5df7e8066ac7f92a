//! ritwrites Core - Shared domain types.
//!
//! This crate provides the types shared by every ritwrites component:
//! - `site` - Session coordination, stores and content services
//! - `cli` - Command-line tools for migrations and administration
//! - `integration-tests` - Scenario tests against in-memory stores
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access, no HTTP clients. Database encoding for the id newtypes is available
//! behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Ids, email, identity, profile, site settings, content and slugs

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
