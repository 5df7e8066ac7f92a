//! ritwrites site library.
//!
//! Keeps the client session (identity, profile, site settings) consistent
//! with the hosted auth service and the site database, and provides the
//! content services the site's pages call into.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod identity;
pub mod memory;
pub mod services;
pub mod session;
pub mod state;
pub mod store;
