//! # crux_core
//!
//! Core domain logic for the Crux backend: token codec, password hashing,
//! server-side sessions and the storage seams they run on.

pub mod auth;
pub mod migrate;
pub mod models;
