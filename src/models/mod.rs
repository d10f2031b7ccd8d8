//! Wire models for the fitting API.
//!
//! Field names follow the backend's camelCase JSON; Rust names stay snake_case.

pub mod closet;
pub mod envelope;
pub mod job;
pub mod outfit;
pub mod user;
