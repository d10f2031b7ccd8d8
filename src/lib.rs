//! Virtual-fitting API client
//!
//! This library wraps the REST API of the fashion recommendation and
//! virtual-fitting service: authenticated requests with session handling,
//! closet and profile management, and the fitting workflow that submits a
//! job, polls it to a terminal status and drives a cosmetic progress bar.

pub mod config;
pub mod models;
pub mod services;
pub mod session;

pub use config::ClientConfig;
pub use services::api::{ApiClient, ApiError};
pub use services::workflow::{FittingOutcome, FittingWorkflow, WorkflowState};
pub use session::Session;
