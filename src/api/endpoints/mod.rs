//! API endpoint handlers.
//!
//! Each module corresponds to one feature. Handlers stay thin and call
//! into the pipeline, auth and upload modules.

pub mod auth;
pub mod conditions;
pub mod dashboard;
pub mod diagnosis;
pub mod health;
pub mod home;
pub mod reports;
