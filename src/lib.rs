//! HR Onboarding — lifecycle engine and REST service.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
