//! Core business logic for lookbook.

pub mod policy;
pub mod services;

pub use services::*;
