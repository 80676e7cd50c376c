//! # Meal Planner Common Library
//!
//! Shared code for the meal planner service and its admin tool:
//! - Database schema initialization and shared models
//! - Calendar and ISO week utilities
//! - Session token signing and password hashing
//! - Configuration loading
//! - Common error type

pub mod calendar;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod password;
pub mod session;
pub mod time;

pub use error::{Error, Result};
