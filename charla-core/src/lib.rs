//! Core types and traits for charla
//!
//! This crate provides the error type, configuration, logging setup and
//! the session/auth state shared by the other charla components.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use auth::{Session, SessionManager};
pub use error::{Error, Result};
