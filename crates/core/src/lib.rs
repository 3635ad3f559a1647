//! Core types and shared functionality for stealth-fetch.
//!
//! This crate provides:
//! - Unified error types
//! - Configuration structures
//! - Browser impersonation targets
//! - Character truncation shared by every tool

pub mod config;
pub mod error;
pub mod impersonate;
pub mod truncate;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use impersonate::{BrowserFamily, DEFAULT_IMPERSONATE, Impersonate};
pub use truncate::truncate;
