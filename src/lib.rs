//! Capture WebAuthn credential ceremonies as inspectable log records.
//!
//! - [`intercept`] wraps a credentials surface and posts a record per call.
//! - [`serialize`] turns host values into storable JSON.
//! - [`relay`] validates posted messages and merges them into a [`storage`] log.
//! - [`inject`] decides when the interceptor goes into a page.
//! - [`viewer`] renders, exports, and clears the log.

pub mod cli;
pub mod config;
pub mod inject;
pub mod intercept;
pub mod model;
pub mod relay;
pub mod serialize;
pub mod storage;
pub mod viewer;
