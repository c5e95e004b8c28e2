//! tidemark handler
//!
//! Receives catalog change notifications over HTTP and reconciles each one
//! with the configured policy. Also hosts the operator commands for
//! replaying a stored delivery, deploying custom metadata definitions,
//! recording quality results, starring glossary terms and reporting verified
//! upstream sources.

pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod routes;
