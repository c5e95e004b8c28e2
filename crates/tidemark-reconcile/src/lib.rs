//! # Event-Driven Reconciliation
//!
//! Keeps catalog entities in line with business rules as change
//! notifications arrive.
//!
//! ## Overview
//!
//! - [`ReconcileEngine`] runs one [`Policy`] against each decoded event:
//!   prerequisite checks, fetch of the current state, change computation,
//!   change detection and a minimal merge write-back
//! - [`SchemaProvisioner`] creates the custom metadata a policy writes the
//!   first time it is needed, tolerating concurrent creators
//! - [`ReconcileContext`] holds the gateway, provisioner and settings,
//!   built once per process
//! - [`policies`] bundles a certification enforcer and a completeness scorer
//! - [`annotate`], [`stars`] and [`sources`] serve the operator commands
//!   that act on the catalog outside the event flow
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use tidemark_reconcile::{policies::VerificationEnforcer, ReconcileConfig, ReconcileContext, ReconcileEngine};
//!
//! let ctx = Arc::new(ReconcileContext::new(gateway, ReconcileConfig::from_env()?));
//! let engine = ReconcileEngine::new(ctx, Arc::new(VerificationEnforcer::new()));
//!
//! let outcome = engine.reconcile_raw(&body).await;
//! ```

pub mod annotate;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod outcome;
pub mod policies;
pub mod policy;
pub mod provisioner;
pub mod schemas;
pub mod sources;
pub mod stars;

pub use annotate::{annotate_quality, find_asset, QualityReport};
pub use config::ReconcileConfig;
pub use context::{PolicyContext, ReconcileContext};
pub use engine::ReconcileEngine;
pub use error::{ReconcileError, ReconcileResult};
pub use outcome::{NoOpReason, OutcomeSummary, ReconciliationOutcome, UpdatedEntity};
pub use policy::Policy;
pub use provisioner::SchemaProvisioner;
pub use sources::{verified_sources_by_type, verified_upstream_sources, SourceReport};
pub use stars::{star_glossary_terms, StarSummary};
