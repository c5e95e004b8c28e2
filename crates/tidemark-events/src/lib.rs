//! # tidemark-events
//!
//! Decoding of catalog change notifications.
//!
//! A delivery is reduced to the [`EntityRef`](tidemark_catalog::EntityRef)
//! it names and the kind of change. Everything else the catalog sends is
//! either an expected no-op ([`DecodeError`]) or context for logging.
//!
//! ## Example
//!
//! ```rust,ignore
//! use tidemark_events::decode;
//!
//! match decode(&body) {
//!     Ok(event) => engine.reconcile(&event).await,
//!     Err(e) if e.is_expected_noop() => tracing::debug!(error = %e, "Ignoring delivery"),
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod decoder;
pub mod envelope;
pub mod error;
pub mod event;
pub mod signature;

pub use decoder::{decode, decode_value};
pub use envelope::{EntityPayload, RawEnvelope, ENTITY_NOTIFICATION_V2};
pub use error::DecodeError;
pub use event::{ChangeKind, DecodedEvent};
pub use signature::{verify_signing_secret, SIGNING_SECRET_HEADER};
