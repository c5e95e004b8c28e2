//! Metadata catalog gateway
//!
//! Typed access to the entity store that the reconciliation engine reads
//! from and writes to:
//!
//! - [`EntitySnapshot`] and [`Projection`] for reading the attributes a
//!   policy needs, nothing more
//! - [`ChangeSet`] for partial, merge-semantics writes
//! - [`SearchQuery`] and [`LineageRequest`] for finding entities
//! - [`SchemaDefinition`] / [`RegisteredSchema`] for custom metadata, with
//!   [`CustomMetadataKey`] as the only way to address a custom attribute
//! - [`EntityGateway`], implemented over REST by [`AtlanGateway`] and in
//!   memory by [`InMemoryCatalog`]
//!
//! # Example
//!
//! ```ignore
//! use tidemark_catalog::{AtlanGateway, CatalogConfig, EntityGateway, EntityRef, Projection, AssetField};
//!
//! let gateway = AtlanGateway::new(CatalogConfig::from_env()?)?;
//! let snapshot = gateway
//!     .fetch_entity(&EntityRef::new(guid, "Table"), &Projection::new([AssetField::Description]))
//!     .await?;
//! ```

pub mod change;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ids;
pub mod lineage;
pub mod memory;
pub mod metadata;
pub mod model;
pub mod search;
mod wire;

pub use change::ChangeSet;
pub use client::AtlanGateway;
pub use config::{CatalogConfig, CatalogConfigBuilder, ConfigError};
pub use error::{CatalogError, CatalogResult};
pub use gateway::EntityGateway;
pub use ids::{EntityRef, SchemaId};
pub use lineage::{LineageDirection, LineageFilter, LineageRequest};
pub use memory::InMemoryCatalog;
pub use metadata::{
    AttributeDef, AttributeType, BadgeColor, BadgeCondition, BadgeOperator, BadgeSpec,
    CustomMetadataKey, EnumDefinition, Logo, RegisteredAttribute, RegisteredEnum,
    RegisteredSchema, SchemaDefinition,
};
pub use model::{values_equal, AssetField, CertificateStatus, EntitySnapshot, Projection};
pub use search::{fields as search_fields, SearchFilter, SearchQuery};
