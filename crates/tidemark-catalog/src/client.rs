//! REST gateway for the metadata catalog
//!
//! Implements [`EntityGateway`] over the catalog's HTTP API using `reqwest`.
//! The gateway keeps every custom metadata definition it resolves so it can
//! translate display names to the internal names used on the wire.

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{header, Client, RequestBuilder};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::change::ChangeSet;
use crate::config::CatalogConfig;
use crate::error::{CatalogError, CatalogResult};
use crate::gateway::EntityGateway;
use crate::ids::EntityRef;
use crate::lineage::LineageRequest;
use crate::metadata::{
    BadgeSpec, EnumDefinition, RegisteredEnum, RegisteredSchema, SchemaDefinition,
};
use crate::model::{EntitySnapshot, Projection};
use crate::search::{fields, SearchQuery};
use crate::wire;

const INDEX_SEARCH_PATH: &str = "/api/meta/search/indexsearch";
const BULK_PATH: &str = "/api/meta/entity/bulk";
const TYPEDEFS_PATH: &str = "/api/meta/types/typedefs";
const LINEAGE_LIST_PATH: &str = "/api/meta/lineage/list";
const GROUPS_PATH: &str = "/api/service/groups";
const MEMBER_PAGE_SIZE: usize = 100;

/// Catalog gateway backed by the REST API.
pub struct AtlanGateway {
    config: CatalogConfig,
    client: Client,
    /// Resolved custom metadata definitions by display name.
    schemas: Cache<String, Arc<RegisteredSchema>>,
}

impl std::fmt::Debug for AtlanGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlanGateway")
            .field("config", &self.config)
            .field("known_schemas", &self.schemas.entry_count())
            .finish()
    }
}

impl AtlanGateway {
    /// Create a gateway with the given configuration.
    pub fn new(config: CatalogConfig) -> CatalogResult<Self> {
        config
            .validate()
            .map_err(|e| CatalogError::InvalidConfiguration {
                message: e.to_string(),
            })?;

        let mut headers = header::HeaderMap::new();
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| CatalogError::InvalidConfiguration {
                message: "API key contains characters not allowed in a header".to_string(),
            })?;
        headers.insert(header::AUTHORIZATION, bearer);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| CatalogError::InvalidConfiguration {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        info!(base_url = %config.base_url, "Catalog gateway created");

        Ok(Self {
            config,
            client,
            schemas: Cache::builder().max_capacity(1_000).build(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, operation: &str, err: reqwest::Error) -> CatalogError {
        if err.is_timeout() {
            CatalogError::Timeout {
                operation: operation.to_string(),
                timeout_ms: u64::try_from(self.config.request_timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            CatalogError::connection_with_source(format!("{operation} request failed"), err)
        }
    }

    /// Send a request and decode a JSON body; non-2xx statuses become errors.
    async fn send_json(&self, operation: &str, request: RequestBuilder) -> CatalogResult<Value> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_send_error(operation, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_send_error(operation, e))?;

        if !status.is_success() {
            debug!(operation, status = status.as_u16(), "Catalog returned error status");
            return Err(CatalogError::from_status(status.as_u16(), body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| CatalogError::InvalidResponse {
            message: format!("{operation}: {e}"),
        })
    }

    async fn remember(&self, schema: RegisteredSchema) -> Arc<RegisteredSchema> {
        let schema = Arc::new(schema);
        self.schemas
            .insert(schema.name.clone(), Arc::clone(&schema))
            .await;
        schema
    }

    /// Definition by display name, from memory or the catalog.
    async fn resolve_schema(&self, name: &str) -> CatalogResult<Arc<RegisteredSchema>> {
        if let Some(schema) = self.schemas.get(name).await {
            return Ok(schema);
        }
        match self.lookup_schema_by_name(name).await? {
            Some(schema) => Ok(Arc::new(schema)),
            None => Err(CatalogError::UnknownSchema {
                schema: name.to_string(),
            }),
        }
    }

    fn known_schemas(&self) -> Vec<Arc<RegisteredSchema>> {
        self.schemas.iter().map(|(_, schema)| schema).collect()
    }

    /// Wire names of the attributes a projection asks for.
    async fn requested_attributes(&self, projection: &Projection) -> CatalogResult<Vec<String>> {
        let mut attributes: Vec<String> = projection
            .attribute_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        for key in &projection.custom_metadata {
            let schema = self.resolve_schema(key.schema()).await?;
            attributes.push(schema.search_attribute(key)?);
        }
        Ok(attributes)
    }

    fn snapshots_from(&self, response: &Value) -> CatalogResult<Vec<EntitySnapshot>> {
        let schemas = self.known_schemas();
        response
            .get("entities")
            .and_then(Value::as_array)
            .map(|entities| {
                entities
                    .iter()
                    .map(|e| wire::snapshot_from_wire(e, &schemas))
                    .collect::<CatalogResult<Vec<_>>>()
            })
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn index_search(
        &self,
        operation: &str,
        dsl: Value,
        projection: &Projection,
    ) -> CatalogResult<Vec<EntitySnapshot>> {
        let attributes = self.requested_attributes(projection).await?;
        let body = json!({
            "dsl": dsl,
            "attributes": attributes,
            "suppressLogs": true,
            "showSearchScore": false,
            "excludeMeanings": !projection.include_terms,
            "excludeClassifications": !projection.include_tags,
        });

        let response = self
            .send_json(operation, self.client.post(self.url(INDEX_SEARCH_PATH)).json(&body))
            .await?;
        self.snapshots_from(&response)
    }

    /// Id of the group whose alias matches, ignoring case.
    async fn find_group_id(&self, alias: &str) -> CatalogResult<Option<String>> {
        let filter = json!({ "$and": [{ "alias": { "$ilike": alias } }] }).to_string();
        let response = self
            .send_json(
                "group_members",
                self.client
                    .get(self.url(GROUPS_PATH))
                    .query(&[("filter", filter.as_str()), ("limit", "20"), ("offset", "0")]),
            )
            .await?;
        Ok(wire::group_id_from_wire(&response, alias))
    }

    async fn typedefs(&self, operation: &str, kind: &str) -> CatalogResult<Value> {
        self.send_json(
            operation,
            self.client
                .get(self.url(TYPEDEFS_PATH))
                .query(&[("type", kind)]),
        )
        .await
    }
}

#[async_trait]
impl EntityGateway for AtlanGateway {
    #[instrument(skip(self, projection), fields(guid = %reference.guid, type_name = %reference.type_name))]
    async fn fetch_entity(
        &self,
        reference: &EntityRef,
        projection: &Projection,
    ) -> CatalogResult<Option<EntitySnapshot>> {
        let query = SearchQuery::new()
            .term(fields::GUID, reference.guid.clone())
            .page(0, 2);
        let mut found = self
            .index_search("fetch_entity", query.to_dsl(), projection)
            .await?;

        if found.len() > 1 {
            warn!(count = found.len(), "More than one active entity matched a guid");
        }
        Ok(if found.is_empty() {
            None
        } else {
            Some(found.swap_remove(0))
        })
    }

    #[instrument(skip(self, query), fields(filters = query.filters.len()))]
    async fn search_entities(&self, query: &SearchQuery) -> CatalogResult<Vec<EntitySnapshot>> {
        self.index_search("search_entities", query.to_dsl(), &query.projection)
            .await
    }

    #[instrument(skip(self, request), fields(guid = %request.guid, direction = request.direction.as_str()))]
    async fn lineage_list(&self, request: &LineageRequest) -> CatalogResult<Vec<EntitySnapshot>> {
        let attributes = self.requested_attributes(&request.projection).await?;
        let response = self
            .send_json(
                "lineage_list",
                self.client
                    .post(self.url(LINEAGE_LIST_PATH))
                    .json(&request.to_wire(&attributes)),
            )
            .await?;
        self.snapshots_from(&response)
    }

    #[instrument(skip(self))]
    async fn group_members(&self, group: &str) -> CatalogResult<Option<Vec<String>>> {
        let Some(id) = self.find_group_id(group).await? else {
            return Ok(None);
        };

        let path = format!("{GROUPS_PATH}/{id}/members");
        let mut usernames = Vec::new();
        let mut offset = 0;
        loop {
            let limit = MEMBER_PAGE_SIZE.to_string();
            let from = offset.to_string();
            let response = self
                .send_json(
                    "group_members",
                    self.client
                        .get(self.url(&path))
                        .query(&[("limit", limit.as_str()), ("offset", from.as_str())]),
                )
                .await?;
            let page = wire::usernames_from_wire(&response);
            let count = page.len();
            usernames.extend(page);
            if count < MEMBER_PAGE_SIZE {
                break;
            }
            offset += count;
        }
        debug!(members = usernames.len(), "Resolved group members");
        Ok(Some(usernames))
    }

    #[instrument(skip(self, change_set), fields(guid = %change_set.target().guid))]
    async fn merge_upsert(&self, change_set: &ChangeSet) -> CatalogResult<EntityRef> {
        let mut schemas = Vec::new();
        for key in change_set.custom_metadata().keys() {
            if !schemas.iter().any(|s: &Arc<RegisteredSchema>| s.name == key.schema()) {
                schemas.push(self.resolve_schema(key.schema()).await?);
            }
        }
        let body = wire::change_set_to_wire(change_set, &schemas)?;

        let response = self
            .send_json(
                "merge_upsert",
                self.client
                    .post(self.url(BULK_PATH))
                    .query(&[
                        ("replaceBusinessAttributes", "true"),
                        ("overwriteBusinessAttributes", "false"),
                    ])
                    .json(&body),
            )
            .await?;

        Ok(wire::mutated_reference(&response).unwrap_or_else(|| change_set.target().clone()))
    }

    #[instrument(skip(self))]
    async fn lookup_schema_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredSchema>> {
        let typedefs = self
            .typedefs("lookup_schema_by_name", "business_metadata")
            .await?;
        match wire::find_schema_in_typedefs(&typedefs, name)? {
            Some(schema) => {
                let schema = self.remember(schema).await;
                Ok(Some(schema.as_ref().clone()))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self, definition), fields(schema = %definition.name))]
    async fn create_schema(&self, definition: &SchemaDefinition) -> CatalogResult<RegisteredSchema> {
        definition.validate()?;
        let response = self
            .send_json(
                "create_schema",
                self.client
                    .post(self.url(TYPEDEFS_PATH))
                    .json(&wire::schema_definition_to_wire(definition)),
            )
            .await?;
        let schema = wire::created_schema_from_wire(&response)?;
        info!(schema_id = %schema.id, "Created custom metadata definition");
        Ok(self.remember(schema).await.as_ref().clone())
    }

    #[instrument(skip(self, schema, badge), fields(schema = %schema.name, attribute = %badge.attribute))]
    async fn create_display_artifact(
        &self,
        schema: &RegisteredSchema,
        badge: &BadgeSpec,
    ) -> CatalogResult<String> {
        let body = wire::badge_to_wire(schema, badge)?;
        let response = self
            .send_json(
                "create_display_artifact",
                self.client.post(self.url(BULK_PATH)).json(&body),
            )
            .await?;
        wire::assigned_guid(&response).ok_or_else(|| CatalogError::InvalidResponse {
            message: "badge upsert reported no entity".to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn lookup_enum_by_name(&self, name: &str) -> CatalogResult<Option<RegisteredEnum>> {
        let typedefs = self.typedefs("lookup_enum_by_name", "enum").await?;
        wire::find_enum_in_typedefs(&typedefs, name)
    }

    #[instrument(skip(self, definition), fields(enum_name = %definition.name))]
    async fn create_enum(&self, definition: &EnumDefinition) -> CatalogResult<RegisteredEnum> {
        let response = self
            .send_json(
                "create_enum",
                self.client
                    .post(self.url(TYPEDEFS_PATH))
                    .json(&wire::enum_definition_to_wire(definition)),
            )
            .await?;
        wire::created_enum_from_wire(&response)
    }
}
