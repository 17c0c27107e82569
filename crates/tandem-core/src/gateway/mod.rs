//! Remote data gateway.
//!
//! The gateway is the only way data enters or leaves the app. It speaks JSON
//! rows; [`parse_row`] and [`parse_rows`] turn them into typed entities before
//! anything reaches the local store.

mod memory;
mod supabase;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{Entity, EntityKind};

pub use memory::{MemoryGateway, Operation};
pub use supabase::SupabaseGateway;

/// Row selection: equality constraints plus an optional ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub equals: Vec<(String, String)>,
    pub order: Option<OrderBy>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub ascending: bool,
}

impl Filter {
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        let mut equals = self.equals;
        equals.push((column.into(), value.into()));
        Self { equals, ..self }
    }

    #[must_use]
    pub fn order_by(self, column: impl Into<String>, ascending: bool) -> Self {
        Self {
            order: Some(OrderBy {
                column: column.into(),
                ascending,
            }),
            ..self
        }
    }
}

/// Request/response boundary to the hosted backend.
///
/// Every call either succeeds with rows or fails with an [`Error`] whose
/// `is_remote()` is true.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn select(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Value>>;

    /// Insert one row and return it as stored.
    async fn insert(&self, kind: EntityKind, fields: Value) -> Result<Value>;

    /// Update one row by id and return it as stored.
    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> Result<Value>;

    /// Delete one row by id. Deleting an id that is already gone succeeds.
    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()>;

    /// Store bytes in a bucket and return the stored path.
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String>;

    fn public_url(&self, bucket: &str, path: &str) -> String;
}

/// Parse one gateway row into its entity schema.
pub fn parse_row<T: Entity>(row: Value) -> Result<T> {
    serde_json::from_value(row)
        .map_err(|error| Error::Remote(format!("Malformed {} row: {error}", T::KIND)))
}

/// Parse a batch of gateway rows. Malformed rows are logged and skipped so
/// one bad row never hides the rest of the collection.
pub fn parse_rows<T: Entity>(rows: Vec<Value>) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match parse_row(row) {
            Ok(entity) => Some(entity),
            Err(error) => {
                tracing::warn!("Skipping row: {}", error);
                None
            }
        })
        .collect()
}
