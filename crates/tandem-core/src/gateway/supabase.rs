//! PostgREST + Storage gateway for a Supabase project.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

use super::{Filter, Gateway};
use crate::auth::describe_error;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::models::EntityKind;
use crate::session::SessionHandle;

const RETURN_REPRESENTATION: &str = "return=representation";
const NO_ROWS_CODE: &str = "PGRST116";

#[derive(Clone)]
pub struct SupabaseGateway {
    rest_url: String,
    storage_url: String,
    anon_key: String,
    client: Client,
    session: SessionHandle,
}

impl SupabaseGateway {
    pub fn new(config: &ClientConfig, session: SessionHandle) -> Result<Self> {
        Ok(Self {
            rest_url: config.rest_url(),
            storage_url: config.storage_url(),
            anon_key: config.supabase_anon_key.clone(),
            client: Client::builder().build()?,
            session,
        })
    }

    fn table_url(&self, kind: EntityKind) -> String {
        format!("{}/{}", self.rest_url, kind.collection())
    }

    /// Attach the anon key and the signed-in user's token (anon key when
    /// signed out, letting row-level security decide).
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let token = self
            .session
            .access_token()
            .unwrap_or_else(|| self.anon_key.clone());
        request.header("apikey", &self.anon_key).bearer_auth(token)
    }

    async fn rows_from(kind: EntityKind, response: Response) -> Result<Vec<Value>> {
        let status = response.status();
        tracing::debug!("{} response: HTTP {}", kind.collection(), status.as_u16());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&body)? {
            Value::Array(rows) => Ok(rows),
            row @ Value::Object(_) => Ok(vec![row]),
            other => Err(Error::Remote(format!(
                "Unexpected {} payload: {other}",
                kind.collection()
            ))),
        }
    }
}

#[async_trait]
impl Gateway for SupabaseGateway {
    async fn select(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(kind))
            .query(&query_pairs(Some(filter), None));
        let response = self.authorized(request).send().await?;
        Self::rows_from(kind, response).await
    }

    async fn insert(&self, kind: EntityKind, fields: Value) -> Result<Value> {
        let fields = if kind.owned_by_user() {
            stamp_owner(fields, self.session.user_id().as_deref())
        } else {
            fields
        };
        let request = self
            .client
            .post(self.table_url(kind))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&fields);
        let response = self.authorized(request).send().await?;
        Self::rows_from(kind, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                Error::Remote(format!("Insert into {} returned no row", kind.collection()))
            })
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> Result<Value> {
        let request = self
            .client
            .patch(self.table_url(kind))
            .query(&query_pairs(None, Some(id)))
            .header("Prefer", RETURN_REPRESENTATION)
            .json(&patch);
        let response = self.authorized(request).send().await?;
        Self::rows_from(kind, response)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("{kind} {id}")))
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.table_url(kind))
            .query(&query_pairs(None, Some(id)));
        let response = self.authorized(request).send().await?;
        Self::rows_from(kind, response).await?;
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<&str>,
    ) -> Result<String> {
        let url = format!(
            "{}/object/{}/{}",
            self.storage_url,
            encode_segment(bucket),
            encode_path(path)
        );
        let mut request = self.client.post(url).body(bytes);
        if let Some(content_type) = content_type {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        let response = self.authorized(request).send().await?;
        let status = response.status();
        tracing::debug!("upload to bucket {}: HTTP {}", bucket, status.as_u16());
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/object/public/{}/{}",
            self.storage_url,
            encode_segment(bucket),
            encode_path(path)
        )
    }
}

/// PostgREST query parameters: `select=*`, `column=eq.value` constraints,
/// an `id=eq.…` target and `order=column.asc|desc`.
fn query_pairs(filter: Option<&Filter>, id: Option<&str>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    if filter.is_some() {
        pairs.push(("select".to_string(), "*".to_string()));
    }
    if let Some(id) = id {
        pairs.push(("id".to_string(), format!("eq.{id}")));
    }
    if let Some(filter) = filter {
        for (column, value) in &filter.equals {
            pairs.push((column.clone(), format!("eq.{value}")));
        }
        if let Some(order) = &filter.order {
            let direction = if order.ascending { "asc" } else { "desc" };
            pairs.push(("order".to_string(), format!("{}.{direction}", order.column)));
        }
    }
    pairs
}

fn stamp_owner(fields: Value, user_id: Option<&str>) -> Value {
    match (fields, user_id) {
        (Value::Object(mut map), Some(user_id)) => {
            map.entry("user_id")
                .or_insert_with(|| Value::String(user_id.to_string()));
            Value::Object(map)
        }
        (fields, _) => fields,
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::NOT_FOUND || body.contains(NO_ROWS_CODE) {
        Error::NotFound(describe_error(status, body))
    } else {
        Error::Remote(describe_error(status, body))
    }
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}
