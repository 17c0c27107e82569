//! In-process gateway.
//!
//! Backs tests and offline demos. Rows live in memory per collection, ids and
//! timestamps are assigned on insert, and failures can be scripted per
//! operation.

use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Map, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use super::{Filter, Gateway};
use crate::error::{Error, Result};
use crate::models::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
    Upload,
}

#[derive(Default)]
struct MemoryState {
    tables: HashMap<EntityKind, Vec<Map<String, Value>>>,
    blobs: HashMap<String, Vec<u8>>,
    failures: HashMap<Operation, VecDeque<String>>,
    offline: bool,
    last_timestamp: Option<DateTime<Utc>>,
    calls: Vec<Operation>,
}

impl MemoryState {
    fn check(&mut self, operation: Operation) -> Result<()> {
        self.calls.push(operation);
        if self.offline {
            return Err(Error::Remote("Network request failed".to_string()));
        }
        if let Some(message) = self
            .failures
            .get_mut(&operation)
            .and_then(VecDeque::pop_front)
        {
            return Err(Error::Remote(message));
        }
        Ok(())
    }

    /// Strictly increasing timestamps keep creation order observable.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_timestamp {
            Some(last) if now <= last => last + Duration::milliseconds(1),
            _ => now,
        };
        self.last_timestamp = Some(next);
        next
    }

    fn table(&mut self, kind: EntityKind) -> &mut Vec<Map<String, Value>> {
        self.tables.entry(kind).or_default()
    }
}

#[derive(Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
    latch: Arc<Mutex<Option<Arc<Notify>>>>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `operation` fail with a generic remote error.
    pub fn fail_next(&self, operation: Operation) {
        self.fail_next_with(operation, "Simulated gateway failure");
    }

    pub fn fail_next_with(&self, operation: Operation, message: impl Into<String>) {
        self.lock()
            .failures
            .entry(operation)
            .or_default()
            .push_back(message.into());
    }

    /// Fail every call until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Hold every mutating call until the returned handle is notified once
    /// per call. Passing `false` removes the latch.
    pub fn hold_mutations(&self, hold: bool) -> Option<Arc<Notify>> {
        let mut latch = self.latch.lock().unwrap_or_else(PoisonError::into_inner);
        *latch = hold.then(|| Arc::new(Notify::new()));
        latch.clone()
    }

    /// Put a row in place without going through `insert`.
    pub fn seed(&self, kind: EntityKind, row: Value) {
        if let Value::Object(map) = row {
            self.lock().table(kind).push(map);
        }
    }

    #[must_use]
    pub fn rows(&self, kind: EntityKind) -> Vec<Value> {
        self.lock()
            .tables
            .get(&kind)
            .map(|rows| rows.iter().cloned().map(Value::Object).collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn blob(&self, bucket: &str, path: &str) -> Option<Vec<u8>> {
        self.lock().blobs.get(&blob_key(bucket, path)).cloned()
    }

    /// Operations attempted so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    async fn wait_for_release(&self) {
        let latch = self
            .latch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(latch) = latch {
            latch.notified().await;
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn select(&self, kind: EntityKind, filter: &Filter) -> Result<Vec<Value>> {
        let mut state = self.lock();
        state.check(Operation::Select)?;
        let mut rows: Vec<Map<String, Value>> = state
            .table(kind)
            .iter()
            .filter(|row| {
                filter.equals.iter().all(|(column, value)| {
                    row.get(column)
                        .is_some_and(|cell| cell_matches(cell, value))
                })
            })
            .cloned()
            .collect();

        if let Some(order) = &filter.order {
            rows.sort_by(|a, b| {
                let ordering = compare_cells(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        Ok(rows.into_iter().map(Value::Object).collect())
    }

    async fn insert(&self, kind: EntityKind, fields: Value) -> Result<Value> {
        self.wait_for_release().await;
        let mut state = self.lock();
        state.check(Operation::Insert)?;
        let Value::Object(mut row) = fields else {
            return Err(Error::Remote("Insert payload must be an object".to_string()));
        };

        let now = Value::String(state.next_timestamp().to_rfc3339());
        row.entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        row.entry("created_at").or_insert_with(|| now.clone());
        if kind == EntityKind::Goal {
            row.entry("updated_at").or_insert(now);
        }

        state.table(kind).push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(&self, kind: EntityKind, id: &str, patch: Value) -> Result<Value> {
        self.wait_for_release().await;
        let mut state = self.lock();
        state.check(Operation::Update)?;
        let Value::Object(patch) = patch else {
            return Err(Error::Remote("Update payload must be an object".to_string()));
        };

        let row = state
            .table(kind)
            .iter_mut()
            .find(|row| row_has_id(row, id))
            .ok_or_else(|| Error::NotFound(format!("{kind} {id}")))?;
        for (column, value) in patch {
            row.insert(column, value);
        }
        Ok(Value::Object(row.clone()))
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<()> {
        self.wait_for_release().await;
        let mut state = self.lock();
        state.check(Operation::Delete)?;
        state.table(kind).retain(|row| !row_has_id(row, id));
        if kind == EntityKind::Milestone {
            state
                .table(EntityKind::Photo)
                .retain(|row| row.get("milestone_id").and_then(Value::as_str) != Some(id));
        }
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: Option<&str>,
    ) -> Result<String> {
        let mut state = self.lock();
        state.check(Operation::Upload)?;
        state.blobs.insert(blob_key(bucket, path), bytes);
        Ok(path.to_string())
    }

    fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("memory://{}", blob_key(bucket, path))
    }
}

fn blob_key(bucket: &str, path: &str) -> String {
    format!("{bucket}/{}", path.trim_start_matches('/'))
}

fn row_has_id(row: &Map<String, Value>, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

fn cell_matches(cell: &Value, expected: &str) -> bool {
    match cell {
        Value::String(text) => text == expected,
        Value::Null => expected == "null",
        other => other.to_string() == expected,
    }
}

fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}
