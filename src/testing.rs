//! In-memory Intersight endpoint for unit tests.
//!
//! Resources live in a flat list of `(collection, object)` pairs and
//! filters are evaluated against them the way the service does for
//! equality clauses. Every call is journaled as `"<VERB> <target>"`.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::Mutex;

use crate::error::{ApiError, Result};
use crate::intersight::{
    Clause, DesiredSpec, Filter, FilterValue, IntersightApi, RelationMember, RemoteResource,
};

/// Relationship fields Intersight mirrors into `Parent` on creation.
const PARENT_FIELDS: &[&str] = &["PortPolicy", "StoragePolicy", "SanConnectivityPolicy"];

#[derive(Default)]
struct FakeState {
    resources: Vec<(String, Map<String, Value>)>,
    journal: Vec<String>,
    next_id: usize,
}

pub(crate) struct FakeIntersight {
    state: Mutex<FakeState>,
}

impl FakeIntersight {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
        }
    }

    /// Stores a resource and returns its Moid (generated when missing).
    pub(crate) fn seed(&self, resource_path: &str, value: Value) -> String {
        let mut state = self.state.lock().unwrap();
        let mut fields = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let moid = match fields.get("Moid").and_then(Value::as_str) {
            Some(moid) => moid.to_string(),
            None => {
                state.next_id += 1;
                let moid = format!("moid-{}", state.next_id);
                fields.insert(String::from("Moid"), json!(moid));
                moid
            }
        };
        fields
            .entry("ObjectType")
            .or_insert_with(|| json!(object_type_for(resource_path)));
        state.resources.push((resource_path.to_string(), fields));
        moid
    }

    /// Every call made so far.
    pub(crate) fn journal(&self) -> Vec<String> {
        self.state.lock().unwrap().journal.clone()
    }

    /// Calls other than reads.
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.journal()
            .into_iter()
            .filter(|entry| !entry.starts_with("GET "))
            .collect()
    }

    /// Objects currently stored in a collection.
    pub(crate) fn resources(&self, resource_path: &str) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .resources
            .iter()
            .filter(|(path, _)| path == resource_path)
            .map(|(_, fields)| Value::Object(fields.clone()))
            .collect()
    }

    fn record(&self, entry: String) {
        self.state.lock().unwrap().journal.push(entry);
    }
}

#[async_trait]
impl IntersightApi for FakeIntersight {
    async fn get(&self, resource_path: &str, filter: &Filter) -> Result<Option<RemoteResource>> {
        self.record(format!("GET {resource_path} {filter}"));
        let state = self.state.lock().unwrap();
        Ok(state
            .resources
            .iter()
            .find(|(path, fields)| path == resource_path && matches(fields, filter))
            .map(|(_, fields)| RemoteResource::from_map(fields.clone())))
    }

    async fn create(&self, resource_path: &str, body: &DesiredSpec) -> Result<RemoteResource> {
        self.record(format!("POST {resource_path}"));
        let mut fields = body.as_map().clone();
        if let Some(parent) = PARENT_FIELDS.iter().find_map(|key| fields.get(*key).cloned()) {
            fields.entry("Parent").or_insert(parent);
        }
        let moid = self.seed(resource_path, Value::Object(fields));
        let state = self.state.lock().unwrap();
        let stored = state
            .resources
            .iter()
            .find(|(_, fields)| fields.get("Moid") == Some(&json!(moid)))
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default();
        Ok(RemoteResource::from_map(stored))
    }

    async fn update(
        &self,
        resource_path: &str,
        moid: &str,
        body: &DesiredSpec,
    ) -> Result<RemoteResource> {
        self.record(format!("PATCH {resource_path}/{moid}"));
        let mut state = self.state.lock().unwrap();
        let (_, fields) = state
            .resources
            .iter_mut()
            .find(|(path, fields)| path == resource_path && fields.get("Moid") == Some(&json!(moid)))
            .ok_or_else(|| ApiError::NotFound {
                resource_path: format!("{resource_path}/{moid}"),
            })?;
        for (key, value) in body.as_map() {
            fields.insert(key.clone(), value.clone());
        }
        Ok(RemoteResource::from_map(fields.clone()))
    }

    async fn delete(&self, resource_path: &str, moid: &str) -> Result<()> {
        self.record(format!("DELETE {resource_path}/{moid}"));
        let mut state = self.state.lock().unwrap();
        let before = state.resources.len();
        state
            .resources
            .retain(|(path, fields)| !(path == resource_path && fields.get("Moid") == Some(&json!(moid))));
        if state.resources.len() == before {
            return Err(ApiError::NotFound {
                resource_path: format!("{resource_path}/{moid}"),
            }
            .into());
        }
        Ok(())
    }

    async fn add_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        members: &[RelationMember],
    ) -> Result<()> {
        self.record(format!("POST {resource_path}/{moid}/{relation}"));
        let mut state = self.state.lock().unwrap();
        if let Some((_, fields)) = state
            .resources
            .iter_mut()
            .find(|(path, fields)| path == resource_path && fields.get("Moid") == Some(&json!(moid)))
        {
            let entry = fields
                .entry(relation.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Value::Array(items) = entry {
                items.extend(members.iter().map(|m| json!({"ObjectType": m.object_type, "Moid": m.moid})));
            }
        }
        Ok(())
    }

    async fn remove_relation(
        &self,
        resource_path: &str,
        moid: &str,
        relation: &str,
        member_moid: &str,
    ) -> Result<()> {
        self.record(format!("DELETE {resource_path}/{moid}/{relation}/{member_moid}"));
        let mut state = self.state.lock().unwrap();
        if let Some((_, fields)) = state
            .resources
            .iter_mut()
            .find(|(path, fields)| path == resource_path && fields.get("Moid") == Some(&json!(moid)))
        {
            if let Some(Value::Array(items)) = fields.get_mut(relation) {
                items.retain(|item| item.get("Moid") != Some(&json!(member_moid)));
            }
        }
        Ok(())
    }
}

fn object_type_for(resource_path: &str) -> String {
    let dotted = resource_path.trim_start_matches('/').replace('/', ".");
    if let Some(stem) = dotted.strip_suffix("ies") {
        format!("{stem}y")
    } else {
        dotted.strip_suffix('s').unwrap_or(&dotted).to_string()
    }
}

fn matches(fields: &Map<String, Value>, filter: &Filter) -> bool {
    filter.clauses().iter().all(|clause| match clause {
        Clause::Eq { field, value } => lookup(fields, field).is_some_and(|v| value_eq(v, value)),
        Clause::AnyEq {
            collection,
            field,
            value,
        } => fields
            .get(collection)
            .and_then(Value::as_array)
            .is_some_and(|items| {
                items.iter().any(|item| {
                    item.as_object()
                        .and_then(|member| lookup(member, field))
                        .is_some_and(|v| value_eq(v, value))
                })
            }),
    })
}

fn lookup<'v>(fields: &'v Map<String, Value>, dotted: &str) -> Option<&'v Value> {
    let mut parts = dotted.split('.');
    let first = fields.get(parts.next()?)?;
    parts.try_fold(first, |current, part| current.get(part))
}

fn value_eq(actual: &Value, expected: &FilterValue) -> bool {
    match expected {
        FilterValue::Text(text) => actual.as_str() == Some(text.as_str()),
        FilterValue::Integer(number) => actual.as_i64() == Some(*number),
        FilterValue::Boolean(flag) => actual.as_bool() == Some(*flag),
    }
}
