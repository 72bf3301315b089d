//! In-memory records behind the mock service.
//!
//! Records are kept as raw JSON objects so every family shares one code
//! path. Event scripts are keyed by `name`; every other family gets a
//! server-assigned integer `id`.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

pub type Record = Map<String, Value>;

/// Families served under `/api/{version}/system/{family}`.
pub const FAMILIES: &[&str] = &[
    "app",
    "user",
    "role",
    "service",
    "email_template",
    "cors",
    "lookup",
    "event_script",
];

pub const ADMIN_EMAIL: &str = "dream@factory.com";
pub const ADMIN_PASSWORD: &str = "dreamfactory";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    BadRequest(String),
}

/// Listing options taken from the query string.
#[derive(Debug, Default)]
pub struct Selection<'a> {
    pub ids: Option<Vec<String>>,
    pub filter: Option<Filter>,
    pub fields: Option<Vec<&'a str>>,
    pub order: Option<&'a str>,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// A single `field = value` comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    value: Value,
}

impl Filter {
    /// Parse `field = value`. String values are single-quoted; bare values
    /// are read as booleans or integers when they look like one.
    pub fn parse(text: &str) -> Result<Self, StoreError> {
        let invalid = || StoreError::BadRequest(format!("Invalid filter string '{text}'."));
        let (field, raw) = text.split_once('=').ok_or_else(invalid)?;
        let field = field.trim();
        let raw = raw.trim();
        if field.is_empty() || raw.is_empty() {
            return Err(invalid());
        }

        let value = if let Some(quoted) = raw.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')) {
            Value::from(quoted)
        } else if let Ok(flag) = raw.parse::<bool>() {
            Value::from(flag)
        } else if let Ok(number) = raw.parse::<i64>() {
            Value::from(number)
        } else {
            Value::from(raw)
        };
        Ok(Self {
            field: field.to_string(),
            value,
        })
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field) == Some(&self.value)
    }
}

#[derive(Debug)]
pub struct Family {
    key: &'static str,
    next_id: i64,
    records: Vec<Record>,
}

impl Family {
    fn new(name: &str) -> Self {
        Self {
            key: if name == "event_script" { "name" } else { "id" },
            next_id: 1,
            records: Vec::new(),
        }
    }

    fn key_of(&self, record: &Record) -> Option<String> {
        match record.get(self.key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.records
            .iter()
            .position(|r| self.key_of(r).as_deref() == Some(key))
    }

    pub fn list(&self, selection: &Selection<'_>) -> Vec<Record> {
        let mut found: Vec<&Record> = self
            .records
            .iter()
            .filter(|r| match &selection.ids {
                Some(ids) => self.key_of(r).is_some_and(|key| ids.contains(&key)),
                None => true,
            })
            .filter(|r| selection.filter.as_ref().map_or(true, |f| f.matches(r)))
            .collect();

        if let Some(order) = selection.order {
            let mut parts = order.split_whitespace();
            let field = parts.next().unwrap_or_default();
            let descending = parts.next().is_some_and(|d| d.eq_ignore_ascii_case("desc"));
            found.sort_by(|a, b| {
                let ordering = compare(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        found
            .into_iter()
            .skip(selection.offset)
            .take(selection.limit.unwrap_or(usize::MAX))
            .map(|r| project(r, selection.fields.as_deref()))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<Record> {
        self.position(key).map(|i| self.records[i].clone())
    }

    /// Insert all records or none.
    pub fn insert(&mut self, batch: Vec<Record>) -> Result<Vec<Record>, StoreError> {
        if self.key == "name" {
            let mut seen = HashSet::new();
            for record in &batch {
                let name = self
                    .key_of(record)
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| StoreError::BadRequest("Record is missing a name.".to_string()))?;
                if self.position(&name).is_some() || !seen.insert(name.clone()) {
                    return Err(StoreError::BadRequest(format!("Duplicate name '{name}'.")));
                }
            }
        }

        let mut created = Vec::with_capacity(batch.len());
        for mut record in batch {
            if self.key == "id" {
                record.insert("id".to_string(), Value::from(self.next_id));
                self.next_id += 1;
            }
            self.records.push(record.clone());
            created.push(record);
        }
        Ok(created)
    }

    /// Merge each patch into the record named by its key. Every key must
    /// exist before anything is changed.
    pub fn update(&mut self, patches: Vec<Record>) -> Result<Vec<Record>, StoreError> {
        let mut targets = Vec::with_capacity(patches.len());
        for patch in &patches {
            let key = self
                .key_of(patch)
                .ok_or_else(|| StoreError::BadRequest(format!("Record is missing '{}'.", self.key)))?;
            let index = self
                .position(&key)
                .ok_or_else(|| StoreError::NotFound(format!("Record '{key}' not found.")))?;
            targets.push(index);
        }

        Ok(targets
            .into_iter()
            .zip(patches)
            .map(|(index, patch)| merge(&mut self.records[index], patch, self.key))
            .collect())
    }

    pub fn update_matching(&mut self, filter: &Filter, patch: &Record) -> Vec<Record> {
        let key = self.key;
        self.records
            .iter_mut()
            .filter(|r| filter.matches(r))
            .map(|r| merge(r, patch.clone(), key))
            .collect()
    }

    /// Keys named by the records of a delete body.
    pub fn keys(&self, records: &[Record]) -> Result<Vec<String>, StoreError> {
        records
            .iter()
            .map(|r| {
                self.key_of(r)
                    .ok_or_else(|| StoreError::BadRequest(format!("Record is missing '{}'.", self.key)))
            })
            .collect()
    }

    /// Remove the records with the given keys. Every key must exist.
    pub fn remove(&mut self, keys: &[String]) -> Result<Vec<Record>, StoreError> {
        if let Some(missing) = keys.iter().find(|k| self.position(k).is_none()) {
            return Err(StoreError::NotFound(format!("Record '{missing}' not found.")));
        }
        let mut removed = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(index) = self.position(key) {
                removed.push(self.records.remove(index));
            }
        }
        Ok(removed)
    }

    pub fn remove_matching(&mut self, filter: &Filter) -> Vec<Record> {
        let (removed, kept): (Vec<Record>, Vec<Record>) = std::mem::take(&mut self.records)
            .into_iter()
            .partition(|r| filter.matches(r));
        self.records = kept;
        removed
    }
}

/// Whole mock service state.
#[derive(Debug)]
pub struct Store {
    families: HashMap<&'static str, Family>,
    pub config: Record,
    pub sessions: HashSet<String>,
    pub password: String,
}

impl Default for Store {
    fn default() -> Self {
        let mut config = Record::new();
        config.insert("db_version".to_string(), Value::from("2015_11_06"));
        config.insert("allow_open_registration".to_string(), Value::from(false));
        Self {
            families: FAMILIES.iter().map(|name| (*name, Family::new(name))).collect(),
            config,
            sessions: HashSet::new(),
            password: ADMIN_PASSWORD.to_string(),
        }
    }
}

impl Store {
    pub fn family(&self, name: &str) -> Result<&Family, StoreError> {
        self.families.get(name).ok_or_else(|| unknown_family(name))
    }

    pub fn family_mut(&mut self, name: &str) -> Result<&mut Family, StoreError> {
        self.families.get_mut(name).ok_or_else(|| unknown_family(name))
    }
}

fn unknown_family(name: &str) -> StoreError {
    StoreError::NotFound(format!("Resource '{name}' not found for service 'system'."))
}

/// The key field is never overwritten.
fn merge(target: &mut Record, patch: Record, key: &str) -> Record {
    for (field, value) in patch {
        if field != key {
            target.insert(field, value);
        }
    }
    target.clone()
}

fn project(record: &Record, fields: Option<&[&str]>) -> Record {
    match fields {
        Some(fields) if !fields.is_empty() && !fields.contains(&"*") => record
            .iter()
            .filter(|(k, _)| fields.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        _ => record.clone(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
