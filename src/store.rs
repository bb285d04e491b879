//! The application list and its persistence.
//!
//! The store owns the in-memory list (newest first) and is the only writer
//! to the key-value backend. Every mutation writes the full list back as a
//! single JSON snapshot under [`STORAGE_KEY`].

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use thiserror::Error;

use crate::db::KeyValueStore;
use crate::id;
use crate::models::{ApplicationRecord, NewApplication, Status};

/// Snapshot key. Bump the version suffix on any incompatible format change
/// instead of migrating in place.
pub const STORAGE_KEY: &str = "jobtrack.applications.v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Rejection {
    #[error("company is required")]
    BlankCompany,
    #[error("role is required")]
    BlankRole,
}

#[derive(Debug, Error)]
pub enum AddError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Read the snapshot. A missing or unparseable snapshot is an empty list;
/// only backend failures are errors.
pub fn load_snapshot<B: KeyValueStore>(backend: &B) -> Result<Vec<ApplicationRecord>> {
    let Some(raw) = backend.get(STORAGE_KEY)? else {
        return Ok(Vec::new());
    };

    match serde_json::from_str::<Vec<ApplicationRecord>>(&raw) {
        Ok(records) => Ok(records),
        Err(e) => {
            tracing::warn!(
                key = STORAGE_KEY,
                error = %e,
                "failed to parse stored applications; starting with an empty list"
            );
            Ok(Vec::new())
        }
    }
}

/// Overwrite the snapshot with `records`.
pub fn save_snapshot<B: KeyValueStore>(backend: &mut B, records: &[ApplicationRecord]) -> Result<()> {
    let json = serde_json::to_string(records).context("Failed to serialize applications")?;
    backend.set(STORAGE_KEY, &json)
}

pub struct Store<B: KeyValueStore> {
    backend: B,
    records: Vec<ApplicationRecord>,
}

impl<B: KeyValueStore> Store<B> {
    /// Load the persisted list, newest `created_at` first.
    pub fn open(backend: B) -> Result<Self> {
        let mut records = load_snapshot(&backend)?;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tracing::debug!(count = records.len(), "loaded applications");
        Ok(Self { backend, records })
    }

    pub fn records(&self) -> &[ApplicationRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&ApplicationRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Resolve a full id or a unique id prefix.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<&ApplicationRecord> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return None;
        }
        if let Some(exact) = self.get(prefix) {
            return Some(exact);
        }
        let mut matches = self.records.iter().filter(|r| r.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn add(&mut self, input: NewApplication) -> Result<ApplicationRecord, AddError> {
        self.add_at(input, Local::now())
    }

    fn add_at(
        &mut self,
        input: NewApplication,
        now: DateTime<Local>,
    ) -> Result<ApplicationRecord, AddError> {
        let company = input.company.trim();
        let role = input.role.trim();
        if company.is_empty() {
            return Err(Rejection::BlankCompany.into());
        }
        if role.is_empty() {
            return Err(Rejection::BlankRole.into());
        }

        let date = match input.date.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d.to_string(),
            _ => now.format("%Y-%m-%d").to_string(),
        };

        let record = ApplicationRecord {
            id: id::new_id(),
            company: company.to_string(),
            role: role.to_string(),
            status: input.status.unwrap_or_default(),
            date,
            link: input.link.trim().to_string(),
            notes: input.notes.trim().to_string(),
            created_at: now.timestamp_millis(),
        };

        self.records.insert(0, record.clone());
        self.persist()?;
        tracing::info!(id = %record.id, company = %record.company, "added application");
        Ok(record)
    }

    pub fn remove(&mut self, id: &str) -> Result<()> {
        let before = self.records.len();
        self.records.retain(|r| r.id != id);
        if self.records.len() == before {
            tracing::debug!(id, "remove: no such application");
        }
        self.persist()
    }

    pub fn set_status(&mut self, id: &str, next: Status) -> Result<()> {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => record.status = next,
            None => tracing::debug!(id, "set_status: no such application"),
        }
        self.persist()
    }

    pub fn persist(&mut self) -> Result<()> {
        save_snapshot(&mut self.backend, &self.records)
    }
}
