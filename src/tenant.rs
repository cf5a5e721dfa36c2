//! Tenant selection: which company the user is currently operating within.
//!
//! The selection is stored as an opaque JSON object so partial updates from
//! any screen merge without this layer knowing the full company schema. It
//! is persisted synchronously on every mutation and cleared whenever the
//! session ends - a selection never outlives its session.

use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::bus::{AuthSignal, SignalBus};
use crate::models::Company;

/// Selection file name in the state directory
const TENANT_FILE: &str = "tenant.json";

pub struct TenantSelector {
    state_dir: PathBuf,
    bus: SignalBus,
    current: Mutex<Option<Map<String, Value>>>,
}

impl TenantSelector {
    /// Create the selector, adopting any persisted selection as last-known
    /// good without re-validating it against the backend. Reconciliation
    /// happens through the logout broadcast, not here.
    pub fn new(state_dir: PathBuf, bus: SignalBus) -> Self {
        let current = Self::read_persisted(&state_dir);
        Self {
            state_dir,
            bus,
            current: Mutex::new(current),
        }
    }

    fn read_persisted(state_dir: &PathBuf) -> Option<Map<String, Value>> {
        let path = state_dir.join(TENANT_FILE);
        if !path.exists() {
            return None;
        }
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(error = %e, "Failed to read tenant file, treating as no selection");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&contents) {
            Ok(Value::Object(map)) => Some(map),
            Ok(_) | Err(_) => {
                warn!("Malformed tenant file, treating as no selection");
                None
            }
        }
    }

    /// The selected company as a typed record, when the stored fields still
    /// form one (partial updates against an empty selection may not).
    pub fn selected(&self) -> Option<Company> {
        let current = self.current.lock().unwrap();
        current
            .as_ref()
            .and_then(|map| serde_json::from_value(Value::Object(map.clone())).ok())
    }

    /// The selected company's id, if any.
    pub fn selected_id(&self) -> Option<i64> {
        let current = self.current.lock().unwrap();
        current.as_ref().and_then(|map| map.get("id")?.as_i64())
    }

    /// Raw view of the selection, for screens that render backend fields
    /// this layer does not model.
    pub fn selected_value(&self) -> Option<Value> {
        let current = self.current.lock().unwrap();
        current.as_ref().map(|map| Value::Object(map.clone()))
    }

    /// Replace the selection wholesale and persist it.
    pub fn select(&self, company: &Company) {
        let map = match serde_json::to_value(company) {
            Ok(Value::Object(map)) => map,
            // Company always serializes to an object
            _ => return,
        };
        let mut current = self.current.lock().unwrap();
        *current = Some(map);
        self.persist(current.as_ref());
    }

    /// Merge fields into the current selection (incoming fields win) and
    /// persist the result. With no current selection the partial becomes
    /// the selection - merge against an implicit empty object.
    pub fn update(&self, partial: Value) {
        let incoming = match partial {
            Value::Object(map) => map,
            other => {
                warn!(value = %other, "Ignoring non-object tenant update");
                return;
            }
        };
        let mut current = self.current.lock().unwrap();
        let mut merged = current.take().unwrap_or_default();
        for (key, value) in incoming {
            merged.insert(key, value);
        }
        *current = Some(merged);
        self.persist(current.as_ref());
    }

    /// Drop the selection from memory and disk.
    pub fn clear(&self) {
        let mut current = self.current.lock().unwrap();
        *current = None;
        self.persist(None);
    }

    fn persist(&self, selection: Option<&Map<String, Value>>) {
        let path = self.state_dir.join(TENANT_FILE);
        let result: Result<()> = match selection {
            Some(map) => (|| {
                std::fs::create_dir_all(&self.state_dir)
                    .context("Failed to create state directory")?;
                let contents = serde_json::to_string_pretty(&Value::Object(map.clone()))?;
                std::fs::write(&path, contents).context("Failed to write tenant file")?;
                Ok(())
            })(),
            None => {
                if path.exists() {
                    std::fs::remove_file(&path).context("Failed to remove tenant file")
                } else {
                    Ok(())
                }
            }
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist tenant selection");
        }
    }

    /// Clear the selection whenever the session ends. Run this on a
    /// background task for the lifetime of the process.
    pub async fn listen(self: std::sync::Arc<Self>) {
        let mut rx = self.bus.subscribe();
        loop {
            match rx.recv().await {
                Ok(AuthSignal::UserLoggedOut) => {
                    debug!("Session ended, clearing tenant selection");
                    self.clear();
                }
                Ok(AuthSignal::LogoutRequested) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
