//! In-memory router for tests
//!
//! Interprets print/add/set/remove against per-path tables and records every
//! request as `command word word ...`. Clones share state, so a test keeps
//! one handle for inspection and hands another to the registry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::ApiError;
use crate::routeros::{AdminSession, Record, Request};

const BINDINGS: &str = "/ip/hotspot/ip-binding";
const QUEUES: &str = "/queue/simple";
const IDENTITY: &str = "/system/identity";

#[derive(Default)]
struct FakeState {
    tables: HashMap<String, Vec<Record>>,
    identity: Option<String>,
    calls: Vec<String>,
    fail_on: Vec<String>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct FakeRouter {
    state: Arc<Mutex<FakeState>>,
}

fn record(pairs: &[(&str, &str)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The router reports booleans as true/false but accepts yes/no
fn normalize(key: &str, value: &str) -> String {
    match (key, value) {
        ("disabled", "yes") => "true".to_string(),
        ("disabled", "no") => "false".to_string(),
        _ => value.to_string(),
    }
}

impl FakeRouter {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, table: &str, mut row: Record) {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        row.insert(".id".to_string(), format!("*{:X}", state.next_id));
        state.tables.entry(table.to_string()).or_default().push(row);
    }

    pub fn with_binding(self, ip: &str, comment: &str, disabled: bool) -> Self {
        self.insert(
            BINDINGS,
            record(&[
                ("address", ip),
                ("comment", comment),
                ("type", "bypassed"),
                ("disabled", if disabled { "true" } else { "false" }),
            ]),
        );
        self
    }

    pub fn with_queue(self, ip: &str, name: &str, max_limit: &str) -> Self {
        let target = format!("{}/32", ip);
        self.insert(
            QUEUES,
            record(&[
                ("name", name),
                ("target", target.as_str()),
                ("max-limit", max_limit),
                ("comment", ""),
            ]),
        );
        self
    }

    pub fn with_identity(self, name: &str) -> Self {
        self.state.lock().unwrap().identity = Some(name.to_string());
        self
    }

    /// Make every call of `command` fail with a trap
    pub fn failing_on(self, command: &str) -> Self {
        self.state.lock().unwrap().fail_on.push(command.to_string());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn bindings(&self) -> Vec<Record> {
        self.table(BINDINGS)
    }

    pub fn queues(&self) -> Vec<Record> {
        self.table(QUEUES)
    }

    fn table(&self, path: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state.tables.get(path).cloned().unwrap_or_default()
    }

    fn execute(&self, request: &Request) -> Result<Vec<Record>, ApiError> {
        let mut state = self.state.lock().unwrap();

        let mut line = request.command().to_string();
        for word in request.words() {
            line.push(' ');
            line.push_str(word);
        }
        state.calls.push(line);

        if state.fail_on.iter().any(|c| c == request.command()) {
            return Err(ApiError::Trap {
                message: "failure injected".to_string(),
            });
        }

        let (path, verb) = request
            .command()
            .rsplit_once('/')
            .ok_or_else(|| ApiError::Protocol("bad command".to_string()))?;

        let attrs: Vec<(String, String)> = request
            .words()
            .iter()
            .filter_map(|w| w.strip_prefix('=')?.split_once('='))
            .map(|(k, v)| (k.to_string(), normalize(k, v)))
            .collect();

        if path == IDENTITY {
            return Ok(state
                .identity
                .iter()
                .map(|name| record(&[("name", name.as_str())]))
                .collect());
        }

        match verb {
            "print" => {
                let queries: Vec<(&str, &str)> = request
                    .words()
                    .iter()
                    .filter_map(|w| w.strip_prefix('?')?.split_once('='))
                    .collect();
                let rows = state.tables.get(path).cloned().unwrap_or_default();
                Ok(rows
                    .into_iter()
                    .filter(|row| {
                        queries
                            .iter()
                            .all(|(k, v)| row.get(*k).map(String::as_str) == Some(*v))
                    })
                    .collect())
            }
            "add" => {
                state.next_id += 1;
                let mut row: Record = attrs.into_iter().collect();
                row.entry("disabled".to_string())
                    .or_insert_with(|| "false".to_string());
                row.insert(".id".to_string(), format!("*{:X}", state.next_id));
                state.tables.entry(path.to_string()).or_default().push(row);
                Ok(Vec::new())
            }
            "set" => {
                let id = request.attribute(".id").unwrap_or_default().to_string();
                let row = state
                    .tables
                    .get_mut(path)
                    .and_then(|rows| rows.iter_mut().find(|r| r.get(".id") == Some(&id)))
                    .ok_or_else(|| ApiError::Trap {
                        message: "no such item".to_string(),
                    })?;
                for (k, v) in attrs.into_iter().filter(|(k, _)| k != ".id") {
                    row.insert(k, v);
                }
                Ok(Vec::new())
            }
            "remove" => {
                let id = request.attribute(".id").unwrap_or_default();
                let rows = state.tables.entry(path.to_string()).or_default();
                let before = rows.len();
                rows.retain(|r| r.get(".id").map(String::as_str) != Some(id));
                if rows.len() == before {
                    return Err(ApiError::Trap {
                        message: "no such item".to_string(),
                    });
                }
                Ok(Vec::new())
            }
            other => Err(ApiError::Protocol(format!("unsupported verb {}", other))),
        }
    }
}

#[async_trait]
impl AdminSession for FakeRouter {
    async fn run(&mut self, request: &Request) -> Result<Vec<Record>, ApiError> {
        // Give other tasks a chance to run between calls.
        tokio::task::yield_now().await;
        self.execute(request)
    }

    async fn close(&mut self) -> Result<(), ApiError> {
        Ok(())
    }
}
