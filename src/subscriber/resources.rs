//! Typed access to the two remote collections a subscriber spans
//!
//! - hotspot IP bindings (`/ip/hotspot/ip-binding`): the access gate
//! - simple queues (`/queue/simple`): the bandwidth cap
//!
//! Nothing here is cached; every call reads or writes the router. Callers
//! pass a session they already hold the router lock for.

use crate::error::ApiError;
use crate::routeros::{AdminSession, Record, Request};

const BINDING_PRINT: &str = "/ip/hotspot/ip-binding/print";
const BINDING_ADD: &str = "/ip/hotspot/ip-binding/add";
const BINDING_SET: &str = "/ip/hotspot/ip-binding/set";
const BINDING_REMOVE: &str = "/ip/hotspot/ip-binding/remove";

const QUEUE_PRINT: &str = "/queue/simple/print";
const QUEUE_ADD: &str = "/queue/simple/add";
const QUEUE_SET: &str = "/queue/simple/set";
const QUEUE_REMOVE: &str = "/queue/simple/remove";

const IDENTITY_PRINT: &str = "/system/identity/print";

/// Access type given to newly provisioned subscribers
const DEFAULT_BINDING_TYPE: &str = "bypassed";

// ============================================================================
// Types
// ============================================================================

/// Hotspot IP binding; `comment` holds the subscriber name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub id: String,
    pub address: String,
    pub comment: String,
    pub disabled: bool,
}

impl Binding {
    fn from_record(record: &Record) -> Result<Self, ApiError> {
        Ok(Self {
            id: record_id(record)?,
            address: field(record, "address"),
            comment: field(record, "comment"),
            disabled: record.get("disabled").map(String::as_str) == Some("true"),
        })
    }
}

/// Simple queue capping one subscriber address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Queue {
    pub id: String,
    pub name: String,
    pub target: String,
    pub max_limit: String,
    pub comment: String,
}

impl Queue {
    fn from_record(record: &Record) -> Result<Self, ApiError> {
        Ok(Self {
            id: record_id(record)?,
            name: field(record, "name"),
            target: field(record, "target"),
            max_limit: field(record, "max-limit"),
            comment: field(record, "comment"),
        })
    }
}

fn record_id(record: &Record) -> Result<String, ApiError> {
    record
        .get(".id")
        .cloned()
        .ok_or_else(|| ApiError::Protocol("record without .id".to_string()))
}

fn field(record: &Record, key: &str) -> String {
    record.get(key).cloned().unwrap_or_default()
}

/// Queue target for a single host
pub fn queue_target(ip: &str) -> String {
    format!("{}/32", ip)
}

/// Queue comment marking bot-provisioned subscribers
pub fn queue_comment(name: &str) -> String {
    format!("{} - nd", name)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

// ============================================================================
// Bindings
// ============================================================================

pub async fn list_bindings(session: &mut dyn AdminSession) -> Result<Vec<Binding>, ApiError> {
    session
        .run(&Request::new(BINDING_PRINT))
        .await?
        .iter()
        .map(Binding::from_record)
        .collect()
}

/// First binding whose address equals `ip`
pub async fn find_binding(
    session: &mut dyn AdminSession,
    ip: &str,
) -> Result<Option<Binding>, ApiError> {
    let records = session
        .run(&Request::new(BINDING_PRINT).query("address", ip))
        .await?;
    records.first().map(Binding::from_record).transpose()
}

/// Create the binding for `ip`, or rename the existing one
pub async fn upsert_binding(
    session: &mut dyn AdminSession,
    ip: &str,
    name: &str,
) -> Result<(), ApiError> {
    let request = match find_binding(session, ip).await? {
        None => Request::new(BINDING_ADD)
            .attr("address", ip)
            .attr("type", DEFAULT_BINDING_TYPE)
            .attr("disabled", "no")
            .attr("comment", name),
        Some(binding) => Request::new(BINDING_SET)
            .attr(".id", &binding.id)
            .attr("comment", name),
    };
    session.run(&request).await?;
    Ok(())
}

pub async fn set_binding_disabled(
    session: &mut dyn AdminSession,
    id: &str,
    disabled: bool,
) -> Result<(), ApiError> {
    session
        .run(
            &Request::new(BINDING_SET)
                .attr(".id", id)
                .attr("disabled", yes_no(disabled)),
        )
        .await?;
    Ok(())
}

pub async fn remove_binding(session: &mut dyn AdminSession, id: &str) -> Result<(), ApiError> {
    session
        .run(&Request::new(BINDING_REMOVE).attr(".id", id))
        .await?;
    Ok(())
}

// ============================================================================
// Queues
// ============================================================================

/// First queue targeting `ip/32`
pub async fn find_queue(session: &mut dyn AdminSession, ip: &str) -> Result<Option<Queue>, ApiError> {
    let records = session
        .run(&Request::new(QUEUE_PRINT).query("target", queue_target(ip)))
        .await?;
    records.first().map(Queue::from_record).transpose()
}

/// Create the queue for `ip`, or overwrite name, limit and comment of the existing one
pub async fn upsert_queue(
    session: &mut dyn AdminSession,
    ip: &str,
    name: &str,
    device_rate: &str,
) -> Result<(), ApiError> {
    let request = match find_queue(session, ip).await? {
        None => Request::new(QUEUE_ADD)
            .attr("name", name)
            .attr("target", queue_target(ip))
            .attr("max-limit", device_rate)
            .attr("comment", queue_comment(name)),
        Some(queue) => Request::new(QUEUE_SET)
            .attr(".id", &queue.id)
            .attr("name", name)
            .attr("max-limit", device_rate)
            .attr("comment", queue_comment(name)),
    };
    session.run(&request).await?;
    Ok(())
}

/// Change only the limit, re-sending the existing name
pub async fn set_queue_limit(
    session: &mut dyn AdminSession,
    queue: &Queue,
    device_rate: &str,
) -> Result<(), ApiError> {
    session
        .run(
            &Request::new(QUEUE_SET)
                .attr(".id", &queue.id)
                .attr("name", &queue.name)
                .attr("max-limit", device_rate),
        )
        .await?;
    Ok(())
}

pub async fn remove_queue(session: &mut dyn AdminSession, id: &str) -> Result<(), ApiError> {
    session
        .run(&Request::new(QUEUE_REMOVE).attr(".id", id))
        .await?;
    Ok(())
}

// ============================================================================
// System
// ============================================================================

pub async fn system_identity(session: &mut dyn AdminSession) -> Result<Option<String>, ApiError> {
    let records = session.run(&Request::new(IDENTITY_PRINT)).await?;
    Ok(records.first().and_then(|r| r.get("name").cloned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routeros::fake::FakeRouter;

    #[tokio::test]
    async fn test_find_binding_parses_flags() {
        let fake = FakeRouter::new()
            .with_binding("192.168.1.5", "Budi", true)
            .with_binding("192.168.1.6", "Sari", false);
        let mut session = fake.clone();

        let binding = find_binding(&mut session, "192.168.1.5").await.unwrap().unwrap();
        assert_eq!(binding.comment, "Budi");
        assert!(binding.disabled);

        let other = find_binding(&mut session, "192.168.1.6").await.unwrap().unwrap();
        assert!(!other.disabled);

        assert!(find_binding(&mut session, "192.168.1.7").await.unwrap().is_none());
        assert_eq!(
            fake.calls()[0],
            "/ip/hotspot/ip-binding/print ?address=192.168.1.5"
        );
    }

    #[tokio::test]
    async fn test_upsert_binding_creates_bypassed_entry() {
        let fake = FakeRouter::new();
        let mut session = fake.clone();

        upsert_binding(&mut session, "192.168.1.9", "Dewi").await.unwrap();

        assert_eq!(
            fake.calls()[1],
            "/ip/hotspot/ip-binding/add =address=192.168.1.9 =type=bypassed =disabled=no =comment=Dewi"
        );
        let bindings = fake.bindings();
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0]["type"], "bypassed");
    }

    #[tokio::test]
    async fn test_upsert_queue_updates_existing() {
        let fake = FakeRouter::new().with_queue("192.168.1.9", "old", "1000000/1000000");
        let mut session = fake.clone();

        upsert_queue(&mut session, "192.168.1.9", "Dewi", "8000000/8000000")
            .await
            .unwrap();

        let queues = fake.queues();
        assert_eq!(queues.len(), 1);
        assert_eq!(queues[0]["name"], "Dewi");
        assert_eq!(queues[0]["max-limit"], "8000000/8000000");
        assert_eq!(queues[0]["comment"], "Dewi - nd");
        assert_eq!(queues[0]["target"], "192.168.1.9/32");
    }

    #[tokio::test]
    async fn test_upsert_binding_after_empty_print() {
        use crate::routeros::protocol::encode_sentence;
        use crate::routeros::session::ApiSession;
        use tokio_test::io::Builder;

        fn sentence(words: &[&str]) -> Vec<u8> {
            encode_sentence(words.iter().copied())
        }

        let mock = Builder::new()
            .write(&sentence(&["/ip/hotspot/ip-binding/print", "?address=192.168.1.9"]))
            .read(&sentence(&["!empty"]))
            .read(&sentence(&["!done"]))
            .write(&sentence(&[
                "/ip/hotspot/ip-binding/add",
                "=address=192.168.1.9",
                "=type=bypassed",
                "=disabled=no",
                "=comment=Dewi",
            ]))
            .read(&sentence(&["!done", "=ret=*2"]))
            .build();
        let mut session = ApiSession::new(mock);

        upsert_binding(&mut session, "192.168.1.9", "Dewi").await.unwrap();
    }

    #[tokio::test]
    async fn test_system_identity() {
        let fake = FakeRouter::new().with_identity("core-router");
        let mut session = fake.clone();
        assert_eq!(
            system_identity(&mut session).await.unwrap().as_deref(),
            Some("core-router")
        );

        let mut nameless = FakeRouter::new();
        assert_eq!(system_identity(&mut nameless).await.unwrap(), None);
    }
}
