//! Operator-facing renderings of operation results

use std::fmt;

use crate::subscriber::format::NO_LIMIT;

/// One subscriber as seen on one router
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberReport {
    pub router: String,
    pub comment: String,
    pub address: String,
    pub active: bool,
    /// Human-readable rate, `None` when the subscriber has no queue
    pub max_limit: Option<String>,
}

impl fmt::Display for SubscriberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "router: {}", self.router)?;
        writeln!(f, "comment: {}", self.comment)?;
        writeln!(f, "address: {}", self.address)?;
        writeln!(
            f,
            "status: {}",
            if self.active { "active" } else { "isolated" }
        )?;
        write!(
            f,
            "max limit: {}",
            self.max_limit.as_deref().unwrap_or(NO_LIMIT)
        )
    }
}

/// Result of a name search across both routers
#[derive(Debug, Clone)]
pub struct NameMatches {
    pub query: String,
    pub reports: Vec<SubscriberReport>,
}

impl fmt::Display for NameMatches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.reports.is_empty() {
            return write!(f, "No subscriber found with name '{}'", self.query);
        }
        for (i, report) in self.reports.iter().enumerate() {
            if i > 0 {
                f.write_str("\n\n")?;
            }
            write!(f, "{}", report)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Enable,
    Disable,
}

impl StatusAction {
    /// Value the binding's `disabled` flag has after this action
    pub fn disabled(self) -> bool {
        self == StatusAction::Disable
    }
}

/// Outcome of a status toggle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Changed(StatusChange),
    /// The binding was already in the requested state; nothing was sent
    AlreadyInState(StatusChange),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub router: String,
    pub subscriber: String,
    pub action: StatusAction,
}

impl fmt::Display for ToggleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (change, status) = match self {
            ToggleOutcome::Changed(c) => (
                c,
                match c.action {
                    StatusAction::Enable => "enabled successfully",
                    StatusAction::Disable => "disabled successfully",
                },
            ),
            ToggleOutcome::AlreadyInState(c) => (
                c,
                match c.action {
                    StatusAction::Enable => "already enabled",
                    StatusAction::Disable => "already isolated",
                },
            ),
        };
        write!(
            f,
            "router: {}\nuser: {}\nstatus: {}",
            change.router, change.subscriber, status
        )
    }
}

/// Confirmation of a removed subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deprovisioned {
    pub ip: String,
    pub router: String,
    pub queue_removed: bool,
}

impl fmt::Display for Deprovisioned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Client {} was disconnected from {}", self.ip, self.router)
    }
}

/// System identity of each router, or why it could not be read
#[derive(Debug, Clone)]
pub struct IdentityReport {
    pub entries: Vec<(String, String)>,
}

impl fmt::Display for IdentityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self
            .entries
            .iter()
            .map(|(router, identity)| format!("{}: {}", router, identity))
            .collect();
        f.write_str(&lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(comment: &str, active: bool, limit: Option<&str>) -> SubscriberReport {
        SubscriberReport {
            router: "Site 1".to_string(),
            comment: comment.to_string(),
            address: "192.168.1.50".to_string(),
            active,
            max_limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_subscriber_block() {
        assert_eq!(
            report("Alice", true, Some("5 Mbps / 5 Mbps")).to_string(),
            "router: Site 1\ncomment: Alice\naddress: 192.168.1.50\nstatus: active\nmax limit: 5 Mbps / 5 Mbps"
        );
    }

    #[test]
    fn test_isolated_without_queue() {
        let text = report("Bob", false, None).to_string();
        assert!(text.contains("status: isolated"));
        assert!(text.ends_with("max limit: none"));
    }

    #[test]
    fn test_name_matches_empty_and_joined() {
        let none = NameMatches {
            query: "zed".to_string(),
            reports: Vec::new(),
        };
        assert_eq!(none.to_string(), "No subscriber found with name 'zed'");

        let two = NameMatches {
            query: "a".to_string(),
            reports: vec![report("Ana", true, None), report("Dana", true, None)],
        };
        let text = two.to_string();
        assert_eq!(text.matches("router: Site 1").count(), 2);
        assert!(text.contains("max limit: none\n\nrouter: Site 1"));
    }

    #[test]
    fn test_toggle_messages_differ() {
        let change = StatusChange {
            router: "Site 2".to_string(),
            subscriber: "Citra".to_string(),
            action: StatusAction::Enable,
        };
        let changed = ToggleOutcome::Changed(change.clone()).to_string();
        let already = ToggleOutcome::AlreadyInState(change).to_string();

        assert!(changed.ends_with("status: enabled successfully"));
        assert!(already.ends_with("status: already enabled"));
    }
}
