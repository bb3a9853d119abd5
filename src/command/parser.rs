//! Chat text to command classification
//!
//! The first whitespace-separated word is the keyword (case-insensitive);
//! the rest are arguments. Keywords are checked in a fixed order and the
//! first match wins.

use std::net::Ipv4Addr;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use crate::router::select_site;
use crate::subscriber::StatusAction;

pub const MENU: &str = "Hotspot bot commands:
findbyname <name> - search subscribers by name
findbyaddress <ip> - show one subscriber
enable <ip> - re-activate a subscriber
disable <ip> - isolate a subscriber
addclient <ip> <down/up> <name> - create or update a subscriber
setlimit <ip> <down/up> - change the bandwidth limit (Mbps)
removeclient <ip> - delete a subscriber
identity - show router identities
ping - check the bot is alive
help / menu - this list";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    FindByName(String),
    FindByAddress(String),
    Toggle { ip: String, action: StatusAction },
    AddClient { ip: String, limit: String, name: String },
    SetLimit { ip: String, limit: String },
    RemoveClient(String),
    Identity,
    Menu,
    Ping,
}

impl Command {
    /// Runs entirely locally, no acknowledgement needed
    pub fn is_local(&self) -> bool {
        matches!(self, Command::Menu | Command::Ping)
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Command::FindByName(_) => "findbyname",
            Command::FindByAddress(_) => "findbyaddress",
            Command::Toggle {
                action: StatusAction::Enable,
                ..
            } => "enable",
            Command::Toggle {
                action: StatusAction::Disable,
                ..
            } => "disable",
            Command::AddClient { .. } => "addclient",
            Command::SetLimit { .. } => "setlimit",
            Command::RemoveClient(_) => "removeclient",
            Command::Identity => "identity",
            Command::Menu => "menu",
            Command::Ping => "ping",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Wrong format. Usage: {0}")]
    Usage(&'static str),

    #[error("'{ip}' is not a valid IPv4 address. Usage: {usage}")]
    InvalidAddress { ip: String, usage: &'static str },

    #[error("IP {0} does not belong to any known router")]
    UnknownNetwork(String),

    #[error("'{limit}' is not a valid limit, expected download/upload such as 10/5. Usage: {usage}")]
    InvalidLimit { limit: String, usage: &'static str },
}

#[derive(Clone, Copy)]
enum Keyword {
    FindByName,
    FindByAddress,
    Enable,
    Disable,
    AddClient,
    SetLimit,
    RemoveClient,
    Identity,
    Help,
    Ping,
}

const KEYWORDS: [(&str, Keyword); 11] = [
    ("findbyname", Keyword::FindByName),
    ("findbyaddress", Keyword::FindByAddress),
    ("enable", Keyword::Enable),
    ("disable", Keyword::Disable),
    ("addclient", Keyword::AddClient),
    ("setlimit", Keyword::SetLimit),
    ("removeclient", Keyword::RemoveClient),
    ("identity", Keyword::Identity),
    ("help", Keyword::Help),
    ("menu", Keyword::Help),
    ("ping", Keyword::Ping),
];

const USAGE_FIND_NAME: &str = "findbyname <name>";
const USAGE_FIND_ADDRESS: &str = "findbyaddress <ip>";
const USAGE_ENABLE: &str = "enable <ip>";
const USAGE_DISABLE: &str = "disable <ip>";
const USAGE_ADD: &str = "addclient <ip> <down/up> <name>";
const USAGE_SET_LIMIT: &str = "setlimit <ip> <down/up>";
const USAGE_REMOVE: &str = "removeclient <ip>";

fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d+/\d+$").expect("limit pattern compiles"))
}

/// Classify one chat message
///
/// `Ok(None)` means the text is not a command at all and gets no reply.
pub fn parse(text: &str) -> Result<Option<Command>, CommandError> {
    let text = text.trim();
    let (head, rest) = match text.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (text, ""),
    };
    let head = head.to_lowercase();

    let keyword = match KEYWORDS.iter().find(|(word, _)| *word == head) {
        Some((_, keyword)) => *keyword,
        None => return Ok(None),
    };
    let args: Vec<&str> = rest.split_whitespace().collect();

    let command = match keyword {
        Keyword::FindByName => {
            if rest.is_empty() {
                return Err(CommandError::Usage(USAGE_FIND_NAME));
            }
            Command::FindByName(rest.to_string())
        }
        Keyword::FindByAddress => {
            let [ip] = args[..] else {
                return Err(CommandError::Usage(USAGE_FIND_ADDRESS));
            };
            Command::FindByAddress(ipv4(ip, USAGE_FIND_ADDRESS)?)
        }
        Keyword::Enable | Keyword::Disable => {
            let (action, usage) = match keyword {
                Keyword::Enable => (StatusAction::Enable, USAGE_ENABLE),
                _ => (StatusAction::Disable, USAGE_DISABLE),
            };
            let [ip] = args[..] else {
                return Err(CommandError::Usage(usage));
            };
            Command::Toggle {
                ip: routable(ip, usage)?,
                action,
            }
        }
        Keyword::AddClient => {
            if args.len() < 3 {
                return Err(CommandError::Usage(USAGE_ADD));
            }
            let ip = routable(args[0], USAGE_ADD)?;
            let limit = rate_pair(args[1], USAGE_ADD)?;
            // Name keeps its case and inner spacing
            let after_ip = rest[args[0].len()..].trim_start();
            let name = after_ip[args[1].len()..].trim().to_string();
            Command::AddClient { ip, limit, name }
        }
        Keyword::SetLimit => {
            let [ip, limit] = args[..] else {
                return Err(CommandError::Usage(USAGE_SET_LIMIT));
            };
            Command::SetLimit {
                ip: routable(ip, USAGE_SET_LIMIT)?,
                limit: rate_pair(limit, USAGE_SET_LIMIT)?,
            }
        }
        Keyword::RemoveClient => {
            let [ip] = args[..] else {
                return Err(CommandError::Usage(USAGE_REMOVE));
            };
            Command::RemoveClient(routable(ip, USAGE_REMOVE)?)
        }
        Keyword::Identity => Command::Identity,
        Keyword::Help => Command::Menu,
        Keyword::Ping => Command::Ping,
    };

    Ok(Some(command))
}

fn ipv4(ip: &str, usage: &'static str) -> Result<String, CommandError> {
    ip.parse::<Ipv4Addr>()
        .map(|addr| addr.to_string())
        .map_err(|_| CommandError::InvalidAddress {
            ip: ip.to_string(),
            usage,
        })
}

/// A valid IPv4 address that also falls under one of the known router prefixes
fn routable(ip: &str, usage: &'static str) -> Result<String, CommandError> {
    let ip = ipv4(ip, usage)?;
    if select_site(&ip).is_none() {
        return Err(CommandError::UnknownNetwork(ip));
    }
    Ok(ip)
}

fn rate_pair(limit: &str, usage: &'static str) -> Result<String, CommandError> {
    if limit_pattern().is_match(limit) {
        Ok(limit.to_string())
    } else {
        Err(CommandError::InvalidLimit {
            limit: limit.to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addclient_keeps_name_case() {
        let cmd = parse("AddClient 192.168.1.50   5/5 Alice Smith").unwrap().unwrap();
        assert_eq!(
            cmd,
            Command::AddClient {
                ip: "192.168.1.50".to_string(),
                limit: "5/5".to_string(),
                name: "Alice Smith".to_string(),
            }
        );
    }

    #[test]
    fn test_addclient_requires_name() {
        assert_eq!(
            parse("addclient 192.168.1.50 5/5"),
            Err(CommandError::Usage(USAGE_ADD))
        );
    }

    #[test]
    fn test_findbyname_takes_rest_of_text() {
        assert_eq!(
            parse("findbyname  budi  santoso ").unwrap(),
            Some(Command::FindByName("budi  santoso".to_string()))
        );
        assert_eq!(parse("findbyname"), Err(CommandError::Usage(USAGE_FIND_NAME)));
    }

    #[test]
    fn test_findbyaddress_accepts_any_ipv4() {
        assert_eq!(
            parse("findbyaddress 10.0.0.1").unwrap(),
            Some(Command::FindByAddress("10.0.0.1".to_string()))
        );
        assert!(matches!(
            parse("findbyaddress 10.0.0"),
            Err(CommandError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_toggle_requires_known_prefix() {
        assert_eq!(
            parse("DISABLE 193.168.4.2").unwrap(),
            Some(Command::Toggle {
                ip: "193.168.4.2".to_string(),
                action: StatusAction::Disable,
            })
        );
        assert_eq!(
            parse("enable 10.1.1.1"),
            Err(CommandError::UnknownNetwork("10.1.1.1".to_string()))
        );
        assert_eq!(
            parse("enable 192.168.1.1 extra"),
            Err(CommandError::Usage(USAGE_ENABLE))
        );
    }

    #[test]
    fn test_setlimit_validates_pair() {
        assert_eq!(
            parse("setlimit 172.16.0.9 20/10").unwrap(),
            Some(Command::SetLimit {
                ip: "172.16.0.9".to_string(),
                limit: "20/10".to_string(),
            })
        );
        assert!(matches!(
            parse("setlimit 172.16.0.9 20M/10M"),
            Err(CommandError::InvalidLimit { .. })
        ));
        assert!(matches!(
            parse("setlimit 172.16.0.9 20"),
            Err(CommandError::InvalidLimit { .. })
        ));
    }

    #[test]
    fn test_removeclient() {
        assert_eq!(
            parse("removeclient 123.123.0.7").unwrap(),
            Some(Command::RemoveClient("123.123.0.7".to_string()))
        );
    }

    #[test]
    fn test_local_commands() {
        assert_eq!(parse("help").unwrap(), Some(Command::Menu));
        assert_eq!(parse("Menu").unwrap(), Some(Command::Menu));
        assert_eq!(parse(" ping ").unwrap(), Some(Command::Ping));
        assert!(Command::Ping.is_local());
        assert!(!Command::Identity.is_local());
    }

    #[test]
    fn test_unknown_text_is_ignored() {
        assert_eq!(parse("good morning").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(parse("enabled 192.168.1.1").unwrap(), None);
    }

    #[test]
    fn test_error_message_carries_usage() {
        let err = parse("setlimit 192.168.1.1").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Wrong format. Usage: setlimit <ip> <down/up>"
        );
    }
}
