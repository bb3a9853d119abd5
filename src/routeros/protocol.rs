//! RouterOS API wire format
//!
//! Words are length-prefixed byte strings; a sentence is a run of words
//! closed by an empty word. Requests are a command path plus `=key=value`
//! attribute words and `?key=value` query words.

use std::collections::HashMap;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::ApiError;

/// One `!re` record: attribute name to value.
pub type Record = HashMap<String, String>;

// ============================================================================
// Requests
// ============================================================================

/// A single API command with its attribute and query words
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    command: String,
    words: Vec<String>,
}

impl Request {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            words: Vec::new(),
        }
    }

    /// Append an `=key=value` attribute word
    pub fn attr(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("={}={}", key, value.as_ref()));
        self
    }

    /// Append a `?key=value` equality query word
    pub fn query(mut self, key: &str, value: impl AsRef<str>) -> Self {
        self.words.push(format!("?{}={}", key, value.as_ref()));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// Value of the `=key=` attribute word, if present
    #[cfg(test)]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.find_word('=', key)
    }

    /// Value of the `?key=` query word, if present
    #[cfg(test)]
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.find_word('?', key)
    }

    #[cfg(test)]
    fn find_word(&self, marker: char, key: &str) -> Option<&str> {
        self.words.iter().find_map(|word| {
            word.strip_prefix(marker)?
                .strip_prefix(key)?
                .strip_prefix('=')
        })
    }

    /// Encode the full sentence (command, words, terminator)
    pub fn encode(&self) -> Vec<u8> {
        encode_sentence(std::iter::once(self.command.as_str()).chain(self.words.iter().map(String::as_str)))
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Append the variable-length prefix for a word of `len` bytes
pub fn encode_length(len: u32, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else if len < 0x4000 {
        out.extend_from_slice(&((len | 0x8000) as u16).to_be_bytes());
    } else if len < 0x20_0000 {
        out.extend_from_slice(&(len | 0xC0_0000).to_be_bytes()[1..]);
    } else if len < 0x1000_0000 {
        out.extend_from_slice(&(len | 0xE000_0000).to_be_bytes());
    } else {
        out.push(0xF0);
        out.extend_from_slice(&len.to_be_bytes());
    }
}

pub fn encode_sentence<'a>(words: impl IntoIterator<Item = &'a str>) -> Vec<u8> {
    let mut out = Vec::new();
    for word in words {
        encode_length(word.len() as u32, &mut out);
        out.extend_from_slice(word.as_bytes());
    }
    out.push(0);
    out
}

// ============================================================================
// Decoding
// ============================================================================

async fn read_length<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, ApiError> {
    let first = reader.read_u8().await?;
    let len = if first & 0x80 == 0 {
        u32::from(first)
    } else if first & 0xC0 == 0x80 {
        let mut rest = [0u8; 1];
        reader.read_exact(&mut rest).await?;
        u32::from_be_bytes([0, 0, first & 0x3F, rest[0]])
    } else if first & 0xE0 == 0xC0 {
        let mut rest = [0u8; 2];
        reader.read_exact(&mut rest).await?;
        u32::from_be_bytes([0, first & 0x1F, rest[0], rest[1]])
    } else if first & 0xF0 == 0xE0 {
        let mut rest = [0u8; 3];
        reader.read_exact(&mut rest).await?;
        u32::from_be_bytes([first & 0x0F, rest[0], rest[1], rest[2]])
    } else if first == 0xF0 {
        reader.read_u32().await?
    } else {
        return Err(ApiError::Protocol(format!(
            "reserved length prefix 0x{:02x}",
            first
        )));
    };
    Ok(len)
}

/// Longest word accepted from the router; anything larger means a corrupt stream
pub const MAX_WORD_LEN: u32 = 16 * 1024 * 1024;

/// Read one sentence, without its terminating empty word
pub async fn read_sentence<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<String>, ApiError> {
    let mut words = Vec::new();
    loop {
        let len = read_length(reader).await?;
        if len == 0 {
            return Ok(words);
        }
        if len > MAX_WORD_LEN {
            return Err(ApiError::Protocol(format!(
                "word of {} bytes exceeds the {} byte limit",
                len, MAX_WORD_LEN
            )));
        }
        let mut buf = vec![0u8; len as usize];
        reader.read_exact(&mut buf).await?;
        // Comments are free text typed on the router; do not fail on legacy encodings.
        words.push(String::from_utf8_lossy(&buf).into_owned());
    }
}

/// A decoded reply sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Re(Record),
    Done(Record),
    Trap(Record),
    /// `!empty` (RouterOS 7.18+): the command matched nothing, `!done` follows
    Empty,
    Fatal(String),
}

pub fn parse_reply(words: Vec<String>) -> Result<Reply, ApiError> {
    let mut iter = words.into_iter();
    let kind = iter
        .next()
        .ok_or_else(|| ApiError::Protocol("empty reply sentence".to_string()))?;

    if kind == "!fatal" {
        return Ok(Reply::Fatal(iter.collect::<Vec<_>>().join(" ")));
    }

    let mut record = Record::new();
    for word in iter {
        // `.tag=` and API words are not used by this client
        if let Some(attr) = word.strip_prefix('=') {
            match attr.split_once('=') {
                Some((key, value)) => record.insert(key.to_string(), value.to_string()),
                None => record.insert(attr.to_string(), String::new()),
            };
        }
    }

    match kind.as_str() {
        "!re" => Ok(Reply::Re(record)),
        "!done" => Ok(Reply::Done(record)),
        "!trap" => Ok(Reply::Trap(record)),
        "!empty" => Ok(Reply::Empty),
        other => Err(ApiError::Protocol(format!("unexpected reply word: {}", other))),
    }
}
