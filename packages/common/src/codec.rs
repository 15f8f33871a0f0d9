//! Content codec for serialized domain objects (notes, folders, resources).
//!
//! The serialized form is plain UTF-8 text:
//!
//! ```text
//! <title>
//!
//! <body>
//!
//! id: 00000000000000000000000000000001
//! parent_id: 000000000000000000000000000000F1
//! encryption_applied: 0
//! type_: 1
//! ```
//!
//! The first line is always the title, even when empty, so an untitled note
//! never has its body mistaken for a title. Only the metadata block at the
//! end of the text is authoritative for addressing; it is the run of
//! `key: value` lines after the last blank line.

use std::collections::BTreeMap;

use crate::DomainType;

/// Length of a domain object id (32 hex characters).
pub const DOMAIN_ID_LEN: usize = 32;

/// The fields of a decoded domain object that this service cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomainObject {
    pub id: String,
    pub parent_id: String,
    pub title: String,
    pub body: String,
    pub kind: DomainType,
    pub encryption_applied: bool,
}

/// Outcome of decoding arbitrary bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Object(DomainObject),
    /// The bytes are not in a recognizable serialization. Not an error:
    /// arbitrary blobs are valid item content.
    Unrecognized,
}

impl Decoded {
    pub fn into_object(self) -> Option<DomainObject> {
        match self {
            Decoded::Object(object) => Some(object),
            Decoded::Unrecognized => None,
        }
    }
}

/// Converts domain objects to and from item content.
pub trait ContentCodec: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Decoded;

    fn encode(&self, object: &DomainObject) -> Vec<u8>;
}

/// Codec for the note serialization format.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoteCodec;

impl ContentCodec for NoteCodec {
    fn decode(&self, bytes: &[u8]) -> Decoded {
        let Ok(text) = std::str::from_utf8(bytes) else {
            return Decoded::Unrecognized;
        };

        let lines: Vec<&str> = text.lines().collect();
        let mut end = lines.len();
        while end > 0 && lines[end - 1].trim().is_empty() {
            end -= 1;
        }

        let mut props = BTreeMap::new();
        let mut start = end;
        while start > 0 {
            let Some((key, value)) = parse_property(lines[start - 1]) else {
                break;
            };
            props.entry(key).or_insert(value);
            start -= 1;
        }

        let Some(kind) = props
            .get("type_")
            .and_then(|code| code.parse::<u8>().ok())
            .map(DomainType::from_code)
        else {
            return Decoded::Unrecognized;
        };
        if kind == DomainType::Unknown {
            return Decoded::Unrecognized;
        }

        let Some(id) = props.get("id").filter(|id| is_domain_id(id)) else {
            return Decoded::Unrecognized;
        };

        let mut head = &lines[..start];
        while let Some((last, rest)) = head.split_last() {
            if !last.trim().is_empty() {
                break;
            }
            head = rest;
        }

        let (title, body) = match head.split_first() {
            Some((title, rest)) => {
                let rest = match rest.split_first() {
                    Some((blank, tail)) if blank.trim().is_empty() => tail,
                    _ => rest,
                };
                (title.to_string(), rest.join("\n"))
            }
            None => (String::new(), String::new()),
        };

        Decoded::Object(DomainObject {
            id: id.to_string(),
            parent_id: props.get("parent_id").map(|p| p.to_string()).unwrap_or_default(),
            title,
            body,
            kind,
            encryption_applied: props
                .get("encryption_applied")
                .is_some_and(|v| *v == "1"),
        })
    }

    fn encode(&self, object: &DomainObject) -> Vec<u8> {
        let type_code = object.kind.code().unwrap_or(0);
        format!(
            "{}\n\n{}\n\nid: {}\nparent_id: {}\nencryption_applied: {}\ntype_: {}",
            object.title,
            object.body,
            object.id,
            object.parent_id,
            u8::from(object.encryption_applied),
            type_code
        )
        .into_bytes()
    }
}

fn parse_property(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty()
        || !key
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return None;
    }
    Some((key, value.strip_prefix(' ').unwrap_or(value)))
}

fn is_domain_id(id: &str) -> bool {
    id.len() == DOMAIN_ID_LEN && id.chars().all(|c| c.is_ascii_hexdigit())
}
