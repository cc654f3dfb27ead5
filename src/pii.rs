//! PII signal tagging over column and field names.
//!
//! Pure name matching, no data inspection: a fixed table of case-insensitive
//! patterns maps name fragments to tags. Any match also applies the generic
//! `pii` tag, so downstream consumers can filter on one tag without knowing
//! the full vocabulary.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::metadata::{ObjectType, ScanResult};

/// Tag vocabulary, checked in order.
static PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    vec![
        ("email", Regex::new(r"(?i)email|e[-_]?mail").unwrap()),
        ("ssn", Regex::new(r"(?i)ssn|social.*security").unwrap()),
        ("phone", Regex::new(r"(?i)phone|mobile|cell").unwrap()),
        (
            "name",
            Regex::new(r"(?i)name|fullname|first.*name|last.*name").unwrap(),
        ),
    ]
});

/// One flagged member object.
#[derive(Debug, Clone, Serialize)]
pub struct PiiFinding {
    /// Owning container of the flagged member.
    pub table: String,
    /// The member's name.
    pub name: String,
    /// The member's kind.
    pub object_type: ObjectType,
    /// `pii` plus every specific tag that matched.
    pub tags: Vec<&'static str>,
}

/// Tags for one name: empty when nothing matches, otherwise `pii` followed
/// by the specific tags in table order.
pub fn tags_for(name: &str) -> Vec<&'static str> {
    let mut tags = Vec::new();
    for (tag, pattern) in PATTERNS.iter() {
        if pattern.is_match(name) {
            tags.push(*tag);
        }
    }
    if !tags.is_empty() {
        tags.insert(0, "pii");
    }
    tags
}

/// Flag every member object in a result whose name matches the table.
/// Containers are never flagged; a table named `email_log` is not itself PII.
pub fn annotate(result: &ScanResult) -> Vec<PiiFinding> {
    result
        .members()
        .filter_map(|member| {
            let tags = tags_for(&member.name);
            if tags.is_empty() {
                None
            } else {
                Some(PiiFinding {
                    table: member.table.clone(),
                    name: member.name.clone(),
                    object_type: member.object_type,
                    tags,
                })
            }
        })
        .collect()
}
