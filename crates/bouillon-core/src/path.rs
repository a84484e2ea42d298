//! Dot-notation key paths and the walk that resolves them against a store.
//!
//! Lookups use explicit key presence, never truthiness: `0`, `false`, `""`
//! and `null` are all found. Sequences are addressed by decimal index
//! segments (`top-5.0`).

use serde_json::{Map, Value};

/// Separator between segments of a dot path.
pub const SEPARATOR: char = '.';

/// A dot-notation path split into its plain keys.
///
/// Splitting never fails: `"a..b"` yields an empty middle key, and `""`
/// addresses the top-level key `""`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath<'a> {
    raw: &'a str,
    segments: Vec<&'a str>,
}

impl<'a> KeyPath<'a> {
    pub fn parse(raw: &'a str) -> Self {
        Self {
            raw,
            segments: raw.split(SEPARATOR).collect(),
        }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    pub fn segments(&self) -> &[&'a str] {
        &self.segments
    }

    /// A single-segment path addresses the root map directly.
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    /// Parent segments and the final key.
    pub fn split_last(&self) -> (&[&'a str], &'a str) {
        match self.segments.split_last() {
            Some((last, parent)) => (parent, last),
            None => (&[], self.raw),
        }
    }
}

/// Resolve `path` against `root`, returning `None` as soon as a segment is absent.
pub fn resolve<'v>(path: &KeyPath<'_>, root: &'v Map<String, Value>) -> Option<&'v Value> {
    walk(path.segments(), root)
}

/// Locate the mutable node that holds the final key of `path`.
///
/// A top-level path has no parent node (the root map is the parent), so this
/// returns `None` for it; callers take the top-level fast path instead.
pub fn resolve_parent_for_write<'v>(
    path: &KeyPath<'_>,
    root: &'v mut Map<String, Value>,
) -> Option<&'v mut Value> {
    let (parent, _) = path.split_last();
    walk_mut(parent, root)
}

fn walk<'v>(segments: &[&str], root: &'v Map<String, Value>) -> Option<&'v Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get(*first)?;
    for segment in rest {
        node = child(node, segment)?;
    }
    Some(node)
}

fn walk_mut<'v>(segments: &[&str], root: &'v mut Map<String, Value>) -> Option<&'v mut Value> {
    let (first, rest) = segments.split_first()?;
    let mut node = root.get_mut(*first)?;
    for segment in rest {
        node = child_mut(node, segment)?;
    }
    Some(node)
}

pub(crate) fn child<'v>(node: &'v Value, segment: &str) -> Option<&'v Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => parse_index(segment).and_then(|idx| items.get(idx)),
        _ => None,
    }
}

pub(crate) fn child_mut<'v>(node: &'v mut Value, segment: &str) -> Option<&'v mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => parse_index(segment).and_then(move |idx| items.get_mut(idx)),
        _ => None,
    }
}

/// Canonical decimal indices only: `"01"` and `"+1"` are not indices.
pub(crate) fn parse_index(segment: &str) -> Option<usize> {
    let canonical = !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_digit())
        && (segment == "0" || !segment.starts_with('0'));
    if canonical {
        segment.parse().ok()
    } else {
        None
    }
}
