//! Structural diff between two content snapshots.
//!
//! Both sides are decoded with [`crate::codec::decode`]. Two JSON containers
//! of the same kind are compared recursively; anything else degrades to a
//! single whole-value replacement. Computing a diff never fails.
//!
//! Paths are lists of [`Segment`]s: object keys, and array elements named by
//! their [`ObjectIdentity`] key. When one array holds several elements with
//! the same identity, later ones get an occurrence suffix (`id=a#1`). A
//! suffix never reuses a key that some element in either array already has.
//!
//! Matched elements whose relative order changed are reported as moves, with
//! their old and new indexes. The elements kept in place are a longest run
//! already in old order, so one element moved past many shows as one move.
//!
//! Output order is fixed so equal inputs always give equal diffs: object keys
//! in sorted order; within an array, removals (old order), then matched
//! elements (new order, a move before that element's own changes), then
//! additions (new order).

use crate::codec::{decode, Content};
use crate::config::Config;
use crate::identity::{DefaultIdentity, ObjectIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// One step in a path through a content tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    /// Object key.
    Key(String),
    /// Array element, by identity.
    Item(String),
}

/// Render a path as `a.b[id=1].c`; the root is `$`.
pub fn format_path(path: &[Segment]) -> String {
    if path.is_empty() {
        return "$".to_string();
    }
    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Segment::Item(id) => {
                out.push('[');
                out.push_str(id);
                out.push(']');
            }
        }
    }
    out
}

/// What happened at a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Op {
    Added { value: Value },
    Removed { value: Value },
    Changed { old: Value, new: Value },
    /// Array element moved from index `from` (old) to `to` (new).
    Moved { from: usize, to: usize },
}

/// A single difference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub path: Vec<Segment>,
    #[serde(flatten)]
    pub op: Op,
}

/// Difference between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Diff {
    /// Both sides decode to the same value.
    Unchanged,
    /// Not comparable structurally; the whole value was swapped.
    Replace { old: Value, new: Value },
    /// Per-path changes between two containers.
    Structural { changes: Vec<Change> },
}

/// Counts per change kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub added: usize,
    pub removed: usize,
    pub changed: usize,
    #[serde(default)]
    pub moved: usize,
}

impl Diff {
    /// The no-op diff recorded on a document's first version.
    pub fn empty() -> Self {
        Diff::Unchanged
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Diff::Unchanged)
    }

    pub fn changes(&self) -> &[Change] {
        match self {
            Diff::Structural { changes } => changes,
            _ => &[],
        }
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();
        match self {
            Diff::Unchanged => {}
            Diff::Replace { .. } => summary.changed = 1,
            Diff::Structural { changes } => {
                for change in changes {
                    match change.op {
                        Op::Added { .. } => summary.added += 1,
                        Op::Removed { .. } => summary.removed += 1,
                        Op::Changed { .. } => summary.changed += 1,
                        Op::Moved { .. } => summary.moved += 1,
                    }
                }
            }
        }
        summary
    }

    /// Serialized form stored on a version.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl fmt::Display for Diff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diff::Unchanged => write!(f, "(no changes)"),
            Diff::Replace { old, new } => write!(f, "~ $: {old} -> {new}"),
            Diff::Structural { changes } => {
                for (i, change) in changes.iter().enumerate() {
                    if i > 0 {
                        writeln!(f)?;
                    }
                    let path = format_path(&change.path);
                    match &change.op {
                        Op::Added { value } => write!(f, "+ {path}: {value}")?,
                        Op::Removed { value } => write!(f, "- {path}: {value}")?,
                        Op::Changed { old, new } => write!(f, "~ {path}: {old} -> {new}")?,
                        Op::Moved { from, to } => write!(f, "> {path}: {from} -> {to}")?,
                    }
                }
                Ok(())
            }
        }
    }
}

/// Computes diffs with a fixed ignore policy and a default identity.
#[derive(Clone)]
pub struct DiffEngine {
    ignored_keys: HashSet<String>,
    identity: Arc<dyn ObjectIdentity>,
}

impl DiffEngine {
    pub fn new(identity: Arc<dyn ObjectIdentity>, ignored_keys: Vec<String>) -> Self {
        Self {
            ignored_keys: ignored_keys.into_iter().collect(),
            identity,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(DefaultIdentity::new(config.identity_fields())),
            config.ignored_keys(),
        )
    }

    /// Diff two raw snapshots using the engine's identity.
    pub fn diff(&self, old_raw: &str, new_raw: &str) -> Diff {
        self.diff_with(old_raw, new_raw, self.identity.as_ref())
    }

    /// Diff two raw snapshots using a caller-supplied identity.
    ///
    /// Ignored keys only take part in the comparison. A `Replace` records
    /// both snapshots as decoded, ignored keys included.
    pub fn diff_with(&self, old_raw: &str, new_raw: &str, identify: &dyn ObjectIdentity) -> Diff {
        let old = decode(old_raw);
        let new = decode(new_raw);
        let old_cmp = self.strip(old.clone());
        let new_cmp = self.strip(new.clone());

        if old_cmp == new_cmp {
            return Diff::Unchanged;
        }

        match (old_cmp, new_cmp) {
            (Content::Structured(a), Content::Structured(b)) if same_container(&a, &b) => {
                let mut changes = Vec::new();
                compare(&mut Vec::new(), &a, &b, identify, &mut changes);
                if changes.is_empty() {
                    Diff::Unchanged
                } else {
                    Diff::Structural { changes }
                }
            }
            _ => Diff::Replace {
                old: old.into_value(),
                new: new.into_value(),
            },
        }
    }

    fn strip(&self, content: Content) -> Content {
        match content {
            Content::Structured(value) if !self.ignored_keys.is_empty() => {
                Content::Structured(strip_keys(value, &self.ignored_keys))
            }
            other => other,
        }
    }
}

impl Default for DiffEngine {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn same_container(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Object(_), Value::Object(_)) | (Value::Array(_), Value::Array(_))
    )
}

fn strip_keys(value: Value, ignored: &HashSet<String>) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(key, _)| !ignored.contains(key))
                .map(|(key, v)| (key, strip_keys(v, ignored)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| strip_keys(v, ignored))
                .collect(),
        ),
        scalar => scalar,
    }
}

fn compare(
    path: &mut Vec<Segment>,
    old: &Value,
    new: &Value,
    identify: &dyn ObjectIdentity,
    out: &mut Vec<Change>,
) {
    if old == new {
        return;
    }
    match (old, new) {
        (Value::Object(old), Value::Object(new)) => compare_objects(path, old, new, identify, out),
        (Value::Array(old), Value::Array(new)) => compare_arrays(path, old, new, identify, out),
        _ => out.push(Change {
            path: path.clone(),
            op: Op::Changed {
                old: old.clone(),
                new: new.clone(),
            },
        }),
    }
}

fn compare_objects(
    path: &mut Vec<Segment>,
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    identify: &dyn ObjectIdentity,
    out: &mut Vec<Change>,
) {
    let keys: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for key in keys {
        path.push(Segment::Key(key.clone()));
        match (old.get(key), new.get(key)) {
            (Some(value), None) => out.push(Change {
                path: path.clone(),
                op: Op::Removed {
                    value: value.clone(),
                },
            }),
            (None, Some(value)) => out.push(Change {
                path: path.clone(),
                op: Op::Added {
                    value: value.clone(),
                },
            }),
            (Some(a), Some(b)) => compare(path, a, b, identify, out),
            (None, None) => {}
        }
        path.pop();
    }
}

fn compare_arrays(
    path: &mut Vec<Segment>,
    old: &[Value],
    new: &[Value],
    identify: &dyn ObjectIdentity,
    out: &mut Vec<Change>,
) {
    let (old_keys, new_keys) = element_keys(old, new, identify);
    let old_index: HashMap<&str, usize> = old_keys
        .iter()
        .enumerate()
        .map(|(i, k)| (k.as_str(), i))
        .collect();
    let new_set: HashSet<&str> = new_keys.iter().map(String::as_str).collect();

    for (key, value) in old_keys.iter().zip(old) {
        if !new_set.contains(key.as_str()) {
            path.push(Segment::Item(key.clone()));
            out.push(Change {
                path: path.clone(),
                op: Op::Removed {
                    value: value.clone(),
                },
            });
            path.pop();
        }
    }

    // (new index, old index) of each matched element, in new order
    let matched: Vec<(usize, usize)> = new_keys
        .iter()
        .enumerate()
        .filter_map(|(j, key)| old_index.get(key.as_str()).map(|&i| (j, i)))
        .collect();
    let old_order: Vec<usize> = matched.iter().map(|&(_, i)| i).collect();
    let in_place = longest_increasing(&old_order);

    for (n, &(j, i)) in matched.iter().enumerate() {
        path.push(Segment::Item(new_keys[j].clone()));
        if !in_place.contains(&n) {
            out.push(Change {
                path: path.clone(),
                op: Op::Moved { from: i, to: j },
            });
        }
        compare(path, &old[i], &new[j], identify, out);
        path.pop();
    }

    for (key, value) in new_keys.iter().zip(new) {
        if !old_index.contains_key(key.as_str()) {
            path.push(Segment::Item(key.clone()));
            out.push(Change {
                path: path.clone(),
                op: Op::Added {
                    value: value.clone(),
                },
            });
            path.pop();
        }
    }
}

/// Unique identity keys for the elements of both arrays.
///
/// Repeats get the next `#n` suffix that is not itself an identity in either
/// array, so the n-th occurrence of a key is named the same on both sides.
fn element_keys(
    old: &[Value],
    new: &[Value],
    identify: &dyn ObjectIdentity,
) -> (Vec<String>, Vec<String>) {
    let old_ids: Vec<String> = old.iter().map(|v| identify.identify(v)).collect();
    let new_ids: Vec<String> = new.iter().map(|v| identify.identify(v)).collect();
    let taken: HashSet<&str> = old_ids.iter().chain(&new_ids).map(String::as_str).collect();
    (
        disambiguate(&old_ids, &taken),
        disambiguate(&new_ids, &taken),
    )
}

fn disambiguate(ids: &[String], taken: &HashSet<&str>) -> Vec<String> {
    let mut next: HashMap<&str, usize> = HashMap::new();
    ids.iter()
        .map(|id| {
            let counter = next.entry(id.as_str()).or_insert(0);
            if *counter == 0 {
                *counter = 1;
                return id.clone();
            }
            loop {
                let candidate = format!("{id}#{counter}");
                *counter += 1;
                if !taken.contains(candidate.as_str()) {
                    return candidate;
                }
            }
        })
        .collect()
}

/// Positions in `seq` of a longest strictly increasing subsequence.
fn longest_increasing(seq: &[usize]) -> HashSet<usize> {
    let mut tails: Vec<usize> = Vec::new();
    let mut prev: Vec<Option<usize>> = vec![None; seq.len()];
    for (pos, &value) in seq.iter().enumerate() {
        let at = tails.partition_point(|&t| seq[t] < value);
        if at > 0 {
            prev[pos] = Some(tails[at - 1]);
        }
        if at == tails.len() {
            tails.push(pos);
        } else {
            tails[at] = pos;
        }
    }

    let mut kept = HashSet::new();
    let mut cursor = tails.last().copied();
    while let Some(pos) = cursor {
        kept.insert(pos);
        cursor = prev[pos];
    }
    kept
}
