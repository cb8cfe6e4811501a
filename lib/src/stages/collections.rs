use std::cmp::Ordering;

use globset::{Glob, GlobMatcher};
use serde_json::{Map, Value};

use crate::error::{Chainable, Result};
use crate::snapshot::{Entry, Snapshot};
use crate::stage::{Context, Stage};

/// One named collection: which entries belong to it and how its members
/// are ordered.
#[derive(Debug)]
pub struct Group {
    name: String,
    matcher: Option<GlobMatcher>,
    sort_by: Option<String>,
    reverse: bool,
}

impl Group {
    /// A group admitting entries whose `collection` metadata names it.
    pub fn new<N: Into<String>>(name: N) -> Self {
        Group { name: name.into(), matcher: None, sort_by: None, reverse: false }
    }

    /// Also admit entries whose full path matches `pattern`.
    pub fn pattern(mut self, pattern: &str) -> Result<Self> {
        let glob = Glob::new(pattern).chain_with(|| error! {
            "invalid collection pattern",
            "collection" => &self.name,
            "pattern" => pattern,
        })?;

        self.matcher = Some(glob.compile_matcher());
        Ok(self)
    }

    /// Order members by this metadata key. Without one, members order by
    /// path.
    pub fn sort_by<K: Into<String>>(mut self, key: K) -> Self {
        self.sort_by = Some(key.into());
        self
    }

    /// Flip the order, e.g. newest-first for date sorts.
    pub fn reverse(mut self, yes: bool) -> Self {
        self.reverse = yes;
        self
    }

    fn admits(&self, path: &str, entry: &Entry) -> bool {
        if entry.meta("collection").and_then(Value::as_str) == Some(self.name.as_str()) {
            return true;
        }

        self.matcher.as_ref().is_some_and(|matcher| matcher.is_match(path))
    }
}

/// Gathers entries into named, sorted collections and publishes them under
/// the `collections` context global for templates to iterate.
///
/// Each member is the entry's metadata plus its `path` at the time this
/// stage runs. Members with equal sort keys tie-break by path, so a
/// collection's order is stable across runs.
#[derive(Debug)]
pub struct Collections {
    groups: Vec<Group>,
}

impl Collections {
    pub fn new(groups: Vec<Group>) -> Self {
        Collections { groups }
    }
}

impl Stage for Collections {
    fn name(&self) -> &str {
        "collections"
    }

    fn run(&self, snapshot: &mut Snapshot, ctx: &mut Context) -> Result<()> {
        let mut collections = Map::new();
        for group in &self.groups {
            let mut members: Vec<Value> = snapshot.iter()
                .filter(|(path, entry)| group.admits(path, entry))
                .map(|(path, entry)| {
                    let mut member: Map<String, Value> = entry.metadata.iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();

                    member.insert("path".into(), Value::String(path.into()));
                    Value::Object(member)
                })
                .collect();

            members.sort_by(|a, b| {
                let key = match &group.sort_by {
                    Some(key) => compare(a.get(key.as_str()), b.get(key.as_str())),
                    None => Ordering::Equal,
                };

                key.then_with(|| compare(a.get("path"), b.get("path")))
            });

            if group.reverse {
                members.reverse();
            }

            collections.insert(group.name.clone(), Value::Array(members));
        }

        ctx.globals.insert("collections".into(), Value::Object(collections));
        Ok(())
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a.map(scalar), b.map(scalar)) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal)
        }
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// TOML front matter encodes datetimes as a single-key table; sort on the
/// inner ISO string.
fn scalar(value: &Value) -> &Value {
    match value.get("$__toml_private_datetime") {
        Some(inner) => inner,
        None => value,
    }
}
