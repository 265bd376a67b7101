//! Single-pass nesting of flat feed records into `level -> level -> records`
//! trees (course+date, track+date+session+race-type, date+reason, ...).
//!
//! Key order at every level is first-seen order in the input; leaves keep the
//! first record for each dedup key. Callers that want sorted output sort the
//! finished tree explicitly (see [`GroupTree::sort_keys_recursive`]).

use std::cmp::Ordering;
use std::collections::HashSet;

use indexmap::IndexMap;
use log::trace;
use serde::ser::{Serialize, Serializer};

use crate::dates::normalize_date_key;
use crate::model::{Record, SORT_MINUTES_FIELD, SENTINEL_MINUTES};

/// Extracts one level key (or the dedup key) from a record. `None` means the
/// record has no usable value for that level.
pub type KeyFn = Box<dyn Fn(&Record) -> Option<String> + Send + Sync>;

/// Key of a single field, using the truthy-value rule of [`Record::text`].
pub fn field(name: &str) -> KeyFn {
    let name = name.to_string();
    Box::new(move |r: &Record| r.text(&name))
}

/// Key of the first present alias, e.g. `["Course", "Track", "track"]`.
pub fn any_field(aliases: &[&str]) -> KeyFn {
    let aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
    Box::new(move |r: &Record| aliases.iter().find_map(|a| r.text(a)))
}

/// Like [`any_field`], but dates are normalized to `YYYY-MM-DD` so feeds that
/// disagree on date format still share a bucket.
pub fn date_field(aliases: &[&str]) -> KeyFn {
    let inner = any_field(aliases);
    Box::new(move |r: &Record| inner(r).map(|d| normalize_date_key(&d)))
}

/// Nesting levels (outermost first) plus the leaf dedup key.
pub struct GroupKeySpec {
    levels: Vec<KeyFn>,
    dedup: KeyFn,
}

impl GroupKeySpec {
    pub fn new(first_level: KeyFn, dedup: KeyFn) -> Self {
        Self { levels: vec![first_level], dedup }
    }

    /// Append a deeper level.
    pub fn then(mut self, level: KeyFn) -> Self {
        self.levels.push(level);
        self
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    fn keys(&self, record: &Record) -> Option<Vec<String>> {
        self.levels.iter().map(|level| level(record)).collect()
    }
}

/// Innermost bucket: records in first-seen order, at most one per dedup key.
#[derive(Debug, Default)]
pub struct LeafGroup<'a> {
    records: Vec<&'a Record>,
    seen: HashSet<String>,
}

impl<'a> LeafGroup<'a> {
    fn push(&mut self, record: &'a Record, dedup: Option<String>) -> bool {
        if let Some(key) = dedup {
            if !self.seen.insert(key) {
                return false;
            }
        }
        self.records.push(record);
        true
    }

    pub fn records(&self) -> &[&'a Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Serialize for LeafGroup<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.records)
    }
}

#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum GroupNode<'a> {
    Branch(GroupTree<'a>),
    Leaf(LeafGroup<'a>),
}

impl<'a> GroupNode<'a> {
    pub fn as_branch(&self) -> Option<&GroupTree<'a>> {
        match self {
            GroupNode::Branch(t) => Some(t),
            GroupNode::Leaf(_) => None,
        }
    }

    pub fn as_leaf(&self) -> Option<&LeafGroup<'a>> {
        match self {
            GroupNode::Leaf(l) => Some(l),
            GroupNode::Branch(_) => None,
        }
    }
}

/// One level of the nested grouping. Serializes as a JSON object in key order.
#[derive(Debug, Default, serde::Serialize)]
#[serde(transparent)]
pub struct GroupTree<'a> {
    children: IndexMap<String, GroupNode<'a>>,
}

impl<'a> GroupTree<'a> {
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&GroupNode<'a>> {
        self.children.get(key)
    }

    /// Records of the leaf at `path` (one key per level).
    pub fn leaf(&self, path: &[&str]) -> Option<&[&'a Record]> {
        let (head, rest) = path.split_first()?;
        match self.children.get(*head)? {
            GroupNode::Branch(t) => t.leaf(rest),
            GroupNode::Leaf(l) if rest.is_empty() => Some(l.records()),
            GroupNode::Leaf(_) => None,
        }
    }

    /// Every grouped record with its key path, depth first in tree order.
    pub fn flatten(&self) -> Vec<(Vec<&str>, &'a Record)> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.flatten_into(&mut path, &mut out);
        out
    }

    fn flatten_into<'s>(
        &'s self,
        path: &mut Vec<&'s str>,
        out: &mut Vec<(Vec<&'s str>, &'a Record)>,
    ) {
        for (key, node) in &self.children {
            path.push(key.as_str());
            match node {
                GroupNode::Branch(t) => t.flatten_into(path, out),
                GroupNode::Leaf(l) => out.extend(l.records.iter().map(|r| (path.clone(), *r))),
            }
            path.pop();
        }
    }

    /// Reorder this level's keys only.
    pub fn sort_keys_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&str, &str) -> Ordering,
    {
        self.children.sort_by(|a, _, b, _| cmp(a.as_str(), b.as_str()));
    }

    /// Reorder keys at every level; `cmp` receives the level index (0 = outermost).
    pub fn sort_keys_recursive<F>(&mut self, cmp: &F)
    where
        F: Fn(usize, &str, &str) -> Ordering,
    {
        self.sort_level(0, cmp);
    }

    fn sort_level<F>(&mut self, depth: usize, cmp: &F)
    where
        F: Fn(usize, &str, &str) -> Ordering,
    {
        self.children.sort_by(|a, _, b, _| cmp(depth, a.as_str(), b.as_str()));
        for node in self.children.values_mut() {
            if let GroupNode::Branch(t) = node {
                t.sort_level(depth + 1, cmp);
            }
        }
    }

    /// Stable-sort every leaf by a numeric minutes field (missing sorts last).
    pub fn sort_leaves_by_minutes(&mut self, minutes_field: &str) {
        for node in self.children.values_mut() {
            match node {
                GroupNode::Branch(t) => t.sort_leaves_by_minutes(minutes_field),
                GroupNode::Leaf(l) => l.records.sort_by_key(|r| {
                    r.get(minutes_field)
                        .and_then(|v| v.as_u64())
                        .unwrap_or(SENTINEL_MINUTES as u64)
                }),
            }
        }
    }

    /// Leaves sorted by the `sortMinutes` field attached by time enrichment.
    pub fn sort_leaves_by_time(&mut self) {
        self.sort_leaves_by_minutes(SORT_MINUTES_FIELD);
    }

    fn insert(&mut self, keys: &[String], record: &'a Record, dedup: Option<String>) -> bool {
        let Some((head, rest)) = keys.split_first() else {
            return false;
        };
        let node = self.children.entry(head.clone()).or_insert_with(|| {
            if rest.is_empty() {
                GroupNode::Leaf(LeafGroup::default())
            } else {
                GroupNode::Branch(GroupTree::default())
            }
        });
        match node {
            GroupNode::Branch(t) => t.insert(rest, record, dedup),
            GroupNode::Leaf(l) => l.push(record, dedup),
        }
    }
}

/// Counters from one grouping pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GroupStats {
    pub records_in: usize,
    pub grouped: usize,
    pub excluded_missing_key: usize,
    pub duplicates_dropped: usize,
}

/// Group `records` by the levels of `spec`, dropping records with a missing
/// level key and later duplicates within a leaf.
pub fn group<'a>(records: &'a [Record], spec: &GroupKeySpec) -> GroupTree<'a> {
    group_with_stats(records, spec).0
}

pub fn group_with_stats<'a>(
    records: &'a [Record],
    spec: &GroupKeySpec,
) -> (GroupTree<'a>, GroupStats) {
    let mut tree = GroupTree::default();
    let mut stats = GroupStats { records_in: records.len(), ..GroupStats::default() };

    for (idx, record) in records.iter().enumerate() {
        let Some(keys) = spec.keys(record) else {
            trace!("group: record #{} missing a level key; excluded", idx);
            stats.excluded_missing_key += 1;
            continue;
        };
        let dedup = (spec.dedup)(record);
        if tree.insert(&keys, record, dedup) {
            stats.grouped += 1;
        } else {
            trace!("group: record #{} duplicates an earlier entry under {:?}", idx, keys);
            stats.duplicates_dropped += 1;
        }
    }

    (tree, stats)
}
