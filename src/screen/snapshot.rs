// src/screen/snapshot.rs - One parsed read of the visible UI
use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use roxmltree::{Document, Node};

use super::{Bounds, Point, ScreenError};

/// Zero-width spaces, direction marks and bidi embedding controls.
static INVISIBLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[\u{200B}-\u{200F}\u{202A}-\u{202E}]").expect("static regex"));

/// Which nodes of a dump make it into a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Long-clickable nodes only; multi-line descriptions become field lists.
    #[default]
    List,
    /// Every leaf node carrying a description.
    Innermost,
}

/// Identity of a visible item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScreenKey {
    SingleLabel(String),
    MultiField(Vec<String>),
}

impl ScreenKey {
    fn from_description(desc: &str) -> Self {
        let mut fields: Vec<String> = desc.split('\n').map(str::to_string).collect();
        if fields.len() == 1 {
            ScreenKey::SingleLabel(fields.remove(0))
        } else {
            ScreenKey::MultiField(fields)
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            ScreenKey::SingleLabel(label) => Some(label),
            ScreenKey::MultiField(_) => None,
        }
    }

    pub fn fields(&self) -> Option<&[String]> {
        match self {
            ScreenKey::SingleLabel(_) => None,
            ScreenKey::MultiField(fields) => Some(fields),
        }
    }
}

impl fmt::Display for ScreenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenKey::SingleLabel(label) => f.write_str(label),
            ScreenKey::MultiField(fields) => write!(f, "{}", fields.join(" | ")),
        }
    }
}

/// Ordered identity -> region mapping.
///
/// Equality ignores order: two snapshots are equal when they show the same items at the
/// same places, which is what the scroll loops use to decide the list stopped moving.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    entries: IndexMap<ScreenKey, Bounds>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later duplicates overwrite the region but keep the first position.
    pub fn insert(&mut self, key: ScreenKey, bounds: Bounds) {
        self.entries.insert(key, bounds);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &ScreenKey) -> Option<&Bounds> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ScreenKey, &Bounds)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ScreenKey> {
        self.entries.keys()
    }

    /// Single-line labels in document order.
    pub fn labels(&self) -> Vec<&str> {
        self.entries.keys().filter_map(ScreenKey::as_label).collect()
    }

    /// Swipe endpoints: the second entry and the second-to-last entry.
    pub fn scroll_anchors(&self) -> Option<(Point, Point)> {
        let len = self.entries.len();
        if len < 2 {
            return None;
        }
        let (_, upper) = self.entries.get_index(1)?;
        let (_, lower) = self.entries.get_index(len - 2)?;
        Some((upper.center(), lower.center()))
    }
}

impl FromIterator<(ScreenKey, Bounds)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (ScreenKey, Bounds)>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for (key, bounds) in iter {
            snapshot.insert(key, bounds);
        }
        snapshot
    }
}

/// Parse a uiautomator XML dump into a snapshot.
pub fn parse_snapshot(xml: &str, mode: ParseMode) -> Result<Snapshot, ScreenError> {
    let doc = Document::parse(xml)?;
    let mut snapshot = Snapshot::new();

    match mode {
        ParseMode::List => {
            for node in doc.descendants().filter(|n| n.is_element()) {
                if node.attribute("long-clickable") != Some("true") {
                    continue;
                }
                let desc = node.attribute("content-desc").unwrap_or("").trim();
                if desc.is_empty() {
                    continue;
                }
                let Some(bounds) = node_bounds(&node) else {
                    continue;
                };
                let clean = INVISIBLE.replace_all(desc, "");
                snapshot.insert(ScreenKey::from_description(&clean), bounds);
            }
        }
        ParseMode::Innermost => collect_leaves(doc.root_element(), &mut snapshot),
    }

    Ok(snapshot)
}

fn collect_leaves(node: Node<'_, '_>, snapshot: &mut Snapshot) {
    let mut children = node.children().filter(|n| n.is_element()).peekable();
    if children.peek().is_none() {
        let desc = node.attribute("content-desc").unwrap_or("").trim();
        if !desc.is_empty() {
            if let Some(bounds) = node_bounds(&node) {
                snapshot.insert(ScreenKey::SingleLabel(desc.to_string()), bounds);
            }
        }
        return;
    }
    for child in children {
        collect_leaves(child, snapshot);
    }
}

fn node_bounds(node: &Node<'_, '_>) -> Option<Bounds> {
    let raw = node.attribute("bounds").unwrap_or("");
    match Bounds::parse(raw) {
        Ok(bounds) => Some(bounds),
        Err(e) => {
            tracing::debug!("Skipping node with {}", e);
            None
        }
    }
}

/// Bounds of the first node anywhere in the dump whose description is exactly `desc`.
pub fn find_by_desc(xml: &str, desc: &str) -> Result<Option<Bounds>, ScreenError> {
    let doc = Document::parse(xml)?;
    let found = doc
        .descendants()
        .filter(|n| n.is_element())
        .find(|n| n.attribute("content-desc") == Some(desc));
    match found {
        Some(node) => Ok(Some(Bounds::parse(node.attribute("bounds").unwrap_or(""))?)),
        None => Ok(None),
    }
}
