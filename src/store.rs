use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::warn;

use crate::error::StoreError;

/// Outcome of the most recent enrichment attempt for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Succeeded,
    FailedTransient,
    FailedPermanent,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 4] = [
        ItemStatus::Pending,
        ItemStatus::Succeeded,
        ItemStatus::FailedTransient,
        ItemStatus::FailedPermanent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Succeeded => "succeeded",
            ItemStatus::FailedTransient => "failed_transient",
            ItemStatus::FailedPermanent => "failed_permanent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ItemStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Keys this tool does not know about, written back untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ContentItem {
    /// Missing and zero-length `details` are both "empty".
    pub fn is_empty(&self) -> bool {
        self.details.as_ref().map_or(true, |d| d.is_empty())
    }

    /// Recorded status, inferred from `details` for files written before
    /// statuses existed.
    pub fn effective_status(&self) -> ItemStatus {
        match self.status {
            Some(s) => s,
            None if self.is_empty() => ItemStatus::Pending,
            None => ItemStatus::Succeeded,
        }
    }

    /// Empty items that a previous attempt already settled: confirmed to
    /// have no content, or failed in a way retrying will not fix.
    pub fn is_settled(&self) -> bool {
        self.is_empty()
            && matches!(
                self.status,
                Some(ItemStatus::Succeeded) | Some(ItemStatus::FailedPermanent)
            )
    }
}

/// One element of an item array. Elements that do not parse as an item
/// keep their raw JSON and their position.
#[derive(Debug, Clone)]
pub enum Slot {
    Item(ContentItem),
    Malformed { raw: Value, reason: String },
}

impl Serialize for Slot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Slot::Item(item) => item.serialize(serializer),
            Slot::Malformed { raw, .. } => raw.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Slot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Ok(match ContentItem::deserialize(&raw) {
            Ok(item) => Slot::Item(item),
            Err(e) => Slot::Malformed {
                reason: e.to_string(),
                raw,
            },
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subcategory {
    Items(Vec<Slot>),
    Opaque(Value),
}

/// One top-level entry of the store. Only `Leaf` and `Branch` hold items;
/// anything else is carried through unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Category {
    Leaf(Vec<Slot>),
    Branch(IndexMap<String, Subcategory>),
    Opaque(Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemPath {
    pub category: String,
    pub subcategory: Option<String>,
    pub index: usize,
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subcategory {
            Some(sub) => write!(f, "{}/{}", self.category, sub),
            None => write!(f, "{}", self.category),
        }
    }
}

pub struct Entry<'a> {
    pub path: ItemPath,
    pub item: &'a ContentItem,
}

impl Entry<'_> {
    /// `"{category}[/{subcategory}]: {title}"`
    pub fn label(&self) -> String {
        format!("{}: {}", self.path, self.item.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentStore {
    categories: IndexMap<String, Category>,
}

impl ContentStore {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let store: Self = serde_json::from_str(&raw).map_err(|source| StoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        for (at, slot) in store.slots() {
            if let Slot::Malformed { reason, .. } = slot {
                warn!("Skipping malformed item {}[{}]: {}", at, at.index, reason);
            }
        }
        Ok(store)
    }

    /// Rewrite the whole store. The file is replaced by rename, so readers
    /// see either the previous or the new document.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = tmp_path(path);
        let persist_err = |source| StoreError::Persist {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp, json).map_err(persist_err)?;
        fs::rename(&tmp, path).map_err(persist_err)?;
        Ok(())
    }

    /// Every element of every item array, items and malformed alike.
    fn slots(&self) -> Vec<(ItemPath, &Slot)> {
        let mut out = Vec::new();
        for (category, value) in &self.categories {
            match value {
                Category::Leaf(slots) => {
                    for (index, slot) in slots.iter().enumerate() {
                        let path = ItemPath {
                            category: category.clone(),
                            subcategory: None,
                            index,
                        };
                        out.push((path, slot));
                    }
                }
                Category::Branch(subs) => {
                    for (sub, value) in subs {
                        let Subcategory::Items(slots) = value else {
                            continue;
                        };
                        for (index, slot) in slots.iter().enumerate() {
                            let path = ItemPath {
                                category: category.clone(),
                                subcategory: Some(sub.clone()),
                                index,
                            };
                            out.push((path, slot));
                        }
                    }
                }
                Category::Opaque(_) => {}
            }
        }
        out
    }

    /// Every item in document order.
    pub fn entries(&self) -> Vec<Entry<'_>> {
        self.slots()
            .into_iter()
            .filter_map(|(path, slot)| match slot {
                Slot::Item(item) => Some(Entry { path, item }),
                Slot::Malformed { .. } => None,
            })
            .collect()
    }

    pub fn empty_entries(&self) -> Vec<Entry<'_>> {
        self.entries()
            .into_iter()
            .filter(|e| e.item.is_empty())
            .collect()
    }

    pub fn item_mut(&mut self, path: &ItemPath) -> Option<&mut ContentItem> {
        let slots = match (self.categories.get_mut(&path.category)?, &path.subcategory) {
            (Category::Leaf(slots), None) => slots,
            (Category::Branch(subs), Some(sub)) => match subs.get_mut(sub)? {
                Subcategory::Items(slots) => slots,
                Subcategory::Opaque(_) => return None,
            },
            _ => return None,
        };
        match slots.get_mut(path.index)? {
            Slot::Item(item) => Some(item),
            Slot::Malformed { .. } => None,
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}
