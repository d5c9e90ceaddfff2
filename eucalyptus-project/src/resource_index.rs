//! A flat, filterable listing of the manifest's resources.

use crate::manifest::{ResourceEntry, ResourceKind, ResourceManifest};
use crate::vpath;

/// One row of the resource listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceItem {
    pub id: u32,
    pub name: String,
    /// The virtual path, or the storage path when none is set.
    pub virtual_path: String,
    pub storage_path: String,
    pub kind: ResourceKind,
}

impl From<&ResourceEntry> for ResourceItem {
    fn from(entry: &ResourceEntry) -> Self {
        Self {
            id: entry.id,
            name: entry.name(),
            virtual_path: entry.display_path().to_string(),
            storage_path: entry.storage_path.clone(),
            kind: entry.kind.clone(),
        }
    }
}

/// Filters combined with AND. `None` fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceQuery {
    pub kind: Option<String>,
    pub search: Option<String>,
    pub folder: Option<String>,
}

impl ResourceQuery {
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    pub fn matches(&self, item: &ResourceItem) -> bool {
        let kind_ok = self
            .kind
            .as_deref()
            .is_none_or(|kind| vpath::eq_ignore_case(&item.kind.to_string(), kind));
        let search_ok = self.search.as_deref().is_none_or(|text| {
            text.is_empty()
                || vpath::contains_ignore_case(&item.name, text)
                || vpath::contains_ignore_case(&item.virtual_path, text)
        });
        let folder_ok = self
            .folder
            .as_deref()
            .is_none_or(|folder| vpath::is_prefix_of(folder, &item.virtual_path));
        kind_ok && search_ok && folder_ok
    }
}

/// A snapshot of the manifest's resources in manifest order.
#[derive(Debug, Clone, Default)]
pub struct ResourceIndex {
    items: Vec<ResourceItem>,
}

impl ResourceIndex {
    pub fn new(manifest: &ResourceManifest) -> Self {
        Self {
            items: manifest.resources.iter().map(ResourceItem::from).collect(),
        }
    }

    pub fn items(&self) -> &[ResourceItem] {
        &self.items
    }

    pub fn filter<'a>(&'a self, query: &'a ResourceQuery) -> impl Iterator<Item = &'a ResourceItem> {
        self.items.iter().filter(move |item| query.matches(item))
    }

    /// Resources an entity's model component can point at.
    pub fn models(&self) -> impl Iterator<Item = &ResourceItem> {
        self.items.iter().filter(|item| item.kind.is_model_like())
    }
}
