//! The host's view of content and of the acting user.
//!
//! The logger never talks to the host's database directly. The host either
//! implements [`ContentResolver`] itself or feeds descriptors into the
//! in-memory [`ContentCatalog`] while the metadata is still available.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tracing::warn;

pub type ContentId = u64;

pub const ATTACHMENT_TYPE: &str = "attachment";

/// Binary/media details, present only for attachments.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaInfo {
    /// Size recorded in the host's attachment metadata.
    #[serde(default)]
    pub indexed_size: Option<u64>,
    /// Stored file, used to measure the size when no indexed size exists.
    #[serde(default)]
    pub file_path: Option<PathBuf>,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContentDescriptor {
    pub id: ContentId,
    /// Raw type identifier, e.g. `post`, `page`, `attachment`.
    pub content_type: String,
    /// Deletion time stamped by the host when trashing, kept raw; only
    /// honoured when it parses as epoch seconds.
    #[serde(default)]
    pub trash_meta_time: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub media: Option<MediaInfo>,
}

impl ContentDescriptor {
    pub fn new(id: ContentId, content_type: impl Into<String>) -> Self {
        Self {
            id,
            content_type: content_type.into(),
            trash_meta_time: None,
            permalink: None,
            media: None,
        }
    }

    pub fn with_permalink(mut self, url: impl Into<String>) -> Self {
        self.permalink = Some(url.into());
        self
    }

    pub fn with_trash_time(mut self, raw: impl Into<String>) -> Self {
        self.trash_meta_time = Some(raw.into());
        self
    }

    pub fn with_media(mut self, media: MediaInfo) -> Self {
        self.media = Some(media);
        self
    }

    pub fn is_attachment(&self) -> bool {
        self.content_type == ATTACHMENT_TYPE
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Subscriber,
    Contributor,
    Author,
    Editor,
    Administrator,
    SuperAdmin,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscriber" => Ok(Role::Subscriber),
            "contributor" => Ok(Role::Contributor),
            "author" => Ok(Role::Author),
            "editor" => Ok(Role::Editor),
            "administrator" | "admin" => Ok(Role::Administrator),
            "super_admin" | "superadmin" => Ok(Role::SuperAdmin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}

/// The authenticated user behind a request or a deletion.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Actor {
    pub id: u64,
    pub display_name: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: u64, display_name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role,
        }
    }
}

/// Host collaborator resolving content by id.
pub trait ContentResolver: Send + Sync {
    /// `None` when the content is gone or the id is invalid.
    fn resolve(&self, id: ContentId) -> Option<ContentDescriptor>;

    /// Singular human label registered for a raw content type.
    fn type_label(&self, content_type: &str) -> Option<String>;
}

/// In-memory resolver fed by the host.
pub struct ContentCatalog {
    items: RwLock<HashMap<ContentId, ContentDescriptor>>,
    labels: RwLock<HashMap<String, String>>,
}

impl Default for ContentCatalog {
    fn default() -> Self {
        let labels = [("post", "Post"), ("page", "Page"), (ATTACHMENT_TYPE, "Media")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            items: RwLock::new(HashMap::new()),
            labels: RwLock::new(labels),
        }
    }
}

impl ContentCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or refreshes a descriptor.
    pub fn register(&self, descriptor: ContentDescriptor) {
        match self.items.write() {
            Ok(mut items) => {
                items.insert(descriptor.id, descriptor);
            }
            Err(_) => warn!("content catalog lock poisoned, descriptor {} dropped", descriptor.id),
        }
    }

    pub fn forget(&self, id: ContentId) -> Option<ContentDescriptor> {
        self.items.write().ok().and_then(|mut items| items.remove(&id))
    }

    pub fn register_label(&self, content_type: impl Into<String>, label: impl Into<String>) {
        if let Ok(mut labels) = self.labels.write() {
            labels.insert(content_type.into(), label.into());
        }
    }
}

impl ContentResolver for ContentCatalog {
    fn resolve(&self, id: ContentId) -> Option<ContentDescriptor> {
        self.items.read().ok().and_then(|items| items.get(&id).cloned())
    }

    fn type_label(&self, content_type: &str) -> Option<String> {
        self.labels
            .read()
            .ok()
            .and_then(|labels| labels.get(content_type).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_resolves_registered_content() {
        let catalog = ContentCatalog::new();
        catalog.register(ContentDescriptor::new(7, "page").with_permalink("https://x/p"));

        let found = catalog.resolve(7).expect("registered");
        assert_eq!(found.permalink.as_deref(), Some("https://x/p"));
        assert!(catalog.resolve(8).is_none());

        catalog.forget(7);
        assert!(catalog.resolve(7).is_none());
    }

    #[test]
    fn default_labels_and_overrides() {
        let catalog = ContentCatalog::new();
        assert_eq!(catalog.type_label("page").as_deref(), Some("Page"));
        assert_eq!(catalog.type_label("product"), None);

        catalog.register_label("product", "Product");
        assert_eq!(catalog.type_label("product").as_deref(), Some("Product"));
    }

    #[test]
    fn only_the_attachment_type_counts_as_attachment() {
        let with_media = ContentDescriptor::new(1, "post").with_media(MediaInfo {
            indexed_size: Some(10),
            file_path: None,
            url: None,
        });
        assert!(!with_media.is_attachment());
        assert!(ContentDescriptor::new(2, ATTACHMENT_TYPE).is_attachment());
    }

    #[test]
    fn roles_parse_case_insensitively() {
        assert_eq!("Administrator".parse::<Role>(), Ok(Role::Administrator));
        assert_eq!("super_admin".parse::<Role>(), Ok(Role::SuperAdmin));
        assert!("root".parse::<Role>().is_err());
    }
}
