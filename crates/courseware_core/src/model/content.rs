//! Polymorphic module content.
//!
//! A `Content` entry places one item inside a module. The item itself lives in
//! one of four variant stores selected by `ContentKind`; the entry keeps only
//! the discriminant and the item id.
//!
//! # Invariants
//! - `ItemBody` variant always matches the `ContentKind` it is stored under.
//! - Content `position` is relative to its module only.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::course::ModuleId;
use super::user::UserId;
use super::validate::{validate_required, validate_url, ValidationError, ITEM_TITLE_MAX_CHARS};

pub type ContentId = Uuid;
pub type ItemId = Uuid;

/// Discriminant of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Text,
    File,
    Image,
    Video,
}

impl ContentKind {
    pub const ALL: [ContentKind; 4] = [Self::Text, Self::File, Self::Image, Self::Video];

    /// Stable lowercase name used in storage and in route parameters.
    pub fn model_name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::File => "file",
            Self::Image => "image",
            Self::Video => "video",
        }
    }

    /// Parses a model name; anything outside the four kinds is `None`.
    pub fn from_model_name(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.model_name() == value)
    }
}

impl Display for ContentKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.model_name())
    }
}

/// Kind-specific payload of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Text { content: String },
    /// Stored path of an uploaded file.
    File { file: String },
    /// Stored path of an uploaded image.
    Image { file: String },
    Video { url: String },
}

impl ItemBody {
    pub fn kind(&self) -> ContentKind {
        match self {
            Self::Text { .. } => ContentKind::Text,
            Self::File { .. } => ContentKind::File,
            Self::Image { .. } => ContentKind::Image,
            Self::Video { .. } => ContentKind::Video,
        }
    }

    /// Single payload column value, whatever the variant.
    pub fn payload(&self) -> &str {
        match self {
            Self::Text { content } => content,
            Self::File { file } | Self::Image { file } => file,
            Self::Video { url } => url,
        }
    }

    /// Rebuilds a body from its kind and payload column value.
    pub fn from_payload(kind: ContentKind, payload: String) -> Self {
        match kind {
            ContentKind::Text => Self::Text { content: payload },
            ContentKind::File => Self::File { file: payload },
            ContentKind::Image => Self::Image { file: payload },
            ContentKind::Video => Self::Video { url: payload },
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Text { content } => validate_required("content", content, usize::MAX),
            Self::File { file } | Self::Image { file } => {
                validate_required("file", file, usize::MAX)
            }
            Self::Video { url } => validate_url(url),
        }
    }
}

/// Owned content item shared by every kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    pub owner_id: UserId,
    pub title: String,
    pub body: ItemBody,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ContentItem {
    /// Builds an unsaved item; timestamps are filled in on insert.
    pub fn new(owner_id: UserId, title: impl Into<String>, body: ItemBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            title: title.into(),
            body,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.body.kind()
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("title", &self.title, ITEM_TITLE_MAX_CHARS)?;
        self.body.validate()
    }
}

impl Display for ContentItem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Persisted placement of one item inside a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    pub module_id: ModuleId,
    pub item_kind: ContentKind,
    pub item_id: ItemId,
    /// Rank among the contents of `module_id`.
    pub position: i64,
}

/// Content entry about to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContent {
    pub id: ContentId,
    pub module_id: ModuleId,
    pub item_kind: ContentKind,
    pub item_id: ItemId,
    pub position: Option<i64>,
}

impl NewContent {
    pub fn new(module_id: ModuleId, item_kind: ContentKind, item_id: ItemId) -> Self {
        Self {
            id: Uuid::new_v4(),
            module_id,
            item_kind,
            item_id,
            position: None,
        }
    }

    pub fn for_item(module_id: ModuleId, item: &ContentItem) -> Self {
        Self::new(module_id, item.kind(), item.id)
    }

    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }
}
