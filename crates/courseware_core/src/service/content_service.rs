//! Instructor content management.
//!
//! # Responsibility
//! - Create and edit items of a kind selected by model name and place them in
//!   a module.
//! - Delete and reorder module contents.
//!
//! # Invariants
//! - Only the owner of a module's course may change its contents.
//! - New contents go after the module's current last content.

use crate::model::content::{Content, ContentId, ContentItem, ContentKind, ItemBody, ItemId};
use crate::model::course::ModuleId;
use crate::model::user::UserId;
use crate::model::validate::ValidationError;
use crate::repo::content_repo::ContentRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from content management operations.
#[derive(Debug)]
pub enum ContentServiceError {
    /// Model name is not one of `text|file|image|video`.
    UnknownModelName(String),
    Validation(ValidationError),
    /// Module does not exist or its course belongs to another instructor.
    ModuleNotFound(ModuleId),
    ContentNotFound(ContentId),
    /// Item does not exist in the module or is owned by someone else.
    ItemNotFound(ItemId),
    Repo(RepoError),
}

impl Display for ContentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownModelName(name) => write!(f, "unknown content model `{name}`"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::ModuleNotFound(id) => write!(f, "module not found: {id}"),
            Self::ContentNotFound(id) => write!(f, "content not found: {id}"),
            Self::ItemNotFound(id) => write!(f, "content item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ContentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ContentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "module",
                id,
            } => Self::ModuleNotFound(id),
            RepoError::NotFound {
                entity: "content",
                id,
            } => Self::ContentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Submitted item fields. `payload` is the text body, stored file path, or
/// video URL depending on the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemForm {
    pub title: String,
    pub payload: String,
}

impl ItemForm {
    pub fn new(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            payload: payload.into(),
        }
    }
}

/// Content entry with its resolved item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEntry {
    pub content: Content,
    pub item: ContentItem,
}

/// Instructor-facing content service.
pub struct ContentService<R: ContentRepository> {
    repo: R,
}

impl<R: ContentRepository> ContentService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Creates an item of `model_name` kind and appends it to the module.
    pub fn create_content(
        &self,
        owner_id: UserId,
        module_id: ModuleId,
        model_name: &str,
        form: ItemForm,
    ) -> Result<ContentEntry, ContentServiceError> {
        let kind = parse_model_name(model_name)?;
        self.ensure_module_owner(owner_id, module_id)?;

        let item = ContentItem::new(
            owner_id,
            form.title,
            ItemBody::from_payload(kind, form.payload),
        );
        let (content, item) = self.repo.create_item_in_module(module_id, &item)?;
        info!(
            "event=content_create module=service status=ok module_id={} kind={} position={}",
            module_id, kind, content.position
        );
        Ok(ContentEntry { content, item })
    }

    /// Replaces an existing item's title and payload. Its position is kept.
    pub fn update_content(
        &self,
        owner_id: UserId,
        module_id: ModuleId,
        model_name: &str,
        item_id: ItemId,
        form: ItemForm,
    ) -> Result<ContentEntry, ContentServiceError> {
        let kind = parse_model_name(model_name)?;
        self.ensure_module_owner(owner_id, module_id)?;

        let content = self
            .repo
            .find_content_for_item(module_id, kind, item_id)?
            .ok_or(ContentServiceError::ItemNotFound(item_id))?;
        let mut item = self
            .repo
            .get_item(kind, item_id)?
            .filter(|item| item.owner_id == owner_id)
            .ok_or(ContentServiceError::ItemNotFound(item_id))?;

        item.title = form.title;
        item.body = ItemBody::from_payload(kind, form.payload);
        let item = self.repo.update_item(&item)?;
        Ok(ContentEntry { content, item })
    }

    /// Deletes a content entry together with its item.
    pub fn delete_content(
        &self,
        owner_id: UserId,
        content_id: ContentId,
    ) -> Result<Content, ContentServiceError> {
        let content = self
            .repo
            .get_content(content_id)?
            .ok_or(ContentServiceError::ContentNotFound(content_id))?;
        if self.repo.module_owner(content.module_id)? != Some(owner_id) {
            return Err(ContentServiceError::ContentNotFound(content_id));
        }

        let deleted = self.repo.delete_content(content_id)?;
        info!(
            "event=content_delete module=service status=ok module_id={} kind={}",
            deleted.module_id, deleted.item_kind
        );
        Ok(deleted)
    }

    /// Lists the module's contents in display order with resolved items.
    pub fn module_contents(
        &self,
        owner_id: UserId,
        module_id: ModuleId,
    ) -> Result<Vec<ContentEntry>, ContentServiceError> {
        self.ensure_module_owner(owner_id, module_id)?;
        resolve_contents(&self.repo, module_id).map_err(Into::into)
    }

    /// Writes explicit content positions for one module.
    pub fn reorder_contents(
        &self,
        owner_id: UserId,
        module_id: ModuleId,
        positions: &[(ContentId, i64)],
    ) -> Result<Vec<Content>, ContentServiceError> {
        self.ensure_module_owner(owner_id, module_id)?;
        self.repo.set_content_positions(module_id, positions)?;
        self.repo.list_contents(module_id).map_err(Into::into)
    }

    fn ensure_module_owner(
        &self,
        owner_id: UserId,
        module_id: ModuleId,
    ) -> Result<(), ContentServiceError> {
        match self.repo.module_owner(module_id)? {
            Some(owner) if owner == owner_id => Ok(()),
            _ => Err(ContentServiceError::ModuleNotFound(module_id)),
        }
    }
}

/// Loads a module's contents in order and resolves each item by kind.
pub(crate) fn resolve_contents<R: ContentRepository>(
    repo: &R,
    module_id: ModuleId,
) -> Result<Vec<ContentEntry>, RepoError> {
    let contents = repo.list_contents(module_id)?;
    let mut entries = Vec::with_capacity(contents.len());
    for content in contents {
        let item = repo
            .get_item(content.item_kind, content.item_id)?
            .ok_or(RepoError::InvalidData(format!(
                "content {} points at missing {} item {}",
                content.id, content.item_kind, content.item_id
            )))?;
        entries.push(ContentEntry { content, item });
    }
    Ok(entries)
}

fn parse_model_name(model_name: &str) -> Result<ContentKind, ContentServiceError> {
    ContentKind::from_model_name(model_name)
        .ok_or_else(|| ContentServiceError::UnknownModelName(model_name.to_string()))
}
