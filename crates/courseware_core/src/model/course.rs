//! Subject, course, and module records.
//!
//! # Invariants
//! - Subject and course slugs are unique and match `[-a-zA-Z0-9_]+`.
//! - A module's `position` is relative to its course only; gaps and explicit
//!   duplicates are allowed.
//! - Module display order is `position ASC`, then id.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

use super::user::UserId;
use super::validate::{validate_required, validate_slug, ValidationError, TITLE_MAX_CHARS};

pub type SubjectId = Uuid;
pub type CourseId = Uuid;
pub type ModuleId = Uuid;

/// Topic a course belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub title: String,
    pub slug: String,
}

impl Subject {
    pub fn new(title: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            slug: slug.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("title", &self.title, TITLE_MAX_CHARS)?;
        validate_slug(&self.slug)
    }
}

impl Display for Subject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Course authored by one instructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// Instructor who created the course.
    pub owner_id: UserId,
    pub subject_id: SubjectId,
    pub title: String,
    pub slug: String,
    pub overview: String,
    /// Unix epoch milliseconds, assigned by storage on insert.
    pub created_at: i64,
}

impl Course {
    /// Builds an unsaved course; `created_at` is filled in on insert.
    pub fn new(
        owner_id: UserId,
        subject_id: SubjectId,
        title: impl Into<String>,
        slug: impl Into<String>,
        overview: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            subject_id,
            title: title.into(),
            slug: slug.into(),
            overview: overview.into(),
            created_at: 0,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("title", &self.title, TITLE_MAX_CHARS)?;
        validate_slug(&self.slug)
    }
}

impl Display for Course {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.title)
    }
}

/// Persisted course module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: ModuleId,
    pub course_id: CourseId,
    /// Rank among the modules of `course_id`.
    pub position: i64,
    pub title: String,
    pub description: String,
}

impl Module {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("title", &self.title, TITLE_MAX_CHARS)
    }
}

impl Display for Module {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.position, self.title)
    }
}

/// Module about to be created.
///
/// `position = None` asks storage to place the module after its last sibling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewModule {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub position: Option<i64>,
    pub title: String,
    pub description: String,
}

impl NewModule {
    pub fn new(course_id: CourseId, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            course_id,
            position: None,
            title: title.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Pins the module to an explicit position instead of the next free one.
    pub fn at_position(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("title", &self.title, TITLE_MAX_CHARS)
    }
}
