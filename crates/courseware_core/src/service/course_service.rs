//! Instructor course management.
//!
//! # Responsibility
//! - Create, edit, and delete courses owned by the calling instructor.
//! - Manage the ordered module list of a course, including formset-style
//!   bulk edits and explicit reordering.
//!
//! # Invariants
//! - Every operation is scoped to courses owned by `owner_id`.
//! - New modules without an explicit position go after the current last one.

use crate::model::course::{Course, CourseId, Module, ModuleId, NewModule, SubjectId};
use crate::model::user::UserId;
use crate::model::validate::{slugify, ValidationError};
use crate::repo::course_repo::{CourseListQuery, CourseRepository, ModuleChange};
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from instructor course operations.
#[derive(Debug)]
pub enum CourseServiceError {
    /// User input failed field validation.
    Validation(ValidationError),
    /// Course does not exist or belongs to another instructor.
    CourseNotFound(CourseId),
    /// Module does not exist within the target course.
    ModuleNotFound(ModuleId),
    /// Another course already uses this slug.
    SlugTaken(String),
    /// Repository-level failure.
    Repo(RepoError),
}

impl Display for CourseServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::CourseNotFound(id) => write!(f, "course not found: {id}"),
            Self::ModuleNotFound(id) => write!(f, "module not found: {id}"),
            Self::SlugTaken(slug) => write!(f, "course slug already in use: `{slug}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CourseServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CourseServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "course",
                id,
            } => Self::CourseNotFound(id),
            RepoError::NotFound {
                entity: "module",
                id,
            } => Self::ModuleNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Editable course fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseForm {
    pub subject_id: SubjectId,
    pub title: String,
    pub slug: String,
    pub overview: String,
}

/// One row of a module formset.
///
/// Rows without `id` create a module; entirely blank ones are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleForm {
    pub id: Option<ModuleId>,
    pub title: String,
    pub description: String,
    pub delete: bool,
}

impl ModuleForm {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn existing(
        id: ModuleId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Some(id),
            ..Self::new(title, description)
        }
    }

    pub fn deleting(id: ModuleId) -> Self {
        Self {
            id: Some(id),
            delete: true,
            ..Self::default()
        }
    }

    fn is_blank(&self) -> bool {
        self.title.trim().is_empty() && self.description.trim().is_empty()
    }
}

/// Instructor-facing course service.
pub struct CourseService<R: CourseRepository> {
    repo: R,
}

impl<R: CourseRepository> CourseService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists courses created by `owner_id`, newest first.
    pub fn manage_course_list(&self, owner_id: UserId) -> Result<Vec<Course>, CourseServiceError> {
        let query = CourseListQuery {
            owner_id: Some(owner_id),
            ..CourseListQuery::default()
        };
        self.repo.list_courses(&query).map_err(Into::into)
    }

    /// Creates a course. A blank `form.slug` is derived from the title.
    pub fn create_course(
        &self,
        owner_id: UserId,
        form: CourseForm,
    ) -> Result<Course, CourseServiceError> {
        let slug = if form.slug.trim().is_empty() {
            slugify(&form.title)
        } else {
            form.slug
        };
        self.ensure_slug_free(&slug, None)?;
        let course = Course::new(owner_id, form.subject_id, form.title, slug, form.overview);
        let created = self.repo.create_course(&course)?;
        info!(
            "event=course_create module=service status=ok course_id={}",
            created.id
        );
        Ok(created)
    }

    pub fn update_course(
        &self,
        owner_id: UserId,
        course_id: CourseId,
        form: CourseForm,
    ) -> Result<Course, CourseServiceError> {
        let mut course = self.owned_course(owner_id, course_id)?;
        self.ensure_slug_free(&form.slug, Some(course_id))?;
        course.subject_id = form.subject_id;
        course.title = form.title;
        course.slug = form.slug;
        course.overview = form.overview;
        self.repo.update_course(&course)?;
        self.owned_course(owner_id, course_id)
    }

    pub fn delete_course(
        &self,
        owner_id: UserId,
        course_id: CourseId,
    ) -> Result<(), CourseServiceError> {
        self.owned_course(owner_id, course_id)?;
        self.repo.delete_course(course_id)?;
        info!(
            "event=course_delete module=service status=ok course_id={}",
            course_id
        );
        Ok(())
    }

    /// Lists the course's modules in display order.
    pub fn course_modules(
        &self,
        owner_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<Module>, CourseServiceError> {
        self.owned_course(owner_id, course_id)?;
        self.repo.list_modules(course_id).map_err(Into::into)
    }

    /// Adds one module; `position = None` appends after the last module.
    pub fn add_module(
        &self,
        owner_id: UserId,
        course_id: CourseId,
        title: impl Into<String>,
        description: impl Into<String>,
        position: Option<i64>,
    ) -> Result<Module, CourseServiceError> {
        self.owned_course(owner_id, course_id)?;
        let mut draft = NewModule::new(course_id, title).with_description(description);
        draft.position = position;
        let module = self.repo.create_module(&mut draft)?;
        info!(
            "event=module_create module=service status=ok course_id={} position={}",
            course_id, module.position
        );
        Ok(module)
    }

    /// Saves a module formset: edits and deletions first, then new rows.
    ///
    /// Returns the course's modules in display order after the save.
    pub fn update_modules(
        &self,
        owner_id: UserId,
        course_id: CourseId,
        forms: Vec<ModuleForm>,
    ) -> Result<Vec<Module>, CourseServiceError> {
        self.owned_course(owner_id, course_id)?;

        let mut existing = Vec::new();
        let mut created = Vec::new();
        for form in forms {
            match form.id {
                Some(id) if form.delete => existing.push(ModuleChange::Delete(id)),
                Some(id) => existing.push(ModuleChange::Update {
                    id,
                    title: form.title,
                    description: form.description,
                }),
                None if form.delete || form.is_blank() => {}
                None => created.push(ModuleChange::Create(
                    NewModule::new(course_id, form.title).with_description(form.description),
                )),
            }
        }
        existing.append(&mut created);

        let modules = self.repo.apply_module_changes(course_id, &mut existing)?;
        info!(
            "event=module_formset module=service status=ok course_id={} changes={} modules={}",
            course_id,
            existing.len(),
            modules.len()
        );
        Ok(modules)
    }

    /// Writes explicit module positions, e.g. after a drag-and-drop reorder.
    pub fn reorder_modules(
        &self,
        owner_id: UserId,
        course_id: CourseId,
        positions: &[(ModuleId, i64)],
    ) -> Result<Vec<Module>, CourseServiceError> {
        self.owned_course(owner_id, course_id)?;
        self.repo.set_module_positions(course_id, positions)?;
        self.repo.list_modules(course_id).map_err(Into::into)
    }

    fn owned_course(
        &self,
        owner_id: UserId,
        course_id: CourseId,
    ) -> Result<Course, CourseServiceError> {
        match self.repo.get_course(course_id)? {
            Some(course) if course.owner_id == owner_id => Ok(course),
            _ => Err(CourseServiceError::CourseNotFound(course_id)),
        }
    }

    fn ensure_slug_free(
        &self,
        slug: &str,
        current: Option<CourseId>,
    ) -> Result<(), CourseServiceError> {
        match self.repo.get_course_by_slug(slug)? {
            Some(other) if Some(other.id) != current => {
                Err(CourseServiceError::SlugTaken(slug.to_string()))
            }
            _ => Ok(()),
        }
    }
}
