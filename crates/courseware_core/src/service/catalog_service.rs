//! Public course catalog.
//!
//! # Invariants
//! - Subjects list by title; courses list newest first.
//! - Course detail modules are in display order.

use crate::model::course::{Course, Module, Subject};
use crate::repo::course_repo::{CourseListQuery, CourseRepository, CourseSummary};
use crate::repo::subject_repo::{SubjectRepository, SubjectSummary};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum CatalogServiceError {
    SubjectNotFound(String),
    CourseNotFound(String),
    Repo(RepoError),
}

impl Display for CatalogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SubjectNotFound(slug) => write!(f, "subject not found: `{slug}`"),
            Self::CourseNotFound(slug) => write!(f, "course not found: `{slug}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CatalogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CatalogServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Course list page: every subject plus the (optionally filtered) courses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseCatalog {
    pub subjects: Vec<SubjectSummary>,
    /// Set when the listing was filtered by subject.
    pub subject: Option<Subject>,
    pub courses: Vec<CourseSummary>,
}

/// Public course page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseDetail {
    pub course: Course,
    pub modules: Vec<Module>,
}

pub struct CatalogService<S: SubjectRepository, C: CourseRepository> {
    subjects: S,
    courses: C,
}

impl<S: SubjectRepository, C: CourseRepository> CatalogService<S, C> {
    pub fn new(subjects: S, courses: C) -> Self {
        Self { subjects, courses }
    }

    /// Builds the course list, filtered by subject slug when given.
    pub fn course_catalog(
        &self,
        subject_slug: Option<&str>,
    ) -> Result<CourseCatalog, CatalogServiceError> {
        let subject = match subject_slug {
            Some(slug) => Some(
                self.subjects
                    .get_subject_by_slug(slug)?
                    .ok_or_else(|| CatalogServiceError::SubjectNotFound(slug.to_string()))?,
            ),
            None => None,
        };

        let query = CourseListQuery {
            subject_slug: subject.as_ref().map(|subject| subject.slug.clone()),
            ..CourseListQuery::default()
        };
        Ok(CourseCatalog {
            subjects: self.subjects.list_subject_summaries()?,
            courses: self.courses.list_course_summaries(&query)?,
            subject,
        })
    }

    pub fn course_detail(&self, slug: &str) -> Result<CourseDetail, CatalogServiceError> {
        let course = self
            .courses
            .get_course_by_slug(slug)?
            .ok_or_else(|| CatalogServiceError::CourseNotFound(slug.to_string()))?;
        let modules = self.courses.list_modules(course.id)?;
        Ok(CourseDetail { course, modules })
    }
}
