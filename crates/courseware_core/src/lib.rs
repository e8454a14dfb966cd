//! Core domain logic for the courseware platform.
//! Courses, ordered modules, polymorphic module contents, and enrollments.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::content::{
    Content, ContentId, ContentItem, ContentKind, ItemBody, ItemId, NewContent,
};
pub use model::course::{Course, CourseId, Module, ModuleId, NewModule, Subject, SubjectId};
pub use model::user::{User, UserId};
pub use model::validate::{slugify, ValidationError};
pub use repo::content_repo::{ContentRepository, SqliteContentRepository};
pub use repo::course_repo::{
    CourseListQuery, CourseRepository, CourseSummary, ModuleChange, SqliteCourseRepository,
};
pub use repo::enrollment_repo::{EnrollmentRepository, SqliteEnrollmentRepository};
pub use repo::order_field::{assign_position, OrderField, Ordered};
pub use repo::subject_repo::{SqliteSubjectRepository, SubjectRepository, SubjectSummary};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::catalog_service::{
    CatalogService, CatalogServiceError, CourseCatalog, CourseDetail,
};
pub use service::content_service::{
    ContentEntry, ContentService, ContentServiceError, ItemForm,
};
pub use service::course_service::{CourseForm, CourseService, CourseServiceError, ModuleForm};
pub use service::student_service::{ModuleView, StudentService, StudentServiceError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
