//! Student registration, enrollment, and course browsing.
//!
//! # Invariants
//! - Course content is only visible to enrolled students.
//! - Without an explicit module, the course view opens the first module in
//!   display order.

use super::content_service::{resolve_contents, ContentEntry};
use crate::model::course::{Course, CourseId, Module, ModuleId};
use crate::model::user::{User, UserId};
use crate::model::validate::ValidationError;
use crate::repo::content_repo::ContentRepository;
use crate::repo::course_repo::CourseRepository;
use crate::repo::enrollment_repo::EnrollmentRepository;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum StudentServiceError {
    Validation(ValidationError),
    UsernameTaken(String),
    StudentNotFound(UserId),
    CourseNotFound(CourseId),
    ModuleNotFound(ModuleId),
    /// Student is not enrolled in the course.
    NotEnrolled {
        student_id: UserId,
        course_id: CourseId,
    },
    Repo(RepoError),
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::UsernameTaken(username) => write!(f, "username already taken: `{username}`"),
            Self::StudentNotFound(id) => write!(f, "student not found: {id}"),
            Self::CourseNotFound(id) => write!(f, "course not found: {id}"),
            Self::ModuleNotFound(id) => write!(f, "module not found: {id}"),
            Self::NotEnrolled {
                student_id,
                course_id,
            } => write!(f, "student {student_id} is not enrolled in course {course_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "course",
                id,
            } => Self::CourseNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// One module as shown to an enrolled student.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleView {
    pub course: Course,
    /// Every module of the course, for navigation.
    pub modules: Vec<Module>,
    /// Selected module; `None` when the course has no modules yet.
    pub module: Option<Module>,
    pub contents: Vec<ContentEntry>,
}

pub struct StudentService<U, C, T, E>
where
    U: UserRepository,
    C: CourseRepository,
    T: ContentRepository,
    E: EnrollmentRepository,
{
    users: U,
    courses: C,
    contents: T,
    enrollments: E,
}

impl<U, C, T, E> StudentService<U, C, T, E>
where
    U: UserRepository,
    C: CourseRepository,
    T: ContentRepository,
    E: EnrollmentRepository,
{
    pub fn new(users: U, courses: C, contents: T, enrollments: E) -> Self {
        Self {
            users,
            courses,
            contents,
            enrollments,
        }
    }

    /// Registers a new student account.
    pub fn register_student(
        &self,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Result<User, StudentServiceError> {
        let user = User::new(username, email);
        user.validate().map_err(StudentServiceError::Validation)?;
        if self.users.find_by_username(&user.username)?.is_some() {
            return Err(StudentServiceError::UsernameTaken(
                user.username.trim().to_string(),
            ));
        }
        let id = self.users.create_user(&user)?;
        let stored = self
            .users
            .get_user(id)?
            .ok_or(StudentServiceError::StudentNotFound(id))?;
        info!(
            "event=student_register module=service status=ok user_id={}",
            stored.id
        );
        Ok(stored)
    }

    /// Enrolls a student. Returns `false` when they were already enrolled.
    pub fn enroll(
        &self,
        student_id: UserId,
        course_id: CourseId,
    ) -> Result<bool, StudentServiceError> {
        self.ensure_student(student_id)?;
        let enrolled = self.enrollments.enroll(course_id, student_id)?;
        info!(
            "event=course_enroll module=service status=ok course_id={} new={}",
            course_id, enrolled
        );
        Ok(enrolled)
    }

    /// Courses the student is enrolled in, most recent enrollment first.
    pub fn enrolled_courses(&self, student_id: UserId) -> Result<Vec<Course>, StudentServiceError> {
        self.ensure_student(student_id)?;
        let mut courses = Vec::new();
        for course_id in self.enrollments.list_student_course_ids(student_id)? {
            if let Some(course) = self.courses.get_course(course_id)? {
                courses.push(course);
            }
        }
        Ok(courses)
    }

    /// Students enrolled in a course owned by `owner_id`, earliest first.
    ///
    /// Courses owned by another instructor are reported as not found.
    pub fn course_students(
        &self,
        owner_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<User>, StudentServiceError> {
        match self.courses.get_course(course_id)? {
            Some(course) if course.owner_id == owner_id => {}
            _ => return Err(StudentServiceError::CourseNotFound(course_id)),
        }
        let mut students = Vec::new();
        for student_id in self.enrollments.list_course_student_ids(course_id)? {
            if let Some(student) = self.users.get_user(student_id)? {
                students.push(student);
            }
        }
        Ok(students)
    }

    /// Opens one module of an enrolled course; the first one when `module_id`
    /// is `None`.
    pub fn module_view(
        &self,
        student_id: UserId,
        course_id: CourseId,
        module_id: Option<ModuleId>,
    ) -> Result<ModuleView, StudentServiceError> {
        let course = self
            .courses
            .get_course(course_id)?
            .ok_or(StudentServiceError::CourseNotFound(course_id))?;
        if !self.enrollments.is_enrolled(course_id, student_id)? {
            return Err(StudentServiceError::NotEnrolled {
                student_id,
                course_id,
            });
        }

        let modules = self.courses.list_modules(course_id)?;
        let module = match module_id {
            Some(module_id) => Some(
                modules
                    .iter()
                    .find(|module| module.id == module_id)
                    .cloned()
                    .ok_or(StudentServiceError::ModuleNotFound(module_id))?,
            ),
            None => modules.first().cloned(),
        };
        let contents = match &module {
            Some(module) => resolve_contents(&self.contents, module.id)?,
            None => Vec::new(),
        };

        Ok(ModuleView {
            course,
            modules,
            module,
            contents,
        })
    }

    fn ensure_student(&self, student_id: UserId) -> Result<(), StudentServiceError> {
        self.users
            .get_user(student_id)?
            .map(|_| ())
            .ok_or(StudentServiceError::StudentNotFound(student_id))
    }
}
