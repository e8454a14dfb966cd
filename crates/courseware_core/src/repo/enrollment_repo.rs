//! Student enrollment persistence.
//!
//! # Invariants
//! - A student is enrolled at most once per course; re-enrolling is a no-op.
//! - Enrolled courses list newest enrollment first.

use super::{parse_uuid, RepoError, RepoResult};
use crate::model::course::CourseId;
use crate::model::user::UserId;
use rusqlite::{params, Connection};

pub trait EnrollmentRepository {
    /// Enrolls a student. Returns `false` when already enrolled.
    fn enroll(&self, course_id: CourseId, student_id: UserId) -> RepoResult<bool>;
    fn is_enrolled(&self, course_id: CourseId, student_id: UserId) -> RepoResult<bool>;
    fn list_student_course_ids(&self, student_id: UserId) -> RepoResult<Vec<CourseId>>;
    fn list_course_student_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>>;
}

/// SQLite-backed enrollment repository.
pub struct SqliteEnrollmentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEnrollmentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl EnrollmentRepository for SqliteEnrollmentRepository<'_> {
    fn enroll(&self, course_id: CourseId, student_id: UserId) -> RepoResult<bool> {
        let course_exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1);",
            [course_id.to_string()],
            |row| row.get(0),
        )?;
        if course_exists == 0 {
            return Err(RepoError::NotFound {
                entity: "course",
                id: course_id,
            });
        }

        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO course_students (course_id, student_id) VALUES (?1, ?2);",
            params![course_id.to_string(), student_id.to_string()],
        )?;
        Ok(inserted == 1)
    }

    fn is_enrolled(&self, course_id: CourseId, student_id: UserId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM course_students
                WHERE course_id = ?1
                  AND student_id = ?2
            );",
            params![course_id.to_string(), student_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_student_course_ids(&self, student_id: UserId) -> RepoResult<Vec<CourseId>> {
        let mut stmt = self.conn.prepare(
            "SELECT course_id
             FROM course_students
             WHERE student_id = ?1
             ORDER BY created_at DESC, rowid DESC;",
        )?;
        let mut rows = stmt.query([student_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "course_students.course_id")?);
        }
        Ok(ids)
    }

    fn list_course_student_ids(&self, course_id: CourseId) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT student_id
             FROM course_students
             WHERE course_id = ?1
             ORDER BY created_at ASC, rowid ASC;",
        )?;
        let mut rows = stmt.query([course_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(parse_uuid(&value, "course_students.student_id")?);
        }
        Ok(ids)
    }
}
