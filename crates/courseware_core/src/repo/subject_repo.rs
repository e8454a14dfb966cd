//! Subject catalog persistence.
//!
//! # Invariants
//! - Subjects are listed by `title ASC`.

use super::{parse_uuid, RepoResult};
use crate::model::course::{Subject, SubjectId};
use rusqlite::{params, Connection, Row};

/// Subject with the number of courses filed under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectSummary {
    pub subject: Subject,
    pub total_courses: u32,
}

pub trait SubjectRepository {
    fn create_subject(&self, subject: &Subject) -> RepoResult<SubjectId>;
    fn get_subject_by_slug(&self, slug: &str) -> RepoResult<Option<Subject>>;
    fn list_subject_summaries(&self) -> RepoResult<Vec<SubjectSummary>>;
}

/// SQLite-backed subject repository.
pub struct SqliteSubjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSubjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl SubjectRepository for SqliteSubjectRepository<'_> {
    fn create_subject(&self, subject: &Subject) -> RepoResult<SubjectId> {
        subject.validate()?;
        self.conn.execute(
            "INSERT INTO subjects (id, title, slug) VALUES (?1, ?2, ?3);",
            params![
                subject.id.to_string(),
                subject.title.trim(),
                subject.slug.as_str()
            ],
        )?;
        Ok(subject.id)
    }

    fn get_subject_by_slug(&self, slug: &str) -> RepoResult<Option<Subject>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, slug FROM subjects WHERE slug = ?1;")?;
        let mut rows = stmt.query([slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_subject_row(row)?));
        }
        Ok(None)
    }

    fn list_subject_summaries(&self) -> RepoResult<Vec<SubjectSummary>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                s.id AS id,
                s.title AS title,
                s.slug AS slug,
                COUNT(c.id) AS total_courses
             FROM subjects s
             LEFT JOIN courses c ON c.subject_id = s.id
             GROUP BY s.id
             ORDER BY s.title ASC, s.id ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(SubjectSummary {
                subject: parse_subject_row(row)?,
                total_courses: row.get("total_courses")?,
            });
        }
        Ok(summaries)
    }
}

fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    let id: String = row.get("id")?;
    Ok(Subject {
        id: parse_uuid(&id, "subjects.id")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
    })
}
