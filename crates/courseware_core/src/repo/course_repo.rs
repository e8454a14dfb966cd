//! Course and module persistence.
//!
//! # Responsibility
//! - Provide CRUD APIs over `courses` and `modules`.
//! - Run automatic module positioning inside the insert transaction.
//!
//! # Invariants
//! - Courses list newest first (`created_at DESC`, insertion order on ties).
//! - Modules list by `position ASC, id ASC`.
//! - Module updates never touch `position`; only explicit repositioning does.
//! - Deleting a course or module also deletes the content items its cascaded
//!   entries pointed at, unless another entry still refers to them.

use super::content_repo::{delete_unreferenced_items, module_item_refs};
use super::order_field::{assign_position, OrderField, Ordered};
use super::{parse_uuid, RepoError, RepoResult};
use crate::model::course::{Course, CourseId, Module, ModuleId, NewModule};
use crate::model::user::UserId;
use crate::model::validate::{validate_required, TITLE_MAX_CHARS};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};

const COURSE_SELECT_SQL: &str = "SELECT
    c.id AS id,
    c.owner_id AS owner_id,
    c.subject_id AS subject_id,
    c.title AS title,
    c.slug AS slug,
    c.overview AS overview,
    c.created_at AS created_at
FROM courses c";

const MODULE_SELECT_SQL: &str = "SELECT
    id,
    course_id,
    position,
    title,
    description
FROM modules";

/// Module positions are scoped per course.
pub const MODULE_ORDER: OrderField = OrderField::new("modules", "position", &["course_id"]);

impl Ordered for NewModule {
    const ORDER_FIELD: OrderField = MODULE_ORDER;

    fn scope_values(&self) -> Vec<Value> {
        vec![Value::Text(self.course_id.to_string())]
    }

    fn position(&self) -> Option<i64> {
        self.position
    }

    fn set_position(&mut self, position: i64) {
        self.position = Some(position);
    }
}

/// Filters for listing courses.
#[derive(Debug, Clone, Default)]
pub struct CourseListQuery {
    pub owner_id: Option<UserId>,
    pub subject_slug: Option<String>,
}

/// Course with its module count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub course: Course,
    pub total_modules: u32,
}

/// One edit inside a module formset submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleChange {
    Create(NewModule),
    /// New title and description for an existing module.
    Update {
        id: ModuleId,
        title: String,
        description: String,
    },
    Delete(ModuleId),
}

/// Repository interface for course and module operations.
pub trait CourseRepository {
    fn create_course(&self, course: &Course) -> RepoResult<Course>;
    fn update_course(&self, course: &Course) -> RepoResult<()>;
    fn delete_course(&self, id: CourseId) -> RepoResult<()>;
    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>>;
    fn get_course_by_slug(&self, slug: &str) -> RepoResult<Option<Course>>;
    fn list_courses(&self, query: &CourseListQuery) -> RepoResult<Vec<Course>>;
    fn list_course_summaries(&self, query: &CourseListQuery) -> RepoResult<Vec<CourseSummary>>;

    /// Inserts a module, assigning the next course-scoped position when unset.
    fn create_module(&self, draft: &mut NewModule) -> RepoResult<Module>;
    /// Updates title and description. The stored position is left as is.
    fn update_module(&self, module: &Module) -> RepoResult<()>;
    fn delete_module(&self, id: ModuleId) -> RepoResult<()>;
    fn get_module(&self, id: ModuleId) -> RepoResult<Option<Module>>;
    fn list_modules(&self, course_id: CourseId) -> RepoResult<Vec<Module>>;
    /// Applies creates, updates, and deletes for one course atomically.
    fn apply_module_changes(
        &self,
        course_id: CourseId,
        changes: &mut [ModuleChange],
    ) -> RepoResult<Vec<Module>>;
    /// Writes explicit positions for modules of one course.
    fn set_module_positions(
        &self,
        course_id: CourseId,
        positions: &[(ModuleId, i64)],
    ) -> RepoResult<()>;
}

/// SQLite-backed course repository.
pub struct SqliteCourseRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCourseRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CourseRepository for SqliteCourseRepository<'_> {
    fn create_course(&self, course: &Course) -> RepoResult<Course> {
        course.validate()?;
        self.conn.execute(
            "INSERT INTO courses (id, owner_id, subject_id, title, slug, overview)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                course.id.to_string(),
                course.owner_id.to_string(),
                course.subject_id.to_string(),
                course.title.trim(),
                course.slug.as_str(),
                course.overview.as_str(),
            ],
        )?;
        load_required_course(self.conn, course.id)
    }

    fn update_course(&self, course: &Course) -> RepoResult<()> {
        course.validate()?;
        let changed = self.conn.execute(
            "UPDATE courses
             SET subject_id = ?2,
                 title = ?3,
                 slug = ?4,
                 overview = ?5
             WHERE id = ?1;",
            params![
                course.id.to_string(),
                course.subject_id.to_string(),
                course.title.trim(),
                course.slug.as_str(),
                course.overview.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "course",
                id: course.id,
            });
        }
        Ok(())
    }

    fn delete_course(&self, id: CourseId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let refs = module_item_refs(&tx, "course_id", id)?;
        let changed = tx.execute("DELETE FROM courses WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "course",
                id,
            });
        }
        delete_unreferenced_items(&tx, &refs)?;
        tx.commit()?;
        Ok(())
    }

    fn get_course(&self, id: CourseId) -> RepoResult<Option<Course>> {
        query_one_course(self.conn, "c.id", id.to_string().as_str())
    }

    fn get_course_by_slug(&self, slug: &str) -> RepoResult<Option<Course>> {
        query_one_course(self.conn, "c.slug", slug)
    }

    fn list_courses(&self, query: &CourseListQuery) -> RepoResult<Vec<Course>> {
        Ok(self
            .list_course_summaries(query)?
            .into_iter()
            .map(|summary| summary.course)
            .collect())
    }

    fn list_course_summaries(&self, query: &CourseListQuery) -> RepoResult<Vec<CourseSummary>> {
        let mut sql = "SELECT
                c.id AS id,
                c.owner_id AS owner_id,
                c.subject_id AS subject_id,
                c.title AS title,
                c.slug AS slug,
                c.overview AS overview,
                c.created_at AS created_at,
                (SELECT COUNT(*) FROM modules m WHERE m.course_id = c.id) AS total_modules
             FROM courses c
             INNER JOIN subjects s ON s.id = c.subject_id
             WHERE 1 = 1"
            .to_string();
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(owner_id) = query.owner_id {
            sql.push_str(" AND c.owner_id = ?");
            bind_values.push(Value::Text(owner_id.to_string()));
        }
        if let Some(subject_slug) = &query.subject_slug {
            sql.push_str(" AND s.slug = ?");
            bind_values.push(Value::Text(subject_slug.clone()));
        }
        sql.push_str(" ORDER BY c.created_at DESC, c.rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut summaries = Vec::new();
        while let Some(row) = rows.next()? {
            summaries.push(CourseSummary {
                course: parse_course_row(row)?,
                total_modules: row.get("total_modules")?,
            });
        }
        Ok(summaries)
    }

    fn create_module(&self, draft: &mut NewModule) -> RepoResult<Module> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let module = insert_module(&tx, draft)?;
        tx.commit()?;
        Ok(module)
    }

    fn update_module(&self, module: &Module) -> RepoResult<()> {
        module.validate()?;
        let changed = self.conn.execute(
            "UPDATE modules
             SET title = ?2,
                 description = ?3
             WHERE id = ?1;",
            params![
                module.id.to_string(),
                module.title.trim(),
                module.description.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "module",
                id: module.id,
            });
        }
        Ok(())
    }

    fn delete_module(&self, id: ModuleId) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let refs = module_item_refs(&tx, "id", id)?;
        let changed = tx.execute("DELETE FROM modules WHERE id = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: "module",
                id,
            });
        }
        delete_unreferenced_items(&tx, &refs)?;
        tx.commit()?;
        Ok(())
    }

    fn get_module(&self, id: ModuleId) -> RepoResult<Option<Module>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{MODULE_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_module_row(row)?));
        }
        Ok(None)
    }

    fn list_modules(&self, course_id: CourseId) -> RepoResult<Vec<Module>> {
        list_modules_in(self.conn, course_id)
    }

    fn apply_module_changes(
        &self,
        course_id: CourseId,
        changes: &mut [ModuleChange],
    ) -> RepoResult<Vec<Module>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        ensure_course_exists(&tx, course_id)?;

        for change in changes.iter_mut() {
            match change {
                ModuleChange::Create(draft) => {
                    draft.course_id = course_id;
                    insert_module(&tx, draft)?;
                }
                ModuleChange::Update {
                    id,
                    title,
                    description,
                } => {
                    validate_required("title", title, TITLE_MAX_CHARS)?;
                    let changed = tx.execute(
                        "UPDATE modules
                         SET title = ?3,
                             description = ?4
                         WHERE id = ?1
                           AND course_id = ?2;",
                        params![
                            id.to_string(),
                            course_id.to_string(),
                            title.trim(),
                            description.as_str(),
                        ],
                    )?;
                    if changed == 0 {
                        return Err(RepoError::NotFound {
                            entity: "module",
                            id: *id,
                        });
                    }
                }
                ModuleChange::Delete(module_id) => {
                    let refs = module_item_refs(&tx, "id", *module_id)?;
                    let changed = tx.execute(
                        "DELETE FROM modules WHERE id = ?1 AND course_id = ?2;",
                        params![module_id.to_string(), course_id.to_string()],
                    )?;
                    if changed == 0 {
                        return Err(RepoError::NotFound {
                            entity: "module",
                            id: *module_id,
                        });
                    }
                    delete_unreferenced_items(&tx, &refs)?;
                }
            }
        }

        let modules = list_modules_in(&tx, course_id)?;
        tx.commit()?;
        Ok(modules)
    }

    fn set_module_positions(
        &self,
        course_id: CourseId,
        positions: &[(ModuleId, i64)],
    ) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for (module_id, position) in positions {
            let changed = tx.execute(
                "UPDATE modules
                 SET position = ?3
                 WHERE id = ?1
                   AND course_id = ?2;",
                params![module_id.to_string(), course_id.to_string(), position],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: "module",
                    id: *module_id,
                });
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_module(conn: &Connection, draft: &mut NewModule) -> RepoResult<Module> {
    draft.validate()?;
    ensure_course_exists(conn, draft.course_id)?;
    let position = assign_position(conn, draft)?;

    conn.execute(
        "INSERT INTO modules (id, course_id, position, title, description)
         VALUES (?1, ?2, ?3, ?4, ?5);",
        params![
            draft.id.to_string(),
            draft.course_id.to_string(),
            position,
            draft.title.trim(),
            draft.description.as_str(),
        ],
    )?;

    Ok(Module {
        id: draft.id,
        course_id: draft.course_id,
        position,
        title: draft.title.trim().to_string(),
        description: draft.description.clone(),
    })
}

fn list_modules_in(conn: &Connection, course_id: CourseId) -> RepoResult<Vec<Module>> {
    let mut stmt = conn.prepare(&format!(
        "{MODULE_SELECT_SQL}
         WHERE course_id = ?1
         ORDER BY position ASC, id ASC;"
    ))?;
    let mut rows = stmt.query([course_id.to_string()])?;
    let mut modules = Vec::new();
    while let Some(row) = rows.next()? {
        modules.push(parse_module_row(row)?);
    }
    Ok(modules)
}

fn ensure_course_exists(conn: &Connection, course_id: CourseId) -> RepoResult<()> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM courses WHERE id = ?1);",
        [course_id.to_string()],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Err(RepoError::NotFound {
            entity: "course",
            id: course_id,
        });
    }
    Ok(())
}

fn query_one_course(
    conn: &Connection,
    column: &'static str,
    value: &str,
) -> RepoResult<Option<Course>> {
    let mut stmt = conn.prepare(&format!("{COURSE_SELECT_SQL} WHERE {column} = ?1;"))?;
    let mut rows = stmt.query([value])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_course_row(row)?));
    }
    Ok(None)
}

fn load_required_course(conn: &Connection, id: CourseId) -> RepoResult<Course> {
    query_one_course(conn, "c.id", id.to_string().as_str())?.ok_or(RepoError::NotFound {
        entity: "course",
        id,
    })
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<Course> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    let subject_id: String = row.get("subject_id")?;
    Ok(Course {
        id: parse_uuid(&id, "courses.id")?,
        owner_id: parse_uuid(&owner_id, "courses.owner_id")?,
        subject_id: parse_uuid(&subject_id, "courses.subject_id")?,
        title: row.get("title")?,
        slug: row.get("slug")?,
        overview: row.get("overview")?,
        created_at: row.get("created_at")?,
    })
}

fn parse_module_row(row: &Row<'_>) -> RepoResult<Module> {
    let id: String = row.get("id")?;
    let course_id: String = row.get("course_id")?;
    Ok(Module {
        id: parse_uuid(&id, "modules.id")?,
        course_id: parse_uuid(&course_id, "modules.course_id")?,
        position: row.get("position")?,
        title: row.get("title")?,
        description: row.get("description")?,
    })
}
