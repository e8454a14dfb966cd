//! User identity persistence.

use super::{parse_uuid, RepoResult};
use crate::model::user::{User, UserId};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub trait UserRepository {
    fn create_user(&self, user: &User) -> RepoResult<UserId>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, user: &User) -> RepoResult<UserId> {
        user.validate()?;
        self.conn.execute(
            "INSERT INTO users (id, username, email) VALUES (?1, ?2, ?3);",
            params![user.id.to_string(), user.username.trim(), user.email.trim()],
        )?;
        Ok(user.id)
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, email FROM users WHERE id = ?1;",
                [id.to_string()],
                read_user_columns,
            )
            .optional()?
            .map(into_user)
            .transpose()
    }

    fn find_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.conn
            .query_row(
                "SELECT id, username, email FROM users WHERE username = ?1;",
                [username.trim()],
                read_user_columns,
            )
            .optional()?
            .map(into_user)
            .transpose()
    }
}

type UserColumns = (String, String, String);

fn read_user_columns(row: &Row<'_>) -> rusqlite::Result<UserColumns> {
    Ok((row.get("id")?, row.get("username")?, row.get("email")?))
}

fn into_user((id, username, email): UserColumns) -> RepoResult<User> {
    Ok(User {
        id: parse_uuid(&id, "users.id")?,
        username,
        email,
    })
}
