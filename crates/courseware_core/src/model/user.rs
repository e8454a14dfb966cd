//! Platform user identity record.
//!
//! Authentication and group membership live outside the core; this record only
//! carries the identity other records point at (course owners, item owners,
//! enrolled students).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::validate::{validate_required, ValidationError};

pub type UserId = Uuid;

const USERNAME_MAX_CHARS: usize = 150;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

impl User {
    /// Creates a user with a generated stable ID.
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_required("username", &self.username, USERNAME_MAX_CHARS)
    }
}
