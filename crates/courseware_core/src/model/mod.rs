//! Course-domain records.
//!
//! # Responsibility
//! - Define the data structures used by repositories and services.
//! - Validate user-supplied fields before they reach storage.
//!
//! # Invariants
//! - Every record is identified by a stable UUID.
//! - Records are storage-agnostic; SQL mapping lives in `repo`.

pub mod content;
pub mod course;
pub mod user;
pub mod validate;
