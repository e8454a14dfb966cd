//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into instructor, student, and catalog
//!   use-cases.
//! - Keep callers decoupled from storage details.
//!
//! # Invariants
//! - Records owned by another instructor behave as not found.

pub mod catalog_service;
pub mod content_service;
pub mod course_service;
pub mod student_service;
