//! Field-level validation shared by course and content records.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Maximum length of subject, course, and module titles.
pub const TITLE_MAX_CHARS: usize = 200;
/// Maximum length of content item titles.
pub const ITEM_TITLE_MAX_CHARS: usize = 250;
/// Maximum length of subject and course slugs.
pub const SLUG_MAX_CHARS: usize = 200;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-a-zA-Z0-9_]+$").expect("valid slug regex"));
static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("valid url regex"));
static SLUGIFY_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s-]").expect("valid slugify regex"));
static SLUGIFY_DASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-\s]+").expect("valid slugify dash regex"));

/// Validation failures for user-supplied record fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is blank after trim.
    Blank(&'static str),
    /// Field exceeds its maximum character count.
    TooLong { field: &'static str, max: usize },
    /// Slug contains characters outside `[-a-zA-Z0-9_]`.
    InvalidSlug(String),
    /// Video URL is not an absolute http(s) URL.
    InvalidUrl(String),
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::TooLong { field, max } => {
                write!(f, "{field} must be at most {max} characters")
            }
            Self::InvalidSlug(value) => write!(f, "invalid slug `{value}`"),
            Self::InvalidUrl(value) => write!(f, "invalid url `{value}`"),
        }
    }
}

impl Error for ValidationError {}

/// Checks a required, length-bounded text field.
pub fn validate_required(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Blank(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Checks a slug field: non-blank, bounded, `[-a-zA-Z0-9_]+`.
pub fn validate_slug(value: &str) -> Result<(), ValidationError> {
    validate_required("slug", value, SLUG_MAX_CHARS)?;
    if !SLUG_RE.is_match(value) {
        return Err(ValidationError::InvalidSlug(value.to_string()));
    }
    Ok(())
}

/// Checks an absolute http(s) URL.
pub fn validate_url(value: &str) -> Result<(), ValidationError> {
    validate_required("url", value, usize::MAX)?;
    if !URL_RE.is_match(value.trim()) {
        return Err(ValidationError::InvalidUrl(value.to_string()));
    }
    Ok(())
}

/// Derives a slug from a title: lowercase, punctuation stripped, runs of
/// whitespace and dashes collapsed into one dash.
pub fn slugify(value: &str) -> String {
    let lowered = value.to_lowercase();
    let stripped = SLUGIFY_STRIP_RE.replace_all(lowered.trim(), "");
    SLUGIFY_DASH_RE
        .replace_all(stripped.as_ref(), "-")
        .trim_matches(|c| c == '-' || c == '_')
        .to_string()
}
