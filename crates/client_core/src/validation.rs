//! Field checks run by the add/edit dialogs before anything is sent.

use shared::domain::{Gender, YEAR_LEVELS};

use crate::error::ValidationError;

/// Largest avatar image accepted for upload.
pub const MAX_AVATAR_BYTES: usize = 5 * 1024 * 1024;

/// Code fields (college and program codes): ASCII letters only.
pub fn is_code(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic())
}

/// Name fields: letters and spaces, at least one letter.
pub fn is_name(value: &str) -> bool {
    value.chars().any(|c| c.is_ascii_alphabetic())
        && value
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

/// Student numbers are `YYYY-NNNN`.
pub fn is_student_id(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 9
        && bytes[4] == b'-'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit)
}

pub fn check_code(errors: &mut ValidationError, field: &'static str, value: &str) {
    if value.is_empty() {
        errors.push(field, "is required");
    } else if !is_code(value) {
        errors.push(field, "must contain letters only");
    }
}

pub fn check_name(errors: &mut ValidationError, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(field, "is required");
    } else if !is_name(value) {
        errors.push(field, "must contain letters and spaces only");
    }
}

pub fn check_student_id(errors: &mut ValidationError, value: &str) {
    if value.is_empty() {
        errors.push("student_id", "is required");
    } else if !is_student_id(value) {
        errors.push("student_id", "must look like YYYY-NNNN");
    }
}

pub fn check_year(errors: &mut ValidationError, year: u8) {
    if !YEAR_LEVELS.contains(&year) {
        errors.push("year", "must be between 1 and 4");
    }
}

pub fn check_gender(errors: &mut ValidationError, gender: &str) {
    if Gender::parse(gender).is_none() {
        errors.push("gender", "must be Male, Female or Other");
    }
}

pub fn check_avatar_size(errors: &mut ValidationError, size: usize) {
    if size > MAX_AVATAR_BYTES {
        errors.push(
            "avatar",
            "File is too large. Please select an image under 5MB.",
        );
    }
}
