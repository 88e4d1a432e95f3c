//! Request body parsing and field validation
//!
//! Bodies are decoded as loose JSON objects and checked field by field so
//! that every problem is reported at once, keyed by field name.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{ApiError, FieldErrors, push_field_error};
use crate::services::auth::{ProfileUpdate, RegisterInput};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const INVALID_INTEGER: &str = "A valid integer is required.";
pub const FUTURE_YEAR: &str = "Publication year cannot be in the future.";

pub const TITLE_MAX_LENGTH: usize = 300;
pub const AUTHOR_NAME_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const PASSWORD_MIN_LENGTH: usize = 8;

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w.@+-]+$").expect("valid regex"));
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid regex")
});

pub fn max_length_message(max: usize) -> String {
    format!("Ensure this field has no more than {} characters.", max)
}

pub fn unknown_pk_message(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

/// Name of a JSON value's type, as reported in type errors
fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Decode a request body into a JSON object. An empty body is an empty object.
pub fn parse_object(body: &[u8], message: &str) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }

    let mut errors = FieldErrors::new();
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => push_field_error(
            &mut errors,
            "non_field_errors",
            format!("Invalid data. Expected a dictionary, but got {}.", type_name(&other)),
        ),
        Err(e) => push_field_error(&mut errors, "non_field_errors", format!("JSON parse error - {}", e)),
    }
    Err(ApiError::validation(message, errors))
}

/// Whether a field must be present: always on create and full update, never on partial update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
}

/// Look a field up, reporting missing and null values
fn present<'a>(
    data: &'a Map<String, Value>,
    name: &str,
    presence: Presence,
    errors: &mut FieldErrors,
) -> Option<&'a Value> {
    match data.get(name) {
        None => {
            if presence == Presence::Required {
                push_field_error(errors, name, REQUIRED);
            }
            None
        }
        Some(Value::Null) => {
            push_field_error(errors, name, NOT_NULL);
            None
        }
        Some(value) => Some(value),
    }
}

/// A text field. Numbers are accepted and stringified. `trim` strips surrounding whitespace.
fn text_field(
    data: &Map<String, Value>,
    name: &str,
    presence: Presence,
    trim: bool,
    max_length: Option<usize>,
    errors: &mut FieldErrors,
) -> Option<String> {
    let raw = match present(data, name, presence, errors)? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => {
            push_field_error(errors, name, NOT_A_STRING);
            return None;
        }
    };

    let text = if trim { raw.trim().to_string() } else { raw };
    if text.is_empty() {
        push_field_error(errors, name, NOT_BLANK);
        return None;
    }
    if let Some(max) = max_length
        && text.chars().count() > max
    {
        push_field_error(errors, name, max_length_message(max));
        return None;
    }
    Some(text)
}

/// Parse an integer from a JSON number or a numeric string; `1999.0` and `"1999.0"` count.
fn as_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 1e15).map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            let s = match s.split_once('.') {
                Some((whole, zeros)) if zeros.chars().all(|c| c == '0') => whole,
                _ => s,
            };
            s.parse().ok()
        }
        _ => None,
    }
}

fn integer_field(
    data: &Map<String, Value>,
    name: &str,
    presence: Presence,
    errors: &mut FieldErrors,
) -> Option<i64> {
    let value = present(data, name, presence, errors)?;
    let parsed = as_integer(value);
    if parsed.is_none() {
        push_field_error(errors, name, INVALID_INTEGER);
    }
    parsed
}

/// A reference by primary key. Existence is checked by the caller.
fn pk_field(
    data: &Map<String, Value>,
    name: &str,
    presence: Presence,
    errors: &mut FieldErrors,
) -> Option<i64> {
    let value = present(data, name, presence, errors)?;
    let parsed = as_integer(value);
    if parsed.is_none() {
        push_field_error(
            errors,
            name,
            format!("Incorrect type. Expected pk value, received {}.", type_name(value)),
        );
    }
    parsed
}

// ============================================================================
// Catalog payloads
// ============================================================================

/// Book fields from a create or update body; `None` means absent or invalid
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookInput {
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author_id: Option<i64>,
}

/// Check a book body's fields. Author existence is left to the caller.
pub fn book_fields(
    data: &Map<String, Value>,
    presence: Presence,
    current_year: i32,
) -> (BookInput, FieldErrors) {
    let mut errors = FieldErrors::new();

    let title = text_field(data, "title", presence, true, Some(TITLE_MAX_LENGTH), &mut errors);

    let publication_year = match integer_field(data, "publication_year", presence, &mut errors) {
        None => None,
        Some(year) => match i32::try_from(year) {
            Err(_) => {
                push_field_error(&mut errors, "publication_year", INVALID_INTEGER);
                None
            }
            Ok(year) if year > current_year => {
                push_field_error(&mut errors, "publication_year", FUTURE_YEAR);
                None
            }
            Ok(year) => Some(year),
        },
    };

    let author_id = pk_field(data, "author", presence, &mut errors);

    (
        BookInput {
            title,
            publication_year,
            author_id,
        },
        errors,
    )
}

/// Check an author body's `name`
pub fn author_fields(data: &Map<String, Value>, presence: Presence) -> (Option<String>, FieldErrors) {
    let mut errors = FieldErrors::new();
    let name = text_field(data, "name", presence, true, Some(AUTHOR_NAME_MAX_LENGTH), &mut errors);
    (name, errors)
}

// ============================================================================
// Account payloads
// ============================================================================

fn username_field(data: &Map<String, Value>, presence: Presence, errors: &mut FieldErrors) -> Option<String> {
    let username = text_field(data, "username", presence, true, Some(USERNAME_MAX_LENGTH), errors)?;
    if !USERNAME_RE.is_match(&username) {
        push_field_error(
            errors,
            "username",
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
        );
        return None;
    }
    Some(username)
}

fn email_field(data: &Map<String, Value>, presence: Presence, errors: &mut FieldErrors) -> Option<String> {
    let email = text_field(data, "email", presence, true, Some(254), errors)?;
    if !EMAIL_RE.is_match(&email) {
        push_field_error(errors, "email", "Enter a valid email address.");
        return None;
    }
    Some(email)
}

fn new_password_field(
    data: &Map<String, Value>,
    name: &str,
    errors: &mut FieldErrors,
) -> Option<String> {
    let password = text_field(data, name, Presence::Required, false, None, errors)?;
    if password.chars().count() < PASSWORD_MIN_LENGTH {
        push_field_error(
            errors,
            name,
            format!(
                "This password is too short. It must contain at least {} characters.",
                PASSWORD_MIN_LENGTH
            ),
        );
        return None;
    }
    Some(password)
}

pub fn register_fields(data: &Map<String, Value>) -> Result<RegisterInput, FieldErrors> {
    let mut errors = FieldErrors::new();

    let username = username_field(data, Presence::Required, &mut errors);
    let email = email_field(data, Presence::Required, &mut errors);
    let password = new_password_field(data, "password", &mut errors);
    let confirm = text_field(data, "password_confirm", Presence::Required, false, None, &mut errors);

    if let (Some(password), Some(confirm)) = (&password, &confirm)
        && password != confirm
    {
        push_field_error(&mut errors, "password_confirm", "Password fields didn't match.");
    }

    match (username, email, password) {
        (Some(username), Some(email), Some(password)) if errors.is_empty() => Ok(RegisterInput {
            username,
            email,
            password,
        }),
        _ => Err(errors),
    }
}

/// `(username_or_email, password)`
pub fn login_fields(data: &Map<String, Value>) -> Result<(String, String), FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = text_field(data, "username", Presence::Required, true, None, &mut errors);
    let password = text_field(data, "password", Presence::Required, false, None, &mut errors);
    match (username, password) {
        (Some(username), Some(password)) => Ok((username, password)),
        _ => Err(errors),
    }
}

pub fn profile_fields(data: &Map<String, Value>) -> Result<ProfileUpdate, FieldErrors> {
    let mut errors = FieldErrors::new();
    let username = username_field(data, Presence::Optional, &mut errors);
    let email = email_field(data, Presence::Optional, &mut errors);
    if errors.is_empty() {
        Ok(ProfileUpdate { username, email })
    } else {
        Err(errors)
    }
}

/// `(current_password, new_password)`
pub fn password_change_fields(data: &Map<String, Value>) -> Result<(String, String), FieldErrors> {
    let mut errors = FieldErrors::new();
    let current = text_field(data, "current_password", Presence::Required, false, None, &mut errors);
    let new = new_password_field(data, "new_password", &mut errors);
    match (current, new) {
        (Some(current), Some(new)) => Ok((current, new)),
        _ => Err(errors),
    }
}
