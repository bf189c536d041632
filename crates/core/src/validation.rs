//! Client-side form validation.
//!
//! These checks run before any request is issued and only exist to save a
//! round-trip on obviously malformed input. The backend stays authoritative:
//! passing here never means the server will accept the value.
//!
//! The login form and the admin user form deliberately use different rules
//! (the login form accepts any existing username shape, while new accounts are
//! restricted to letters only).

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LOGIN_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9._-]{4,20}$").expect("valid regex"));
static LOGIN_PASSWORD_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]").expect("valid regex"));
static LOGIN_PASSWORD_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[!@#$%^&*]").expect("valid regex"));

static FORM_USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{4,}$").expect("valid regex"));
static FORM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]+$").expect("valid regex"));
static FORM_EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"));
static FORM_PASSWORD_CHARSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9@$!%*#?&]{6,}$").expect("valid regex"));
static FORM_PASSWORD_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]").expect("valid regex"));
static FORM_PASSWORD_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]").expect("valid regex"));
static FORM_PASSWORD_SPECIAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[@$!%*#?&]").expect("valid regex"));

/// A validated form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Username,
    Password,
    FirstName,
    LastName,
    Email,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Password => "password",
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::Email => "email",
        }
    }
}

impl core::fmt::Display for Field {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, at most one per field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    /// Replace the message for `field`, or clear it when `message` is `None`.
    pub fn set(&mut self, field: Field, message: Option<String>) {
        match message {
            Some(message) => {
                self.0.insert(field, message);
            }
            None => {
                self.0.remove(&field);
            }
        }
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, msg)| (*field, msg.as_str()))
    }

    /// `Ok(())` when no field failed.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login form
// ─────────────────────────────────────────────────────────────────────────────

/// Raw login form values.
#[derive(Debug, Clone, Copy)]
pub struct LoginInput<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Validate a single login field (used for live, per-keystroke feedback).
///
/// Fields that do not belong to the login form always pass.
pub fn validate_login_field(field: Field, value: &str) -> Option<String> {
    match field {
        Field::Username => {
            if value.trim().is_empty() {
                Some("Username is required.".to_string())
            } else if !LOGIN_USERNAME.is_match(value) {
                Some("Username must be 4-20 characters, alphanumeric, _ or .".to_string())
            } else {
                None
            }
        }
        Field::Password => {
            if value.is_empty() {
                Some("Password is required.".to_string())
            } else if value.chars().count() < 6
                || !LOGIN_PASSWORD_DIGIT.is_match(value)
                || !LOGIN_PASSWORD_SPECIAL.is_match(value)
            {
                Some(
                    "Password must be at least 6 chars with a number and special char."
                        .to_string(),
                )
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Validate the whole login form.
pub fn validate_login(input: LoginInput<'_>) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    errors.set(Field::Username, validate_login_field(Field::Username, input.username));
    errors.set(Field::Password, validate_login_field(Field::Password, input.password));
    errors.into_result()
}

// ─────────────────────────────────────────────────────────────────────────────
// Admin user form
// ─────────────────────────────────────────────────────────────────────────────

/// Whether the admin form creates a new account or edits an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormMode {
    Create,
    Edit,
}

/// Raw admin user form values.
#[derive(Debug, Clone, Copy)]
pub struct UserFormInput<'a> {
    pub username: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Validate the admin user form. The password is only checked on create.
pub fn validate_user_form(input: UserFormInput<'_>, mode: FormMode) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if input.username.trim().is_empty() {
        errors.insert(Field::Username, "Username is required");
    } else if !FORM_USERNAME.is_match(input.username) {
        errors.insert(
            Field::Username,
            "Username must be at least 4 letters and contain only alphabets",
        );
    }

    if input.first_name.trim().is_empty() {
        errors.insert(Field::FirstName, "First name is required");
    } else if !FORM_NAME.is_match(input.first_name) {
        errors.insert(Field::FirstName, "First name must contain only alphabets");
    }

    if input.last_name.trim().is_empty() {
        errors.insert(Field::LastName, "Last name is required");
    } else if !FORM_NAME.is_match(input.last_name) {
        errors.insert(Field::LastName, "Last name must contain only alphabets");
    }

    if input.email.trim().is_empty() {
        errors.insert(Field::Email, "Email is required");
    } else if !FORM_EMAIL.is_match(input.email) {
        errors.insert(Field::Email, "Invalid email format");
    }

    if mode == FormMode::Create {
        if input.password.is_empty() {
            errors.insert(Field::Password, "Password is required");
        } else if !is_strong_form_password(input.password) {
            errors.insert(
                Field::Password,
                "Password must be at least 6 characters and include letters, numbers, and special characters",
            );
        }
    }

    errors.into_result()
}

fn is_strong_form_password(password: &str) -> bool {
    FORM_PASSWORD_CHARSET.is_match(password)
        && FORM_PASSWORD_LETTER.is_match(password)
        && FORM_PASSWORD_DIGIT.is_match(password)
        && FORM_PASSWORD_SPECIAL.is_match(password)
}
