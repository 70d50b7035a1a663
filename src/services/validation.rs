//! Form validation
//!
//! Synchronous field checks run before any request is sent. Each form returns
//! a map from field name to message; an empty map means the form may be
//! submitted.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::models::{MAX_OPTIONS, MIN_OPTIONS};
use crate::services::api::Upload;
use crate::services::content;
use crate::services::quiz::QuizDraft;

pub const TITLE_MIN_LEN: usize = 3;
pub const DESCRIPTION_MIN_LEN: usize = 8;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const QUESTION_MIN_LEN: usize = 3;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const NAME_MIN_LEN: usize = 3;

/// Field-level messages keyed by field path (`title`, `quizzes[0].options[1]`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_insert_with(|| message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<String> = self
            .0
            .iter()
            .map(|(field, message)| format!("{}: {}", field, message))
            .collect();
        write!(f, "{}", joined.join("; "))
    }
}

fn char_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern")
    })
}

pub fn is_valid_email(value: &str) -> bool {
    email_pattern().is_match(value.trim())
}

/// Links accepted for a resource: supported video hosts or any http(s) URL
pub fn is_valid_link(value: &str) -> bool {
    let value = value.trim();
    content::is_video_link(value)
        || reqwest::Url::parse(value)
            .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
            .unwrap_or(false)
}

// ==================== Resource form ====================

/// Where the resource content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Uploaded file, `None` keeps the current one on update
    File(Option<Upload>),
    Link(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceForm {
    pub title: String,
    pub subcategory_id: Option<String>,
    pub description: String,
    pub source: ContentSource,
    pub quizzes: Vec<QuizDraft>,
}

pub fn validate_quiz(index: usize, draft: &QuizDraft, errors: &mut FieldErrors) {
    let prefix = format!("quizzes[{}]", index);

    if char_len(&draft.question) < QUESTION_MIN_LEN {
        errors.add(
            format!("{}.question", prefix),
            format!("The question needs at least {} characters", QUESTION_MIN_LEN),
        );
    }

    let options = draft.options();
    if options.len() < MIN_OPTIONS || options.len() > MAX_OPTIONS {
        errors.add(
            format!("{}.options", prefix),
            format!("Between {} and {} options are required", MIN_OPTIONS, MAX_OPTIONS),
        );
    }
    for (i, option) in options.iter().enumerate() {
        if option.trim().is_empty() {
            errors.add(
                format!("{}.options[{}]", prefix, i),
                "The option cannot be empty",
            );
        }
    }

    if draft.correct_answer.is_empty() || !options.contains(&draft.correct_answer) {
        errors.add(
            format!("{}.correctAnswer", prefix),
            "Select the correct answer among the options",
        );
    }
}

pub fn validate_resource(form: &ResourceForm) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if char_len(&form.title) < TITLE_MIN_LEN {
        errors.add(
            "title",
            format!("The title needs at least {} characters", TITLE_MIN_LEN),
        );
    }

    let description_len = char_len(&form.description);
    if description_len < DESCRIPTION_MIN_LEN {
        errors.add(
            "description",
            format!(
                "The description needs at least {} characters",
                DESCRIPTION_MIN_LEN
            ),
        );
    } else if description_len > DESCRIPTION_MAX_LEN {
        errors.add(
            "description",
            format!(
                "The description cannot exceed {} characters",
                DESCRIPTION_MAX_LEN
            ),
        );
    }

    for (index, draft) in form.quizzes.iter().enumerate() {
        validate_quiz(index, draft, &mut errors);
    }

    if let ContentSource::Link(link) = &form.source {
        if !link.trim().is_empty() && !is_valid_link(link) {
            errors.add("link", "Enter a valid video or web link");
        }
    }

    errors.into_result()
}

// ==================== Account forms ====================

pub fn validate_login(email: &str, password: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if email.trim().is_empty() {
        errors.add("email", "Email is required");
    } else if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address");
    }
    if password.is_empty() {
        errors.add("password", "Password is required");
    }
    errors.into_result()
}

pub fn validate_new_password(password: &str, confirmation: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "newPassword",
            format!("The password needs at least {} characters", PASSWORD_MIN_LEN),
        );
    }
    if password != confirmation {
        errors.add("confirmPassword", "Passwords do not match");
    }
    errors.into_result()
}

pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if char_len(username) < NAME_MIN_LEN {
        errors.add(
            "username",
            format!("The username needs at least {} characters", NAME_MIN_LEN),
        );
    }
    if !is_valid_email(email) {
        errors.add("email", "Enter a valid email address");
    }
    if password.chars().count() < PASSWORD_MIN_LEN {
        errors.add(
            "password",
            format!("The password needs at least {} characters", PASSWORD_MIN_LEN),
        );
    }
    errors.into_result()
}

// ==================== Catalogue forms ====================

pub fn validate_course(title: &str, description: &str, category: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if char_len(title) < TITLE_MIN_LEN {
        errors.add(
            "title",
            format!("The title needs at least {} characters", TITLE_MIN_LEN),
        );
    }
    if char_len(description) < DESCRIPTION_MIN_LEN {
        errors.add(
            "description",
            format!(
                "The description needs at least {} characters",
                DESCRIPTION_MIN_LEN
            ),
        );
    }
    if category.trim().is_empty() {
        errors.add("category", "Select a category");
    }
    errors.into_result()
}

/// Categories and roles only carry a name
pub fn validate_name(name: &str) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();
    if char_len(name) < NAME_MIN_LEN {
        errors.add(
            "name",
            format!("The name needs at least {} characters", NAME_MIN_LEN),
        );
    }
    errors.into_result()
}
