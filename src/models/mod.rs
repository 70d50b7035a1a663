//! Wire models shared by the REST client, the services and the commands.
//!
//! Field names follow the backend's JSON (`_id`, camelCase), everything the
//! learner only reads is a plain owned copy of the backend entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fewest options a question may offer
pub const MIN_OPTIONS: usize = 2;
/// Most options a question may offer
pub const MAX_OPTIONS: usize = 6;

/// Quiz construction and quiz-taking errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    #[error("a question needs at least 2 options")]
    TooFewOptions,

    #[error("a question allows at most 6 options")]
    TooManyOptions,

    #[error("options cannot be blank")]
    BlankOption,

    #[error("the correct answer must be one of the options")]
    CorrectAnswerNotAnOption,

    #[error("question {0} does not exist")]
    NoSuchQuestion(usize),

    #[error("option {0} does not exist")]
    NoSuchOption(usize),

    #[error("\"{option}\" is not an option of question {index}")]
    UnknownOption { index: usize, option: String },

    #[error("the quiz is already completed")]
    AlreadyCompleted,

    #[error("a quiz needs at least one question")]
    Empty,
}

/// One question embedded in a resource.
///
/// The fields are private so that every `Quiz` in memory satisfies
/// `options.len() ∈ [2, 6]` and `correct_answer ∈ options`, whether it was
/// built locally or deserialized from the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuizWire", rename_all = "camelCase")]
pub struct Quiz {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuizWire {
    question: String,
    options: Vec<String>,
    correct_answer: String,
}

impl TryFrom<QuizWire> for Quiz {
    type Error = QuizError;

    fn try_from(wire: QuizWire) -> Result<Self, Self::Error> {
        Quiz::new(wire.question, wire.options, wire.correct_answer)
    }
}

impl Quiz {
    pub fn new(
        question: impl Into<String>,
        options: Vec<String>,
        correct_answer: impl Into<String>,
    ) -> Result<Self, QuizError> {
        let correct_answer = correct_answer.into();
        if options.len() < MIN_OPTIONS {
            return Err(QuizError::TooFewOptions);
        }
        if options.len() > MAX_OPTIONS {
            return Err(QuizError::TooManyOptions);
        }
        if options.iter().any(|o| o.trim().is_empty()) {
            return Err(QuizError::BlankOption);
        }
        if !options.iter().any(|o| *o == correct_answer) {
            return Err(QuizError::CorrectAnswerNotAnOption);
        }
        Ok(Self {
            question: question.into(),
            options,
            correct_answer,
        })
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

/// A single learning unit of a course
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub course_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "files", skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Resource {
    /// The uploaded file wins over an external link
    pub fn content_url(&self) -> Option<&str> {
        self.file
            .as_deref()
            .or(self.link.as_deref())
            .filter(|url| !url.trim().is_empty())
    }

    pub fn has_quiz(&self) -> bool {
        !self.quizzes.is_empty()
    }
}

/// Resources of a course arrive either as bare ids or populated documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Id(String),
    Embedded(Box<Resource>),
}

impl ResourceRef {
    pub fn id(&self) -> &str {
        match self {
            ResourceRef::Id(id) => id,
            ResourceRef::Embedded(resource) => &resource.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Role attached to a user account.
///
/// The backend stores roles by name; learners are `usuario`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Learner,
    Other(String),
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        match name.as_str() {
            "Admin" | "admin" => Role::Admin,
            "usuario" | "Usuario" | "user" => Role::Learner,
            _ => Role::Other(name),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_string()
    }
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "Admin",
            Role::Learner => "usuario",
            Role::Other(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub courses: Vec<String>,
}

/// A role definition managed from the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub user_id: String,
    pub comment_id: String,
}

/// The logged-in user as the client remembers it between commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl From<User> for Session {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            role: user.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_quiz_rejects_bad_option_counts() {
        assert_eq!(
            Quiz::new("q?", options(&["A"]), "A"),
            Err(QuizError::TooFewOptions)
        );
        assert_eq!(
            Quiz::new("q?", options(&["A", "B", "C", "D", "E", "F", "G"]), "A"),
            Err(QuizError::TooManyOptions)
        );
    }

    #[test]
    fn test_quiz_rejects_blank_options() {
        assert_eq!(
            Quiz::new("q?", options(&["A", ""]), ""),
            Err(QuizError::BlankOption)
        );
        assert_eq!(
            Quiz::new("q?", options(&["A", "  "]), "A"),
            Err(QuizError::BlankOption)
        );
    }

    #[test]
    fn test_quiz_requires_correct_answer_among_options() {
        assert_eq!(
            Quiz::new("q?", options(&["A", "B"]), "C"),
            Err(QuizError::CorrectAnswerNotAnOption)
        );
        let quiz = Quiz::new("q?", options(&["A", "B"]), "B").unwrap();
        assert_eq!(quiz.correct_answer(), "B");
        assert!(quiz.offers("A"));
        assert!(!quiz.offers("Z"));
    }

    #[test]
    fn test_resource_from_backend_json() {
        let json = r#"{
            "_id": "r1",
            "courseId": "c1",
            "title": "Intro",
            "description": "First lesson",
            "files": "https://youtu.be/abc123",
            "quizzes": [
                {"question": "2+2?", "options": ["3", "4"], "correctAnswer": "4"}
            ],
            "createdAt": "2024-05-01T10:00:00Z"
        }"#;

        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id, "r1");
        assert_eq!(resource.course_id, "c1");
        assert_eq!(resource.content_url(), Some("https://youtu.be/abc123"));
        assert_eq!(resource.quizzes.len(), 1);
        assert_eq!(resource.quizzes[0].correct_answer(), "4");
        assert!(resource.created_at.is_some());
    }

    #[test]
    fn test_resource_with_invalid_quiz_is_rejected() {
        let json = r#"{
            "_id": "r1", "courseId": "c1", "title": "Intro",
            "quizzes": [{"question": "?", "options": ["A", "B"], "correctAnswer": "C"}]
        }"#;
        assert!(serde_json::from_str::<Resource>(json).is_err());
    }

    #[test]
    fn test_course_resources_accept_ids_and_documents() {
        let json = r#"{
            "_id": "c1", "title": "Rust", "category": "Programming",
            "resources": ["r1", {"_id": "r2", "courseId": "c1", "title": "Two"}]
        }"#;
        let course: Course = serde_json::from_str(json).unwrap();
        let ids: Vec<&str> = course.resources.iter().map(ResourceRef::id).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_role_wire_names() {
        let user: User = serde_json::from_str(
            r#"{"_id": "u1", "username": "ana", "email": "ana@example.com", "role": "usuario"}"#,
        )
        .unwrap();
        assert_eq!(user.role, Role::Learner);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
        assert_eq!(Role::from("Editor".to_string()), Role::Other("Editor".to_string()));
    }
}
