//! BrightMind REST client
//!
//! Thin wrappers over the backend endpoints. One `reqwest::Client` with a
//! cookie store carries the session cookie set by `login`. Failures are
//! returned to the caller as [`ApiError`]; nothing here retries.

use std::time::{Duration, Instant};

use anyhow::Context;
use reqwest::{multipart, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Bookmark, Category, Course, Quiz, Resource, RoleRecord, User};

/// Backend used when nothing is configured
pub const DEFAULT_API_URL: &str = "https://apibrightmind.mesadoko.com/PE/";

/// REST client errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 15,
        }
    }
}

// ==================== Request bodies ====================

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewCourse {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A file picked for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart body of a course update
#[derive(Debug, Clone)]
pub struct CourseForm {
    pub title: String,
    pub description: String,
    pub category: String,
    pub content: String,
    pub image: Option<Upload>,
}

impl CourseForm {
    fn into_multipart(self) -> multipart::Form {
        let form = multipart::Form::new()
            .text("title", self.title)
            .text("description", self.description)
            .text("category", self.category)
            .text("content", self.content);
        attach_upload(form, "image", self.image)
    }
}

/// Multipart body of a profile update
#[derive(Debug, Clone)]
pub struct UserForm {
    pub username: String,
    pub email: String,
    pub image: Option<Upload>,
}

impl UserForm {
    fn into_multipart(self) -> multipart::Form {
        let form = multipart::Form::new()
            .text("username", self.username)
            .text("email", self.email);
        attach_upload(form, "image", self.image)
    }
}

fn attach_upload(form: multipart::Form, field: &'static str, upload: Option<Upload>) -> multipart::Form {
    match upload {
        Some(upload) => form.part(
            field,
            multipart::Part::bytes(upload.bytes).file_name(upload.file_name),
        ),
        None => form,
    }
}

/// Body of resource create/update.
///
/// Sent as JSON, or as multipart form data when a file is attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_id: Option<String>,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory_id: Option<String>,
    pub description: String,
    pub link: Option<String>,
    pub quizzes: Vec<Quiz>,
    #[serde(skip)]
    pub file: Option<Upload>,
}

impl ResourcePayload {
    /// Text fields of the multipart body; quizzes travel as a JSON string
    fn multipart_fields(&self) -> ApiResult<Vec<(&'static str, String)>> {
        let quizzes =
            serde_json::to_string(&self.quizzes).map_err(|e| ApiError::Decode(e.to_string()))?;
        let mut fields = Vec::with_capacity(6);
        if let Some(course_id) = &self.course_id {
            fields.push(("courseId", course_id.clone()));
        }
        fields.push(("title", self.title.clone()));
        if let Some(subcategory_id) = &self.subcategory_id {
            fields.push(("subcategoryId", subcategory_id.clone()));
        }
        fields.push(("description", self.description.clone()));
        if let Some(link) = &self.link {
            fields.push(("link", link.clone()));
        }
        fields.push(("quizzes", quizzes));
        Ok(fields)
    }

    fn into_multipart(self) -> ApiResult<multipart::Form> {
        let form = self
            .multipart_fields()?
            .into_iter()
            .fold(multipart::Form::new(), |form, (name, value)| form.text(name, value));
        Ok(attach_upload(form, "file", self.file))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryPayload {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RolePayload {
    pub name: String,
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest<'a> {
    user_id: &'a str,
    course_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest<'a> {
    email: &'a str,
    new_password: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteConfirmation<'a> {
    confirmation_code: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Message shown to the user for a failed response body
pub fn error_message(status: u16, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let text = body.trim();
            if text.is_empty() || text.starts_with('<') {
                format!("request failed with status {}", status)
            } else {
                text.chars().take(200).collect()
            }
        })
}

// ==================== Client ====================

/// BrightMind backend client
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: Url,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .with_context(|| format!("invalid API base URL: {}", config.base_url))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API base URL cannot carry paths: {}", config.base_url);
        }

        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins path segments onto the base URL, percent-encoding each one
    pub fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> ApiResult<RequestBuilder> {
        let url = self.endpoint(segments)?;
        log::debug!("{} {}", method, url);
        Ok(self.http.request(method, url))
    }

    async fn execute(builder: RequestBuilder) -> ApiResult<Response> {
        let started = Instant::now();
        let response = builder.send().await?;
        let status = response.status();
        log::debug!(
            "{} {} in {} ms",
            status.as_u16(),
            response.url(),
            started.elapsed().as_millis()
        );

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(status.as_u16(), &body);
        log::warn!("request failed: HTTP {} {}", status.as_u16(), message);
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let response = Self::execute(self.request(Method::GET, segments)?).await?;
        Self::decode(response).await
    }

    async fn send_json<B, T>(&self, method: Method, segments: &[&str], body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = Self::execute(self.request(method, segments)?.json(body)).await?;
        Self::decode(response).await
    }

    async fn send_unit(&self, builder: RequestBuilder) -> ApiResult<()> {
        Self::execute(builder).await.map(|_| ())
    }

    // ==================== Auth ====================

    pub async fn login(&self, request: &LoginRequest) -> ApiResult<User> {
        self.send_json(Method::POST, &["login"], request).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.send_unit(self.request(Method::POST, &["logout"])?).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<User> {
        self.send_json(Method::POST, &["register"], request).await
    }

    // ==================== Users ====================

    pub async fn get_all_users(&self) -> ApiResult<Vec<User>> {
        self.get(&["users", "getAll"]).await
    }

    pub async fn get_user(&self, id: &str) -> ApiResult<User> {
        self.get(&["users", "get", id]).await
    }

    pub async fn get_user_courses(&self, user_id: &str) -> ApiResult<Vec<Course>> {
        self.get(&["users", user_id, "courses"]).await
    }

    pub async fn update_user(&self, id: &str, form: UserForm) -> ApiResult<User> {
        let builder = self
            .request(Method::PUT, &["users", "modify", id])?
            .multipart(form.into_multipart());
        Self::decode(Self::execute(builder).await?).await
    }

    pub async fn register_to_course(&self, user_id: &str, course_id: &str) -> ApiResult<()> {
        let body = EnrollRequest { user_id, course_id };
        let builder = self
            .request(Method::POST, &["users", "registerToCourse"])?
            .json(&body);
        self.send_unit(builder).await
    }

    pub async fn activate_account(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::GET, &["activation", id])?)
            .await
    }

    /// Starts account deletion; the backend mails a confirmation code
    pub async fn delete_user(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["users", "delete", id])?)
            .await
    }

    pub async fn confirm_delete_user(&self, id: &str, confirmation_code: &str) -> ApiResult<()> {
        let body = DeleteConfirmation { confirmation_code };
        let builder = self
            .request(Method::DELETE, &["users", "delete", id, "confirm"])?
            .json(&body);
        self.send_unit(builder).await
    }

    pub async fn create_user(&self, user: &NewUser) -> ApiResult<User> {
        self.send_json(Method::POST, &["users", "createUser"], user)
            .await
    }

    pub async fn change_password(&self, email: &str, new_password: &str) -> ApiResult<()> {
        let body = ChangePasswordRequest {
            email,
            new_password,
        };
        let builder = self
            .request(Method::POST, &["users", "changePassword"])?
            .json(&body);
        self.send_unit(builder).await
    }

    pub async fn get_users_by_course(&self, course_id: &str) -> ApiResult<Vec<User>> {
        self.get(&["users", "courses", course_id, "users"]).await
    }

    // ==================== Courses ====================

    pub async fn get_all_courses(&self) -> ApiResult<Vec<Course>> {
        self.get(&["courses", "getAll"]).await
    }

    pub async fn get_course(&self, id: &str) -> ApiResult<Course> {
        self.get(&["courses", "get", id]).await
    }

    pub async fn get_courses_by_category(&self, category: &str) -> ApiResult<Vec<Course>> {
        self.get(&["courses", "category", category]).await
    }

    pub async fn create_course(&self, course: &NewCourse) -> ApiResult<Course> {
        self.send_json(Method::POST, &["courses", "createCourse"], course)
            .await
    }

    pub async fn update_course(&self, id: &str, form: CourseForm) -> ApiResult<Course> {
        let builder = self
            .request(Method::PUT, &["courses", "modify", id])?
            .multipart(form.into_multipart());
        Self::decode(Self::execute(builder).await?).await
    }

    pub async fn delete_course(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["courses", "delete", id])?)
            .await
    }

    // ==================== Resources ====================

    pub async fn get_all_resources(&self) -> ApiResult<Vec<Resource>> {
        self.get(&["resource", "getAll"]).await
    }

    /// Ordered resources of a course
    pub async fn get_resources_by_course(&self, course_id: &str) -> ApiResult<Vec<Resource>> {
        self.get(&["resource", "course", course_id]).await
    }

    /// A single resource as a learner sees it
    pub async fn get_resource_for_learner(&self, id: &str) -> ApiResult<Resource> {
        self.get(&["resource", "user", id]).await
    }

    async fn send_resource(
        &self,
        method: Method,
        segments: &[&str],
        payload: ResourcePayload,
    ) -> ApiResult<Resource> {
        if payload.file.is_none() {
            return self.send_json(method, segments, &payload).await;
        }
        let builder = self
            .request(method, segments)?
            .multipart(payload.into_multipart()?);
        Self::decode(Self::execute(builder).await?).await
    }

    pub async fn create_resource(&self, payload: ResourcePayload) -> ApiResult<Resource> {
        self.send_resource(Method::POST, &["resource", "createResource"], payload)
            .await
    }

    pub async fn update_resource(&self, id: &str, payload: ResourcePayload) -> ApiResult<Resource> {
        self.send_resource(Method::PUT, &["resource", "modify", id], payload)
            .await
    }

    pub async fn delete_resource(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["resource", "delete", id])?)
            .await
    }

    // ==================== Categories ====================

    pub async fn get_categories(&self) -> ApiResult<Vec<Category>> {
        self.get(&["category", "getAll"]).await
    }

    pub async fn create_category(&self, payload: &CategoryPayload) -> ApiResult<Category> {
        self.send_json(Method::POST, &["category", "createCategory"], payload)
            .await
    }

    pub async fn update_category(&self, id: &str, payload: &CategoryPayload) -> ApiResult<Category> {
        self.send_json(Method::PUT, &["category", "modify", id], payload)
            .await
    }

    pub async fn delete_category(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["category", "delete", id])?)
            .await
    }

    // ==================== Roles ====================

    pub async fn get_roles(&self) -> ApiResult<Vec<RoleRecord>> {
        self.get(&["roles", "getAll"]).await
    }

    pub async fn create_role(&self, payload: &RolePayload) -> ApiResult<RoleRecord> {
        self.send_json(Method::POST, &["roles", "createRole"], payload)
            .await
    }

    pub async fn update_role(&self, id: &str, payload: &RolePayload) -> ApiResult<RoleRecord> {
        self.send_json(Method::PUT, &["roles", "modify", id], payload)
            .await
    }

    pub async fn delete_role(&self, id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["roles", "delete", id])?)
            .await
    }

    // ==================== Forum bookmarks ====================

    pub async fn add_bookmark(&self, bookmark: &Bookmark) -> ApiResult<()> {
        let builder = self.request(Method::POST, &["bookmark"])?.json(bookmark);
        self.send_unit(builder).await
    }

    pub async fn remove_bookmark(&self, user_id: &str, comment_id: &str) -> ApiResult<()> {
        self.send_unit(self.request(Method::DELETE, &["bookmark", user_id, comment_id])?)
            .await
    }

    pub async fn get_user_bookmarks(&self, user_id: &str) -> ApiResult<Vec<Bookmark>> {
        self.get(&["bookmark", "user", user_id]).await
    }
}
