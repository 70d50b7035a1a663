// Command modules
// User actions invoked by the shell; every command returns a DTO or a message

pub mod auth;
pub mod catalog;
pub mod learner;
pub mod resources;

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::models::Session;
use crate::services::api::ApiClient;
use crate::services::resource::{CourseCatalog, ResourceFetcher};
use crate::services::routing::{self, RouteGroup};
use crate::utils::AppConfig;

pub use auth::{
    activate_account,
    change_password,
    confirm_delete_account,
    current_session,
    delete_account,
    login,
    logout,
    register,
    resolve_route,
    update_profile,
    SessionDto,
};

pub use catalog::{
    add_bookmark,
    create_category,
    create_course,
    create_role,
    create_user,
    delete_category,
    delete_course,
    delete_role,
    delete_user,
    enroll,
    list_bookmarks,
    list_categories,
    list_courses,
    list_courses_by_category,
    list_roles,
    list_users,
    list_users_by_course,
    my_courses,
    remove_bookmark,
    update_category,
    update_course,
    update_role,
    CategoryDto,
    CourseDto,
    RoleDto,
    UserDto,
};

pub use learner::{
    current_view,
    finish_course,
    go_to_sibling,
    next_question,
    open_resource,
    previous_question,
    retake_quiz,
    select_answer,
    CertificateDto,
    Direction,
    ProgressDto,
    QuizStepDto,
    QuizViewDto,
    ResourceViewDto,
};

pub use resources::{
    create_resource,
    delete_resource,
    list_resources,
    update_resource,
    ResourceDto,
};

/// Shared state handed to every command
pub struct AppState<C = ApiClient> {
    pub api: Arc<C>,
    pub session: Mutex<Option<Session>>,
    pub resource_view: ResourceFetcher<C>,
    pub config: AppConfig,
}

impl<C: CourseCatalog> AppState<C> {
    pub fn new(api: Arc<C>, config: AppConfig) -> Self {
        Self {
            resource_view: ResourceFetcher::new(api.clone()),
            api,
            session: Mutex::new(None),
            config,
        }
    }

    /// The session, when it may use commands of `group`
    pub(crate) async fn require(&self, group: RouteGroup) -> Result<Session, String> {
        let session = self.session.lock().await.clone();
        match session {
            None => Err("Please log in first".to_string()),
            Some(s) if routing::allows(group, Some(&s)) => Ok(s),
            Some(s) => {
                log::warn!("{} ({}) tried a {:?} action", s.username, s.role.as_str(), group);
                Err("This action is not available for your account".to_string())
            }
        }
    }
}

impl AppState<ApiClient> {
    /// Builds the backend client from `config`
    pub fn connect(config: AppConfig) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.api_config())?;
        Ok(Self::new(Arc::new(api), config))
    }
}

/// Plain confirmation returned by commands without a payload
#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub message: String,
}

impl MessageDto {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
