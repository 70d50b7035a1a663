// Account commands
// Login, logout, registration and account maintenance

use serde::Serialize;

use crate::commands::{AppState, MessageDto};
use crate::models::Session;
use crate::services::api::{LoginRequest, RegisterRequest, Upload, UserForm};
use crate::services::resource::CourseCatalog;
use crate::services::routing::{self, RouteDecision, RouteGroup};
use crate::services::validation;

/// The logged-in user as shown to the client
#[derive(Debug, Clone, Serialize)]
pub struct SessionDto {
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    /// Landing page of the user's role
    pub home: String,
}

impl From<&Session> for SessionDto {
    fn from(session: &Session) -> Self {
        Self {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            email: session.email.clone(),
            role: session.role.as_str().to_string(),
            home: routing::home_for(&session.role).to_string(),
        }
    }
}

/// Logs in and keeps the session for later commands
pub async fn login(state: &AppState, email: String, password: String) -> Result<SessionDto, String> {
    validation::validate_login(&email, &password).map_err(|e| e.to_string())?;

    let request = LoginRequest {
        email: email.trim().to_string(),
        password,
    };
    let user = state.api.login(&request).await.map_err(|e| e.to_string())?;
    let session = Session::from(user);
    log::info!("logged in as {} ({})", session.username, session.role.as_str());

    let dto = SessionDto::from(&session);
    *state.session.lock().await = Some(session);
    Ok(dto)
}

/// Ends the session; local state is cleared even if the backend call fails
pub async fn logout(state: &AppState) -> Result<MessageDto, String> {
    if let Err(e) = state.api.logout().await {
        log::warn!("logout request failed: {}", e);
    }
    state.resource_view.close().await;
    if let Some(session) = state.session.lock().await.take() {
        log::info!("{} logged out", session.username);
    }
    Ok(MessageDto::new("Logged out"))
}

pub async fn register(
    state: &AppState,
    username: String,
    email: String,
    password: String,
) -> Result<MessageDto, String> {
    validation::validate_registration(&username, &email, &password).map_err(|e| e.to_string())?;

    let request = RegisterRequest {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password,
    };
    let user = state.api.register(&request).await.map_err(|e| e.to_string())?;
    log::info!("registered {}", user.username);
    Ok(MessageDto::new(
        "Account created. Check your email to activate it.",
    ))
}

pub async fn activate_account(state: &AppState, user_id: String) -> Result<MessageDto, String> {
    state
        .api
        .activate_account(&user_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Account activated"))
}

pub async fn change_password(
    state: &AppState,
    new_password: String,
    confirmation: String,
) -> Result<MessageDto, String> {
    let session = state
        .session
        .lock()
        .await
        .clone()
        .ok_or_else(|| "Please log in first".to_string())?;
    validation::validate_new_password(&new_password, &confirmation).map_err(|e| e.to_string())?;

    state
        .api
        .change_password(&session.email, &new_password)
        .await
        .map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Password updated"))
}

/// Updates the profile of the logged-in user
pub async fn update_profile(
    state: &AppState,
    username: String,
    email: String,
    image: Option<Upload>,
) -> Result<SessionDto, String> {
    let session = state
        .session
        .lock()
        .await
        .clone()
        .ok_or_else(|| "Please log in first".to_string())?;

    let mut errors = validation::FieldErrors::new();
    if username.trim().chars().count() < validation::NAME_MIN_LEN {
        errors.add(
            "username",
            format!("The username needs at least {} characters", validation::NAME_MIN_LEN),
        );
    }
    if !validation::is_valid_email(&email) {
        errors.add("email", "Enter a valid email address");
    }
    errors.into_result().map_err(|e| e.to_string())?;

    let form = UserForm {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        image,
    };
    let user = state
        .api
        .update_user(&session.user_id, form)
        .await
        .map_err(|e| e.to_string())?;

    let updated = Session {
        role: session.role,
        ..Session::from(user)
    };
    let dto = SessionDto::from(&updated);
    *state.session.lock().await = Some(updated);
    Ok(dto)
}

/// Asks the backend to send an account deletion code
pub async fn delete_account(state: &AppState) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    state
        .api
        .delete_user(&session.user_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(MessageDto::new(
        "A confirmation code was sent to your email",
    ))
}

/// Confirms the deletion with the emailed code and ends the session
pub async fn confirm_delete_account(state: &AppState, code: String) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    if code.trim().is_empty() {
        return Err("code: The confirmation code is required".to_string());
    }
    state
        .api
        .confirm_delete_user(&session.user_id, code.trim())
        .await
        .map_err(|e| e.to_string())?;

    state.resource_view.close().await;
    *state.session.lock().await = None;
    log::info!("account of {} deleted", session.username);
    Ok(MessageDto::new("Account deleted"))
}

pub async fn current_session<C: CourseCatalog>(state: &AppState<C>) -> Option<SessionDto> {
    state.session.lock().await.as_ref().map(SessionDto::from)
}

/// Decides whether `path` renders or redirects for the current session
pub async fn resolve_route<C: CourseCatalog>(state: &AppState<C>, path: String) -> RouteDecision {
    let session = state.session.lock().await.clone();
    routing::resolve(&path, session.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{session, state_with};
    use crate::models::Role;
    use crate::services::resource::tests::FakeCatalog;
    use crate::services::routing::Route;
    use crate::utils::AppConfig;

    #[tokio::test]
    async fn test_login_rejects_invalid_form_before_request() {
        let state = AppState::connect(AppConfig::default()).unwrap();
        let err = login(&state, "not-an-email".into(), "".into()).await.unwrap_err();
        assert!(err.contains("email"));
        assert!(err.contains("password"));
        assert!(state.session.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_change_password_needs_session_and_match() {
        let state = AppState::connect(AppConfig::default()).unwrap();
        let err = change_password(&state, "longenough".into(), "longenough".into())
            .await
            .unwrap_err();
        assert_eq!(err, "Please log in first");

        *state.session.lock().await = Some(session(Role::Learner));
        let err = change_password(&state, "longenough".into(), "different".into())
            .await
            .unwrap_err();
        assert!(err.contains("confirmPassword"));
    }

    #[tokio::test]
    async fn test_resolve_route_follows_session() {
        let state = state_with(FakeCatalog::default(), Some(Role::Learner)).await;
        assert_eq!(
            resolve_route(&state, "/".into()).await,
            RouteDecision::Redirect("/Home".into())
        );
        assert_eq!(
            resolve_route(&state, "/MyCourses".into()).await,
            RouteDecision::Render(Route::MyCourses)
        );

        let dto = current_session(&state).await.unwrap();
        assert_eq!(dto.role, "usuario");
        assert_eq!(dto.home, "/Home");
    }
}
