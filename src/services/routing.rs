//! Route table and role guards
//!
//! Paths fall into three groups: public pages (login, registration, password
//! reset), learner pages and admin pages. A few pages are open to everybody.

use serde::Serialize;

use crate::models::{Role, Session};

pub const LOGIN_PATH: &str = "/";
pub const NOT_FOUND_PATH: &str = "/notFound";
pub const LEARNER_HOME: &str = "/Home";
pub const ADMIN_HOME: &str = "/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteGroup {
    /// Only for visitors without a session
    Public,
    Learner,
    Admin,
    /// Reachable with or without a session
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", content = "id", rename_all = "snake_case")]
pub enum Route {
    Login,
    Register,
    ResetPassword,
    ResetCode,
    NewPassword,
    Home,
    MyCourses,
    CoursesHome,
    Course(String),
    Resource(String),
    Account,
    ChangePasswordUser,
    DeleteAccount,
    Dashboard,
    Users,
    Courses,
    Categories,
    Roles,
    ProfileEditor,
    ChangePassword,
    DeleteConfirmation,
    NotFound,
    Activate,
}

impl Route {
    /// Parses a client path; unknown paths are `None`
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        let route = match segments.as_slice() {
            [] => Route::Login,
            ["register"] => Route::Register,
            ["reset"] => Route::ResetPassword,
            ["code"] => Route::ResetCode,
            ["newPassword"] => Route::NewPassword,
            ["Home"] => Route::Home,
            ["MyCourses"] => Route::MyCourses,
            ["CoursesHome"] => Route::CoursesHome,
            ["course", id] => Route::Course(id.to_string()),
            ["resource", id] => Route::Resource(id.to_string()),
            ["Account"] => Route::Account,
            ["ChangePasswordUser"] => Route::ChangePasswordUser,
            ["UserDeleteAccount"] => Route::DeleteAccount,
            ["admin"] => Route::Dashboard,
            ["Usuarios"] => Route::Users,
            ["Courses"] => Route::Courses,
            ["Categories"] => Route::Categories,
            ["roles"] => Route::Roles,
            ["ProfileEditor"] => Route::ProfileEditor,
            ["ChangePassword"] => Route::ChangePassword,
            ["eliminatedCode"] => Route::DeleteConfirmation,
            ["notFound"] => Route::NotFound,
            ["activate"] => Route::Activate,
            _ => return None,
        };
        Some(route)
    }

    pub fn group(&self) -> RouteGroup {
        match self {
            Route::Login
            | Route::Register
            | Route::ResetPassword
            | Route::ResetCode
            | Route::NewPassword => RouteGroup::Public,
            Route::Home
            | Route::MyCourses
            | Route::CoursesHome
            | Route::Course(_)
            | Route::Resource(_)
            | Route::Account
            | Route::ChangePasswordUser
            | Route::DeleteAccount => RouteGroup::Learner,
            Route::Dashboard
            | Route::Users
            | Route::Courses
            | Route::Categories
            | Route::Roles
            | Route::ProfileEditor
            | Route::ChangePassword
            | Route::DeleteConfirmation => RouteGroup::Admin,
            Route::NotFound | Route::Activate => RouteGroup::Open,
        }
    }
}

/// What the client does when a path is requested
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "snake_case")]
pub enum RouteDecision {
    Render(Route),
    Redirect(String),
}

/// Landing page of a role
pub fn home_for(role: &Role) -> &'static str {
    match role {
        Role::Admin => ADMIN_HOME,
        _ => LEARNER_HOME,
    }
}

/// Whether a session may enter a route group
pub fn allows(group: RouteGroup, session: Option<&Session>) -> bool {
    match (group, session) {
        (RouteGroup::Open, _) => true,
        (RouteGroup::Public, session) => session.is_none(),
        (RouteGroup::Learner, Some(s)) => s.role == Role::Learner,
        (RouteGroup::Admin, Some(s)) => s.role == Role::Admin,
        (_, None) => false,
    }
}

pub fn resolve(path: &str, session: Option<&Session>) -> RouteDecision {
    let Some(route) = Route::parse(path) else {
        return RouteDecision::Redirect(NOT_FOUND_PATH.to_string());
    };

    let group = route.group();
    if allows(group, session) {
        return RouteDecision::Render(route);
    }

    let target = match (group, session) {
        (RouteGroup::Public, Some(s)) => home_for(&s.role),
        (_, None) => LOGIN_PATH,
        (_, Some(_)) => NOT_FOUND_PATH,
    };
    log::debug!("route {} redirected to {}", path, target);
    RouteDecision::Redirect(target.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(role: Role) -> Session {
        Session {
            user_id: "u1".into(),
            username: "ana".into(),
            email: "ana@example.com".into(),
            role,
        }
    }

    #[test]
    fn test_parse_paths() {
        assert_eq!(Route::parse("/"), Some(Route::Login));
        assert_eq!(
            Route::parse("/resource/abc?tab=quiz"),
            Some(Route::Resource("abc".into()))
        );
        assert_eq!(Route::parse("/course/42/"), Some(Route::Course("42".into())));
        assert_eq!(Route::parse("/course/42/resource/7"), None);
        assert_eq!(Route::parse("/nowhere"), None);
    }

    #[test]
    fn test_anonymous_visitor() {
        assert_eq!(resolve("/", None), RouteDecision::Render(Route::Login));
        assert_eq!(resolve("/Home", None), RouteDecision::Redirect("/".into()));
        assert_eq!(resolve("/admin", None), RouteDecision::Redirect("/".into()));
        assert_eq!(
            resolve("/activate", None),
            RouteDecision::Render(Route::Activate)
        );
    }

    #[test]
    fn test_logged_in_user_skips_public_pages() {
        let learner = session(Role::Learner);
        let admin = session(Role::Admin);
        assert_eq!(
            resolve("/register", Some(&learner)),
            RouteDecision::Redirect("/Home".into())
        );
        assert_eq!(
            resolve("/", Some(&admin)),
            RouteDecision::Redirect("/admin".into())
        );
    }

    #[test]
    fn test_wrong_role_and_unknown_path() {
        let learner = session(Role::Learner);
        let admin = session(Role::Admin);
        assert_eq!(
            resolve("/Usuarios", Some(&learner)),
            RouteDecision::Redirect("/notFound".into())
        );
        assert_eq!(
            resolve("/MyCourses", Some(&admin)),
            RouteDecision::Redirect("/notFound".into())
        );
        assert_eq!(
            resolve("/resource/r1", Some(&learner)),
            RouteDecision::Render(Route::Resource("r1".into()))
        );
        assert_eq!(
            resolve("/missing", Some(&learner)),
            RouteDecision::Redirect("/notFound".into())
        );
        assert!(!allows(RouteGroup::Learner, Some(&session(Role::Other("Editor".into())))));
    }
}
