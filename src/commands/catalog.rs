// Catalogue commands
// Courses, categories, roles, users and forum bookmarks

use serde::Serialize;

use crate::commands::{AppState, MessageDto};
use crate::models::{Bookmark, Category, Course, RoleRecord, User};
use crate::services::api::{CategoryPayload, CourseForm, NewCourse, NewUser, RolePayload};
use crate::services::routing::RouteGroup;
use crate::services::validation;

#[derive(Debug, Clone, Serialize)]
pub struct CourseDto {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub image: Option<String>,
    pub resource_count: usize,
}

impl From<Course> for CourseDto {
    fn from(course: Course) -> Self {
        Self {
            resource_count: course.resources.len(),
            id: course.id,
            title: course.title,
            description: course.description,
            category: course.category,
            image: course.image,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryDto {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl From<Category> for CategoryDto {
    fn from(category: Category) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleDto {
    pub id: String,
    pub name: String,
    pub permissions: Vec<String>,
}

impl From<RoleRecord> for RoleDto {
    fn from(role: RoleRecord) -> Self {
        Self {
            id: role.id,
            name: role.name,
            permissions: role.permissions,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub course_count: usize,
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            role: user.role.as_str().to_string(),
            course_count: user.courses.len(),
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

fn into_dtos<T, D: From<T>>(items: Vec<T>) -> Vec<D> {
    items.into_iter().map(D::from).collect()
}

// ==================== Learner ====================

/// All published courses
pub async fn list_courses(state: &AppState) -> Result<Vec<CourseDto>, String> {
    state.require(RouteGroup::Learner).await?;
    let courses = state.api.get_all_courses().await.map_err(|e| e.to_string())?;
    Ok(into_dtos(courses))
}

pub async fn list_courses_by_category(
    state: &AppState,
    category: String,
) -> Result<Vec<CourseDto>, String> {
    state.require(RouteGroup::Learner).await?;
    let courses = state
        .api
        .get_courses_by_category(&category)
        .await
        .map_err(|e| e.to_string())?;
    Ok(into_dtos(courses))
}

/// Courses the logged-in learner is enrolled in
pub async fn my_courses(state: &AppState) -> Result<Vec<CourseDto>, String> {
    let session = state.require(RouteGroup::Learner).await?;
    let courses = state
        .api
        .get_user_courses(&session.user_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(into_dtos(courses))
}

pub async fn enroll(state: &AppState, course_id: String) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    state
        .api
        .register_to_course(&session.user_id, &course_id)
        .await
        .map_err(|e| e.to_string())?;
    log::info!("{} enrolled in course {}", session.username, course_id);
    Ok(MessageDto::new("Enrolled in the course"))
}

/// Categories are visible to every logged-in user
pub async fn list_categories(state: &AppState) -> Result<Vec<CategoryDto>, String> {
    if state.session.lock().await.is_none() {
        return Err("Please log in first".to_string());
    }
    let categories = state.api.get_categories().await.map_err(|e| e.to_string())?;
    Ok(into_dtos(categories))
}

// ==================== Admin: courses ====================

pub async fn create_course(
    state: &AppState,
    title: String,
    description: String,
    category: String,
    image: Option<String>,
) -> Result<CourseDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_course(&title, &description, &category).map_err(|e| e.to_string())?;

    let course = NewCourse {
        title: title.trim().to_string(),
        description: description.trim().to_string(),
        category,
        image,
    };
    let created = state.api.create_course(&course).await.map_err(|e| e.to_string())?;
    log::info!("course {} created", created.id);
    Ok(created.into())
}

pub async fn update_course(
    state: &AppState,
    id: String,
    form: CourseForm,
) -> Result<CourseDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_course(&form.title, &form.description, &form.category)
        .map_err(|e| e.to_string())?;

    let updated = state
        .api
        .update_course(&id, form)
        .await
        .map_err(|e| e.to_string())?;
    Ok(updated.into())
}

pub async fn delete_course(state: &AppState, id: String) -> Result<MessageDto, String> {
    state.require(RouteGroup::Admin).await?;
    state.api.delete_course(&id).await.map_err(|e| e.to_string())?;
    log::info!("course {} deleted", id);
    Ok(MessageDto::new("Course deleted"))
}

// ==================== Admin: categories ====================

pub async fn create_category(
    state: &AppState,
    name: String,
    description: String,
) -> Result<CategoryDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_name(&name).map_err(|e| e.to_string())?;

    let payload = CategoryPayload {
        name: name.trim().to_string(),
        description,
    };
    let created = state
        .api
        .create_category(&payload)
        .await
        .map_err(|e| e.to_string())?;
    Ok(created.into())
}

pub async fn update_category(
    state: &AppState,
    id: String,
    name: String,
    description: String,
) -> Result<CategoryDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_name(&name).map_err(|e| e.to_string())?;

    let payload = CategoryPayload {
        name: name.trim().to_string(),
        description,
    };
    let updated = state
        .api
        .update_category(&id, &payload)
        .await
        .map_err(|e| e.to_string())?;
    Ok(updated.into())
}

pub async fn delete_category(state: &AppState, id: String) -> Result<MessageDto, String> {
    state.require(RouteGroup::Admin).await?;
    state.api.delete_category(&id).await.map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Category deleted"))
}

// ==================== Admin: roles ====================

pub async fn list_roles(state: &AppState) -> Result<Vec<RoleDto>, String> {
    state.require(RouteGroup::Admin).await?;
    let roles = state.api.get_roles().await.map_err(|e| e.to_string())?;
    Ok(into_dtos(roles))
}

pub async fn create_role(
    state: &AppState,
    name: String,
    permissions: Vec<String>,
) -> Result<RoleDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_name(&name).map_err(|e| e.to_string())?;

    let payload = RolePayload {
        name: name.trim().to_string(),
        permissions,
    };
    let created = state.api.create_role(&payload).await.map_err(|e| e.to_string())?;
    Ok(created.into())
}

pub async fn update_role(
    state: &AppState,
    id: String,
    name: String,
    permissions: Vec<String>,
) -> Result<RoleDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_name(&name).map_err(|e| e.to_string())?;

    let payload = RolePayload {
        name: name.trim().to_string(),
        permissions,
    };
    let updated = state
        .api
        .update_role(&id, &payload)
        .await
        .map_err(|e| e.to_string())?;
    Ok(updated.into())
}

pub async fn delete_role(state: &AppState, id: String) -> Result<MessageDto, String> {
    state.require(RouteGroup::Admin).await?;
    state.api.delete_role(&id).await.map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Role deleted"))
}

// ==================== Admin: users ====================

pub async fn list_users(state: &AppState) -> Result<Vec<UserDto>, String> {
    state.require(RouteGroup::Admin).await?;
    let users = state.api.get_all_users().await.map_err(|e| e.to_string())?;
    Ok(into_dtos(users))
}

pub async fn list_users_by_course(
    state: &AppState,
    course_id: String,
) -> Result<Vec<UserDto>, String> {
    state.require(RouteGroup::Admin).await?;
    let users = state
        .api
        .get_users_by_course(&course_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(into_dtos(users))
}

pub async fn create_user(state: &AppState, user: NewUser) -> Result<UserDto, String> {
    state.require(RouteGroup::Admin).await?;
    validation::validate_registration(&user.username, &user.email, &user.password)
        .map_err(|e| e.to_string())?;

    let created = state.api.create_user(&user).await.map_err(|e| e.to_string())?;
    log::info!("user {} created with role {}", created.username, created.role.as_str());
    Ok(created.into())
}

pub async fn delete_user(state: &AppState, id: String) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Admin).await?;
    if session.user_id == id {
        return Err("You cannot delete your own account from here".to_string());
    }
    state.api.delete_user(&id).await.map_err(|e| e.to_string())?;
    Ok(MessageDto::new("User deleted"))
}

// ==================== Bookmarks ====================

pub async fn add_bookmark(state: &AppState, comment_id: String) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    let bookmark = Bookmark {
        user_id: session.user_id,
        comment_id,
    };
    state.api.add_bookmark(&bookmark).await.map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Bookmark saved"))
}

pub async fn remove_bookmark(state: &AppState, comment_id: String) -> Result<MessageDto, String> {
    let session = state.require(RouteGroup::Learner).await?;
    state
        .api
        .remove_bookmark(&session.user_id, &comment_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(MessageDto::new("Bookmark removed"))
}

/// Comment ids bookmarked by the learner
pub async fn list_bookmarks(state: &AppState) -> Result<Vec<String>, String> {
    let session = state.require(RouteGroup::Learner).await?;
    let bookmarks = state
        .api
        .get_user_bookmarks(&session.user_id)
        .await
        .map_err(|e| e.to_string())?;
    Ok(bookmarks.into_iter().map(|b| b.comment_id).collect())
}
