// Resource administration commands
// Forms are validated locally before anything is sent

use serde::Serialize;

use crate::commands::{AppState, MessageDto};
use crate::models::Resource;
use crate::services::api::ResourcePayload;
use crate::services::content::{self, ResourceContent};
use crate::services::routing::RouteGroup;
use crate::services::validation::{self, ContentSource, ResourceForm};

#[derive(Debug, Clone, Serialize)]
pub struct ResourceDto {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: String,
    pub content: ResourceContent,
    pub question_count: usize,
}

impl From<Resource> for ResourceDto {
    fn from(resource: Resource) -> Self {
        Self {
            content: content::classify(resource.content_url()),
            question_count: resource.quizzes.len(),
            id: resource.id,
            course_id: resource.course_id,
            title: resource.title,
            description: resource.description,
        }
    }
}

/// Validates the form and turns it into a request body
fn build_payload(course_id: Option<String>, form: ResourceForm) -> Result<ResourcePayload, String> {
    validation::validate_resource(&form).map_err(|e| e.to_string())?;

    let quizzes = form
        .quizzes
        .iter()
        .map(|draft| draft.build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| e.to_string())?;

    let (file, link) = match form.source {
        ContentSource::File(file) => (file, None),
        ContentSource::Link(link) => {
            let link = link.trim().to_string();
            (None, (!link.is_empty()).then_some(link))
        }
    };

    Ok(ResourcePayload {
        course_id,
        title: form.title.trim().to_string(),
        subcategory_id: form
            .subcategory_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty()),
        description: form.description.trim().to_string(),
        link,
        quizzes,
        file,
    })
}

/// Resources of one course, or every resource when no course is given
pub async fn list_resources(
    state: &AppState,
    course_id: Option<String>,
) -> Result<Vec<ResourceDto>, String> {
    state.require(RouteGroup::Admin).await?;
    let resources = match course_id {
        Some(id) => state.api.get_resources_by_course(&id).await,
        None => state.api.get_all_resources().await,
    }
    .map_err(|e| e.to_string())?;
    Ok(resources.into_iter().map(ResourceDto::from).collect())
}

pub async fn create_resource(
    state: &AppState,
    course_id: String,
    form: ResourceForm,
) -> Result<ResourceDto, String> {
    state.require(RouteGroup::Admin).await?;
    let payload = build_payload(Some(course_id), form)?;

    let created = state
        .api
        .create_resource(payload)
        .await
        .map_err(|e| e.to_string())?;
    log::info!(
        "resource {} created with {} questions",
        created.id,
        created.quizzes.len()
    );
    Ok(created.into())
}

pub async fn update_resource(
    state: &AppState,
    id: String,
    form: ResourceForm,
) -> Result<ResourceDto, String> {
    state.require(RouteGroup::Admin).await?;
    let payload = build_payload(None, form)?;

    let updated = state
        .api
        .update_resource(&id, payload)
        .await
        .map_err(|e| e.to_string())?;
    Ok(updated.into())
}

pub async fn delete_resource(state: &AppState, id: String) -> Result<MessageDto, String> {
    state.require(RouteGroup::Admin).await?;
    state.api.delete_resource(&id).await.map_err(|e| e.to_string())?;
    log::info!("resource {} deleted", id);
    Ok(MessageDto::new("Resource deleted"))
}
