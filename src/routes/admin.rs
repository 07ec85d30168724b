/**
 * Admin Routes
 * Project and message management behind the session guard
 */
use axum::{
    extract::{
        multipart::{Multipart, MultipartError},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::ErrorResponse;
use crate::admin::images::{ImagePreview, StagedImage};
use crate::admin::messages::MessageManager;
use crate::admin::projects::{ProjectForm, ProjectManager};
use crate::admin::session::AdminSession;
use crate::admin::{ManagerError, Notice, ValidationError};
use crate::gateway::{AdminUser, GatewayError};
use crate::models::{ContactMessage, Project, RecordId};
use crate::state::AppState;

const UNCONFIRMED_DELETE: &str = "Deletion must be confirmed with ?confirm=true";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardSection {
    pub title: String,
    pub href: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub user: AdminUser,
    pub sections: Vec<DashboardSection>,
}

/// Project page after an action: the refreshed list, transient notices and,
/// when a save failed, the form as it was submitted.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProjectsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<Project>,
    pub projects: Vec<Project>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form: Option<ProjectForm>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<ImagePreview>,
    pub notices: Vec<Notice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub success: bool,
    pub messages: Vec<ContactMessage>,
    pub notices: Vec<Notice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Raw multipart fields of a project form submission.
#[derive(Debug, Default)]
struct ProjectSubmission {
    title: Option<String>,
    description: Option<String>,
    live_url: Option<String>,
    github_url: Option<String>,
    tech_stack: Option<Vec<String>>,
    remove_tags: Vec<String>,
    image: Option<(String, Bytes)>,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn status_for(error: &ManagerError) -> StatusCode {
    match error {
        ManagerError::Validation(_) | ManagerError::Unconfirmed => StatusCode::BAD_REQUEST,
        ManagerError::NotFound(_) => StatusCode::NOT_FOUND,
        ManagerError::Upload(e) | ManagerError::Persist(e) | ManagerError::Delete(e) => match e {
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

fn project_page(
    mut manager: ProjectManager,
    project: Option<Project>,
    error: Option<String>,
) -> ProjectsResponse {
    let notices = manager.take_notices();
    let (form, preview) = if manager.is_form_open() {
        (Some(manager.form().clone()), manager.preview().cloned())
    } else {
        (None, None)
    };
    ProjectsResponse {
        success: error.is_none(),
        project,
        form,
        preview,
        notices,
        error,
        projects: manager.into_projects(),
    }
}

fn message_page(mut manager: MessageManager, error: Option<String>) -> MessagesResponse {
    MessagesResponse {
        success: error.is_none(),
        notices: manager.take_notices(),
        error,
        messages: manager.into_messages(),
    }
}

fn multipart_rejection(error: MultipartError) -> Response {
    tracing::warn!(error = %error, "rejected project form");
    (
        error.status(),
        Json(ErrorResponse::with_message(
            "Invalid form data",
            error.body_text(),
        )),
    )
        .into_response()
}

async fn read_submission(mut multipart: Multipart) -> Result<ProjectSubmission, MultipartError> {
    let mut submission = ProjectSubmission::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                // an empty file input still sends a nameless, empty part
                if !(file_name.is_empty() && bytes.is_empty()) {
                    submission.image = Some((file_name, bytes));
                }
            }
            "title" => submission.title = Some(field.text().await?),
            "description" => submission.description = Some(field.text().await?),
            "live_url" => submission.live_url = Some(field.text().await?),
            "github_url" => submission.github_url = Some(field.text().await?),
            "tech_stack" => {
                let tag = field.text().await?;
                submission.tech_stack.get_or_insert_with(Vec::new).push(tag);
            }
            "remove_tag" => submission.remove_tags.push(field.text().await?),
            other => tracing::debug!(field = %other, "ignoring unknown form field"),
        }
    }

    Ok(submission)
}

/// Copies submitted fields over the open form. Absent fields keep their
/// current value; a submitted `tech_stack` replaces the list.
fn apply_submission(
    manager: &mut ProjectManager,
    submission: ProjectSubmission,
    max_upload_bytes: usize,
) -> Result<(), ValidationError> {
    let form = manager.form_mut();
    if submission.title.is_some() {
        form.title = submission.title;
    }
    if submission.description.is_some() {
        form.description = submission.description;
    }
    if submission.live_url.is_some() {
        form.live_url = submission.live_url;
    }
    if submission.github_url.is_some() {
        form.github_url = submission.github_url;
    }

    if let Some(tags) = submission.tech_stack {
        manager.form_mut().tech_stack.clear();
        for tag in &tags {
            manager.add_tag(tag);
        }
    }
    for tag in &submission.remove_tags {
        manager.remove_tag(tag);
    }

    if let Some((file_name, bytes)) = submission.image {
        let image = StagedImage::new(&file_name, bytes, max_upload_bytes)?;
        manager.stage_image(image);
    }
    Ok(())
}

/// A successful save refreshes the list itself; failures load it here when
/// the caller has not.
async fn save_submission(
    mut manager: ProjectManager,
    submission: ProjectSubmission,
    max_upload_bytes: usize,
    success_status: StatusCode,
    list_loaded: bool,
) -> Response {
    if let Err(e) = apply_submission(&mut manager, submission, max_upload_bytes) {
        tracing::warn!(error = %e, "project image rejected");
        if !list_loaded {
            manager.refresh().await;
        }
        let message = e.to_string();
        let mut page = project_page(manager, None, Some(message.clone()));
        page.notices.push(Notice::error(message));
        return (StatusCode::BAD_REQUEST, Json(page)).into_response();
    }

    match manager.save().await {
        Ok(project) => (success_status, Json(project_page(manager, Some(project), None))).into_response(),
        Err(e) => {
            if !list_loaded {
                manager.refresh().await;
            }
            let status = status_for(&e);
            (status, Json(project_page(manager, None, Some(e.to_string())))).into_response()
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET /api/admin/dashboard - Links to the admin sections
pub async fn dashboard(Extension(session): Extension<AdminSession>) -> impl IntoResponse {
    let sections = vec![
        DashboardSection {
            title: "Projects".to_string(),
            href: "/admin/projects".to_string(),
            description: "Manage your portfolio projects".to_string(),
        },
        DashboardSection {
            title: "Messages".to_string(),
            href: "/admin/messages".to_string(),
            description: "View contact form submissions".to_string(),
        },
    ];

    Json(DashboardResponse {
        user: session.user,
        sections,
    })
}

/// GET /api/admin/projects - Every project, newest first
pub async fn list_projects(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> impl IntoResponse {
    let mut manager = ProjectManager::new(state.gateway.clone(), Some(session.token));
    manager.refresh().await;
    (StatusCode::OK, Json(project_page(manager, None, None)))
}

/// POST /api/admin/projects - Create from a multipart form
pub async fn create_project(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    multipart: Multipart,
) -> Response {
    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => return multipart_rejection(e),
    };

    tracing::info!(user_id = %session.user.id, "creating project");
    let mut manager = ProjectManager::new(state.gateway.clone(), Some(session.token));
    manager.open_create();

    save_submission(
        manager,
        submission,
        state.config.max_upload_bytes,
        StatusCode::CREATED,
        false,
    )
    .await
}

/// PATCH /api/admin/projects/{id} - Edit in place; the image is kept unless a
/// new one is submitted
pub async fn update_project(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let submission = match read_submission(multipart).await {
        Ok(submission) => submission,
        Err(e) => return multipart_rejection(e),
    };

    let id = RecordId::new(id);
    tracing::info!(user_id = %session.user.id, id = %id, "updating project");
    let mut manager = ProjectManager::new(state.gateway.clone(), Some(session.token));
    if !manager.refresh().await {
        let page = project_page(manager, None, Some("Failed to fetch projects".to_string()));
        return (StatusCode::BAD_GATEWAY, Json(page)).into_response();
    }
    if let Err(e) = manager.open_edit_by_id(&id) {
        let page = project_page(manager, None, Some(e.to_string()));
        return (status_for(&e), Json(page)).into_response();
    }

    save_submission(
        manager,
        submission,
        state.config.max_upload_bytes,
        StatusCode::OK,
        true,
    )
    .await
}

/// DELETE /api/admin/projects/{id}?confirm=true
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    let mut manager = ProjectManager::new(state.gateway.clone(), Some(session.token));
    manager.refresh().await;

    match manager.delete(&id, query.confirm.into()).await {
        Ok(()) => {
            tracing::info!(user_id = %session.user.id, id = %id, "project deleted");
            (StatusCode::OK, Json(project_page(manager, None, None)))
        }
        Err(ManagerError::Unconfirmed) => (
            StatusCode::BAD_REQUEST,
            Json(project_page(
                manager,
                None,
                Some(UNCONFIRMED_DELETE.to_string()),
            )),
        ),
        Err(e) => {
            let status = status_for(&e);
            (status, Json(project_page(manager, None, Some(e.to_string()))))
        }
    }
}

/// GET /api/admin/messages - Contact messages, newest first
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
) -> impl IntoResponse {
    let mut manager = MessageManager::new(state.gateway.clone(), Some(session.token));
    manager.refresh().await;
    (StatusCode::OK, Json(message_page(manager, None)))
}

/// DELETE /api/admin/messages/{id}?confirm=true
pub async fn delete_message(
    State(state): State<AppState>,
    Extension(session): Extension<AdminSession>,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> impl IntoResponse {
    let id = RecordId::new(id);
    let mut manager = MessageManager::new(state.gateway.clone(), Some(session.token));
    manager.refresh().await;

    match manager.delete(&id, query.confirm.into()).await {
        Ok(()) => {
            tracing::info!(user_id = %session.user.id, id = %id, "message deleted");
            (StatusCode::OK, Json(message_page(manager, None)))
        }
        Err(ManagerError::Unconfirmed) => (
            StatusCode::BAD_REQUEST,
            Json(message_page(manager, Some(UNCONFIRMED_DELETE.to_string()))),
        ),
        Err(e) => {
            let status = status_for(&e);
            (status, Json(message_page(manager, Some(e.to_string()))))
        }
    }
}
