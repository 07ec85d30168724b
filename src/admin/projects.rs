//! Admin project manager: list, create/edit form with image staging, delete.
//!
//! A manager lives for one page instance. Every mutation is followed by a
//! re-fetch of the authoritative list; local state is never patched ahead of
//! the service.

use serde::{Deserialize, Serialize};

use super::images::{ImagePreview, StagedImage};
use super::{Confirmation, ManagerError, Notice, ValidationError};
use crate::gateway::{AccessToken, Gateway};
use crate::models::{ListQuery, Project, ProjectRecord, RecordId};

/// Create/edit form state. Every field is optional until save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectForm {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tech_stack: Vec<String>,
    pub live_url: Option<String>,
    pub github_url: Option<String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

impl ProjectForm {
    /// Appends a trimmed label; blank input is ignored.
    pub fn add_tag(&mut self, input: &str) -> bool {
        let label = input.trim();
        if label.is_empty() {
            return false;
        }
        self.tech_stack.push(label.to_string());
        true
    }

    /// Removes every entry equal to `label`.
    pub fn remove_tag(&mut self, label: &str) {
        self.tech_stack.retain(|tag| tag != label);
    }

    fn check_fields(&self) -> Result<(), ValidationError> {
        if filled(&self.title).is_none() {
            return Err(ValidationError::MissingTitle);
        }
        if filled(&self.description).is_none() {
            return Err(ValidationError::MissingDescription);
        }
        Ok(())
    }

    fn to_record(&self, image_url: String) -> Result<ProjectRecord, ValidationError> {
        let title = filled(&self.title).ok_or(ValidationError::MissingTitle)?;
        let description = filled(&self.description).ok_or(ValidationError::MissingDescription)?;
        Ok(ProjectRecord {
            title: title.to_string(),
            description: description.to_string(),
            image_url,
            tech_stack: self.tech_stack.clone(),
            github_url: filled(&self.github_url).map(|s| s.trim().to_string()),
            live_url: filled(&self.live_url).map(|s| s.trim().to_string()),
        })
    }
}

impl From<&Project> for ProjectForm {
    fn from(project: &Project) -> Self {
        Self {
            title: Some(project.title.clone()),
            description: Some(project.description.clone()),
            image_url: Some(project.image_url.clone()),
            tech_stack: project.tech_stack.clone(),
            live_url: project.live_url.clone(),
            github_url: project.github_url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FormMode {
    Closed,
    Create,
    Edit(RecordId),
}

pub struct ProjectManager {
    gateway: Gateway,
    token: Option<AccessToken>,
    projects: Vec<Project>,
    mode: FormMode,
    form: ProjectForm,
    staged_image: Option<StagedImage>,
    preview: Option<ImagePreview>,
    notices: Vec<Notice>,
}

impl ProjectManager {
    pub fn new(gateway: Gateway, token: Option<AccessToken>) -> Self {
        Self {
            gateway,
            token,
            projects: Vec::new(),
            mode: FormMode::Closed,
            form: ProjectForm::default(),
            staged_image: None,
            preview: None,
            notices: Vec::new(),
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn into_projects(self) -> Vec<Project> {
        self.projects
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    pub fn form(&self) -> &ProjectForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut ProjectForm {
        &mut self.form
    }

    pub fn is_form_open(&self) -> bool {
        self.mode != FormMode::Closed
    }

    pub fn editing_id(&self) -> Option<&RecordId> {
        match &self.mode {
            FormMode::Edit(id) => Some(id),
            _ => None,
        }
    }

    pub fn preview(&self) -> Option<&ImagePreview> {
        self.preview.as_ref()
    }

    pub fn staged_image(&self) -> Option<&StagedImage> {
        self.staged_image.as_ref()
    }

    /// Re-fetches every project, newest first. A failed fetch leaves an
    /// empty list and an error notice, and returns `false`.
    pub async fn refresh(&mut self) -> bool {
        match self.gateway.projects.list(ListQuery::newest_first()).await {
            Ok(projects) => {
                self.projects = projects;
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch projects");
                self.projects.clear();
                self.notices.push(Notice::error("Failed to fetch projects"));
                false
            }
        }
    }

    pub fn open_create(&mut self) {
        self.reset_form();
        self.mode = FormMode::Create;
    }

    pub fn open_edit(&mut self, project: &Project) {
        self.reset_form();
        self.form = ProjectForm::from(project);
        self.preview = Some(ImagePreview::Existing {
            url: project.image_url.clone(),
        });
        self.mode = FormMode::Edit(project.id.clone());
    }

    /// Opens the edit form for a project from the loaded list.
    pub fn open_edit_by_id(&mut self, id: &RecordId) -> Result<(), ManagerError> {
        let project = self
            .projects
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| ManagerError::NotFound(id.clone()))?;
        self.open_edit(&project);
        Ok(())
    }

    /// Cancel: closes the form and drops anything staged.
    pub fn close_form(&mut self) {
        self.reset_form();
    }

    pub fn stage_image(&mut self, image: StagedImage) {
        self.preview = Some(image.preview());
        self.staged_image = Some(image);
    }

    pub fn add_tag(&mut self, input: &str) -> bool {
        self.form.add_tag(input)
    }

    pub fn remove_tag(&mut self, label: &str) {
        self.form.remove_tag(label);
    }

    /// Upload (if staged), then insert or update, then refresh.
    ///
    /// On any failure the form stays open with its data and staged image
    /// intact. Upload and persist are two separate calls: a persist failure
    /// after a successful upload leaves the uploaded object behind.
    pub async fn save(&mut self) -> Result<Project, ManagerError> {
        match self.try_save().await {
            Ok(project) => {
                let message = if matches!(self.mode, FormMode::Edit(_)) {
                    "Project updated successfully"
                } else {
                    "Project added successfully"
                };
                self.notices.push(Notice::success(message));
                self.reset_form();
                self.refresh().await;
                Ok(project)
            }
            Err(e) => {
                let message = match &e {
                    ManagerError::Validation(v) => v.to_string(),
                    ManagerError::Upload(_) => "Image upload failed".to_string(),
                    _ => "Failed to save project".to_string(),
                };
                self.notices.push(Notice::error(message));
                Err(e)
            }
        }
    }

    async fn try_save(&mut self) -> Result<Project, ManagerError> {
        if self.mode == FormMode::Closed {
            return Err(ValidationError::FormClosed.into());
        }
        self.form.check_fields()?;

        let existing_url = filled(&self.form.image_url).map(str::to_string);
        if self.staged_image.is_none() && existing_url.is_none() {
            return Err(ValidationError::MissingImage.into());
        }

        let mut uploaded_key = None;
        let image_url = match &self.staged_image {
            Some(image) => {
                let key = image.object_key();
                self.gateway
                    .images
                    .upload(&image.to_upload(key.clone()), self.token.as_ref())
                    .await
                    .map_err(|e| {
                        tracing::error!(key = %key, error = %e, "image upload failed");
                        ManagerError::Upload(e)
                    })?;
                let url = self.gateway.images.public_url(&key);
                uploaded_key = Some(key);
                url
            }
            None => existing_url.unwrap_or_default(),
        };

        let record = self.form.to_record(image_url)?;
        let result = match &self.mode {
            FormMode::Edit(id) => {
                self.gateway
                    .projects
                    .update(id, &record, self.token.as_ref())
                    .await
            }
            _ => {
                self.gateway
                    .projects
                    .insert(&record, self.token.as_ref())
                    .await
            }
        };

        result.map_err(|e| {
            tracing::error!(error = %e, "failed to persist project");
            if let Some(key) = &uploaded_key {
                tracing::warn!(key = %key, "uploaded image is no longer referenced");
            }
            ManagerError::Persist(e)
        })
    }

    /// Deletes after explicit confirmation, then refreshes. A declined
    /// confirmation does nothing; a failed delete leaves the list as it was.
    pub async fn delete(
        &mut self,
        id: &RecordId,
        confirmation: Confirmation,
    ) -> Result<(), ManagerError> {
        if confirmation != Confirmation::Confirmed {
            return Err(ManagerError::Unconfirmed);
        }

        if let Err(e) = self
            .gateway
            .projects
            .delete(id, self.token.as_ref())
            .await
        {
            tracing::error!(id = %id, error = %e, "failed to delete project");
            self.notices.push(Notice::error("Failed to delete project"));
            return Err(ManagerError::Delete(e));
        }

        self.notices
            .push(Notice::success("Project deleted successfully"));
        self.refresh().await;
        Ok(())
    }

    fn reset_form(&mut self) {
        self.form = ProjectForm::default();
        self.staged_image = None;
        self.preview = None;
        self.mode = FormMode::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admin::images::fixtures::png;
    use crate::admin::NoticeLevel;
    use crate::gateway::memory::MemoryGateway;
    use crate::gateway::{AdminUser, GatewayError, ImageStorage, ImageUpload};
    use async_trait::async_trait;
    use std::sync::Arc;

    const MAX: usize = 1024 * 1024;

    async fn setup() -> (Arc<MemoryGateway>, Gateway, AccessToken) {
        let memory = Arc::new(MemoryGateway::new("project-images"));
        let token = memory
            .issue_token(AdminUser {
                id: "admin".into(),
                email: Some("admin@example.com".into()),
            })
            .await;
        let gateway = Gateway {
            projects: memory.clone(),
            messages: memory.clone(),
            images: memory.clone(),
            auth: memory.clone(),
        };
        (memory, gateway, token)
    }

    struct FailingBucket;

    #[async_trait]
    impl ImageStorage for FailingBucket {
        async fn upload(
            &self,
            _image: &ImageUpload,
            _token: Option<&AccessToken>,
        ) -> Result<(), GatewayError> {
            Err(GatewayError::Transport("connection reset".into()))
        }

        fn public_url(&self, key: &str) -> String {
            format!("/public/{}", key)
        }
    }

    fn fill(manager: &mut ProjectManager, title: &str) {
        let form = manager.form_mut();
        form.title = Some(title.to_string());
        form.description = Some("A description".to_string());
    }

    async fn create(manager: &mut ProjectManager, title: &str) -> Project {
        manager.open_create();
        fill(manager, title);
        let file_name = format!("{}.png", title.replace(' ', "-"));
        manager.stage_image(StagedImage::new(&file_name, png(), MAX).unwrap());
        manager.save().await.unwrap()
    }

    #[test]
    fn test_add_tag_trims_and_appends() {
        let mut form = ProjectForm::default();
        form.tech_stack.push("Rust".into());
        assert!(form.add_tag("  React "));
        assert_eq!(form.tech_stack, ["Rust", "React"]);
    }

    #[test]
    fn test_add_blank_tag_is_a_no_op() {
        let mut form = ProjectForm::default();
        assert!(!form.add_tag(""));
        assert!(!form.add_tag("   \t"));
        assert!(form.tech_stack.is_empty());
    }

    #[test]
    fn test_remove_tag_removes_all_equal_entries() {
        let mut form = ProjectForm::default();
        for tag in ["Rust", "Go", "Rust"] {
            form.add_tag(tag);
        }
        form.remove_tag("Rust");
        assert_eq!(form.tech_stack, ["Go"]);
    }

    #[test]
    fn test_blank_optional_urls_become_absent() {
        let form = ProjectForm {
            title: Some("t".into()),
            description: Some("d".into()),
            live_url: Some("   ".into()),
            github_url: Some(" https://github.com/me/repo ".into()),
            ..ProjectForm::default()
        };
        let record = form.to_record("u".into()).unwrap();
        assert_eq!(record.live_url, None);
        assert_eq!(record.github_url.as_deref(), Some("https://github.com/me/repo"));
    }

    #[tokio::test]
    async fn test_create_adds_one_record_first_in_list() {
        let (memory, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        create(&mut manager, "Older").await;

        manager.open_create();
        fill(&mut manager, "Portfolio Site");
        manager.add_tag("Next.js");
        manager.stage_image(StagedImage::new("logo.png", png(), MAX).unwrap());
        let created = manager.save().await.unwrap();

        assert_eq!(manager.projects().len(), 2);
        assert_eq!(manager.projects()[0], created);
        assert_eq!(created.title, "Portfolio Site");
        assert_eq!(created.tech_stack, ["Next.js"]);
        assert!(!manager.is_form_open());
        assert!(manager.staged_image().is_none());

        let key = created.image_url.rsplit('/').next().unwrap().to_string();
        let (millis, name) = key.split_once('-').unwrap();
        assert!(millis.parse::<i64>().is_ok());
        assert_eq!(name, "logo.png");
        assert!(memory.object(&key).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_empty_list_with_notice() {
        let (_, mut gateway, token) = setup().await;
        let mut loaded = ProjectManager::new(gateway.clone(), Some(token.clone()));
        create(&mut loaded, "Stored").await;

        gateway.projects = Arc::new(crate::gateway::fixtures::UnreachableProjects);
        let mut manager = ProjectManager::new(gateway, Some(token));
        assert!(!manager.refresh().await);
        assert!(manager.projects().is_empty());
        assert_eq!(manager.notices(), [Notice::error("Failed to fetch projects")]);
    }

    #[tokio::test]
    async fn test_open_create_resets_state() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        manager.open_create();
        fill(&mut manager, "Draft");
        manager.add_tag("Rust");
        manager.stage_image(StagedImage::new("a.png", png(), MAX).unwrap());

        manager.open_create();
        assert_eq!(manager.form(), &ProjectForm::default());
        assert!(manager.staged_image().is_none());
        assert!(manager.preview().is_none());
        assert!(manager.editing_id().is_none());
    }

    #[tokio::test]
    async fn test_create_without_image_fails_validation() {
        let (memory, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        manager.open_create();
        fill(&mut manager, "No image");

        let err = manager.save().await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Validation(ValidationError::MissingImage)
        ));
        assert!(manager.is_form_open());
        assert!(memory.object_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_title_uploads_nothing() {
        let (memory, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        manager.open_create();
        manager.form_mut().description = Some("d".into());
        manager.stage_image(StagedImage::new("a.png", png(), MAX).unwrap());

        let err = manager.save().await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Validation(ValidationError::MissingTitle)
        ));
        assert!(memory.object_keys().await.is_empty());
    }

    #[tokio::test]
    async fn test_edit_without_new_image_keeps_image_url() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        let created = create(&mut manager, "Original").await;

        manager.open_edit_by_id(&created.id).unwrap();
        assert_eq!(
            manager.preview(),
            Some(&ImagePreview::Existing {
                url: created.image_url.clone()
            })
        );
        assert_eq!(manager.form().title.as_deref(), Some("Original"));
        manager.form_mut().title = Some("Renamed".into());
        let updated = manager.save().await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.image_url, created.image_url);
        assert_eq!(manager.projects().len(), 1);
        assert_eq!(manager.projects()[0].title, "Renamed");
    }

    #[tokio::test]
    async fn test_edit_with_new_image_replaces_url() {
        let (memory, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        let created = create(&mut manager, "Original").await;

        manager.open_edit(&created);
        manager.stage_image(StagedImage::new("new.png", png(), MAX).unwrap());
        let updated = manager.save().await.unwrap();

        assert_ne!(updated.image_url, created.image_url);
        assert!(updated.image_url.ends_with("-new.png"));
        // the old object is left in place
        assert_eq!(memory.object_keys().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upload_failure_inserts_nothing_and_keeps_form() {
        let (memory, mut gateway, token) = setup().await;
        gateway.images = Arc::new(FailingBucket);
        let mut manager = ProjectManager::new(gateway, Some(token));

        manager.open_create();
        fill(&mut manager, "Doomed");
        manager.add_tag("Rust");
        manager.stage_image(StagedImage::new("logo.png", png(), MAX).unwrap());

        let err = manager.save().await.unwrap_err();
        assert!(matches!(err, ManagerError::Upload(_)));
        assert!(manager.is_form_open());
        assert_eq!(manager.form().title.as_deref(), Some("Doomed"));
        assert_eq!(manager.form().tech_stack, ["Rust"]);
        assert!(manager.staged_image().is_some());
        assert_eq!(manager.notices().last().unwrap().level, NoticeLevel::Error);

        let rows = crate::gateway::ProjectStore::list(memory.as_ref(), ListQuery::default())
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_form_open() {
        let (_, gateway, _) = setup().await;
        // no token: the store refuses the insert
        let mut manager = ProjectManager::new(gateway, None);
        manager.open_create();
        fill(&mut manager, "Unauthorized");
        manager.form_mut().image_url = Some("https://cdn.example.com/existing.png".into());

        let err = manager.save().await.unwrap_err();
        assert!(matches!(err, ManagerError::Persist(GatewayError::Unauthorized)));
        assert!(manager.is_form_open());
        assert_eq!(manager.form().title.as_deref(), Some("Unauthorized"));
        assert_eq!(
            manager.notices().last().unwrap(),
            &Notice::error("Failed to save project")
        );
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        let created = create(&mut manager, "Keep me").await;
        let notices_before = manager.notices().len();

        let err = manager
            .delete(&created.id, Confirmation::Declined)
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Unconfirmed));
        assert_eq!(manager.notices().len(), notices_before);

        manager.refresh().await;
        assert_eq!(manager.projects().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_exactly_that_record() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        let a = create(&mut manager, "A").await;
        let b = create(&mut manager, "B").await;
        let c = create(&mut manager, "C").await;

        manager.delete(&b.id, Confirmation::Confirmed).await.unwrap();

        let ids: Vec<&RecordId> = manager.projects().iter().map(|p| &p.id).collect();
        assert_eq!(ids, [&c.id, &a.id]);
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_list_unchanged() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway.clone(), Some(token));
        create(&mut manager, "A").await;

        let mut anonymous = ProjectManager::new(gateway, None);
        anonymous.refresh().await;
        let id = anonymous.projects()[0].id.clone();
        let err = anonymous
            .delete(&id, Confirmation::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Delete(_)));
        assert_eq!(anonymous.projects().len(), 1);
        assert_eq!(
            anonymous.notices().last().unwrap(),
            &Notice::error("Failed to delete project")
        );
    }

    #[tokio::test]
    async fn test_open_edit_unknown_id_is_not_found() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        manager.refresh().await;
        let err = manager
            .open_edit_by_id(&RecordId::new("missing"))
            .unwrap_err();
        assert!(matches!(err, ManagerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_save_with_closed_form_is_rejected() {
        let (_, gateway, token) = setup().await;
        let mut manager = ProjectManager::new(gateway, Some(token));
        let err = manager.save().await.unwrap_err();
        assert!(matches!(
            err,
            ManagerError::Validation(ValidationError::FormClosed)
        ));
    }
}
