//! Authentication and projects.

use reqwest::StatusCode;
use serde_json::json;

use super::{ensure_success, expect_status, KonfuzioClient, TRACING_TARGET};
use crate::error::{Error, Result};
use crate::models::{AuthToken, CreatedResource, Project, ProjectDetails};
use crate::session::{Body, Request, Transport};

impl<T: Transport> KonfuzioClient<T> {
    /// Exchange username and password for an API token.
    ///
    /// Anything but 200 is reported as [`Error::Credentials`].
    pub fn request_auth_token(&self, username: &str, password: &str) -> Result<String> {
        let url = self.urls.auth_token();
        let body = json!({ "username": username, "password": password });
        let response = self.transport.send(Request::post(&url, Body::Json(body)))?;
        if response.status != StatusCode::OK {
            tracing::warn!(
                target: TRACING_TARGET,
                status = %response.status,
                detail = %response.detail(),
                "Token request refused"
            );
            return Err(Error::Credentials);
        }
        let token: AuthToken = response.json()?;
        Ok(token.token)
    }

    /// Create a project and return its id.
    pub fn create_project(&self, name: &str) -> Result<u64> {
        let url = self.urls.projects();
        let body = json!({ "name": name });
        let response = self.transport.send(Request::post(&url, Body::Json(body)))?;
        let response = ensure_success(&url, response)?;
        expect_status(&url, response.status, StatusCode::CREATED)?;
        let created: CreatedResource = response.json()?;
        tracing::info!(target: TRACING_TARGET, project_id = created.id, %name, "Created project");
        Ok(created.id)
    }

    /// All projects visible to the token.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.fetcher.fetch_all(&self.transport, &self.urls.projects())
    }

    /// Project record including labels and templates.
    ///
    /// `None` means the configured project.
    pub fn project_details(&self, project_id: Option<u64>) -> Result<ProjectDetails> {
        let project_id = match project_id {
            Some(id) => id,
            None => self.project_id()?,
        };
        self.fetcher
            .get_json(&self.transport, &self.urls.project(project_id))
    }

    /// Display name of a project.
    pub fn project_name(&self, project_id: u64) -> Result<String> {
        Ok(self.project_details(Some(project_id))?.name)
    }
}
