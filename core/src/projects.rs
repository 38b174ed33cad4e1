//! Projects and tags.

use crate::client::TodoMeClient;
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest};
use crate::transport::Transport;
use crate::types::{CreateProject, Project, ProjectList, ProjectPayload, Tag, TagList};

impl<T: Transport> TodoMeClient<T> {
    pub fn build_list_projects(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "projects")
    }

    pub fn build_create_project(&self, input: &CreateProject) -> Result<HttpRequest> {
        self.json_request(HttpMethod::Post, "projects", input)
    }

    pub fn build_list_tags(&self) -> HttpRequest {
        self.request(HttpMethod::Get, "tags")
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.send::<ProjectList>(self.build_list_projects())
            .map(|list| list.projects)
    }

    /// Create a project, optionally nested under `parent_id`. The service
    /// owns the tree and rejects cycles.
    pub fn create_project(&self, input: &CreateProject) -> Result<Project> {
        self.send::<ProjectPayload>(self.build_create_project(input)?)
            .map(ProjectPayload::into_project)
    }

    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        self.send::<TagList>(self.build_list_tags()).map(|list| list.tags)
    }
}
