// src/api/catalog.rs

use serde::{Serialize, de::DeserializeOwned};

use super::ApiClient;
use crate::{
    error::AppError,
    listing::{ListConfig, ListQuery, SortOrder},
    models::common::Paginated,
};

/// A backend resource with the usual list / get / create / update / delete endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Users,
    Groups,
    Exams,
    Categories,
    /// Question sets are served by the `items` endpoint.
    QuestionSets,
    Questions,
    Participants,
    Deliveries,
}

impl Resource {
    pub fn path(&self) -> &'static str {
        match self {
            Resource::Users => "/users",
            Resource::Groups => "/groups",
            Resource::Exams => "/exams",
            Resource::Categories => "/categories",
            Resource::QuestionSets => "/items",
            Resource::Questions => "/questions",
            Resource::Participants => "/takers",
            Resource::Deliveries => "/deliveries",
        }
    }

    /// Human-readable name used in error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Resource::Users => "User",
            Resource::Groups => "Group",
            Resource::Exams => "Exam",
            Resource::Categories => "Category",
            Resource::QuestionSets => "Question set",
            Resource::Questions => "Question",
            Resource::Participants => "Participant",
            Resource::Deliveries => "Delivery",
        }
    }

    /// List defaults of the management page showing this resource.
    pub fn list_config(&self) -> ListConfig {
        let config = ListConfig::new(self.path());
        match self {
            Resource::Deliveries => config.date_field("scheduled_at"),
            Resource::Participants | Resource::Users => config.sort("name", SortOrder::Asc),
            _ => config,
        }
    }
}

impl ApiClient {
    pub async fn list_resource<T: DeserializeOwned>(
        &self,
        resource: Resource,
        query: &ListQuery,
        session: &str,
    ) -> Result<Paginated<T>, AppError> {
        self.list(resource.path(), query, session).await
    }

    pub async fn fetch<T: DeserializeOwned>(
        &self,
        resource: Resource,
        id: i64,
        session: &str,
    ) -> Result<T, AppError> {
        let endpoint = format!("{}/{}", resource.path(), id);
        self.get(&endpoint, Some(session)).await.map_err(|e| match e {
            AppError::NotFound(_) => AppError::NotFound(format!("{} not found", resource.label())),
            other => other,
        })
    }

    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        body: &B,
        session: &str,
    ) -> Result<T, AppError> {
        self.post(resource.path(), Some(body), Some(session)).await
    }

    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: Resource,
        id: i64,
        body: &B,
        session: &str,
    ) -> Result<T, AppError> {
        let endpoint = format!("{}/{}", resource.path(), id);
        self.put(&endpoint, body, Some(session)).await
    }

    pub async fn remove(&self, resource: Resource, id: i64, session: &str) -> Result<(), AppError> {
        let endpoint = format!("{}/{}", resource.path(), id);
        self.delete(&endpoint, Some(session)).await
    }
}
