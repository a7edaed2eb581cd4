// src/handlers/mod.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{
    api::{ApiClient, Resource},
    error::AppError,
    listing::{ListPage, ListQuery},
};

pub mod auth;
pub mod catalog;
pub mod dashboard;
pub mod delivery;
pub mod profile;
pub mod progress;
pub mod scoring;

/// A rendered list page together with the query that produced it.
#[derive(Debug, Serialize)]
pub struct ListView<T> {
    pub title: &'static str,
    pub query: ListQuery,
    #[serde(flatten)]
    pub page: ListPage<T>,
}

/// Query flag standing in for the browser's blocking confirmation dialog.
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

impl ConfirmParams {
    /// Destructive actions are refused unless explicitly confirmed.
    pub fn require(&self, what: &str) -> Result<(), AppError> {
        if self.confirm {
            Ok(())
        } else {
            Err(AppError::BadRequest(format!(
                "Deleting {} requires confirmation (confirm=true)",
                what
            )))
        }
    }
}

/// Fetches one page of `resource` using the request's query string as the
/// applied list state.
pub(crate) async fn list_view<T: DeserializeOwned>(
    api: &ApiClient,
    resource: Resource,
    title: &'static str,
    params: &BTreeMap<String, String>,
    session_id: &str,
) -> Result<ListView<T>, AppError> {
    let query = ListQuery::from_params(&resource.list_config(), params)?;
    let page = api.list_resource::<T>(resource, &query, session_id).await?;
    Ok(ListView {
        title,
        query,
        page: page.into(),
    })
}
