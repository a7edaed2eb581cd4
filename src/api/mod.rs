// src/api/mod.rs

//! HTTP client for the exam backend's REST API.

pub mod attempts;
pub mod auth;
pub mod catalog;
pub mod deliveries;

use std::time::Duration;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{Serialize, de::DeserializeOwned};

use crate::{error::AppError, listing::ListQuery, models::common::Paginated};

pub use catalog::Resource;

/// Header carrying the backend session id on every authenticated call.
pub const SESSION_HEADER: &str = "X-Session-ID";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api{}", self.base_url, endpoint)
    }

    fn request(&self, method: Method, endpoint: &str, session: Option<&str>) -> RequestBuilder {
        let url = self.url(endpoint);
        tracing::debug!("API Request: {} {}", method, url);

        let builder = self.http.request(method, url);
        match session {
            Some(id) => builder.header(SESSION_HEADER, id),
            None => builder,
        }
    }

    /// Sends the request and decodes a JSON body. An empty body decodes as `null`.
    async fn send<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        endpoint: &str,
    ) -> Result<T, AppError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::warn!("API Error on {}: {} {}", endpoint, status.as_u16(), text);
            return Err(error_from_response(status, text));
        }

        let body = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(body).map_err(|e| {
            AppError::InternalServerError(format!("Unexpected payload from {}: {}", endpoint, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        session: Option<&str>,
    ) -> Result<T, AppError> {
        let builder = self.request(Method::GET, endpoint, session);
        self.send(builder, endpoint).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(String, String)],
        session: Option<&str>,
    ) -> Result<T, AppError> {
        let builder = self.request(Method::GET, endpoint, session).query(query);
        self.send(builder, endpoint).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: Option<&B>,
        session: Option<&str>,
    ) -> Result<T, AppError> {
        let mut builder = self.request(Method::POST, endpoint, session);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder, endpoint).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
        session: Option<&str>,
    ) -> Result<T, AppError> {
        let builder = self.request(Method::PUT, endpoint, session).json(body);
        self.send(builder, endpoint).await
    }

    pub async fn delete(&self, endpoint: &str, session: Option<&str>) -> Result<(), AppError> {
        let builder = self.request(Method::DELETE, endpoint, session);
        self.send::<serde_json::Value>(builder, endpoint).await?;
        Ok(())
    }

    /// Fetches one page of a paginated list endpoint.
    pub async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &ListQuery,
        session: &str,
    ) -> Result<Paginated<T>, AppError> {
        self.get_with_query(endpoint, &query.to_query_pairs(), Some(session))
            .await
    }

    pub async fn health(&self) -> Result<serde_json::Value, AppError> {
        self.get("/health", None).await
    }
}

/// Maps a non-success response to an error. The backend reports errors
/// either as `{ "error": ... }`, `{ "message": ... }`, `{ "detail": ... }`
/// or as plain text.
fn error_from_response(status: StatusCode, text: String) -> AppError {
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| {
            ["error", "message", "detail"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                text
            }
        });

    match status {
        StatusCode::UNAUTHORIZED => AppError::AuthError(message),
        StatusCode::NOT_FOUND => AppError::NotFound(message),
        _ => AppError::Backend {
            status: status.as_u16(),
            message,
        },
    }
}
