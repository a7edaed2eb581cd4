// src/api/deliveries.rs

use super::ApiClient;
use crate::{
    error::AppError,
    listing::ListQuery,
    models::{
        attempt::AttemptSummary,
        common::{ActionResponse, Paginated},
        delivery::{
            AssignUsersRequest, ControlRequest, DeliveryAction, DeliveryAssignments,
            DeliveryWithAssignments,
        },
        progress::ProgressSnapshot,
        user::User,
    },
};

impl ApiClient {
    /// Sends a lifecycle action. The backend may answer 200 with `success = false`.
    pub async fn control_delivery(
        &self,
        id: i64,
        action: DeliveryAction,
        session: &str,
    ) -> Result<ActionResponse, AppError> {
        let endpoint = format!("/deliveries/{}/control", id);
        let response: ActionResponse = self
            .post(&endpoint, Some(&ControlRequest { action }), Some(session))
            .await?;
        if !response.success {
            return Err(AppError::Conflict(response.message));
        }
        Ok(response)
    }

    pub async fn delivery_assignments(
        &self,
        id: i64,
        session: &str,
    ) -> Result<DeliveryAssignments, AppError> {
        self.get(&format!("/deliveries/{}/assignments", id), Some(session))
            .await
    }

    pub async fn assign_committee(
        &self,
        id: i64,
        user_ids: Vec<i64>,
        session: &str,
    ) -> Result<ActionResponse, AppError> {
        let endpoint = format!("/deliveries/{}/assign-committee", id);
        self.post(&endpoint, Some(&AssignUsersRequest { user_ids }), Some(session))
            .await
    }

    pub async fn assign_scorers(
        &self,
        id: i64,
        user_ids: Vec<i64>,
        session: &str,
    ) -> Result<ActionResponse, AppError> {
        let endpoint = format!("/deliveries/{}/assign-scorers", id);
        self.post(&endpoint, Some(&AssignUsersRequest { user_ids }), Some(session))
            .await
    }

    /// One-shot snapshot used for the first paint of the live progress view.
    pub async fn participant_progress(
        &self,
        id: i64,
        session: &str,
    ) -> Result<ProgressSnapshot, AppError> {
        self.get(&format!("/deliveries/{}/participant-progress", id), Some(session))
            .await
    }

    pub async fn delivery_attempts(
        &self,
        id: i64,
        query: &ListQuery,
        session: &str,
    ) -> Result<Paginated<AttemptSummary>, AppError> {
        self.list(&format!("/deliveries/{}/attempts", id), query, session)
            .await
    }

    /// Deliveries the current user is assigned to, optionally filtered by
    /// role ('committee' or 'scorer').
    pub async fn my_deliveries(
        &self,
        role: Option<&str>,
        session: &str,
    ) -> Result<Vec<DeliveryWithAssignments>, AppError> {
        let query: Vec<(String, String)> = role
            .map(|r| vec![("role".to_string(), r.to_string())])
            .unwrap_or_default();
        self.get_with_query("/my-deliveries", &query, Some(session))
            .await
    }

    pub async fn scorer_users(&self, session: &str) -> Result<Vec<User>, AppError> {
        self.get("/users/scorer", Some(session)).await
    }
}
