// REST data-access client for the storefront backend.
//
// Every endpoint answers with the `ApiResponse<T>` envelope. Transport failures, non-2xx
// statuses and `success=false` envelopes all surface as `ApiError`; callers that feed the
// wizard collapse them into the generic submit failure.

use crate::api::query::ListQuery;
use crate::config::AppConfig;
use crate::models::requests::FormPayload;
use crate::models::responses::{
    ApiResponse, Created, MaintenanceAppointment, Page, User, Vehicle,
};
use crate::models::state::{AppState, Collection};
use crate::utils::logging::mask_authorization;
use crate::wizard::FileRef;

use anyhow::Context;
use log::{debug, info, warn};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("server returned HTTP {status}")]
    Status { status: u16, message: Option<String> },
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("invalid endpoint: {0}")]
    Url(String),
    #[error("attachment could not be read: {0}")]
    Attachment(String),
}

pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    state: Arc<AppState>,
    page_size: u32,
}

impl ApiClient {
    pub fn new(config: &AppConfig, state: Arc<AppState>) -> anyhow::Result<Self> {
        let base = Url::parse(&config.api_base_url)
            .with_context(|| format!("Invalid API base URL: {}", config.api_base_url))?;
        // No idle pooling: each terminal submission runs on its own short-lived runtime.
        let mut builder = reqwest::Client::builder().pool_max_idle_per_host(0);
        if let Some(t) = config.request_timeout() {
            builder = builder.timeout(t);
        }
        let http = builder.build().context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base,
            state,
            page_size: config.page_size,
        })
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// First page at the configured page size.
    pub fn list_query(&self) -> ListQuery {
        ListQuery::new(self.page_size)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Url(self.base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let mut req = self.http.request(method.clone(), url.clone());
        match self.state.token().await {
            Some(token) => {
                let header = format!("Bearer {}", token);
                debug!(
                    "[PHASE: api] [STEP: request] {} {} auth={}",
                    method,
                    url,
                    mask_authorization(&header)
                );
                req = req.header(reqwest::header::AUTHORIZATION, header);
            }
            None => debug!("[PHASE: api] [STEP: request] {} {} (anonymous)", method, url),
        }
        req
    }

    /// Send and unwrap the envelope. `Ok(None)` means success without a `data` member.
    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<Option<T>, ApiError> {
        let started = Instant::now();
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        info!(
            "[PHASE: api] [STEP: response] status={} duration_ms={}",
            status.as_u16(),
            started.elapsed().as_millis()
        );

        if !status.is_success() {
            let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(&body)
                .ok()
                .and_then(|env| env.error.or(env.message));
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        if body.trim().is_empty() {
            return Ok(None);
        }
        let envelope: ApiResponse<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(ApiError::Rejected(
                envelope
                    .error
                    .or(envelope.message)
                    .unwrap_or_else(|| "request was not accepted".to_string()),
            ));
        }
        Ok(envelope.data)
    }

    async fn send_data<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, ApiError> {
        self.send(req)
            .await?
            .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
    }

    async fn list<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &ListQuery,
    ) -> Result<Page<T>, ApiError> {
        let mut url = self.endpoint(&[resource])?;
        query.apply(&mut url);
        let req = self.request(Method::GET, url).await;
        self.send_data(req).await
    }

    /// JSON body, or multipart (`payload` JSON part + one `attachments` part per file) when
    /// there are files to upload.
    async fn with_body(
        &self,
        req: RequestBuilder,
        payload: &FormPayload,
        attachments: &[FileRef],
    ) -> Result<RequestBuilder, ApiError> {
        if attachments.is_empty() {
            return Ok(req.json(payload));
        }
        let mut form = reqwest::multipart::Form::new().text("payload", payload.to_json_string());
        for file in attachments {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|e| ApiError::Attachment(format!("{}: {}", file.file_name, e)))?;
            let mut part =
                reqwest::multipart::Part::bytes(bytes).file_name(file.file_name.clone());
            if let Some(mime) = &file.mime_type {
                part = part
                    .mime_str(mime)
                    .map_err(|e| ApiError::Attachment(e.to_string()))?;
            }
            form = form.part("attachments", part);
        }
        Ok(req.multipart(form))
    }

    // =========================
    // Vehicles
    // =========================

    pub async fn list_vehicles(&self, query: &ListQuery) -> Result<Page<Vehicle>, ApiError> {
        self.state.set_loading(Collection::Vehicles, true).await;
        let result = self.list::<Vehicle>("vehicles", query).await;
        self.state.set_loading(Collection::Vehicles, false).await;
        let page = result?;
        self.state.replace_vehicles(page.items.clone()).await;
        Ok(page)
    }

    pub async fn get_vehicle(&self, id: &str) -> Result<Vehicle, ApiError> {
        let url = self.endpoint(&["vehicles", id])?;
        let req = self.request(Method::GET, url).await;
        self.send_data(req).await
    }

    pub async fn create_vehicle(
        &self,
        payload: &FormPayload,
        attachments: &[FileRef],
    ) -> Result<Created, ApiError> {
        let url = self.endpoint(&["vehicles"])?;
        let req = self.request(Method::POST, url).await;
        let req = self.with_body(req, payload, attachments).await?;
        self.send_data(req).await
    }

    pub async fn update_vehicle(
        &self,
        id: &str,
        payload: &FormPayload,
        attachments: &[FileRef],
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["vehicles", id])?;
        let req = self.request(Method::PUT, url).await;
        let req = self.with_body(req, payload, attachments).await?;
        self.send::<serde_json::Value>(req).await.map(|_| ())
    }

    pub async fn delete_vehicle(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["vehicles", id])?;
        let req = self.request(Method::DELETE, url).await;
        self.send::<serde_json::Value>(req).await?;
        self.state.remove_vehicle(id).await;
        Ok(())
    }

    // =========================
    // Maintenance
    // =========================

    pub async fn list_appointments(
        &self,
        query: &ListQuery,
    ) -> Result<Page<MaintenanceAppointment>, ApiError> {
        self.state.set_loading(Collection::Appointments, true).await;
        let result = self
            .list::<MaintenanceAppointment>("maintenance", query)
            .await;
        self.state.set_loading(Collection::Appointments, false).await;
        let page = result?;
        self.state.replace_appointments(page.items.clone()).await;
        Ok(page)
    }

    pub async fn get_appointment(&self, id: &str) -> Result<MaintenanceAppointment, ApiError> {
        let url = self.endpoint(&["maintenance", id])?;
        let req = self.request(Method::GET, url).await;
        self.send_data(req).await
    }

    pub async fn create_appointment(&self, payload: &FormPayload) -> Result<Created, ApiError> {
        let url = self.endpoint(&["maintenance"])?;
        let req = self.request(Method::POST, url).await.json(payload);
        self.send_data(req).await
    }

    pub async fn update_appointment(&self, id: &str, payload: &FormPayload) -> Result<(), ApiError> {
        let url = self.endpoint(&["maintenance", id])?;
        let req = self.request(Method::PUT, url).await.json(payload);
        self.send::<serde_json::Value>(req).await.map(|_| ())
    }

    pub async fn delete_appointment(&self, id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&["maintenance", id])?;
        let req = self.request(Method::DELETE, url).await;
        self.send::<serde_json::Value>(req).await?;
        self.state.remove_appointment(id).await;
        Ok(())
    }

    // =========================
    // Users
    // =========================

    pub async fn list_users(&self, query: &ListQuery) -> Result<Page<User>, ApiError> {
        self.state.set_loading(Collection::Users, true).await;
        let result = self.list::<User>("users", query).await;
        self.state.set_loading(Collection::Users, false).await;
        result
    }

    pub async fn get_user(&self, id: &str) -> Result<User, ApiError> {
        let url = self.endpoint(&["users", id])?;
        let req = self.request(Method::GET, url).await;
        self.send_data(req).await
    }

    pub async fn update_user(&self, id: &str, payload: &FormPayload) -> Result<(), ApiError> {
        let url = self.endpoint(&["users", id])?;
        let req = self.request(Method::PUT, url).await.json(payload);
        self.send::<serde_json::Value>(req).await.map(|_| ())
    }

    /// Re-read one vehicle into the cache. Failures are logged, not returned.
    pub async fn refresh_vehicle(&self, id: &str) {
        match self.get_vehicle(id).await {
            Ok(v) => self.state.upsert_vehicle(v).await,
            Err(e) => warn!(
                "[PHASE: api] [STEP: refresh] vehicle {} not refreshed: {}",
                id, e
            ),
        }
    }

    pub async fn refresh_appointment(&self, id: &str) {
        match self.get_appointment(id).await {
            Ok(a) => self.state.upsert_appointment(a).await,
            Err(e) => warn!(
                "[PHASE: api] [STEP: refresh] appointment {} not refreshed: {}",
                id, e
            ),
        }
    }
}
