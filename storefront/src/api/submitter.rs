// Wizard submitter backed by the REST client.

use super::client::{ApiClient, ApiError};
use crate::models::requests::FormPayload;
use crate::wizard::{FileRef, FormState, SubmitError, SubmitReceipt, Submitter};

use async_trait::async_trait;
use log::{info, warn};
use std::sync::Arc;

/// Fields that only exist for client-side checks and never leave the process.
const CLIENT_ONLY_FIELDS: &[&str] = &["confirmPassword"];

/// On updates a blank value here means "leave unchanged" rather than "clear".
const PASSWORD_FIELDS: &[&str] = &["oldPassword", "password"];
const PHOTO_FIELDS: &[&str] = &["photos"];

/// Which endpoint a wizard writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitTarget {
    CreateVehicle,
    UpdateVehicle(String),
    BookMaintenance,
    UpdateAppointment(String),
    UpdateProfile(String),
}

impl SubmitTarget {
    fn describe(&self) -> String {
        match self {
            SubmitTarget::CreateVehicle => "POST vehicles".to_string(),
            SubmitTarget::UpdateVehicle(id) => format!("PUT vehicles/{}", id),
            SubmitTarget::BookMaintenance => "POST maintenance".to_string(),
            SubmitTarget::UpdateAppointment(id) => format!("PUT maintenance/{}", id),
            SubmitTarget::UpdateProfile(id) => format!("PUT users/{}", id),
        }
    }

    /// Creates only send what was filled in. Updates send cleared fields as empty values so
    /// the backend can clear them, except the fields where blank means "keep".
    fn payload(&self, form: &FormState) -> FormPayload {
        match self {
            SubmitTarget::CreateVehicle | SubmitTarget::BookMaintenance => {
                FormPayload::from_form(form, CLIENT_ONLY_FIELDS)
            }
            SubmitTarget::UpdateVehicle(_) => {
                FormPayload::for_update(form, CLIENT_ONLY_FIELDS, PHOTO_FIELDS)
            }
            SubmitTarget::UpdateAppointment(_) => {
                FormPayload::for_update(form, CLIENT_ONLY_FIELDS, &[])
            }
            SubmitTarget::UpdateProfile(_) => {
                FormPayload::for_update(form, CLIENT_ONLY_FIELDS, PASSWORD_FIELDS)
            }
        }
    }
}

pub struct RestSubmitter {
    client: Arc<ApiClient>,
    target: SubmitTarget,
}

impl RestSubmitter {
    pub fn new(client: Arc<ApiClient>, target: SubmitTarget) -> Self {
        Self { client, target }
    }

    pub fn target(&self) -> &SubmitTarget {
        &self.target
    }

    async fn dispatch(
        &self,
        payload: &FormPayload,
        attachments: &[FileRef],
    ) -> Result<Option<String>, ApiError> {
        match &self.target {
            SubmitTarget::CreateVehicle => {
                let created = self.client.create_vehicle(payload, attachments).await?;
                Ok(Some(created.id))
            }
            SubmitTarget::UpdateVehicle(id) => {
                self.client.update_vehicle(id, payload, attachments).await?;
                Ok(Some(id.clone()))
            }
            SubmitTarget::BookMaintenance => {
                let created = self.client.create_appointment(payload).await?;
                Ok(Some(created.id))
            }
            SubmitTarget::UpdateAppointment(id) => {
                self.client.update_appointment(id, payload).await?;
                Ok(Some(id.clone()))
            }
            SubmitTarget::UpdateProfile(user_id) => {
                self.client.update_user(user_id, payload).await?;
                Ok(Some(user_id.clone()))
            }
        }
    }
}

#[async_trait]
impl Submitter for RestSubmitter {
    async fn submit(
        &self,
        form: &FormState,
        attachments: &[FileRef],
    ) -> Result<SubmitReceipt, SubmitError> {
        let payload = self.target.payload(form);
        info!(
            "[PHASE: submit] [STEP: send] {} with {} attachment(s)",
            self.target.describe(),
            attachments.len()
        );
        match self.dispatch(&payload, attachments).await {
            Ok(id) => Ok(SubmitReceipt { id, message: None }),
            Err(e) => {
                warn!(
                    "[PHASE: submit] [STEP: send] {} failed: {}",
                    self.target.describe(),
                    e
                );
                Err(SubmitError::generic(format!(
                    "{}: {}",
                    self.target.describe(),
                    e
                )))
            }
        }
    }

    /// Pull the written entity back into the shared cache.
    async fn after_success(&self, receipt: &SubmitReceipt) {
        let Some(id) = receipt.id.as_deref() else {
            return;
        };
        match &self.target {
            SubmitTarget::CreateVehicle | SubmitTarget::UpdateVehicle(_) => {
                self.client.refresh_vehicle(id).await
            }
            SubmitTarget::BookMaintenance | SubmitTarget::UpdateAppointment(_) => {
                self.client.refresh_appointment(id).await
            }
            SubmitTarget::UpdateProfile(_) => {}
        }
    }
}
