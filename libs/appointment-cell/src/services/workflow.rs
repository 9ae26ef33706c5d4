// libs/appointment-cell/src/services/workflow.rs
use std::sync::Arc;

use tracing::{debug, info, warn};

use shared_models::auth::{Actor, IdentityProvider};

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStats, AppointmentStatus,
    NewAppointment, RemoveOutcome, StatusAction,
};
use crate::services::store::AppointmentStore;
use crate::services::transition::TransitionEngine;

/// Entry point for actor-initiated appointment changes.
///
/// Every mutation is validated, then authorized for the current actor, and
/// only then handed to the store.
pub struct AppointmentWorkflow {
    identity: Arc<dyn IdentityProvider>,
    engine: TransitionEngine,
    store: Arc<AppointmentStore>,
}

impl AppointmentWorkflow {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<AppointmentStore>) -> Self {
        Self {
            identity,
            engine: TransitionEngine::new(),
            store,
        }
    }

    pub fn actor(&self) -> &Actor {
        self.identity.actor()
    }

    pub fn store(&self) -> &Arc<AppointmentStore> {
        &self.store
    }

    pub async fn load(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        self.store.load_all(filter).await
    }

    pub async fn stats(&self) -> AppointmentStats {
        self.store.stats().await
    }

    pub async fn book(&self, input: NewAppointment) -> Result<Appointment, AppointmentError> {
        input.validate()?;
        info!("{} {} booking appointment with doctor {}", self.actor().role, self.actor().id, input.doctor_ref);

        self.store.create(&input).await
    }

    /// Authorize `requested` against the cached entry, then send the resulting patch.
    ///
    /// A request that changes nothing returns the cached entry without a remote call.
    pub async fn request_change(
        &self,
        id: &str,
        requested: &AppointmentPatch,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.current(id).await?;
        let patch = self.engine.authorize(&current, self.actor(), requested)?;

        if patch.is_empty() {
            debug!("Change on appointment {} is a no-op", id);
            return Ok(current);
        }

        self.store.update(id, &patch).await
    }

    pub async fn cancel(&self, id: &str, reason: Option<&str>) -> Result<Appointment, AppointmentError> {
        self.change_status(id, StatusAction::Cancel, None, reason).await
    }

    pub async fn confirm(&self, id: &str) -> Result<Appointment, AppointmentError> {
        self.change_status(id, StatusAction::Confirm, None, None).await
    }

    pub async fn complete(&self, id: &str, notes: Option<&str>) -> Result<Appointment, AppointmentError> {
        self.change_status(id, StatusAction::Complete, notes, None).await
    }

    /// Deleting is reserved to administrators.
    pub async fn delete(&self, id: &str) -> Result<RemoveOutcome, AppointmentError> {
        if !self.actor().is_admin() {
            warn!("{} {} attempted to delete appointment {}", self.actor().role, self.actor().id, id);
            return Err(AppointmentError::Permission(format!(
                "A {} may not delete appointments",
                self.actor().role
            )));
        }

        self.current(id).await?;
        self.store.remove(id).await
    }

    /// Status targets the current actor may choose for `id`.
    pub async fn available_targets(&self, id: &str) -> Result<Vec<AppointmentStatus>, AppointmentError> {
        let current = self.current(id).await?;
        Ok(self.engine.available_targets(&current, self.actor()))
    }

    /// Authorize the exact patch `action` sends, then hand that patch to the store.
    async fn change_status(
        &self,
        id: &str,
        action: StatusAction,
        notes: Option<&str>,
        reason: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        let current = self.current(id).await?;
        let patch = self.engine.authorize(&current, self.actor(), &action.patch(notes))?;

        self.store.apply_status(id, action, &patch, reason).await
    }

    async fn current(&self, id: &str) -> Result<Appointment, AppointmentError> {
        self.store
            .get(id)
            .await
            .ok_or_else(|| AppointmentError::NotFound(id.to_string()))
    }
}
