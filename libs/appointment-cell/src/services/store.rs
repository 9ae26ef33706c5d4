// libs/appointment-cell/src/services/store.rs
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_gateway::GatewayClient;
use shared_models::auth::IdentityProvider;

use crate::error::AppointmentError;
use crate::models::{
    Appointment, AppointmentFilter, AppointmentPatch, AppointmentStats, AppointmentStatus,
    NewAppointment, RemoveOutcome, StatusAction, UNASSIGNED,
};
use crate::services::gateway::{AppointmentGateway, RestAppointmentGateway};
use crate::services::normalizer::{entity_of, normalize, normalize_collection};
use crate::services::stats::aggregate;

#[derive(Debug, Default)]
struct StoreState {
    /// Display order: fetch order, then creation order.
    entries: Vec<Appointment>,
    /// Ids removed this session; kept out of later loads.
    removed: HashSet<String>,
    error: Option<AppointmentError>,
}

/// Decrements the in-flight counter when a gateway call finishes or is dropped.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Session-local mirror of the remote appointment collection.
///
/// Mutations reach the cache only after the gateway confirms them, and the
/// confirmed entity always comes from the response, never from the request.
/// A failed call leaves the collection exactly as it was. Responses are
/// applied in the order they arrive.
pub struct AppointmentStore {
    gateway: Arc<dyn AppointmentGateway>,
    state: RwLock<StoreState>,
    in_flight: AtomicUsize,
    use_status_endpoints: bool,
}

impl AppointmentStore {
    pub fn new(gateway: Arc<dyn AppointmentGateway>) -> Self {
        Self {
            gateway,
            state: RwLock::new(StoreState::default()),
            in_flight: AtomicUsize::new(0),
            use_status_endpoints: false,
        }
    }

    /// Store backed by the REST gateway described by `config`.
    pub fn connect(config: &AppConfig, identity: Arc<dyn IdentityProvider>) -> Self {
        let gateway = RestAppointmentGateway::new(GatewayClient::new(config), identity);
        Self::new(Arc::new(gateway)).with_status_endpoints(config.use_status_endpoints)
    }

    /// Route cancel/confirm/complete through `PATCH /appointments/{id}/<action>`
    /// instead of a `PUT` status patch.
    pub fn with_status_endpoints(mut self, enabled: bool) -> Self {
        self.use_status_endpoints = enabled;
        self
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn snapshot(&self) -> Vec<Appointment> {
        self.state.read().await.entries.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Appointment> {
        self.state
            .read()
            .await
            .entries
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// True while at least one gateway call is outstanding.
    pub fn loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Failure of the most recent operation, cleared when the next one starts.
    pub async fn error(&self) -> Option<AppointmentError> {
        self.state.read().await.error.clone()
    }

    pub async fn stats(&self) -> AppointmentStats {
        aggregate(&self.state.read().await.entries)
    }

    // ==========================================================================
    // GATEWAY OPERATIONS
    // ==========================================================================

    /// Replace the whole collection with the gateway's list.
    pub async fn load_all(&self, filter: &AppointmentFilter) -> Result<Vec<Appointment>, AppointmentError> {
        let _guard = self.begin().await;

        let response = match self.gateway.list(filter).await {
            Ok(response) => response,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al cargar citas")).await,
        };

        let loaded = normalize_collection(&response);
        let mut state = self.state.write().await;
        let removed = &state.removed;
        let entries: Vec<Appointment> = loaded
            .into_iter()
            .filter(|a| !removed.contains(&a.id))
            .collect();

        info!("Loaded {} appointments", entries.len());
        state.entries = entries;
        Ok(state.entries.clone())
    }

    /// Re-read one appointment and replace (or append) its entry.
    pub async fn refresh(&self, id: &str) -> Result<Appointment, AppointmentError> {
        let _guard = self.begin().await;

        let response = match self.gateway.fetch(id).await {
            Ok(response) => response,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al cargar cita")).await,
        };

        let Some(entity) = entity_of(&response) else {
            return self
                .fail(AppointmentError::Normalization(format!("No appointment in response for {}", id)))
                .await;
        };

        let appointment = normalize(entity);
        {
            let mut state = self.state.write().await;
            state.removed.remove(id);
            state.removed.remove(&appointment.id);
        }
        Ok(self.put(id, appointment).await)
    }

    /// Submit a new appointment. The caller has already authorized it.
    pub async fn create(&self, input: &NewAppointment) -> Result<Appointment, AppointmentError> {
        let _guard = self.begin().await;

        if let Err(e) = input.validate() {
            return self.fail(e).await;
        }

        let response = match self.gateway.create(input.to_wire()).await {
            Ok(response) => response,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al crear cita")).await,
        };

        let Some(entity) = entity_of(&response) else {
            return self
                .fail(AppointmentError::Normalization("Create response carried no appointment".to_string()))
                .await;
        };

        let appointment = normalize(entity);
        info!("Created appointment {}", appointment.id);

        let mut state = self.state.write().await;
        state.removed.remove(&appointment.id);
        match state.entries.iter().position(|a| a.id == appointment.id) {
            Some(index) => state.entries[index] = appointment.clone(),
            None => state.entries.push(appointment.clone()),
        }

        Ok(appointment)
    }

    /// Send `patch` and replace the entry with what the gateway returns.
    pub async fn update(&self, id: &str, patch: &AppointmentPatch) -> Result<Appointment, AppointmentError> {
        let _guard = self.begin().await;

        let response = match self.gateway.update(id, patch.to_wire()).await {
            Ok(response) => response,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al actualizar cita")).await,
        };

        let appointment = self.resolve_entity(id, &response).await?;
        debug!("Appointment {} updated to {}", id, appointment.status);
        Ok(self.put(id, appointment).await)
    }

    /// Delete remotely, then drop the local entry whatever the server did with it.
    pub async fn remove(&self, id: &str) -> Result<RemoveOutcome, AppointmentError> {
        let _guard = self.begin().await;

        let response = match self.gateway.delete(id).await {
            Ok(response) => response,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al eliminar cita")).await,
        };

        let outcome = match entity_of(&response).map(normalize) {
            Some(appointment) if appointment.status == AppointmentStatus::Cancelled => {
                info!("Appointment {} was cancelled rather than deleted", id);
                RemoveOutcome::SoftDeleted(appointment)
            }
            _ => RemoveOutcome::Deleted,
        };

        let mut state = self.state.write().await;
        state.entries.retain(|a| a.id != id);
        state.removed.insert(id.to_string());

        Ok(outcome)
    }

    pub async fn cancel(&self, id: &str, reason: Option<&str>) -> Result<Appointment, AppointmentError> {
        self.apply_status(id, StatusAction::Cancel, &StatusAction::Cancel.patch(None), reason)
            .await
    }

    pub async fn confirm(&self, id: &str) -> Result<Appointment, AppointmentError> {
        self.apply_status(id, StatusAction::Confirm, &StatusAction::Confirm.patch(None), None)
            .await
    }

    /// Completion notes travel with the status change.
    pub async fn complete(&self, id: &str, notes: Option<&str>) -> Result<Appointment, AppointmentError> {
        self.apply_status(id, StatusAction::Complete, &StatusAction::Complete.patch(notes), None)
            .await
    }

    /// Send an already-authorized status `patch` for `action`.
    ///
    /// On the `PUT` route the patch is the body. On the endpoint route only the
    /// cancel reason or the patch's notes are carried.
    pub async fn apply_status(
        &self,
        id: &str,
        action: StatusAction,
        patch: &AppointmentPatch,
        reason: Option<&str>,
    ) -> Result<Appointment, AppointmentError> {
        if !self.use_status_endpoints {
            return self.update(id, patch).await;
        }

        let _guard = self.begin().await;

        let body = match action {
            StatusAction::Cancel => endpoint_body("reason", reason),
            StatusAction::Confirm => json!({}),
            StatusAction::Complete => endpoint_body("notes", patch.notes.as_deref()),
        };

        let response = match self.gateway.transition(id, action, body).await {
            Ok(response) => response,
            Err(e) => {
                let fallback = match action {
                    StatusAction::Cancel => "Error al cancelar cita",
                    StatusAction::Confirm => "Error al confirmar cita",
                    StatusAction::Complete => "Error al completar cita",
                };
                return self.fail(AppointmentError::remote(e, fallback)).await;
            }
        };

        let appointment = self.resolve_entity(id, &response).await?;
        Ok(self.put(id, appointment).await)
    }

    // ==========================================================================
    // INTERNALS
    // ==========================================================================

    async fn begin(&self) -> InFlight<'_> {
        let guard = InFlight::enter(&self.in_flight);
        self.state.write().await.error = None;
        guard
    }

    async fn fail<T>(&self, err: AppointmentError) -> Result<T, AppointmentError> {
        error!("Appointment operation failed: {}", err);
        self.state.write().await.error = Some(err.clone());
        Err(err)
    }

    /// The entity a mutation response carried, or a fresh read when it was only an acknowledgement.
    async fn resolve_entity(&self, id: &str, response: &Value) -> Result<Appointment, AppointmentError> {
        if let Some(entity) = entity_of(response) {
            return Ok(normalize(entity));
        }

        debug!("Mutation response for {} had no entity, re-reading", id);
        let fetched = match self.gateway.fetch(id).await {
            Ok(fetched) => fetched,
            Err(e) => return self.fail(AppointmentError::remote(e, "Error al cargar cita")).await,
        };

        match entity_of(&fetched) {
            Some(entity) => Ok(normalize(entity)),
            None => {
                self.fail(AppointmentError::Normalization(format!("No appointment in response for {}", id)))
                    .await
            }
        }
    }

    /// Replace the entry for the confirmed appointment, appending when it is not
    /// cached yet. Ids removed this session stay out of the cache.
    async fn put(&self, id: &str, mut appointment: Appointment) -> Appointment {
        if appointment.id == UNASSIGNED {
            appointment.id = id.to_string();
        }

        let mut state = self.state.write().await;
        if state.removed.contains(id) || state.removed.contains(&appointment.id) {
            debug!("Appointment {} was removed, not caching the response", appointment.id);
            return appointment;
        }

        let position = state
            .entries
            .iter()
            .position(|a| a.id == appointment.id)
            .or_else(|| state.entries.iter().position(|a| a.id == id));
        match position {
            Some(index) => state.entries[index] = appointment.clone(),
            None => state.entries.push(appointment.clone()),
        }

        appointment
    }
}

/// Endpoint body carrying `key` only when a value is present.
fn endpoint_body(key: &str, value: Option<&str>) -> Value {
    let mut body = serde_json::Map::new();
    if let Some(value) = value {
        body.insert(key.to_string(), Value::from(value));
    }
    Value::Object(body)
}
