// libs/appointment-cell/src/models.rs
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AppointmentError;

/// Reference used when the source record names no patient, doctor or id.
pub const UNASSIGNED: &str = "unassigned";

/// Display name used when no party name can be resolved.
pub const UNASSIGNED_NAME: &str = "Sin asignar";

// ==============================================================================
// CANONICAL APPOINTMENT
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: String,
    pub patient_ref: String,
    pub doctor_ref: String,
    pub room_ref: Option<String>,
    /// `None` when the source record carried no usable date.
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub patient_display_name: String,
    pub doctor_display_name: String,
}

impl Appointment {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled_at.is_some()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub const ALL: [AppointmentStatus; 4] = [
        AppointmentStatus::Scheduled,
        AppointmentStatus::Confirmed,
        AppointmentStatus::Completed,
        AppointmentStatus::Cancelled,
    ];

    /// Completed and Cancelled admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Map any spelling the backends emit onto the canonical status.
    pub fn from_wire(raw: &str) -> Option<AppointmentStatus> {
        match raw.trim().to_lowercase().as_str() {
            "pendiente" | "programada" | "pending" | "scheduled" => Some(AppointmentStatus::Scheduled),
            "confirmada" | "confirmed" => Some(AppointmentStatus::Confirmed),
            "completada" | "completed" => Some(AppointmentStatus::Completed),
            "cancelada" | "cancelled" | "canceled" => Some(AppointmentStatus::Cancelled),
            _ => None,
        }
    }

    /// Spelling the clinic backend stores in its `estado` column.
    pub fn wire_value(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "programada",
            AppointmentStatus::Confirmed => "confirmada",
            AppointmentStatus::Completed => "completada",
            AppointmentStatus::Cancelled => "cancelada",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// RAW WIRE RECORD
// ==============================================================================

/// Appointment record exactly as the remote service sent it.
///
/// Every key any backend revision has used is listed; nothing is typed beyond
/// `Value`. Only the normalizer reads this.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawAppointment {
    pub id: Option<Value>,
    #[serde(rename = "_id")]
    pub mongo_id: Option<Value>,

    pub fecha_hora: Option<Value>,
    pub fecha: Option<Value>,
    pub date: Option<Value>,
    pub scheduled_at: Option<Value>,

    pub estado: Option<Value>,
    pub status: Option<Value>,

    pub motivo: Option<Value>,
    pub reason: Option<Value>,
    pub descripcion: Option<Value>,

    pub notas: Option<Value>,
    pub notes: Option<Value>,

    pub paciente_id: Option<Value>,
    pub id_paciente: Option<Value>,
    pub patient_id: Option<Value>,
    pub patient_ref: Option<Value>,

    pub medico_id: Option<Value>,
    pub id_medico: Option<Value>,
    pub doctor_id: Option<Value>,
    pub doctor_ref: Option<Value>,

    pub consultorio_id: Option<Value>,
    pub id_consultorio: Option<Value>,
    pub room_id: Option<Value>,
    pub room_ref: Option<Value>,

    pub paciente: Option<Value>,
    pub patient: Option<Value>,
    pub medico: Option<Value>,
    pub doctor: Option<Value>,

    pub paciente_nombre: Option<Value>,
    pub medico_nombre: Option<Value>,
    pub patient_display_name: Option<Value>,
    pub doctor_display_name: Option<Value>,
}

impl RawAppointment {
    /// Non-object input yields an empty record.
    pub fn from_value(value: &Value) -> Self {
        if !value.is_object() {
            return Self::default();
        }
        serde_json::from_value(value.clone()).unwrap_or_default()
    }
}

// ==============================================================================
// REQUESTS
// ==============================================================================

/// Fields a caller asks to change. Display names are derived and cannot be patched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPatch {
    pub patient_ref: Option<String>,
    pub doctor_ref: Option<String>,
    pub room_ref: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && !self.touches_non_status_fields()
    }

    pub fn touches_non_status_fields(&self) -> bool {
        self.touches_fields_besides_notes() || self.notes.is_some()
    }

    /// Any of the scheduling fields (parties, room, date-time, reason).
    pub fn touches_fields_besides_notes(&self) -> bool {
        self.patient_ref.is_some()
            || self.doctor_ref.is_some()
            || self.room_ref.is_some()
            || self.scheduled_at.is_some()
            || self.reason.is_some()
    }

    /// Request body in the backend's field names.
    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();

        if let Some(patient_ref) = &self.patient_ref {
            body.insert("paciente_id".to_string(), Value::from(patient_ref.as_str()));
        }
        if let Some(doctor_ref) = &self.doctor_ref {
            body.insert("medico_id".to_string(), Value::from(doctor_ref.as_str()));
        }
        if let Some(room_ref) = &self.room_ref {
            body.insert("consultorio_id".to_string(), Value::from(room_ref.as_str()));
        }
        if let Some(scheduled_at) = &self.scheduled_at {
            body.insert("fecha_hora".to_string(), Value::from(scheduled_at.to_rfc3339()));
        }
        if let Some(reason) = &self.reason {
            body.insert("motivo".to_string(), Value::from(reason.as_str()));
        }
        if let Some(notes) = &self.notes {
            body.insert("notas".to_string(), Value::from(notes.as_str()));
        }
        if let Some(status) = &self.status {
            body.insert("estado".to_string(), Value::from(status.wire_value()));
        }

        Value::Object(body)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewAppointment {
    pub patient_ref: String,
    pub doctor_ref: String,
    pub room_ref: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub reason: String,
    pub notes: Option<String>,
}

impl NewAppointment {
    /// Structural checks done before anything is sent.
    pub fn validate(&self) -> Result<(), AppointmentError> {
        let mut missing = Vec::new();

        if self.patient_ref.trim().is_empty() {
            missing.push("patient");
        }
        if self.doctor_ref.trim().is_empty() {
            missing.push("doctor");
        }
        if self.scheduled_at.is_none() {
            missing.push("date-time");
        }
        if self.reason.trim().is_empty() {
            missing.push("reason");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppointmentError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn to_wire(&self) -> Value {
        let mut body = Map::new();

        body.insert("paciente_id".to_string(), Value::from(self.patient_ref.as_str()));
        body.insert("medico_id".to_string(), Value::from(self.doctor_ref.as_str()));
        if let Some(room_ref) = &self.room_ref {
            body.insert("consultorio_id".to_string(), Value::from(room_ref.as_str()));
        }
        if let Some(scheduled_at) = &self.scheduled_at {
            body.insert("fecha_hora".to_string(), Value::from(scheduled_at.to_rfc3339()));
        }
        body.insert("motivo".to_string(), Value::from(self.reason.as_str()));
        if let Some(notes) = &self.notes {
            body.insert("notas".to_string(), Value::from(notes.as_str()));
        }

        Value::Object(body)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentFilter {
    pub patient_ref: Option<String>,
    pub doctor_ref: Option<String>,
    pub status: Option<AppointmentStatus>,
    pub date: Option<NaiveDate>,
}

impl AppointmentFilter {
    pub fn for_patient(patient_ref: impl Into<String>) -> Self {
        Self {
            patient_ref: Some(patient_ref.into()),
            ..Self::default()
        }
    }

    pub fn for_doctor(doctor_ref: impl Into<String>) -> Self {
        Self {
            doctor_ref: Some(doctor_ref.into()),
            ..Self::default()
        }
    }

    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();

        if let Some(patient_ref) = &self.patient_ref {
            query.push(("paciente_id", patient_ref.clone()));
        }
        if let Some(doctor_ref) = &self.doctor_ref {
            query.push(("medico_id", doctor_ref.clone()));
        }
        if let Some(status) = &self.status {
            query.push(("estado", status.wire_value().to_string()));
        }
        if let Some(date) = &self.date {
            query.push(("fecha", date.format("%Y-%m-%d").to_string()));
        }

        query
    }
}

/// Convenience endpoints under `/appointments/{id}/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Cancel,
    Confirm,
    Complete,
}

impl StatusAction {
    pub fn path_segment(&self) -> &'static str {
        match self {
            StatusAction::Cancel => "cancel",
            StatusAction::Confirm => "confirm",
            StatusAction::Complete => "complete",
        }
    }

    pub fn target(&self) -> AppointmentStatus {
        match self {
            StatusAction::Cancel => AppointmentStatus::Cancelled,
            StatusAction::Confirm => AppointmentStatus::Confirmed,
            StatusAction::Complete => AppointmentStatus::Completed,
        }
    }

    /// The patch this action sends on the `PUT` route.
    pub fn patch(&self, notes: Option<&str>) -> AppointmentPatch {
        AppointmentPatch {
            notes: notes.map(str::to_string),
            ..AppointmentPatch::status(self.target())
        }
    }
}

// ==============================================================================
// RESULTS
// ==============================================================================

/// What the server reported doing on delete. The local entry is dropped either way.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoveOutcome {
    Deleted,
    /// The server kept the record and marked it cancelled.
    SoftDeleted(Appointment),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentStats {
    pub total: usize,
    /// Appointments still in `Scheduled`.
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub today: usize,
    pub completed_today: usize,
}
