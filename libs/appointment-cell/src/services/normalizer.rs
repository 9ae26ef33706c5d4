// libs/appointment-cell/src/services/normalizer.rs
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use tracing::{debug, warn};

use crate::models::{Appointment, AppointmentStatus, RawAppointment, UNASSIGNED, UNASSIGNED_NAME};

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Turn any record the remote service sends into a canonical `Appointment`.
///
/// Total: missing or malformed fields degrade to sentinels. Feeding a
/// serialized `Appointment` back in returns the same value.
pub fn normalize(raw: &Value) -> Appointment {
    normalize_raw(&RawAppointment::from_value(raw))
}

pub fn normalize_raw(raw: &RawAppointment) -> Appointment {
    let id = first_ref(&[&raw.id, &raw.mongo_id]).unwrap_or_else(|| {
        debug!("Appointment record without id");
        UNASSIGNED.to_string()
    });

    let patient_party = first_present(&[&raw.paciente, &raw.patient]);
    let doctor_party = first_present(&[&raw.medico, &raw.doctor]);

    let patient_ref = first_ref(&[&raw.paciente_id, &raw.id_paciente, &raw.patient_id, &raw.patient_ref])
        .or_else(|| patient_party.and_then(|p| p.get("id")).and_then(as_ref_string))
        .unwrap_or_else(|| UNASSIGNED.to_string());
    let doctor_ref = first_ref(&[&raw.medico_id, &raw.id_medico, &raw.doctor_id, &raw.doctor_ref])
        .or_else(|| doctor_party.and_then(|p| p.get("id")).and_then(as_ref_string))
        .unwrap_or_else(|| UNASSIGNED.to_string());
    let room_ref = first_ref(&[&raw.consultorio_id, &raw.id_consultorio, &raw.room_id, &raw.room_ref]);

    let scheduled_at = first_present(&[&raw.fecha_hora, &raw.fecha, &raw.date, &raw.scheduled_at])
        .and_then(parse_scheduled_at);

    let status = match first_present(&[&raw.estado, &raw.status]) {
        Some(Value::String(s)) => normalize_status(s),
        Some(other) => {
            warn!("Non-string appointment status {}, defaulting to scheduled", other);
            AppointmentStatus::Scheduled
        }
        None => AppointmentStatus::Scheduled,
    };

    let reason = first_string(&[&raw.motivo, &raw.reason, &raw.descripcion]).unwrap_or_default();
    let notes = first_string(&[&raw.notas, &raw.notes]);

    let patient_display_name = resolve_display_name(
        patient_party,
        &[&raw.paciente_nombre, &raw.patient_display_name],
    );
    let doctor_display_name = resolve_display_name(
        doctor_party,
        &[&raw.medico_nombre, &raw.doctor_display_name],
    );

    Appointment {
        id,
        patient_ref,
        doctor_ref,
        room_ref,
        scheduled_at,
        reason,
        notes,
        status,
        patient_display_name,
        doctor_display_name,
    }
}

/// Lenient status mapping: unknown spellings become `Scheduled`.
pub fn normalize_status(raw: &str) -> AppointmentStatus {
    AppointmentStatus::from_wire(raw).unwrap_or_else(|| {
        warn!("Unknown appointment status '{}', defaulting to scheduled", raw);
        AppointmentStatus::Scheduled
    })
}

/// Accepts RFC 3339, naive date-times (local time), bare dates (local midnight)
/// and epoch milliseconds.
pub fn parse_scheduled_at(value: &Value) -> Option<DateTime<Utc>> {
    let parsed = match value {
        Value::String(s) => parse_date_str(s.trim()),
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    };

    if parsed.is_none() {
        warn!("Unparseable appointment date {}", value);
    }
    parsed
}

fn parse_date_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Name resolution for one party: nested `usuario` names, then the party's own
/// names, then its e-mail, then flat fallback keys, then `"Sin asignar"`.
fn resolve_display_name(party: Option<&Value>, flat: &[&Option<Value>]) -> String {
    party
        .and_then(party_display_name)
        .or_else(|| first_string(flat).filter(|s| !s.trim().is_empty()))
        .unwrap_or_else(|| UNASSIGNED_NAME.to_string())
}

fn party_display_name(party: &Value) -> Option<String> {
    if let Value::String(name) = party {
        return Some(name.trim().to_string()).filter(|n| !n.is_empty());
    }

    let usuario = party.get("usuario");

    usuario
        .and_then(full_name)
        .or_else(|| full_name(party))
        .or_else(|| usuario.and_then(email))
        .or_else(|| email(party))
}

fn full_name(value: &Value) -> Option<String> {
    let nombre = value.get("nombre").and_then(Value::as_str).unwrap_or_default();
    let apellido = value.get("apellido").and_then(Value::as_str).unwrap_or_default();
    let joined = format!("{} {}", nombre.trim(), apellido.trim());
    let joined = joined.trim();

    (!joined.is_empty()).then(|| joined.to_string())
}

fn email(value: &Value) -> Option<String> {
    value
        .get("correo")
        .or_else(|| value.get("email"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// First candidate holding a value; blank strings fall through to the next key.
fn first_present<'a>(candidates: &[&'a Option<Value>]) -> Option<&'a Value> {
    candidates
        .iter()
        .find_map(|c| c.as_ref().filter(|v| !is_blank(v)))
}

fn first_string(candidates: &[&Option<Value>]) -> Option<String> {
    candidates.iter().find_map(|c| {
        c.as_ref()
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn first_ref(candidates: &[&Option<Value>]) -> Option<String> {
    candidates.iter().find_map(|c| c.as_ref().and_then(as_ref_string))
}

/// Identifiers arrive as strings or numbers; anything else is absent.
fn as_ref_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// ==============================================================================
// RESPONSE ENVELOPES
// ==============================================================================

const COLLECTION_KEYS: [&str; 2] = ["data", "items"];
const ENTITY_KEYS: [&str; 4] = ["entity", "data", "appointment", "cita"];

/// Records of a list response: a bare array, `{data: [...]}` or `{items: [...]}`.
pub fn collection_items(response: &Value) -> Vec<Value> {
    if let Value::Array(items) = response {
        return items.clone();
    }

    COLLECTION_KEYS
        .iter()
        .find_map(|key| response.get(*key).and_then(Value::as_array))
        .cloned()
        .unwrap_or_else(|| {
            warn!("List response carried no appointment array");
            Vec::new()
        })
}

pub fn normalize_collection(response: &Value) -> Vec<Appointment> {
    collection_items(response).iter().map(normalize).collect()
}

/// The single record inside an entity response, if there is one.
///
/// Handles bare records, `{entity}`/`{data}`/`{appointment}` envelopes and
/// one-element arrays. A plain acknowledgement like `{message}` yields `None`.
pub fn entity_of(response: &Value) -> Option<&Value> {
    match response {
        Value::Array(items) => items.first().and_then(entity_of),
        Value::Object(map) => {
            if let Some(inner) = ENTITY_KEYS
                .iter()
                .find_map(|key| map.get(*key).filter(|v| v.is_object()))
            {
                return Some(inner);
            }
            (map.contains_key("id") || map.contains_key("_id")).then_some(response)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_as_ref_string() {
        assert_eq!(as_ref_string(&json!(7)), Some("7".to_string()));
        assert_eq!(as_ref_string(&json!(" abc ")), Some("abc".to_string()));
        assert_eq!(as_ref_string(&json!("")), None);
        assert_eq!(as_ref_string(&json!(null)), None);
        assert_eq!(as_ref_string(&json!({"id": 1})), None);
    }

    #[test]
    fn test_party_display_name_precedence() {
        let nested = json!({
            "nombre": "Flat",
            "apellido": "Name",
            "usuario": { "nombre": "Ana", "apellido": "Pérez" }
        });
        assert_eq!(party_display_name(&nested), Some("Ana Pérez".to_string()));

        let flat = json!({ "nombre": "Juan", "usuario": { "correo": "j@x.com" } });
        assert_eq!(party_display_name(&flat), Some("Juan".to_string()));

        let email_only = json!({ "usuario": { "correo": "ana@clinica.com" } });
        assert_eq!(party_display_name(&email_only), Some("ana@clinica.com".to_string()));

        assert_eq!(party_display_name(&json!({ "id": 3 })), None);
    }

    #[test]
    fn test_parse_epoch_millis() {
        let parsed = parse_scheduled_at(&json!(1_741_944_600_000_i64)).unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-03-14T09:30:00+00:00");
    }

    #[test]
    fn test_parse_naive_uses_local_time() {
        let parsed = parse_scheduled_at(&json!("2025-03-14T09:30")).unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!(local.format("%Y-%m-%d %H:%M").to_string(), "2025-03-14 09:30");

        let midnight = parse_scheduled_at(&json!("2025-03-14")).unwrap();
        assert_eq!(
            midnight.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
            "2025-03-14 00:00"
        );
    }

    #[test]
    fn test_parse_garbage_is_none() {
        assert_eq!(parse_scheduled_at(&json!("mañana")), None);
        assert_eq!(parse_scheduled_at(&json!("")), None);
        assert_eq!(parse_scheduled_at(&json!(true)), None);
    }

    #[test]
    fn test_entity_of_shapes() {
        let record = json!({ "id": 1, "estado": "confirmada" });

        assert_eq!(entity_of(&record), Some(&record));
        assert_eq!(entity_of(&json!({ "message": "ok", "entity": record.clone() })), Some(&record));
        assert_eq!(entity_of(&json!({ "success": true, "data": record.clone() })), Some(&record));
        assert_eq!(entity_of(&json!([record.clone()])), Some(&record));
        assert_eq!(entity_of(&json!({ "message": "Cita eliminada" })), None);
        assert_eq!(entity_of(&json!(null)), None);
    }
}
