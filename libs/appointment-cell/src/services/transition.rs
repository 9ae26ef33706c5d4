// libs/appointment-cell/src/services/transition.rs
use tracing::{debug, info, warn};

use shared_models::auth::{Actor, Role};

use crate::error::AppointmentError;
use crate::models::{Appointment, AppointmentPatch, AppointmentStatus};

const ADMIN_TARGETS: &[AppointmentStatus] = &[
    AppointmentStatus::Scheduled,
    AppointmentStatus::Confirmed,
    AppointmentStatus::Completed,
    AppointmentStatus::Cancelled,
];
const DOCTOR_TARGETS: &[AppointmentStatus] = &[
    AppointmentStatus::Confirmed,
    AppointmentStatus::Completed,
    AppointmentStatus::Cancelled,
];
const PATIENT_TARGETS: &[AppointmentStatus] = &[AppointmentStatus::Cancelled];

/// Role-gated decision over requested appointment changes. Performs no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransitionEngine;

impl TransitionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Status targets a role may request from a non-terminal appointment.
    pub fn allowed_targets(&self, role: Role) -> &'static [AppointmentStatus] {
        match role {
            Role::Admin => ADMIN_TARGETS,
            Role::Doctor => DOCTOR_TARGETS,
            Role::Patient => PATIENT_TARGETS,
        }
    }

    /// Only administrators edit anything besides status.
    pub fn can_edit_fields(&self, role: Role) -> bool {
        role == Role::Admin
    }

    /// Doctors may record notes together with a move to Completed.
    pub fn can_attach_completion_notes(&self, role: Role) -> bool {
        matches!(role, Role::Admin | Role::Doctor)
    }

    fn may_edit(&self, role: Role, requested: &AppointmentPatch) -> bool {
        if !requested.touches_non_status_fields() || self.can_edit_fields(role) {
            return true;
        }

        !requested.touches_fields_besides_notes()
            && requested.status == Some(AppointmentStatus::Completed)
            && self.can_attach_completion_notes(role)
    }

    /// Decide whether `actor` may apply `requested` to `current`.
    ///
    /// On success returns the patch to send: the requested status, plus every
    /// other permitted field whose value differs from `current`. Besides
    /// administrators, only a doctor completing an appointment may send a
    /// field (its notes).
    pub fn authorize(
        &self,
        current: &Appointment,
        actor: &Actor,
        requested: &AppointmentPatch,
    ) -> Result<AppointmentPatch, AppointmentError> {
        debug!(
            "Authorizing change on appointment {} by {} ({})",
            current.id, actor.id, actor.role
        );

        if current.status.is_terminal() {
            warn!(
                "Rejected change on {} appointment {} by {}",
                current.status, current.id, actor.id
            );
            return Err(AppointmentError::TerminalState(current.status));
        }

        if !self.may_edit(actor.role, requested) {
            warn!("{} {} attempted a field edit on appointment {}", actor.role, actor.id, current.id);
            return Err(AppointmentError::Permission(format!(
                "A {} may only change the appointment status",
                actor.role
            )));
        }

        if let Some(target) = requested.status {
            if !self.allowed_targets(actor.role).contains(&target) {
                warn!(
                    "{} {} may not move appointment {} to {}",
                    actor.role, actor.id, current.id, target
                );
                return Err(AppointmentError::Permission(format!(
                    "A {} may not set an appointment to {}",
                    actor.role, target
                )));
            }
        }

        let patch = self.minimal_patch(current, requested);
        info!("Change on appointment {} authorized for {}", current.id, actor.id);
        Ok(patch)
    }

    /// Status targets `actor` could pick for `current` right now.
    pub fn available_targets(&self, current: &Appointment, actor: &Actor) -> Vec<AppointmentStatus> {
        if current.status.is_terminal() {
            return Vec::new();
        }

        self.allowed_targets(actor.role)
            .iter()
            .copied()
            .filter(|target| *target != current.status)
            .collect()
    }

    fn minimal_patch(&self, current: &Appointment, requested: &AppointmentPatch) -> AppointmentPatch {
        AppointmentPatch {
            patient_ref: changed(&requested.patient_ref, &current.patient_ref),
            doctor_ref: changed(&requested.doctor_ref, &current.doctor_ref),
            room_ref: requested
                .room_ref
                .clone()
                .filter(|room| current.room_ref.as_ref() != Some(room)),
            scheduled_at: requested.scheduled_at.filter(|at| current.scheduled_at != Some(*at)),
            reason: changed(&requested.reason, &current.reason),
            notes: requested
                .notes
                .clone()
                .filter(|notes| current.notes.as_ref() != Some(notes)),
            status: requested.status,
        }
    }
}

fn changed(requested: &Option<String>, current: &str) -> Option<String> {
    requested.clone().filter(|value| value != current)
}

/// Free-standing form of [`TransitionEngine::authorize`].
pub fn authorize(
    current: &Appointment,
    actor: &Actor,
    requested: &AppointmentPatch,
) -> Result<AppointmentPatch, AppointmentError> {
    TransitionEngine::new().authorize(current, actor, requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appointment(status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "1".to_string(),
            patient_ref: "10".to_string(),
            doctor_ref: "20".to_string(),
            room_ref: Some("3".to_string()),
            scheduled_at: None,
            reason: "Control".to_string(),
            notes: None,
            status,
            patient_display_name: "Lucía Fernández".to_string(),
            doctor_display_name: "Andrés Rojas".to_string(),
        }
    }

    #[test]
    fn test_minimal_patch_drops_unchanged_fields() {
        let engine = TransitionEngine::new();
        let admin = Actor::new("1", Role::Admin);
        let requested = AppointmentPatch {
            reason: Some("Control".to_string()),
            room_ref: Some("4".to_string()),
            status: Some(AppointmentStatus::Confirmed),
            ..AppointmentPatch::default()
        };

        let patch = engine
            .authorize(&appointment(AppointmentStatus::Scheduled), &admin, &requested)
            .unwrap();

        assert_eq!(
            patch,
            AppointmentPatch {
                room_ref: Some("4".to_string()),
                status: Some(AppointmentStatus::Confirmed),
                ..AppointmentPatch::default()
            }
        );
    }

    #[test]
    fn test_available_targets() {
        let engine = TransitionEngine::new();
        let doctor = Actor::new("20", Role::Doctor);

        assert_eq!(
            engine.available_targets(&appointment(AppointmentStatus::Confirmed), &doctor),
            vec![AppointmentStatus::Completed, AppointmentStatus::Cancelled]
        );
        assert!(engine
            .available_targets(&appointment(AppointmentStatus::Completed), &doctor)
            .is_empty());
    }
}
