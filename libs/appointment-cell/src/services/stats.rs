// libs/appointment-cell/src/services/stats.rs
use chrono::{Local, NaiveDate};

use crate::models::{Appointment, AppointmentStats, AppointmentStatus};

/// Dashboard counts, with "today" taken from the local clock.
pub fn aggregate(appointments: &[Appointment]) -> AppointmentStats {
    aggregate_on(appointments, Local::now().date_naive())
}

/// Dashboard counts relative to `today` (a local calendar date).
pub fn aggregate_on(appointments: &[Appointment], today: NaiveDate) -> AppointmentStats {
    appointments.iter().fold(AppointmentStats::default(), |mut stats, appointment| {
        stats.total += 1;

        match appointment.status {
            AppointmentStatus::Scheduled => stats.pending += 1,
            AppointmentStatus::Confirmed => stats.confirmed += 1,
            AppointmentStatus::Completed => stats.completed += 1,
            AppointmentStatus::Cancelled => stats.cancelled += 1,
        }

        if is_on(appointment, today) {
            stats.today += 1;
            if appointment.status == AppointmentStatus::Completed {
                stats.completed_today += 1;
            }
        }

        stats
    })
}

/// Whether the appointment falls on `day` in local time. Undated entries never do.
pub fn is_on(appointment: &Appointment, day: NaiveDate) -> bool {
    appointment
        .scheduled_at
        .map(|at| at.with_timezone(&Local).date_naive() == day)
        .unwrap_or(false)
}
