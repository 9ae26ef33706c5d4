use chrono::{Duration, Local, NaiveDate, TimeZone, Utc};

use appointment_cell::{aggregate, aggregate_on, Appointment, AppointmentStats, AppointmentStatus};

fn at_local_noon(day: NaiveDate) -> chrono::DateTime<Utc> {
    let naive = day.and_hms_opt(12, 0, 0).unwrap();
    Local.from_local_datetime(&naive).earliest().unwrap().with_timezone(&Utc)
}

fn appointment(id: &str, status: AppointmentStatus, day: Option<NaiveDate>) -> Appointment {
    Appointment {
        id: id.to_string(),
        patient_ref: "10".to_string(),
        doctor_ref: "20".to_string(),
        room_ref: None,
        scheduled_at: day.map(at_local_noon),
        reason: "Control".to_string(),
        notes: None,
        status,
        patient_display_name: "Paciente".to_string(),
        doctor_display_name: "Médico".to_string(),
    }
}

#[test]
fn test_aggregate_scenario() {
    let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let yesterday = today - Duration::days(1);
    let appointments = vec![
        appointment("1", AppointmentStatus::Scheduled, Some(today)),
        appointment("2", AppointmentStatus::Confirmed, Some(yesterday)),
        appointment("3", AppointmentStatus::Completed, Some(today)),
        appointment("4", AppointmentStatus::Cancelled, None),
        appointment("5", AppointmentStatus::Cancelled, Some(yesterday)),
    ];

    assert_eq!(
        aggregate_on(&appointments, today),
        AppointmentStats {
            total: 5,
            pending: 1,
            confirmed: 1,
            completed: 1,
            cancelled: 2,
            today: 2,
            completed_today: 1,
        }
    );
}

#[test]
fn test_aggregate_empty() {
    assert_eq!(aggregate(&[]), AppointmentStats::default());
}

#[test]
fn test_aggregate_uses_local_today() {
    let today = Local::now().date_naive();
    let appointments = vec![
        appointment("1", AppointmentStatus::Scheduled, Some(today)),
        appointment("2", AppointmentStatus::Scheduled, Some(today + Duration::days(7))),
    ];

    let stats = aggregate(&appointments);
    assert_eq!(stats.today, 1);
    assert_eq!(stats.pending, 2);
}

#[test]
fn test_undated_appointments_never_count_as_today() {
    let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    let appointments = vec![appointment("1", AppointmentStatus::Completed, None)];

    let stats = aggregate_on(&appointments, today);
    assert_eq!(stats.today, 0);
    assert_eq!(stats.completed_today, 0);
    assert_eq!(stats.completed, 1);
}
