use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentError, AppointmentStatus};
use appointment_cell::services::lifecycle::LifecycleService;
use appointment_cell::services::stats::notification_recipients;
use shared_utils::test_utils::TestUser;

fn appointment(status: AppointmentStatus) -> Appointment {
    let now = Utc::now();
    Appointment {
        id: Uuid::new_v4(),
        patient_id: Uuid::new_v4(),
        doctor_id: Uuid::new_v4(),
        patient_name: "Test Patient".to_string(),
        doctor_name: "Dr. Test".to_string(),
        date: NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        status,
        notes: None,
        attached_analysis_id: None,
        created_at: now,
        updated_at: now,
        completed_at: None,
        last_modified_by: None,
    }
}

fn assigned_doctor(appointment: &Appointment) -> shared_models::auth::User {
    TestUser::with_id(&appointment.doctor_id.to_string(), "doctor").to_user()
}

fn booking_patient(appointment: &Appointment) -> shared_models::auth::User {
    TestUser::with_id(&appointment.patient_id.to_string(), "patient").to_user()
}

#[test]
fn pending_can_be_confirmed_by_assigned_doctor() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Pending);
    let doctor = assigned_doctor(&appt);

    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Confirmed, &doctor),
        Ok(())
    );
}

#[test]
fn pending_cannot_jump_straight_to_completed() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Pending);
    let doctor = assigned_doctor(&appt);

    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Completed, &doctor),
        Err(AppointmentError::InvalidTransition {
            from: AppointmentStatus::Pending,
            to: AppointmentStatus::Completed,
        })
    );
}

#[test]
fn terminal_states_accept_no_transitions() {
    let service = LifecycleService::new();
    for status in [
        AppointmentStatus::Cancelled,
        AppointmentStatus::Rejected,
        AppointmentStatus::Completed,
    ] {
        let appt = appointment(status);
        let doctor = assigned_doctor(&appt);
        assert!(service.valid_transitions(status).is_empty());
        assert_matches!(
            service.validate_transition(&appt, AppointmentStatus::Cancelled, &doctor),
            Err(AppointmentError::InvalidTransition { .. })
        );
    }
}

#[test]
fn completion_requires_attached_analysis() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Confirmed);
    let doctor = assigned_doctor(&appt);

    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Completed, &doctor),
        Err(AppointmentError::MissingAnalysis)
    );

    let mut with_analysis = appointment(AppointmentStatus::Confirmed);
    with_analysis.attached_analysis_id = Some(Uuid::new_v4());
    let doctor = assigned_doctor(&with_analysis);

    assert_matches!(
        service.validate_transition(&with_analysis, AppointmentStatus::Completed, &doctor),
        Ok(())
    );
}

#[test]
fn only_the_assigned_doctor_can_complete() {
    let service = LifecycleService::new();
    let mut appt = appointment(AppointmentStatus::Confirmed);
    appt.attached_analysis_id = Some(Uuid::new_v4());

    let admin = TestUser::admin("admin@example.com").to_user();
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Completed, &admin),
        Err(AppointmentError::Unauthorized)
    );

    let other_doctor = TestUser::doctor("other@example.com").to_user();
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Completed, &other_doctor),
        Err(AppointmentError::Unauthorized)
    );
}

#[test]
fn patients_can_cancel_their_own_booking_only() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Pending);

    let patient = booking_patient(&appt);
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Cancelled, &patient),
        Ok(())
    );

    let stranger = TestUser::patient("stranger@example.com").to_user();
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Cancelled, &stranger),
        Err(AppointmentError::Unauthorized)
    );
}

#[test]
fn patients_cannot_confirm_or_reject() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Pending);
    let patient = booking_patient(&appt);

    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Confirmed, &patient),
        Err(AppointmentError::Unauthorized)
    );
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Rejected, &patient),
        Err(AppointmentError::Unauthorized)
    );
}

#[test]
fn admins_can_confirm_and_cancel() {
    let service = LifecycleService::new();
    let appt = appointment(AppointmentStatus::Pending);
    let admin = TestUser::admin("admin@example.com").to_user();

    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Confirmed, &admin),
        Ok(())
    );
    assert_matches!(
        service.validate_transition(&appt, AppointmentStatus::Cancelled, &admin),
        Ok(())
    );
}

#[test]
fn status_changes_notify_everyone_but_the_actor() {
    let appt = appointment(AppointmentStatus::Pending);

    // Doctor acts: only the patient hears about it, and vice versa.
    assert_eq!(
        notification_recipients(&appt, &appt.doctor_id.to_string()),
        vec![appt.patient_id]
    );
    assert_eq!(
        notification_recipients(&appt, &appt.patient_id.to_string()),
        vec![appt.doctor_id]
    );

    // An admin is neither party, so both get notified.
    let admin_id = Uuid::new_v4().to_string();
    assert_eq!(
        notification_recipients(&appt, &admin_id),
        vec![appt.patient_id, appt.doctor_id]
    );
}

#[test]
fn legacy_scheduled_status_reads_as_pending() {
    let status: AppointmentStatus = serde_json::from_str("\"scheduled\"").unwrap();
    assert_eq!(status, AppointmentStatus::Pending);

    // Never written back out as the legacy spelling.
    assert_eq!(
        serde_json::to_string(&AppointmentStatus::Pending).unwrap(),
        "\"pending\""
    );
}
