// libs/appointment-cell/src/services/stats.rs
//
// Best-effort side effects after a booking or status change. Every public
// method returns immediately; the store writes run on a spawned task and a
// failure is logged, never surfaced to the request that triggered it.
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use shared_database::store::{StoreClient, StoreError};

use crate::models::{Appointment, AppointmentStatus};

/// Singleton counters document, collection `system_stats`.
#[derive(Debug, Clone, Default, Deserialize)]
struct SystemStats {
    #[serde(default)]
    total_appointments: i64,
    #[serde(default)]
    total_analyses: i64,
}

const STATS_DOC_ID: &str = "global";

pub struct StatsService {
    store: StoreClient,
}

impl StatsService {
    pub fn new(store: StoreClient) -> Self {
        Self { store }
    }

    /// Bump the appointments-created counter.
    pub fn record_appointment_created(&self, auth_token: &str) {
        self.spawn_increment(1, 0, auth_token);
    }

    /// Bump the completed-analyses counter.
    pub fn record_analysis_completed(&self, auth_token: &str) {
        self.spawn_increment(0, 1, auth_token);
    }

    /// Queue status-change notifications for every involved party that did
    /// not act. An admin action notifies both patient and doctor.
    pub fn notify_status_change(
        &self,
        appointment: &Appointment,
        new_status: AppointmentStatus,
        actor_id: &str,
        auth_token: &str,
    ) {
        for recipient_id in notification_recipients(appointment, actor_id) {
            let body = json!({
                "recipient_id": recipient_id,
                "appointment_id": appointment.id,
                "status": new_status,
                "message": format!(
                    "Appointment on {} at {} is now {}",
                    appointment.date,
                    appointment.time.format("%H:%M"),
                    new_status
                ),
                "read": false,
                "created_at": chrono::Utc::now().to_rfc3339(),
            });

            let store = self.store.clone();
            let token = auth_token.to_string();
            tokio::spawn(async move {
                let result: Result<Vec<Value>, StoreError> = store
                    .insert_returning("/rest/v1/notifications", Some(token.as_str()), body)
                    .await;
                if let Err(e) = result {
                    warn!("Failed to queue status notification: {}", e);
                }
            });
        }
    }

    fn spawn_increment(&self, appointments: i64, analyses: i64, auth_token: &str) {
        let store = self.store.clone();
        let token = auth_token.to_string();
        tokio::spawn(async move {
            if let Err(e) = Self::increment(&store, &token, appointments, analyses).await {
                warn!("Failed to update system stats: {}", e);
            }
        });
    }

    /// Read-modify-write on the singleton counters row, creating it on
    /// first use. Lost updates under concurrency are acceptable here.
    async fn increment(
        store: &StoreClient,
        token: &str,
        appointments: i64,
        analyses: i64,
    ) -> Result<(), StoreError> {
        let path = format!("/rest/v1/system_stats?id=eq.{}", STATS_DOC_ID);
        let rows: Vec<SystemStats> = store.request(Method::GET, &path, Some(token), None).await?;

        match rows.into_iter().next() {
            Some(current) => {
                let patch = json!({
                    "total_appointments": current.total_appointments + appointments,
                    "total_analyses": current.total_analyses + analyses,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                });
                let _: Vec<Value> = store.update_returning(&path, Some(token), patch).await?;
            }
            None => {
                debug!("Creating system stats document");
                let doc = json!({
                    "id": STATS_DOC_ID,
                    "total_appointments": appointments,
                    "total_analyses": analyses,
                    "updated_at": chrono::Utc::now().to_rfc3339(),
                });
                let _: Vec<Value> = store
                    .insert_returning("/rest/v1/system_stats", Some(token), doc)
                    .await?;
            }
        }

        Ok(())
    }
}

/// The parties to tell about a status change: everyone involved except the
/// actor themself.
pub fn notification_recipients(appointment: &Appointment, actor_id: &str) -> Vec<uuid::Uuid> {
    let mut recipients = Vec::new();
    if actor_id != appointment.patient_id.to_string() {
        recipients.push(appointment.patient_id);
    }
    if actor_id != appointment.doctor_id.to_string() {
        recipients.push(appointment.doctor_id);
    }
    recipients
}
