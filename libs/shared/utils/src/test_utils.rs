use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub store_url: String,
    pub store_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            store_url: "http://localhost:54321".to_string(),
            store_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_store_url(url: &str) -> Self {
        Self {
            store_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            store_url: self.store_url.clone(),
            store_anon_key: self.store_anon_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            store_timeout_secs: 5,
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn with_id(id: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            email: format!("{}@example.com", role),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id,
            "email": user.email,
            "role": user.role,
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret", Some(24))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

/// Canned store documents for wiremock-backed tests.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn availability_response(doctor_id: &str) -> serde_json::Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "doctor_id": doctor_id,
            "weekly_schedule": Self::default_weekly_schedule(),
            "custom_dates": [],
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339()
        })
    }

    pub fn default_weekly_schedule() -> serde_json::Value {
        let mut days = Vec::new();
        for day in ["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"] {
            days.push(json!({
                "day": day,
                "start_time": "09:00",
                "end_time": "17:00",
                "is_available": true,
                "max_appointments": 1
            }));
        }
        for day in ["Saturday", "Sunday"] {
            days.push(json!({
                "day": day,
                "start_time": "09:00",
                "end_time": "13:00",
                "is_available": false,
                "max_appointments": 1
            }));
        }
        json!(days)
    }

    pub fn appointment_response(
        appointment_id: &str,
        patient_id: &str,
        doctor_id: &str,
        date: &str,
        time: &str,
        status: &str,
    ) -> serde_json::Value {
        json!({
            "id": appointment_id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "patient_name": "Test Patient",
            "doctor_name": "Dr. Test",
            "date": date,
            "time": time,
            "status": status,
            "notes": null,
            "attached_analysis_id": null,
            "last_modified_by": null,
            "created_at": Utc::now().to_rfc3339(),
            "updated_at": Utc::now().to_rfc3339(),
            "completed_at": null
        })
    }

    pub fn analysis_response(analysis_id: &str, patient_id: &str) -> serde_json::Value {
        json!({
            "id": analysis_id,
            "patient_id": patient_id,
            "condition": "eczema",
            "confidence": 0.87,
            "created_at": Utc::now().to_rfc3339()
        })
    }
}
