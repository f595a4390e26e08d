use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{Session, User};

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_base_url: String,
    pub api_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            api_base_url: "http://localhost:54321".to_string(),
            api_key: "test-api-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn with_api_url(api_base_url: &str) -> Self {
        Self {
            api_base_url: api_base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            api_key: self.api_key.clone(),
            jwt_secret: self.jwt_secret.clone(),
            ..AppConfig::default()
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

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            roles: Vec::new(),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    pub fn to_session(&self, token: &str) -> Session {
        Session::authenticated(&self.to_user(), token)
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "iat": now.timestamp(),
                "exp": exp.timestamp()
            }),
            secret,
        )
    }

    pub fn create_token_with_metadata_roles(user: &TestUser, secret: &str, roles: &[&str]) -> String {
        let now = Utc::now();

        Self::sign(
            json!({
                "sub": user.id,
                "email": user.email,
                "role": user.role,
                "app_metadata": { "roles": roles },
                "iat": now.timestamp(),
                "exp": (now + Duration::hours(1)).timestamp()
            }),
            secret,
        )
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

    fn sign(payload: Value, secret: &str) -> String {
        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
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
}

/// Canned booking API payloads, camelCase as the backend sends them.
pub struct MockApiResponses;

impl MockApiResponses {
    pub fn doctor(id: &str, name: &str, specialization: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "specialization": specialization,
            "consultationFee": 150.0,
            "experience": 12,
            "isAvailable": true
        })
    }

    pub fn doctor_directory(doctors: Vec<Value>) -> Value {
        let total = doctors.len();
        json!({
            "doctors": doctors,
            "pagination": {
                "page": 1,
                "limit": 50,
                "total": total,
                "totalPages": 1
            }
        })
    }

    pub fn time_slot(start: &str, end: &str, is_available: bool, max: u32, current: u32) -> Value {
        json!({
            "startTime": start,
            "endTime": end,
            "isAvailable": is_available,
            "maxAppointments": max,
            "currentAppointments": current
        })
    }

    pub fn flat_available_slot(date: &str, day_of_week: &str, slot: Value, available_spots: u32) -> Value {
        json!({
            "date": date,
            "dayOfWeek": day_of_week,
            "timeSlot": slot,
            "availableSpots": available_spots
        })
    }

    pub fn nested_available_slots(date: &str, slots: Vec<Value>) -> Value {
        json!({
            "date": date,
            "availableSlots": slots
        })
    }

    pub fn patient_appointment(doctor_name: &str, start: &str, end: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "startTime": start,
            "endTime": end,
            "status": status,
            "doctor": { "name": doctor_name }
        })
    }

    pub fn appointments(appointments: Vec<Value>) -> Value {
        json!({ "appointments": appointments })
    }

    pub fn created_appointment(patient_id: &str, doctor_id: &str, date: &str, start: &str, end: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "patientId": patient_id,
            "doctorId": doctor_id,
            "appointmentDate": date,
            "startTime": start,
            "endTime": end,
            "type": "consultation",
            "status": "pending",
            "isUrgent": false
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "message": message })
    }
}
