use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::{BloodType, DonationStatus, Sex};

// -- JWT Claims --

/// JWT claims shared between the REST middleware and the auth endpoints.
/// Canonical definition lives here so every crate agrees on the token shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub username: String,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub username: String,
    pub token: String,
}

// -- Donation requests --

/// Korean donor-registration ids look like `######-####`.
static REGISTRATION_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{6}-\d{4}$").expect("registration id pattern"));

pub fn validate_registration_id(value: &str) -> Result<(), ValidationError> {
    if REGISTRATION_ID.is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("registration_id_format");
        err.message = Some("expected ######-####".into());
        Err(err)
    }
}

/// JSON carried in the `request_data` part of the multipart create form.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateDonationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(range(min = 16, max = 70))]
    pub age: i64,
    pub sex: Sex,
    pub blood_type: BloodType,
    pub content: String,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    pub donation_due_date: NaiveDate,
    #[validate(custom(function = validate_registration_id))]
    pub donator_registered_id: String,
}

#[derive(Debug, Serialize)]
pub struct DonationRequestIdResponse {
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DonationRequestResponse {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub name: String,
    pub age: i64,
    pub sex: Sex,
    pub blood_type: BloodType,
    pub content: String,
    pub image_url: Option<String>,
    pub location: String,
    pub donation_due_date: NaiveDate,
    pub donator_registered_id: String,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
}

// -- Matching --

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct MatchRequest {
    pub blood_type: BloodType,
    pub sex: Sex,
    #[validate(length(min = 1, max = 255))]
    pub location: String,
    pub age: i64,
    pub next_donation_date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct MatchResponse {
    pub id: Uuid,
}

/// Body for select/reject/confirm/cancel; the acting user comes from claims.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchActionRequest {
    pub donation_request: Uuid,
}

#[derive(Debug, Serialize)]
pub struct SelectMatchResponse {
    pub donator_registered_id: String,
    pub status: &'static str,
}

#[derive(Debug, Serialize)]
pub struct MatchStatusResponse {
    pub status: &'static str,
}

// -- Board --

#[derive(Debug, Serialize)]
pub struct PostIdResponse {
    pub id: Uuid,
}

/// JSON carried in the `request_data` part of the donation-card form.
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateDonationPost {
    pub blood_type: BloodType,
    #[validate(range(min = 16, max = 70))]
    pub age: i64,
    pub sex: Sex,
    #[validate(length(min = 1, max = 100))]
    pub region: String,
    #[validate(length(min = 1))]
    pub introduction: String,
}

#[derive(Debug, Serialize)]
pub struct DonationPostResponse {
    pub id: Uuid,
    pub donor_username: String,
    pub image_url: Option<String>,
    pub blood_type: BloodType,
    pub age: i64,
    pub sex: Sex,
    pub region: String,
    pub introduction: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateRequestPost {
    pub blood_type: BloodType,
    #[validate(length(min = 1, max = 100))]
    pub region: String,
    #[validate(length(min = 1))]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct RequestPostResponse {
    pub id: Uuid,
    pub requester_username: String,
    pub image_url: Option<String>,
    pub blood_type: BloodType,
    pub region: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_create_json() -> serde_json::Value {
        serde_json::json!({
            "name": "John Doe",
            "age": 35,
            "sex": "M",
            "blood_type": "A-",
            "content": "Emergency blood donation needed",
            "location": "Seoul",
            "donation_due_date": "2025-05-13",
            "donator_registered_id": "123456-7890"
        })
    }

    #[test]
    fn create_request_accepts_valid_payload() {
        let req: CreateDonationRequest = serde_json::from_value(valid_create_json()).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.blood_type, BloodType::ANegative);
        assert_eq!(req.donation_due_date, NaiveDate::from_ymd_opt(2025, 5, 13).unwrap());
    }

    #[test]
    fn create_request_age_bounds() {
        for (age, ok) in [(15, false), (16, true), (70, true), (71, false)] {
            let mut body = valid_create_json();
            body["age"] = age.into();
            let req: CreateDonationRequest = serde_json::from_value(body).unwrap();
            assert_eq!(req.validate().is_ok(), ok, "age {age}");
        }
    }

    #[test]
    fn registration_id_format_is_enforced() {
        assert!(validate_registration_id("123456-7890").is_ok());
        for bad in ["12345678", "123456-789", "1234567-890", "abcdef-ghij", ""] {
            assert!(validate_registration_id(bad).is_err(), "{bad:?}");
        }

        let mut body = valid_create_json();
        body["donator_registered_id"] = "12345678".into();
        let req: CreateDonationRequest = serde_json::from_value(body).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("donator_registered_id"));
    }

    #[test]
    fn missing_match_fields_fail_at_deserialization() {
        let body = serde_json::json!({ "blood_type": "A-", "sex": "M" });
        assert!(serde_json::from_value::<MatchRequest>(body).is_err());
    }
}
