//! Row-to-DTO conversion helpers shared by the handler modules.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use bloodlink_types::models::{BloodType, DonationStatus, Sex};

use crate::error::ApiError;

pub(crate) fn parse_uuid(value: &str) -> Result<Uuid, ApiError> {
    value
        .parse()
        .map_err(|_| ApiError::Internal(format!("corrupt id '{value}'")))
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::Internal(format!("corrupt date '{value}'")))
}

/// SQLite's datetime('now') stores "YYYY-MM-DD HH:MM:SS" without a timezone;
/// treat it as UTC. RFC 3339 values pass through as-is.
pub(crate) fn parse_datetime(value: &str) -> Result<DateTime<Utc>, ApiError> {
    value
        .parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .map_err(|_| ApiError::Internal(format!("corrupt timestamp '{value}'")))
}

pub(crate) fn parse_blood_type(value: &str) -> Result<BloodType, ApiError> {
    BloodType::parse(value)
        .ok_or_else(|| ApiError::Internal(format!("corrupt blood type '{value}'")))
}

pub(crate) fn parse_sex(value: &str) -> Result<Sex, ApiError> {
    Sex::parse(value).ok_or_else(|| ApiError::Internal(format!("corrupt sex '{value}'")))
}

pub(crate) fn parse_status(value: &str) -> Result<DonationStatus, ApiError> {
    DonationStatus::parse(value)
        .ok_or_else(|| ApiError::Internal(format!("corrupt status '{value}'")))
}

pub(crate) fn media_url(key: Option<String>) -> Option<String> {
    key.map(|k| format!("/media/{k}"))
}
