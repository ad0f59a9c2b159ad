//! Donation-request endpoints: create/retrieve plus the matching surface
//! (match, select, reject, confirm, cancel).

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use bloodlink_db::matching::{
    CancelOutcome, ConfirmOutcome, MatchCriteria, RejectOutcome, SelectOutcome,
};
use bloodlink_db::models::{DonationRequestRow, NewDonationRequest};
use bloodlink_types::api::{
    Claims, CreateDonationRequest, DonationRequestIdResponse, DonationRequestResponse,
    MatchActionRequest, MatchRequest, MatchResponse, MatchStatusResponse, SelectMatchResponse,
};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::media;

pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (request_data, image) = media::read_multipart_form(&mut multipart).await?;
    let req: CreateDonationRequest = serde_json::from_str(&request_data)
        .map_err(|e| ApiError::BadRequest(format!("invalid request_data: {e}")))?;
    req.validate()?;

    if req.donation_due_date < Utc::now().date_naive() {
        return Err(ApiError::BadRequest("donation_due_date is in the past".into()));
    }

    let image_key = match image {
        Some(image) => Some(media::store_image(&state.media_dir, &image).await?),
        None => None,
    };

    let id = Uuid::new_v4();

    // Run blocking DB insert off the async runtime
    let db = state.clone();
    let row_id = id.to_string();
    let requester_id = claims.sub.to_string();
    let due = req.donation_due_date.format("%Y-%m-%d").to_string();
    tokio::task::spawn_blocking(move || {
        db.db.insert_donation_request(&NewDonationRequest {
            id: &row_id,
            requester_id: &requester_id,
            name: &req.name,
            age: req.age,
            sex: req.sex.as_str(),
            blood_type: req.blood_type.as_str(),
            content: &req.content,
            image_key: image_key.as_deref(),
            location: &req.location,
            donation_due_date: &due,
            donator_registered_id: &req.donator_registered_id,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    info!(id = %id, "donation request created");
    Ok((
        StatusCode::CREATED,
        Json(DonationRequestIdResponse { id }),
    ))
}

pub async fn retrieve(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationRequestResponse>> {
    let db = state.clone();
    let key = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_donation_request(&key))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??
        .ok_or_else(|| ApiError::NotFound(format!("donation request {id}")))?;

    Ok(Json(donation_request_response(row)?))
}

pub async fn find_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MatchRequest>,
) -> ApiResult<Json<MatchResponse>> {
    req.validate()?;

    let db = state.clone();
    let user_id = claims.sub.to_string();
    let row = tokio::task::spawn_blocking(move || {
        let criteria = MatchCriteria {
            blood_type: req.blood_type,
            sex: req.sex,
            location: &req.location,
            age: req.age,
            next_donation_date: req.next_donation_date,
        };
        db.db.find_match(&criteria, &user_id)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??
    .ok_or_else(|| ApiError::NotFound("no matching donation request".into()))?;

    Ok(Json(MatchResponse {
        id: convert::parse_uuid(&row.id)?,
    }))
}

pub async fn select_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MatchActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let row_id = Uuid::new_v4().to_string();
    let user_id = claims.sub.to_string();
    let request_id = req.donation_request.to_string();
    let outcome =
        tokio::task::spawn_blocking(move || db.db.select_match(&row_id, &user_id, &request_id))
            .await
            .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    match outcome {
        SelectOutcome::Selected {
            donator_registered_id,
        } => {
            info!(donation_request = %req.donation_request, user = %claims.sub, "match selected");
            Ok((
                StatusCode::CREATED,
                Json(SelectMatchResponse {
                    donator_registered_id,
                    status: "selected",
                }),
            ))
        }
        SelectOutcome::AlreadySelected {
            donator_registered_id,
        } => Ok((
            StatusCode::OK,
            Json(SelectMatchResponse {
                donator_registered_id,
                status: "already_selected",
            }),
        )),
        SelectOutcome::AlreadyMatched => Err(ApiError::Conflict(
            "donation request already matched to another donor".into(),
        )),
        SelectOutcome::NotFound => Err(ApiError::NotFound(format!(
            "donation request {}",
            req.donation_request
        ))),
    }
}

pub async fn reject_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MatchActionRequest>,
) -> ApiResult<impl IntoResponse> {
    let db = state.clone();
    let row_id = Uuid::new_v4().to_string();
    let user_id = claims.sub.to_string();
    let request_id = req.donation_request.to_string();
    let outcome =
        tokio::task::spawn_blocking(move || db.db.reject_match(&row_id, &user_id, &request_id))
            .await
            .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    match outcome {
        RejectOutcome::Rejected => Ok((
            StatusCode::CREATED,
            Json(MatchStatusResponse { status: "rejected" }),
        )),
        RejectOutcome::AlreadyRejected => Ok((
            StatusCode::OK,
            Json(MatchStatusResponse {
                status: "already_rejected",
            }),
        )),
        RejectOutcome::NotFound => Err(ApiError::NotFound(format!(
            "donation request {}",
            req.donation_request
        ))),
    }
}

pub async fn confirm_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MatchActionRequest>,
) -> ApiResult<Json<MatchStatusResponse>> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let request_id = req.donation_request.to_string();
    let outcome = tokio::task::spawn_blocking(move || db.db.confirm_match(&user_id, &request_id))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    match outcome {
        ConfirmOutcome::Confirmed => Ok(Json(MatchStatusResponse { status: "confirmed" })),
        ConfirmOutcome::NotRequester => Err(ApiError::Forbidden(
            "only the requester can confirm a match".into(),
        )),
        ConfirmOutcome::InvalidStatus(status) => Err(ApiError::Conflict(format!(
            "donation request is '{status}', expected 'selected'"
        ))),
        ConfirmOutcome::NotFound => Err(ApiError::NotFound(format!(
            "donation request {}",
            req.donation_request
        ))),
    }
}

pub async fn cancel_match(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<MatchActionRequest>,
) -> ApiResult<Json<MatchStatusResponse>> {
    let db = state.clone();
    let user_id = claims.sub.to_string();
    let request_id = req.donation_request.to_string();
    let outcome = tokio::task::spawn_blocking(move || db.db.cancel_match(&user_id, &request_id))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    match outcome {
        CancelOutcome::Reopened => Ok(Json(MatchStatusResponse { status: "reopened" })),
        CancelOutcome::NotSelected => Err(ApiError::Conflict(
            "caller has not selected this donation request".into(),
        )),
        CancelOutcome::InvalidStatus(status) => Err(ApiError::Conflict(format!(
            "donation request is '{status}', expected 'selected'"
        ))),
        CancelOutcome::NotFound => Err(ApiError::NotFound(format!(
            "donation request {}",
            req.donation_request
        ))),
    }
}

fn donation_request_response(row: DonationRequestRow) -> ApiResult<DonationRequestResponse> {
    let sex = convert::parse_sex(&row.sex)?;
    let blood_type = convert::parse_blood_type(&row.blood_type)?;
    let status = convert::parse_status(&row.status)?;
    let donation_due_date = convert::parse_date(&row.donation_due_date)?;
    let created_at = convert::parse_datetime(&row.created_at)?;

    Ok(DonationRequestResponse {
        id: convert::parse_uuid(&row.id)?,
        requester_id: convert::parse_uuid(&row.requester_id)?,
        name: row.name,
        age: row.age,
        sex,
        blood_type,
        content: row.content,
        image_url: convert::media_url(row.image_key),
        location: row.location,
        donation_due_date,
        donator_registered_id: row.donator_registered_id,
        status,
        created_at,
    })
}
