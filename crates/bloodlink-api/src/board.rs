//! Board endpoints: "I can donate" cards and "I need blood" cards.

use axum::{
    Extension, Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use bloodlink_db::models::{DonationPostRow, NewDonationPost, NewRequestPost, RequestPostRow};
use bloodlink_types::api::{
    Claims, CreateDonationPost, CreateRequestPost, DonationPostResponse, PostIdResponse,
    RequestPostResponse,
};

use crate::auth::AppState;
use crate::convert;
use crate::error::{ApiError, ApiResult};
use crate::media;

const LIST_LIMIT: u32 = 100;

// -- Donation cards --

pub async fn list_donation_posts(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<DonationPostResponse>>> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_donation_posts(LIST_LIMIT))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    let posts = rows
        .into_iter()
        .map(donation_post_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(posts))
}

pub async fn create_donation_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (request_data, image) = media::read_multipart_form(&mut multipart).await?;
    let req: CreateDonationPost = serde_json::from_str(&request_data)
        .map_err(|e| ApiError::BadRequest(format!("invalid request_data: {e}")))?;
    req.validate()?;

    let image_key = match image {
        Some(image) => Some(media::store_image(&state.media_dir, &image).await?),
        None => None,
    };

    let id = Uuid::new_v4();
    let db = state.clone();
    let row_id = id.to_string();
    let donor_id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || {
        db.db.insert_donation_post(&NewDonationPost {
            id: &row_id,
            donor_id: &donor_id,
            image_key: image_key.as_deref(),
            blood_type: req.blood_type.as_str(),
            age: req.age,
            sex: req.sex.as_str(),
            region: &req.region,
            introduction: &req.introduction,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    Ok((StatusCode::CREATED, Json(PostIdResponse { id })))
}

pub async fn get_donation_post(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DonationPostResponse>> {
    let db = state.clone();
    let key = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_donation_post(&key))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??
        .ok_or_else(|| ApiError::NotFound(format!("donation post {id}")))?;

    Ok(Json(donation_post_response(row)?))
}

// -- Request cards --

pub async fn list_request_posts(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> ApiResult<Json<Vec<RequestPostResponse>>> {
    let db = state.clone();
    let rows = tokio::task::spawn_blocking(move || db.db.list_request_posts(LIST_LIMIT))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    let posts = rows
        .into_iter()
        .map(request_post_response)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(posts))
}

pub async fn create_request_post(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> ApiResult<impl IntoResponse> {
    let (request_data, image) = media::read_multipart_form(&mut multipart).await?;
    let req: CreateRequestPost = serde_json::from_str(&request_data)
        .map_err(|e| ApiError::BadRequest(format!("invalid request_data: {e}")))?;
    req.validate()?;

    let image_key = match image {
        Some(image) => Some(media::store_image(&state.media_dir, &image).await?),
        None => None,
    };

    let id = Uuid::new_v4();
    let db = state.clone();
    let row_id = id.to_string();
    let requester_id = claims.sub.to_string();
    tokio::task::spawn_blocking(move || {
        db.db.insert_request_post(&NewRequestPost {
            id: &row_id,
            requester_id: &requester_id,
            image_key: image_key.as_deref(),
            blood_type: req.blood_type.as_str(),
            region: &req.region,
            reason: &req.reason,
        })
    })
    .await
    .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??;

    Ok((StatusCode::CREATED, Json(PostIdResponse { id })))
}

pub async fn get_request_post(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<RequestPostResponse>> {
    let db = state.clone();
    let key = id.to_string();
    let row = tokio::task::spawn_blocking(move || db.db.get_request_post(&key))
        .await
        .map_err(|e| ApiError::Internal(format!("spawn_blocking join error: {e}")))??
        .ok_or_else(|| ApiError::NotFound(format!("request post {id}")))?;

    Ok(Json(request_post_response(row)?))
}

fn donation_post_response(row: DonationPostRow) -> ApiResult<DonationPostResponse> {
    let sex = convert::parse_sex(&row.sex)?;
    let blood_type = convert::parse_blood_type(&row.blood_type)?;
    let created_at = convert::parse_datetime(&row.created_at)?;

    Ok(DonationPostResponse {
        id: convert::parse_uuid(&row.id)?,
        donor_username: row.donor_username,
        image_url: convert::media_url(row.image_key),
        blood_type,
        age: row.age,
        sex,
        region: row.region,
        introduction: row.introduction,
        created_at,
    })
}

fn request_post_response(row: RequestPostRow) -> ApiResult<RequestPostResponse> {
    let blood_type = convert::parse_blood_type(&row.blood_type)?;
    let created_at = convert::parse_datetime(&row.created_at)?;

    Ok(RequestPostResponse {
        id: convert::parse_uuid(&row.id)?,
        requester_username: row.requester_username,
        image_url: convert::media_url(row.image_key),
        blood_type,
        region: row.region,
        reason: row.reason,
        created_at,
    })
}
