use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::shipping::ShippingData;
use crate::store;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveShippingRequest {
    pub shipping_data: ShippingData,
    pub order_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveShippingResponse {
    pub message: String,
    pub shipping_id: Uuid,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddressResponse {
    pub shipping_id: Uuid,
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub mobile_number: String,
    pub email: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /shipping/save-shipping
///
/// Resolves or creates the caller's address, links it to the order and
/// commits the inventory decrement for the order's items, all in one
/// transaction. This is the only stock-decrement point in the pipeline.
#[utoipa::path(
    post,
    path = "/shipping/save-shipping",
    request_body = SaveShippingRequest,
    responses(
        (status = 200, description = "Shipping linked, stock committed", body = SaveShippingResponse),
        (status = 404, description = "Order not found or has no items"),
        (status = 409, description = "Insufficient stock for an order item"),
    ),
    tag = "shipping"
)]
pub async fn save_shipping(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<SaveShippingRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let outcome = web::block(move || {
        let mut conn = pool.get()?;
        store::shipping::attach_shipping(&mut conn, user.user_id, body.order_id, &body.shipping_data)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let message = if outcome.existing {
        "Shipping details already exist and were linked to the order."
    } else {
        "Shipping details created and linked to the order."
    };

    Ok(HttpResponse::Ok().json(SaveShippingResponse {
        message: message.to_string(),
        shipping_id: outcome.shipping_id,
    }))
}

/// GET /shipping
///
/// The caller's saved shipping addresses.
#[utoipa::path(
    get,
    path = "/shipping",
    responses(
        (status = 200, description = "Saved addresses", body = [AddressResponse]),
    ),
    tag = "shipping"
)]
pub async fn list_addresses(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let addresses = web::block(move || {
        let mut conn = pool.get()?;
        store::shipping::list_addresses(&mut conn, user.user_id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let data: Vec<AddressResponse> = addresses
        .into_iter()
        .map(|a| AddressResponse {
            shipping_id: a.id,
            full_name: a.full_name,
            address_line: a.address_line,
            city: a.city,
            state: a.state,
            zip_code: a.zip_code,
            country: a.country,
            mobile_number: a.mobile_number,
            email: a.email,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({ "message": "Shipping details retrieved", "data": data })))
}

/// DELETE /shipping/{shipping_id}
#[utoipa::path(
    delete,
    path = "/shipping/{shipping_id}",
    params(
        ("shipping_id" = Uuid, Path, description = "Shipping address UUID"),
    ),
    responses(
        (status = 200, description = "Address deleted"),
        (status = 404, description = "Address not found"),
    ),
    tag = "shipping"
)]
pub async fn delete_address(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let shipping_id = path.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::shipping::delete_address(&mut conn, shipping_id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Shipping details deleted" })))
}
