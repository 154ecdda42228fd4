use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::{AdminUser, AuthenticatedUser};
use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::product::stock_status;
use crate::pricing;
use crate::store;
use crate::store::checkout::PlacedOrder;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct BuyNowRequest {
    pub product_id: Uuid,
    pub quantity: i32,
    pub payment_method: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub cart_item_ids: Vec<Uuid>,
    pub payment_method: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlacedItemResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PlacedOrderResponse {
    pub message: String,
    pub order_id: Uuid,
    pub subtotal: String,
    pub total_amount: String,
    pub items: Vec<PlacedItemResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub order_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePaymentMethodRequest {
    pub order_id: Uuid,
    pub payment_method: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailItemResponse {
    pub order_item_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    /// Live catalog price; order items carry no price snapshot.
    pub product_price: String,
    pub quantity: i32,
    pub stock: i32,
    pub stock_status: String,
    pub image_path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderShippingResponse {
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

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetailsResponse {
    pub order_id: Uuid,
    pub order_date: String,
    pub status: String,
    pub total_quantity: i32,
    pub subtotal: String,
    pub total_amount: String,
    pub payment_method: String,
    pub shipping: OrderShippingResponse,
    pub items: Vec<OrderDetailItemResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderIdsResponse {
    pub order_ids: Vec<Uuid>,
}

fn placed_order_response(message: &str, placed: PlacedOrder) -> PlacedOrderResponse {
    PlacedOrderResponse {
        message: message.to_string(),
        order_id: placed.order_id,
        subtotal: pricing::display_amount(&placed.subtotal),
        total_amount: pricing::display_amount(&placed.total_amount),
        items: placed
            .items
            .into_iter()
            .map(|i| PlacedItemResponse {
                product_id: i.product_id,
                product_name: i.product_name,
                quantity: i.quantity,
            })
            .collect(),
    }
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /orders/buy-now
///
/// Direct buy of a single product. Order and order item are created in one
/// transaction; stock is checked under a row lock but not decremented.
#[utoipa::path(
    post,
    path = "/orders/buy-now",
    request_body = BuyNowRequest,
    responses(
        (status = 201, description = "Order placed", body = PlacedOrderResponse),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock"),
    ),
    tag = "orders"
)]
pub async fn buy_now(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<BuyNowRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let placed = web::block(move || {
        let mut conn = pool.get()?;
        store::checkout::buy_now(
            &mut conn,
            user.user_id,
            body.product_id,
            body.quantity,
            body.payment_method,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(placed_order_response("Order placed successfully", placed)))
}

/// POST /orders/checkout
///
/// Converts an explicit selection of the caller's cart lines into an order.
/// All-or-nothing: one short line rolls back the whole checkout.
#[utoipa::path(
    post,
    path = "/orders/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created", body = PlacedOrderResponse),
        (status = 400, description = "Selection contains ids not owned by the caller"),
        (status = 409, description = "Insufficient stock for a selected line"),
    ),
    tag = "orders"
)]
pub async fn checkout(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let placed = web::block(move || {
        let mut conn = pool.get()?;
        store::checkout::checkout_cart(
            &mut conn,
            user.user_id,
            &body.cart_item_ids,
            body.payment_method,
        )
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(placed_order_response("Order created successfully", placed)))
}

/// GET /orders/{order_id}
///
/// Admin view of one order joined with its shipping address, items and live
/// product rows. Orders without a shipping linkage are not visible here.
#[utoipa::path(
    get,
    path = "/orders/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order UUID"),
    ),
    responses(
        (status = 200, description = "Order detail", body = OrderDetailsResponse),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn order_details(
    pool: web::Data<DbPool>,
    _admin: AdminUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let order_id = path.into_inner();

    let details = web::block(move || {
        let mut conn = pool.get()?;
        store::orders::order_details(&mut conn, order_id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let response = OrderDetailsResponse {
        order_id: details.order.id,
        order_date: details.order.created_at.to_rfc3339(),
        status: details.order.status,
        total_quantity: details.order.total_quantity,
        subtotal: pricing::display_amount(&details.order.subtotal),
        total_amount: pricing::display_amount(&details.order.total_amount),
        payment_method: details.order.payment_method,
        shipping: OrderShippingResponse {
            shipping_id: details.address.id,
            full_name: details.address.full_name,
            address_line: details.address.address_line,
            city: details.address.city,
            state: details.address.state,
            zip_code: details.address.zip_code,
            country: details.address.country,
            mobile_number: details.address.mobile_number,
            email: details.address.email,
        },
        items: details
            .items
            .into_iter()
            .map(|entry| OrderDetailItemResponse {
                order_item_id: entry.item.id,
                product_id: entry.product.id,
                product_name: entry.product.name,
                product_price: pricing::display_amount(&entry.product.price),
                quantity: entry.item.quantity,
                stock: entry.product.quantity,
                stock_status: stock_status(entry.product.quantity).to_string(),
                image_path: entry.product.image_path,
            })
            .collect(),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// PUT /orders/update-status
#[utoipa::path(
    put,
    path = "/orders/update-status",
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_status(
    pool: web::Data<DbPool>,
    _admin: AdminUser,
    body: web::Json<UpdateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::orders::set_status(&mut conn, body.order_id, &body.status)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Order status updated successfully" })))
}

/// PUT /orders/update-payment-method
#[utoipa::path(
    put,
    path = "/orders/update-payment-method",
    request_body = UpdatePaymentMethodRequest,
    responses(
        (status = 200, description = "Payment method updated"),
        (status = 404, description = "Order not found"),
    ),
    tag = "orders"
)]
pub async fn update_payment_method(
    pool: web::Data<DbPool>,
    _user: AuthenticatedUser,
    body: web::Json<UpdatePaymentMethodRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::orders::set_payment_method(&mut conn, body.order_id, &body.payment_method)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Payment method updated successfully" })))
}

/// GET /orders/summary/all-ids
///
/// Ids of every order whose shipping linkage is complete, oldest first.
#[utoipa::path(
    get,
    path = "/orders/summary/all-ids",
    responses(
        (status = 200, description = "Order ids", body = OrderIdsResponse),
        (status = 404, description = "No orders found"),
    ),
    tag = "orders"
)]
pub async fn all_order_ids(
    pool: web::Data<DbPool>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let order_ids = web::block(move || {
        let mut conn = pool.get()?;
        store::orders::shipped_order_ids(&mut conn)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    if order_ids.is_empty() {
        return Err(AppError::OrderNotFound);
    }

    Ok(HttpResponse::Ok().json(OrderIdsResponse { order_ids }))
}
