use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::AuthenticatedUser;
use crate::db::DbPool;
use crate::errors::AppError;
use crate::pricing;
use crate::store;

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateQuantityRequest {
    pub product_id: Uuid,
    pub new_quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RemoveItemRequest {
    pub product_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectionRequest {
    pub cart_item_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineResponse {
    pub cart_item_id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub unit_price: String,
    pub stock: i32,
    pub stock_status: String,
    pub image_path: Option<String>,
    pub quantity: i32,
    pub total_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartViewResponse {
    pub cart_items: Vec<CartLineResponse>,
    pub total_cart_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SelectionTotalResponse {
    pub total_amount: String,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// POST /cart/add
///
/// Adds a product to the caller's cart, creating the cart on first use. The
/// stock check is advisory only; nothing is reserved.
#[utoipa::path(
    post,
    path = "/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 201, description = "Product added to cart"),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Insufficient stock"),
    ),
    tag = "cart"
)]
pub async fn add_to_cart(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<AddToCartRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::cart::add_item(&mut conn, user.user_id, body.product_id, body.quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Created().json(json!({ "message": "Product added to cart successfully" })))
}

/// GET /cart/view
///
/// All cart lines joined with live product data, plus the grand total over
/// the cached line totals.
#[utoipa::path(
    get,
    path = "/cart/view",
    responses(
        (status = 200, description = "Cart contents", body = CartViewResponse),
        (status = 404, description = "Cart is empty"),
    ),
    tag = "cart"
)]
pub async fn view_cart(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let cart = web::block(move || {
        let mut conn = pool.get()?;
        store::cart::view_cart(&mut conn, user.user_id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    let response = CartViewResponse {
        total_cart_price: pricing::display_amount(&cart.total),
        cart_items: cart
            .items
            .into_iter()
            .map(|line| CartLineResponse {
                cart_item_id: line.cart_item_id,
                cart_id: line.cart_id,
                product_id: line.product_id,
                product_name: line.product_name,
                unit_price: pricing::display_amount(&line.unit_price),
                stock: line.stock,
                stock_status: line.stock_status.to_string(),
                image_path: line.image_path,
                quantity: line.quantity,
                total_price: pricing::display_amount(&line.total_price),
            })
            .collect(),
    };

    Ok(HttpResponse::Ok().json(response))
}

/// PUT /cart/update-quantity
#[utoipa::path(
    put,
    path = "/cart/update-quantity",
    request_body = UpdateQuantityRequest,
    responses(
        (status = 200, description = "Quantity updated"),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Cart, item or product not found"),
        (status = 409, description = "Insufficient stock"),
    ),
    tag = "cart"
)]
pub async fn update_item_quantity(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<UpdateQuantityRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::cart::update_quantity(&mut conn, user.user_id, body.product_id, body.new_quantity)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Cart item quantity updated successfully" })))
}

/// DELETE /cart/remove-item
#[utoipa::path(
    delete,
    path = "/cart/remove-item",
    request_body = RemoveItemRequest,
    responses(
        (status = 200, description = "Item removed"),
        (status = 404, description = "Cart or item not found"),
    ),
    tag = "cart"
)]
pub async fn remove_item(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<RemoveItemRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    web::block(move || {
        let mut conn = pool.get()?;
        store::cart::remove_item(&mut conn, user.user_id, body.product_id)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(json!({ "message": "Cart item removed successfully" })))
}

/// POST /cart/total
///
/// Live re-price of an explicit selection of the caller's cart lines, as
/// shown at checkout time. Distinct from GET /cart/view, which reports the
/// cached totals.
#[utoipa::path(
    post,
    path = "/cart/total",
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Selection total", body = SelectionTotalResponse),
        (status = 400, description = "Selection contains ids not owned by the caller"),
    ),
    tag = "cart"
)]
pub async fn selection_total(
    pool: web::Data<DbPool>,
    user: AuthenticatedUser,
    body: web::Json<SelectionRequest>,
) -> Result<HttpResponse, AppError> {
    let body = body.into_inner();

    let (total, _lines) = web::block(move || {
        let mut conn = pool.get()?;
        store::cart::price_selected_lines(&mut conn, user.user_id, &body.cart_item_ids)
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))??;

    Ok(HttpResponse::Ok().json(SelectionTotalResponse {
        total_amount: pricing::display_amount(&total),
    }))
}
