pub mod auth;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pricing;
pub mod schema;
pub mod store;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::add_to_cart,
        handlers::cart::view_cart,
        handlers::cart::update_item_quantity,
        handlers::cart::remove_item,
        handlers::cart::selection_total,
        handlers::orders::buy_now,
        handlers::orders::checkout,
        handlers::orders::order_details,
        handlers::orders::update_status,
        handlers::orders::update_payment_method,
        handlers::orders::all_order_ids,
        handlers::shipping::save_shipping,
        handlers::shipping::list_addresses,
        handlers::shipping::delete_address,
    ),
    components(schemas(
        handlers::cart::AddToCartRequest,
        handlers::cart::UpdateQuantityRequest,
        handlers::cart::RemoveItemRequest,
        handlers::cart::SelectionRequest,
        handlers::cart::CartLineResponse,
        handlers::cart::CartViewResponse,
        handlers::cart::SelectionTotalResponse,
        handlers::orders::BuyNowRequest,
        handlers::orders::CheckoutRequest,
        handlers::orders::PlacedItemResponse,
        handlers::orders::PlacedOrderResponse,
        handlers::orders::UpdateStatusRequest,
        handlers::orders::UpdatePaymentMethodRequest,
        handlers::orders::OrderDetailItemResponse,
        handlers::orders::OrderShippingResponse,
        handlers::orders::OrderDetailsResponse,
        handlers::orders::OrderIdsResponse,
        handlers::shipping::SaveShippingRequest,
        handlers::shipping::SaveShippingResponse,
        handlers::shipping::AddressResponse,
        crate::models::shipping::ShippingData,
    )),
    tags(
        (name = "cart", description = "Cart aggregate"),
        (name = "orders", description = "Checkout and order management"),
        (name = "shipping", description = "Shipping linkage"),
    )
)]
pub struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/cart")
                    .route("/add", web::post().to(handlers::cart::add_to_cart))
                    .route("/view", web::get().to(handlers::cart::view_cart))
                    .route(
                        "/update-quantity",
                        web::put().to(handlers::cart::update_item_quantity),
                    )
                    .route("/remove-item", web::delete().to(handlers::cart::remove_item))
                    .route("/total", web::post().to(handlers::cart::selection_total)),
            )
            .service(
                web::scope("/orders")
                    .route("/buy-now", web::post().to(handlers::orders::buy_now))
                    .route("/checkout", web::post().to(handlers::orders::checkout))
                    .route(
                        "/summary/all-ids",
                        web::get().to(handlers::orders::all_order_ids),
                    )
                    .route(
                        "/update-status",
                        web::put().to(handlers::orders::update_status),
                    )
                    .route(
                        "/update-payment-method",
                        web::put().to(handlers::orders::update_payment_method),
                    )
                    .route("/{order_id}", web::get().to(handlers::orders::order_details)),
            )
            .service(
                web::scope("/shipping")
                    .route(
                        "/save-shipping",
                        web::post().to(handlers::shipping::save_shipping),
                    )
                    .route("", web::get().to(handlers::shipping::list_addresses))
                    .route(
                        "/{shipping_id}",
                        web::delete().to(handlers::shipping::delete_address),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
