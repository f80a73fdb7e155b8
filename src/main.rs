mod auth;
mod cart;
mod catalog;
mod customers;
mod db;
mod error;
mod geo;
mod loyalty;
mod orders;
mod restaurants;
mod settings;
mod validation;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use cart::{CartEngine, CartItemsRepository, CartsRepository};
use catalog::CatalogRepository;
use customers::CustomersRepository;
use geo::GeofenceResolver;
use loyalty::{PointsLedger, PointsTransactionsRepository};
use orders::{OrderItemsRepository, OrderService, OrdersRepository, StatusHistoryRepository};
use restaurants::{DriversRepository, RestaurantsRepository};
use settings::SettingsStore;

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        catalog::handlers::get_menu_handler,
        geo::handlers::validate_address_handler,
        orders::handlers::create_order_handler,
    ),
    components(
        schemas(
            catalog::Zone,
            catalog::ServiceType,
            catalog::ZonePriceSet,
            catalog::handlers::MenuResponse,
            geo::handlers::ValidateAddressRequest,
            geo::handlers::ValidateAddressResponse,
            orders::CreateOrderRequest,
            orders::OrderResponse,
            orders::OrderStatus,
        )
    ),
    tags(
        (name = "catalog", description = "Menu browsing"),
        (name = "addresses", description = "Delivery zone resolution"),
        (name = "cart", description = "Active cart management"),
        (name = "orders", description = "Order conversion and lifecycle"),
        (name = "loyalty", description = "Points balance and ledger")
    ),
    info(
        title = "Ordering Platform API",
        version = "1.0.0",
        description = "Zone-priced ordering and loyalty backend for the restaurant chain"
    )
)]
struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub settings: Arc<SettingsStore>,
    pub catalog_repo: CatalogRepository,
    pub restaurants_repo: RestaurantsRepository,
    pub customers_repo: CustomersRepository,
    pub points_repo: PointsTransactionsRepository,
    pub order_items_repo: OrderItemsRepository,
    pub geofence: GeofenceResolver,
    pub cart_engine: CartEngine,
    pub order_service: OrderService,
    pub ledger: PointsLedger,
}

impl AppState {
    pub fn new(db: PgPool) -> Self {
        let settings = Arc::new(SettingsStore::new(db.clone()));
        let catalog_repo = CatalogRepository::new(db.clone());
        let restaurants_repo = RestaurantsRepository::new(db.clone());
        let drivers_repo = DriversRepository::new(db.clone());
        let customers_repo = CustomersRepository::new(db.clone());
        let points_repo = PointsTransactionsRepository::new(db.clone());
        let carts_repo = CartsRepository::new(db.clone());
        let cart_items_repo = CartItemsRepository::new(db.clone());
        let orders_repo = OrdersRepository::new(db.clone());
        let order_items_repo = OrderItemsRepository::new(db.clone());
        let history_repo = StatusHistoryRepository::new(db.clone());

        let geofence = GeofenceResolver::new(restaurants_repo.clone());
        let ledger = PointsLedger::new(
            db.clone(),
            customers_repo.clone(),
            points_repo.clone(),
            settings.clone(),
        );
        let cart_engine = CartEngine::new(
            db.clone(),
            carts_repo.clone(),
            cart_items_repo.clone(),
            catalog_repo.clone(),
            customers_repo.clone(),
            restaurants_repo.clone(),
            geofence.clone(),
            settings.clone(),
        );
        let order_service = OrderService::new(
            db.clone(),
            orders_repo,
            order_items_repo.clone(),
            history_repo,
            carts_repo,
            cart_items_repo,
            cart_engine.clone(),
            customers_repo.clone(),
            restaurants_repo.clone(),
            drivers_repo,
            catalog_repo.clone(),
            geofence.clone(),
            ledger.clone(),
            settings.clone(),
        );

        Self {
            db,
            settings,
            catalog_repo,
            restaurants_repo,
            customers_repo,
            points_repo,
            order_items_repo,
            geofence,
            cart_engine,
            order_service,
            ledger,
        }
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
fn create_router(db: PgPool) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let state = AppState::new(db);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Catalog and restaurants
        .route("/api/menu", get(catalog::get_menu_handler))
        .route("/api/restaurants", get(restaurants::list_restaurants_handler))
        .route("/api/restaurants/:id", get(restaurants::get_restaurant_handler))
        // Address validation
        .route("/api/addresses/validate", post(geo::validate_address_handler))
        // Cart
        .route("/api/cart", get(cart::get_cart_handler))
        .route("/api/cart", delete(cart::clear_cart_handler))
        .route("/api/cart/items", post(cart::add_cart_item_handler))
        .route("/api/cart/items/:id", put(cart::update_cart_item_handler))
        .route("/api/cart/items/:id", delete(cart::remove_cart_item_handler))
        .route("/api/cart/service-type", put(cart::set_service_type_handler))
        .route("/api/cart/delivery-address", put(cart::set_delivery_address_handler))
        .route("/api/cart/restaurant", put(cart::set_restaurant_handler))
        .route("/api/cart/validate", post(cart::validate_cart_handler))
        // Orders
        .route("/api/orders", post(orders::create_order_handler))
        .route("/api/orders", get(orders::list_orders_handler))
        .route("/api/orders/active", get(orders::list_active_orders_handler))
        .route("/api/orders/:id", get(orders::get_order_handler))
        .route("/api/orders/:id/track", get(orders::track_order_handler))
        .route("/api/orders/:id/cancel", post(orders::cancel_order_handler))
        .route("/api/orders/:id/reorder", post(orders::reorder_handler))
        // Staff lifecycle operations
        .route("/api/orders/:id/status", patch(orders::update_order_status_handler))
        .route("/api/orders/:id/driver", post(orders::assign_driver_handler))
        .route("/api/orders/:id/restaurant", patch(orders::change_restaurant_handler))
        // Loyalty
        .route("/api/loyalty/balance", get(loyalty::get_balance_handler))
        .route("/api/loyalty/transactions", get(loyalty::list_transactions_handler))
        .route("/api/loyalty/adjust", post(loyalty::adjust_points_handler))
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Ordering platform API - Starting...");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "8080".to_string());

    tracing::info!("Connecting to database...");
    let db_pool = db::create_pool(&database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations completed successfully");

    let app = create_router(db_pool);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Ordering platform API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await.expect("Server error");
}
