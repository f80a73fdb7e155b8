// HTTP handlers for order endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::{AuthenticatedCustomer, StaffUser};
use crate::orders::{
    ActorType, AssignDriverRequest, CancelOrderRequest, ChangeRestaurantRequest,
    CreateOrderRequest, OrderError, OrderResponse, ReorderResponse, TrackOrderResponse,
    UpdateStatusRequest,
};

/// Handler for POST /api/orders
/// Converts the customer's active cart into an order
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse),
        (status = 409, description = "Cart already converted"),
        (status = 422, description = "Domain precondition failed (ADDRESS_OUTSIDE_DELIVERY_ZONE, DELIVERY_ADDRESS_REQUIRED, SCHEDULED_TIME_TOO_SOON, ...)")
    ),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), OrderError> {
    let (order, items) = state
        .order_service
        .convert(customer.customer_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from_parts(order, items))))
}

/// Handler for GET /api/orders
pub async fn list_orders_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state.order_service.list_orders(customer.customer_id).await?;

    Ok(Json(
        orders
            .into_iter()
            .map(|(order, items)| OrderResponse::from_parts(order, items))
            .collect(),
    ))
}

/// Handler for GET /api/orders/active
pub async fn list_active_orders_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<Vec<OrderResponse>>, OrderError> {
    let orders = state
        .order_service
        .list_active_orders(customer.customer_id)
        .await?;

    Ok(Json(
        orders
            .into_iter()
            .map(|(order, items)| OrderResponse::from_parts(order, items))
            .collect(),
    ))
}

/// Handler for GET /api/orders/{id}
pub async fn get_order_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(order_id): Path<Uuid>,
) -> Result<Json<OrderResponse>, OrderError> {
    let (order, items) = state
        .order_service
        .get_order(customer.customer_id, order_id)
        .await?;

    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for GET /api/orders/{id}/track
pub async fn track_order_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(order_id): Path<Uuid>,
) -> Result<Json<TrackOrderResponse>, OrderError> {
    let tracking = state
        .order_service
        .track_order(customer.customer_id, order_id)
        .await?;

    Ok(Json(tracking))
}

/// Handler for POST /api/orders/{id}/cancel
pub async fn cancel_order_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(order_id): Path<Uuid>,
    Json(request): Json<CancelOrderRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_service
        .cancel(customer.customer_id, order_id, &request.reason)
        .await?;

    let items = state.order_items_repo.list(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for POST /api/orders/{id}/reorder
/// Rebuilds the active cart from a past order at current prices
pub async fn reorder_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(order_id): Path<Uuid>,
) -> Result<Json<ReorderResponse>, OrderError> {
    let response = state
        .order_service
        .reorder(customer.customer_id, order_id)
        .await?;

    Ok(Json(response))
}

/// Handler for PATCH /api/orders/{id}/status (staff only)
pub async fn update_order_status_handler(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_service
        .update_status(
            order_id,
            request.status,
            ActorType::Staff,
            request.notes.as_deref(),
        )
        .await?;

    let items = state.order_items_repo.list(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for POST /api/orders/{id}/driver (staff only)
pub async fn assign_driver_handler(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<AssignDriverRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_service
        .assign_driver(order_id, request.driver_id)
        .await?;

    let items = state.order_items_repo.list(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}

/// Handler for PATCH /api/orders/{id}/restaurant (staff only)
pub async fn change_restaurant_handler(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(order_id): Path<Uuid>,
    Json(request): Json<ChangeRestaurantRequest>,
) -> Result<Json<OrderResponse>, OrderError> {
    let order = state
        .order_service
        .change_restaurant(order_id, request.restaurant_id)
        .await?;

    let items = state.order_items_repo.list(order.id).await?;
    Ok(Json(OrderResponse::from_parts(order, items)))
}
