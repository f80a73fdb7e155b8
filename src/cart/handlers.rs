// HTTP handlers for cart endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::middleware::AuthenticatedCustomer;
use crate::cart::{
    AddItemRequest, CartError, CartItemResponse, CartResponse, CartValidationReport,
    SetDeliveryAddressRequest, SetRestaurantRequest, SetServiceTypeRequest, UpdateItemRequest,
};

/// Handler for GET /api/cart
/// Returns the customer's active cart, creating an empty one if none exists
pub async fn get_cart_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<CartResponse>, CartError> {
    let (cart, items) = state.cart_engine.get_or_create(customer.customer_id).await?;
    Ok(Json(CartResponse::from_parts(cart, items)))
}

/// Handler for POST /api/cart/items
pub async fn add_cart_item_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartItemResponse>), CartError> {
    let item = state
        .cart_engine
        .add_item(customer.customer_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(item.into())))
}

/// Handler for PUT /api/cart/items/{id}
pub async fn update_cart_item_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(item_id): Path<i32>,
    Json(request): Json<UpdateItemRequest>,
) -> Result<Json<CartItemResponse>, CartError> {
    let item = state
        .cart_engine
        .update_item(customer.customer_id, item_id, request)
        .await?;

    Ok(Json(item.into()))
}

/// Handler for DELETE /api/cart/items/{id}
pub async fn remove_cart_item_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Path(item_id): Path<i32>,
) -> Result<StatusCode, CartError> {
    state
        .cart_engine
        .remove_item(customer.customer_id, item_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Handler for DELETE /api/cart
pub async fn clear_cart_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<StatusCode, CartError> {
    state.cart_engine.clear(customer.customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PUT /api/cart/service-type
/// Returns the fully re-priced cart; 422 DELIVERY_ADDRESS_REQUIRED when
/// switching to delivery without an attached address
pub async fn set_service_type_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<SetServiceTypeRequest>,
) -> Result<Json<CartResponse>, CartError> {
    let (cart, items) = state
        .cart_engine
        .set_service_type(customer.customer_id, request.service_type)
        .await?;

    Ok(Json(CartResponse::from_parts(cart, items)))
}

/// Handler for PUT /api/cart/delivery-address
pub async fn set_delivery_address_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<SetDeliveryAddressRequest>,
) -> Result<Json<CartResponse>, CartError> {
    let (cart, items) = state
        .cart_engine
        .set_delivery_address(customer.customer_id, request.delivery_address_id)
        .await?;

    Ok(Json(CartResponse::from_parts(cart, items)))
}

/// Handler for PUT /api/cart/restaurant
pub async fn set_restaurant_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
    Json(request): Json<SetRestaurantRequest>,
) -> Result<Json<CartResponse>, CartError> {
    let (cart, items) = state
        .cart_engine
        .set_restaurant(customer.customer_id, request.restaurant_id)
        .await?;

    Ok(Json(CartResponse::from_parts(cart, items)))
}

/// Handler for POST /api/cart/validate
pub async fn validate_cart_handler(
    State(state): State<crate::AppState>,
    customer: AuthenticatedCustomer,
) -> Result<Json<CartValidationReport>, CartError> {
    let report = state.cart_engine.validate(customer.customer_id).await?;
    Ok(Json(report))
}
