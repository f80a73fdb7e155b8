use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::catalog::{ServiceType, Zone};

/// Lifecycle of a cart
///
/// A cart transitions to `converted` exactly once, at order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CartStatus {
    Active,
    Converted,
    Abandoned,
}

impl CartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartStatus::Active => "active",
            CartStatus::Converted => "converted",
            CartStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for CartStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer's mutable cart; at most one active per customer
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Cart {
    pub id: Uuid,
    pub customer_id: i32,
    /// Nullable for delivery until an address resolves one
    pub restaurant_id: Option<i32>,
    pub service_type: ServiceType,
    pub zone: Zone,
    pub delivery_address_id: Option<i32>,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Option chosen for a line, snapshotted with its price at add time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectedOption {
    pub section_id: i32,
    pub option_id: i32,
    pub name: String,
    pub price: Decimal,
}

/// One line of a cart; references a product XOR a combo
#[derive(Debug, Clone, FromRow)]
pub struct CartItem {
    pub id: i32,
    pub cart_id: Uuid,
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub selected_options: Json<Vec<SelectedOption>>,
    pub unit_price: Decimal,
    /// Un-promoted unit price, kept so discounts can be accounted at
    /// conversion without re-resolving the catalog
    pub regular_unit_price: Decimal,
    pub promotion_id: Option<i32>,
    pub subtotal: Decimal,
}

impl CartItem {
    /// Whether this line is the same `(product, variant, options)` tuple
    pub fn same_tuple(
        &self,
        product_id: Option<i32>,
        combo_id: Option<i32>,
        variant_id: Option<i32>,
        options: &[SelectedOption],
    ) -> bool {
        self.product_id == product_id
            && self.combo_id == combo_id
            && self.variant_id == variant_id
            && self.selected_options.0 == options
    }
}

/// `unit_price * quantity + sum of option prices`
pub fn line_subtotal(unit_price: Decimal, quantity: i32, options: &[SelectedOption]) -> Decimal {
    let options_total: Decimal = options.iter().map(|o| o.price).sum();
    unit_price * Decimal::from(quantity) + options_total
}

/// Request DTO for adding an item to the cart
#[derive(Debug, Deserialize, ToSchema)]
pub struct AddItemRequest {
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

/// Request DTO for updating an item
///
/// `reprice` opts into re-resolving the unit price from the current catalog;
/// by default the stored price is kept so prices do not drift mid-session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateItemRequest {
    pub quantity: Option<i32>,
    pub selected_options: Option<Vec<SelectedOption>>,
    #[serde(default)]
    pub reprice: bool,
}

/// Request DTO for switching service type
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetServiceTypeRequest {
    pub service_type: ServiceType,
}

/// Request DTO for attaching a delivery address
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetDeliveryAddressRequest {
    pub delivery_address_id: i32,
}

/// Request DTO for choosing a pickup restaurant
#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRestaurantRequest {
    pub restaurant_id: i32,
}

/// Response DTO for a cart line
#[derive(Debug, Serialize, ToSchema)]
pub struct CartItemResponse {
    pub id: i32,
    pub product_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub quantity: i32,
    pub selected_options: Vec<SelectedOption>,
    pub unit_price: Decimal,
    pub regular_unit_price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<i32>,
    pub subtotal: Decimal,
}

impl From<CartItem> for CartItemResponse {
    fn from(item: CartItem) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            combo_id: item.combo_id,
            variant_id: item.variant_id,
            quantity: item.quantity,
            selected_options: item.selected_options.0,
            unit_price: item.unit_price,
            regular_unit_price: item.regular_unit_price,
            promotion_id: item.promotion_id,
            subtotal: item.subtotal,
        }
    }
}

/// Totals shown with the cart
#[derive(Debug, Serialize, ToSchema)]
pub struct CartSummary {
    pub items_count: i32,
    pub subtotal: Decimal,
    pub discount_total: Decimal,
}

/// Response DTO for the whole cart
#[derive(Debug, Serialize, ToSchema)]
pub struct CartResponse {
    pub id: Uuid,
    pub restaurant_id: Option<i32>,
    pub service_type: ServiceType,
    pub zone: Zone,
    pub delivery_address_id: Option<i32>,
    pub status: CartStatus,
    pub items: Vec<CartItemResponse>,
    pub summary: CartSummary,
}

impl CartResponse {
    pub fn from_parts(cart: Cart, items: Vec<CartItem>) -> Self {
        let subtotal: Decimal = items
            .iter()
            .map(|i| line_subtotal(i.regular_unit_price, i.quantity, &i.selected_options.0))
            .sum();
        let discount_total: Decimal = items
            .iter()
            .map(|i| (i.regular_unit_price - i.unit_price) * Decimal::from(i.quantity))
            .sum();
        let items_count = items.iter().map(|i| i.quantity).sum();

        Self {
            id: cart.id,
            restaurant_id: cart.restaurant_id,
            service_type: cart.service_type,
            zone: cart.zone,
            delivery_address_id: cart.delivery_address_id,
            status: cart.status,
            items: items.into_iter().map(CartItemResponse::from).collect(),
            summary: CartSummary {
                items_count,
                subtotal,
                discount_total,
            },
        }
    }
}

/// One problem found by cart validation
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CartValidationIssue {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i32>,
}

/// Result of validating a cart before checkout
#[derive(Debug, Serialize, ToSchema)]
pub struct CartValidationReport {
    pub is_valid: bool,
    pub errors: Vec<CartValidationIssue>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn option(section: i32, id: i32, price: Decimal) -> SelectedOption {
        SelectedOption {
            section_id: section,
            option_id: id,
            name: format!("opt {}", id),
            price,
        }
    }

    #[test]
    fn test_line_subtotal_without_options() {
        assert_eq!(line_subtotal(dec!(60.00), 2, &[]), dec!(120.00));
    }

    #[test]
    fn test_line_subtotal_with_options() {
        let options = vec![option(1, 1, dec!(5.00)), option(1, 2, dec!(3.50))];
        assert_eq!(line_subtotal(dec!(50.00), 2, &options), dec!(108.50));
    }

    #[test]
    fn test_same_tuple_matches_options_exactly() {
        let item = CartItem {
            id: 1,
            cart_id: Uuid::new_v4(),
            product_id: Some(10),
            combo_id: None,
            variant_id: Some(3),
            quantity: 1,
            selected_options: Json(vec![option(1, 1, dec!(5.00))]),
            unit_price: dec!(50.00),
            regular_unit_price: dec!(50.00),
            promotion_id: None,
            subtotal: dec!(55.00),
        };

        assert!(item.same_tuple(Some(10), None, Some(3), &[option(1, 1, dec!(5.00))]));
        assert!(!item.same_tuple(Some(10), None, Some(3), &[]));
        assert!(!item.same_tuple(Some(10), None, None, &[option(1, 1, dec!(5.00))]));
        assert!(!item.same_tuple(None, Some(10), Some(3), &[option(1, 1, dec!(5.00))]));
    }
}
