use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use crate::cart::{line_subtotal, AddItemRequest, CartEngine, CartItemsRepository, CartsRepository};
use crate::catalog::{CatalogRepository, ServiceType};
use crate::customers::{AddressSnapshot, CustomersRepository};
use crate::geo::GeofenceResolver;
use crate::loyalty::{points_for_total, tier_for_balance, PointsLedger};
use crate::orders::{
    ActorType, CreateOrderRequest, NewOrder, NewOrderItem, Order, OrderError, OrderItem,
    OrderItemsRepository, OrderStatus, OrdersRepository, ProductSnapshot, ReorderResponse,
    StatusHistoryRepository, StatusMachine, TrackOrderResponse,
};
use crate::restaurants::{DriversRepository, Restaurant, RestaurantsRepository};
use crate::settings::SettingsStore;

/// Monetary breakdown frozen into an order
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub discount_total: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

/// Totals for a set of cart lines
///
/// `subtotal` sums regular-price line subtotals; promotion savings already
/// baked into the unit prices surface as `discount_total`, so nothing is
/// discounted twice at order level.
/// `total = subtotal - discount_total + delivery_fee + tax`.
pub fn compute_totals(
    lines: &[crate::cart::CartItem],
    delivery_fee: Decimal,
    tax_rate: Decimal,
) -> OrderTotals {
    let subtotal: Decimal = lines
        .iter()
        .map(|l| line_subtotal(l.regular_unit_price, l.quantity, &l.selected_options.0))
        .sum();
    let discount_total: Decimal = lines
        .iter()
        .map(|l| (l.regular_unit_price - l.unit_price) * Decimal::from(l.quantity))
        .sum();
    let tax = ((subtotal - discount_total) * tax_rate).round_dp(2);
    let total = subtotal - discount_total + delivery_fee + tax;

    OrderTotals {
        subtotal,
        discount_total,
        tax,
        total,
    }
}

/// Transactional cart-to-order conversion and order lifecycle
///
/// Conversion snapshots prices, address and NIT, applies point redemption,
/// computes points earned and flips the cart to `converted` in one
/// transaction. A mid-failure leaves the cart untouched and active.
#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    orders_repo: OrdersRepository,
    order_items_repo: OrderItemsRepository,
    history_repo: StatusHistoryRepository,
    carts_repo: CartsRepository,
    cart_items_repo: CartItemsRepository,
    cart_engine: CartEngine,
    customers_repo: CustomersRepository,
    restaurants_repo: RestaurantsRepository,
    drivers_repo: DriversRepository,
    catalog_repo: CatalogRepository,
    geofence: GeofenceResolver,
    ledger: PointsLedger,
    settings: Arc<SettingsStore>,
}

impl OrderService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        orders_repo: OrdersRepository,
        order_items_repo: OrderItemsRepository,
        history_repo: StatusHistoryRepository,
        carts_repo: CartsRepository,
        cart_items_repo: CartItemsRepository,
        cart_engine: CartEngine,
        customers_repo: CustomersRepository,
        restaurants_repo: RestaurantsRepository,
        drivers_repo: DriversRepository,
        catalog_repo: CatalogRepository,
        geofence: GeofenceResolver,
        ledger: PointsLedger,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            pool,
            orders_repo,
            order_items_repo,
            history_repo,
            carts_repo,
            cart_items_repo,
            cart_engine,
            customers_repo,
            restaurants_repo,
            drivers_repo,
            catalog_repo,
            geofence,
            ledger,
            settings,
        }
    }

    /// Convert the customer's active cart into an immutable order
    ///
    /// Preconditions fail fast with distinct error codes before the write
    /// transaction opens; the cart/customer locks and the `status = 'active'`
    /// guard on the cart flip make the conversion at-most-once under
    /// concurrency.
    pub async fn convert(
        &self,
        customer_id: i32,
        request: CreateOrderRequest,
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        if request.points_to_redeem < 0 {
            return Err(OrderError::ValidationError(
                "points_to_redeem must not be negative".to_string(),
            ));
        }
        if let Some(ref nit) = request.nit {
            crate::validation::validate_nit(nit)
                .map_err(|_| OrderError::ValidationError("invalid NIT format".to_string()))?;
        }

        let report = self.cart_engine.validate(customer_id).await?;
        if !report.is_valid {
            if report.errors.iter().all(|e| e.code == "CART_EMPTY") {
                return Err(OrderError::CartEmpty);
            }
            return Err(OrderError::CartInvalid(report.errors));
        }

        let restaurant = self.active_restaurant(request.restaurant_id).await?;
        let supports = match request.service_type {
            ServiceType::Delivery => restaurant.delivery_active,
            ServiceType::Pickup => restaurant.pickup_active,
        };
        if !supports {
            return Err(OrderError::ServiceTypeUnsupported {
                restaurant_id: restaurant.id,
                service_type: request.service_type.to_string(),
            });
        }

        let ordering = self
            .settings
            .ordering()
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?;

        // Scheduling lead time only constrains pickup
        if request.service_type == ServiceType::Pickup {
            if let Some(scheduled) = request.scheduled_pickup_time {
                let earliest = Utc::now() + Duration::minutes(ordering.pickup_lead_minutes as i64);
                if scheduled < earliest {
                    return Err(OrderError::ScheduledTooSoon(ordering.pickup_lead_minutes));
                }
            }
        }

        let loyalty_settings = self
            .settings
            .loyalty()
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?;
        if request.points_to_redeem > 0
            && request.points_to_redeem % loyalty_settings.redemption_step != 0
        {
            return Err(OrderError::RedemptionStepViolation(
                loyalty_settings.redemption_step,
            ));
        }

        // Delivery address must geofence-resolve to the chosen restaurant
        let (zone, address_snapshot) = match request.service_type {
            ServiceType::Delivery => {
                let address_id = request
                    .delivery_address_id
                    .ok_or(OrderError::DeliveryAddressRequired)?;
                let address = self
                    .customers_repo
                    .find_address(address_id)
                    .await
                    .map_err(|e| OrderError::DatabaseError(e.to_string()))?
                    .ok_or(OrderError::AddressNotFound(address_id))?;
                if address.customer_id != customer_id {
                    return Err(OrderError::Forbidden);
                }

                let resolution = self
                    .geofence
                    .resolve_delivery(address.latitude, address.longitude)
                    .await
                    .map_err(|e| OrderError::DatabaseError(e.to_string()))?
                    .ok_or(OrderError::AddressOutsideDeliveryZone)?;
                if resolution.restaurant.id != restaurant.id {
                    return Err(OrderError::AddressOutsideDeliveryZone);
                }

                (resolution.zone, Some(AddressSnapshot::from(&address)))
            }
            ServiceType::Pickup => (restaurant.zone, None),
        };

        let delivery_fee = match request.service_type {
            ServiceType::Delivery => self
                .settings
                .delivery_fee(zone)
                .await
                .map_err(|e| OrderError::DatabaseError(e.to_string()))?,
            ServiceType::Pickup => Decimal::ZERO,
        };

        let tiers = self
            .settings
            .tiers()
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let cart = self
            .carts_repo
            .lock_active(&mut *tx, customer_id)
            .await?
            .ok_or(OrderError::CartNotFound)?;
        let lines = self.cart_items_repo.list_in(&mut *tx, cart.id).await?;
        if lines.is_empty() {
            return Err(OrderError::CartEmpty);
        }

        let customer = self
            .customers_repo
            .lock(&mut *tx, customer_id)
            .await?
            .ok_or_else(|| OrderError::DatabaseError("customer row missing".to_string()))?;

        if request.points_to_redeem > customer.points {
            return Err(OrderError::Loyalty(
                crate::loyalty::LoyaltyError::InsufficientPoints {
                    requested: request.points_to_redeem,
                    balance: customer.points,
                },
            ));
        }

        let OrderTotals {
            subtotal,
            discount_total,
            tax,
            total,
        } = compute_totals(&lines, delivery_fee, ordering.tax_rate);

        let multiplier = tier_for_balance(customer.points, &tiers)
            .map(|t| t.earn_multiplier)
            .unwrap_or(Decimal::ONE);
        let points_earned = points_for_total(total, &loyalty_settings, multiplier);

        // At-most-once: the loser of a concurrent conversion affects 0 rows
        let flipped = self.carts_repo.mark_converted(&mut *tx, cart.id).await?;
        if flipped == 0 {
            return Err(OrderError::AlreadyConverted);
        }

        let nit_snapshot = request.nit.clone().or_else(|| customer.nit.clone());

        let order = self
            .orders_repo
            .insert(
                &mut *tx,
                NewOrder {
                    customer_id,
                    restaurant_id: restaurant.id,
                    cart_id: cart.id,
                    service_type: request.service_type,
                    zone,
                    payment_method: request.payment_method,
                    subtotal,
                    discount_total,
                    delivery_fee,
                    tax,
                    total,
                    points_earned,
                    points_redeemed: request.points_to_redeem,
                    delivery_address_snapshot: address_snapshot,
                    nit_snapshot,
                    scheduled_for: request.scheduled_for,
                    scheduled_pickup_time: request.scheduled_pickup_time,
                },
            )
            .await?;

        let mut items = Vec::with_capacity(lines.len());
        for line in &lines {
            let catalog_item = self
                .catalog_repo
                .resolve_item(line.product_id, line.combo_id, line.variant_id)
                .await?;
            let snapshot = ProductSnapshot {
                name: catalog_item.display_name(),
                description: catalog_item.description().to_string(),
            };
            let item = self
                .order_items_repo
                .insert(
                    &mut *tx,
                    order.id,
                    NewOrderItem {
                        product_id: line.product_id,
                        combo_id: line.combo_id,
                        variant_id: line.variant_id,
                        product_snapshot: snapshot,
                        quantity: line.quantity,
                        selected_options: line.selected_options.0.clone(),
                        unit_price: line.unit_price,
                        regular_unit_price: line.regular_unit_price,
                        subtotal: line.subtotal,
                    },
                )
                .await?;
            items.push(item);
        }

        self.history_repo
            .append(
                &mut *tx,
                order.id,
                None,
                OrderStatus::Pending,
                ActorType::Customer,
                None,
            )
            .await?;

        // Ledger writes: redemption debit first, then the earning credit
        let mut balance_view = customer.clone();
        if request.points_to_redeem > 0 {
            let result = self
                .ledger
                .redeem_in(&mut *tx, &balance_view, request.points_to_redeem, Some(order.id))
                .await?;
            balance_view.points = result.new_balance;
        }
        if points_earned > 0 {
            self.ledger
                .earn_in(&mut *tx, &balance_view, points_earned, Some(order.id))
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            "Converted cart {} into order {} for customer {} (total {}, earned {}, redeemed {})",
            cart.id,
            order.id,
            customer_id,
            total,
            points_earned,
            request.points_to_redeem
        );
        Ok((order, items))
    }

    /// Order history for the customer, newest first
    pub async fn list_orders(&self, customer_id: i32) -> Result<Vec<(Order, Vec<OrderItem>)>, OrderError> {
        let orders = self.orders_repo.list_for_customer(customer_id).await?;
        self.with_items(orders).await
    }

    /// Orders still moving through the pipeline
    pub async fn list_active_orders(
        &self,
        customer_id: i32,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>, OrderError> {
        let orders = self.orders_repo.list_active_for_customer(customer_id).await?;
        self.with_items(orders).await
    }

    /// A single order, with 403/404 distinguished
    pub async fn get_order(
        &self,
        customer_id: i32,
        order_id: Uuid,
    ) -> Result<(Order, Vec<OrderItem>), OrderError> {
        let order = self.owned_order(customer_id, order_id).await?;
        let items = self.order_items_repo.list(order.id).await?;
        Ok((order, items))
    }

    /// Status, driver and full transition history for tracking
    pub async fn track_order(
        &self,
        customer_id: i32,
        order_id: Uuid,
    ) -> Result<TrackOrderResponse, OrderError> {
        let order = self.owned_order(customer_id, order_id).await?;
        let history = self.history_repo.list(order.id).await?;
        let driver = match order.driver_id {
            Some(driver_id) => self
                .drivers_repo
                .find_by_id(driver_id)
                .await
                .map_err(|e| OrderError::DatabaseError(e.to_string()))?,
            None => None,
        };

        Ok(TrackOrderResponse {
            id: order.id,
            status: order.status,
            service_type: order.service_type,
            driver,
            history,
        })
    }

    /// Customer cancellation; requires a reason and an open cancellation
    /// window
    pub async fn cancel(
        &self,
        customer_id: i32,
        order_id: Uuid,
        reason: &str,
    ) -> Result<Order, OrderError> {
        if reason.trim().is_empty() {
            return Err(OrderError::ValidationError(
                "A cancellation reason is required".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        let order = self
            .orders_repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if order.customer_id != customer_id {
            return Err(OrderError::Forbidden);
        }
        if !StatusMachine::can_cancel(order.status) {
            return Err(OrderError::CancellationNotAllowed);
        }

        let updated = self
            .orders_repo
            .update_status(&mut *tx, order_id, OrderStatus::Cancelled, Some(reason))
            .await?;
        self.history_repo
            .append(
                &mut *tx,
                order_id,
                Some(order.status),
                OrderStatus::Cancelled,
                ActorType::Customer,
                Some(reason),
            )
            .await?;
        tx.commit().await?;

        tracing::info!("Order {} cancelled by customer {}", order_id, customer_id);
        Ok(updated)
    }

    /// Staff status transition; every change appends one history row
    pub async fn update_status(
        &self,
        order_id: Uuid,
        new_status: OrderStatus,
        actor: ActorType,
        notes: Option<&str>,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = self
            .orders_repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        StatusMachine::transition(order.service_type, order.status, new_status)
            .map_err(OrderError::InvalidTransition)?;

        // Same-status transitions are valid but write nothing
        if order.status == new_status {
            tx.commit().await?;
            return Ok(order);
        }

        let updated = self
            .orders_repo
            .update_status(&mut *tx, order_id, new_status, None)
            .await?;
        self.history_repo
            .append(&mut *tx, order_id, Some(order.status), new_status, actor, notes)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} moved from {} to {}",
            order_id,
            order.status,
            new_status
        );
        Ok(updated)
    }

    /// Assign a driver; only for delivery orders up through `ready`, and the
    /// driver must belong to the order's restaurant
    pub async fn assign_driver(&self, order_id: Uuid, driver_id: i32) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = self
            .orders_repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if !StatusMachine::can_assign_driver(order.service_type, order.status) {
            return Err(OrderError::DriverAssignmentNotAllowed);
        }

        let driver = self
            .drivers_repo
            .find_by_id(driver_id)
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            .filter(|d| d.is_active && d.restaurant_id == order.restaurant_id)
            .ok_or(OrderError::DriverUnavailable(driver_id))?;

        let updated = self
            .orders_repo
            .assign_driver(&mut *tx, order_id, Some(driver.id))
            .await?;
        tx.commit().await?;

        tracing::info!("Driver {} assigned to order {}", driver_id, order_id);
        Ok(updated)
    }

    /// Move the order to another restaurant; permitted strictly before
    /// `ready` and clears any driver assignment
    pub async fn change_restaurant(
        &self,
        order_id: Uuid,
        restaurant_id: i32,
    ) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        let order = self
            .orders_repo
            .lock(&mut *tx, order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if !StatusMachine::can_change_restaurant(order.status) {
            return Err(OrderError::RestaurantChangeNotAllowed);
        }

        let restaurant = self.active_restaurant(restaurant_id).await?;
        let supports = match order.service_type {
            ServiceType::Delivery => restaurant.delivery_active,
            ServiceType::Pickup => restaurant.pickup_active,
        };
        if !supports {
            return Err(OrderError::ServiceTypeUnsupported {
                restaurant_id,
                service_type: order.service_type.to_string(),
            });
        }

        let updated = self
            .orders_repo
            .change_restaurant(&mut *tx, order_id, restaurant.id)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} moved to restaurant {} (driver cleared)",
            order_id,
            restaurant_id
        );
        Ok(updated)
    }

    /// Rebuild the active cart from a past order at current prices
    ///
    /// Items that are gone or inactive are skipped and reported back by
    /// name.
    pub async fn reorder(
        &self,
        customer_id: i32,
        order_id: Uuid,
    ) -> Result<ReorderResponse, OrderError> {
        let order = self.owned_order(customer_id, order_id).await?;
        let items = self.order_items_repo.list(order.id).await?;

        self.cart_engine.clear(customer_id).await?;

        let mut skipped = Vec::new();
        for item in items {
            let added = self
                .cart_engine
                .add_item(
                    customer_id,
                    AddItemRequest {
                        product_id: item.product_id,
                        combo_id: item.combo_id,
                        variant_id: item.variant_id,
                        quantity: item.quantity,
                        selected_options: item.selected_options.0.clone(),
                    },
                )
                .await;
            if added.is_err() {
                skipped.push(item.product_snapshot.0.name.clone());
            }
        }

        let (cart, cart_items) = self.cart_engine.get_or_create(customer_id).await?;
        Ok(ReorderResponse {
            cart: crate::cart::CartResponse::from_parts(cart, cart_items),
            skipped,
        })
    }

    async fn owned_order(&self, customer_id: i32, order_id: Uuid) -> Result<Order, OrderError> {
        let order = self
            .orders_repo
            .find_by_id(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;
        if order.customer_id != customer_id {
            return Err(OrderError::Forbidden);
        }
        Ok(order)
    }

    async fn active_restaurant(&self, restaurant_id: i32) -> Result<Restaurant, OrderError> {
        self.restaurants_repo
            .find_by_id(restaurant_id)
            .await
            .map_err(|e| OrderError::DatabaseError(e.to_string()))?
            .filter(|r| r.is_active)
            .ok_or(OrderError::RestaurantInactive(restaurant_id))
    }

    async fn with_items(
        &self,
        orders: Vec<Order>,
    ) -> Result<Vec<(Order, Vec<OrderItem>)>, OrderError> {
        let mut result = Vec::with_capacity(orders.len());
        for order in orders {
            let items = self.order_items_repo.list(order.id).await?;
            result.push((order, items));
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartItem, SelectedOption};
    use rust_decimal_macros::dec;
    use sqlx::types::Json;

    fn line(
        unit_price: Decimal,
        regular_unit_price: Decimal,
        quantity: i32,
        options: Vec<SelectedOption>,
    ) -> CartItem {
        CartItem {
            id: 1,
            cart_id: Uuid::new_v4(),
            product_id: Some(1),
            combo_id: None,
            variant_id: None,
            quantity,
            selected_options: Json(options),
            unit_price,
            regular_unit_price,
            promotion_id: None,
            subtotal: line_subtotal(unit_price, quantity, &[]),
        }
    }

    #[test]
    fn test_totals_without_discounts() {
        let lines = vec![line(dec!(50.00), dec!(50.00), 2, vec![])];
        let totals = compute_totals(&lines, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(totals.subtotal, dec!(100.00));
        assert_eq!(totals.discount_total, dec!(0.00));
        assert_eq!(totals.tax, dec!(0.00));
        assert_eq!(totals.total, dec!(100.00));
    }

    #[test]
    fn test_promotion_savings_surface_as_discount() {
        // Promoted price 45 against a regular 50, two units
        let lines = vec![line(dec!(45.00), dec!(50.00), 2, vec![])];
        let totals = compute_totals(&lines, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(totals.subtotal, dec!(100.00));
        assert_eq!(totals.discount_total, dec!(10.00));
        assert_eq!(totals.total, dec!(90.00));
    }

    #[test]
    fn test_delivery_fee_added_to_total() {
        let lines = vec![line(dec!(60.00), dec!(60.00), 2, vec![])];
        let totals = compute_totals(&lines, dec!(15.00), Decimal::ZERO);

        assert_eq!(totals.total, dec!(135.00));
    }

    #[test]
    fn test_tax_applied_to_discounted_base() {
        let lines = vec![line(dec!(90.00), dec!(100.00), 1, vec![])];
        let totals = compute_totals(&lines, Decimal::ZERO, dec!(0.12));

        // 12% of (100 - 10)
        assert_eq!(totals.tax, dec!(10.80));
        assert_eq!(totals.total, dec!(100.80));
    }

    #[test]
    fn test_option_prices_counted_once_per_line() {
        let options = vec![SelectedOption {
            section_id: 1,
            option_id: 1,
            name: "Extra tortillas".to_string(),
            price: dec!(5.00),
        }];
        let lines = vec![line(dec!(50.00), dec!(50.00), 2, options)];
        let totals = compute_totals(&lines, Decimal::ZERO, Decimal::ZERO);

        assert_eq!(totals.subtotal, dec!(105.00));
    }
}
