use chrono::Utc;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;

use crate::cart::{
    line_subtotal, AddItemRequest, Cart, CartError, CartItem, CartItemsRepository,
    CartValidationIssue, CartValidationReport, CartsRepository, NewCartItem, UpdateItemRequest,
};
use crate::catalog::{CatalogRepository, PriceResolver, ServiceType, Zone};
use crate::customers::CustomersRepository;
use crate::geo::GeofenceResolver;
use crate::restaurants::RestaurantsRepository;
use crate::settings::{DuplicateItemPolicy, SettingsStore};

/// Owns a customer's single mutable active cart
///
/// Every operation takes the customer id explicitly and runs inside one
/// transaction, opening with a locking read of the active cart row. Any
/// mutation that changes `{service_type, zone}` re-prices every line in the
/// same transaction; partial staleness is not permitted.
#[derive(Clone)]
pub struct CartEngine {
    pool: PgPool,
    carts_repo: CartsRepository,
    items_repo: CartItemsRepository,
    catalog_repo: CatalogRepository,
    customers_repo: CustomersRepository,
    restaurants_repo: RestaurantsRepository,
    geofence: GeofenceResolver,
    settings: Arc<SettingsStore>,
}

impl CartEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        carts_repo: CartsRepository,
        items_repo: CartItemsRepository,
        catalog_repo: CatalogRepository,
        customers_repo: CustomersRepository,
        restaurants_repo: RestaurantsRepository,
        geofence: GeofenceResolver,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            pool,
            carts_repo,
            items_repo,
            catalog_repo,
            customers_repo,
            restaurants_repo,
            geofence,
            settings,
        }
    }

    /// Current active cart, created empty when none exists
    pub async fn get_or_create(&self, customer_id: i32) -> Result<(Cart, Vec<CartItem>), CartError> {
        if let Some(cart) = self.carts_repo.find_active(customer_id).await? {
            let items = self.items_repo.list(cart.id).await?;
            return Ok((cart, items));
        }

        let mut tx = self.pool.begin().await?;
        // Re-check under the lock; a concurrent request may have created one
        let (cart, created) = match self.carts_repo.lock_active(&mut *tx, customer_id).await? {
            Some(cart) => (cart, false),
            None => (
                self.carts_repo.create_active(&mut *tx, customer_id).await?,
                true,
            ),
        };
        tx.commit().await?;

        if created {
            tracing::info!("Created active cart {} for customer {}", cart.id, customer_id);
            return Ok((cart, Vec::new()));
        }
        let items = self.items_repo.list(cart.id).await?;
        Ok((cart, items))
    }

    /// Add a line, pricing it under the cart's current `{service_type, zone}`
    ///
    /// When an identical `(product, variant, options)` tuple already exists,
    /// the configured duplicate policy decides between merging quantities and
    /// appending a second line.
    pub async fn add_item(
        &self,
        customer_id: i32,
        request: AddItemRequest,
    ) -> Result<CartItem, CartError> {
        if request.quantity < 1 {
            return Err(CartError::InvalidQuantity);
        }

        let item = self
            .catalog_repo
            .resolve_item(request.product_id, request.combo_id, request.variant_id)
            .await?;
        if !item.is_active() {
            return Err(CartError::ItemInactive);
        }

        let policy = self
            .settings
            .ordering()
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .duplicate_item_policy;

        let mut tx = self.pool.begin().await?;
        let cart = self.lock_or_create(&mut *tx, customer_id).await?;

        let promotions = self.catalog_repo.promotions_for(&item).await?;
        let quote = PriceResolver::quote(
            &item,
            &promotions,
            cart.service_type,
            cart.zone,
            Utc::now(),
        )?;

        if policy == DuplicateItemPolicy::Merge {
            let existing = self.items_repo.list_in(&mut *tx, cart.id).await?;
            if let Some(line) = existing.iter().find(|line| {
                line.same_tuple(
                    item.product_id(),
                    item.combo_id(),
                    item.variant_id(),
                    &request.selected_options,
                )
            }) {
                // Merge keeps the line's stored price; mid-session drift
                // only happens on explicit reprice
                let quantity = line.quantity + request.quantity;
                let subtotal = line_subtotal(line.unit_price, quantity, &request.selected_options);
                let updated = self
                    .items_repo
                    .update_line(
                        &mut *tx,
                        line.id,
                        quantity,
                        request.selected_options,
                        line.unit_price,
                        line.regular_unit_price,
                        line.promotion_id,
                        subtotal,
                    )
                    .await?;
                tx.commit().await?;
                return Ok(updated);
            }
        }

        let subtotal = line_subtotal(quote.unit_price, request.quantity, &request.selected_options);
        let inserted = self
            .items_repo
            .insert(
                &mut *tx,
                cart.id,
                NewCartItem {
                    product_id: item.product_id(),
                    combo_id: item.combo_id(),
                    variant_id: item.variant_id(),
                    quantity: request.quantity,
                    selected_options: request.selected_options,
                    unit_price: quote.unit_price,
                    regular_unit_price: quote.regular_price,
                    promotion_id: quote.promotion.as_ref().map(|p| p.promotion_id),
                    subtotal,
                },
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Added item {} to cart {} for customer {}",
            inserted.id,
            cart.id,
            customer_id
        );
        Ok(inserted)
    }

    /// Update a line's quantity or options
    ///
    /// The stored unit price is kept unless `reprice` is requested, so
    /// catalog changes never silently drift a cart mid-session.
    pub async fn update_item(
        &self,
        customer_id: i32,
        item_id: i32,
        request: UpdateItemRequest,
    ) -> Result<CartItem, CartError> {
        if matches!(request.quantity, Some(q) if q < 1) {
            return Err(CartError::InvalidQuantity);
        }

        let mut tx = self.pool.begin().await?;
        let cart = self
            .carts_repo
            .lock_active(&mut *tx, customer_id)
            .await?
            .ok_or(CartError::ItemNotFound(item_id))?;

        let line = self.owned_item(&cart, customer_id, item_id).await?;

        let quantity = request.quantity.unwrap_or(line.quantity);
        let options = request
            .selected_options
            .unwrap_or_else(|| line.selected_options.0.clone());

        let (unit_price, regular_unit_price, promotion_id) = if request.reprice {
            let item = self
                .catalog_repo
                .resolve_item(line.product_id, line.combo_id, line.variant_id)
                .await?;
            let promotions = self.catalog_repo.promotions_for(&item).await?;
            let quote = PriceResolver::quote(
                &item,
                &promotions,
                cart.service_type,
                cart.zone,
                Utc::now(),
            )?;
            (
                quote.unit_price,
                quote.regular_price,
                quote.promotion.as_ref().map(|p| p.promotion_id),
            )
        } else {
            (line.unit_price, line.regular_unit_price, line.promotion_id)
        };

        let subtotal = line_subtotal(unit_price, quantity, &options);
        let updated = self
            .items_repo
            .update_line(
                &mut *tx,
                line.id,
                quantity,
                options,
                unit_price,
                regular_unit_price,
                promotion_id,
                subtotal,
            )
            .await?;
        tx.commit().await?;

        Ok(updated)
    }

    pub async fn remove_item(&self, customer_id: i32, item_id: i32) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = self
            .carts_repo
            .lock_active(&mut *tx, customer_id)
            .await?
            .ok_or(CartError::ItemNotFound(item_id))?;

        let line = self.owned_item(&cart, customer_id, item_id).await?;
        self.items_repo.delete(&mut *tx, line.id).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn clear(&self, customer_id: i32) -> Result<(), CartError> {
        let mut tx = self.pool.begin().await?;
        if let Some(cart) = self.carts_repo.lock_active(&mut *tx, customer_id).await? {
            self.items_repo.delete_all(&mut *tx, cart.id).await?;
            tx.commit().await?;
            tracing::info!("Cleared cart {} for customer {}", cart.id, customer_id);
        }
        Ok(())
    }

    /// Switch between pickup and delivery
    ///
    /// Delivery -> pickup clears the restaurant binding (a pickup restaurant
    /// must be chosen explicitly) and resets the zone to the default.
    /// Switching to delivery requires an attached address, which must resolve
    /// to a serving restaurant. Every line is re-priced under the new
    /// context.
    pub async fn set_service_type(
        &self,
        customer_id: i32,
        new_type: ServiceType,
    ) -> Result<(Cart, Vec<CartItem>), CartError> {
        let mut tx = self.pool.begin().await?;
        let cart = self.lock_or_create(&mut *tx, customer_id).await?;

        if cart.service_type == new_type {
            let items = self.items_repo.list_in(&mut *tx, cart.id).await?;
            tx.commit().await?;
            return Ok((cart, items));
        }

        let updated = match new_type {
            ServiceType::Pickup => {
                self.carts_repo
                    .update_context(
                        &mut *tx,
                        cart.id,
                        None,
                        ServiceType::Pickup,
                        Zone::default(),
                        cart.delivery_address_id,
                    )
                    .await?
            }
            ServiceType::Delivery => {
                let address_id = cart
                    .delivery_address_id
                    .ok_or(CartError::DeliveryAddressRequired)?;
                let address = self
                    .customers_repo
                    .find_address(address_id)
                    .await
                    .map_err(|e| CartError::DatabaseError(e.to_string()))?
                    .ok_or(CartError::AddressNotFound(address_id))?;

                let resolution = self
                    .geofence
                    .resolve_delivery(address.latitude, address.longitude)
                    .await?
                    .ok_or(CartError::AddressOutsideDeliveryZone)?;

                self.carts_repo
                    .update_context(
                        &mut *tx,
                        cart.id,
                        Some(resolution.restaurant.id),
                        ServiceType::Delivery,
                        resolution.zone,
                        Some(address_id),
                    )
                    .await?
            }
        };

        let items = self.reprice_all(&mut *tx, &updated).await?;
        tx.commit().await?;

        tracing::info!(
            "Cart {} switched to {} (zone {})",
            updated.id,
            updated.service_type,
            updated.zone
        );
        Ok((updated, items))
    }

    /// Attach a delivery address; for a delivery cart this rebinds the
    /// restaurant and zone and re-prices
    pub async fn set_delivery_address(
        &self,
        customer_id: i32,
        address_id: i32,
    ) -> Result<(Cart, Vec<CartItem>), CartError> {
        let address = self
            .customers_repo
            .find_address(address_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .ok_or(CartError::AddressNotFound(address_id))?;
        if address.customer_id != customer_id {
            return Err(CartError::Forbidden);
        }

        let resolution = self
            .geofence
            .resolve_delivery(address.latitude, address.longitude)
            .await?
            .ok_or(CartError::AddressOutsideDeliveryZone)?;

        let mut tx = self.pool.begin().await?;
        let cart = self.lock_or_create(&mut *tx, customer_id).await?;

        let (restaurant_id, zone) = if cart.service_type == ServiceType::Delivery {
            (Some(resolution.restaurant.id), resolution.zone)
        } else {
            (cart.restaurant_id, cart.zone)
        };

        let updated = self
            .carts_repo
            .update_context(
                &mut *tx,
                cart.id,
                restaurant_id,
                cart.service_type,
                zone,
                Some(address_id),
            )
            .await?;

        let items = if updated.zone != cart.zone || updated.restaurant_id != cart.restaurant_id {
            self.reprice_all(&mut *tx, &updated).await?
        } else {
            self.items_repo.list_in(&mut *tx, updated.id).await?
        };
        tx.commit().await?;

        Ok((updated, items))
    }

    /// Choose a pickup restaurant explicitly; the cart's zone follows the
    /// restaurant's native zone
    pub async fn set_restaurant(
        &self,
        customer_id: i32,
        restaurant_id: i32,
    ) -> Result<(Cart, Vec<CartItem>), CartError> {
        let restaurant = self
            .restaurants_repo
            .find_by_id(restaurant_id)
            .await
            .map_err(|e| CartError::DatabaseError(e.to_string()))?
            .filter(|r| r.is_active && r.pickup_active)
            .ok_or(CartError::RestaurantUnavailable(restaurant_id))?;

        let mut tx = self.pool.begin().await?;
        let cart = self.lock_or_create(&mut *tx, customer_id).await?;

        if cart.service_type != ServiceType::Pickup {
            // Delivery carts get their restaurant from the resolved address
            return Err(CartError::RestaurantUnavailable(restaurant_id));
        }

        let updated = self
            .carts_repo
            .update_context(
                &mut *tx,
                cart.id,
                Some(restaurant.id),
                ServiceType::Pickup,
                restaurant.zone,
                cart.delivery_address_id,
            )
            .await?;

        let items = self.reprice_all(&mut *tx, &updated).await?;
        tx.commit().await?;

        Ok((updated, items))
    }

    /// Pre-checkout validation: every referenced catalog row must still be
    /// active, the cart must be non-empty, and a delivery cart must satisfy
    /// its restaurant's minimum order amount
    pub async fn validate(&self, customer_id: i32) -> Result<CartValidationReport, CartError> {
        let mut errors = Vec::new();

        let Some(cart) = self.carts_repo.find_active(customer_id).await? else {
            return Ok(CartValidationReport {
                is_valid: false,
                errors: vec![CartValidationIssue {
                    code: "CART_EMPTY".to_string(),
                    message: "The cart is empty".to_string(),
                    item_id: None,
                }],
            });
        };

        let items = self.items_repo.list(cart.id).await?;
        if items.is_empty() {
            errors.push(CartValidationIssue {
                code: "CART_EMPTY".to_string(),
                message: "The cart is empty".to_string(),
                item_id: None,
            });
        }

        for line in &items {
            match self
                .catalog_repo
                .resolve_item(line.product_id, line.combo_id, line.variant_id)
                .await
            {
                Ok(item) if item.is_active() => {}
                Ok(item) => errors.push(CartValidationIssue {
                    code: "ITEM_INACTIVE".to_string(),
                    message: format!("{} is no longer available", item.display_name()),
                    item_id: Some(line.id),
                }),
                Err(_) => errors.push(CartValidationIssue {
                    code: "ITEM_UNAVAILABLE".to_string(),
                    message: "The referenced item no longer exists".to_string(),
                    item_id: Some(line.id),
                }),
            }
        }

        if cart.service_type == ServiceType::Delivery {
            if cart.delivery_address_id.is_none() {
                errors.push(CartValidationIssue {
                    code: "DELIVERY_ADDRESS_REQUIRED".to_string(),
                    message: "A delivery address must be attached".to_string(),
                    item_id: None,
                });
            }
            if let Some(restaurant_id) = cart.restaurant_id {
                if let Some(restaurant) = self
                    .restaurants_repo
                    .find_by_id(restaurant_id)
                    .await
                    .map_err(|e| CartError::DatabaseError(e.to_string()))?
                {
                    let subtotal: rust_decimal::Decimal =
                        items.iter().map(|i| i.subtotal).sum();
                    if subtotal < restaurant.minimum_order_amount {
                        errors.push(CartValidationIssue {
                            code: "MINIMUM_ORDER_NOT_MET".to_string(),
                            message: format!(
                                "The minimum order amount for delivery is {}",
                                restaurant.minimum_order_amount
                            ),
                            item_id: None,
                        });
                    }
                }
            }
        }

        Ok(CartValidationReport {
            is_valid: errors.is_empty(),
            errors,
        })
    }

    async fn lock_or_create(
        &self,
        conn: &mut PgConnection,
        customer_id: i32,
    ) -> Result<Cart, sqlx::Error> {
        match self.carts_repo.lock_active(conn, customer_id).await? {
            Some(cart) => Ok(cart),
            None => self.carts_repo.create_active(conn, customer_id).await,
        }
    }

    /// An item id the customer may touch: it must sit in their active cart
    ///
    /// An item in another customer's cart is forbidden, not merely missing;
    /// the two outcomes are distinguished deliberately.
    async fn owned_item(
        &self,
        cart: &Cart,
        customer_id: i32,
        item_id: i32,
    ) -> Result<CartItem, CartError> {
        let line = self
            .items_repo
            .find_by_id(item_id)
            .await?
            .ok_or(CartError::ItemNotFound(item_id))?;

        if line.cart_id == cart.id {
            return Ok(line);
        }

        let owner = self.carts_repo.find_by_id(line.cart_id).await?;
        match owner {
            Some(other) if other.customer_id != customer_id => Err(CartError::Forbidden),
            _ => Err(CartError::ItemNotFound(item_id)),
        }
    }

    /// Re-price every line under the cart's current `{service_type, zone}`
    ///
    /// Runs inside the caller's transaction so a zone switch and its price
    /// effects land together. Lines whose catalog rows disappeared are left
    /// for `validate` to flag.
    async fn reprice_all(
        &self,
        conn: &mut PgConnection,
        cart: &Cart,
    ) -> Result<Vec<CartItem>, CartError> {
        let now = Utc::now();
        let lines = self.items_repo.list_in(conn, cart.id).await?;
        let mut repriced = Vec::with_capacity(lines.len());

        for line in lines {
            let item = match self
                .catalog_repo
                .resolve_item(line.product_id, line.combo_id, line.variant_id)
                .await
            {
                Ok(item) => item,
                Err(err) => {
                    tracing::warn!(
                        "Skipping reprice of cart item {}: {}",
                        line.id,
                        err
                    );
                    repriced.push(line);
                    continue;
                }
            };

            let promotions = self.catalog_repo.promotions_for(&item).await?;
            let quote =
                PriceResolver::quote(&item, &promotions, cart.service_type, cart.zone, now)?;
            let subtotal = line_subtotal(quote.unit_price, line.quantity, &line.selected_options.0);

            let updated = self
                .items_repo
                .update_line(
                    conn,
                    line.id,
                    line.quantity,
                    line.selected_options.0.clone(),
                    quote.unit_price,
                    quote.regular_price,
                    quote.promotion.as_ref().map(|p| p.promotion_id),
                    subtotal,
                )
                .await?;
            repriced.push(updated);
        }

        Ok(repriced)
    }
}
