use sqlx::PgPool;

use crate::catalog::{CatalogError, Combo, PricedItem, Product, ProductVariant, Promotion};

const PRODUCT_COLUMNS: &str = "id, name, description, has_variants, price_pickup_capital, \
     price_delivery_capital, price_pickup_interior, price_delivery_interior, is_active, \
     created_at, updated_at";

const VARIANT_COLUMNS: &str = "id, product_id, name, price_pickup_capital, \
     price_delivery_capital, price_pickup_interior, price_delivery_interior, is_active";

const COMBO_COLUMNS: &str = "id, name, description, price_pickup_capital, \
     price_delivery_capital, price_pickup_interior, price_delivery_interior, is_active, \
     created_at, updated_at";

const PROMOTION_COLUMNS: &str = "id, name, product_id, variant_id, combo_id, kind, \
     discount_percent, special_pickup_capital, special_delivery_capital, \
     special_pickup_interior, special_delivery_interior, weekdays, starts_at, ends_at, \
     valid_from, valid_until, sort_order, is_active";

/// Read access to the catalog (products, variants, combos, promotions)
#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_product(&self, id: i32) -> Result<Option<Product>, CatalogError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    pub async fn find_variant(&self, id: i32) -> Result<Option<ProductVariant>, CatalogError> {
        let variant = sqlx::query_as::<_, ProductVariant>(&format!(
            "SELECT {} FROM product_variants WHERE id = $1",
            VARIANT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(variant)
    }

    pub async fn find_combo(&self, id: i32) -> Result<Option<Combo>, CatalogError> {
        let combo = sqlx::query_as::<_, Combo>(&format!(
            "SELECT {} FROM combos WHERE id = $1",
            COMBO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(combo)
    }

    /// Resolve a `(product_id | combo_id, variant_id?)` reference into the
    /// tagged union the core works with
    ///
    /// Dispatch happens once here; downstream code never re-dispatches by
    /// string tag.
    pub async fn resolve_item(
        &self,
        product_id: Option<i32>,
        combo_id: Option<i32>,
        variant_id: Option<i32>,
    ) -> Result<PricedItem, CatalogError> {
        if product_id.is_some() && combo_id.is_some() {
            return Err(CatalogError::AmbiguousItemReference);
        }

        if let Some(combo_id) = combo_id {
            let combo = self
                .find_combo(combo_id)
                .await?
                .ok_or(CatalogError::ComboNotFound(combo_id))?;
            return Ok(PricedItem::Combo(combo));
        }

        let product_id = product_id.ok_or(CatalogError::AmbiguousItemReference)?;
        let product = self
            .find_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        match variant_id {
            Some(variant_id) => {
                let variant = self
                    .find_variant(variant_id)
                    .await?
                    .filter(|v| v.product_id == product.id)
                    .ok_or(CatalogError::VariantNotFound(variant_id))?;
                Ok(PricedItem::Variant { product, variant })
            }
            None => {
                if product.has_variants {
                    return Err(CatalogError::VariantRequired(product.id));
                }
                Ok(PricedItem::Product(product))
            }
        }
    }

    /// Active promotion rows targeting the item; validity windows are
    /// evaluated by the price resolver, not here
    pub async fn promotions_for(&self, item: &PricedItem) -> Result<Vec<Promotion>, CatalogError> {
        let promotions = sqlx::query_as::<_, Promotion>(&format!(
            r#"
            SELECT {}
            FROM promotions
            WHERE is_active = TRUE
              AND (product_id = $1 OR variant_id = $2 OR combo_id = $3)
            ORDER BY sort_order, id
            "#,
            PROMOTION_COLUMNS
        ))
        .bind(item.product_id())
        .bind(item.variant_id())
        .bind(item.combo_id())
        .fetch_all(&self.pool)
        .await?;

        Ok(promotions)
    }

    pub async fn list_active_products(&self) -> Result<Vec<Product>, CatalogError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE is_active = TRUE ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    pub async fn list_variants_for(&self, product_id: i32) -> Result<Vec<ProductVariant>, CatalogError> {
        let variants = sqlx::query_as::<_, ProductVariant>(&format!(
            "SELECT {} FROM product_variants WHERE product_id = $1 AND is_active = TRUE ORDER BY id",
            VARIANT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(variants)
    }

    pub async fn list_active_combos(&self) -> Result<Vec<Combo>, CatalogError> {
        let combos = sqlx::query_as::<_, Combo>(&format!(
            "SELECT {} FROM combos WHERE is_active = TRUE ORDER BY name",
            COMBO_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(combos)
    }
}
