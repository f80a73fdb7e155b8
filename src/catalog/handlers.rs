// HTTP handlers for the catalog read surface

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{CatalogError, Combo, Product, ProductVariant};

/// Product together with its active variants
#[derive(Debug, Serialize, ToSchema)]
pub struct MenuProduct {
    #[serde(flatten)]
    pub product: Product,
    pub variants: Vec<ProductVariant>,
}

/// Full menu exposed to browsing clients
#[derive(Debug, Serialize, ToSchema)]
pub struct MenuResponse {
    pub products: Vec<MenuProduct>,
    pub combos: Vec<Combo>,
}

/// Handler for GET /api/menu
/// Returns active products (with variants) and combos with their 4-zone
/// price sets; clients pick the applicable column via the cart's zone
#[utoipa::path(
    get,
    path = "/api/menu",
    responses(
        (status = 200, description = "Active catalog", body = MenuResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "catalog"
)]
pub async fn get_menu_handler(
    State(state): State<crate::AppState>,
) -> Result<Json<MenuResponse>, CatalogError> {
    tracing::debug!("Fetching active menu");

    let products = state.catalog_repo.list_active_products().await?;
    let combos = state.catalog_repo.list_active_combos().await?;

    let mut menu_products = Vec::with_capacity(products.len());
    for product in products {
        let variants = if product.has_variants {
            state.catalog_repo.list_variants_for(product.id).await?
        } else {
            Vec::new()
        };
        menu_products.push(MenuProduct { product, variants });
    }

    Ok(Json(MenuResponse {
        products: menu_products,
        combos,
    }))
}
