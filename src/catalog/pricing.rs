use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::catalog::{
    CatalogError, PricedItem, Promotion, PromotionKind, ServiceType, Zone, ZonePriceSet,
};

/// Promotion applied to a resolved price, reported back to the client
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AppliedPromotion {
    pub promotion_id: i32,
    pub name: String,
    pub kind: PromotionKind,
}

/// Result of resolving a unit price for one priced item
#[derive(Debug, Clone)]
pub struct PriceQuote {
    /// The price the customer pays per unit
    pub unit_price: Decimal,
    /// The un-promoted column price, kept for discount accounting
    pub regular_price: Decimal,
    pub promotion: Option<AppliedPromotion>,
}

impl PriceQuote {
    pub fn discount_per_unit(&self) -> Decimal {
        self.regular_price - self.unit_price
    }
}

/// Resolves the applicable price tier for a priced item
///
/// Pure over its inputs: the caller supplies the item, its candidate
/// promotions, and the clock.
pub struct PriceResolver;

impl PriceResolver {
    /// Resolve `{unit_price, applied_promotion?}` for an item under
    /// `{service_type, zone}` at `now`
    ///
    /// The base price is a strict 2x2 column lookup. If promotions are valid
    /// at `now`, exactly one overlays the base price: the one with the lowest
    /// `sort_order`, ties broken by lowest id.
    pub fn quote(
        item: &PricedItem,
        promotions: &[Promotion],
        service_type: ServiceType,
        zone: Zone,
        now: DateTime<Utc>,
    ) -> Result<PriceQuote, CatalogError> {
        let prices = Self::base_price_set(item)?;
        let regular_price = prices.select(service_type, zone);

        let winner = Self::winning_promotion(promotions, now);

        let (unit_price, promotion) = match winner {
            Some(promo) => match Self::promoted_price(promo, regular_price, service_type, zone) {
                Some(price) => (
                    price,
                    Some(AppliedPromotion {
                        promotion_id: promo.id,
                        name: promo.name.clone(),
                        kind: promo.kind,
                    }),
                ),
                // Misconfigured promotion rows price as if absent
                None => (regular_price, None),
            },
            None => (regular_price, None),
        };

        Ok(PriceQuote {
            unit_price,
            regular_price,
            promotion,
        })
    }

    fn base_price_set(item: &PricedItem) -> Result<ZonePriceSet, CatalogError> {
        match item {
            PricedItem::Product(p) => {
                if p.has_variants {
                    return Err(CatalogError::VariantRequired(p.id));
                }
                p.price_set().ok_or(CatalogError::PriceMissing(p.id))
            }
            PricedItem::Variant { variant, .. } => Ok(variant.price_set()),
            PricedItem::Combo(c) => Ok(c.price_set()),
        }
    }

    /// Only one promotion applies at a time; lowest `sort_order` wins and the
    /// ordering is stable under ties by id
    fn winning_promotion(promotions: &[Promotion], now: DateTime<Utc>) -> Option<&Promotion> {
        promotions
            .iter()
            .filter(|p| p.is_valid_at(now))
            .min_by_key(|p| (p.sort_order, p.id))
    }

    fn promoted_price(
        promo: &Promotion,
        regular_price: Decimal,
        service_type: ServiceType,
        zone: Zone,
    ) -> Option<Decimal> {
        match promo.kind {
            PromotionKind::Percentage => {
                let percent = promo.discount_percent?;
                let factor = (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED;
                Some((regular_price * factor).round_dp(2).max(Decimal::ZERO))
            }
            PromotionKind::Fixed => promo
                .special_price_set()
                .map(|set| set.select(service_type, zone)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Combo, Product, ProductVariant};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn product(id: i32) -> Product {
        Product {
            id,
            name: "Pollo entero".to_string(),
            description: "Con tortillas".to_string(),
            has_variants: false,
            price_pickup_capital: Some(dec!(50.00)),
            price_delivery_capital: Some(dec!(55.00)),
            price_pickup_interior: Some(dec!(45.00)),
            price_delivery_interior: Some(dec!(60.00)),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn percentage_promo(id: i32, percent: Decimal, sort_order: i32) -> Promotion {
        Promotion {
            id,
            name: format!("Promo {}", id),
            product_id: Some(1),
            variant_id: None,
            combo_id: None,
            kind: PromotionKind::Percentage,
            discount_percent: Some(percent),
            special_pickup_capital: None,
            special_delivery_capital: None,
            special_pickup_interior: None,
            special_delivery_interior: None,
            weekdays: (0..7).collect(),
            starts_at: None,
            ends_at: None,
            valid_from: None,
            valid_until: None,
            sort_order,
            is_active: true,
        }
    }

    fn fixed_promo(id: i32, sort_order: i32) -> Promotion {
        Promotion {
            kind: PromotionKind::Fixed,
            discount_percent: None,
            special_pickup_capital: Some(dec!(40.00)),
            special_delivery_capital: Some(dec!(42.00)),
            special_pickup_interior: Some(dec!(38.00)),
            special_delivery_interior: Some(dec!(44.00)),
            ..percentage_promo(id, dec!(0), sort_order)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_base_price_column_selection() {
        let item = PricedItem::Product(product(1));
        let quote =
            PriceResolver::quote(&item, &[], ServiceType::Delivery, Zone::Interior, now()).unwrap();
        assert_eq!(quote.unit_price, dec!(60.00));
        assert_eq!(quote.regular_price, dec!(60.00));
        assert!(quote.promotion.is_none());
    }

    #[test]
    fn test_percentage_promotion_multiplies_resolved_base() {
        let item = PricedItem::Product(product(1));
        let promos = vec![percentage_promo(1, dec!(10), 0)];
        let quote =
            PriceResolver::quote(&item, &promos, ServiceType::Pickup, Zone::Capital, now()).unwrap();
        assert_eq!(quote.unit_price, dec!(45.00));
        assert_eq!(quote.regular_price, dec!(50.00));
        assert_eq!(quote.discount_per_unit(), dec!(5.00));
        assert_eq!(quote.promotion.as_ref().unwrap().promotion_id, 1);
    }

    #[test]
    fn test_fixed_promotion_substitutes_its_own_price_set() {
        let item = PricedItem::Product(product(1));
        let promos = vec![fixed_promo(2, 0)];
        let quote =
            PriceResolver::quote(&item, &promos, ServiceType::Delivery, Zone::Interior, now())
                .unwrap();
        // Substituted set goes through the same 2x2 selection
        assert_eq!(quote.unit_price, dec!(44.00));
        assert_eq!(quote.regular_price, dec!(60.00));
    }

    #[test]
    fn test_lowest_sort_order_wins() {
        let item = PricedItem::Product(product(1));
        let promos = vec![percentage_promo(1, dec!(10), 5), percentage_promo(2, dec!(50), 1)];
        let quote =
            PriceResolver::quote(&item, &promos, ServiceType::Pickup, Zone::Capital, now()).unwrap();
        assert_eq!(quote.promotion.as_ref().unwrap().promotion_id, 2);
        assert_eq!(quote.unit_price, dec!(25.00));
    }

    #[test]
    fn test_sort_order_tie_broken_by_id() {
        let item = PricedItem::Product(product(1));
        let promos = vec![percentage_promo(7, dec!(10), 3), percentage_promo(4, dec!(20), 3)];
        let quote =
            PriceResolver::quote(&item, &promos, ServiceType::Pickup, Zone::Capital, now()).unwrap();
        assert_eq!(quote.promotion.as_ref().unwrap().promotion_id, 4);
    }

    #[test]
    fn test_expired_promotion_is_ignored() {
        let item = PricedItem::Product(product(1));
        let mut promo = percentage_promo(1, dec!(10), 0);
        promo.valid_until = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        let quote =
            PriceResolver::quote(&item, &[promo], ServiceType::Pickup, Zone::Capital, now())
                .unwrap();
        assert_eq!(quote.unit_price, dec!(50.00));
        assert!(quote.promotion.is_none());
    }

    #[test]
    fn test_product_with_variants_requires_variant() {
        let mut p = product(1);
        p.has_variants = true;
        let item = PricedItem::Product(p);
        let result = PriceResolver::quote(&item, &[], ServiceType::Pickup, Zone::Capital, now());
        assert!(matches!(result, Err(CatalogError::VariantRequired(1))));
    }

    #[test]
    fn test_variant_prices_independently() {
        let mut p = product(1);
        p.has_variants = true;
        p.price_pickup_capital = None;
        p.price_delivery_capital = None;
        p.price_pickup_interior = None;
        p.price_delivery_interior = None;
        let variant = ProductVariant {
            id: 9,
            product_id: 1,
            name: "Grande".to_string(),
            price_pickup_capital: dec!(65.00),
            price_delivery_capital: dec!(70.00),
            price_pickup_interior: dec!(62.00),
            price_delivery_interior: dec!(75.00),
            is_active: true,
        };
        let item = PricedItem::Variant { product: p, variant };
        let quote =
            PriceResolver::quote(&item, &[], ServiceType::Delivery, Zone::Capital, now()).unwrap();
        assert_eq!(quote.unit_price, dec!(70.00));
    }

    #[test]
    fn test_combo_prices_like_a_product() {
        let combo = Combo {
            id: 3,
            name: "Combo familiar".to_string(),
            description: String::new(),
            price_pickup_capital: dec!(120.00),
            price_delivery_capital: dec!(130.00),
            price_pickup_interior: dec!(110.00),
            price_delivery_interior: dec!(140.00),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let item = PricedItem::Combo(combo);
        let quote =
            PriceResolver::quote(&item, &[], ServiceType::Pickup, Zone::Interior, now()).unwrap();
        assert_eq!(quote.unit_price, dec!(110.00));
    }

    #[test]
    fn test_fixed_promotion_without_price_set_falls_back_to_base() {
        let item = PricedItem::Product(product(1));
        let mut promo = fixed_promo(2, 0);
        promo.special_delivery_interior = None;
        let quote =
            PriceResolver::quote(&item, &[promo], ServiceType::Delivery, Zone::Interior, now())
                .unwrap();
        assert_eq!(quote.unit_price, dec!(60.00));
        assert!(quote.promotion.is_none());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::catalog::Product;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn cents(c: u32) -> Decimal {
        Decimal::from(c) / Decimal::from(100)
    }

    fn item_with_prices(a: u32, b: u32, c: u32, d: u32) -> PricedItem {
        PricedItem::Product(Product {
            id: 1,
            name: "x".to_string(),
            description: String::new(),
            has_variants: false,
            price_pickup_capital: Some(cents(a)),
            price_delivery_capital: Some(cents(b)),
            price_pickup_interior: Some(cents(c)),
            price_delivery_interior: Some(cents(d)),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn service_type_strategy() -> impl Strategy<Value = ServiceType> {
        prop_oneof![Just(ServiceType::Pickup), Just(ServiceType::Delivery)]
    }

    fn zone_strategy() -> impl Strategy<Value = Zone> {
        prop_oneof![Just(Zone::Capital), Just(Zone::Interior)]
    }

    /// Resolved price is always one of the four stored columns when no
    /// promotion applies, never an interpolation
    #[test]
    fn prop_base_price_is_one_of_the_four_columns() {
        proptest!(|(
            a in 1u32..100000, b in 1u32..100000,
            c in 1u32..100000, d in 1u32..100000,
            st in service_type_strategy(),
            zone in zone_strategy(),
        )| {
            let item = item_with_prices(a, b, c, d);
            let now = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
            let quote = PriceResolver::quote(&item, &[], st, zone, now).unwrap();
            let columns = [cents(a), cents(b), cents(c), cents(d)];
            prop_assert!(columns.contains(&quote.unit_price));
        });
    }

    /// A percentage promotion never produces a negative price and never
    /// exceeds the regular price
    #[test]
    fn prop_percentage_discount_bounded() {
        proptest!(|(
            base in 1u32..100000,
            percent in 0u32..=100,
            st in service_type_strategy(),
            zone in zone_strategy(),
        )| {
            let item = item_with_prices(base, base, base, base);
            let promo = Promotion {
                id: 1,
                name: "p".to_string(),
                product_id: Some(1),
                variant_id: None,
                combo_id: None,
                kind: PromotionKind::Percentage,
                discount_percent: Some(Decimal::from(percent)),
                special_pickup_capital: None,
                special_delivery_capital: None,
                special_pickup_interior: None,
                special_delivery_interior: None,
                weekdays: (0..7).collect(),
                starts_at: None,
                ends_at: None,
                valid_from: None,
                valid_until: None,
                sort_order: 0,
                is_active: true,
            };
            let now = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
            let quote = PriceResolver::quote(&item, &[promo], st, zone, now).unwrap();
            prop_assert!(quote.unit_price >= Decimal::ZERO);
            prop_assert!(quote.unit_price <= quote.regular_price);
        });
    }

    /// Quoting is deterministic: same inputs, same output
    #[test]
    fn prop_quote_is_deterministic() {
        proptest!(|(
            a in 1u32..100000, b in 1u32..100000,
            c in 1u32..100000, d in 1u32..100000,
            st in service_type_strategy(),
            zone in zone_strategy(),
        )| {
            let item = item_with_prices(a, b, c, d);
            let now = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
            let q1 = PriceResolver::quote(&item, &[], st, zone, now).unwrap();
            let q2 = PriceResolver::quote(&item, &[], st, zone, now).unwrap();
            prop_assert_eq!(q1.unit_price, q2.unit_price);
            prop_assert_eq!(q1.regular_price, q2.regular_price);
        });
    }
}
