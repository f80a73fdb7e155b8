use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Pricing zone attached to a restaurant
///
/// The zone is a business attribute of the restaurant, never derived from
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Capital,
    Interior,
}

impl Zone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Capital => "capital",
            Zone::Interior => "interior",
        }
    }
}

impl Default for Zone {
    fn default() -> Self {
        Zone::Capital
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The other axis of the 2x2 price matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Pickup,
    Delivery,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Pickup => "pickup",
            ServiceType::Delivery => "delivery",
        }
    }
}

impl std::fmt::Display for ServiceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four stored price columns of a priced item
///
/// Column selection is a strict 2x2 lookup; there is no interpolation between
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ZonePriceSet {
    pub pickup_capital: Decimal,
    pub delivery_capital: Decimal,
    pub pickup_interior: Decimal,
    pub delivery_interior: Decimal,
}

impl ZonePriceSet {
    /// Resolve the single applicable column for `{service_type, zone}`
    pub fn select(&self, service_type: ServiceType, zone: Zone) -> Decimal {
        match (service_type, zone) {
            (ServiceType::Pickup, Zone::Capital) => self.pickup_capital,
            (ServiceType::Delivery, Zone::Capital) => self.delivery_capital,
            (ServiceType::Pickup, Zone::Interior) => self.pickup_interior,
            (ServiceType::Delivery, Zone::Interior) => self.delivery_interior,
        }
    }

    fn from_columns(
        pickup_capital: Option<Decimal>,
        delivery_capital: Option<Decimal>,
        pickup_interior: Option<Decimal>,
        delivery_interior: Option<Decimal>,
    ) -> Option<Self> {
        Some(Self {
            pickup_capital: pickup_capital?,
            delivery_capital: delivery_capital?,
            pickup_interior: pickup_interior?,
            delivery_interior: delivery_interior?,
        })
    }
}

/// Catalog product
///
/// A product with `has_variants = true` never carries a resolvable price of
/// its own; its variants do.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub has_variants: bool,
    pub price_pickup_capital: Option<Decimal>,
    pub price_delivery_capital: Option<Decimal>,
    pub price_pickup_interior: Option<Decimal>,
    pub price_delivery_interior: Option<Decimal>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn price_set(&self) -> Option<ZonePriceSet> {
        ZonePriceSet::from_columns(
            self.price_pickup_capital,
            self.price_delivery_capital,
            self.price_pickup_interior,
            self.price_delivery_interior,
        )
    }
}

/// Variant of a product (size, flavor), each with its own 4-zone price set
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductVariant {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub price_pickup_capital: Decimal,
    pub price_delivery_capital: Decimal,
    pub price_pickup_interior: Decimal,
    pub price_delivery_interior: Decimal,
    pub is_active: bool,
}

impl ProductVariant {
    pub fn price_set(&self) -> ZonePriceSet {
        ZonePriceSet {
            pickup_capital: self.price_pickup_capital,
            delivery_capital: self.price_delivery_capital,
            pickup_interior: self.price_pickup_interior,
            delivery_interior: self.price_delivery_interior,
        }
    }
}

/// Combo meal, priced like a product but never with variants
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Combo {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price_pickup_capital: Decimal,
    pub price_delivery_capital: Decimal,
    pub price_pickup_interior: Decimal,
    pub price_delivery_interior: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Combo {
    pub fn price_set(&self) -> ZonePriceSet {
        ZonePriceSet {
            pickup_capital: self.price_pickup_capital,
            delivery_capital: self.price_delivery_capital,
            pickup_interior: self.price_pickup_interior,
            delivery_interior: self.price_delivery_interior,
        }
    }
}

/// How a promotion alters the resolved base price
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromotionKind {
    /// `discount_percent` multiplies the resolved base price
    Percentage,
    /// A promotion-specific 4-zone price set substitutes the base set
    Fixed,
}

/// Time-limited promotion attached to exactly one priced item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Promotion {
    pub id: i32,
    pub name: String,
    pub product_id: Option<i32>,
    pub variant_id: Option<i32>,
    pub combo_id: Option<i32>,
    pub kind: PromotionKind,
    pub discount_percent: Option<Decimal>,
    pub special_pickup_capital: Option<Decimal>,
    pub special_delivery_capital: Option<Decimal>,
    pub special_pickup_interior: Option<Decimal>,
    pub special_delivery_interior: Option<Decimal>,
    /// 0 = Monday .. 6 = Sunday
    pub weekdays: Vec<i16>,
    pub starts_at: Option<NaiveTime>,
    pub ends_at: Option<NaiveTime>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub sort_order: i32,
    pub is_active: bool,
}

impl Promotion {
    pub fn special_price_set(&self) -> Option<ZonePriceSet> {
        ZonePriceSet::from_columns(
            self.special_pickup_capital,
            self.special_delivery_capital,
            self.special_pickup_interior,
            self.special_delivery_interior,
        )
    }

    /// Whether the promotion is running at `now`
    ///
    /// All three windows must be satisfied: the date range, the weekday set
    /// and the time-of-day window. An `ends_at` earlier than `starts_at` is an
    /// overnight window (e.g. 22:00 - 02:00).
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if now > until {
                return false;
            }
        }
        let weekday = now.date_naive().weekday().num_days_from_monday() as i16;
        if !self.weekdays.contains(&weekday) {
            return false;
        }
        match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => {
                let time = now.time();
                // Drop sub-second precision so boundary comparisons are exact
                let time = NaiveTime::from_hms_opt(time.hour(), time.minute(), time.second())
                    .unwrap_or(time);
                if start <= end {
                    time >= start && time <= end
                } else {
                    time >= start || time <= end
                }
            }
            _ => true,
        }
    }
}

/// A cart or order line references one of these three catalog shapes
///
/// Resolved once at the boundary; the core never re-dispatches by string tag.
#[derive(Debug, Clone)]
pub enum PricedItem {
    Product(Product),
    Variant { product: Product, variant: ProductVariant },
    Combo(Combo),
}

impl PricedItem {
    pub fn is_active(&self) -> bool {
        match self {
            PricedItem::Product(p) => p.is_active,
            PricedItem::Variant { product, variant } => product.is_active && variant.is_active,
            PricedItem::Combo(c) => c.is_active,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            PricedItem::Product(p) => p.name.clone(),
            PricedItem::Variant { product, variant } => {
                format!("{} ({})", product.name, variant.name)
            }
            PricedItem::Combo(c) => c.name.clone(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PricedItem::Product(p) => &p.description,
            PricedItem::Variant { product, .. } => &product.description,
            PricedItem::Combo(c) => &c.description,
        }
    }

    pub fn product_id(&self) -> Option<i32> {
        match self {
            PricedItem::Product(p) => Some(p.id),
            PricedItem::Variant { product, .. } => Some(product.id),
            PricedItem::Combo(_) => None,
        }
    }

    pub fn variant_id(&self) -> Option<i32> {
        match self {
            PricedItem::Variant { variant, .. } => Some(variant.id),
            _ => None,
        }
    }

    pub fn combo_id(&self) -> Option<i32> {
        match self {
            PricedItem::Combo(c) => Some(c.id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn price_set() -> ZonePriceSet {
        ZonePriceSet {
            pickup_capital: dec!(50.00),
            delivery_capital: dec!(55.00),
            pickup_interior: dec!(45.00),
            delivery_interior: dec!(60.00),
        }
    }

    #[test]
    fn test_select_all_four_columns() {
        let prices = price_set();
        assert_eq!(prices.select(ServiceType::Pickup, Zone::Capital), dec!(50.00));
        assert_eq!(prices.select(ServiceType::Delivery, Zone::Capital), dec!(55.00));
        assert_eq!(prices.select(ServiceType::Pickup, Zone::Interior), dec!(45.00));
        assert_eq!(prices.select(ServiceType::Delivery, Zone::Interior), dec!(60.00));
    }

    #[test]
    fn test_product_price_set_requires_all_columns() {
        let product = Product {
            id: 1,
            name: "Pollo asado".to_string(),
            description: String::new(),
            has_variants: false,
            price_pickup_capital: Some(dec!(50.00)),
            price_delivery_capital: Some(dec!(55.00)),
            price_pickup_interior: None,
            price_delivery_interior: Some(dec!(60.00)),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(product.price_set().is_none());
    }

    fn promo(starts: Option<&str>, ends: Option<&str>, weekdays: Vec<i16>) -> Promotion {
        Promotion {
            id: 1,
            name: "Martes de combo".to_string(),
            product_id: Some(1),
            variant_id: None,
            combo_id: None,
            kind: PromotionKind::Percentage,
            discount_percent: Some(dec!(10)),
            special_pickup_capital: None,
            special_delivery_capital: None,
            special_pickup_interior: None,
            special_delivery_interior: None,
            weekdays,
            starts_at: starts.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            ends_at: ends.map(|s| NaiveTime::parse_from_str(s, "%H:%M").unwrap()),
            valid_from: None,
            valid_until: None,
            sort_order: 0,
            is_active: true,
        }
    }

    #[test]
    fn test_promotion_weekday_window() {
        // 2024-06-04 is a Tuesday (weekday index 1)
        let tuesday = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
        let wednesday = Utc.with_ymd_and_hms(2024, 6, 5, 12, 0, 0).unwrap();

        let p = promo(None, None, vec![1]);
        assert!(p.is_valid_at(tuesday));
        assert!(!p.is_valid_at(wednesday));
    }

    #[test]
    fn test_promotion_time_window() {
        let p = promo(Some("11:00"), Some("14:00"), (0..7).collect());
        let inside = Utc.with_ymd_and_hms(2024, 6, 4, 12, 30, 0).unwrap();
        let outside = Utc.with_ymd_and_hms(2024, 6, 4, 15, 0, 0).unwrap();
        assert!(p.is_valid_at(inside));
        assert!(!p.is_valid_at(outside));
    }

    #[test]
    fn test_promotion_overnight_time_window() {
        let p = promo(Some("22:00"), Some("02:00"), (0..7).collect());
        let late = Utc.with_ymd_and_hms(2024, 6, 4, 23, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2024, 6, 5, 1, 0, 0).unwrap();
        let midday = Utc.with_ymd_and_hms(2024, 6, 4, 12, 0, 0).unwrap();
        assert!(p.is_valid_at(late));
        assert!(p.is_valid_at(early));
        assert!(!p.is_valid_at(midday));
    }

    #[test]
    fn test_promotion_date_range() {
        let mut p = promo(None, None, (0..7).collect());
        p.valid_from = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        p.valid_until = Some(Utc.with_ymd_and_hms(2024, 6, 30, 23, 59, 59).unwrap());
        assert!(p.is_valid_at(Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()));
        assert!(!p.is_valid_at(Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()));
        assert!(!p.is_valid_at(Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap()));
    }

    #[test]
    fn test_inactive_promotion_never_valid() {
        let mut p = promo(None, None, (0..7).collect());
        p.is_active = false;
        assert!(!p.is_valid_at(Utc::now()));
    }
}
