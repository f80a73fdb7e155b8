// Business configuration store
//
// Loads loyalty ratios, per-zone delivery fees, tier thresholds and ordering
// policy from the database. Implements a time-based cache with a 60-second
// TTL to balance performance and freshness; process config stays in
// environment variables, business config lives here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::catalog::Zone;

/// Time-to-live for cached configuration
const CACHE_TTL: Duration = Duration::from_secs(60);

/// What happens when an identical `(product, variant, options)` tuple is
/// added to a cart twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DuplicateItemPolicy {
    /// Increment the existing line's quantity
    Merge,
    /// Append a second line
    Separate,
}

/// Loyalty program configuration
#[derive(Debug, Clone, FromRow)]
pub struct LoyaltySettings {
    /// Order total needed per point at the base tier
    pub quetzales_per_point: Decimal,
    /// Fractional remainder at or above this rounds the earned points up
    pub rounding_threshold: Decimal,
    /// Redemptions must be multiples of this
    pub redemption_step: i32,
}

/// Ordering policy configuration
#[derive(Debug, Clone, FromRow)]
pub struct OrderingSettings {
    pub duplicate_item_policy: DuplicateItemPolicy,
    pub pickup_lead_minutes: i32,
    pub nearest_pickup_limit: i32,
    pub tax_rate: Decimal,
}

/// Loyalty tier definition loaded from the database
#[derive(Debug, Clone, FromRow)]
pub struct TierDefinition {
    pub id: i32,
    pub name: String,
    pub min_points: i32,
    pub earn_multiplier: Decimal,
}

#[derive(Debug, Clone, Default)]
struct SettingsCache {
    loyalty: Option<LoyaltySettings>,
    ordering: Option<OrderingSettings>,
    delivery_fees: Option<HashMap<Zone, Decimal>>,
    tiers: Option<Vec<TierDefinition>>,
    last_updated: HashMap<&'static str, Instant>,
}

impl SettingsCache {
    fn is_stale(&self, key: &'static str, ttl: Duration) -> bool {
        match self.last_updated.get(key) {
            Some(last_update) => last_update.elapsed() > ttl,
            None => true,
        }
    }

    fn mark_updated(&mut self, key: &'static str) {
        self.last_updated.insert(key, Instant::now());
    }
}

/// TTL-cached access to business configuration tables
pub struct SettingsStore {
    pool: PgPool,
    cache: Arc<RwLock<SettingsCache>>,
    cache_ttl: Duration,
}

impl SettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            cache: Arc::new(RwLock::new(SettingsCache::default())),
            cache_ttl: CACHE_TTL,
        }
    }

    pub async fn loyalty(&self) -> Result<LoyaltySettings, sqlx::Error> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("loyalty", self.cache_ttl) {
                if let Some(settings) = &cache.loyalty {
                    return Ok(settings.clone());
                }
            }
        }

        let settings = sqlx::query_as::<_, LoyaltySettings>(
            "SELECT quetzales_per_point, rounding_threshold, redemption_step \
             FROM loyalty_settings ORDER BY id LIMIT 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let mut cache = self.cache.write().await;
        cache.loyalty = Some(settings.clone());
        cache.mark_updated("loyalty");
        Ok(settings)
    }

    pub async fn ordering(&self) -> Result<OrderingSettings, sqlx::Error> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("ordering", self.cache_ttl) {
                if let Some(settings) = &cache.ordering {
                    return Ok(settings.clone());
                }
            }
        }

        let settings = sqlx::query_as::<_, OrderingSettings>(
            "SELECT duplicate_item_policy, pickup_lead_minutes, nearest_pickup_limit, tax_rate \
             FROM ordering_settings ORDER BY id LIMIT 1",
        )
        .fetch_one(&self.pool)
        .await?;

        let mut cache = self.cache.write().await;
        cache.ordering = Some(settings.clone());
        cache.mark_updated("ordering");
        Ok(settings)
    }

    /// Flat delivery fee for a zone; the fee schedule is configuration, not a
    /// distance computation
    pub async fn delivery_fee(&self, zone: Zone) -> Result<Decimal, sqlx::Error> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("delivery_fees", self.cache_ttl) {
                if let Some(fees) = &cache.delivery_fees {
                    if let Some(fee) = fees.get(&zone) {
                        return Ok(*fee);
                    }
                }
            }
        }

        let rows: Vec<(Zone, Decimal)> =
            sqlx::query_as("SELECT zone, fee FROM zone_delivery_fees")
                .fetch_all(&self.pool)
                .await?;

        let fees: HashMap<Zone, Decimal> = rows.into_iter().collect();
        let fee = fees.get(&zone).copied().ok_or(sqlx::Error::RowNotFound)?;

        let mut cache = self.cache.write().await;
        cache.delivery_fees = Some(fees);
        cache.mark_updated("delivery_fees");
        Ok(fee)
    }

    /// Tier definitions ordered ascending by threshold
    pub async fn tiers(&self) -> Result<Vec<TierDefinition>, sqlx::Error> {
        {
            let cache = self.cache.read().await;
            if !cache.is_stale("tiers", self.cache_ttl) {
                if let Some(tiers) = &cache.tiers {
                    return Ok(tiers.clone());
                }
            }
        }

        let tiers = sqlx::query_as::<_, TierDefinition>(
            "SELECT id, name, min_points, earn_multiplier FROM customer_tiers ORDER BY min_points",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut cache = self.cache.write().await;
        cache.tiers = Some(tiers.clone());
        cache.mark_updated("tiers");
        Ok(tiers)
    }
}
