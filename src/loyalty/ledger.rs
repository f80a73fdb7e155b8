// Points ledger
//
// Every balance change appends one signed ledger row and adjusts the
// customer's denormalized balance in the same transaction, then recomputes
// the tier from the new balance.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

use crate::customers::{Customer, CustomersRepository};
use crate::loyalty::{LoyaltyError, PointsTransactionType, PointsTransactionsRepository};
use crate::settings::{LoyaltySettings, SettingsStore, TierDefinition};

/// Points earned for an order total
///
/// `total / quetzales_per_point * multiplier`, rounded down unless the
/// fractional remainder reaches the configured threshold.
pub fn points_for_total(total: Decimal, settings: &LoyaltySettings, multiplier: Decimal) -> i32 {
    if settings.quetzales_per_point <= Decimal::ZERO || total <= Decimal::ZERO {
        return 0;
    }

    let raw = total / settings.quetzales_per_point * multiplier;
    let floor = raw.floor();
    let points = if raw - floor >= settings.rounding_threshold {
        floor + Decimal::ONE
    } else {
        floor
    };

    points.to_i32().unwrap_or(0).max(0)
}

/// Tier for a balance: highest threshold at or below the balance wins
///
/// `tiers` must be sorted ascending by `min_points`, as the settings store
/// returns them. Idempotent and side-effect free.
pub fn tier_for_balance(balance: i32, tiers: &[TierDefinition]) -> Option<&TierDefinition> {
    tiers.iter().rev().find(|tier| tier.min_points <= balance)
}

/// Outcome of a ledger mutation
#[derive(Debug, Clone)]
pub struct LedgerEntryResult {
    pub new_balance: i32,
    pub tier_id: Option<i32>,
}

/// Customer point balance mutation with transaction history
#[derive(Clone)]
pub struct PointsLedger {
    pool: PgPool,
    customers_repo: CustomersRepository,
    transactions_repo: PointsTransactionsRepository,
    settings: Arc<SettingsStore>,
}

impl PointsLedger {
    pub fn new(
        pool: PgPool,
        customers_repo: CustomersRepository,
        transactions_repo: PointsTransactionsRepository,
        settings: Arc<SettingsStore>,
    ) -> Self {
        Self {
            pool,
            customers_repo,
            transactions_repo,
            settings,
        }
    }

    /// Credit earned points inside the caller's transaction
    ///
    /// `customer` must have been read with a locking query in the same
    /// transaction.
    pub async fn earn_in(
        &self,
        conn: &mut PgConnection,
        customer: &Customer,
        points: i32,
        order_id: Option<Uuid>,
    ) -> Result<LedgerEntryResult, LoyaltyError> {
        if points <= 0 {
            return Err(LoyaltyError::NonPositivePoints);
        }

        self.transactions_repo
            .append(
                conn,
                customer.id,
                points,
                PointsTransactionType::Earned,
                order_id,
                None,
            )
            .await?;

        self.apply_balance(conn, customer, customer.points + points)
            .await
    }

    /// Debit redeemed points inside the caller's transaction
    ///
    /// Fails wholesale when the debit would drive the balance negative; no
    /// partial redemption.
    pub async fn redeem_in(
        &self,
        conn: &mut PgConnection,
        customer: &Customer,
        points: i32,
        order_id: Option<Uuid>,
    ) -> Result<LedgerEntryResult, LoyaltyError> {
        if points <= 0 {
            return Err(LoyaltyError::NonPositivePoints);
        }
        if points > customer.points {
            return Err(LoyaltyError::InsufficientPoints {
                requested: points,
                balance: customer.points,
            });
        }

        self.transactions_repo
            .append(
                conn,
                customer.id,
                -points,
                PointsTransactionType::Redeemed,
                order_id,
                None,
            )
            .await?;

        self.apply_balance(conn, customer, customer.points - points)
            .await
    }

    /// Staff adjustment with its own transaction
    pub async fn adjust(
        &self,
        customer_id: i32,
        delta: i32,
        notes: &str,
    ) -> Result<LedgerEntryResult, LoyaltyError> {
        let mut tx = self.pool.begin().await?;

        let customer = self
            .customers_repo
            .lock(&mut *tx, customer_id)
            .await?
            .ok_or(LoyaltyError::CustomerNotFound(customer_id))?;

        let new_balance = customer.points + delta;
        if new_balance < 0 {
            return Err(LoyaltyError::InsufficientPoints {
                requested: -delta,
                balance: customer.points,
            });
        }

        self.transactions_repo
            .append(
                &mut *tx,
                customer.id,
                delta,
                PointsTransactionType::Adjusted,
                None,
                Some(notes),
            )
            .await?;

        let result = self.apply_balance(&mut *tx, &customer, new_balance).await?;
        tx.commit().await?;

        tracing::info!(
            "Adjusted customer {} points by {} to {}",
            customer_id,
            delta,
            result.new_balance
        );
        Ok(result)
    }

    /// Write the new balance and the tier it maps to
    async fn apply_balance(
        &self,
        conn: &mut PgConnection,
        customer: &Customer,
        new_balance: i32,
    ) -> Result<LedgerEntryResult, LoyaltyError> {
        let tiers = self.settings.tiers().await?;
        let tier_id = tier_for_balance(new_balance, &tiers).map(|t| t.id);

        self.customers_repo
            .update_points_and_tier(conn, customer.id, new_balance, tier_id)
            .await?;

        Ok(LedgerEntryResult {
            new_balance,
            tier_id,
        })
    }

    /// Earning multiplier for a customer's current tier
    pub async fn multiplier_for(&self, customer: &Customer) -> Result<Decimal, LoyaltyError> {
        let tiers = self.settings.tiers().await?;
        Ok(tier_for_balance(customer.points, &tiers)
            .map(|t| t.earn_multiplier)
            .unwrap_or(Decimal::ONE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn settings(per_point: Decimal, threshold: Decimal) -> LoyaltySettings {
        LoyaltySettings {
            quetzales_per_point: per_point,
            rounding_threshold: threshold,
            redemption_step: 25,
        }
    }

    fn tiers() -> Vec<TierDefinition> {
        vec![
            TierDefinition { id: 1, name: "bronze".into(), min_points: 0, earn_multiplier: dec!(1.0) },
            TierDefinition { id: 2, name: "silver".into(), min_points: 500, earn_multiplier: dec!(1.25) },
            TierDefinition { id: 3, name: "gold".into(), min_points: 2000, earn_multiplier: dec!(1.5) },
        ]
    }

    #[test]
    fn test_points_basic_ratio() {
        // 100.00 at 10 quetzales per point earns 10
        let s = settings(dec!(10.00), dec!(0.5));
        assert_eq!(points_for_total(dec!(100.00), &s, dec!(1.0)), 10);
    }

    #[test]
    fn test_points_round_down_below_threshold() {
        // 104.00 / 10 = 10.4, below the 0.5 threshold
        let s = settings(dec!(10.00), dec!(0.5));
        assert_eq!(points_for_total(dec!(104.00), &s, dec!(1.0)), 10);
    }

    #[test]
    fn test_points_round_up_at_threshold() {
        // 105.00 / 10 = 10.5, at the threshold
        let s = settings(dec!(10.00), dec!(0.5));
        assert_eq!(points_for_total(dec!(105.00), &s, dec!(1.0)), 11);
    }

    #[test]
    fn test_points_round_up_above_threshold() {
        let s = settings(dec!(10.00), dec!(0.5));
        assert_eq!(points_for_total(dec!(109.00), &s, dec!(1.0)), 11);
    }

    #[test]
    fn test_tier_multiplier_scales_points() {
        let s = settings(dec!(10.00), dec!(0.5));
        // 100 / 10 * 1.5 = 15
        assert_eq!(points_for_total(dec!(100.00), &s, dec!(1.5)), 15);
    }

    #[test]
    fn test_zero_and_negative_totals_earn_nothing() {
        let s = settings(dec!(10.00), dec!(0.5));
        assert_eq!(points_for_total(Decimal::ZERO, &s, dec!(1.0)), 0);
        assert_eq!(points_for_total(dec!(-5.00), &s, dec!(1.0)), 0);
    }

    #[test]
    fn test_misconfigured_ratio_earns_nothing() {
        let s = settings(Decimal::ZERO, dec!(0.5));
        assert_eq!(points_for_total(dec!(100.00), &s, dec!(1.0)), 0);
    }

    #[test]
    fn test_tier_for_balance_picks_highest_threshold() {
        let tiers = tiers();
        assert_eq!(tier_for_balance(0, &tiers).unwrap().name, "bronze");
        assert_eq!(tier_for_balance(499, &tiers).unwrap().name, "bronze");
        assert_eq!(tier_for_balance(500, &tiers).unwrap().name, "silver");
        assert_eq!(tier_for_balance(1999, &tiers).unwrap().name, "silver");
        assert_eq!(tier_for_balance(2000, &tiers).unwrap().name, "gold");
        assert_eq!(tier_for_balance(100000, &tiers).unwrap().name, "gold");
    }

    #[test]
    fn test_tier_for_balance_is_idempotent() {
        let tiers = tiers();
        let first = tier_for_balance(750, &tiers).map(|t| t.id);
        let second = tier_for_balance(750, &tiers).map(|t| t.id);
        assert_eq!(first, second);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// Earned points are never negative and scale monotonically with the
    /// total
    #[test]
    fn prop_points_non_negative_and_monotone() {
        proptest!(|(
            total_cents in 0u64..10_000_000,
            extra_cents in 0u64..1_000_000,
        )| {
            let s = LoyaltySettings {
                quetzales_per_point: dec!(10.00),
                rounding_threshold: dec!(0.5),
                redemption_step: 25,
            };
            let total = Decimal::from(total_cents) / Decimal::from(100);
            let larger = Decimal::from(total_cents + extra_cents) / Decimal::from(100);

            let p1 = points_for_total(total, &s, Decimal::ONE);
            let p2 = points_for_total(larger, &s, Decimal::ONE);

            prop_assert!(p1 >= 0);
            prop_assert!(p2 >= p1);
        });
    }

    /// The rounding rule never moves the result more than one point away
    /// from the exact quotient
    #[test]
    fn prop_rounding_stays_within_one_point() {
        proptest!(|(total_cents in 0u64..10_000_000)| {
            let s = LoyaltySettings {
                quetzales_per_point: dec!(10.00),
                rounding_threshold: dec!(0.5),
                redemption_step: 25,
            };
            let total = Decimal::from(total_cents) / Decimal::from(100);
            let exact = total / s.quetzales_per_point;
            let points = Decimal::from(points_for_total(total, &s, Decimal::ONE));

            prop_assert!((points - exact).abs() <= Decimal::ONE);
        });
    }

    /// Tier assignment is total: any non-negative balance maps to a tier
    /// when a zero-threshold tier exists
    #[test]
    fn prop_tier_total_over_non_negative_balances() {
        proptest!(|(balance in 0i32..1_000_000)| {
            let tiers = vec![
                TierDefinition { id: 1, name: "bronze".into(), min_points: 0, earn_multiplier: dec!(1.0) },
                TierDefinition { id: 2, name: "silver".into(), min_points: 500, earn_multiplier: dec!(1.25) },
            ];
            prop_assert!(tier_for_balance(balance, &tiers).is_some());
        });
    }
}
