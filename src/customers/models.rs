use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A loyalty-program customer
///
/// `points` is a denormalized running balance; it must always equal the
/// signed sum of the customer's ledger rows.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Customer {
    pub id: i32,
    pub email: String,
    pub full_name: String,
    pub nit: Option<String>,
    pub points: i32,
    pub tier_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Address book entry with the coordinate the geofence resolver consumes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CustomerAddress {
    pub id: i32,
    pub customer_id: i32,
    pub label: String,
    pub address_line: String,
    pub reference: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
}

/// Frozen copy of an address written into an order at conversion time
///
/// Deliberately not a foreign key; the address book entry may later change
/// or be deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AddressSnapshot {
    pub label: String,
    pub address_line: String,
    pub reference: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&CustomerAddress> for AddressSnapshot {
    fn from(address: &CustomerAddress) -> Self {
        Self {
            label: address.label.clone(),
            address_line: address.address_line.clone(),
            reference: address.reference.clone(),
            latitude: address.latitude,
            longitude: address.longitude,
        }
    }
}
