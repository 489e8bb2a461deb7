//! Database repositories for customers and bookings.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use clinic_booking_conversation::{
    Booking, BookingRepository as BookingStore, Customer, CustomerRepository as CustomerStore,
    StoreError,
};
use clinic_booking_core::CustomerId;
use sqlx::{FromRow, PgPool};
use std::str::FromStr;

use super::store_error;

/// Row type for customer queries.
#[derive(FromRow)]
struct CustomerRow {
    id: String,
    phone: String,
    name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CustomerRow {
    fn try_into_customer(self) -> Result<Customer, StoreError> {
        let id = CustomerId::from_str(&self.id).map_err(|e| StoreError::Corrupt {
            entity: "customer",
            reason: format!("invalid customer id '{}': {}", self.id, e),
        })?;

        Ok(Customer {
            id,
            phone: self.phone,
            name: self.name,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for customer operations.
pub struct CustomerRepository {
    pool: PgPool,
}

impl CustomerRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn upsert_by_phone(&self, phone: &str, name: &str) -> Result<Customer, StoreError> {
        let candidate = Customer::new(phone, name);

        let row: CustomerRow = sqlx::query_as(
            r#"
            INSERT INTO customers (id, phone, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $4)
            ON CONFLICT (phone)
            DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at
            RETURNING id, phone, name, created_at, updated_at
            "#,
        )
        .bind(candidate.id.to_string())
        .bind(&candidate.phone)
        .bind(&candidate.name)
        .bind(candidate.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(store_error)?;

        row.try_into_customer()
    }
}

/// Repository for booking operations.
pub struct BookingRepository {
    pool: PgPool,
}

impl BookingRepository {
    /// Creates a new repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingStore for BookingRepository {
    async fn insert(&self, booking: &Booking) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO bookings
                (id, clinic_id, customer_id, service, booking_date, booking_time, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(booking.id.to_string())
        .bind(booking.clinic_id.to_string())
        .bind(booking.customer_id.map(|id| id.to_string()))
        .bind(&booking.service)
        .bind(&booking.date)
        .bind(&booking.time)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(())
    }
}
