//! PostgreSQL stores (schema in `migrations/`)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AccountStore, BookingStore, ConversationStore, StoreResult, WorkshopStore};
use crate::booking::{
    Booking, BookingFilter, BookingStatus, Location, PaymentStatus, Review, ServiceCategory,
    ServiceType, Vehicle,
};
use crate::chat::{Conversation, Message};
use crate::models::Account;
use crate::workshop::Workshop;

pub struct PgAccountStore {
    db_pool: PgPool,
}

impl PgAccountStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AccountStore for PgAccountStore {
    async fn insert(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, name, email, phone, role, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(account.role)
        .bind(&account.password_hash)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(account)
    }

    async fn update(&self, account: &Account) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE accounts
            SET name = $2, email = $3, phone = $4, password_hash = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.updated_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }
}

/// Flat row shape of the `bookings` table
#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    customer_id: Uuid,
    montir_id: Option<Uuid>,
    service_category: ServiceCategory,
    service_type: ServiceType,
    vehicle_make: Option<String>,
    vehicle_model: Option<String>,
    vehicle_plate: Option<String>,
    latitude: f64,
    longitude: f64,
    address: Option<String>,
    description: Option<String>,
    scheduled_at: DateTime<Utc>,
    status: BookingStatus,
    price: i64,
    payment_status: PaymentStatus,
    payment_reference: Option<String>,
    cancel_reason: Option<String>,
    review_rating: Option<i16>,
    review_comment: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: Option<DateTime<Utc>>,
    version: i64,
}

impl From<BookingRow> for Booking {
    fn from(row: BookingRow) -> Self {
        let review = match (row.review_rating, row.reviewed_at) {
            (Some(rating), Some(created_at)) => Some(Review {
                rating: rating.clamp(0, 5) as u8,
                comment: row.review_comment,
                created_at,
            }),
            _ => None,
        };
        Booking {
            id: row.id,
            customer_id: row.customer_id,
            montir_id: row.montir_id,
            service_category: row.service_category,
            service_type: row.service_type,
            vehicle: Vehicle {
                make: row.vehicle_make,
                model: row.vehicle_model,
                plate: row.vehicle_plate,
            },
            location: Location {
                latitude: row.latitude,
                longitude: row.longitude,
                address: row.address,
            },
            description: row.description,
            scheduled_at: row.scheduled_at,
            status: row.status,
            price: row.price,
            payment_status: row.payment_status,
            payment_reference: row.payment_reference,
            cancel_reason: row.cancel_reason,
            review,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: row.version,
        }
    }
}

pub struct PgBookingStore {
    db_pool: PgPool,
}

impl PgBookingStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl BookingStore for PgBookingStore {
    async fn insert(&self, booking: &Booking) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, customer_id, montir_id, service_category, service_type,
                vehicle_make, vehicle_model, vehicle_plate, latitude, longitude, address,
                description, scheduled_at, status, price, payment_status, payment_reference,
                cancel_reason, review_rating, review_comment, reviewed_at,
                created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19, $20, $21, $22, $23, $24)
            "#,
        )
        .bind(booking.id)
        .bind(booking.customer_id)
        .bind(booking.montir_id)
        .bind(booking.service_category)
        .bind(booking.service_type)
        .bind(&booking.vehicle.make)
        .bind(&booking.vehicle.model)
        .bind(&booking.vehicle.plate)
        .bind(booking.location.latitude)
        .bind(booking.location.longitude)
        .bind(&booking.location.address)
        .bind(&booking.description)
        .bind(booking.scheduled_at)
        .bind(booking.status)
        .bind(booking.price)
        .bind(booking.payment_status)
        .bind(&booking.payment_reference)
        .bind(&booking.cancel_reason)
        .bind(booking.review.as_ref().map(|r| r.rating as i16))
        .bind(booking.review.as_ref().and_then(|r| r.comment.clone()))
        .bind(booking.review.as_ref().map(|r| r.created_at))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .bind(booking.version)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(row.map(Booking::from))
    }

    async fn list(&self, filter: &BookingFilter) -> StoreResult<Vec<Booking>> {
        let mut query_builder: sqlx::QueryBuilder<sqlx::Postgres> =
            sqlx::QueryBuilder::new("SELECT * FROM bookings WHERE 1=1");

        if let Some(account) = filter.participant {
            query_builder.push(" AND (customer_id = ");
            query_builder.push_bind(account);
            query_builder.push(" OR montir_id = ");
            query_builder.push_bind(account);
            query_builder.push(")");
        }
        if let Some(status) = filter.status {
            query_builder.push(" AND status = ");
            query_builder.push_bind(status);
        }
        if filter.unassigned {
            query_builder.push(" AND montir_id IS NULL");
        }

        query_builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
        query_builder.push_bind(filter.limit as i64);
        query_builder.push(" OFFSET ");
        query_builder.push_bind(filter.offset as i64);

        let rows = query_builder
            .build_query_as::<BookingRow>()
            .fetch_all(&self.db_pool)
            .await?;

        Ok(rows.into_iter().map(Booking::from).collect())
    }

    async fn compare_and_swap(
        &self,
        booking: &Booking,
        expected_version: i64,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings
            SET montir_id = $3, status = $4, price = $5, payment_status = $6,
                payment_reference = $7, cancel_reason = $8, review_rating = $9,
                review_comment = $10, reviewed_at = $11, updated_at = $12, version = $13
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(booking.id)
        .bind(expected_version)
        .bind(booking.montir_id)
        .bind(booking.status)
        .bind(booking.price)
        .bind(booking.payment_status)
        .bind(&booking.payment_reference)
        .bind(&booking.cancel_reason)
        .bind(booking.review.as_ref().map(|r| r.rating as i16))
        .bind(booking.review.as_ref().and_then(|r| r.comment.clone()))
        .bind(booking.review.as_ref().map(|r| r.created_at))
        .bind(booking.updated_at)
        .bind(booking.version)
        .execute(&self.db_pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

pub struct PgConversationStore {
    db_pool: PgPool,
}

impl PgConversationStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn get_or_create(&self, conversation: Conversation) -> StoreResult<Conversation> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, booking_id, customer_id, montir_id, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (booking_id) DO NOTHING
            "#,
        )
        .bind(conversation.id)
        .bind(conversation.booking_id)
        .bind(conversation.customer_id)
        .bind(conversation.montir_id)
        .bind(conversation.created_at)
        .execute(&self.db_pool)
        .await?;

        let stored = sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE booking_id = $1",
        )
        .bind(conversation.booking_id)
        .fetch_one(&self.db_pool)
        .await?;

        Ok(stored)
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.db_pool)
                .await?;
        Ok(conversation)
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> StoreResult<Option<Conversation>> {
        let conversation =
            sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE booking_id = $1")
                .bind(booking_id)
                .fetch_optional(&self.db_pool)
                .await?;
        Ok(conversation)
    }

    async fn append_message(&self, message: &Message) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, text, media_ref, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.text)
        .bind(&message.media_ref)
        .bind(message.created_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn list_messages(
        &self,
        conversation_id: Uuid,
        limit: Option<u32>,
    ) -> StoreResult<Vec<Message>> {
        // `seq` is a BIGSERIAL, so it preserves insertion order
        let messages = match limit {
            Some(limit) => {
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT id, conversation_id, sender_id, text, media_ref, created_at FROM (
                        SELECT * FROM messages WHERE conversation_id = $1
                        ORDER BY seq DESC LIMIT $2
                    ) newest
                    ORDER BY seq ASC
                    "#,
                )
                .bind(conversation_id)
                .bind(limit as i64)
                .fetch_all(&self.db_pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Message>(
                    r#"
                    SELECT id, conversation_id, sender_id, text, media_ref, created_at
                    FROM messages WHERE conversation_id = $1
                    ORDER BY seq ASC
                    "#,
                )
                .bind(conversation_id)
                .fetch_all(&self.db_pool)
                .await?
            }
        };
        Ok(messages)
    }
}

pub struct PgWorkshopStore {
    db_pool: PgPool,
}

impl PgWorkshopStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl WorkshopStore for PgWorkshopStore {
    async fn insert(&self, workshop: &Workshop) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workshops (
                id, owner_id, name, address, latitude, longitude, phone, services,
                open_hours, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(workshop.id)
        .bind(workshop.owner_id)
        .bind(&workshop.name)
        .bind(&workshop.address)
        .bind(workshop.latitude)
        .bind(workshop.longitude)
        .bind(&workshop.phone)
        .bind(&workshop.services)
        .bind(&workshop.open_hours)
        .bind(workshop.created_at)
        .bind(workshop.updated_at)
        .execute(&self.db_pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> StoreResult<Option<Workshop>> {
        let workshop = sqlx::query_as::<_, Workshop>("SELECT * FROM workshops WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db_pool)
            .await?;
        Ok(workshop)
    }

    async fn list(&self) -> StoreResult<Vec<Workshop>> {
        let workshops = sqlx::query_as::<_, Workshop>("SELECT * FROM workshops ORDER BY name")
            .fetch_all(&self.db_pool)
            .await?;
        Ok(workshops)
    }

    async fn update(&self, workshop: &Workshop) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE workshops
            SET name = $2, address = $3, latitude = $4, longitude = $5, phone = $6,
                services = $7, open_hours = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(workshop.id)
        .bind(&workshop.name)
        .bind(&workshop.address)
        .bind(workshop.latitude)
        .bind(workshop.longitude)
        .bind(&workshop.phone)
        .bind(&workshop.services)
        .bind(&workshop.open_hours)
        .bind(workshop.updated_at)
        .execute(&self.db_pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM workshops WHERE id = $1")
            .bind(id)
            .execute(&self.db_pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }
}
