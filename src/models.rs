use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Identifiable, Insertable, Queryable},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

// Providers

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::providers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProviderEntity {
    pub id: i32,
    pub user_id: i32,
    pub display_name: String,
    pub bio: Option<String>,
    pub contact_email: String,
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::providers)]
pub struct CreateProviderEntity {
    pub user_id: i32,
    pub display_name: String,
    pub bio: Option<String>,
    pub contact_email: String,
    pub status: String,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::providers)]
pub struct UpdateProviderEntity {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub contact_email: Option<String>,
}

// Catalog

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::services)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ServiceEntity {
    pub id: i32,
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub pricing_type: String,
    pub unit_price: f32,
    pub deposit_percent: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::services)]
pub struct CreateServiceEntity {
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub pricing_type: String,
    pub unit_price: f32,
    pub deposit_percent: Option<i32>,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::services)]
pub struct UpdateServiceEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub unit_price: Option<f32>,
    pub deposit_percent: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
    pub stock_quantity: i32,
}

#[derive(AsChangeset, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct UpdateProductEntity {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f32>,
    pub stock_quantity: Option<i32>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::packages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PackageEntity {
    pub id: i32,
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::packages)]
pub struct CreatePackageEntity {
    pub provider_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: f32,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::package_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PackageItemEntity {
    pub package_id: i32,
    pub service_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::package_items)]
pub struct CreatePackageItemEntity {
    pub package_id: i32,
    pub service_id: i32,
}

// Bookings

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BookingEntity {
    pub id: i32,
    pub customer_id: i32,
    pub provider_id: i32,
    pub service_id: i32,
    pub status: String,
    pub payment_status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub amount: f32,
    pub deposit_amount: Option<f32>,
    pub remaining_amount: Option<f32>,
    pub notes: Option<String>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::bookings)]
pub struct CreateBookingEntity {
    pub customer_id: i32,
    pub provider_id: i32,
    pub service_id: i32,
    pub status: String,
    pub payment_status: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub amount: f32,
    pub deposit_amount: Option<f32>,
    pub remaining_amount: Option<f32>,
    pub notes: Option<String>,
}

// Payments

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::payments)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentEntity {
    pub id: Uuid,
    pub booking_id: Option<i32>,
    pub ticket_order_id: Option<i32>,
    pub amount: f32,
    pub purpose: String,
    pub status: String,
    pub gateway: String,
    pub gateway_ref: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::payments)]
pub struct CreatePaymentEntity {
    pub booking_id: Option<i32>,
    pub ticket_order_id: Option<i32>,
    pub amount: f32,
    pub purpose: String,
    pub status: String,
    pub gateway: String,
}

// Ticketing

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventEntity {
    pub id: i32,
    pub provider_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_price: f32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::events)]
pub struct CreateEventEntity {
    pub provider_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub venue: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub ticket_price: f32,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::seats)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SeatEntity {
    pub id: i32,
    pub event_id: i32,
    pub row_number: i32,
    pub seat_number: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::seats)]
pub struct CreateSeatEntity {
    pub event_id: i32,
    pub row_number: i32,
    pub seat_number: i32,
    pub status: String,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::ticket_orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TicketOrderEntity {
    pub id: i32,
    pub customer_id: i32,
    pub event_id: i32,
    pub status: String,
    pub amount: f32,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::ticket_orders)]
pub struct CreateTicketOrderEntity {
    pub customer_id: i32,
    pub event_id: i32,
    pub status: String,
    pub amount: f32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::event_tickets)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventTicketEntity {
    pub id: Uuid,
    pub order_id: i32,
    pub event_id: i32,
    pub seat_id: i32,
    pub code: String,
    pub status: String,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::event_tickets)]
pub struct CreateEventTicketEntity {
    pub order_id: i32,
    pub event_id: i32,
    pub seat_id: i32,
    pub code: String,
    pub status: String,
}

// Carts

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartEntity {
    pub id: i32,
    pub customer_id: Option<i32>,
    pub session_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::carts)]
pub struct CreateCartEntity {
    pub customer_id: Option<i32>,
    pub session_key: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Deserialize, Debug)]
#[diesel(table_name = crate::schema::cart_items)]
pub struct CreateCartItemEntity {
    pub cart_id: i32,
    pub product_id: i32,
    pub quantity: i32,
}

// Wishlists

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::wishlists)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WishlistEntity {
    pub id: i32,
    pub customer_id: Option<i32>,
    pub session_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::wishlists)]
pub struct CreateWishlistEntity {
    pub customer_id: Option<i32>,
    pub session_key: Option<String>,
}

#[derive(Queryable, Selectable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::wishlist_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WishlistItemEntity {
    pub wishlist_id: i32,
    pub item_type: String,
    pub item_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::wishlist_items)]
pub struct CreateWishlistItemEntity {
    pub wishlist_id: i32,
    pub item_type: String,
    pub item_id: i32,
}

// Messaging

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::conversations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ConversationEntity {
    pub id: i32,
    pub customer_id: i32,
    pub provider_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::conversations)]
pub struct CreateConversationEntity {
    pub customer_id: i32,
    pub provider_id: i32,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MessageEntity {
    pub id: i32,
    pub conversation_id: i32,
    pub sender_role: String,
    pub sender_id: i32,
    pub body: String,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::messages)]
pub struct CreateMessageEntity {
    pub conversation_id: i32,
    pub sender_role: String,
    pub sender_id: i32,
    pub body: String,
}

// Outbox

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OutboxEntryEntity {
    pub id: i32,
    pub event_type: String,
    pub payload: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Webhook logs

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, ToSchema)]
#[diesel(table_name = crate::schema::webhook_logs)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct WebhookLogEntity {
    pub id: i32,
    pub gateway: String,
    pub event_type: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::webhook_logs)]
pub struct CreateWebhookLogEntity {
    pub gateway: String,
    pub event_type: Option<String>,
    pub payload: String,
}
