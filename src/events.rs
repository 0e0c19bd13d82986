//! Event payloads recorded in the outbox and broadcast over the topic
//! exchange. The routing key is the outbox `event_type`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct BookingRequestedEvent {
    pub booking_id: i32,
    pub customer_id: i32,
    pub provider_id: i32,
    pub amount: f32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BookingConfirmedEvent {
    pub booking_id: i32,
    pub customer_id: i32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct BookingCancelledEvent {
    pub booking_id: i32,
    pub customer_id: i32,
    pub provider_id: i32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TicketOrderPlacedEvent {
    pub order_id: i32,
    pub event_id: i32,
    pub customer_id: i32,
    pub seat_ids: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct TicketOrderCancelledEvent {
    pub order_id: i32,
    pub event_id: i32,
    pub seat_ids: Vec<i32>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MessageSentEvent {
    pub conversation_id: i32,
    pub message_id: i32,
    pub sender_role: String,
    pub sender_id: i32,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PaymentSucceededEvent {
    pub payment_id: Uuid,
    pub amount: f32,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct PaymentFailedEvent {
    pub payment_id: Uuid,
    pub failure_reason: Option<String>,
}
