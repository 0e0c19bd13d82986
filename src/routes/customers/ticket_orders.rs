use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::gateway,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware, outbox,
    },
    events::{TicketOrderCancelledEvent, TicketOrderPlacedEvent},
    models::{
        CreateEventTicketEntity, CreatePaymentEntity, CreateTicketOrderEntity, EventEntity,
        EventTicketEntity, PaymentEntity, SeatEntity, TicketOrderEntity,
    },
    schema::{event_tickets, events, payments, seats, ticket_orders},
    tickets,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/ticket-orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_ticket_order))
            .routes(utoipa_axum::routes!(get_my_ticket_orders))
            .routes(utoipa_axum::routes!(get_ticket_order))
            .routes(utoipa_axum::routes!(cancel_ticket_order))
            .routes(utoipa_axum::routes!(create_payment_for_ticket_order))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateTicketOrderReq {
    event_id: i32,
    seat_ids: Vec<i32>,
}

#[derive(Serialize, ToSchema)]
struct TicketRes {
    pub ticket: EventTicketEntity,
    pub qr_payload: String,
}

#[derive(Serialize, ToSchema)]
struct GetTicketOrderRes {
    pub order: TicketOrderEntity,
    pub tickets: Vec<EventTicketEntity>,
}

#[derive(Serialize, ToSchema)]
struct CreateTicketOrderRes {
    pub order: TicketOrderEntity,
    pub tickets: Vec<TicketRes>,
}

/// Reserve the selected seats and create an order with one ticket per
/// seat. The seat flip, the order row and the ticket rows land in one
/// transaction; losing any seat to a concurrent order rolls the whole
/// thing back.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Ticket orders"],
    security(("bearerAuth" = [])),
    request_body = CreateTicketOrderReq,
    responses(
        (status = 200, description = "Created ticket order successfully", body = StdResponse<CreateTicketOrderRes, String>)
    )
)]
async fn create_ticket_order(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<CreateTicketOrderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if body.seat_ids.is_empty() {
        return Err(AppError::BadRequest("No seats selected".into()));
    }

    let event: EventEntity = events::table
        .find(body.event_id)
        .filter(events::status.eq("PUBLISHED"))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let (order, reserved_seats, created_tickets) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let reserved_seats: Vec<SeatEntity> = diesel::update(
                    seats::table
                        .filter(seats::id.eq_any(&body.seat_ids))
                        .filter(seats::event_id.eq(event.id))
                        .filter(seats::status.eq("AVAILABLE")),
                )
                .set(seats::status.eq("RESERVED"))
                .returning(SeatEntity::as_returning())
                .get_results(conn)
                .await
                .context("Failed to reserve seats")?;

                if reserved_seats.len() != body.seat_ids.len() {
                    return Err(AppError::BadRequest(
                        "One or more selected seats are no longer available".into(),
                    ));
                }

                let amount = event.ticket_price * reserved_seats.len() as f32;

                let order: TicketOrderEntity = diesel::insert_into(ticket_orders::table)
                    .values(CreateTicketOrderEntity {
                        customer_id,
                        event_id: event.id,
                        status: "PENDING".into(),
                        amount,
                    })
                    .returning(TicketOrderEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create ticket order")?;

                let new_tickets: Vec<CreateEventTicketEntity> = reserved_seats
                    .iter()
                    .map(|seat| CreateEventTicketEntity {
                        order_id: order.id,
                        event_id: event.id,
                        seat_id: seat.id,
                        code: tickets::generate_code(event.id, seat.id),
                        status: "VALID".into(),
                    })
                    .collect();

                let created_tickets: Vec<EventTicketEntity> =
                    diesel::insert_into(event_tickets::table)
                        .values(new_tickets)
                        .returning(EventTicketEntity::as_returning())
                        .get_results(conn)
                        .await
                        .context("Failed to create tickets")?;

                outbox::publish(
                    conn,
                    "ticketing.order_placed".into(),
                    TicketOrderPlacedEvent {
                        order_id: order.id,
                        event_id: event.id,
                        customer_id,
                        seat_ids: reserved_seats.iter().map(|seat| seat.id).collect(),
                    },
                )
                .await?;

                Ok::<(TicketOrderEntity, Vec<SeatEntity>, Vec<EventTicketEntity>), AppError>((
                    order,
                    reserved_seats,
                    created_tickets,
                ))
            })
        })
        .await?;

    let seat_positions: HashMap<i32, (i32, i32)> = reserved_seats
        .iter()
        .map(|seat| (seat.id, (seat.row_number, seat.seat_number)))
        .collect();

    let tickets = created_tickets
        .into_iter()
        .map(|ticket| {
            let (row_number, seat_number) =
                seat_positions.get(&ticket.seat_id).copied().unwrap_or((0, 0));
            let qr_payload =
                tickets::qr_payload(&ticket.code, ticket.event_id, row_number, seat_number);
            TicketRes { ticket, qr_payload }
        })
        .collect();

    Ok(StdResponse {
        data: Some(CreateTicketOrderRes { order, tickets }),
        message: Some("Created ticket order successfully"),
    })
}

/// Fetch all ticket orders belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/my-orders",
    tags = ["Ticket orders"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my ticket orders", body = StdResponse<Vec<GetTicketOrderRes>, String>)
    )
)]
async fn get_my_ticket_orders(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let orders: Vec<TicketOrderEntity> = ticket_orders::table
        .filter(ticket_orders::customer_id.eq(customer_id))
        .order_by(ticket_orders::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my ticket orders")?;

    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();
    let tickets: Vec<EventTicketEntity> = event_tickets::table
        .filter(event_tickets::order_id.eq_any(&order_ids))
        .get_results(conn)
        .await
        .context("Failed to get tickets")?;

    let mut group: HashMap<i32, Vec<EventTicketEntity>> = HashMap::new();
    for ticket in tickets {
        group.entry(ticket.order_id).or_default().push(ticket);
    }

    let orders_with_tickets: Vec<GetTicketOrderRes> = orders
        .into_iter()
        .map(|order| GetTicketOrderRes {
            tickets: group.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect();

    Ok(StdResponse {
        data: Some(orders_with_tickets),
        message: Some("Get my ticket orders successfully"),
    })
}

/// Fetch a specific ticket order belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Ticket orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Ticket order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get ticket order successfully", body = StdResponse<GetTicketOrderRes, String>)
    )
)]
async fn get_ticket_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let order: TicketOrderEntity = ticket_orders::table
        .find(id)
        .filter(ticket_orders::customer_id.eq(customer_id))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let tickets: Vec<EventTicketEntity> = event_tickets::table
        .filter(event_tickets::order_id.eq(order.id))
        .get_results(conn)
        .await
        .context("Failed to get tickets")?;

    Ok(StdResponse {
        data: Some(GetTicketOrderRes { order, tickets }),
        message: Some("Get ticket order successfully"),
    })
}

/// Cancel a ticket order that is still pending payment. Seats go back to
/// AVAILABLE and the tickets are voided.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Ticket orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Ticket order ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled ticket order successfully", body = StdResponse<TicketOrderEntity, String>)
    )
)]
async fn cancel_ticket_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cancelled_order = conn
        .transaction(move |conn| {
            Box::pin(async move {
                // Only a PENDING order can be cancelled; confirmed orders
                // hold sold seats.
                let cancelled_order: TicketOrderEntity = diesel::update(
                    ticket_orders::table
                        .find(id)
                        .filter(ticket_orders::customer_id.eq(customer_id))
                        .filter(ticket_orders::status.eq("PENDING")),
                )
                .set((
                    ticket_orders::status.eq("CANCELLED"),
                    ticket_orders::cancelled_at.eq(Utc::now()),
                ))
                .returning(TicketOrderEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;

                let voided_tickets: Vec<EventTicketEntity> = diesel::update(
                    event_tickets::table.filter(event_tickets::order_id.eq(cancelled_order.id)),
                )
                .set(event_tickets::status.eq("VOID"))
                .returning(EventTicketEntity::as_returning())
                .get_results(conn)
                .await
                .context("Failed to void tickets")?;

                let seat_ids: Vec<i32> =
                    voided_tickets.iter().map(|ticket| ticket.seat_id).collect();

                diesel::update(
                    seats::table
                        .filter(seats::id.eq_any(&seat_ids))
                        .filter(seats::status.eq("RESERVED")),
                )
                .set(seats::status.eq("AVAILABLE"))
                .execute(conn)
                .await
                .context("Failed to release seats")?;

                outbox::publish(
                    conn,
                    "ticketing.order_cancelled".into(),
                    TicketOrderCancelledEvent {
                        order_id: cancelled_order.id,
                        event_id: cancelled_order.event_id,
                        seat_ids,
                    },
                )
                .await?;

                Ok::<TicketOrderEntity, AppError>(cancelled_order)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(cancelled_order),
        message: Some("Cancelled ticket order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTicketOrderPaymentReq {
    pub gateway: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreateTicketOrderPaymentRes {
    pub payment: PaymentEntity,
    pub checkout_url: String,
}

/// Create a payment for a pending ticket order.
#[utoipa::path(
    post,
    path = "/{id}/payments",
    tags = ["Ticket orders"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Ticket order ID to create payment for")
    ),
    request_body = CreateTicketOrderPaymentReq,
    responses(
        (status = 200, description = "Created payment successfully", body = StdResponse<CreateTicketOrderPaymentRes, String>)
    )
)]
async fn create_payment_for_ticket_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<CreateTicketOrderPaymentReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    match body.gateway.as_str() {
        "cardlink" | "paywave" => {}
        _ => {
            return Err(AppError::BadRequest(format!(
                "{} is not a valid payment gateway",
                body.gateway
            )));
        }
    }

    let order: TicketOrderEntity = ticket_orders::table
        .find(id)
        .filter(ticket_orders::customer_id.eq(customer_id))
        .filter(ticket_orders::status.eq("PENDING"))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let payment: PaymentEntity = diesel::insert_into(payments::table)
        .values(CreatePaymentEntity {
            booking_id: None,
            ticket_order_id: Some(order.id),
            amount: order.amount,
            purpose: "ORDER".into(),
            status: "PENDING".into(),
            gateway: body.gateway,
        })
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create payment")?;

    let session = gateway::create_checkout(
        state.http_client.clone(),
        &state.config.gateway,
        payment.id,
        payment.amount,
        &format!("Ticket order #{}", order.id),
    )
    .await?;

    let payment: PaymentEntity = diesel::update(payments::table.find(payment.id))
        .set(payments::gateway_ref.eq(session.reference))
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to store gateway reference")?;

    Ok(StdResponse {
        data: Some(CreateTicketOrderPaymentRes {
            payment,
            checkout_url: session.checkout_url,
        }),
        message: Some("Created payment successfully"),
    })
}
