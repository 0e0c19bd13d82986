use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{
        CreateEventEntity, CreateSeatEntity, EventEntity, EventTicketEntity, SeatEntity,
        TicketOrderEntity,
    },
    schema::{event_tickets, events, providers, seats, ticket_orders},
};

const MAX_SEAT_ROWS: i32 = 50;
const MAX_SEATS_PER_ROW: i32 = 100;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/providers/events",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_event))
            .routes(utoipa_axum::routes!(get_my_events))
            .routes(utoipa_axum::routes!(publish_event))
            .routes(utoipa_axum::routes!(cancel_event))
            .routes(utoipa_axum::routes!(check_in_ticket))
            .route_layer(axum::middleware::from_fn(
                middleware::providers_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateEventReq {
    title: String,
    description: Option<String>,
    venue: String,
    starts_at: DateTime<Utc>,
    ends_at: Option<DateTime<Utc>>,
    ticket_price: f32,
    seat_rows: i32,
    seats_per_row: i32,
}

#[derive(Serialize, ToSchema)]
struct CreateEventRes {
    pub event: EventEntity,
    pub seat_count: i64,
}

/// Create a DRAFT event with its seat grid.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Events"],
    security(("bearerAuth" = [])),
    request_body = CreateEventReq,
    responses(
        (status = 200, description = "Created event successfully", body = StdResponse<CreateEventRes, String>)
    )
)]
async fn create_event(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<CreateEventReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let approved: i64 = providers::table
        .find(provider_id)
        .filter(providers::status.eq("APPROVED"))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check provider status")?;

    if approved == 0 {
        return Err(AppError::ForbiddenResource(
            "Provider account is not approved".into(),
        ));
    }

    if !(1..=MAX_SEAT_ROWS).contains(&body.seat_rows)
        || !(1..=MAX_SEATS_PER_ROW).contains(&body.seats_per_row)
    {
        return Err(AppError::BadRequest(format!(
            "Seat grid must be between 1x1 and {MAX_SEAT_ROWS}x{MAX_SEATS_PER_ROW}"
        )));
    }

    let (event, seat_count) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let event: EventEntity = diesel::insert_into(events::table)
                    .values(CreateEventEntity {
                        provider_id,
                        title: body.title,
                        description: body.description,
                        venue: body.venue,
                        starts_at: body.starts_at,
                        ends_at: body.ends_at,
                        ticket_price: body.ticket_price,
                        status: "DRAFT".into(),
                    })
                    .returning(EventEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create event")?;

                let mut grid = Vec::with_capacity((body.seat_rows * body.seats_per_row) as usize);
                for row_number in 1..=body.seat_rows {
                    for seat_number in 1..=body.seats_per_row {
                        grid.push(CreateSeatEntity {
                            event_id: event.id,
                            row_number,
                            seat_number,
                            status: "AVAILABLE".into(),
                        });
                    }
                }

                let seat_count = diesel::insert_into(seats::table)
                    .values(grid)
                    .execute(conn)
                    .await
                    .context("Failed to create seats")? as i64;

                Ok::<(EventEntity, i64), anyhow::Error>((event, seat_count))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(CreateEventRes { event, seat_count }),
        message: Some("Created event successfully"),
    })
}

/// List the provider's events.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Events"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my events", body = StdResponse<Vec<EventEntity>, String>)
    )
)]
async fn get_my_events(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let events: Vec<EventEntity> = events::table
        .filter(events::provider_id.eq(provider_id))
        .order_by(events::starts_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my events")?;

    Ok(StdResponse {
        data: Some(events),
        message: Some("Get my events successfully"),
    })
}

/// Put a DRAFT event on sale.
#[utoipa::path(
    patch,
    path = "/{id}/publish",
    tags = ["Events"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Event ID to publish")
    ),
    responses(
        (status = 200, description = "Published event successfully", body = StdResponse<EventEntity, String>)
    )
)]
async fn publish_event(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let event: EventEntity = diesel::update(
        events::table
            .find(id)
            .filter(events::provider_id.eq(provider_id))
            .filter(events::status.eq("DRAFT")),
    )
    .set(events::status.eq("PUBLISHED"))
    .returning(EventEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(event),
        message: Some("Published event successfully"),
    })
}

/// Cancel an event. Ticket sales stop immediately.
#[utoipa::path(
    patch,
    path = "/{id}/cancel",
    tags = ["Events"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Event ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled event successfully", body = StdResponse<EventEntity, String>)
    )
)]
async fn cancel_event(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let event: EventEntity = diesel::update(
        events::table
            .find(id)
            .filter(events::provider_id.eq(provider_id))
            .filter(events::status.ne("CANCELLED")),
    )
    .set(events::status.eq("CANCELLED"))
    .returning(EventEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(event),
        message: Some("Cancelled event successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CheckInReq {
    code: String,
}

#[derive(Serialize, ToSchema)]
struct CheckInRes {
    pub ticket: EventTicketEntity,
    pub seat: SeatEntity,
}

/// Scan a ticket code at the door. A VALID ticket of a CONFIRMED order
/// checks in exactly once.
#[utoipa::path(
    post,
    path = "/check-in",
    tags = ["Events"],
    security(("bearerAuth" = [])),
    request_body = CheckInReq,
    responses(
        (status = 200, description = "Checked in ticket successfully", body = StdResponse<CheckInRes, String>)
    )
)]
async fn check_in_ticket(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<CheckInReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let ticket: EventTicketEntity = event_tickets::table
        .filter(event_tickets::code.eq(&body.code))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let owned: i64 = events::table
        .find(ticket.event_id)
        .filter(events::provider_id.eq(provider_id))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check event ownership")?;

    if owned == 0 {
        return Err(AppError::ForbiddenResource(
            "Ticket belongs to another provider's event".into(),
        ));
    }

    let order: TicketOrderEntity = ticket_orders::table
        .find(ticket.order_id)
        .get_result(conn)
        .await
        .context("Failed to get ticket order")?;

    if order.status != "CONFIRMED" {
        return Err(AppError::BadRequest("Ticket order is not paid".into()));
    }

    let ticket: EventTicketEntity = diesel::update(
        event_tickets::table
            .find(ticket.id)
            .filter(event_tickets::status.eq("VALID")),
    )
    .set((
        event_tickets::status.eq("CHECKED_IN"),
        event_tickets::checked_in_at.eq(Utc::now()),
    ))
    .returning(EventTicketEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::BadRequest("Ticket was already used or voided".into()))?;

    let seat: SeatEntity = seats::table
        .find(ticket.seat_id)
        .get_result(conn)
        .await
        .context("Failed to get seat")?;

    Ok(StdResponse {
        data: Some(CheckInRes { ticket, seat }),
        message: Some("Checked in ticket successfully"),
    })
}
