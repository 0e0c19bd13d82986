use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware, outbox,
    },
    events::BookingConfirmedEvent,
    models::BookingEntity,
    schema::bookings,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/providers/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_incoming_bookings))
            .routes(utoipa_axum::routes!(confirm_booking))
            .routes(utoipa_axum::routes!(complete_booking))
            .route_layer(axum::middleware::from_fn(
                middleware::providers_authorization,
            )),
    )
}

/// List bookings made against the provider's services.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List incoming bookings", body = StdResponse<Vec<BookingEntity>, String>)
    )
)]
async fn get_incoming_bookings(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let bookings: Vec<BookingEntity> = bookings::table
        .filter(bookings::provider_id.eq(provider_id))
        .order_by(bookings::starts_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get incoming bookings")?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get incoming bookings successfully"),
    })
}

/// Accept a pending booking.
#[utoipa::path(
    patch,
    path = "/{id}/confirm",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID to confirm")
    ),
    responses(
        (status = 200, description = "Confirmed booking successfully", body = StdResponse<BookingEntity, String>)
    )
)]
async fn confirm_booking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let confirmed_booking = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let confirmed_booking: BookingEntity = diesel::update(
                    bookings::table
                        .find(id)
                        .filter(bookings::provider_id.eq(provider_id))
                        .filter(bookings::status.eq("PENDING")),
                )
                .set((
                    bookings::status.eq("CONFIRMED"),
                    bookings::confirmed_at.eq(Utc::now()),
                ))
                .returning(BookingEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;

                outbox::publish(
                    conn,
                    "bookings.booking_confirmed".into(),
                    BookingConfirmedEvent {
                        booking_id: confirmed_booking.id,
                        customer_id: confirmed_booking.customer_id,
                    },
                )
                .await?;

                Ok::<BookingEntity, AppError>(confirmed_booking)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(confirmed_booking),
        message: Some("Confirmed booking successfully"),
    })
}

/// Mark a confirmed booking as carried out.
#[utoipa::path(
    patch,
    path = "/{id}/complete",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID to complete")
    ),
    responses(
        (status = 200, description = "Completed booking successfully", body = StdResponse<BookingEntity, String>)
    )
)]
async fn complete_booking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let completed_booking: BookingEntity = diesel::update(
        bookings::table
            .find(id)
            .filter(bookings::provider_id.eq(provider_id))
            .filter(bookings::status.eq("CONFIRMED")),
    )
    .set((
        bookings::status.eq("COMPLETED"),
        bookings::completed_at.eq(Utc::now()),
    ))
    .returning(BookingEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(completed_booking),
        message: Some("Completed booking successfully"),
    })
}
