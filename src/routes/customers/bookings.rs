use anyhow::{Context, Result};
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    api::gateway,
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware, outbox,
    },
    events::{BookingCancelledEvent, BookingRequestedEvent},
    models::{BookingEntity, CreateBookingEntity, CreatePaymentEntity, PaymentEntity, ServiceEntity},
    pricing,
    schema::{bookings, payments, providers, services},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/bookings",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_booking))
            .routes(utoipa_axum::routes!(get_my_bookings))
            .routes(utoipa_axum::routes!(get_booking))
            .routes(utoipa_axum::routes!(cancel_booking))
            .routes(utoipa_axum::routes!(create_payment_for_booking))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct CreateBookingReq {
    service_id: i32,
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    notes: Option<String>,
}

/// Book a service for a date/time window. The amount is quoted from the
/// service's pricing type; deposit-bearing services get a deposit split.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    request_body = CreateBookingReq,
    responses(
        (status = 200, description = "Created booking successfully", body = StdResponse<BookingEntity, String>)
    )
)]
async fn create_booking(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<CreateBookingReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let service: ServiceEntity = services::table
        .find(body.service_id)
        .filter(services::is_active.eq(true))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let provider_accepting: i64 = providers::table
        .find(service.provider_id)
        .filter(providers::status.eq("APPROVED"))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check provider status")?;

    if provider_accepting == 0 {
        return Err(AppError::BadRequest(
            "Provider is not currently accepting bookings".into(),
        ));
    }

    let quote = pricing::quote(
        &service.pricing_type,
        service.unit_price,
        service.deposit_percent,
        body.starts_at,
        body.ends_at,
    )
    .map_err(|err| AppError::BadRequest(err.to_string()))?;

    let booking = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let booking: BookingEntity = diesel::insert_into(bookings::table)
                    .values(CreateBookingEntity {
                        customer_id,
                        provider_id: service.provider_id,
                        service_id: service.id,
                        status: "PENDING".into(),
                        payment_status: "PENDING".into(),
                        starts_at: body.starts_at,
                        ends_at: body.ends_at,
                        amount: quote.amount,
                        deposit_amount: quote.deposit_amount,
                        remaining_amount: quote.remaining_amount,
                        notes: body.notes,
                    })
                    .returning(BookingEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create booking")?;

                outbox::publish(
                    conn,
                    "bookings.booking_requested".into(),
                    BookingRequestedEvent {
                        booking_id: booking.id,
                        customer_id: booking.customer_id,
                        provider_id: booking.provider_id,
                        amount: booking.amount,
                    },
                )
                .await?;

                Ok::<BookingEntity, anyhow::Error>(booking)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(booking),
        message: Some("Created booking successfully"),
    })
}

/// Fetch all bookings belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/my-bookings",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my bookings", body = StdResponse<Vec<BookingEntity>, String>)
    )
)]
async fn get_my_bookings(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let bookings: Vec<BookingEntity> = bookings::table
        .filter(bookings::customer_id.eq(customer_id))
        .order_by(bookings::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my bookings")?;

    Ok(StdResponse {
        data: Some(bookings),
        message: Some("Get my bookings successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct GetBookingRes {
    pub booking: BookingEntity,
    pub payments: Vec<PaymentEntity>,
}

/// Fetch a specific booking belonging to the authenticated customer.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID to fetch")
    ),
    responses(
        (status = 200, description = "Get booking successfully", body = StdResponse<GetBookingRes, String>)
    )
)]
async fn get_booking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let booking: QueryResult<BookingEntity> = bookings::table
        .find(id)
        .filter(bookings::customer_id.eq(customer_id))
        .get_result(conn)
        .await;

    let booking = match booking {
        Ok(booking) => booking,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let payments: Vec<PaymentEntity> = payments::table
        .filter(payments::booking_id.eq(booking.id))
        .get_results(conn)
        .await
        .context("Failed to get booking payments")?;

    Ok(StdResponse {
        data: Some(GetBookingRes { booking, payments }),
        message: Some("Get booking successfully"),
    })
}

/// Cancel a booking that has not been completed. Paid amounts are refunded
/// through the gateway.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled booking successfully", body = StdResponse<BookingEntity, String>)
    )
)]
async fn cancel_booking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    // A COMPLETED or already CANCELLED booking stays as it is; the filtered
    // update only matches cancellable rows.
    let cancelled_booking = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cancelled_booking: BookingEntity = diesel::update(
                    bookings::table
                        .find(id)
                        .filter(bookings::customer_id.eq(customer_id))
                        .filter(bookings::status.eq_any(vec!["PENDING", "CONFIRMED"])),
                )
                .set((
                    bookings::status.eq("CANCELLED"),
                    bookings::cancelled_at.eq(Utc::now()),
                ))
                .returning(BookingEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;

                outbox::publish(
                    conn,
                    "bookings.booking_cancelled".into(),
                    BookingCancelledEvent {
                        booking_id: cancelled_booking.id,
                        customer_id: cancelled_booking.customer_id,
                        provider_id: cancelled_booking.provider_id,
                    },
                )
                .await?;

                Ok::<BookingEntity, AppError>(cancelled_booking)
            })
        })
        .await?;

    let paid_payments: Vec<PaymentEntity> = payments::table
        .filter(payments::booking_id.eq(cancelled_booking.id))
        .filter(payments::status.eq("PAID"))
        .get_results(conn)
        .await
        .context("Failed to get booking payments")?;

    let mut refunded = false;
    for payment in paid_payments {
        let reference = payment
            .gateway_ref
            .as_deref()
            .context("Paid payment has no gateway reference")?;
        gateway::refund(
            state.http_client.clone(),
            &state.config.gateway,
            reference,
            payment.amount,
        )
        .await?;

        diesel::update(payments::table.find(payment.id))
            .set(payments::status.eq("REFUNDED"))
            .execute(conn)
            .await
            .context("Failed to mark payment refunded")?;
        refunded = true;
    }

    let cancelled_booking = if refunded {
        diesel::update(bookings::table.find(cancelled_booking.id))
            .set(bookings::payment_status.eq("REFUNDED"))
            .returning(BookingEntity::as_returning())
            .get_result(conn)
            .await
            .context("Failed to mark booking refunded")?
    } else {
        cancelled_booking
    };

    Ok(StdResponse {
        data: Some(cancelled_booking),
        message: Some("Cancelled booking successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
pub struct CreateBookingPaymentReq {
    pub gateway: String,
}

#[derive(Serialize, ToSchema)]
pub struct CreateBookingPaymentRes {
    pub payment: PaymentEntity,
    pub checkout_url: String,
}

/// Create a payment for a confirmed booking. Deposit-bearing bookings are
/// charged the deposit first, then the remaining balance.
#[utoipa::path(
    post,
    path = "/{id}/payments",
    tags = ["Bookings"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Booking ID to create payment for")
    ),
    request_body = CreateBookingPaymentReq,
    responses(
        (status = 200, description = "Created payment successfully", body = StdResponse<CreateBookingPaymentRes, String>)
    )
)]
async fn create_payment_for_booking(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<CreateBookingPaymentReq>,
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

    let booking: BookingEntity = bookings::table
        .find(id)
        .filter(bookings::customer_id.eq(customer_id))
        .filter(bookings::status.eq("CONFIRMED"))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let (purpose, amount) = match (booking.payment_status.as_str(), booking.deposit_amount) {
        ("PENDING", Some(deposit)) => ("DEPOSIT", deposit),
        ("PENDING", None) => ("FULL", booking.amount),
        ("PARTIAL", Some(_)) => (
            "BALANCE",
            booking.remaining_amount.unwrap_or(booking.amount),
        ),
        _ => {
            return Err(AppError::BadRequest(
                "Booking is already fully paid".into(),
            ));
        }
    };

    let payment: PaymentEntity = diesel::insert_into(payments::table)
        .values(CreatePaymentEntity {
            booking_id: Some(booking.id),
            ticket_order_id: None,
            amount,
            purpose: purpose.into(),
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
        &format!("Booking #{} {}", booking.id, purpose),
    )
    .await?;

    let payment: PaymentEntity = diesel::update(payments::table.find(payment.id))
        .set(payments::gateway_ref.eq(session.reference))
        .returning(PaymentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to store gateway reference")?;

    Ok(StdResponse {
        data: Some(CreateBookingPaymentRes {
            payment,
            checkout_url: session.checkout_url,
        }),
        message: Some("Created payment successfully"),
    })
}
