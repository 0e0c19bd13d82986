use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    api::gateway,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{EventTicketEntity, PaymentEntity},
    schema::{bookings, event_tickets, payments, seats, ticket_orders},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/payments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(refund_payment))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

/// Refund a paid payment through the gateway and roll its parent back:
/// a booking drops to payment_status REFUNDED, a ticket order is
/// cancelled with its seats released and tickets voided.
#[utoipa::path(
    post,
    path = "/{id}/refund",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = Uuid, Path, description = "Payment ID to refund")
    ),
    responses(
        (status = 200, description = "Refunded payment successfully", body = StdResponse<PaymentEntity, String>)
    )
)]
async fn refund_payment(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let payment: PaymentEntity = payments::table
        .find(id)
        .filter(payments::status.eq("PAID"))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

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

    let refunded_payment = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let refunded_payment: PaymentEntity = diesel::update(
                    payments::table.find(payment.id).filter(payments::status.eq("PAID")),
                )
                .set(payments::status.eq("REFUNDED"))
                .returning(PaymentEntity::as_returning())
                .get_result(conn)
                .await
                .map_err(|_| AppError::NotFound)?;

                if let Some(booking_id) = refunded_payment.booking_id {
                    diesel::update(bookings::table.find(booking_id))
                        .set(bookings::payment_status.eq("REFUNDED"))
                        .execute(conn)
                        .await
                        .context("Failed to mark booking refunded")?;
                }

                if let Some(order_id) = refunded_payment.ticket_order_id {
                    diesel::update(ticket_orders::table.find(order_id))
                        .set((
                            ticket_orders::status.eq("CANCELLED"),
                            ticket_orders::cancelled_at.eq(Utc::now()),
                        ))
                        .execute(conn)
                        .await
                        .context("Failed to cancel ticket order")?;

                    let voided_tickets: Vec<EventTicketEntity> = diesel::update(
                        event_tickets::table.filter(event_tickets::order_id.eq(order_id)),
                    )
                    .set(event_tickets::status.eq("VOID"))
                    .returning(EventTicketEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to void tickets")?;

                    let seat_ids: Vec<i32> =
                        voided_tickets.iter().map(|ticket| ticket.seat_id).collect();

                    diesel::update(seats::table.filter(seats::id.eq_any(&seat_ids)))
                        .set(seats::status.eq("AVAILABLE"))
                        .execute(conn)
                        .await
                        .context("Failed to release seats")?;
                }

                Ok::<PaymentEntity, AppError>(refunded_payment)
            })
        })
        .await?;

    info!("Admin #{admin_id} refunded payment {}", refunded_payment.id);

    Ok(StdResponse {
        data: Some(refunded_payment),
        message: Some("Refunded payment successfully"),
    })
}
