use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use tracing::info;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    api::gateway,
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        outbox,
    },
    events::{PaymentFailedEvent, PaymentSucceededEvent},
    models::{CreateWebhookLogEntity, EventTicketEntity, PaymentEntity},
    schema::{bookings, event_tickets, payments, seats, ticket_orders, webhook_logs},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/payments",
        OpenApiRouter::new().routes(utoipa_axum::routes!(gateway_webhook)),
    )
}

/// Gateway webhook endpoint. The payload is untrusted until the signature
/// over the raw body checks out; the raw body is logged either way the
/// parse goes.
#[utoipa::path(
    post,
    path = "/webhook/{gateway}",
    tags = ["Payments"],
    params(
        ("gateway" = String, Path, description = "Gateway that sent the webhook")
    ),
    request_body(content = Vec<u8>, description = "Raw webhook payload"),
    responses(
        (status = 200, description = "Webhook processed", body = StdResponse<PaymentEntity, String>)
    )
)]
async fn gateway_webhook(
    Path(gateway_name): Path<String>,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    match gateway_name.as_str() {
        "cardlink" | "paywave" => {}
        _ => return Err(AppError::NotFound),
    }

    let signature = headers
        .get("x-gateway-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing x-gateway-signature header".into()))?;

    if !gateway::verify_signature(&state.config.gateway.webhook_secret, &body, signature) {
        return Err(AppError::Unauthorized("Invalid webhook signature".into()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notification = match gateway_name.as_str() {
        "cardlink" => parse_cardlink(&body),
        "paywave" => parse_paywave(&body),
        _ => unreachable!(),
    };

    diesel::insert_into(webhook_logs::table)
        .values(CreateWebhookLogEntity {
            gateway: gateway_name.clone(),
            event_type: notification
                .as_ref()
                .ok()
                .map(|notification| notification.kind_name().to_string()),
            payload: String::from_utf8_lossy(&body).into_owned(),
        })
        .execute(conn)
        .await
        .context("Failed to log webhook payload")?;

    let notification = notification?;
    info!(
        "Webhook from {gateway_name}: {} for payment {}",
        notification.kind_name(),
        notification.payment_id
    );

    let payment = match notification.kind {
        NotificationKind::Succeeded => {
            apply_payment_succeeded(conn, notification.payment_id, notification.reference).await?
        }
        NotificationKind::Failed => {
            apply_payment_failed(conn, notification.payment_id, notification.reason).await?
        }
    };

    Ok(StdResponse {
        data: Some(payment),
        message: Some("Webhook processed"),
    })
}

enum NotificationKind {
    Succeeded,
    Failed,
}

struct PaymentNotification {
    kind: NotificationKind,
    payment_id: Uuid,
    reference: Option<String>,
    reason: Option<String>,
}

impl PaymentNotification {
    fn kind_name(&self) -> &'static str {
        match self.kind {
            NotificationKind::Succeeded => "payment.succeeded",
            NotificationKind::Failed => "payment.failed",
        }
    }
}

#[derive(Deserialize)]
struct CardlinkWebhook {
    event: String,
    payment_id: Uuid,
    reference: Option<String>,
    failure_reason: Option<String>,
}

fn parse_cardlink(body: &[u8]) -> Result<PaymentNotification, AppError> {
    let webhook: CardlinkWebhook = serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Malformed cardlink payload: {err}")))?;

    let kind = match webhook.event.as_str() {
        "payment.succeeded" => NotificationKind::Succeeded,
        "payment.failed" => NotificationKind::Failed,
        other => {
            return Err(AppError::BadRequest(format!(
                "{other} is not a supported cardlink event"
            )));
        }
    };

    Ok(PaymentNotification {
        kind,
        payment_id: webhook.payment_id,
        reference: webhook.reference,
        reason: webhook.failure_reason,
    })
}

#[derive(Deserialize)]
struct PaywaveWebhook {
    #[serde(rename = "type")]
    kind: String,
    payment: Uuid,
    #[serde(rename = "ref")]
    reference: Option<String>,
    reason: Option<String>,
}

fn parse_paywave(body: &[u8]) -> Result<PaymentNotification, AppError> {
    let webhook: PaywaveWebhook = serde_json::from_slice(body)
        .map_err(|err| AppError::BadRequest(format!("Malformed paywave payload: {err}")))?;

    let kind = match webhook.kind.as_str() {
        "charge.completed" => NotificationKind::Succeeded,
        "charge.declined" => NotificationKind::Failed,
        other => {
            return Err(AppError::BadRequest(format!(
                "{other} is not a supported paywave event"
            )));
        }
    };

    Ok(PaymentNotification {
        kind,
        payment_id: webhook.payment,
        reference: webhook.reference,
        reason: webhook.reason,
    })
}

/// Flip the payment to PAID and advance its parent: a deposit charge puts
/// the booking on PARTIAL, anything else pays it off; a ticket order is
/// confirmed and its seats become SOLD.
async fn apply_payment_succeeded(
    conn: &mut AsyncPgConnection,
    payment_id: Uuid,
    reference: Option<String>,
) -> Result<PaymentEntity, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let payment: PaymentEntity = diesel::update(
                payments::table
                    .find(payment_id)
                    .filter(payments::status.eq("PENDING")),
            )
            .set(payments::status.eq("PAID"))
            .returning(PaymentEntity::as_returning())
            .get_result(conn)
            .await
            .map_err(|_| AppError::NotFound)?;

            let payment = match reference {
                Some(reference) => diesel::update(payments::table.find(payment.id))
                    .set(payments::gateway_ref.eq(reference))
                    .returning(PaymentEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to store gateway reference")?,
                None => payment,
            };

            if let Some(booking_id) = payment.booking_id {
                let payment_status = if payment.purpose == "DEPOSIT" {
                    "PARTIAL"
                } else {
                    "PAID"
                };
                diesel::update(bookings::table.find(booking_id))
                    .set(bookings::payment_status.eq(payment_status))
                    .execute(conn)
                    .await
                    .context("Failed to update booking payment status")?;
            }

            if let Some(order_id) = payment.ticket_order_id {
                diesel::update(
                    ticket_orders::table
                        .find(order_id)
                        .filter(ticket_orders::status.eq("PENDING")),
                )
                .set(ticket_orders::status.eq("CONFIRMED"))
                .execute(conn)
                .await
                .context("Failed to confirm ticket order")?;

                let tickets: Vec<EventTicketEntity> = event_tickets::table
                    .filter(event_tickets::order_id.eq(order_id))
                    .get_results(conn)
                    .await
                    .context("Failed to get order tickets")?;
                let seat_ids: Vec<i32> = tickets.iter().map(|ticket| ticket.seat_id).collect();

                diesel::update(
                    seats::table
                        .filter(seats::id.eq_any(&seat_ids))
                        .filter(seats::status.eq("RESERVED")),
                )
                .set(seats::status.eq("SOLD"))
                .execute(conn)
                .await
                .context("Failed to mark seats sold")?;
            }

            outbox::publish(
                conn,
                "payments.payment_succeeded".into(),
                PaymentSucceededEvent {
                    payment_id: payment.id,
                    amount: payment.amount,
                },
            )
            .await?;

            Ok::<PaymentEntity, AppError>(payment)
        })
    })
    .await
}

async fn apply_payment_failed(
    conn: &mut AsyncPgConnection,
    payment_id: Uuid,
    reason: Option<String>,
) -> Result<PaymentEntity, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let payment: PaymentEntity = diesel::update(
                payments::table
                    .find(payment_id)
                    .filter(payments::status.eq("PENDING")),
            )
            .set((
                payments::status.eq("FAILED"),
                payments::failure_reason.eq(reason.clone()),
            ))
            .returning(PaymentEntity::as_returning())
            .get_result(conn)
            .await
            .map_err(|_| AppError::NotFound)?;

            outbox::publish(
                conn,
                "payments.payment_failed".into(),
                PaymentFailedEvent {
                    payment_id: payment.id,
                    failure_reason: payment.failure_reason.clone(),
                },
            )
            .await?;

            Ok::<PaymentEntity, AppError>(payment)
        })
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cardlink_success_payload() {
        let body = br#"{"event":"payment.succeeded","payment_id":"9a0f7a5e-3f7c-4c41-b8aa-2a5c4d9e7f10","reference":"ch_123"}"#;
        let notification = parse_cardlink(body).unwrap();
        assert!(matches!(notification.kind, NotificationKind::Succeeded));
        assert_eq!(notification.reference.as_deref(), Some("ch_123"));
    }

    #[test]
    fn parses_paywave_declined_payload() {
        let body = br#"{"type":"charge.declined","payment":"9a0f7a5e-3f7c-4c41-b8aa-2a5c4d9e7f10","reason":"insufficient funds"}"#;
        let notification = parse_paywave(body).unwrap();
        assert!(matches!(notification.kind, NotificationKind::Failed));
        assert_eq!(notification.reason.as_deref(), Some("insufficient funds"));
    }

    #[test]
    fn rejects_unknown_cardlink_event() {
        let body = br#"{"event":"payment.pending","payment_id":"9a0f7a5e-3f7c-4c41-b8aa-2a5c4d9e7f10"}"#;
        assert!(matches!(
            parse_cardlink(body),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_malformed_payload() {
        assert!(matches!(
            parse_paywave(b"not-json"),
            Err(AppError::BadRequest(_))
        ));
    }
}
