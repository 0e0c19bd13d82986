use std::time::Duration;

use anyhow::{Context, Result};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde::Serialize;
use tracing::{error, info};

use crate::core::app_state::AppState;
use crate::models::OutboxEntryEntity;
use crate::schema::outbox;

/// Record an event inside the caller's transaction. The relay picks it up
/// once the transaction commits, so a rolled-back write never broadcasts.
pub async fn publish<E: Serialize>(
    conn: &mut AsyncPgConnection,
    event_type: String,
    event: E,
) -> Result<()> {
    let payload = serde_json::to_string(&event).context("Failed to serialize outbox event")?;

    diesel::insert_into(outbox::table)
        .values((
            outbox::event_type.eq(event_type),
            outbox::payload.eq(payload),
            outbox::status.eq("PENDING"),
        ))
        .execute(conn)
        .await
        .context("Failed to insert outbox entry")?;

    Ok(())
}

/// Broadcast relay: drains PENDING outbox rows to the topic exchange. The
/// event type doubles as the routing key. Rows stay PENDING on broker
/// failure and are retried on the next tick.
pub async fn run_relay(state: AppState) {
    loop {
        match connect(&state).await {
            Ok(channel) => {
                if let Err(err) = drain_loop(&state, &channel).await {
                    error!("Outbox relay lost its channel: {err:#}");
                }
            }
            Err(err) => error!("Outbox relay failed to connect to broker: {err:#}"),
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
}

async fn connect(state: &AppState) -> Result<Channel> {
    let conn = Connection::connect(&state.config.amqp.url, ConnectionProperties::default())
        .await
        .context("Failed to connect to AMQP broker")?;
    let channel = conn
        .create_channel()
        .await
        .context("Failed to create AMQP channel")?;
    channel
        .exchange_declare(
            &state.config.amqp.exchange,
            ExchangeKind::Topic,
            ExchangeDeclareOptions::default(),
            FieldTable::default(),
        )
        .await
        .context("Failed to declare exchange")?;
    Ok(channel)
}

async fn drain_loop(state: &AppState, channel: &Channel) -> Result<()> {
    loop {
        let conn = &mut state
            .db_pool
            .get()
            .await
            .context("Failed to obtain a DB connection pool")?;

        let pending: Vec<OutboxEntryEntity> = outbox::table
            .filter(outbox::status.eq("PENDING"))
            .order_by(outbox::id.asc())
            .limit(50)
            .select(OutboxEntryEntity::as_select())
            .get_results(conn)
            .await
            .context("Failed to load pending outbox entries")?;

        for entry in pending {
            channel
                .basic_publish(
                    &state.config.amqp.exchange,
                    &entry.event_type,
                    BasicPublishOptions::default(),
                    entry.payload.as_bytes(),
                    BasicProperties::default(),
                )
                .await
                .context("Failed to publish outbox entry")?
                .await
                .context("Broker rejected outbox entry")?;

            diesel::update(outbox::table.find(entry.id))
                .set((
                    outbox::status.eq("PUBLISHED"),
                    outbox::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)
                .await
                .context("Failed to mark outbox entry published")?;

            info!("Broadcast {} (outbox #{})", entry.event_type, entry.id);
        }

        tokio::time::sleep(Duration::from_secs(1)).await;
    }
}
