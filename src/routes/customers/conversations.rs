use std::collections::HashMap;

use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware, outbox,
    },
    events::MessageSentEvent,
    models::{ConversationEntity, CreateConversationEntity, CreateMessageEntity, MessageEntity},
    schema::{conversations, messages, providers},
};

const PAGE_SIZE: i64 = 50;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/conversations",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(start_conversation))
            .routes(utoipa_axum::routes!(get_my_conversations))
            .routes(utoipa_axum::routes!(get_messages))
            .routes(utoipa_axum::routes!(send_message))
            .routes(utoipa_axum::routes!(mark_read))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct StartConversationReq {
    provider_id: i32,
}

/// Open (or return the existing) conversation with a provider.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Conversations"],
    security(("bearerAuth" = [])),
    request_body = StartConversationReq,
    responses(
        (status = 200, description = "Started conversation successfully", body = StdResponse<ConversationEntity, String>)
    )
)]
async fn start_conversation(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<StartConversationReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider_exists: i64 = providers::table
        .find(body.provider_id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to check provider")?;

    if provider_exists == 0 {
        return Err(AppError::NotFound);
    }

    diesel::insert_into(conversations::table)
        .values(CreateConversationEntity {
            customer_id,
            provider_id: body.provider_id,
        })
        .on_conflict((conversations::customer_id, conversations::provider_id))
        .do_nothing()
        .execute(conn)
        .await
        .context("Failed to create conversation")?;

    let conversation: ConversationEntity = conversations::table
        .filter(conversations::customer_id.eq(customer_id))
        .filter(conversations::provider_id.eq(body.provider_id))
        .first(conn)
        .await
        .context("Failed to get conversation")?;

    Ok(StdResponse {
        data: Some(conversation),
        message: Some("Started conversation successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct ConversationRes {
    pub conversation: ConversationEntity,
    pub last_message: Option<MessageEntity>,
    pub unread_count: i64,
}

/// List the customer's conversations with unread counts and the latest
/// message in each.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Conversations"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my conversations", body = StdResponse<Vec<ConversationRes>, String>)
    )
)]
async fn get_my_conversations(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let conversations: Vec<ConversationEntity> = conversations::table
        .filter(conversations::customer_id.eq(customer_id))
        .order_by(conversations::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my conversations")?;

    let conversation_ids: Vec<i32> = conversations.iter().map(|conv| conv.id).collect();
    let all_messages: Vec<MessageEntity> = messages::table
        .filter(messages::conversation_id.eq_any(&conversation_ids))
        .order_by(messages::id.asc())
        .get_results(conn)
        .await
        .context("Failed to get messages")?;

    let mut group: HashMap<i32, Vec<MessageEntity>> = HashMap::new();
    for message in all_messages {
        group.entry(message.conversation_id).or_default().push(message);
    }

    let conversations_with_meta: Vec<ConversationRes> = conversations
        .into_iter()
        .map(|conversation| {
            let messages = group.remove(&conversation.id).unwrap_or_default();
            let unread_count = messages
                .iter()
                .filter(|message| message.sender_role == "PROVIDER" && message.read_at.is_none())
                .count() as i64;
            ConversationRes {
                conversation,
                last_message: messages.into_iter().next_back(),
                unread_count,
            }
        })
        .collect();

    Ok(StdResponse {
        data: Some(conversations_with_meta),
        message: Some("Get my conversations successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct MessagesQuery {
    before_id: Option<i32>,
}

/// Page through a conversation's messages, newest first.
#[utoipa::path(
    get,
    path = "/{id}/messages",
    tags = ["Conversations"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID"),
        ("before_id" = Option<i32>, Query, description = "Return messages older than this ID")
    ),
    responses(
        (status = 200, description = "List messages", body = StdResponse<Vec<MessageEntity>, String>)
    )
)]
async fn get_messages(
    Path(id): Path<i32>,
    Query(query): Query<MessagesQuery>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let conversation: ConversationEntity = conversations::table
        .find(id)
        .filter(conversations::customer_id.eq(customer_id))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let mut message_query = messages::table
        .filter(messages::conversation_id.eq(conversation.id))
        .into_boxed();
    if let Some(before_id) = query.before_id {
        message_query = message_query.filter(messages::id.lt(before_id));
    }

    let messages: Vec<MessageEntity> = message_query
        .order_by(messages::id.desc())
        .limit(PAGE_SIZE)
        .get_results(conn)
        .await
        .context("Failed to get messages")?;

    Ok(StdResponse {
        data: Some(messages),
        message: Some("Get messages successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct SendMessageReq {
    body: String,
}

/// Send a message in one of the customer's conversations. The row and its
/// broadcast record commit together.
#[utoipa::path(
    post,
    path = "/{id}/messages",
    tags = ["Conversations"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID")
    ),
    request_body = SendMessageReq,
    responses(
        (status = 200, description = "Sent message successfully", body = StdResponse<MessageEntity, String>)
    )
)]
async fn send_message(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<SendMessageReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if body.body.trim().is_empty() {
        return Err(AppError::BadRequest("Message body must not be empty".into()));
    }

    let conversation: ConversationEntity = conversations::table
        .find(id)
        .filter(conversations::customer_id.eq(customer_id))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let message = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let message: MessageEntity = diesel::insert_into(messages::table)
                    .values(CreateMessageEntity {
                        conversation_id: conversation.id,
                        sender_role: "CUSTOMER".into(),
                        sender_id: customer_id,
                        body: body.body,
                    })
                    .returning(MessageEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create message")?;

                diesel::update(conversations::table.find(conversation.id))
                    .set(conversations::updated_at.eq(diesel::dsl::now))
                    .execute(conn)
                    .await
                    .context("Failed to touch conversation")?;

                outbox::publish(
                    conn,
                    "messaging.message_sent".into(),
                    MessageSentEvent {
                        conversation_id: message.conversation_id,
                        message_id: message.id,
                        sender_role: message.sender_role.clone(),
                        sender_id: message.sender_id,
                        body: message.body.clone(),
                    },
                )
                .await?;

                Ok::<MessageEntity, anyhow::Error>(message)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(message),
        message: Some("Sent message successfully"),
    })
}

/// Mark every provider message in the conversation as read.
#[utoipa::path(
    post,
    path = "/{id}/read",
    tags = ["Conversations"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Conversation ID")
    ),
    responses(
        (status = 200, description = "Marked conversation read", body = StdResponse<i64, String>)
    )
)]
async fn mark_read(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let conversation: ConversationEntity = conversations::table
        .find(id)
        .filter(conversations::customer_id.eq(customer_id))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let marked = diesel::update(
        messages::table
            .filter(messages::conversation_id.eq(conversation.id))
            .filter(messages::sender_role.eq("PROVIDER"))
            .filter(messages::read_at.is_null()),
    )
    .set(messages::read_at.eq(diesel::dsl::now))
    .execute(conn)
    .await
    .context("Failed to mark messages read")?;

    Ok(StdResponse {
        data: Some(marked as i64),
        message: Some("Marked conversation read"),
    })
}
