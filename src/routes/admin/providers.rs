use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::ProviderEntity,
    schema::providers,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/admin/providers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_providers))
            .routes(utoipa_axum::routes!(approve_provider))
            .routes(utoipa_axum::routes!(suspend_provider))
            .routes(utoipa_axum::routes!(reinstate_provider))
            .route_layer(axum::middleware::from_fn(middleware::admins_authorization)),
    )
}

#[derive(Deserialize, ToSchema)]
struct ListProvidersQuery {
    status: Option<String>,
}

/// List provider accounts, optionally filtered by status.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("status" = Option<String>, Query, description = "Filter by provider status")
    ),
    responses(
        (status = 200, description = "List providers", body = StdResponse<Vec<ProviderEntity>, String>)
    )
)]
async fn list_providers(
    Query(query): Query<ListProvidersQuery>,
    State(state): State<AppState>,
    Extension(_admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut provider_query = providers::table.into_boxed();
    if let Some(status) = query.status {
        provider_query = provider_query.filter(providers::status.eq(status));
    }

    let providers: Vec<ProviderEntity> = provider_query
        .order_by(providers::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to list providers")?;

    Ok(StdResponse {
        data: Some(providers),
        message: Some("List providers successfully"),
    })
}

/// Approve a pending provider account.
#[utoipa::path(
    patch,
    path = "/{id}/approve",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Provider ID to approve")
    ),
    responses(
        (status = 200, description = "Approved provider successfully", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn approve_provider(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ProviderEntity = diesel::update(
        providers::table
            .find(id)
            .filter(providers::status.eq("PENDING")),
    )
    .set((
        providers::status.eq("APPROVED"),
        providers::approved_at.eq(Utc::now()),
    ))
    .returning(ProviderEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::BadRequest("Provider is not pending approval".into()))?;

    info!("Admin #{admin_id} approved provider #{id}");

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Approved provider successfully"),
    })
}

/// Suspend an approved provider account.
#[utoipa::path(
    patch,
    path = "/{id}/suspend",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Provider ID to suspend")
    ),
    responses(
        (status = 200, description = "Suspended provider successfully", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn suspend_provider(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ProviderEntity = diesel::update(
        providers::table
            .find(id)
            .filter(providers::status.eq("APPROVED")),
    )
    .set(providers::status.eq("SUSPENDED"))
    .returning(ProviderEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::BadRequest("Provider is not approved".into()))?;

    info!("Admin #{admin_id} suspended provider #{id}");

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Suspended provider successfully"),
    })
}

/// Reinstate a suspended provider account.
#[utoipa::path(
    patch,
    path = "/{id}/reinstate",
    tags = ["Admin"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Provider ID to reinstate")
    ),
    responses(
        (status = 200, description = "Reinstated provider successfully", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn reinstate_provider(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(admin_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ProviderEntity = diesel::update(
        providers::table
            .find(id)
            .filter(providers::status.eq("SUSPENDED")),
    )
    .set(providers::status.eq("APPROVED"))
    .returning(ProviderEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::BadRequest("Provider is not suspended".into()))?;

    info!("Admin #{admin_id} reinstated provider #{id}");

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Reinstated provider successfully"),
    })
}
