use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateProviderEntity, ProviderEntity, UpdateProviderEntity},
    schema::providers,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    let register = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(register_provider))
        .route_layer(axum::middleware::from_fn(
            middleware::customers_authorization,
        ));

    let profile = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(get_my_profile))
        .routes(utoipa_axum::routes!(update_my_profile))
        .route_layer(axum::middleware::from_fn(
            middleware::providers_authorization,
        ));

    utoipa_axum::router::OpenApiRouter::new()
        .nest("/providers/register", register)
        .nest("/providers/profile", profile)
}

#[derive(Deserialize, ToSchema)]
struct RegisterProviderReq {
    display_name: String,
    bio: Option<String>,
    contact_email: String,
}

/// Register the authenticated user as a service provider. The account
/// starts PENDING until an administrator approves it.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Providers"],
    security(("bearerAuth" = [])),
    request_body = RegisterProviderReq,
    responses(
        (status = 200, description = "Registered provider successfully", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn register_provider(
    State(state): State<AppState>,
    Extension(user_id): Extension<i32>,
    Json(body): Json<RegisterProviderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let already_registered: i64 = providers::table
        .filter(providers::user_id.eq(user_id))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check provider registration")?;

    if already_registered > 0 {
        return Err(AppError::BadRequest(
            "User is already registered as a provider".into(),
        ));
    }

    let provider: ProviderEntity = diesel::insert_into(providers::table)
        .values(CreateProviderEntity {
            user_id,
            display_name: body.display_name,
            bio: body.bio,
            contact_email: body.contact_email,
            status: "PENDING".into(),
        })
        .returning(ProviderEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to register provider")?;

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Registered provider successfully"),
    })
}

/// Fetch the authenticated provider's profile.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Providers"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get provider profile", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn get_my_profile(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ProviderEntity = providers::table
        .find(provider_id)
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Get provider profile successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateProviderReq {
    display_name: Option<String>,
    bio: Option<String>,
    contact_email: Option<String>,
}

/// Update the authenticated provider's profile fields.
#[utoipa::path(
    patch,
    path = "/",
    tags = ["Providers"],
    security(("bearerAuth" = [])),
    request_body = UpdateProviderReq,
    responses(
        (status = 200, description = "Updated provider profile", body = StdResponse<ProviderEntity, String>)
    )
)]
async fn update_my_profile(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<UpdateProviderReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let provider: ProviderEntity = diesel::update(providers::table.find(provider_id))
        .set(UpdateProviderEntity {
            display_name: body.display_name,
            bio: body.bio,
            contact_email: body.contact_email,
        })
        .returning(ProviderEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(provider),
        message: Some("Updated provider profile successfully"),
    })
}
