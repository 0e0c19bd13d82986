use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::{
        CreateWishlistEntity, CreateWishlistItemEntity, ProductEntity, ServiceEntity,
        WishlistEntity, WishlistItemEntity,
    },
    schema::{products, services, wishlist_items, wishlists},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/wishlists",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_wishlist))
            .routes(utoipa_axum::routes!(add_item))
            .routes(utoipa_axum::routes!(remove_item)),
    )
}

pub(crate) fn validate_item_type(item_type: &str) -> Result<(), AppError> {
    match item_type {
        "SERVICE" | "PRODUCT" => Ok(()),
        other => Err(AppError::BadRequest(format!(
            "{other} is not a valid wishlist item type"
        ))),
    }
}

#[derive(Serialize, ToSchema)]
pub struct GetWishlistRes {
    pub wishlist: WishlistEntity,
    pub items: Vec<WishlistItemEntity>,
    pub services: Vec<ServiceEntity>,
    pub products: Vec<ProductEntity>,
}

/// Wishlist items with the catalog rows they point at.
pub(crate) async fn wishlist_with_details(
    conn: &mut AsyncPgConnection,
    wishlist: WishlistEntity,
) -> Result<GetWishlistRes, AppError> {
    let items: Vec<WishlistItemEntity> = wishlist_items::table
        .filter(wishlist_items::wishlist_id.eq(wishlist.id))
        .get_results(conn)
        .await
        .context("Failed to get wishlist items")?;

    let service_ids: Vec<i32> = items
        .iter()
        .filter(|item| item.item_type == "SERVICE")
        .map(|item| item.item_id)
        .collect();
    let product_ids: Vec<i32> = items
        .iter()
        .filter(|item| item.item_type == "PRODUCT")
        .map(|item| item.item_id)
        .collect();

    let services: Vec<ServiceEntity> = services::table
        .filter(services::id.eq_any(&service_ids))
        .get_results(conn)
        .await
        .context("Failed to get wishlist services")?;

    let products: Vec<ProductEntity> = products::table
        .filter(products::id.eq_any(&product_ids))
        .get_results(conn)
        .await
        .context("Failed to get wishlist products")?;

    Ok(GetWishlistRes {
        wishlist,
        items,
        services,
        products,
    })
}

#[derive(Deserialize, ToSchema)]
struct SessionQuery {
    session_key: String,
}

/// Fetch a guest wishlist with item details.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Wishlists"],
    params(
        ("session_key" = String, Query, description = "Guest session key owning the wishlist")
    ),
    responses(
        (status = 200, description = "Get wishlist successfully", body = StdResponse<GetWishlistRes, String>)
    )
)]
async fn get_wishlist(
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let wishlist: WishlistEntity = wishlists::table
        .filter(wishlists::session_key.eq(&query.session_key))
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let res = wishlist_with_details(conn, wishlist).await?;

    Ok(StdResponse {
        data: Some(res),
        message: Some("Get wishlist successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AddItemReq {
    session_key: String,
    item_type: String,
    item_id: i32,
}

/// Save an item to a guest wishlist, creating the wishlist on first use.
/// Adding the same item twice is a no-op.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Wishlists"],
    request_body = AddItemReq,
    responses(
        (status = 200, description = "Added wishlist item successfully", body = StdResponse<WishlistItemEntity, String>)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Json(body): Json<AddItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    validate_item_type(&body.item_type)?;

    let existing: Option<WishlistEntity> = wishlists::table
        .filter(wishlists::session_key.eq(&body.session_key))
        .first(conn)
        .await
        .optional()
        .context("Failed to get wishlist")?;

    let wishlist = match existing {
        Some(wishlist) => wishlist,
        None => diesel::insert_into(wishlists::table)
            .values(CreateWishlistEntity {
                customer_id: None,
                session_key: Some(body.session_key.clone()),
            })
            .returning(WishlistEntity::as_returning())
            .get_result(conn)
            .await
            .context("Failed to create wishlist")?,
    };

    let item: WishlistItemEntity = diesel::insert_into(wishlist_items::table)
        .values(CreateWishlistItemEntity {
            wishlist_id: wishlist.id,
            item_type: body.item_type,
            item_id: body.item_id,
        })
        .on_conflict((
            wishlist_items::wishlist_id,
            wishlist_items::item_type,
            wishlist_items::item_id,
        ))
        .do_update()
        .set(wishlist_items::item_id.eq(body.item_id))
        .returning(WishlistItemEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to add wishlist item")?;

    Ok(StdResponse {
        data: Some(item),
        message: Some("Added wishlist item successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct RemoveItemQuery {
    session_key: String,
    item_type: String,
    item_id: i32,
}

/// Remove an item from a guest wishlist.
#[utoipa::path(
    delete,
    path = "/items",
    tags = ["Wishlists"],
    params(
        ("session_key" = String, Query, description = "Guest session key owning the wishlist"),
        ("item_type" = String, Query, description = "SERVICE or PRODUCT"),
        ("item_id" = i32, Query, description = "Catalog item ID to remove")
    ),
    responses(
        (status = 200, description = "Removed wishlist item successfully", body = StdResponse<WishlistItemEntity, String>)
    )
)]
async fn remove_item(
    Query(query): Query<RemoveItemQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let wishlist: WishlistEntity = wishlists::table
        .filter(wishlists::session_key.eq(&query.session_key))
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let removed: WishlistItemEntity = diesel::delete(
        wishlist_items::table
            .filter(wishlist_items::wishlist_id.eq(wishlist.id))
            .filter(wishlist_items::item_type.eq(&query.item_type))
            .filter(wishlist_items::item_id.eq(query.item_id)),
    )
    .returning(WishlistItemEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(removed),
        message: Some("Removed wishlist item successfully"),
    })
}
