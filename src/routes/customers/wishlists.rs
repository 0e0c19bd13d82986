use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateWishlistEntity, CreateWishlistItemEntity, WishlistEntity, WishlistItemEntity},
    routes::guests::wishlists::{GetWishlistRes, validate_item_type, wishlist_with_details},
    schema::{wishlist_items, wishlists},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/wishlists",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_wishlist))
            .routes(utoipa_axum::routes!(add_item))
            .routes(utoipa_axum::routes!(remove_item))
            .routes(utoipa_axum::routes!(merge_wishlist))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

async fn find_or_create_wishlist(
    conn: &mut AsyncPgConnection,
    customer_id: i32,
) -> Result<WishlistEntity, AppError> {
    let existing: Option<WishlistEntity> = wishlists::table
        .filter(wishlists::customer_id.eq(customer_id))
        .first(conn)
        .await
        .optional()
        .context("Failed to get customer wishlist")?;

    match existing {
        Some(wishlist) => Ok(wishlist),
        None => {
            let wishlist = diesel::insert_into(wishlists::table)
                .values(CreateWishlistEntity {
                    customer_id: Some(customer_id),
                    session_key: None,
                })
                .returning(WishlistEntity::as_returning())
                .get_result(conn)
                .await
                .context("Failed to create customer wishlist")?;
            Ok(wishlist)
        }
    }
}

/// Fetch the authenticated customer's wishlist with item details.
#[utoipa::path(
    get,
    path = "/my-wishlist",
    tags = ["Wishlists"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get my wishlist successfully", body = StdResponse<GetWishlistRes, String>)
    )
)]
async fn get_my_wishlist(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let wishlist = find_or_create_wishlist(conn, customer_id).await?;
    let res = wishlist_with_details(conn, wishlist).await?;

    Ok(StdResponse {
        data: Some(res),
        message: Some("Get my wishlist successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AddItemReq {
    item_type: String,
    item_id: i32,
}

/// Save an item to the customer's wishlist. Adding the same item twice is
/// a no-op.
#[utoipa::path(
    post,
    path = "/items",
    tags = ["Wishlists"],
    security(("bearerAuth" = [])),
    request_body = AddItemReq,
    responses(
        (status = 200, description = "Added wishlist item successfully", body = StdResponse<WishlistItemEntity, String>)
    )
)]
async fn add_item(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<AddItemReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    validate_item_type(&body.item_type)?;

    let wishlist = find_or_create_wishlist(conn, customer_id).await?;

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

/// Remove an item from the customer's wishlist.
#[utoipa::path(
    delete,
    path = "/items/{item_type}/{item_id}",
    tags = ["Wishlists"],
    security(("bearerAuth" = [])),
    params(
        ("item_type" = String, Path, description = "SERVICE or PRODUCT"),
        ("item_id" = i32, Path, description = "Catalog item ID to remove")
    ),
    responses(
        (status = 200, description = "Removed wishlist item successfully", body = StdResponse<WishlistItemEntity, String>)
    )
)]
async fn remove_item(
    Path((item_type, item_id)): Path<(String, i32)>,
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let wishlist: WishlistEntity = wishlists::table
        .filter(wishlists::customer_id.eq(customer_id))
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let removed: WishlistItemEntity = diesel::delete(
        wishlist_items::table
            .filter(wishlist_items::wishlist_id.eq(wishlist.id))
            .filter(wishlist_items::item_type.eq(&item_type))
            .filter(wishlist_items::item_id.eq(item_id)),
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

#[derive(Deserialize, ToSchema)]
struct MergeWishlistReq {
    session_key: String,
}

/// Fold a guest wishlist into the customer's at login. Duplicate items
/// collapse; the guest wishlist is deleted afterwards.
#[utoipa::path(
    post,
    path = "/merge",
    tags = ["Wishlists"],
    security(("bearerAuth" = [])),
    request_body = MergeWishlistReq,
    responses(
        (status = 200, description = "Merged wishlist successfully", body = StdResponse<GetWishlistRes, String>)
    )
)]
async fn merge_wishlist(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<MergeWishlistReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let wishlist = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let wishlist = find_or_create_wishlist(conn, customer_id).await?;

                let guest_wishlist: Option<WishlistEntity> = wishlists::table
                    .filter(wishlists::session_key.eq(&body.session_key))
                    .first(conn)
                    .await
                    .optional()
                    .context("Failed to get guest wishlist")?;

                if let Some(guest_wishlist) = guest_wishlist {
                    let guest_items: Vec<WishlistItemEntity> = wishlist_items::table
                        .filter(wishlist_items::wishlist_id.eq(guest_wishlist.id))
                        .get_results(conn)
                        .await
                        .context("Failed to get guest wishlist items")?;

                    for item in guest_items {
                        diesel::insert_into(wishlist_items::table)
                            .values(CreateWishlistItemEntity {
                                wishlist_id: wishlist.id,
                                item_type: item.item_type,
                                item_id: item.item_id,
                            })
                            .on_conflict((
                                wishlist_items::wishlist_id,
                                wishlist_items::item_type,
                                wishlist_items::item_id,
                            ))
                            .do_nothing()
                            .execute(conn)
                            .await
                            .context("Failed to merge wishlist item")?;
                    }

                    diesel::delete(wishlists::table.find(guest_wishlist.id))
                        .execute(conn)
                        .await
                        .context("Failed to delete guest wishlist")?;
                }

                Ok::<WishlistEntity, AppError>(wishlist)
            })
        })
        .await?;

    let res = wishlist_with_details(conn, wishlist).await?;

    Ok(StdResponse {
        data: Some(res),
        message: Some("Merged wishlist successfully"),
    })
}
