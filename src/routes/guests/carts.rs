use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, QueryResult, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::{CartEntity, CartItemEntity, CreateCartEntity, CreateCartItemEntity},
    schema::{cart_items, carts, products},
};

/// Guest carts are keyed by an opaque session key minted by the storefront;
/// the key doubles as the ownership check until the cart is merged into a
/// customer account at login.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_cart))
            .routes(utoipa_axum::routes!(get_cart))
            .routes(utoipa_axum::routes!(update_cart))
            .routes(utoipa_axum::routes!(delete_cart)),
    )
}

/// Current unit prices for the given products, for line totals.
pub(crate) async fn product_unit_prices(
    conn: &mut AsyncPgConnection,
    ids: Vec<i32>,
) -> Result<HashMap<i32, f32>> {
    let prices: Vec<(i32, f32)> = products::table
        .filter(products::id.eq_any(&ids))
        .select((products::id, products::price))
        .get_results(conn)
        .await
        .context("Failed to get product prices")?;

    Ok(prices.into_iter().collect())
}

pub(crate) fn cart_total(items: &[CartItemEntity], unit_prices: &HashMap<i32, f32>) -> f32 {
    items
        .iter()
        .map(|item| {
            let unit_price = unit_prices.get(&item.product_id).copied().unwrap_or(0.0);
            item.quantity as f32 * unit_price
        })
        .sum()
}

#[derive(Deserialize, ToSchema)]
struct SessionQuery {
    session_key: String,
}

#[derive(Deserialize, ToSchema)]
struct CreateCartReq {
    session_key: String,
    cart_items: Vec<CreateCartReqCartItem>,
}

#[derive(Deserialize, ToSchema)]
struct CreateCartReqCartItem {
    product_id: i32,
    quantity: i32,
}

#[derive(Serialize, ToSchema)]
struct CreateCartRes {
    cart: CartEntity,
    cart_items: Vec<CartItemEntity>,
}

/// Create a guest cart for the given session key.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Carts"],
    request_body = CreateCartReq,
    responses(
        (status = 200, description = "Created cart successfully", body = StdResponse<CreateCartRes, String>)
    )
)]
async fn create_cart(
    State(state): State<AppState>,
    Json(body): Json<CreateCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, cart_items) = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let cart: CartEntity = diesel::insert_into(carts::table)
                    .values(CreateCartEntity {
                        customer_id: None,
                        session_key: Some(body.session_key),
                    })
                    .returning(CartEntity::as_returning())
                    .get_result(tx)
                    .await
                    .context("Failed to create cart")?;

                let cart_items: Vec<CreateCartItemEntity> = body
                    .cart_items
                    .into_iter()
                    .filter(|item| item.quantity > 0)
                    .map(|item| CreateCartItemEntity {
                        cart_id: cart.id,
                        product_id: item.product_id,
                        quantity: item.quantity,
                    })
                    .collect();

                let cart_items = diesel::insert_into(cart_items::table)
                    .values(cart_items)
                    .returning(CartItemEntity::as_returning())
                    .get_results(tx)
                    .await
                    .context("Failed to create cart items")?;

                Ok::<(CartEntity, Vec<CartItemEntity>), anyhow::Error>((cart, cart_items))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(CreateCartRes { cart, cart_items }),
        message: Some("Created cart successfully"),
    })
}

#[derive(Serialize, ToSchema)]
pub struct GetCartRes {
    pub cart: CartEntity,
    pub cart_items: Vec<CartItemEntity>,
    pub total_price: f32,
}

/// Fetch a guest cart with line items and the current total.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Carts"],
    params(
        ("id" = i32, Path, description = "Cart ID to fetch"),
        ("session_key" = String, Query, description = "Guest session key owning the cart")
    ),
    responses(
        (status = 200, description = "Get cart successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn get_cart(
    Path(id): Path<i32>,
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart: QueryResult<CartEntity> = carts::table
        .find(id)
        .filter(carts::session_key.eq(&query.session_key))
        .get_result(conn)
        .await;

    let cart = match cart {
        Ok(cart) => cart,
        Err(DieselError::NotFound) => return Err(AppError::NotFound),
        Err(err) => return Err(AppError::Other(err.into())),
    };

    let cart_items: Vec<CartItemEntity> = cart_items::table
        .filter(cart_items::cart_id.eq(cart.id))
        .get_results(conn)
        .await
        .context("Failed to get cart items")?;

    let product_ids = cart_items.iter().map(|item| item.product_id).collect();
    let unit_prices = product_unit_prices(conn, product_ids).await?;
    let total_price = cart_total(&cart_items, &unit_prices);

    Ok(StdResponse {
        data: Some(GetCartRes {
            cart,
            cart_items,
            total_price,
        }),
        message: Some("Get cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateCartReq {
    session_key: String,
    cart_items: Vec<CreateCartReqCartItem>,
}

#[derive(Serialize, ToSchema)]
struct UpdateCartRes {
    deleted_items: Vec<CartItemEntity>,
    updated_items: Vec<CartItemEntity>,
    updated_cart: CartEntity,
}

/// Replace the cart's lines: absent products are pruned, present ones are
/// upserted with the new quantity.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Carts"],
    params(
        ("id" = i32, Path, description = "Cart ID to update")
    ),
    request_body = UpdateCartReq,
    responses(
        (status = 200, description = "Updated cart successfully", body = StdResponse<UpdateCartRes, String>)
    )
)]
async fn update_cart(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let result = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart: i64 = carts::table
                    .find(id)
                    .filter(carts::session_key.eq(&body.session_key))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to get count")?;

                if cart == 0 {
                    return Err(AppError::NotFound);
                }

                let new_product_ids: Vec<i32> =
                    body.cart_items.iter().map(|item| item.product_id).collect();

                let deleted_items: Vec<CartItemEntity> = diesel::delete(
                    cart_items::table
                        .filter(cart_items::cart_id.eq(id))
                        .filter(cart_items::product_id.ne_all(&new_product_ids)),
                )
                .returning(CartItemEntity::as_returning())
                .get_results(conn)
                .await
                .context("Failed to delete cart items")?;

                for item in &body.cart_items {
                    diesel::insert_into(cart_items::table)
                        .values((
                            cart_items::cart_id.eq(id),
                            cart_items::product_id.eq(item.product_id),
                            cart_items::quantity.eq(item.quantity),
                        ))
                        .on_conflict((cart_items::cart_id, cart_items::product_id))
                        .do_update()
                        .set(cart_items::quantity.eq(item.quantity))
                        .execute(conn)
                        .await
                        .context("Failed to upsert cart item")?;
                }

                let updated_cart = diesel::update(carts::table.find(id))
                    .set(carts::updated_at.eq(diesel::dsl::now))
                    .returning(CartEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to update cart timestamp")?;

                let updated_items: Vec<CartItemEntity> = cart_items::table
                    .filter(cart_items::cart_id.eq(id))
                    .get_results(conn)
                    .await
                    .context("Failed to get updated items")?;

                Ok::<(Vec<CartItemEntity>, Vec<CartItemEntity>, CartEntity), AppError>((
                    deleted_items,
                    updated_items,
                    updated_cart,
                ))
            })
        })
        .await;

    match result {
        Ok((deleted_items, updated_items, updated_cart)) => Ok(StdResponse {
            data: Some(UpdateCartRes {
                deleted_items,
                updated_items,
                updated_cart,
            }),
            message: Some("Updated cart successfully"),
        }),
        Err(err) => Err(err),
    }
}

/// Delete a guest cart and its items.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Carts"],
    params(
        ("id" = i32, Path, description = "Cart ID to delete"),
        ("session_key" = String, Query, description = "Guest session key owning the cart")
    ),
    responses(
        (status = 200, description = "Deleted cart successfully", body = StdResponse<CartEntity, String>)
    )
)]
async fn delete_cart(
    Path(id): Path<i32>,
    Query(query): Query<SessionQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart: QueryResult<CartEntity> = diesel::delete(carts::table)
        .filter(carts::id.eq(id))
        .filter(carts::session_key.eq(&query.session_key))
        .returning(CartEntity::as_returning())
        .get_result(conn)
        .await;

    match cart {
        Ok(cart) => Ok(StdResponse {
            data: Some(cart),
            message: Some("Deleted cart successfully"),
        }),
        Err(DieselError::NotFound) => Err(AppError::NotFound),
        Err(err) => Err(AppError::Other(err.into())),
    }
}
