use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
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
    models::{CartEntity, CartItemEntity, CreateCartEntity},
    routes::guests::carts::{GetCartRes, cart_total, product_unit_prices},
    schema::{cart_items, carts},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/carts",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_my_cart))
            .routes(utoipa_axum::routes!(merge_cart))
            .route_layer(axum::middleware::from_fn(
                middleware::customers_authorization,
            )),
    )
}

async fn find_or_create_cart(
    conn: &mut AsyncPgConnection,
    customer_id: i32,
) -> Result<CartEntity, AppError> {
    let existing: Option<CartEntity> = carts::table
        .filter(carts::customer_id.eq(customer_id))
        .first(conn)
        .await
        .optional()
        .context("Failed to get customer cart")?;

    match existing {
        Some(cart) => Ok(cart),
        None => {
            let cart = diesel::insert_into(carts::table)
                .values(CreateCartEntity {
                    customer_id: Some(customer_id),
                    session_key: None,
                })
                .returning(CartEntity::as_returning())
                .get_result(conn)
                .await
                .context("Failed to create customer cart")?;
            Ok(cart)
        }
    }
}

/// Fetch the authenticated customer's cart, creating an empty one on first
/// use.
#[utoipa::path(
    get,
    path = "/my-cart",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "Get my cart successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn get_my_cart(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let cart = find_or_create_cart(conn, customer_id).await?;

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
        message: Some("Get my cart successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct MergeCartReq {
    session_key: String,
}

/// Fold a guest cart into the customer's cart at login. Quantities add up
/// for products present in both; the guest cart is deleted afterwards.
#[utoipa::path(
    post,
    path = "/merge",
    tags = ["Carts"],
    security(("bearerAuth" = [])),
    request_body = MergeCartReq,
    responses(
        (status = 200, description = "Merged cart successfully", body = StdResponse<GetCartRes, String>)
    )
)]
async fn merge_cart(
    State(state): State<AppState>,
    Extension(customer_id): Extension<i32>,
    Json(body): Json<MergeCartReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (cart, cart_items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let cart = find_or_create_cart(conn, customer_id).await?;

                let guest_cart: Option<CartEntity> = carts::table
                    .filter(carts::session_key.eq(&body.session_key))
                    .first(conn)
                    .await
                    .optional()
                    .context("Failed to get guest cart")?;

                if let Some(guest_cart) = guest_cart {
                    let guest_items: Vec<CartItemEntity> = cart_items::table
                        .filter(cart_items::cart_id.eq(guest_cart.id))
                        .get_results(conn)
                        .await
                        .context("Failed to get guest cart items")?;

                    for item in guest_items {
                        diesel::insert_into(cart_items::table)
                            .values((
                                cart_items::cart_id.eq(cart.id),
                                cart_items::product_id.eq(item.product_id),
                                cart_items::quantity.eq(item.quantity),
                            ))
                            .on_conflict((cart_items::cart_id, cart_items::product_id))
                            .do_update()
                            .set(
                                cart_items::quantity
                                    .eq(cart_items::quantity + item.quantity),
                            )
                            .execute(conn)
                            .await
                            .context("Failed to merge cart item")?;
                    }

                    diesel::delete(carts::table.find(guest_cart.id))
                        .execute(conn)
                        .await
                        .context("Failed to delete guest cart")?;
                }

                let merged_items: Vec<CartItemEntity> = cart_items::table
                    .filter(cart_items::cart_id.eq(cart.id))
                    .get_results(conn)
                    .await
                    .context("Failed to get merged cart items")?;

                Ok::<(CartEntity, Vec<CartItemEntity>), AppError>((cart, merged_items))
            })
        })
        .await?;

    let product_ids = cart_items.iter().map(|item| item.product_id).collect();
    let unit_prices = product_unit_prices(conn, product_ids).await?;
    let total_price = cart_total(&cart_items, &unit_prices);

    Ok(StdResponse {
        data: Some(GetCartRes {
            cart,
            cart_items,
            total_price,
        }),
        message: Some("Merged cart successfully"),
    })
}
