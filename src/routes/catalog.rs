use std::collections::HashMap;

use anyhow::Context;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, JoinOnDsl, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::{
        EventEntity, PackageEntity, PackageItemEntity, ProductEntity, SeatEntity, ServiceEntity,
    },
    schema::{events, package_items, packages, products, providers, seats, services},
};

/// Public storefront: only active items of approved providers are listed.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/catalog",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(list_services))
            .routes(utoipa_axum::routes!(get_service))
            .routes(utoipa_axum::routes!(list_products))
            .routes(utoipa_axum::routes!(get_product))
            .routes(utoipa_axum::routes!(list_packages))
            .routes(utoipa_axum::routes!(get_package))
            .routes(utoipa_axum::routes!(list_events))
            .routes(utoipa_axum::routes!(get_event_seats)),
    )
}

#[derive(Serialize, ToSchema)]
struct ListedService {
    pub service: ServiceEntity,
    pub provider_name: String,
}

/// Browse bookable services.
#[utoipa::path(
    get,
    path = "/services",
    tags = ["Catalog"],
    responses(
        (status = 200, description = "List services", body = StdResponse<Vec<ListedService>, String>)
    )
)]
async fn list_services(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(ServiceEntity, String)> = services::table
        .inner_join(providers::table)
        .filter(services::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .order_by(services::created_at.desc())
        .select((ServiceEntity::as_select(), providers::display_name))
        .get_results(conn)
        .await
        .context("Failed to list services")?;

    let listed: Vec<ListedService> = rows
        .into_iter()
        .map(|(service, provider_name)| ListedService {
            service,
            provider_name,
        })
        .collect();

    Ok(StdResponse {
        data: Some(listed),
        message: Some("List services successfully"),
    })
}

/// Fetch one listed service.
#[utoipa::path(
    get,
    path = "/services/{id}",
    tags = ["Catalog"],
    params(
        ("id" = i32, Path, description = "Service ID to fetch")
    ),
    responses(
        (status = 200, description = "Get service successfully", body = StdResponse<ListedService, String>)
    )
)]
async fn get_service(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (service, provider_name): (ServiceEntity, String) = services::table
        .inner_join(providers::table)
        .filter(services::id.eq(id))
        .filter(services::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .select((ServiceEntity::as_select(), providers::display_name))
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(ListedService {
            service,
            provider_name,
        }),
        message: Some("Get service successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct ListedProduct {
    pub product: ProductEntity,
    pub provider_name: String,
}

/// Browse purchasable products.
#[utoipa::path(
    get,
    path = "/products",
    tags = ["Catalog"],
    responses(
        (status = 200, description = "List products", body = StdResponse<Vec<ListedProduct>, String>)
    )
)]
async fn list_products(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(ProductEntity, String)> = products::table
        .inner_join(providers::table)
        .filter(products::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .order_by(products::created_at.desc())
        .select((ProductEntity::as_select(), providers::display_name))
        .get_results(conn)
        .await
        .context("Failed to list products")?;

    let listed: Vec<ListedProduct> = rows
        .into_iter()
        .map(|(product, provider_name)| ListedProduct {
            product,
            provider_name,
        })
        .collect();

    Ok(StdResponse {
        data: Some(listed),
        message: Some("List products successfully"),
    })
}

/// Fetch one listed product.
#[utoipa::path(
    get,
    path = "/products/{id}",
    tags = ["Catalog"],
    params(
        ("id" = i32, Path, description = "Product ID to fetch")
    ),
    responses(
        (status = 200, description = "Get product successfully", body = StdResponse<ListedProduct, String>)
    )
)]
async fn get_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (product, provider_name): (ProductEntity, String) = products::table
        .inner_join(providers::table)
        .filter(products::id.eq(id))
        .filter(products::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .select((ProductEntity::as_select(), providers::display_name))
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(ListedProduct {
            product,
            provider_name,
        }),
        message: Some("Get product successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct ListedPackage {
    pub package: PackageEntity,
    pub services: Vec<ServiceEntity>,
}

/// Browse service bundles.
#[utoipa::path(
    get,
    path = "/packages",
    tags = ["Catalog"],
    responses(
        (status = 200, description = "List packages", body = StdResponse<Vec<ListedPackage>, String>)
    )
)]
async fn list_packages(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let packages: Vec<PackageEntity> = packages::table
        .inner_join(providers::table)
        .filter(packages::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .order_by(packages::created_at.desc())
        .select(PackageEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to list packages")?;

    let package_ids: Vec<i32> = packages.iter().map(|package| package.id).collect();
    let items: Vec<(PackageItemEntity, ServiceEntity)> = package_items::table
        .inner_join(services::table.on(services::id.eq(package_items::service_id)))
        .filter(package_items::package_id.eq_any(&package_ids))
        .select((PackageItemEntity::as_select(), ServiceEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get package services")?;

    let mut group: HashMap<i32, Vec<ServiceEntity>> = HashMap::new();
    for (item, service) in items {
        group.entry(item.package_id).or_default().push(service);
    }

    let listed: Vec<ListedPackage> = packages
        .into_iter()
        .map(|package| ListedPackage {
            services: group.remove(&package.id).unwrap_or_default(),
            package,
        })
        .collect();

    Ok(StdResponse {
        data: Some(listed),
        message: Some("List packages successfully"),
    })
}

/// Fetch one listed package with its bundled services.
#[utoipa::path(
    get,
    path = "/packages/{id}",
    tags = ["Catalog"],
    params(
        ("id" = i32, Path, description = "Package ID to fetch")
    ),
    responses(
        (status = 200, description = "Get package successfully", body = StdResponse<ListedPackage, String>)
    )
)]
async fn get_package(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let package: PackageEntity = packages::table
        .inner_join(providers::table)
        .filter(packages::id.eq(id))
        .filter(packages::is_active.eq(true))
        .filter(providers::status.eq("APPROVED"))
        .select(PackageEntity::as_select())
        .first(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let services: Vec<ServiceEntity> = package_items::table
        .inner_join(services::table.on(services::id.eq(package_items::service_id)))
        .filter(package_items::package_id.eq(package.id))
        .select(ServiceEntity::as_select())
        .get_results(conn)
        .await
        .context("Failed to get package services")?;

    Ok(StdResponse {
        data: Some(ListedPackage { package, services }),
        message: Some("Get package successfully"),
    })
}

/// Browse published events.
#[utoipa::path(
    get,
    path = "/events",
    tags = ["Catalog"],
    responses(
        (status = 200, description = "List events", body = StdResponse<Vec<EventEntity>, String>)
    )
)]
async fn list_events(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let events: Vec<EventEntity> = events::table
        .filter(events::status.eq("PUBLISHED"))
        .order_by(events::starts_at.asc())
        .get_results(conn)
        .await
        .context("Failed to list events")?;

    Ok(StdResponse {
        data: Some(events),
        message: Some("List events successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct EventSeatsRes {
    pub event: EventEntity,
    pub seats: Vec<SeatEntity>,
}

/// Seat map for a published event, with per-seat availability.
#[utoipa::path(
    get,
    path = "/events/{id}/seats",
    tags = ["Catalog"],
    params(
        ("id" = i32, Path, description = "Event ID to fetch seats for")
    ),
    responses(
        (status = 200, description = "Get event seats successfully", body = StdResponse<EventSeatsRes, String>)
    )
)]
async fn get_event_seats(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let event: EventEntity = events::table
        .find(id)
        .filter(events::status.eq("PUBLISHED"))
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    let seats: Vec<SeatEntity> = seats::table
        .filter(seats::event_id.eq(event.id))
        .order_by((seats::row_number.asc(), seats::seat_number.asc()))
        .get_results(conn)
        .await
        .context("Failed to get seats")?;

    Ok(StdResponse {
        data: Some(EventSeatsRes { event, seats }),
        message: Some("Get event seats successfully"),
    })
}
