use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{
        CreatePackageEntity, CreatePackageItemEntity, CreateProductEntity, CreateServiceEntity,
        PackageEntity, PackageItemEntity, ProductEntity, ServiceEntity, UpdateProductEntity,
        UpdateServiceEntity,
    },
    pricing,
    schema::{package_items, packages, products, providers, services},
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/providers",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_service))
            .routes(utoipa_axum::routes!(get_my_services))
            .routes(utoipa_axum::routes!(update_service))
            .routes(utoipa_axum::routes!(deactivate_service))
            .routes(utoipa_axum::routes!(create_product))
            .routes(utoipa_axum::routes!(get_my_products))
            .routes(utoipa_axum::routes!(update_product))
            .routes(utoipa_axum::routes!(deactivate_product))
            .routes(utoipa_axum::routes!(create_package))
            .routes(utoipa_axum::routes!(get_my_packages))
            .routes(utoipa_axum::routes!(deactivate_package))
            .route_layer(axum::middleware::from_fn(
                middleware::providers_authorization,
            )),
    )
}

/// Only APPROVED providers may publish catalog items.
async fn require_approved_provider(
    conn: &mut AsyncPgConnection,
    provider_id: i32,
) -> Result<(), AppError> {
    let approved: i64 = providers::table
        .find(provider_id)
        .filter(providers::status.eq("APPROVED"))
        .count()
        .get_result(conn)
        .await
        .context("Failed to check provider status")?;

    if approved == 0 {
        return Err(AppError::ForbiddenResource(
            "Provider account is not approved".into(),
        ));
    }
    Ok(())
}

// Services

#[derive(Deserialize, ToSchema)]
struct CreateServiceReq {
    name: String,
    description: Option<String>,
    pricing_type: String,
    unit_price: f32,
    deposit_percent: Option<i32>,
}

/// Publish a new service.
#[utoipa::path(
    post,
    path = "/services",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    request_body = CreateServiceReq,
    responses(
        (status = 200, description = "Created service successfully", body = StdResponse<ServiceEntity, String>)
    )
)]
async fn create_service(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<CreateServiceReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    require_approved_provider(conn, provider_id).await?;

    match body.pricing_type.as_str() {
        pricing::PRICING_HOURLY | pricing::PRICING_DAILY | pricing::PRICING_FIXED => {}
        other => {
            return Err(AppError::BadRequest(format!(
                "{other} is not a valid pricing type"
            )));
        }
    }

    if let Some(percent) = body.deposit_percent {
        if !(1..=100).contains(&percent) {
            return Err(AppError::BadRequest(
                "Deposit percent must be between 1 and 100".into(),
            ));
        }
    }

    let service: ServiceEntity = diesel::insert_into(services::table)
        .values(CreateServiceEntity {
            provider_id,
            name: body.name,
            description: body.description,
            pricing_type: body.pricing_type,
            unit_price: body.unit_price,
            deposit_percent: body.deposit_percent,
        })
        .returning(ServiceEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create service")?;

    Ok(StdResponse {
        data: Some(service),
        message: Some("Created service successfully"),
    })
}

/// List the provider's services, active or not.
#[utoipa::path(
    get,
    path = "/services",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my services", body = StdResponse<Vec<ServiceEntity>, String>)
    )
)]
async fn get_my_services(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let services: Vec<ServiceEntity> = services::table
        .filter(services::provider_id.eq(provider_id))
        .order_by(services::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my services")?;

    Ok(StdResponse {
        data: Some(services),
        message: Some("Get my services successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateServiceReq {
    name: Option<String>,
    description: Option<String>,
    unit_price: Option<f32>,
    deposit_percent: Option<i32>,
}

/// Update one of the provider's services.
#[utoipa::path(
    patch,
    path = "/services/{id}",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Service ID to update")
    ),
    request_body = UpdateServiceReq,
    responses(
        (status = 200, description = "Updated service successfully", body = StdResponse<ServiceEntity, String>)
    )
)]
async fn update_service(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<UpdateServiceReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if let Some(percent) = body.deposit_percent {
        if !(1..=100).contains(&percent) {
            return Err(AppError::BadRequest(
                "Deposit percent must be between 1 and 100".into(),
            ));
        }
    }

    let service: ServiceEntity = diesel::update(
        services::table
            .find(id)
            .filter(services::provider_id.eq(provider_id)),
    )
    .set(UpdateServiceEntity {
        name: body.name,
        description: body.description,
        unit_price: body.unit_price,
        deposit_percent: body.deposit_percent,
    })
    .returning(ServiceEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(service),
        message: Some("Updated service successfully"),
    })
}

/// Take a service off the public catalog. Existing bookings are untouched.
#[utoipa::path(
    delete,
    path = "/services/{id}",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Service ID to deactivate")
    ),
    responses(
        (status = 200, description = "Deactivated service successfully", body = StdResponse<ServiceEntity, String>)
    )
)]
async fn deactivate_service(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let service: ServiceEntity = diesel::update(
        services::table
            .find(id)
            .filter(services::provider_id.eq(provider_id)),
    )
    .set(services::is_active.eq(false))
    .returning(ServiceEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(service),
        message: Some("Deactivated service successfully"),
    })
}

// Products

#[derive(Deserialize, ToSchema)]
struct CreateProductReq {
    name: String,
    description: Option<String>,
    price: f32,
    stock_quantity: i32,
}

/// Publish a new product.
#[utoipa::path(
    post,
    path = "/products",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    request_body = CreateProductReq,
    responses(
        (status = 200, description = "Created product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn create_product(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<CreateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    require_approved_provider(conn, provider_id).await?;

    if body.stock_quantity < 0 {
        return Err(AppError::BadRequest(
            "Stock quantity must not be negative".into(),
        ));
    }

    let product: ProductEntity = diesel::insert_into(products::table)
        .values(CreateProductEntity {
            provider_id,
            name: body.name,
            description: body.description,
            price: body.price,
            stock_quantity: body.stock_quantity,
        })
        .returning(ProductEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create product")?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Created product successfully"),
    })
}

/// List the provider's products, active or not.
#[utoipa::path(
    get,
    path = "/products",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my products", body = StdResponse<Vec<ProductEntity>, String>)
    )
)]
async fn get_my_products(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let products: Vec<ProductEntity> = products::table
        .filter(products::provider_id.eq(provider_id))
        .order_by(products::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my products")?;

    Ok(StdResponse {
        data: Some(products),
        message: Some("Get my products successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct UpdateProductReq {
    name: Option<String>,
    description: Option<String>,
    price: Option<f32>,
    stock_quantity: Option<i32>,
}

/// Update one of the provider's products.
#[utoipa::path(
    patch,
    path = "/products/{id}",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to update")
    ),
    request_body = UpdateProductReq,
    responses(
        (status = 200, description = "Updated product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn update_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<UpdateProductReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    if matches!(body.stock_quantity, Some(quantity) if quantity < 0) {
        return Err(AppError::BadRequest(
            "Stock quantity must not be negative".into(),
        ));
    }

    let product: ProductEntity = diesel::update(
        products::table
            .find(id)
            .filter(products::provider_id.eq(provider_id)),
    )
    .set(UpdateProductEntity {
        name: body.name,
        description: body.description,
        price: body.price,
        stock_quantity: body.stock_quantity,
    })
    .returning(ProductEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Updated product successfully"),
    })
}

/// Take a product off the public catalog.
#[utoipa::path(
    delete,
    path = "/products/{id}",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Product ID to deactivate")
    ),
    responses(
        (status = 200, description = "Deactivated product successfully", body = StdResponse<ProductEntity, String>)
    )
)]
async fn deactivate_product(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let product: ProductEntity = diesel::update(
        products::table
            .find(id)
            .filter(products::provider_id.eq(provider_id)),
    )
    .set(products::is_active.eq(false))
    .returning(ProductEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(product),
        message: Some("Deactivated product successfully"),
    })
}

// Packages

#[derive(Deserialize, ToSchema)]
struct CreatePackageReq {
    name: String,
    description: Option<String>,
    price: f32,
    service_ids: Vec<i32>,
}

#[derive(Serialize, ToSchema)]
struct PackageRes {
    pub package: PackageEntity,
    pub items: Vec<PackageItemEntity>,
}

/// Bundle several of the provider's services at a package price.
#[utoipa::path(
    post,
    path = "/packages",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    request_body = CreatePackageReq,
    responses(
        (status = 200, description = "Created package successfully", body = StdResponse<PackageRes, String>)
    )
)]
async fn create_package(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
    Json(body): Json<CreatePackageReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    require_approved_provider(conn, provider_id).await?;

    if body.service_ids.is_empty() {
        return Err(AppError::BadRequest(
            "A package needs at least one service".into(),
        ));
    }

    let (package, items) = conn
        .transaction(move |conn| {
            Box::pin(async move {
                let owned: i64 = services::table
                    .filter(services::id.eq_any(&body.service_ids))
                    .filter(services::provider_id.eq(provider_id))
                    .count()
                    .get_result(conn)
                    .await
                    .context("Failed to check package services")?;

                if owned != body.service_ids.len() as i64 {
                    return Err(AppError::BadRequest(
                        "Packages can only bundle the provider's own services".into(),
                    ));
                }

                let package: PackageEntity = diesel::insert_into(packages::table)
                    .values(CreatePackageEntity {
                        provider_id,
                        name: body.name,
                        description: body.description,
                        price: body.price,
                    })
                    .returning(PackageEntity::as_returning())
                    .get_result(conn)
                    .await
                    .context("Failed to create package")?;

                let new_items: Vec<CreatePackageItemEntity> = body
                    .service_ids
                    .iter()
                    .map(|service_id| CreatePackageItemEntity {
                        package_id: package.id,
                        service_id: *service_id,
                    })
                    .collect();

                let items = diesel::insert_into(package_items::table)
                    .values(new_items)
                    .returning(PackageItemEntity::as_returning())
                    .get_results(conn)
                    .await
                    .context("Failed to create package items")?;

                Ok::<(PackageEntity, Vec<PackageItemEntity>), AppError>((package, items))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(PackageRes { package, items }),
        message: Some("Created package successfully"),
    })
}

/// List the provider's packages with their bundled services.
#[utoipa::path(
    get,
    path = "/packages",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    responses(
        (status = 200, description = "List my packages", body = StdResponse<Vec<PackageRes>, String>)
    )
)]
async fn get_my_packages(
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let packages: Vec<PackageEntity> = packages::table
        .filter(packages::provider_id.eq(provider_id))
        .order_by(packages::updated_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my packages")?;

    let package_ids: Vec<i32> = packages.iter().map(|package| package.id).collect();
    let all_items: Vec<PackageItemEntity> = package_items::table
        .filter(package_items::package_id.eq_any(&package_ids))
        .get_results(conn)
        .await
        .context("Failed to get package items")?;

    let mut group: std::collections::HashMap<i32, Vec<PackageItemEntity>> =
        std::collections::HashMap::new();
    for item in all_items {
        group.entry(item.package_id).or_default().push(item);
    }

    let packages_with_items: Vec<PackageRes> = packages
        .into_iter()
        .map(|package| PackageRes {
            items: group.remove(&package.id).unwrap_or_default(),
            package,
        })
        .collect();

    Ok(StdResponse {
        data: Some(packages_with_items),
        message: Some("Get my packages successfully"),
    })
}

/// Take a package off the public catalog.
#[utoipa::path(
    delete,
    path = "/packages/{id}",
    tags = ["Provider catalog"],
    security(("bearerAuth" = [])),
    params(
        ("id" = i32, Path, description = "Package ID to deactivate")
    ),
    responses(
        (status = 200, description = "Deactivated package successfully", body = StdResponse<PackageEntity, String>)
    )
)]
async fn deactivate_package(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(provider_id): Extension<i32>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let package: PackageEntity = diesel::update(
        packages::table
            .find(id)
            .filter(packages::provider_id.eq(provider_id)),
    )
    .set(packages::is_active.eq(false))
    .returning(PackageEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|_| AppError::NotFound)?;

    Ok(StdResponse {
        data: Some(package),
        message: Some("Deactivated package successfully"),
    })
}
