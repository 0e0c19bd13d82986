use anyhow::Result;
use axum::Router;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use plaza::core::{
    app_state::AppState,
    bootstrap::{self, bootstrap},
    config, db, swagger,
};
use plaza::routes;

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::catalog::routes_with_openapi()
        .merge(routes::guests::carts::routes_with_openapi())
        .merge(routes::guests::wishlists::routes_with_openapi())
        .merge(routes::customers::bookings::routes_with_openapi())
        .merge(routes::customers::carts::routes_with_openapi())
        .merge(routes::customers::wishlists::routes_with_openapi())
        .merge(routes::customers::ticket_orders::routes_with_openapi())
        .merge(routes::customers::conversations::routes_with_openapi())
        .merge(routes::providers::profile::routes_with_openapi())
        .merge(routes::providers::catalog::routes_with_openapi())
        .merge(routes::providers::events::routes_with_openapi())
        .merge(routes::providers::bookings::routes_with_openapi())
        .merge(routes::providers::conversations::routes_with_openapi())
        .merge(routes::admin::providers::routes_with_openapi())
        .merge(routes::admin::payments::routes_with_openapi())
        .merge(routes::payments::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Plaza Marketplace API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new().merge(routes).merge(swagger_ui);

    let config = config::load()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let state = AppState::init(config).await?;
    bootstrap("Plaza", app, state).await?;
    Ok(())
}
