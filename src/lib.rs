pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

#[cfg(test)]
mod fixtures;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::{CheckoutService, OrderService, PaymentReconciler, RedirectUrls};
use domain::ports::PrincipalResolver;
use errors::AppError;
use infrastructure::jwt::JwtPrincipalResolver;
use infrastructure::notifier::DieselNotifier;
use infrastructure::order_item_repo::DieselOrderItemRepository;
use infrastructure::order_repo::DieselOrderRepository;
use infrastructure::payos::PayOsClient;
use infrastructure::product_repo::DieselInventoryLedger;
use infrastructure::voucher_repo::DieselVoucherRepository;

pub use config::AppConfig;
pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

/// Services shared by every request handler.
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
    pub orders: Arc<OrderService>,
    pub reconciler: Arc<PaymentReconciler>,
    pub principals: Arc<dyn PrincipalResolver>,
}

impl AppState {
    /// Wires the services to the Postgres, PayOS and JWT adapters.
    pub fn from_config(pool: DbPool, config: &AppConfig) -> Self {
        let ledger = Arc::new(DieselInventoryLedger::new(pool.clone()));
        let items = Arc::new(DieselOrderItemRepository::new(pool.clone()));
        let vouchers = Arc::new(DieselVoucherRepository::new(pool.clone()));
        let orders = Arc::new(DieselOrderRepository::new(pool.clone()));
        let notifier = Arc::new(DieselNotifier::new(pool));
        let gateway = Arc::new(PayOsClient::new(config.payos.clone()));
        let redirect = config.order_history_url();

        AppState {
            checkout: Arc::new(CheckoutService::new(
                ledger.clone(),
                items.clone(),
                vouchers.clone(),
                orders.clone(),
                gateway,
                RedirectUrls {
                    cancel_url: redirect.clone(),
                    return_url: redirect,
                },
            )),
            orders: Arc::new(OrderService::new(
                orders.clone(),
                items,
                vouchers,
                ledger,
                notifier.clone(),
            )),
            reconciler: Arc::new(PaymentReconciler::new(orders, notifier)),
            principals: Arc::new(JwtPrincipalResolver::new(&config.jwt_secret)),
        }
    }
}

/// Registers every API route. Shared by the server and the HTTP tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        AppError::BadRequest(err.to_string()).into()
    }))
    .service(
        web::scope("/orders")
            .route("", web::get().to(handlers::orders::list_orders))
            .route("/checkout", web::post().to(handlers::orders::checkout))
            .route("/{id}", web::get().to(handlers::orders::get_order))
            .route("/{id}/status", web::patch().to(handlers::orders::update_status)),
    )
    .service(
        web::scope("/order-items")
            .route("/{id}", web::patch().to(handlers::order_items::update_order_item))
            .route("/{id}", web::delete().to(handlers::order_items::delete_order_item)),
    )
    .route("/payos/callback", web::post().to(handlers::payos::callback));
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    state: AppState,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(state);
    let openapi = handlers::ApiDoc::openapi();

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
