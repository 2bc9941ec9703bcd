use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use sea_orm_migration::MigratorTrait;

use crate::config::ServeConfig;
use crate::db;
use crate::middleware::IdentityConfig;
use crate::migration::Migrator;
use crate::routes;
use crate::services::notifier::{LogNotifier, OrderNotifier, SmtpNotifier};

pub async fn run_server(config: ServeConfig) -> anyhow::Result<()> {
    log::info!("Connecting to database...");
    let db = db::establish_connection(&config.database_url).await?;

    log::info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    log::info!("Database migrations completed");

    let notifier: Arc<dyn OrderNotifier> = match config.smtp_settings() {
        Some(settings) => {
            log::info!("Order confirmations sent through {}:{}", settings.host, settings.port);
            Arc::new(SmtpNotifier::new(&settings)?)
        }
        None => {
            log::info!("No SMTP host configured, order confirmations are only logged");
            Arc::new(LogNotifier)
        }
    };

    let db_data = web::Data::new(db);
    let identity = web::Data::new(IdentityConfig {
        secret: config.identity_secret.clone(),
    });
    let notifier_data: web::Data<dyn OrderNotifier> = web::Data::from(notifier);

    log::info!("Starting server on http://{}", config.bind_address);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(db_data.clone())
            .app_data(identity.clone())
            .app_data(notifier_data.clone())
            .configure(routes::configure_routes)
    })
    .bind(&config.bind_address)?
    .run()
    .await?;

    Ok(())
}
