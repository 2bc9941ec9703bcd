use clap::Parser;
use sea_orm_migration::MigratorTrait;
use sparelink::{
    config::{Command, Config},
    db,
    migration::Migrator,
    models::users::Role,
    server::run_server,
    services::identity_service::IdentityService,
    utils::jwt,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = Config::parse();

    let log_level = match &config.command {
        Command::Serve(serve_config) => serve_config.log_level.as_str(),
        _ => "info",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match config.command {
        Command::Serve(serve_config) => {
            run_server(serve_config).await?;
        }
        Command::Migrate { database_url } => {
            run_migrations(&database_url).await?;
        }
        Command::SetRole { database_url, external_id, role } => {
            set_role(&database_url, &external_id, &role).await?;
        }
        Command::IssueToken { external_id, email, identity_secret, ttl_hours } => {
            let token = jwt::generate_token(&external_id, email.as_deref(), &identity_secret, ttl_hours)
                .map_err(anyhow::Error::msg)?;
            println!("{}", token);
        }
    }

    Ok(())
}

async fn run_migrations(database_url: &str) -> anyhow::Result<()> {
    let db = db::establish_connection(database_url).await?;

    log::info!("Running database migrations...");
    Migrator::up(&db, None).await?;
    log::info!("Database migrations completed");

    Ok(())
}

async fn set_role(database_url: &str, external_id: &str, role: &str) -> anyhow::Result<()> {
    let role = Role::parse(role)
        .ok_or_else(|| anyhow::anyhow!("Invalid role '{}' (expected BUYER, SELLER or ADMIN)", role))?;

    let db = db::establish_connection(database_url).await?;
    let user = IdentityService::set_role(&db, external_id, role).await?;

    log::info!("User {} ({}) is now {}", user.id, user.external_id, role.as_str());
    Ok(())
}
