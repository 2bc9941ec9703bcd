use clap::Parser;

use crate::services::notifier::SmtpSettings;

#[derive(Debug, Clone, Parser)]
#[command(name = "sparelink")]
#[command(about = "Spare parts marketplace backend", long_about = None)]
pub struct Config {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, clap::Subcommand)]
pub enum Command {
    /// Start the API server
    Serve(ServeConfig),

    /// Run database migrations
    Migrate {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,
    },

    /// Grant a role out of band (BUYER, SELLER or ADMIN)
    SetRole {
        #[arg(long, env = "DATABASE_URL")]
        database_url: String,

        #[arg(long)]
        external_id: String,

        #[arg(long)]
        role: String,
    },

    /// Mint a development identity token
    IssueToken {
        #[arg(long)]
        external_id: String,

        #[arg(long)]
        email: Option<String>,

        #[arg(long, env = "IDENTITY_SECRET")]
        identity_secret: String,

        /// Token lifetime in hours
        #[arg(long, default_value = "24")]
        ttl_hours: i64,
    },
}

#[derive(Debug, Clone, Parser)]
pub struct ServeConfig {
    /// Database connection URL
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Server bind address
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:8080")]
    pub bind_address: String,

    /// HS256 secret shared with the identity provider
    #[arg(long, env = "IDENTITY_SECRET")]
    pub identity_secret: String,

    /// Log level
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// SMTP relay; without it order confirmations are only logged
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "SMTP_PORT", default_value = "587")]
    pub smtp_port: u16,

    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    #[arg(long, env = "SMTP_PASSWORD")]
    pub smtp_password: Option<String>,

    #[arg(long, env = "MAIL_FROM", default_value = "orders@sparelink.local")]
    pub mail_from: String,
}

impl ServeConfig {
    pub fn smtp_settings(&self) -> Option<SmtpSettings> {
        let host = self.smtp_host.as_deref().filter(|h| !h.trim().is_empty())?;

        Some(SmtpSettings {
            host: host.to_string(),
            port: self.smtp_port,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            from: self.mail_from.clone(),
        })
    }
}
