use std::env;

use anyhow::{bail, ensure, Context, Result};
use chrono::Utc;
use diesel::prelude::*;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use barangay_portal::{
    auth::{password, ROLE_ADMIN, VERIFICATION_VERIFIED},
    backup::run_backup,
    config::AppConfig,
    db,
    models::NewUser,
    schema::users,
    storage::S3Storage,
};

const USAGE: &str = "Usage: maintenance <backup|migrate|create-admin <username> <full name>>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("backup") => backup().await?,
        Some("migrate") => migrate()?,
        Some("create-admin") => {
            let (Some(username), Some(full_name)) = (args.next(), args.next()) else {
                bail!("{USAGE}");
            };
            create_admin(&username, &full_name)?
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn load_config() -> Result<AppConfig> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        "loaded portal configuration"
    );
    Ok(config)
}

async fn backup() -> Result<()> {
    let config = load_config()?;
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let storage = S3Storage::connect(&config).await?;

    let summary = run_backup(&pool, &storage, &config.backup_prefix, Utc::now()).await?;

    println!("Backup written under {}", summary.prefix);
    for object in &summary.objects {
        println!("  {:<22} {:>6} rows  {}", object.table, object.rows, object.key);
    }
    Ok(())
}

fn migrate() -> Result<()> {
    let config = load_config()?;
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let applied = db::run_migrations(&pool)?;
    println!("Applied {applied} migration(s).");
    Ok(())
}

/// Bootstraps an admin account; the password is read from `ADMIN_PASSWORD`.
fn create_admin(username: &str, full_name: &str) -> Result<()> {
    let secret = env::var("ADMIN_PASSWORD").context("ADMIN_PASSWORD must be set")?;
    ensure!(
        secret.chars().count() >= password::MIN_PASSWORD_LENGTH,
        "ADMIN_PASSWORD must be at least {} characters",
        password::MIN_PASSWORD_LENGTH
    );

    let config = load_config()?;
    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    let mut conn = pool.get().context("failed to get database connection")?;

    let admin = NewUser {
        id: Uuid::new_v4(),
        username: username.trim().to_lowercase(),
        password_hash: password::hash_password(&secret)?,
        role: ROLE_ADMIN.to_string(),
        full_name: full_name.trim().to_string(),
        sitio: None,
        contact_number: None,
        verification_status: VERIFICATION_VERIFIED.to_string(),
    };
    diesel::insert_into(users::table)
        .values(&admin)
        .execute(&mut conn)
        .context("failed to insert admin")?;

    println!("Created admin {} ({})", admin.username, admin.id);
    Ok(())
}
