use anyhow::{Context, anyhow, bail};
use autoloan_config::UploadConfig;
use autoloan_core::{
    AppError, FieldOrder, LocalAttachmentStorage, hash_password, validate_in_order,
};
use autoloan_db::{PgPool, init_db_pool, reconcile_staging, run_migrations};
use autoloan_models::{SignupDto, users::normalize_email};
use clap::{Parser, Subcommand};
use dialoguer::{Input, Password};
use dotenvy::dotenv;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "autoloan-cli")]
#[command(about = "AutoLoan CLI - Administrative tools for the loan portal", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an admin account
    CreateAdmin {
        /// Username shown on applications and in login responses
        #[arg(short = 'u', long)]
        username: Option<String>,

        /// Email address
        #[arg(short = 'e', long)]
        email: Option<String>,

        /// 10-digit mobile number
        #[arg(short = 'm', long)]
        mobile: Option<String>,

        /// Password (will be prompted securely if not provided)
        #[arg(short = 'p', long)]
        password: Option<String>,
    },
    /// Promote or discard attachments left in the staging area.
    ///
    /// Run only while the API server is stopped: an upload in progress is
    /// indistinguishable from an orphan.
    ReconcileUploads,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let cli = Cli::parse();

    let pool = init_db_pool().await?;
    run_migrations(&pool).await?;

    match cli.command {
        Commands::CreateAdmin {
            username,
            email,
            mobile,
            password,
        } => handle_create_admin(&pool, username, email, mobile, password).await,
        Commands::ReconcileUploads => handle_reconcile_uploads(&pool).await,
    }
}

fn prompt_if_missing(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    match value {
        Some(value) => Ok(value),
        None => Input::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {}", prompt.to_lowercase())),
    }
}

fn app_error(err: AppError) -> anyhow::Error {
    anyhow!(err.message())
}

async fn handle_create_admin(
    pool: &PgPool,
    username: Option<String>,
    email: Option<String>,
    mobile: Option<String>,
    password: Option<String>,
) -> anyhow::Result<()> {
    let username = prompt_if_missing(username, "Username")?;
    let email = prompt_if_missing(email, "Email address")?;
    let mobile = prompt_if_missing(mobile, "Mobile number")?;
    let password = match password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .with_confirmation("Confirm password", "Passwords don't match")
            .interact()
            .context("Failed to read password")?,
    };

    let mut dto = SignupDto {
        user_name: Some(username),
        email: Some(normalize_email(&email)),
        mobile: Some(mobile),
        password: Some(password),
        role: Some("admin".to_string()),
    };
    dto.trim_fields();
    validate_in_order(&dto).map_err(app_error)?;

    let (Some(username), Some(email), Some(mobile), Some(password)) =
        (dto.user_name, dto.email, dto.mobile, dto.password)
    else {
        bail!("All fields are required");
    };

    let hashed = hash_password(&password).map_err(app_error)?;

    let id = sqlx::query_scalar::<_, Uuid>(
        "INSERT INTO users (username, email, mobile, password, role)
         VALUES ($1, $2, $3, $4, 'admin')
         RETURNING id",
    )
    .bind(&username)
    .bind(&email)
    .bind(&mobile)
    .bind(&hashed)
    .fetch_one(pool)
    .await
    .map_err(|e| app_error(e.into()))?;

    println!("\n✅ Admin account created");
    println!("   ID: {}", id);
    println!("   Username: {}", username);
    println!("   Email: {}", email);
    Ok(())
}

async fn handle_reconcile_uploads(pool: &PgPool) -> anyhow::Result<()> {
    let config = UploadConfig::from_env()?;
    let storage = LocalAttachmentStorage::new(config.dir.clone());

    let report = reconcile_staging(pool, &storage)
        .await
        .map_err(app_error)?;

    println!("\n✅ Staging area reconciled in {}", config.dir.display());
    println!("   Promoted: {}", report.promoted.len());
    for name in &report.promoted {
        println!("     + {}", name);
    }
    println!("   Discarded: {}", report.discarded.len());
    for name in &report.discarded {
        println!("     - {}", name);
    }
    Ok(())
}
