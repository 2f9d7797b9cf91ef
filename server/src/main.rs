use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use platform_db::{DatabaseSettings, DbPool, connect};
use platform_obs::{ObsConfig, init_tracing};
use products_hr::{HrModule, seed_hr_demo};
use server::{AppConfig, AppState, ServeConfig, serve};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "hr-server", version, about = "HR backend with role-scoped access")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP server.
    Serve(ServeCommand),
    /// Run database migrations.
    #[command(subcommand)]
    Migrate(MigrateCommand),
    /// Load demo departments, users and projects.
    Seed,
}

#[derive(Subcommand, Debug)]
enum MigrateCommand {
    /// Apply pending migrations.
    Up,
    /// Rollback the most recent migration.
    Down,
}

#[derive(Args, Debug)]
struct ServeCommand {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: std::net::IpAddr,
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
    #[arg(long, help = "Allow starting even when migrations are pending")]
    allow_dirty: bool,
}

impl From<&ServeCommand> for ServeConfig {
    fn from(value: &ServeCommand) -> Self {
        ServeConfig::new(value.host, value.port)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(ObsConfig::from_env("hr-server"))?;
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(cmd) => run_server(cmd).await,
        Command::Migrate(action) => match action {
            MigrateCommand::Up => migrate_up().await,
            MigrateCommand::Down => migrate_down().await,
        },
        Command::Seed => run_seed().await,
    }
}

async fn setup_pool() -> Result<DbPool> {
    let settings = DatabaseSettings::from_env();
    connect(&settings).await.map_err(Into::into)
}

async fn run_server(cmd: ServeCommand) -> Result<()> {
    let config = AppConfig::load()?;
    let pool = setup_pool().await?;
    ensure_migrations(&pool, cmd.allow_dirty).await?;
    let state = AppState::new(HrModule::new(pool), config);
    serve(ServeConfig::from(&cmd), state).await
}

async fn ensure_migrations(pool: &DbPool, allow_dirty: bool) -> Result<()> {
    let pending = Migrator::get_pending_migrations(pool).await?;
    if !pending.is_empty() && !allow_dirty {
        anyhow::bail!(
            "pending migrations detected; run `cargo run -p server -- migrate up` or pass --allow-dirty"
        );
    }
    Ok(())
}

async fn migrate_up() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::up(&pool, None).await?;
    info!("database migrations applied");
    Ok(())
}

async fn migrate_down() -> Result<()> {
    let pool = setup_pool().await?;
    Migrator::down(&pool, Some(1)).await?;
    info!("most recent migration rolled back");
    Ok(())
}

async fn run_seed() -> Result<()> {
    let pool = setup_pool().await?;
    ensure_migrations(&pool, false).await?;
    let seeded = seed_hr_demo(&pool).await?;
    info!(
        departments = seeded.departments.len(),
        employees = seeded.employees.len(),
        projects = seeded.projects.len(),
        "demo data ready; log in as admin/admin123, manager/manager123 or employee/employee123"
    );
    Ok(())
}
