use clap::{Parser, Subcommand};
use console::style;
use dialoguer::Confirm;
use std::path::PathBuf;
use tracing::info;

use crawlctl_core::cache::{RedisPool, StreamTransport, TransportMessage};
use crawlctl_core::jobs::job::validate_urls;
use crawlctl_core::repository::{create_pool, JobRepositoryTrait};
use crawlctl_core::{new_job_id, Config, Job, JobRepository, Migrator, Result};

#[derive(Parser)]
#[command(name = "crawlctl")]
#[command(about = "Distributed web-crawl admission and scheduling control plane")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Set log level")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the control-plane API server
    Server {
        #[arg(short = 'H', long, help = "Bind address", default_value = "0.0.0.0")]
        host: String,

        #[arg(short = 'P', long, help = "Port number", default_value = "8080")]
        port: u16,

        #[arg(long, help = "Skip automatic database migration on startup")]
        skip_migrate: bool,
    },

    /// Durable Job Store database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },

    /// Submit and inspect crawl jobs directly, bypassing the HTTP API
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },

    /// Show loaded configuration
    Config,
}

#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,

    /// Reset database (DANGEROUS - deletes all job data)
    Reset {
        #[arg(long, help = "Skip confirmation prompt")]
        force: bool,
    },

    /// Show database status
    Status,
}

#[derive(Subcommand, Debug)]
pub enum JobCommands {
    /// Submit a crawl job
    Submit {
        #[arg(required = true, help = "URLs to crawl")]
        urls: Vec<String>,

        #[arg(short, long, help = "User ID for quota/priority scoping")]
        user_id: Option<String>,
    },

    /// Show a job's current status
    Status {
        #[arg(help = "Job ID")]
        job_id: String,
    },

    /// Fetch a completed job's result
    Result {
        #[arg(help = "Job ID")]
        job_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.as_deref().unwrap_or("info");
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let config = if let Some(ref config_path) = cli.config {
        Config::load(config_path.to_str().unwrap())?
    } else {
        Config::from_env()?
    };

    info!("Starting crawlctl v{} with config: {}", crawlctl_core::VERSION, config.server.host);

    match cli.command {
        Commands::Server { host, port, skip_migrate } => {
            let mut config = config;
            config.server.host = host;
            config.server.port = port;

            if !skip_migrate {
                info!("Running database migrations...");
                match run_migrations(&config).await {
                    Ok(_) => info!("Database migrations completed successfully"),
                    Err(e) => {
                        eprintln!("Database migration failed: {}", e);
                        eprintln!("Use --skip-migrate to start without migration");
                        std::process::exit(1);
                    }
                }
            }

            crawlctl_api::run(config).await?;
        }

        Commands::Db { command } => {
            let pool = connect_db(&config).await?;
            let migrator = Migrator::new(pool);

            match command {
                DbCommands::Migrate => match migrator.migrate().await {
                    Ok(_) => println!("{}", style("Migrations completed successfully!").green()),
                    Err(e) => {
                        eprintln!("{}", style(format!("Migration failed: {}", e)).red());
                        std::process::exit(1);
                    }
                },
                DbCommands::Reset { force } => {
                    if !force {
                        let confirmed = Confirm::new()
                            .with_prompt("This will DELETE ALL job data. Continue?")
                            .default(false)
                            .interact()
                            .unwrap_or(false);

                        if !confirmed {
                            println!("Aborted.");
                            return Ok(());
                        }
                    }

                    match migrator.reset().await {
                        Ok(_) => println!("{}", style("Database reset complete!").green()),
                        Err(e) => {
                            eprintln!("{}", style(format!("Reset failed: {}", e)).red());
                            std::process::exit(1);
                        }
                    }
                }
                DbCommands::Status => match migrator.status().await {
                    Ok(status) => {
                        println!("{}", style("Database Status").bold());
                        println!("  Host: {}:{}", config.database.host, config.database.port);
                        println!("  Database: {}", config.database.database);
                        println!("  Applied migrations: {}", status.applied_migrations);
                        println!("  Jobs: {} ({} pending)", status.job_count, status.pending_count);
                    }
                    Err(e) => {
                        eprintln!("{}", style(format!("Failed to get status: {}", e)).red());
                        std::process::exit(1);
                    }
                },
            }
        }

        Commands::Job { command } => match command {
            JobCommands::Submit { urls, user_id } => {
                validate_urls(&urls)?;

                let pool = connect_db(&config).await?;
                let jobs = JobRepository::new(pool);
                let redis = RedisPool::new(config.cache.redis.clone()).await?;
                let transport = StreamTransport::new(redis, config.cache.transport.clone());
                transport.ensure_groups().await?;

                let job_id = new_job_id();
                let job = Job::new_pending(job_id.clone(), urls.len() as i32, user_id.clone());
                jobs.insert_pending(&job).await?;

                transport
                    .publish(&TransportMessage {
                        job_id: job_id.clone(),
                        urls,
                        user_id,
                    })
                    .await?;

                println!("{} {}", style("Submitted job").green(), job_id);
            }

            JobCommands::Status { job_id } => {
                let pool = connect_db(&config).await?;
                let jobs = JobRepository::new(pool);

                match jobs.find_by_id(&job_id).await? {
                    Some(job) => {
                        println!("{}", style("Job Status").bold());
                        println!("  ID:             {}", job.id);
                        println!("  Status:         {}", job.status());
                        println!("  URLs submitted: {}", job.urls_submitted);
                        println!("  URLs succeeded: {}", job.urls_succeeded);
                        println!("  URLs failed:    {}", job.urls_failed);
                    }
                    None => println!("{}", style(format!("Job '{}' not found", job_id)).yellow()),
                }
            }

            JobCommands::Result { job_id } => {
                let pool = connect_db(&config).await?;
                let jobs = JobRepository::new(pool);

                match jobs.find_by_id(&job_id).await? {
                    Some(job) => match job.result_html {
                        Some(html) => println!("{}", html),
                        None => println!("{}", style("Job has no result yet").yellow()),
                    },
                    None => println!("{}", style(format!("Job '{}' not found", job_id)).yellow()),
                }
            }
        },

        Commands::Config => {
            println!(
                "Configuration loaded from: {}",
                cli.config.map(|p| p.display().to_string()).unwrap_or_else(|| "environment".to_string())
            );
            println!("{:#?}", config);
        }
    }

    Ok(())
}

async fn connect_db(config: &Config) -> Result<sqlx::PgPool> {
    create_pool(
        &config.database.host,
        config.database.port,
        &config.database.database,
        &config.database.username,
        &config.database.password,
        config.database.pool_size,
    )
    .await
}

async fn run_migrations(config: &Config) -> Result<()> {
    let pool = connect_db(config).await?;
    crawlctl_core::auto_migrate(&pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_server() {
        let cli = Cli::parse_from(&["crawlctl", "server"]);
        assert!(matches!(cli.command, Commands::Server { .. }));
    }

    #[test]
    fn test_cli_parse_job_submit() {
        let cli = Cli::parse_from(&["crawlctl", "job", "submit", "https://example.com"]);
        assert!(matches!(cli.command, Commands::Job { .. }));
    }
}
