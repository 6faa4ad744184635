//! # palaver
//!
//! Palaver chat server binary: `serve` starts the HTTP/WebSocket server,
//! the other subcommands administer users, friendships and tokens in the
//! configured database.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use palaver_server::PalaverServer;
use palaver_settings::PalaverSettings;
use palaver_store::{Database, FriendRepo, TokenRepo, UserRepo, UserRow};

/// Palaver chat server.
#[derive(Parser, Debug)]
#[command(name = "palaver", version, about = "Palaver chat server")]
struct Cli {
    /// Settings file (defaults to `~/.palaver/settings.json`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// `SQLite` database path (overrides settings).
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP/WebSocket server until ctrl-c.
    Serve {
        /// Host to bind (overrides settings).
        #[arg(long)]
        host: Option<String>,
        /// Port to bind (overrides settings).
        #[arg(long)]
        port: Option<u16>,
    },
    /// Manage users.
    #[command(subcommand)]
    User(UserCommand),
    /// Manage friendships.
    #[command(subcommand)]
    Friend(FriendCommand),
    /// Manage bearer tokens.
    #[command(subcommand)]
    Token(TokenCommand),
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    /// Create a user.
    Add {
        /// Unique username.
        username: String,
        /// Name shown to other users.
        #[arg(long)]
        display_name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum FriendCommand {
    /// Make two users friends (both directions).
    Add {
        /// First username.
        first: String,
        /// Second username.
        second: String,
    },
}

#[derive(Subcommand, Debug)]
enum TokenCommand {
    /// Issue a token and print it once.
    Issue {
        /// Owner of the token.
        username: String,
        /// Lifetime in hours; omitted means no expiry.
        #[arg(long)]
        ttl_hours: Option<i64>,
    },
    /// Revoke a previously issued token.
    Revoke {
        /// Plaintext token as printed by `token issue`.
        token: String,
    },
}

fn load_settings(cli: &Cli) -> Result<PalaverSettings> {
    let mut settings = match &cli.config {
        Some(path) => palaver_settings::load_settings_from_path(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => palaver_settings::load_settings().context("Failed to load settings")?,
    };
    if let Some(db_path) = &cli.db_path {
        settings.database.path = db_path.to_string_lossy().into_owned();
    }
    Ok(settings)
}

fn open_database(settings: &PalaverSettings, base: &Path) -> Result<Database> {
    if settings.database.is_in_memory() {
        return Database::in_memory().context("Failed to open in-memory database");
    }
    let path = settings.database.resolve(base);
    Database::open(&path).with_context(|| format!("Failed to open database {}", path.display()))
}

fn find_user(db: &Database, username: &str) -> Result<UserRow> {
    UserRepo::new(db.clone())
        .find_by_username(username)?
        .ok_or_else(|| anyhow!("no such user: {username}"))
}

/// Run an admin subcommand and return the line to print.
fn run_admin(command: Command, db: &Database) -> Result<String> {
    match command {
        Command::User(UserCommand::Add {
            username,
            display_name,
        }) => {
            let user = UserRepo::new(db.clone())
                .create(&username, display_name.as_deref())
                .with_context(|| format!("Failed to create user {username}"))?;
            Ok(format!("created user {} (id {})", user.username, user.id))
        }
        Command::Friend(FriendCommand::Add { first, second }) => {
            let a = find_user(db, &first)?;
            let b = find_user(db, &second)?;
            let added = FriendRepo::new(db.clone()).add(a.id, b.id)?;
            Ok(if added {
                format!("{first} and {second} are now friends")
            } else {
                format!("{first} and {second} were already friends")
            })
        }
        Command::Token(TokenCommand::Issue {
            username,
            ttl_hours,
        }) => {
            let ttl = ttl_hours
                .map(|hours| {
                    chrono::Duration::try_hours(hours)
                        .filter(|_| hours > 0)
                        .ok_or_else(|| anyhow!("--ttl-hours must be a positive number of hours"))
                })
                .transpose()?;
            let user = find_user(db, &username)?;
            let issued = TokenRepo::new(db.clone())
                .issue(user.id, ttl)
                .context("Failed to issue token")?;
            Ok(issued.token)
        }
        Command::Token(TokenCommand::Revoke { token }) => {
            let revoked = TokenRepo::new(db.clone())
                .revoke(&token)
                .context("Failed to revoke token")?;
            if revoked {
                Ok("token revoked".to_string())
            } else {
                bail!("no active token matches")
            }
        }
        Command::Serve { .. } => bail!("serve is not an admin command"),
    }
}

async fn serve(settings: PalaverSettings, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut settings = settings;
    if let Some(host) = host {
        settings.server.host = host;
    }
    if let Some(port) = port {
        settings.server.port = port;
    }
    settings.validate().context("Invalid settings")?;

    let metrics = palaver_telemetry::prometheus_handle();
    let server = PalaverServer::open(&settings, &palaver_settings::palaver_home(), metrics)
        .context("Failed to open database")?;
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!(
        policy = server.config().admission_policy.as_str(),
        "palaver listening on http://{addr}"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("shutting down");
    server.graceful_shutdown(handle).await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    palaver_telemetry::init_subscriber(&settings.logging.level, settings.logging.json);

    match cli.command {
        Command::Serve { host, port } => serve(settings, host, port).await,
        command => {
            let db = open_database(&settings, &palaver_settings::palaver_home())?;
            println!("{}", run_admin(command, &db)?);
            Ok(())
        }
    }
}
