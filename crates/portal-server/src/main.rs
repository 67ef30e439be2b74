//! `portal` server binary.
//!
//! Reads `portal.toml` (or the path given with `--config`) plus `PORTAL_*`
//! environment variables, opens the SQLite store, and serves the HTTP API.
//!
//! # Accounts
//!
//! The portal has no sign-up flow. Accounts are created from the command
//! line, with the password read from stdin:
//!
//! ```text
//! portal add-registrar --email registrar@krmu.edu.in --name "Dr. Rajesh Kumar"
//! portal add-student --student-id KR2024001 --email rahul@krmu.edu.in \
//!   --name "Rahul Sharma" --course "B.Tech Computer Science" --year 3
//! portal list-accounts
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use portal_core::{
  principal::{NewRegistrar, NewStudent, Principal, PrincipalKind},
  store::PortalStore,
};
use portal_server::{AppState, ServerConfig, auth::hash_password};
use portal_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "University portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "portal.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve,
  /// Print the argon2 hash for a password entered on stdin.
  HashPassword,
  /// Create a student account.
  AddStudent {
    #[arg(long)]
    student_id: String,
    #[arg(long)]
    email:      String,
    #[arg(long)]
    name:       String,
    /// Free-text programme name, e.g. "B.Tech Computer Science".
    #[arg(long)]
    course:     Option<String>,
    #[arg(long)]
    year:       Option<i64>,
    #[arg(long)]
    phone:      Option<String>,
  },
  /// Create a registrar account.
  AddRegistrar {
    #[arg(long)]
    email:      String,
    #[arg(long)]
    name:       String,
    #[arg(long)]
    department: Option<String>,
    #[arg(long)]
    phone:      Option<String>,
  },
  /// Print every account, without password hashes.
  ListAccounts,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(load_config(cli.config)?).await,
    Command::HashPassword => {
      let password = read_password()?;
      let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
      println!("{hash}");
      Ok(())
    }
    Command::AddStudent { student_id, email, name, course, year, phone } => {
      let store = open_store(&load_config(cli.config)?).await?;
      let password = read_password()?;
      let student = store
        .add_student(NewStudent {
          student_id,
          email: normalise_email(&email),
          password_hash: hash_password(&password)
            .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?,
          full_name: name,
          course,
          year,
          phone,
        })
        .await
        .context("failed to create student")?;
      println!("created student {} ({})", student.id, student.email);
      Ok(())
    }
    Command::AddRegistrar { email, name, department, phone } => {
      let store = open_store(&load_config(cli.config)?).await?;
      let password = read_password()?;
      let registrar = store
        .add_registrar(NewRegistrar {
          email: normalise_email(&email),
          password_hash: hash_password(&password)
            .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?,
          full_name: name,
          department,
          phone,
        })
        .await
        .context("failed to create registrar")?;
      println!("created registrar {} ({})", registrar.id, registrar.email);
      Ok(())
    }
    Command::ListAccounts => {
      let store = open_store(&load_config(cli.config)?).await?;
      for kind in [PrincipalKind::Registrar, PrincipalKind::Student] {
        let principals = store
          .list_principals(kind)
          .await
          .with_context(|| format!("failed to list {kind} accounts"))?;
        println!("{kind}s ({}):", principals.len());
        for principal in principals {
          print_principal(&principal);
        }
      }
      Ok(())
    }
  }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let store = open_store(&config).await?;
  let address = format!("{}:{}", config.host, config.port);

  let state = AppState::from_config(store, config)
    .await
    .context("failed to initialise server state")?;
  tracing::info!(
    uploads = %state.placement.root().display(),
    rag = %state.rag.base_url(),
    "server state ready"
  );

  let app = portal_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read the TOML file (if present), overlay `PORTAL_*` variables, and
/// expand `~` in filesystem paths.
fn load_config(path: PathBuf) -> anyhow::Result<ServerConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("PORTAL").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let mut config: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  config.database_path = expand_tilde(&config.database_path);
  config.upload_root = expand_tilde(&config.upload_root);
  Ok(config)
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&config.database_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.database_path))
}

fn normalise_email(email: &str) -> String { email.trim().to_lowercase() }

fn print_principal(principal: &Principal) {
  match principal {
    Principal::Student(s) => println!(
      "  {:>4}  {:<12} {:<32} {:<24} {}",
      s.id,
      s.student_id,
      s.email,
      s.full_name,
      s.course.as_deref().unwrap_or("-"),
    ),
    Principal::Registrar(r) => println!(
      "  {:>4}  {:<32} {:<24} {}",
      r.id,
      r.email,
      r.full_name,
      r.department.as_deref().unwrap_or("-"),
    ),
  }
}

/// Read one password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let password = line.trim_end_matches(['\n', '\r']).to_string();
  anyhow::ensure!(!password.is_empty(), "password must not be empty");
  Ok(password)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
