//! Salon CLI - operator tools for the account store.
//!
//! # Usage
//!
//! ```bash
//! # Bootstrap an admin account (password read from stdin)
//! echo "$ADMIN_PASSWORD" | salon-cli admin create -u owner -e owner@salon.com -f Ada -l Lovelace
//!
//! # Signups that have not finished the OTP steps
//! salon-cli pending list
//!
//! # Work the approval queue
//! salon-cli approvals list
//! salon-cli approvals accept -M0000000001abcd1234
//! salon-cli approvals reject -M0000000001abcd1234
//!
//! # Approved accounts
//! salon-cli accounts list --role ContentCreator
//! salon-cli accounts remove ContentCreator -M0000000001abcd1234
//! ```
//!
//! Only `FIREBASE_DATABASE_URL` and `FIREBASE_DATABASE_SECRET` are read.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::{self, BufRead, IsTerminal, Write};

use clap::{Parser, Subcommand};

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "salon-cli")]
#[command(author, version, about = "Salon account store tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage admin accounts
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Inspect registrations that have not been completed
    Pending {
        #[command(subcommand)]
        action: PendingAction,
    },
    /// Work the registration approval queue
    Approvals {
        #[command(subcommand)]
        action: ApprovalsAction,
    },
    /// Manage approved accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin account; the password is read from stdin
    Create {
        /// Login username
        #[arg(short, long)]
        username: String,

        /// Email address
        #[arg(short, long)]
        email: String,

        /// First name
        #[arg(short, long)]
        first_name: String,

        /// Last name
        #[arg(short, long)]
        last_name: String,
    },
}

#[derive(Subcommand)]
enum PendingAction {
    /// List pending registrations with their verification state
    List,
}

#[derive(Subcommand)]
enum ApprovalsAction {
    /// List pending registrations, oldest first
    List,
    /// Accept a registration
    Accept {
        /// Approval key, as shown by `approvals list`
        #[arg(allow_hyphen_values = true)]
        key: String,
    },
    /// Reject a registration
    Reject {
        /// Approval key, as shown by `approvals list`
        #[arg(allow_hyphen_values = true)]
        key: String,
    },
}

#[derive(Subcommand)]
enum AccountsAction {
    /// List approved accounts
    List {
        /// Only this role (Admin, `ContentCreator`, `MarketingLead`, `GraphicDesigner`)
        #[arg(short, long)]
        role: Option<String>,
    },
    /// Remove an approved account
    Remove {
        /// Role partition
        role: String,

        /// Account key, as shown by `accounts list`
        #[arg(allow_hyphen_values = true)]
        key: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "salon_cli=info,salon_server=warn".into()),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    let store = commands::open_store()?;
    let store = store.as_ref();
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                email,
                first_name,
                last_name,
            } => {
                let password = read_password()?;
                let new_admin = commands::admin::NewAdmin {
                    username: &username,
                    email: &email,
                    first_name: &first_name,
                    last_name: &last_name,
                    password: &password,
                };
                let key = commands::admin::create(store, &new_admin).await?;
                writeln!(out, "Created admin '{username}' at Admin/{key}")?;
            }
        },
        Commands::Pending { action } => match action {
            PendingAction::List => {
                commands::pending::list(store, chrono::Utc::now(), &mut out).await?;
            }
        },
        Commands::Approvals { action } => match action {
            ApprovalsAction::List => commands::approvals::list(store, &mut out).await?,
            ApprovalsAction::Accept { key } => {
                commands::approvals::accept(store, &key, &mut out).await?;
            }
            ApprovalsAction::Reject { key } => {
                commands::approvals::reject(store, &key, &mut out).await?;
            }
        },
        Commands::Accounts { action } => match action {
            AccountsAction::List { role } => {
                commands::accounts::list(store, role.as_deref(), &mut out).await?;
            }
            AccountsAction::Remove { role, key } => {
                commands::accounts::remove(store, &role, &key, &mut out).await?;
            }
        },
    }
    Ok(())
}

/// Read one line from stdin without the trailing newline.
///
/// Prompts on stderr only when stdin is a terminal, so piping works.
fn read_password() -> Result<String, CliError> {
    if io::stdin().is_terminal() {
        let mut err = io::stderr().lock();
        write!(err, "Password: ")?;
        err.flush()?;
    }
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
