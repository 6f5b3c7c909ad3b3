//! LendHub CLI - drive the LendHub client core from a terminal
//!
//! Each invocation behaves like one page load: the persisted session is
//! restored, the command runs, and state is written back to the data directory.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use lendhub_applications::{
    AccessGate, AppContext, Credentials, Decision, Navigator, Page, PermissionSet, Redirect, Role,
    UserDraft,
};
use lendhub_core::{
    default_config_path, init_logging, log_operation_error, log_operation_start,
    log_operation_success, open_store, performance, LendhubConfig, LoggingConfig,
    NotificationLevel, Notifier, TracingNotifier,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "lendhub")]
#[command(about = "Client core of the LendHub lending platform demo")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for the persisted client state
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,

        /// Write a default configuration file
        #[arg(long)]
        init: bool,

        /// Validate current configuration
        #[arg(long)]
        validate: bool,
    },

    #[command(flatten)]
    Session(SessionCommand),
}

/// Commands that run against the persisted client state
#[derive(Subcommand)]
enum SessionCommand {
    /// Create an account and sign in
    Register {
        /// Full name
        #[arg(long)]
        name: String,

        /// Phone number, with or without country prefix
        #[arg(long)]
        phone: String,

        /// Two-letter country code
        #[arg(long)]
        country: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        email: Option<String>,

        /// borrower, lender or admin
        #[arg(long, default_value = "borrower")]
        role: String,
    },

    /// Sign in with phone, password and country
    Login {
        #[arg(long)]
        phone: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        country: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Switch the signed-in user to another role
    SwitchRole {
        /// borrower, lender or admin
        role: String,
    },

    /// Check whether the current session may open a page
    Visit {
        /// Page file name, e.g. ledger.html
        page: String,
    },

    /// Show permissions and reachable pages for a role
    Permissions {
        /// Role to inspect; defaults to the signed-in user's role
        #[arg(long)]
        role: Option<String>,
    },

    /// Show the lender subscription status
    Subscription,

    /// Work with the offline action queue
    Offline {
        #[command(subcommand)]
        action: OfflineAction,
    },
}

#[derive(Subcommand)]
enum OfflineAction {
    /// Queue an action as if taken while offline
    Queue {
        /// Action name, e.g. loan.request
        kind: String,

        /// JSON payload
        #[arg(long, default_value = "{}")]
        payload: String,
    },

    /// List queued actions
    List,

    /// Reconnect and replay queued actions
    Sync,
}

/// Prints notifications to the terminal
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, level: NotificationLevel) {
        let icon = match level {
            NotificationLevel::Info => "ℹ️ ",
            NotificationLevel::Success => "✅",
            NotificationLevel::Warning => "⚠️ ",
            NotificationLevel::Error => "❌",
        };
        println!("{} {}", icon, message);
        TracingNotifier.notify(message, level);
    }
}

/// Prints where a browser would have navigated
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn redirect(&self, target: Redirect) {
        println!("➡️  Redirect to {}", target);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging_config = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig::default()
    };
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    info!("Starting LendHub CLI v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    let command = match cli.command {
        Commands::Config {
            show,
            init,
            validate,
        } => return handle_config(&config_path, show, init, validate),
        Commands::Session(command) => command,
    };

    let config = load_config(&config_path, cli.data_dir.as_deref())?;
    let store = performance::measure_sync("open_store", || open_store(&config))
        .context("Failed to open client storage")?;
    debug!("Using {} storage", store.backend_name());

    let mut context = AppContext::initialize(
        config,
        store,
        Arc::new(ConsoleNotifier),
        Arc::new(ConsoleNavigator),
    )?;

    let outcome = run(&mut context, command).await;
    context.shutdown();
    outcome
}

async fn run(context: &mut AppContext, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Register {
            name,
            phone,
            country,
            password,
            email,
            role,
        } => {
            let role: Role = role.parse()?;
            let draft = UserDraft {
                full_name: name,
                phone,
                country,
                password,
                email,
            };
            log_operation_start!("register", role = %role);
            match context.register(draft, role).await {
                Ok(user) => {
                    log_operation_success!("register", user_id = %user.id);
                    print_user(context);
                }
                Err(e) => {
                    log_operation_error!("register", e);
                    return Err(e.into());
                }
            }
        }

        SessionCommand::Login {
            phone,
            password,
            country,
        } => {
            let credentials = Credentials::new(phone, password, country);
            performance::measure_async("login", context.login(credentials)).await?;
            print_user(context);
        }

        SessionCommand::Logout => context.logout(),

        SessionCommand::Whoami => {
            if context.session().is_authenticated() {
                print_user(context);
            } else {
                println!("Not signed in");
            }
        }

        SessionCommand::SwitchRole { role } => {
            context.switch_role(&role)?;
            print_user(context);
        }

        SessionCommand::Visit { page } => {
            let Some(target) = Page::from_path(&page) else {
                let role = context.session().current_role();
                let decision = context.gate().authorize_path(&page, role);
                println!("❌ {} is not a known page ({:?})", page, decision);
                return Ok(());
            };
            if context.enter_page(target) == Decision::Allow {
                println!("✅ {} opened", target);
            }
        }

        SessionCommand::Permissions { role } => {
            let role = match role {
                Some(name) => Some(name.parse::<Role>()?),
                None => context.session().current_role(),
            };
            print_permissions(context.gate(), role);
        }

        SessionCommand::Subscription => match context.session().subscription_status() {
            Some(status) => {
                println!("📅 Days remaining: {}", status.days_remaining);
                if status.is_expired {
                    println!("❌ Subscription expired");
                } else if status.is_expiring_soon {
                    println!("⚠️  Subscription expires soon");
                } else {
                    println!("✅ Subscription active");
                }
            }
            None => println!("No lender subscription for the current session"),
        },

        SessionCommand::Offline { action } => handle_offline(context, action)?,
    }

    Ok(())
}

fn handle_offline(context: &mut AppContext, action: OfflineAction) -> Result<()> {
    let install = context.install_mut();
    match action {
        OfflineAction::Queue { kind, payload } => {
            let payload: serde_json::Value =
                serde_json::from_str(&payload).context("Payload must be valid JSON")?;
            install.go_offline();
            let queued = install.queue_action(kind, payload);
            println!("📥 Queued {} ({})", queued.kind, queued.id);
        }
        OfflineAction::List => {
            if install.queue().is_empty() {
                println!("No queued actions");
            }
            for action in install.queue().actions() {
                println!(
                    "{}  {}  {}  {}",
                    action.queued_at.format("%Y-%m-%d %H:%M:%S"),
                    action.id,
                    action.kind,
                    action.payload
                );
            }
        }
        OfflineAction::Sync => {
            // Every CLI run starts online; resume the earlier offline period
            install.resume_offline();
            let report = install.go_online(|action| {
                println!("📤 {} {}", action.kind, action.payload);
                Ok::<(), std::convert::Infallible>(())
            });
            println!(
                "Delivered {}, still pending {}",
                report.delivered, report.failed
            );
        }
    }
    Ok(())
}

fn print_user(context: &AppContext) {
    let Some(user) = context.session().current() else {
        return;
    };
    println!("👤 {} ({})", user.full_name, user.role.label());
    println!("   id:      {}", user.id);
    println!("   phone:   {} {}", user.country, user.phone);
    println!("   status:  {}", user.status);
    if let Some(rating) = user.rating {
        println!("   rating:  {}", rating);
    }
    if let Some(expiry) = user.subscription_expiry {
        println!("   expires: {}", expiry);
    }
}

fn print_permissions(gate: &AccessGate, role: Option<Role>) {
    let permissions: PermissionSet = gate.permissions_for(role);
    match role {
        Some(role) => println!("🔐 Permissions for {}", role.label()),
        None => println!("🔐 Permissions without a session"),
    }
    println!("   {}", permissions.summary());

    let pages: Vec<String> = gate
        .navigation(role)
        .into_iter()
        .map(|page| page.file_name().to_string())
        .collect();
    if pages.is_empty() {
        println!("   pages: none");
    } else {
        println!("   pages: {}", pages.join(", "));
    }
}

fn load_config(path: &Path, data_dir: Option<&Path>) -> Result<LendhubConfig> {
    debug!("Loading configuration from {:?}", path);
    let mut config = LendhubConfig::load_or_default(path).inspect_err(|e| e.log())?;
    if let Some(dir) = data_dir {
        config.storage.data_dir = dir.to_string_lossy().into_owned();
        config.validate()?;
    }
    Ok(config)
}

fn handle_config(path: &Path, show: bool, init: bool, validate: bool) -> Result<()> {
    if init {
        if path.exists() {
            bail!("Configuration already exists at {:?}", path);
        }
        LendhubConfig::default().save_to_file(path)?;
        println!("✅ Configuration initialized at: {:?}", path);
    }

    if show {
        let config = LendhubConfig::load_or_default(path)?;
        println!("📋 Current configuration ({:?}):", path);
        println!("{}", toml::to_string_pretty(&config)?);
    }

    if validate {
        let config = if path.exists() {
            LendhubConfig::from_file(path)?
        } else {
            LendhubConfig::default()
        };
        match config.validate() {
            Ok(()) => println!("✅ Configuration is valid"),
            Err(e) => {
                println!("❌ Configuration validation failed: {}", e);
                return Err(e.into());
            }
        }
    }

    Ok(())
}
