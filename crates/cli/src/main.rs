//! Shopfront CLI - the storefront from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog (served from the local cache after the first run)
//! shopfront products list --category audio
//! shopfront products show 64f0c2
//!
//! # Search
//! shopfront search "wireless headphones" --page 2
//!
//! # Cart, wishlist and orders need a signed-in user
//! export SHOPFRONT_USER_ID=u1 SHOPFRONT_ACCESS_TOKEN=... SHOPFRONT_REFRESH_TOKEN=...
//! shopfront cart add 64f0c2 --qty 2
//! shopfront wishlist show
//! shopfront orders cancel o-1001 --reason "ordered twice"
//! ```
//!
//! Configuration is read from the environment (see `StorefrontConfig`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shopfront_storefront::config::StorefrontConfig;
use shopfront_storefront::session::SessionUser;
use shopfront_storefront::{AppError, Storefront};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "shopfront")]
#[command(author, version, about = "Shopfront storefront CLI")]
struct Cli {
    /// Signed-in user id
    #[arg(long, global = true, env = "SHOPFRONT_USER_ID")]
    user: Option<String>,

    /// Bearer access token for the user
    #[arg(long, global = true, env = "SHOPFRONT_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Refresh token for the user
    #[arg(long, global = true, env = "SHOPFRONT_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: commands::products::ProductsAction,
    },
    /// Search the catalog
    Search(commands::products::SearchArgs),
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Manage the wishlist
    Wishlist {
        #[command(subcommand)]
        action: commands::wishlist::WishlistAction,
    },
    /// Order history, cancellations and returns
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrdersAction,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        tracing::Level::TRACE => sentry_tracing::EventFilter::Ignore,
    }
}

/// Associate Sentry reports with the signed-in user.
fn set_sentry_user(user_id: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration from environment (needed for Sentry init)
    let config = StorefrontConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Logs go to stderr so command output stays pipeable
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "shopfront_storefront=info,shopfront_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let storefront = Storefront::new(config).expect("Failed to build HTTP client");

    match run(cli, &storefront).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, storefront: &Storefront) -> Result<(), AppError> {
    if let (Some(user), Some(token)) = (cli.user, cli.token) {
        set_sentry_user(&user);
        storefront
            .sign_in(SessionUser::with_id(user, token, cli.refresh_token))
            .await;
    }

    let notices = storefront.notifier().subscribe();

    let result = match cli.command {
        Commands::Products { action } => commands::products::run(storefront, action).await,
        Commands::Search(args) => commands::products::search(storefront, args).await,
        Commands::Cart { action } => commands::cart::run(storefront, action).await,
        Commands::Wishlist { action } => commands::wishlist::run(storefront, action).await,
        Commands::Orders { action } => commands::orders::run(storefront, action).await,
    };

    output::notices(notices);
    result
}

fn report(err: &AppError) {
    if err.is_server_error() {
        let event_id = sentry::capture_error(err);
        tracing::error!(error = %err, sentry_event_id = %event_id, "Command failed");
    } else {
        tracing::error!(error = %err, "Command failed");
    }
    if err.requires_sign_in() {
        output::hint("Sign in with --user and --token (or SHOPFRONT_USER_ID / SHOPFRONT_ACCESS_TOKEN)");
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_set() {
        let cli = Cli::try_parse_from(["shopfront", "--user", "u1", "cart", "set", "p1", "3"])
            .expect("valid arguments");
        assert_eq!(cli.user.as_deref(), Some("u1"));
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: commands::cart::CartAction::Set { qty: 3, .. }
            }
        ));
    }
}
