//! Marketstall CLI - command-line client for the commerce API.
//!
//! # Usage
//!
//! ```bash
//! # Log in (the password may also come from MARKETSTALL_PASSWORD)
//! mstall login alice --password secret
//!
//! # Browse products
//! mstall products list --page 2 --page-size 10
//! mstall products show 3
//! mstall products category 2
//!
//! # Work with the default cart
//! mstall cart init
//! mstall cart add 3 --quantity 2
//! mstall cart show
//!
//! mstall whoami
//! mstall logout
//! ```
//!
//! # Environment Variables
//!
//! - `MARKETSTALL_API_URL` - Backend base URL (default `http://localhost:8000/`)
//! - `MARKETSTALL_CLIENT_ID` / `MARKETSTALL_CLIENT_SECRET` - OAuth2 client
//!   credentials sent with the login form, if the backend needs them
//! - `RUST_LOG` - Log filter (logs go to stderr)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use url::Url;

use marketstall_core::{CategoryId, ProductId, Quantity};
use marketstall_storefront::api::ProductQuery;
use marketstall_storefront::config::ApiConfig;

mod commands;
mod error;
mod state;

use commands::Context;
use error::CliError;
use state::StateFile;

#[derive(Parser)]
#[command(name = "mstall")]
#[command(author, version, about = "Marketstall command-line client")]
struct Cli {
    /// Backend base URL
    #[arg(
        long,
        global = true,
        env = "MARKETSTALL_API_URL",
        default_value = "http://localhost:8000/"
    )]
    api_url: Url,

    /// OAuth2 client id sent with the login form
    #[arg(long, global = true, env = "MARKETSTALL_CLIENT_ID")]
    client_id: Option<String>,

    /// OAuth2 client secret sent with the login form
    #[arg(
        long,
        global = true,
        env = "MARKETSTALL_CLIENT_SECRET",
        hide_env_values = true
    )]
    client_secret: Option<String>,

    /// State file (default: <config dir>/marketstall/state.json)
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and select the default cart
    Login {
        username: String,

        #[arg(long, env = "MARKETSTALL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Log out and forget the stored token
    Logout,
    /// Show the logged-in user
    Whoami,
    /// Browse products
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Work with the default cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        #[arg(long)]
        page: Option<u32>,

        #[arg(long)]
        page_size: Option<u32>,

        /// Filter by name
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        category: Option<CategoryId>,
    },
    /// Show one product
    Show { id: ProductId },
    /// List products in a category
    Category { id: CategoryId },
}

#[derive(Subcommand)]
enum CartAction {
    /// Find or create the default cart
    Init,
    /// Show the default cart with its items
    Show,
    /// Add a product to the default cart
    Add {
        product_id: ProductId,

        #[arg(short, long, default_value = "1")]
        quantity: Quantity,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketstall_cli=info,marketstall_storefront=warn".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let api_config = ApiConfig {
        base_url: cli.api_url,
        client_id: cli.client_id,
        client_secret: cli.client_secret.map(Into::into),
        ..ApiConfig::default()
    };
    let state_file = match cli.state_file {
        Some(path) => StateFile::new(path),
        None => StateFile::default_location()?,
    };
    let mut ctx = Context::new(api_config, state_file)?;

    // Rejected credentials on login say nothing about the stored token
    let uses_stored_token = !matches!(cli.command, Commands::Login { .. });
    let result = dispatch(&mut ctx, cli.command).await;

    if let Err(e) = &result
        && uses_stored_token
        && e.is_auth_failure()
        && ctx.state.token.is_some()
    {
        ctx.state.logged_out();
        ctx.save()?;
        tracing::warn!("Stored token was rejected and has been cleared");
    }

    Ok(result?)
}

async fn dispatch(ctx: &mut Context, command: Commands) -> Result<(), CliError> {
    match command {
        Commands::Login { username, password } => {
            commands::auth::login(ctx, &username, &password).await
        }
        Commands::Logout => commands::auth::logout(ctx).await,
        Commands::Whoami => commands::auth::whoami(ctx).await,
        Commands::Products { action } => match action {
            ProductAction::List {
                page,
                page_size,
                name,
                category,
            } => {
                let query = ProductQuery {
                    page,
                    page_size,
                    name,
                    category_id: category,
                    ..ProductQuery::default()
                };
                commands::products::list(ctx, &query).await
            }
            ProductAction::Show { id } => commands::products::show(ctx, id).await,
            ProductAction::Category { id } => commands::products::by_category(ctx, id).await,
        },
        Commands::Cart { action } => match action {
            CartAction::Init => commands::cart::init(ctx).await,
            CartAction::Show => commands::cart::show(ctx).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(ctx, product_id, quantity).await,
        },
    }
}
