//! Command implementations.
//!
//! Each command gets a [`Context`] holding the backend client and the loaded
//! state; commands that change the state save it before returning.

pub mod auth;
pub mod cart;
pub mod products;

use std::io::{self, Write};

use serde::Serialize;

use marketstall_storefront::api::{ApiClient, Authorization};
use marketstall_storefront::cart::CartInitializer;
use marketstall_storefront::config::ApiConfig;

use crate::error::CliError;
use crate::state::{CliState, StateFile};

/// Reminder horizon for carts created from the CLI.
const CART_REMINDER_DAYS: u32 = 7;

/// What every command runs against.
pub struct Context {
    pub api_config: ApiConfig,
    pub api: ApiClient,
    pub initializer: CartInitializer,
    pub state_file: StateFile,
    pub state: CliState,
}

impl Context {
    /// Build the client and load the state file.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the state file
    /// cannot be read.
    pub fn new(api_config: ApiConfig, state_file: StateFile) -> Result<Self, CliError> {
        let api = ApiClient::new(&api_config)?;
        let state = state_file.load()?;
        tracing::debug!(
            path = %state_file.path().display(),
            logged_in = state.token.is_some(),
            "State loaded"
        );
        Ok(Self {
            api_config,
            api,
            initializer: CartInitializer::new(CART_REMINDER_DAYS),
            state_file,
            state,
        })
    }

    /// Stored credentials, or [`CliError::NotLoggedIn`].
    ///
    /// # Errors
    ///
    /// Returns an error if no fresh token is stored.
    pub fn require_auth(&self) -> Result<Authorization, CliError> {
        self.state.authorization().ok_or(CliError::NotLoggedIn)
    }

    /// Persist the current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state file cannot be written.
    pub fn save(&self) -> Result<(), CliError> {
        self.state_file.save(&self.state)
    }
}

/// Write `value` to stdout as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

/// Write a line of text to stdout.
pub fn print_line(line: &str) -> Result<(), CliError> {
    writeln!(io::stdout().lock(), "{line}")?;
    Ok(())
}
