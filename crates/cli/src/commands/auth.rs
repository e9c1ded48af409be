//! Login, logout and identity commands.

use marketstall_storefront::api::LoginForm;

use super::{Context, print_json, print_line};
use crate::error::CliError;

/// Log in, store the token and select the default cart.
///
/// A failure to select the cart is reported but does not undo the login;
/// cart commands retry it.
pub async fn login(ctx: &mut Context, username: &str, password: &str) -> Result<(), CliError> {
    let form = LoginForm::parse(username, password)?.with_client(&ctx.api_config);
    let outcome = ctx.api.login(&form, false).await?;

    ctx.state.logged_in(&outcome.token);
    ctx.save()?;
    tracing::info!(username, "Logged in");

    let auth = outcome.token.bearer();
    match ctx
        .initializer
        .initialize(&ctx.api, &auth, &mut ctx.state.default_cart)
        .await
    {
        Ok(init) => {
            ctx.save()?;
            print_line(&format!(
                "Logged in as {username} (default cart {})",
                init.cart_id()
            ))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Default cart initialization failed");
            print_line(&format!("Logged in as {username} (no default cart yet)"))
        }
    }
}

/// End the backend session and forget the local state.
///
/// Local state is cleared even if the backend call fails.
pub async fn logout(ctx: &mut Context) -> Result<(), CliError> {
    if let Some(auth) = ctx.state.authorization()
        && let Err(e) = ctx.api.logout(&auth).await
    {
        tracing::warn!(error = %e, "Backend logout failed");
    }

    ctx.state.logged_out();
    ctx.save()?;
    print_line("Logged out")
}

/// Show the logged-in user.
pub async fn whoami(ctx: &Context) -> Result<(), CliError> {
    let auth = ctx.require_auth()?;
    let user = ctx.api.me(&auth).await?;
    print_json(&user)
}
