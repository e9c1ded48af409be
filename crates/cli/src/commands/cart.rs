//! Default cart commands.

use marketstall_core::{CartId, ProductId, Quantity};
use marketstall_storefront::api::{AddItemRequest, Authorization};
use marketstall_storefront::cart::{DefaultCartAction, InitOutcome};

use super::{Context, print_json, print_line};
use crate::error::CliError;

/// Find or create the default cart, replacing any stored selection.
pub async fn init(ctx: &mut Context) -> Result<(), CliError> {
    let auth = ctx.require_auth()?;
    let outcome = ctx
        .initializer
        .initialize(&ctx.api, &auth, &mut ctx.state.default_cart)
        .await?;
    ctx.save()?;

    match outcome {
        InitOutcome::Existing(id) => print_line(&format!("Using existing default cart {id}")),
        InitOutcome::Created(id) => print_line(&format!("Created default cart {id}")),
    }
}

/// The selected default cart, initializing it if nothing is selected.
async fn default_cart(ctx: &mut Context, auth: &Authorization) -> Result<CartId, CliError> {
    let selected = ctx.state.default_cart.default_cart;
    let id = ctx
        .initializer
        .ensure(&ctx.api, auth, &mut ctx.state.default_cart)
        .await?;
    if selected != ctx.state.default_cart.default_cart {
        ctx.save()?;
    }
    Ok(id)
}

/// Show the default cart with its items.
pub async fn show(ctx: &mut Context) -> Result<(), CliError> {
    let auth = ctx.require_auth()?;
    let id = default_cart(ctx, &auth).await?;

    let carts = ctx.api.list_carts(&auth, true).await?;
    let Some(cart) = carts.items.into_iter().find(|cart| cart.id == id) else {
        ctx.state.default_cart.reduce(DefaultCartAction::Reset);
        ctx.save()?;
        return Err(CliError::CartGone(id));
    };
    print_json(&cart)
}

/// Add a product to the default cart.
pub async fn add(ctx: &mut Context, product_id: ProductId, quantity: Quantity) -> Result<(), CliError> {
    let auth = ctx.require_auth()?;
    let cart_id = default_cart(ctx, &auth).await?;

    ctx.api
        .add_item(
            &auth,
            &AddItemRequest {
                cart_id,
                product_id,
                quantity,
            },
        )
        .await?;
    print_line(&format!("Added {quantity} x product {product_id} to cart {cart_id}"))
}
