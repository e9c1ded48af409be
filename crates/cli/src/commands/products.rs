//! Product browsing commands.
//!
//! Products are public; a stored token is sent when present.

use marketstall_core::{CategoryId, ProductId};
use marketstall_storefront::api::ProductQuery;

use super::{Context, print_json};
use crate::error::CliError;

pub async fn list(ctx: &Context, query: &ProductQuery) -> Result<(), CliError> {
    let auth = ctx.state.authorization();
    let page = ctx.api.list_products(auth.as_ref(), query).await?;
    print_json(&page)
}

pub async fn show(ctx: &Context, id: ProductId) -> Result<(), CliError> {
    let auth = ctx.state.authorization();
    let product = ctx.api.get_product(auth.as_ref(), id).await?;
    print_json(&product)
}

pub async fn by_category(ctx: &Context, id: CategoryId) -> Result<(), CliError> {
    let auth = ctx.state.authorization();
    let page = ctx.api.get_products_by_category(auth.as_ref(), id).await?;
    print_json(&page)
}
