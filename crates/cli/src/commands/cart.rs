//! Cart commands.

use clap::Subcommand;

use shopfront_core::ProductId;
use shopfront_storefront::stores::StoreError;
use shopfront_storefront::{AppError, Storefront};

use super::products::product_ref;
use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a product
    Add {
        id: String,
        #[arg(short, long)]
        qty: Option<u32>,
    },
    /// Remove a product
    Remove { id: String },
    /// Set a product's quantity
    Set { id: String, qty: u32 },
    /// Remove everything
    Clear,
}

pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), AppError> {
    let cart = storefront.cart();
    match action {
        CartAction::Show => {}
        CartAction::Add { id, qty } => {
            let product = product_ref(storefront, &id).await;
            cart.add(product, qty).await?;
        }
        CartAction::Remove { id } => cart.remove(&ProductId::new(id)).await?,
        CartAction::Set { id, qty } => {
            if qty == 0 {
                return Err(AppError::BadRequest(
                    "quantity must be at least 1; use `cart remove` instead".to_string(),
                ));
            }
            cart.update_quantity(&ProductId::new(id), qty).await?;
        }
        CartAction::Clear => cart.clear().await?,
    }

    if !storefront.session().is_signed_in() {
        return Err(StoreError::NotAuthenticated.into());
    }
    for line in cart.lines() {
        output::cart_line(&line);
    }
    output::line(format_args!(
        "{} items, subtotal {}",
        cart.item_count(),
        cart.subtotal()
    ));
    Ok(())
}
