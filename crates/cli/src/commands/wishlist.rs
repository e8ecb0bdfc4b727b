//! Wishlist commands.

use clap::Subcommand;

use shopfront_core::ProductId;
use shopfront_storefront::stores::StoreError;
use shopfront_storefront::{AppError, Storefront};

use super::products::product_ref;
use crate::output;

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show the wishlist
    Show,
    /// Add a product
    Add { id: String },
    /// Remove a product
    Remove { id: String },
}

pub async fn run(storefront: &Storefront, action: WishlistAction) -> Result<(), AppError> {
    let wishlist = storefront.wishlist();
    match action {
        WishlistAction::Show => {
            if !storefront.session().is_signed_in() {
                return Err(StoreError::NotAuthenticated.into());
            }
        }
        WishlistAction::Add { id } => {
            let product = product_ref(storefront, &id).await;
            wishlist.add(product).await?;
        }
        WishlistAction::Remove { id } => wishlist.remove(&ProductId::new(id)).await?,
    }

    for entry in wishlist.entries() {
        output::wishlist_entry(&entry);
    }
    output::line(format_args!("{} saved", wishlist.len()));
    Ok(())
}
