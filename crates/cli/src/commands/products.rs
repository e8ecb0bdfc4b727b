//! Catalog and search commands.

use clap::{Args, Subcommand};

use shopfront_core::{ProductId, ProductRef};
use shopfront_storefront::queries::DEFAULT_SEARCH_LIMIT;
use shopfront_storefront::stores::CatalogSource;
use shopfront_storefront::{AppError, Storefront};

use crate::output;

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products, optionally in one category
    List {
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one product with similar products and reviews
    Show { id: String },
    /// Re-fetch the catalog and rewrite the local cache
    Revalidate,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Search text
    text: String,

    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: u32,
}

pub async fn run(storefront: &Storefront, action: ProductsAction) -> Result<(), AppError> {
    let source = storefront.start().await;
    tracing::debug!(?source, "catalog loaded");

    match action {
        ProductsAction::List { category } => {
            if source == CatalogSource::Unavailable {
                output::hint("catalog unavailable; is SHOPFRONT_API_URL reachable?");
            }
            let products = match category.as_deref() {
                Some(category) => storefront.catalog().by_category(category),
                None => storefront.catalog().products().to_vec(),
            };
            for product in &products {
                output::product_row(product);
            }
            output::line(format_args!("{} products", products.len()));
        }
        ProductsAction::Show { id } => show(storefront, &ProductId::new(id)).await?,
        ProductsAction::Revalidate => {
            let count = storefront.catalog().revalidate().await?;
            output::line(format_args!("catalog refreshed: {count} products"));
        }
    }
    Ok(())
}

async fn show(storefront: &Storefront, id: &ProductId) -> Result<(), AppError> {
    let product = storefront.catalog().fetch_product(id).await?;
    output::product_detail(&product);

    let queries = storefront.queries();
    let (similar, reviews) = tokio::join!(queries.similar(id), queries.reviews(id, 1));

    if let Some(similar) = similar?.filter(|s| !s.is_empty()) {
        output::line("similar:");
        for product in &similar {
            output::product_row(product);
        }
    }
    if let Some(page) = reviews? {
        match page.average_rating() {
            Some(avg) => output::line(format_args!("reviews: {} (average {avg:.1}/5)", page.total)),
            None => output::line("reviews: none yet"),
        }
        for review in &page.reviews {
            output::line(format_args!("  {}/5  {}", review.rating, review.comment));
        }
    }
    Ok(())
}

/// Run a search through the debounced input, as a search box would.
pub async fn search(storefront: &Storefront, args: SearchArgs) -> Result<(), AppError> {
    let queries = storefront.queries();
    queries.search_input().set(args.text);

    let Some(page) = queries.search_settled(args.page, args.limit).await? else {
        return Err(AppError::BadRequest("search text is empty".to_string()));
    };
    for product in &page.products {
        output::product_row(product);
    }
    output::line(format_args!(
        "page {} of {} ({} results)",
        page.page, page.pages, page.total
    ));
    Ok(())
}

/// Reference for `id`, populated from the catalog when it is known there.
pub async fn product_ref(storefront: &Storefront, id: &str) -> ProductRef {
    let id = ProductId::new(id);
    storefront.catalog().bootstrap().await;
    storefront
        .catalog()
        .product(&id)
        .and_then(|p| p.to_ref())
        .unwrap_or_else(|| ProductRef::bare(id))
}
