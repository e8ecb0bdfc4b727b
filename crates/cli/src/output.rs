//! Terminal output.

use tokio::sync::broadcast::Receiver;

use shopfront_core::{CartLine, Order, ProductRecord, WishlistEntry};
use shopfront_storefront::notify::{Notice, NoticeLevel};

#[allow(clippy::print_stdout)]
pub fn line(text: impl std::fmt::Display) {
    println!("{text}");
}

#[allow(clippy::print_stderr)]
pub fn hint(text: &str) {
    eprintln!("hint: {text}");
}

/// Print every notice published while the command ran.
#[allow(clippy::print_stderr)]
pub fn notices(mut rx: Receiver<Notice>) {
    while let Ok(notice) = rx.try_recv() {
        match notice.level {
            NoticeLevel::Success => eprintln!("ok: {}", notice.message),
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
        }
    }
}

pub fn product_row(product: &ProductRecord) {
    let id = product.id.as_ref().map_or("-", |id| id.as_str());
    line(format_args!(
        "{id:<26} {price:>10}  {name} [{category}]",
        price = product.effective_price().to_string(),
        name = product.name,
        category = product.category,
    ));
}

pub fn product_detail(product: &ProductRecord) {
    product_row(product);
    if !product.brand.is_empty() {
        line(format_args!("  brand: {}", product.brand));
    }
    if let Some(sale) = product.discount_price {
        line(format_args!("  list price: {} (on sale for {sale})", product.price));
    }
    if let Some(stock) = product.stock {
        line(format_args!("  stock: {stock}"));
    }
    if !product.description.is_empty() {
        line(format_args!("  {}", product.description));
    }
    for (key, value) in &product.specifications {
        line(format_args!("  {key}: {value}"));
    }
}

pub fn cart_line(cart_line: &CartLine) {
    let name = cart_line.product.name.as_deref().unwrap_or("(unnamed)");
    let total = cart_line.total().map_or_else(|| "-".to_string(), |t| t.to_string());
    line(format_args!(
        "{id:<26} x{qty:<4} {total:>10}  {name}",
        id = cart_line.product_id().as_str(),
        qty = cart_line.quantity,
    ));
}

pub fn wishlist_entry(entry: &WishlistEntry) {
    let name = entry.product.name.as_deref().unwrap_or("(unnamed)");
    line(format_args!("{:<26} {name}", entry.product_id().as_str()));
}

pub fn order_row(order: &Order) {
    line(format_args!(
        "{id:<26} {status:<11} {total:>10}  {date}  ({items} items)",
        id = order.id.as_str(),
        status = order.status.to_string(),
        total = order.total.to_string(),
        date = order.created_at.format("%Y-%m-%d"),
        items = order.items.len(),
    ));
}
