//! Order history commands.

use clap::Subcommand;

use shopfront_core::OrderId;
use shopfront_storefront::stores::StoreError;
use shopfront_storefront::{AppError, Storefront};

use crate::output;

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List orders with pending cancellation and return requests
    List,
    /// Ask for an order to be cancelled
    Cancel {
        id: String,
        #[arg(long)]
        reason: String,
    },
    /// Ask for an order to be returned
    Return {
        id: String,
        #[arg(long)]
        reason: String,
    },
}

pub async fn run(storefront: &Storefront, action: OrdersAction) -> Result<(), AppError> {
    let queries = storefront.queries();
    match action {
        OrdersAction::List => {
            let (orders, cancellations, returns) =
                tokio::join!(queries.orders(), queries.cancellations(), queries.returns());
            let Some(orders) = orders? else {
                return Err(StoreError::NotAuthenticated.into());
            };
            for order in &orders {
                output::order_row(order);
            }
            for request in cancellations?.unwrap_or_default() {
                output::line(format_args!(
                    "cancellation {} for order {}: {}",
                    request.id, request.order, request.status
                ));
            }
            for request in returns?.unwrap_or_default() {
                output::line(format_args!(
                    "return {} for order {}: {}",
                    request.id, request.order, request.status
                ));
            }
        }
        OrdersAction::Cancel { id, reason } => {
            let order = OrderId::new(id);
            if let Some(current) = queries.order(&order).await?
                && !current.status.is_cancellable()
            {
                return Err(AppError::BadRequest(format!(
                    "order {order} is {} and can no longer be cancelled",
                    current.status
                )));
            }
            let request = queries.request_cancellation(&order, &reason).await?;
            output::line(format_args!("cancellation requested: {}", request.id));
        }
        OrdersAction::Return { id, reason } => {
            let order = OrderId::new(id);
            if let Some(current) = queries.order(&order).await?
                && !current.status.is_returnable()
            {
                return Err(AppError::BadRequest(format!(
                    "order {order} is {} and cannot be returned",
                    current.status
                )));
            }
            let request = queries.request_return(&order, &reason).await?;
            output::line(format_args!("return requested: {}", request.id));
        }
    }
    Ok(())
}
