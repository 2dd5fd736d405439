use std::{error::Error, fmt::Debug};

use anyhow::Context;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::{Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    models::{CustomerOrder, NewCustomerOrder, NewOrderItem, OrderItem, Product},
    schema::{customer_order, order_item, product},
    telemetry::spawn_blocking_with_tracing,
    utils::{error_fmt_chain, DbConnection},
};

// One entry of an incoming cart
#[derive(Deserialize, Debug, Clone)]
pub struct CartItem {
    pub product_id: Option<i32>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

// An order line with the product name resolved at read time
#[derive(Serialize, Debug)]
pub struct OrderLine {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub price: BigDecimal,
    pub subtotal: BigDecimal,
}

#[derive(Serialize, Debug)]
pub struct OrderWithItems {
    pub id: i32,
    pub user_sub: String,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

#[derive(Error)]
pub enum PlaceOrderError {
    #[error("Order must include a list of items")]
    EmptyCart,
    #[error("Invalid item details: product_id: {product_id:?}, quantity: {quantity}")]
    InvalidItem {
        product_id: Option<i32>,
        quantity: i32,
    },
    #[error("Product with ID {0} not found")]
    ProductNotFound(i32),
    #[error("Product '{0}' is no longer available")]
    ProductDeleted(String),
    #[error("Insufficient stock for product '{0}'")]
    InsufficientStock(String),
    #[error("Tokio threadpool error occured")]
    ThreadpoolError(#[from] tokio::task::JoinError),
    #[error("Failed to run query")]
    RunQueryError(#[from] diesel::result::Error),
}

impl Debug for PlaceOrderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)?;
        error_fmt_chain(f, &self.source())
    }
}

pub(crate) fn line_subtotal(price: &BigDecimal, quantity: i32) -> BigDecimal {
    price * BigDecimal::from(quantity)
}

// The order-placement transaction. Every cart line is validated and its
// stock decremented under a row lock before anything is committed; a
// failure on any line rolls back all of it, so a cart with one bad line
// leaves no trace.
#[tracing::instrument(
    "Placing order",
    skip(conn, cart)
)]
pub async fn place_order(
    mut conn: DbConnection,
    user_sub: String,
    cart: Vec<CartItem>,
) -> Result<OrderWithItems, PlaceOrderError> {
    if cart.is_empty() {
        return Err(PlaceOrderError::EmptyCart);
    }

    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<OrderWithItems, PlaceOrderError, _>(|conn| {
            let mut total = BigDecimal::from(0);
            let mut pending_lines: Vec<(Product, i32)> = Vec::new();

            for entry in cart.iter() {
                let product_id = match entry.product_id {
                    Some(id) if entry.quantity > 0 => id,
                    _ => {
                        return Err(PlaceOrderError::InvalidItem {
                            product_id: entry.product_id,
                            quantity: entry.quantity,
                        })
                    }
                };

                // FOR UPDATE serializes concurrent decrements of the same
                // product; the stock check below reads the locked row.
                let item: Product = product::table
                    .find(product_id)
                    .for_update()
                    .first::<Product>(conn)
                    .optional()?
                    .ok_or(PlaceOrderError::ProductNotFound(product_id))?;

                if item.deleted {
                    return Err(PlaceOrderError::ProductDeleted(item.name));
                }

                if item.stock < entry.quantity {
                    return Err(PlaceOrderError::InsufficientStock(item.name));
                }

                diesel::update(product::table.find(item.id))
                    .set((
                        product::stock.eq(item.stock - entry.quantity),
                        product::updated_at.eq(Utc::now()),
                    ))
                    .execute(conn)?;

                total += line_subtotal(&item.price, entry.quantity);
                pending_lines.push((item, entry.quantity));
            }

            let order: CustomerOrder = diesel::insert_into(customer_order::table)
                .values(NewCustomerOrder {
                    user_sub,
                    total,
                    created_at: Utc::now(),
                })
                .get_result(conn)?;

            let mut items = Vec::new();
            for (item, quantity) in pending_lines {
                // Unit price is snapshotted here; later catalog edits must
                // not change what this order was charged.
                diesel::insert_into(order_item::table)
                    .values(NewOrderItem {
                        order_id: order.id,
                        product_id: item.id,
                        quantity,
                        price: item.price.clone(),
                    })
                    .execute(conn)?;

                items.push(OrderLine {
                    product_id: item.id,
                    subtotal: line_subtotal(&item.price, quantity),
                    product_name: item.name,
                    quantity,
                    price: item.price,
                });
            }

            Ok(OrderWithItems {
                id: order.id,
                user_sub: order.user_sub,
                total: order.total,
                created_at: order.created_at,
                items,
            })
        })
    })
    .await??;

    Ok(res)
}

#[tracing::instrument(
    "Getting orders for user",
    skip(conn)
)]
pub async fn get_orders_for_user(
    mut conn: DbConnection,
    user_sub: String,
) -> Result<Vec<OrderWithItems>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Vec<OrderWithItems>, anyhow::Error, _>(|conn| {
            let orders: Vec<CustomerOrder> = customer_order::table
                .filter(customer_order::user_sub.eq(&user_sub))
                .order(customer_order::id.asc())
                .load::<CustomerOrder>(conn)
                .context("Failed to load orders for user")?;

            orders
                .into_iter()
                .map(|order| resolve_order_items(conn, order))
                .collect()
        })
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(res)
}

#[tracing::instrument(
    "Getting order by id",
    skip(conn)
)]
pub async fn get_order_by_id(
    mut conn: DbConnection,
    order_id: i32,
) -> Result<Option<OrderWithItems>, anyhow::Error> {
    let res = spawn_blocking_with_tracing(move || {
        conn.transaction::<Option<OrderWithItems>, anyhow::Error, _>(|conn| {
            let order: Option<CustomerOrder> = customer_order::table
                .find(order_id)
                .first::<CustomerOrder>(conn)
                .optional()
                .context("Failed to load order")?;

            match order {
                Some(order) => Ok(Some(resolve_order_items(conn, order)?)),
                None => Ok(None),
            }
        })
    })
    .await
    .context("Failed due to threadpool error")??;

    Ok(res)
}

// Products are never hard-deleted, so the name join here succeeds for
// soft-deleted products too and order history stays readable.
fn resolve_order_items(
    conn: &mut DbConnection,
    order: CustomerOrder,
) -> Result<OrderWithItems, anyhow::Error> {
    let lines: Vec<(OrderItem, String)> = order_item::table
        .inner_join(product::table)
        .filter(order_item::order_id.eq(order.id))
        .select((order_item::all_columns, product::name))
        .load::<(OrderItem, String)>(conn)
        .context("Failed to load order items")?;

    let items = lines
        .into_iter()
        .map(|(item, product_name)| OrderLine {
            product_id: item.product_id,
            product_name,
            quantity: item.quantity,
            subtotal: line_subtotal(&item.price, item.quantity),
            price: item.price,
        })
        .collect();

    Ok(OrderWithItems {
        id: order.id,
        user_sub: order.user_sub,
        total: order.total,
        created_at: order.created_at,
        items,
    })
}
