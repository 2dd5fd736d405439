use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::{Insertable, Queryable};
use serde::Deserialize;
use serde::Serialize;

use crate::schema::customer_order;
use crate::schema::order_item;
use crate::schema::product;

#[derive(Queryable, Serialize, Deserialize, Clone)]
#[diesel(table_name = product)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted: bool,
}

#[derive(Insertable)]
#[diesel(table_name = product)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub image_url: Option<String>,
}

#[derive(Queryable, Serialize)]
#[diesel(table_name = customer_order)]
pub struct CustomerOrder {
    pub id: i32,
    pub user_sub: String,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = customer_order)]
pub struct NewCustomerOrder {
    pub user_sub: String,
    pub total: BigDecimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Serialize)]
#[diesel(table_name = order_item)]
pub struct OrderItem {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
}

#[derive(Insertable)]
#[diesel(table_name = order_item)]
pub struct NewOrderItem {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub price: BigDecimal,
}
