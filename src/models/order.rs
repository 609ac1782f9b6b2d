use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use crate::error::{AppError, Result};

pub const MAX_LINE_QUANTITY: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Pending,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "COMPLETED" => Ok(OrderStatus::Completed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(AppError::BadRequest(format!("Unknown order status '{}'", other))),
        }
    }
}

// DB models

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i32,
    pub order_number: String,
    pub user_id: i32,
    pub items: Json<Vec<OrderItem>>,
    pub shipping_info: Json<ShippingInfo>,
    pub total_amount: Decimal,
    pub payment_proof: Option<String>,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snapshot of a product taken when the order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: i32,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
    pub color: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub note: Option<String>,
}

impl ShippingInfo {
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("fullName", &self.full_name),
            ("phone", &self.phone),
            ("address", &self.address),
            ("city", &self.city),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("{} is required", field)));
            }
        }

        Ok(())
    }
}

// Request types

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: i32,
    pub quantity: i32,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderLineRequest>,
    pub shipping_info: ShippingInfo,
    pub payment_proof: Option<String>,
}

/// Folds snapshots of the same product and color into one line, keeping first-seen
/// order. Colors must already be in the product's own spelling.
pub fn merge_items(items: Vec<OrderItem>) -> Vec<OrderItem> {
    let mut merged: Vec<OrderItem> = Vec::with_capacity(items.len());

    for item in items {
        match merged
            .iter_mut()
            .find(|m| m.product_id == item.product_id && m.color == item.color)
        {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => merged.push(item),
        }
    }

    merged
}

pub fn order_total(items: &[OrderItem]) -> Decimal {
    items
        .iter()
        .map(|item| item.price * Decimal::from(item.quantity))
        .sum()
}

pub fn format_order_number(placed_at: DateTime<Utc>, suffix: u32) -> String {
    format!("ORD-{}-{:08X}", placed_at.format("%Y%m%d"), suffix)
}

// Response types

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderUser {
    pub id: i32,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub user: Option<OrderUser>,
}
