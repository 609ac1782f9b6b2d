use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{OrderResponse, User, UserRole};

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub order_count: i64,
    pub total_spent: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role: Option<UserRole>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListResponse {
    pub users: Vec<UserSummary>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct AdminUserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<UserRole>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, sqlx::FromRow)]
pub struct StatsCounts {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_users: i64,
    pub total_products: i64,
    pub total_orders: i64,
    pub pending_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub total_revenue: Decimal,
    pub recent_orders: Vec<OrderResponse>,
}

impl DashboardStats {
    pub fn new(counts: StatsCounts, recent_orders: Vec<OrderResponse>) -> Self {
        Self {
            total_users: counts.total_users,
            total_products: counts.total_products,
            total_orders: counts.total_orders,
            pending_orders: counts.pending_orders,
            completed_orders: counts.completed_orders,
            cancelled_orders: counts.cancelled_orders,
            total_revenue: counts.total_revenue,
            recent_orders,
        }
    }
}
