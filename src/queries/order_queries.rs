use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::Result,
    models::{Order, OrderItem, OrderListResponse, OrderQuery, OrderResponse, OrderStatus, OrderUser, ShippingInfo},
    queries::products_queries::like_pattern,
    utils::pagination::Page,
};

const ORDER_WITH_USER_SELECT: &str = "SELECT o.*, u.name AS user_name, u.email AS user_email \
     FROM orders o \
     JOIN users u ON u.id = o.user_id";

#[derive(sqlx::FromRow)]
struct OrderWithUserRow {
    #[sqlx(flatten)]
    order: Order,
    user_name: String,
    user_email: String,
}

impl From<OrderWithUserRow> for OrderResponse {
    fn from(row: OrderWithUserRow) -> Self {
        let user = OrderUser {
            id: row.order.user_id,
            name: row.user_name,
            email: row.user_email,
        };

        OrderResponse {
            order: row.order,
            user: Some(user),
        }
    }
}

pub async fn create_order(
    pool: &PgPool,
    user_id: i32,
    order_number: &str,
    items: &[OrderItem],
    shipping_info: &ShippingInfo,
    total_amount: Decimal,
    payment_proof: Option<&str>,
) -> Result<Order> {
    let order = sqlx::query_as::<_, Order>(
        "INSERT INTO orders (order_number, user_id, items, shipping_info, total_amount, payment_proof)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING *",
    )
    .bind(order_number)
    .bind(user_id)
    .bind(Json(items))
    .bind(Json(shipping_info))
    .bind(total_amount)
    .bind(payment_proof)
    .fetch_one(pool)
    .await?;

    Ok(order)
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(order)
}

pub async fn find_for_user(pool: &PgPool, id: i32, user_id: i32) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    Ok(order)
}

pub async fn find_with_user(pool: &PgPool, id: i32) -> Result<Option<OrderResponse>> {
    let row = sqlx::query_as::<_, OrderWithUserRow>(&format!(
        "{} WHERE o.id = $1",
        ORDER_WITH_USER_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(OrderResponse::from))
}

pub async fn get_user_orders(pool: &PgPool, user_id: i32) -> Result<Vec<Order>> {
    let orders = sqlx::query_as::<_, Order>(
        "SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(orders)
}

/// Attaches a payment proof; only pending orders owned by the user are touched.
pub async fn set_payment_proof(
    pool: &PgPool,
    id: i32,
    user_id: i32,
    payment_proof: &str,
) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET payment_proof = $1, updated_at = NOW()
         WHERE id = $2 AND user_id = $3 AND status = 'PENDING'
         RETURNING *",
    )
    .bind(payment_proof)
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

/// Cancels a pending order owned by the user. Returns `None` if it was not pending.
pub async fn cancel_pending(pool: &PgPool, id: i32, user_id: i32) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = 'CANCELLED', updated_at = NOW()
         WHERE id = $1 AND user_id = $2 AND status = 'PENDING'
         RETURNING *",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

pub async fn update_status(pool: &PgPool, id: i32, status: OrderStatus) -> Result<Option<Order>> {
    let order = sqlx::query_as::<_, Order>(
        "UPDATE orders SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING *",
    )
    .bind(status)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(order)
}

pub async fn delete_order(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_for_user(pool: &PgPool, user_id: i32) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

fn push_filters(
    query: &mut QueryBuilder<'_, Postgres>,
    status: Option<OrderStatus>,
    search: Option<&str>,
) {
    query.push(" WHERE 1=1");

    if let Some(status) = status {
        query.push(" AND o.status = ");
        query.push_bind(status);
    }

    if let Some(search) = search.map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query.push(" AND (o.order_number ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR u.email ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR u.name ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }
}

pub async fn search_orders(
    pool: &PgPool,
    params: &OrderQuery,
    status: Option<OrderStatus>,
) -> Result<OrderListResponse> {
    let page = Page::new(params.page, params.limit);

    let mut count_query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id");
    push_filters(&mut count_query, status, params.search.as_deref());
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(ORDER_WITH_USER_SELECT);
    push_filters(&mut query, status, params.search.as_deref());
    query.push(" ORDER BY o.created_at DESC, o.id DESC");
    query.push(" LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows = query
        .build_query_as::<OrderWithUserRow>()
        .fetch_all(pool)
        .await?;

    Ok(OrderListResponse {
        orders: rows.into_iter().map(OrderResponse::from).collect(),
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    })
}

pub async fn recent_orders(pool: &PgPool, limit: i64) -> Result<Vec<OrderResponse>> {
    let rows = sqlx::query_as::<_, OrderWithUserRow>(&format!(
        "{} ORDER BY o.created_at DESC, o.id DESC LIMIT $1",
        ORDER_WITH_USER_SELECT
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(OrderResponse::from).collect())
}
