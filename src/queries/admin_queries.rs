use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{
        AdminUserUpdate, Product, ProductRequest, StatsCounts, User, UserListResponse, UserQuery,
        UserRole, UserSummary,
    },
    queries::products_queries::like_pattern,
    utils::pagination::Page,
};

pub async fn create_product(pool: &PgPool, req: &ProductRequest, price: Decimal) -> Result<Product> {
    let product = sqlx::query_as::<_, Product>(
        r#"
        INSERT INTO products (
            name, price, old_price, category_id, brand_id, description, content, image,
            image_gallery, filter_items, colors, is_new, is_sale, is_stocked, product_number
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(price)
    .bind(req.old_price.flatten())
    .bind(req.category_id.flatten())
    .bind(req.brand_id.flatten())
    .bind(&req.description)
    .bind(&req.content)
    .bind(&req.image)
    .bind(req.image_gallery.clone().unwrap_or_default())
    .bind(req.filter_items.clone().unwrap_or_default())
    .bind(req.colors.clone().unwrap_or_default())
    .bind(req.is_new.unwrap_or(false))
    .bind(req.is_sale.unwrap_or(false))
    .bind(req.is_stocked.unwrap_or(true))
    .bind(req.product_number().flatten())
    .fetch_one(pool)
    .await?;

    Ok(product)
}

/// Absent fields keep their value. For the nullable columns a `$n` flag says whether
/// the paired value, possibly NULL, replaces the column.
pub async fn update_product(pool: &PgPool, id: i32, req: &ProductRequest) -> Result<Product> {
    let product_number = req.product_number();

    let product = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET
            name = COALESCE($1, name),
            price = COALESCE($2, price),
            old_price = CASE WHEN $3 THEN $4 ELSE old_price END,
            category_id = CASE WHEN $5 THEN $6 ELSE category_id END,
            brand_id = CASE WHEN $7 THEN $8 ELSE brand_id END,
            description = COALESCE($9, description),
            content = COALESCE($10, content),
            image = COALESCE($11, image),
            image_gallery = COALESCE($12, image_gallery),
            filter_items = COALESCE($13, filter_items),
            colors = COALESCE($14, colors),
            is_new = COALESCE($15, is_new),
            is_sale = COALESCE($16, is_sale),
            is_stocked = COALESCE($17, is_stocked),
            product_number = CASE WHEN $18 THEN $19 ELSE product_number END,
            updated_at = NOW()
        WHERE id = $20
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(req.price)
    .bind(req.old_price.is_some())
    .bind(req.old_price.flatten())
    .bind(req.category_id.is_some())
    .bind(req.category_id.flatten())
    .bind(req.brand_id.is_some())
    .bind(req.brand_id.flatten())
    .bind(&req.description)
    .bind(&req.content)
    .bind(&req.image)
    .bind(&req.image_gallery)
    .bind(&req.filter_items)
    .bind(&req.colors)
    .bind(req.is_new)
    .bind(req.is_sale)
    .bind(req.is_stocked)
    .bind(product_number.is_some())
    .bind(product_number.flatten())
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(product)
}

pub async fn delete_product(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

const USER_SUMMARY_SELECT: &str = "SELECT u.*, \
     COUNT(o.id)::bigint AS order_count, \
     COALESCE(SUM(o.total_amount) FILTER (WHERE o.status = 'COMPLETED'), 0) AS total_spent \
     FROM users u \
     LEFT JOIN orders o ON o.user_id = u.id";

fn push_user_filters(query: &mut QueryBuilder<'_, Postgres>, params: &UserQuery) {
    query.push(" WHERE 1=1");

    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query.push(" AND (u.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR u.email ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(role) = params.role {
        query.push(" AND u.role = ");
        query.push_bind(role);
    }
}

pub async fn search_users(pool: &PgPool, params: &UserQuery) -> Result<UserListResponse> {
    let page = Page::new(params.page, params.limit);

    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM users u");
    push_user_filters(&mut count_query, params);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(USER_SUMMARY_SELECT);
    push_user_filters(&mut query, params);
    query.push(" GROUP BY u.id ORDER BY u.created_at DESC, u.id DESC");
    query.push(" LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let users = query
        .build_query_as::<UserSummary>()
        .fetch_all(pool)
        .await?;

    Ok(UserListResponse {
        users,
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    })
}

pub async fn find_user_summary(pool: &PgPool, id: i32) -> Result<Option<UserSummary>> {
    let user = sqlx::query_as::<_, UserSummary>(&format!(
        "{} WHERE u.id = $1 GROUP BY u.id",
        USER_SUMMARY_SELECT
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn update_user(
    pool: &PgPool,
    id: i32,
    req: &AdminUserUpdate,
    email: Option<&str>,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET
            name = COALESCE($1, name),
            email = COALESCE($2, email),
            role = COALESCE($3, role),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            updated_at = NOW()
        WHERE id = $6
        RETURNING *
        "#,
    )
    .bind(req.name.as_deref().map(str::trim))
    .bind(email)
    .bind(req.role)
    .bind(&req.phone)
    .bind(&req.address)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn delete_user(pool: &PgPool, id: i32) -> Result<u64> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

pub async fn count_admins(pool: &PgPool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = $1")
        .bind(UserRole::Admin)
        .fetch_one(pool)
        .await?;

    Ok(count)
}

pub async fn get_stats(pool: &PgPool) -> Result<StatsCounts> {
    let counts = sqlx::query_as::<_, StatsCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users)::bigint AS total_users,
            (SELECT COUNT(*) FROM products)::bigint AS total_products,
            COUNT(o.id)::bigint AS total_orders,
            COUNT(o.id) FILTER (WHERE o.status = 'PENDING')::bigint AS pending_orders,
            COUNT(o.id) FILTER (WHERE o.status = 'COMPLETED')::bigint AS completed_orders,
            COUNT(o.id) FILTER (WHERE o.status = 'CANCELLED')::bigint AS cancelled_orders,
            COALESCE(SUM(o.total_amount) FILTER (WHERE o.status = 'COMPLETED'), 0) AS total_revenue
        FROM orders o
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(counts)
}
