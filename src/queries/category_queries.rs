use sqlx::PgPool;

use crate::{error::Result, models::{Category, CategoryWithCount}};

/// Find category by ID
pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

/// Find category by slug
pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>("SELECT * FROM categories WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(category)
}

/// All categories with the number of products filed under each
pub async fn get_all_with_counts(pool: &PgPool) -> Result<Vec<CategoryWithCount>> {
    let categories = sqlx::query_as::<_, CategoryWithCount>(
        "SELECT c.*, COUNT(p.id)::bigint AS product_count
         FROM categories c
         LEFT JOIN products p ON p.category_id = c.id
         GROUP BY c.id
         ORDER BY c.name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(categories)
}

pub async fn create_category(
    pool: &PgPool,
    name: &str,
    slug: &str,
    image: Option<&str>,
) -> Result<Category> {
    let category = sqlx::query_as::<_, Category>(
        "INSERT INTO categories (name, slug, image) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .bind(image)
    .fetch_one(pool)
    .await?;

    Ok(category)
}

pub async fn update_category(
    pool: &PgPool,
    id: i32,
    name: Option<&str>,
    slug: Option<&str>,
    image: Option<&str>,
) -> Result<Option<Category>> {
    let category = sqlx::query_as::<_, Category>(
        r#"
        UPDATE categories
        SET
            name = COALESCE($1, name),
            slug = COALESCE($2, slug),
            image = COALESCE($3, image)
        WHERE id = $4
        RETURNING *
        "#,
    )
    .bind(name)
    .bind(slug)
    .bind(image)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(category)
}

pub async fn delete_category(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM categories WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Number of products referencing the category
pub async fn count_products(pool: &PgPool, id: i32) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM products WHERE category_id = $1",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}
