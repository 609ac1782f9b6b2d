use sqlx::PgPool;

use crate::{error::Result, models::{Brand, BrandWithCount}};

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<Brand>> {
    let brand = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(brand)
}

pub async fn find_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Brand>> {
    let brand = sqlx::query_as::<_, Brand>("SELECT * FROM brands WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;

    Ok(brand)
}

pub async fn get_all_with_counts(pool: &PgPool) -> Result<Vec<BrandWithCount>> {
    let brands = sqlx::query_as::<_, BrandWithCount>(
        "SELECT b.*, COUNT(p.id)::bigint AS product_count
         FROM brands b
         LEFT JOIN products p ON p.brand_id = b.id
         GROUP BY b.id
         ORDER BY b.name ASC",
    )
    .fetch_all(pool)
    .await?;

    Ok(brands)
}

pub async fn create_brand(pool: &PgPool, name: &str, slug: &str) -> Result<Brand> {
    let brand = sqlx::query_as::<_, Brand>(
        "INSERT INTO brands (name, slug) VALUES ($1, $2) RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .fetch_one(pool)
    .await?;

    Ok(brand)
}

pub async fn update_brand(
    pool: &PgPool,
    id: i32,
    name: Option<&str>,
    slug: Option<&str>,
) -> Result<Option<Brand>> {
    let brand = sqlx::query_as::<_, Brand>(
        "UPDATE brands SET name = COALESCE($1, name), slug = COALESCE($2, slug)
         WHERE id = $3
         RETURNING *",
    )
    .bind(name)
    .bind(slug)
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(brand)
}

pub async fn delete_brand(pool: &PgPool, id: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM brands WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn count_products(pool: &PgPool, id: i32) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE brand_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(count)
}
