use std::collections::HashMap;

use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    error::Result,
    models::{Product, ProductListResponse, ProductQuery, ProductResponse, ProductRow},
    utils::pagination::Page,
};

const PRODUCT_SELECT: &str = "SELECT p.*, \
     c.name AS category_name, c.slug AS category_slug, \
     b.name AS brand_name, b.slug AS brand_slug \
     FROM products p \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN brands b ON b.id = p.brand_id";

const PRODUCT_COUNT: &str = "SELECT COUNT(*) \
     FROM products p \
     LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN brands b ON b.id = p.brand_id";

const RELATED_LIMIT: i64 = 4;

/// Escapes LIKE wildcards so user input only ever matches literally.
pub fn like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len() + 2);
    escaped.push('%');
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

pub async fn find_by_id(pool: &PgPool, id: i32) -> Result<Option<ProductResponse>> {
    let row = sqlx::query_as::<_, ProductRow>(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.map(ProductResponse::from))
}

pub async fn exists(pool: &PgPool, id: i32) -> Result<bool> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

pub async fn find_by_ids(pool: &PgPool, ids: &[i32]) -> Result<HashMap<i32, Product>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let products = sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;

    Ok(products.into_iter().map(|p| (p.id, p)).collect())
}

pub async fn find_by_product_number(pool: &PgPool, product_number: &str) -> Result<Option<Product>> {
    let product =
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE product_number = $1")
            .bind(product_number)
            .fetch_optional(pool)
            .await?;

    Ok(product)
}

fn push_filters(query: &mut QueryBuilder<'_, Postgres>, params: &ProductQuery) {
    query.push(" WHERE 1=1");

    // text search
    if let Some(search) = params.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        query.push(" AND (p.name ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR p.description ILIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR p.product_number ILIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(ref category) = params.category {
        query.push(" AND c.slug = ");
        query.push_bind(category.clone());
    }

    if let Some(ref brand) = params.brand {
        query.push(" AND b.slug = ");
        query.push_bind(brand.clone());
    }

    if let Some(is_new) = params.is_new {
        query.push(" AND p.is_new = ");
        query.push_bind(is_new);
    }

    if let Some(is_sale) = params.is_sale {
        query.push(" AND p.is_sale = ");
        query.push_bind(is_sale);
    }

    if let Some(in_stock) = params.in_stock {
        query.push(" AND p.is_stocked = ");
        query.push_bind(in_stock);
    }

    // price range
    if let Some(min_price) = params.min_price {
        query.push(" AND p.price >= ");
        query.push_bind(min_price);
    }

    if let Some(max_price) = params.max_price {
        query.push(" AND p.price <= ");
        query.push_bind(max_price);
    }
}

pub async fn search_products(pool: &PgPool, params: &ProductQuery) -> Result<ProductListResponse> {
    let page = Page::new(params.page, params.limit);

    let mut count_query: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_COUNT);
    push_filters(&mut count_query, params);
    let total = count_query
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut query: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_SELECT);
    push_filters(&mut query, params);

    // sort
    query.push(" ORDER BY ");
    query.push(params.sort.unwrap_or_default().order_clause());

    // pagination
    query.push(" LIMIT ");
    query.push_bind(page.limit);
    query.push(" OFFSET ");
    query.push_bind(page.offset());

    let rows = query.build_query_as::<ProductRow>().fetch_all(pool).await?;

    Ok(ProductListResponse {
        products: rows.into_iter().map(ProductResponse::from).collect(),
        total,
        page: page.page,
        limit: page.limit,
        total_pages: page.total_pages(total),
    })
}

pub async fn find_related(pool: &PgPool, product: &Product) -> Result<Vec<ProductResponse>> {
    let Some(category_id) = product.category_id else {
        return Ok(Vec::new());
    };

    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "{} WHERE p.category_id = $1 AND p.id <> $2 ORDER BY p.is_stocked DESC, p.created_at DESC LIMIT $3",
        PRODUCT_SELECT
    ))
    .bind(category_id)
    .bind(product.id)
    .bind(RELATED_LIMIT)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductResponse::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SortBy;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("shoe"), "%shoe%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn filters_bind_every_supplied_value() {
        let params = ProductQuery {
            search: Some("  linen ".to_string()),
            category: Some("shirts".to_string()),
            is_sale: Some(true),
            sort: Some(SortBy::PriceAsc),
            ..Default::default()
        };

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_COUNT);
        push_filters(&mut query, &params);
        let sql = query.sql();

        assert!(sql.contains("p.name ILIKE $1"));
        assert!(sql.contains("p.product_number ILIKE $3"));
        assert!(sql.contains("c.slug = $4"));
        assert!(sql.contains("p.is_sale = $5"));
        assert!(!sql.contains("b.slug"));
    }

    #[test]
    fn blank_search_adds_no_clause() {
        let params = ProductQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(PRODUCT_COUNT);
        push_filters(&mut query, &params);

        assert!(!query.sql().contains("ILIKE"));
    }
}
