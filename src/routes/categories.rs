use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    AppState,
    error::{AppError, Result},
    models::{Brand, BrandWithCount, Category, CategoryWithCount},
    queries::{brand_queries, category_queries},
};

pub async fn get_all_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>> {
    let categories = category_queries::get_all_with_counts(&state.db).await?;
    Ok(Json(categories))
}

pub async fn get_category_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Category>> {
    let category = category_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category '{}' not found", slug)))?;
    Ok(Json(category))
}

pub async fn get_all_brands(State(state): State<AppState>) -> Result<Json<Vec<BrandWithCount>>> {
    let brands = brand_queries::get_all_with_counts(&state.db).await?;
    Ok(Json(brands))
}

pub async fn get_brand_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Brand>> {
    let brand = brand_queries::find_by_slug(&state.db, &slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Brand '{}' not found", slug)))?;
    Ok(Json(brand))
}
