use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        AdminUserUpdate, Brand, BrandWithCount, Category, CategoryWithCount, CreateBrandRequest,
        CreateCategoryRequest, DashboardStats, OrderListResponse, OrderQuery, OrderResponse,
        OrderStatus, ProductListResponse, ProductQuery, ProductRequest, ProductResponse,
        UpdateBrandRequest, UpdateCategoryRequest, UpdateOrderStatusRequest, User,
        UserListResponse, UserQuery, UserRole, UserSummary,
    },
    queries::{
        admin_queries, brand_queries, category_queries, order_queries, products_queries,
        user_queries,
    },
    utils::{extractors::CurrentUser, slug::slugify, validation},
};

const RECENT_ORDERS: i64 = 5;

//DASHBOARD
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    let counts = admin_queries::get_stats(&state.db).await?;
    let recent = order_queries::recent_orders(&state.db, RECENT_ORDERS).await?;

    Ok(Json(DashboardStats::new(counts, recent)))
}

//PRODUCT ROUTES
pub async fn search_products(
    State(state): State<AppState>,
    Query(params): Query<ProductQuery>,
) -> Result<Json<ProductListResponse>> {
    let response = products_queries::search_products(&state.db, &params).await?;

    Ok(Json(response))
}

async fn validate_product(state: &AppState, payload: &ProductRequest, id: Option<i32>) -> Result<()> {
    if let Some(ref name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name cannot be empty".to_string()));
        }
    }

    if let Some(price) = payload.price {
        if price <= Decimal::ZERO {
            return Err(AppError::BadRequest("price must be greater than zero".to_string()));
        }
    }

    if let Some(Some(old_price)) = payload.old_price {
        if old_price.is_sign_negative() {
            return Err(AppError::BadRequest("oldPrice cannot be negative".to_string()));
        }
    }

    if let Some(Some(category_id)) = payload.category_id {
        if category_queries::find_by_id(&state.db, category_id)
            .await?
            .is_none()
        {
            return Err(AppError::NotFound(format!(
                "Category with id {} not found",
                category_id
            )));
        }
    }

    if let Some(Some(brand_id)) = payload.brand_id {
        if brand_queries::find_by_id(&state.db, brand_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Brand with id {} not found",
                brand_id
            )));
        }
    }

    if let Some(Some(product_number)) = payload.product_number() {
        if let Some(existing) =
            products_queries::find_by_product_number(&state.db, product_number).await?
        {
            if Some(existing.id) != id {
                return Err(AppError::Conflict(format!(
                    "Product number '{}' is already in use",
                    product_number
                )));
            }
        }
    }

    Ok(())
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<ProductRequest>,
) -> Result<(StatusCode, Json<ProductResponse>)> {
    if payload.name.is_none() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }

    let price = payload
        .price
        .ok_or_else(|| AppError::BadRequest("price is required".to_string()))?;

    validate_product(&state, &payload, None).await?;

    let product = admin_queries::create_product(&state.db, &payload, price).await?;
    let response = products_queries::find_by_id(&state.db, product.id)
        .await?
        .ok_or_else(|| AppError::InternalError("Created product vanished".to_string()))?;

    tracing::info!("Created product {}", product.id);

    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ProductRequest>,
) -> Result<Json<ProductResponse>> {
    if !products_queries::exists(&state.db, id).await? {
        return Err(AppError::NotFound(format!(
            "Product with id {} not found",
            id
        )));
    }

    validate_product(&state, &payload, Some(id)).await?;

    let product = admin_queries::update_product(&state.db, id, &payload).await?;
    let response = products_queries::find_by_id(&state.db, product.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product with id {} not found", id)))?;

    Ok(Json(response))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if admin_queries::delete_product(&state.db, id).await? == 0 {
        return Err(AppError::NotFound("Product not found".to_string()));
    }

    tracing::info!("Deleted product {}", id);

    Ok(StatusCode::NO_CONTENT)
}

//CATEGORY ROUTES
fn resolve_slug(slug: Option<&str>, name: &str) -> Result<String> {
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(slug) => slugify(slug),
        None => slugify(name),
    };

    if slug.is_empty() {
        return Err(AppError::BadRequest(
            "A slug could not be derived from the name".to_string(),
        ));
    }

    Ok(slug)
}

pub async fn get_all_categories(
    State(state): State<AppState>,
) -> Result<Json<Vec<CategoryWithCount>>> {
    let categories = category_queries::get_all_with_counts(&state.db).await?;
    Ok(Json(categories))
}

pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>)> {
    validation::validate_name(&payload.name)?;
    let slug = resolve_slug(payload.slug.as_deref(), &payload.name)?;

    if category_queries::find_by_slug(&state.db, &slug)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "Category with slug '{}' already exists",
            slug
        )));
    }

    let category = category_queries::create_category(
        &state.db,
        payload.name.trim(),
        &slug,
        payload.image.as_deref(),
    )
    .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<Json<Category>> {
    if category_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Category with id {} not found",
            id
        )));
    }

    if let Some(ref name) = payload.name {
        validation::validate_name(name)?;
    }

    let slug = match payload.slug {
        Some(ref raw) => {
            let slug = resolve_slug(Some(raw), raw)?;
            if let Some(existing) = category_queries::find_by_slug(&state.db, &slug).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "Another category with slug '{}' already exists",
                        slug
                    )));
                }
            }
            Some(slug)
        }
        None => None,
    };

    let category = category_queries::update_category(
        &state.db,
        id,
        payload.name.as_deref().map(str::trim),
        slug.as_deref(),
        payload.image.as_deref(),
    )
    .await?
    .ok_or(AppError::NotFound(format!(
        "Category with id {} not found",
        id
    )))?;

    Ok(Json(category))
}

pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if category_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Category with id {} not found",
            id
        )));
    }

    let in_use = category_queries::count_products(&state.db, id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category is used by {} product(s)",
            in_use
        )));
    }

    category_queries::delete_category(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//BRAND ROUTES
pub async fn get_all_brands(State(state): State<AppState>) -> Result<Json<Vec<BrandWithCount>>> {
    let brands = brand_queries::get_all_with_counts(&state.db).await?;
    Ok(Json(brands))
}

pub async fn create_brand(
    State(state): State<AppState>,
    Json(payload): Json<CreateBrandRequest>,
) -> Result<(StatusCode, Json<Brand>)> {
    validation::validate_name(&payload.name)?;
    let slug = resolve_slug(payload.slug.as_deref(), &payload.name)?;

    if brand_queries::find_by_slug(&state.db, &slug).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Brand with slug '{}' already exists",
            slug
        )));
    }

    let brand = brand_queries::create_brand(&state.db, payload.name.trim(), &slug).await?;

    Ok((StatusCode::CREATED, Json(brand)))
}

pub async fn update_brand(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateBrandRequest>,
) -> Result<Json<Brand>> {
    if brand_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Brand with id {} not found", id)));
    }

    if let Some(ref name) = payload.name {
        validation::validate_name(name)?;
    }

    let slug = match payload.slug {
        Some(ref raw) => {
            let slug = resolve_slug(Some(raw), raw)?;
            if let Some(existing) = brand_queries::find_by_slug(&state.db, &slug).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!(
                        "Another brand with slug '{}' already exists",
                        slug
                    )));
                }
            }
            Some(slug)
        }
        None => None,
    };

    let brand = brand_queries::update_brand(
        &state.db,
        id,
        payload.name.as_deref().map(str::trim),
        slug.as_deref(),
    )
    .await?
    .ok_or(AppError::NotFound(format!("Brand with id {} not found", id)))?;

    Ok(Json(brand))
}

pub async fn delete_brand(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    if brand_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Brand with id {} not found", id)));
    }

    let in_use = brand_queries::count_products(&state.db, id).await?;
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Brand is used by {} product(s)",
            in_use
        )));
    }

    brand_queries::delete_brand(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//USER ROUTES
pub async fn search_users(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<UserListResponse>> {
    let response = admin_queries::search_users(&state.db, &params).await?;

    Ok(Json(response))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<UserSummary>> {
    let user = admin_queries::find_user_summary(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

    Ok(Json(user))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<AdminUserUpdate>,
) -> Result<Json<User>> {
    let target = user_queries::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;

    if let Some(ref name) = payload.name {
        validation::validate_name(name)?;
    }

    if target.role == UserRole::Admin
        && payload.role == Some(UserRole::User)
        && admin_queries::count_admins(&state.db).await? <= 1
    {
        return Err(AppError::BadRequest(
            "The last administrator cannot be demoted".to_string(),
        ));
    }

    let email = match payload.email {
        Some(ref email) => {
            validation::validate_email(email)?;
            let email = validation::normalize_email(email);
            if let Some(existing) = user_queries::find_by_email(&state.db, &email).await? {
                if existing.id != id {
                    return Err(AppError::Conflict("Email already registered".to_string()));
                }
            }
            Some(email)
        }
        None => None,
    };

    let user = admin_queries::update_user(&state.db, id, &payload, email.as_deref()).await?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if id == current.id {
        return Err(AppError::BadRequest(
            "You cannot delete your own account".to_string(),
        ));
    }

    if user_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("User with id {} not found", id)));
    }

    if order_queries::count_for_user(&state.db, id).await? > 0 {
        return Err(AppError::Conflict(
            "User has orders and cannot be deleted".to_string(),
        ));
    }

    admin_queries::delete_user(&state.db, id).await?;

    tracing::info!("Admin {} deleted user {}", current.id, id);

    Ok(StatusCode::NO_CONTENT)
}

//ORDER ROUTES
pub async fn get_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderQuery>,
) -> Result<Json<OrderListResponse>> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<OrderStatus>)
        .transpose()?;

    let response = order_queries::search_orders(&state.db, &params, status).await?;

    Ok(Json(response))
}

pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<OrderResponse>> {
    let order = order_queries::find_with_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with id {} not found", id)))?;

    Ok(Json(order))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> Result<Json<OrderResponse>> {
    let status: OrderStatus = payload.status.parse()?;

    order_queries::update_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with id {} not found", id)))?;

    let order = order_queries::find_with_user(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order with id {} not found", id)))?;

    tracing::info!("Order {} set to {}", order.order.order_number, status);

    Ok(Json(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    if order_queries::find_by_id(&state.db, id).await?.is_none() {
        return Err(AppError::NotFound(format!("Order with id {} not found", id)));
    }

    order_queries::delete_order(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::resolve_slug;

    #[test]
    fn slug_falls_back_to_name() {
        assert_eq!(resolve_slug(None, "Running Shoes").unwrap(), "running-shoes");
        assert_eq!(resolve_slug(Some("  "), "Bags").unwrap(), "bags");
        assert_eq!(resolve_slug(Some("Summer Sale"), "ignored").unwrap(), "summer-sale");
        assert!(resolve_slug(None, "!!!").is_err());
    }
}
