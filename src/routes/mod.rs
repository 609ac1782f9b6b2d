mod admin;
mod categories;
mod health;
mod login;
mod orders;
mod products;
mod profile;
mod register;
mod upload;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    middleware::{admin_middleware, auth_middleware},
};

pub fn create_router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/api/auth/register", post(register::register_user))
        .route("/api/auth/login", post(login::login_user))
        .route("/api/products", get(products::search_products))
        .route("/api/products/{id}", get(products::get_product))
        .route(
            "/api/products/{id}/related",
            get(products::get_related_products),
        )
        .route("/api/categories", get(categories::get_all_categories))
        .route(
            "/api/categories/{slug}",
            get(categories::get_category_by_slug),
        )
        .route("/api/brands", get(categories::get_all_brands))
        .route("/api/brands/{slug}", get(categories::get_brand_by_slug));

    let authenticated = Router::new()
        .route("/api/auth/me", get(profile::get_profile))
        .route(
            "/api/profile",
            get(profile::get_profile).put(profile::update_profile),
        )
        .route("/api/profile/password", put(profile::change_password))
        .route("/api/profile/orders", get(profile::get_my_orders))
        .route(
            "/api/orders",
            post(orders::create_order).get(orders::get_orders),
        )
        .route("/api/orders/{id}", get(orders::get_order))
        .route(
            "/api/orders/{id}/payment-proof",
            post(orders::upload_payment_proof),
        )
        .route("/api/orders/{id}/cancel", put(orders::cancel_order))
        .route("/api/upload", post(upload::upload_single))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin = Router::new()
        .route("/api/upload/multiple", post(upload::upload_multiple))
        .route("/api/admin/stats", get(admin::get_stats))
        .route(
            "/api/admin/products",
            get(admin::search_products).post(admin::create_product),
        )
        .route(
            "/api/admin/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route(
            "/api/admin/categories",
            get(admin::get_all_categories).post(admin::create_category),
        )
        .route(
            "/api/admin/categories/{id}",
            put(admin::update_category).delete(admin::delete_category),
        )
        .route(
            "/api/admin/brands",
            get(admin::get_all_brands).post(admin::create_brand),
        )
        .route(
            "/api/admin/brands/{id}",
            put(admin::update_brand).delete(admin::delete_brand),
        )
        .route("/api/admin/users", get(admin::search_users))
        .route(
            "/api/admin/users/{id}",
            get(admin::get_user)
                .put(admin::update_user)
                .delete(admin::delete_user),
        )
        .route("/api/admin/orders", get(admin::get_orders))
        .route(
            "/api/admin/orders/{id}",
            get(admin::get_order).delete(admin::delete_order),
        )
        .route(
            "/api/admin/orders/{id}/status",
            put(admin::update_order_status),
        )
        .route_layer(middleware::from_fn_with_state(state, admin_middleware));

    Router::new().merge(public).merge(authenticated).merge(admin)
}
