pub mod admin_queries;
pub mod brand_queries;
pub mod category_queries;
pub mod order_queries;
pub mod products_queries;
pub mod user_queries;
