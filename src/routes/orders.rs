use std::collections::HashMap;

use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use rand::Rng;

use crate::{
    AppState,
    error::{AppError, Result},
    models::{
        CreateOrderRequest, MAX_LINE_QUANTITY, Order, OrderItem, OrderLineRequest, OrderStatus,
        Product, format_order_number, merge_items, order_total,
    },
    queries::{order_queries, products_queries},
    services::upload_service,
    utils::extractors::CurrentUser,
};

const ORDER_NUMBER_ATTEMPTS: usize = 3;

pub async fn create_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>)> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".to_string()));
    }

    payload.shipping_info.validate()?;

    for line in &payload.items {
        validate_quantity(line.product_id, line.quantity)?;
    }

    let mut product_ids: Vec<i32> = payload.items.iter().map(|l| l.product_id).collect();
    product_ids.sort_unstable();
    product_ids.dedup();
    let products = products_queries::find_by_ids(&state.db, &product_ids).await?;

    let items = build_order_items(&payload.items, &products)?;
    let total = order_total(&items);

    let payment_proof = payload
        .payment_proof
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty());

    let mut attempt = 1;
    let order = loop {
        let suffix: u32 = rand::rng().random();
        let order_number = format_order_number(Utc::now(), suffix);

        match order_queries::create_order(
            &state.db,
            current.id,
            &order_number,
            &items,
            &payload.shipping_info,
            total,
            payment_proof,
        )
        .await
        {
            Err(AppError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
                tracing::warn!("Order number {} collided, retrying", order_number);
                attempt += 1;
            }
            result => break result?,
        }
    };

    tracing::info!(
        "Order {} placed by user {} for {}",
        order.order_number,
        current.id,
        order.total_amount
    );

    Ok((StatusCode::CREATED, Json(order)))
}

fn validate_quantity(product_id: i32, quantity: i32) -> Result<()> {
    if quantity <= 0 || quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "Invalid quantity for product {}",
            product_id
        )));
    }
    Ok(())
}

/// Snapshots each line against the current catalog, using server-side prices, then
/// merges lines that resolve to the same product and color. The quantity cap applies
/// to the merged line.
fn build_order_items(
    lines: &[OrderLineRequest],
    products: &HashMap<i32, Product>,
) -> Result<Vec<OrderItem>> {
    let items = lines
        .iter()
        .map(|line| {
            let product = products.get(&line.product_id).ok_or_else(|| {
                AppError::NotFound(format!("Product {} not found", line.product_id))
            })?;

            if !product.is_stocked {
                return Err(AppError::BadRequest(format!(
                    "Product {} is out of stock",
                    product.name
                )));
            }

            let color = match line.color.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
                Some(color) => {
                    let offered = product
                        .colors
                        .iter()
                        .find(|c| c.eq_ignore_ascii_case(color))
                        .ok_or_else(|| {
                            AppError::BadRequest(format!(
                                "Color '{}' is not available for {}",
                                color, product.name
                            ))
                        })?;
                    Some(offered.clone())
                }
                None if product.colors.len() > 1 => {
                    return Err(AppError::BadRequest(format!(
                        "Choose a color for {}",
                        product.name
                    )));
                }
                None => product.colors.first().cloned(),
            };

            Ok(OrderItem {
                product_id: product.id,
                name: product.name.clone(),
                price: product.price,
                quantity: line.quantity,
                color,
                image: product.image.clone(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = merge_items(items);
    for item in &merged {
        validate_quantity(item.product_id, item.quantity)?;
    }

    Ok(merged)
}

pub async fn get_orders(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<Order>>> {
    let orders = order_queries::get_user_orders(&state.db, current.id).await?;

    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = order_queries::find_for_user(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    Ok(Json(order))
}

pub async fn upload_payment_proof(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<Order>> {
    let order = order_queries::find_for_user(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Payment proof cannot be attached to a {} order",
            order.status
        )));
    }

    let file = upload_service::read_files(&mut multipart, &["paymentProof"], 1)
        .await?
        .pop()
        .ok_or_else(|| AppError::BadRequest("No file uploaded".to_string()))?;

    let stored = upload_service::store_upload(&state.uploads, file).await?;

    let order = order_queries::set_payment_proof(&state.db, id, current.id, &stored.url)
        .await?
        .ok_or_else(|| AppError::BadRequest("Order is no longer pending".to_string()))?;

    tracing::info!("Payment proof attached to order {}", order.order_number);

    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let order = order_queries::find_for_user(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;

    if order.status != OrderStatus::Pending {
        return Err(AppError::BadRequest(format!(
            "Only pending orders can be cancelled, this one is {}",
            order.status
        )));
    }

    let order = order_queries::cancel_pending(&state.db, id, current.id)
        .await?
        .ok_or_else(|| AppError::BadRequest("Order is no longer pending".to_string()))?;

    tracing::info!("Order {} cancelled by its owner", order.order_number);

    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn product(id: i32, colors: &[&str], is_stocked: bool) -> Product {
        let now = Utc::now();
        Product {
            id,
            name: format!("Product {}", id),
            price: dec!(19.99),
            old_price: None,
            category_id: None,
            brand_id: None,
            description: None,
            content: None,
            image: Some(format!("http://localhost:3000/uploads/{}.jpg", id)),
            image_gallery: vec![],
            filter_items: vec![],
            colors: colors.iter().map(|c| c.to_string()).collect(),
            is_new: false,
            is_sale: false,
            is_stocked,
            product_number: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn catalog(products: Vec<Product>) -> HashMap<i32, Product> {
        products.into_iter().map(|p| (p.id, p)).collect()
    }

    fn line(product_id: i32, quantity: i32, color: Option<&str>) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
            color: color.map(str::to_string),
        }
    }

    #[test]
    fn items_use_catalog_price_and_color_spelling() {
        let products = catalog(vec![product(1, &["Red", "Blue"], true), product(2, &[], true)]);

        let items =
            build_order_items(&[line(1, 2, Some("red")), line(2, 1, None)], &products).unwrap();

        assert_eq!(items[0].color.as_deref(), Some("Red"));
        assert_eq!(items[0].price, dec!(19.99));
        assert_eq!(items[1].color, None);
        assert_eq!(order_total(&items), dec!(59.97));
    }

    #[test]
    fn single_color_is_implied() {
        let products = catalog(vec![product(1, &["Black"], true)]);
        let items = build_order_items(&[line(1, 1, None)], &products).unwrap();
        assert_eq!(items[0].color.as_deref(), Some("Black"));
    }

    #[test]
    fn rejects_unknown_unstocked_and_ambiguous_lines() {
        let products = catalog(vec![
            product(1, &["Red", "Blue"], true),
            product(2, &[], false),
        ]);

        assert!(matches!(
            build_order_items(&[line(9, 1, None)], &products),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            build_order_items(&[line(2, 1, None)], &products),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            build_order_items(&[line(1, 1, None)], &products),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            build_order_items(&[line(1, 1, Some("green"))], &products),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1, 1).is_ok());
        assert!(validate_quantity(1, MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(1, 0).is_err());
        assert!(validate_quantity(1, MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn spelling_variants_and_implied_color_merge_into_one_line() {
        let products = catalog(vec![product(1, &["Red"], true), product(2, &["Red", "Blue"], true)]);

        let items = build_order_items(
            &[
                line(1, 2, Some("Red")),
                line(2, 1, Some("BLUE")),
                line(1, 3, Some("red")),
                line(1, 4, None),
                line(2, 5, Some("blue")),
            ],
            &products,
        )
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!((items[0].product_id, items[0].color.as_deref()), (1, Some("Red")));
        assert_eq!(items[0].quantity, 9);
        assert_eq!((items[1].product_id, items[1].color.as_deref()), (2, Some("Blue")));
        assert_eq!(items[1].quantity, 6);
    }

    #[test]
    fn merged_quantity_is_capped() {
        let products = catalog(vec![product(1, &["Red"], true)]);

        let result = build_order_items(
            &[
                line(1, MAX_LINE_QUANTITY, Some("Red")),
                line(1, MAX_LINE_QUANTITY, Some("red")),
                line(1, MAX_LINE_QUANTITY, None),
            ],
            &products,
        );

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
