use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

// DB models

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub old_price: Option<Decimal>,
    pub category_id: Option<i32>,
    pub brand_id: Option<i32>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub image_gallery: Vec<String>,
    pub filter_items: Vec<String>,
    pub colors: Vec<String>,
    pub is_new: bool,
    pub is_sale: bool,
    pub is_stocked: bool,
    pub product_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product joined with the names of its category and brand.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    #[sqlx(flatten)]
    pub product: Product,
    pub category_name: Option<String>,
    pub category_slug: Option<String>,
    pub brand_name: Option<String>,
    pub brand_slug: Option<String>,
}

// Request types

/// Partial product payload. The nullable columns use `Option<Option<T>>`: an absent
/// key leaves the column alone, an explicit `null` clears it.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "nullable")]
    pub old_price: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub brand_id: Option<Option<i32>>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub image: Option<String>,
    pub image_gallery: Option<Vec<String>>,
    pub filter_items: Option<Vec<String>>,
    pub colors: Option<Vec<String>>,
    pub is_new: Option<bool>,
    pub is_sale: Option<bool>,
    pub is_stocked: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub product_number: Option<Option<String>>,
}

impl ProductRequest {
    /// The product number to store, with a blank string treated as a clear.
    pub fn product_number(&self) -> Option<Option<&str>> {
        self.product_number.as_ref().map(|number| {
            number
                .as_deref()
                .map(str::trim)
                .filter(|number| !number.is_empty())
        })
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Newest,
    Oldest,
    PriceAsc,
    PriceDesc,
    Name,
}

impl SortBy {
    pub fn order_clause(self) -> &'static str {
        match self {
            SortBy::Newest => "p.created_at DESC, p.id DESC",
            SortBy::Oldest => "p.created_at ASC, p.id ASC",
            SortBy::PriceAsc => "p.price ASC, p.id ASC",
            SortBy::PriceDesc => "p.price DESC, p.id DESC",
            SortBy::Name => "p.name ASC, p.id ASC",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub brand: Option<String>,
    pub is_new: Option<bool>,
    pub is_sale: Option<bool>,
    pub in_stock: Option<bool>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<SortBy>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// Response types

#[derive(Debug, Clone, Serialize)]
pub struct RelationRef {
    pub id: i32,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: Product,
    pub category: Option<RelationRef>,
    pub brand: Option<RelationRef>,
}

impl From<ProductRow> for ProductResponse {
    fn from(row: ProductRow) -> Self {
        let category = match (row.product.category_id, row.category_name, row.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(RelationRef { id, name, slug }),
            _ => None,
        };
        let brand = match (row.product.brand_id, row.brand_name, row.brand_slug) {
            (Some(id), Some(name), Some(slug)) => Some(RelationRef { id, name, slug }),
            _ => None,
        };

        Self {
            product: row.product,
            category,
            brand,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn sample_product() -> Product {
        let now = Utc::now();
        Product {
            id: 7,
            name: "Linen shirt".to_string(),
            price: dec!(49.90),
            old_price: Some(dec!(59.90)),
            category_id: Some(2),
            brand_id: None,
            description: None,
            content: None,
            image: Some("http://localhost:3000/uploads/a.jpg".to_string()),
            image_gallery: vec![],
            filter_items: vec!["summer".to_string()],
            colors: vec!["white".to_string()],
            is_new: true,
            is_sale: true,
            is_stocked: true,
            product_number: Some("SKU-7".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn relation_fields_are_nested_in_the_response() {
        let row = ProductRow {
            product: sample_product(),
            category_name: Some("Shirts".to_string()),
            category_slug: Some("shirts".to_string()),
            brand_name: None,
            brand_slug: None,
        };

        let json = serde_json::to_value(ProductResponse::from(row)).unwrap();

        assert_eq!(json["category"]["slug"], "shirts");
        assert_eq!(json["categoryId"], 2);
        assert!(json["brand"].is_null());
        assert_eq!(json["oldPrice"], 59.9);
        assert_eq!(json["isStocked"], true);
        assert_eq!(json["filterItems"][0], "summer");
    }

    #[test]
    fn explicit_null_clears_while_absent_keeps() {
        let req: ProductRequest = serde_json::from_value(serde_json::json!({
            "oldPrice": null,
            "categoryId": 3,
            "productNumber": "  ",
        }))
        .unwrap();

        assert_eq!(req.old_price, Some(None));
        assert_eq!(req.category_id, Some(Some(3)));
        assert_eq!(req.brand_id, None);
        assert_eq!(req.product_number(), Some(None));

        let untouched: ProductRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(untouched.old_price, None);
        assert_eq!(untouched.product_number(), None);
    }

    #[test]
    fn sort_is_parsed_from_snake_case() {
        let query: ProductQuery =
            serde_json::from_value(serde_json::json!({ "sort": "price_desc", "isNew": true }))
                .unwrap();
        assert_eq!(query.sort, Some(SortBy::PriceDesc));
        assert_eq!(query.is_new, Some(true));
        assert_eq!(SortBy::default().order_clause(), "p.created_at DESC, p.id DESC");
    }
}
