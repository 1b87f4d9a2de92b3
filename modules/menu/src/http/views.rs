use crate::entities::category::CategorySummary;
use crate::entities::product::Product;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    pub id: i32,
    pub category: i32,
    pub category_name: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub is_available: bool,
    pub is_featured: bool,
    pub preparation_time: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            category: product.category_id,
            category_name: product.category_name,
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            is_available: product.is_available,
            is_featured: product.is_featured,
            preparation_time: product.preparation_time,
            created_at: framework::to_utc(product.created_at),
        }
    }
}

/// Reduced product shape the bot renders.
#[derive(Debug, Clone, Serialize)]
pub struct BotProductView {
    pub id: i32,
    pub category_name: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub preparation_time: i32,
}

impl From<Product> for BotProductView {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            category_name: product.category_name,
            name: product.name,
            description: product.description,
            price: product.price,
            image_url: product.image_url,
            preparation_time: product.preparation_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryView {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub active_products_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: time::OffsetDateTime,
}

impl From<CategorySummary> for CategoryView {
    fn from(category: CategorySummary) -> Self {
        Self {
            id: category.id,
            name: category.name,
            description: category.description,
            is_active: category.is_active,
            active_products_count: category.active_products_count,
            created_at: framework::to_utc(category.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryWithProducts<P> {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub active_products_count: i64,
    pub products: Vec<P>,
}

/// Attach each product to its category, keeping category order. Products of
/// categories not listed are dropped.
pub fn group_by_category<P: From<Product>>(
    categories: Vec<CategorySummary>,
    products: Vec<Product>,
) -> Vec<CategoryWithProducts<P>> {
    let mut grouped: Vec<CategoryWithProducts<P>> = categories
        .into_iter()
        .map(|category| CategoryWithProducts {
            id: category.id,
            name: category.name,
            description: category.description,
            active_products_count: category.active_products_count,
            products: Vec::new(),
        })
        .collect();
    for product in products {
        if let Some(group) = grouped.iter_mut().find(|g| g.id == product.category_id) {
            group.products.push(product.into());
        }
    }
    grouped
}
