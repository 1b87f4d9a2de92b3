use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use rust_decimal::Decimal;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Product {
    pub id: i32,
    pub category_id: i32,
    pub category_name: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub is_available: bool,
    pub is_featured: bool,
    /// Minutes.
    pub preparation_time: i32,
    pub created_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListProducts {
    pub category_id: Option<i32>,
    pub featured: Option<bool>,
    /// Only available products of active categories.
    pub available_only: bool,
    pub limit: Option<i64>,
}

impl Processor<ListProducts> for DatabaseProcessor {
    type Output = Vec<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListProducts", err)]
    async fn process(&self, input: ListProducts) -> Result<Vec<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.category_id, c.name AS category_name, p.name, p.description,
                   p.price, p.image_url, p.is_available, p.is_featured, p.preparation_time,
                   p.created_at
            FROM "shop"."product" p
            JOIN "shop"."category" c ON c.id = p.category_id
            WHERE ($1::INT IS NULL OR p.category_id = $1)
              AND ($2::BOOLEAN IS NULL OR p.is_featured = $2)
              AND (NOT $3 OR (p.is_available AND c.is_active))
            ORDER BY c.name, p.name
            LIMIT $4
            "#,
        )
        .bind(input.category_id)
        .bind(input.featured)
        .bind(input.available_only)
        .bind(input.limit)
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindProductById {
    pub id: i32,
}

impl Processor<FindProductById> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindProductById", err)]
    async fn process(&self, input: FindProductById) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.category_id, c.name AS category_name, p.name, p.description,
                   p.price, p.image_url, p.is_available, p.is_featured, p.preparation_time,
                   p.created_at
            FROM "shop"."product" p
            JOIN "shop"."category" c ON c.id = p.category_id
            WHERE p.id = $1
            "#,
        )
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ToggleProductAvailability {
    pub id: i32,
}

impl Processor<ToggleProductAvailability> for DatabaseProcessor {
    type Output = Option<Product>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ToggleProductAvailability", err)]
    async fn process(
        &self,
        input: ToggleProductAvailability,
    ) -> Result<Option<Product>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"
            WITH updated AS (
                UPDATE "shop"."product"
                SET is_available = NOT is_available, updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            SELECT u.id, u.category_id, c.name AS category_name, u.name, u.description,
                   u.price, u.image_url, u.is_available, u.is_featured, u.preparation_time,
                   u.created_at
            FROM updated u
            JOIN "shop"."category" c ON c.id = u.category_id
            "#,
        )
        .bind(input.id)
        .fetch_optional(self.db())
        .await
    }
}

/// The slice of a product that ordering snapshots into order items.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogProduct {
    pub id: i32,
    pub name: String,
    pub price: Decimal,
    pub is_available: bool,
    pub preparation_time: i32,
}

#[derive(Debug, Clone, Default)]
pub struct FindCatalogProducts {
    pub ids: Vec<i32>,
}

impl Processor<FindCatalogProducts> for DatabaseProcessor {
    type Output = Vec<CatalogProduct>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindCatalogProducts", err)]
    async fn process(&self, input: FindCatalogProducts) -> Result<Vec<CatalogProduct>, sqlx::Error> {
        sqlx::query_as::<_, CatalogProduct>(
            r#"
            SELECT id, name, price, is_available, preparation_time
            FROM "shop"."product"
            WHERE id = ANY($1)
            "#,
        )
        .bind(&input.ids)
        .fetch_all(self.db())
        .await
    }
}
