use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use tracing::instrument;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CategorySummary {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub is_active: bool,
    pub active_products_count: i64,
    pub created_at: time::PrimitiveDateTime,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListCategories {
    pub include_inactive: bool,
}

impl Processor<ListCategories> for DatabaseProcessor {
    type Output = Vec<CategorySummary>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListCategories", err)]
    async fn process(&self, input: ListCategories) -> Result<Vec<CategorySummary>, sqlx::Error> {
        sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT c.id, c.name, c.description, c.is_active, c.created_at,
                   COUNT(p.id) FILTER (WHERE p.is_available) AS active_products_count
            FROM "shop"."category" c
            LEFT JOIN "shop"."product" p ON p.category_id = c.id
            WHERE $1 OR c.is_active
            GROUP BY c.id
            ORDER BY c.name
            "#,
        )
        .bind(input.include_inactive)
        .fetch_all(self.db())
        .await
    }
}
