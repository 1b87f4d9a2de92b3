#![forbid(clippy::unwrap_used)]
#![forbid(unsafe_code)]
#![forbid(clippy::expect_used)]
#![forbid(clippy::panic)]

pub mod entities;
pub mod http;

use entities::category::{CategorySummary, ListCategories};
use entities::product::{
    CatalogProduct, FindCatalogProducts, FindProductById, ListProducts, Product,
    ToggleProductAvailability,
};
use kanau::processor::Processor;

/// Catalog operations used by the menu routes.
pub trait MenuStore:
    Processor<ListCategories, Output = Vec<CategorySummary>, Error = sqlx::Error>
    + Processor<ListProducts, Output = Vec<Product>, Error = sqlx::Error>
    + Processor<FindProductById, Output = Option<Product>, Error = sqlx::Error>
    + Processor<ToggleProductAvailability, Output = Option<Product>, Error = sqlx::Error>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> MenuStore for T where
    T: Processor<ListCategories, Output = Vec<CategorySummary>, Error = sqlx::Error>
        + Processor<ListProducts, Output = Vec<Product>, Error = sqlx::Error>
        + Processor<FindProductById, Output = Option<Product>, Error = sqlx::Error>
        + Processor<ToggleProductAvailability, Output = Option<Product>, Error = sqlx::Error>
        + Clone
        + Send
        + Sync
        + 'static
{
}

/// Read-only product lookup other modules price and validate against.
pub trait CatalogLookup:
    Processor<FindCatalogProducts, Output = Vec<CatalogProduct>, Error = sqlx::Error>
    + Clone
    + Send
    + Sync
    + 'static
{
}

impl<T> CatalogLookup for T where
    T: Processor<FindCatalogProducts, Output = Vec<CatalogProduct>, Error = sqlx::Error>
        + Clone
        + Send
        + Sync
        + 'static
{
}
