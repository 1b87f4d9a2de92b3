use crate::MenuStore;
use crate::entities::category::ListCategories;
use crate::entities::product::{FindProductById, ListProducts, ToggleProductAvailability};
use auth::http::middleware::CurrentUser;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use serde::{Deserialize, Serialize};
use tracing::info;
use views::{BotProductView, CategoryView, CategoryWithProducts, ProductView, group_by_category};

pub mod views;

const FEATURED_LIMIT: i64 = 10;

#[derive(Debug, Clone)]
pub struct MenuState<S = DatabaseProcessor> {
    pub store: S,
}

pub fn router<S: MenuStore>(store: S) -> Router {
    Router::new()
        .route("/api/menu/categories", get(list_categories::<S>))
        .route(
            "/api/menu/categories/with-products",
            get(categories_with_products::<S>),
        )
        .route("/api/menu/categories/bot-menu", get(bot_menu::<S>))
        .route("/api/menu/products", get(list_products::<S>))
        .route("/api/menu/products/available", get(available_products::<S>))
        .route("/api/menu/products/featured", get(featured_products::<S>))
        .route(
            "/api/menu/products/category/{category_id}",
            get(products_by_category::<S>),
        )
        .route("/api/menu/products/{id}", get(product_detail::<S>))
        .route(
            "/api/menu/products/{id}/toggle-availability",
            post(toggle_availability::<S>),
        )
        .with_state(MenuState { store })
}

async fn list_categories<S: MenuStore>(
    State(state): State<MenuState<S>>,
) -> Result<Json<Vec<CategoryView>>, framework::Error> {
    let categories = state.store.process(ListCategories::default()).await?;
    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

async fn available_catalog<S: MenuStore, P: From<crate::entities::product::Product>>(
    store: &S,
) -> Result<Vec<CategoryWithProducts<P>>, framework::Error> {
    let categories = store.process(ListCategories::default()).await?;
    let products = store
        .process(ListProducts {
            available_only: true,
            ..ListProducts::default()
        })
        .await?;
    Ok(group_by_category(categories, products))
}

async fn categories_with_products<S: MenuStore>(
    State(state): State<MenuState<S>>,
) -> Result<Json<Vec<CategoryWithProducts<ProductView>>>, framework::Error> {
    Ok(Json(available_catalog(&state.store).await?))
}

#[derive(Debug, Serialize)]
pub struct BotMenu {
    pub categories: Vec<CategoryWithProducts<BotProductView>>,
    pub total_categories: usize,
}

async fn bot_menu<S: MenuStore>(
    State(state): State<MenuState<S>>,
) -> Result<Json<BotMenu>, framework::Error> {
    let categories = available_catalog(&state.store).await?;
    Ok(Json(BotMenu {
        total_categories: categories.len(),
        categories,
    }))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<i32>,
    pub featured: Option<bool>,
}

async fn list_products<S: MenuStore>(
    State(state): State<MenuState<S>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductView>>, framework::Error> {
    let products = state
        .store
        .process(ListProducts {
            category_id: query.category,
            featured: query.featured,
            available_only: true,
            limit: None,
        })
        .await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<BotProductView>,
    pub total: usize,
}

async fn available_products<S: MenuStore>(
    State(state): State<MenuState<S>>,
) -> Result<Json<ProductList>, framework::Error> {
    let products: Vec<BotProductView> = state
        .store
        .process(ListProducts {
            available_only: true,
            ..ListProducts::default()
        })
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(ProductList {
        total: products.len(),
        products,
    }))
}

async fn featured_products<S: MenuStore>(
    State(state): State<MenuState<S>>,
) -> Result<Json<Vec<ProductView>>, framework::Error> {
    let products = state
        .store
        .process(ListProducts {
            featured: Some(true),
            available_only: true,
            limit: Some(FEATURED_LIMIT),
            ..ListProducts::default()
        })
        .await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Serialize)]
pub struct CategoryProducts {
    pub category_id: i32,
    pub products: Vec<BotProductView>,
    pub total: usize,
}

async fn products_by_category<S: MenuStore>(
    State(state): State<MenuState<S>>,
    Path(category_id): Path<i32>,
) -> Result<Json<CategoryProducts>, framework::Error> {
    let products: Vec<BotProductView> = state
        .store
        .process(ListProducts {
            category_id: Some(category_id),
            available_only: true,
            ..ListProducts::default()
        })
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(Json(CategoryProducts {
        category_id,
        total: products.len(),
        products,
    }))
}

async fn product_detail<S: MenuStore>(
    State(state): State<MenuState<S>>,
    Path(id): Path<i32>,
) -> Result<Json<ProductView>, framework::Error> {
    let product = state
        .store
        .process(FindProductById { id })
        .await?
        .ok_or(framework::Error::NotFound)?;
    Ok(Json(product.into()))
}

#[derive(Debug, Serialize)]
pub struct ToggleAvailabilityResponse {
    pub message: &'static str,
    pub product: ProductView,
}

async fn toggle_availability<S: MenuStore>(
    State(state): State<MenuState<S>>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ToggleAvailabilityResponse>, framework::Error> {
    if !user.is_staff() {
        return Err(framework::Error::PermissionsDenied);
    }
    let product = state
        .store
        .process(ToggleProductAvailability { id })
        .await?
        .ok_or(framework::Error::NotFound)?;
    info!(product_id = id, available = product.is_available, "product availability toggled");
    let message = if product.is_available {
        "Product enabled"
    } else {
        "Product disabled"
    };
    Ok(Json(ToggleAvailabilityResponse {
        message,
        product: product.into(),
    }))
}
