use super::{Actor, OrderingStore};
use crate::entities::order::{
    FindOrderById, InsertOrder, ListOrderHistory, ListOrderItems, ListOrders, NewOrderItem,
    OrderItem, OrderScope, OrderStatus, OrderStatusHistory, TransitionOrderStatus,
    UpdateDeliveryFee, UserOrder,
};
use crate::error::OrderingError;
use auth::entities::db::user_account::{FindUserAccountById, UserRole};
use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use menu::entities::product::FindCatalogProducts;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const ORDER_NUMBER_ATTEMPTS: usize = 5;
const DEFAULT_CANCEL_REASON: &str = "No reason given";
const CREATION_NOTE: &str = "Order placed";
pub const MAX_LINE_QUANTITY: i32 = 999;

/// Largest value the `NUMERIC(10, 2)` money columns hold.
pub fn max_amount() -> Decimal {
    Decimal::new(9_999_999_999, 2)
}

#[derive(Debug, Clone)]
pub struct OrderService<S = DatabaseProcessor> {
    pub store: S,
    pub default_delivery_fee: Decimal,
}

impl<S: OrderingStore> OrderService<S> {
    pub fn new(store: S, default_delivery_fee: Decimal) -> Self {
        Self {
            store,
            default_delivery_fee,
        }
    }

    async fn visible_order(&self, actor: &Actor, order_id: i64) -> Result<UserOrder, OrderingError> {
        self.store
            .process(FindOrderById { id: order_id })
            .await?
            .filter(|order| actor.can_see(order))
            .ok_or(OrderingError::NotFound)
    }

    async fn detail(&self, order: UserOrder) -> Result<OrderDetail, OrderingError> {
        let items = self
            .store
            .process(ListOrderItems { order_id: order.id })
            .await?;
        let history = self
            .store
            .process(ListOrderHistory { order_id: order.id })
            .await?;
        Ok(OrderDetail {
            order,
            items,
            history,
        })
    }

    /// Apply one table transition. A concurrent change is reported against the
    /// status the order has now.
    async fn transition(
        &self,
        order: &UserOrder,
        to: OrderStatus,
        actor: &Actor,
        driver_id: Option<Uuid>,
        notes: String,
    ) -> Result<UserOrder, OrderingError> {
        if !order.status.can_transition_to(to) {
            return Err(OrderingError::InvalidTransition {
                current: order.status,
                requested: to,
            });
        }
        let updated = self
            .store
            .process(TransitionOrderStatus {
                order_id: order.id,
                from: order.status,
                to,
                changed_by: Some(actor.id),
                driver_id,
                notes,
            })
            .await?;
        if let Some(updated) = updated {
            info!(order = %updated.order_number, from = %order.status, to = %to, "order status changed");
            return Ok(updated);
        }
        let current = self
            .store
            .process(FindOrderById { id: order.id })
            .await?
            .ok_or(OrderingError::NotFound)?;
        warn!(order = %current.order_number, current = %current.status, requested = %to, "order changed concurrently");
        Err(OrderingError::InvalidTransition {
            current: current.status,
            requested: to,
        })
    }
}

/// An order with its lines and status trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetail {
    pub order: UserOrder,
    pub items: Vec<OrderItem>,
    pub history: Vec<OrderStatusHistory>,
}

impl OrderDetail {
    pub fn total_items(&self) -> i64 {
        self.items.iter().map(|item| i64::from(item.quantity)).sum()
    }

    /// The slowest product decides, in minutes.
    pub fn estimated_preparation_time(&self) -> i32 {
        self.items
            .iter()
            .map(|item| item.preparation_time)
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct OrderLine {
    pub product_id: i32,
    pub quantity: i32,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub actor: Actor,
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    pub delivery_reference: String,
    pub delivery_fee: Option<Decimal>,
    pub notes: String,
    pub items: Vec<OrderLine>,
}

fn check_delivery_fee(delivery_fee: Decimal) -> Result<(), OrderingError> {
    if delivery_fee.is_sign_negative() {
        return Err(OrderingError::invalid_input("delivery_fee cannot be negative"));
    }
    if delivery_fee > max_amount() {
        return Err(OrderingError::invalid_input("delivery_fee is too large"));
    }
    Ok(())
}

/// `None` when the sum does not fit an order total.
fn checked_total(items: &[NewOrderItem], delivery_fee: Decimal) -> Option<Decimal> {
    items
        .iter()
        .try_fold(delivery_fee, |acc, item| {
            item.unit_price
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| acc.checked_add(line))
        })
        .filter(|total| *total <= max_amount())
}

fn check_coordinates(latitude: Decimal, longitude: Decimal) -> Result<(), OrderingError> {
    if latitude.abs() > Decimal::from(90) || longitude.abs() > Decimal::from(180) {
        return Err(OrderingError::invalid_input("delivery coordinates are out of range"));
    }
    Ok(())
}

impl<S: OrderingStore> Processor<PlaceOrder> for OrderService<S> {
    type Output = OrderDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "PlaceOrder", err)]
    async fn process(&self, input: PlaceOrder) -> Result<OrderDetail, OrderingError> {
        if input.actor.role != UserRole::Customer {
            return Err(OrderingError::PermissionDenied);
        }
        if input.items.is_empty() {
            return Err(OrderingError::EmptyOrder);
        }
        let out_of_range = |line: &&OrderLine| !(1..=MAX_LINE_QUANTITY).contains(&line.quantity);
        if let Some(line) = input.items.iter().find(out_of_range) {
            return Err(OrderingError::invalid_input(format!(
                "quantity of product {} must be between 1 and {MAX_LINE_QUANTITY}",
                line.product_id
            )));
        }
        check_coordinates(input.delivery_latitude, input.delivery_longitude)?;
        let delivery_fee = input.delivery_fee.unwrap_or(self.default_delivery_fee);
        check_delivery_fee(delivery_fee)?;

        let mut ids: Vec<i32> = input.items.iter().map(|line| line.product_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let catalog: HashMap<i32, _> = self
            .store
            .process(FindCatalogProducts { ids })
            .await?
            .into_iter()
            .map(|product| (product.id, product))
            .collect();
        let mut items = Vec::with_capacity(input.items.len());
        for line in input.items {
            let product = catalog
                .get(&line.product_id)
                .ok_or(OrderingError::ProductNotFound(line.product_id))?;
            if !product.is_available {
                return Err(OrderingError::ProductUnavailable(product.name.clone()));
            }
            items.push(NewOrderItem {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                notes: line.notes.trim().to_owned(),
            });
        }
        if checked_total(&items, delivery_fee).is_none() {
            return Err(OrderingError::invalid_input("order total is too large"));
        }

        let today = framework::now_time().date();
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = crate::utils::reference::order_number(today);
            let inserted = self
                .store
                .process(InsertOrder {
                    order_number,
                    client_id: input.actor.id,
                    delivery_latitude: input.delivery_latitude,
                    delivery_longitude: input.delivery_longitude,
                    delivery_address: String::new(),
                    delivery_reference: input.delivery_reference.trim().to_owned(),
                    delivery_fee,
                    notes: input.notes.trim().to_owned(),
                    items: items.clone(),
                    history_note: CREATION_NOTE.to_owned(),
                })
                .await?;
            if let Some(order) = inserted {
                info!(order = %order.order_number, total = %order.total, "order placed");
                return self.detail(order).await;
            }
        }
        Err(anyhow::anyhow!("no free order number after {ORDER_NUMBER_ATTEMPTS} attempts").into())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetOrder {
    pub actor: Actor,
    pub order_id: i64,
}

impl<S: OrderingStore> Processor<GetOrder> for OrderService<S> {
    type Output = OrderDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "GetOrder", err)]
    async fn process(&self, input: GetOrder) -> Result<OrderDetail, OrderingError> {
        let order = self.visible_order(&input.actor, input.order_id).await?;
        self.detail(order).await
    }
}

/// Staff see every order, drivers the ones assigned to them, customers their own.
#[derive(Debug, Clone, Copy)]
pub struct ListVisibleOrders {
    pub actor: Actor,
    pub status: Option<OrderStatus>,
}

impl<S: OrderingStore> Processor<ListVisibleOrders> for OrderService<S> {
    type Output = Vec<UserOrder>;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ListVisibleOrders", err)]
    async fn process(&self, input: ListVisibleOrders) -> Result<Vec<UserOrder>, OrderingError> {
        let scope = if input.actor.is_staff {
            OrderScope::All
        } else if input.actor.role == UserRole::Driver {
            OrderScope::Driver(input.actor.id)
        } else {
            OrderScope::Client(input.actor.id)
        };
        Ok(self
            .store
            .process(ListOrders {
                scope,
                statuses: input.status.into_iter().collect(),
            })
            .await?)
    }
}

/// Orders the actor placed, whatever their role.
#[derive(Debug, Clone, Copy)]
pub struct ListMyOrders {
    pub actor: Actor,
    pub status: Option<OrderStatus>,
}

impl<S: OrderingStore> Processor<ListMyOrders> for OrderService<S> {
    type Output = Vec<OrderDetail>;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ListMyOrders", err)]
    async fn process(&self, input: ListMyOrders) -> Result<Vec<OrderDetail>, OrderingError> {
        let orders = self
            .store
            .process(ListOrders {
                scope: OrderScope::Client(input.actor.id),
                statuses: input.status.into_iter().collect(),
            })
            .await?;
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.detail(order).await?);
        }
        Ok(details)
    }
}

/// Active deliveries of a driver.
#[derive(Debug, Clone, Copy)]
pub struct ListMyDeliveries {
    pub actor: Actor,
}

impl<S: OrderingStore> Processor<ListMyDeliveries> for OrderService<S> {
    type Output = Vec<OrderDetail>;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ListMyDeliveries", err)]
    async fn process(&self, input: ListMyDeliveries) -> Result<Vec<OrderDetail>, OrderingError> {
        if input.actor.role != UserRole::Driver {
            return Err(OrderingError::PermissionDenied);
        }
        let orders = self
            .store
            .process(ListOrders {
                scope: OrderScope::Driver(input.actor.id),
                statuses: vec![OrderStatus::Assigned, OrderStatus::InTransit],
            })
            .await?;
        let mut details = Vec::with_capacity(orders.len());
        for order in orders {
            details.push(self.detail(order).await?);
        }
        Ok(details)
    }
}

#[derive(Debug, Clone)]
pub struct ChangeOrderStatus {
    pub actor: Actor,
    pub order_id: i64,
    pub status: OrderStatus,
    pub notes: String,
    /// Required when moving to `assigned`, ignored otherwise.
    pub driver_id: Option<Uuid>,
}

impl<S: OrderingStore> Processor<ChangeOrderStatus> for OrderService<S> {
    type Output = OrderDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ChangeOrderStatus", err)]
    async fn process(&self, input: ChangeOrderStatus) -> Result<OrderDetail, OrderingError> {
        let actor = input.actor;
        let order = self.visible_order(&actor, input.order_id).await?;
        let driver_step = matches!(input.status, OrderStatus::InTransit | OrderStatus::Delivered)
            && actor.is_driver_of(&order);
        if !actor.is_staff && !driver_step {
            return Err(OrderingError::PermissionDenied);
        }
        if !order.status.can_transition_to(input.status) {
            return Err(OrderingError::InvalidTransition {
                current: order.status,
                requested: input.status,
            });
        }
        let driver_id = if input.status == OrderStatus::Assigned {
            let driver_id = input
                .driver_id
                .ok_or_else(|| OrderingError::invalid_input("driver_id is required to assign an order"))?;
            let driver = self
                .store
                .process(FindUserAccountById { id: driver_id })
                .await?
                .filter(|user| user.role == UserRole::Driver && user.is_active)
                .ok_or_else(|| OrderingError::invalid_input("driver_id must name an active driver"))?;
            Some(driver.id)
        } else {
            None
        };
        let updated = self
            .transition(&order, input.status, &actor, driver_id, input.notes.trim().to_owned())
            .await?;
        self.detail(updated).await
    }
}

#[derive(Debug, Clone)]
pub struct CancelOrder {
    pub actor: Actor,
    pub order_id: i64,
    pub reason: Option<String>,
}

impl<S: OrderingStore> Processor<CancelOrder> for OrderService<S> {
    type Output = OrderDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "CancelOrder", err)]
    async fn process(&self, input: CancelOrder) -> Result<OrderDetail, OrderingError> {
        let order = self.visible_order(&input.actor, input.order_id).await?;
        let reason = input
            .reason
            .map(|reason| reason.trim().to_owned())
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_owned());
        let updated = self
            .transition(
                &order,
                OrderStatus::Cancelled,
                &input.actor,
                None,
                format!("Cancelled: {reason}"),
            )
            .await?;
        self.detail(updated).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChangeDeliveryFee {
    pub actor: Actor,
    pub order_id: i64,
    pub delivery_fee: Decimal,
}

impl<S: OrderingStore> Processor<ChangeDeliveryFee> for OrderService<S> {
    type Output = OrderDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ChangeDeliveryFee", err)]
    async fn process(&self, input: ChangeDeliveryFee) -> Result<OrderDetail, OrderingError> {
        if !input.actor.is_staff {
            return Err(OrderingError::PermissionDenied);
        }
        check_delivery_fee(input.delivery_fee)?;
        let order = self.visible_order(&input.actor, input.order_id).await?;
        if order.status.is_terminal() {
            return Err(framework::Error::Conflict(format!(
                "delivery fee of a {} order cannot change",
                order.status
            ))
            .into());
        }
        if order.subtotal.checked_add(input.delivery_fee).is_none_or(|t| t > max_amount()) {
            return Err(OrderingError::invalid_input("order total is too large"));
        }
        let updated = self
            .store
            .process(UpdateDeliveryFee {
                order_id: order.id,
                delivery_fee: input.delivery_fee,
            })
            .await?
            .ok_or_else(|| framework::Error::Conflict("order was closed meanwhile".to_owned()))?;
        info!(order = %updated.order_number, delivery_fee = %updated.delivery_fee, "delivery fee changed");
        self.detail(updated).await
    }
}
