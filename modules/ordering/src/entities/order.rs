use framework::sqlx::{DatabaseProcessor, commit, is_unique_violation};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize,
)]
#[sqlx(type_name = "order_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Assigned,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Assigned,
        Self::InTransit,
        Self::Delivered,
        Self::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Assigned => "assigned",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Preparing => "Preparing",
            Self::Ready => "Ready for delivery",
            Self::Assigned => "Driver assigned",
            Self::InTransit => "On the way",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The forward step of the lifecycle, if any.
    fn successor(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Assigned),
            Self::Assigned => Some(Self::InTransit),
            Self::InTransit => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether `next` is reachable from `self` in one step.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        next == Self::Cancelled || self.successor() == Some(next)
    }

    pub fn allowed_transitions(self) -> Vec<OrderStatus> {
        Self::ALL
            .into_iter()
            .filter(|next| self.can_transition_to(*next))
            .collect()
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Money side of an order. The total is never stored on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderAmounts {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
}

impl OrderAmounts {
    pub fn new(subtotal: Decimal, delivery_fee: Decimal) -> Self {
        Self {
            subtotal,
            delivery_fee,
        }
    }

    pub fn total(&self) -> Decimal {
        self.subtotal + self.delivery_fee
    }
}

/// A row of `"shop"."order_overview"`: the order plus the emails of its parties.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserOrder {
    pub id: i64,
    pub order_number: String,
    pub client_id: Uuid,
    pub client_email: String,
    pub driver_id: Option<Uuid>,
    pub driver_email: Option<String>,
    pub status: OrderStatus,
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    pub delivery_address: String,
    pub delivery_reference: String,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub total: Decimal,
    pub notes: String,
    pub created_at: PrimitiveDateTime,
    pub confirmed_at: Option<PrimitiveDateTime>,
    pub assigned_at: Option<PrimitiveDateTime>,
    pub delivered_at: Option<PrimitiveDateTime>,
    pub updated_at: PrimitiveDateTime,
}

impl UserOrder {
    pub fn amounts(&self) -> OrderAmounts {
        OrderAmounts::new(self.subtotal, self.delivery_fee)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i32,
    pub product_name: String,
    pub product_image: String,
    /// Current preparation time of the product, in minutes.
    pub preparation_time: i32,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct OrderStatusHistory {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
    pub changed_by: Option<Uuid>,
    pub changed_by_email: Option<String>,
    pub notes: String,
    pub created_at: PrimitiveDateTime,
}

/// A priced line ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderItem {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub notes: String,
}

/// Write an order with its items and the initial `pending` history row.
///
/// Returns `None` if the order number is already taken.
#[derive(Debug, Clone)]
pub struct InsertOrder {
    pub order_number: String,
    pub client_id: Uuid,
    pub delivery_latitude: Decimal,
    pub delivery_longitude: Decimal,
    pub delivery_address: String,
    pub delivery_reference: String,
    pub delivery_fee: Decimal,
    pub notes: String,
    pub items: Vec<NewOrderItem>,
    pub history_note: String,
}

const OVERVIEW_BY_ID: &str = r#"
    SELECT id, order_number, client_id, client_email, driver_id, driver_email, status,
           delivery_latitude, delivery_longitude, delivery_address, delivery_reference,
           subtotal, delivery_fee, total, notes, created_at, confirmed_at, assigned_at,
           delivered_at, updated_at
    FROM "shop"."order_overview"
    WHERE id = $1
"#;

impl Processor<InsertOrder> for DatabaseProcessor {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:InsertOrder", err)]
    async fn process(&self, input: InsertOrder) -> Result<Option<UserOrder>, sqlx::Error> {
        let subtotal: Decimal = input
            .items
            .iter()
            .map(|item| item.unit_price * Decimal::from(item.quantity))
            .sum();
        let mut tx = self.begin().await?;
        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO "shop"."user_order" (
                order_number, client_id, delivery_latitude, delivery_longitude,
                delivery_address, delivery_reference, subtotal, delivery_fee, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(&input.order_number)
        .bind(input.client_id)
        .bind(input.delivery_latitude)
        .bind(input.delivery_longitude)
        .bind(&input.delivery_address)
        .bind(&input.delivery_reference)
        .bind(subtotal)
        .bind(input.delivery_fee)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await;
        let order_id = match inserted {
            Ok(id) => id,
            Err(e) if is_unique_violation(&e) => return Ok(None),
            Err(e) => return Err(e),
        };
        for item in &input.items {
            sqlx::query(
                r#"
                INSERT INTO "shop"."order_item"
                    (order_id, product_id, product_name, quantity, unit_price, notes)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(order_id)
            .bind(item.product_id)
            .bind(&item.product_name)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.notes)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query(
            r#"
            INSERT INTO "shop"."order_status_history" (order_id, status, changed_by, notes)
            VALUES ($1, 'pending', $2, $3)
            "#,
        )
        .bind(order_id)
        .bind(input.client_id)
        .bind(&input.history_note)
        .execute(&mut *tx)
        .await?;
        let order = sqlx::query_as::<_, UserOrder>(OVERVIEW_BY_ID)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(Some(order))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindOrderById {
    pub id: i64,
}

impl Processor<FindOrderById> for DatabaseProcessor {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindOrderById", err)]
    async fn process(&self, input: FindOrderById) -> Result<Option<UserOrder>, sqlx::Error> {
        sqlx::query_as::<_, UserOrder>(OVERVIEW_BY_ID)
            .bind(input.id)
            .fetch_optional(self.db())
            .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListOrderItems {
    pub order_id: i64,
}

impl Processor<ListOrderItems> for DatabaseProcessor {
    type Output = Vec<OrderItem>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListOrderItems", err)]
    async fn process(&self, input: ListOrderItems) -> Result<Vec<OrderItem>, sqlx::Error> {
        sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT i.id, i.order_id, i.product_id, i.product_name, p.image_url AS product_image,
                   p.preparation_time, i.quantity, i.unit_price, i.subtotal, i.notes
            FROM "shop"."order_item" i
            JOIN "shop"."product" p ON p.id = i.product_id
            WHERE i.order_id = $1
            ORDER BY i.id
            "#,
        )
        .bind(input.order_id)
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListOrderHistory {
    pub order_id: i64,
}

impl Processor<ListOrderHistory> for DatabaseProcessor {
    type Output = Vec<OrderStatusHistory>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListOrderHistory", err)]
    async fn process(&self, input: ListOrderHistory) -> Result<Vec<OrderStatusHistory>, sqlx::Error> {
        sqlx::query_as::<_, OrderStatusHistory>(
            r#"
            SELECT h.id, h.order_id, h.status, h.changed_by, u.email AS changed_by_email,
                   h.notes, h.created_at
            FROM "shop"."order_status_history" h
            LEFT JOIN "auth"."user_account" u ON u.id = h.changed_by
            WHERE h.order_id = $1
            ORDER BY h.created_at, h.id
            "#,
        )
        .bind(input.order_id)
        .fetch_all(self.db())
        .await
    }
}

/// Which orders a listing may return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderScope {
    All,
    Client(Uuid),
    Driver(Uuid),
}

/// Newest first. An empty `statuses` means any status.
#[derive(Debug, Clone)]
pub struct ListOrders {
    pub scope: OrderScope,
    pub statuses: Vec<OrderStatus>,
}

impl Processor<ListOrders> for DatabaseProcessor {
    type Output = Vec<UserOrder>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListOrders", err)]
    async fn process(&self, input: ListOrders) -> Result<Vec<UserOrder>, sqlx::Error> {
        let (client_id, driver_id) = match input.scope {
            OrderScope::All => (None, None),
            OrderScope::Client(id) => (Some(id), None),
            OrderScope::Driver(id) => (None, Some(id)),
        };
        let statuses: Vec<&'static str> = input.statuses.iter().map(|s| s.as_str()).collect();
        sqlx::query_as::<_, UserOrder>(
            r#"
            SELECT id, order_number, client_id, client_email, driver_id, driver_email, status,
                   delivery_latitude, delivery_longitude, delivery_address, delivery_reference,
                   subtotal, delivery_fee, total, notes, created_at, confirmed_at, assigned_at,
                   delivered_at, updated_at
            FROM "shop"."order_overview"
            WHERE ($1::UUID IS NULL OR client_id = $1)
              AND ($2::UUID IS NULL OR driver_id = $2)
              AND (cardinality($3::TEXT[]) = 0 OR status::TEXT = ANY($3))
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(client_id)
        .bind(driver_id)
        .bind(statuses)
        .fetch_all(self.db())
        .await
    }
}

/// Move an order from `from` to `to` and append the history row.
///
/// The update only applies while the order is still in `from`. Returns `None`
/// when it is not (missing order or a concurrent change).
#[derive(Debug, Clone)]
pub struct TransitionOrderStatus {
    pub order_id: i64,
    pub from: OrderStatus,
    pub to: OrderStatus,
    pub changed_by: Option<Uuid>,
    /// Recorded on the order when set.
    pub driver_id: Option<Uuid>,
    pub notes: String,
}

impl Processor<TransitionOrderStatus> for DatabaseProcessor {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:TransitionOrderStatus", err)]
    async fn process(&self, input: TransitionOrderStatus) -> Result<Option<UserOrder>, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some(order_id) = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE "shop"."user_order"
            SET status = $3,
                driver_id = COALESCE($4, driver_id),
                confirmed_at = CASE WHEN $3 = 'confirmed'::order_status THEN NOW() ELSE confirmed_at END,
                assigned_at = CASE WHEN $3 = 'assigned'::order_status THEN NOW() ELSE assigned_at END,
                delivered_at = CASE WHEN $3 = 'delivered'::order_status THEN NOW() ELSE delivered_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING id
            "#,
        )
        .bind(input.order_id)
        .bind(input.from)
        .bind(input.to)
        .bind(input.driver_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        sqlx::query(
            r#"
            INSERT INTO "shop"."order_status_history" (order_id, status, changed_by, notes)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(order_id)
        .bind(input.to)
        .bind(input.changed_by)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await?;
        let order = sqlx::query_as::<_, UserOrder>(OVERVIEW_BY_ID)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(Some(order))
    }
}

/// Returns `None` if the order is missing or already terminal.
#[derive(Debug, Clone, Copy)]
pub struct UpdateDeliveryFee {
    pub order_id: i64,
    pub delivery_fee: Decimal,
}

impl Processor<UpdateDeliveryFee> for DatabaseProcessor {
    type Output = Option<UserOrder>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:UpdateDeliveryFee", err)]
    async fn process(&self, input: UpdateDeliveryFee) -> Result<Option<UserOrder>, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some(order_id) = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE "shop"."user_order"
            SET delivery_fee = $2, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('delivered', 'cancelled')
            RETURNING id
            "#,
        )
        .bind(input.order_id)
        .bind(input.delivery_fee)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        let order = sqlx::query_as::<_, UserOrder>(OVERVIEW_BY_ID)
            .bind(order_id)
            .fetch_one(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(Some(order))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_moves_one_step_forward() {
        use OrderStatus::*;
        let chain = [Pending, Confirmed, Preparing, Ready, Assigned, InTransit, Delivered];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        assert!(!Pending.can_transition_to(Preparing));
        assert!(!Ready.can_transition_to(InTransit));
        assert!(!Confirmed.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Pending));
    }

    #[test]
    fn every_open_state_can_be_cancelled() {
        for status in OrderStatus::ALL {
            assert_eq!(
                status.can_transition_to(OrderStatus::Cancelled),
                !status.is_terminal(),
                "{status}"
            );
        }
    }

    #[test]
    fn terminal_states_go_nowhere() {
        assert!(OrderStatus::Delivered.allowed_transitions().is_empty());
        assert!(OrderStatus::Cancelled.allowed_transitions().is_empty());
        assert_eq!(
            OrderStatus::Ready.allowed_transitions(),
            [OrderStatus::Assigned, OrderStatus::Cancelled]
        );
    }

    #[test]
    fn table_has_exactly_twelve_edges() {
        let edges: usize = OrderStatus::ALL
            .into_iter()
            .map(|s| s.allowed_transitions().len())
            .sum();
        assert_eq!(edges, 12);
    }

    #[test]
    fn total_is_subtotal_plus_fee() {
        let amounts = OrderAmounts::new(Decimal::new(4550, 2), Decimal::new(1000, 2));
        assert_eq!(amounts.total(), Decimal::new(5550, 2));
    }

    #[test]
    fn status_names_round_trip_through_serde() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, status.as_str());
            let back: OrderStatus = serde_json::from_value(json).unwrap();
            assert_eq!(back, status);
        }
    }
}
