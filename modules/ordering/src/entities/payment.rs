use super::order::OrderStatus;
use framework::sqlx::{DatabaseProcessor, commit, is_unique_violation};
use kanau::processor::Processor;
use rust_decimal::Decimal;
use time::PrimitiveDateTime;
use tracing::instrument;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type, serde::Serialize, serde::Deserialize,
)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// An active payment blocks new payments for the same order.
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Payment {
    pub id: i64,
    pub order_id: i64,
    pub amount: Decimal,
    pub status: PaymentStatus,
    pub qr_reference: String,
    /// `data:` URL of the rendered QR code; empty when rendering failed.
    pub qr_image: String,
    pub transaction_id: Option<String>,
    pub created_at: PrimitiveDateTime,
    pub confirmed_at: Option<PrimitiveDateTime>,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct PaymentHistory {
    pub id: i64,
    pub payment_id: i64,
    /// Empty for the row written at creation.
    pub old_status: String,
    pub new_status: String,
    pub notes: String,
    pub created_at: PrimitiveDateTime,
}

const PAYMENT_COLUMNS_BY_ID: &str = r#"
    SELECT id, order_id, amount, status, qr_reference, qr_image, transaction_id,
           created_at, confirmed_at, updated_at
    FROM "shop"."payment"
    WHERE id = $1
"#;

const INSERT_PAYMENT_HISTORY: &str = r#"
    INSERT INTO "shop"."payment_history" (payment_id, old_status, new_status, notes)
    VALUES ($1, $2, $3, $4)
"#;

const INSERT_ORDER_HISTORY: &str = r#"
    INSERT INTO "shop"."order_status_history" (order_id, status, changed_by, notes)
    VALUES ($1, $2, $3, $4)
"#;

#[derive(Debug, Clone)]
pub struct InsertPayment {
    pub order_id: i64,
    pub qr_reference: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertPaymentOutcome {
    Created(Payment),
    OrderMissing,
    OrderNotPending(OrderStatus),
    AlreadyExists,
    /// The generated reference collided with an existing one.
    ReferenceTaken,
}

impl Processor<InsertPayment> for DatabaseProcessor {
    type Output = InsertPaymentOutcome;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:InsertPayment", err)]
    async fn process(&self, input: InsertPayment) -> Result<InsertPaymentOutcome, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some((status, total)) = sqlx::query_as::<_, (OrderStatus, Decimal)>(
            r#"
            SELECT status, total FROM "shop"."user_order"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(input.order_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(InsertPaymentOutcome::OrderMissing);
        };
        if status != OrderStatus::Pending {
            return Ok(InsertPaymentOutcome::OrderNotPending(status));
        }
        let active = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM "shop"."payment"
                WHERE order_id = $1 AND status NOT IN ('failed', 'cancelled')
            )
            "#,
        )
        .bind(input.order_id)
        .fetch_one(&mut *tx)
        .await?;
        if active {
            return Ok(InsertPaymentOutcome::AlreadyExists);
        }
        let inserted = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO "shop"."payment" (order_id, amount, status, qr_reference)
            VALUES ($1, $2, 'pending', $3)
            RETURNING id, order_id, amount, status, qr_reference, qr_image, transaction_id,
                      created_at, confirmed_at, updated_at
            "#,
        )
        .bind(input.order_id)
        .bind(total)
        .bind(&input.qr_reference)
        .fetch_one(&mut *tx)
        .await;
        let payment = match inserted {
            Ok(payment) => payment,
            Err(e) if is_unique_violation(&e) => return Ok(InsertPaymentOutcome::ReferenceTaken),
            Err(e) => return Err(e),
        };
        sqlx::query(INSERT_PAYMENT_HISTORY)
            .bind(payment.id)
            .bind("")
            .bind(PaymentStatus::Pending.as_str())
            .bind(&input.notes)
            .execute(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(InsertPaymentOutcome::Created(payment))
    }
}

#[derive(Debug, Clone)]
pub struct AttachPaymentQr {
    pub payment_id: i64,
    pub qr_image: String,
}

impl Processor<AttachPaymentQr> for DatabaseProcessor {
    type Output = ();
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:AttachPaymentQr", err)]
    async fn process(&self, input: AttachPaymentQr) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE "shop"."payment"
            SET qr_image = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(input.payment_id)
        .bind(&input.qr_image)
        .execute(self.db())
        .await?;
        Ok(())
    }
}

/// Complete a pending payment and confirm its pending order.
#[derive(Debug, Clone)]
pub struct ConfirmPayment {
    pub payment_id: i64,
    pub changed_by: Uuid,
    pub transaction_id: Option<String>,
    pub payment_note: String,
    pub order_note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmPaymentOutcome {
    Confirmed(Payment),
    PaymentMissing,
    PaymentNotPending(PaymentStatus),
    OrderNotPending(OrderStatus),
    /// Another payment already carries this transaction id.
    TransactionIdTaken,
}

impl Processor<ConfirmPayment> for DatabaseProcessor {
    type Output = ConfirmPaymentOutcome;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:ConfirmPayment", err)]
    async fn process(&self, input: ConfirmPayment) -> Result<ConfirmPaymentOutcome, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some((order_id, payment_status)) = sqlx::query_as::<_, (i64, PaymentStatus)>(
            r#"
            SELECT order_id, status FROM "shop"."payment"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(input.payment_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(ConfirmPaymentOutcome::PaymentMissing);
        };
        if payment_status != PaymentStatus::Pending {
            return Ok(ConfirmPaymentOutcome::PaymentNotPending(payment_status));
        }
        let order_status = sqlx::query_scalar::<_, OrderStatus>(
            r#"
            SELECT status FROM "shop"."user_order"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *tx)
        .await?;
        if order_status != OrderStatus::Pending {
            return Ok(ConfirmPaymentOutcome::OrderNotPending(order_status));
        }
        let updated = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE "shop"."payment"
            SET status = 'completed', confirmed_at = NOW(), updated_at = NOW(),
                transaction_id = COALESCE($2, transaction_id)
            WHERE id = $1
            RETURNING id, order_id, amount, status, qr_reference, qr_image, transaction_id,
                      created_at, confirmed_at, updated_at
            "#,
        )
        .bind(input.payment_id)
        .bind(&input.transaction_id)
        .fetch_one(&mut *tx)
        .await;
        let payment = match updated {
            Ok(payment) => payment,
            Err(e) if is_unique_violation(&e) => {
                return Ok(ConfirmPaymentOutcome::TransactionIdTaken);
            }
            Err(e) => return Err(e),
        };
        sqlx::query(INSERT_PAYMENT_HISTORY)
            .bind(payment.id)
            .bind(PaymentStatus::Pending.as_str())
            .bind(PaymentStatus::Completed.as_str())
            .bind(&input.payment_note)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            UPDATE "shop"."user_order"
            SET status = 'confirmed', confirmed_at = NOW(), updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .execute(&mut *tx)
        .await?;
        sqlx::query(INSERT_ORDER_HISTORY)
            .bind(order_id)
            .bind(OrderStatus::Confirmed)
            .bind(input.changed_by)
            .bind(&input.order_note)
            .execute(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(ConfirmPaymentOutcome::Confirmed(payment))
    }
}

#[derive(Debug, Clone)]
pub struct CancelPayment {
    pub payment_id: i64,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelPaymentOutcome {
    Cancelled(Payment),
    PaymentMissing,
    PaymentNotPending(PaymentStatus),
}

impl Processor<CancelPayment> for DatabaseProcessor {
    type Output = CancelPaymentOutcome;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL-Transaction:CancelPayment", err)]
    async fn process(&self, input: CancelPayment) -> Result<CancelPaymentOutcome, sqlx::Error> {
        let mut tx = self.begin().await?;
        let Some(status) = sqlx::query_scalar::<_, PaymentStatus>(
            r#"
            SELECT status FROM "shop"."payment"
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(input.payment_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(CancelPaymentOutcome::PaymentMissing);
        };
        if status != PaymentStatus::Pending {
            return Ok(CancelPaymentOutcome::PaymentNotPending(status));
        }
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE "shop"."payment"
            SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1
            RETURNING id, order_id, amount, status, qr_reference, qr_image, transaction_id,
                      created_at, confirmed_at, updated_at
            "#,
        )
        .bind(input.payment_id)
        .fetch_one(&mut *tx)
        .await?;
        sqlx::query(INSERT_PAYMENT_HISTORY)
            .bind(payment.id)
            .bind(PaymentStatus::Pending.as_str())
            .bind(PaymentStatus::Cancelled.as_str())
            .bind(&input.notes)
            .execute(&mut *tx)
            .await?;
        commit(tx).await?;
        Ok(CancelPaymentOutcome::Cancelled(payment))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FindPaymentById {
    pub id: i64,
}

impl Processor<FindPaymentById> for DatabaseProcessor {
    type Output = Option<Payment>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:FindPaymentById", err)]
    async fn process(&self, input: FindPaymentById) -> Result<Option<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(PAYMENT_COLUMNS_BY_ID)
            .bind(input.id)
            .fetch_optional(self.db())
            .await
    }
}

/// Newest first; `client_id` restricts to payments of that client's orders.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListPayments {
    pub client_id: Option<Uuid>,
}

impl Processor<ListPayments> for DatabaseProcessor {
    type Output = Vec<Payment>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListPayments", err)]
    async fn process(&self, input: ListPayments) -> Result<Vec<Payment>, sqlx::Error> {
        sqlx::query_as::<_, Payment>(
            r#"
            SELECT p.id, p.order_id, p.amount, p.status, p.qr_reference, p.qr_image,
                   p.transaction_id, p.created_at, p.confirmed_at, p.updated_at
            FROM "shop"."payment" p
            JOIN "shop"."user_order" o ON o.id = p.order_id
            WHERE $1::UUID IS NULL OR o.client_id = $1
            ORDER BY p.created_at DESC, p.id DESC
            "#,
        )
        .bind(input.client_id)
        .fetch_all(self.db())
        .await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ListPaymentHistory {
    pub payment_id: i64,
}

impl Processor<ListPaymentHistory> for DatabaseProcessor {
    type Output = Vec<PaymentHistory>;
    type Error = sqlx::Error;
    #[instrument(skip_all, name = "SQL:ListPaymentHistory", err)]
    async fn process(&self, input: ListPaymentHistory) -> Result<Vec<PaymentHistory>, sqlx::Error> {
        sqlx::query_as::<_, PaymentHistory>(
            r#"
            SELECT id, payment_id, old_status, new_status, notes, created_at
            FROM "shop"."payment_history"
            WHERE payment_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(input.payment_id)
        .fetch_all(self.db())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_failed_and_cancelled_release_the_order() {
        assert!(PaymentStatus::Pending.is_active());
        assert!(PaymentStatus::Processing.is_active());
        assert!(PaymentStatus::Completed.is_active());
        assert!(!PaymentStatus::Failed.is_active());
        assert!(!PaymentStatus::Cancelled.is_active());
    }
}
