use super::{Actor, OrderingStore};
use crate::entities::order::{FindOrderById, UserOrder};
use crate::entities::payment::{
    AttachPaymentQr, CancelPayment, CancelPaymentOutcome, ConfirmPayment, ConfirmPaymentOutcome,
    FindPaymentById, InsertPayment, InsertPaymentOutcome, ListPaymentHistory, ListPayments,
    Payment, PaymentHistory,
};
use crate::error::OrderingError;
use crate::utils::qr::{QrRenderer, SvgQrRenderer, payment_content};
use crate::utils::reference::qr_reference;
use framework::sqlx::DatabaseProcessor;
use kanau::processor::Processor;
use std::sync::Arc;
use tracing::{info, instrument, warn};

const REFERENCE_ATTEMPTS: usize = 5;
const DEFAULT_CANCEL_REASON: &str = "No reason given";
pub const MAX_TRANSACTION_ID_LEN: usize = 100;

pub struct PaymentService<S = DatabaseProcessor, R = SvgQrRenderer> {
    pub store: S,
    pub renderer: Arc<R>,
}

impl<S: Clone, R> Clone for PaymentService<S, R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            renderer: self.renderer.clone(),
        }
    }
}

impl<S: OrderingStore, R: QrRenderer> PaymentService<S, R> {
    pub fn new(store: S, renderer: R) -> Self {
        Self {
            store,
            renderer: Arc::new(renderer),
        }
    }

    /// The payment and its order, if the actor owns the order or is staff.
    async fn owned_payment(
        &self,
        actor: &Actor,
        payment_id: i64,
    ) -> Result<(Payment, UserOrder), OrderingError> {
        let payment = self
            .store
            .process(FindPaymentById { id: payment_id })
            .await?
            .ok_or(OrderingError::NotFound)?;
        let order = self
            .store
            .process(FindOrderById {
                id: payment.order_id,
            })
            .await?
            .ok_or(OrderingError::NotFound)?;
        if !actor.is_staff && order.client_id != actor.id {
            return Err(OrderingError::NotFound);
        }
        Ok((payment, order))
    }

    async fn detail(&self, payment: Payment, order: &UserOrder) -> Result<PaymentDetail, OrderingError> {
        let history = self
            .store
            .process(ListPaymentHistory {
                payment_id: payment.id,
            })
            .await?;
        Ok(PaymentDetail {
            payment,
            order_number: order.order_number.clone(),
            order_status: order.status,
            history,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetail {
    pub payment: Payment,
    pub order_number: String,
    pub order_status: crate::entities::order::OrderStatus,
    pub history: Vec<PaymentHistory>,
}

#[derive(Debug, Clone, Copy)]
pub struct CreatePayment {
    pub actor: Actor,
    pub order_id: i64,
}

impl<S: OrderingStore, R: QrRenderer> Processor<CreatePayment> for PaymentService<S, R> {
    type Output = PaymentDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "CreatePayment", err)]
    async fn process(&self, input: CreatePayment) -> Result<PaymentDetail, OrderingError> {
        let order = self
            .store
            .process(FindOrderById { id: input.order_id })
            .await?
            .filter(|order| order.client_id == input.actor.id)
            .ok_or(OrderingError::NotFound)?;
        let mut payment = None;
        for _ in 0..REFERENCE_ATTEMPTS {
            let outcome = self
                .store
                .process(InsertPayment {
                    order_id: order.id,
                    qr_reference: qr_reference(),
                    notes: "Payment started, QR generated".to_owned(),
                })
                .await?;
            match outcome {
                InsertPaymentOutcome::Created(created) => {
                    payment = Some(created);
                    break;
                }
                InsertPaymentOutcome::ReferenceTaken => continue,
                InsertPaymentOutcome::OrderMissing => return Err(OrderingError::NotFound),
                InsertPaymentOutcome::OrderNotPending(status) => {
                    return Err(OrderingError::OrderNotPending(status));
                }
                InsertPaymentOutcome::AlreadyExists => {
                    return Err(OrderingError::PaymentAlreadyExists);
                }
            }
        }
        let mut payment = payment.ok_or_else(|| {
            anyhow::anyhow!("no free qr reference after {REFERENCE_ATTEMPTS} attempts")
        })?;

        let content = payment_content(&payment.qr_reference, payment.amount, &order.order_number);
        match self.renderer.render(&content) {
            Ok(qr_image) => {
                self.store
                    .process(AttachPaymentQr {
                        payment_id: payment.id,
                        qr_image: qr_image.clone(),
                    })
                    .await?;
                payment.qr_image = qr_image;
            }
            Err(e) => {
                warn!(payment = %payment.qr_reference, error = %e, "qr rendering failed");
            }
        }
        info!(payment = %payment.qr_reference, order = %order.order_number, amount = %payment.amount, "payment created");
        self.detail(payment, &order).await
    }
}

#[derive(Debug, Clone)]
pub struct ConfirmOrderPayment {
    pub actor: Actor,
    pub payment_id: i64,
    pub transaction_id: Option<String>,
}

impl<S: OrderingStore, R: QrRenderer> Processor<ConfirmOrderPayment> for PaymentService<S, R> {
    type Output = PaymentDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ConfirmOrderPayment", err)]
    async fn process(&self, input: ConfirmOrderPayment) -> Result<PaymentDetail, OrderingError> {
        let transaction_id = input
            .transaction_id
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty());
        if transaction_id
            .as_ref()
            .is_some_and(|id| id.chars().count() > MAX_TRANSACTION_ID_LEN)
        {
            return Err(OrderingError::invalid_input(format!(
                "transaction_id must be at most {MAX_TRANSACTION_ID_LEN} characters"
            )));
        }
        let (payment, order) = self.owned_payment(&input.actor, input.payment_id).await?;
        let outcome = self
            .store
            .process(ConfirmPayment {
                payment_id: payment.id,
                changed_by: input.actor.id,
                transaction_id,
                payment_note: "Payment confirmed, QR scanned".to_owned(),
                order_note: format!("Confirmed by payment {}", payment.qr_reference),
            })
            .await?;
        let confirmed = match outcome {
            ConfirmPaymentOutcome::Confirmed(confirmed) => confirmed,
            ConfirmPaymentOutcome::PaymentMissing => return Err(OrderingError::NotFound),
            ConfirmPaymentOutcome::PaymentNotPending(status) => {
                return Err(OrderingError::PaymentNotPending(status));
            }
            ConfirmPaymentOutcome::OrderNotPending(status) => {
                return Err(OrderingError::OrderNotPending(status));
            }
            ConfirmPaymentOutcome::TransactionIdTaken => {
                return Err(OrderingError::TransactionIdTaken);
            }
        };
        info!(payment = %confirmed.qr_reference, order = %order.order_number, "payment confirmed");
        let order = self
            .store
            .process(FindOrderById { id: order.id })
            .await?
            .ok_or(OrderingError::NotFound)?;
        self.detail(confirmed, &order).await
    }
}

#[derive(Debug, Clone)]
pub struct CancelOrderPayment {
    pub actor: Actor,
    pub payment_id: i64,
    pub reason: Option<String>,
}

impl<S: OrderingStore, R: QrRenderer> Processor<CancelOrderPayment> for PaymentService<S, R> {
    type Output = PaymentDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "CancelOrderPayment", err)]
    async fn process(&self, input: CancelOrderPayment) -> Result<PaymentDetail, OrderingError> {
        let (payment, order) = self.owned_payment(&input.actor, input.payment_id).await?;
        let reason = input
            .reason
            .map(|reason| reason.trim().to_owned())
            .filter(|reason| !reason.is_empty())
            .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_owned());
        let outcome = self
            .store
            .process(CancelPayment {
                payment_id: payment.id,
                notes: format!("Cancelled: {reason}"),
            })
            .await?;
        match outcome {
            CancelPaymentOutcome::Cancelled(cancelled) => {
                info!(payment = %cancelled.qr_reference, "payment cancelled");
                self.detail(cancelled, &order).await
            }
            CancelPaymentOutcome::PaymentMissing => Err(OrderingError::NotFound),
            CancelPaymentOutcome::PaymentNotPending(status) => {
                Err(OrderingError::PaymentNotPending(status))
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GetPayment {
    pub actor: Actor,
    pub payment_id: i64,
}

impl<S: OrderingStore, R: QrRenderer> Processor<GetPayment> for PaymentService<S, R> {
    type Output = PaymentDetail;
    type Error = OrderingError;
    #[instrument(skip_all, name = "GetPayment", err)]
    async fn process(&self, input: GetPayment) -> Result<PaymentDetail, OrderingError> {
        let (payment, order) = self.owned_payment(&input.actor, input.payment_id).await?;
        self.detail(payment, &order).await
    }
}

/// Staff see every payment, everyone else the payments of their own orders.
#[derive(Debug, Clone, Copy)]
pub struct ListVisiblePayments {
    pub actor: Actor,
}

impl<S: OrderingStore, R: QrRenderer> Processor<ListVisiblePayments> for PaymentService<S, R> {
    type Output = Vec<Payment>;
    type Error = OrderingError;
    #[instrument(skip_all, name = "ListVisiblePayments", err)]
    async fn process(&self, input: ListVisiblePayments) -> Result<Vec<Payment>, OrderingError> {
        let client_id = (!input.actor.is_staff).then_some(input.actor.id);
        Ok(self.store.process(ListPayments { client_id }).await?)
    }
}
