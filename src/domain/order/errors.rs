// ============================================================================
// Order Validation Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("order_uid is empty")]
    MissingOrderUid,

    #[error("delivery.name is empty")]
    MissingDeliveryName,

    #[error("delivery.phone is empty")]
    MissingDeliveryPhone,

    #[error("payment.transaction is empty")]
    MissingPaymentTransaction,
}
