//! # Operation Ledger
//!
//! Creates operations and moves them through their state machine.

use crate::application::error::{ApplicationError, ApplicationResult};
use crate::domain::entities::{Operation, OperationOrigin};
use crate::domain::value_objects::{
    AccountId, OperationId, OperationStatus, Price, Quantity, ShareId, Timestamp,
};
use crate::infrastructure::persistence::traits::LedgerTransaction;
use tracing::info;

/// Stateless operation bookkeeping over a ledger transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationLedger;

impl OperationLedger {
    /// Creates an operation ledger.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Records a new pending operation.
    ///
    /// # Errors
    ///
    /// Returns a domain error if `amount` is zero, or a store error.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        tx: &mut dyn LedgerTransaction,
        seller_id: AccountId,
        buyer_id: AccountId,
        share_id: ShareId,
        origin: OperationOrigin,
        price: Price,
        amount: Quantity,
    ) -> ApplicationResult<Operation> {
        let operation = Operation::new(seller_id, buyer_id, share_id, origin, price, amount)?;
        tx.insert_operation(&operation).await?;
        info!(
            operation_id = %operation.id(),
            seller_id = %seller_id,
            buyer_id = %buyer_id,
            %origin,
            %amount,
            %price,
            "operation created"
        );
        Ok(operation)
    }

    /// Loads an operation, if it exists.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn find(
        &self,
        tx: &mut dyn LedgerTransaction,
        id: OperationId,
        for_update: bool,
    ) -> ApplicationResult<Option<Operation>> {
        Ok(tx.find_operation(id, for_update).await?)
    }

    /// Loads an operation.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if it does not exist.
    pub async fn get(
        &self,
        tx: &mut dyn LedgerTransaction,
        id: OperationId,
        for_update: bool,
    ) -> ApplicationResult<Operation> {
        self.find(tx, id, for_update)
            .await?
            .ok_or_else(|| ApplicationError::not_found("operation", id))
    }

    /// Moves an operation to `status`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the operation does not exist
    /// - `DomainError::InvalidStateTransition` if the move is illegal
    pub async fn set_status(
        &self,
        tx: &mut dyn LedgerTransaction,
        id: OperationId,
        status: OperationStatus,
    ) -> ApplicationResult<Operation> {
        let mut operation = self.get(tx, id, true).await?;
        let from = operation.status();
        operation.transition_to(status)?;
        tx.update_operation_status(id, status).await?;
        info!(operation_id = %id, %from, to = %status, "operation status changed");
        Ok(operation)
    }

    /// Shares `seller_id` has in pending sales of `share_id`.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn sum_pending_amount(
        &self,
        tx: &mut dyn LedgerTransaction,
        share_id: ShareId,
        seller_id: AccountId,
    ) -> ApplicationResult<Quantity> {
        Ok(tx.sum_pending_amount(share_id, seller_id).await?)
    }

    /// Pending operations created before `cutoff`.
    ///
    /// # Errors
    ///
    /// Returns a store error.
    pub async fn find_pending_created_before(
        &self,
        tx: &mut dyn LedgerTransaction,
        cutoff: Timestamp,
    ) -> ApplicationResult<Vec<Operation>> {
        Ok(tx.find_pending_created_before(cutoff).await?)
    }
}
