//! # Payment Events
//!
//! Messages exchanged with the external payment processor.
//!
//! Outbound requests are keyed by the operation id; the processor answers
//! on the settlement-result topic with the same id. All payloads are JSON
//! with camel-case field names.

use crate::domain::entities::Operation;
use crate::domain::errors::DomainResult;
use crate::domain::value_objects::{CardNumber, OperationId, PaymentCard, PaymentCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Request to charge a buyer's card and pay the seller.
///
/// Published when a buyer takes an ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeCardRequested {
    /// Buyer's card details.
    #[serde(flatten)]
    pub payment: PaymentCard,
    /// Seller's card receiving the money.
    pub receiver_card_number: CardNumber,
    /// Total money to move.
    pub amount: Decimal,
    /// Correlation id.
    pub operation_id: OperationId,
}

impl ChargeCardRequested {
    /// Builds the request for a pending operation.
    ///
    /// # Errors
    ///
    /// Returns a domain arithmetic error if the total overflows.
    pub fn for_operation(
        operation: &Operation,
        payment: PaymentCard,
        receiver_card_number: CardNumber,
    ) -> DomainResult<Self> {
        Ok(Self {
            payment,
            receiver_card_number,
            amount: operation.total()?,
            operation_id: operation.id(),
        })
    }
}

/// Request to redeem a bid's prepaid code and pay the seller.
///
/// Published when a seller takes a bid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemCodeRequested {
    /// Prepaid code attached to the bid.
    pub payment_code: PaymentCode,
    /// Seller's card receiving the money.
    pub receiver_card_number: CardNumber,
    /// Total money to move.
    pub amount: Decimal,
    /// Correlation id.
    pub operation_id: OperationId,
}

impl RedeemCodeRequested {
    /// Builds the request for a pending operation.
    ///
    /// # Errors
    ///
    /// Returns a domain arithmetic error if the total overflows.
    pub fn for_operation(
        operation: &Operation,
        payment_code: PaymentCode,
        receiver_card_number: CardNumber,
    ) -> DomainResult<Self> {
        Ok(Self {
            payment_code,
            receiver_card_number,
            amount: operation.total()?,
            operation_id: operation.id(),
        })
    }
}

/// Verdict of the payment processor for one operation.
///
/// Delivered at least once; duplicates must be tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    /// Correlation id.
    pub operation_id: OperationId,
    /// True if money moved.
    pub succeeded: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::entities::OperationOrigin;
    use crate::domain::value_objects::{AccountId, BidId, Price, Quantity, ShareId};

    fn operation() -> Operation {
        Operation::new(
            AccountId::new_v4(),
            AccountId::new_v4(),
            ShareId::new_v4(),
            OperationOrigin::Bid(BidId::new_v4()),
            Price::from_units(5).unwrap(),
            Quantity::new(20),
        )
        .unwrap()
    }

    fn card(n: &str) -> CardNumber {
        CardNumber::new(n).unwrap()
    }

    #[test]
    fn charge_card_wire_shape() {
        let op = operation();
        let payment = PaymentCard::new(card("4111111111111111"), "123", 1, 2030).unwrap();
        let request =
            ChargeCardRequested::for_operation(&op, payment, card("5500000000000004")).unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["cardNumber"], "4111111111111111");
        assert_eq!(json["cvv"], "123");
        assert_eq!(json["expirationMonth"], 1);
        assert_eq!(json["expirationYear"], 2030);
        assert_eq!(json["receiverCardNumber"], "5500000000000004");
        assert_eq!(json["operationId"], op.id().to_string());
        assert_eq!(request.amount, Decimal::from(100));
    }

    #[test]
    fn redeem_code_wire_shape() {
        let op = operation();
        let request = RedeemCodeRequested::for_operation(
            &op,
            PaymentCode::new("PREPAID").unwrap(),
            card("5500000000000004"),
        )
        .unwrap();

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["paymentCode"], "PREPAID");
        assert_eq!(json["receiverCardNumber"], "5500000000000004");
        assert_eq!(json["operationId"], op.id().to_string());
    }

    #[test]
    fn settlement_result_parses() {
        let id = OperationId::new_v4();
        let raw = format!(r#"{{"operationId":"{id}","succeeded":false}}"#);
        let result: SettlementResult = serde_json::from_str(&raw).unwrap();
        assert_eq!(result.operation_id, id);
        assert!(!result.succeeded);
    }

    #[test]
    fn settlement_result_rejects_bad_id() {
        let raw = r#"{"operationId":"nope","succeeded":true}"#;
        assert!(serde_json::from_str::<SettlementResult>(raw).is_err());
    }
}
