//! Persisted checkout record.

use chrono::{DateTime, Utc};
use common::{CheckoutId, OrderId, UserId};
use domain::{CartLine, Entity, Money, PaymentMethod};
use serde::{Deserialize, Serialize};

/// The state of a checkout in its lifecycle.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           └──► Compensating ──► Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CheckoutState {
    /// Steps are being executed.
    #[default]
    Running,

    /// A step failed and completed steps are being undone.
    Compensating,

    /// The order was placed (terminal state).
    Completed,

    /// Compensation finished after a failure (terminal state).
    Failed,
}

impl CheckoutState {
    pub fn can_compensate(&self) -> bool {
        matches!(self, CheckoutState::Running)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutState::Completed | CheckoutState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutState::Running => "Running",
            CheckoutState::Compensating => "Compensating",
            CheckoutState::Completed => "Completed",
            CheckoutState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStep {
    ReserveStock,
    CapturePayment,
    PlaceOrder,
    SendConfirmation,
}

impl CheckoutStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckoutStep::ReserveStock => "reserve_stock",
            CheckoutStep::CapturePayment => "capture_payment",
            CheckoutStep::PlaceOrder => "place_order",
            CheckoutStep::SendConfirmation => "send_confirmation",
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One checkout attempt and everything needed to undo it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: CheckoutId,
    pub user: UserId,
    pub state: CheckoutState,
    pub payment_method: PaymentMethod,
    pub amount: Money,
    pub completed_steps: Vec<CheckoutStep>,
    /// Lines whose stock has been taken so far.
    pub reserved: Vec<CartLine>,
    pub payment_id: Option<String>,
    pub order_id: Option<OrderId>,
    pub notification_sent: bool,
    pub failed_step: Option<CheckoutStep>,
    pub failure_reason: Option<String>,
    /// Compensation actions that could not be carried out.
    #[serde(default)]
    pub compensation_failures: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for CheckoutSession {
    type Id = CheckoutId;
    const COLLECTION: &'static str = "checkouts";
    const NAME: &'static str = "Checkout";

    fn id(&self) -> CheckoutId {
        self.id
    }
}

impl CheckoutSession {
    pub fn start(user: UserId, payment_method: PaymentMethod, amount: Money) -> Self {
        let now = Utc::now();
        Self {
            id: CheckoutId::new(),
            user,
            state: CheckoutState::Running,
            payment_method,
            amount,
            completed_steps: Vec::new(),
            reserved: Vec::new(),
            payment_id: None,
            order_id: None,
            notification_sent: false,
            failed_step: None,
            failure_reason: None,
            compensation_failures: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn complete_step(&mut self, step: CheckoutStep) {
        if !self.completed_steps.contains(&step) {
            self.completed_steps.push(step);
        }
        self.updated_at = Utc::now();
    }

    pub fn has_completed(&self, step: CheckoutStep) -> bool {
        self.completed_steps.contains(&step)
    }

    pub fn begin_compensation(&mut self, step: CheckoutStep, reason: String) {
        if self.state.can_compensate() {
            self.state = CheckoutState::Compensating;
        }
        self.failed_step = Some(step);
        self.failure_reason = Some(reason);
        self.updated_at = Utc::now();
    }

    pub fn finish(&mut self, state: CheckoutState) {
        self.state = state;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(!CheckoutState::Running.is_terminal());
        assert!(!CheckoutState::Compensating.is_terminal());
        assert!(CheckoutState::Completed.is_terminal());
        assert!(CheckoutState::Failed.is_terminal());
        assert!(CheckoutState::Running.can_compensate());
        assert!(!CheckoutState::Completed.can_compensate());
    }

    #[test]
    fn steps_are_recorded_once_in_order() {
        let mut session = CheckoutSession::start(UserId::new(), PaymentMethod::Card, Money::from_cents(100));
        session.complete_step(CheckoutStep::ReserveStock);
        session.complete_step(CheckoutStep::CapturePayment);
        session.complete_step(CheckoutStep::ReserveStock);

        assert_eq!(
            session.completed_steps,
            vec![CheckoutStep::ReserveStock, CheckoutStep::CapturePayment]
        );
        assert_eq!(
            serde_json::to_value(CheckoutStep::CapturePayment).unwrap(),
            serde_json::json!("capture_payment")
        );
    }

    #[test]
    fn compensation_records_reason() {
        let mut session = CheckoutSession::start(UserId::new(), PaymentMethod::Cod, Money::zero());
        session.begin_compensation(CheckoutStep::ReserveStock, "out of stock".into());
        assert_eq!(session.state, CheckoutState::Compensating);
        assert_eq!(session.failed_step, Some(CheckoutStep::ReserveStock));

        session.finish(CheckoutState::Failed);
        assert!(session.state.is_terminal());
    }
}
