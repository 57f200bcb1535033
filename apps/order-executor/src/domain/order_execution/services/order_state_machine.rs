//! Order State Machine Service
//!
//! Single source of truth for the permitted order transitions.

use crate::domain::order_execution::errors::OrderError;
use crate::domain::order_execution::value_objects::OrderStatus;

/// Order State Machine for validating transitions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Check if a state transition is valid.
    #[must_use]
    pub const fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
        matches!(
            (from, to),
            // From New
            (OrderStatus::New, OrderStatus::Submitted)
                | (OrderStatus::New, OrderStatus::Rejected)
                // From Submitted
                | (OrderStatus::Submitted, OrderStatus::PartiallyFilled)
                | (OrderStatus::Submitted, OrderStatus::Filled)
                | (OrderStatus::Submitted, OrderStatus::Canceled)
                // From PartiallyFilled
                | (OrderStatus::PartiallyFilled, OrderStatus::PartiallyFilled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Filled)
                | (OrderStatus::PartiallyFilled, OrderStatus::Canceled)
        )
    }

    /// Validate a state transition.
    ///
    /// # Errors
    ///
    /// Returns error if the transition is invalid.
    pub fn validate_transition(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_valid_transition(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidStateTransition {
                from,
                to,
                reason: Self::transition_error_reason(from, to),
            })
        }
    }

    /// Get a human-readable reason for an invalid transition.
    #[must_use]
    pub fn transition_error_reason(from: OrderStatus, to: OrderStatus) -> String {
        match from {
            OrderStatus::Filled => format!("Order is already filled, cannot transition to {to}"),
            OrderStatus::Canceled => format!("Order is canceled, cannot transition to {to}"),
            OrderStatus::Rejected => format!("Order was rejected, cannot transition to {to}"),
            _ => format!("Invalid transition from {from} to {to}"),
        }
    }

    /// Get all valid next states from a given state.
    #[must_use]
    pub fn valid_next_states(from: OrderStatus) -> Vec<OrderStatus> {
        match from {
            OrderStatus::New => vec![OrderStatus::Submitted, OrderStatus::Rejected],
            OrderStatus::Submitted => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Canceled,
            ],
            OrderStatus::PartiallyFilled => vec![
                OrderStatus::PartiallyFilled,
                OrderStatus::Filled,
                OrderStatus::Canceled,
            ],
            // Terminal states
            OrderStatus::Filled | OrderStatus::Canceled | OrderStatus::Rejected => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL: [OrderStatus; 6] = [
        OrderStatus::New,
        OrderStatus::Submitted,
        OrderStatus::PartiallyFilled,
        OrderStatus::Filled,
        OrderStatus::Canceled,
        OrderStatus::Rejected,
    ];

    #[test]
    fn valid_transitions_from_new() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::New,
            OrderStatus::Submitted
        ));
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::New,
            OrderStatus::Rejected
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::New,
            OrderStatus::Filled
        ));
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::New,
            OrderStatus::Canceled
        ));
    }

    #[test]
    fn submitted_can_fill_directly() {
        assert!(OrderStateMachine::is_valid_transition(
            OrderStatus::Submitted,
            OrderStatus::Filled
        ));
    }

    #[test]
    fn no_transition_back_to_new_or_submitted() {
        for from in ALL {
            assert!(!OrderStateMachine::is_valid_transition(from, OrderStatus::New));
        }
        assert!(!OrderStateMachine::is_valid_transition(
            OrderStatus::PartiallyFilled,
            OrderStatus::Submitted
        ));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for from in [
            OrderStatus::Filled,
            OrderStatus::Canceled,
            OrderStatus::Rejected,
        ] {
            assert!(OrderStateMachine::valid_next_states(from).is_empty());
            for to in ALL {
                assert!(!OrderStateMachine::is_valid_transition(from, to));
            }
        }
    }

    #[test]
    fn validate_transition_reports_reason() {
        let err = OrderStateMachine::validate_transition(
            OrderStatus::Filled,
            OrderStatus::Canceled,
        )
        .unwrap_err();
        assert!(err.to_string().contains("already filled"));
    }

    #[test]
    fn valid_next_states_agree_with_predicate() {
        for from in ALL {
            for to in ALL {
                assert_eq!(
                    OrderStateMachine::valid_next_states(from).contains(&to),
                    OrderStateMachine::is_valid_transition(from, to),
                    "{from} -> {to}"
                );
            }
        }
    }

    proptest! {
        #[test]
        fn accepted_walks_never_leave_terminal_states(choices in prop::collection::vec(0usize..6, 0..20)) {
            let mut current = OrderStatus::New;
            for choice in choices {
                let target = ALL[choice];
                if OrderStateMachine::validate_transition(current, target).is_ok() {
                    prop_assert!(!current.is_terminal());
                    current = target;
                }
            }
        }
    }
}
