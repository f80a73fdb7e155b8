use crate::catalog::ServiceType;
use crate::orders::OrderStatus;

/// Service for managing order status transitions
pub struct StatusMachine;

impl StatusMachine {
    /// Check if a status transition is valid for an order's service type
    ///
    /// # Valid Transitions
    /// - Pending → Confirmed, Cancelled
    /// - Confirmed → Preparing, Cancelled
    /// - Preparing → Ready, Cancelled
    /// - Ready → OutForDelivery (delivery), Completed (pickup), Cancelled
    /// - OutForDelivery → Delivered (delivery only)
    /// - Delivered / Completed → Refunded
    /// - Cancelled, Refunded → (terminal)
    /// - Any status → same status (idempotent)
    pub fn is_valid_transition(
        service_type: ServiceType,
        from: OrderStatus,
        to: OrderStatus,
    ) -> bool {
        // Same status is always valid (idempotent)
        if from == to {
            return true;
        }

        match (from, to) {
            (OrderStatus::Pending, OrderStatus::Confirmed) => true,
            (OrderStatus::Confirmed, OrderStatus::Preparing) => true,
            (OrderStatus::Preparing, OrderStatus::Ready) => true,

            // The fulfillment fork depends on the service type
            (OrderStatus::Ready, OrderStatus::OutForDelivery) => {
                service_type == ServiceType::Delivery
            }
            (OrderStatus::Ready, OrderStatus::Completed) => service_type == ServiceType::Pickup,
            (OrderStatus::OutForDelivery, OrderStatus::Delivered) => {
                service_type == ServiceType::Delivery
            }

            // Cancellation window
            (
                OrderStatus::Pending
                | OrderStatus::Confirmed
                | OrderStatus::Preparing
                | OrderStatus::Ready,
                OrderStatus::Cancelled,
            ) => true,

            // Refunds only after fulfillment
            (OrderStatus::Delivered | OrderStatus::Completed, OrderStatus::Refunded) => true,

            _ => false,
        }
    }

    /// Attempt to transition from one status to another
    pub fn transition(
        service_type: ServiceType,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<OrderStatus, String> {
        if Self::is_valid_transition(service_type, from, to) {
            Ok(to)
        } else {
            Err(format!(
                "Invalid status transition from {} to {} for {} orders",
                from, to, service_type
            ))
        }
    }

    /// Whether the customer may still cancel
    pub fn can_cancel(status: OrderStatus) -> bool {
        matches!(
            status,
            OrderStatus::Pending
                | OrderStatus::Confirmed
                | OrderStatus::Preparing
                | OrderStatus::Ready
        )
    }

    /// Driver assignment is allowed up through `ready`, delivery orders only
    pub fn can_assign_driver(service_type: ServiceType, status: OrderStatus) -> bool {
        service_type == ServiceType::Delivery
            && matches!(
                status,
                OrderStatus::Pending
                    | OrderStatus::Confirmed
                    | OrderStatus::Preparing
                    | OrderStatus::Ready
            )
    }

    /// The restaurant may only change strictly before `ready`; doing so
    /// clears the driver (a driver belongs to one restaurant)
    pub fn can_change_restaurant(status: OrderStatus) -> bool {
        matches!(
            status,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_to_confirmed() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Pending,
            OrderStatus::Confirmed
        ));
    }

    #[test]
    fn test_confirmed_to_preparing() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Confirmed,
            OrderStatus::Preparing
        ));
    }

    #[test]
    fn test_preparing_to_ready() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Preparing,
            OrderStatus::Ready
        ));
    }

    #[test]
    fn test_ready_to_out_for_delivery_delivery_only() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery
        ));
    }

    #[test]
    fn test_ready_to_completed_pickup_only() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Ready,
            OrderStatus::Completed
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Ready,
            OrderStatus::Completed
        ));
    }

    #[test]
    fn test_out_for_delivery_to_delivered() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered
        ));
    }

    #[test]
    fn test_delivered_to_refunded() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Delivered,
            OrderStatus::Refunded
        ));
    }

    #[test]
    fn test_completed_to_refunded() {
        assert!(StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Completed,
            OrderStatus::Refunded
        ));
    }

    #[test]
    fn test_cancel_window() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(StatusMachine::is_valid_transition(
                ServiceType::Pickup,
                status,
                OrderStatus::Cancelled
            ));
            assert!(StatusMachine::can_cancel(status));
        }
    }

    #[test]
    fn test_no_cancel_after_fulfillment() {
        for status in [
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert!(!StatusMachine::can_cancel(status));
        }
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled
        ));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Refunded,
        ] {
            assert!(!StatusMachine::is_valid_transition(
                ServiceType::Delivery,
                OrderStatus::Cancelled,
                to
            ));
        }
    }

    #[test]
    fn test_refunded_is_terminal() {
        for to in [
            OrderStatus::Pending,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(!StatusMachine::is_valid_transition(
                ServiceType::Pickup,
                OrderStatus::Refunded,
                to
            ));
        }
    }

    #[test]
    fn test_invalid_skip_transitions() {
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Pending,
            OrderStatus::Preparing
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Pending,
            OrderStatus::Ready
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Confirmed,
            OrderStatus::OutForDelivery
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Confirmed,
            OrderStatus::Completed
        ));
    }

    #[test]
    fn test_invalid_backward_transitions() {
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Pickup,
            OrderStatus::Confirmed,
            OrderStatus::Pending
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Ready,
            OrderStatus::Preparing
        ));
        assert!(!StatusMachine::is_valid_transition(
            ServiceType::Delivery,
            OrderStatus::Delivered,
            OrderStatus::OutForDelivery
        ));
    }

    #[test]
    fn test_driver_assignment_window() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert!(StatusMachine::can_assign_driver(ServiceType::Delivery, status));
            assert!(!StatusMachine::can_assign_driver(ServiceType::Pickup, status));
        }
        for status in [
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
        ] {
            assert!(!StatusMachine::can_assign_driver(ServiceType::Delivery, status));
        }
    }

    #[test]
    fn test_restaurant_change_window() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
        ] {
            assert!(StatusMachine::can_change_restaurant(status));
        }
        for status in [
            OrderStatus::Ready,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert!(!StatusMachine::can_change_restaurant(status));
        }
    }

    #[test]
    fn test_transition_error_message() {
        let result = StatusMachine::transition(
            ServiceType::Pickup,
            OrderStatus::Pending,
            OrderStatus::Ready,
        );
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Invalid status transition"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn order_status_strategy() -> impl Strategy<Value = OrderStatus> {
        prop_oneof![
            Just(OrderStatus::Pending),
            Just(OrderStatus::Confirmed),
            Just(OrderStatus::Preparing),
            Just(OrderStatus::Ready),
            Just(OrderStatus::OutForDelivery),
            Just(OrderStatus::Delivered),
            Just(OrderStatus::Completed),
            Just(OrderStatus::Cancelled),
            Just(OrderStatus::Refunded),
        ]
    }

    fn service_type_strategy() -> impl Strategy<Value = ServiceType> {
        prop_oneof![Just(ServiceType::Pickup), Just(ServiceType::Delivery)]
    }

    /// Same-status transitions are always valid (idempotent)
    #[test]
    fn prop_same_status_is_valid() {
        proptest!(|(
            status in order_status_strategy(),
            st in service_type_strategy(),
        )| {
            prop_assert!(StatusMachine::is_valid_transition(st, status, status));
        });
    }

    /// Cancelled and refunded accept no outgoing transitions
    #[test]
    fn prop_terminal_states_are_terminal() {
        proptest!(|(
            to in order_status_strategy(),
            st in service_type_strategy(),
        )| {
            for terminal in [OrderStatus::Cancelled, OrderStatus::Refunded] {
                if to != terminal {
                    prop_assert!(!StatusMachine::is_valid_transition(st, terminal, to));
                }
            }
        });
    }

    /// Pickup orders never pass through the delivery-only states
    #[test]
    fn prop_pickup_never_reaches_delivery_states() {
        proptest!(|(from in order_status_strategy())| {
            for to in [OrderStatus::OutForDelivery, OrderStatus::Delivered] {
                if from != to {
                    prop_assert!(!StatusMachine::is_valid_transition(
                        ServiceType::Pickup,
                        from,
                        to
                    ));
                }
            }
        });
    }

    /// transition() and is_valid_transition() agree everywhere
    #[test]
    fn prop_transition_consistency() {
        proptest!(|(
            from in order_status_strategy(),
            to in order_status_strategy(),
            st in service_type_strategy(),
        )| {
            let is_valid = StatusMachine::is_valid_transition(st, from, to);
            let result = StatusMachine::transition(st, from, to);

            if is_valid {
                prop_assert_eq!(result.unwrap(), to);
            } else {
                prop_assert!(result.is_err());
            }
        });
    }

    /// The cancellation window and the transition table agree
    #[test]
    fn prop_cancel_window_matches_transitions() {
        proptest!(|(
            from in order_status_strategy(),
            st in service_type_strategy(),
        )| {
            if from != OrderStatus::Cancelled {
                prop_assert_eq!(
                    StatusMachine::can_cancel(from),
                    StatusMachine::is_valid_transition(st, from, OrderStatus::Cancelled)
                );
            }
        });
    }
}
