//! Booking status graph
//!
//! ```text
//! pending --claim(standard)--> accepted
//! pending --claim(routine)--> waiting_approval
//! waiting_approval --customer--> approved
//! accepted | approved --mechanic--> on_the_way
//! on_the_way --mechanic--> in_progress
//! in_progress --mechanic--> completed
//! any non-terminal --cancel--> cancelled
//! ```

use super::model::{BookingStatus, ServiceType};

/// Party allowed to take an `advance` edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOwner {
    /// The booking's customer
    Customer,
    /// The assigned mechanic
    Mechanic,
}

/// Status a booking lands in when a mechanic claims it
pub fn claim_target(service_type: ServiceType) -> BookingStatus {
    match service_type {
        ServiceType::Standard => BookingStatus::Accepted,
        ServiceType::Routine => BookingStatus::WaitingApproval,
    }
}

/// Owner of a forward edge reachable through `advance`, if the edge exists.
///
/// Claim edges and cancellation are not listed; they have their own operations.
pub fn advance_owner(from: BookingStatus, to: BookingStatus) -> Option<EdgeOwner> {
    use BookingStatus::*;
    match (from, to) {
        (WaitingApproval, Approved) => Some(EdgeOwner::Customer),
        (Accepted, OnTheWay) | (Approved, OnTheWay) => Some(EdgeOwner::Mechanic),
        (OnTheWay, InProgress) => Some(EdgeOwner::Mechanic),
        (InProgress, Completed) => Some(EdgeOwner::Mechanic),
        _ => None,
    }
}

pub fn can_cancel(from: BookingStatus) -> bool {
    !from.is_terminal()
}

/// Every status directly reachable from `from`, through any operation
pub fn successors(from: BookingStatus) -> Vec<BookingStatus> {
    let mut next: Vec<BookingStatus> = BookingStatus::ALL
        .into_iter()
        .filter(|to| advance_owner(from, *to).is_some())
        .collect();
    if from == BookingStatus::Pending {
        next.push(claim_target(ServiceType::Standard));
        next.push(claim_target(ServiceType::Routine));
    }
    if can_cancel(from) {
        next.push(BookingStatus::Cancelled);
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use BookingStatus::*;

    #[test]
    fn test_claim_targets() {
        assert_eq!(claim_target(ServiceType::Standard), Accepted);
        assert_eq!(claim_target(ServiceType::Routine), WaitingApproval);
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        assert!(successors(Completed).is_empty());
        assert!(successors(Cancelled).is_empty());
    }

    #[test]
    fn test_pending_successors() {
        let next = successors(Pending);
        assert!(next.contains(&Accepted));
        assert!(next.contains(&WaitingApproval));
        assert!(next.contains(&Cancelled));
        assert!(!next.contains(&InProgress));
        assert_eq!(next.len(), 3);
    }

    #[test]
    fn test_advance_edges_and_owners() {
        assert_eq!(advance_owner(WaitingApproval, Approved), Some(EdgeOwner::Customer));
        assert_eq!(advance_owner(Accepted, OnTheWay), Some(EdgeOwner::Mechanic));
        assert_eq!(advance_owner(Approved, OnTheWay), Some(EdgeOwner::Mechanic));
        assert_eq!(advance_owner(OnTheWay, InProgress), Some(EdgeOwner::Mechanic));
        assert_eq!(advance_owner(InProgress, Completed), Some(EdgeOwner::Mechanic));

        // Claim edges are not advance edges
        assert_eq!(advance_owner(Pending, Accepted), None);
        assert_eq!(advance_owner(Pending, InProgress), None);
        // No skipping ahead
        assert_eq!(advance_owner(Accepted, Completed), None);
        // No going back
        assert_eq!(advance_owner(InProgress, OnTheWay), None);
    }

    #[test]
    fn test_every_advance_edge_is_a_successor() {
        for from in BookingStatus::ALL {
            for to in BookingStatus::ALL {
                if advance_owner(from, to).is_some() {
                    assert!(successors(from).contains(&to), "{} -> {}", from, to);
                }
            }
        }
    }
}
