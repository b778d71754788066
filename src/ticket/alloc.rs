//! Allocation rules for numbered tickets. Pure checks, separated from the
//! queries so the whole precondition ladder is testable without a database.

use std::collections::BTreeSet;

use crate::types::{Raffle, Ticket, TicketStatus};

use super::TicketError;

fn join_numbers(numbers: &[i32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Request-shape checks: non-empty, within the per-request cap, no duplicate
/// numbers in a single request.
pub(crate) fn check_selection_shape(numbers: &[i32], cap: usize) -> Result<(), TicketError> {
    if numbers.is_empty() {
        return Err(TicketError::InvalidInput(
            "At least one ticket number is required".to_string(),
        ));
    }
    if numbers.len() > cap {
        return Err(TicketError::InvalidInput(format!(
            "At most {cap} tickets per purchase"
        )));
    }
    let unique: BTreeSet<i32> = numbers.iter().copied().collect();
    if unique.len() != numbers.len() {
        return Err(TicketError::InvalidInput(
            "Duplicate ticket numbers in request".to_string(),
        ));
    }
    Ok(())
}

/// The request must fit in what is left after sold and pending reservations.
pub(crate) fn check_capacity(raffle: &Raffle, requested: usize) -> Result<(), TicketError> {
    let remaining = raffle.remaining_capacity().max(0);
    if requested > remaining as usize {
        return Err(TicketError::CapacityExceeded(format!(
            "Only {remaining} tickets available"
        )));
    }
    Ok(())
}

/// Per-number checks with full-set reporting: every out-of-range number is
/// reported together, then every occupied number. A number is occupied while
/// a reserved or paid ticket holds it; cancelled tickets free it.
pub(crate) fn check_numbers(
    requested: &[i32],
    total_tickets: i32,
    occupied: &BTreeSet<i32>,
) -> Result<(), TicketError> {
    let out_of_range: Vec<i32> = requested
        .iter()
        .copied()
        .filter(|n| *n < 1 || *n > total_tickets)
        .collect();
    if !out_of_range.is_empty() {
        return Err(TicketError::InvalidInput(format!(
            "Numbers out of range 1-{}: {}",
            total_tickets,
            join_numbers(&out_of_range)
        )));
    }

    let taken: Vec<i32> = requested
        .iter()
        .copied()
        .filter(|n| occupied.contains(n))
        .collect();
    if !taken.is_empty() {
        return Err(TicketError::Conflict(format!(
            "Numbers already taken: {}",
            join_numbers(&taken)
        )));
    }

    Ok(())
}

/// Payment confirmation preconditions. Every referenced ticket must exist,
/// belong to the confirming participant, still be reserved, and the whole
/// batch must sit in one raffle. Returns that raffle's id.
pub(crate) fn check_confirmable(
    tickets: &[Ticket],
    requested_ids: &[i32],
    participant_id: i32,
) -> Result<i32, TicketError> {
    if tickets.len() != requested_ids.len() {
        let found: BTreeSet<i32> = tickets.iter().map(|t| t.id).collect();
        let missing: Vec<i32> = requested_ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        return Err(TicketError::NotFound(format!(
            "Tickets not found: {}",
            join_numbers(&missing)
        )));
    }

    let foreign: Vec<i32> = tickets
        .iter()
        .filter(|t| t.participant_id != participant_id)
        .map(|t| t.id)
        .collect();
    if !foreign.is_empty() {
        return Err(TicketError::NotFound(format!(
            "Tickets not owned by participant {}: {}",
            participant_id,
            join_numbers(&foreign)
        )));
    }

    let not_reserved: Vec<i32> = tickets
        .iter()
        .filter(|t| t.status != TicketStatus::Reserved)
        .map(|t| t.id)
        .collect();
    if !not_reserved.is_empty() {
        return Err(TicketError::InvalidState(format!(
            "Tickets are not in reserved state: {}",
            join_numbers(&not_reserved)
        )));
    }

    let raffles: BTreeSet<i32> = tickets.iter().map(|t| t.raffle_id).collect();
    let mut raffles = raffles.into_iter();
    match (raffles.next(), raffles.next()) {
        (Some(raffle_id), None) => Ok(raffle_id),
        _ => Err(TicketError::InvalidInput(
            "All tickets must belong to the same raffle".to_string(),
        )),
    }
}
