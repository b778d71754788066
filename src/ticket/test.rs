#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use crate::ticket::alloc::{
        check_capacity, check_confirmable, check_numbers, check_selection_shape,
    };
    use crate::ticket::TicketError;
    use crate::types::{Raffle, Ticket, TicketStatus};

    fn raffle(total: i32, sold: i32, reserved: i32) -> Raffle {
        Raffle {
            id: 1,
            title: "Summer raffle".to_string(),
            description: None,
            total_tickets: total,
            tickets_sold: sold,
            tickets_reserved: reserved,
            ticket_price: 5.0,
            prize_first: "Smart TV".to_string(),
            prize_second: "Tablet".to_string(),
            prize_third: "Headphones".to_string(),
            is_active: true,
            is_completed: false,
            draw_date: None,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    fn ticket(id: i32, raffle_id: i32, participant_id: i32, status: TicketStatus) -> Ticket {
        Ticket {
            id,
            ticket_number: id,
            participant_id,
            raffle_id,
            status,
            payment_confirmed: status == TicketStatus::Paid,
            purchase_date: chrono::Utc::now().naive_utc(),
            reserved_until: None,
            payment_date: None,
            is_winner: false,
        }
    }

    #[test]
    fn empty_selection_is_rejected() {
        assert!(matches!(
            check_selection_shape(&[], 50),
            Err(TicketError::InvalidInput(_))
        ));
    }

    #[test]
    fn oversized_selection_is_rejected() {
        let numbers: Vec<i32> = (1..=51).collect();
        assert!(matches!(
            check_selection_shape(&numbers, 50),
            Err(TicketError::InvalidInput(_))
        ));
        assert!(check_selection_shape(&numbers[..50], 50).is_ok());
    }

    #[test]
    fn duplicate_numbers_are_rejected() {
        assert!(matches!(
            check_selection_shape(&[1, 2, 2], 50),
            Err(TicketError::InvalidInput(_))
        ));
    }

    #[test]
    fn capacity_counts_sold_and_reserved() {
        // 10 total, 5 sold, 3 reserved: 2 remain.
        let r = raffle(10, 5, 3);
        assert!(check_capacity(&r, 2).is_ok());
        match check_capacity(&r, 3) {
            Err(TicketError::CapacityExceeded(reason)) => {
                assert!(reason.contains('2'), "should report true remainder: {reason}")
            }
            other => panic!("expected CapacityExceeded, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_numbers_reported_in_full() {
        let occupied = BTreeSet::new();
        match check_numbers(&[0, 5, 11], 10, &occupied) {
            Err(TicketError::InvalidInput(reason)) => {
                assert!(reason.contains('0') && reason.contains("11"), "{reason}");
            }
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn occupied_numbers_conflict_whether_reserved_or_paid() {
        let occupied: BTreeSet<i32> = [3, 4].into_iter().collect();
        match check_numbers(&[3, 4, 5], 10, &occupied) {
            Err(TicketError::Conflict(reason)) => {
                assert!(reason.contains('3') && reason.contains('4'), "{reason}");
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
        assert!(check_numbers(&[5, 6], 10, &occupied).is_ok());
    }

    #[test]
    fn scenario_second_buyer_collides_on_number_three() {
        // Raffle of 10: participant A reserved 1,2,3. B asks for 3,4.
        let occupied: BTreeSet<i32> = [1, 2, 3].into_iter().collect();
        assert!(matches!(
            check_numbers(&[3, 4], 10, &occupied),
            Err(TicketError::Conflict(_))
        ));
    }

    #[test]
    fn confirm_requires_every_ticket_to_exist() {
        let tickets = vec![ticket(1, 1, 10, TicketStatus::Reserved)];
        assert!(matches!(
            check_confirmable(&tickets, &[1, 2], 10),
            Err(TicketError::NotFound(_))
        ));
    }

    #[test]
    fn confirm_rejects_foreign_tickets() {
        let tickets = vec![
            ticket(1, 1, 10, TicketStatus::Reserved),
            ticket(2, 1, 99, TicketStatus::Reserved),
        ];
        assert!(matches!(
            check_confirmable(&tickets, &[1, 2], 10),
            Err(TicketError::NotFound(_))
        ));
    }

    #[test]
    fn double_confirmation_is_invalid_state_not_a_no_op() {
        let tickets = vec![ticket(1, 1, 10, TicketStatus::Paid)];
        assert!(matches!(
            check_confirmable(&tickets, &[1], 10),
            Err(TicketError::InvalidState(_))
        ));
    }

    #[test]
    fn confirm_rejects_mixed_raffles() {
        let tickets = vec![
            ticket(1, 1, 10, TicketStatus::Reserved),
            ticket(2, 2, 10, TicketStatus::Reserved),
        ];
        assert!(matches!(
            check_confirmable(&tickets, &[1, 2], 10),
            Err(TicketError::InvalidInput(_))
        ));
    }

    #[test]
    fn confirm_returns_the_common_raffle() {
        let tickets = vec![
            ticket(1, 7, 10, TicketStatus::Reserved),
            ticket(2, 7, 10, TicketStatus::Reserved),
        ];
        assert_eq!(check_confirmable(&tickets, &[1, 2], 10).unwrap(), 7);
    }
}
