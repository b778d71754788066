#[cfg(test)]
mod tests {
    use std::collections::{BTreeSet, HashMap};

    use crate::draw::picker::{DrawPicker, SeededPicker};
    use crate::draw::{eligible_tickets, prize_for_position};
    use crate::types::{Raffle, Ticket, TicketStatus};

    fn raffle() -> Raffle {
        Raffle {
            id: 1,
            title: "Summer raffle".to_string(),
            description: None,
            total_tickets: 10,
            tickets_sold: 3,
            tickets_reserved: 0,
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

    fn ticket(id: i32, number: i32, participant_id: i32, status: TicketStatus) -> Ticket {
        Ticket {
            id,
            ticket_number: number,
            participant_id,
            raffle_id: 1,
            status,
            payment_confirmed: status == TicketStatus::Paid,
            purchase_date: chrono::Utc::now().naive_utc(),
            reserved_until: None,
            payment_date: None,
            is_winner: false,
        }
    }

    #[test]
    fn eligibility_requires_paid_status() {
        let tickets = vec![
            ticket(1, 1, 10, TicketStatus::Paid),
            ticket(2, 2, 10, TicketStatus::Reserved),
            ticket(3, 3, 11, TicketStatus::Cancelled),
        ];
        let eligible = eligible_tickets(tickets, &BTreeSet::new());
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 1);
    }

    #[test]
    fn eligibility_excludes_existing_winners() {
        let tickets = vec![
            ticket(1, 1, 10, TicketStatus::Paid),
            ticket(2, 2, 11, TicketStatus::Paid),
            ticket(3, 3, 11, TicketStatus::Paid),
        ];
        // Participant 11 already won; none of their tickets may win again.
        let past: BTreeSet<i32> = [11].into_iter().collect();
        let eligible = eligible_tickets(tickets, &past);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].participant_id, 10);
    }

    #[test]
    fn eligibility_excludes_tickets_that_already_won() {
        let mut winning = ticket(1, 1, 10, TicketStatus::Paid);
        winning.is_winner = true;
        let tickets = vec![winning, ticket(2, 2, 10, TicketStatus::Paid)];
        let eligible = eligible_tickets(tickets, &BTreeSet::new());
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 2);
    }

    #[test]
    fn prize_snapshot_by_position() {
        let r = raffle();
        assert_eq!(prize_for_position(&r, 1), "1° Lugar - Smart TV");
        assert_eq!(prize_for_position(&r, 2), "2° Lugar - Tablet");
        assert_eq!(prize_for_position(&r, 3), "3° Lugar - Headphones");
        assert_eq!(prize_for_position(&r, 4), "Premio 4° Lugar");
    }

    #[test]
    fn seeded_draw_is_roughly_uniform() {
        // Three eligible tickets, many trials: each should land near 1/3.
        let picker = SeededPicker::new(42);
        let trials = 30_000;
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for _ in 0..trials {
            *counts.entry(picker.pick(3)).or_insert(0) += 1;
        }

        assert_eq!(counts.len(), 3);
        for index in 0..3 {
            let share = f64::from(counts[&index]) / f64::from(trials);
            assert!(
                (share - 1.0 / 3.0).abs() < 0.02,
                "index {index} drawn with share {share}"
            );
        }
    }

    #[test]
    fn seeded_picker_is_reproducible() {
        let a = SeededPicker::new(7);
        let b = SeededPicker::new(7);
        let first: Vec<usize> = (0..20).map(|_| a.pick(100)).collect();
        let second: Vec<usize> = (0..20).map(|_| b.pick(100)).collect();
        assert_eq!(first, second);
    }
}
