#[cfg(test)]
mod tests {
    use crate::raffle::{validate_raffle, CreateRafflePayload, RaffleError};

    fn payload() -> CreateRafflePayload {
        CreateRafflePayload {
            title: "Summer raffle".to_string(),
            description: None,
            total_tickets: 100,
            ticket_price: 5.0,
            prize_first: "Smart TV".to_string(),
            prize_second: "Tablet".to_string(),
            prize_third: "Headphones".to_string(),
        }
    }

    #[test]
    fn accepts_reasonable_raffle() {
        assert!(validate_raffle(&payload()).is_ok());
    }

    #[test]
    fn rejects_capacity_outside_bounds() {
        let mut p = payload();
        p.total_tickets = 0;
        assert!(matches!(
            validate_raffle(&p),
            Err(RaffleError::InvalidInput(_))
        ));

        p.total_tickets = 1001;
        assert!(matches!(
            validate_raffle(&p),
            Err(RaffleError::InvalidInput(_))
        ));

        p.total_tickets = 1000;
        assert!(validate_raffle(&p).is_ok());
    }

    #[test]
    fn rejects_non_positive_price() {
        let mut p = payload();
        p.ticket_price = 0.0;
        assert!(matches!(
            validate_raffle(&p),
            Err(RaffleError::InvalidInput(_))
        ));
    }

    #[test]
    fn rejects_blank_title() {
        let mut p = payload();
        p.title = "  ".to_string();
        assert!(matches!(
            validate_raffle(&p),
            Err(RaffleError::InvalidInput(_))
        ));
    }
}
