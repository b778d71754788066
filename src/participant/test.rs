#[cfg(test)]
mod tests {
    use crate::participant::{validate_registration, CreateParticipantPayload, ParticipantError};

    fn payload(name: &str, phone: &str) -> CreateParticipantPayload {
        CreateParticipantPayload {
            name: name.to_string(),
            phone: phone.to_string(),
            email: None,
        }
    }

    #[test]
    fn phone_is_normalized_to_digits() {
        let phone = validate_registration(&payload("Maria", "+53 5 123-4567")).unwrap();
        assert_eq!(phone, "5351234567");
    }

    #[test]
    fn empty_name_is_rejected() {
        let result = validate_registration(&payload("   ", "5351234567"));
        assert!(matches!(result, Err(ParticipantError::InvalidInput(_))));
    }

    #[test]
    fn phone_without_digits_is_rejected() {
        let result = validate_registration(&payload("Maria", "call me"));
        assert!(matches!(result, Err(ParticipantError::InvalidInput(_))));
    }
}
