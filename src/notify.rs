//! Notification composer: turns winner and purchase records into shareable
//! WhatsApp deep links. Composition is best-effort: a link that cannot be
//! built becomes `None`, never an error for the caller.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::Config;

#[derive(Serialize, Deserialize, ToSchema, Clone)]
pub struct WinnerMessage {
    pub recipient_phone: String,
    pub recipient_name: String,
    pub position: i32,
    pub raffle_title: String,
    pub prize_description: String,
    pub ticket_number: i32,
}

/// Strips everything but digits. Participant phones are stored in this form.
pub fn digits_only(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Digits-only recipient with the default country prefix applied to local
/// numbers (8 digits or fewer, not already prefixed).
fn normalize_recipient(phone: &str, config: &Config) -> Option<String> {
    let mut cleaned = digits_only(phone);
    if cleaned.is_empty() {
        return None;
    }
    if !cleaned.starts_with(&config.default_country_prefix) && cleaned.len() <= 8 {
        cleaned = format!("{}{}", config.default_country_prefix, cleaned);
    }
    Some(cleaned)
}

fn deep_link(phone: &str, message: &str, config: &Config) -> Option<String> {
    let recipient = normalize_recipient(phone, config)?;
    Some(format!(
        "{}{}?text={}",
        config.whatsapp_base_url,
        recipient,
        urlencoding::encode(message)
    ))
}

pub fn winner_link(message: &WinnerMessage, config: &Config) -> Option<String> {
    let text = format!(
        "🎉 ¡Felicidades {}! 🎉\n\n\
         Has ganado el {}° premio en la rifa: \n\
         \"{}\"\n\n\
         Premio: {}\n\
         Número ganador: {}\n\n\
         ¡Gracias por participar! Confirma tu premio respondiendo este mensaje.",
        message.recipient_name,
        message.position,
        message.raffle_title,
        message.prize_description,
        message.ticket_number
    );

    let link = deep_link(&message.recipient_phone, &text, config);
    if link.is_none() {
        tracing::warn!(
            phone = %message.recipient_phone,
            "could not compose winner notification link"
        );
    }
    link
}

/// Message alerting an administrator that tickets were reserved and payment
/// is pending.
pub struct PurchaseAlert<'a> {
    pub raffle_title: &'a str,
    pub buyer_name: &'a str,
    pub buyer_phone: &'a str,
    pub buyer_email: Option<&'a str>,
    pub ticket_numbers: &'a [i32],
    pub total_due: f64,
    pub when: chrono::NaiveDateTime,
}

pub fn purchase_alert_link(
    admin_phone: &str,
    alert: &PurchaseAlert<'_>,
    config: &Config,
) -> Option<String> {
    let numbers = alert
        .ticket_numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let text = format!(
        "Nueva compra de boletos\n\n\
         Rifa: {}\n\
         Cliente: {}\n\
         Telefono: {}\n\
         Email: {}\n\
         Cantidad: {} boletos\n\
         Numeros: {}\n\
         Total a pagar: ${:.2}\n\
         Fecha: {}",
        alert.raffle_title,
        alert.buyer_name,
        alert.buyer_phone,
        alert.buyer_email.unwrap_or("No proporcionado"),
        alert.ticket_numbers.len(),
        numbers,
        alert.total_due,
        alert.when.format("%d/%m/%Y %H:%M:%S")
    );

    deep_link(admin_phone, &text, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn config() -> Config {
        Config::from_env().unwrap()
    }

    #[test]
    fn digits_only_strips_formatting() {
        assert_eq!(digits_only("+53 5 123-4567"), "5351234567");
        assert_eq!(digits_only("no digits"), "");
    }

    #[test]
    fn short_numbers_get_country_prefix() {
        let c = config();
        assert_eq!(normalize_recipient("5123 4567", &c).unwrap(), "5351234567");
        // Already prefixed: left alone.
        assert_eq!(normalize_recipient("5351234567", &c).unwrap(), "5351234567");
        // Long foreign number: left alone.
        assert_eq!(
            normalize_recipient("+1 415 555 0100", &c).unwrap(),
            "14155550100"
        );
    }

    #[test]
    fn winner_link_encodes_message() {
        let c = config();
        let link = winner_link(
            &WinnerMessage {
                recipient_phone: "51234567".to_string(),
                recipient_name: "Maria".to_string(),
                position: 1,
                raffle_title: "Summer raffle".to_string(),
                prize_description: "1° Lugar - Smart TV".to_string(),
                ticket_number: 7,
            },
            &c,
        )
        .unwrap();

        assert!(link.starts_with("https://wa.me/5351234567?text="));
        assert!(link.contains("Maria"));
        assert!(!link.contains(' '));
    }

    #[test]
    fn unusable_phone_degrades_to_none() {
        let c = config();
        let link = winner_link(
            &WinnerMessage {
                recipient_phone: "---".to_string(),
                recipient_name: "X".to_string(),
                position: 1,
                raffle_title: "R".to_string(),
                prize_description: "P".to_string(),
                ticket_number: 1,
            },
            &c,
        );
        assert!(link.is_none());
    }

    #[test]
    fn purchase_alert_lists_numbers_and_total() {
        let c = config();
        let link = purchase_alert_link(
            "51234567",
            &PurchaseAlert {
                raffle_title: "Summer raffle",
                buyer_name: "Maria",
                buyer_phone: "5350000000",
                buyer_email: None,
                ticket_numbers: &[1, 2, 3],
                total_due: 15.0,
                when: chrono::NaiveDate::from_ymd_opt(2026, 1, 2)
                    .unwrap()
                    .and_hms_opt(3, 4, 5)
                    .unwrap(),
            },
            &c,
        )
        .unwrap();

        assert!(link.contains(&urlencoding::encode("1, 2, 3").into_owned()));
        assert!(link.contains(&urlencoding::encode("$15.00").into_owned()));
    }
}
