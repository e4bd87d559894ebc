// libs/appointment-cell/src/services/messaging.rs
//! WhatsApp deep links. Nothing is sent from the server; the caller opens the URL.

use chrono::NaiveDate;

const BRAZIL_PREFIX: &str = "55";

pub fn display_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

pub fn wa_link(number: &str, message: &str) -> String {
    format!("https://wa.me/{}?text={}", number, urlencoding::encode(message))
}

/// Sent by the person who just booked on the site, asking the clinic to confirm.
pub fn booking_confirmation_request(clinic_number: &str, name: &str, date: NaiveDate, slot: &str) -> String {
    let message = format!(
        "Olá Dra. Mayne, acabei de realizar o agendamento de uma consulta pelo seu site!\n\n\
         👤 *Paciente:* {}\n📅 *Data:* {}\n⏰ *Horário:* {}\n\n\
         Poderia me confirmar o recebimento desta reserva?",
        name.trim(),
        display_date(date),
        slot
    );
    wa_link(clinic_number, &message)
}

/// Fallback when no slot is free or booking failed.
pub fn slot_inquiry(clinic_number: &str, date: NaiveDate, slot: Option<&str>) -> String {
    let message = match slot {
        Some(slot) => format!(
            "Olá Dra. Mayne, vi no site que o horário das {} no dia {} está livre e gostaria de reservá-lo para uma consulta.",
            slot,
            display_date(date)
        ),
        None => "Olá Dra. Mayne, gostaria de consultar a disponibilidade para um agendamento clínico.".to_string(),
    };
    wa_link(clinic_number, &message)
}

/// From the clinic to a walk-in, confirming a site booking.
pub fn clinic_confirmation(phone: &str, name: &str, date: NaiveDate, time: &str) -> String {
    let message = format!(
        "Olá {}, aqui é da clínica Dra. Mayne Margadona. Recebemos seu agendamento pelo site para o dia {} às {}. Podemos confirmar?",
        name,
        display_date(date),
        time
    );
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    wa_link(&format!("{}{}", BRAZIL_PREFIX, digits), &message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_5() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 5).unwrap()
    }

    #[test]
    fn test_display_date() {
        assert_eq!(display_date(june_5()), "05/06/2024");
    }

    #[test]
    fn test_confirmation_request_is_encoded() {
        let url = booking_confirmation_request("5554999999999", "Ana Souza", june_5(), "14:00");
        assert!(url.starts_with("https://wa.me/5554999999999?text="));
        assert!(!url.contains(' '));
        assert!(!url.contains('\n'));

        let text = url.split_once("?text=").unwrap().1;
        let decoded = urlencoding::decode(text).unwrap();
        assert!(decoded.contains("*Paciente:* Ana Souza"));
        assert!(decoded.contains("05/06/2024"));
        assert!(decoded.contains("14:00"));
    }

    #[test]
    fn test_slot_inquiry_variants() {
        let general = slot_inquiry("5554999999999", june_5(), None);
        let decoded = urlencoding::decode(general.split_once("?text=").unwrap().1).unwrap().into_owned();
        assert!(decoded.contains("consultar a disponibilidade"));

        let specific = slot_inquiry("5554999999999", june_5(), Some("15:00"));
        let decoded = urlencoding::decode(specific.split_once("?text=").unwrap().1).unwrap().into_owned();
        assert!(decoded.contains("15:00 no dia 05/06/2024"));
    }

    #[test]
    fn test_clinic_confirmation_prefixes_country_code() {
        let url = clinic_confirmation("(54) 99999-0000", "Ana", june_5(), "14:00");
        assert!(url.starts_with("https://wa.me/5554999990000?text="));
    }
}
