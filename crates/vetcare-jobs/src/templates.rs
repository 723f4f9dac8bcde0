//! Email templates sent by the background jobs.

use crate::mail::Email;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vetcare_core::{Invoice, Pet, Tutor};

/// Clinic details printed in every email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClinicInfo {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub booking_url: Option<String>,
}

impl Default for ClinicInfo {
    fn default() -> Self {
        Self {
            name: "VetCare+".to_string(),
            phone: "+1 555 0100".to_string(),
            booking_url: None,
        }
    }
}

pub fn vaccination_reminder(clinic: &ClinicInfo, tutor: &Tutor, pet: &Pet, due: NaiveDate) -> Email {
    let subject = format!("{} is due for a vaccination", pet.name);
    let body = format!(
        "{}'s next vaccination is due on {}. Book a visit so protection doesn't lapse.",
        pet.name,
        due.format("%B %-d, %Y")
    );
    compose(clinic, tutor, subject, body)
}

pub fn checkup_reminder(
    clinic: &ClinicInfo,
    tutor: &Tutor,
    pet: &Pet,
    last: Option<NaiveDate>,
) -> Email {
    let subject = format!("Time for {}'s yearly checkup", pet.name);
    let body = match last {
        Some(date) => format!(
            "{}'s last checkup was on {}. A yearly exam helps catch problems early.",
            pet.name,
            date.format("%B %-d, %Y")
        ),
        None => format!(
            "We have no checkup on record for {}. A yearly exam helps catch problems early.",
            pet.name
        ),
    };
    compose(clinic, tutor, subject, body)
}

pub fn payment_followup(clinic: &ClinicInfo, tutor: &Tutor, invoice: &Invoice) -> Email {
    let subject = format!("Thank you for visiting {}", clinic.name);
    let body = format!(
        "We received your payment of {}. How is everyone doing after the visit? \
         Reply to this email if anything worries you.",
        money(invoice.total_cents())
    );
    compose(clinic, tutor, subject, body)
}

fn compose(clinic: &ClinicInfo, tutor: &Tutor, subject: String, body: String) -> Email {
    let booking = clinic
        .booking_url
        .as_ref()
        .map(|url| format!("\nBook online: {url}"))
        .unwrap_or_default();
    let text = format!(
        "Hi {},\n\n{}\n\n{} - {}{}\n",
        tutor.name, body, clinic.name, clinic.phone, booking
    );

    let booking_html = clinic
        .booking_url
        .as_ref()
        .map(|url| format!(r#"<p><a href="{0}">Book online</a></p>"#, escape(url)))
        .unwrap_or_default();
    let html = format!(
        "<p>Hi {},</p><p>{}</p><p>{} &middot; {}</p>{}",
        escape(&tutor.name),
        escape(&body),
        escape(&clinic.name),
        escape(&clinic.phone),
        booking_html
    );

    Email {
        to: tutor.email.clone(),
        subject,
        html,
        text,
    }
}

fn money(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.unsigned_abs();
    format!("{sign}${}.{:02}", cents / 100, cents % 100)
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
