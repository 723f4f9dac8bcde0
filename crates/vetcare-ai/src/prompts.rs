//! Prompt templates for the clinic flows.

use chrono::NaiveDate;
use std::fmt::Write;
use vetcare_core::Pet;

/// History entries included in a care-plan prompt
const RECENT_HISTORY: usize = 10;

pub const CONCIERGE_SYSTEM: &str = "\
You are the virtual receptionist of a veterinary clinic. Answer questions about \
services, opening hours, appointments and general pet care in a warm, concise tone. \
Never diagnose or prescribe. If the pet may be in danger, if the user is upset, or if \
the user asks for a person, call the notify_human tool with a short reason, an urgency \
(low, normal or high) and any contact detail the user gave, then tell the user a member \
of the team will follow up.";

pub const CARE_PLAN_SYSTEM: &str = "\
You write preventive care plans for a veterinary clinic. Plans are read by the pet's \
tutor and reviewed by a veterinarian. Be practical and specific to the species and age. \
Do not prescribe medication doses. Answer only with JSON matching the schema.";

pub const SUGGEST_SYSTEM: &str = "\
You schedule appointments for a veterinary clinic. Propose start times inside the \
requested window that do not overlap any booked slot. Answer only with JSON matching \
the schema; every time is an RFC 3339 timestamp in UTC.";

pub fn care_plan_prompt(pet: &Pet, concern: &str, today: NaiveDate) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Pet: {}", pet.name);
    let _ = writeln!(prompt, "Species: {:?}", pet.species);
    if let Some(breed) = &pet.breed {
        let _ = writeln!(prompt, "Breed: {breed}");
    }
    match pet.age_years(today) {
        Some(age) => {
            let _ = writeln!(prompt, "Age: {age} years");
        }
        None => prompt.push_str("Age: unknown\n"),
    }
    if let Some(weight) = pet.weight_kg {
        let _ = writeln!(prompt, "Weight: {weight} kg");
    }
    if !pet.allergies.is_empty() {
        let _ = writeln!(prompt, "Allergies: {}", pet.allergies.join(", "));
    }
    if let Some(date) = pet.last_vaccination {
        let _ = writeln!(prompt, "Last vaccination: {date}");
    }
    if let Some(date) = pet.last_checkup {
        let _ = writeln!(prompt, "Last checkup: {date}");
    }

    let history = pet.history_newest_first();
    if !history.is_empty() {
        prompt.push_str("Recent history:\n");
        for entry in history.iter().take(RECENT_HISTORY) {
            let _ = writeln!(
                prompt,
                "- {} {:?}: {}",
                entry.date, entry.kind, entry.description
            );
        }
    }
    let _ = writeln!(prompt, "Today: {today}");
    let _ = write!(prompt, "Concern: {}", concern.trim());
    prompt
}

pub fn suggest_prompt(
    reason: &str,
    window: (String, String),
    duration_minutes: u32,
    count: usize,
    booked: &[(String, String)],
) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "Reason for visit: {}", reason.trim());
    let _ = writeln!(prompt, "Duration: {duration_minutes} minutes");
    let _ = writeln!(prompt, "Window: {} to {}", window.0, window.1);
    if booked.is_empty() {
        prompt.push_str("Booked slots: none\n");
    } else {
        prompt.push_str("Booked slots:\n");
        for (start, end) in booked {
            let _ = writeln!(prompt, "- {start} to {end}");
        }
    }
    let _ = write!(prompt, "Suggest {count} start times.");
    prompt
}
