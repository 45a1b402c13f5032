use chrono::{DateTime, Utc};
use chrono_tz::Tz;

/// Rounds to two decimals and drops trailing zeros: `33.33%`, `50%`, `0%`.
pub fn percent_label(percent: f64) -> String {
    let rounded = (percent * 100.0).round() / 100.0;
    let text = format!("{rounded:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}%")
}

pub fn votes_label(total_votes: i64) -> String {
    format!("{total_votes} votes")
}

/// `Jan 5, 2024 - 3:07 PM` in the given zone.
pub fn format_date_time(at: &DateTime<Utc>, zone: &Tz) -> String {
    at.with_timezone(zone)
        .format("%b %-d, %Y - %-I:%M %p")
        .to_string()
}

/// `Jan 5, 2024` in the given zone.
pub fn format_date(at: &DateTime<Utc>, zone: &Tz) -> String {
    at.with_timezone(zone).format("%b %-d, %Y").to_string()
}

/// Upper-cased first letter of a display name, used for avatars.
pub fn avatar_initial(name: &str) -> Option<String> {
    name.chars().next().map(|c| c.to_uppercase().collect())
}
