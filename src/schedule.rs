//! Class time slots and their conversion to UTC.

use chrono::{NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{SiteError, SiteResult};

const FIRST_SLOT_HOUR: u32 = 6;
const LAST_SLOT_HOUR: u32 = 22;
const SLOT_MINUTES: u32 = 30;

static SLOT_START_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d{1,2}):(\d{2})(AM|PM)$").expect("valid slot time regex")
});

/// `9:30AM` style, 12-hour clock. Minutes past 59 roll into the next hour.
pub fn format_time(hour: u32, minute: u32) -> String {
    let hour = hour + minute / 60;
    let minute = minute % 60;
    let display_hour = match hour % 24 {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    };
    let period = if hour % 24 >= 12 { "PM" } else { "AM" };
    format!("{display_hour}:{minute:02}{period}")
}

/// Half-hour slots from 6:00AM through the one starting at 10:30PM.
pub fn time_slots() -> Vec<String> {
    (FIRST_SLOT_HOUR..=LAST_SLOT_HOUR)
        .flat_map(|hour| (0..60).step_by(SLOT_MINUTES as usize).map(move |min| (hour, min)))
        .map(|(hour, min)| {
            format!(
                "{}-{}",
                format_time(hour, min),
                format_time(hour, min + SLOT_MINUTES)
            )
        })
        .collect()
}

/// IANA zone used for a registrant's location. US states override the
/// country-wide zone; anything unknown is UTC.
pub fn timezone_for(country: &str, state: Option<&str>) -> &'static str {
    let in_us = matches!(country, "United States" | "United States of America");
    if in_us {
        if let Some(zone) = state.and_then(us_state_zone) {
            return zone;
        }
    }
    country_zone(country).unwrap_or("UTC")
}

fn country_zone(country: &str) -> Option<&'static str> {
    let zone = match country {
        "United States" | "United States of America" => "America/New_York",
        "Canada" => "America/Toronto",
        "Ethiopia" => "Africa/Addis_Ababa",
        "Eritrea" => "Africa/Asmara",
        "Kenya" => "Africa/Nairobi",
        "South Africa" => "Africa/Johannesburg",
        "United Kingdom" => "Europe/London",
        "Germany" => "Europe/Berlin",
        "Sweden" => "Europe/Stockholm",
        "Norway" => "Europe/Oslo",
        "Netherlands" => "Europe/Amsterdam",
        "Italy" => "Europe/Rome",
        "Israel" => "Asia/Jerusalem",
        "Saudi Arabia" => "Asia/Riyadh",
        "United Arab Emirates" => "Asia/Dubai",
        "Australia" => "Australia/Sydney",
        _ => return None,
    };
    Some(zone)
}

fn us_state_zone(state: &str) -> Option<&'static str> {
    let zone = match state {
        "California" | "Washington" | "Oregon" | "Nevada" => "America/Los_Angeles",
        "Arizona" => "America/Phoenix",
        "Colorado" | "Utah" | "New Mexico" | "Montana" | "Wyoming" | "Idaho" => "America/Denver",
        "Texas" | "Illinois" | "Minnesota" | "Missouri" | "Tennessee" | "Wisconsin"
        | "Iowa" | "Oklahoma" | "Louisiana" | "Alabama" | "Kansas" | "Nebraska" => {
            "America/Chicago"
        }
        "New York" | "New Jersey" | "Virginia" | "Maryland" | "Georgia" | "Florida"
        | "Massachusetts" | "Pennsylvania" | "Ohio" | "North Carolina" | "District of Columbia"
        | "Michigan" => "America/New_York",
        "Alaska" => "America/Anchorage",
        "Hawaii" => "Pacific/Honolulu",
        _ => return None,
    };
    Some(zone)
}

/// Convert a slot start (`9:30AM`) on `YYYY-MM-DD` in `timezone` to
/// `YYYY-MM-DD HH:MM:SS UTC`.
pub fn to_utc(slot_start: &str, date: &str, timezone: &str) -> SiteResult<String> {
    let caps = SLOT_START_RE
        .captures(slot_start.trim())
        .ok_or_else(|| SiteError::Schedule(format!("Invalid time format: {slot_start}")))?;

    let mut hour: u32 = caps[1]
        .parse()
        .map_err(|_| SiteError::Schedule(format!("Invalid time format: {slot_start}")))?;
    let minute: u32 = caps[2]
        .parse()
        .map_err(|_| SiteError::Schedule(format!("Invalid time format: {slot_start}")))?;
    let pm = caps[3].eq_ignore_ascii_case("PM");
    if pm && hour != 12 {
        hour += 12;
    }
    if !pm && hour == 12 {
        hour = 0;
    }

    let tz: Tz = timezone
        .parse()
        .map_err(|_| SiteError::Schedule(format!("Unknown timezone: {timezone}")))?;
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|err| SiteError::Schedule(format!("Invalid date {date}: {err}")))?;
    let time = NaiveTime::from_hms_opt(hour, minute, 0)
        .ok_or_else(|| SiteError::Schedule(format!("Invalid time: {slot_start}")))?;

    // Times skipped by a DST jump have no local instant.
    let local = tz
        .from_local_datetime(&day.and_time(time))
        .earliest()
        .ok_or_else(|| {
            SiteError::Schedule(format!("{slot_start} does not exist on {date} in {timezone}"))
        })?;

    Ok(local
        .with_timezone(&chrono::Utc)
        .format("%Y-%m-%d %H:%M:%S UTC")
        .to_string())
}

/// UTC start of a selected slot (`9:00AM-9:30AM`) for a registrant's location.
pub fn slot_start_utc(slot: &str, country: &str, state: Option<&str>, date: &str) -> SiteResult<String> {
    let start = slot.split('-').next().unwrap_or(slot);
    to_utc(start, date, timezone_for(country, state))
}
