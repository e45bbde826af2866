//! Date helper functions (pt-BR)

use chrono::{DateTime, Datelike, TimeZone};
use chrono_tz::Tz;

/// Abbreviated month names as the pt-BR locale writes them
const MONTHS_PT_BR: [&str; 12] = [
    "jan", "fev", "mar", "abr", "mai", "jun", "jul", "ago", "set", "out", "nov", "dez",
];

/// Format as `dd MMM yyyy`
///
/// # Examples
/// ```ignore
/// format_date(&date, tz) // -> "25 mar 2021"
/// ```
pub fn format_date<Z: TimeZone>(date: &DateTime<Z>, tz: Tz) -> String {
    let local = date.with_timezone(&tz);
    format!(
        "{:02} {} {}",
        local.day(),
        MONTHS_PT_BR[local.month0() as usize],
        local.year()
    )
}

/// Format as `dd MMM yyyy, 'às' HH:mm`
///
/// # Examples
/// ```ignore
/// format_datetime(&date, tz) // -> "25 mar 2021, às 16:25"
/// ```
pub fn format_datetime<Z: TimeZone>(date: &DateTime<Z>, tz: Tz) -> String {
    let local = date.with_timezone(&tz);
    format!(
        "{}, às {}",
        format_date(&local, tz),
        local.format("%H:%M")
    )
}

/// Machine-readable value for a `<time datetime>` attribute
pub fn date_xml<Z: TimeZone>(date: &DateTime<Z>, tz: Tz) -> String {
    date.with_timezone(&tz)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}
