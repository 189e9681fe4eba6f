pub const MINUTES_PER_DAY: u32 = 24 * 60;

pub fn parse_time(value: &str) -> Option<u32> {
    let mut split = value.trim().split(':');
    let hour = split.next()?.parse::<u8>().ok()?;
    let minute = split.next()?.parse::<u8>().ok()?;
    if split.next().is_some() || hour > 23 || minute > 59 {
        return None;
    }
    Some(u32::from(hour) * 60 + u32::from(minute))
}

/// Renders minutes since midnight as `HH:MM`.
///
/// Hours are not wrapped: a block ending 15 minutes after midnight renders as
/// `24:15`. Use [`split_day_offset`] when a calendar date is needed.
pub fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

pub fn split_day_offset(minutes: u32) -> (u32, u32) {
    (minutes / MINUTES_PER_DAY, minutes % MINUTES_PER_DAY)
}

pub fn validate_hhmm(value: &str, field_name: &str) -> Result<(), String> {
    parse_time(value)
        .map(|_| ())
        .ok_or_else(|| format!("{field_name} must be HH:MM"))
}
