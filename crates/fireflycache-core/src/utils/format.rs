use chrono::NaiveDate;

/// Format a date the way the API expects it (YYYY-MM-DD)
pub fn format_api_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Format an amount given in minor units as a decimal string
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Join query parameters as `key=value&key=value`.
/// Values are not URL-encoded; callers must not pass reserved characters.
pub fn pack_query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}
