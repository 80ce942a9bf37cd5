/// Date keys: en-US "MM/DD/YY" strings used to partition daily counts
use chrono::{Local, NaiveDate};

const KEY_FORMAT: &str = "%m/%d/%y";

/// Key for the local calendar day
pub fn today() -> String {
    key_for(Local::now().date_naive())
}

pub fn today_date() -> NaiveDate {
    Local::now().date_naive()
}

pub fn key_for(date: NaiveDate) -> String {
    date.format(KEY_FORMAT).to_string()
}

/// Parse a stored key back into a date; anything else (queue, positions, ...) is `None`
pub fn parse(key: &str) -> Option<NaiveDate> {
    if key.len() != 8 {
        return None;
    }
    NaiveDate::parse_from_str(key, KEY_FORMAT).ok()
}

/// Whole days between the key's date and `today`, or `None` if the key is not a date
pub fn age_in_days(key: &str, today: NaiveDate) -> Option<i64> {
    parse(key).map(|date| (today - date).num_days())
}
