//! Parser for the news site's native timestamp strings.
//!
//! Search results carry timestamps like `07 мар 2022, 09:10` or, for the
//! current year, `07 мар, 09:10`. Months are Russian abbreviations; May
//! appears as both `май` and `мая`.

use super::provider::DataError;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

fn month_number(abbrev: &str) -> Option<u32> {
    let month = match abbrev {
        "янв" => 1,
        "фев" => 2,
        "мар" => 3,
        "апр" => 4,
        "май" | "мая" => 5,
        "июн" => 6,
        "июл" => 7,
        "авг" => 8,
        "сен" => 9,
        "окт" => 10,
        "ноя" => 11,
        "дек" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parse `DD MMM YYYY HH:MM` or `DD MMM HH:MM`, using `default_year` when the
/// year is omitted. Commas between the parts are ignored.
pub fn parse_rbc_datetime(s: &str, default_year: i32) -> Result<NaiveDateTime, DataError> {
    let bad = |why: &str| DataError::ResponseFormatChanged(format!("timestamp '{s}': {why}"));

    let cleaned = s.replace(',', " ");
    let parts: Vec<&str> = cleaned.split_whitespace().collect();

    let (day, month_name, year, time) = match parts.as_slice() {
        [day, month, year, time] => {
            let year: i32 = year.parse().map_err(|_| bad("invalid year"))?;
            (*day, *month, year, *time)
        }
        [day, month, time] => (*day, *month, default_year, *time),
        _ => return Err(bad("expected 'DD MMM [YYYY] HH:MM'")),
    };

    let day: u32 = day.parse().map_err(|_| bad("invalid day"))?;
    let month = month_number(&month_name.to_lowercase()).ok_or_else(|| bad("unknown month"))?;
    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| bad("no such date"))?;
    let time = NaiveTime::parse_from_str(time, "%H:%M").map_err(|_| bad("invalid time"))?;

    Ok(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn parses_with_explicit_year() {
        assert_eq!(
            parse_rbc_datetime("07 мар 2022 09:10", 2030).unwrap(),
            dt(2022, 3, 7, 9, 10)
        );
    }

    #[test]
    fn defaults_year_when_missing() {
        assert_eq!(
            parse_rbc_datetime("15 дек 18:45", 2023).unwrap(),
            dt(2023, 12, 15, 18, 45)
        );
    }

    #[test]
    fn accepts_both_may_spellings_and_commas() {
        assert_eq!(
            parse_rbc_datetime("01 май 2021, 10:00", 2030).unwrap(),
            dt(2021, 5, 1, 10, 0)
        );
        assert_eq!(
            parse_rbc_datetime("01 мая, 10:00", 2021).unwrap(),
            dt(2021, 5, 1, 10, 0)
        );
    }

    #[test]
    fn rejects_unknown_month_and_bad_shapes() {
        assert!(parse_rbc_datetime("07 foo 2022 09:10", 2022).is_err());
        assert!(parse_rbc_datetime("07 мар", 2022).is_err());
        assert!(parse_rbc_datetime("31 фев 2022 09:10", 2022).is_err());
        assert!(parse_rbc_datetime("07 мар 2022 9h10", 2022).is_err());
    }
}
