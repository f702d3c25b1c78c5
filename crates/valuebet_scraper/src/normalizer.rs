//! Normalizer: čistá funkce RawRecord → typovaný, seřazený Dataset.
//! Chyby parsování polí degradují na None, batch nikdy nepadá kvůli jednomu řádku.

use crate::model::{Dataset, NormalizedRecord, RawRecord};
use chrono::{Datelike, Days, Local, NaiveDate, NaiveTime};
use std::cmp::Ordering;
use tracing::info;

pub fn normalize(records: Vec<RawRecord>) -> Dataset {
    normalize_at(records, Local::now().date_naive())
}

/// `normalize` s explicitním "dnes" pro relativní datumy
pub fn normalize_at(records: Vec<RawRecord>, today: NaiveDate) -> Dataset {
    info!("Cleaning and processing {} extracted records", records.len());

    let normalized: Vec<NormalizedRecord> = records
        .into_iter()
        .map(|r| normalize_record(r, today))
        .collect();

    let dataset = Dataset::from_records(normalized);
    info!("Data cleaning and processing completed ({} rows)", dataset.len());
    dataset
}

fn normalize_record(r: RawRecord, today: NaiveDate) -> NormalizedRecord {
    NormalizedRecord {
        probability: parse_decimal(r.probability.as_deref()),
        date:        r.date.as_deref().and_then(|d| parse_date(d, today)),
        time:        r.time.as_deref().and_then(parse_time),
        odds:        parse_decimal(r.odds.as_deref()),
        value:       parse_decimal(r.value.as_deref()),
        sport:       r.sport,
        country:     r.country,
        league:      r.league,
        selection:   r.selection,
        home:        r.home,
        away:        r.away,
        outcome:     r.outcome,
        bookmaker:   r.bookmaker,
    }
}

/// "52.3%" → 52.3, nesmysl → None
pub fn parse_decimal(raw: Option<&str>) -> Option<f64> {
    raw?
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// "Today" / "Tomorr." → konkrétní den vůči `today`; ostatní tokeny None
pub fn resolve_relative_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let offset = match token.to_lowercase().as_str() {
        "today" => 0,
        "tomorr." | "tomorr" | "tomorrow" => 1,
        _ => return None,
    };
    today.checked_add_days(Days::new(offset))
}

/// Relativní token přímo na datum; jinak ISO, den-měsíc + aktuální rok, nebo datum s rokem
pub fn parse_date(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    let cleaned = token.replace(',', "");
    let cleaned = cleaned.trim();

    if let Some(day) = resolve_relative_date(cleaned, today) {
        return Some(day);
    }

    NaiveDate::parse_from_str(cleaned, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&format!("{cleaned} {}", today.year()), "%d %b %Y"))
        .or_else(|_| NaiveDate::parse_from_str(cleaned, "%d %b %Y"))
        .ok()
}

pub fn parse_time(token: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(token.trim(), "%H:%M").ok()
}

/// Stabilní sort: probability desc (None nejníž), date asc, time asc (None poslední)
pub fn sort_records(records: &mut [NormalizedRecord]) {
    records.sort_by(compare_records);
}

pub fn compare_records(a: &NormalizedRecord, b: &NormalizedRecord) -> Ordering {
    let probability = match (a.probability, b.probability) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };

    probability
        .then_with(|| ascending_none_last(a.date, b.date))
        .then_with(|| ascending_none_last(a.time, b.time))
}

fn ascending_none_last<T: Ord>(a: Option<T>, b: Option<T>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn raw(probability: &str, date: &str, time: &str) -> RawRecord {
        RawRecord {
            sport: Some("Soccer".into()),
            country: Some("France".into()),
            league: Some("Ligue 1".into()),
            selection: Some("1".into()),
            date: Some(date.into()),
            time: Some(time.into()),
            home: Some("PSG".into()),
            away: Some("Lyon".into()),
            outcome: Some("Home".into()),
            bookmaker: Some("Bet365".into()),
            odds: Some("2.10".into()),
            value: Some("8.0%".into()),
            probability: Some(probability.into()),
        }
    }

    fn assert_sorted(dataset: &Dataset) {
        for pair in dataset.records().windows(2) {
            assert_ne!(
                compare_records(&pair[0], &pair[1]),
                Ordering::Greater,
                "out of order: {:?} before {:?}",
                pair[0],
                pair[1]
            );
            if pair[0].probability.is_none() {
                assert!(pair[1].probability.is_none());
            }
        }
    }

    #[test]
    fn psg_lyon_record_is_typed() {
        let dataset = normalize(vec![raw("52.3%", "Today", "20:00")]);
        let r = &dataset.records()[0];

        assert_eq!(r.probability, Some(52.3));
        assert_eq!(r.value, Some(8.0));
        assert_eq!(r.odds, Some(2.10));
        assert_eq!(r.date, Some(Local::now().date_naive()));
        assert_eq!(r.time_hhmm().as_deref(), Some("20:00"));
        assert_eq!(r.bookmaker.as_deref(), Some("Bet365"));
    }

    #[test]
    fn relative_and_absolute_dates() {
        let today = day(2026, 10, 19);
        assert_eq!(parse_date("Today", today), Some(today));
        assert_eq!(parse_date("Tomorr.", today), Some(day(2026, 10, 20)));
        assert_eq!(parse_date("21 Oct,", today), Some(day(2026, 10, 21)));
        assert_eq!(parse_date("02 Nov", today), Some(day(2026, 11, 2)));
        assert_eq!(parse_date("2026-12-01", today), Some(day(2026, 12, 1)));
        assert_eq!(parse_date("Yesterday-ish", today), None);
    }

    #[test]
    fn tomorrow_rolls_over_year_end() {
        let today = day(2026, 12, 31);
        assert_eq!(parse_date("Tomorr.", today), Some(day(2027, 1, 1)));
        assert_eq!(parse_date("Tomorrow,", today), Some(day(2027, 1, 1)));
        assert_eq!(parse_date("Today", today), Some(today));
    }

    #[test]
    fn times_are_zero_padded_or_null() {
        let hhmm = |t: &str| parse_time(t).map(|t| t.format("%H:%M").to_string());
        assert_eq!(hhmm("9:05").as_deref(), Some("09:05"));
        assert_eq!(hhmm(" 20:00 ").as_deref(), Some("20:00"));
        assert_eq!(parse_time("25:00"), None);
        assert_eq!(parse_time("FT"), None);
    }

    #[test]
    fn bad_fields_degrade_to_null() {
        let mut r = raw("n/a", "someday", "soon");
        r.odds = Some("-".into());
        r.value = None;
        let dataset = normalize_at(vec![r], day(2026, 10, 19));
        let n = &dataset.records()[0];

        assert_eq!(n.probability, None);
        assert_eq!(n.date, None);
        assert_eq!(n.time, None);
        assert_eq!(n.odds, None);
        assert_eq!(n.value, None);
        assert_eq!(n.home.as_deref(), Some("PSG"));
    }

    #[test]
    fn nan_and_infinity_are_null() {
        assert_eq!(parse_decimal(Some("NaN")), None);
        assert_eq!(parse_decimal(Some("inf%")), None);
        assert_eq!(parse_decimal(Some(" 61.0 % ")), Some(61.0));
    }

    #[test]
    fn sorted_by_probability_then_date_then_time() {
        let today = day(2026, 10, 19);
        let dataset = normalize_at(
            vec![
                raw("40%", "Today", "18:00"),
                raw("bad", "Today", "10:00"),
                raw("55%", "Tomorr.", "09:00"),
                raw("55%", "Today", "21:00"),
                raw("55%", "Today", "19:30"),
                raw("55%", "nope", "08:00"),
                raw("70%", "Today", "x"),
            ],
            today,
        );

        let keys: Vec<(Option<f64>, Option<String>)> = dataset
            .iter()
            .map(|r| (r.probability, r.time_hhmm()))
            .collect();
        assert_eq!(
            keys,
            vec![
                (Some(70.0), None),
                (Some(55.0), Some("19:30".into())),
                (Some(55.0), Some("21:00".into())),
                (Some(55.0), Some("09:00".into())),
                (Some(55.0), Some("08:00".into())),
                (Some(40.0), Some("18:00".into())),
                (None, Some("10:00".into())),
            ]
        );
        assert_sorted(&dataset);
    }

    #[test]
    fn normalize_is_idempotent() {
        let today = day(2026, 10, 19);
        let once = normalize_at(
            vec![
                raw("52.3%", "Today", "20:00"),
                raw("61.25%", "24 Oct", "7:15"),
                raw("?", "Tomorr.", "12:00"),
                raw("52.3%", "Today", "18:45"),
            ],
            today,
        );
        let again = normalize_at(once.iter().map(RawRecord::from).collect(), today);

        assert_eq!(once, again);
        assert_sorted(&again);
    }

    #[test]
    fn empty_input_is_empty_dataset() {
        assert!(normalize(Vec::new()).is_empty());
    }
}
