use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

/// Jeden value bet tak, jak vypadl z markupu. Pozice polí odpovídají
/// aktuálnímu layoutu stránky.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub sport:       Option<String>,
    pub country:     Option<String>,
    pub league:      Option<String>,
    pub selection:   Option<String>,
    pub date:        Option<String>,   // "Today" | "Tomorr." | "21 Oct" ...
    pub time:        Option<String>,
    pub home:        Option<String>,
    pub away:        Option<String>,
    pub outcome:     Option<String>,
    pub bookmaker:   Option<String>,
    pub odds:        Option<String>,
    pub value:       Option<String>,   // "8.0%"
    pub probability: Option<String>,   // "52.3%"
}

/// Typovaný řádek datasetu. Pořadí polí = pořadí sloupců v CSV exportu.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    #[serde(rename = "sports")]
    pub sport:       Option<String>,
    #[serde(rename = "countries")]
    pub country:     Option<String>,
    #[serde(rename = "leagues")]
    pub league:      Option<String>,
    #[serde(rename = "pronos")]
    pub selection:   Option<String>,
    pub date:        Option<NaiveDate>,
    #[serde(with = "hhmm")]
    pub time:        Option<NaiveTime>,
    #[serde(rename = "team_1")]
    pub home:        Option<String>,
    #[serde(rename = "team_2")]
    pub away:        Option<String>,
    pub outcome:     Option<String>,
    pub bookmaker:   Option<String>,
    pub odds:        Option<f64>,
    pub value:       Option<f64>,
    pub probability: Option<f64>,
}

pub const EXPORT_COLUMNS: [&str; 13] = [
    "sports", "countries", "leagues", "pronos", "date", "time", "team_1",
    "team_2", "outcome", "bookmaker", "odds", "value", "probability",
];

impl NormalizedRecord {
    /// `HH:MM` nebo None
    pub fn time_hhmm(&self) -> Option<String> {
        self.time.map(|t| t.format("%H:%M").to_string())
    }
}

/// Zpětný převod pro re-normalizaci; ISO datum normalizer přijímá.
impl From<&NormalizedRecord> for RawRecord {
    fn from(r: &NormalizedRecord) -> Self {
        Self {
            sport:       r.sport.clone(),
            country:     r.country.clone(),
            league:      r.league.clone(),
            selection:   r.selection.clone(),
            date:        r.date.map(|d| d.format("%Y-%m-%d").to_string()),
            time:        r.time_hhmm(),
            home:        r.home.clone(),
            away:        r.away.clone(),
            outcome:     r.outcome.clone(),
            bookmaker:   r.bookmaker.clone(),
            odds:        r.odds.map(|v| v.to_string()),
            value:       r.value.map(|v| v.to_string()),
            probability: r.probability.map(|v| v.to_string()),
        }
    }
}

/// Seřazený dataset (probability desc, date asc, time asc).
/// Prázdný dataset je validní výsledek, ne chyba.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<NormalizedRecord>,
}

impl Dataset {
    /// Seřadí záznamy stabilně podle kontraktu datasetu
    pub fn from_records(mut records: Vec<NormalizedRecord>) -> Self {
        crate::normalizer::sort_records(&mut records);
        Self { records }
    }

    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NormalizedRecord> {
        self.records.iter()
    }

    /// Počet záznamů s probability striktně nad prahem
    pub fn count_above(&self, threshold: f64) -> usize {
        self.records
            .iter()
            .filter(|r| r.probability.map_or(false, |p| p > threshold))
            .count()
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a NormalizedRecord;
    type IntoIter = std::slice::Iter<'a, NormalizedRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &Option<NaiveTime>, s: S) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => s.serialize_str(&t.format("%H:%M").to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => NaiveTime::parse_from_str(s, "%H:%M").map(Some).map_err(D::Error::custom),
        }
    }
}
