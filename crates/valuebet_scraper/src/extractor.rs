//! Extractor: value-bets markup → `RawRecord`.
//!
//! Struktura stránky (aktuální layout):
//! <div class="tabs"> <div class="visible"> ... </div> </div>
//!   header:    <a>sport</a> <a>country</a> <a>league</a>
//!   match:     <div class="flex min-h-[90px] w-full"> 9× <p> </div>
//!   bookmaker: <div class="h-[25px] w-[75px]"> <img alt="Bet365"> </div>
//!
//! Mapování polí je poziční. Když upstream prohodí pořadí <p> bez změny
//! tříd, data se tiše posunou; `shape_mismatches` to aspoň zaloguje.

use crate::error::ExtractionError;
use crate::model::RawRecord;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

const CONTAINER_SELECTOR: &str = "div.tabs div.visible";
const MATCH_BLOCK_CLASSES: [&str; 3] = ["flex", "min-h-[90px]", "w-full"];
const BOOKMAKER_BLOCK_CLASSES: [&str; 2] = ["h-[25px]", "w-[75px]"];
const MATCH_FRAGMENTS: usize = 9;

struct Selectors {
    container: Selector,
    anchor:    Selector,
    div:       Selector,
    paragraph: Selector,
    image:     Selector,
}

impl Selectors {
    fn new() -> Self {
        // Statické selektory, parse nemůže selhat
        Self {
            container: Selector::parse(CONTAINER_SELECTOR).unwrap(),
            anchor:    Selector::parse("a").unwrap(),
            div:       Selector::parse("div").unwrap(),
            paragraph: Selector::parse("p").unwrap(),
            image:     Selector::parse("img").unwrap(),
        }
    }
}

pub fn extract(markup: &str) -> Result<Vec<RawRecord>, ExtractionError> {
    info!("Parsing HTML content ({} bytes)", markup.len());
    let document = Html::parse_document(markup);
    let sel = Selectors::new();
    let shape = ShapeCheck::new();

    let containers: Vec<ElementRef> = document.select(&sel.container).collect();
    if containers.is_empty() {
        warn!("No opportunity containers found in HTML");
        return Err(ExtractionError::NoContainers);
    }

    let mut records = Vec::with_capacity(containers.len());
    let mut suspicious = 0usize;

    for (idx, container) in containers.iter().enumerate() {
        let Some(record) = extract_container(*container, &sel) else {
            debug!("Container #{} structurally incomplete, skipped", idx);
            continue;
        };

        let mismatches = shape.mismatches(&record);
        if !mismatches.is_empty() {
            suspicious += 1;
            warn!(
                container = idx,
                fields = ?mismatches,
                "Extracted fields don't look like expected tokens, layout may have shifted"
            );
        }
        records.push(record);
    }

    info!(
        "Extraction done: {} records from {} containers ({} suspicious)",
        records.len(),
        containers.len(),
        suspicious
    );
    Ok(records)
}

fn extract_container(container: ElementRef, sel: &Selectors) -> Option<RawRecord> {
    let header = extract_header(container, sel);
    if header.iter().all(Option::is_none) {
        return None;
    }
    let fragments = extract_match_fragments(container, sel)?;
    let bookmaker = extract_bookmaker(container, sel)?;

    let [sport, country, league] = header;
    let mut f = fragments.into_iter();
    let mut next = || f.next().and_then(non_empty);

    Some(RawRecord {
        sport,
        country,
        league,
        selection:   next(),
        date:        next(),
        time:        next(),
        home:        next(),
        away:        next(),
        outcome:     next(),
        odds:        next(),
        value:       next(),
        probability: next(),
        bookmaker,
    })
}

/// sport, country, league z <a> elementů, pozičně
fn extract_header(container: ElementRef, sel: &Selectors) -> [Option<String>; 3] {
    // Select není fused: po vyčerpání by další next() začal znovu od začátku
    let links: Vec<String> = container.select(&sel.anchor).take(3).map(element_text).collect();
    let at = |i: usize| links.get(i).cloned().and_then(non_empty);
    let league = links
        .get(2)
        .map(|l| l.split_whitespace().collect::<Vec<_>>().join(" "))
        .and_then(non_empty);
    [at(0), at(1), league]
}

/// První match blok s aspoň 9 fragmenty; kratší bloky se přeskakují, nepadují
fn extract_match_fragments(container: ElementRef, sel: &Selectors) -> Option<Vec<String>> {
    container
        .select(&sel.div)
        .filter(|d| has_classes(*d, &MATCH_BLOCK_CLASSES))
        .find_map(|block| {
            let fragments: Vec<String> = block.select(&sel.paragraph).map(element_text).collect();
            if fragments.len() >= MATCH_FRAGMENTS {
                Some(fragments)
            } else {
                debug!("Match block with {} fragments skipped", fragments.len());
                None
            }
        })
}

/// Some(None) = blok existuje, ale img nemá alt
fn extract_bookmaker(container: ElementRef, sel: &Selectors) -> Option<Option<String>> {
    let block = container
        .select(&sel.div)
        .find(|d| has_classes(*d, &BOOKMAKER_BLOCK_CLASSES))?;

    Some(
        block
            .select(&sel.image)
            .next()
            .and_then(|img| img.value().attr("alt"))
            .map(|alt| alt.trim().to_string())
            .and_then(non_empty),
    )
}

fn has_classes(el: ElementRef, required: &[&str]) -> bool {
    let classes: Vec<&str> = el.value().classes().collect();
    required.iter().all(|c| classes.contains(c))
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

// ── Shape check ──────────────────────────────────────────────────────────────

/// Lehká kontrola, že poziční pole vypadají jako očekávané tokeny
pub struct ShapeCheck {
    date:    Regex,
    time:    Regex,
    decimal: Regex,
    percent: Regex,
}

impl Default for ShapeCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl ShapeCheck {
    pub fn new() -> Self {
        Self {
            date: Regex::new(
                r"(?i)^(today|tomorr\.?|tomorrow|\d{1,2} [a-z]{3,4}\.?,?( \d{4})?|\d{4}-\d{2}-\d{2})$",
            )
            .unwrap(),
            time:    Regex::new(r"^\d{1,2}:\d{2}$").unwrap(),
            decimal: Regex::new(r"^\d+(\.\d+)?$").unwrap(),
            percent: Regex::new(r"^[+-]?\d+(\.\d+)?\s*%?$").unwrap(),
        }
    }

    /// Názvy polí, jejichž hodnota neodpovídá očekávanému tvaru
    pub fn mismatches(&self, r: &RawRecord) -> Vec<&'static str> {
        let checks: [(&'static str, &Option<String>, &Regex); 5] = [
            ("date", &r.date, &self.date),
            ("time", &r.time, &self.time),
            ("odds", &r.odds, &self.decimal),
            ("value", &r.value, &self.percent),
            ("probability", &r.probability, &self.percent),
        ];

        checks
            .into_iter()
            .filter(|(_, v, re)| v.as_deref().map_or(false, |v| !re.is_match(v)))
            .map(|(name, _, _)| name)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Jeden opportunity container ve tvaru aktuálního layoutu
    pub fn container(header: &[&str], fragments: &[&str], alt: Option<&str>) -> String {
        let links: String = header.iter().map(|h| format!("<a href=\"#\">{h}</a>")).collect();
        let ps: String = fragments.iter().map(|f| format!("<p>{f}</p>")).collect();
        let img = match alt {
            Some(a) => format!("<img src=\"b.png\" alt=\"{a}\">"),
            None => "<img src=\"b.png\">".to_string(),
        };
        format!(
            "<div class=\"visible\">\
               <div class=\"header\">{links}</div>\
               <div class=\"flex min-h-[90px] w-full\">{ps}</div>\
               <div class=\"h-[25px] w-[75px]\">{img}</div>\
             </div>"
        )
    }

    pub fn page(containers: &[String]) -> String {
        format!(
            "<html><body><div class=\"tabs\">{}</div></body></html>",
            containers.concat()
        )
    }

    pub const PSG_LYON: [&str; 9] = ["1", "Today", "20:00", "PSG", "Lyon", "Home", "2.10", "8.0%", "52.3%"];
}
