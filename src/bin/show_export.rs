//! Výpis exportovaných value betů nad prahem pravděpodobnosti
//! Spustit: cargo run --bin valuebets-show

use anyhow::{Context, Result};
use dotenv::dotenv;
use valuebet_scraper::{export::load, NormalizedRecord, ScraperConfig};

const HEADERS: [&str; 11] = [
    "SPORTS", "LEAGUES", "PRONOS", "DATE", "HOME", "AWAY", "OUTCOME", "BOOKMAKER", "ODDS",
    "VALUE", "PROBABILITY",
];

fn main() -> Result<()> {
    dotenv().ok();
    let cfg = ScraperConfig::from_env().context("invalid configuration")?;
    let path = &cfg.export_path;

    let records = load(path).with_context(|| format!("read export at {}", path.display()))?;
    let rows: Vec<[String; 11]> = records
        .iter()
        .filter(|r| r.probability.map_or(false, |p| p >= cfg.high_probability))
        .map(row)
        .collect();

    println!("export={} rows={} shown={} (probability >= {})",
        path.display(), records.len(), rows.len(), cfg.high_probability);

    if rows.is_empty() {
        println!("No data to display.");
        return Ok(());
    }

    let mut widths = HEADERS.map(str::len);
    for r in &rows {
        for (w, cell) in widths.iter_mut().zip(r.iter()) {
            *w = (*w).max(cell.chars().count());
        }
    }

    print_line(&HEADERS.map(String::from), &widths);
    for r in &rows {
        print_line(r, &widths);
    }

    Ok(())
}

/// Bez `time` a `countries`, team_1/team_2 jako home/away
fn row(r: &NormalizedRecord) -> [String; 11] {
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
    [
        text(&r.sport),
        text(&r.league),
        text(&r.selection),
        r.date.map(|d| d.to_string()).unwrap_or_default(),
        text(&r.home),
        text(&r.away),
        text(&r.outcome),
        text(&r.bookmaker),
        num(r.odds),
        num(r.value),
        num(r.probability),
    ]
}

fn print_line(cells: &[String; 11], widths: &[usize; 11]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(c, &w)| format!("{c:<w$}"))
        .collect();
    println!("{}", line.join("  ").trim_end());
}
