use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use duckdb::{params, Connection};
use jiff::civil::Date;
use jiff::ToSpan;
use log::{error, info};
use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;

/// See https://boxofficecollection.in/
pub struct MoviesCollectionArchive {
    pub base_url: String,
    pub duckdb_path: String,
}

pub const TABLE_NAME: &str = "movies_collection";

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("bad release date '{0}', expected YYYY-MM-DD")]
    Config(String),
    #[error("GET {url} failed: {reason}")]
    Fetch { url: String, reason: String },
    #[error("no table found in page")]
    NoTable,
    #[error("{0}")]
    Parse(String),
    #[error("duckdb: {0}")]
    Storage(#[from] duckdb::Error),
}

/// The two shapes a day label can take, e.g. "Day 4" or "Day 8-10".
/// "Day 8-Day 10" is accepted as a range too.  Anything with more `Day`
/// tokens fails the row.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum DayLabel {
    SingleDay(i32),
    DayRange(i32, i32),
}

impl FromStr for DayLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let single = Regex::new(r"^Day\s+(\d+)$").unwrap();
        let range = Regex::new(r"^Day\s+(\d+)\s*-\s*(?:Day\s+)?(\d+)$").unwrap();
        let s = s.trim();
        if let Some(caps) = single.captures(s) {
            let n = caps[1]
                .parse::<i32>()
                .map_err(|_| format!("day number out of range in '{s}'"))?;
            return Ok(DayLabel::SingleDay(n));
        }
        if let Some(caps) = range.captures(s) {
            let start = caps[1]
                .parse::<i32>()
                .map_err(|_| format!("day number out of range in '{s}'"))?;
            let end = caps[2]
                .parse::<i32>()
                .map_err(|_| format!("day number out of range in '{s}'"))?;
            return Ok(DayLabel::DayRange(start, end));
        }
        Err(format!("failed to parse '{s}' as a day label"))
    }
}

/// One data row of the scraped table, still as raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableRow {
    pub day_label: String,
    pub collection_text: String,
}

/// One `<tr>` of the scraped table.  Rows without the two expected cells
/// are kept as explicit values so the parser can fail with context instead
/// of silently skipping them.
#[derive(Debug, Clone)]
pub enum TableRow {
    Data(RawTableRow),
    Malformed(String),
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct CollectionRecord {
    pub movie_name: String,
    pub days_from_release: String,
    pub box_office_collection: i64,
    pub date: String,
}

/// Extract the first numeric substring and scale from crores to rupees.
/// The site quotes every figure in crores, so "₹12.34 cr" -> 1_234_000_000.
pub fn crores_to_rupees(text: &str) -> Result<i64, String> {
    let re = Regex::new(r"(\d*\.?\d+)").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| format!("no numeric amount in '{text}'"))?;
    let crores = caps[1]
        .parse::<f64>()
        .map_err(|_| format!("failed to parse '{}' as a number", &caps[1]))?;
    Ok((crores * 100_000_000.0) as i64)
}

/// Rows of the first table in the page, header row excluded.
pub fn extract_first_table(html: &str) -> Result<Vec<TableRow>, CollectError> {
    let document = Html::parse_document(html);
    let table_sel = Selector::parse("table").unwrap();
    let tr_sel = Selector::parse("tr").unwrap();
    let td_sel = Selector::parse("td").unwrap();

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(CollectError::NoTable)?;

    let mut rows: Vec<TableRow> = Vec::new();
    for tr in table.select(&tr_sel) {
        let cells: Vec<String> = tr
            .select(&td_sel)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .collect();
        match cells.as_slice() {
            // header rows carry <th> cells only
            [] => continue,
            [day_label, collection_text, ..] => rows.push(TableRow::Data(RawTableRow {
                day_label: day_label.clone(),
                collection_text: collection_text.clone(),
            })),
            [cell] => rows.push(TableRow::Malformed(cell.clone())),
        }
    }
    Ok(rows)
}

fn date_from_release(release_date: Date, days: i32) -> Result<Date, CollectError> {
    release_date
        .checked_add((days as i64).days())
        .map_err(|e| CollectError::Parse(format!("day offset {days} out of range: {e}")))
}

/// Turn the scraped rows into normalized records.  The last row is the
/// grand total and is always dropped.
pub fn parse_collection(
    rows: &[TableRow],
    movie_name: &str,
    release_date: Date,
) -> Result<Vec<CollectionRecord>, CollectError> {
    let Some((_total, day_rows)) = rows.split_last() else {
        return Err(CollectError::Parse("empty table".to_string()));
    };
    if day_rows.is_empty() {
        return Err(CollectError::Parse(
            "no day rows before the total row".to_string(),
        ));
    }

    let mut records: Vec<CollectionRecord> = Vec::with_capacity(day_rows.len());
    for row in day_rows {
        let raw = match row {
            TableRow::Data(raw) => raw,
            TableRow::Malformed(text) => {
                return Err(CollectError::Parse(format!("malformed table row '{text}'")));
            }
        };
        let rupees = crores_to_rupees(&raw.collection_text).map_err(CollectError::Parse)?;
        let label = raw
            .day_label
            .parse::<DayLabel>()
            .map_err(CollectError::Parse)?;
        let date = match label {
            DayLabel::SingleDay(n) => date_from_release(release_date, n)?.to_string(),
            DayLabel::DayRange(start, end) => format!(
                "{} - {}",
                date_from_release(release_date, start)?,
                date_from_release(release_date, end)?
            ),
        };
        records.push(CollectionRecord {
            movie_name: movie_name.to_string(),
            days_from_release: raw.day_label.clone(),
            box_office_collection: rupees,
            date,
        });
    }
    Ok(records)
}

/// Insert the records.  With `replace`, the table is recreated; otherwise
/// rows are appended as-is (reruns duplicate rows, there is no dedup).
pub fn write_records(
    conn: &Connection,
    records: &[CollectionRecord],
    table_name: &str,
    replace: bool,
) -> Result<usize, duckdb::Error> {
    if replace {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table_name};"))?;
    }
    conn.execute_batch(&format!(
        r"
CREATE TABLE IF NOT EXISTS {table_name} (
    movie_name VARCHAR NOT NULL,
    days_from_release VARCHAR NOT NULL,
    box_office_collection BIGINT NOT NULL,
    date VARCHAR NOT NULL,
);"
    ))?;
    let mut stmt = conn.prepare(&format!(
        "INSERT INTO {table_name} (movie_name, days_from_release, box_office_collection, date)
         VALUES (?, ?, ?, ?);"
    ))?;
    for record in records {
        stmt.execute(params![
            record.movie_name,
            record.days_from_release,
            record.box_office_collection,
            record.date,
        ])?;
    }
    Ok(records.len())
}

impl MoviesCollectionArchive {
    /// Page with the day-wise collection table for one movie.
    pub fn url(&self, movie_name: &str) -> String {
        format!(
            "{}{}-box-office-collection-day-wise",
            self.base_url,
            movie_name.to_lowercase().replace(' ', "-")
        )
    }

    pub fn download_page(&self, movie_name: &str) -> Result<String, CollectError> {
        let url = self.url(movie_name);
        info!("Box office collection run for - {}", url);
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CollectError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let resp = client.get(&url).send().map_err(|e| CollectError::Fetch {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        if !resp.status().is_success() {
            return Err(CollectError::Fetch {
                url,
                reason: format!("status {}", resp.status()),
            });
        }
        resp.text().map_err(|e| CollectError::Fetch {
            url,
            reason: e.to_string(),
        })
    }

    pub fn update_duckdb(
        &self,
        records: &[CollectionRecord],
        replace: bool,
    ) -> Result<usize, CollectError> {
        let conn = Connection::open(&self.duckdb_path)?;
        let count = write_records(&conn, records, TABLE_NAME, replace)?;
        let _ = conn.close();
        Ok(count)
    }

    /// Fetch, parse and append one movie.  Returns the number of rows pushed.
    pub fn process_movie(
        &self,
        movie_name: &str,
        release_date: Date,
    ) -> Result<usize, CollectError> {
        let html = self.download_page(movie_name)?;
        let rows = extract_first_table(&html)?;
        info!("Transforming rows - crores in numbers, dates from release");
        let records = parse_collection(&rows, movie_name, release_date)?;
        self.update_duckdb(&records, false)
    }

    /// Run the batch over the config mapping.  One movie's failure is
    /// logged and never aborts the others.
    pub fn collect(&self, config: &BTreeMap<String, String>) {
        for (movie_name, release) in config {
            info!("Movie - {}, release date - {}", movie_name, release);
            let release_date = match Date::strptime("%Y-%m-%d", release) {
                Ok(date) => date,
                Err(e) => {
                    let err = CollectError::Config(format!("{release} ({e})"));
                    error!("{}: {}", movie_name, err);
                    continue;
                }
            };
            match self.process_movie(movie_name, release_date) {
                Ok(count) => info!("{}: pushed {} rows to {}", movie_name, count, TABLE_NAME),
                Err(e) => error!("{}: {}", movie_name, e),
            }
        }
    }
}
