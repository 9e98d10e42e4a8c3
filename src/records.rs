use std::fs::File;
use std::io;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, StringRecord, Writer};

use crate::geo::GeoPoint;
use crate::site::{Attributes, Candidate, ExistingFacility};

/// One CSV row, kept verbatim so it can be written back out unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct SiteRecord {
    headers: Arc<StringRecord>,
    values: StringRecord,
}

impl SiteRecord {
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx)
    }

    pub fn values(&self) -> &StringRecord {
        &self.values
    }

    /// The row's fields joined with commas, for console output.
    pub fn joined(&self) -> String {
        self.values.iter().collect::<Vec<&str>>().join(",")
    }
}

impl Attributes for SiteRecord {
    fn numeric(&self, name: &str) -> Option<f64> {
        self.get(name)?.trim().parse().ok()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ColumnNames {
    pub latitude: String,
    pub longitude: String,
    pub revenue: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            latitude: String::from("latitude"),
            longitude: String::from("longitude"),
            revenue: String::from("predicted_annual_sales"),
        }
    }
}

pub struct CandidateTable {
    pub headers: StringRecord,
    pub candidates: Vec<Candidate<SiteRecord>>,
}

fn column_index(headers: &StringRecord, name: &str) -> Result<usize> {
    match headers.iter().position(|h| h == name) {
        Some(idx) => Ok(idx),
        None => bail!("missing column '{}' (found: {:?})", name, headers),
    }
}

// Empty cells read as NaN; anything else must parse.
fn parse_number(record: &StringRecord, idx: usize, column: &str) -> Result<f64> {
    let line = record.position().map(|p| p.line()).unwrap_or(0);
    let raw = record.get(idx).unwrap_or("").trim();
    if raw.is_empty() {
        return Ok(f64::NAN);
    }
    raw.parse::<f64>()
        .with_context(|| format!("line {}: column '{}' is not a number: {:?}", line, column, raw))
}

pub fn read_candidates<R: io::Read>(reader: R, columns: &ColumnNames) -> Result<CandidateTable> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let lat_idx = column_index(&headers, &columns.latitude)?;
    let lon_idx = column_index(&headers, &columns.longitude)?;
    let revenue_idx = column_index(&headers, &columns.revenue)?;
    let shared = Arc::new(headers.clone());

    let mut candidates = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let location = GeoPoint::new(
            parse_number(&record, lat_idx, &columns.latitude)?,
            parse_number(&record, lon_idx, &columns.longitude)?,
        );
        let revenue = parse_number(&record, revenue_idx, &columns.revenue)?;
        candidates.push(Candidate::new(
            location,
            revenue,
            SiteRecord {
                headers: Arc::clone(&shared),
                values: record,
            },
        ));
    }
    Ok(CandidateTable {
        headers,
        candidates,
    })
}

pub fn read_existing<R: io::Read>(
    reader: R,
    columns: &ColumnNames,
) -> Result<Vec<ExistingFacility<SiteRecord>>> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = rdr.headers()?.clone();
    let lat_idx = column_index(&headers, &columns.latitude)?;
    let lon_idx = column_index(&headers, &columns.longitude)?;
    let shared = Arc::new(headers);

    let mut existing = Vec::new();
    for result in rdr.records() {
        let record = result?;
        let location = GeoPoint::new(
            parse_number(&record, lat_idx, &columns.latitude)?,
            parse_number(&record, lon_idx, &columns.longitude)?,
        );
        existing.push(ExistingFacility::new(
            location,
            SiteRecord {
                headers: Arc::clone(&shared),
                values: record,
            },
        ));
    }
    Ok(existing)
}

pub fn load_candidates(path: &str, columns: &ColumnNames) -> Result<CandidateTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path))?;
    read_candidates(file, columns).with_context(|| format!("reading candidates from {}", path))
}

pub fn load_existing(path: &str, columns: &ColumnNames) -> Result<Vec<ExistingFacility<SiteRecord>>> {
    let file = File::open(path).with_context(|| format!("opening {}", path))?;
    read_existing(file, columns).with_context(|| format!("reading existing stores from {}", path))
}

/// Writes the header row and then each selected row exactly as it was read.
pub fn write_selection<W: io::Write>(
    wtr: &mut Writer<W>,
    headers: &StringRecord,
    selected: &[Candidate<SiteRecord>],
) -> Result<()> {
    wtr.write_record(headers)?;
    for candidate in selected {
        wtr.write_record(candidate.payload.values())?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANDIDATES: &str = "\
store_number,city,latitude,longitude,predicted_annual_sales,total_population
S-1,Lowell,42.6334,-71.3162,1500000,25000
S-2,Quincy,42.2529,-71.0023,2100000,31000
S-3,Nowhere,,-71.5,900000,
";

    #[test]
    fn reads_candidates_and_keeps_every_column() {
        let table = read_candidates(CANDIDATES.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(table.candidates.len(), 3);
        assert_eq!(table.headers.len(), 6);

        let quincy = &table.candidates[1];
        assert_eq!(quincy.location, GeoPoint::new(42.2529, -71.0023));
        assert_eq!(quincy.predicted_revenue, 2_100_000.0);
        assert_eq!(quincy.payload.get("city"), Some("Quincy"));
        assert_eq!(quincy.payload.numeric("total_population"), Some(31000.0));

        assert_eq!(quincy.payload.joined(), "S-2,Quincy,42.2529,-71.0023,2100000,31000");

        let nowhere = &table.candidates[2];
        assert!(nowhere.location.latitude.is_nan());
        assert_eq!(nowhere.payload.numeric("total_population"), None);
    }

    #[test]
    fn custom_column_names() {
        let data = "lat,lng,rev\n1.5,2.5,10\n";
        let columns = ColumnNames {
            latitude: "lat".to_string(),
            longitude: "lng".to_string(),
            revenue: "rev".to_string(),
        };
        let table = read_candidates(data.as_bytes(), &columns).unwrap();
        assert_eq!(table.candidates[0].location, GeoPoint::new(1.5, 2.5));
        assert_eq!(table.candidates[0].predicted_revenue, 10.0);
    }

    #[test]
    fn missing_column_is_an_error() {
        let data = "latitude,longitude\n1,2\n";
        let err = read_candidates(data.as_bytes(), &ColumnNames::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("predicted_annual_sales"));
    }

    #[test]
    fn garbage_number_is_an_error() {
        let data = "latitude,longitude,predicted_annual_sales\n1,east,5\n";
        let err = read_candidates(data.as_bytes(), &ColumnNames::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("longitude"));
    }

    #[test]
    fn reads_existing_stores() {
        let data = "store_number,latitude,longitude\nE-1,42.36,-71.06\nE-2,42.27,-71.80\n";
        let existing = read_existing(data.as_bytes(), &ColumnNames::default()).unwrap();
        assert_eq!(existing.len(), 2);
        assert_eq!(existing[1].location, GeoPoint::new(42.27, -71.80));
        assert_eq!(existing[1].identity.get("store_number"), Some("E-2"));
    }

    #[test]
    fn writes_selected_rows_verbatim() {
        let table = read_candidates(CANDIDATES.as_bytes(), &ColumnNames::default()).unwrap();
        let selected = vec![table.candidates[1].clone(), table.candidates[0].clone()];
        let mut wtr = Writer::from_writer(Vec::new());
        write_selection(&mut wtr, &table.headers, &selected).unwrap();
        let out = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(
            out,
            "store_number,city,latitude,longitude,predicted_annual_sales,total_population\n\
             S-2,Quincy,42.2529,-71.0023,2100000,31000\n\
             S-1,Lowell,42.6334,-71.3162,1500000,25000\n"
        );
    }
}
