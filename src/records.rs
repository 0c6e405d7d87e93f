//! CSV loading of raw delivery records.
//!
//! Header names are matched case-insensitively and a few common aliases are
//! accepted. Columns the planner does not use are ignored.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// One row of the delivery input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    #[serde(alias = "tracking_num", alias = "customer_id", alias = "stop_id")]
    pub id: String,
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng", alias = "lon")]
    pub longitude: f64,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, alias = "customer_address")]
    pub address: Option<String>,
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default, alias = "number_of_parcels")]
    pub parcels: Option<u32>,
}

impl DeliveryRecord {
    /// Label shown for the stop: the explicit label, else the address.
    pub fn display_label(&self) -> Option<&str> {
        self.label
            .as_deref()
            .or(self.address.as_deref())
            .filter(|label| !label.is_empty())
    }
}

pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<DeliveryRecord>> {
    let file = File::open(path.as_ref())?;
    let records = read_records(BufReader::new(file))?;
    debug!(path = %path.as_ref().display(), count = records.len(), "loaded delivery records");
    Ok(records)
}

pub fn read_records<R: Read>(reader: R) -> Result<Vec<DeliveryRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.to_lowercase())
        .collect::<StringRecord>();
    reader.set_headers(headers);

    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record?);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlannerError;

    #[test]
    fn test_reads_aliases_case_insensitively() {
        let data = "Tracking_Num,Latitude,Longitude,Customer_Address,Zone,Extra\n\
                    TRK-1, 7.0731 ,125.6128,San Pedro St,Z1,ignored\n\
                    TRK-2,7.0905,125.6110,,Z2,ignored\n";
        let records = read_records(data.as_bytes()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "TRK-1");
        assert_eq!(records[0].latitude, 7.0731);
        assert_eq!(records[0].address.as_deref(), Some("San Pedro St"));
        assert_eq!(records[0].zone.as_deref(), Some("Z1"));
        assert_eq!(records[1].address, None);
        assert_eq!(records[1].display_label(), None);
    }

    #[test]
    fn test_missing_coordinate_column_is_an_error() {
        let data = "id,latitude\nA,7.0\n";
        let err = read_records(data.as_bytes()).unwrap_err();
        assert!(matches!(err, PlannerError::Csv(_)));
    }

    #[test]
    fn test_unparsable_coordinate_is_an_error() {
        let data = "id,lat,lng\nA,seven,125.6\n";
        let err = read_records(data.as_bytes()).unwrap_err();
        assert!(matches!(err, PlannerError::Csv(_)));
    }

    #[test]
    fn test_parcels_column() {
        let data = "customer_id,lat,lon,number_of_parcels\nC1,7.1,125.6,3\n";
        let records = read_records(data.as_bytes()).unwrap();
        assert_eq!(records[0].parcels, Some(3));
    }
}
