//! Reshaping of the raw dispatch items into the published record schema.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One element of the real-time dispatch response.
///
/// Every field is optional here so that a missing or `null` field surfaces
/// as [`TransformError::MissingField`] instead of a generic JSON error.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPriceItem {
    #[serde(rename = "PointOfConnectionCode")]
    pub point_of_connection_code: Option<String>,

    /// Only checked for presence, it never makes it into the record.
    #[serde(rename = "FiveMinuteIntervalNumber")]
    pub interval_number: Option<serde_json::Value>,

    /// Only checked for presence, it never makes it into the record.
    #[serde(rename = "RunDateTime")]
    pub run_datetime: Option<serde_json::Value>,

    #[serde(rename = "FiveMinuteIntervalDatetime")]
    pub interval_datetime: Option<String>,

    #[serde(rename = "DollarsPerMegawattHour")]
    pub dollars_per_megawatt_hour: Option<f64>,

    #[serde(rename = "SPDLoadMegawatt")]
    pub load_megawatt: Option<f64>,

    #[serde(rename = "SPDGenerationMegawatt")]
    pub generation_megawatt: Option<f64>,
}

/// Published price record of a single grid exit point.
///
/// Field order is part of the payload format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub datetime: String,
    pub price_mwh: f64,
    pub load_mw: f64,
    pub generation_mw: f64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("`{0}` is missing from the price item")]
    MissingField(&'static str),
}

impl RawPriceItem {
    /// Split the item into its connection point code and the canonical record.
    pub fn transform(self) -> Result<(String, CanonicalRecord), TransformError> {
        let code = require(self.point_of_connection_code, "PointOfConnectionCode")?;
        require(self.interval_number, "FiveMinuteIntervalNumber")?;
        require(self.run_datetime, "RunDateTime")?;
        let record = CanonicalRecord {
            datetime: require(self.interval_datetime, "FiveMinuteIntervalDatetime")?,
            price_mwh: require(self.dollars_per_megawatt_hour, "DollarsPerMegawattHour")?,
            load_mw: require(self.load_megawatt, "SPDLoadMegawatt")?,
            generation_mw: require(self.generation_megawatt, "SPDGenerationMegawatt")?,
        };
        Ok((code, record))
    }
}

fn require<T>(value: Option<T>, field: &'static str) -> Result<T, TransformError> {
    value.ok_or(TransformError::MissingField(field))
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::prelude::*;

    // language=json
    const ITEM: &str = r#"{
        "PointOfConnectionCode": "HAY2201",
        "FiveMinuteIntervalNumber": 5,
        "RunDateTime": "2024-01-01T00:04:12",
        "FiveMinuteIntervalDatetime": "2024-01-01T00:05:00",
        "DollarsPerMegawattHour": 50.1,
        "SPDLoadMegawatt": 120.0,
        "SPDGenerationMegawatt": 118.5
    }"#;

    const REQUIRED_FIELDS: [&str; 7] = [
        "PointOfConnectionCode",
        "FiveMinuteIntervalNumber",
        "RunDateTime",
        "FiveMinuteIntervalDatetime",
        "DollarsPerMegawattHour",
        "SPDLoadMegawatt",
        "SPDGenerationMegawatt",
    ];

    #[test]
    fn transform_ok() -> Result {
        let (code, record) = serde_json::from_str::<RawPriceItem>(ITEM)?.transform()?;
        assert_eq!(code, "HAY2201");
        assert_eq!(record.datetime, "2024-01-01T00:05:00");
        assert_abs_diff_eq!(record.price_mwh, 50.1);
        assert_abs_diff_eq!(record.load_mw, 120.0);
        assert_abs_diff_eq!(record.generation_mw, 118.5);
        Ok(())
    }

    #[test]
    fn record_has_only_renamed_fields() -> Result {
        let (_, record) = serde_json::from_str::<RawPriceItem>(ITEM)?.transform()?;
        let serde_json::Value::Object(fields) = serde_json::to_value(&record)? else {
            bail!("the record must serialize into an object");
        };
        let keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        for key in ["datetime", "price_mwh", "load_mw", "generation_mw"] {
            assert!(keys.contains(&key), "`{key}` is missing");
        }
        for field in REQUIRED_FIELDS {
            assert!(!keys.contains(&field), "`{field}` leaked into the record");
        }
        Ok(())
    }

    #[test]
    fn field_order_is_stable() -> Result {
        let (_, record) = serde_json::from_str::<RawPriceItem>(ITEM)?.transform()?;
        assert_eq!(
            serde_json::to_string(&record)?,
            r#"{"datetime":"2024-01-01T00:05:00","price_mwh":50.1,"load_mw":120.0,"generation_mw":118.5}"#,
        );
        Ok(())
    }

    #[test]
    fn missing_field_err() -> Result {
        for field in REQUIRED_FIELDS {
            let mut item: serde_json::Map<String, serde_json::Value> = serde_json::from_str(ITEM)?;
            item.remove(field);
            let item: RawPriceItem = serde_json::from_value(item.into())?;
            assert_eq!(item.transform(), Err(TransformError::MissingField(field)));
        }
        Ok(())
    }

    #[test]
    fn null_field_err() -> Result {
        let mut item: serde_json::Map<String, serde_json::Value> = serde_json::from_str(ITEM)?;
        item.insert("SPDLoadMegawatt".to_owned(), serde_json::Value::Null);
        let item: RawPriceItem = serde_json::from_value(item.into())?;
        assert_eq!(item.transform(), Err(TransformError::MissingField("SPDLoadMegawatt")));
        Ok(())
    }

    #[test]
    fn extra_fields_are_ignored() -> Result {
        let mut item: serde_json::Map<String, serde_json::Value> = serde_json::from_str(ITEM)?;
        item.insert("SPDLossMegawatt".to_owned(), 1.5.into());
        let item: RawPriceItem = serde_json::from_value(item.into())?;
        assert!(item.transform().is_ok());
        Ok(())
    }
}
