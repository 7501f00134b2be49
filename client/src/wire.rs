//! JSON shapes returned by the SmartThings Find web endpoints.
//!
//! Only the fields Waypost reads are modelled; everything else is ignored.
//! Coordinates have been observed both as JSON numbers and as numeric
//! strings, so they go through [`lenient_f64`].

use serde::{Deserialize, Deserializer, Serialize};

/// `POST /device/getDeviceList.do`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeviceListResponse {
    #[serde(default)]
    pub device_list: Vec<RawDevice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDevice {
    #[serde(rename = "dvceID", default)]
    pub id: Option<String>,
    #[serde(rename = "modelName", default)]
    pub model_name: Option<String>,
}

/// Request body for `POST /device/setLastSelect.do`.
#[derive(Debug, Serialize)]
pub(crate) struct LocationRequest<'a> {
    #[serde(rename = "dvceId")]
    pub device_id: &'a str,
    pub operation: &'static str,
}

pub(crate) const CHECK_CONNECTION_WITH_LOCATION: &str = "CHECK_CONNECTION_WITH_LOCATION";

#[derive(Debug, Deserialize)]
pub(crate) struct LocationResponse {
    #[serde(default)]
    pub operation: Vec<Operation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Operation {
    #[serde(default)]
    pub oprn_type: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub extra: Option<OperationExtra>,
}

impl Operation {
    /// Entries of these types carry a position fix.
    pub fn is_location(&self) -> bool {
        matches!(self.oprn_type.as_str(), "LOCATION" | "LASTLOC")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OperationExtra {
    #[serde(default)]
    pub gps_utc_dt: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrText> = Option::deserialize(deserializer)?;
    Ok(match value {
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
