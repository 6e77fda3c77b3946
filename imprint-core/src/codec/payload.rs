//! Identity payload record and its delimited text form.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{ImprintError, Result};

/// Leading token of every serialized payload.
pub const MAGIC: &str = "IMGCRYPT";

/// Trailing token of every serialized payload.
pub const TERMINATOR: &str = "END";

/// Sentinel written in the GPS field when no location is available.
pub const NO_GPS: &str = "NOGPS";

const SEPARATOR: char = '|';

/// Capture location handed over by the geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GpsPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.latitude, self.longitude)
    }
}

impl FromStr for GpsPoint {
    type Err = ImprintError;

    fn from_str(s: &str) -> Result<Self> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| ImprintError::InvalidPayload(format!("GPS '{s}' is not 'lat,lon'")))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .ok_or_else(|| ImprintError::InvalidPayload(format!("GPS component '{v}'")))
        };
        Ok(Self::new(parse(lat)?, parse(lon)?))
    }
}

/// Identity record embedded into pixel data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    /// Opaque identifier supplied by the identity provider.
    pub subject_id: String,
    pub gps: Option<GpsPoint>,
    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
}

impl Payload {
    /// Create a payload, validating that the subject id survives the text encoding.
    pub fn new(subject_id: impl Into<String>, gps: Option<GpsPoint>, timestamp_ms: u64) -> Result<Self> {
        let subject_id = subject_id.into();
        validate_subject(&subject_id)?;
        if let Some(point) = gps {
            if !point.latitude.is_finite() || !point.longitude.is_finite() {
                return Err(ImprintError::InvalidPayload("GPS must be finite".into()));
            }
        }
        Ok(Self {
            subject_id,
            gps,
            timestamp_ms,
        })
    }

    /// Create a payload stamped with the current time.
    pub fn now(subject_id: impl Into<String>, gps: Option<GpsPoint>) -> Result<Self> {
        let timestamp_ms = Utc::now().timestamp_millis().max(0) as u64;
        Self::new(subject_id, gps, timestamp_ms)
    }

    /// GPS field as it appears on the wire (`lat,lon` or `NOGPS`).
    pub fn gps_field(&self) -> String {
        match self.gps {
            Some(point) => point.to_string(),
            None => NO_GPS.to_string(),
        }
    }

    /// Delimited text form: `IMGCRYPT|subject|gps|timestamp|END`.
    pub fn serialize(&self) -> String {
        format!(
            "{MAGIC}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{TERMINATOR}",
            self.subject_id,
            self.gps_field(),
            self.timestamp_ms
        )
    }

    /// Serialized form expanded to one bit per element, MSB first.
    pub fn to_bits(&self) -> Vec<u8> {
        self.serialize()
            .bytes()
            .flat_map(|byte| (0..8).rev().map(move |i| (byte >> i) & 1))
            .collect()
    }

    /// Parse the delimited text form. Extra text after the terminator is ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let body = text
            .strip_prefix(MAGIC)
            .and_then(|rest| rest.strip_prefix(SEPARATOR))
            .ok_or_else(|| ImprintError::InvalidPayload("missing magic prefix".into()))?;

        let mut fields = body.splitn(4, SEPARATOR);
        let subject = fields.next().unwrap_or_default();
        let gps = fields
            .next()
            .ok_or_else(|| ImprintError::InvalidPayload("missing GPS field".into()))?;
        let timestamp = fields
            .next()
            .ok_or_else(|| ImprintError::InvalidPayload("missing timestamp field".into()))?;
        let tail = fields.next().unwrap_or_default();
        if !tail.starts_with(TERMINATOR) {
            return Err(ImprintError::InvalidPayload("missing terminator".into()));
        }

        let gps = match gps {
            NO_GPS => None,
            other => Some(other.parse::<GpsPoint>()?),
        };
        let timestamp_ms = timestamp
            .parse::<u64>()
            .map_err(|_| ImprintError::InvalidPayload(format!("timestamp '{timestamp}'")))?;

        Self::new(subject, gps, timestamp_ms)
    }
}

fn validate_subject(subject: &str) -> Result<()> {
    if subject.is_empty() {
        return Err(ImprintError::InvalidPayload("subject id is empty".into()));
    }
    if let Some(c) = subject
        .chars()
        .find(|c| !is_printable(*c) || *c == SEPARATOR)
    {
        return Err(ImprintError::InvalidPayload(format!(
            "subject id contains unsupported character {c:?}"
        )));
    }
    Ok(())
}

/// Characters recoverable by extraction (ASCII 32-126).
pub(crate) fn is_printable(c: char) -> bool {
    (' '..='~').contains(&c)
}
