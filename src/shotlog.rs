use anyhow::{Context, Result};
use std::path::Path;

use crate::error::Error;
use crate::metadata::TagMap;

/// Sentinel for a field the shot log does not record.
pub const NOT_AVAILABLE: &str = "N/A";

/// One parsed line of the shot log — the exposure data for a single frame.
///
/// Constructed once per data line, immutable thereafter. Missing trailing
/// fields default to [`NOT_AVAILABLE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureRecord {
    pub fnumber: String,
    pub shutter_speed: String,
    pub focal_length: String,
    pub comment: String,
    pub date: String,
    /// Optional `"lat,lon"` pair in decimal degrees; sign encodes hemisphere.
    pub coordinates: String,
}

impl Default for ExposureRecord {
    fn default() -> Self {
        Self {
            fnumber: NOT_AVAILABLE.to_string(),
            shutter_speed: NOT_AVAILABLE.to_string(),
            focal_length: NOT_AVAILABLE.to_string(),
            comment: NOT_AVAILABLE.to_string(),
            date: NOT_AVAILABLE.to_string(),
            coordinates: NOT_AVAILABLE.to_string(),
        }
    }
}

impl ExposureRecord {
    /// Parse a tab-separated log line. Best-effort: missing trailing fields
    /// keep their defaults, extra fields beyond the sixth are ignored.
    pub fn from_line(line: &str) -> Self {
        let mut record = Self::default();
        let mut fields = line.split('\t');

        let slots: [&mut String; 6] = [
            &mut record.fnumber,
            &mut record.shutter_speed,
            &mut record.focal_length,
            &mut record.comment,
            &mut record.date,
            &mut record.coordinates,
        ];
        for slot in slots {
            match fields.next() {
                Some(value) => *slot = value.to_string(),
                None => break,
            }
        }

        record
    }

    /// Decompose the `coordinates` field into the four GPS tags.
    ///
    /// Returns `Ok(None)` when no coordinates were recorded. Hemisphere
    /// references come from the sign of each value: negative latitude is
    /// south, negative longitude is west. The coordinate strings themselves
    /// are copied verbatim into the mapping, so no precision is lost.
    pub fn gps_tags(&self) -> Result<Option<TagMap>, Error> {
        if self.coordinates.is_empty() || self.coordinates == NOT_AVAILABLE {
            return Ok(None);
        }

        let malformed = || Error::CoordinateFormat(self.coordinates.clone());

        let (lat, lon) = self.coordinates.split_once(',').ok_or_else(malformed)?;
        let (lat, lon) = (lat.trim(), lon.trim());
        if lon.contains(',') {
            return Err(malformed());
        }
        lat.parse::<f64>().map_err(|_| malformed())?;
        lon.parse::<f64>().map_err(|_| malformed())?;

        let lat_ref = if lat.starts_with('-') { "S" } else { "N" };
        let lon_ref = if lon.starts_with('-') { "W" } else { "E" };

        let mut tags = TagMap::new();
        tags.insert("GPSLatitude".to_string(), lat.to_string());
        tags.insert("GPSLatitudeRef".to_string(), lat_ref.to_string());
        tags.insert("GPSLongitude".to_string(), lon.to_string());
        tags.insert("GPSLongitudeRef".to_string(), lon_ref.to_string());
        Ok(Some(tags))
    }

    /// Export the record as a tag mapping.
    ///
    /// Pure with respect to the record's fields. Malformed coordinates are a
    /// handled error: the GPS tags are omitted, one error is logged, and the
    /// remaining fields are exported normally — a bad coordinate string never
    /// aborts the batch.
    pub fn export(&self) -> TagMap {
        let mut tags = match self.gps_tags() {
            Ok(Some(gps)) => gps,
            Ok(None) => TagMap::new(),
            Err(e) => {
                log::error!("{e}");
                TagMap::new()
            }
        };

        tags.insert("shutterspeed".to_string(), self.shutter_speed.clone());
        tags.insert("ApertureValue".to_string(), self.fnumber.clone());
        tags.insert("FNumber".to_string(), self.fnumber.clone());
        tags.insert("focallength".to_string(), self.focal_length.clone());
        tags.insert("Description".to_string(), self.comment.clone());
        tags.insert("alldates".to_string(), self.date.clone());
        tags
    }
}

/// A parsed shot log: roll-level template defaults plus the ordered
/// exposure records.
///
/// Record order is semantically the frame number on the roll — the record
/// for frame *n* is `records[n - 1]`.
///
/// # Format
///
/// Plain UTF-8 text. `#KEY value with spaces` lines populate the template,
/// `;`-prefixed lines mark voided frames and are skipped, blank lines are
/// ignored, and everything else is a tab-separated record of up to six
/// fields: fnumber, shutter speed, focal length, comment, date, coordinates.
#[derive(Debug, Clone, Default)]
pub struct ShotLog {
    pub template: TagMap,
    pub records: Vec<ExposureRecord>,
}

impl ShotLog {
    /// Parse shot log text. Permissive by contract: the declared format has
    /// no unparseable lines, so this never fails.
    pub fn parse(text: &str) -> Self {
        let mut template = TagMap::new();
        let mut records = Vec::new();

        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            if let Some(directive) = line.strip_prefix('#') {
                let mut words = directive.split_whitespace();
                if let Some(key) = words.next() {
                    let value = words.collect::<Vec<_>>().join(" ");
                    template.insert(key.to_string(), value);
                }
            } else if line.starts_with(';') {
                // Voided frame — still absent from the sequence, matching
                // how the roll was actually advanced past it.
                continue;
            } else {
                records.push(ExposureRecord::from_line(line));
            }
        }

        Self { template, records }
    }

    /// Load and parse a shot log file.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::MissingLogFile(path.to_path_buf()).into());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read shot log {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    /// The exposure record for a 1-based frame index.
    pub fn record(&self, index: u32) -> Option<&ExposureRecord> {
        let index = usize::try_from(index).ok()?;
        index.checked_sub(1).and_then(|i| self.records.get(i))
    }
}
