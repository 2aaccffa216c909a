//! Decoder for the JSON rendering of the pprof profile model.
//!
//! Accepts both the plural field names used by most JSON exporters and the
//! singular protobuf field names. Integer fields may be JSON numbers or
//! strings, since the protobuf JSON mapping writes 64-bit integers as strings.
//!
//! Name and file fields are indices into `stringTable`. Functions whose
//! name index is out of range are dropped, so frames referring to them are
//! skipped by the resolver instead of being filled with placeholders.

use super::schema::{
    FrameOrder, FunctionInfo, Line, Location, PeriodUnit, Profile, Sample, SourceFormat,
};
use crate::utils::error::ParseError;
use log::{debug, warn};
use serde::{Deserialize, Deserializer};

/// Integer that may arrive as a number or a decimal string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LenientInt {
    Signed(i64),
    Unsigned(u64),
    Text(String),
}

impl LenientInt {
    fn into_i64<E: serde::de::Error>(self) -> Result<i64, E> {
        match self {
            LenientInt::Signed(v) => Ok(v),
            LenientInt::Unsigned(v) => i64::try_from(v).map_err(E::custom),
            LenientInt::Text(s) => s.trim().parse::<i64>().map_err(E::custom),
        }
    }
}

fn lenient_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = LenientInt::deserialize(deserializer)?.into_i64::<D::Error>()?;
    Ok(value.max(0) as u64)
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u64>, D::Error> {
    match Option::<LenientInt>::deserialize(deserializer)? {
        Some(v) => Ok(Some(v.into_i64::<D::Error>()?.max(0) as u64)),
        None => Ok(None),
    }
}

fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    LenientInt::deserialize(deserializer)?.into_i64::<D::Error>()
}

fn lenient_vec_u64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
    Vec::<LenientInt>::deserialize(deserializer)?
        .into_iter()
        .map(|v| v.into_i64::<D::Error>().map(|n| n.max(0) as u64))
        .collect()
}

fn lenient_vec_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    Vec::<LenientInt>::deserialize(deserializer)?
        .into_iter()
        .map(|v| v.into_i64::<D::Error>())
        .collect()
}

#[derive(Debug, Deserialize)]
struct PprofJson {
    #[serde(default, alias = "sample")]
    samples: Vec<PprofSample>,
    #[serde(default, alias = "location")]
    locations: Vec<PprofLocation>,
    #[serde(default, alias = "function")]
    functions: Vec<PprofFunction>,
    #[serde(default, rename = "stringTable")]
    string_table: Vec<String>,
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    period: Option<u64>,
    #[serde(default, rename = "periodType")]
    period_type: Option<PprofValueType>,
    #[serde(default, rename = "durationNanos", deserialize_with = "lenient_opt_u64")]
    duration_nanos: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PprofValueType {
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    unit: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct PprofSample {
    #[serde(default, rename = "locationId", deserialize_with = "lenient_vec_u64")]
    location_id: Vec<u64>,
    #[serde(default, deserialize_with = "lenient_vec_i64")]
    value: Vec<i64>,
}

#[derive(Debug, Deserialize)]
struct PprofLocation {
    #[serde(deserialize_with = "lenient_u64")]
    id: u64,
    #[serde(default)]
    line: Vec<PprofLine>,
}

#[derive(Debug, Deserialize)]
struct PprofLine {
    #[serde(default, rename = "functionId", deserialize_with = "lenient_u64")]
    function_id: u64,
    #[serde(default, deserialize_with = "lenient_i64")]
    line: i64,
}

#[derive(Debug, Deserialize)]
struct PprofFunction {
    #[serde(deserialize_with = "lenient_u64")]
    id: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    name: u64,
    #[serde(default, rename = "filename", deserialize_with = "lenient_opt_u64")]
    file_name: Option<u64>,
}

/// Parse a pprof JSON export into a `Profile`
///
/// **Public** - main entry point for pprof input
///
/// # Errors
/// * `ParseError::JsonError` - Invalid JSON structure
///
/// An empty sample list is not an error: it yields an empty profile.
pub fn parse_pprof(data: &[u8]) -> Result<Profile, ParseError> {
    let pprof: PprofJson = serde_json::from_slice(data)?;

    let mut profile = Profile::new(SourceFormat::Pprof, FrameOrder::LeafFirst);
    let strings = &pprof.string_table;

    let mut dropped_functions = 0usize;
    for func in &pprof.functions {
        let Some(name) = strings.get(func.name as usize).filter(|n| !n.is_empty()) else {
            dropped_functions += 1;
            continue;
        };
        let file = func
            .file_name
            .and_then(|idx| strings.get(idx as usize))
            .filter(|f| !f.is_empty())
            .cloned();

        profile.functions.insert(
            func.id,
            FunctionInfo {
                id: func.id,
                name: name.clone(),
                file,
            },
        );
    }

    if dropped_functions > 0 {
        warn!(
            "{} functions have no resolvable name and will be skipped",
            dropped_functions
        );
    }

    for loc in &pprof.locations {
        profile.locations.insert(
            loc.id,
            Location {
                id: loc.id,
                lines: loc
                    .line
                    .iter()
                    .map(|l| Line {
                        function_id: l.function_id,
                        line: l.line,
                    })
                    .collect(),
            },
        );
    }

    profile.samples = pprof
        .samples
        .into_iter()
        .map(|s| Sample {
            location_ids: s.location_id,
            values: s.value,
        })
        .collect();

    profile.period = pprof.period.unwrap_or(0);
    profile.period_unit = pprof
        .period_type
        .and_then(|pt| pt.unit)
        .and_then(|idx| strings.get(idx as usize))
        .map(|label| PeriodUnit::from_label(label))
        .unwrap_or_default();
    profile.duration_nanos = pprof.duration_nanos;

    debug!(
        "Decoded pprof profile: {} samples, {} functions, {} locations, period {} {}",
        profile.samples.len(),
        profile.functions.len(),
        profile.locations.len(),
        profile.period,
        profile.period_unit.label()
    );

    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_pprof() {
        let json = r#"{
            "samples": [
                {"locationId": [3, 2, 1], "value": [10, 100000000]},
                {"locationId": [3, 2], "value": [20, 200000000]}
            ],
            "locations": [
                {"id": 1, "line": [{"functionId": 1, "line": 10}]},
                {"id": 2, "line": [{"functionId": 2, "line": 20}]},
                {"id": 3, "line": [{"functionId": 3, "line": 30}]}
            ],
            "functions": [
                {"id": 1, "name": 1, "filename": 4},
                {"id": 2, "name": 2},
                {"id": 3, "name": 3}
            ],
            "stringTable": ["", "main", "work", "compute", "main.go", "nanoseconds"],
            "period": 10000000,
            "periodType": {"type": 0, "unit": 5}
        }"#;

        let profile = parse_pprof(json.as_bytes()).unwrap();
        assert_eq!(profile.format, SourceFormat::Pprof);
        assert_eq!(profile.frame_order, FrameOrder::LeafFirst);
        assert_eq!(profile.samples.len(), 2);
        assert_eq!(profile.function(1).unwrap().name, "main");
        assert_eq!(profile.function(1).unwrap().file.as_deref(), Some("main.go"));
        assert_eq!(profile.period_nanos(), 10_000_000);
        assert_eq!(profile.samples[0].weight(), Some(10));
    }

    #[test]
    fn test_string_encoded_integers() {
        let json = r#"{
            "sample": [{"locationId": ["1"], "value": ["5"]}],
            "location": [{"id": "1", "line": [{"functionId": "1", "line": "3"}]}],
            "function": [{"id": "1", "name": "1"}],
            "stringTable": ["", "f"],
            "period": "1000",
            "durationNanos": "5000"
        }"#;

        let profile = parse_pprof(json.as_bytes()).unwrap();
        assert_eq!(profile.samples[0].location_ids, vec![1]);
        assert_eq!(profile.samples[0].weight(), Some(5));
        assert_eq!(profile.location(1).unwrap().first_line().unwrap().line, 3);
        assert_eq!(profile.period, 1000);
        assert_eq!(profile.duration_nanos, Some(5000));
    }

    #[test]
    fn test_non_nanosecond_unit() {
        let json = r#"{
            "samples": [],
            "stringTable": ["", "microseconds"],
            "period": 10,
            "periodType": {"unit": 1}
        }"#;

        let profile = parse_pprof(json.as_bytes()).unwrap();
        assert_eq!(profile.period_nanos(), 10_000);
    }

    #[test]
    fn test_unresolvable_function_name_dropped() {
        let json = r#"{
            "functions": [{"id": 1, "name": 99}],
            "stringTable": [""]
        }"#;

        let profile = parse_pprof(json.as_bytes()).unwrap();
        assert!(profile.function(1).is_none());
    }

    #[test]
    fn test_empty_profile_is_not_an_error() {
        let profile = parse_pprof(br#"{}"#).unwrap();
        assert_eq!(profile.sample_count(), 0);
    }

    #[test]
    fn test_invalid_json_errors() {
        assert!(parse_pprof(b"not json").is_err());
    }
}
