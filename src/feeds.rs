use crate::errors::AppError;
use crate::model::{DISPLAY_TIME_FIELD, Record, SORT_MINUTES_FIELD, SourceFormatHint};
use crate::time::TimeNormalizer;
use log::{debug, info, trace, warn};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Parse a feed body: either a bare array of objects or `{ "data": [...] }`.
pub fn parse_records_reader<R: Read>(reader: R) -> Result<Vec<Record>, AppError> {
    let body: Value = serde_json::from_reader(reader)
        .map_err(|e| AppError::Parse(format!("feed json: {}", e)))?;
    records_from_value(body)
}

pub fn parse_records_str(s: &str) -> Result<Vec<Record>, AppError> {
    parse_records_reader(s.as_bytes())
}

fn records_from_value(body: Value) -> Result<Vec<Record>, AppError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(AppError::Parse("feed 'data' is not an array".into())),
            None => return Err(AppError::Parse("feed object has no 'data' array".into())),
        },
        other => {
            return Err(AppError::Parse(format!(
                "feed body is neither array nor object: {}",
                kind(&other)
            )));
        }
    };

    let total = items.len();
    let out: Vec<Record> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match item {
            Value::Object(fields) => Some(Record::new(fields)),
            other => {
                debug!("feed: skipping element #{} ({})", idx, kind(&other));
                None
            }
        })
        .collect();
    trace!("feed: {} of {} elements are records", out.len(), total);
    Ok(out)
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub fn load_feed_file(path: &Path) -> Result<Vec<Record>, AppError> {
    let f = File::open(path).map_err(|e| AppError::IO(format!("open {}: {}", path.display(), e)))?;
    parse_records_reader(BufReader::new(f))
        .map_err(|e| AppError::Parse(format!("{}: {}", path.display(), e)))
}

/// `*.json` files directly inside `dir`, sorted by name.
pub fn collect_feed_dir(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut out = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let e = entry.map_err(|e| AppError::IO(format!("walkdir: {}", e)))?;
        if !e.file_type().is_file() { continue; }
        let is_json = e
            .path()
            .extension()
            .map(|x| x.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            out.push(e.path().to_path_buf());
        }
    }
    out.sort();
    Ok(out)
}

/// GET a feed endpoint and parse its JSON body. No retry.
pub fn fetch_feed(url: &str) -> Result<Vec<Record>, AppError> {
    let resp = reqwest::blocking::get(url)
        .map_err(|e| AppError::Fetch(format!("GET {}: {}", url, e)))?;
    if !resp.status().is_success() {
        return Err(AppError::Fetch(format!("GET {}: status {}", url, resp.status())));
    }
    let body: Value = resp
        .json()
        .map_err(|e| AppError::Fetch(format!("GET {}: body: {}", url, e)))?;
    records_from_value(body)
}

/// Fan-in over every file and URL. A source that fails is logged and
/// contributes no records; the others are still returned.
pub fn load_all(files: &[PathBuf], urls: &[String]) -> Vec<Record> {
    let mut out = Vec::new();
    for path in files {
        match load_feed_file(path) {
            Ok(recs) => {
                debug!("feed {}: {} records", path.display(), recs.len());
                out.extend(recs);
            }
            Err(e) => warn!("feed {} skipped: {}", path.display(), e),
        }
    }
    out.extend(fetch_all(urls, fetch_feed));
    info!("Loaded {} records from {} sources", out.len(), files.len() + urls.len());
    out
}

/// Fetch every URL on its own scoped thread. Results are joined back in URL
/// order; a failed or panicked fetch is logged and contributes nothing.
fn fetch_all<F>(urls: &[String], fetch: F) -> Vec<Record>
where
    F: Fn(&str) -> Result<Vec<Record>, AppError> + Sync,
{
    let fetch = &fetch;
    std::thread::scope(|scope| {
        let handles: Vec<_> = urls
            .iter()
            .map(|url| (url, scope.spawn(move || fetch(url.as_str()))))
            .collect();
        let mut out = Vec::new();
        for (url, handle) in handles {
            match handle.join() {
                Ok(Ok(recs)) => {
                    debug!("feed {}: {} records", url, recs.len());
                    out.extend(recs);
                }
                Ok(Err(e)) => warn!("feed {} skipped: {}", url, e),
                Err(_) => warn!("feed {} skipped: fetch thread panicked", url),
            }
        }
        out
    })
}

/// Copy each record with `displayTime` and `sortMinutes` attached, read from
/// the first non-null alias of the time field.
pub fn enrich_times(
    records: &[Record],
    time_aliases: &[&str],
    hint: Option<SourceFormatHint>,
) -> Vec<Record> {
    let normalizer = TimeNormalizer::new(hint);
    records
        .iter()
        .map(|r| {
            let t = normalizer.normalize_value(r.first_value(time_aliases));
            let mut enriched = r.clone();
            enriched.insert(DISPLAY_TIME_FIELD, Value::from(t.display));
            enriched.insert(SORT_MINUTES_FIELD, Value::from(t.sort_minutes));
            enriched
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn accepts_bare_array_and_data_envelope() {
        let bare = parse_records_str(r#"[{"track":"Ascot"},{"track":"York"}]"#).unwrap();
        assert_eq!(bare.len(), 2);
        let wrapped = parse_records_str(r#"{"data":[{"track":"Ascot"}],"count":1}"#).unwrap();
        assert_eq!(wrapped.len(), 1);
        assert_eq!(wrapped[0].text("track").as_deref(), Some("Ascot"));
    }

    #[test]
    fn skips_non_object_elements() {
        let recs = parse_records_str(r#"[{"a":1}, 3, null, "x", {"b":2}]"#).unwrap();
        assert_eq!(recs.len(), 2);
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(parse_records_str("42"), Err(AppError::Parse(_))));
        assert!(matches!(parse_records_str(r#"{"rows":[]}"#), Err(AppError::Parse(_))));
        assert!(matches!(parse_records_str(r#"{"data":{}}"#), Err(AppError::Parse(_))));
        assert!(matches!(parse_records_str("not json"), Err(AppError::Parse(_))));
    }

    #[test]
    fn enrich_attaches_time_fields_without_touching_input() {
        let recs = parse_records_str(r#"[
            {"Time":"2.38pm","raceId":"a"},
            {"time":"13h30","raceId":"b"},
            {"raceId":"c"}
        ]"#)
        .unwrap();
        let out = enrich_times(&recs, &["Time", "time"], None);
        assert_eq!(out[0].get(DISPLAY_TIME_FIELD), Some(&json!("2:38 pm")));
        assert_eq!(out[0].get(SORT_MINUTES_FIELD), Some(&json!(878)));
        assert_eq!(out[1].get(SORT_MINUTES_FIELD), Some(&json!(1440)));
        assert_eq!(out[2].get(DISPLAY_TIME_FIELD), Some(&json!("-")));
        assert!(recs[0].get(DISPLAY_TIME_FIELD).is_none());

        let continental =
            enrich_times(&recs, &["Time", "time"], Some(SourceFormatHint::Continental));
        assert_eq!(continental[1].get(SORT_MINUTES_FIELD), Some(&json!(810)));
    }

    #[test]
    fn url_fetches_join_in_url_order_and_skip_failures() {
        let urls: Vec<String> = ["slow", "down", "fast", "boom"]
            .iter()
            .map(|u| u.to_string())
            .collect();
        let out = fetch_all(&urls, |url| match url {
            "slow" => {
                std::thread::sleep(std::time::Duration::from_millis(50));
                parse_records_str(r#"[{"raceId":"s1"},{"raceId":"s2"}]"#)
            }
            "fast" => parse_records_str(r#"{"data":[{"raceId":"f1"}]}"#),
            "down" => Err(AppError::Fetch(format!("GET {}: status 503", url))),
            _ => panic!("fetch blew up"),
        });
        let ids: Vec<String> = out.iter().filter_map(|r| r.text("raceId")).collect();
        assert_eq!(ids, vec!["s1", "s2", "f1"]);
        assert!(fetch_all(&[], fetch_feed).is_empty());
    }
}
