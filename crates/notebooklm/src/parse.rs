//! Positional parsers for batchexecute response payloads.
//!
//! The server returns schema-free nested arrays whose layout varies across
//! versions. Every positional access for an entity lives here, in one
//! function per entity. Optional fields are best-effort; only IDs needed
//! for subsequent requests are checked strictly. List parsers skip
//! malformed entries instead of failing the whole response.

use crate::error::{Error, Result};
use crate::types::{
    Artifact, ArtifactType, GenerationStatus, Notebook, Source, SourceStatus, SourceType,
};
use serde_json::Value;

/// Maximum nesting observed in the wild; bounds the recursive walks.
const MAX_SEARCH_DEPTH: usize = 10;

/// UUID shape: 36 chars, hyphens at 8/13/18/23, hex digits elsewhere.
pub fn is_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    s.bytes().enumerate().all(|(i, b)| match i {
        8 | 13 | 18 | 23 => b == b'-',
        _ => b.is_ascii_hexdigit(),
    })
}

/// Depth-bounded search for the first UUID-shaped string in a value.
pub fn find_uuid(value: &Value) -> Option<&str> {
    find_uuid_at(value, 0)
}

fn find_uuid_at(value: &Value, depth: usize) -> Option<&str> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::String(s) if is_uuid(s) => Some(s),
        Value::Array(items) => items.iter().find_map(|v| find_uuid_at(v, depth + 1)),
        Value::Object(map) => map.values().find_map(|v| find_uuid_at(v, depth + 1)),
        _ => None,
    }
}

fn as_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn is_youtube_url(url: &str) -> bool {
    url.contains("youtube.com") || url.contains("youtu.be")
}

pub fn parse_notebook_list(result: &Value) -> Vec<Notebook> {
    result
        .get(0)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(|e| parse_notebook(e).ok()).collect())
        .unwrap_or_default()
}

/// Parse a single notebook entry.
///
/// ID and title both sit in the first handful of positions but their order
/// varies; the UUID-shaped string is the ID, the first other string is the
/// title.
pub fn parse_notebook(entry: &Value) -> Result<Notebook> {
    let items = entry
        .as_array()
        .ok_or_else(|| Error::Parse("notebook entry is not an array".into()))?;

    let mut id = None;
    let mut title = None;
    for value in items.iter().take(5) {
        if let Some(s) = value.as_str() {
            if s.is_empty() {
                continue;
            }
            if is_uuid(s) {
                id.get_or_insert(s);
            } else {
                title.get_or_insert(s);
            }
        }
    }

    let id = id.ok_or_else(|| Error::Parse("notebook entry has no ID".into()))?;
    let source_count = items.get(1).and_then(Value::as_array).map(Vec::len);

    Ok(Notebook {
        id: id.to_string(),
        title: title.unwrap_or_default().to_string(),
        source_count,
    })
}

/// Parse the source entries nested at `result[0][1]`.
pub fn parse_source_list(result: &Value, notebook_id: &str) -> Vec<Source> {
    let Some(entries) = result
        .get(0)
        .and_then(|v| v.get(1))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| parse_source_entry(entry, notebook_id))
        .collect()
}

fn parse_source_entry(entry: &Value, notebook_id: &str) -> Option<Source> {
    let id = find_uuid(entry)?.to_string();
    let title = as_str(entry.get(1)).unwrap_or_default().to_string();
    let url = as_str(entry.get(2).and_then(|v| v.get(7)).and_then(|v| v.get(0)))
        .filter(|s| is_http_url(s))
        .map(str::to_string);
    let status = entry
        .get(3)
        .and_then(|v| v.get(1))
        .and_then(Value::as_i64)
        .and_then(SourceStatus::from_code)
        .unwrap_or(SourceStatus::Processing);

    Some(Source {
        id,
        notebook_id: notebook_id.to_string(),
        source_type: infer_source_type(url.as_deref(), &title),
        title,
        url,
        status,
    })
}

fn infer_source_type(url: Option<&str>, title: &str) -> SourceType {
    if let Some(url) = url {
        if is_youtube_url(url) {
            return SourceType::Youtube;
        }
    }
    let name = url.unwrap_or(title).to_lowercase();
    if [".pdf", ".txt", ".csv"].iter().any(|ext| name.ends_with(ext)) {
        return SourceType::File;
    }
    if url.is_some() {
        SourceType::Url
    } else {
        SourceType::Text
    }
}

/// Parse the response of an add-source call. The ID sits one to three
/// levels deep depending on source kind; the recursive UUID search covers
/// every observed variant.
pub fn parse_source_added(result: &Value, notebook_id: &str, title: &str) -> Result<Source> {
    let id = find_uuid(result)
        .ok_or_else(|| Error::Parse("add-source response has no source ID".into()))?;

    let url = find_nested_url(result, 0).map(str::to_string);

    Ok(Source {
        id: id.to_string(),
        notebook_id: notebook_id.to_string(),
        source_type: infer_source_type(url.as_deref(), title),
        title: title.to_string(),
        url,
        status: SourceStatus::Processing,
    })
}

fn find_nested_url(value: &Value, depth: usize) -> Option<&str> {
    if depth > MAX_SEARCH_DEPTH {
        return None;
    }
    match value {
        Value::String(s) if is_http_url(s) => Some(s),
        Value::Array(items) => items.iter().find_map(|v| find_nested_url(v, depth + 1)),
        _ => None,
    }
}

/// Parse a generation submit response: task ID at position 0 of the
/// artifact record, numeric status code at position 4.
pub fn parse_generation_status(result: &Value) -> Result<GenerationStatus> {
    let artifact = match result.get(0) {
        Some(first) if first.is_array() => first,
        _ => result,
    };

    let task_id = as_str(artifact.get(0))
        .or_else(|| find_uuid(artifact))
        .ok_or_else(|| Error::Parse("generation response has no task ID".into()))?;

    let status = match artifact.get(4).and_then(Value::as_i64) {
        Some(1) => "in_progress",
        Some(3) => "completed",
        _ => "pending",
    };

    Ok(GenerationStatus {
        task_id: task_id.to_string(),
        status: status.to_string(),
        download_url: None,
        error: None,
    })
}

/// Parse a poll response. A null root means the task is still pending, not
/// an error.
pub fn parse_poll_status(result: &Value, task_id: &str) -> GenerationStatus {
    if result.is_null() {
        return GenerationStatus {
            task_id: task_id.to_string(),
            status: "pending".to_string(),
            download_url: None,
            error: None,
        };
    }

    let status = as_str(result.get(1)).map(str::to_lowercase);
    let download_url = as_str(result.get(2))
        .filter(|s| is_http_url(s))
        .map(str::to_string);
    let error = as_str(result.get(3)).map(str::to_string);

    let status = match status {
        Some(s) => s,
        None if error.is_some() => "failed".to_string(),
        None if download_url.is_some() => "completed".to_string(),
        None => "pending".to_string(),
    };

    GenerationStatus {
        task_id: task_id.to_string(),
        status,
        download_url,
        error,
    }
}

/// Parse the artifact list nested under `result[0]`.
pub fn parse_artifact_list(result: &Value) -> Vec<Artifact> {
    result
        .get(0)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(parse_artifact_entry).collect())
        .unwrap_or_default()
}

fn parse_artifact_entry(entry: &Value) -> Option<Artifact> {
    let items = entry.as_array()?;
    let id = as_str(items.first())?.to_string();
    let title = as_str(items.get(1)).unwrap_or_default().to_string();
    let artifact_type = items
        .get(2)
        .and_then(Value::as_i64)
        .map(ArtifactType::from_tag)?;
    let status = match items.get(4).and_then(Value::as_i64) {
        Some(1) => "in_progress",
        Some(2) => "pending",
        _ => "completed",
    };

    Some(Artifact {
        id,
        title,
        artifact_type,
        status: status.to_string(),
        download_url: pick_download_url(entry),
    })
}

/// Mine the download URL from the `[url, _, mime]` triples at `entry[6][5]`,
/// preferring the playable mp4 variants over thumbnails and transcripts.
fn pick_download_url(entry: &Value) -> Option<String> {
    let candidates = entry.get(6).and_then(|v| v.get(5)).and_then(Value::as_array)?;

    let mut first_url = None;
    for candidate in candidates {
        let Some(url) = as_str(candidate.get(0)).filter(|s| is_http_url(s)) else {
            continue;
        };
        if first_url.is_none() {
            first_url = Some(url);
        }
        if let Some(mime) = as_str(candidate.get(2)) {
            if mime == "audio/mp4" || mime == "video/mp4" {
                return Some(url.to_string());
            }
        }
    }
    first_url.map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const NB_ID: &str = "11111111-2222-3333-4444-555555555555";
    const SRC_ID: &str = "aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee";

    #[test]
    fn uuid_predicate() {
        assert!(is_uuid("11111111-2222-3333-4444-555555555555"));
        assert!(is_uuid("AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE"));
        assert!(!is_uuid("11111111-2222-3333-4444-55555555555"));
        assert!(!is_uuid("11111111-2222-3333-4444-5555555555556"));
        assert!(!is_uuid("11111111x2222-3333-4444-555555555555"));
        assert!(!is_uuid("gggggggg-2222-3333-4444-555555555555"));
        assert!(!is_uuid(""));
    }

    #[test]
    fn find_uuid_respects_depth_bound() {
        let mut value = json!(SRC_ID);
        for _ in 0..5 {
            value = json!([value]);
        }
        assert_eq!(find_uuid(&value), Some(SRC_ID));

        let mut deep = json!(SRC_ID);
        for _ in 0..12 {
            deep = json!([deep]);
        }
        assert_eq!(find_uuid(&deep), None);
    }

    #[test]
    fn notebook_id_and_title_found_regardless_of_order() {
        let nb = parse_notebook(&json!(["My notes", NB_ID, null])).expect("parse");
        assert_eq!(nb.id, NB_ID);
        assert_eq!(nb.title, "My notes");

        let nb = parse_notebook(&json!([NB_ID, "My notes"])).expect("parse");
        assert_eq!(nb.id, NB_ID);
        assert_eq!(nb.title, "My notes");
    }

    #[test]
    fn notebook_without_uuid_is_rejected() {
        assert!(parse_notebook(&json!(["only a title"])).is_err());
    }

    #[test]
    fn notebook_list_skips_malformed_entries() {
        let result = json!([[["Good", NB_ID], ["no id here"], 42]]);
        let notebooks = parse_notebook_list(&result);
        assert_eq!(notebooks.len(), 1);
        assert_eq!(notebooks[0].id, NB_ID);
    }

    #[test]
    fn source_list_positions() {
        let entry = json!([
            [[SRC_ID]],
            "Quarterly report.pdf",
            [null, null, null, null, null, null, null, ["https://example.com/q.pdf"]],
            [null, 2]
        ]);
        let result = json!([[null, [entry]]]);
        let sources = parse_source_list(&result, NB_ID);
        assert_eq!(sources.len(), 1);
        let source = &sources[0];
        assert_eq!(source.id, SRC_ID);
        assert_eq!(source.title, "Quarterly report.pdf");
        assert_eq!(source.url.as_deref(), Some("https://example.com/q.pdf"));
        assert_eq!(source.status, SourceStatus::Ready);
        assert_eq!(source.source_type, SourceType::File);
        assert_eq!(source.notebook_id, NB_ID);
    }

    #[test]
    fn source_type_inference() {
        assert_eq!(
            infer_source_type(Some("https://youtu.be/abc123"), ""),
            SourceType::Youtube
        );
        assert_eq!(
            infer_source_type(Some("https://example.com/page"), ""),
            SourceType::Url
        );
        assert_eq!(infer_source_type(None, "notes.txt"), SourceType::File);
        assert_eq!(infer_source_type(None, "pasted text"), SourceType::Text);
    }

    #[test]
    fn source_added_uses_recursive_uuid_search() {
        let result = json!([[[SRC_ID, null], "ignored"]]);
        let source = parse_source_added(&result, NB_ID, "My doc").expect("parse");
        assert_eq!(source.id, SRC_ID);
        assert_eq!(source.title, "My doc");
        assert_eq!(source.status, SourceStatus::Processing);
    }

    #[test]
    fn generation_status_codes() {
        let result = json!([[SRC_ID, null, null, null, 1]]);
        let status = parse_generation_status(&result).expect("parse");
        assert_eq!(status.task_id, SRC_ID);
        assert_eq!(status.status, "in_progress");

        let result = json!([[SRC_ID, null, null, null, 2]]);
        assert_eq!(parse_generation_status(&result).expect("parse").status, "pending");

        let result = json!([[SRC_ID, null, null, null, 3]]);
        assert_eq!(
            parse_generation_status(&result).expect("parse").status,
            "completed"
        );
    }

    #[test]
    fn poll_null_means_pending() {
        let status = parse_poll_status(&Value::Null, "task-1");
        assert_eq!(status.task_id, "task-1");
        assert_eq!(status.status, "pending");
        assert!(status.download_url.is_none());
        assert!(status.error.is_none());
    }

    #[test]
    fn poll_positions() {
        let result = json!([null, "COMPLETED", "https://dl.example/x.m4a", null]);
        let status = parse_poll_status(&result, "task-1");
        assert_eq!(status.status, "completed");
        assert_eq!(status.download_url.as_deref(), Some("https://dl.example/x.m4a"));

        let failed = json!([null, null, null, "generation failed"]);
        let status = parse_poll_status(&failed, "task-1");
        assert_eq!(status.status, "failed");
        assert_eq!(status.error.as_deref(), Some("generation failed"));
    }

    #[test]
    fn artifact_list_prefers_mp4_variants() {
        let entry = json!([
            SRC_ID,
            "Deep Dive",
            1,
            null,
            null,
            null,
            [null, null, null, null, null, [
                ["https://cdn.example/thumb.png", null, "image/png"],
                ["https://cdn.example/audio.m4a", null, "audio/mp4"]
            ]]
        ]);
        let artifacts = parse_artifact_list(&json!([[entry]]));
        assert_eq!(artifacts.len(), 1);
        let artifact = &artifacts[0];
        assert_eq!(artifact.artifact_type, ArtifactType::Audio);
        assert_eq!(artifact.status, "completed");
        assert_eq!(
            artifact.download_url.as_deref(),
            Some("https://cdn.example/audio.m4a")
        );
    }

    #[test]
    fn artifact_list_falls_back_to_first_url() {
        let entry = json!([
            SRC_ID,
            "Infographic",
            7,
            null,
            null,
            null,
            [null, null, null, null, null, [
                ["https://cdn.example/info.svg", null, "image/svg+xml"]
            ]]
        ]);
        let artifacts = parse_artifact_list(&json!([[entry]]));
        assert_eq!(
            artifacts[0].download_url.as_deref(),
            Some("https://cdn.example/info.svg")
        );
    }

    #[test]
    fn artifact_list_skips_entries_without_type_tag() {
        let good = json!([SRC_ID, "Audio", 1]);
        let bad = json!(["not-even-close"]);
        let artifacts = parse_artifact_list(&json!([[good, bad]]));
        assert_eq!(artifacts.len(), 1);
        assert!(artifacts[0].download_url.is_none());
    }
}
