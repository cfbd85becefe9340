//! Wire codec for the batchexecute RPC protocol.
//!
//! Requests are triple-nested arrays, form-encoded under `f.req` with the
//! CSRF token in `at`. Responses carry an anti-XSSI prefix followed by
//! length-delimited JSON chunks; each chunk holds `wrb.fr` (success) or
//! `er` (error) items keyed by RPC method ID.

use crate::error::{Error, Result};
use serde_json::{json, Value};
use url::form_urlencoded;

pub const BASE_URL: &str = "https://notebooklm.google.com/";
pub const BATCH_PATH: &str = "_/LabsTailwindUi/data/batchexecute";
pub const CHAT_PATH: &str = "_/LabsTailwindUi/data/google.internal.labs.tailwind.orchestration.v1.LabsTailwindOrchestrationService/GenerateFreeFormStreamed";
pub const UPLOAD_PATH: &str = "upload/_/";

/// Frontend build label sent on the streaming endpoint.
const CHAT_BL: &str = "boq_labs-tailwind-frontend_20241209.08_p1";

/// Marker the server embeds in envelopes for user-visible errors. In
/// practice this means a generation rate limit.
const DISPLAYABLE_ERROR_MARKER: &str = "UserDisplayableError";

/// RPC method IDs (reverse-engineered, stable across observed versions).
pub mod methods {
    pub const LIST_NOTEBOOKS: &str = "wXbhsf";
    pub const CREATE_NOTEBOOK: &str = "CCqFvf";
    pub const GET_NOTEBOOK: &str = "rLM1Ne";
    pub const RENAME_NOTEBOOK: &str = "s0tc2d";
    pub const DELETE_NOTEBOOK: &str = "WWINqb";

    pub const ADD_SOURCE: &str = "izAoDd";
    pub const REGISTER_SOURCE_FILE: &str = "o4cbdc";
    pub const DELETE_SOURCE: &str = "tGMBJ";
    pub const RENAME_SOURCE: &str = "BPnFVd";

    /// Audio and video generation share this ID; the parameter shape
    /// dispatches server behavior.
    pub const CREATE_ARTIFACT: &str = "R7cb6c";
    /// Doubles as poll-generation and list-artifacts.
    pub const LIST_ARTIFACTS: &str = "gArtLc";
    pub const DELETE_ARTIFACT: &str = "j7mI7e";
}

/// Build the batch envelope `[[[method, json(params), null, "generic"]]]`.
pub fn encode_rpc(method: &str, params: &Value) -> Result<Value> {
    let params_json = serde_json::to_string(params)?;
    Ok(json!([[[method, params_json, Value::Null, "generic"]]]))
}

/// Form-encode the envelope as `f.req=<...>&at=<csrf>&`.
///
/// The trailing `&` is part of the observed wire format and is kept.
pub fn build_body(envelope: &Value, csrf_token: &str) -> Result<String> {
    let envelope_json = serde_json::to_string(envelope)?;
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("f.req", &envelope_json);
    if !csrf_token.is_empty() {
        serializer.append_pair("at", csrf_token);
    }
    let mut body = serializer.finish();
    body.push('&');
    Ok(body)
}

fn endpoint(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}

/// Batch endpoint URL with `rpcids`, `source-path`, `f.sid`, and chunked
/// response mode.
pub fn build_batch_url(base: &str, method: &str, session_id: &str, source_path: &str) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("rpcids", method);
    query.append_pair("source-path", source_path);
    if !session_id.is_empty() {
        query.append_pair("f.sid", session_id);
    }
    query.append_pair("rt", "c");
    format!("{}?{}", endpoint(base, BATCH_PATH), query.finish())
}

/// Streaming chat endpoint URL. `req_id` is passed in decimal.
pub fn build_chat_url(base: &str, session_id: &str, req_id: i64) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("bl", CHAT_BL);
    query.append_pair("hl", "en");
    query.append_pair("_reqid", &req_id.to_string());
    query.append_pair("rt", "c");
    if !session_id.is_empty() {
        query.append_pair("f.sid", session_id);
    }
    format!("{}?{}", endpoint(base, CHAT_PATH), query.finish())
}

/// Upload endpoint URL.
pub fn build_upload_url(base: &str) -> String {
    format!("{}?authuser=0", endpoint(base, UPLOAD_PATH))
}

/// Encode the chat request body. Source IDs are triply nested, the question
/// rides as a bare string, and the whole parameter list is wrapped as
/// `[null, json(params)]` before form-encoding.
pub fn encode_chat_body(
    question: &str,
    source_ids: &[String],
    conversation_id: &str,
    history: Option<&Value>,
) -> Result<String> {
    let sources: Vec<Value> = source_ids.iter().map(|id| json!([[[id]]])).collect();
    let params = json!([
        sources,
        question,
        history.cloned().unwrap_or(Value::Null),
        [2, Value::Null, [1]],
        conversation_id,
    ]);
    let params_json = serde_json::to_string(&params)?;
    let wrapper = json!([Value::Null, params_json]);
    let wrapper_json = serde_json::to_string(&wrapper)?;

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    serializer.append_pair("f.req", &wrapper_json);
    let mut body = serializer.finish();
    body.push('&');
    Ok(body)
}

/// Strip the anti-XSSI prefix `)]}'` (and one trailing newline) if present.
pub fn strip_xssi(body: &str) -> &str {
    match body.strip_prefix(")]}'") {
        Some(rest) => rest.strip_prefix('\n').unwrap_or(rest),
        None => body,
    }
}

/// Parse the length-delimited chunk stream.
///
/// A line holding a bare integer is a byte-count header and the following
/// line is its JSON payload. Lines that are not integers are attempted as
/// JSON directly, which tolerates the un-delimited variants seen in the
/// wild. Unparseable lines are skipped.
pub fn parse_chunks(body: &str) -> Vec<Value> {
    let mut chunks = Vec::new();
    let mut lines = body.trim().lines();

    while let Some(line) = lines.next() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if trimmed.parse::<u64>().is_ok() {
            let Some(payload) = lines.next() else { break };
            if let Ok(chunk) = serde_json::from_str::<Value>(payload) {
                chunks.push(chunk);
            }
        } else if let Ok(chunk) = serde_json::from_str::<Value>(trimmed) {
            chunks.push(chunk);
        }
    }

    chunks
}

/// Locate the first item for `method` across all chunks and decode its
/// payload.
pub fn extract_result(chunks: &[Value], method: &str) -> Result<Value> {
    let mut seen = Vec::new();

    for chunk in chunks {
        let Some(items) = chunk.as_array() else {
            continue;
        };
        for item in items {
            let Some(item) = item.as_array() else {
                continue;
            };
            if item.len() < 2 {
                continue;
            }
            let tag = item[0].as_str().unwrap_or_default();
            let id = item[1].as_str().unwrap_or_default();
            if !id.is_empty() {
                seen.push(id.to_string());
            }

            if tag == "er" && id == method {
                let info = item
                    .get(2)
                    .filter(|v| !v.is_null())
                    .map(Value::to_string)
                    .unwrap_or_default();
                return Err(Error::Rpc(info));
            }

            if tag == "wrb.fr" && id == method {
                // A populated trailing slot carries a user-visible error
                // even though the envelope reads as success.
                if let Some(display) = item.get(5) {
                    if !display.is_null() && contains_displayable_error(display) {
                        return Err(Error::RateLimited);
                    }
                }

                let Some(payload) = item.get(2) else {
                    return Ok(Value::Null);
                };
                if let Some(text) = payload.as_str() {
                    return Ok(serde_json::from_str(text)
                        .unwrap_or_else(|_| Value::String(text.to_string())));
                }
                return Ok(payload.clone());
            }
        }
    }

    Err(Error::NoResult {
        method: method.to_string(),
        seen,
    })
}

fn contains_displayable_error(value: &Value) -> bool {
    value.to_string().contains(DISPLAYABLE_ERROR_MARKER)
}

/// Strip, chunk, and extract in one step.
pub fn decode_response(body: &str, method: &str) -> Result<Value> {
    let chunks = parse_chunks(strip_xssi(body));
    extract_result(&chunks, method)
}

/// Extract the answer text from a streaming chat response.
///
/// Every `wrb.fr` payload whose re-parsed value has a non-empty string at
/// `[0][0]` is a candidate; the longest one wins, which tolerates partial
/// chunks that precede the final answer.
pub fn parse_chat_answer(body: &str) -> Result<String> {
    let chunks = parse_chunks(strip_xssi(body));
    let mut answer: Option<String> = None;

    for chunk in &chunks {
        let Some(items) = chunk.as_array() else {
            continue;
        };
        for item in items {
            let Some(item) = item.as_array() else {
                continue;
            };
            if item.first().and_then(Value::as_str) != Some("wrb.fr") {
                continue;
            }
            let Some(payload) = item.get(2) else {
                continue;
            };
            let parsed: Value = match payload {
                Value::String(text) => match serde_json::from_str(text) {
                    Ok(value) => value,
                    Err(_) => continue,
                },
                other => other.clone(),
            };
            let Some(text) = parsed
                .get(0)
                .and_then(|v| v.get(0))
                .and_then(Value::as_str)
            else {
                continue;
            };
            if text.is_empty() {
                continue;
            }
            if answer.as_ref().map(|a| text.len() > a.len()).unwrap_or(true) {
                answer = Some(text.to_string());
            }
        }
    }

    answer.ok_or_else(|| Error::Parse("no answer found in response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strips_xssi_prefix_exactly() {
        assert_eq!(strip_xssi(")]}'\n23\n[[]]"), "23\n[[]]");
        assert_eq!(strip_xssi(")]}'23\n[[]]"), "23\n[[]]");
        // Only one newline belongs to the prefix.
        assert_eq!(strip_xssi(")]}'\n\nrest"), "\nrest");
        // No prefix, no change.
        assert_eq!(strip_xssi("23\n[[]]"), "23\n[[]]");
    }

    #[test]
    fn parses_length_delimited_chunks() {
        let body = "12\n[[1,2,3]]\n5\n[4,5]\n";
        let chunks = parse_chunks(body);
        assert_eq!(chunks, vec![serde_json::json!([[1, 2, 3]]), serde_json::json!([4, 5])]);
    }

    #[test]
    fn chunk_parse_tolerates_blank_lines_and_whitespace() {
        let with_noise = "\n12\n[[1,2,3]]\n\n\n5\n[4,5]\n   \n";
        let clean = "12\n[[1,2,3]]\n5\n[4,5]";
        assert_eq!(parse_chunks(with_noise), parse_chunks(clean));
    }

    #[test]
    fn chunk_parse_accepts_bare_json_lines() {
        let body = "[[\"wrb.fr\",\"x\",null]]\n";
        let chunks = parse_chunks(body);
        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn encode_and_body_round_trip() {
        let params = serde_json::json!([serde_json::Value::Null, 1]);
        let envelope = encode_rpc("wXbhsf", &params).expect("encode");
        assert_eq!(
            envelope,
            serde_json::json!([[["wXbhsf", "[null,1]", null, "generic"]]])
        );

        let body = build_body(&envelope, "csrf/token=").expect("body");
        let expected_freq: String =
            form_urlencoded::byte_serialize(envelope.to_string().as_bytes()).collect();
        let expected_at: String = form_urlencoded::byte_serialize(b"csrf/token=").collect();
        assert_eq!(body, format!("f.req={expected_freq}&at={expected_at}&"));
        assert!(body.ends_with('&'));
    }

    #[test]
    fn body_omits_at_when_csrf_empty() {
        let envelope = encode_rpc("x", &serde_json::json!([])).expect("encode");
        let body = build_body(&envelope, "").expect("body");
        assert!(!body.contains("at="));
        assert!(body.ends_with('&'));
    }

    #[test]
    fn decode_success_envelope() {
        let body = ")]}'\n23\n[[\"wrb.fr\",\"wXbhsf\",\"[[\\\"abc\\\"]]\",null,null,[1],\"generic\"]]\n";
        let result = decode_response(body, "wXbhsf").expect("decode");
        assert_eq!(result, serde_json::json!([["abc"]]));
    }

    #[test]
    fn decode_no_result_reports_seen_ids() {
        let body = ")]}'\n23\n[[\"wrb.fr\",\"wXbhsf\",\"[[\\\"abc\\\"]]\",null,null,[1],\"generic\"]]\n";
        match decode_response(body, "zzzzzz") {
            Err(Error::NoResult { method, seen }) => {
                assert_eq!(method, "zzzzzz");
                assert_eq!(seen, vec!["wXbhsf".to_string()]);
            }
            other => panic!("expected NoResult, got {other:?}"),
        }
    }

    #[test]
    fn decode_rate_limit_envelope() {
        let body = ")]}'\n34\n[[\"wrb.fr\",\"X\",\"{}\",null,null,[1,\"UserDisplayableError\"],\"generic\"]]\n";
        assert!(matches!(decode_response(body, "X"), Err(Error::RateLimited)));
    }

    #[test]
    fn decode_explicit_rpc_error() {
        let body = ")]}'\n10\n[[\"er\",\"X\",[3,\"bad request\"]]]\n";
        match decode_response(body, "X") {
            Err(Error::Rpc(info)) => assert!(info.contains("bad request")),
            other => panic!("expected Rpc error, got {other:?}"),
        }
    }

    #[test]
    fn decode_payload_already_parsed() {
        let body = ")]}'\n9\n[[\"wrb.fr\",\"X\",[1,2]]]\n";
        let result = decode_response(body, "X").expect("decode");
        assert_eq!(result, serde_json::json!([1, 2]));
    }

    #[test]
    fn batch_url_carries_query_params() {
        let url = build_batch_url(BASE_URL, "wXbhsf", "sid123", "/");
        assert!(url.starts_with("https://notebooklm.google.com/_/LabsTailwindUi/data/batchexecute?"));
        assert!(url.contains("rpcids=wXbhsf"));
        assert!(url.contains("f.sid=sid123"));
        assert!(url.contains("rt=c"));
        assert!(url.contains("source-path=%2F"));
    }

    #[test]
    fn chat_url_uses_decimal_reqid() {
        let url = build_chat_url(BASE_URL, "sid", 300000);
        assert!(url.contains("_reqid=300000"));
        assert!(url.contains("rt=c"));
        assert!(url.contains("f.sid=sid"));
    }

    #[test]
    fn chat_body_shape() {
        let body = encode_chat_body(
            "what is this?",
            &["11111111-2222-3333-4444-555555555555".to_string()],
            "conv-id",
            None,
        )
        .expect("encode");
        assert!(body.starts_with("f.req="));
        assert!(body.ends_with('&'));

        // Decode the outer wrapper and inner params back out.
        let encoded = body.trim_start_matches("f.req=").trim_end_matches('&');
        let decoded: String = form_urlencoded::parse(format!("v={encoded}").as_bytes())
            .next()
            .map(|(_, v)| v.into_owned())
            .unwrap();
        let wrapper: Value = serde_json::from_str(&decoded).expect("wrapper json");
        assert!(wrapper[0].is_null());
        let params: Value =
            serde_json::from_str(wrapper[1].as_str().expect("inner string")).expect("params json");
        assert_eq!(
            params[0],
            serde_json::json!([[[["11111111-2222-3333-4444-555555555555"]]]])
        );
        assert_eq!(params[1], "what is this?");
        assert_eq!(params[3], serde_json::json!([2, null, [1]]));
        assert_eq!(params[4], "conv-id");
    }

    #[test]
    fn chat_answer_takes_longest_candidate() {
        let payload_short = serde_json::to_string(&serde_json::json!([["short answer"]])).unwrap();
        let payload_long =
            serde_json::to_string(&serde_json::json!([["a much longer, complete answer"]])).unwrap();
        let body = format!(
            ")]}}'\n1\n[[\"wrb.fr\",\"q\",{}]]\n1\n[[\"wrb.fr\",\"q\",{}]]\n",
            serde_json::to_string(&payload_short).unwrap(),
            serde_json::to_string(&payload_long).unwrap(),
        );
        let answer = parse_chat_answer(&body).expect("answer");
        assert_eq!(answer, "a much longer, complete answer");
    }

    #[test]
    fn chat_answer_missing_is_parse_error() {
        let body = ")]}'\n9\n[[\"wrb.fr\",\"q\",\"[[]]\"]]\n";
        assert!(matches!(parse_chat_answer(body), Err(Error::Parse(_))));
    }
}
