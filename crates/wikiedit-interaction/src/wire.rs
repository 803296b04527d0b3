//! Response envelopes of the `visualeditor`, `visualeditoredit` and
//! `query` actions, and their conversion into core response types.
//!
//! Bodies are first inspected as raw JSON so a failure can keep the whole
//! body as its payload; only then are they decoded into these DTOs.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use wikiedit_core::remote::{
    CacheKey, CheckboxDef, DiffResponse, KnownLinks, LinkInfo, LoadResponse, RemoteError,
    RemoteResult, SaveResponse, SerializeResponse, TokenInfo, UserIdentity,
};

const RESULT_SUCCESS: &str = "success";
const RESULT_NO_CHANGES: &str = "nochanges";
const INVALID_RESPONSE: &str = "invalidresponse";

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: Option<String>,
}

/// Top-level `error` object, turned into a server error carrying the body.
pub(crate) fn api_error(body: &Value) -> Option<RemoteError> {
    let error: ApiError = serde_json::from_value(body.get("error")?.clone()).ok()?;
    Some(RemoteError::with_payload(error.code, error.info, body.clone()))
}

fn invalid(body: &Value, info: &str) -> RemoteError {
    RemoteError::with_payload(INVALID_RESPONSE, Some(info.to_string()), body.clone())
}

/// Decodes `body[key]`, or fails with an invalid-response error.
fn envelope<T: for<'de> Deserialize<'de>>(body: &Value, key: &str) -> RemoteResult<T> {
    let data = body
        .get(key)
        .ok_or_else(|| invalid(body, "Invalid response from server"))?;
    serde_json::from_value(data.clone()).map_err(|e| invalid(body, &e.to_string()))
}

/// Notices arrive either as a list or as an object keyed by notice name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Notices {
    List(Vec<String>),
    Keyed(BTreeMap<String, String>),
}

impl Default for Notices {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl From<Notices> for Vec<String> {
    fn from(notices: Notices) -> Self {
        match notices {
            Notices::List(list) => list,
            Notices::Keyed(map) => map.into_values().collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireLinks {
    #[serde(default)]
    missing: Vec<String>,
    /// `1` when every other title is known, otherwise a title list.
    #[serde(default)]
    known: Value,
}

impl From<WireLinks> for LinkInfo {
    fn from(links: WireLinks) -> Self {
        let known = match links.known {
            Value::Array(titles) => KnownLinks::Titles(
                titles
                    .into_iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect(),
            ),
            Value::Number(n) if n.as_u64() == Some(1) => KnownLinks::All,
            Value::Bool(true) => KnownLinks::All,
            _ => KnownLinks::default(),
        };
        Self {
            missing: links.missing,
            known,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct WireCheckbox {
    #[serde(default)]
    default: bool,
    #[serde(default, rename = "label-message")]
    label_message: Option<String>,
    #[serde(default)]
    tooltip: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoadData {
    result: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    etag: Option<String>,
    #[serde(default)]
    oldid: Option<u64>,
    #[serde(default, rename = "basetimestamp")]
    base_timestamp: Option<String>,
    #[serde(default, rename = "starttimestamp")]
    start_timestamp: Option<String>,
    #[serde(default)]
    notices: Notices,
    #[serde(default)]
    links: Option<WireLinks>,
    #[serde(default)]
    checkboxes_def: BTreeMap<String, WireCheckbox>,
    #[serde(default)]
    protected_classes: Option<String>,
    #[serde(default)]
    from_edited_state: bool,
}

pub(crate) fn load_response(body: &Value) -> RemoteResult<LoadResponse> {
    let data: LoadData = envelope(body, "visualeditor")?;
    if data.result != RESULT_SUCCESS {
        return Err(RemoteError::with_payload(data.result, None, body.clone()));
    }
    let content = data
        .content
        .ok_or_else(|| invalid(body, "Invalid content in response from server"))?;

    let checkboxes = data
        .checkboxes_def
        .into_iter()
        .map(|(name, def)| CheckboxDef {
            name,
            default: def.default,
            label_message: def.label_message,
            tooltip: def.tooltip,
        })
        .collect();

    Ok(LoadResponse {
        content,
        etag: data.etag,
        revision_id: data.oldid,
        base_timestamp: data.base_timestamp,
        start_timestamp: data.start_timestamp,
        notices: data.notices.into(),
        links: data.links.map(Into::into).unwrap_or_default(),
        checkboxes,
        protected_classes: data.protected_classes,
        from_edited_state: data.from_edited_state,
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EditData {
    result: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, rename = "categorieshtml")]
    categories_html: Option<String>,
    #[serde(default, rename = "newrevid")]
    new_revision_id: Option<u64>,
    #[serde(default)]
    is_redirect: bool,
    #[serde(default)]
    display_title_html: Option<String>,
    /// Either a preformatted string or `{date, time}`.
    #[serde(default)]
    last_modified: Option<Value>,
    #[serde(default)]
    content_sub: Option<String>,
    #[serde(default)]
    diff: Option<String>,
    #[serde(default, rename = "cachekey")]
    cache_key: Option<String>,
    #[serde(default)]
    edit: Option<EditCode>,
}

#[derive(Debug, Deserialize)]
struct EditCode {
    #[serde(default)]
    code: Option<String>,
}

fn edit_data(body: &Value) -> RemoteResult<EditData> {
    envelope(body, "visualeditoredit")
}

fn format_last_modified(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => {
            let date = map.get("date").and_then(Value::as_str)?;
            match map.get("time").and_then(Value::as_str) {
                Some(time) => Some(format!("{date} {time}")),
                None => Some(date.to_string()),
            }
        }
        _ => None,
    }
}

pub(crate) fn save_response(body: &Value) -> RemoteResult<SaveResponse> {
    let data = edit_data(body)?;
    if data.result != RESULT_SUCCESS {
        // Captchas, spam filters and hook aborts all arrive this way; the
        // caller classifies them from the payload.
        let code = data
            .edit
            .and_then(|e| e.code)
            .unwrap_or(data.result);
        return Err(RemoteError::with_payload(code, None, body.clone()));
    }
    let content = data
        .content
        .ok_or_else(|| invalid(body, "Invalid HTML content in response from server"))?;
    Ok(SaveResponse {
        content,
        categories_html: data.categories_html,
        new_revision_id: data.new_revision_id,
        is_redirect: data.is_redirect,
        display_title_html: data.display_title_html,
        last_modified: data.last_modified.and_then(format_last_modified),
        content_sub: data.content_sub,
    })
}

pub(crate) fn diff_response(body: &Value) -> RemoteResult<DiffResponse> {
    let data = edit_data(body)?;
    match data.result.as_str() {
        RESULT_NO_CHANGES => Ok(DiffResponse::NoChanges),
        RESULT_SUCCESS => data
            .diff
            .map(DiffResponse::Diff)
            .ok_or_else(|| invalid(body, "Invalid HTML content in response from server")),
        _ => Err(RemoteError::with_payload(data.result, None, body.clone())),
    }
}

pub(crate) fn serialize_response(body: &Value) -> RemoteResult<SerializeResponse> {
    let data = edit_data(body)?;
    if data.result != RESULT_SUCCESS {
        return Err(RemoteError::with_payload(data.result, None, body.clone()));
    }
    data.content
        .map(|wikitext| SerializeResponse { wikitext })
        .ok_or_else(|| invalid(body, "No Wikitext content in response from server"))
}

pub(crate) fn cache_key_response(body: &Value) -> RemoteResult<CacheKey> {
    let data = edit_data(body)?;
    data.cache_key
        .map(CacheKey)
        .ok_or_else(|| RemoteError::with_payload("nocachekey", None, body.clone()))
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    tokens: Option<Tokens>,
    #[serde(default)]
    userinfo: Option<UserInfo>,
}

#[derive(Debug, Deserialize)]
struct Tokens {
    #[serde(default)]
    csrftoken: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    #[serde(default)]
    id: u64,
    #[serde(default)]
    name: String,
    /// Present (as `""` or `true`) only for anonymous sessions.
    #[serde(default)]
    anon: Option<Value>,
}

pub(crate) fn token_response(body: &Value) -> RemoteResult<TokenInfo> {
    let data: QueryData = envelope(body, "query")?;
    let (Some(token), Some(user)) = (data.tokens.and_then(|t| t.csrftoken), data.userinfo) else {
        return Err(invalid(body, "Missing token or user info"));
    };
    let anonymous = matches!(user.anon, Some(ref v) if v != &Value::Bool(false)) || user.id == 0;
    let user = if anonymous {
        UserIdentity::Anonymous
    } else {
        UserIdentity::Registered {
            id: user.id,
            name: user.name,
        }
    };
    Ok(TokenInfo {
        edit_token: token,
        user,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_load_reads_all_fields() {
        let body = json!({
            "visualeditor": {
                "result": "success",
                "content": "<html></html>",
                "etag": "\"abc\"",
                "oldid": 120,
                "basetimestamp": "20240101000000",
                "starttimestamp": "20240102000000",
                "notices": { "editnotice-ns": "<div>Careful</div>" },
                "links": { "missing": ["Red"], "known": 1 },
                "checkboxesDef": {
                    "wpMinoredit": { "label-message": "minoredit", "default": false },
                    "wpWatchthis": { "label-message": "watchthis", "default": true }
                },
                "protectedClasses": "mw-protected",
                "fromEditedState": true
            }
        });
        let response = load_response(&body).expect("Should decode load");
        assert_eq!(response.revision_id, Some(120));
        assert_eq!(response.notices, vec!["<div>Careful</div>"]);
        assert_eq!(response.links.known, KnownLinks::All);
        assert_eq!(response.links.missing, vec!["Red"]);
        assert_eq!(response.checkboxes.len(), 2);
        assert!(response.checkboxes[1].default);
        assert_eq!(response.protected_classes.as_deref(), Some("mw-protected"));
        assert!(response.from_edited_state);
    }

    #[test]
    fn test_load_known_title_list() {
        let body = json!({
            "visualeditor": {
                "result": "success",
                "content": "text",
                "notices": [],
                "links": { "missing": [], "known": ["Blue"] }
            }
        });
        let response = load_response(&body).unwrap();
        assert_eq!(
            response.links.known,
            KnownLinks::Titles(vec!["Blue".to_string()])
        );
    }

    #[test]
    fn test_missing_envelope_is_invalid() {
        let err = load_response(&json!({})).unwrap_err();
        assert_eq!(err.code(), Some(INVALID_RESPONSE));
    }

    #[test]
    fn test_top_level_error_keeps_body() {
        let body = json!({ "error": { "code": "badcachekey", "info": "expired" } });
        let err = api_error(&body).expect("Should detect error");
        assert!(err.is_bad_cache_key());
        match err {
            RemoteError::Server { info, payload, .. } => {
                assert_eq!(info.as_deref(), Some("expired"));
                assert_eq!(payload, Some(body));
            }
            other => panic!("Expected server error, got {other:?}"),
        }
        assert!(api_error(&json!({ "visualeditor": {} })).is_none());
    }

    #[test]
    fn test_failed_save_uses_nested_code() {
        let body = json!({
            "visualeditoredit": {
                "result": "error",
                "edit": { "code": "abusefilter-warning", "info": "Hit AbuseFilter: x", "warning": "<p>w</p>" }
            }
        });
        let err = save_response(&body).unwrap_err();
        assert_eq!(err.code(), Some("abusefilter-warning"));
        let payload = err.save_payload().expect("Should keep payload");
        assert_eq!(payload.edit.unwrap().warning.as_deref(), Some("<p>w</p>"));
    }

    #[test]
    fn test_save_success_formats_last_modified() {
        let body = json!({
            "visualeditoredit": {
                "result": "success",
                "content": "<p>Saved</p>",
                "newrevid": 121,
                "isRedirect": false,
                "lastModified": { "date": "1 January 2024", "time": "12:00" }
            }
        });
        let response = save_response(&body).unwrap();
        assert_eq!(response.new_revision_id, Some(121));
        assert_eq!(response.last_modified.as_deref(), Some("1 January 2024 12:00"));
    }

    #[test]
    fn test_diff_no_changes() {
        let body = json!({ "visualeditoredit": { "result": "nochanges" } });
        assert_eq!(diff_response(&body).unwrap(), DiffResponse::NoChanges);
    }

    #[test]
    fn test_missing_cache_key() {
        let body = json!({ "visualeditoredit": { "result": "success" } });
        assert_eq!(cache_key_response(&body).unwrap_err().code(), Some("nocachekey"));
    }

    #[test]
    fn test_token_identity() {
        let anon = json!({
            "query": {
                "tokens": { "csrftoken": "+\\" },
                "userinfo": { "id": 0, "name": "127.0.0.1", "anon": "" }
            }
        });
        assert_eq!(token_response(&anon).unwrap().user, UserIdentity::Anonymous);

        let registered = json!({
            "query": {
                "tokens": { "csrftoken": "abc+\\" },
                "userinfo": { "id": 7, "name": "Example" }
            }
        });
        let info = token_response(&registered).unwrap();
        assert_eq!(info.edit_token, "abc+\\");
        assert_eq!(
            info.user,
            UserIdentity::Registered {
                id: 7,
                name: "Example".to_string()
            }
        );
    }
}
