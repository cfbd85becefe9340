//! Credential store: persistence and loading of the browser-captured cookie
//! bundle.
//!
//! The on-disk format is the browser-automation "storage state" JSON (a
//! `cookies` array of `{name, value, domain, ...}` objects), written by the
//! interactive login flow and readable from an explicit path, an inline
//! environment variable, or the default per-user location.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_AUTH_JSON: &str = "NOTEBOOKLM_AUTH_JSON";
pub const ENV_HOME: &str = "NOTEBOOKLM_HOME";

const STORAGE_DIR_NAME: &str = ".notebooklm";
const STORAGE_FILE_NAME: &str = "storage_state.json";
const BROWSER_PROFILE_DIR_NAME: &str = "browser_profile";

/// Browser storage-state JSON. Unknown fields (localStorage, expiry, flags)
/// are ignored on read and never written back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageState {
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
}

/// The loaded credential bundle plus the per-session tokens scraped later.
///
/// `cookies` is the flat name→value map used to build the `Cookie` header;
/// `cookies_with_domain` preserves per-cookie domains so the download path
/// can build a correctly scoped cookie jar for cross-domain redirects.
#[derive(Debug, Clone, Default)]
pub struct AuthTokens {
    pub cookies: HashMap<String, String>,
    pub cookies_with_domain: Vec<StoredCookie>,
}

impl AuthTokens {
    /// Load credentials: explicit path, then `NOTEBOOKLM_AUTH_JSON` inline
    /// JSON, then the default storage path.
    pub fn load(storage_path: Option<&Path>) -> Result<Self> {
        let data = if let Some(path) = storage_path {
            fs::read_to_string(path)?
        } else if let Ok(inline) = std::env::var(ENV_AUTH_JSON) {
            inline
        } else {
            let path = storage_path_default();
            fs::read_to_string(&path).map_err(|_| Error::NotAuthenticated)?
        };

        Self::from_storage_state_json(&data)
    }

    /// Parse a storage-state JSON document and filter it down to the cookies
    /// the service accepts.
    pub fn from_storage_state_json(data: &str) -> Result<Self> {
        let state: StorageState = serde_json::from_str(data)?;
        if state.cookies.is_empty() {
            return Err(Error::NotAuthenticated);
        }

        let mut cookies = HashMap::new();
        let mut cookies_with_domain = Vec::new();
        for cookie in state.cookies {
            if !domain_is_accepted(&cookie.domain) {
                continue;
            }
            cookies.insert(cookie.name.clone(), cookie.value.clone());
            cookies_with_domain.push(cookie);
        }

        if cookies.is_empty() {
            return Err(Error::NotAuthenticated);
        }

        Ok(Self {
            cookies,
            cookies_with_domain,
        })
    }

    /// Format the bundle as a `Cookie` request header value.
    pub fn cookie_header(&self) -> String {
        let mut parts: Vec<String> = self
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        parts.sort();
        parts.join("; ")
    }
}

/// Whether a cookie domain belongs to the service's authentication domains.
///
/// YouTube shares the parent domain's cookie names (HSID, SSID, ...), and
/// sending both copies breaks API calls, so every youtube.com domain is
/// rejected even though it sits under the same account.
pub fn domain_is_accepted(domain: &str) -> bool {
    let bare = domain.strip_prefix('.').unwrap_or(domain);
    if bare == "youtube.com" || bare.ends_with(".youtube.com") {
        return false;
    }
    for accepted in ["google.com", "googleusercontent.com"] {
        if bare == accepted || bare.ends_with(&format!(".{accepted}")) {
            return true;
        }
    }
    false
}

/// Per-user storage directory (`$NOTEBOOKLM_HOME` or `~/.notebooklm`).
pub fn storage_dir() -> PathBuf {
    if let Ok(home) = std::env::var(ENV_HOME) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(STORAGE_DIR_NAME)
}

pub fn storage_path_default() -> PathBuf {
    storage_dir().join(STORAGE_FILE_NAME)
}

pub fn browser_profile_dir() -> PathBuf {
    storage_dir().join(BROWSER_PROFILE_DIR_NAME)
}

pub fn storage_exists() -> bool {
    storage_path_default().exists()
}

/// Create a directory (if needed) and restrict it to the owner.
pub fn ensure_private_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    set_permissions(path, 0o700)
}

/// Write the storage state to the default path with owner-only permissions.
pub fn save_storage_state(state: &StorageState) -> Result<PathBuf> {
    let dir = storage_dir();
    ensure_private_dir(&dir)?;

    let path = storage_path_default();
    let data = serde_json::to_string_pretty(state)?;
    fs::write(&path, data)?;
    set_permissions(&path, 0o600)?;

    Ok(path)
}

#[cfg(unix)]
fn set_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state_json(cookies: &[(&str, &str, &str)]) -> String {
        let cookies: Vec<serde_json::Value> = cookies
            .iter()
            .map(|(name, value, domain)| {
                serde_json::json!({"name": name, "value": value, "domain": domain})
            })
            .collect();
        serde_json::json!({ "cookies": cookies }).to_string()
    }

    #[test]
    fn filters_out_youtube_domains() {
        let json = state_json(&[
            ("SID", "a", ".google.com"),
            ("HSID", "b", ".youtube.com"),
            ("LSID", "c", "accounts.google.com"),
        ]);
        let auth = AuthTokens::from_storage_state_json(&json).expect("parse");
        assert_eq!(auth.cookies.len(), 2);
        assert!(auth.cookies.contains_key("SID"));
        assert!(auth.cookies.contains_key("LSID"));
        assert!(!auth.cookies.contains_key("HSID"));
    }

    #[test]
    fn domain_predicate() {
        assert!(domain_is_accepted(".google.com"));
        assert!(domain_is_accepted("google.com"));
        assert!(domain_is_accepted("accounts.google.com"));
        assert!(domain_is_accepted(".googleusercontent.com"));
        assert!(!domain_is_accepted(".youtube.com"));
        assert!(!domain_is_accepted("youtube.com"));
        assert!(!domain_is_accepted("studio.youtube.com"));
        assert!(!domain_is_accepted("example.com"));
        assert!(!domain_is_accepted("notgoogle.com"));
    }

    #[test]
    fn rejects_bundle_with_no_usable_cookies() {
        let json = state_json(&[("HSID", "b", ".youtube.com")]);
        assert!(matches!(
            AuthTokens::from_storage_state_json(&json),
            Err(Error::NotAuthenticated)
        ));
    }

    #[test]
    fn cookie_header_is_sorted_name_value_pairs() {
        let json = state_json(&[("b", "2", ".google.com"), ("a", "1", ".google.com")]);
        let auth = AuthTokens::from_storage_state_json(&json).expect("parse");
        assert_eq!(auth.cookie_header(), "a=1; b=2");
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("state.json");
        std::fs::write(&path, state_json(&[("SID", "x", ".google.com")])).expect("write");
        let auth = AuthTokens::load(Some(&path)).expect("load");
        assert_eq!(auth.cookies.get("SID").map(String::as_str), Some("x"));
    }

    #[cfg(unix)]
    #[test]
    fn save_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tempdir");
        std::env::set_var(ENV_HOME, dir.path());
        let state = StorageState {
            cookies: vec![StoredCookie {
                name: "SID".into(),
                value: "x".into(),
                domain: ".google.com".into(),
            }],
        };
        let path = save_storage_state(&state).expect("save");
        let mode = std::fs::metadata(&path).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        std::env::remove_var(ENV_HOME);
    }
}
