//! HTTP client for the NotebookLM batchexecute API.
//!
//! One `Client` owns the pooled HTTP connection, the credential bundle, and
//! the per-session tokens. Operations are safe to cancel at any await
//! point; cancelling never aborts server-side work (generation tasks keep
//! running and can be re-polled later).
//!
//! A client instance is meant for one operation at a time. Concurrent use
//! from several tasks requires one client per task or external
//! serialization, because token refresh mutates shared session state.

use crate::error::{Error, Result};
use crate::parse;
use crate::rpc;
use crate::storage::AuthTokens;
use crate::types::{
    Artifact, ArtifactType, AskResult, AudioFormat, AudioLength, GenerationStatus, Notebook,
    Source, SourceStatus, SourceType, VideoFormat, VideoStyle,
};
use regex::Regex;
use reqwest::redirect;
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const READ_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);
const MAX_REDIRECTS: usize = 10;

/// The chat `_reqid` starts here and moves up by the same step per ask.
const REQ_COUNTER_STEP: i64 = 100_000;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded;charset=UTF-8";
const DOWNLOAD_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Ephemeral per-session tokens scraped from the homepage.
#[derive(Debug, Clone)]
struct SessionState {
    csrf_token: String,
    session_id: String,
}

pub struct Client {
    base_url: String,
    auth: AuthTokens,
    cookie_header: String,
    session: Mutex<Option<SessionState>>,
    req_counter: AtomicI64,
    http: reqwest::Client,
}

impl Client {
    /// Create a client against the production endpoint.
    pub fn new(auth: AuthTokens) -> Result<Self> {
        Self::with_base_url(rpc::BASE_URL, auth)
    }

    /// Create a client from stored credentials (explicit path, env override,
    /// or the default storage location).
    pub fn from_storage(storage_path: Option<&Path>) -> Result<Self> {
        let auth = AuthTokens::load(storage_path)?;
        Self::new(auth)
    }

    /// Create a client with a custom base URL (used by tests against a mock
    /// server).
    pub fn with_base_url(base_url: impl Into<String>, auth: AuthTokens) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(READ_TIMEOUT);

        if let Some(proxy_url) = proxy_from_env() {
            tracing::debug!(proxy = %proxy_url, "routing traffic through proxy");
            builder = builder.proxy(reqwest::Proxy::all(&proxy_url)?);
        }

        let cookie_header = auth.cookie_header();
        Ok(Self {
            base_url: base_url.into(),
            auth,
            cookie_header,
            session: Mutex::new(None),
            req_counter: AtomicI64::new(REQ_COUNTER_STEP),
            http: builder.build()?,
        })
    }

    // ---------- Session tokens ----------

    /// Fetch fresh CSRF and session tokens from the homepage, replacing any
    /// cached pair.
    pub async fn refresh_tokens(&self) -> Result<()> {
        let state = self.with_retry(|| self.fetch_session()).await?;
        *self.session.lock().expect("session lock") = Some(state);
        Ok(())
    }

    async fn ensure_session(&self) -> Result<SessionState> {
        if let Some(state) = self.session.lock().expect("session lock").clone() {
            return Ok(state);
        }
        let state = self.with_retry(|| self.fetch_session()).await?;
        *self.session.lock().expect("session lock") = Some(state.clone());
        Ok(state)
    }

    fn invalidate_session(&self) {
        *self.session.lock().expect("session lock") = None;
    }

    async fn fetch_session(&self) -> Result<SessionState> {
        let response = self
            .http
            .get(&self.base_url)
            .header(reqwest::header::COOKIE, &self.cookie_header)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("homepage returned status {status}")));
        }
        if !status.is_success() {
            return Err(Error::Rpc(format!("homepage returned status {status}")));
        }

        let html = response.text().await?;
        Ok(SessionState {
            csrf_token: extract_csrf_token(&html)?.to_string(),
            session_id: extract_session_id(&html)?.to_string(),
        })
    }

    // ---------- RPC plumbing ----------

    async fn rpc_call(&self, method: &str, params: Value, source_path: &str) -> Result<Value> {
        let result = self
            .with_retry(|| self.do_rpc_call(method, &params, source_path))
            .await;
        if let Err(err) = &result {
            if err.is_auth_error() {
                self.invalidate_session();
            }
        }
        result
    }

    async fn do_rpc_call(&self, method: &str, params: &Value, source_path: &str) -> Result<Value> {
        let session = self.ensure_session().await?;

        let envelope = rpc::encode_rpc(method, params)?;
        let body = rpc::build_body(&envelope, &session.csrf_token)?;
        let url = rpc::build_batch_url(&self.base_url, method, &session.session_id, source_path);

        tracing::debug!(method, source_path, "RPC call");

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(reqwest::header::COOKIE, &self.cookie_header)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(Error::Auth(format!("status {}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(Error::Rpc(format!(
                "request failed with status {}",
                status.as_u16()
            )));
        }

        let text = response.text().await?;
        rpc::decode_response(&text, method)
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, error = %err, "transient failure, retrying");
                    tokio::time::sleep(RETRY_DELAY * attempt).await;
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.expect("at least one attempt"))
    }

    // ---------- Notebook operations ----------

    /// List all notebooks owned by the account.
    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        let params = json!([null, 1, null, [2]]);
        let result = self.rpc_call(rpc::methods::LIST_NOTEBOOKS, params, "/").await?;
        Ok(parse::parse_notebook_list(&result))
    }

    /// Create a notebook and return it with its server-assigned ID.
    pub async fn create_notebook(&self, title: &str) -> Result<Notebook> {
        let params = json!([title, null, null, [2], [1]]);
        let result = self.rpc_call(rpc::methods::CREATE_NOTEBOOK, params, "/").await?;
        parse::parse_notebook(&result)
    }

    /// Fetch a single notebook by ID.
    pub async fn get_notebook(&self, notebook_id: &str) -> Result<Notebook> {
        let result = self.get_notebook_raw(notebook_id).await?;
        let entry = result
            .get(0)
            .ok_or_else(|| Error::Parse("empty notebook response".into()))?;
        parse::parse_notebook(entry)
    }

    pub async fn rename_notebook(&self, notebook_id: &str, new_title: &str) -> Result<()> {
        let params = json!([notebook_id, new_title]);
        self.rpc_call(
            rpc::methods::RENAME_NOTEBOOK,
            params,
            &notebook_path(notebook_id),
        )
        .await?;
        Ok(())
    }

    pub async fn delete_notebook(&self, notebook_id: &str) -> Result<()> {
        let params = json!([[notebook_id]]);
        self.rpc_call(rpc::methods::DELETE_NOTEBOOK, params, "/").await?;
        Ok(())
    }

    async fn get_notebook_raw(&self, notebook_id: &str) -> Result<Value> {
        let params = json!([notebook_id, null, [2], null, 0]);
        self.rpc_call(
            rpc::methods::GET_NOTEBOOK,
            params,
            &notebook_path(notebook_id),
        )
        .await
    }

    // ---------- Source operations ----------

    /// List the sources of a notebook.
    pub async fn list_sources(&self, notebook_id: &str) -> Result<Vec<Source>> {
        let result = self.get_notebook_raw(notebook_id).await?;
        Ok(parse::parse_source_list(&result, notebook_id))
    }

    /// Add a URL source. YouTube video links get their own parameter shape;
    /// everything else goes through the generic one.
    pub async fn add_source_url(&self, notebook_id: &str, source_url: &str) -> Result<Source> {
        let params = add_source_url_params(notebook_id, source_url);
        let result = self
            .rpc_call(rpc::methods::ADD_SOURCE, params, &notebook_path(notebook_id))
            .await?;
        let mut source = parse::parse_source_added(&result, notebook_id, "")?;

        // The response often omits the URL; fall back to the caller's input.
        if source.url.is_none() {
            source.url = Some(source_url.to_string());
        }
        if is_youtube_video_url(source_url) {
            source.source_type = SourceType::Youtube;
        }
        Ok(source)
    }

    /// Add a pasted-text source.
    pub async fn add_source_text(
        &self,
        notebook_id: &str,
        title: &str,
        content: &str,
    ) -> Result<Source> {
        let params = json!([
            [[null, [title, content], null, null, null, null, null, null]],
            notebook_id,
            [2],
            null,
            null,
        ]);
        let result = self
            .rpc_call(rpc::methods::ADD_SOURCE, params, &notebook_path(notebook_id))
            .await?;
        parse::parse_source_added(&result, notebook_id, title)
    }

    /// Upload a local file as a source using the three-phase resumable
    /// protocol: register intent, initiate the upload, transfer the bytes.
    ///
    /// The server processes the content asynchronously; the returned source
    /// is in `processing` state.
    pub async fn add_source_file(&self, notebook_id: &str, file_path: &Path) -> Result<Source> {
        let metadata = tokio::fs::metadata(file_path).await?;
        if metadata.is_dir() {
            return Err(Error::Upload("path is a directory, not a file".into()));
        }
        let filename = file_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::Upload("file has no usable name".into()))?
            .to_string();

        let source_id = self.register_file_source(notebook_id, &filename).await?;
        let upload_url = self
            .start_resumable_upload(notebook_id, &filename, metadata.len(), &source_id)
            .await?;
        self.transfer_file(&upload_url, file_path).await?;

        Ok(Source {
            id: source_id,
            notebook_id: notebook_id.to_string(),
            title: filename,
            source_type: SourceType::File,
            url: None,
            status: SourceStatus::Processing,
        })
    }

    async fn register_file_source(&self, notebook_id: &str, filename: &str) -> Result<String> {
        let params = json!([
            [[filename]],
            notebook_id,
            [2],
            [1, null, null, null, null, null, null, null, null, null, [1]],
        ]);
        let result = self
            .rpc_call(
                rpc::methods::REGISTER_SOURCE_FILE,
                params,
                &notebook_path(notebook_id),
            )
            .await?;
        parse::find_uuid(&result)
            .map(str::to_string)
            .ok_or_else(|| Error::Upload("no source ID in register response".into()))
    }

    async fn start_resumable_upload(
        &self,
        notebook_id: &str,
        filename: &str,
        file_size: u64,
        source_id: &str,
    ) -> Result<String> {
        let url = rpc::build_upload_url(&self.base_url);
        let body = json!({
            "PROJECT_ID": notebook_id,
            "SOURCE_NAME": filename,
            "SOURCE_ID": source_id,
        })
        .to_string();

        let response = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(reqwest::header::COOKIE, &self.cookie_header)
            .header(reqwest::header::ORIGIN, self.origin())
            .header(reqwest::header::REFERER, &self.base_url)
            .header("x-goog-authuser", "0")
            .header("x-goog-upload-command", "start")
            .header("x-goog-upload-header-content-length", file_size.to_string())
            .header("x-goog-upload-protocol", "resumable")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        eprintln!("DEBUG start_resumable_upload status={} headers={:?}", status, response.headers());
        if !status.is_success() {
            return Err(Error::Upload(format!(
                "upload start failed with status {}",
                status.as_u16()
            )));
        }

        response
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| Error::Upload("no upload URL in response headers".into()))
    }

    async fn transfer_file(&self, upload_url: &str, file_path: &Path) -> Result<()> {
        let contents = tokio::fs::read(file_path).await?;
        eprintln!("DEBUG transfer_file posting to {}", upload_url);

        let req = self
            .http
            .post(upload_url)
            .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
            .header(reqwest::header::COOKIE, &self.cookie_header)
            .header(reqwest::header::ORIGIN, self.origin())
            .header(reqwest::header::REFERER, &self.base_url)
            .header("x-goog-authuser", "0")
            .header("x-goog-upload-command", "upload, finalize")
            .header("x-goog-upload-offset", "0")
            .body(contents)
            .build()?;
        eprintln!("DEBUG transfer_file req headers={:?}", req.headers());
        let response = self.http.execute(req).await?;

        let status = response.status();
        eprintln!("DEBUG transfer_file resp status={} url={} headers={:?}", status, response.url(), response.headers());
        if !status.is_success() {
            let excerpt: String = response
                .text()
                .await
                .unwrap_or_default()
                .chars()
                .take(200)
                .collect();
            return Err(Error::Upload(format!(
                "upload failed with status {}: {excerpt}",
                status.as_u16()
            )));
        }
        Ok(())
    }

    /// Delete a source from a notebook.
    pub async fn delete_source(&self, notebook_id: &str, source_id: &str) -> Result<()> {
        let params = json!([[[source_id]]]);
        self.rpc_call(
            rpc::methods::DELETE_SOURCE,
            params,
            &notebook_path(notebook_id),
        )
        .await?;
        Ok(())
    }

    /// Rename a source within a notebook.
    pub async fn rename_source(
        &self,
        notebook_id: &str,
        source_id: &str,
        new_title: &str,
    ) -> Result<()> {
        let params = json!([[[source_id]], new_title]);
        self.rpc_call(
            rpc::methods::RENAME_SOURCE,
            params,
            &notebook_path(notebook_id),
        )
        .await?;
        Ok(())
    }

    // ---------- Artifact operations ----------

    /// Submit audio overview generation. Returns a task handle to poll.
    pub async fn generate_audio(
        &self,
        notebook_id: &str,
        format: Option<AudioFormat>,
        length: Option<AudioLength>,
    ) -> Result<GenerationStatus> {
        let source_ids = self.get_source_ids(notebook_id).await?;
        if source_ids.is_empty() {
            return Err(Error::NoSources);
        }

        // The same ID list rides twice in different nesting depths.
        let triple: Vec<Value> = source_ids.iter().map(|id| json!([[id]])).collect();
        let double: Vec<Value> = source_ids.iter().map(|id| json!([id])).collect();
        let format_code = format.map(|f| f.code());
        let length_code = length.map(|l| l.code());

        // Content type 1 (audio) disambiguates this submit from video on
        // the shared generation RPC.
        let params = json!([
            [2],
            notebook_id,
            [
                null,
                null,
                1,
                triple,
                null,
                null,
                [null, [null, length_code, null, double, "en", null, format_code]],
            ],
        ]);

        let result = self
            .rpc_call(
                rpc::methods::CREATE_ARTIFACT,
                params,
                &notebook_path(notebook_id),
            )
            .await?;
        parse::parse_generation_status(&result)
    }

    /// Submit video overview generation. Returns a task handle to poll.
    pub async fn generate_video(
        &self,
        notebook_id: &str,
        format: VideoFormat,
        style: VideoStyle,
    ) -> Result<GenerationStatus> {
        let params = json!([notebook_id, [format.code(), style.code()], [2]]);
        let result = self
            .rpc_call(
                rpc::methods::CREATE_ARTIFACT,
                params,
                &notebook_path(notebook_id),
            )
            .await?;
        parse::parse_generation_status(&result)
    }

    /// Poll the status of a generation task. A null server response means
    /// still pending.
    pub async fn poll_generation(
        &self,
        notebook_id: &str,
        task_id: &str,
    ) -> Result<GenerationStatus> {
        let params = json!([task_id, notebook_id, [2]]);
        let result = self
            .rpc_call(
                rpc::methods::LIST_ARTIFACTS,
                params,
                &notebook_path(notebook_id),
            )
            .await?;
        Ok(parse::parse_poll_status(&result, task_id))
    }

    /// List the generated artifacts of a notebook (suggested ones excluded).
    pub async fn list_artifacts(&self, notebook_id: &str) -> Result<Vec<Artifact>> {
        let params = json!([
            [2],
            notebook_id,
            "NOT artifact.status = \"ARTIFACT_STATUS_SUGGESTED\"",
        ]);
        let result = self
            .rpc_call(
                rpc::methods::LIST_ARTIFACTS,
                params,
                &notebook_path(notebook_id),
            )
            .await?;
        Ok(parse::parse_artifact_list(&result))
    }

    /// Delete an artifact from a notebook.
    pub async fn delete_artifact(&self, notebook_id: &str, artifact_id: &str) -> Result<()> {
        let params = json!([[artifact_id]]);
        self.rpc_call(
            rpc::methods::DELETE_ARTIFACT,
            params,
            &notebook_path(notebook_id),
        )
        .await?;
        Ok(())
    }

    /// Download the most recent completed audio artifact (or a specific one
    /// by ID) to `output_path`.
    pub async fn download_audio(
        &self,
        notebook_id: &str,
        output_path: &Path,
        artifact_id: Option<&str>,
    ) -> Result<()> {
        self.download_artifact(notebook_id, ArtifactType::Audio, output_path, artifact_id)
            .await
    }

    /// Download the most recent completed video artifact (or a specific one
    /// by ID) to `output_path`.
    pub async fn download_video(
        &self,
        notebook_id: &str,
        output_path: &Path,
        artifact_id: Option<&str>,
    ) -> Result<()> {
        self.download_artifact(notebook_id, ArtifactType::Video, output_path, artifact_id)
            .await
    }

    async fn download_artifact(
        &self,
        notebook_id: &str,
        artifact_type: ArtifactType,
        output_path: &Path,
        artifact_id: Option<&str>,
    ) -> Result<()> {
        let artifacts = self.list_artifacts(notebook_id).await?;
        let artifact = artifacts
            .iter()
            .find(|a| {
                a.artifact_type == artifact_type
                    && a.status == "completed"
                    && artifact_id.map(|id| a.id == id).unwrap_or(true)
            })
            .ok_or_else(|| {
                Error::Parse(format!(
                    "no completed {} artifact found",
                    if artifact_type == ArtifactType::Audio { "audio" } else { "video" }
                ))
            })?;
        let download_url = artifact
            .download_url
            .as_deref()
            .ok_or_else(|| Error::Parse("artifact has no download URL".into()))?;

        self.download_file(download_url, output_path).await
    }

    /// Fetch a completed artifact, following cross-domain redirects with a
    /// domain-scoped cookie jar. The static `Cookie` header alone is not
    /// enough: the CDN hop lands on a different domain, and only a jar keyed
    /// by cookie domain survives the redirect.
    async fn download_file(&self, download_url: &str, output_path: &Path) -> Result<()> {
        let jar = reqwest::cookie::Jar::default();
        for cookie in &self.auth.cookies_with_domain {
            let host = cookie.domain.trim_start_matches('.');
            if host.is_empty() {
                continue;
            }
            if let Ok(scope) = format!("https://{host}/").parse::<reqwest::Url>() {
                jar.add_cookie_str(
                    &format!(
                        "{}={}; Domain={}; Path=/",
                        cookie.name, cookie.value, cookie.domain
                    ),
                    &scope,
                );
            }
        }

        let download_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_provider(Arc::new(jar))
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        eprintln!("DEBUG download_file url={}", download_url);
        let response = download_client
            .get(download_url)
            .header(reqwest::header::USER_AGENT, DOWNLOAD_USER_AGENT)
            .header(reqwest::header::COOKIE, &self.cookie_header)
            .send()
            .await?;

        let status = response.status();
        eprintln!("DEBUG download_file status={} headers={:?}", status, response.headers());
        if !status.is_success() {
            return Err(Error::Rpc(format!(
                "download failed with status {}",
                status.as_u16()
            )));
        }

        // An HTML body means the service bounced us to a sign-in page.
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if content_type.contains("text/html") {
            return Err(Error::HtmlDownload);
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(output_path, &bytes).await?;
        Ok(())
    }

    // ---------- Chat operations ----------

    /// Ask a question against the notebook's sources. When `source_ids` is
    /// empty the full source list of the notebook is used.
    pub async fn ask(
        &self,
        notebook_id: &str,
        question: &str,
        source_ids: &[String],
    ) -> Result<AskResult> {
        let session = self.ensure_session().await?;

        let source_ids = if source_ids.is_empty() {
            self.get_source_ids(notebook_id).await?
        } else {
            source_ids.to_vec()
        };
        if source_ids.is_empty() {
            return Err(Error::NoSources);
        }

        let conversation_id = uuid::Uuid::new_v4().to_string();
        let body = rpc::encode_chat_body(question, &source_ids, &conversation_id, None)?;
        let req_id = self.req_counter.fetch_add(REQ_COUNTER_STEP, Ordering::SeqCst)
            + REQ_COUNTER_STEP;
        let url = rpc::build_chat_url(&self.base_url, &session.session_id, req_id);

        let text = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .header(reqwest::header::CONTENT_TYPE, FORM_CONTENT_TYPE)
                    .header(reqwest::header::COOKIE, &self.cookie_header)
                    .body(body.clone())
                    .send()
                    .await?;

                let status = response.status();
                if status == reqwest::StatusCode::UNAUTHORIZED
                    || status == reqwest::StatusCode::FORBIDDEN
                {
                    return Err(Error::Auth(format!("status {}", status.as_u16())));
                }
                if !status.is_success() {
                    let excerpt: String = response
                        .text()
                        .await
                        .unwrap_or_default()
                        .chars()
                        .take(200)
                        .collect();
                    return Err(Error::Rpc(format!(
                        "chat request failed with status {}: {excerpt}",
                        status.as_u16()
                    )));
                }
                Ok(response.text().await?)
            })
            .await?;

        let answer = rpc::parse_chat_answer(&text)?;
        Ok(AskResult {
            answer,
            conversation_id,
            turn_number: 1,
        })
    }

    /// Extract the source IDs of a notebook from the get-notebook response.
    async fn get_source_ids(&self, notebook_id: &str) -> Result<Vec<String>> {
        let result = self.get_notebook_raw(notebook_id).await?;
        let Some(entries) = result
            .get(0)
            .and_then(|v| v.get(1))
            .and_then(Value::as_array)
        else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .filter_map(|entry| parse::find_uuid(entry))
            .map(str::to_string)
            .collect())
    }

    fn origin(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

fn notebook_path(notebook_id: &str) -> String {
    format!("/notebook/{notebook_id}")
}

/// Parameter shapes for add-source-by-URL. YouTube video links place the
/// URL at nested position 7 with a trailing-flag array; everything else
/// places it at nested position 2.
fn add_source_url_params(notebook_id: &str, source_url: &str) -> Value {
    if is_youtube_video_url(source_url) {
        json!([
            [[null, null, null, null, null, null, null, [source_url], null, null, 1]],
            notebook_id,
            [2],
            [1, null, null, null, null, null, null, null, null, null, [1]]
        ])
    } else {
        json!([
            [[null, null, [source_url], null, null, null, null, null]],
            notebook_id,
            [2],
            null,
            null
        ])
    }
}

/// YouTube video links get a dedicated add-source parameter shape; channel
/// and playlist URLs go through the generic form.
fn is_youtube_video_url(url: &str) -> bool {
    url.contains("youtube.com/watch") || url.contains("youtu.be/") || url.contains("youtube.com/shorts/")
}

fn proxy_from_env() -> Option<String> {
    std::env::var("HTTPS_PROXY")
        .or_else(|_| std::env::var("HTTP_PROXY"))
        .ok()
        .filter(|v| !v.is_empty())
}

/// Extract the per-session CSRF token from homepage HTML.
pub(crate) fn extract_csrf_token(html: &str) -> Result<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#""SNlM0e"\s*:\s*"([^"]+)""#).expect("static regex compiles")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(Error::TokenMissing("CSRF token"))
}

/// Extract the per-session routing ID from homepage HTML.
pub(crate) fn extract_session_id(html: &str) -> Result<&str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#""FdrFJe"\s*:\s*"([^"]+)""#).expect("static regex compiles")
    });
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .ok_or(Error::TokenMissing("session ID"))
}
