//! Prompt records from a git checkout.
//!
//! ## Layout
//!
//! ```text
//! <checkout>/prompts/<feature>/<version>/<model>.json   metadata
//! <checkout>/prompts/<feature>/<version>/<model>.md     prompt text
//! ```
//!
//! Each metadata file becomes one record: its JSON fields, plus `prompts`
//! (the markdown text), `parameters` re-encoded as a JSON string, and
//! `id = "{feature}--{model, dots as dashes}--{version}"`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{Map, Value};

use remsync_core::config::DEFAULT_CLONE_TIMEOUT_SECS;
use remsync_core::{Record, SyncConfig, TransportError};
use remsync_sync::RecordSource;

use crate::error::{io_err, RemoteError};

const PROMPTS_DIR: &str = "prompts";
const CHECKOUT_DIR: &str = "checkout";
const CLONE_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ---------------------------------------------------------------------------
// Directory source
// ---------------------------------------------------------------------------

/// Reads prompt records from an existing checkout on disk.
pub struct DirectorySource {
    root: PathBuf,
    label: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let label = root.display().to_string();
        Self { root, label }
    }
}

impl RecordSource for DirectorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn fetch_records(&self) -> Result<Vec<Record>, TransportError> {
        Ok(collect_prompt_records(&self.root.join(PROMPTS_DIR))?)
    }
}

// ---------------------------------------------------------------------------
// Git source
// ---------------------------------------------------------------------------

/// Shallow-clones the prompts repository into a temp dir and reads it.
///
/// The temp dir is removed when the fetch returns, success or not.
pub struct GitSource {
    repo: String,
    branch: String,
    token: Option<String>,
    timeout: Duration,
}

impl GitSource {
    pub fn new(repo: impl Into<String>, branch: impl Into<String>, token: Option<String>) -> Self {
        Self {
            repo: repo.into(),
            branch: branch.into(),
            token,
            timeout: Duration::from_secs(DEFAULT_CLONE_TIMEOUT_SECS),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.source_repo.clone(),
            config.source_branch.clone(),
            config.git_token.clone(),
        )
        .with_timeout(Duration::from_secs(config.clone_timeout_secs))
    }

    /// Kill the clone if it has not finished after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clone URL with the token as userinfo: `https://<token>@host/...`.
    pub fn authenticated_url(&self) -> Result<String, RemoteError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| RemoteError::MissingGitToken(self.repo.clone()))?;
        Ok(match self.repo.strip_prefix("https://") {
            Some(rest) => format!("https://{token}@{rest}"),
            None => self.repo.clone(),
        })
    }

    /// `git clone --depth 1 --branch <branch>` into `dest`.
    pub fn clone_into(&self, dest: &Path) -> Result<(), RemoteError> {
        let url = self.authenticated_url()?;
        tracing::info!("cloning {} ({})", self.repo, self.branch);

        let mut command = Command::new("git");
        command
            .args(["clone", "--quiet", "--depth", "1", "--branch", &self.branch])
            .arg(&url)
            .arg(dest);
        let Some(output) = wait_with_deadline(command, self.timeout).map_err(|e| io_err(dest, e))?
        else {
            return Err(RemoteError::GitTimeout {
                repo: self.repo.clone(),
                secs: self.timeout.as_secs(),
            });
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RemoteError::Git {
                repo: self.repo.clone(),
                stderr: self.redact(stderr.trim()),
            });
        }
        tracing::info!("repository cloned");
        Ok(())
    }

    fn redact(&self, text: &str) -> String {
        match self.token.as_deref() {
            Some(token) if !token.is_empty() => text.replace(token, "***"),
            _ => text.to_string(),
        }
    }

    fn fetch(&self) -> Result<Vec<Record>, RemoteError> {
        let workdir = tempfile::Builder::new()
            .prefix("prompts_")
            .tempdir()
            .map_err(|e| io_err(std::env::temp_dir(), e))?;
        let checkout = workdir.path().join(CHECKOUT_DIR);
        self.clone_into(&checkout)?;
        let records = collect_prompt_records(&checkout.join(PROMPTS_DIR));
        tracing::debug!("removing {}", workdir.path().display());
        records
    }
}

/// Run `command` to completion, or kill it once `timeout` has passed.
///
/// `None` means the deadline hit. Stdout is discarded; stderr is captured.
fn wait_with_deadline(mut command: Command, timeout: Duration) -> io::Result<Option<Output>> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .spawn()?;
    let deadline = Instant::now() + timeout;
    loop {
        if child.try_wait()?.is_some() {
            return child.wait_with_output().map(Some);
        }
        if Instant::now() >= deadline {
            tracing::warn!("killing process {} after {:?}", child.id(), timeout);
            let _ = child.kill();
            child.wait()?;
            return Ok(None);
        }
        thread::sleep(CLONE_POLL_INTERVAL);
    }
}

impl RecordSource for GitSource {
    fn label(&self) -> &str {
        &self.repo
    }

    fn fetch_records(&self) -> Result<Vec<Record>, TransportError> {
        Ok(self.fetch()?)
    }
}

// ---------------------------------------------------------------------------
// Prompt collection
// ---------------------------------------------------------------------------

/// Walk `<prompts_dir>/<feature>/<version>/*.json` in name order.
pub fn collect_prompt_records(prompts_dir: &Path) -> Result<Vec<Record>, RemoteError> {
    if !prompts_dir.is_dir() {
        return Err(RemoteError::PromptsDirNotFound(prompts_dir.to_path_buf()));
    }

    let mut records = Vec::new();
    for feature_dir in sorted_entries(prompts_dir)?.into_iter().filter(|p| p.is_dir()) {
        for version_dir in sorted_entries(&feature_dir)?.into_iter().filter(|p| p.is_dir()) {
            for file in sorted_entries(&version_dir)? {
                if file.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let Some(model) = file.file_stem().and_then(|s| s.to_str()) else {
                    continue;
                };
                records.push(prompt_record(&version_dir, model)?);
            }
        }
    }
    tracing::info!("found {} prompt records", records.len());
    Ok(records)
}

/// Build the record for `<version_dir>/<model>.json` + `<model>.md`.
pub fn prompt_record(version_dir: &Path, model: &str) -> Result<Record, RemoteError> {
    let meta_path = version_dir.join(format!("{model}.json"));
    let text_path = version_dir.join(format!("{model}.md"));

    let raw = fs::read_to_string(&meta_path).map_err(|e| io_err(&meta_path, e))?;
    let mut data: Map<String, Value> =
        serde_json::from_str(&raw).map_err(|source| RemoteError::PromptJson {
            path: meta_path.clone(),
            source,
        })?;
    let prompt = fs::read_to_string(&text_path).map_err(|e| io_err(&text_path, e))?;

    let feature = string_field(&data, "feature", &meta_path)?;
    let model_name = string_field(&data, "model", &meta_path)?;
    let version = version_dir
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let id = format!("{feature}--{}--{version}", model_name.replace('.', "-"));

    let parameters = data.get("parameters").cloned().unwrap_or(Value::Null);
    data.insert("prompts".into(), Value::String(prompt));
    data.insert("parameters".into(), Value::String(python_json(&parameters)?));

    Ok(Record::new(id, data))
}

fn string_field(
    data: &Map<String, Value>,
    field: &'static str,
    path: &Path,
) -> Result<String, RemoteError> {
    data.get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| RemoteError::PromptField {
            path: path.to_path_buf(),
            field,
        })
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, RemoteError> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .collect();
    entries.sort();
    Ok(entries)
}

// ---------------------------------------------------------------------------
// Python-compatible JSON encoding
// ---------------------------------------------------------------------------

/// Encode like Python's `json.dumps` defaults: `", "` and `": "` separators,
/// non-ASCII escaped as `\uXXXX`, floats as `repr`, keys in input order.
/// Records already in the collection carry `parameters` in this form, so
/// matching it keeps unchanged prompts no-ops.
pub fn python_json(value: &Value) -> Result<String, RemoteError> {
    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, PythonFormatter);
    value.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

struct PythonFormatter;

impl serde_json::ser::Formatter for PythonFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn write_f64<W: ?Sized + io::Write>(&mut self, writer: &mut W, value: f64) -> io::Result<()> {
        writer.write_all(python_float(value).as_bytes())
    }

    fn write_string_fragment<W: ?Sized + io::Write>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()> {
        for ch in fragment.chars() {
            if ch.is_ascii() && ch != '\u{7f}' {
                writer.write_all(&[ch as u8])?;
            } else {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{unit:04x}")?;
                }
            }
        }
        Ok(())
    }
}

/// Python's float `repr`: positional for exponents in `-4..16`, otherwise
/// scientific with a signed, two-digit-minimum exponent (`1e-07`, `1e+16`).
fn python_float(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    let shortest = format!("{value:e}");
    let (mantissa, exp) = shortest.split_once('e').unwrap_or((&shortest, "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits = mantissa.replace('.', "");

    if (-4..16).contains(&exp) {
        if exp < 0 {
            let zeros = "0".repeat((-exp - 1) as usize);
            return format!("{sign}0.{zeros}{digits}");
        }
        let whole = exp as usize + 1;
        if digits.len() <= whole {
            let zeros = "0".repeat(whole - digits.len());
            format!("{sign}{digits}{zeros}.0")
        } else {
            format!("{sign}{}.{}", &digits[..whole], &digits[whole..])
        }
    } else {
        let exp_sign = if exp < 0 { '-' } else { '+' };
        format!("{sign}{mantissa}e{exp_sign}{:02}", exp.abs())
    }
}
