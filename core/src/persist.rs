//! JSON files around the engine: `config.json` and `requests.json` in, `answers.json` out.

use crate::{DocId, RelativeIndex};
use anyhow::{bail, Context, Result};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};

pub const CONFIG_VERSION: &str = "0.1";
pub const DEFAULT_MAX_RESPONSES: usize = 5;

#[derive(Debug, Clone)]
pub struct WorkspacePaths {
    pub root: PathBuf,
}

impl WorkspacePaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn config(&self) -> PathBuf { self.root.join("config.json") }
    pub fn requests(&self) -> PathBuf { self.root.join("requests.json") }
    pub fn answers(&self) -> PathBuf { self.root.join("answers.json") }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    config: Option<EngineSection>,
    files: Option<Vec<PathBuf>>,
}

#[derive(Debug, Deserialize)]
struct EngineSection {
    name: Option<String>,
    version: Option<String>,
    max_responses: Option<usize>,
}

/// Validated contents of `config.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub name: Option<String>,
    pub max_responses: usize,
    /// Document files in `doc_id` order, resolved against the workspace root.
    pub files: Vec<PathBuf>,
}

pub fn load_config(paths: &WorkspacePaths) -> Result<Config> {
    let path = paths.config();
    let text = fs::read_to_string(&path)
        .with_context(|| format!("config file is missing: {}", path.display()))?;
    let raw: ConfigFile = serde_json::from_str(&text)
        .with_context(|| format!("config file is not valid JSON: {}", path.display()))?;

    let Some(section) = raw.config else {
        bail!("config file is empty: no 'config' section in {}", path.display());
    };
    if let Some(version) = &section.version {
        if version != CONFIG_VERSION {
            bail!("config.json has incorrect file version: {version} (expected {CONFIG_VERSION})");
        }
    }
    let max_responses = section.max_responses.unwrap_or(DEFAULT_MAX_RESPONSES);
    if max_responses == 0 {
        bail!("config.json: max_responses must be positive");
    }

    let files = match raw.files {
        Some(files) => files
            .into_iter()
            .map(|f| if f.is_absolute() { f } else { paths.root.join(f) })
            .collect(),
        None => {
            tracing::warn!(config = %path.display(), "no 'files' section in config.json");
            Vec::new()
        }
    };

    Ok(Config { name: section.name, max_responses, files })
}

/// Read every configured file in order.
///
/// A file that cannot be read is logged and replaced by an empty document, so the
/// position of every other file is still its `doc_id`.
pub fn load_documents(config: &Config) -> Vec<String> {
    config
        .files
        .iter()
        .map(|file| match fs::read_to_string(file) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(file = %file.display(), error = %err, "cannot read document, indexing it as empty");
                String::new()
            }
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct RequestsFile {
    #[serde(default)]
    requests: Vec<String>,
}

pub fn load_requests(paths: &WorkspacePaths) -> Result<Vec<String>> {
    let path = paths.requests();
    let text = fs::read_to_string(&path)
        .with_context(|| format!("requests.json file is missing: {}", path.display()))?;
    let raw: RequestsFile = serde_json::from_str(&text)
        .with_context(|| format!("requests file is not valid JSON: {}", path.display()))?;
    Ok(raw.requests)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relevance {
    pub docid: DocId,
    pub rank: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// `"true"` when at least one document matched.
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance: Option<Vec<Relevance>>,
}

impl Answer {
    pub fn from_ranked(ranked: &[RelativeIndex]) -> Self {
        if ranked.is_empty() {
            return Self { result: "false".into(), relevance: None };
        }
        let relevance = ranked
            .iter()
            .map(|r| Relevance { docid: r.doc_id, rank: r.rank })
            .collect();
        Self { result: "true".into(), relevance: Some(relevance) }
    }
}

/// Answers keyed by request id, serialized in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct Answers(pub Vec<(String, Answer)>);

impl Answers {
    pub fn from_results(results: &[Vec<RelativeIndex>]) -> Self {
        Self(
            results
                .iter()
                .enumerate()
                .map(|(i, ranked)| (request_id(i + 1), Answer::from_ranked(ranked)))
                .collect(),
        )
    }
}

impl Serialize for Answers {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, answer) in &self.0 {
            map.serialize_entry(id, answer)?;
        }
        map.end()
    }
}

#[derive(Serialize)]
struct AnswersFile<'a> {
    answers: &'a Answers,
}

/// `request001` for the first request; numbers past 999 are not padded.
pub fn request_id(number: usize) -> String {
    format!("request{number:03}")
}

/// Keep at most `max_responses` documents per query.
pub fn truncate_answers(results: Vec<Vec<RelativeIndex>>, max_responses: usize) -> Vec<Vec<RelativeIndex>> {
    results
        .into_iter()
        .map(|mut ranked| {
            ranked.truncate(max_responses);
            ranked
        })
        .collect()
}

pub fn save_answers(paths: &WorkspacePaths, results: &[Vec<RelativeIndex>]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let answers = Answers::from_results(results);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    AnswersFile { answers: &answers }.serialize(&mut ser)?;
    let path = paths.answers();
    fs::write(&path, buf).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(())
}
