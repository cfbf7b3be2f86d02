use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use search_core::persist::{
    load_config, load_documents, load_requests, save_answers, truncate_answers, WorkspacePaths,
};
use search_core::{InvertedIndex, RelativeIndex, SearchServer};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "search")]
#[command(about = "Index a document collection and answer conjunctive queries", long_about = None)]
struct Cli {
    /// Worker threads for indexing and search (defaults to one per core)
    #[arg(long, global = true)]
    threads: Option<usize>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer every request in requests.json and write answers.json
    Run {
        /// Directory holding config.json and requests.json
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Answer ad-hoc queries and print the ranked documents as JSON
    Query {
        /// Directory holding config.json
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Documents per query (defaults to max_responses from config.json)
        #[arg(long)]
        limit: Option<usize>,
        #[arg(required = true)]
        queries: Vec<String>,
    },
}

#[derive(Serialize)]
struct QueryOutput<'a> {
    query: &'a str,
    results: Vec<RelativeIndex>,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("cannot configure worker threads")?;
    }

    match cli.command {
        Commands::Run { dir } => run_batch(&dir),
        Commands::Query { dir, limit, queries } => {
            let json = answer_queries(&dir, &queries, limit)?;
            println!("{json}");
            Ok(())
        }
    }
}

/// Build the index from the configured files and return it with the per-query limit.
fn build_index(paths: &WorkspacePaths) -> Result<(InvertedIndex, usize)> {
    let config = load_config(paths)?;
    tracing::info!(
        name = config.name.as_deref().unwrap_or("search"),
        files = config.files.len(),
        "config loaded"
    );

    let start = Instant::now();
    let index = InvertedIndex::new();
    index.build(load_documents(&config))?;
    tracing::info!(
        num_docs = index.document_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "documents indexed"
    );
    Ok((index, config.max_responses))
}

fn run_batch(dir: &Path) -> Result<()> {
    let start = Instant::now();
    let paths = WorkspacePaths::new(dir);
    let (index, max_responses) = build_index(&paths)?;

    let requests = load_requests(&paths)?;
    let queries_start = Instant::now();
    let results = SearchServer::new(&index).search(&requests);
    tracing::info!(
        num_requests = requests.len(),
        elapsed_ms = queries_start.elapsed().as_millis() as u64,
        "requests processed"
    );

    save_answers(&paths, &truncate_answers(results, max_responses))?;
    tracing::info!(
        answers = %paths.answers().display(),
        total_ms = start.elapsed().as_millis() as u64,
        "answers saved"
    );
    Ok(())
}

fn answer_queries(dir: &Path, queries: &[String], limit: Option<usize>) -> Result<String> {
    let paths = WorkspacePaths::new(dir);
    let (index, max_responses) = build_index(&paths)?;
    let results = truncate_answers(
        SearchServer::new(&index).search(queries),
        limit.unwrap_or(max_responses),
    );
    let output: Vec<QueryOutput> = queries
        .iter()
        .zip(results)
        .map(|(query, results)| QueryOutput { query, results })
        .collect();
    Ok(serde_json::to_string_pretty(&output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use std::fs;
    use tempfile::tempdir;

    fn workspace(max_responses: usize) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        let docs = [
            "milk milk milk milk water water water",
            "milk water water",
            "milk milk milk milk milk water water water water water",
            "americano cappuccino",
        ];
        let mut files = Vec::new();
        for (i, text) in docs.iter().enumerate() {
            let name = format!("file{:03}.txt", i + 1);
            fs::write(dir.path().join(&name), text).unwrap();
            files.push(name);
        }
        let config = serde_json::json!({
            "config": { "name": "test", "version": "0.1", "max_responses": max_responses },
            "files": files,
        });
        fs::write(dir.path().join("config.json"), config.to_string()).unwrap();
        fs::write(
            dir.path().join("requests.json"),
            r#"{ "requests": ["milk water", "sugar", "Cappuccino"] }"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn run_writes_truncated_answers() {
        let dir = workspace(2);
        run_batch(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join("answers.json")).unwrap();
        let json: Value = serde_json::from_str(&raw).unwrap();
        let first = json["answers"]["request001"]["relevance"].as_array().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0]["docid"], 2);
        assert_eq!(first[1]["docid"], 0);
        assert_eq!(json["answers"]["request002"]["result"], "false");
        assert_eq!(json["answers"]["request003"]["relevance"][0]["docid"], 3);
    }

    #[test]
    fn run_fails_without_requests() {
        let dir = workspace(5);
        fs::remove_file(dir.path().join("requests.json")).unwrap();
        let err = run_batch(dir.path()).unwrap_err();
        assert!(err.to_string().contains("requests.json file is missing"));
    }

    #[test]
    fn run_fails_on_empty_collection() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("config.json"), r#"{ "config": { "name": "x" }, "files": [] }"#)
            .unwrap();
        assert!(run_batch(dir.path()).is_err());
    }

    #[test]
    fn query_prints_ranked_json() {
        let dir = workspace(5);
        let json = answer_queries(dir.path(), &["water milk".to_string()], Some(1)).unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value[0]["query"], "water milk");
        let results = value[0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["doc_id"], 2);
        assert_eq!(results[0]["rank"], 1.0);
    }
}
