//! Batch-loop behavior against a scripted endpoint: retries, abandonment,
//! resume correctness, label enrichment. No network involved.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use alignbench_extract::{SplitWriter, StatementFilter, WriteMode};
use alignbench_fetch::{
    enrich_with_labels, BatchState, FetchConfig, FetchError, Fetcher, JsonFileCache, KbNamespace,
    LabelCache, LabelEntry, RetryPolicy, SparqlEndpoint,
};

const ENDPOINT: &str = "https://kb.example/sparql";

struct ScriptedEndpoint {
    construct_replies: RefCell<VecDeque<Result<String, FetchError>>>,
    select_replies: RefCell<VecDeque<Result<serde_json::Value, FetchError>>>,
    queries: RefCell<Vec<String>>,
}

impl ScriptedEndpoint {
    fn new() -> Self {
        Self {
            construct_replies: RefCell::new(VecDeque::new()),
            select_replies: RefCell::new(VecDeque::new()),
            queries: RefCell::new(Vec::new()),
        }
    }

    fn push_construct(&self, reply: Result<String, FetchError>) {
        self.construct_replies.borrow_mut().push_back(reply);
    }

    fn push_select(&self, reply: Result<serde_json::Value, FetchError>) {
        self.select_replies.borrow_mut().push_back(reply);
    }

    fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }
}

impl SparqlEndpoint for ScriptedEndpoint {
    fn construct(&self, query: &str) -> Result<String, FetchError> {
        self.queries.borrow_mut().push(query.to_string());
        self.construct_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted reply".into())))
    }

    fn select(&self, query: &str) -> Result<serde_json::Value, FetchError> {
        self.queries.borrow_mut().push(query.to_string());
        self.select_replies
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Transport("no scripted reply".into())))
    }
}

fn config() -> FetchConfig {
    let mut config = FetchConfig::new(ENDPOINT);
    config.batch_size = 1;
    config.min_delay = Duration::ZERO;
    config
}

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| format!("<http://kb/{n}>")).collect()
}

/// One attribute line and one relational line per entity.
fn reply_for(name: &str) -> String {
    format!(
        "<http://kb/{name}> <http://kb/name> \"{name}\"@en .\n\
         <http://kb/{name}> <http://kb/rel> <http://kb/other> .\n"
    )
}

fn run_fetch(
    endpoint: &ScriptedEndpoint,
    identifiers: &[String],
    dir: &Path,
    state_path: Option<&Path>,
    resume: bool,
    retry: RetryPolicy,
) -> anyhow::Result<alignbench_fetch::FetchStats> {
    let fetcher = Fetcher::new(config(), retry, StatementFilter::default())?;
    let mode = if resume {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let mut out = SplitWriter::open(&dir.join("attr"), &dir.join("rel"), mode)?;
    fetcher.run(endpoint, identifiers, &mut out, state_path, resume)
}

#[test]
fn fresh_run_fetches_every_batch_and_clears_state() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join(".state.json");
    let endpoint = ScriptedEndpoint::new();
    endpoint.push_construct(Ok(reply_for("a")));
    endpoint.push_construct(Ok(reply_for("b")));

    let stats = run_fetch(
        &endpoint,
        &ids(&["a", "b"]),
        dir.path(),
        Some(&state_path),
        false,
        RetryPolicy::immediate(0),
    )
    .unwrap();

    assert_eq!(stats.batches, 2);
    assert_eq!(stats.completed, 2);
    assert_eq!(stats.abandoned, 0);
    assert_eq!(stats.attribute_lines, 2);
    assert_eq!(stats.relational_lines, 2);

    let attr = std::fs::read_to_string(dir.path().join("attr")).unwrap();
    assert_eq!(
        attr,
        "<http://kb/a>\t<http://kb/name>\t\"a\"\n<http://kb/b>\t<http://kb/name>\t\"b\"\n"
    );
    // All batches attempted: the checkpoint is gone.
    assert!(!state_path.exists());
}

#[test]
fn transient_failure_is_retried_until_success() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = ScriptedEndpoint::new();
    endpoint.push_construct(Err(FetchError::Status(503)));
    endpoint.push_construct(Ok(reply_for("a")));

    let stats = run_fetch(
        &endpoint,
        &ids(&["a"]),
        dir.path(),
        None,
        false,
        RetryPolicy::immediate(2),
    )
    .unwrap();

    assert_eq!(stats.completed, 1);
    assert_eq!(endpoint.queries().len(), 2);
    let attr = std::fs::read_to_string(dir.path().join("attr")).unwrap();
    assert!(attr.contains("\"a\""));
}

#[test]
fn exhausted_retries_abandon_the_batch_and_continue() {
    let dir = tempfile::tempdir().unwrap();
    let endpoint = ScriptedEndpoint::new();
    // Batch 1 fails the initial attempt and the single retry.
    endpoint.push_construct(Err(FetchError::Transport("connection reset".into())));
    endpoint.push_construct(Err(FetchError::Status(500)));
    endpoint.push_construct(Ok(reply_for("b")));

    let stats = run_fetch(
        &endpoint,
        &ids(&["a", "b"]),
        dir.path(),
        None,
        false,
        RetryPolicy::immediate(1),
    )
    .unwrap();

    assert_eq!(stats.completed, 1);
    assert_eq!(stats.abandoned, 1);
    let attr = std::fs::read_to_string(dir.path().join("attr")).unwrap();
    assert!(!attr.contains("\"a\""));
    assert!(attr.contains("\"b\""));
}

#[test]
fn resumed_run_skips_completed_batches_and_matches_uninterrupted_output() {
    let identifiers = ids(&["a", "b", "c", "d"]);

    // Reference: one uninterrupted run over all four batches.
    let full_dir = tempfile::tempdir().unwrap();
    let endpoint = ScriptedEndpoint::new();
    for name in ["a", "b", "c", "d"] {
        endpoint.push_construct(Ok(reply_for(name)));
    }
    run_fetch(
        &endpoint,
        &identifiers,
        full_dir.path(),
        None,
        false,
        RetryPolicy::immediate(0),
    )
    .unwrap();
    let full_attr = std::fs::read_to_string(full_dir.path().join("attr")).unwrap();
    let full_rel = std::fs::read_to_string(full_dir.path().join("rel")).unwrap();

    // Interrupted: the process died after batch 2 completed, leaving the
    // checkpoint and the partial outputs behind.
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join(".state.json");
    let mut state = BatchState::new(1, identifiers.len(), "en", ENDPOINT);
    state.completed_batches.insert(1);
    state.completed_batches.insert(2);
    state.save(&state_path).unwrap();
    {
        let mut out = SplitWriter::open(
            &dir.path().join("attr"),
            &dir.path().join("rel"),
            WriteMode::Truncate,
        )
        .unwrap();
        for name in ["a", "b"] {
            for line in reply_for(name).lines() {
                let stmt = alignbench_rdf::parse_statement(line).unwrap();
                let routed = StatementFilter::default().route(&stmt).unwrap();
                out.write(&routed).unwrap();
            }
        }
        out.flush().unwrap();
    }

    let endpoint = ScriptedEndpoint::new();
    endpoint.push_construct(Ok(reply_for("c")));
    endpoint.push_construct(Ok(reply_for("d")));

    let stats = run_fetch(
        &endpoint,
        &identifiers,
        dir.path(),
        Some(&state_path),
        true,
        RetryPolicy::immediate(0),
    )
    .unwrap();

    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.completed, 2);
    // Completed batches are never reissued.
    for query in endpoint.queries() {
        assert!(!query.contains("<http://kb/a>"));
        assert!(!query.contains("<http://kb/b>"));
    }

    let attr = std::fs::read_to_string(dir.path().join("attr")).unwrap();
    let rel = std::fs::read_to_string(dir.path().join("rel")).unwrap();
    assert_eq!(attr, full_attr);
    assert_eq!(rel, full_rel);
    assert!(!state_path.exists());
}

#[test]
fn incompatible_resume_state_aborts_before_any_query() {
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join(".state.json");
    // Recorded with a different batch size.
    BatchState::new(10, 2, "en", ENDPOINT).save(&state_path).unwrap();

    let endpoint = ScriptedEndpoint::new();
    let result = run_fetch(
        &endpoint,
        &ids(&["a", "b"]),
        dir.path(),
        Some(&state_path),
        true,
        RetryPolicy::immediate(0),
    );

    assert!(result.is_err());
    assert!(endpoint.queries().is_empty());
    // The checkpoint survives a refused resume.
    assert!(state_path.exists());
}

#[test]
fn label_enrichment_consults_the_cache_before_the_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let attr = dir.path().join("attr");
    let rel = dir.path().join("rel");
    std::fs::write(
        &attr,
        "<http://kb/entity/Q1>\t<http://kb/name>\t\"one\"\n",
    )
    .unwrap();
    std::fs::write(
        &rel,
        "<http://kb/entity/Q1>\t<http://kb/rel>\t<http://kb/entity/Q2>\n",
    )
    .unwrap();

    let cache_path = dir.path().join("cache.json");
    let mut cache = JsonFileCache::open(&cache_path).unwrap();
    cache.put(
        "http://kb/entity/Q1",
        LabelEntry {
            label: Some("One".into()),
            description: None,
        },
    );

    let endpoint = ScriptedEndpoint::new();
    endpoint.push_select(Ok(serde_json::json!({
        "results": { "bindings": [
            {
                "s": { "type": "uri", "value": "http://kb/entity/Q2" },
                "label": { "type": "literal", "value": "Two" },
                "desc": { "type": "literal", "value": "the second one" }
            }
        ]}
    })));

    let ns = KbNamespace::new("http://kb/entity/", "http://kb/prop/");
    let appended = enrich_with_labels(
        &endpoint,
        &mut cache,
        &config(),
        &RetryPolicy::immediate(0),
        &ns,
        &attr,
        &rel,
    )
    .unwrap();

    // Q1 label (cached) + Q2 label + Q2 description.
    assert_eq!(appended, 3);

    let queries = endpoint.queries();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].contains("<http://kb/entity/Q2>"));
    assert!(!queries[0].contains("<http://kb/entity/Q1>"));

    let content = std::fs::read_to_string(&attr).unwrap();
    assert!(content.contains(
        "<http://kb/entity/Q1>\t<http://www.w3.org/2000/01/rdf-schema#label>\t\"One\""
    ));
    assert!(content.contains(
        "<http://kb/entity/Q2>\t<http://www.w3.org/2000/01/rdf-schema#label>\t\"Two\""
    ));
    assert!(content.contains(
        "<http://kb/entity/Q2>\t<http://schema.org/description>\t\"the second one\""
    ));

    // The flushed cache now covers both IRIs.
    let reopened = JsonFileCache::open(&cache_path).unwrap();
    assert!(reopened.get("http://kb/entity/Q1").is_some());
    assert!(reopened.get("http://kb/entity/Q2").is_some());
}
