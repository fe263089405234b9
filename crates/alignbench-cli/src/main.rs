//! Alignbench CLI
//!
//! Unified command-line interface for:
//! - Building a full benchmark from a local N-Quads dump, a link table and
//!   a remote SPARQL endpoint (`build`)
//! - Discovering entity links between two attribute files via normalized
//!   identifying values (`link`)

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use alignbench_extract::{
    links::build_merge_map, stats, ClosureExtractor, ClosureOptions, ColumnSpec, LinkRow,
    LinkTable, LinkWriter, SplitWriter, StatementFilter, WriteMode,
};
use alignbench_fetch::{
    enrich_with_labels, FetchConfig, Fetcher, HttpEndpoint, JsonFileCache, KbNamespace,
    RetryPolicy,
};
use alignbench_link::{link_indices, ValueIndex, DEFAULT_MIN_FUZZY_LENGTH};
use alignbench_rdf::normalize::default_code_aliases;

#[derive(Parser)]
#[command(name = "alignbench")]
#[command(
    author,
    version,
    about = "Build entity-alignment benchmarks from RDF dumps and SPARQL endpoints"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a benchmark: extract the source side from a local dump,
    /// fetch the target side from a remote endpoint.
    Build(BuildArgs),

    /// Discover entity links between two attribute-triple files.
    Link(LinkArgs),
}

#[derive(Args)]
struct BuildArgs {
    /// Local N-Quads/N-Triples dump for the source side
    #[arg(long)]
    source: PathBuf,

    /// Entity-link table (TSV/CSV of source/target identifier pairs)
    #[arg(long)]
    links: PathBuf,

    /// SPARQL endpoint URL for the target side
    #[arg(long)]
    endpoint: String,

    /// Output directory for the benchmark files
    #[arg(short, long)]
    out: PathBuf,

    /// Link table cell separator
    #[arg(long, default_value = "\t")]
    separator: char,

    /// Source identifier column (headerless tables)
    #[arg(long, default_value_t = 0)]
    source_col: usize,

    /// Target identifier column (headerless tables)
    #[arg(long, default_value_t = 1)]
    target_col: usize,

    /// Column carrying the source-side link value (headerless tables)
    #[arg(long)]
    source_value_col: Option<usize>,

    /// Column carrying the target-side link value (headerless tables)
    #[arg(long)]
    target_value_col: Option<usize>,

    /// Do not mask the literal values that established the links
    #[arg(long)]
    keep_link_values: bool,

    /// Drop links whose source entity has fewer surviving statements
    #[arg(long)]
    min_triples: Option<u64>,

    /// Coalesce target identifiers that share a link value
    #[arg(long)]
    merge_by_value: bool,

    /// Blank-node closure depth for the source side (-1 = until fixpoint)
    #[arg(long, default_value_t = 1)]
    max_depth: i64,

    /// Progress event every N source lines (0 = off)
    #[arg(long, default_value_t = 1_000_000)]
    progress_every: u64,

    /// Predicate IRI excluded from source-side emission (repeatable)
    #[arg(long)]
    exclude_source_prop: Vec<String>,

    /// Predicate IRI excluded from target-side emission (repeatable)
    #[arg(long)]
    exclude_target_prop: Vec<String>,

    /// Identifiers per remote query
    #[arg(long, default_value_t = 50)]
    batch_size: usize,

    /// Language tag for literal filtering and labels
    #[arg(long, default_value = "en")]
    language: String,

    /// Remote request timeout in seconds
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,

    /// Minimum delay between remote calls in seconds
    #[arg(long, default_value_t = 1)]
    delay_secs: u64,

    /// Retries per batch after the initial attempt
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// User-Agent header for remote requests
    #[arg(long)]
    user_agent: Option<String>,

    /// Resume an interrupted fetch from its state file
    #[arg(long)]
    resume: bool,

    /// Fetch resume state file (default: <out>/.fetch_state.json)
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Drop target-side statements whose predicate occurs fewer times
    #[arg(long)]
    prop_min_count: Option<u64>,

    /// Skip label/description enrichment of the target side
    #[arg(long)]
    no_labels: bool,

    /// Knowledge-base entity IRI prefix for label enrichment
    #[arg(long, default_value = "http://www.wikidata.org/entity/")]
    entity_prefix: String,

    /// Knowledge-base property IRI prefix for label enrichment
    #[arg(long, default_value = "http://www.wikidata.org/prop/")]
    property_prefix: String,

    /// Label cache file (default: <out>/label_cache.json)
    #[arg(long)]
    label_cache: Option<PathBuf>,
}

#[derive(Args)]
struct LinkArgs {
    /// Source-side attribute-triple file
    #[arg(long)]
    source_attr: PathBuf,

    /// Target-side attribute-triple file
    #[arg(long)]
    target_attr: PathBuf,

    /// Identifying property IRI on the source side (repeatable)
    #[arg(long, required = true)]
    source_prop: Vec<String>,

    /// Identifying property IRI on the target side (repeatable)
    #[arg(long, required = true)]
    target_prop: Vec<String>,

    /// Minimum normalized length for the fuzzy prefix phase
    #[arg(long, default_value_t = DEFAULT_MIN_FUZZY_LENGTH)]
    min_fuzzy_length: usize,

    /// Output link file (sourceIRI<TAB>targetIRI)
    #[arg(short, long)]
    out: PathBuf,

    /// Optional detailed TSV with values and match method
    #[arg(long)]
    detail: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => cmd_build(args),
        Commands::Link(args) => cmd_link(args),
    }
}

fn cmd_build(args: BuildArgs) -> Result<()> {
    let mut config = FetchConfig::new(&args.endpoint);
    config.batch_size = args.batch_size;
    config.language = args.language.clone();
    config.timeout = Duration::from_secs(args.timeout_secs);
    config.min_delay = Duration::from_secs(args.delay_secs);
    if let Some(ua) = &args.user_agent {
        config.user_agent = ua.clone();
    }
    // All configuration is vetted before anything is written.
    config.validate()?;

    let columns = ColumnSpec {
        source: args.source_col,
        target: args.target_col,
        source_value: args.source_value_col,
        target_value: args.target_value_col,
    };
    let mut table = LinkTable::read(&args.links, args.separator, columns)?;
    if table.is_empty() {
        println!(
            "{} link table {} has no usable rows, nothing to build",
            "done".yellow().bold(),
            args.links.display()
        );
        return Ok(());
    }
    eprintln!(
        "{} {} link rows from {}",
        "read".green().bold(),
        table.len(),
        args.links.display()
    );

    let (source_mask, target_mask) = if args.keep_link_values {
        (HashSet::new(), HashSet::new())
    } else {
        (table.source_mask_values(), table.target_mask_values())
    };
    let source_filter = StatementFilter::new(
        args.exclude_source_prop.iter().cloned().collect(),
        source_mask,
        HashMap::new(),
    );

    if let Some(min) = args.min_triples {
        let subjects: HashSet<String> = table.source_keys().into_iter().collect();
        let counts = stats::count_subject_statements(&args.source, &subjects, &source_filter)?;
        let allowed: HashSet<String> = counts
            .into_iter()
            .filter(|(_, count)| *count >= min)
            .map(|(subject, _)| subject)
            .collect();
        let before = table.len();
        table.retain_sources(&allowed);
        eprintln!(
            "{} {} of {} links kept (source has >= {} statements)",
            "filtered".green().bold(),
            table.len(),
            before,
            min
        );
        if table.is_empty() {
            println!(
                "{} no source entity meets --min-triples {}, nothing to build",
                "done".yellow().bold(),
                min
            );
            return Ok(());
        }
    }

    let merge_map = if args.merge_by_value {
        let map = build_merge_map(&table.rows)?;
        if !map.is_empty() {
            eprintln!(
                "{} {} target identifiers coalesced by shared link value",
                "merged".green().bold(),
                map.len()
            );
        }
        table.remap_targets(&map);
        map
    } else {
        HashMap::new()
    };

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create output directory: {}", args.out.display()))?;
    let ent_links = args.out.join("ent_links");
    let written = LinkWriter::write(&ent_links, &table.rows, true)?;
    if written == 0 {
        println!("{} no links survived deduplication", "done".yellow().bold());
        return Ok(());
    }
    eprintln!(
        "{} {} ({} pairs)",
        "wrote".green().bold(),
        ent_links.display(),
        written
    );

    let attr_1 = args.out.join("attr_triples_1");
    let rel_1 = args.out.join("rel_triples_1");
    let extractor = ClosureExtractor::new(
        table.source_keys(),
        ClosureOptions {
            max_depth: args.max_depth,
            progress_every: args.progress_every,
        },
        source_filter,
    )?;
    let mut out_1 = SplitWriter::open(&attr_1, &rel_1, WriteMode::Truncate)?;
    let extract_stats = extractor.extract(&args.source, &mut out_1)?;
    if extract_stats.attribute_lines == 0 && extract_stats.relational_lines == 0 {
        println!(
            "{} source extraction produced no statements, stopping before the remote fetch",
            "done".yellow().bold()
        );
        return Ok(());
    }
    eprintln!(
        "{} source side: {} attribute, {} relational lines ({} passes)",
        "extracted".green().bold(),
        extract_stats.attribute_lines,
        extract_stats.relational_lines,
        extract_stats.passes
    );

    let retry = RetryPolicy {
        max_retries: args.retries,
        ..RetryPolicy::default()
    };
    let target_filter = StatementFilter::new(
        args.exclude_target_prop.iter().cloned().collect(),
        target_mask,
        merge_map,
    );
    let endpoint = HttpEndpoint::new(&config.endpoint, &config.user_agent, config.timeout)?;
    let fetcher = Fetcher::new(config.clone(), retry, target_filter)?;

    let mut seen = HashSet::new();
    let identifiers: Vec<String> = table
        .target_keys()
        .into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect();

    let attr_2 = args.out.join("attr_triples_2");
    let rel_2 = args.out.join("rel_triples_2");
    let mode = if args.resume {
        WriteMode::Append
    } else {
        WriteMode::Truncate
    };
    let mut out_2 = SplitWriter::open(&attr_2, &rel_2, mode)?;
    let state_path = args
        .state_file
        .clone()
        .unwrap_or_else(|| args.out.join(".fetch_state.json"));
    let fetch_stats = fetcher.run(
        &endpoint,
        &identifiers,
        &mut out_2,
        Some(&state_path),
        args.resume,
    )?;
    eprintln!(
        "{} target side: {} attribute, {} relational lines ({} batches, {} skipped, {} abandoned)",
        "fetched".green().bold(),
        fetch_stats.attribute_lines,
        fetch_stats.relational_lines,
        fetch_stats.batches,
        fetch_stats.skipped,
        fetch_stats.abandoned
    );

    if let Some(min) = args.prop_min_count {
        let tmp_attr = args.out.join("attr_triples_2.tmp");
        let tmp_rel = args.out.join("rel_triples_2.tmp");
        let (attr_kept, rel_kept) =
            stats::filter_by_property_frequency(&attr_2, &rel_2, &tmp_attr, &tmp_rel, min)?;
        std::fs::rename(&tmp_attr, &attr_2)?;
        std::fs::rename(&tmp_rel, &rel_2)?;
        eprintln!(
            "{} target side to {} attribute, {} relational lines (predicate count >= {})",
            "trimmed".green().bold(),
            attr_kept,
            rel_kept,
            min
        );
    }

    if !args.no_labels {
        let cache_path = args
            .label_cache
            .clone()
            .unwrap_or_else(|| args.out.join("label_cache.json"));
        let mut cache = JsonFileCache::open(&cache_path)?;
        let ns = KbNamespace::new(&args.entity_prefix, &args.property_prefix);
        let appended =
            enrich_with_labels(&endpoint, &mut cache, &config, &retry, &ns, &attr_2, &rel_2)?;
        eprintln!(
            "{} {} label/description lines",
            "appended".green().bold(),
            appended
        );
    }

    println!(
        "{} benchmark written to {}",
        "ok".green().bold(),
        args.out.display().to_string().bold()
    );
    Ok(())
}

fn cmd_link(args: LinkArgs) -> Result<()> {
    let aliases = default_code_aliases();
    let source_props: HashSet<String> = args.source_prop.iter().cloned().collect();
    let target_props: HashSet<String> = args.target_prop.iter().cloned().collect();

    let source = ValueIndex::from_attribute_file(&args.source_attr, &source_props, &aliases)?;
    let target = ValueIndex::from_attribute_file(&args.target_attr, &target_props, &aliases)?;
    eprintln!(
        "{} {} source values, {} target values",
        "indexed".green().bold(),
        source.len(),
        target.len()
    );
    if source.is_empty() || target.is_empty() {
        println!(
            "{} one side has no identifying values, no links to find",
            "done".yellow().bold()
        );
        return Ok(());
    }

    let links = link_indices(&source, &target, args.min_fuzzy_length);
    if links.is_empty() {
        println!("{} no matching values between the sides", "done".yellow().bold());
        return Ok(());
    }

    let rows: Vec<LinkRow> = links
        .iter()
        .map(|link| LinkRow::new(link.source_iri.clone(), link.target_iri.clone()))
        .collect();
    let written = LinkWriter::write(&args.out, &rows, true)?;
    eprintln!(
        "{} {} ({} pairs)",
        "wrote".green().bold(),
        args.out.display(),
        written
    );

    if let Some(detail_path) = &args.detail {
        write_link_detail(detail_path, &links)?;
        eprintln!("{} {}", "wrote".green().bold(), detail_path.display());
    }

    println!("{} {} links found", "ok".green().bold(), links.len());
    Ok(())
}

fn write_link_detail(path: &Path, links: &[alignbench_link::EntityLink]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("failed to create link detail file: {}", path.display()))?;
    let mut out = BufWriter::new(file);
    writeln!(out, "source_iri\ttarget_iri\tsource_value\ttarget_value\tmethod")?;
    for link in links {
        writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            link.source_iri, link.target_iri, link.source_value, link.target_value, link.method
        )?;
    }
    out.flush()?;
    Ok(())
}
