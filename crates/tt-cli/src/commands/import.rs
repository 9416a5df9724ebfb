//! `tt import`: config layering, flag overrides, then one transactional run.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;
use tracing::{info, warn};
use tt_config::{ImportConfig, LoadedConfig, UnusedKeyPolicy};
use tt_feed::CsvFeedDir;
use tt_reconcile::{
    run_import, DataScope, FeedTarget, ImportOptions, RegionTarget, ReplaceMode, TxOutcome,
    UpdateMode,
};

use super::progress::SpinnerProgress;

#[derive(Args, Debug, Default)]
pub struct ImportArgs {
    /// Layered config paths in merge order
    #[arg(long = "config")]
    pub config_paths: Vec<String>,

    /// Directory holding the feed's .txt tables
    #[arg(long)]
    pub feed_dir: Option<PathBuf>,

    /// Run every stage, then roll back. `--dry-run=false` overrides a config
    /// file that enables it.
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    pub dry_run: Option<bool>,

    /// archive | delete | keep
    #[arg(long)]
    pub replace_mode: Option<String>,

    /// full | routes
    #[arg(long)]
    pub update_mode: Option<String>,

    #[arg(long)]
    pub region_id: Option<i32>,
    #[arg(long)]
    pub region_name: Option<String>,
    #[arg(long)]
    pub country_code: Option<String>,

    #[arg(long)]
    pub feed_id: Option<i32>,
    #[arg(long)]
    pub feed_name: Option<String>,
    #[arg(long)]
    pub source_url: Option<String>,

    /// regional | national | international | unknown
    #[arg(long)]
    pub scope: Option<String>,

    /// Statement timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Fail instead of warning on config keys nobody reads
    #[arg(long, default_value_t = false)]
    pub strict_config: bool,

    /// Print the summary as JSON instead of key=value lines
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Disable the progress spinner
    #[arg(long, default_value_t = false)]
    pub no_progress: bool,
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let (loaded, cfg) = resolve_config(&args)?;
    let options = to_options(&cfg)?;

    let dir = cfg
        .feed
        .dir
        .clone()
        .context("feed directory not set (feed.dir or --feed-dir)")?;
    if !dir.is_dir() {
        bail!("feed directory not found: {}", dir.display());
    }

    info!(
        config_hash = %loaded.config_hash,
        feed_dir = %dir.display(),
        update_mode = %options.update_mode,
        replace_mode = %options.replace_mode,
        dry_run = cfg.import.dry_run,
        "import starting"
    );

    let pool = tt_db::connect_from_env(&cfg.database.url_env, cfg.database.max_connections).await?;
    let tx = tt_db::begin_import(&pool, cfg.database.statement_timeout_secs).await?;

    let mut source = CsvFeedDir::new(dir);
    let progress = SpinnerProgress::new(!args.no_progress);
    let result = run_import(
        tx,
        &mut source,
        &options,
        TxOutcome::from_dry_run(cfg.import.dry_run),
        &progress,
    )
    .await;
    progress.finish();
    let summary = result?;

    if args.json {
        let json =
            serde_json::to_string_pretty(&summary).context("serialize summary json failed")?;
        println!("{json}");
        return Ok(());
    }

    println!("import_ok=true run_id={}", summary.run_id);
    println!("config_hash={}", loaded.config_hash);
    if let Some(region_id) = summary.region_id {
        println!("region_id={region_id}");
    }
    if let Some(feed_id) = summary.feed_id {
        println!("feed_id={feed_id}");
    }
    println!("dry_run={}", summary.dry_run);
    for (k, v) in summary.counters() {
        println!("{k}={v}");
    }
    for (file, c) in &summary.rows {
        println!("rows file={file} read={} skipped={}", c.read, c.skipped);
    }

    Ok(())
}

/// Merge config layers, then apply command-line overrides on top.
pub fn resolve_config(args: &ImportArgs) -> Result<(LoadedConfig, ImportConfig)> {
    let path_refs: Vec<&str> = args.config_paths.iter().map(String::as_str).collect();
    let loaded = if path_refs.is_empty() {
        tt_config::load_layered_yaml_from_strings(&[])?
    } else {
        tt_config::load_layered_yaml(&path_refs)?
    };

    let policy = if args.strict_config {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let report = tt_config::report_unused_keys(&loaded.config_json, policy)?;
    for key in &report.unused_leaf_pointers {
        warn!(key = %key, "unused config key");
    }

    let mut cfg = ImportConfig::from_json(&loaded.config_json)?;
    apply_overrides(&mut cfg, args);
    cfg.validate()?;

    if !cfg.replace_mode_is_known() {
        warn!(
            replace_mode = %cfg.import.replace_mode,
            "unrecognized replace mode; stale routes will be left untouched"
        );
    }

    Ok((loaded, cfg))
}

fn apply_overrides(cfg: &mut ImportConfig, args: &ImportArgs) {
    if let Some(dir) = &args.feed_dir {
        cfg.feed.dir = Some(dir.clone());
    }
    if let Some(dry_run) = args.dry_run {
        cfg.import.dry_run = dry_run;
    }
    if let Some(m) = &args.replace_mode {
        cfg.import.replace_mode = m.clone();
    }
    if let Some(m) = &args.update_mode {
        cfg.import.update_mode = m.clone();
    }
    if args.region_id.is_some() {
        cfg.region.id = args.region_id;
    }
    if args.region_name.is_some() {
        cfg.region.name = args.region_name.clone();
    }
    if args.country_code.is_some() {
        cfg.region.country_code = args.country_code.clone();
    }
    if args.feed_id.is_some() {
        cfg.feed.id = args.feed_id;
    }
    if args.feed_name.is_some() {
        cfg.feed.name = args.feed_name.clone();
    }
    if args.source_url.is_some() {
        cfg.feed.source_url = args.source_url.clone();
    }
    if let Some(scope) = &args.scope {
        cfg.feed.scope = scope.clone();
    }
    if let Some(t) = args.timeout {
        cfg.database.statement_timeout_secs = t;
    }
}

pub fn to_options(cfg: &ImportConfig) -> Result<ImportOptions> {
    let region = RegionTarget::from_parts(
        cfg.region.id,
        cfg.region.name.clone(),
        cfg.region.country_code.clone(),
    )?;
    let feed = FeedTarget::from_parts(
        cfg.feed.id,
        cfg.feed.name.clone(),
        cfg.feed.source_url.clone(),
    )?;

    let mut options = ImportOptions::new(region, feed);
    options.scope = cfg.feed.scope.parse::<DataScope>()?;
    options.replace_mode = ReplaceMode::parse(&cfg.import.replace_mode);
    options.update_mode = cfg.import.update_mode.parse::<UpdateMode>()?;
    options.batch_size = cfg.import.batch_size;
    options.progress_every = cfg.import.progress_every;
    options.default_agency = cfg.import.default_agency.clone();
    Ok(options)
}
