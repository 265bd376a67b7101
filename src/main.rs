mod cli;

use anyhow::Context;
use env_logger::Env;
use log::info;
use racecard_normalizer::csv_out;
use racecard_normalizer::feeds;
use racecard_normalizer::filter::FilterConfig;
use racecard_normalizer::pipeline::PipelineConfig;
use racecard_normalizer::SourceFormatHint;
use std::fs::File;
use std::io::{self, BufWriter, Write};

fn setup_logging(level: &str) {
    let env = Env::default().filter_or("RUST_LOG", match level {
        "essential" => "info",
        "debug" => "debug",
        "trace" => "trace",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    });
    env_logger::Builder::from_env(env).init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::parse_cli();
    setup_logging(&args.log_level);

    let hint = args
        .hint
        .as_deref()
        .map(str::parse::<SourceFormatHint>)
        .transpose()
        .context("invalid --hint")?;
    let filter = FilterConfig::from_clauses(&args.filters).context("invalid --filter")?;
    let cfg = PipelineConfig {
        time_fields: args.time_fields.clone(),
        hint,
        group_by: args.group_by.clone(),
        date_levels: args.date_levels.clone(),
        dedup: args.dedup.clone(),
        filter,
        sort_keys: args.sort_keys,
    };

    let mut files = args.input_files.clone();
    if let Some(dir) = &args.feed_dir {
        let found = feeds::collect_feed_dir(dir)
            .with_context(|| format!("reading {}", dir.display()))?;
        files.extend(found);
    }
    info!("Starting: {} files, {} urls", files.len(), args.urls.len());

    let records = feeds::load_all(&files, &args.urls);
    let prepared = cfg.prepare(&records);
    let (tree, _stats) = cfg.group(&prepared).context("grouping")?;

    if args.out.as_os_str() == "-" {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        csv_out::write_tree_json(&tree, &mut lock).context("writing JSON to stdout")?;
        writeln!(lock)?;
    } else {
        let f = File::create(&args.out)
            .with_context(|| format!("creating {}", args.out.display()))?;
        let mut w = BufWriter::new(f);
        csv_out::write_tree_json(&tree, &mut w).context("writing JSON")?;
        w.flush()?;
        info!("JSON written to {}", args.out.display());
    }

    if let Some(csv_path) = &args.csv {
        let n = csv_out::write_csv(&tree, &cfg.level_names(), &args.columns, csv_path)
            .with_context(|| format!("writing {}", csv_path.display()))?;
        info!("CSV wrote {} rows to {}", n, csv_path.display());
    }

    info!("Done.");
    Ok(())
}
