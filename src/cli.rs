use argparse::{ArgumentParser, Collect, Store, StoreOption, StoreTrue};
use std::path::PathBuf;

pub struct CliArgs {
    pub input_files: Vec<PathBuf>,
    pub feed_dir: Option<PathBuf>,
    pub urls: Vec<String>,
    pub time_fields: Vec<String>,
    pub hint: Option<String>,
    pub group_by: Vec<String>,
    pub date_levels: Vec<usize>,
    pub dedup: Vec<String>,
    pub filters: Vec<String>,
    pub columns: Vec<String>,
    pub sort_keys: bool,
    pub log_level: String,
    pub out: PathBuf,
    pub csv: Option<PathBuf>,
}

impl Default for CliArgs {
    fn default() -> Self {
        Self {
            input_files: vec![],
            feed_dir: None,
            urls: vec![],
            time_fields: vec![],
            hint: None,
            group_by: vec![],
            date_levels: vec![],
            dedup: vec![],
            filters: vec![],
            columns: vec![],
            sort_keys: false,
            log_level: "essential".into(),
            out: PathBuf::from("-"),
            csv: None,
        }
    }
}

impl CliArgs {
    /// Fill in defaults for repeatable options the user left empty.
    pub fn with_defaults(mut self) -> Self {
        if self.time_fields.is_empty() {
            self.time_fields = vec!["time".into()];
        }
        if self.group_by.is_empty() {
            self.group_by = vec!["date".into(), "track".into()];
        }
        if self.dedup.is_empty() {
            self.dedup = vec!["raceId".into()];
        }
        if self.date_levels.is_empty() {
            self.date_levels = self
                .group_by
                .iter()
                .enumerate()
                .filter(|(_, name)| name.to_ascii_lowercase().contains("date"))
                .map(|(i, _)| i)
                .collect();
        }
        self
    }
}

pub fn parse_cli() -> CliArgs {
    let mut args = CliArgs::default();
    {
        let mut ap = ArgumentParser::new();
        ap.set_description("Race feed JSON -> time-normalized, grouped JSON/CSV");
        ap.refer(&mut args.input_files)
            .add_argument("input_files", Collect, "Input feed JSON files");
        ap.refer(&mut args.feed_dir)
            .add_option(&["--feed-dir"], StoreOption, "Directory of feed *.json files");
        ap.refer(&mut args.urls)
            .add_option(&["--url"], Collect, "Feed endpoint to GET (repeatable)");
        ap.refer(&mut args.time_fields)
            .add_option(
                &["--time-field"],
                Collect,
                "Race time field; repeat for aliases (default: time)",
            );
        ap.refer(&mut args.hint)
            .add_option(&["--hint"], StoreOption, "Time format hint: standard|uk|continental");
        ap.refer(&mut args.group_by)
            .add_option(
                &["-g", "--group-by"],
                Collect,
                "Grouping level field, outermost first (default: date track)",
            );
        ap.refer(&mut args.date_levels)
            .add_option(&["--date-level"], Collect, "Index of a grouping level holding dates");
        ap.refer(&mut args.dedup)
            .add_option(
                &["--dedup"],
                Collect,
                "Leaf dedup field; repeat for aliases (default: raceId)",
            );
        ap.refer(&mut args.filters)
            .add_option(&["-f", "--filter"], Collect, "Keep records where field=value");
        ap.refer(&mut args.columns)
            .add_option(&["--column"], Collect, "Extra CSV column");
        ap.refer(&mut args.sort_keys)
            .add_option(
                &["--sort-keys"],
                StoreTrue,
                "Sort group keys (dates chronologically) and leaves by time",
            );
        ap.refer(&mut args.log_level)
            .add_option(&["--log"], Store, "Log level (essential|debug|trace|warn|error)");
        ap.refer(&mut args.out)
            .add_option(&["--out"], Store, "Output JSON path ('-' for stdout)");
        ap.refer(&mut args.csv)
            .add_option(&["--csv"], StoreOption, "Also write a flat CSV here");
        ap.parse_args_or_exit();
    }
    args.with_defaults()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_empty_repeatables() {
        let args = CliArgs::default().with_defaults();
        assert_eq!(args.time_fields, vec!["time"]);
        assert_eq!(args.group_by, vec!["date", "track"]);
        assert_eq!(args.dedup, vec!["raceId"]);
        assert_eq!(args.date_levels, vec![0]);
        assert_eq!(args.out, PathBuf::from("-"));
    }

    #[test]
    fn date_levels_follow_group_names() {
        let args = CliArgs {
            group_by: vec!["Course".into(), "RaceDate".into()],
            ..CliArgs::default()
        }
        .with_defaults();
        assert_eq!(args.date_levels, vec![1]);
    }
}
