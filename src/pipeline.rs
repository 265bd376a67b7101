//! Wiring between feeds, the time normalizer, filtering and the grouper.

use crate::dates::compare_date_keys;
use crate::errors::AppError;
use crate::feeds::enrich_times;
use crate::filter::FilterConfig;
use crate::grouping::{
    GroupKeySpec, GroupStats, GroupTree, KeyFn, any_field, date_field, group_with_stats,
};
use crate::model::{Record, SourceFormatHint};
use log::{debug, info};

#[derive(Clone, Debug, Default)]
pub struct PipelineConfig {
    pub time_fields: Vec<String>,
    pub hint: Option<SourceFormatHint>,
    /// One entry per level, outermost first; `|` separates aliases (`Course|Track`).
    pub group_by: Vec<String>,
    pub date_levels: Vec<usize>,
    /// Dedup key aliases.
    pub dedup: Vec<String>,
    pub filter: FilterConfig,
    pub sort_keys: bool,
}

fn aliases(level: &str) -> Vec<&str> {
    level.split('|').map(str::trim).filter(|a| !a.is_empty()).collect()
}

impl PipelineConfig {
    pub fn key_spec(&self) -> Result<GroupKeySpec, AppError> {
        let mut levels = self.group_by.iter().enumerate().map(|(idx, level)| {
            let names = aliases(level);
            if names.is_empty() {
                return Err(AppError::Config(format!("group level {} has no field name", idx)));
            }
            let key: KeyFn = if self.date_levels.contains(&idx) {
                date_field(&names)
            } else {
                any_field(&names)
            };
            Ok(key)
        });
        let first = levels
            .next()
            .ok_or_else(|| AppError::Config("at least one group level is required".into()))??;
        let dedup: Vec<&str> = self.dedup.iter().map(String::as_str).collect();
        let mut spec = GroupKeySpec::new(first, any_field(&dedup));
        for level in levels {
            spec = spec.then(level?);
        }
        Ok(spec)
    }

    /// Level names for output headers (first alias of each level).
    pub fn level_names(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(|l| aliases(l).first().map(|s| s.to_string()).unwrap_or_default())
            .collect()
    }

    /// Attach normalized times, then drop records the filter rejects.
    pub fn prepare(&self, records: &[Record]) -> Vec<Record> {
        let time_fields: Vec<&str> = self.time_fields.iter().map(String::as_str).collect();
        let enriched = enrich_times(records, &time_fields, self.hint);
        let before = enriched.len();
        let kept = self.filter.apply(enriched);
        debug!("filter kept {} of {} records", kept.len(), before);
        kept
    }

    /// Group prepared records and, when asked, sort the result for presentation.
    pub fn group<'a>(
        &self,
        prepared: &'a [Record],
    ) -> Result<(GroupTree<'a>, GroupStats), AppError> {
        let spec = self.key_spec()?;
        let (mut tree, stats) = group_with_stats(prepared, &spec);
        info!(
            "Grouped {} of {} records ({} missing a key, {} duplicates)",
            stats.grouped, stats.records_in, stats.excluded_missing_key, stats.duplicates_dropped
        );
        if self.sort_keys {
            let date_levels = &self.date_levels;
            tree.sort_keys_recursive(&|depth: usize, a: &str, b: &str| {
                if date_levels.contains(&depth) {
                    compare_date_keys(a, b)
                } else {
                    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
                }
            });
            tree.sort_leaves_by_time();
        }
        Ok((tree, stats))
    }
}
