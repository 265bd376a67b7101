use crate::errors::AppError;
use crate::model::Record;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldFilter {
    pub field: String,
    pub allowed: Vec<String>,
}

impl FieldFilter {
    /// Parse a `field=value` CLI clause.
    pub fn parse(clause: &str) -> Result<Self, AppError> {
        let (field, value) = clause
            .split_once('=')
            .ok_or_else(|| AppError::Config(format!("filter '{}' is not field=value", clause)))?;
        let field = field.trim();
        if field.is_empty() {
            return Err(AppError::Config(format!("filter '{}' has an empty field name", clause)));
        }
        Ok(FieldFilter { field: field.to_string(), allowed: vec![value.trim().to_string()] })
    }
}

#[derive(Clone, Debug, Default)]
pub struct FilterConfig {
    pub clauses: Vec<FieldFilter>,
}

impl FilterConfig {
    /// Build from repeated `field=value` clauses; values for the same field are OR-ed.
    pub fn from_clauses<S: AsRef<str>>(clauses: &[S]) -> Result<Self, AppError> {
        let mut cfg = FilterConfig::default();
        for c in clauses {
            let parsed = FieldFilter::parse(c.as_ref())?;
            match cfg.clauses.iter_mut().find(|f| f.field == parsed.field) {
                Some(existing) => existing.allowed.extend(parsed.allowed),
                None => cfg.clauses.push(parsed),
            }
        }
        Ok(cfg)
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.iter().all(|c| c.allowed.is_empty())
    }

    pub fn accept(&self, r: &Record) -> bool {
        for clause in &self.clauses {
            if clause.allowed.is_empty() {
                continue;
            }
            match r.text(&clause.field) {
                Some(v) if clause.allowed.iter().any(|q| q == &v) => {}
                _ => return false,
            }
        }
        true
    }

    pub fn apply(&self, records: Vec<Record>) -> Vec<Record> {
        if self.is_empty() {
            return records;
        }
        records.into_iter().filter(|r| self.accept(r)).collect()
    }
}
