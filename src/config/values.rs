// src/config/values.rs

//! Layered configuration values consumed by path templates.

use std::str::FromStr;

use toml::{Table, Value};

use crate::rules::template::Substitution;

/// A single `--config KEY=VALUE` override from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOverride {
    pub key: String,
    pub value: String,
}

impl FromStr for ConfigOverride {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("invalid config override '{s}' (expected KEY=VALUE)"))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(format!("invalid config override '{s}': empty key"));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Merged configuration table.
///
/// Layers are applied in order: inline `[config]`, then the `configfile`
/// document, then command-line overrides. Later layers replace earlier ones
/// key by key; nested tables merge recursively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigValues {
    table: Table,
}

impl ConfigValues {
    pub fn new(table: Table) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Merge another table on top of this one.
    pub fn merge(&mut self, other: Table) {
        merge_tables(&mut self.table, other);
    }

    /// Apply a command-line override. Dotted keys create nested tables.
    pub fn apply_override(&mut self, ov: &ConfigOverride) {
        let mut parts: Vec<&str> = ov.key.split('.').collect();
        let last = parts.pop().unwrap_or_default();
        let mut table = &mut self.table;
        for part in parts {
            let entry = table
                .entry(part.to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if !entry.is_table() {
                *entry = Value::Table(Table::new());
            }
            table = match entry {
                Value::Table(t) => t,
                _ => return,
            };
        }
        table.insert(last.to_string(), Value::String(ov.value.clone()));
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Raw value at a dotted key, with an optional `config.` prefix.
    pub fn get(&self, key: &str) -> Option<&Value> {
        let key = key.strip_prefix("config.").unwrap_or(key);
        let mut parts = key.split('.');
        let mut current = self.table.get(parts.next()?)?;
        for part in parts {
            current = current.as_table()?.get(part)?;
        }
        Some(current)
    }

    /// Value at `key` as a template substitution.
    ///
    /// Returns `None` for missing keys, tables, and arrays holding anything
    /// other than scalars.
    pub fn lookup(&self, key: &str) -> Option<Substitution> {
        match self.get(key)? {
            Value::Array(items) => items
                .iter()
                .map(scalar_to_string)
                .collect::<Option<Vec<_>>>()
                .map(Substitution::Many),
            other => scalar_to_string(other).map(Substitution::One),
        }
    }

    /// Convenience accessor for list-valued keys (e.g. fixture name lists).
    pub fn list(&self, key: &str) -> Option<Vec<String>> {
        match self.lookup(key)? {
            Substitution::Many(values) => Some(values),
            Substitution::One(value) => Some(vec![value]),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        Value::Datetime(d) => Some(d.to_string()),
        Value::Array(_) | Value::Table(_) => None,
    }
}

fn merge_tables(base: &mut Table, other: Table) {
    for (key, value) in other {
        match (base.get_mut(&key), value) {
            (Some(Value::Table(existing)), Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(src: &str) -> ConfigValues {
        ConfigValues::new(toml::from_str(src).unwrap())
    }

    #[test]
    fn parses_overrides() {
        let ov: ConfigOverride = "release=v1.2=rc".parse().unwrap();
        assert_eq!(ov.key, "release");
        assert_eq!(ov.value, "v1.2=rc");

        assert!("release".parse::<ConfigOverride>().is_err());
        assert!("=v1".parse::<ConfigOverride>().is_err());
    }

    #[test]
    fn later_layers_win_and_tables_merge() {
        let mut config = values("dir = 'inline'\n[paths]\nunit = 'u'\nintegration = 'i'\n");
        config.merge(toml::from_str("[paths]\nunit = 'from-file'\n").unwrap());
        config.apply_override(&"paths.integration=from-cli".parse().unwrap());

        assert_eq!(config.lookup("dir"), Some(Substitution::One("inline".into())));
        assert_eq!(config.lookup("paths.unit"), Some(Substitution::One("from-file".into())));
        assert_eq!(
            config.lookup("config.paths.integration"),
            Some(Substitution::One("from-cli".into()))
        );
    }

    #[test]
    fn lists_of_scalars_substitute_as_lists() {
        let config = values("fixtures = ['a', 'b']\ncount = 3\nnested = [['x']]\n");

        assert_eq!(config.list("fixtures"), Some(vec!["a".to_string(), "b".to_string()]));
        assert_eq!(config.lookup("count"), Some(Substitution::One("3".into())));
        assert_eq!(config.lookup("nested"), None);
        assert_eq!(config.lookup("missing"), None);
    }
}
