// Declared option keys and their transformation chains

use super::transform::{expand, label_styler, label_translator, legend_translator, o_translator};
use super::{Options, Transform};
use crate::error::OptionError;
use std::collections::BTreeSet;
use tracing::error;

/// Ordered registry of option keys, each with a chain of transformations.
///
/// Chains run last-registered first: for `x => [label_translator, expand]`
/// the value is expanded and then translated.
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<(String, Vec<Transform>)>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|(k, chain)| (k, chain.len())))
            .finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `key` with its chain. Re-registering a key replaces its chain
    /// but keeps its original position.
    pub fn register(mut self, key: &str, chain: &[Transform]) -> Self {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = chain.to_vec(),
            None => self.entries.push((key.to_string(), chain.to_vec())),
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &[Transform])> {
        self.entries.iter().map(|(k, chain)| (k.as_str(), chain.as_slice()))
    }

    /// Keep only the entries of `source` whose key is declared here.
    pub fn select(&self, source: impl IntoIterator<Item = (String, crate::scalar::Scalar)>) -> Options {
        source
            .into_iter()
            .filter(|(k, _)| self.contains(k))
            .collect()
    }

    /// Fail when the declared keys and the valid-option contract differ.
    pub fn check_against(&self, valid: &[&str]) -> Result<(), OptionError> {
        let declared: BTreeSet<&str> = self.keys().collect();
        let contract: BTreeSet<&str> = valid.iter().copied().collect();
        if declared == contract {
            return Ok(());
        }
        let diff: Vec<String> = declared
            .symmetric_difference(&contract)
            .map(|k| k.to_string())
            .collect();
        error!(?diff, "option registry and valid options disagree");
        Err(OptionError::ConfigurationDrift { diff })
    }

    /// The plot front end's registry.
    pub fn builtin() -> Self {
        Registry::new()
            // data
            .register("x", &[label_translator, expand])
            .register("y", &[label_translator, expand])
            .register("xerr", &[label_translator, expand])
            .register("yerr", &[label_translator, expand])
            // parameter box
            .register("parameter", &[])
            .register("parameter_loc", &[])
            // manipulation
            .register("acc", &[expand])
            .register("triconv", &[expand])
            .register("dsel", &[expand])
            .register("psel", &[expand])
            .register("linreg", &[expand])
            // destination
            .register("o", &[o_translator])
            // style
            .register("alpha", &[])
            .register("fontsize", &[])
            .register("title", &[])
            .register("size_inch", &[])
            .register("style", &[])
            .register("xticks", &[])
            .register("yticks", &[])
            .register("xlabel", &[label_styler])
            .register("ylabel", &[label_styler, expand])
            .register("ylabel2", &[label_styler])
            .register("xlim", &[])
            .register("ylim", &[])
            .register("border", &[])
            .register("markersize", &[expand])
            .register("legend_loc", &[legend_translator])
            .register("ncol", &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::valid::VALID_OPTIONS;

    #[test]
    fn test_builtin_matches_contract() {
        assert!(Registry::builtin().check_against(VALID_OPTIONS).is_ok());
    }

    #[test]
    fn test_drift_names_symmetric_difference() {
        let registry = Registry::new().register("a", &[]).register("b", &[]);
        match registry.check_against(&["b", "c"]) {
            Err(OptionError::ConfigurationDrift { diff }) => assert_eq!(diff, vec!["a", "c"]),
            other => panic!("expected drift, got {:?}", other),
        }
    }

    #[test]
    fn test_register_keeps_position() {
        let registry = Registry::new()
            .register("a", &[])
            .register("b", &[])
            .register("a", &[expand]);
        let keys: Vec<&str> = registry.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(registry.entries().next().unwrap().1.len(), 1);
    }

    #[test]
    fn test_select_drops_unknown_keys() {
        let registry = Registry::new().register("a", &[]);
        let picked = registry.select(vec![
            ("a".to_string(), 1.into()),
            ("zzz".to_string(), 2.into()),
        ]);
        assert_eq!(picked.len(), 1);
        assert!(picked.contains("a"));
    }
}
