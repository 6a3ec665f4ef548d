// Layered option resolution: defaults, persisted option sets, invocation overrides

pub mod registry;
pub mod transform;
pub mod valid;

pub use registry::Registry;

use crate::document::{OptionSet, PlotDocument, SaveMode};
use crate::error::OptionError;
use crate::scalar::Scalar;
use indexmap::IndexMap;
use serde::Serialize;
use tracing::{debug, warn};

/// One per-key transformation: receives the key, the configuration as
/// transformed so far and the document, and returns the key's new value.
pub type Transform = fn(&str, &Options, &PlotDocument) -> Result<Scalar, OptionError>;

/// Ordered option mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Options(IndexMap<String, Scalar>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Scalar> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Scalar>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Scalar> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Insert every entry of `other`, overriding existing keys.
    pub fn update(&mut self, other: Options) {
        for (k, v) in other.0 {
            self.0.insert(k, v);
        }
    }

    pub fn as_map(&self) -> &IndexMap<String, Scalar> {
        &self.0
    }
}

impl FromIterator<(String, Scalar)> for Options {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        Options(iter.into_iter().collect())
    }
}

impl From<IndexMap<String, Scalar>> for Options {
    fn from(map: IndexMap<String, Scalar>) -> Self {
        Options(map)
    }
}

/// What the invocation layer hands over, already parsed.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub overrides: IndexMap<String, Scalar>,
    pub flags: Vec<String>,
    /// Persisted option set to start from; defaults to 0.
    pub isel: Option<usize>,
    /// Index to save the result to; defaults to the input selection.
    pub osel: Option<usize>,
}

impl Invocation {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.iter().any(|f| f == flag)
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone)]
pub struct Resolution {
    config: Options,
    save: Options,
    isel: usize,
    osel: usize,
}

impl Resolution {
    /// The fully transformed configuration handed to rendering.
    pub fn config(&self) -> &Options {
        &self.config
    }

    /// The merged configuration before transformation, as persisted.
    pub fn save(&self) -> &Options {
        &self.save
    }

    pub fn isel(&self) -> usize {
        self.isel
    }

    pub fn osel(&self) -> usize {
        self.osel
    }
}

/// Precedence merge plus per-key transformation over a declared registry.
#[derive(Debug, Clone)]
pub struct Pipeline {
    registry: Registry,
    defaults: Options,
    transient_defaults: Options,
}

impl Pipeline {
    /// Build a pipeline; fails immediately when `registry` and `valid` differ.
    pub fn new(registry: Registry, valid: &[&str]) -> Result<Self, OptionError> {
        registry.check_against(valid)?;
        Ok(Self {
            registry,
            defaults: Options::new(),
            transient_defaults: Options::new(),
        })
    }

    /// Lowest-precedence values; they are part of the persisted snapshot.
    pub fn with_defaults(mut self, defaults: Options) -> Self {
        self.defaults = defaults;
        self
    }

    /// Values filled in after the snapshot is taken; never persisted.
    pub fn with_transient_defaults(mut self, defaults: Options) -> Self {
        self.transient_defaults = defaults;
        self
    }

    /// The plot front end's pipeline with its built-in defaults.
    pub fn builtin() -> Result<Self, OptionError> {
        let mut defaults = Options::new();
        defaults.insert("legend_loc", "best");
        defaults.insert("o", "unnamed.png");
        defaults.insert("x", 0);
        defaults.insert("y", 1);
        defaults.insert("border", 0.02);
        defaults.insert(
            "style",
            Scalar::List(vec!["r^-".into(), "b^-".into(), "g^-".into(), "y^-".into()]),
        );
        defaults.insert("size_inch", Scalar::List(vec![8.0.into(), 6.0.into()]));

        let mut transient = Options::new();
        transient.insert("fontsize", 12);
        transient.insert("linreg", "none");
        transient.insert("markersize", 6);

        Ok(Self::new(Registry::builtin(), valid::VALID_OPTIONS)?
            .with_defaults(defaults)
            .with_transient_defaults(transient))
    }

    /// The merged configuration before any transform runs, transient
    /// defaults included. This is what `--show-config` prints.
    pub fn merge(&self, doc: &PlotDocument, inv: &Invocation) -> Options {
        let (_, merged) = self.layer(doc, inv);
        merged
    }

    /// Precedence merge: returns the persisted snapshot and the snapshot
    /// completed with transient defaults.
    fn layer(&self, doc: &PlotDocument, inv: &Invocation) -> (Options, Options) {
        let isel = inv.isel.unwrap_or(0);

        let mut opt = self.defaults.clone();
        match doc.option_set(isel) {
            Some(stored) => opt.update(self.registry.select(stored)),
            None => warn!(
                isel,
                path = %doc.path().display(),
                "no persisted option set at this index, using defaults and overrides only"
            ),
        }
        opt.update(self.registry.select(inv.overrides.clone()));

        for flag in &inv.flags {
            opt.remove(flag);
        }

        let save = opt.clone();

        for (k, v) in self.transient_defaults.iter() {
            if !opt.contains(k) {
                opt.insert(k, v.clone());
            }
        }
        (save, opt)
    }

    /// Merge and transform without touching the document.
    pub fn resolve(&self, doc: &PlotDocument, inv: &Invocation) -> Result<Resolution, OptionError> {
        let isel = inv.isel.unwrap_or(0);
        let osel = inv.osel.unwrap_or(isel);
        let (save, mut opt) = self.layer(doc, inv);

        for (key, chain) in self.registry.entries() {
            if !opt.contains(key) {
                continue;
            }
            for transform in chain.iter().rev() {
                let value = transform(key, &opt, doc)?;
                opt.insert(key, value);
            }
            debug!(key, value = ?opt.get(key), "transformed option");
        }

        Ok(Resolution {
            config: opt,
            save,
            isel,
            osel,
        })
    }

    /// Resolve, then store the pre-transformation snapshot in the document at
    /// the output selection, replacing whatever was stored there.
    pub fn run(&self, doc: &mut PlotDocument, inv: &Invocation) -> Result<Resolution, OptionError> {
        let resolution = self.resolve(doc, inv)?;
        let snapshot: OptionSet = resolution.save.as_map().clone();
        doc.save_options(&snapshot, resolution.osel, SaveMode::Overwrite);
        Ok(resolution)
    }
}
