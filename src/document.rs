// Plot document: typed view of a converted table plus persisted option sets

use crate::accessor::Element;
use crate::error::{DocumentError, DocumentResult};
use crate::lexer::tokenize;
use crate::scalar::{coerce, Scalar};
use crate::tree::{self, Node};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PLOT: &str = "plot";
pub const PARAMETER: &str = "parameter";
pub const LABEL: &str = "label";
pub const DATA: &str = "data";
pub const ROW: &str = "d";
pub const PLOT_OPTION: &str = "plot_option";

/// One persisted rendering configuration.
pub type OptionSet = IndexMap<String, Scalar>;

/// How a saved option set combines with what is already stored at its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveMode {
    /// Replace the stored set entirely.
    #[default]
    Overwrite,
    /// Keep stored keys that the new set does not mention.
    Merge,
}

#[derive(Debug, Clone)]
pub struct PlotDocument {
    path: PathBuf,
    root: Node,
    labels: Vec<String>,
    parameters: IndexMap<String, Scalar>,
    rows: Vec<Vec<Scalar>>,
}

impl PlotDocument {
    pub fn open(path: &Path) -> DocumentResult<Self> {
        let root = tree::read(path)?;
        Self::from_node(root, path.to_path_buf())
    }

    /// Build the read view over an already parsed tree stored at `path`.
    pub fn from_node(root: Node, path: PathBuf) -> DocumentResult<Self> {
        let plot = Element::new(&root);

        let labels: Vec<String> = plot
            .require(LABEL)?
            .text()
            .map(|t| tokenize(t).iter().map(|tok| coerce(tok).to_string()).collect())
            .unwrap_or_default();

        let parameters = plot
            .child(PARAMETER)
            .one()
            .map(|p| p.parameters())
            .unwrap_or_default();

        let rows: Vec<Vec<Scalar>> = plot
            .require(DATA)?
            .child(ROW)
            .into_vec()
            .into_iter()
            .map(|d| d.text().map(|t| tokenize(t).iter().map(|tok| coerce(tok)).collect()))
            .map(Option::unwrap_or_default)
            .collect();

        let varying = labels.iter().filter(|l| !parameters.contains_key(*l)).count();
        if let Some((idx, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != varying) {
            return Err(DocumentError::Malformed {
                pos: 0,
                message: format!(
                    "data row {} has {} values, labels leave {} varying columns",
                    idx,
                    row.len(),
                    varying
                ),
            });
        }

        debug!(
            path = %path.display(),
            columns = labels.len(),
            constant = parameters.len(),
            rows = rows.len(),
            "opened plot document"
        );

        Ok(Self {
            path,
            root,
            labels,
            parameters,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// All column names in original order, constant and varying.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Constant columns folded into the document.
    pub fn parameters(&self) -> &IndexMap<String, Scalar> {
        &self.parameters
    }

    /// Varying-column values, one entry per row.
    pub fn rows(&self) -> &[Vec<Scalar>] {
        &self.rows
    }

    pub fn label_index(&self, name: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == name)
    }

    /// The full column set in label order; constant columns repeat their
    /// parameter value once per row.
    pub fn columns(&self) -> Vec<Vec<Scalar>> {
        let mut varying = 0;
        self.labels
            .iter()
            .map(|label| match self.parameters.get(label) {
                Some(value) => vec![value.clone(); self.rows.len()],
                None => {
                    let col = self.rows.iter().map(|r| r[varying].clone()).collect();
                    varying += 1;
                    col
                }
            })
            .collect()
    }

    pub fn column(&self, idx: usize) -> Option<Vec<Scalar>> {
        self.columns().into_iter().nth(idx)
    }

    /// Persisted option sets in index order.
    pub fn option_sets(&self) -> Vec<OptionSet> {
        Element::new(&self.root)
            .child(PLOT_OPTION)
            .into_vec()
            .into_iter()
            .map(|e| e.parameters())
            .collect()
    }

    pub fn option_set(&self, sel: usize) -> Option<OptionSet> {
        self.root
            .children_named(PLOT_OPTION)
            .nth(sel)
            .map(|node| Element::new(node).parameters())
    }

    /// Store `set` at index `sel`, appending empty sets when the document has
    /// fewer than `sel + 1`. Does not touch the file; see [`PlotDocument::write`].
    pub fn save_options(&mut self, set: &OptionSet, sel: usize, mode: SaveMode) {
        let existing = self.root.children_named(PLOT_OPTION).count();
        for _ in existing..=sel {
            self.root.push(Node::new(PLOT_OPTION));
        }

        if let Some(node) = self.root.children_named_mut(PLOT_OPTION).nth(sel) {
            if mode == SaveMode::Overwrite {
                node.attributes.clear();
            }
            for (k, v) in set {
                node.attributes.insert(k.clone(), v.to_string());
            }
        }
    }

    /// Join documents into one plot source. Labels get a two-digit file
    /// index prefix (`00_energy`), every column of every document is kept
    /// side by side, and only parameters equal in all documents survive.
    /// The path and option sets are those of the first document.
    pub fn join(docs: &[PlotDocument]) -> DocumentResult<PlotDocument> {
        let (first, rest) = docs.split_first().ok_or_else(|| DocumentError::Join {
            message: "no documents given".to_string(),
        })?;
        if rest.is_empty() {
            return Ok(first.clone());
        }

        let shared = first
            .parameters
            .iter()
            .filter(|(k, v)| rest.iter().all(|d| d.parameters.get(*k) == Some(*v)))
            .map(|(k, v)| (k.clone(), v.to_token()));

        let n_rows = first.rows.len();
        let mut labels = Vec::new();
        let mut columns = Vec::new();
        for (idx, doc) in docs.iter().enumerate() {
            if doc.rows.len() != n_rows {
                return Err(DocumentError::Join {
                    message: format!(
                        "{} has {} rows, {} has {}",
                        doc.path.display(),
                        doc.rows.len(),
                        first.path.display(),
                        n_rows
                    ),
                });
            }
            labels.extend(
                doc.labels
                    .iter()
                    .map(|l| Scalar::Str(format!("{:02}_{}", idx, l)).to_token()),
            );
            columns.extend(doc.columns());
        }

        let mut root = Node::new(PLOT);
        root.push(Node::new(PARAMETER).with_attributes(shared));
        root.push(Node::new(LABEL).with_text(labels.join(" ")));
        let mut data = Node::new(DATA);
        for row in 0..n_rows {
            let tokens: Vec<String> = columns.iter().map(|col| col[row].to_token()).collect();
            data.push(Node::new(ROW).with_text(tokens.join(" ")));
        }
        root.push(data);
        for set in first.root.children_named(PLOT_OPTION) {
            root.push(set.clone());
        }

        debug!(documents = docs.len(), columns = columns.len(), "joined documents");
        Self::from_node(root, first.path.clone())
    }

    /// Persist the tree back to the document's own path.
    pub fn write(&mut self, indent: &str) -> DocumentResult<()> {
        tree::write(&mut self.root, &self.path, indent)
    }
}

/// Copy option set `isel` of `from` into `to` at `osel`, replacing what was there.
pub fn copy_options(
    from: &PlotDocument,
    isel: usize,
    to: &mut PlotDocument,
    osel: usize,
) -> DocumentResult<()> {
    let set = from.option_set(isel).ok_or_else(|| DocumentError::MissingChild {
        node: format!("{} ({})", PLOT, from.path.display()),
        child: format!("{}[{}]", PLOT_OPTION, isel),
    })?;
    to.save_options(&set, osel, SaveMode::Overwrite);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse;

    fn sample() -> PlotDocument {
        let root = parse(
            "<plot><parameter a=\"1\" /><label>a b c</label>\
             <data><d>2 x</d><d>3 \"y z\"</d></data></plot>",
        )
        .unwrap();
        PlotDocument::from_node(root, PathBuf::from("sample.xml")).unwrap()
    }

    #[test]
    fn test_read_view() {
        let doc = sample();
        assert_eq!(doc.labels(), &["a", "b", "c"]);
        assert_eq!(doc.parameters()["a"], Scalar::Int(1));
        assert_eq!(doc.rows()[1], vec![Scalar::Int(3), Scalar::Str("y z".into())]);
    }

    #[test]
    fn test_columns_expand_constants() {
        let doc = sample();
        let cols = doc.columns();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0], vec![Scalar::Int(1), Scalar::Int(1)]);
        assert_eq!(cols[1], vec![Scalar::Int(2), Scalar::Int(3)]);
        assert_eq!(doc.label_index("c"), Some(2));
    }

    #[test]
    fn test_inconsistent_rows_rejected() {
        let root = parse("<plot><label>a b</label><data><d>1</d></data></plot>").unwrap();
        let res = PlotDocument::from_node(root, PathBuf::from("x.xml"));
        assert!(matches!(res, Err(DocumentError::Malformed { .. })));
    }

    #[test]
    fn test_missing_sections() {
        let root = parse("<plot><label>a</label></plot>").unwrap();
        let res = PlotDocument::from_node(root, PathBuf::from("x.xml"));
        assert!(matches!(res, Err(DocumentError::MissingChild { .. })));
    }

    #[test]
    fn test_save_options_overwrite() {
        let mut doc = sample();
        let mut first = OptionSet::new();
        first.insert("x".into(), "a".into());
        first.insert("title".into(), "T".into());
        doc.save_options(&first, 0, SaveMode::Overwrite);

        let mut second = OptionSet::new();
        second.insert("y".into(), Scalar::List(vec!["b".into(), "c".into()]));
        doc.save_options(&second, 0, SaveMode::Overwrite);

        let sets = doc.option_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].len(), 1);
        assert_eq!(sets[0]["y"], Scalar::List(vec!["b".into(), "c".into()]));
    }

    #[test]
    fn test_save_options_merge_and_padding() {
        let mut doc = sample();
        let mut first = OptionSet::new();
        first.insert("x".into(), "a".into());
        doc.save_options(&first, 2, SaveMode::Overwrite);
        assert_eq!(doc.option_sets().len(), 3);
        assert!(doc.option_sets()[0].is_empty());

        let mut second = OptionSet::new();
        second.insert("y".into(), 1.into());
        doc.save_options(&second, 2, SaveMode::Merge);
        let set = doc.option_set(2).unwrap();
        assert_eq!(set["x"], Scalar::Str("a".into()));
        assert_eq!(set["y"], Scalar::Int(1));
    }

    fn run(src: &str, path: &str) -> PlotDocument {
        let table = crate::table::Table::parse(src.lines(), &crate::settings::Settings::default()).unwrap();
        PlotDocument::from_node(table.to_tree(), PathBuf::from(path)).unwrap()
    }

    #[test]
    fn test_join_prefixes_labels_and_keeps_shared_parameters() {
        let mut a = run("L T t e\n8 0.5 0 1.5\n8 0.5 1 2.5\n", "runs/a.xml");
        let mut set = OptionSet::new();
        set.insert("title".into(), "joined".into());
        a.save_options(&set, 1, SaveMode::Overwrite);
        let b = run("L T t e\n8 0.7 0 3.5\n8 0.7 1 4.5\n", "runs/b.xml");

        let joined = PlotDocument::join(&[a, b]).unwrap();
        assert_eq!(
            joined.labels(),
            &["00_L", "00_T", "00_t", "00_e", "01_L", "01_T", "01_t", "01_e"]
        );
        assert_eq!(joined.parameters().len(), 1);
        assert_eq!(joined.parameters()["L"], Scalar::Int(8));
        assert_eq!(joined.rows().len(), 2);
        assert_eq!(joined.rows()[1][3], Scalar::Float(2.5));
        assert_eq!(joined.rows()[1][5], Scalar::Float(0.7));
        assert_eq!(joined.column(7).unwrap(), vec![Scalar::Float(3.5), Scalar::Float(4.5)]);
        assert_eq!(joined.path(), Path::new("runs/a.xml"));
        assert_eq!(joined.option_set(1).unwrap()["title"], Scalar::Str("joined".into()));
    }

    #[test]
    fn test_join_edge_cases() {
        assert!(matches!(PlotDocument::join(&[]), Err(DocumentError::Join { .. })));

        let single = sample();
        let joined = PlotDocument::join(std::slice::from_ref(&single)).unwrap();
        assert_eq!(joined.labels(), single.labels());

        let short = run("t e\n0 1\n", "c.xml");
        let long = run("t e\n0 1\n1 2\n", "d.xml");
        assert!(matches!(
            PlotDocument::join(&[short, long]),
            Err(DocumentError::Join { .. })
        ));
    }

    #[test]
    fn test_copy_options() {
        let mut from = sample();
        let mut set = OptionSet::new();
        set.insert("o".into(), "out.png".into());
        from.save_options(&set, 0, SaveMode::Overwrite);

        let mut to = sample();
        copy_options(&from, 0, &mut to, 1).unwrap();
        assert_eq!(to.option_set(1).unwrap()["o"], Scalar::Str("out.png".into()));
        assert!(copy_options(&from, 5, &mut to, 0).is_err());
    }
}
