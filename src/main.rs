use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use plotxml::{coerce, copy_options, graph, table, Invocation, Pipeline, PlotDocument, Scalar, Settings};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plotxml")]
#[command(about = "Convert whitespace tables to plot documents and render them", long_about = None)]
struct Args {
    /// JSON settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert text tables into plot documents
    Convert {
        files: Vec<PathBuf>,
        /// Destination directory (defaults to each source's directory)
        #[arg(short, long)]
        dest: Option<PathBuf>,
    },
    /// Resolve plot options, render and save the options back. Several files
    /// are joined into one plot unless --parallel is given.
    Plot {
        files: Vec<PathBuf>,
        /// Plot each file on its own instead of joining them
        #[arg(long)]
        parallel: bool,
        /// Option override, e.g. -s 'y=[energy, mag]'
        #[arg(short = 's', long = "set", value_parser = parse_override)]
        overrides: Vec<(String, Scalar)>,
        /// Drop a resolved option, e.g. -f title
        #[arg(short = 'f', long = "flag")]
        flags: Vec<String>,
        /// Persisted option set to start from
        #[arg(long)]
        isel: Option<usize>,
        /// Index to save the options to (defaults to --isel)
        #[arg(long)]
        osel: Option<usize>,
        /// Print the merged configuration as JSON instead of rendering
        #[arg(long)]
        show_config: bool,
    },
    /// List the column labels of a document
    Labels { file: PathBuf },
    /// Write a document's columns as a whitespace table
    Export {
        file: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Copy a persisted option set from one document into others
    CpOpt {
        from: PathBuf,
        #[arg(required = true)]
        to: Vec<PathBuf>,
        #[arg(long, default_value_t = 0)]
        isel: usize,
        /// Defaults to --isel
        #[arg(long)]
        osel: Option<usize>,
    },
}

fn parse_override(raw: &str) -> Result<(String, Scalar), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty option name in '{}'", raw));
    }
    Ok((key.to_string(), coerce(value)))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plotxml=info")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match args.command {
        Command::Convert { files, dest } => {
            for src in &files {
                let dir = match &dest {
                    Some(d) => d.clone(),
                    None => src.parent().map(Path::to_path_buf).unwrap_or_default(),
                };
                table::convert_file(src, &dir, &settings)
                    .with_context(|| format!("Failed to convert {}", src.display()))?;
            }
        }
        Command::Plot {
            files,
            parallel,
            overrides,
            flags,
            isel,
            osel,
            show_config,
        } => {
            let inv = Invocation {
                overrides: overrides.into_iter().collect::<IndexMap<_, _>>(),
                flags,
                isel,
                osel,
            };
            let pipeline = Pipeline::builtin()?;
            if parallel || files.len() < 2 {
                for file in &files {
                    plot(&pipeline, file, &inv, &settings, show_config)
                        .with_context(|| format!("Failed to plot {}", file.display()))?;
                }
            } else {
                plot_joined(&pipeline, &files, &inv, &settings, show_config)?;
            }
        }
        Command::Labels { file } => {
            let doc = PlotDocument::open(&file)?;
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for (idx, label) in doc.labels().iter().enumerate() {
                writeln!(handle, "{:>3}  {}", idx, label)?;
            }
        }
        Command::Export { file, output } => {
            let doc = PlotDocument::open(&file)?;
            match output {
                Some(path) => {
                    let out = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    table::export(&doc, out)?;
                }
                None => table::export(&doc, io::stdout().lock())?,
            }
        }
        Command::CpOpt { from, to, isel, osel } => {
            let source = PlotDocument::open(&from)?;
            let osel = osel.unwrap_or(isel);
            for path in &to {
                let mut doc = PlotDocument::open(path)?;
                copy_options(&source, isel, &mut doc, osel)?;
                doc.write(&settings.indent)?;
                info!(from = %from.display(), to = %path.display(), isel, osel, "copied option set");
            }
        }
    }

    Ok(())
}

fn plot(
    pipeline: &Pipeline,
    file: &Path,
    inv: &Invocation,
    settings: &Settings,
    show_config: bool,
) -> Result<()> {
    let mut doc = PlotDocument::open(file)?;

    if show_config {
        return print_config(pipeline, &doc, inv);
    }

    let resolution = pipeline.run(&mut doc, inv)?;
    let out = graph::render(resolution.config(), &doc, &settings.render)?;
    doc.write(&settings.indent)?;
    info!(
        document = %file.display(),
        output = %out.display(),
        osel = resolution.osel(),
        "plotted"
    );
    Ok(())
}

/// Plot several documents as one. The joined view starts from option set 1
/// unless --isel is given, and the result is saved into the first document.
fn plot_joined(
    pipeline: &Pipeline,
    files: &[PathBuf],
    inv: &Invocation,
    settings: &Settings,
    show_config: bool,
) -> Result<()> {
    let mut docs = files
        .iter()
        .map(|f| PlotDocument::open(f).with_context(|| format!("Failed to open {}", f.display())))
        .collect::<Result<Vec<_>>>()?;
    let mut joined = PlotDocument::join(&docs)?;
    let inv = Invocation {
        isel: inv.isel.or(Some(1)),
        ..inv.clone()
    };

    if show_config {
        return print_config(pipeline, &joined, &inv);
    }

    let resolution = pipeline.run(&mut joined, &inv)?;
    let out = graph::render(resolution.config(), &joined, &settings.render)?;

    let mut first = docs.swap_remove(0);
    copy_options(&joined, resolution.osel(), &mut first, resolution.osel())?;
    first.write(&settings.indent)?;
    info!(
        documents = files.len(),
        output = %out.display(),
        osel = resolution.osel(),
        "plotted joined documents"
    );
    Ok(())
}

fn print_config(pipeline: &Pipeline, doc: &PlotDocument, inv: &Invocation) -> Result<()> {
    let merged = pipeline.merge(doc, inv);
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(())
}
