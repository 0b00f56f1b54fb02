//! tessera - run net, operator and plan definitions on a fresh workspace.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tessera_core::{NetDef, OperatorDef, PlanDef, Tensor, Workspace, WorkspaceConfig};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "tessera", version, about = "Run dataflow nets and plans on a workspace")]
struct Cli {
    /// Workspace configuration (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Tensors to create before running, as a JSON map of name to
    /// `{"dims": [..], "value": x}` or `{"dims": [..], "data": [..]}`.
    /// A relative path is resolved against the configured root folder.
    #[arg(long, global = true)]
    init: Option<PathBuf>,

    /// Log the blob size report when the workspace is dropped
    #[arg(long, global = true)]
    print_blob_sizes: bool,

    /// Print every local tensor after the run
    #[arg(long, global = true)]
    dump: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build and run a net definition once
    RunNet { file: PathBuf },

    /// Build and run a single operator definition
    RunOp { file: PathBuf },

    /// Run a plan definition; Ctrl-C stops it between iterations
    RunPlan {
        file: PathBuf,

        /// Stop every step after this many iterations
        #[arg(long)]
        max_iterations: Option<u64>,
    },

    /// List registered net and operator types
    ListTypes,
}

/// Initial contents of one tensor blob.
#[derive(Debug, Deserialize)]
struct TensorInit {
    dims: Vec<usize>,
    #[serde(default)]
    value: Option<f32>,
    #[serde(default)]
    data: Option<Vec<f32>>,
}

impl TensorInit {
    fn build(self, name: &str) -> Result<Tensor> {
        match (self.data, self.value) {
            (Some(_), Some(_)) => bail!("blob {name}: give either data or value, not both"),
            (Some(data), None) => {
                let len = data.len();
                Tensor::from_vec(self.dims.clone(), data).with_context(|| {
                    format!("blob {name}: {len} elements do not fit shape {:?}", self.dims)
                })
            }
            (None, value) => Ok(Tensor::filled(self.dims, value.unwrap_or(0.0))),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_config(path: Option<&Path>, print_blob_sizes: bool) -> Result<WorkspaceConfig> {
    let mut config = match path {
        Some(path) => read_json::<WorkspaceConfig>(path)?,
        None => WorkspaceConfig::default(),
    };
    config.print_blob_sizes_at_exit |= print_blob_sizes;
    Ok(config)
}

/// Create the tensors listed in `path`, resolved against the root folder.
fn init_blobs(ws: &mut Workspace<'_>, path: &Path) -> Result<()> {
    let path = ws.resolve_path(path);
    let inits: BTreeMap<String, TensorInit> = read_json(&path)?;
    for (name, init) in inits {
        let tensor = init.build(&name)?;
        ws.create_blob(&name).set(tensor);
    }
    Ok(())
}

fn dump_tensors(ws: &Workspace<'_>) {
    for name in ws.local_blobs() {
        let Some(blob) = ws.get_blob(&name) else {
            continue;
        };
        if let Ok(tensor) = blob.get_cloned::<Tensor>() {
            println!("{name} {:?} {:?}", tensor.dims(), tensor.data());
        }
    }
}

/// Continuation predicate for plans: false once interrupted or past the
/// iteration limit.
fn plan_predicate(
    interrupted: Arc<AtomicBool>,
    max_iterations: Option<u64>,
) -> impl FnMut(u64) -> bool + Send {
    move |iter| {
        if interrupted.load(Ordering::Relaxed) {
            info!("Interrupted, stopping plan");
            return false;
        }
        max_iterations.is_none_or(|max| iter < max)
    }
}

fn run(cli: Cli) -> Result<bool> {
    let config = load_config(cli.config.as_deref(), cli.print_blob_sizes)?;
    let mut ws = Workspace::with_config(config);
    if let Some(path) = &cli.init {
        init_blobs(&mut ws, path)?;
    }

    let ok = match cli.command {
        Command::RunNet { file } => {
            let def: NetDef = read_json(&file)?;
            ws.run_net_once(&def)?
        }
        Command::RunOp { file } => {
            let def: OperatorDef = read_json(&file)?;
            ws.run_operator_once(&def)
        }
        Command::RunPlan {
            file,
            max_iterations,
        } => {
            let plan: PlanDef = read_json(&file)?;
            let interrupted = Arc::new(AtomicBool::new(false));
            signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&interrupted))
                .context("installing Ctrl-C handler")?;
            ws.run_plan(&plan, plan_predicate(interrupted, max_iterations))?
        }
        Command::ListTypes => {
            let registry = ws.registry();
            println!("nets:");
            for net_type in registry.net_types() {
                println!("  {net_type}");
            }
            println!("operators:");
            for op_type in registry.operator_types() {
                println!("  {op_type}");
            }
            true
        }
    };

    if cli.dump {
        dump_tensors(&ws);
    }
    Ok(ok)
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("Run failed");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn config_file_and_flag_are_merged() {
        let file = json_file(r#"{"root_folder": "/data", "thread_pool": {"num_threads": 2}}"#);
        let config = load_config(Some(file.path()), true).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("/data"));
        assert_eq!(config.thread_pool.num_threads, Some(2));
        assert!(config.print_blob_sizes_at_exit);
    }

    #[test]
    fn missing_config_uses_defaults() {
        let config = load_config(None, false).unwrap();
        assert_eq!(config.root_folder, PathBuf::from("."));
        assert!(!config.print_blob_sizes_at_exit);
    }

    #[test]
    fn bad_config_is_reported_with_path() {
        let file = json_file("{ not json");
        let err = load_config(Some(file.path()), false).unwrap_err();
        assert!(format!("{err:#}").contains("parsing"));
    }

    #[test]
    fn init_file_creates_tensors() {
        let file = json_file(
            r#"{
                "ones": {"dims": [2], "value": 1.0},
                "seq": {"dims": [3], "data": [1, 2, 3]}
            }"#,
        );
        let mut ws = Workspace::new();
        init_blobs(&mut ws, file.path()).unwrap();
        let seq = ws.get_blob("seq").unwrap().get_cloned::<Tensor>().unwrap();
        assert_eq!(seq.data(), &[1.0, 2.0, 3.0]);
        let ones = ws.get_blob("ones").unwrap().get_cloned::<Tensor>().unwrap();
        assert_eq!(ones.data(), &[1.0, 1.0]);
    }

    #[test]
    fn relative_init_path_uses_root_folder() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blobs.json"), r#"{"w": {"dims": [3], "value": 2}}"#).unwrap();
        let config = WorkspaceConfig {
            root_folder: dir.path().to_path_buf(),
            ..WorkspaceConfig::default()
        };
        let mut ws = Workspace::with_config(config);
        init_blobs(&mut ws, Path::new("blobs.json")).unwrap();
        let w = ws.get_blob("w").unwrap().get_cloned::<Tensor>().unwrap();
        assert_eq!(w.data(), &[2.0, 2.0, 2.0]);
    }

    #[test]
    fn init_rejects_mismatched_data() {
        let file = json_file(r#"{"bad": {"dims": [2], "data": [1, 2, 3]}}"#);
        let mut ws = Workspace::new();
        assert!(init_blobs(&mut ws, file.path()).is_err());
    }

    #[test]
    fn plan_file_runs_with_iteration_limit() {
        let init = json_file(r#"{"one": {"dims": [1], "value": 1}, "x": {"dims": [1]}}"#);
        let plan = json_file(
            r#"{
                "name": "count",
                "networks": [{
                    "name": "inc",
                    "ops": [{"type": "Add", "inputs": ["x", "one"], "outputs": ["x"]}]
                }],
                "execution_steps": [{"name": "loop", "networks": ["inc"], "num_iter": 100}]
            }"#,
        );
        let mut ws = Workspace::new();
        init_blobs(&mut ws, init.path()).unwrap();
        let plan: PlanDef = read_json(plan.path()).unwrap();
        let interrupted = Arc::new(AtomicBool::new(false));
        assert!(ws.run_plan(&plan, plan_predicate(interrupted, Some(7))).unwrap());
        let x = ws.get_blob("x").unwrap().get_cloned::<Tensor>().unwrap();
        assert_eq!(x.data(), &[7.0]);
    }

    #[test]
    fn interrupted_plan_runs_nothing() {
        let interrupted = Arc::new(AtomicBool::new(true));
        let mut predicate = plan_predicate(interrupted, None);
        assert!(!predicate(0));
    }

    #[test]
    fn cli_parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "tessera",
            "run-plan",
            "plan.json",
            "--max-iterations",
            "5",
            "--print-blob-sizes",
        ])
        .unwrap();
        assert!(cli.print_blob_sizes);
        assert!(matches!(
            cli.command,
            Command::RunPlan {
                max_iterations: Some(5),
                ..
            }
        ));
    }
}
