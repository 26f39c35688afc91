mod manifest;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fieldscript::Script;
use scriptlift_core::decompile::{decompile_batch, disassemble};
use scriptlift_core::{ArgOrder, GeneratorConfig, ScriptReport, Target};
use scriptlift_frontend_field::FieldTarget;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use crate::manifest::{load_manifest, DEFAULT_MANIFEST};

#[derive(Parser)]
#[command(name = "scriptlift", about = "Field-script bytecode decompiler")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decompile scripts to pseudocode.
    Decompile {
        /// Script files (FSCR containers, or raw code with --raw).
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        input: InputArgs,
        /// Operand order for binary operators: "fifo" or "lifo".
        #[arg(long)]
        binary_order: Option<ArgOrder>,
        /// Argument order for calls: "fifo" or "lifo".
        #[arg(long)]
        call_order: Option<ArgOrder>,
        /// Write `<name>.lua` files here instead of printing.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List decoded instructions per function.
    Disasm {
        file: PathBuf,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Decompile every script listed in a manifest.
    Emit {
        /// Path to the manifest.
        #[arg(long, default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,
        /// Override the manifest's binary operand order.
        #[arg(long)]
        binary_order: Option<ArgOrder>,
        /// Override the manifest's call argument order.
        #[arg(long)]
        call_order: Option<ArgOrder>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Treat input files as bare code bytes.
    #[arg(long)]
    raw: bool,
    /// Entry offset of a function in raw code (hex with 0x, or decimal). Repeatable.
    #[arg(long = "entry", value_parser = parse_address)]
    entries: Vec<u32>,
}

fn parse_address(s: &str) -> Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid address {s:?}: {e}"))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn find_target(name: &str) -> Option<Box<dyn Target>> {
    match name {
        "field" => Some(Box::new(FieldTarget::new())),
        _ => None,
    }
}

fn script_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read a script file. Raw files take their entry offsets from the caller.
fn load_script(path: &Path, name: String, raw: bool, entries: &[u32]) -> Result<Script> {
    let data = fs::read(path).with_context(|| format!("failed to read script: {}", path.display()))?;
    if raw {
        return Ok(Script::from_raw(name, data, entries.to_vec()));
    }
    if !Script::is_container(&data) {
        bail!("{} is not an FSCR container (pass --raw for bare code)", path.display());
    }
    Script::parse(name, &data).with_context(|| format!("failed to parse script: {}", path.display()))
}

/// Text printed for one report on stdout. With several reports each one is
/// introduced by a `-- <script>` line and separated by a blank line.
fn stdout_text(report: &ScriptReport, index: usize, total: usize) -> String {
    if total <= 1 {
        return report.output.clone();
    }
    let separator = if index == 0 { "" } else { "\n" };
    format!("{separator}-- {}\n{}", report.name, report.output)
}

/// Print or write each report. Returns the number of failed functions.
fn deliver(reports: &[ScriptReport], output_dir: Option<&Path>) -> Result<usize> {
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let mut failed = 0;
    for (index, report) in reports.iter().enumerate() {
        match output_dir {
            Some(dir) => {
                let path = dir.join(format!("{}.lua", report.name));
                fs::write(&path, &report.output).with_context(|| format!("failed to write {}", path.display()))?;
                info!(script = %report.name, path = %path.display(), "wrote script");
            }
            None => print!("{}", stdout_text(report, index, reports.len())),
        }
        for failure in &report.failures {
            error!(script = %report.name, "{failure}");
        }
        failed += report.failures.len();
    }
    Ok(failed)
}

fn exit_status(failed: usize) -> ExitCode {
    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        error!(failed, "some functions could not be decompiled");
        ExitCode::FAILURE
    }
}

fn cmd_decompile(files: &[PathBuf], input: &InputArgs, config: GeneratorConfig, output: Option<&Path>) -> Result<ExitCode> {
    let target = FieldTarget::new();
    let scripts = files
        .iter()
        .map(|path| load_script(path, script_name(path), input.raw, &input.entries))
        .collect::<Result<Vec<_>>>()?;
    let reports = decompile_batch(&target, &scripts, config);
    Ok(exit_status(deliver(&reports, output)?))
}

fn cmd_disasm(file: &Path, input: &InputArgs) -> Result<ExitCode> {
    let target = FieldTarget::new();
    let script = load_script(file, script_name(file), input.raw, &input.entries)?;
    let report = disassemble(&target, &script);
    Ok(exit_status(deliver(std::slice::from_ref(&report), None)?))
}

fn cmd_emit(manifest_path: &Path, binary_order: Option<ArgOrder>, call_order: Option<ArgOrder>) -> Result<ExitCode> {
    let manifest = load_manifest(manifest_path)?;
    let Some(target) = find_target(&manifest.target) else {
        bail!("unknown target {:?} (valid: \"field\")", manifest.target);
    };
    let config = GeneratorConfig::new(
        binary_order.or(manifest.binary_order).unwrap_or_default(),
        call_order.or(manifest.call_order).unwrap_or_default(),
    );

    let scripts = manifest
        .scripts
        .iter()
        .map(|entry| {
            let name = entry.name.clone().unwrap_or_else(|| script_name(&entry.path));
            load_script(&entry.path, name, entry.raw, &entry.entries)
        })
        .collect::<Result<Vec<_>>>()?;

    let reports = decompile_batch(target.as_ref(), &scripts, config);
    let failed = deliver(&reports, Some(&manifest.output_dir))?;
    println!("Emitted {} script(s) to {}", reports.len(), manifest.output_dir.display());
    Ok(exit_status(failed))
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();
    match &cli.command {
        Command::Decompile {
            files,
            input,
            binary_order,
            call_order,
            output,
        } => {
            let config = GeneratorConfig::new(binary_order.unwrap_or_default(), call_order.unwrap_or_default());
            cmd_decompile(files, input, config, output.as_deref())
        }
        Command::Disasm { file, input } => cmd_disasm(file, input),
        Command::Emit {
            manifest,
            binary_order,
            call_order,
        } => cmd_emit(manifest, *binary_order, *call_order),
    }
}
