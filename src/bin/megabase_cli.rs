use megabase::batch::{BuildRequest, build_batch};
use megabase::manifest::{MANIFEST_FILE_NAME, emit_batch};
use megabase::nucleotide;
use megabase::part::{Module, PartRegistry};
use megabase::recipe::{Assembler, ConstructLayout, Recipe};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::{env, fs};

const DEFAULT_OUTPUT_DIR: &str = "constructs";

/// Everything one batch run needs: part sequences as plain strings, the
/// filler, optional layout overrides, and the requested builds.
#[derive(Deserialize)]
struct BatchSpec {
    modules: BTreeMap<String, String>,
    filler: String,
    #[serde(default)]
    layout: ConstructLayout,
    runs: Vec<BuildRequest>,
}

#[derive(Serialize)]
struct BuiltSummary {
    construct: String,
    length: usize,
    fasta: String,
}

#[derive(Serialize)]
struct FailureSummary {
    construct: String,
    error: String,
}

#[derive(Serialize)]
struct RunSummary {
    built: Vec<BuiltSummary>,
    failures: Vec<FailureSummary>,
    manifest: String,
}

fn usage() {
    eprintln!(
        "Usage:\n  \
  megabase_cli --version\n  \
  megabase_cli [--out DIR] build '<batch-json>'\n  \
  megabase_cli recipe-name '<recipe-json>'\n  \
  megabase_cli layout\n\n  \
  Tip: pass @file.json instead of inline JSON"
    );
}

fn load_json_arg(value: &str) -> Result<String, String> {
    if let Some(path) = value.strip_prefix('@') {
        fs::read_to_string(path).map_err(|e| format!("Could not read JSON file '{path}': {e}"))
    } else {
        Ok(value.to_string())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| format!("Could not serialize JSON output: {e}"))?;
    println!("{text}");
    Ok(())
}

fn parse_global_out_arg(args: &[String]) -> (String, usize) {
    if args.len() >= 3 && args[1] == "--out" {
        return (args[2].clone(), 3);
    }
    (DEFAULT_OUTPUT_DIR.to_string(), 1)
}

fn canonical_sequence(name: &str, raw: &str) -> Result<Vec<u8>, String> {
    let sequence = nucleotide::normalize(raw);
    if sequence.is_empty() {
        return Err(format!("Sequence '{name}' is empty"));
    }
    if !nucleotide::is_canonical_sequence(&sequence) {
        return Err(format!("Sequence '{name}' contains non-ACGT bases"));
    }
    Ok(sequence)
}

fn run_build(spec: BatchSpec, out_dir: &str) -> Result<(), String> {
    let mut registry = PartRegistry::new();
    for (name, raw) in &spec.modules {
        canonical_sequence(name, raw)?;
        registry.insert(Module::new(name, raw));
    }
    let filler = canonical_sequence("filler", &spec.filler)?;

    let assembler =
        Assembler::new(registry, filler, spec.layout).map_err(|e| e.to_string())?;
    let outcome = build_batch(&assembler, &spec.runs);

    for failure in &outcome.failures {
        eprintln!("Failed to build '{}': {}", failure.name, failure.error);
    }

    let manifest = emit_batch(Path::new(out_dir), &outcome.built).map_err(|e| e.to_string())?;
    let manifest_path = Path::new(out_dir).join(MANIFEST_FILE_NAME);
    manifest
        .save_to_path(&manifest_path.to_string_lossy())
        .map_err(|e| e.to_string())?;

    let summary = RunSummary {
        built: manifest
            .entries
            .iter()
            .map(|entry| BuiltSummary {
                construct: entry.construct.clone(),
                length: entry.length,
                fasta: entry.fasta.clone().unwrap_or_default(),
            })
            .collect(),
        failures: outcome
            .failures
            .iter()
            .map(|failure| FailureSummary {
                construct: failure.name.clone(),
                error: failure.error.to_string(),
            })
            .collect(),
        manifest: manifest_path.to_string_lossy().to_string(),
    };
    print_json(&summary)
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args: Vec<String> = env::args().collect();
    if args.len() <= 1 {
        usage();
        return Err("Missing command".to_string());
    }
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("megabase_cli {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let (out_dir, cmd_idx) = parse_global_out_arg(&args);
    if args.len() <= cmd_idx {
        usage();
        return Err("Missing command".to_string());
    }

    let command = &args[cmd_idx];

    match command.as_str() {
        "build" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing batch JSON".to_string());
            }
            let json = load_json_arg(&args[cmd_idx + 1])?;
            let spec: BatchSpec =
                serde_json::from_str(&json).map_err(|e| format!("Invalid batch JSON: {e}"))?;
            run_build(spec, &out_dir)
        }
        "recipe-name" => {
            if args.len() <= cmd_idx + 1 {
                usage();
                return Err("Missing recipe JSON".to_string());
            }
            let json = load_json_arg(&args[cmd_idx + 1])?;
            let recipe: Recipe =
                serde_json::from_str(&json).map_err(|e| format!("Invalid recipe JSON: {e}"))?;
            println!("{}", recipe.name());
            Ok(())
        }
        "layout" => print_json(&ConstructLayout::default()),
        other => {
            usage();
            Err(format!("Unknown command '{other}'"))
        }
    }
}
