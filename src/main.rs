use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser as ClapParser, Subcommand};
use colored::Colorize;
use serde_json::{Map, Value as Json};

use axiom::contract::{value_to_json, Contract};
use axiom::engine;
use axiom::value::axiom_repr;

#[derive(ClapParser)]
#[command(name = "axiom", about = "The Axiom rule language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile, check and execute a rule
    Run {
        rule: String,
        /// Contract JSON declaring the rule's inputs and output
        #[arg(long)]
        contract: String,
        /// Context JSON with the input data (default: empty object)
        #[arg(long)]
        context: Option<String>,
        /// Print the result as JSON instead of the plain representation
        #[arg(long)]
        json: bool,
    },
    /// Compile and type-check a rule without executing it
    Check {
        rule: String,
        /// Contract JSON declaring the rule's inputs and output
        #[arg(long)]
        contract: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run {
            rule,
            contract,
            context,
            json,
        } => cmd_run(&rule, &contract, context.as_deref(), json),
        Commands::Check { rule, contract } => cmd_check(&rule, &contract),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{}", msg.red());
            ExitCode::FAILURE
        }
    }
}

fn cmd_run(
    rule_path: &str,
    contract_path: &str,
    context_path: Option<&str>,
    as_json: bool,
) -> Result<(), String> {
    let source = read_file(rule_path)?;
    let contract = load_contract(contract_path)?;
    let context = match context_path {
        Some(path) => load_json(path)?,
        None => Json::Object(Map::new()),
    };

    let program = engine::compile(&source).map_err(|e| with_file(rule_path, e))?;
    engine::check(&program, &contract).map_err(|e| with_file(rule_path, e))?;
    let value =
        engine::execute(&program, &contract, &context).map_err(|e| with_file(rule_path, e))?;

    if as_json {
        println!("{}", value_to_json(&value));
    } else {
        println!("{}", axiom_repr(&value));
    }
    Ok(())
}

fn cmd_check(rule_path: &str, contract_path: &str) -> Result<(), String> {
    let source = read_file(rule_path)?;
    let contract = load_contract(contract_path)?;
    let program = engine::compile(&source).map_err(|e| with_file(rule_path, e))?;
    let ty = engine::check(&program, &contract).map_err(|e| with_file(rule_path, e))?;
    println!("{}", format!("ok: result type {}", ty.display()).green());
    Ok(())
}

fn with_file(path: &str, err: axiom::error::Error) -> String {
    format!("{}: {}", path, err)
}

fn read_file(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Cannot open file '{}': {}", path, e))
}

fn load_json(path: &str) -> Result<Json, String> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|e| format!("Invalid JSON in '{}': {}", path, e))
}

/// Load a contract document and resolve file references inside its
/// `inputs` / `outputs` type specs: a spec string ending in `.json` or
/// starting with `./` or `/` is replaced by the parsed content of that
/// file, resolved relative to the referencing document.
fn load_contract(path: &str) -> Result<Contract, String> {
    let doc = load_json(path)?;
    let base = Path::new(path)
        .parent()
        .unwrap_or(Path::new("."))
        .to_path_buf();

    let Json::Object(mut obj) = doc else {
        return Err(format!("Contract '{}' must be a JSON object", path));
    };

    // A contract without a name gets the file stem; this also covers the
    // legacy flat-schema form once wrapped as {inputs: ..}.
    if !obj.contains_key("name") {
        let stem = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("rule");
        obj.insert("name".to_string(), Json::String(stem.to_string()));
    }

    let mut loading = Vec::new();
    if let Some(inputs) = obj.get_mut("inputs") {
        if let Json::Object(map) = inputs {
            let mut resolved = Map::new();
            for (key, spec) in map.iter() {
                resolved.insert(key.clone(), resolve_spec(spec, &base, &mut loading)?);
            }
            *inputs = Json::Object(resolved);
        }
    }
    if let Some(outputs) = obj.get_mut("outputs") {
        let resolved = resolve_spec(outputs, &base, &mut loading)?;
        *outputs = resolved;
    }

    Contract::from_json(&Json::Object(obj)).map_err(|e| format!("{}: {}", path, e))
}

fn is_file_ref(s: &str) -> bool {
    s.ends_with(".json") || s.starts_with("./") || s.starts_with('/')
}

/// Recursively resolve file references inside a type spec. `loading`
/// tracks the open reference chain so cycles are reported, not followed.
fn resolve_spec(spec: &Json, base: &Path, loading: &mut Vec<PathBuf>) -> Result<Json, String> {
    match spec {
        Json::String(s) if is_file_ref(s) => {
            let path = base.join(s);
            let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
            if loading.contains(&canonical) {
                return Err(format!(
                    "Circular contract reference: {}",
                    ref_chain(loading, &canonical)
                ));
            }
            loading.push(canonical.clone());
            let result = (|| {
                let doc = load_json(&path.to_string_lossy())?;
                let next_base = canonical.parent().unwrap_or(base).to_path_buf();
                resolve_spec(&doc, &next_base, loading)
            })();
            loading.pop();
            result
        }
        Json::Array(items) => {
            let resolved: Result<Vec<Json>, String> = items
                .iter()
                .map(|item| resolve_spec(item, base, loading))
                .collect();
            Ok(Json::Array(resolved?))
        }
        Json::Object(map) => {
            let mut resolved = Map::new();
            for (key, value) in map {
                resolved.insert(key.clone(), resolve_spec(value, base, loading)?);
            }
            Ok(Json::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}

fn ref_chain(loading: &[PathBuf], next: &Path) -> String {
    let mut chain: Vec<String> = loading.iter().map(|p| display_name(p)).collect();
    chain.push(display_name(next));
    chain.join(" -> ")
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("?")
        .to_string()
}
