use a2e_lang::graph::to_mermaid;
use a2e_lang::prelude::*;
use a2e_lang::sourcemap::SourceMap;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::time::Instant;

/// Compiler, validator and simulator for the a2e workflow language
#[derive(Parser, Debug)]
#[command(name = "a2e", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile a workflow to JSONL
    Compile {
        file: String,
        /// Emit the per-operation protocol format instead of the legacy one
        #[arg(long)]
        spec: bool,
        /// Indent each message
        #[arg(long)]
        pretty: bool,
    },
    /// Report every finding in a workflow
    Validate {
        file: String,
        #[command(flatten)]
        limits: LimitArgs,
    },
    /// Print the parsed AST as JSON
    Ast { file: String },
    /// Print the operation graph as a Mermaid flowchart
    Graph { file: String },
    /// Dry-run a workflow over mock input
    Simulate {
        file: String,
        /// Mock input JSON document
        #[arg(long)]
        input: Option<String>,
        #[command(flatten)]
        limits: LimitArgs,
        /// Print the trace as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },
    /// Rebuild source text from compiled JSONL
    Decompile { file: String },
    /// Map compiled wire lines back to source spans
    Sourcemap {
        file: String,
        #[arg(long)]
        spec: bool,
    },
}

#[derive(Args, Debug)]
struct LimitArgs {
    /// JSON file with maxOperations / maxDepth / maxConditionsPerOperation
    #[arg(long)]
    limits: Option<String>,
    #[arg(long)]
    max_operations: Option<usize>,
    #[arg(long)]
    max_depth: Option<usize>,
    #[arg(long)]
    max_conditions: Option<usize>,
}

impl LimitArgs {
    /// Flags override values from the limits file.
    fn resolve(&self) -> Limits {
        let mut limits = match &self.limits {
            Some(path) => Limits::from_file(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to load limits from '{}': {}", path, e))
            }),
            None => Limits::default(),
        };
        if let Some(max) = self.max_operations {
            limits = limits.with_max_operations(max);
        }
        if let Some(max) = self.max_depth {
            limits = limits.with_max_depth(max);
        }
        if let Some(max) = self.max_conditions {
            limits = limits.with_max_conditions(max);
        }
        limits
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Compile { file, spec, pretty } => {
            let workflow = load_valid(&file, &Limits::default());
            let format = if spec { WireFormat::Spec } else { WireFormat::Legacy };
            let jsonl = compile_to_jsonl(&workflow, format, pretty)
                .unwrap_or_else(|e| exit_with_error(&format!("Compilation failed: {}", e)));
            print!("{}", jsonl);
        }
        Command::Validate { file, limits } => {
            let limits = limits.resolve();
            let workflow = load(&file);
            let findings = validate(&workflow, &limits);
            if findings.is_empty() {
                println!(
                    "'{}' is valid: {} operations",
                    workflow.name,
                    workflow.operations.len()
                );
            } else {
                report_findings(&file, &findings);
            }
        }
        Command::Ast { file } => {
            let workflow = load(&file);
            let json = serde_json::to_string_pretty(&workflow)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize AST: {}", e)));
            println!("{}", json);
        }
        Command::Graph { file } => {
            let workflow = load(&file);
            print!("{}", to_mermaid(&workflow));
        }
        Command::Simulate {
            file,
            input,
            limits,
            json,
        } => run_simulation(&file, input, &limits.resolve(), json),
        Command::Decompile { file } => {
            let jsonl = read(&file);
            let source = decompile(&jsonl)
                .unwrap_or_else(|e| exit_with_error(&format!("Decompilation failed: {}", e)));
            print!("{}", source);
        }
        Command::Sourcemap { file, spec } => {
            let workflow = load_valid(&file, &Limits::default());
            let format = if spec { WireFormat::Spec } else { WireFormat::Legacy };
            let json = SourceMap::generate(&workflow, format)
                .to_json()
                .unwrap_or_else(|e| {
                    exit_with_error(&format!("Failed to serialize source map: {}", e))
                });
            println!("{}", json);
        }
    }
}

fn run_simulation(file: &str, input: Option<String>, limits: &Limits, json: bool) {
    let total_start = Instant::now();
    let workflow = load_valid(file, limits);

    let mock = match input {
        Some(path) => MockInput::from_file(&path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load mock input from '{}': {}", path, e))
        }),
        None => MockInput::default(),
    };

    let trace = simulate(&workflow, &mock, limits);
    if json {
        let rendered = serde_json::to_string_pretty(&trace)
            .unwrap_or_else(|e| exit_with_error(&format!("Failed to serialize trace: {}", e)));
        println!("{}", rendered);
    } else {
        println!("{}", TraceFormatter::format_trace(&trace));
        println!("Simulated in {:?}", total_start.elapsed());
    }
}

fn read(file: &str) -> String {
    fs::read_to_string(file)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to read '{}': {}", file, e)))
}

fn load(file: &str) -> Workflow {
    let source = read(file);
    parse(&source).unwrap_or_else(|e| exit_with_error(&format!("{}: {}", file, e)))
}

/// Parses and validates; any finding ends the process.
fn load_valid(file: &str, limits: &Limits) -> Workflow {
    let workflow = load(file);
    let findings = validate(&workflow, limits);
    if !findings.is_empty() {
        report_findings(file, &findings);
    }
    workflow
}

fn report_findings(file: &str, findings: &[Finding]) -> ! {
    for finding in findings {
        eprintln!("{}: {}", file, finding);
    }
    exit_with_error(&format!("'{}' has {} finding(s)", file, findings.len()))
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
