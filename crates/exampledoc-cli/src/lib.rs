mod logging;

use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use exampledoc_config::{Config, LoadOptions};
use exampledoc_core::{DialectKind, DocumentFormat, ParseOutcome};
use exampledoc_ops::{OperationError, Operations, PageSpec, PageStatus, PassReport};
use serde_json::json;

/// Entry point for CLI execution. Returns the desired exit code.
pub fn run() -> Result<i32> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let mut load = LoadOptions::default();
    if let Some(path) = &cli.config {
        load = load.with_override_path(path);
    }
    let config = match Config::load(load) {
        Ok(config) => config,
        Err(err) => return report(OperationError::from(err)),
    };
    let ops = Operations::new(config);

    let outcome = match cli.command {
        Command::Generate(args) => handle_generate(&ops, args),
        Command::Check(args) => handle_check(&ops, args),
        Command::Render(args) => handle_render(&ops, args),
        Command::Sections(args) => handle_sections(&ops, args),
    };

    match outcome {
        Ok(code) => Ok(code),
        Err(err) => match err.downcast::<OperationError>() {
            Ok(err) => report(err),
            Err(err) => Err(err),
        },
    }
}

fn report(err: OperationError) -> Result<i32> {
    eprintln!("exampledoc: {err}");
    Ok(err.exit_code().code())
}

fn handle_generate(ops: &Operations, args: GenerateArgs) -> Result<i32> {
    let GenerateArgs { pages, render } = args;

    for settings in ops.select_pages(&pages)? {
        let options = ops.options_for(Some(settings), render.format(), render.strict);
        let page = PageSpec::from(settings);
        let generated = ops.write_page(&page, &options)?;
        if !render.quiet {
            println!(
                "wrote {} ({})",
                settings.output.display(),
                summarize(&generated.passes)
            );
        }
    }
    Ok(0)
}

fn handle_check(ops: &Operations, args: CheckArgs) -> Result<i32> {
    let CheckArgs {
        pages,
        diff,
        render,
    } = args;

    let mut exit_code = 0;
    for settings in ops.select_pages(&pages)? {
        let options = ops.options_for(Some(settings), render.format(), render.strict);
        let page = PageSpec::from(settings);
        let path = settings.output.display();
        let status = ops.check_page(&page, &options)?;
        if !status.is_current() {
            exit_code = 1;
        }
        match status {
            PageStatus::UpToDate if !render.quiet => println!("up to date: {path}"),
            PageStatus::UpToDate => {}
            PageStatus::Missing => println!("missing: {path}"),
            PageStatus::Stale { diff: patch } => {
                println!("stale: {path}");
                if diff {
                    emit(&patch)?;
                }
            }
        }
    }
    Ok(exit_code)
}

fn handle_render(ops: &Operations, args: RenderArgs) -> Result<i32> {
    let RenderArgs {
        executable,
        source,
        script,
        listings,
        output,
        render,
    } = args;

    let page = PageSpec {
        name: output
            .as_ref()
            .and_then(|path| path.file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "render".to_string()),
        output,
        executable,
        source,
        script,
        listings,
    };
    let options = ops.options_for(None, render.format(), render.strict);

    if page.output.is_some() {
        let generated = ops.write_page(&page, &options)?;
        if !render.quiet {
            if let Some(path) = &page.output {
                println!(
                    "wrote {} ({})",
                    path.display(),
                    summarize(&generated.passes)
                );
            }
        }
    } else {
        let generated = ops.generate(&page, &options)?;
        emit(&generated.document)?;
    }
    Ok(0)
}

fn handle_sections(ops: &Operations, args: SectionsArgs) -> Result<i32> {
    let SectionsArgs {
        dialect,
        source,
        capture,
        json,
    } = args;

    let kind = match dialect {
        DialectValue::Compiled => DialectKind::Compiled,
        DialectValue::Scripted => DialectKind::Scripted,
    };
    let outcome = ops.parse_capture(kind, &source, &capture)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sections_payload(&outcome))?);
    } else {
        print_sections(&outcome);
    }

    Ok(if outcome.mismatch().is_some() { 1 } else { 0 })
}

fn sections_payload(outcome: &ParseOutcome) -> serde_json::Value {
    json!({
        "sections": outcome.sections,
        "truncation": outcome.truncation.map(|truncation| truncation.to_string()),
        "mismatch": outcome.mismatch().map(|mismatch| mismatch.to_string()),
        "leftover_output": outcome.leftover_output,
    })
}

fn print_sections(outcome: &ParseOutcome) {
    for (index, section) in outcome.sections.iter().enumerate() {
        println!("--- section {} ---", index + 1);
        if !section.text.is_empty() {
            println!("{}", section.text);
        }
        if section.has_code() {
            println!("[code: {}]", section.language_tag);
            println!("{}", section.code);
        }
        if section.has_output() {
            println!("[output]");
            println!("{}", section.output);
        }
    }
    if let Some(truncation) = &outcome.truncation {
        println!("note: {truncation}");
    }
    if let Some(mismatch) = outcome.mismatch() {
        println!("mismatch: {mismatch}");
    }
}

fn summarize(passes: &[PassReport]) -> String {
    passes
        .iter()
        .map(|pass| format!("{}: {} section(s)", pass.kind, pass.sections))
        .collect::<Vec<_>>()
        .join(", ")
}

fn emit(content: &str) -> Result<()> {
    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Render annotated example programs and their output as documentation",
    propagate_version = true
)]
struct Cli {
    /// Use this config file instead of discovering `.exampledoc.toml`
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run configured examples and write their pages
    Generate(GenerateArgs),
    /// Fail when a configured page is out of date
    Check(CheckArgs),
    /// Render a single page from explicit paths
    Render(RenderArgs),
    /// Parse a source file against a saved capture without running anything
    Sections(SectionsArgs),
}

#[derive(Args)]
struct RenderFlags {
    /// Output format (overrides config)
    #[arg(long, value_enum)]
    format: Option<FormatValue>,
    /// Treat stream mismatches as errors
    #[arg(long)]
    strict: bool,
    /// Suppress progress output
    #[arg(long, short)]
    quiet: bool,
}

impl RenderFlags {
    fn format(&self) -> Option<DocumentFormat> {
        self.format.map(|format| match format {
            FormatValue::Rst => DocumentFormat::Rst,
            FormatValue::Markdown => DocumentFormat::Markdown,
        })
    }
}

#[derive(Args)]
struct GenerateArgs {
    /// Restrict to specific pages
    #[arg(long = "page", value_name = "NAME", action = ArgAction::Append)]
    pages: Vec<String>,
    #[command(flatten)]
    render: RenderFlags,
}

#[derive(Args)]
struct CheckArgs {
    /// Restrict to specific pages
    #[arg(long = "page", value_name = "NAME", action = ArgAction::Append)]
    pages: Vec<String>,
    /// Print unified diffs for stale pages
    #[arg(long)]
    diff: bool,
    #[command(flatten)]
    render: RenderFlags,
}

#[derive(Args)]
struct RenderArgs {
    /// Built compiled-dialect example
    #[arg(long, value_name = "PATH")]
    executable: PathBuf,
    /// Annotated source of the compiled example
    #[arg(long, value_name = "PATH")]
    source: PathBuf,
    /// Scripted-dialect companion example
    #[arg(long, value_name = "PATH")]
    script: Option<PathBuf>,
    /// Extra file for the listings appendix
    #[arg(long = "listing", value_name = "PATH", action = ArgAction::Append)]
    listings: Vec<PathBuf>,
    /// Write here instead of stdout
    #[arg(long, value_name = "PATH")]
    output: Option<PathBuf>,
    #[command(flatten)]
    render: RenderFlags,
}

#[derive(Args)]
struct SectionsArgs {
    #[arg(long, value_enum, default_value = "compiled")]
    dialect: DialectValue,
    /// Annotated source file
    #[arg(long, value_name = "PATH")]
    source: PathBuf,
    /// Saved stdout of the example
    #[arg(long = "output-capture", value_name = "PATH")]
    capture: PathBuf,
    /// Emit machine-readable JSON
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatValue {
    Rst,
    Markdown,
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectValue {
    Compiled,
    Scripted,
}
