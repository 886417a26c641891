//! domstate - extract state from an HTML document

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use domstate::{Document, Manifest, Values, apply, collect};

#[derive(Parser)]
#[command(name = "domstate")]
#[command(version, about = "Extract state from an HTML document", long_about = None)]
#[command(after_help = "EXAMPLES:
    domstate page.html manifest.json                   Print the state as JSON
    domstate page.html manifest.json --apply new.json  Write values, then print
    domstate page.html manifest.json --apply new.json --html

MANIFEST FORMAT:
    { \"items\": { \"selector\": \"li\", \"read\": \"data:id\" },
      \"name\":  { \"selector\": \"#name\", \"read\": \"value\", \"write\": \"value\" } }")]
struct Cli {
    /// HTML document to read
    #[arg(value_name = "HTML")]
    html: PathBuf,

    /// JSON manifest of selector bindings
    #[arg(value_name = "MANIFEST")]
    manifest: PathBuf,

    /// JSON object of values to write before reading
    #[arg(long, value_name = "VALUES")]
    apply: Option<PathBuf>,

    /// Print the resulting document instead of the state
    #[arg(long = "html")]
    print_html: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> domstate::Result<String> {
    let doc = Document::parse_bytes(&std::fs::read(&cli.html)?);
    let manifest = Manifest::from_json(&read_string(&cli.manifest)?)?;

    if let Some(path) = &cli.apply {
        let values: Values = serde_json::from_str(&read_string(path)?)?;
        let written = apply(&doc, &manifest, &values)?;
        tracing::info!(written, "applied values");
    }

    if cli.print_html {
        return Ok(doc.to_html());
    }
    let state = collect(&doc, &manifest).into_result()?;
    Ok(serde_json::to_string_pretty(&state.to_json())?)
}

fn read_string(path: &Path) -> domstate::Result<String> {
    Ok(std::fs::read_to_string(path)?)
}
