use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use mdrender::{Config, DocumentStats, export};

#[derive(Parser)]
#[command(name = "mdrender")]
#[command(about = "Render Markdown to HTML or a preview model")]
struct Cli {
    /// Input Markdown file (reads stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Output file (HTML defaults to input name with .html extension; never the input itself)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// What to produce
    #[arg(short, long, value_enum, default_value_t = Format::Html)]
    format: Format,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print line, word and character counts to stderr
    #[arg(long)]
    stats: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Standalone HTML document
    Html,
    /// HTML body only
    Fragment,
    /// Preview segments as JSON
    Segments,
    /// Parsed document tree as JSON
    Tree,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::compiled_default(),
    };

    let input = cli.input.filter(|path| path.as_os_str() != "-");
    let markdown = match &input {
        Some(path) => export::read_markdown(path)?,
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read stdin")?;
            buffer
        }
    };

    if cli.stats {
        eprintln!("{}", DocumentStats::from_text(&markdown));
    }

    // HTML exports land next to the input unless told otherwise
    let output = cli.output.or_else(|| match (cli.format, &input) {
        (Format::Html, Some(path)) => Some(export::default_output_path(path)),
        _ => None,
    });

    if let (Some(input), Some(output)) = (&input, &output) {
        export::ensure_distinct(input, output)?;
    }

    if let (Format::Html, Some(path)) = (cli.format, &output) {
        export::export_html(&markdown, path, &config)?;
        println!("Created {}", path.display());
        return Ok(());
    }

    let document = mdrender::parse(&markdown);
    let rendered = match cli.format {
        Format::Html => mdrender::render_html(&document, &config.html),
        Format::Fragment => mdrender::render_html_fragment(&document),
        Format::Segments => serde_json::to_string_pretty(&mdrender::render_segments(&document))?,
        Format::Tree => serde_json::to_string_pretty(&document)?,
    };

    match output {
        Some(path) => {
            export::write_output(&path, &rendered)?;
            println!("Created {}", path.display());
        }
        None => {
            print!("{rendered}");
            if !rendered.ends_with('\n') {
                println!();
            }
        }
    }

    Ok(())
}
