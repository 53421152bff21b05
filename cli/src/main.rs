//! sheetjson CLI - spreadsheet workbook normalization tool
//!
//! Converts XLSX workbooks to normalized JSON and serves the conversion
//! over HTTP.

mod config;
mod logging;
mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;
use config::{ServerConfig, DEFAULT_MAX_UPLOAD_MB, DEFAULT_PORT};
use indicatif::{ProgressBar, ProgressStyle};
use sheetjson::render::JsonFormat;
use sheetjson::{SheetResult, WorkbookSource, XlsxReader};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// Spreadsheet workbook normalization to JSON
#[derive(Parser)]
#[command(
    name = "sheetjson",
    version,
    about = "Normalize spreadsheet workbooks to JSON",
    long_about = "sheetjson - Spreadsheet workbook normalization tool.\n\n\
                  Converts XLSX workbooks to display-ready JSON: a 'Summary' sheet becomes \
                  a month-indexed pivot, every other sheet a record table with statistics."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a workbook to JSON
    Convert {
        /// Input file path
        input: PathBuf,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output compact JSON (no indentation)
        #[arg(long)]
        compact: bool,
    },

    /// Show workbook information and per-sheet statistics
    Info {
        /// Input file path
        input: PathBuf,
    },

    /// Run the HTTP upload service
    Serve {
        /// Interface to bind
        #[arg(long, env = "SHEETJSON_HOST", default_value = "0.0.0.0")]
        host: String,

        /// Port to listen on
        #[arg(short, long, env = "SHEETJSON_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,

        /// Directory for staged uploads (default: system temp dir)
        #[arg(long, env = "SHEETJSON_UPLOAD_DIR")]
        upload_dir: Option<PathBuf>,

        /// Largest accepted upload, in MiB
        #[arg(long, env = "SHEETJSON_MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
        max_upload_mb: usize,
    },

    /// Show version information
    Version,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Convert {
            input,
            output,
            compact,
        } => {
            let pb = create_spinner("Reading workbook...");

            let result = sheetjson::convert_file(&input)
                .with_context(|| format!("failed to convert {}", input.display()))?;
            pb.set_message("Rendering to JSON...");

            let format = if compact {
                JsonFormat::Compact
            } else {
                JsonFormat::Pretty
            };
            let json = sheetjson::render::to_json(&result, format)?;

            pb.finish_and_clear();
            write_output(output.as_ref(), &json)?;

            if let Some(path) = output {
                println!(
                    "{} Converted {} sheets to JSON: {}",
                    "✓".green().bold(),
                    result.len(),
                    path.display()
                );
            }
        }

        Commands::Info { input } => {
            let pb = create_spinner("Analyzing workbook...");

            let format = sheetjson::detect_format_from_path(&input)?;
            let mut reader = XlsxReader::open(&input)?;
            let names = WorkbookSource::sheet_names(&reader);

            let mut sheets = Vec::with_capacity(names.len());
            for name in names {
                let grid = reader.sheet_grid(&name)?;
                let dims = (grid.height(), grid.width());
                let outcome = sheetjson::transform(&name, &grid);
                sheets.push((name, dims, outcome));
            }

            pb.finish_and_clear();

            println!("{}", "Workbook Information".cyan().bold());
            println!("{}", "─".repeat(40));
            println!(
                "{}: {}",
                "File".bold(),
                input.file_name().unwrap_or_default().to_string_lossy()
            );
            println!("{}: {}", "Format".bold(), format);
            println!("{}: {}", "Sheets".bold(), sheets.len());

            println!("\n{}", "Sheets".cyan().bold());
            println!("{}", "─".repeat(40));
            for (name, (rows, cols), outcome) in sheets {
                println!("{} ({} x {})", name.bold(), rows, cols);
                match outcome {
                    Ok(SheetResult::Pivot(data)) => {
                        println!("  {}: pivot", "Layout".bold());
                        println!("  {}: {}", "Months".bold(), data.len());
                    }
                    Ok(SheetResult::Table { data, kpis }) => {
                        println!("  {}: table", "Layout".bold());
                        println!("  {}: {}", "Records".bold(), data.len());
                        println!(
                            "  {}: {}",
                            "Numeric columns".bold(),
                            kpis.numeric_columns.join(", ")
                        );
                    }
                    Ok(SheetResult::EmptyTable) => {
                        println!("  {}: table (empty)", "Layout".bold());
                    }
                    Err(e) => {
                        println!("  {} {}", "!".yellow().bold(), e);
                    }
                }
            }
        }

        Commands::Serve {
            host,
            port,
            upload_dir,
            max_upload_mb,
        } => {
            let config = ServerConfig {
                host,
                port,
                upload_dir,
                max_upload_mb,
            };
            let addr = config.addr()?;

            println!(
                "{} Upload service on http://{}",
                "✓".green().bold(),
                addr
            );
            println!("  POST /upload-excel  (multipart field \"file\")");
            println!("  GET  /health");

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(server::serve(config))?;
        }

        Commands::Version => {
            print_version();
        }
    }

    Ok(())
}

fn print_version() {
    println!("{} {}", "sheetjson".green().bold(), env!("CARGO_PKG_VERSION"));
    println!("Spreadsheet workbook normalization to JSON");
    println!();
    println!("Supported formats: XLSX, XLSM, XLTX");
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
        .template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn write_output(path: Option<&PathBuf>, content: &str) -> anyhow::Result<()> {
    match path {
        Some(p) => {
            fs::write(p, content).with_context(|| format!("failed to write {}", p.display()))?;
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", content)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["sheetjson", "serve"]).unwrap();
        match cli.command {
            Commands::Serve {
                port,
                max_upload_mb,
                upload_dir,
                ..
            } => {
                assert_eq!(port, DEFAULT_PORT);
                assert_eq!(max_upload_mb, DEFAULT_MAX_UPLOAD_MB);
                assert!(upload_dir.is_none());
            }
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_convert_args() {
        let cli =
            Cli::try_parse_from(["sheetjson", "convert", "book.xlsx", "-o", "out.json", "--compact"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Convert { compact: true, output: Some(_), .. }
        ));
    }
}
