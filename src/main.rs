use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use clap::Subcommand;
use env_logger::Builder;
use log::{debug, info};

use shnap::config::EngineConfig;
use shnap::interpreter::Interpreter;
use shnap::parser::parse_source;
use shnap::result::{ExecutionResult, State};
use shnap::scanner::Scanner;
use shnap::source::{strip_comments, LineIndex};
use shnap::value::Value;

#[derive(ClapParser, Debug)]
#[command(version, about = "Shnap scripting language engine", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    commands: Commands,

    /// Enable logging to shnap.log
    #[arg(long, global = true)]
    log: bool,

    /// Extra digits kept by decimal division
    #[arg(long, global = true)]
    precision: Option<u64>,

    /// Most stack frames shown for an uncaught error
    #[arg(long, global = true)]
    trace_limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tokenizes a script, printing each token
    Tokenize {
        filename: Option<PathBuf>,

        /// Print one JSON object per token
        #[arg(long)]
        json: bool,
    },

    /// Parses a script and prints it back from the instruction tree
    Parse { filename: Option<PathBuf> },

    /// Runs a script and prints its final value
    Run { filename: Option<PathBuf> },
}

/// Reads a script file as UTF-8 text
fn read_file(filename: &PathBuf) -> Result<String> {
    info!("Reading file: {:?}", filename);
    let file = File::open(filename).context(format!("Failed to open file {:?}", filename))?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();

    let bytes = reader
        .read_to_end(&mut buf)
        .context(format!("Failed to read file {:?}", filename))?;

    info!("Read {} bytes from {:?}", bytes, filename);

    String::from_utf8(buf).context(format!("File {:?} is not valid UTF-8", filename))
}

fn init_logger() -> Result<()> {
    let log_file = File::create("shnap.log").context("Failed to create shnap.log")?;

    Builder::new()
        .format(|buf, record| {
            let module = record
                .module_path()
                .unwrap_or("<unnamed>")
                .strip_prefix("shnap::")
                .unwrap_or(record.module_path().unwrap_or("<unnamed>"));
            writeln!(
                buf,
                "[{}:{}] - {}",
                module,
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter(None, log::LevelFilter::Debug)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized, writing to shnap.log");
    Ok(())
}

fn config_for(args: &Cli, filename: &PathBuf) -> EngineConfig {
    let mut config = EngineConfig {
        script_name: filename.display().to_string(),
        ..EngineConfig::default()
    };

    if let Some(precision) = args.precision {
        config.division_digits = precision;
    }
    if let Some(limit) = args.trace_limit {
        config.trace_limit = limit;
    }

    config
}

/// Print an uncaught throw with at most `limit` frames of its trace.
fn report_uncaught(result: &ExecutionResult, limit: usize) {
    eprintln!("Uncaught {}", result.value());

    if let Value::Error(error) = result.value() {
        let trace = error.trace.borrow();
        for frame in trace.iter().rev().take(limit) {
            eprintln!("    {}", frame);
        }
        if trace.len() > limit {
            eprintln!("    ... {} more", trace.len() - limit);
        }
    } else {
        eprintln!("    {}", result.location());
    }
}

fn tokenize(filename: &PathBuf, json: bool) -> Result<()> {
    info!("Running Tokenize subcommand");

    let source = read_file(filename)?;
    let index = LineIndex::new(source.as_bytes(), Rc::from(filename.display().to_string()));

    let stripped = match strip_comments(&source, &index) {
        Ok(stripped) => stripped,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(65);
        }
    };

    let mut tokenized = true;

    for token in Scanner::new(&stripped, &index) {
        match token {
            Ok(token) => {
                debug!("Scanned token: {}", token);

                if json {
                    println!("{}", serde_json::to_string(&token)?);
                } else {
                    println!("{}", token);
                }
            }

            Err(e) => {
                tokenized = false;

                debug!("Tokenization debug: {}", e);

                eprintln!("{}", e);
            }
        }
    }

    if !tokenized {
        debug!("Tokenization failed, exiting with code 65");

        std::process::exit(65);
    }

    info!("Tokenization completed successfully");
    Ok(())
}

fn main() -> Result<()> {
    let args: Cli = Cli::parse();

    if args.log {
        init_logger()?;
    } else {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Off)
            .init();
    }

    info!("CLI arguments: {:?}", args);

    match &args.commands {
        Commands::Tokenize { filename, json } => match filename {
            Some(filename) => tokenize(filename, *json)?,
            None => {
                info!("No filepath provided for Tokenize");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Parse { filename } => match filename {
            Some(filename) => {
                info!("Running Parse subcommand");
                let source = read_file(filename)?;

                match parse_source(&source, &filename.display().to_string()) {
                    Ok(program) => {
                        info!("Program parsed successfully");
                        print!("{}", program.pretty_print(0));
                    }

                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                }

                info!("Parse subcommand completed");
            }
            None => {
                info!("No filepath provided for Parse");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },

        Commands::Run { filename } => match filename {
            Some(filename) => {
                info!("Running Run subcommand");
                let source = read_file(filename)?;
                let config = config_for(&args, filename);
                let trace_limit = config.trace_limit;

                let program = match parse_source(&source, &config.script_name) {
                    Ok(program) => program,
                    Err(e) => {
                        debug!("Parse debug: {}", e);
                        eprintln!("{}", e);
                        std::process::exit(65);
                    }
                };

                let mut interpreter = Interpreter::new(config);
                let result = interpreter.run(&program);

                if result.state() == State::Throwing {
                    debug!("Runtime debug: {}", result.value());
                    report_uncaught(&result, trace_limit);
                    std::process::exit(70);
                }

                if !result.value().is_void() {
                    println!("{}", result.value());
                }

                info!("Program executed successfully");
            }

            None => {
                info!("No filepath provided for Run");
                println!("No input filepath was provided. Exiting...");
                std::process::exit(0);
            }
        },
    }

    Ok(())
}
