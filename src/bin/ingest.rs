//! Ingest CLI
//!
//! Samples, previews and uploads delimited text files through a background
//! worker. Every reply from the worker is printed as one JSON line.

use clap::{Arg, ArgAction, ArgMatches, Command as Cli};
use delimited_ingest::upload::ColumnSpec;
use delimited_ingest::{Command, FileRef, IngestConfig, LogLevel, QuoteStyle, Reply, Worker, WorkerHandle};
use std::collections::BTreeMap;
use std::path::PathBuf;

fn parse_separator(value: &str) -> Result<char, String> {
    match value {
        "tab" | "\\t" => Ok('\t'),
        _ => {
            let mut chars = value.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(c),
                _ => Err(format!("expected a single character, got {:?}", value)),
            }
        }
    }
}

fn parse_byte_size(value: &str) -> Result<usize, String> {
    let size: bytesize::ByteSize = value.parse()?;
    usize::try_from(size.as_u64()).map_err(|e| e.to_string())
}

fn parse_param(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {:?}", value))
}

fn file_arg() -> Arg {
    Arg::new("file")
        .help("Delimited text file")
        .required(true)
        .value_parser(clap::value_parser!(PathBuf))
}

fn endpoint_arg() -> Arg {
    Arg::new("endpoint")
        .long("endpoint")
        .help("Base URL of the receiver (overrides the config file)")
}

fn cli() -> Cli {
    Cli::new("ingest")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sample, preview and upload delimited text files")
        .arg(
            Arg::new("config")
                .long("config")
                .help("JSON configuration file")
                .value_parser(clap::value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Cli::new("sample")
                .about("Infer line and field separators from the head of a file")
                .arg(file_arg())
                .arg(
                    Arg::new("lines")
                        .long("lines")
                        .help("Number of lines to sample")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            Cli::new("parse")
                .about("Sample a file and print the parsed preview table")
                .arg(file_arg())
                .arg(
                    Arg::new("field-sep")
                        .long("field-sep")
                        .help("Field separator (default: the suggested one)")
                        .value_parser(parse_separator),
                )
                .arg(
                    Arg::new("lines")
                        .long("lines")
                        .help("Number of lines to sample")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("doubled-quotes")
                        .long("doubled-quotes")
                        .help("Quotes inside quoted fields are written as \"\"")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Cli::new("upload")
                .about("Upload a file in chunks")
                .arg(file_arg())
                .arg(endpoint_arg())
                .arg(
                    Arg::new("chunk-size")
                        .long("chunk-size")
                        .help("Chunk size, e.g. 600KB or 1MiB")
                        .value_parser(parse_byte_size),
                )
                .arg(
                    Arg::new("param")
                        .long("param")
                        .help("Query parameter added to every chunk request (KEY=VALUE)")
                        .value_parser(parse_param)
                        .action(ArgAction::Append),
                ),
        )
        .subcommand(
            Cli::new("load-table")
                .about("Upload a file, then load it into a database table")
                .arg(file_arg())
                .arg(endpoint_arg())
                .arg(
                    Arg::new("table")
                        .long("table")
                        .help("Target table name")
                        .required(true),
                )
                .arg(
                    Arg::new("columns")
                        .long("columns")
                        .help("JSON file with the column list")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    Arg::new("field-sep")
                        .long("field-sep")
                        .help("Field separator of the file (default: ,)")
                        .value_parser(parse_separator),
                ),
        )
}

fn load_config(matches: &ArgMatches) -> Result<IngestConfig, Box<dyn std::error::Error>> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => IngestConfig::from_file(path)?,
        None => IngestConfig::default(),
    };

    if matches.get_flag("verbose") {
        config.log_level = LogLevel::Debug;
    }

    if let Some((_, sub_matches)) = matches.subcommand() {
        if let Ok(Some(endpoint)) = sub_matches.try_get_one::<String>("endpoint") {
            config.endpoint = Some(endpoint.clone());
        }
        if let Ok(Some(size)) = sub_matches.try_get_one::<usize>("chunk-size") {
            config.chunk_size = *size;
        }
    }

    Ok(config)
}

fn file_ref(matches: &ArgMatches) -> Result<FileRef, Box<dyn std::error::Error>> {
    let path = matches
        .get_one::<PathBuf>("file")
        .ok_or("missing file argument")?;
    Ok(FileRef::path(path))
}

fn print(reply: &Reply) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", reply.to_json()?);
    Ok(())
}

/// Print replies until the worker has no more; returns whether any
/// command failed
async fn print_remaining(worker: &mut WorkerHandle) -> Result<bool, Box<dyn std::error::Error>> {
    worker.close();
    let mut failed = false;
    while let Some(reply) = worker.recv().await {
        failed |= reply.is_feedback();
        print(&reply)?;
    }
    Ok(failed)
}

async fn run(matches: &ArgMatches, worker: &mut WorkerHandle) -> Result<bool, Box<dyn std::error::Error>> {
    match matches.subcommand() {
        Some(("sample", sub_matches)) => {
            worker.send(Command::SampleFile {
                file: file_ref(sub_matches)?,
                max_sample_lines: sub_matches.get_one::<usize>("lines").copied(),
            })?;
            print_remaining(worker).await
        }
        Some(("parse", sub_matches)) => {
            worker.send(Command::SampleFile {
                file: file_ref(sub_matches)?,
                max_sample_lines: sub_matches.get_one::<usize>("lines").copied(),
            })?;

            let sample = match worker.recv().await {
                Some(Reply::SampleFile {
                    file_sample_info, ..
                }) => file_sample_info,
                Some(other) => {
                    print(&other)?;
                    return Ok(true);
                }
                None => return Err("worker stopped before replying".into()),
            };

            let field_separator = sub_matches
                .get_one::<char>("field-sep")
                .copied()
                .or(sample.field_separator_suggestion)
                .ok_or("no field separator found; pass --field-sep")?;

            let quote_style = if sub_matches.get_flag("doubled-quotes") {
                QuoteStyle::Doubled
            } else {
                QuoteStyle::Backslash
            };

            worker.send(Command::ParseRows {
                row_data: sample.sample_text,
                line_separator: sample.line_separator,
                field_separator,
                quote_style: Some(quote_style),
            })?;
            print_remaining(worker).await
        }
        Some(("upload", sub_matches)) => {
            let parameters: BTreeMap<String, String> = sub_matches
                .get_many::<(String, String)>("param")
                .map(|params| params.cloned().collect())
                .unwrap_or_default();

            worker.send(Command::UploadFileData {
                file: file_ref(sub_matches)?,
                parameters,
            })?;
            print_remaining(worker).await
        }
        Some(("load-table", sub_matches)) => {
            let columns_path = sub_matches
                .get_one::<PathBuf>("columns")
                .ok_or("missing --columns")?;
            let columns: Vec<ColumnSpec> =
                serde_json::from_str(&std::fs::read_to_string(columns_path)?)?;
            let target_table_name = sub_matches
                .get_one::<String>("table")
                .ok_or("missing --table")?
                .clone();

            worker.send(Command::UploadDataForDbTable {
                file: file_ref(sub_matches)?,
                columns,
                target_table_name,
                field_separator: sub_matches.get_one::<char>("field-sep").copied(),
            })?;
            print_remaining(worker).await
        }
        _ => Err("No subcommand provided. Use --help for usage information.".into()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    env_logger::Builder::new()
        .filter_level(config.log_level.into())
        .parse_default_env()
        .init();

    let mut worker = Worker::spawn(config)?;
    let failed = run(&matches, &mut worker).await?;
    worker.shutdown()?;

    if failed {
        std::process::exit(1);
    }

    Ok(())
}
