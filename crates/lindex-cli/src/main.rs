//! # Lindex CLI Entry Point
//!
//! Command-line interface over the B+ tree text index.
//!
//! ## Usage
//!
//! ```bash
//! # Build an index over a data file with 15-byte keys
//! lindex create data.txt data.indx 15
//!
//! # Look up one record by key
//! lindex find data.indx AAAAAAAAAAAAAAA
//!
//! # Append a record and index it
//! lindex insert data.indx "BBBBBBBBBBBBBBB some new record"
//!
//! # List ten records starting at a key
//! lindex list data.indx AAAAAAAAAAAAAAA 10
//! ```

use lindex_common::{LindexError, Result, StoreConfig};
use lindex_storage::TextIndex;
use std::env;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        return ExitCode::FAILURE;
    }

    let result = match args[1].as_str() {
        "--help" | "-h" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        "--version" | "-v" => {
            println!("lindex {}", env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        "create" => cmd_create(&args[2..]),
        "find" => cmd_find(&args[2..]),
        "insert" => cmd_insert(&args[2..]),
        "list" => cmd_list(&args[2..]),
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_create(args: &[String]) -> Result<ExitCode> {
    let [data_file, index_file, key_len] = args else {
        print_usage();
        return Ok(ExitCode::FAILURE);
    };
    let Ok(key_len) = key_len.parse::<i32>() else {
        eprintln!("Invalid key length: {key_len}");
        return Ok(ExitCode::FAILURE);
    };

    let index = TextIndex::create(data_file, index_file, key_len, StoreConfig::default())?;
    println!(
        "Created index {} over {} (key length {})",
        index_file,
        index.meta().data_filename,
        index.meta().key_len
    );
    Ok(ExitCode::SUCCESS)
}

fn cmd_find(args: &[String]) -> Result<ExitCode> {
    let [index_file, key] = args else {
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let index = TextIndex::open(index_file, StoreConfig::default())?;
    match index.find(key)? {
        Some((_, record)) => println!("{record}"),
        None => println!("Cannot find specified record in index."),
    }
    Ok(ExitCode::SUCCESS)
}

fn cmd_insert(args: &[String]) -> Result<ExitCode> {
    let [index_file, record] = args else {
        print_usage();
        return Ok(ExitCode::FAILURE);
    };

    let mut index = TextIndex::open(index_file, StoreConfig::default())?;
    match index.insert(record) {
        Ok(offset) => {
            println!("Inserted record at data offset {offset}");
            Ok(ExitCode::SUCCESS)
        }
        Err(LindexError::DuplicateKey) => {
            println!("Key already exists in the index.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(e),
    }
}

fn cmd_list(args: &[String]) -> Result<ExitCode> {
    let [index_file, start_key, count] = args else {
        print_usage();
        return Ok(ExitCode::FAILURE);
    };
    let Ok(count) = count.parse::<usize>() else {
        eprintln!("Invalid count: {count}");
        return Ok(ExitCode::FAILURE);
    };

    let index = TextIndex::open(index_file, StoreConfig::default())?;
    for (offset, record) in index.list(start_key, count)? {
        println!("[{offset}]: {record}");
    }
    Ok(ExitCode::SUCCESS)
}

fn print_usage() {
    println!("lindex - disk-resident B+ tree index over a text data file");
    println!();
    println!("USAGE:");
    println!("    lindex <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    create <data_file> <index_file> <key_len>   Build an index from a data file");
    println!("    find   <index_file> <key>                   Print the record for a key");
    println!("    insert <index_file> <record>                Append a record and index it");
    println!("    list   <index_file> <start_key> <count>     Print records from a start key");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help         Print help information");
    println!("    -v, --version      Print version information");
    println!();
    println!("Set RUST_LOG to enable tracing output.");
}
