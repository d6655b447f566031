//! BLF CLI
//!
//! Command-line interface for inspecting and editing BLF files.

use std::fs;
use std::path::PathBuf;
use std::process;

use blf::{BlfError, Config, Session, SyncStrategy};
use clap::{Parser, Subcommand};
use thiserror::Error;
use tracing_subscriber::{fmt, EnvFilter};

/// Largest value `get` will print (1 MB)
const MAX_VALUE_SIZE: usize = 1024 * 1024;

/// BLF CLI
#[derive(Parser, Debug)]
#[command(name = "blf")]
#[command(about = "Binary container with key-value metadata and a raw payload")]
#[command(version)]
struct Args {
    /// Flush to the OS only instead of fsync after each write
    #[arg(long, global = true)]
    no_sync: bool,

    /// Build an in-memory key index on open
    #[arg(long, global = true)]
    index: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Failures reported with a CLI-specific message
#[derive(Debug, Error)]
enum CliError {
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    #[error("Value too large (size: {0})")]
    ValueTooLarge(u64),

    #[error("No raw data in file")]
    NoRawData,

    #[error(transparent)]
    Blf(#[from] BlfError),
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new BLF file
    Create {
        file: PathBuf,
    },

    /// Display header information
    Info {
        file: PathBuf,
    },

    /// Add or update a key-value pair
    Put {
        file: PathBuf,
        key: String,
        value: String,
    },

    /// Get a value by key
    Get {
        file: PathBuf,
        key: String,
    },

    /// Delete a key-value pair
    Delete {
        file: PathBuf,
        key: String,
    },

    /// Replace the raw data with the contents of a file
    WriteRaw {
        file: PathBuf,
        input: PathBuf,
    },

    /// Write the raw data to a file
    ReadRaw {
        file: PathBuf,
        output: PathBuf,
    },

    /// List all keys with their value sizes
    List {
        file: PathBuf,
    },
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = Config::builder()
        .sync_strategy(if args.no_sync {
            SyncStrategy::Flush
        } else {
            SyncStrategy::SyncAll
        })
        .index_keys(args.index)
        .build();

    if let Err(e) = run(args.command, config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(command: Commands, config: Config) -> Result<(), CliError> {
    match command {
        Commands::Create { file } => {
            let mut session = Session::create_with_config(&file, config)?;
            session.close()?;
            println!("Created BLF file: {}", file.display());
        }

        Commands::Info { file } => {
            let mut session = Session::open_with_config(&file, config)?;
            let info = session.info()?;
            let header = info.header;

            println!("BLF File: {}", file.display());
            println!("  Magic: {:#010X}", header.magic);
            println!("  Version: {}", header.version);
            println!("  KV Section Offset: {} bytes", header.kv_offset);
            println!("  KV Section Size: {} bytes", header.kv_size);
            println!("  Entries: {}", info.entry_count);
            println!("  Raw Data Offset: {} bytes", header.raw_offset);
            println!("  Raw Data Size: {} bytes", header.raw_size);
            println!("  Raw Data CRC32: {:#010x}", info.raw_crc32);
            println!("  File Size: {} bytes", info.file_size);
            session.close()?;
        }

        Commands::Put { file, key, value } => {
            let mut session = Session::open_with_config(&file, config)?;
            session.put(key.as_bytes(), value.as_bytes())?;
            session.close()?;
            println!("Added key-value pair: {}={}", key, value);
        }

        Commands::Get { file, key } => {
            let mut session = Session::open_with_config(&file, config)?;
            let value = get_value(&mut session, &key)?;
            println!("{}", String::from_utf8_lossy(&value));
            session.close()?;
        }

        Commands::Delete { file, key } => {
            let mut session = Session::open_with_config(&file, config)?;
            session.delete(key.as_bytes())?;
            session.close()?;
            println!("Deleted key: {}", key);
        }

        Commands::WriteRaw { file, input } => {
            let data = fs::read(&input).map_err(|source| BlfError::Open {
                path: input.clone(),
                source,
            })?;
            let mut session = Session::open_with_config(&file, config)?;
            session.write_raw(&data)?;
            session.close()?;
            println!("Wrote {} bytes of raw data", data.len());
        }

        Commands::ReadRaw { file, output } => {
            let mut session = Session::open_with_config(&file, config)?;
            let data = read_raw_data(&mut session)?;
            session.close()?;

            fs::write(&output, &data).map_err(|source| BlfError::Open {
                path: output.clone(),
                source,
            })?;
            println!("Read {} bytes of raw data", data.len());
        }

        Commands::List { file } => {
            let mut session = Session::open_with_config(&file, config)?;
            let entries = session.list()?.collect::<blf::Result<Vec<_>>>()?;

            if entries.is_empty() {
                println!("No key-value pairs in file");
            } else {
                println!("Keys in {}:", file.display());
                for entry in &entries {
                    println!(
                        "  {} ({} bytes value)",
                        String::from_utf8_lossy(&entry.key),
                        entry.value_len
                    );
                }
                println!("Total: {} key-value pair(s)", entries.len());
            }
            session.close()?;
        }
    }

    Ok(())
}

/// Read a value of at most `MAX_VALUE_SIZE` bytes
fn get_value(session: &mut Session, key: &str) -> Result<Vec<u8>, CliError> {
    let mut buf = vec![0u8; MAX_VALUE_SIZE];
    match session.get(key.as_bytes(), &mut buf) {
        Ok(len) => {
            buf.truncate(len);
            Ok(buf)
        }
        Err(BlfError::BufferTooSmall { required }) => Err(CliError::ValueTooLarge(required)),
        Err(BlfError::NotFound) => Err(CliError::KeyNotFound(key.to_string())),
        Err(e) => Err(e.into()),
    }
}

fn read_raw_data(session: &mut Session) -> Result<Vec<u8>, CliError> {
    if session.header().raw_size == 0 {
        return Err(CliError::NoRawData);
    }
    Ok(session.read_raw_vec()?)
}
