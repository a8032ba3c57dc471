//! Pokédex CLI
//!
//! Runs façade commands directly against a data directory and prints the
//! JSON reply.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use pokedex::compress::CompressionKind;
use pokedex::crypto::CipherMethod;
use pokedex::index::IndexKind;
use pokedex::protocol::{self, Command, Reply, Response};
use pokedex::sort::{SortKey, SortStrategy};
use pokedex::{Config, Engine, Result};
use tracing_subscriber::{fmt, EnvFilter};

/// Pokédex CLI
#[derive(Parser, Debug)]
#[command(name = "pokedex-cli")]
#[command(about = "Operate on a Pokédex data directory")]
#[command(version)]
struct Args {
    /// Data directory
    #[arg(short, long, default_value = "./pokedex_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a CSV file, replacing the store
    Load {
        /// CSV path
        #[arg(default_value = "./data/pokedex.csv")]
        csv: PathBuf,
    },

    /// Print one record
    Get { id: u32 },

    /// Print every id, ascending
    Ids,

    /// Sort the store (0 balanced, 1 variable-way, 2 replacement selection)
    Sort {
        #[arg(short, long, default_value = "0")]
        method: i64,

        /// id, name, generation, hp, atk, def, height, weight, releasedate
        #[arg(short, long, default_value = "id")]
        key: SortKey,
    },

    /// Build an index (0 sequential .. 5 inverted)
    Index { method: i64 },

    /// Resolve ids through an index, building it if needed
    Lookup {
        method: i64,

        #[arg(required = true)]
        ids: Vec<u32>,
    },

    /// Run a mergeSearch body, e.g. '{"nome":"char","metodo":2}'
    Search { body: String },

    /// Compress the store (1 Huffman, 2 LZW)
    Zip { method: i64 },

    /// Decompress the store
    Unzip { method: i64 },

    /// Encrypt the store (1 Trivium, 2-4 AES-128/192/256); prints the key
    Encrypt { method: i64 },

    /// Decrypt the store with a hex key
    Decrypt { method: i64, key: String },

    /// Convert romaji to katakana
    Katakana { text: String },
}

fn run(args: Args) -> Result<Reply> {
    let config = Config::builder().data_dir(&args.data_dir).build()?;
    let engine = Engine::open(config)?;

    let command = match args.command {
        Commands::Load { csv } => {
            let count = engine.load_csv_from(&csv)?;
            tracing::info!("Imported {} records", count);
            return Ok(Reply::Message(Response::ok(protocol::code::IMPORTED)));
        }
        Commands::Get { id } => Command::Get { id },
        Commands::Ids => Command::IdList,
        Commands::Sort { method, key } => Command::Sort {
            strategy: SortStrategy::try_from(method)?,
            key,
        },
        Commands::Index { method } => Command::BuildIndex {
            kind: IndexKind::try_from(method)?,
        },
        Commands::Lookup { method, ids } => Command::GetList {
            kind: IndexKind::try_from(method)?,
            ids,
        },
        Commands::Search { body } => Command::MergeSearch {
            query: protocol::decode_merge_search(body.as_bytes(), None)?,
        },
        Commands::Zip { method } => Command::Zip {
            kind: CompressionKind::try_from(method)?,
        },
        Commands::Unzip { method } => Command::Unzip {
            kind: CompressionKind::try_from(method)?,
        },
        Commands::Encrypt { method } => Command::Encrypt {
            method: CipherMethod::try_from(method)?,
        },
        Commands::Decrypt { method, key } => Command::Decrypt {
            method: CipherMethod::try_from(method)?,
            key,
        },
        Commands::Katakana { text } => Command::ToKatakana { text },
    };

    engine.execute(command)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(true).init();

    match run(Args::parse()) {
        Ok(reply) => match serde_json::to_string_pretty(&reply) {
            Ok(json) => {
                println!("{}", json);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            let body = Response::error(&e);
            eprintln!("error ({}): {}", body.code, body.message);
            ExitCode::FAILURE
        }
    }
}
