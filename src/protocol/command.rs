//! Command definitions
//!
//! One variant per façade operation, already parsed and typed.

use crate::compress::CompressionKind;
use crate::crypto::CipherMethod;
use crate::index::IndexKind;
use crate::record::Record;
use crate::search::MergeQuery;
use crate::sort::{SortKey, SortStrategy};

/// Command types, named after their HTTP route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    LoadDatabase,
    GetAll,
    PageCount,
    IdList,
    GetList,
    Get,
    Post,
    Put,
    Delete,
    Sort,
    BuildIndex,
    Zip,
    Unzip,
    Encrypt,
    Decrypt,
    MergeSearch,
    InvertedIndex,
    ToKatakana,
}

impl CommandType {
    /// Route path, without the optional trailing slash
    pub fn route(self) -> &'static str {
        match self {
            CommandType::LoadDatabase => "/loadDatabase",
            CommandType::GetAll => "/getAll",
            CommandType::PageCount => "/getPagesNumber",
            CommandType::IdList => "/getIdList",
            CommandType::GetList => "/getList",
            CommandType::Get => "/get",
            CommandType::Post => "/post",
            CommandType::Put => "/put",
            CommandType::Delete => "/delete",
            CommandType::Sort => "/ordenacao",
            CommandType::BuildIndex => "/indexacao",
            CommandType::Zip => "/zip",
            CommandType::Unzip => "/unzip",
            CommandType::Encrypt => "/encrypt",
            CommandType::Decrypt => "/decrypt",
            CommandType::MergeSearch => "/mergeSearch",
            CommandType::InvertedIndex => "/invertedIndex",
            CommandType::ToKatakana => "/toKatakana",
        }
    }

    /// Whether the command goes through the engine's write lock
    pub fn is_write(self) -> bool {
        matches!(
            self,
            CommandType::LoadDatabase
                | CommandType::Post
                | CommandType::Put
                | CommandType::Delete
                | CommandType::Sort
                | CommandType::BuildIndex
                | CommandType::Zip
                | CommandType::Unzip
                | CommandType::Encrypt
                | CommandType::Decrypt
        )
    }
}

/// A parsed command
#[derive(Debug, Clone)]
pub enum Command {
    /// Import the configured CSV
    LoadDatabase,

    /// One page of records
    GetAll { page: usize },

    PageCount,

    /// Every id, ascending
    IdList,

    /// Resolve ids through an index, keeping their order
    GetList { kind: IndexKind, ids: Vec<u32> },

    Get { id: u32 },

    /// Create under a fresh id
    Post { record: Record },

    /// Replace an existing record
    Put { record: Record },

    Delete { id: u32 },

    Sort { strategy: SortStrategy, key: SortKey },

    BuildIndex { kind: IndexKind },

    Zip { kind: CompressionKind },

    Unzip { kind: CompressionKind },

    Encrypt { method: CipherMethod },

    Decrypt { method: CipherMethod, key: String },

    /// Filters + ranges through the method named in the query
    MergeSearch { query: MergeQuery },

    /// Text filters through the inverted index, ids only
    InvertedIndex { query: MergeQuery },

    ToKatakana { text: String },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::LoadDatabase => CommandType::LoadDatabase,
            Command::GetAll { .. } => CommandType::GetAll,
            Command::PageCount => CommandType::PageCount,
            Command::IdList => CommandType::IdList,
            Command::GetList { .. } => CommandType::GetList,
            Command::Get { .. } => CommandType::Get,
            Command::Post { .. } => CommandType::Post,
            Command::Put { .. } => CommandType::Put,
            Command::Delete { .. } => CommandType::Delete,
            Command::Sort { .. } => CommandType::Sort,
            Command::BuildIndex { .. } => CommandType::BuildIndex,
            Command::Zip { .. } => CommandType::Zip,
            Command::Unzip { .. } => CommandType::Unzip,
            Command::Encrypt { .. } => CommandType::Encrypt,
            Command::Decrypt { .. } => CommandType::Decrypt,
            Command::MergeSearch { .. } => CommandType::MergeSearch,
            Command::InvertedIndex { .. } => CommandType::InvertedIndex,
            Command::ToKatakana { .. } => CommandType::ToKatakana,
        }
    }
}
