//! Error taxonomy shared by every layer of the engine (block device through
//! the fragmentation analyzer). No module defines its own error enum; every
//! public operation returns [`Result<T>`].

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("I/O: {0}")]
    Io(#[from] IoError),
    #[error("FS: {0}")]
    Fs(#[from] FsError),
}

#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("offset {offset} + {len} bytes is out of range (volume size {size} bytes)")]
    BadOffset { offset: u64, len: usize, size: u64 },
    #[error("unexpected end of file")]
    UnexpectedEof,
    #[error(transparent)]
    Os(#[from] std::io::Error),
}

/// Kinds, not names: each variant is the failure mode a caller needs to
/// branch on, carrying just enough context (cluster number, path, field) to
/// report the failure without the engine doing any silent recovery.
#[derive(thiserror::Error, Debug)]
pub enum FsError {
    #[error("invalid boot sector: {field}")]
    InvalidBootSector { field: &'static str },
    #[error("invalid FAT entry for cluster {cluster}")]
    InvalidFatEntry { cluster: u32 },
    #[error("cluster chain corrupt at cluster {cluster}")]
    ChainCorrupt { cluster: u32 },
    #[error("no free clusters available")]
    NoSpace,
    #[error("directory is full and cannot be expanded")]
    DirectoryFull,
    #[error("directory is not empty")]
    DirectoryNotEmpty,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("invalid name: {0}")]
    NameInvalid(String),
    #[error("could not generate a unique short name")]
    NameGenerationExhausted,
    #[error("cannot delete the root directory")]
    CannotDeleteRoot,
    #[error("invalid size")]
    InvalidSize,
    #[error("volume is mounted read-only")]
    ReadOnly,
}

pub type Result<T> = std::result::Result<T, Error>;
