//! Filesystem layer for attachment directories

pub mod download;
pub mod ops;
pub mod tree;

// Re-export commonly used types
pub use download::{DownloadError, UrlDownloader, UrlFetcher, download_file};
pub use ops::{
    EntryKind, FsError, FsResult, ScannedEntry, copy_file, copy_symlink, exists, hardlink, is_dir,
    is_empty_dir, is_file, is_symlink, make_dir, readlink, remove_file, rename, scan_directory,
    stat, stat_or_none, symlink, write_new_file,
};
pub use tree::{CopyOptions, copy_directory, remove_directory};
