//! Cache records: a run's results plus the hashes needed to tell whether a
//! cached record is still valid for the current file, configuration, and
//! plugin set (spec.md §6's cache-record fields).
//!
//! Grounded on `models/results/cacheable.py` and `models/util/hash.py`: the
//! same fields (`version`, `arguments_hash`, `plugins_hash`, `filepath`,
//! `filehash`, per-import `(filepath, filehash)` pairs, `results`), the same
//! hash-of-a-serialized-struct and hash-of-file-content shapes. The
//! original hashes with MD5 (`hashlib.md5`); this crate already carries
//! `sha2`/`hex` rather than an MD5 crate (see `DESIGN.md`), so every hash
//! below is SHA-256 hex-encoded instead -- the algorithm shape (hash content,
//! hash a canonical string of the hash-relevant config, compare hex digests)
//! is unchanged. Plugin hashing also diverges: the original hashes each
//! plugin's qualified name plus its defining source file via `inspect`;
//! this crate has no runtime reflection over where a `Box<dyn Trait>` was
//! defined, so it hashes the sorted set of trigger names instead.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::Arguments;
use crate::plugins::PluginRegistry;
use crate::results::FileResults;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn hash_str(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hash a file's content in fixed-size chunks rather than reading it whole,
/// mirroring the original's `blocksize`-chunked read loop. Returns the hash
/// of an empty input if the file cannot be opened (a moved/deleted source
/// file should invalidate the cache entry, not crash the run).
pub fn hash_file_content(path: &Path) -> String {
    let mut hasher = Sha256::new();
    if let Ok(mut file) = std::fs::File::open(path) {
        let mut buffer = [0u8; 1 << 20];
        loop {
            match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => hasher.update(&buffer[..n]),
                Err(_) => break,
            }
        }
    }
    hex::encode(hasher.finalize())
}

/// The subset of `Arguments` that changes what a cached result means,
/// serialized to a canonical string before hashing (the original's
/// `HashableArguments` named tuple).
pub fn hash_arguments(arguments: &Arguments) -> String {
    let mut excluded_imports = arguments.excluded_imports.clone();
    excluded_imports.sort();
    let mut excluded_names = arguments.excluded_names.clone();
    excluded_names.sort();

    let canonical = format!(
        "{:?}|{:?}|{:?}|{:?}",
        crate::names::LITERAL_VALUE_PREFIX,
        arguments.follow_imports,
        excluded_imports,
        excluded_names,
    );
    hash_str(&canonical)
}

/// The active plugin set, hashed by its sorted trigger names (the
/// original's `HashablePlugins`, reconstructed without source-file
/// introspection -- see the module-level note).
pub fn hash_plugins(plugins: &PluginRegistry) -> String {
    let mut triggers: Vec<&str> = plugins.trigger_names();
    triggers.sort_unstable();
    hash_str(&triggers.join(","))
}

/// `(filepath, filehash)` for one import the analysis followed, sorted by
/// filepath for determinism.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheableImportInfo {
    pub filepath: PathBuf,
    pub filehash: String,
}

impl CacheableImportInfo {
    pub fn from_file(filepath: PathBuf) -> Self {
        let filehash = hash_file_content(&filepath);
        CacheableImportInfo { filepath, filehash }
    }
}

/// One cached run: a results record plus everything needed to decide
/// whether it is still valid the next time this file is analysed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheableResults {
    pub version: String,
    pub arguments_hash: String,
    pub plugins_hash: String,
    pub filepath: PathBuf,
    pub filehash: String,
    pub imports: Vec<CacheableImportInfo>,
    pub results: FileResults,
}

impl CacheableResults {
    pub fn is_stale(&self, arguments: &Arguments, plugins: &PluginRegistry) -> bool {
        if self.version != VERSION {
            return true;
        }
        if self.arguments_hash != hash_arguments(arguments) {
            return true;
        }
        if self.plugins_hash != hash_plugins(plugins) {
            return true;
        }
        if self.filehash != hash_file_content(&self.filepath) {
            return true;
        }
        self.imports
            .iter()
            .any(|info| info.filehash != hash_file_content(&info.filepath))
    }
}

/// Build a cache record for one analysed file, given its results, its own
/// path, and the paths of every import it followed.
pub fn make_cacheable_results(
    results: FileResults,
    filepath: PathBuf,
    followed_import_paths: impl IntoIterator<Item = PathBuf>,
    arguments: &Arguments,
    plugins: &PluginRegistry,
) -> CacheableResults {
    let filehash = hash_file_content(&filepath);
    let mut imports: Vec<CacheableImportInfo> = followed_import_paths
        .into_iter()
        .map(CacheableImportInfo::from_file)
        .collect();
    imports.sort();
    imports.dedup();

    CacheableResults {
        version: VERSION.to_string(),
        arguments_hash: hash_arguments(arguments),
        plugins_hash: hash_plugins(plugins),
        filepath,
        filehash,
        imports,
        results,
    }
}
