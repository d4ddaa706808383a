//! Process-wide configuration: a write-once [`Arguments`] singleton plus the
//! thread-local "current file" stack used to attribute diagnostics.
//!
//! Mirrors the original's `config/_types.py` (`Arguments`, the three bitflag
//! enums) and `config/state.py` (`enter_file`), generalized into a proper
//! RAII guard: unlike the original's context manager, [`enter_file`] restores
//! the previous file on both normal return and unwind, so a fatal diagnostic
//! raised mid-file never leaves the stack attributing subsequent diagnostics
//! to the wrong path.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// How deep to follow `import`/`from ... import` statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FollowImports {
    pub local: bool,
    pub pip: bool,
    pub stdlib: bool,
}

impl FollowImports {
    /// Build from the CLI's `--follow-imports {0,1,2,3}` level.
    pub fn from_level(level: u8) -> Result<Self, String> {
        match level {
            0 => Ok(FollowImports::default()),
            1 => Ok(FollowImports {
                local: true,
                pip: false,
                stdlib: false,
            }),
            2 => Ok(FollowImports {
                local: true,
                pip: true,
                stdlib: false,
            }),
            3 => Ok(FollowImports {
                local: true,
                pip: true,
                stdlib: true,
            }),
            other => Err(format!("--follow-imports must be 0-3, got {other}")),
        }
    }
}

/// Verbosity of non-fatal diagnostics retained in output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowWarnings {
    None,
    Local,
    Default,
    All,
}

/// Path-formatting toggles applied when diagnostics or results are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FormatPath {
    pub collapse_home: bool,
    pub truncate_deep_paths: bool,
}

/// What `--stdout` should emit on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Output {
    Stats,
    Ir,
    Results,
    Cacheable,
    Silent,
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Output::Stats => "stats",
            Output::Ir => "ir",
            Output::Results => "results",
            Output::Cacheable => "cacheable",
            Output::Silent => "silent",
        };
        write!(f, "{s}")
    }
}

/// A threshold mode: `--strict` is `Threshold(0)`, `--permissive N` is
/// `Threshold(N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Threshold(pub u32);

impl Threshold {
    pub fn strict() -> Self {
        Threshold(0)
    }
}

/// The parsed, validated, effectively-immutable arguments for one run.
///
/// Project-file overrides (the original's `pyproject_toml_override`) are an
/// external collaborator's concern per spec.md §1 ("configuration file
/// loading, TOML parsing" are out of scope) -- by the time a `Config`
/// exists here, any such merge has already happened upstream of this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Arguments {
    pub target: PathBuf,
    pub follow_imports: FollowImports,
    pub excluded_imports: Vec<String>,
    pub excluded_names: Vec<String>,
    pub show_warnings: ShowWarnings,
    pub threshold: Threshold,
    pub stdout: Output,
    pub cache_file: Option<PathBuf>,
    pub force_refresh_cache: bool,
    pub format_path: FormatPath,
}

impl Arguments {
    pub fn re_excluded_imports(&self) -> Result<Vec<Regex>, regex::Error> {
        self.excluded_imports.iter().map(|p| Regex::new(p)).collect()
    }

    pub fn re_excluded_names(&self) -> Result<Vec<Regex>, regex::Error> {
        self.excluded_names.iter().map(|p| Regex::new(p)).collect()
    }
}

/// Shorten `path` for display per `format`'s `--collapse-home`/
/// `--truncate-deep-paths` toggles (the original's `get_formatted_path`).
/// `home` is passed in rather than resolved here so this stays pure and
/// testable without touching the real filesystem.
pub fn format_path(path: &Path, format: FormatPath, home: Option<&Path>) -> String {
    let mut path = path.to_path_buf();

    if format.collapse_home {
        if let Some(home) = home {
            if let Ok(rest) = path.strip_prefix(home) {
                path = Path::new("~").join(rest);
            }
        }
    }

    if format.truncate_deep_paths {
        let parts: Vec<&std::ffi::OsStr> = path.iter().collect();
        if parts.len() > 5 {
            let mut truncated = PathBuf::from(parts[0]);
            truncated.push("...");
            for part in &parts[parts.len() - 3..] {
                truncated.push(part);
            }
            path = truncated;
        }
    }

    path.to_string_lossy().replace('\\', "/")
}

/// Whether `diagnostic` should be surfaced under `show_warnings` (the
/// original's `do_not_show_warnings`/`ShowWarnings` split between the
/// target file and its followed imports): errors, meta-diagnostics, and
/// fatals always surface since they affect badness regardless of
/// verbosity; `info` is reserved for `--show-warnings all`; `warning` is
/// gated by level, with `local` restricting it to `target`.
pub fn should_show_diagnostic(
    diagnostic: &crate::diagnostics::Diagnostic,
    show_warnings: ShowWarnings,
    target: &Path,
) -> bool {
    use crate::diagnostics::Severity;
    match diagnostic.severity {
        Severity::Error | Severity::Rattr | Severity::Fatal => true,
        Severity::Info => show_warnings == ShowWarnings::All,
        Severity::Warning => match show_warnings {
            ShowWarnings::None => false,
            ShowWarnings::Local => diagnostic.file == target,
            ShowWarnings::Default | ShowWarnings::All => true,
        },
    }
}

thread_local! {
    static CURRENT_FILE: RefCell<Vec<PathBuf>> = const { RefCell::new(Vec::new()) };
}

/// The process-wide configuration singleton.
///
/// Built once at startup from [`Arguments`] and read everywhere afterwards;
/// nothing mutates it once [`Config::install`] has run.
pub struct Config {
    arguments: Arguments,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    /// Install the process-wide configuration. Returns an error if it was
    /// already installed (a run installs it exactly once, at the top of
    /// `main`).
    pub fn install(arguments: Arguments) -> Result<(), String> {
        CONFIG
            .set(Config { arguments })
            .map_err(|_| "Config already installed".to_string())
    }

    pub fn get() -> &'static Config {
        CONFIG
            .get()
            .expect("Config::install must run before Config::get")
    }

    /// [`Config::get`] without the panic, for call sites reached by both a
    /// full CLI run (where `install` has already happened) and by tests or
    /// library callers that analyse IR directly with no process-wide
    /// configuration installed at all.
    pub fn try_get() -> Option<&'static Config> {
        CONFIG.get()
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    /// Whether `diagnostic` should be surfaced under this run's
    /// `--show-warnings` level, against this run's target file.
    pub fn should_show(&self, diagnostic: &crate::diagnostics::Diagnostic) -> bool {
        should_show_diagnostic(diagnostic, self.arguments.show_warnings, &self.arguments.target)
    }

    /// [`format_path`] against this run's `--collapse-home`/
    /// `--truncate-deep-paths` configuration. `home` is the caller's
    /// resolved home directory -- this crate has no home-directory crate of
    /// its own, so the binary crate resolves it and passes it in.
    pub fn format_path(&self, path: &Path, home: Option<&Path>) -> String {
        format_path(path, self.arguments.format_path, home)
    }

    /// The file currently being analysed, per the thread-local stack that
    /// [`enter_file`] maintains. Panics if called outside any `enter_file`
    /// scope -- every diagnostic site runs inside one.
    pub fn current_file() -> PathBuf {
        CURRENT_FILE.with(|stack| {
            stack
                .borrow()
                .last()
                .cloned()
                .expect("current_file() called outside enter_file scope")
        })
    }
}

/// RAII guard that pushes `file` onto the thread-local current-file stack
/// on construction and pops it on drop, restoring the previous file on
/// both normal scope exit and unwind.
pub struct FileGuard {
    _private: (),
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        CURRENT_FILE.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Enter a new "current file" scope for the duration of the returned guard.
pub fn enter_file(file: impl AsRef<Path>) -> FileGuard {
    CURRENT_FILE.with(|stack| {
        stack.borrow_mut().push(file.as_ref().to_path_buf());
    });
    FileGuard { _private: () }
}
