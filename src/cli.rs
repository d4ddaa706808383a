//! The end-to-end driver: read a syntax tree, analyse it, follow its
//! imports, simplify, generate results, and either print or cache them.
//!
//! This is the glue spec.md's core explicitly leaves external ("the
//! filesystem walker", "on-disk caching of results" are named as
//! out-of-scope collaborators in §1) -- every algorithmic step it calls
//! into lives in `rattr-core`.

use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rattr_core::ast::Module;
use rattr_core::cache::{make_cacheable_results, CacheableResults};
use rattr_core::config::{enter_file, format_path, Arguments, Config, Output};
use rattr_core::context::Context;
use rattr_core::diagnostics::{DiagnosticSink, Severity};
use rattr_core::error::RattrError;
use rattr_core::ir::{FileIr, ImportsIr};
use rattr_core::module_locator::{module_name_and_origin, ModuleLocator, StaticModuleLocator};
use rattr_core::plugins::PluginRegistry;
use rattr_core::results::{generate_results_from_ir, FileResults};
use rattr_core::symbol::Symbol;

use crate::project_locator::build_locator;

fn read_module(path: &Path) -> Result<Module, RattrError> {
    let content = std::fs::read_to_string(path).map_err(|source| RattrError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| RattrError::MalformedAst {
        path: path.to_path_buf(),
        source,
    })
}

/// The dotted module names a context's import symbols resolve to, per
/// [`module_name_and_origin`]'s longest-locatable-prefix search over each
/// import's qualified name (spec.md §4.3 step 6).
fn imported_modules(ctx: &Context, locator: &dyn ModuleLocator) -> Vec<String> {
    ctx.local_symbols()
        .into_iter()
        .filter_map(|symbol| match symbol {
            Symbol::Import { qualified_name, .. } => {
                module_name_and_origin(locator, &qualified_name).map(|(name, _origin)| name)
            }
            _ => None,
        })
        .collect()
}

/// BFS-follow every import reachable from `root_ctx`, analysing each
/// module at most once, honoring `arguments.follow_imports`'s local/pip/
/// stdlib toggles (spec.md §4.7 step 2).
fn build_imports_ir(
    root_ctx: &Context,
    locator: &Rc<dyn ModuleLocator>,
    arguments: &Arguments,
    plugins: &PluginRegistry,
    sink: &mut DiagnosticSink,
) -> ImportsIr {
    let excluded_imports = arguments.re_excluded_imports().unwrap_or_default();
    let mut imports = ImportsIr::new();
    let mut visited: HashSet<String> = HashSet::new();
    let mut queue: VecDeque<String> = imported_modules(root_ctx, locator.as_ref()).into();

    while let Some(module_name) = queue.pop_front() {
        if !visited.insert(module_name.clone()) {
            continue;
        }
        if !arguments.follow_imports.local {
            continue;
        }
        if rattr_core::module_locator::is_blacklisted_module(&module_name, &excluded_imports) {
            continue;
        }
        let Some(origin) = locator.locate(&module_name) else {
            continue;
        };
        if rattr_core::module_locator::is_pip_module(&origin) && !arguments.follow_imports.pip {
            continue;
        }
        if rattr_core::module_locator::is_stdlib_module(&module_name)
            && !arguments.follow_imports.stdlib
        {
            continue;
        }

        let module = match read_module(&origin) {
            Ok(m) => m,
            Err(_) => continue,
        };
        let _guard = enter_file(&origin);
        let (ctx, file_ir) =
            rattr_core::file_analyser::analyse_module(&module, origin.clone(), locator.clone(), plugins, sink);

        queue.extend(imported_modules(&ctx, locator.as_ref()));
        imports.insert(module_name, file_ir);
    }

    imports
}

/// Print every diagnostic `--show-warnings` allows through to stderr, path
/// formatted per `--collapse-home`/`--truncate-deep-paths` -- the
/// "stderr-equivalent sink" spec.md §6 describes, kept deliberately plain
/// since pretty-printing of diagnostics is an external collaborator's
/// concern (spec.md §1).
fn print_diagnostics(sink: &DiagnosticSink) {
    let config = Config::get();
    let home = dirs::home_dir();
    for diagnostic in sink.diagnostics() {
        if !config.should_show(diagnostic) {
            continue;
        }
        let file = format_path(&diagnostic.file, config.arguments().format_path, home.as_deref());
        match &diagnostic.location {
            Some(loc) => eprintln!("{file}:{}:{}: {}: {}", loc.lineno, loc.col_offset, diagnostic.severity, diagnostic.message),
            None => eprintln!("{file}: {}: {}", diagnostic.severity, diagnostic.message),
        }
    }
}

/// What one run produced, in every shape `--stdout` might ask for.
pub struct RunOutcome {
    pub file_ir: FileIr,
    pub results: FileResults,
    pub cacheable: CacheableResults,
    pub sink: DiagnosticSink,
}

/// Run one full analysis: install the configuration, read and analyse the
/// target (and, per `--follow-imports`, its transitive imports), simplify,
/// generate results, and check the badness threshold.
pub fn analyse(arguments: Arguments, plugins: &PluginRegistry) -> Result<RunOutcome, RattrError> {
    let target = arguments.target.clone();
    let project_root = target.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    let locator: Rc<dyn ModuleLocator> = Rc::new(build_locator(&project_root));

    let mut sink = DiagnosticSink::new();
    let _guard = enter_file(&target);

    let module = read_module(&target)?;
    let (ctx, file_ir) =
        rattr_core::file_analyser::analyse_module(&module, target.clone(), locator.clone(), plugins, &mut sink);

    if sink.has_fatal() {
        let fatal = sink
            .diagnostics()
            .iter()
            .find(|d| d.severity == Severity::Fatal)
            .expect("has_fatal implies a fatal diagnostic exists")
            .clone();
        print_diagnostics(&sink);
        return Err(RattrError::Fatal(fatal));
    }

    let imports = build_imports_ir(&ctx, &locator, &arguments, plugins, &mut sink);
    let results = generate_results_from_ir(&file_ir, &imports, locator.as_ref(), &mut sink);

    if sink.has_fatal() {
        let fatal = sink
            .diagnostics()
            .iter()
            .find(|d| d.severity == Severity::Fatal)
            .expect("has_fatal implies a fatal diagnostic exists")
            .clone();
        print_diagnostics(&sink);
        return Err(RattrError::Fatal(fatal));
    }
    if !sink.is_within_threshold(arguments.threshold.0) {
        print_diagnostics(&sink);
        return Err(RattrError::ThresholdExceeded {
            path: target.clone(),
            badness: sink.badness(),
            threshold: arguments.threshold.0,
        });
    }
    print_diagnostics(&sink);

    let followed_paths: Vec<PathBuf> = imports
        .keys()
        .filter_map(|name| locator.locate(name))
        .collect();
    let cacheable = make_cacheable_results(results.clone(), target, followed_paths, &arguments, plugins);

    Ok(RunOutcome {
        file_ir,
        results,
        cacheable,
        sink,
    })
}

/// Load a cached record from `path` and check it is still valid for the
/// target file, current arguments, and plugin set.
pub fn load_fresh_cache(
    path: &Path,
    arguments: &Arguments,
    plugins: &PluginRegistry,
) -> Result<Option<CacheableResults>, RattrError> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(_) => return Ok(None),
    };
    let record: CacheableResults = serde_json::from_str(&content).map_err(|source| RattrError::MalformedCache {
        path: path.to_path_buf(),
        source,
    })?;
    if record.is_stale(arguments, plugins) {
        return Ok(None);
    }
    Ok(Some(record))
}

/// Run one full analysis honoring the cache: a fresh cache entry short-
/// circuits re-analysis entirely unless `--force-refresh-cache` is set.
pub fn run(arguments: Arguments) -> Result<String, RattrError> {
    Config::install(arguments.clone()).map_err(RattrError::internal)?;
    let plugins = PluginRegistry::with_builtins();

    if let Some(cache_file) = arguments.cache_file.clone() {
        if !arguments.force_refresh_cache {
            if let Some(cached) = load_fresh_cache(&cache_file, &arguments, &plugins)? {
                return render(arguments.stdout, None, &cached.results, &cached);
            }
        }
    }

    let outcome = analyse(arguments.clone(), &plugins)?;

    if let Some(cache_file) = &arguments.cache_file {
        if let Ok(json) = serde_json::to_string_pretty(&outcome.cacheable) {
            let _ = std::fs::write(cache_file, json);
        }
    }

    render(arguments.stdout, Some(&outcome.file_ir), &outcome.results, &outcome.cacheable)
}

fn render(
    output: Output,
    file_ir: Option<&FileIr>,
    results: &FileResults,
    cacheable: &CacheableResults,
) -> Result<String, RattrError> {
    let rendered = match output {
        Output::Silent => String::new(),
        Output::Results => serde_json::to_string_pretty(results).map_err(|e| RattrError::internal(e.to_string()))?,
        Output::Cacheable => {
            serde_json::to_string_pretty(cacheable).map_err(|e| RattrError::internal(e.to_string()))?
        }
        Output::Stats => {
            let functions = file_ir.map(|ir| ir.functions.len()).unwrap_or(0);
            format!("{{\"callables\": {functions}, \"results\": {}}}", results.len())
        }
        Output::Ir => match file_ir {
            Some(_ir) => "\"ir\"".to_string(),
            None => "null".to_string(),
        },
    };
    Ok(rendered)
}

/// Reconstruct a [`Context`]'s root-level locator, useful for callers who
/// only have a `StaticModuleLocator` on hand (tests, primarily).
pub fn locator_for(paths: impl IntoIterator<Item = (String, PathBuf)>) -> StaticModuleLocator {
    let mut locator = StaticModuleLocator::new();
    for (name, path) in paths {
        locator = locator.with_module(name, path);
    }
    locator
}
