#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use pkgload_check::DeclChecker;
use pkgload_ir::{
    default_name, BuildContext, CacheState, CheckConfig, CheckFailure, Checker, ExportError,
    ExportReader, ImportError, ImportErrorKind, ImportMode, Importer, Object, ObjectKind, Package,
    PackageCache, ParseError, PkgInfo, Position, ResolveError, Signature, SourceParser, TypeError,
    UNSAFE_PATH,
};
use pkgload_syntax::{DeclParser, SourceFile};
use pretty_assertions::assert_eq;
use rustc_hash::FxHashMap;

use super::ImportEngine;
use crate::PkgIndex;

type Files = Arc<Mutex<FxHashMap<PathBuf, String>>>;

/// Parses with [`DeclParser`], recording every path it is given.
#[derive(Default)]
struct RecordingParser {
    parsed: Mutex<Vec<PathBuf>>,
    /// Files whose name ends with this are parsed slowly.
    slow: Option<&'static str>,
}

impl RecordingParser {
    fn count_in(&self, dir: &str) -> usize {
        self.parsed
            .lock()
            .iter()
            .filter(|p| p.starts_with(dir))
            .count()
    }

    fn total(&self) -> usize {
        self.parsed.lock().len()
    }
}

impl SourceParser for RecordingParser {
    type File = SourceFile;

    fn parse_file(&self, path: &Path, src: &mut dyn Read) -> Result<SourceFile, ParseError> {
        self.parsed.lock().push(path.to_path_buf());
        if self.slow.is_some_and(|suffix| path.ends_with(suffix)) {
            std::thread::sleep(Duration::from_millis(2));
        }
        DeclParser.parse_file(path, src)
    }
}

/// Serves a fixed `Println` package for any path and counts reads.
#[derive(Default)]
struct FakeExports {
    reads: AtomicUsize,
}

impl ExportReader for FakeExports {
    fn read(
        &self,
        packages: &PackageCache,
        path: &str,
        _src_dir: &Path,
    ) -> Result<Arc<Package>, ExportError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(pkg) = packages.get_complete(path) {
            return Ok(pkg);
        }
        let mut pkg = Package::new(path, default_name(path));
        pkg.insert(Object::new(
            "Println",
            true,
            ObjectKind::Func {
                sig: Signature::default(),
            },
        ))
        .unwrap();
        pkg.mark_complete();
        Ok(packages.insert(Arc::new(pkg)))
    }
}

type Engine = ImportEngine<RecordingParser, DeclChecker>;

/// Package metadata plus an in-memory file system under `/src`.
struct World {
    index: PkgIndex,
    files: Files,
}

impl World {
    fn new() -> Self {
        World {
            index: PkgIndex::new("test world"),
            files: Files::default(),
        }
    }

    fn dir(path: &str) -> String {
        format!("/src/{path}")
    }

    fn package(mut self, path: &str, files: &[(&str, &str)]) -> Self {
        let mut info = PkgInfo::new(path, default_name(path));
        info.dir = Self::dir(path);
        for (name, text) in files {
            info.source_files.push((*name).to_owned());
            self.files
                .lock()
                .insert(Path::new(&info.dir).join(name), (*text).to_owned());
        }
        self.index.insert(info);
        self
    }

    fn ffi_package(mut self, path: &str, file: &str, text: &str) -> Self {
        let mut info = PkgInfo::new(path, default_name(path));
        info.dir = Self::dir(path);
        info.ffi_files.push(file.to_owned());
        self.files
            .lock()
            .insert(Path::new(&info.dir).join(file), text.to_owned());
        self.index.insert(info);
        self
    }

    fn standard(mut self, path: &str) -> Self {
        let mut info = PkgInfo::new(path, default_name(path));
        info.dir = Self::dir(path);
        info.standard = true;
        info.source_files.push("lib.pk".to_owned());
        self.index.insert(info);
        self
    }

    fn context(&self) -> BuildContext {
        let files = Arc::clone(&self.files);
        BuildContext::default().with_open_file(move |path| {
            let Some(text) = files.lock().get(path).cloned() else {
                return Err(io::Error::new(io::ErrorKind::NotFound, "file does not exist"));
            };
            Ok(Box::new(io::Cursor::new(text.into_bytes())) as Box<dyn Read + Send>)
        })
    }

    fn engine(self) -> (Engine, Files) {
        self.engine_with(RecordingParser::default())
    }

    fn engine_with(self, parser: RecordingParser) -> (Engine, Files) {
        let ctxt = self.context();
        let engine = ImportEngine::new(ctxt, Arc::new(self.index), parser, DeclChecker);
        (engine, self.files)
    }
}

fn import(engine: &Engine, path: &str) -> Result<Arc<Package>, ImportError> {
    engine.import_from(path, Path::new("/work"), ImportMode::DEFAULT)
}

fn layout(pkg: &Package, name: &str) -> (u64, u64) {
    match &pkg.lookup(name).unwrap().kind {
        ObjectKind::TypeName { size, align, .. } => (*size, *align),
        other => panic!("{name} is not a type: {other:?}"),
    }
}

fn geom_world() -> World {
    World::new()
        .package(
            "example.com/geom",
            &[
                (
                    "point.pk",
                    "package geom;\nimport \"example.com/units\";\npub type Point = struct { x: units.Meters, y: units.Meters };\n",
                ),
                (
                    "rect.pk",
                    "package geom;\npub type Rect = struct { min: Point, max: Point, tag: byte };\n",
                ),
            ],
        )
        .package(
            "example.com/units",
            &[("units.pk", "package units;\npub type Meters = int;\n")],
        )
}

// --- Resolution ---

#[test]
fn imports_package_and_its_dependencies() {
    let (engine, _) = geom_world().engine();
    let geom = import(&engine, "example.com/geom").unwrap();

    assert!(geom.is_complete());
    assert_eq!(geom.name(), "geom");
    assert_eq!(geom.imports(), ["example.com/units"]);
    assert_eq!(layout(&geom, "Point"), (16, 8));
    assert_eq!(layout(&geom, "Rect"), (40, 8));
    assert_eq!(
        engine.packages().complete_paths(),
        ["example.com/geom", "example.com/units"]
    );
}

#[test]
fn repeated_import_returns_the_same_package() {
    let (engine, _) = geom_world().engine();
    let first = import(&engine, "example.com/geom").unwrap();
    let parsed = engine.parser.total();
    let second = import(&engine, "example.com/geom").unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.parser.total(), parsed);
}

#[test]
fn shared_dependency_is_parsed_once() {
    let (engine, _) = World::new()
        .package(
            "example.com/app",
            &[(
                "main.pk",
                "package app;\nimport \"example.com/left\";\nimport \"example.com/right\";\n",
            )],
        )
        .package(
            "example.com/left",
            &[("l.pk", "package left;\nimport \"example.com/base\";\n")],
        )
        .package(
            "example.com/right",
            &[("r.pk", "package right;\nimport \"example.com/base\";\n")],
        )
        .package("example.com/base", &[("b.pk", "package base;\n")])
        .engine();

    import(&engine, "example.com/app").unwrap();
    assert_eq!(engine.parser.count_in("/src/example.com/base"), 1);
    assert_eq!(engine.parser.total(), 4);
}

#[test]
fn sizes_follow_the_context_target() {
    let world = geom_world();
    let ctxt = world.context().with_target("std", "x86");
    let engine = ImportEngine::new(
        ctxt,
        Arc::new(world.index),
        RecordingParser::default(),
        DeclChecker,
    );
    let geom = import(&engine, "example.com/geom").unwrap();
    assert_eq!(layout(&geom, "Point"), (8, 4));
    assert_eq!(layout(&geom, "Rect"), (20, 4));
}

#[test]
fn ffi_files_are_checked_with_opaque_foreign_names() {
    let (engine, _) = World::new()
        .ffi_package(
            "example.com/native",
            "native.pk",
            "package native;\nimport \"ffi\";\npub type Handle = struct { raw: ffi.Handle };\n",
        )
        .engine();
    let native = import(&engine, "example.com/native").unwrap();
    assert_eq!(layout(&native, "Handle"), (8, 8));
}

#[test]
fn unsafe_does_not_consult_the_resolver() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counted = Arc::clone(&calls);
    let resolver = move |path: &str| -> Result<Arc<PkgInfo>, ResolveError> {
        counted.fetch_add(1, Ordering::SeqCst);
        Err(ResolveError::new(format!("unexpected lookup of {path}")))
    };
    let engine = ImportEngine::new(
        BuildContext::default(),
        Arc::new(resolver),
        RecordingParser::default(),
        DeclChecker,
    );

    let pkg = import(&engine, UNSAFE_PATH).unwrap();
    assert!(Arc::ptr_eq(&pkg, &Package::unsafe_package()));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(engine.packages().is_empty());
}

#[test]
fn unresolvable_path_leaves_cache_untouched() {
    let (engine, _) = geom_world().engine();
    let err = import(&engine, "example.com/nope").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::UnresolvablePath);
    assert_eq!(
        err.to_string(),
        "failed to resolve example.com/nope: failed to resolve example.com/nope amongst test world"
    );
    assert!(engine.packages().is_empty());
}

#[test]
#[should_panic(expected = "import mode 1 is not supported")]
fn non_default_mode_panics() {
    let (engine, _) = geom_world().engine();
    let _ = engine.import_from("example.com/geom", Path::new("/work"), ImportMode(1));
}

// --- Cache states ---

#[test]
fn in_progress_path_is_a_cycle() {
    let (engine, _) = geom_world().engine();
    let _claim = engine.packages().begin("example.com/units").unwrap();
    let err = import(&engine, "example.com/units").unwrap_err();
    assert!(matches!(&err, ImportError::Cycle { path } if path == "example.com/units"));
    assert_eq!(err.kind(), ImportErrorKind::ImportCycle);
}

#[test]
fn partial_entry_is_refused() {
    let (engine, _) = geom_world().engine();
    engine.packages().insert_stub("example.com/units", "units");
    let err = import(&engine, "example.com/units").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::ReimportedPartial);
    let partial = err.partial_package().unwrap();
    assert!(!partial.is_complete());
    assert_eq!(engine.parser.total(), 0);
}

#[test]
fn two_package_cycle_is_reported_and_cleaned_up() {
    let (engine, _) = World::new()
        .package(
            "example.com/a",
            &[("a.pk", "package a;\nimport \"example.com/b\";\n")],
        )
        .package(
            "example.com/b",
            &[("b.pk", "package b;\nimport \"example.com/a\";\n")],
        )
        .engine();

    let err = import(&engine, "example.com/a").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::TypeCheck);
    assert!(err.partial_package().is_none());
    let message = err.to_string();
    assert!(
        message.contains("import cycle through package \"example.com/a\""),
        "{message}"
    );
    assert!(engine.packages().state("example.com/a").is_absent());
    assert!(engine.packages().state("example.com/b").is_absent());
}

#[test]
fn deep_chain_and_deep_ring() {
    const DEPTH: usize = 1000;
    let name = |i: usize| format!("example.com/p{i}");
    let source = |i: usize, next: Option<usize>| match next {
        Some(next) => format!("package p{i};\nimport \"{}\";\n", name(next)),
        None => format!("package p{i};\n"),
    };

    let mut chain = World::new();
    let mut ring = World::new();
    for i in 0..DEPTH {
        let next = (i + 1 < DEPTH).then_some(i + 1);
        chain = chain.package(&name(i), &[("p.pk", source(i, next).as_str())]);
        ring = ring.package(&name(i), &[("p.pk", source(i, Some((i + 1) % DEPTH)).as_str())]);
    }

    let (chain, _) = chain.engine();
    let root = import(&chain, &name(0)).unwrap();
    assert_eq!(root.imports(), [name(1)]);
    assert_eq!(chain.packages().complete_paths().len(), DEPTH);

    let (ring, _) = ring.engine();
    let err = import(&ring, &name(0)).unwrap_err();
    assert!(err
        .to_string()
        .contains("import cycle through package \"example.com/p0\""));
    assert!(ring.packages().is_empty());
}

#[test]
fn failed_import_can_be_retried() {
    let (engine, files) = World::new()
        .package(
            "example.com/a",
            &[("a.pk", "package a;\npub const N: int = missing;\n")],
        )
        .engine();

    let err = import(&engine, "example.com/a").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::TypeCheck);
    assert!(engine.packages().state("example.com/a").is_absent());

    files.lock().insert(
        PathBuf::from("/src/example.com/a/a.pk"),
        "package a;\npub const N: int = 3;\n".to_owned(),
    );
    let pkg = import(&engine, "example.com/a").unwrap();
    assert!(pkg.is_complete());
}

#[test]
fn parse_failure_releases_the_marker() {
    let (engine, _) = World::new()
        .package("example.com/a", &[("a.pk", "package a;\nconst = 1;\n")])
        .engine();
    let err = import(&engine, "example.com/a").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::Parse);
    assert!(err.is_unresolvable());
    assert!(engine.packages().state("example.com/a").is_absent());

    // A second attempt fails the same way rather than reporting a cycle.
    let again = import(&engine, "example.com/a").unwrap_err();
    assert_eq!(again.kind(), ImportErrorKind::Parse);
}

// --- Parse error ordering ---

#[test]
fn first_failing_file_in_input_order_wins() {
    let world = World::new().package(
        "example.com/multi",
        &[
            ("f1.pk", "package multi;\n"),
            ("f2.pk", "package multi;\nconst = 1;\n"),
            ("f3.pk", "package multi;\ntype;\n"),
            ("f4.pk", "package multi;\n"),
        ],
    );
    let (engine, _) = world.engine_with(RecordingParser {
        slow: Some("f2.pk"),
        ..RecordingParser::default()
    });

    for _ in 0..100 {
        let err = import(&engine, "example.com/multi").unwrap_err();
        let ImportError::Parse { source, .. } = &err else {
            panic!("expected a parse error, got {err}");
        };
        assert_eq!(source.path(), Path::new("/src/example.com/multi/f2.pk"));
    }
    assert_eq!(engine.parser.total(), 400);
}

#[test]
fn missing_file_is_an_open_error() {
    let world = World::new().package(
        "example.com/multi",
        &[("f1.pk", "package multi;\n"), ("f2.pk", "package multi;\n")],
    );
    world
        .files
        .lock()
        .remove(Path::new("/src/example.com/multi/f1.pk"));
    let (engine, _) = world.engine();

    let err = import(&engine, "example.com/multi").unwrap_err();
    let ImportError::Parse { source, .. } = &err else {
        panic!("expected a parse error, got {err}");
    };
    assert!(matches!(source, ParseError::Open { .. }));
    assert_eq!(source.path(), Path::new("/src/example.com/multi/f1.pk"));
}

// --- Type-check outcomes ---

#[test]
fn hard_error_wins_over_earlier_soft_error() {
    let (engine, _) = World::new()
        .package(
            "example.com/a",
            &[(
                "a.pk",
                "package a;\nimport \"example.com/b\";\nimport \"example.com/b\";\npub const N: int = nope;\n",
            )],
        )
        .package("example.com/b", &[("b.pk", "package b;\n")])
        .engine();

    let err = import(&engine, "example.com/a").unwrap_err();
    let ImportError::TypeCheck { error, package, .. } = &err else {
        panic!("expected a type-check error, got {err}");
    };
    assert!(!error.soft);
    assert_eq!(error.message, "undefined: nope");
    assert!(package.is_none());
    assert!(engine.packages().state("example.com/a").is_absent());
    // The dependency itself was fine and stays cached.
    assert!(matches!(
        engine.packages().state("example.com/b"),
        CacheState::Complete(_)
    ));
}

#[test]
fn soft_errors_only_attach_the_unstored_package() {
    let (engine, _) = World::new()
        .package(
            "example.com/a",
            &[(
                "a.pk",
                "package a;\nimport \"example.com/b\";\nimport \"example.com/b\";\npub const N: int = 1;\n",
            )],
        )
        .package("example.com/b", &[("b.pk", "package b;\n")])
        .engine();

    let err = import(&engine, "example.com/a").unwrap_err();
    let ImportError::TypeCheck { error, package, .. } = &err else {
        panic!("expected a type-check error, got {err}");
    };
    assert!(error.soft);
    assert_eq!(error.message, "\"example.com/b\" imported twice as b");
    let package = package.as_ref().unwrap();
    assert!(package.lookup("N").is_some());
    assert!(engine.packages().state("example.com/a").is_absent());
}

/// Reports a hard error and then claims success anyway.
struct InconsistentChecker;

impl Checker for InconsistentChecker {
    type File = SourceFile;

    fn check(
        &self,
        path: &str,
        _files: &[SourceFile],
        conf: CheckConfig<'_>,
    ) -> Result<Package, CheckFailure> {
        if let Some(report) = conf.error {
            report(&TypeError::hard(Position::default(), "broken declaration"));
        }
        let mut pkg = Package::new(path, default_name(path));
        pkg.mark_complete();
        Ok(pkg)
    }
}

#[test]
#[should_panic(expected = "after reporting")]
fn success_after_hard_error_panics() {
    let world = World::new().package("example.com/a", &[("a.pk", "package a;\n")]);
    let ctxt = world.context();
    let engine = ImportEngine::new(
        ctxt,
        Arc::new(world.index),
        RecordingParser::default(),
        InconsistentChecker,
    );
    let _ = engine.import_from("example.com/a", Path::new("/work"), ImportMode::DEFAULT);
}

// --- Precompiled delegation ---

#[test]
fn standard_packages_are_delegated() {
    let exports = Arc::new(FakeExports::default());
    let world = World::new().standard("std/fmt").package(
        "example.com/app",
        &[(
            "main.pk",
            "package app;\nimport \"std/fmt\";\npub fn Run() { fmt.Println() }\n",
        )],
    );
    let (engine, _) = world.engine();
    let engine = engine.with_export_reader(Arc::clone(&exports) as Arc<dyn ExportReader>);

    let app = import(&engine, "example.com/app").unwrap();
    assert_eq!(app.imports(), ["std/fmt"]);
    let fmt = import(&engine, "std/fmt").unwrap();
    let again = engine.precompiled().import("std/fmt").unwrap();

    assert!(Arc::ptr_eq(&fmt, &again));
    assert!(Arc::ptr_eq(
        &fmt,
        &engine.packages().get_complete("std/fmt").unwrap()
    ));
    assert_eq!(engine.parser.count_in("/src/std/fmt"), 0);
    assert_eq!(exports.reads.load(Ordering::SeqCst), 3);
}

#[test]
fn missing_export_data_is_unresolvable() {
    let (engine, _) = World::new().standard("std/os").engine();
    let err = import(&engine, "std/os").unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::UnresolvablePath);
    assert_eq!(
        err.to_string(),
        "failed to import precompiled std/os: no export data for \"std/os\""
    );
}

#[test]
fn shared_cache_handle() {
    let packages = PackageCache::new();
    let (engine, _) = geom_world().engine();
    let engine = engine.with_packages(packages.clone());
    import(&engine, "example.com/units").unwrap();
    assert!(packages.same_cache(engine.precompiled().packages()));
    assert!(matches!(
        packages.state("example.com/units"),
        CacheState::Complete(_)
    ));
}

// --- Concurrency ---

#[test]
fn engine_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Engine>();
    assert_send_sync::<crate::SourceEngine>();
}

#[test]
fn concurrent_callers_share_results() {
    let (engine, _) = geom_world()
        .package(
            "example.com/shapes",
            &[("s.pk", "package shapes;\nimport \"example.com/geom\";\n")],
        )
        .engine();
    // Warm the shared dependency so the callers never race on one path.
    import(&engine, "example.com/geom").unwrap();

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| scope.spawn(|| import(&engine, "example.com/shapes")))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let ok: Vec<_> = results.into_iter().filter_map(Result::ok).collect();
    assert!(!ok.is_empty());
    for pkg in &ok {
        assert!(Arc::ptr_eq(pkg, &ok[0]));
    }
}

#[test]
fn concurrent_request_for_in_progress_path_sees_a_cycle() {
    let (engine, _) = geom_world().engine();
    let claim = engine.packages().begin("example.com/geom").unwrap();
    let err = std::thread::scope(|scope| {
        scope
            .spawn(|| import(&engine, "example.com/geom"))
            .join()
            .unwrap()
    })
    .unwrap_err();
    assert_eq!(err.kind(), ImportErrorKind::ImportCycle);
    drop(claim);
    assert!(import(&engine, "example.com/geom").is_ok());
}
