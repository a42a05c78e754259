//! Per-package checking state.

mod consts;
mod imports;
mod types;

use std::sync::Arc;

use pkgload_ir::{
    default_name, CheckConfig, CheckFailure, ConstValue, Field, Object, ObjectKind, Package,
    Signature, Type, TypeError,
};
use pkgload_syntax::ast::{Decl, DeclKind};
use pkgload_syntax::{Pos, SourceFile};
use rustc_hash::{FxHashMap, FxHashSet};

/// What an import name denotes inside one file.
#[derive(Clone, Debug)]
enum Target {
    Package(Arc<Package>),
    /// The foreign-function pseudo package; every member is opaque.
    Ffi,
    /// The import failed and was reported; references stay silent.
    Failed,
}

#[derive(Debug)]
struct ImportBinding {
    name: String,
    path: String,
    pos: Pos,
    target: Target,
    used: bool,
}

/// Memo entry for lazily resolved declarations.
enum Resolution<T> {
    InProgress,
    Done(T),
}

pub(crate) struct PackageChecker<'a, 'c> {
    path: &'a str,
    files: &'a [SourceFile],
    conf: CheckConfig<'c>,
    pkg: Package,
    /// Import bindings per file, in source order.
    imports: Vec<Vec<ImportBinding>>,
    /// First declaration of each package-level name as (file, decl) indices.
    decls: FxHashMap<String, (usize, usize)>,
    /// Underlying type, size and alignment of type declarations.
    types: FxHashMap<String, Resolution<(Type, u64, u64)>>,
    consts: FxHashMap<String, Resolution<(Type, ConstValue)>>,
    /// Declarations already reported as cyclic.
    cycles: FxHashSet<String>,
    first_error: Option<TypeError>,
    hard_errors: usize,
}

impl<'a, 'c> PackageChecker<'a, 'c> {
    pub(crate) fn new(path: &'a str, files: &'a [SourceFile], conf: CheckConfig<'c>) -> Self {
        PackageChecker {
            path,
            files,
            conf,
            pkg: Package::new(path, default_name(path)),
            imports: Vec::with_capacity(files.len()),
            decls: FxHashMap::default(),
            types: FxHashMap::default(),
            consts: FxHashMap::default(),
            cycles: FxHashSet::default(),
            first_error: None,
            hard_errors: 0,
        }
    }

    pub(crate) fn run(mut self) -> Result<Package, CheckFailure> {
        self.check_package_names();
        self.bind_imports();
        self.collect_decls();
        self.check_decls();
        if !self.conf.ignore_func_bodies {
            self.report_unused_imports();
        }
        self.finish()
    }

    fn finish(mut self) -> Result<Package, CheckFailure> {
        if self.hard_errors == 0 {
            self.pkg.mark_complete();
        }
        tracing::debug!(
            objects = self.pkg.len(),
            hard_errors = self.hard_errors,
            complete = self.pkg.is_complete(),
            "checked package"
        );
        match self.first_error {
            None => Ok(self.pkg),
            Some(error) => Err(CheckFailure {
                package: self.pkg,
                error,
            }),
        }
    }

    // --- Diagnostics ---

    fn report(&mut self, error: TypeError) {
        tracing::trace!(%error, soft = error.soft, "type error");
        if !error.soft {
            self.hard_errors += 1;
        }
        if let Some(handler) = self.conf.error.as_mut() {
            handler(&error);
        }
        if self.first_error.is_none() {
            self.first_error = Some(error);
        }
    }

    fn hard(&mut self, file: usize, pos: Pos, message: impl Into<String>) {
        let pos = pos.in_file(&self.files[file].path);
        self.report(TypeError::hard(pos, message));
    }

    fn soft(&mut self, file: usize, pos: Pos, message: impl Into<String>) {
        let pos = pos.in_file(&self.files[file].path);
        self.report(TypeError::soft(pos, message));
    }

    // --- Passes ---

    fn check_package_names(&mut self) {
        let files = self.files;
        let Some(first) = files.first() else {
            return;
        };
        self.pkg.set_name(first.package.name.clone());
        for (fi, file) in files.iter().enumerate().skip(1) {
            if file.package.name != first.package.name {
                self.hard(
                    fi,
                    file.package.pos,
                    format!(
                        "package {}; expected package {}",
                        file.package.name, first.package.name
                    ),
                );
            }
        }
    }

    fn collect_decls(&mut self) {
        let files = self.files;
        for (fi, file) in files.iter().enumerate() {
            for (di, decl) in file.decls.iter().enumerate() {
                let name = &decl.name.name;
                if let Some(&(pf, pd)) = self.decls.get(name) {
                    let previous = files[pf].decls[pd].name.pos.in_file(&files[pf].path);
                    self.hard(
                        fi,
                        decl.name.pos,
                        format!("{name} redeclared in this package (previous declaration at {previous})"),
                    );
                } else {
                    self.decls.insert(name.clone(), (fi, di));
                }
            }
        }
    }

    /// Resolve every first declaration in source order. Types and constants
    /// may already have been resolved on demand by an earlier declaration.
    fn check_decls(&mut self) {
        let files = self.files;
        for (fi, file) in files.iter().enumerate() {
            for (di, decl) in file.decls.iter().enumerate() {
                if self.decls.get(&decl.name.name) != Some(&(fi, di)) {
                    continue;
                }
                match &decl.kind {
                    DeclKind::Const { .. } => {
                        self.resolve_const(&decl.name.name);
                    }
                    DeclKind::Type { .. } => {
                        self.resolve_type_decl(&decl.name.name);
                    }
                    DeclKind::Var { ty } => {
                        let (ty, _) = self.resolve_type(fi, ty, false);
                        self.declare(decl, ObjectKind::Var { ty });
                    }
                    DeclKind::Func {
                        params,
                        result,
                        body,
                    } => {
                        let params = params
                            .iter()
                            .map(|p| Field {
                                name: p.name.name.clone(),
                                ty: self.resolve_type(fi, &p.ty, false).0,
                            })
                            .collect();
                        let result = result
                            .as_ref()
                            .map(|ty| self.resolve_type(fi, ty, false).0);
                        self.declare(
                            decl,
                            ObjectKind::Func {
                                sig: Signature { params, result },
                            },
                        );
                        if let Some(body) = body {
                            if !self.conf.ignore_func_bodies {
                                self.check_body(fi, body);
                            }
                        }
                    }
                }
            }
        }
    }

    fn declare(&mut self, decl: &Decl, kind: ObjectKind) {
        let object = Object::new(decl.name.name.clone(), decl.public, kind);
        if let Err(existing) = self.pkg.insert(object) {
            tracing::trace!(name = %existing.name, "declaration already recorded");
        }
    }
}
