//! Import binding and qualified-name lookup.

use std::sync::Arc;

use pkgload_ir::{default_name, ImportMode, Object, Package, FFI_PATH};
use pkgload_syntax::ast::{Body, Ident, ImportDecl};

use super::{ImportBinding, PackageChecker, Target};

/// What a qualified reference `pkg.member` resolved to.
pub(super) enum Member {
    Foreign,
    Object(Arc<Package>, Object),
}

impl PackageChecker<'_, '_> {
    pub(super) fn bind_imports(&mut self) {
        let files = self.files;
        for (fi, file) in files.iter().enumerate() {
            let mut bindings: Vec<ImportBinding> = Vec::with_capacity(file.imports.len());
            for import in &file.imports {
                let target = self.import(fi, import);
                let name = match (&import.alias, &target) {
                    (Some(alias), _) => alias.name.clone(),
                    (None, Target::Package(pkg)) => pkg.name().to_owned(),
                    (None, _) => default_name(&import.path).to_owned(),
                };
                if name == "_" {
                    continue;
                }
                if let Some(previous) = bindings.iter().find(|b| b.name == name) {
                    if previous.path == import.path {
                        self.soft(
                            fi,
                            import.pos,
                            format!("{:?} imported twice as {name}", import.path),
                        );
                    } else {
                        self.hard(
                            fi,
                            import.pos,
                            format!("{name} already refers to package {:?}", previous.path),
                        );
                    }
                    continue;
                }
                bindings.push(ImportBinding {
                    name,
                    path: import.path.clone(),
                    pos: import.pos,
                    target,
                    used: false,
                });
            }
            self.imports.push(bindings);
        }
    }

    fn import(&mut self, fi: usize, import: &ImportDecl) -> Target {
        if import.path == FFI_PATH && self.conf.fake_import_ffi {
            return Target::Ffi;
        }
        let result =
            self.conf
                .importer
                .import_from(&import.path, self.conf.src_dir, ImportMode::DEFAULT);
        match result {
            Ok(pkg) => {
                self.pkg.add_import(&import.path);
                Target::Package(pkg)
            }
            Err(err) => {
                self.hard(
                    fi,
                    import.pos,
                    format!("could not import {} ({err})", import.path),
                );
                Target::Failed
            }
        }
    }

    /// Resolve `package.member` in file `fi`, marking the import used.
    ///
    /// Returns `None` after reporting an error, or silently when the import
    /// itself already failed.
    pub(super) fn lookup_member(
        &mut self,
        fi: usize,
        package: &Ident,
        member: &Ident,
    ) -> Option<Member> {
        let Some(index) = self.imports[fi]
            .iter()
            .position(|b| b.name == package.name)
        else {
            self.hard(fi, package.pos, format!("undefined: {}", package.name));
            return None;
        };
        let binding = &mut self.imports[fi][index];
        binding.used = true;
        let target = binding.target.clone();

        match target {
            Target::Failed => None,
            Target::Ffi => Some(Member::Foreign),
            Target::Package(pkg) => {
                let object = pkg.lookup(&member.name).cloned();
                match object {
                    None => {
                        self.hard(
                            fi,
                            member.pos,
                            format!("undefined: {}.{}", package.name, member.name),
                        );
                        None
                    }
                    Some(object) if !object.exported => {
                        self.hard(
                            fi,
                            member.pos,
                            format!(
                                "name {} not exported by package {}",
                                member.name, package.name
                            ),
                        );
                        None
                    }
                    Some(object) => Some(Member::Object(pkg, object)),
                }
            }
        }
    }

    /// Qualified references inside a body whose qualifier is not an import
    /// (a local variable, say) are not this checker's business.
    pub(super) fn check_body(&mut self, fi: usize, body: &Body) {
        for reference in &body.refs {
            let is_import = self.imports[fi]
                .iter()
                .any(|b| b.name == reference.package.name);
            if is_import {
                self.lookup_member(fi, &reference.package, &reference.member);
            }
        }
    }

    pub(super) fn report_unused_imports(&mut self) {
        let unused: Vec<_> = self
            .imports
            .iter()
            .enumerate()
            .flat_map(|(fi, bindings)| {
                bindings
                    .iter()
                    .filter(|b| !b.used)
                    .map(move |b| (fi, b.pos, b.path.clone()))
            })
            .collect();
        for (fi, pos, path) in unused {
            self.soft(fi, pos, format!("{path:?} imported and not used"));
        }
    }

    /// The imported package with the given path, if any file imports it.
    pub(super) fn imported_package(&self, path: &str) -> Option<Arc<Package>> {
        self.imports.iter().flatten().find_map(|b| match &b.target {
            Target::Package(pkg) if pkg.path() == path => Some(Arc::clone(pkg)),
            _ => None,
        })
    }
}
