//! Type resolution and layout.
//!
//! Type declarations are resolved on first use. A declaration that needs
//! its own layout while it is still being resolved contains itself by value
//! and is reported as an invalid recursive type. Pointers and slices only
//! need their element to exist, so recursion through them is fine.

use pkgload_ir::{ensure_sufficient_stack, BasicKind, Field, Object, ObjectKind, Type};
use pkgload_syntax::ast::{DeclKind, TypeExpr, TypeExprKind};
use pkgload_syntax::Pos;
use rustc_hash::FxHashSet;

use super::imports::Member;
use super::{PackageChecker, Resolution};

/// `(size, align)` in bytes.
pub(super) type Layout = (u64, u64);

const INVALID_LAYOUT: Layout = (0, 1);

/// Bound on following named types to their underlying type.
const MAX_NAMED_DEPTH: usize = 64;

impl PackageChecker<'_, '_> {
    /// Resolve the type declaration `name` and return its layout, or `None`
    /// if it is already being resolved further up the stack.
    pub(super) fn resolve_type_decl(&mut self, name: &str) -> Option<Layout> {
        ensure_sufficient_stack(|| self.resolve_type_decl_inner(name))
    }

    fn resolve_type_decl_inner(&mut self, name: &str) -> Option<Layout> {
        match self.types.get(name) {
            Some(Resolution::Done((_, size, align))) => return Some((*size, *align)),
            Some(Resolution::InProgress) => return None,
            None => {}
        }
        let files = self.files;
        let Some(&(fi, di)) = self.decls.get(name) else {
            return Some(INVALID_LAYOUT);
        };
        let decl = &files[fi].decls[di];
        let DeclKind::Type { ty } = &decl.kind else {
            return Some(INVALID_LAYOUT);
        };

        self.types.insert(name.to_owned(), Resolution::InProgress);
        let (underlying, (size, align)) = self.resolve_type(fi, ty, true);
        tracing::trace!(name, size, align, "resolved type");
        self.types.insert(
            name.to_owned(),
            Resolution::Done((underlying.clone(), size, align)),
        );
        self.declare(
            decl,
            ObjectKind::TypeName {
                underlying,
                size,
                align,
            },
        );
        Some((size, align))
    }

    /// Resolve a type expression in file `fi`. The layout is only computed
    /// when `need_layout` is set; otherwise it is a placeholder.
    pub(super) fn resolve_type(
        &mut self,
        fi: usize,
        expr: &TypeExpr,
        need_layout: bool,
    ) -> (Type, Layout) {
        ensure_sufficient_stack(|| self.resolve_type_inner(fi, expr, need_layout))
    }

    fn resolve_type_inner(&mut self, fi: usize, expr: &TypeExpr, need_layout: bool) -> (Type, Layout) {
        match &expr.kind {
            TypeExprKind::Name(name) => self.resolve_type_name(fi, expr.pos, name, need_layout),
            TypeExprKind::Qualified(package, member) => {
                match self.lookup_member(fi, package, member) {
                    None => (Type::Invalid, INVALID_LAYOUT),
                    Some(Member::Foreign) => {
                        let ty = Type::Foreign(member.name.clone());
                        let layout = self.layout_of(&ty);
                        (ty, layout)
                    }
                    Some(Member::Object(pkg, object)) => match object.kind {
                        ObjectKind::TypeName {
                            underlying,
                            size,
                            align,
                        } => (
                            Type::named(pkg.path(), object.name),
                            self.imported_layout(&underlying, (size, align)),
                        ),
                        _ => {
                            self.hard(
                                fi,
                                member.pos,
                                format!("{}.{} is not a type", package.name, member.name),
                            );
                            (Type::Invalid, INVALID_LAYOUT)
                        }
                    },
                }
            }
            TypeExprKind::Pointer(elem) => {
                let (elem, _) = self.resolve_type(fi, elem, false);
                let ty = Type::Pointer(Box::new(elem));
                let layout = self.layout_of(&ty);
                (ty, layout)
            }
            TypeExprKind::Slice(elem) => {
                let (elem, _) = self.resolve_type(fi, elem, false);
                let ty = Type::Slice(Box::new(elem));
                let layout = self.layout_of(&ty);
                (ty, layout)
            }
            TypeExprKind::Struct(fields) => {
                let mut seen = FxHashSet::default();
                let mut resolved = Vec::with_capacity(fields.len());
                let mut layouts = Vec::with_capacity(fields.len());
                for field in fields {
                    if !seen.insert(field.name.name.as_str()) {
                        self.hard(
                            fi,
                            field.name.pos,
                            format!("duplicate field {}", field.name.name),
                        );
                    }
                    let (ty, layout) = self.resolve_type(fi, &field.ty, need_layout);
                    resolved.push(Field {
                        name: field.name.name.clone(),
                        ty,
                    });
                    layouts.push(layout);
                }
                let layout = self.conf.sizes.struct_layout(&layouts);
                (Type::Struct(resolved), layout)
            }
        }
    }

    fn resolve_type_name(
        &mut self,
        fi: usize,
        pos: Pos,
        name: &str,
        need_layout: bool,
    ) -> (Type, Layout) {
        let files = self.files;
        if let Some(&(dfi, di)) = self.decls.get(name) {
            let decl = &files[dfi].decls[di];
            if !matches!(decl.kind, DeclKind::Type { .. }) {
                self.hard(fi, pos, format!("{name} is not a type"));
                return (Type::Invalid, INVALID_LAYOUT);
            }
            let ty = Type::named(self.path, name);
            if !need_layout {
                return (ty, INVALID_LAYOUT);
            }
            let layout = match self.resolve_type_decl(name) {
                Some(layout) => layout,
                None => {
                    if self.cycles.insert(name.to_owned()) {
                        self.hard(dfi, decl.name.pos, format!("invalid recursive type {name}"));
                    }
                    INVALID_LAYOUT
                }
            };
            return (ty, layout);
        }

        if let Some(kind) = BasicKind::from_name(name) {
            let ty = Type::Basic(kind);
            let layout = self.layout_of(&ty);
            return (ty, layout);
        }

        self.hard(fi, pos, format!("undefined: {name}"));
        (Type::Invalid, INVALID_LAYOUT)
    }

    /// Layout of types whose size depends only on the target.
    fn layout_of(&self, ty: &Type) -> Layout {
        let sizes = &self.conf.sizes;
        match ty {
            Type::Basic(kind) => {
                let size = sizes.basic_size(*kind);
                (size, sizes.align_of_scalar(size))
            }
            Type::Pointer(_) | Type::Foreign(_) => {
                let size = sizes.pointer_size();
                (size, sizes.align_of_scalar(size))
            }
            Type::Slice(_) => (
                sizes.slice_size(),
                sizes.align_of_scalar(sizes.pointer_size()),
            ),
            Type::Named { .. } | Type::Struct(_) | Type::Invalid => INVALID_LAYOUT,
        }
    }

    /// Imported layouts were computed for whatever target produced them, so
    /// target-dependent ones are recomputed; aggregates keep the recorded
    /// values.
    fn imported_layout(&self, underlying: &Type, recorded: Layout) -> Layout {
        match underlying {
            Type::Basic(_) | Type::Pointer(_) | Type::Foreign(_) | Type::Slice(_) => {
                self.layout_of(underlying)
            }
            Type::Named { .. } | Type::Struct(_) | Type::Invalid => recorded,
        }
    }

    /// Follow named types to a basic kind, if they end in one.
    pub(super) fn basic_kind_of(&mut self, ty: &Type) -> Option<BasicKind> {
        let mut current = ty.clone();
        for _ in 0..MAX_NAMED_DEPTH {
            match current {
                Type::Basic(kind) => return Some(kind),
                Type::Named { package, name } => {
                    current = if package == self.path {
                        self.resolve_type_decl(&name);
                        match self.types.get(&name) {
                            Some(Resolution::Done((underlying, _, _))) => underlying.clone(),
                            _ => return None,
                        }
                    } else {
                        let pkg = self.imported_package(&package)?;
                        match pkg.lookup(&name) {
                            Some(Object {
                                kind: ObjectKind::TypeName { underlying, .. },
                                ..
                            }) => underlying.clone(),
                            _ => return None,
                        }
                    };
                }
                _ => return None,
            }
        }
        None
    }
}
