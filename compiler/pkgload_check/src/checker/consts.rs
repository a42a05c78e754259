//! Constant evaluation.

use pkgload_ir::{ensure_sufficient_stack, BasicKind, ConstValue, ObjectKind, Type};
use pkgload_syntax::ast::{DeclKind, Expr};
use pkgload_syntax::Pos;

use super::imports::Member;
use super::{PackageChecker, Resolution};

fn invalid() -> (Type, ConstValue) {
    (Type::Invalid, ConstValue::Unknown)
}

impl PackageChecker<'_, '_> {
    /// Resolve the constant `name`, or `None` if it is already being
    /// resolved further up the stack.
    pub(super) fn resolve_const(&mut self, name: &str) -> Option<(Type, ConstValue)> {
        ensure_sufficient_stack(|| self.resolve_const_inner(name))
    }

    fn resolve_const_inner(&mut self, name: &str) -> Option<(Type, ConstValue)> {
        match self.consts.get(name) {
            Some(Resolution::Done(resolved)) => return Some(resolved.clone()),
            Some(Resolution::InProgress) => return None,
            None => {}
        }
        let files = self.files;
        let Some(&(fi, di)) = self.decls.get(name) else {
            return Some(invalid());
        };
        let decl = &files[fi].decls[di];
        let DeclKind::Const { ty, value } = &decl.kind else {
            return Some(invalid());
        };

        self.consts.insert(name.to_owned(), Resolution::InProgress);
        let (value_ty, constant) = self.eval_const(fi, value);
        let resolved = match ty {
            Some(declared) => {
                let (declared, _) = self.resolve_type(fi, declared, false);
                self.convert_const(fi, value.pos(), &declared, value_ty, constant)
            }
            None => (value_ty, constant),
        };
        self.consts
            .insert(name.to_owned(), Resolution::Done(resolved.clone()));
        self.declare(
            decl,
            ObjectKind::Const {
                ty: resolved.0.clone(),
                value: resolved.1.clone(),
            },
        );
        Some(resolved)
    }

    fn eval_const(&mut self, fi: usize, expr: &Expr) -> (Type, ConstValue) {
        match expr {
            Expr::Int(v, _) => (Type::Basic(BasicKind::UntypedInt), ConstValue::Int(*v)),
            Expr::Float(v, _) => (Type::Basic(BasicKind::UntypedFloat), ConstValue::Float(*v)),
            Expr::Str(v, _) => (
                Type::Basic(BasicKind::UntypedString),
                ConstValue::Str(v.clone()),
            ),
            Expr::Bool(v, _) => (Type::Basic(BasicKind::UntypedBool), ConstValue::Bool(*v)),
            Expr::Name(ident) => {
                let files = self.files;
                let Some(&(dfi, di)) = self.decls.get(&ident.name) else {
                    self.hard(fi, ident.pos, format!("undefined: {}", ident.name));
                    return invalid();
                };
                let decl = &files[dfi].decls[di];
                if !matches!(decl.kind, DeclKind::Const { .. }) {
                    self.hard(fi, ident.pos, format!("{} is not a constant", ident.name));
                    return invalid();
                }
                match self.resolve_const(&ident.name) {
                    Some(resolved) => resolved,
                    None => {
                        if self.cycles.insert(ident.name.clone()) {
                            self.hard(
                                dfi,
                                decl.name.pos,
                                format!("initialization cycle for {}", ident.name),
                            );
                        }
                        invalid()
                    }
                }
            }
            Expr::Qualified(package, member) => match self.lookup_member(fi, package, member) {
                None => invalid(),
                Some(Member::Foreign) => (Type::Foreign(member.name.clone()), ConstValue::Unknown),
                Some(Member::Object(_, object)) => match object.kind {
                    ObjectKind::Const { ty, value } => (ty, value),
                    _ => {
                        self.hard(
                            fi,
                            member.pos,
                            format!("{}.{} is not a constant", package.name, member.name),
                        );
                        invalid()
                    }
                },
            },
        }
    }

    /// Give a constant its declared type, checking the value kind and the
    /// integer range on the current target.
    #[allow(clippy::cast_precision_loss)]
    fn convert_const(
        &mut self,
        fi: usize,
        pos: Pos,
        declared: &Type,
        value_ty: Type,
        value: ConstValue,
    ) -> (Type, ConstValue) {
        if declared.is_invalid() || value_ty.is_invalid() {
            return (declared.clone(), ConstValue::Unknown);
        }
        if matches!(declared, Type::Foreign(_)) || matches!(value_ty, Type::Foreign(_)) {
            return (declared.clone(), value);
        }
        let Some(target) = self.basic_kind_of(declared) else {
            self.hard(fi, pos, format!("invalid constant type {declared}"));
            return invalid();
        };

        let untyped = match &value_ty {
            Type::Basic(kind) if kind.is_untyped() => Some(*kind),
            _ => None,
        };
        let Some(source) = untyped else {
            // Typed constants only flow into their own type.
            if value_ty == *declared {
                return (value_ty, value);
            }
            self.hard(
                fi,
                pos,
                format!("cannot use constant of type {value_ty} as {declared} value"),
            );
            return (declared.clone(), ConstValue::Unknown);
        };

        let representable = match source {
            BasicKind::UntypedInt => target.is_integer() || target == BasicKind::Float,
            BasicKind::UntypedFloat => target == BasicKind::Float,
            BasicKind::UntypedString => target == BasicKind::String,
            BasicKind::UntypedBool => target == BasicKind::Bool,
            _ => false,
        };
        if !representable {
            self.hard(
                fi,
                pos,
                format!("cannot use {value} ({}) as {declared} value", source.name()),
            );
            return (declared.clone(), ConstValue::Unknown);
        }

        let value = match value {
            ConstValue::Int(v) if target == BasicKind::Float => ConstValue::Float(v as f64),
            ConstValue::Int(v) => {
                if let Some((lo, hi)) = self.conf.sizes.int_bounds(target) {
                    if !(lo..=hi).contains(&i128::from(v)) {
                        self.hard(fi, pos, format!("constant {v} overflows {declared}"));
                        return (declared.clone(), ConstValue::Unknown);
                    }
                }
                ConstValue::Int(v)
            }
            other => other,
        };
        (declared.clone(), value)
    }
}
