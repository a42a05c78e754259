//! Type-checked packages (symbol tables).
//!
//! A [`Package`] is built mutably by a checker and frozen behind an `Arc` once
//! it enters the [`PackageCache`](crate::PackageCache). Everything here is
//! serializable so precompiled packages can be written to and read from
//! export data.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

/// Import path of the built-in escape package.
pub const UNSAFE_PATH: &str = "unsafe";

/// Import path of the foreign-function pseudo package.
pub const FFI_PATH: &str = "ffi";

/// Basic (predeclared) types.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BasicKind {
    Bool,
    Byte,
    Int,
    Uint,
    Uintptr,
    Float,
    String,
    UntypedInt,
    UntypedFloat,
    UntypedString,
    UntypedBool,
}

impl BasicKind {
    /// Resolve a predeclared type name.
    pub fn from_name(name: &str) -> Option<BasicKind> {
        Some(match name {
            "bool" => BasicKind::Bool,
            "byte" => BasicKind::Byte,
            "int" => BasicKind::Int,
            "uint" => BasicKind::Uint,
            "uintptr" => BasicKind::Uintptr,
            "float" => BasicKind::Float,
            "string" => BasicKind::String,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::Byte => "byte",
            BasicKind::Int => "int",
            BasicKind::Uint => "uint",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float => "float",
            BasicKind::String => "string",
            BasicKind::UntypedInt => "untyped int",
            BasicKind::UntypedFloat => "untyped float",
            BasicKind::UntypedString => "untyped string",
            BasicKind::UntypedBool => "untyped bool",
        }
    }

    pub fn is_untyped(self) -> bool {
        matches!(
            self,
            BasicKind::UntypedInt
                | BasicKind::UntypedFloat
                | BasicKind::UntypedString
                | BasicKind::UntypedBool
        )
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Byte
                | BasicKind::Int
                | BasicKind::Uint
                | BasicKind::Uintptr
                | BasicKind::UntypedInt
        )
    }

    /// The type an untyped constant takes when no type is declared.
    pub fn default_type(self) -> BasicKind {
        match self {
            BasicKind::UntypedInt => BasicKind::Int,
            BasicKind::UntypedFloat => BasicKind::Float,
            BasicKind::UntypedString => BasicKind::String,
            BasicKind::UntypedBool => BasicKind::Bool,
            typed => typed,
        }
    }
}

/// A type as recorded in a symbol table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Basic(BasicKind),
    /// A declared type, identified by its package path and name.
    Named { package: String, name: String },
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Struct(Vec<Field>),
    /// An opaque member of the foreign-function pseudo package.
    Foreign(String),
    /// Placeholder after an error has already been reported.
    Invalid,
}

impl Type {
    pub fn named(package: impl Into<String>, name: impl Into<String>) -> Type {
        Type::Named {
            package: package.into(),
            name: name.into(),
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Basic(kind) => f.write_str(kind.name()),
            Type::Named { package, name } => write!(f, "{package}.{name}"),
            Type::Pointer(inner) => write!(f, "*{inner}"),
            Type::Slice(elem) => write!(f, "[]{elem}"),
            Type::Struct(fields) => {
                f.write_str("struct {")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", field.name, field.ty)?;
                }
                f.write_str(" }")
            }
            Type::Foreign(name) => write!(f, "{FFI_PATH}.{name}"),
            Type::Invalid => f.write_str("invalid type"),
        }
    }
}

/// Struct field or function parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: Type,
}

/// Function signature. Bodies are never part of a symbol table.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Field>,
    pub result: Option<Type>,
}

/// Value of a constant declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    /// Value of a foreign constant or of a constant whose initializer failed.
    Unknown,
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Int(v) => write!(f, "{v}"),
            ConstValue::Float(v) => write!(f, "{v:?}"),
            ConstValue::Str(v) => write!(f, "{v:?}"),
            ConstValue::Bool(v) => write!(f, "{v}"),
            ConstValue::Unknown => f.write_str("unknown"),
        }
    }
}

/// What a declared name denotes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ObjectKind {
    Const { ty: Type, value: ConstValue },
    /// A type declaration with its layout on the checking target.
    TypeName { underlying: Type, size: u64, align: u64 },
    Var { ty: Type },
    Func { sig: Signature },
    /// Built-in function of the escape package.
    Builtin,
}

/// A named declaration in a package scope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub name: String,
    pub exported: bool,
    pub kind: ObjectKind,
}

impl Object {
    pub fn new(name: impl Into<String>, exported: bool, kind: ObjectKind) -> Self {
        Object {
            name: name.into(),
            exported,
            kind,
        }
    }

    /// Short description used in diagnostics and listings.
    pub fn describe(&self) -> String {
        match &self.kind {
            ObjectKind::Const { ty, value } => format!("const {}: {ty} = {value}", self.name),
            ObjectKind::TypeName {
                underlying,
                size,
                align,
            } => format!(
                "type {} = {underlying} (size {size}, align {align})",
                self.name
            ),
            ObjectKind::Var { ty } => format!("var {}: {ty}", self.name),
            ObjectKind::Func { sig } => {
                let params = sig
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.ty))
                    .collect::<Vec<_>>()
                    .join(", ");
                match &sig.result {
                    Some(result) => format!("fn {}({params}) -> {result}", self.name),
                    None => format!("fn {}({params})", self.name),
                }
            }
            ObjectKind::Builtin => format!("builtin {}", self.name),
        }
    }
}

/// The type-checked symbol table of one package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Package {
    path: String,
    name: String,
    /// `BTreeMap` keeps listings and export data deterministic.
    scope: BTreeMap<String, Object>,
    /// Import paths in first-seen order.
    imports: Vec<String>,
    complete: bool,
}

impl Package {
    /// Create an empty, incomplete package.
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Package {
            path: path.into(),
            name: name.into(),
            scope: BTreeMap::new(),
            imports: Vec::new(),
            complete: false,
        }
    }

    /// The built-in escape package, shared by every importer.
    pub fn unsafe_package() -> Arc<Package> {
        static UNSAFE: OnceLock<Arc<Package>> = OnceLock::new();
        Arc::clone(UNSAFE.get_or_init(|| {
            let pointer = Object::new(
                "Pointer",
                true,
                ObjectKind::TypeName {
                    underlying: Type::Basic(BasicKind::Uintptr),
                    size: 0,
                    align: 0,
                },
            );
            let builtins = ["Sizeof", "Alignof", "Offsetof"]
                .into_iter()
                .map(|name| Object::new(name, true, ObjectKind::Builtin));
            let mut pkg = Package::new(UNSAFE_PATH, UNSAFE_PATH);
            pkg.scope = std::iter::once(pointer)
                .chain(builtins)
                .map(|object| (object.name.clone(), object))
                .collect();
            pkg.mark_complete();
            Arc::new(pkg)
        }))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Whether checking finished without a hard error.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    /// Look up a declaration by name.
    pub fn lookup(&self, name: &str) -> Option<&Object> {
        self.scope.get(name)
    }

    /// Insert a declaration. Returns the object already declared under that
    /// name, leaving the scope unchanged.
    pub fn insert(&mut self, object: Object) -> Result<(), Object> {
        if let Some(existing) = self.scope.get(&object.name) {
            return Err(existing.clone());
        }
        self.scope.insert(object.name.clone(), object);
        Ok(())
    }

    /// All declarations in name order.
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.scope.values()
    }

    /// Exported declarations in name order.
    pub fn exported(&self) -> impl Iterator<Item = &Object> {
        self.scope.values().filter(|o| o.exported)
    }

    pub fn len(&self) -> usize {
        self.scope.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scope.is_empty()
    }

    /// Record an imported path (duplicates are ignored).
    pub fn add_import(&mut self, path: &str) {
        if !self.imports.iter().any(|p| p == path) {
            self.imports.push(path.to_owned());
        }
    }

    pub fn imports(&self) -> &[String] {
        &self.imports
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "package {} ({:?})", self.name, self.path)
    }
}

/// Default package name for an import path: its last segment.
pub fn default_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
