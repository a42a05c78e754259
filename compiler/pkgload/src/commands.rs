//! Command handlers for the `pkgload` CLI.
//!
//! Handlers return errors instead of exiting so they can be tested; the
//! binary decides on the exit status.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use pkgload_export::write_export;
use pkgload_ir::{BuildContext, ExportError, ImportError, Package};
use thiserror::Error;

use crate::workspace::{SetupError, Workspace};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("{0}")]
    Usage(String),
    #[error("{failed} of {total} packages failed to import")]
    Failed { failed: usize, total: usize },
}

/// Options shared by all commands.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandOptions {
    /// Directory imports are made from; defaults to the current directory.
    pub dir: Option<PathBuf>,
    pub arch: Option<String>,
    pub compiler: Option<String>,
    pub output: Option<PathBuf>,
    /// Arguments that are not options, in order.
    pub positional: Vec<String>,
}

impl CommandOptions {
    fn src_dir(&self) -> &Path {
        self.dir.as_deref().unwrap_or(Path::new("."))
    }

    fn context(&self) -> BuildContext {
        let mut ctxt = BuildContext::from_env();
        if let Some(arch) = &self.arch {
            ctxt.arch.clone_from(arch);
        }
        if let Some(compiler) = &self.compiler {
            ctxt.compiler.clone_from(compiler);
        }
        ctxt
    }
}

/// Parse command arguments (everything after the command name).
///
/// Valued options take their value either inline (`--dir=src`) or as the
/// next argument (`--dir src`, `-o out.pkx`).
pub fn parse_options(args: &[String]) -> Result<CommandOptions, CommandError> {
    let mut options = CommandOptions::default();
    let mut args = args.iter();
    while let Some(arg) = args.next() {
        if !arg.starts_with('-') {
            options.positional.push(arg.clone());
            continue;
        }
        let (name, inline) = match arg.split_once('=') {
            Some((name, value)) => (name, Some(value.to_owned())),
            None => (arg.as_str(), None),
        };
        if !matches!(name, "--dir" | "--arch" | "--compiler" | "-o" | "--output") {
            return Err(CommandError::Usage(format!("unknown option '{arg}'")));
        }
        let Some(value) = inline.or_else(|| args.next().cloned()) else {
            return Err(CommandError::Usage(format!("{name} needs a value")));
        };
        match name {
            "--dir" => options.dir = Some(PathBuf::from(value)),
            "--arch" => options.arch = Some(value),
            "--compiler" => options.compiler = Some(value),
            _ => options.output = Some(PathBuf::from(value)),
        }
    }
    Ok(options)
}

fn open_workspace(manifest: &str, options: &CommandOptions) -> Result<Workspace, CommandError> {
    Ok(Workspace::load_with(options.context(), Path::new(manifest))?)
}

/// Import every path in turn, printing one line per package.
///
/// Keeps going after a failure so all broken packages are listed.
pub fn check_packages(
    manifest: &str,
    paths: &[String],
    options: &CommandOptions,
) -> Result<(), CommandError> {
    let workspace = open_workspace(manifest, options)?;
    let mut failed = 0;
    for path in paths {
        match workspace.import_from(path, options.src_dir()) {
            Ok(pkg) => println!("ok   {path} ({} declarations)", pkg.len()),
            Err(err) => {
                failed += 1;
                println!("FAIL {path}");
                eprintln!("error: {err}");
            }
        }
    }
    if failed > 0 {
        return Err(CommandError::Failed {
            failed,
            total: paths.len(),
        });
    }
    Ok(())
}

/// Render a package's exported declarations.
pub fn describe(pkg: &Package) -> String {
    let mut out = format!("package {} // {}\n", pkg.name(), pkg.path());
    for import in pkg.imports() {
        let _ = writeln!(out, "import {import:?}");
    }
    let mut objects: Vec<_> = pkg.exported().collect();
    objects.sort_by(|a, b| a.name.cmp(&b.name));
    for object in objects {
        let _ = writeln!(out, "{}", object.describe());
    }
    out
}

/// Print a package's exported declarations. A package that failed with only
/// soft errors is still described, after the error.
pub fn describe_package(
    manifest: &str,
    path: &str,
    options: &CommandOptions,
) -> Result<(), CommandError> {
    let workspace = open_workspace(manifest, options)?;
    match workspace.import_from(path, options.src_dir()) {
        Ok(pkg) => {
            print!("{}", describe(&pkg));
            Ok(())
        }
        Err(err) => {
            if let Some(partial) = err.partial_package() {
                eprintln!("warning: {err}");
                print!("{}", describe(partial));
                return Ok(());
            }
            Err(err.into())
        }
    }
}

/// Print the manifest's records, sorted by import path.
pub fn list_packages(manifest: &str, options: &CommandOptions) -> Result<(), CommandError> {
    let workspace = open_workspace(manifest, options)?;
    for info in workspace.index().infos() {
        let origin = if info.standard { "std" } else { "src" };
        println!(
            "{:<40} {origin} {:>3} files  {}",
            info.import_path,
            info.all_files().count(),
            info.dir
        );
    }
    Ok(())
}

/// Import `path` and write its export data to the `-o` file.
pub fn export_package(
    manifest: &str,
    path: &str,
    options: &CommandOptions,
) -> Result<(), CommandError> {
    let Some(output) = &options.output else {
        return Err(CommandError::Usage("export needs -o <file>".into()));
    };
    let workspace = open_workspace(manifest, options)?;
    let pkg = workspace.import_from(path, options.src_dir())?;
    write_export(output, &pkg)?;
    println!("wrote {} ({} declarations)", output.display(), pkg.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use pkgload_ir::{BasicKind, ConstValue, Object, ObjectKind, Type};
    use pretty_assertions::assert_eq;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn options_and_positionals() {
        let options = parse_options(&args(&[
            "deps.json",
            "--dir=/work/app",
            "example.com/app",
            "--arch",
            "x86",
            "-o",
            "app.pkx",
            "--compiler=std",
        ]))
        .unwrap();
        assert_eq!(
            options,
            CommandOptions {
                dir: Some(PathBuf::from("/work/app")),
                arch: Some("x86".into()),
                compiler: Some("std".into()),
                output: Some(PathBuf::from("app.pkx")),
                positional: args(&["deps.json", "example.com/app"]),
            }
        );
        assert_eq!(options.context().sizes().word_size, 4);
    }

    #[test]
    fn bad_options() {
        let err = parse_options(&args(&["-o"])).unwrap_err();
        assert_eq!(err.to_string(), "-o needs a value");
        let err = parse_options(&args(&["--fast"])).unwrap_err();
        assert_eq!(err.to_string(), "unknown option '--fast'");
    }

    #[test]
    fn describe_lists_exported_objects_sorted() {
        let mut pkg = Package::new("example.com/geom", "geom");
        let int = Type::Basic(BasicKind::Int);
        for (name, exported) in [("Zero", true), ("hidden", false), ("Max", true)] {
            pkg.insert(Object::new(
                name,
                exported,
                ObjectKind::Const {
                    ty: int.clone(),
                    value: ConstValue::Int(1),
                },
            ))
            .unwrap();
        }
        pkg.add_import("std/fmt");
        let text = describe(&pkg);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "package geom // example.com/geom");
        assert_eq!(lines[1], "import \"std/fmt\"");
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("Max"));
        assert!(lines[3].contains("Zero"));
    }
}
