//! `pkgload` command-line tool.

use pkgload::commands::{
    check_packages, describe_package, export_package, list_packages, parse_options, CommandError,
};

fn main() {
    pkgload::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return;
    }

    let options = match parse_options(&args[2..]) {
        Ok(options) => options,
        Err(err) => fail(&err),
    };

    let result = match args[1].as_str() {
        "check" => match options.positional.as_slice() {
            [manifest, paths @ ..] if !paths.is_empty() => {
                check_packages(manifest, paths, &options)
            }
            _ => usage_error("pkgload check <manifest.json> <import-path>... [options]"),
        },
        "describe" => match options.positional.as_slice() {
            [manifest, path] => describe_package(manifest, path, &options),
            _ => usage_error("pkgload describe <manifest.json> <import-path> [options]"),
        },
        "list" => match options.positional.as_slice() {
            [manifest] => list_packages(manifest, &options),
            _ => usage_error("pkgload list <manifest.json>"),
        },
        "export" => match options.positional.as_slice() {
            [manifest, path] => export_package(manifest, path, &options),
            _ => usage_error("pkgload export <manifest.json> <import-path> -o <file.pkx>"),
        },
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(err) = result {
        fail(&err);
    }
}

fn usage_error(usage: &str) -> Result<(), CommandError> {
    Err(CommandError::Usage(format!("Usage: {usage}")))
}

fn fail(err: &CommandError) -> ! {
    eprintln!("error: {err}");
    std::process::exit(1);
}

fn print_usage() {
    println!("pkgload - source import engine");
    println!();
    println!("Usage: pkgload <command> [options]");
    println!();
    println!("Commands:");
    println!("  check <manifest> <path>...   Import packages and report failures");
    println!("  describe <manifest> <path>   Print a package's exported declarations");
    println!("  list <manifest>              List the manifest's packages");
    println!("  export <manifest> <path>     Write a package's export data (needs -o)");
    println!();
    println!("Options:");
    println!("  --dir <dir>          Directory imports are made from (default: .)");
    println!("  --arch <arch>        Target architecture for sizes");
    println!("  --compiler <name>    Target compiler for sizes (default: std)");
    println!("  -o <file>            Output file for export");
    println!();
    println!("Environment:");
    println!("  PKGLOAD_LOG          Tracing directives, e.g. pkgload=debug");
    println!("  PKGLOAD_LOG_TREE     Show tracing output as an indented tree");
}
