use anyhow::{Context, Result};
use clap::Parser;
use class_loader::catalog::ClassMap;
use class_loader::cli::{Cli, Commands, OutputFormat};
use class_loader::config::build_resolver;
use class_loader::identifier::normalize_class_name;
use class_loader::runtime::{DefinedClass, Runtime};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<()> {
    class_loader::logging::init();
    let cli = parse_cli()?;

    match cli.command.clone() {
        Commands::Find {
            class_name,
            format,
            output,
        } => {
            let resolver = build_resolver(&cli)?;
            let class_name = normalize_class_name(&class_name);
            let result = find_class(&resolver, &class_name)?;
            write_output(&render_find(&result, format)?, output.as_deref())?;
        }
        Commands::Load {
            class_names,
            format,
        } => {
            let resolver = Arc::new(build_resolver(&cli)?);
            let result = load_classes(&resolver, &class_names)?;
            write_output(&render_load(&result, format)?, None)?;
        }
        Commands::Paths => {
            let resolver = build_resolver(&cli)?;
            let paths = PathsResult {
                extension: resolver.extension().to_string(),
                class_dirs: resolver
                    .class_dirs()
                    .iter()
                    .map(|d| d.to_string_lossy().to_string())
                    .collect(),
            };
            println!("{}", serde_json::to_string_pretty(&paths)?);
        }
        Commands::Catalog { output } => {
            let resolver = build_resolver(&cli)?;
            let start = Instant::now();
            let map = ClassMap::from_resolver(&resolver)?;
            match output {
                Some(path) => {
                    map.save(&path)?;
                    let summary = CatalogResult {
                        output: path.to_string_lossy().to_string(),
                        classes: map.len(),
                        duration_ms: start.elapsed().as_millis() as u64,
                    };
                    println!("{}", serde_json::to_string_pretty(&summary)?);
                }
                None => println!("{}", serde_json::to_string_pretty(&map)?),
            }
        }
    }

    Ok(())
}

fn parse_cli() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    Ok(Cli::parse_from(rewrite_args_for_implicit_find(args)))
}

/// `class-loader --dir src App\Kernel` is shorthand for `... find App\Kernel`.
fn rewrite_args_for_implicit_find(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = ["find", "load", "paths", "catalog", "help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if a == "--dir" || a == "--ext" {
            idx += 2;
            continue;
        }

        if a.starts_with("--dir=") || a.starts_with("--ext=") {
            idx += 1;
            continue;
        }

        break;
    }

    // Any other flag belongs to a subcommand (`-f`, `-o`), so `find` has to
    // come before it.
    if idx < args.len() {
        let token = args[idx].as_str();
        let top_level = ["-h", "--help"];
        if !subcommands.contains(&token) && !top_level.contains(&token) {
            args.insert(idx, "find".to_string());
        }
    }

    args
}

#[derive(Debug, Serialize)]
struct FindResult {
    class_name: String,
    path: String,
    searched: Vec<String>,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct LoadResult {
    requested: Vec<String>,
    classes: Vec<DefinedClass>,
    duration_ms: u64,
}

#[derive(Debug, Serialize)]
struct PathsResult {
    extension: String,
    class_dirs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CatalogResult {
    output: String,
    classes: usize,
    duration_ms: u64,
}

fn find_class(
    resolver: &class_loader::DirectoryClassResolver,
    class_name: &str,
) -> Result<FindResult> {
    let start = Instant::now();
    let candidates = resolver.candidate_paths(class_name);
    let path = resolver.find_class_file(class_name).with_context(|| {
        format!(
            "Class {class_name} not found (searched {} dirs)",
            resolver.class_dirs().len()
        )
    })?;

    let searched = candidates
        .iter()
        .take_while(|c| **c != path)
        .chain(std::iter::once(&path))
        .map(|p| p.to_string_lossy().to_string())
        .collect();

    Ok(FindResult {
        class_name: class_name.to_string(),
        path: path.to_string_lossy().to_string(),
        searched,
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn load_classes(
    resolver: &Arc<class_loader::DirectoryClassResolver>,
    class_names: &[String],
) -> Result<LoadResult> {
    let start = Instant::now();
    let mut runtime = Runtime::new();
    resolver.set_autoload_hook(&mut runtime, true);

    let mut requested = Vec::with_capacity(class_names.len());
    for raw in class_names {
        let class_name = normalize_class_name(raw);
        runtime
            .require_class(&class_name)
            .with_context(|| format!("Failed to load {class_name}"))?;
        requested.push(class_name);
    }

    Ok(LoadResult {
        requested,
        classes: runtime.classes().cloned().collect(),
        duration_ms: start.elapsed().as_millis() as u64,
    })
}

fn render_find(result: &FindResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("class_name: {}\n", result.class_name));
            out.push_str(&format!("path: {}\n", result.path));
            for p in &result.searched {
                out.push_str(&format!("- searched: {p}\n"));
            }
            out
        }
    })
}

fn render_load(result: &LoadResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("duration_ms: {}\n", result.duration_ms));
            for c in &result.classes {
                out.push_str(&format!(
                    "- {:?} {} ({})\n",
                    c.kind,
                    c.name,
                    c.path.display()
                ));
            }
            out
        }
    })
}

fn write_output(content: &str, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write output: {}", path.display()))?;
    } else {
        print!("{content}");
        if !content.ends_with('\n') {
            println!();
        }
    }

    Ok(())
}
