use anyhow::{Context, Result};
use clap::Parser;
use classpath_bridge::cache::{ClasspathIndexCache, IndexCacheStats};
use classpath_bridge::cli::{Cli, Commands};
use classpath_bridge::config::{BridgeConfig, LOG_ENV, load_workspace, resolve_workspace_path};
use classpath_bridge::executor::SymbolQueryExecutor;
use classpath_bridge::index::{ArchiveIndexBuilder, SymbolHandle, SymbolLocation};
use classpath_bridge::project::{
    OpenProjectRegistry, ProjectId, Workspace, guest_files, sole_open_project,
};
use classpath_bridge::resolver::ProjectResolver;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();
    let cli = parse_cli()?;

    let config = BridgeConfig::resolve(cli.timeout_ms)?;
    let workspace_path = resolve_workspace_path(cli.workspace.as_deref())?;
    let workspace = Arc::new(load_workspace(&workspace_path)?);

    let indexes = Arc::new(ClasspathIndexCache::new(
        workspace.clone(),
        Arc::new(ArchiveIndexBuilder::new(config.parallel_index)),
        &config,
    ));
    let executor = SymbolQueryExecutor::new(indexes);

    match cli.command.clone() {
        Commands::Type { name } => {
            let project = selected_project(&cli, &workspace)?;
            let name = normalize_class_name(&name);
            let symbol = executor.find_type(&project, &name)?;
            let location = match &symbol {
                Some(handle) => executor.location_of(&project, handle)?,
                None => None,
            };
            print_json(&TypeOutput {
                project,
                name,
                symbol,
                location,
            })?;
        }
        Commands::Package { name } => {
            let project = selected_project(&cli, &workspace)?;
            let symbol = executor.find_package(&project, &name)?;
            print_json(&LookupOutput {
                project,
                name,
                value: symbol,
            })?;
        }
        Commands::BinaryName { name } => {
            let project = selected_project(&cli, &workspace)?;
            let name = normalize_class_name(&name);
            let binary_name = executor.binary_name(&project, &name)?;
            print_json(&LookupOutput {
                project,
                name,
                value: binary_name,
            })?;
        }
        Commands::Deprecated { name, package } => {
            let symbol = handle_for(&name, package);
            let candidates = candidates(&cli, &workspace);
            let resolver = ProjectResolver::new(executor.clone());
            let deprecated = resolver.is_deprecated_in_owner(&symbol, &candidates)?;
            print_json(&DeprecatedOutput { symbol, deprecated })?;
        }
        Commands::Owner { name, package } => {
            let symbol = handle_for(&name, package);
            let resolver = ProjectResolver::new(executor.clone());
            let owner = resolver.resolve_in_registry(&symbol, workspace.as_ref())?;
            print_json(&OwnerOutput { symbol, owner })?;
        }
        Commands::SimpleName { name } => {
            let project = selected_project(&cli, &workspace)?;
            let matches = executor.types_with_simple_name(&project, name.trim())?;
            print_json(&LookupOutput {
                project,
                name,
                value: matches,
            })?;
        }
        Commands::Packages { prefix } => {
            let project = selected_project(&cli, &workspace)?;
            let prefix = prefix.unwrap_or_default();
            let packages = executor.packages_with_prefix(&project, &prefix)?;
            print_json(&LookupOutput {
                project,
                name: prefix,
                value: packages,
            })?;
        }
        Commands::GuestFiles => {
            let project = selected_project(&cli, &workspace)?;
            let files = guest_files(workspace.as_ref(), &project, &config.guest_extensions)
                .with_context(|| format!("Failed to list guest files of {project}"))?;
            let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path().to_path_buf()).collect();
            print_json(&LookupOutput {
                project,
                name: config.guest_extensions.join(","),
                value: paths,
            })?;
        }
        Commands::Stats => {
            let project = selected_project(&cli, &workspace)?;
            let start = Instant::now();
            let indexed = executor.indexes().get_or_build(&project)?;
            print_json(&StatsOutput {
                workspace: workspace_path.to_string_lossy().to_string(),
                fingerprint: indexed.fingerprint().to_string(),
                search_roots: indexed.config().search_path().len(),
                source_roots: indexed.config().source_roots().len(),
                types: indexed.index().type_count(),
                packages: indexed.index().packages_with_prefix("").len(),
                duration_ms: start.elapsed().as_millis() as u64,
                cache: executor.indexes().stats(),
                project,
            })?;
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_cli() -> Result<Cli> {
    let args: Vec<String> = std::env::args().collect();
    Ok(Cli::parse_from(rewrite_args_for_implicit_type(args)))
}

/// `classpath-bridge java.util.List` is shorthand for `classpath-bridge type java.util.List`.
fn rewrite_args_for_implicit_type(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let subcommands = [
        "type",
        "package",
        "binary-name",
        "deprecated",
        "owner",
        "simple-name",
        "packages",
        "guest-files",
        "stats",
        "help",
    ];
    let valued = ["--workspace", "--project", "-p", "--timeout-ms"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--" {
            idx += 1;
            break;
        }

        if valued.contains(&a) {
            idx += 2;
            continue;
        }

        if a.starts_with('-') {
            idx += 1;
            continue;
        }

        break;
    }

    if idx < args.len() {
        let token = args[idx].as_str();
        if !subcommands.contains(&token) {
            args.insert(idx, "type".to_string());
        }
    }

    args
}

fn selected_project(cli: &Cli, workspace: &Workspace) -> Result<ProjectId> {
    if let Some(name) = cli.project.as_deref() {
        let project = ProjectId::new(name);
        anyhow::ensure!(
            workspace.descriptor(&project).is_some(),
            "Project {name:?} is not defined in the workspace"
        );
        return Ok(project);
    }

    sole_open_project(workspace).context(
        "The workspace defines more than one project (or none); use --project to pick one",
    )
}

fn candidates(cli: &Cli, workspace: &Workspace) -> Vec<ProjectId> {
    match cli.project.as_deref() {
        Some(name) => vec![ProjectId::new(name)],
        None => workspace.open_projects(),
    }
}

fn handle_for(raw: &str, package: bool) -> SymbolHandle {
    let name = normalize_class_name(raw);
    if package {
        SymbolHandle::of_package(name)
    } else {
        SymbolHandle::of_type(name)
    }
}

fn normalize_class_name(raw: &str) -> String {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("import ") {
        s = rest.trim();
    }
    if let Some(rest) = s.strip_prefix("static ") {
        s = rest.trim();
    }
    if s.ends_with(';') {
        s = s.trim_end_matches(';').trim();
    }
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Serialize)]
struct TypeOutput {
    project: ProjectId,
    name: String,
    symbol: Option<SymbolHandle>,
    location: Option<SymbolLocation>,
}

#[derive(Debug, Serialize)]
struct LookupOutput<T> {
    project: ProjectId,
    name: String,
    value: T,
}

#[derive(Debug, Serialize)]
struct DeprecatedOutput {
    symbol: SymbolHandle,
    deprecated: bool,
}

#[derive(Debug, Serialize)]
struct OwnerOutput {
    symbol: SymbolHandle,
    owner: Option<ProjectId>,
}

#[derive(Debug, Serialize)]
struct StatsOutput {
    workspace: String,
    project: ProjectId,
    fingerprint: String,
    search_roots: usize,
    source_roots: usize,
    types: usize,
    packages: usize,
    duration_ms: u64,
    cache: IndexCacheStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_class_name_strips_import_whitespace_and_semicolon() {
        let raw = "import java.util.Map. Entry ;";
        assert_eq!(normalize_class_name(raw), "java.util.Map.Entry");
        assert_eq!(
            normalize_class_name("import static java.util.Collections;"),
            "java.util.Collections"
        );
    }

    #[test]
    fn rewrite_args_for_implicit_type_skips_global_option_values() {
        let args = vec![
            "classpath-bridge".to_string(),
            "--workspace".to_string(),
            "/tmp/ws.json".to_string(),
            "-p".to_string(),
            "app".to_string(),
            "java.util.Map.Entry".to_string(),
        ];

        let rewritten = rewrite_args_for_implicit_type(args);
        assert_eq!(rewritten[1], "--workspace");
        assert_eq!(rewritten[2], "/tmp/ws.json");
        assert_eq!(rewritten[3], "-p");
        assert_eq!(rewritten[4], "app");
        assert_eq!(rewritten[5], "type");
        assert_eq!(rewritten[6], "java.util.Map.Entry");
    }

    #[test]
    fn explicit_subcommands_are_left_alone() {
        let args = vec![
            "classpath-bridge".to_string(),
            "--timeout-ms".to_string(),
            "500".to_string(),
            "binary-name".to_string(),
            "java.util.Map.Entry".to_string(),
        ];
        assert_eq!(rewrite_args_for_implicit_type(args.clone()), args);
    }
}
