use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "classpath-bridge")]
#[command(about = "Resolve Java classpath symbols for the projects of a workspace")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace file describing the projects and their classpath roots.
    #[arg(long, value_name = "FILE")]
    pub workspace: Option<PathBuf>,

    /// Project to query. Optional when the workspace has a single project.
    #[arg(short = 'p', long, value_name = "NAME")]
    pub project: Option<String>,

    #[arg(long, value_name = "MS")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Look up a type by qualified name.
    Type { name: String },
    /// Look up a package by qualified name.
    Package { name: String },
    /// Linkage name of a type, e.g. `java.util.Map$Entry`.
    BinaryName { name: String },
    /// Whether a type (or package, with --package) is deprecated.
    Deprecated {
        name: String,

        #[arg(long)]
        package: bool,
    },
    /// Which project of the workspace declares a symbol.
    Owner {
        name: String,

        #[arg(long)]
        package: bool,
    },
    /// Qualified names of all types with the given simple name.
    SimpleName { name: String },
    /// Packages under a prefix; all packages when omitted.
    Packages { prefix: Option<String> },
    /// Guest-language files under the project's source roots.
    GuestFiles,
    /// Builds the project's index and reports its size.
    Stats,
}
