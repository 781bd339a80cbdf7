use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "stdlib-tour")]
#[command(about = "Run child processes, serve and fetch HTTP, and reshape JSON from the command line")]
pub struct CliConfig {
    /// TOML 配置檔
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, short, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Run a program, feed it input and print everything it writes
    Run {
        /// Text written to the child's stdin
        #[arg(long, conflicts_with = "input_file")]
        input: Option<String>,

        /// File whose bytes are written to the child's stdin
        #[arg(long)]
        input_file: Option<PathBuf>,

        /// Kill the child after this many seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Interleave stdout and stderr in arrival order
        #[arg(long)]
        combined: bool,

        program: String,

        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Serve the demo router
    Serve {
        #[arg(long)]
        addr: Option<String>,

        /// Directory exposed under /files/
        #[arg(long)]
        files: Option<PathBuf>,
    },

    /// GET a URL and print status, content type and body
    Fetch { url: String },

    /// Re-indent JSON read from stdin
    Indent {
        #[arg(long, default_value = "")]
        prefix: String,

        #[arg(long, default_value = "\t")]
        indent: String,
    },

    /// Expand $VAR and ${VAR} from the environment
    Expand { template: String },
}
