use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slidecast")]
#[command(author, version, about)]
#[command(long_about = "Serve a markdown slide deck to a room full of browsers.\n\n\
    The presenter drives; every audience browser follows along, and can\n\
    wander off and jump back at any time.\n\n\
    Examples:\n  \
    slidecast slides.md                Serve on http://127.0.0.1:5001\n  \
    slidecast slides.md --watch        Reload open browsers when the file changes\n  \
    slidecast slides.md --share        Also publish a public URL through pinggy.io")]
#[command(propagate_version = true)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    /// Markdown file to present
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub serve: ServeArgs,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(clap::Args, Clone, Debug, Default)]
pub struct ServeArgs {
    /// Port to listen on
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub host: Option<String>,

    /// Color theme (light, dark)
    #[arg(long)]
    pub theme: Option<String>,

    /// Reload viewers when the slides file changes
    #[arg(short, long)]
    pub watch: bool,

    /// Animate click reveals instead of toggling them
    #[arg(long)]
    pub motion: bool,

    /// Publish a public URL through an SSH tunnel
    #[arg(long)]
    pub share: bool,

    /// Pinggy Pro token for a persistent public URL (implies --share)
    #[arg(long, value_name = "TOKEN")]
    pub share_token: Option<String>,

    /// Let any viewer drive shared navigation without the presenter token
    #[arg(long)]
    pub open_navigation: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// View and modify configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Target shell
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Display current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key (e.g. defaults.theme, defaults.port, server.open_navigation)
        key: String,

        /// Value to set
        value: String,
    },
}

#[derive(Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        match self.command {
            Some(Commands::Config { command }) => crate::commands::config::run(command),
            Some(Commands::Completion { shell }) => {
                crate::commands::completion::run(shell);
                Ok(())
            }
            Some(Commands::Version) => {
                crate::banner::print_banner_with_version();
                Ok(())
            }
            None => {
                if let Some(file) = self.file {
                    if !file.exists() {
                        anyhow::bail!("File not found: {}", file.display());
                    }
                    let runtime = tokio::runtime::Builder::new_multi_thread()
                        .enable_all()
                        .build()?;
                    runtime.block_on(crate::commands::serve::run(file, self.serve, self.quiet))
                } else {
                    use clap::CommandFactory;
                    let mut cmd = Self::command();
                    cmd.print_help()?;
                    println!();
                    Ok(())
                }
            }
        }
    }
}
