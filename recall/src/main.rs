#![cfg_attr(not(target_os = "macos"), allow(dead_code))]

mod app;
mod core;
#[cfg(target_os = "macos")]
mod macos;
mod platform;
mod process;
mod storage;

use std::path::PathBuf;

use anyhow::Result;
use argh::FromArgs;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Recall - save and restore macOS window layouts
#[derive(FromArgs, Debug)]
struct Cli {
    /// directory holding saved layouts (default: $RECALL_LAYOUTS_DIR or the user data directory)
    #[argh(option)]
    layouts_dir: Option<PathBuf>,

    #[argh(subcommand)]
    command: Option<SubCommand>,
}

#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand)]
enum SubCommand {
    Save(SaveCmd),
    Restore(RestoreCmd),
    List(ListCmd),
    Delete(DeleteCmd),
    Path(PathCmd),
    Edit(EditCmd),
    Version(VersionCmd),
}

/// Capture the current window layout
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "save")]
struct SaveCmd {
    /// layout name
    #[argh(positional)]
    name: String,
    /// overwrite an existing layout with the same name
    #[argh(switch)]
    force: bool,
}

/// Move windows back to a saved layout
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "restore")]
struct RestoreCmd {
    /// layout name
    #[argh(positional)]
    name: String,
}

/// List saved layouts
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "list")]
struct ListCmd {}

/// Delete a saved layout
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "delete")]
struct DeleteCmd {
    /// layout name
    #[argh(positional)]
    name: String,
}

/// Print the file a layout is stored in
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "path")]
struct PathCmd {
    /// layout name
    #[argh(positional)]
    name: String,
}

/// Open a layout file in its default editor
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "edit")]
struct EditCmd {
    /// layout name
    #[argh(positional)]
    name: String,
}

/// Show version information
#[derive(FromArgs, Debug, PartialEq)]
#[argh(subcommand, name = "version")]
struct VersionCmd {}

fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    match cli.command {
        None => {
            // No subcommand - show help (simulate --help)
            let args: Vec<&str> = vec!["recall", "--help"];
            if let Err(e) = Cli::from_args(&args[..1], &args[1..]) {
                println!("{}", e.output);
            }
            Ok(())
        }
        Some(SubCommand::Version(_)) => {
            println!("recall {}", VERSION);
            Ok(())
        }
        Some(subcmd) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
            let config = crate::core::Config::load(cli.layouts_dir)?;
            run(subcmd, config)
        }
    }
}

#[cfg(target_os = "macos")]
fn run(subcmd: SubCommand, config: crate::core::Config) -> Result<()> {
    use std::sync::Arc;

    let app = app::App::new(Arc::new(platform::MacOSPlatform), &config)?;

    match subcmd {
        SubCommand::Save(cmd) => {
            let layout = app.save(&cmd.name, cmd.force)?;
            println!(
                "Saved '{}' ({} windows) to {}",
                layout.name(),
                layout.window_count(),
                app.store().locate(&layout).display()
            );
        }
        SubCommand::Restore(cmd) => {
            if !macos::is_trusted() {
                tracing::warn!("Accessibility permission not granted; windows cannot be moved");
            }
            let rt = tokio::runtime::Runtime::new()?;
            let summary = rt.block_on(app.restore(&cmd.name))?;
            match app::restore_message(&summary) {
                Some(message) => eprintln!("{}", message),
                None => println!("Restored {} windows", summary.total),
            }
        }
        SubCommand::List(_) => {
            let layouts = app.list();
            if layouts.is_empty() {
                println!("No saved layouts in {}", app.store().dir().display());
            }
            for layout in layouts {
                println!(
                    "{}  ({} windows, saved {})",
                    layout.name(),
                    layout.window_count(),
                    layout
                        .created_at()
                        .with_timezone(&chrono::Local)
                        .format("%Y-%m-%d %H:%M")
                );
            }
        }
        SubCommand::Delete(cmd) => {
            app.delete(&cmd.name)?;
            println!("Deleted '{}'", cmd.name);
        }
        SubCommand::Path(cmd) => {
            println!("{}", app.path(&cmd.name)?.display());
        }
        SubCommand::Edit(cmd) => {
            let path = app.path(&cmd.name)?;
            macos::open_path(&path)?;
        }
        SubCommand::Version(_) => println!("recall {}", VERSION),
    }
    Ok(())
}

#[cfg(not(target_os = "macos"))]
fn run(_subcmd: SubCommand, _config: crate::core::Config) -> Result<()> {
    anyhow::bail!("recall only supports macOS")
}
