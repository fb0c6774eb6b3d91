use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[cfg(target_os = "linux")]
mod ioctl;

#[derive(Parser, Debug)]
#[command(name = "subvolist", version, about = "List btrfs subvolumes with their full paths")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List every subvolume of the filesystem containing PATH
    List {
        /// Any path inside a mounted btrfs filesystem
        path: PathBuf,
        /// Emit the listing as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::List { path, json } => list(path, json),
    }
}

#[cfg(target_os = "linux")]
fn list(path: PathBuf, json: bool) -> Result<()> {
    use anyhow::Context;

    let file = std::fs::File::open(&path)
        .with_context(|| format!("cannot open {}", path.display()))?;

    let mut enumerator = ioctl::TreeSearchEnumerator::new(&file);
    let mut lookup = ioctl::InoLookup::new(&file);
    let entries = subvolist_core::list_subvols(&mut enumerator, &mut lookup)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            println!(
                "ID {} top level {} path {}",
                entry.subvol_id, entry.top_level_id, entry.path
            );
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn list(_path: PathBuf, _json: bool) -> Result<()> {
    anyhow::bail!("subvolume listing uses the btrfs ioctl interface and is Linux-only")
}
