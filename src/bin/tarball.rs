use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use tarball::{ArchiveRequest, Report};

fn parse_octal(value: &str) -> Result<u32, String> {
    u32::from_str_radix(value.trim_start_matches("0o"), 8)
        .map_err(|e| format!("not an octal number: {e}"))
}

/// tarball
#[derive(Debug, Parser)]
#[clap(name = "tarball", version)]
pub struct App {
    #[clap(subcommand)]
    cmd: Command,
}

/// Options shared by listing and extraction
#[derive(Debug, Args)]
struct Selection {
    /// the archive, plain or gzip-compressed
    source: PathBuf,
    /// glob of members to leave out (repeatable)
    #[clap(long)]
    exclude: Vec<String>,
    /// glob of members to select (repeatable, default: everything)
    #[clap(long = "extract")]
    extract_list: Vec<String>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Lists the members of an archive
    List {
        #[clap(flatten)]
        selection: Selection,
        /// print only the selected members and their parent directories
        #[clap(long)]
        filtered: bool,
    },
    /// Extracts an archive into a directory
    Extract {
        #[clap(flatten)]
        selection: Selection,
        /// the directory to extract into (created if missing)
        destination: PathBuf,
        #[clap(long)]
        owner: Option<String>,
        #[clap(long)]
        group: Option<String>,
        /// octal mode for everything created, replacing the archive's modes
        #[clap(long, value_parser = parse_octal)]
        mode: Option<u32>,
        /// octal umask (default: the current one)
        #[clap(long, value_parser = parse_octal)]
        umask: Option<u32>,
        /// leave existing paths alone
        #[clap(long)]
        no_overwrite: bool,
        #[clap(long, default_value_t = 0)]
        strip_components: usize,
        /// apply the uid/gid stored in the archive (default when running as root)
        #[clap(long, conflicts_with = "no_same_owner")]
        same_owner: bool,
        #[clap(long)]
        no_same_owner: bool,
    },
}

fn request(selection: Selection, destination: PathBuf) -> ArchiveRequest {
    ArchiveRequest::new(selection.source, destination)
        .exclude(selection.exclude)
        .extract_list(selection.extract_list)
}

fn print_extracted(report: &Report) {
    for path in report.created.all() {
        println!("{}", path.display());
    }
    println!("{}", if report.updated { "updated" } else { "unchanged" });
}

fn main() -> Result<()> {
    env_logger::init();

    let args = App::parse();

    match args.cmd {
        Command::List {
            selection,
            filtered,
        } => {
            let source = selection.source.clone();
            let report = tarball::list(&request(selection, PathBuf::new()))
                .with_context(|| format!("Listing {}", source.display()))?;
            let names = if filtered {
                &report.filtered
            } else {
                &report.all
            };
            for name in names {
                println!("{name}");
            }
        }
        Command::Extract {
            selection,
            destination,
            owner,
            group,
            mode,
            umask,
            no_overwrite,
            strip_components,
            same_owner,
            no_same_owner,
        } => {
            let source = selection.source.clone();
            let mut req = request(selection, destination)
                .overwrite(!no_overwrite)
                .strip_components(strip_components);
            if let Some(owner) = owner {
                req = req.owner(owner);
            }
            if let Some(group) = group {
                req = req.group(group);
            }
            if let Some(mode) = mode {
                req = req.mode(mode);
            }
            if let Some(umask) = umask {
                req = req.umask(umask);
            }
            if same_owner {
                req = req.same_owner(true);
            } else if no_same_owner {
                req = req.same_owner(false);
            }

            let report = tarball::extract(&req).with_context(|| {
                format!(
                    "Extracting {} into {}",
                    source.display(),
                    req.destination.display()
                )
            })?;
            print_extracted(&report);
        }
    }
    Ok(())
}
