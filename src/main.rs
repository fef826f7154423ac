use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use pindx::{
    archive::extract_dbf,
    dbf::DbfTable,
    record::{decode_changes, decode_full},
    Catalog, Client, Config, RecordKind, RegionTable,
};
use serde::Serialize;
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Fetch and decode the Russian Post postal-index (PIndx) dataset"
)]
struct Args {
    /// JSON config file; PINDX_* and PROXY env vars override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List catalog entries
    Catalog,
    /// Download the newest full snapshot and print its records
    Full {
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,
    },
    /// List update packages, optionally downloading their changes
    Packages {
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,
        #[arg(long)]
        fetch: bool,
    },
    /// Save the newest full archive (or its dbf table) to a file
    SaveFull {
        path: PathBuf,
        #[arg(long)]
        dbf: bool,
        #[arg(long, value_parser = parse_date)]
        since: Option<NaiveDate>,
        #[arg(long, default_value = "644", value_parser = parse_mode)]
        mode: u32,
    },
    /// Save one update package (or its dbf table) to a file
    SavePackage {
        #[arg(long, value_parser = parse_date)]
        date: NaiveDate,
        path: PathBuf,
        #[arg(long)]
        dbf: bool,
        #[arg(long, default_value = "644", value_parser = parse_mode)]
        mode: u32,
    },
    /// Decode a local zip or dbf file
    Decode {
        path: PathBuf,
        #[arg(long, value_enum)]
        kind: Option<Kind>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Full,
    Change,
}

impl From<Kind> for RecordKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Full => RecordKind::Full,
            Kind::Change => RecordKind::Change,
        }
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|e| format!("{s:?}: {e} (use YYYY-MM-DD)"))
}

fn parse_mode(s: &str) -> Result<u32, String> {
    u32::from_str_radix(s, 8).map_err(|e| format!("{s:?} is not an octal mode: {e}"))
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(io::stderr)
        .init();

    // ─── 2) configure ────────────────────────────────────────────────
    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => Config::from_env().context("reading config from environment")?,
    };

    if let Command::Decode { path, kind } = &args.command {
        return decode_local(&cfg, path, kind.map(RecordKind::from));
    }

    let client = Client::new(&cfg).context("building client")?;

    // ─── 3) catalog ──────────────────────────────────────────────────
    let catalog = client.refresh_catalog().context("refreshing catalog")?;
    info!(entries = catalog.len(), last = ?catalog.last_modified(), "catalog");

    // ─── 4) run command ──────────────────────────────────────────────
    match args.command {
        Command::Catalog => print_lines(catalog.entries()),

        Command::Full { since } => match client.fetch_full_snapshot(&catalog, since)? {
            None => {
                info!("no update");
                Ok(())
            }
            Some(snapshot) => {
                if snapshot.missing_member {
                    warn!(date = %snapshot.date, "full archive held no PIndx table");
                }
                info!(date = %snapshot.date, records = snapshot.records.len(), "new watermark");
                print_lines(&snapshot.records)
            }
        },

        Command::Packages { since, fetch } => {
            let mut packages = match since {
                Some(d) => catalog.packages_since(d),
                None => catalog.all_packages(),
            };
            if fetch {
                for package in &mut packages {
                    let watermark = client
                        .fetch_change_package(package)
                        .with_context(|| format!("package {}", package.date))?;
                    info!(date = %package.date, ?watermark, changes = package.changes.len(), "package");
                }
            }
            print_lines(&packages)
        }

        Command::SaveFull {
            path,
            dbf,
            since,
            mode,
        } => {
            let saved = if dbf {
                client.save_full_dbf(&catalog, &path, mode, since)?
            } else {
                client.save_full_zip(&catalog, &path, mode, since)?
            };
            match saved {
                Some(date) => info!(%date, path = %path.display(), "saved full snapshot"),
                None => info!("no update; nothing written"),
            }
            Ok(())
        }

        Command::SavePackage {
            date,
            path,
            dbf,
            mode,
        } => {
            let Some(package) = find_package(&catalog, date) else {
                bail!("no catalog entry dated {date}");
            };
            if dbf {
                client.save_package_dbf(&package, &path, mode)?;
            } else {
                client.save_package_zip(&package, &path, mode)?;
            }
            info!(%date, path = %path.display(), "saved package");
            Ok(())
        }

        Command::Decode { .. } => unreachable!("handled before the catalog fetch"),
    }
}

fn find_package(catalog: &Catalog, date: NaiveDate) -> Option<pindx::UpdatePackage> {
    catalog.find(date).map(pindx::UpdatePackage::from)
}

/// Decode a zip or bare dbf from disk without touching the network.
fn decode_local(cfg: &Config, path: &Path, kind: Option<RecordKind>) -> Result<()> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let dbf = if name.to_ascii_lowercase().ends_with(".zip") {
        match extract_dbf(&bytes)? {
            Some(dbf) => dbf,
            None => bail!("{} has no PIndx/NPIndx dbf member", path.display()),
        }
    } else {
        bytes
    };

    let Some(kind) = kind.or_else(|| RecordKind::from_member_name(&name)) else {
        bail!("cannot tell the table kind from {name:?}; pass --kind");
    };

    let table = DbfTable::parse(&dbf, cfg.file_encoding()?)?;
    info!(fields = ?table.field_names(), "table");
    let regions = RegionTable::russia();
    match kind {
        RecordKind::Full => print_lines(&decode_full(table.rows(), &regions)?),
        RecordKind::Change => print_lines(&decode_changes(table.rows(), &regions)?),
    }
}

/// One JSON document per line on stdout.
fn print_lines<T: Serialize>(items: &[T]) -> Result<()> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
