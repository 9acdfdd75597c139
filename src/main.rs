//! Persist CLI - Command-line tool for decoding legacy GIS persistent streams.
//!
//! This is the main entry point for the Persist command-line application.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use memmap2::Mmap;
use rayon::prelude::*;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use persist::prelude::*;

/// Persist - legacy GIS persistent object stream decoder
#[derive(Parser)]
#[command(name = "persist")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode the root object of a stream and print it as JSON
    Dump {
        /// Input file holding the stream
        input: PathBuf,

        /// Byte offset of the root object (decimal or 0x-prefixed hex)
        #[arg(short, long, default_value = "0", value_parser = parse_offset)]
        offset: usize,

        /// Fail on any unexpected value instead of logging it
        #[arg(short, long, env = "PERSIST_STRICT")]
        strict: bool,

        /// Pretty-print the JSON output
        #[arg(short, long)]
        pretty: bool,
    },

    /// Decode every matching file under a directory
    Batch {
        /// Directory to scan recursively
        dir: PathBuf,

        /// File name filter (glob-style)
        #[arg(short, long, default_value = "*")]
        glob: String,

        /// Byte offset of the root object in each file
        #[arg(short, long, default_value = "0", value_parser = parse_offset)]
        offset: usize,

        /// Fail on any unexpected value instead of logging it
        #[arg(short, long, env = "PERSIST_STRICT")]
        strict: bool,
    },

    /// Convert a CLSID between its wire hex dump and canonical form
    Clsid {
        /// 32 hex digits in wire order, or a dashed canonical string
        value: String,
    },

    /// Convert a CIELAB color to RGB
    Lab {
        #[arg(allow_negative_numbers = true)]
        l: f64,
        #[arg(allow_negative_numbers = true)]
        a: f64,
        #[arg(allow_negative_numbers = true)]
        b: f64,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Dump {
            input,
            offset,
            strict,
            pretty,
        } => {
            cmd_dump(&input, offset, mode(strict), pretty)?;
        }
        Commands::Batch {
            dir,
            glob,
            offset,
            strict,
        } => {
            cmd_batch(&dir, &glob, offset, mode(strict))?;
        }
        Commands::Clsid { value } => {
            cmd_clsid(&value)?;
        }
        Commands::Lab { l, a, b } => {
            cmd_lab(l, a, b)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn mode(strict: bool) -> Mode {
    if strict {
        Mode::Strict
    } else {
        Mode::Tolerant
    }
}

fn parse_offset(s: &str) -> Result<usize, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset {s:?}: {e}"))
}

fn map_file(path: &Path) -> Result<Mmap> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }.with_context(|| format!("Failed to map {}", path.display()))?;
    Ok(mmap)
}

fn cmd_dump(input: &Path, offset: usize, mode: Mode, pretty: bool) -> Result<()> {
    let data = map_file(input)?;
    let registry = registry();

    let root = match persist::decode_at(&data, offset, &registry, mode) {
        Ok(root) => root,
        Err(Error::LicensedExtension(ext)) => {
            warn!("{ext}; printing the best-effort object");
            Some(ext.into_best_effort())
        }
        Err(e) => return Err(e).with_context(|| format!("Failed to decode {}", input.display())),
    };

    let tree = root.map(|instance| instance.to_tree());
    let json = if pretty {
        serde_json::to_string_pretty(&tree)?
    } else {
        serde_json::to_string(&tree)?
    };
    println!("{json}");

    Ok(())
}

/// Per-file outcome of a batch run.
struct Decoded {
    objects: usize,
    root: Option<&'static str>,
}

fn decode_file(path: &Path, offset: usize, registry: &Registry, mode: Mode) -> Result<Decoded> {
    let data = map_file(path)?;
    let root = persist::decode_at(&data, offset, registry, mode)?;

    let mut objects = 0;
    if let Some(root) = &root {
        root.walk(&mut |_, _| objects += 1);
    }
    Ok(Decoded {
        objects,
        root: root.as_ref().map(Instance::name),
    })
}

fn cmd_batch(dir: &Path, pattern: &str, offset: usize, mode: Mode) -> Result<()> {
    let pattern = glob::Pattern::new(pattern).with_context(|| format!("Invalid glob pattern {pattern:?}"))?;

    let files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| pattern.matches(&entry.file_name().to_string_lossy()))
        .map(|entry| entry.into_path())
        .collect();

    println!("Decoding {} files under {}...", files.len(), dir.display());

    let registry = registry();
    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let results: Vec<(PathBuf, Result<Decoded>)> = files
        .into_par_iter()
        .map(|path| {
            let result = decode_file(&path, offset, &registry, mode);
            pb.inc(1);
            (path, result)
        })
        .collect();
    pb.finish_with_message("Done");

    let mut decoded = 0;
    let mut objects = 0;
    let mut failures = Vec::new();
    for (path, result) in results {
        match result {
            Ok(file) => {
                debug!("{}: {} ({} objects)", path.display(), file.root.unwrap_or("null"), file.objects);
                decoded += 1;
                objects += file.objects;
            }
            Err(e) => failures.push((path, e)),
        }
    }

    for (path, e) in &failures {
        eprintln!("Error decoding {}: {:#}", path.display(), e);
    }

    println!(
        "Decoded {} files ({} objects) in {:?} ({} errors)",
        decoded,
        objects,
        start.elapsed(),
        failures.len()
    );

    Ok(())
}

fn cmd_clsid(value: &str) -> Result<()> {
    if value.contains('-') {
        let clsid: Clsid = value.parse().context("Failed to parse CLSID")?;
        println!("{}", clsid.to_wire_hex());
    } else {
        let clsid = Clsid::from_wire_hex(value).context("Failed to parse wire hex")?;
        println!("{clsid}");
    }

    Ok(())
}

fn cmd_lab(l: f64, a: f64, b: f64) -> Result<()> {
    let rgb = cielab_to_rgb(Lab::new(l, a, b)).context("Failed to convert color")?;
    println!("{} {} {} #{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b, rgb.r, rgb.g, rgb.b);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_offset() {
        assert_eq!(parse_offset("16"), Ok(16));
        assert_eq!(parse_offset("0x10"), Ok(16));
        assert!(parse_offset("zz").is_err());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["persist", "-v", "lab", "50", "-20", "10.5"]).unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Lab { a, .. } if a == -20.0));
    }
}
