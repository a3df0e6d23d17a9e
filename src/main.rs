//! Main entry point for the zip64pat CLI application.
//!
//! Streams a ZIP archive from a local file, stdin, or an HTTP URL and lists
//! or extracts its entries in a single front-to-back pass.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::{Read, Write};
use std::path::{Component, Path, PathBuf};

use zip64pat::{
    ArchiveEntryMetadata, ArchiveSource, Cli, HttpSource, LocalFileSource, StdinSource,
    ZipExtractor,
};

/// Application entry point.
///
/// Opens the source asynchronously, then hands the blocking stream to a
/// worker thread for decoding.
#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let http = if cli.is_http_url() {
        Some(HttpSource::new(cli.file.clone())?)
    } else {
        None
    };
    let reader = match &http {
        Some(source) => source.open().await?,
        None if cli.is_stdin() => StdinSource.open().await?,
        None => LocalFileSource::new(&cli.file).open().await?,
    };

    let worker_cli = cli.clone();
    tokio::task::spawn_blocking(move || process_zip(reader, &worker_cli))
        .await
        .context("archive worker panicked")??;

    // Display network transfer statistics for HTTP sources
    if let Some(source) = http {
        if !cli.is_quiet() {
            eprintln!(
                "\nTotal bytes transferred: {}",
                format_size(source.transferred_bytes())
            );
        }
    }

    Ok(())
}

/// Process a ZIP stream based on CLI options.
///
/// - List mode (`-l` or `-v`): Display archive contents
/// - Extract mode: Extract entries matching the filters as they stream by
fn process_zip(reader: Box<dyn Read + Send>, cli: &Cli) -> Result<()> {
    let mut extractor = ZipExtractor::with_options(reader, cli.stream_options());

    if cli.list || cli.verbose {
        return list_files(extractor, cli.verbose);
    }

    // The entry count is unknown while streaming, so mark every entry in pipe
    // mode unless a single literal name was asked for
    let show_filename = cli.pipe && !(cli.files.len() == 1 && !has_glob_chars(&cli.files[0]));

    let mut extracted = 0usize;
    while let Some(entry) = extractor.next_entry()? {
        // Directories are created on demand; skipped entries are still
        // verified when the stream moves past them
        if entry.is_directory || !is_selected(&entry, cli) {
            continue;
        }
        extract_file(&mut extractor, &entry, cli, show_filename)?;
        extracted += 1;
    }

    if extracted == 0 && !cli.files.is_empty() && !cli.is_very_quiet() {
        eprintln!("No matching files found in {}", cli.file);
    }

    Ok(())
}

/// Apply the positional selection and the `-x` exclusions to an entry.
fn is_selected(entry: &ArchiveEntryMetadata, cli: &Cli) -> bool {
    if !cli.files.is_empty() {
        let matches = cli.files.iter().any(|f| {
            if has_glob_chars(f) {
                glob_match(f, &entry.name)
            } else {
                // No wildcards: exact match on filename or full path
                entry.name == *f || base_name(&entry.name) == *f
            }
        });
        if !matches {
            return false;
        }
    }

    !cli
        .exclude
        .iter()
        .any(|x| entry.name.contains(x.as_str()) || glob_match(x, &entry.name))
}

/// List the entries of the stream.
///
/// Each entry is read through, so sizes from data descriptors (including
/// recovered ZIP64 ones) are shown.
fn list_files<R: Read>(extractor: ZipExtractor<R>, verbose: bool) -> Result<()> {
    let entries = extractor.list_files()?;

    if verbose {
        println!(
            "{:>10}  {:>10}  {:>5}  {:>10}  {:>5}  {:>8}  Name",
            "Length", "Size", "Cmpr", "Date", "Time", "CRC-32"
        );
        println!("{}", "-".repeat(80));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in &entries {
        if !verbose {
            println!("{}", entry.name);
            continue;
        }

        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        println!(
            "{:>10}  {:>10}  {}  {:04}-{:02}-{:02}  {:02}:{:02}  {:08x}  {}",
            entry.uncompressed_size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.uncompressed_size),
            year,
            month,
            day,
            hour,
            minute,
            entry.crc32,
            entry.name
        );

        if !entry.is_directory {
            total_uncompressed += entry.uncompressed_size;
            total_compressed += entry.compressed_size;
            file_count += 1;
        }
    }

    if verbose {
        println!("{}", "-".repeat(80));
        println!(
            "{:>10}  {:>10}  {}  {:>31}  {} files",
            total_uncompressed,
            total_compressed,
            ratio(total_compressed, total_uncompressed),
            "",
            file_count
        );
    }

    Ok(())
}

/// Percentage saved by compression, right-aligned to five columns.
fn ratio(compressed: u64, uncompressed: u64) -> String {
    if uncompressed == 0 || compressed > uncompressed {
        return "  0%".to_string();
    }
    format!("{:>4}%", 100 - (compressed * 100 / uncompressed))
}

/// Extract the current entry.
///
/// - Pipe mode (`-p`): Write to stdout instead of file
/// - Custom output directory (`-d`): Extract to specified directory
/// - Junk paths (`-j`): Ignore directory structure in archive
/// - Overwrite control (`-n`, `-o`): Handle existing files
fn extract_file<R: Read>(
    extractor: &mut ZipExtractor<R>,
    entry: &ArchiveEntryMetadata,
    cli: &Cli,
    show_filename: bool,
) -> Result<()> {
    if cli.pipe {
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        if show_filename {
            writeln!(out, "--- {} ---", entry.name)?;
        }
        extractor.extract_to_writer(&mut out)?;
        out.flush()?;
        return Ok(());
    }

    let Some(output_path) = output_path(entry, cli) else {
        log::warn!("{}: skipped, path leaves the extraction directory", entry.name);
        return Ok(());
    };

    if output_path.exists() {
        if cli.never_overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (file exists)", entry.name);
            }
            return Ok(());
        }

        if !cli.overwrite {
            if !cli.is_quiet() {
                eprintln!("Skipping: {} (use -o to overwrite)", entry.name);
            }
            return Ok(());
        }
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.name);
    }

    extractor
        .extract_to_file(&output_path)
        .with_context(|| format!("failed to extract {}", entry.name))?;

    Ok(())
}

/// Where an entry lands on disk, honouring `-d` and `-j`.
///
/// `None` when the name would resolve outside the extraction directory.
fn output_path(entry: &ArchiveEntryMetadata, cli: &Cli) -> Option<PathBuf> {
    let file_name = if cli.junk_paths {
        base_name(&entry.name)
    } else {
        entry.name.clone()
    };
    let relative = enclosed_name(&file_name)?;

    Some(match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(relative),
        None => relative,
    })
}

/// Archive name as a relative path that stays below its base directory.
///
/// Absolute names, drive prefixes, NUL bytes and `..` that climb above the
/// start are rejected.
fn enclosed_name(name: &str) -> Option<PathBuf> {
    if name.contains('\0') {
        return None;
    }
    let path = PathBuf::from(name);
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::ParentDir => depth = depth.checked_sub(1)?,
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
        }
    }
    (depth > 0).then_some(path)
}

fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Check if a pattern contains glob wildcard characters.
fn has_glob_chars(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Glob matching supporting `*` (any run of characters) and `?` (one
/// character).
///
/// Greedy scan with backtracking to the most recent `*`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        match pattern.get(p) {
            Some('*') => {
                star = Some((p, t));
                p += 1;
            }
            Some(&c) if c == '?' || c == text[t] => {
                p += 1;
                t += 1;
            }
            _ => match star {
                Some((star_p, star_t)) => {
                    p = star_p + 1;
                    t = star_t + 1;
                    star = Some((star_p, star_t + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s >= GB => format!("{:.2} GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.2} MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.2} KB", s as f64 / KB as f64),
        s => format!("{} bytes", s),
    }
}
