//! kadr - Extract violation records from traffic-camera JPEG composites
//!
//! This tool scans capture files for embedded image frames and appended
//! metadata and writes the normalized violation record for each as JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, ValueEnum};
use kadr_core::{parse, ParserConfig, ViolationRecord};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Extract violation records from traffic-camera JPEG composites
#[derive(Parser, Debug)]
#[command(name = "kadr")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(flatten)]
    input: InputMode,

    /// Output directory for normalized record JSON files
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Path to a parser configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "record")]
    format: OutputFormat,

    /// Maximum number of frames to extract per capture (0 = unlimited)
    #[arg(long, default_value = "0")]
    max_frames: usize,

    /// Dry run - don't write files, just show what would be extracted
    #[arg(long)]
    dry_run: bool,

    /// Overwrite existing files without prompting
    #[arg(long)]
    force: bool,

    /// Only list parseable captures without writing records
    #[arg(long)]
    list_only: bool,

    /// Conflict resolution strategy for same-name different-content records
    #[arg(long, value_enum, default_value = "hash-suffix")]
    conflict_strategy: ConflictStrategy,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single capture file to parse
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of captures to process
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

/// Output format for parsed records
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One JSON record file per capture
    Record,
    /// One summary line per capture (for scripting)
    Summary,
}

/// Strategy for resolving naming conflicts
#[derive(Debug, Clone, Copy, ValueEnum)]
enum ConflictStrategy {
    /// Append a short content hash: event~a1b2c3d4.json
    HashSuffix,
    /// Append source directory name: event~from-cam03.json
    SourceSuffix,
    /// Skip conflicting files (keep first occurrence only)
    SkipConflicts,
}

/// Tracks seen captures and records for deduplication
#[derive(Default)]
struct RecordRegistry {
    /// Maps record filename -> (content_hash, output_path)
    seen: HashMap<String, Vec<(String, PathBuf)>>,
    /// Content hashes of inputs already processed
    inputs: HashSet<String>,
    /// Statistics
    stats: RegistryStats,
}

#[derive(Default)]
struct RegistryStats {
    captures_seen: usize,
    parsed: usize,
    failed: usize,
    duplicates_skipped: usize,
    conflicts_renamed: usize,
    written: usize,
}

impl RecordRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Compute a short hash of the content (first 8 chars of blake3)
    fn content_hash(content: &[u8]) -> String {
        let hash = blake3::hash(content);
        hash.to_hex()[..8].to_string()
    }

    /// Register an input's content hash; false if this exact capture was
    /// already processed
    fn register_input(&mut self, input_hash: &str) -> bool {
        self.stats.captures_seen += 1;
        if !self.inputs.insert(input_hash.to_string()) {
            self.stats.duplicates_skipped += 1;
            return false;
        }
        true
    }

    /// Check if this exact content was already seen for this filename
    fn is_duplicate(&self, filename: &str, content_hash: &str) -> bool {
        self.seen
            .get(filename)
            .map(|entries| entries.iter().any(|(h, _)| h == content_hash))
            .unwrap_or(false)
    }

    /// Get the number of variants we've seen for this filename
    fn variant_count(&self, filename: &str) -> usize {
        self.seen.get(filename).map(|e| e.len()).unwrap_or(0)
    }

    /// Register a record and return the resolved output path
    fn register(
        &mut self,
        filename: &str,
        content_hash: &str,
        output_dir: &Path,
        source: Option<&Path>,
        strategy: ConflictStrategy,
    ) -> Option<PathBuf> {
        // Check for exact duplicate
        if self.is_duplicate(filename, content_hash) {
            debug!("Skipping duplicate: {} (hash: {})", filename, content_hash);
            self.stats.duplicates_skipped += 1;
            return None;
        }

        // Determine output path
        let output_path = if self.variant_count(filename) == 0 {
            // First occurrence - use canonical name
            output_dir.join(filename)
        } else {
            // Conflict - need to resolve
            match strategy {
                ConflictStrategy::SkipConflicts => {
                    debug!(
                        "Skipping conflict: {} (different content, hash: {})",
                        filename, content_hash
                    );
                    self.stats.duplicates_skipped += 1;
                    return None;
                }
                ConflictStrategy::HashSuffix => {
                    let new_name = Self::add_suffix(filename, &format!("~{}", content_hash));
                    info!(
                        "Conflict resolved: {} -> {} (content differs)",
                        filename, new_name
                    );
                    self.stats.conflicts_renamed += 1;
                    output_dir.join(new_name)
                }
                ConflictStrategy::SourceSuffix => {
                    let source_name = source
                        .and_then(|p| p.parent())
                        .and_then(|p| p.file_name())
                        .and_then(|s| s.to_str())
                        .unwrap_or("unknown");
                    let new_name = Self::add_suffix(filename, &format!("~from-{}", source_name));
                    info!(
                        "Conflict resolved: {} -> {} (from {})",
                        filename, new_name, source_name
                    );
                    self.stats.conflicts_renamed += 1;
                    output_dir.join(new_name)
                }
            }
        };

        // Record this variant
        self.seen
            .entry(filename.to_string())
            .or_default()
            .push((content_hash.to_string(), output_path.clone()));

        Some(output_path)
    }

    /// Add a suffix before the .json extension
    fn add_suffix(filename: &str, suffix: &str) -> String {
        if let Some(stem) = filename.strip_suffix(".json") {
            format!("{}{}.json", stem, suffix)
        } else {
            format!("{}{}", filename, suffix)
        }
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} captures, {} parsed, {} failed, {} duplicates skipped, {} conflicts renamed, {} written",
            self.stats.captures_seen,
            self.stats.parsed,
            self.stats.failed,
            self.stats.duplicates_skipped,
            self.stats.conflicts_renamed,
            self.stats.written
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let config = load_config(&cli)?;

    // Dispatch based on input mode
    if let Some(ref file) = cli.input.file {
        process_single_file(&cli, &config, file)
    } else if let Some(ref directory) = cli.input.directory {
        process_directory(&cli, &config, directory)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Build the parser configuration from the optional config file and flags
fn load_config(cli: &Cli) -> Result<ParserConfig> {
    let mut config = match cli.config {
        Some(ref path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => ParserConfig::default(),
    };

    // A nonzero flag overrides whatever the file says.
    if cli.max_frames > 0 {
        config = config.max_frames(cli.max_frames);
    }

    Ok(config)
}

/// Process a single capture file
fn process_single_file(cli: &Cli, config: &ParserConfig, file: &Path) -> Result<()> {
    if !file.exists() {
        bail!("Input file does not exist: {}", file.display());
    }
    if !file.is_file() {
        bail!("Input path is not a file: {}", file.display());
    }

    let mut registry = RecordRegistry::new();
    process_capture(cli, config, file, &mut registry)?;

    if !cli.list_only && !cli.dry_run {
        registry.print_summary();
    }

    Ok(())
}

/// Process a directory of captures recursively
fn process_directory(cli: &Cli, config: &ParserConfig, directory: &Path) -> Result<()> {
    if !directory.exists() {
        bail!("Directory does not exist: {}", directory.display());
    }
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());

    let mut registry = RecordRegistry::new();
    let mut captures_processed = 0;

    // Walk the directory
    for entry in WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        // Skip directories
        if !path.is_file() {
            continue;
        }

        // Skip hidden files
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
        {
            continue;
        }

        if !is_violation_capture(path) {
            trace!("Skipping non-capture: {}", path.display());
            continue;
        }

        debug!("Processing capture: {}", path.display());
        if let Err(e) = process_capture(cli, config, path, &mut registry) {
            // Log error but continue with other files
            warn!("Error processing {}: {}", path.display(), e);
        }
        captures_processed += 1;
    }

    info!("Processed {} captures", captures_processed);

    if !cli.list_only && !cli.dry_run {
        registry.print_summary();
    }

    Ok(())
}

/// Whether a path looks like an uploaded capture file
fn is_violation_capture(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            ext == "jpg" || ext == "jpeg"
        })
        .unwrap_or(false)
}

/// Parse one capture and emit its record
fn process_capture(
    cli: &Cli,
    config: &ParserConfig,
    capture_path: &Path,
    registry: &mut RecordRegistry,
) -> Result<()> {
    // Read the input file
    trace!("Reading {}", capture_path.display());
    let data = fs::read(capture_path)
        .with_context(|| format!("Failed to read input file: {}", capture_path.display()))?;

    trace!("Read {} bytes from {}", data.len(), capture_path.display());

    // Drop byte-identical re-uploads
    let input_hash = RecordRegistry::content_hash(&data);
    if !registry.register_input(&input_hash) {
        debug!(
            "Skipping duplicate capture: {} (hash: {})",
            capture_path.display(),
            input_hash
        );
        return Ok(());
    }

    let record = match parse(&data, config) {
        Ok(record) => record,
        Err(e) => {
            registry.stats.failed += 1;
            return Err(e)
                .with_context(|| format!("Failed to parse capture: {}", capture_path.display()));
        }
    };
    registry.stats.parsed += 1;

    report_missing_fields(config, &record, capture_path);

    let filename = record_filename(capture_path);

    if cli.list_only {
        println!("{}", filename);
        return Ok(());
    }

    match cli.format {
        OutputFormat::Summary => {
            println!("{}", summary_line(&record));
        }
        OutputFormat::Record => {
            let content = serde_json::to_string_pretty(&record)
                .context("Failed to serialize violation record")?;
            let content_hash = RecordRegistry::content_hash(content.as_bytes());

            // Register and get output path
            let output_path = registry.register(
                &filename,
                &content_hash,
                &cli.output,
                Some(capture_path),
                cli.conflict_strategy,
            );

            if let Some(output_path) = output_path {
                if cli.dry_run {
                    println!("Would write: {}", output_path.display());
                    if cli.verbose > 0 {
                        println!("---");
                        println!("{}", content);
                        println!("---");
                    }
                } else {
                    match write_record_file(&output_path, &content, cli.force) {
                        Ok(()) => {
                            println!("Wrote {}", output_path.display());
                            registry.stats.written += 1;
                        }
                        Err(e) => {
                            error!("Failed to write {}: {}", output_path.display(), e);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Warn about required fields the parse left at their defaults
fn report_missing_fields(config: &ParserConfig, record: &ViolationRecord, path: &Path) {
    for field in &config.required_fields {
        match record.is_field_default(field) {
            Some(true) => warn!(
                "{}: required field {} is missing from the capture",
                path.display(),
                field
            ),
            Some(false) => {}
            None => warn!("required-field list names unknown field {}", field),
        }
    }
}

/// Output filename for a capture's record
fn record_filename(capture_path: &Path) -> String {
    let stem = capture_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("violation");
    format!("{}.json", stem)
}

/// One line per record: plate, timestamp, photo count
fn summary_line(record: &ViolationRecord) -> String {
    let plate = if record.v_regno.is_empty() {
        "-"
    } else {
        record.v_regno.as_str()
    };
    format!(
        "{}\t{}\t{} photo(s)",
        plate,
        record.v_time_check,
        1 + record.v_photo_extra.len()
    )
}

/// Write a record file to disk
fn write_record_file(output_path: &Path, content: &str, force: bool) -> Result<()> {
    // Create parent directories
    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Check if file exists
    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    // Write the file
    let mut file = fs::File::create(output_path)
        .with_context(|| format!("Failed to create file: {}", output_path.display()))?;

    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write file: {}", output_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_registry_deduplication() {
        let mut registry = RecordRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        let content = br#"{"v_regno": "AB123CD"}"#;
        let hash = RecordRegistry::content_hash(content);

        // First registration should succeed
        let path1 = registry.register(
            "event.json",
            &hash,
            temp_dir.path(),
            None,
            ConflictStrategy::HashSuffix,
        );
        assert!(path1.is_some());
        assert!(path1.unwrap().ends_with("event.json"));

        // Duplicate should be skipped
        let path2 = registry.register(
            "event.json",
            &hash,
            temp_dir.path(),
            None,
            ConflictStrategy::HashSuffix,
        );
        assert!(path2.is_none());

        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_record_registry_conflict_hash_suffix() {
        let mut registry = RecordRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        let hash1 = RecordRegistry::content_hash(br#"{"v_regno": "AB123CD"}"#);
        let hash2 = RecordRegistry::content_hash(br#"{"v_regno": "XY987ZW"}"#);

        // First registration
        let path1 = registry.register(
            "event.json",
            &hash1,
            temp_dir.path(),
            None,
            ConflictStrategy::HashSuffix,
        );
        assert!(path1.is_some());
        assert!(path1.unwrap().ends_with("event.json"));

        // Second with different content should get hash suffix
        let path2 = registry.register(
            "event.json",
            &hash2,
            temp_dir.path(),
            None,
            ConflictStrategy::HashSuffix,
        );
        assert!(path2.is_some());
        let path2_str = path2.unwrap().to_string_lossy().to_string();
        assert!(path2_str.contains("event~"));
        assert!(path2_str.ends_with(".json"));

        assert_eq!(registry.stats.conflicts_renamed, 1);
    }

    #[test]
    fn test_record_registry_skip_conflicts() {
        let mut registry = RecordRegistry::new();
        let temp_dir = TempDir::new().unwrap();

        registry.register(
            "event.json",
            "aaaa0000",
            temp_dir.path(),
            None,
            ConflictStrategy::SkipConflicts,
        );
        let second = registry.register(
            "event.json",
            "bbbb1111",
            temp_dir.path(),
            None,
            ConflictStrategy::SkipConflicts,
        );
        assert!(second.is_none());
    }

    #[test]
    fn test_input_deduplication() {
        let mut registry = RecordRegistry::new();
        assert!(registry.register_input("aaaa0000"));
        assert!(!registry.register_input("aaaa0000"));
        assert!(registry.register_input("bbbb1111"));
        assert_eq!(registry.stats.captures_seen, 3);
        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_add_suffix() {
        assert_eq!(
            RecordRegistry::add_suffix("event.json", "~abc123"),
            "event~abc123.json"
        );
        assert_eq!(
            RecordRegistry::add_suffix("cam03/event.json", "~abc123"),
            "cam03/event~abc123.json"
        );
    }

    #[test]
    fn test_content_hash() {
        let hash1 = RecordRegistry::content_hash(b"hello");
        let hash2 = RecordRegistry::content_hash(b"hello");
        let hash3 = RecordRegistry::content_hash(b"world");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(hash1.len(), 8);
    }

    #[test]
    fn test_is_violation_capture() {
        assert!(is_violation_capture(Path::new("/tmp/event.jpg")));
        assert!(is_violation_capture(Path::new("/tmp/event.JPEG")));
        assert!(!is_violation_capture(Path::new("/tmp/event.json")));
        assert!(!is_violation_capture(Path::new("/tmp/event.png")));
        assert!(!is_violation_capture(Path::new("/tmp/noextension")));
    }

    #[test]
    fn test_record_filename() {
        assert_eq!(record_filename(Path::new("/in/cam03/17-22-05.jpg")), "17-22-05.json");
        assert_eq!(record_filename(Path::new("event.jpeg")), "event.json");
    }

    #[test]
    fn test_summary_line() {
        let record = ViolationRecord {
            v_regno: "AB123CD".to_owned(),
            v_time_check: "2023-11-15T01:13:20.500".to_owned(),
            v_photo_extra: vec!["b64".to_owned()],
            ..ViolationRecord::default()
        };
        assert_eq!(
            summary_line(&record),
            "AB123CD\t2023-11-15T01:13:20.500\t2 photo(s)"
        );

        let empty = ViolationRecord::default();
        assert!(summary_line(&empty).starts_with("-\t"));
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("parser.json");
        fs::write(
            &config_path,
            r#"{"required_fields": ["v_regno"], "max_frames": 3}"#,
        )
        .unwrap();

        let cli = Cli::parse_from([
            "kadr",
            "--file",
            "event.jpg",
            "--config",
            config_path.to_str().unwrap(),
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.required_fields, vec!["v_regno"]);
        assert_eq!(config.max_frames, 3);

        // The flag beats the file.
        let cli = Cli::parse_from([
            "kadr",
            "--file",
            "event.jpg",
            "--config",
            config_path.to_str().unwrap(),
            "--max-frames",
            "5",
        ]);
        let config = load_config(&cli).unwrap();
        assert_eq!(config.max_frames, 5);
    }

    #[test]
    fn test_load_config_rejects_bad_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("parser.json");
        fs::write(&config_path, "not json").unwrap();

        let cli = Cli::parse_from([
            "kadr",
            "--file",
            "event.jpg",
            "--config",
            config_path.to_str().unwrap(),
        ]);
        assert!(load_config(&cli).is_err());
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
