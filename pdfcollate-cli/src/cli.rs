//! CLI argument parsing for pdfcollate.
//!
//! This module defines the command-line interface structure using `clap`.
//! It is also compiled into the build script to generate the man page, so it
//! only depends on `clap`, `tokio` and the library.

use clap::Parser;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use pdfcollate::config::{CompressionLevel, Config, EditScript, Metadata, OverwriteMode};
use pdfcollate::error::{PdfCollateError, Result};
use pdfcollate::render::DEFAULT_THUMBNAIL_SCALE;

/// Collect pages from PDF files, rearrange them and merge the selection
/// into a single document.
///
/// Every page of every input is loaded in order. Pages can then be removed,
/// picked in a new order and rotated before the result is merged.
#[derive(Parser, Debug)]
#[command(name = "pdfcollate")]
#[command(version)]
#[command(about = "Collect, rearrange and merge PDF pages", long_about = None)]
#[command(author)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Input PDF files (in order)
    ///
    /// Glob patterns are expanded. Files that are not PDFs are skipped.
    /// Pages are referred to as FILE:PAGE, where FILE is the position of
    /// the input on the command line, starting at 1.
    ///
    /// Examples:
    ///   pdfcollate a.pdf b.pdf -o out.pdf
    ///   pdfcollate 'scans/*.pdf' -o scans.pdf
    #[arg(required_unless_present = "input_list", value_name = "FILE")]
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,

    /// Page order for the output, e.g. "1:2,2:1,1:1-3"
    ///
    /// Pages not listed are left out.
    #[arg(long, value_name = "SEQ")]
    pub select: Option<String>,

    /// Pages to leave out, e.g. "1:3,2:1-2"
    #[arg(long, value_name = "SEQ")]
    pub remove: Option<String>,

    /// Rotate pages, e.g. "1:2=90,2:1=-90"
    ///
    /// Degrees must be a multiple of 90 and add to any rotation the page
    /// already has.
    #[arg(long, value_name = "SPEC")]
    pub rotate: Option<String>,

    /// Write a PNG thumbnail of every page into DIR
    #[arg(long, value_name = "DIR")]
    pub thumbnails: Option<PathBuf>,

    /// Scale thumbnails are rendered at
    #[arg(long, value_name = "F", env = "PDFCOLLATE_THUMBNAIL_SCALE", default_value_t = DEFAULT_THUMBNAIL_SCALE)]
    pub thumbnail_scale: f32,

    /// Compression level for output PDF
    ///
    /// - none: No compression
    /// - standard: Compress content streams (default)
    /// - maximum: Also drop unreferenced objects
    #[arg(short, long, value_name = "LEVEL", default_value = "standard")]
    #[arg(env = "PDFCOLLATE_COMPRESSION")]
    #[arg(value_parser = ["none", "standard", "maximum"])]
    pub compression: String,

    /// Set title metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Set author metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub author: Option<String>,

    /// Set subject metadata for output PDF
    #[arg(long, value_name = "TEXT")]
    pub subject: Option<String>,

    /// Set keywords metadata for output PDF (comma-separated)
    #[arg(long, value_name = "TEXT")]
    pub keywords: Option<String>,

    /// Read input file list from a file (one path per line)
    ///
    /// Lines starting with '#' are ignored. Use '-' to read from stdin.
    /// Paths from the list come after direct inputs.
    #[arg(long, value_name = "FILE")]
    pub input_list: Option<PathBuf>,

    /// Force overwrite of existing output file without confirmation
    #[arg(short, long)]
    pub force: bool,

    /// Never overwrite existing output file
    #[arg(long, conflicts_with = "force")]
    pub no_clobber: bool,

    /// Dry run - load pages and show the plan without creating output
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print a machine-readable summary on stdout
    #[arg(long)]
    pub json: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress all non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Convert CLI arguments into a validated Config.
    ///
    /// `inputs` are the paths from [`get_all_inputs`](Self::get_all_inputs).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Compression level is invalid
    /// - A page list or rotation is malformed
    /// - Configuration validation fails
    pub fn to_config(&self, inputs: Vec<PathBuf>) -> Result<Config> {
        let compression = CompressionLevel::from_str(&self.compression)?;

        let overwrite_mode = if self.force {
            OverwriteMode::Force
        } else if self.no_clobber {
            OverwriteMode::NoClobber
        } else {
            OverwriteMode::Prompt
        };

        let edits = EditScript {
            remove: self
                .remove
                .as_deref()
                .map(EditScript::parse_refs)
                .transpose()?
                .unwrap_or_default(),
            select: self
                .select
                .as_deref()
                .map(EditScript::parse_refs)
                .transpose()?,
            rotate: self
                .rotate
                .as_deref()
                .map(EditScript::parse_rotations)
                .transpose()?
                .unwrap_or_default(),
        };

        let metadata = Metadata::new(
            self.title.clone(),
            self.author.clone(),
            self.subject.clone(),
            self.keywords.clone(),
        );

        let config = Config {
            inputs,
            output: self.output.clone(),
            dry_run: self.dry_run,
            verbose: self.verbose,
            quiet: self.quiet,
            json: self.json,
            overwrite_mode,
            compression,
            metadata,
            thumbnails: self.thumbnails.clone(),
            thumbnail_scale: self.thumbnail_scale,
            edits,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate CLI arguments before touching the filesystem.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() && self.input_list.is_none() {
            return Err(PdfCollateError::invalid_config("No input files specified"));
        }

        if !["none", "standard", "maximum"].contains(&self.compression.as_str()) {
            return Err(PdfCollateError::invalid_config(format!(
                "Invalid compression level: {}",
                self.compression
            )));
        }

        if !(self.thumbnail_scale.is_finite() && self.thumbnail_scale > 0.0) {
            return Err(PdfCollateError::invalid_config(format!(
                "Thumbnail scale must be a positive number, got {}",
                self.thumbnail_scale
            )));
        }

        Ok(())
    }

    /// Get all input paths including those from the input-list file.
    ///
    /// Direct inputs come first and glob patterns among them are expanded.
    ///
    /// # Errors
    ///
    /// Returns an error if the input list file cannot be read, a glob
    /// pattern is invalid, or no inputs remain.
    pub async fn get_all_inputs(&self) -> Result<Vec<PathBuf>> {
        let patterns: Vec<String> = self
            .inputs
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        let mut all_inputs = pdfcollate::utils::collect_paths_for_patterns(patterns)?;

        if let Some(ref input_list_path) = self.input_list {
            all_inputs.extend(read_input_list(input_list_path).await?);
        }

        if all_inputs.is_empty() {
            return Err(PdfCollateError::invalid_config(
                "No input files matched the given paths",
            ));
        }

        Ok(all_inputs)
    }
}

/// Read input paths from a file, or from stdin for "-".
async fn read_input_list(path: &Path) -> Result<Vec<PathBuf>> {
    use tokio::fs::File;
    use tokio::io::BufReader;

    let to_error = |source| PdfCollateError::FailedToReadInputList {
        path: path.to_path_buf(),
        source,
    };

    if path.as_os_str() == "-" {
        return parse_input_list(BufReader::new(tokio::io::stdin()))
            .await
            .map_err(to_error);
    }

    let file = File::open(path).await.map_err(to_error)?;
    parse_input_list(BufReader::new(file))
        .await
        .map_err(to_error)
}

/// One path per line; blank lines and '#' comments are skipped.
async fn parse_input_list<R>(reader: R) -> std::io::Result<Vec<PathBuf>>
where
    R: tokio::io::AsyncBufRead + Unpin,
{
    use tokio::io::AsyncBufReadExt;

    let mut lines = reader.lines();
    let mut paths = Vec::new();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        paths.push(PathBuf::from(line));
    }

    Ok(paths)
}
