//! Configuration module for pdfcollate.
//!
//! This module turns CLI arguments into a validated configuration that
//! drives a collation run. It handles:
//! - Validation of argument combinations
//! - Parsing of the page edit script (select, remove, rotate)
//! - Application of defaults
//! - Settings for the drag-reorder widget of a UI shell

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::PdfCollateError;
use crate::render::DEFAULT_THUMBNAIL_SCALE;
use std::{fmt, path::PathBuf, str::FromStr};

/// Compression level for the output PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// No compression - preserves exact quality and structure.
    None,
    /// Compress content streams.
    #[default]
    Standard,
    /// Compress and drop unreferenced objects - smallest file size.
    Maximum,
}

impl FromStr for CompressionLevel {
    type Err = crate::PdfCollateError;

    /// Parse "none", "standard" or "maximum", ignoring case.
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            _ => Err(PdfCollateError::InvalidConfig {
                message: format!(
                    "Invalid compression level: {s}. Must be one of: none, standard, maximum"
                ),
            }),
        }
    }
}

impl fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Standard => f.write_str("standard"),
            Self::Maximum => f.write_str("maximum"),
        }
    }
}

/// A page named by input position: `file:page`, both 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageRef {
    /// Position of the file among the inputs.
    pub file: u32,
    /// Page number within that file.
    pub page: u32,
}

impl PageRef {
    /// Reference page `page` of input `file`.
    pub fn new(file: u32, page: u32) -> Self {
        Self { file, page }
    }

    /// Parse `file:page` or `file:first-last` into one or more references.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfcollate::config::PageRef;
    ///
    /// let refs = PageRef::parse_many("2:3-5").unwrap();
    /// assert_eq!(refs, vec![PageRef::new(2, 3), PageRef::new(2, 4), PageRef::new(2, 5)]);
    /// ```
    pub fn parse_many(s: &str) -> Result<Vec<Self>> {
        let s = s.trim();
        let (file, pages) = s
            .split_once(':')
            .with_context(|| format!("Invalid page reference: {s}. Expected format like '1:2'"))?;

        let file = parse_positive(file, "file number")?;

        if let Some((start, end)) = pages.split_once('-') {
            let start = parse_positive(start, "page number")?;
            let end = parse_positive(end, "page number")?;
            if start > end {
                bail!(
                    "Invalid range {start}-{end}: start page must be less than or equal to end page"
                );
            }
            Ok((start..=end).map(|page| Self::new(file, page)).collect())
        } else {
            Ok(vec![Self::new(file, parse_positive(pages, "page number")?)])
        }
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.page)
    }
}

/// A rotation edit: turn `target` by `degrees`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateEdit {
    /// Page to turn.
    pub target: PageRef,
    /// Degrees to add; any multiple of 90, negative for counter-clockwise.
    pub degrees: i32,
}

/// Page edits applied to a session before merging.
///
/// Applied in the order remove, select, rotate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditScript {
    /// Pages to drop.
    pub remove: Vec<PageRef>,
    /// New page order; pages not listed are dropped. `None` keeps the
    /// ingestion order.
    pub select: Option<Vec<PageRef>>,
    /// Rotations to apply.
    pub rotate: Vec<RotateEdit>,
}

impl EditScript {
    /// Parse a comma separated list of page references.
    pub fn parse_refs(s: &str) -> Result<Vec<PageRef>> {
        let mut refs = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            refs.extend(PageRef::parse_many(part)?);
        }
        if refs.is_empty() {
            bail!("Page list cannot be empty");
        }
        Ok(refs)
    }

    /// Parse a comma separated list of `file:page=degrees` rotations.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfcollate::config::EditScript;
    ///
    /// let edits = EditScript::parse_rotations("1:2=90,2:1-2=-90").unwrap();
    /// assert_eq!(edits.len(), 3);
    /// assert_eq!(edits[2].degrees, -90);
    /// ```
    pub fn parse_rotations(s: &str) -> Result<Vec<RotateEdit>> {
        let mut edits = Vec::new();
        for part in s.split(',').filter(|p| !p.trim().is_empty()) {
            let (target, degrees) = part.split_once('=').with_context(|| {
                format!("Invalid rotation: {part}. Expected format like '1:2=90'")
            })?;
            let degrees: i32 = degrees
                .trim()
                .parse()
                .with_context(|| format!("Invalid rotation degrees: {degrees}"))?;
            if degrees % 90 != 0 {
                bail!(PdfCollateError::InvalidRotation { degrees });
            }
            for target in PageRef::parse_many(target)? {
                edits.push(RotateEdit { target, degrees });
            }
        }
        if edits.is_empty() {
            bail!("Rotation list cannot be empty");
        }
        Ok(edits)
    }

    /// Whether the script changes anything.
    pub fn is_empty(&self) -> bool {
        self.remove.is_empty() && self.select.is_none() && self.rotate.is_empty()
    }

    /// Every page reference in the script.
    pub fn references(&self) -> impl Iterator<Item = PageRef> + '_ {
        self.remove
            .iter()
            .copied()
            .chain(self.select.iter().flatten().copied())
            .chain(self.rotate.iter().map(|edit| edit.target))
    }
}

fn parse_positive(s: &str, what: &str) -> Result<u32> {
    let value: u32 = s
        .trim()
        .parse()
        .with_context(|| format!("Invalid {what}: {s}"))?;
    if value == 0 {
        bail!("File and page numbers must be positive (1-indexed)");
    }
    Ok(value)
}

/// PDF metadata to set on the output document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings, trimming whitespace.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let to_string_opt = |opt: Option<String>| {
            opt.filter(|s| !s.trim().is_empty())
                .map(|s| s.trim().to_string())
        };

        Self {
            title: to_string_opt(title),
            author: to_string_opt(author),
            subject: to_string_opt(subject),
            keywords: to_string_opt(keywords),
        }
    }
}

/// Output file overwrite behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverwriteMode {
    /// Prompt the user before overwriting (default).
    #[default]
    Prompt,
    /// Always overwrite without prompting.
    Force,
    /// Never overwrite, error if file exists.
    NoClobber,
}

/// Settings for the drag-reorder widget of a UI shell.
///
/// Serialises to the option names the widget expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortableConfig {
    /// Drop animation in milliseconds.
    pub animation: u32,
    /// CSS class of the placeholder left where the page is dragged from.
    pub ghost_class: String,
    /// Auto-scroll while dragging near an edge.
    pub scroll: bool,
    /// Distance from the edge, in pixels, that starts auto-scroll.
    pub scroll_sensitivity: u32,
    /// Auto-scroll speed in pixels per frame.
    pub scroll_speed: u32,
    /// Let ancestor scroll containers scroll too.
    pub bubble_scroll: bool,
}

impl Default for SortableConfig {
    fn default() -> Self {
        Self {
            animation: 150,
            ghost_class: "sortable-ghost".to_string(),
            scroll: true,
            scroll_sensitivity: 100,
            scroll_speed: 10,
            bubble_scroll: true,
        }
    }
}

impl SortableConfig {
    /// The settings as a JSON object.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string(self).map_err(|e| PdfCollateError::other(e.to_string()))
    }
}

/// Complete configuration for a collation run.
///
/// This structure contains all settings needed to ingest, edit and merge,
/// derived and validated from CLI arguments.
#[derive(Debug, Clone)]
pub struct Config {
    /// Input PDF file paths (in upload order).
    pub inputs: Vec<PathBuf>,

    /// Output PDF file path.
    pub output: PathBuf,

    /// Dry run mode - ingest and plan without creating output.
    pub dry_run: bool,

    /// Verbose output mode.
    pub verbose: bool,

    /// Quiet mode - suppress non-error output.
    pub quiet: bool,

    /// Machine-readable summary on stdout.
    pub json: bool,

    /// File overwrite behavior.
    pub overwrite_mode: OverwriteMode,

    /// Compression level for output.
    pub compression: CompressionLevel,

    /// Metadata to set on output document.
    pub metadata: Metadata,

    /// Directory to write page thumbnails to.
    pub thumbnails: Option<PathBuf>,

    /// Scale thumbnails are rendered at.
    pub thumbnail_scale: f32,

    /// Page edits to apply before merging.
    pub edits: EditScript,
}

impl Config {
    /// A configuration with defaults for everything but inputs and output.
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf) -> Self {
        Self {
            inputs,
            output,
            dry_run: false,
            verbose: false,
            quiet: false,
            json: false,
            overwrite_mode: OverwriteMode::default(),
            compression: CompressionLevel::default(),
            metadata: Metadata::default(),
            thumbnails: None,
            thumbnail_scale: DEFAULT_THUMBNAIL_SCALE,
            edits: EditScript::default(),
        }
    }

    /// Returns a reference to inputs.
    pub fn inputs(&self) -> &[PathBuf] {
        self.inputs.as_ref()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input files are specified
    /// - Verbose and quiet modes are both enabled
    /// - The thumbnail scale is not a positive number
    /// - The output path is also an input
    /// - An edit refers to a file position past the last input
    pub fn validate(&self) -> Result<()> {
        if self.inputs.is_empty() {
            bail!("No input files specified");
        }

        if self.verbose && self.quiet {
            bail!("Cannot use both --verbose and --quiet");
        }

        if !(self.thumbnail_scale.is_finite() && self.thumbnail_scale > 0.0) {
            bail!(
                "Thumbnail scale must be a positive number, got {}",
                self.thumbnail_scale
            );
        }

        for input in &self.inputs {
            if input == &self.output {
                bail!(
                    "Output file cannot be the same as an input file: {}",
                    self.output.display()
                );
            }
        }

        let file_count = self.inputs.len();
        if let Some(reference) = self
            .edits
            .references()
            .find(|r| r.file as usize > file_count)
        {
            bail!(PdfCollateError::InvalidPageReference {
                reference: reference.to_string(),
                details: format!("there are only {file_count} input file(s)"),
            });
        }

        Ok(())
    }

    /// Check if output should be displayed.
    ///
    /// Returns false in JSON mode, and in quiet mode unless doing a dry run.
    pub fn should_print(&self) -> bool {
        !self.json && (!self.quiet || self.dry_run)
    }
}
