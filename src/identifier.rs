//! GoPro filename parsing
//!
//! GoPro cameras name videos `G<kind><chapter><sequence>.<ext>`, e.g.
//! `GH010042.MP4` is chapter 01 of recording 0042. Sorting those names
//! groups chapters of different recordings together, so imported files are
//! renamed to the canonical form `G<sequence>_<chapter>_<kind>` which sorts
//! chronologically.

use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::trace;

/// Pattern: G + kind + 2-digit chapter + 4-digit sequence + 3-char extension
static CAMERA_NAME: OnceLock<Regex> = OnceLock::new();

fn camera_name_pattern() -> &'static Regex {
    CAMERA_NAME.get_or_init(|| {
        Regex::new(r"^G([HXL])(\d{2})(\d{4})\.([^.]{3})$").expect("camera name pattern is valid")
    })
}

/// A filename that does not follow the camera naming convention
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("'{name}' does not match the camera naming convention G<H|X|L><chapter><sequence>.<ext>")]
pub struct ParseError {
    pub name: String,
}

/// Encoding/resolution marker in a camera filename
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VideoKind {
    /// AVC full-resolution video
    H,
    /// HEVC full-resolution video
    X,
    /// Low-resolution preview video
    L,
}

impl VideoKind {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'H' => Some(VideoKind::H),
            'X' => Some(VideoKind::X),
            'L' => Some(VideoKind::L),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            VideoKind::H => 'H',
            VideoKind::X => 'X',
            VideoKind::L => 'L',
        }
    }

    /// Whether files of this kind are full-resolution masters
    pub fn is_full_resolution(&self) -> bool {
        matches!(self, VideoKind::H | VideoKind::X)
    }
}

impl fmt::Display for VideoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Identifier parsed from a camera filename
///
/// Field order matters: the derived `Ord` compares sequence, then chapter,
/// then kind, the same order the canonical name sorts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MediaIdentifier {
    /// Recording number (4 digits)
    pub sequence: u16,
    /// Chapter within the recording (2 digits)
    pub chapter: u8,
    pub kind: VideoKind,
}

impl MediaIdentifier {
    /// Parse a raw camera filename, with or without leading directories
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let name = Path::new(raw)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(raw);

        let error = || ParseError {
            name: name.to_string(),
        };

        let caps = camera_name_pattern().captures(name).ok_or_else(error)?;
        let kind = caps
            .get(1)
            .and_then(|m| m.as_str().chars().next())
            .and_then(VideoKind::from_char)
            .ok_or_else(error)?;
        let chapter = caps[2].parse::<u8>().map_err(|_| error())?;
        let sequence = caps[3].parse::<u16>().map_err(|_| error())?;

        trace!(name, sequence, chapter, %kind, "Parsed camera filename");
        Ok(Self {
            sequence,
            chapter,
            kind,
        })
    }

    /// Parse the final component of a path
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => Self::parse(name),
            None => Err(ParseError {
                name: path.display().to_string(),
            }),
        }
    }

    /// The same recording and chapter with a different kind
    pub fn with_kind(&self, kind: VideoKind) -> Self {
        Self { kind, ..*self }
    }

    /// `G<sequence>_<chapter>`, shared by every kind of the same chapter
    pub fn base_name(&self) -> String {
        format!("G{:04}_{:02}", self.sequence, self.chapter)
    }

    /// `G<sequence>_<chapter>_<kind>`
    pub fn canonical_name(&self) -> String {
        format!("{}_{}", self.base_name(), self.kind)
    }

    /// Canonical name with the given extension appended
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}.{}", self.canonical_name(), extension)
    }
}

impl fmt::Display for MediaIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_name())
    }
}
