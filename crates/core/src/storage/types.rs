//! Types for the storage module.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use uuid::Uuid;

use crate::format::{InputKind, OutputFormat};

/// Opaque, unguessable name of a converted file: `<uuid>.<ext>`.
///
/// Parsing is strict, so anything that parses is a plain file name that
/// cannot escape the working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DownloadId {
    pub id: Uuid,
    pub format: OutputFormat,
}

impl DownloadId {
    /// Generates a new random identifier for the given format.
    pub fn generate(format: OutputFormat) -> Self {
        Self {
            id: Uuid::new_v4(),
            format,
        }
    }

    /// File name on disk, identical to the `Display` form.
    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DownloadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.id.as_hyphenated(), self.format.extension())
    }
}

impl FromStr for DownloadId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (stem, ext) = s.rsplit_once('.').ok_or(())?;
        // Only the canonical hyphenated lowercase form maps back to a file.
        if stem.len() != 36 || stem.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(());
        }
        let id = Uuid::parse_str(stem).map_err(|_| ())?;
        let format = OutputFormat::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or(())?;
        Ok(Self { id, format })
    }
}

/// Suffix of an output that is still being written.
const PARTIAL_SUFFIX: &str = ".part";

/// Where an output is written before it is known to be complete.
pub fn partial_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.as_os_str().to_os_string();
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Whether `name` is a stored upload (`<uuid>_<name>`) or a partial output
/// (`<uuid>.<ext>.part`). Such files only live as long as one request.
pub(crate) fn is_scratch_name(name: &str) -> bool {
    if let Some(output) = name.strip_suffix(PARTIAL_SUFFIX) {
        return output.parse::<DownloadId>().is_ok();
    }
    match name.split_once('_') {
        Some((prefix, rest)) => {
            !rest.is_empty() && prefix.len() == 36 && Uuid::parse_str(prefix).is_ok()
        }
        None => false,
    }
}

/// An uploaded file persisted for the lifetime of one request.
#[derive(Debug, Clone)]
pub struct StoredInput {
    /// Absolute or working-directory-relative path of the stored upload.
    pub path: PathBuf,
    /// Conversion path resolved at validation time.
    pub kind: InputKind,
}
