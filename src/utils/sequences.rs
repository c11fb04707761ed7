//! Image sequence detection utilities
//!
//! Numbered stills ("plate.0001.exr", "plate.0002.exr", ...) open as one
//! sequence through their first frame.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::{ViewportError, ViewportResult};

/// Sequence parts of a numbered file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceName {
    /// Directory plus the stem before the frame number ("/path/seq.")
    pub prefix: String,
    pub number: u64,
    pub ext: String,
    /// Digits in the frame number
    pub padding: usize,
}

impl SequenceName {
    /// Glob matching every frame with the same padding: "/path/seq.????.exr"
    pub fn glob_pattern(&self) -> String {
        format!("{}{}.{}", glob::Pattern::escape(&self.prefix), "?".repeat(self.padding), glob::Pattern::escape(&self.ext))
    }
}

/// Expand a glob pattern into a list of paths
pub fn glob_paths(pattern: &str) -> ViewportResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in glob::glob(pattern)? {
        paths.push(entry.map_err(|e| ViewportError::Io(e.into_error()))?);
    }
    Ok(paths)
}

/// Split a sequence filename into prefix, number, ext and padding
///
/// Example: "/path/seq.0001.exr" -> ("/path/seq.", 1, "exr", 4)
pub fn split_sequence_path(path: &Path) -> Option<SequenceName> {
    let ext = path.extension().and_then(|s| s.to_str())?.to_string();
    let stem = path.file_stem().and_then(|s| s.to_str())?;

    // Find trailing digits in stem
    let digit_start = stem
        .char_indices()
        .rev()
        .take_while(|(_, ch)| ch.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;

    let number_str = &stem[digit_start..];
    let number = number_str.parse::<u64>().ok()?;
    let prefix_local = &stem[..digit_start];

    let mut prefix = String::new();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        prefix.push_str(&parent.to_string_lossy());
        if !prefix.ends_with(std::path::MAIN_SEPARATOR) {
            prefix.push(std::path::MAIN_SEPARATOR);
        }
    }
    prefix.push_str(prefix_local);

    Some(SequenceName {
        prefix,
        number,
        ext,
        padding: number_str.len(),
    })
}

/// Collapse numbered image files into the first frame of each sequence.
///
/// Movies, audio and un-numbered files pass through. Output is sorted.
pub fn collapse_sequences(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut sequences: BTreeMap<(String, String, usize), (u64, PathBuf)> = BTreeMap::new();
    let mut out = Vec::new();

    for path in paths {
        let numbered = super::media::is_image(&path)
            .then(|| split_sequence_path(&path))
            .flatten();
        let Some(seq) = numbered else {
            out.push(path);
            continue;
        };
        let key = (seq.prefix, seq.ext, seq.padding);
        match sequences.get_mut(&key) {
            Some(first) if first.0 <= seq.number => {}
            Some(first) => *first = (seq.number, path),
            None => {
                sequences.insert(key, (seq.number, path));
            }
        }
    }

    for ((prefix, ext, _), (number, path)) in sequences {
        debug!("sequence {}*.{} from frame {}", prefix, ext, number);
        out.push(path);
    }
    out.sort();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_sequence_path() {
        let s = split_sequence_path(Path::new("/shots/seq.0012.exr")).expect("sequence");
        assert_eq!(s.number, 12);
        assert_eq!(s.padding, 4);
        assert_eq!(s.ext, "exr");
        assert!(s.prefix.ends_with("seq."));
        assert!(split_sequence_path(Path::new("/shots/plate.exr")).is_none());
        assert!(split_sequence_path(Path::new("/shots/0001")).is_none());
    }

    #[test]
    fn test_collapse_keeps_first_frame() {
        let paths = vec![
            PathBuf::from("/s/a.0003.exr"),
            PathBuf::from("/s/a.0001.exr"),
            PathBuf::from("/s/a.0002.exr"),
            PathBuf::from("/s/clip.mov"),
            PathBuf::from("/s/b_10.png"),
        ];
        let out = collapse_sequences(paths);
        assert_eq!(
            out,
            vec![
                PathBuf::from("/s/a.0001.exr"),
                PathBuf::from("/s/b_10.png"),
                PathBuf::from("/s/clip.mov"),
            ]
        );
    }

    #[test]
    fn test_glob_pattern_escapes_prefix() {
        let s = split_sequence_path(Path::new("/shots/v[1]/seq.0012.exr")).expect("sequence");
        let pattern = s.glob_pattern();
        assert!(pattern.ends_with("seq.????.exr"));
        assert!(glob::Pattern::new(&pattern).expect("pattern").matches("/shots/v[1]/seq.0099.exr"));
        assert!(!glob::Pattern::new(&pattern).expect("pattern").matches("/shots/v1/seq.0099.exr"));
        assert!(matches!(glob_paths("/tmp/a**"), Err(ViewportError::Pattern(_))));
    }
}
