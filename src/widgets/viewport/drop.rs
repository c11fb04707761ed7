//! Drag-and-drop onto the viewport.
//!
//! Dropped text is one URI or path per line. Each line loses its `file://`
//! scheme and percent escapes; directories expand to the media files they
//! contain; numbered stills collapse to the first frame of their sequence.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::utils::media;
use crate::utils::sequences::collapse_sequences;

/// Decode `%XX` escapes. Malformed escapes are kept literally.
pub fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2]))
        {
            out.push(hi << 4 | lo);
            i += 3;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// One dropped line to a path, None for blank lines and non-file URIs.
pub fn parse_line(line: &str) -> Option<PathBuf> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let path = if let Some(rest) = line.strip_prefix("file://") {
        // file://host/path keeps only the path; Windows drive paths arrive as /C:/...
        let rest = rest.strip_prefix("localhost").unwrap_or(rest);
        let decoded = percent_decode(rest);
        if decoded.len() > 2 && decoded.as_bytes()[2] == b':' && decoded.starts_with('/') {
            decoded[1..].to_string()
        } else {
            decoded
        }
    } else if line.contains("://") {
        debug!("drop: ignoring non-file uri {}", line);
        return None;
    } else {
        line.to_string()
    };
    Some(PathBuf::from(path))
}

/// Media files directly inside `dir`, sorted.
fn expand_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("drop: cannot read {}: {}", dir.display(), e);
            return Vec::new();
        }
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file() && media::is_media(p))
        .collect();
    files.sort();
    files
}

/// Turn dropped text into the list of files to open.
pub fn dropped_files(text: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in text.lines().filter_map(parse_line) {
        if path.is_dir() {
            files.extend(expand_dir(&path));
        } else {
            files.push(path);
        }
    }
    collapse_sequences(files)
}

/// Same as `dropped_files` for paths the windowing layer already resolved.
pub fn dropped_paths(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            files.extend(expand_dir(&path));
        } else {
            files.push(path);
        }
    }
    collapse_sequences(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("my%20shot%2Fv2"), "my shot/v2");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%4"), "%zz%4");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("file:///tmp/a%20b.exr\r"), Some(PathBuf::from("/tmp/a b.exr")));
        assert_eq!(parse_line("file://localhost/tmp/x.mov"), Some(PathBuf::from("/tmp/x.mov")));
        assert_eq!(parse_line("file:///C:/shots/x.mov"), Some(PathBuf::from("C:/shots/x.mov")));
        assert_eq!(parse_line("/plain/path.png"), Some(PathBuf::from("/plain/path.png")));
        assert_eq!(parse_line("https://example.com/x.mov"), None);
        assert_eq!(parse_line("   "), None);
    }

    #[test]
    fn test_directory_expansion() {
        let dir = std::env::temp_dir().join(format!("mrv_drop_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("mkdir");
        for name in ["s.0002.exr", "s.0001.exr", "s.0003.exr", "clip.mov", "mix.wav", "readme.txt"] {
            fs::write(dir.join(name), b"").expect("write");
        }
        let text = format!("file://{}\n", dir.display());
        let files = dropped_files(&text);
        let names: Vec<_> = files
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["clip.mov", "mix.wav", "s.0001.exr"]);
        fs::remove_dir_all(&dir).ok();
    }
}
