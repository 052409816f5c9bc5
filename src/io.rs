//! Storage backends for editor buffers.
//!
//! A location is handed to the first backend whose `can_open_location`
//! accepts it, so more specific backends come first in [`default_backends`].

use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::debug;

use crate::error::{EditorError, Result};

pub trait EditorIo {
    /// Whether this backend handles `location`.
    fn can_open_location(&self, location: &Path) -> bool;

    /// Whether `location` exists in this storage. If not, the buffer is new.
    fn exists(&self, location: &Path) -> bool;

    fn read(&self, location: &Path) -> Result<String>;

    fn write(&self, location: &Path, text: &str) -> Result<()>;

    fn is_dir(&self, _location: &Path) -> bool {
        false
    }
}

pub fn default_backends() -> Vec<Box<dyn EditorIo>> {
    vec![
        Box::new(DirectoryIo),
        Box::new(GzipFileIo),
        Box::new(FileIo),
    ]
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(location: &Path) -> PathBuf {
    if let Ok(rest) = location.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    location.to_path_buf()
}

fn is_remote(location: &Path) -> bool {
    location.to_string_lossy().contains("://")
}

fn decode(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}

/// Native file system.
pub struct FileIo;

impl EditorIo for FileIo {
    fn can_open_location(&self, location: &Path) -> bool {
        !is_remote(location) && !expand_tilde(location).is_dir()
    }

    fn exists(&self, location: &Path) -> bool {
        expand_tilde(location).exists()
    }

    fn read(&self, location: &Path) -> Result<String> {
        let bytes = fs::read(expand_tilde(location))?;
        debug!(target: "io", file = %location.display(), size_bytes = bytes.len(), "file_read_ok");
        Ok(decode(bytes))
    }

    fn write(&self, location: &Path, text: &str) -> Result<()> {
        fs::write(expand_tilde(location), text)?;
        Ok(())
    }
}

/// Gzip files, edited as if they were not compressed.
pub struct GzipFileIo;

impl EditorIo for GzipFileIo {
    fn can_open_location(&self, location: &Path) -> bool {
        FileIo.can_open_location(location)
            && location.extension().map_or(false, |ext| ext == "gz")
    }

    fn exists(&self, location: &Path) -> bool {
        FileIo.exists(location)
    }

    fn read(&self, location: &Path) -> Result<String> {
        let file = fs::File::open(expand_tilde(location))?;
        let mut bytes = Vec::new();
        GzDecoder::new(file).read_to_end(&mut bytes)?;
        Ok(decode(bytes))
    }

    fn write(&self, location: &Path, text: &str) -> Result<()> {
        let file = fs::File::create(expand_tilde(location))?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(text.as_bytes())?;
        encoder.finish()?;
        Ok(())
    }
}

/// Textual listing of a directory, used by the file explorer.
pub struct DirectoryIo;

impl EditorIo for DirectoryIo {
    fn can_open_location(&self, location: &Path) -> bool {
        !is_remote(location) && expand_tilde(location).is_dir()
    }

    fn exists(&self, location: &Path) -> bool {
        expand_tilde(location).is_dir()
    }

    fn read(&self, location: &Path) -> Result<String> {
        let directory = expand_tilde(location);
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in fs::read_dir(&directory)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.path().is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }
        dirs.sort();
        files.sort();

        let absolute = fs::canonicalize(&directory).unwrap_or(directory);
        let mut out = String::new();
        out.push_str("\" ==================================\n");
        out.push_str("\" Directory Listing\n");
        out.push_str(&format!("\"    {}\n", absolute.display()));
        out.push_str("\"    Quick help: -: go up dir\n");
        out.push_str("\" ==================================\n");
        out.push_str("../\n");
        out.push_str("./\n");
        for d in dirs {
            out.push_str(&format!("{}/\n", d));
        }
        for f in files {
            out.push_str(&format!("{}\n", f));
        }
        Ok(out)
    }

    fn write(&self, location: &Path, _text: &str) -> Result<()> {
        Err(EditorError::Unwritable(location.display().to_string()))
    }

    fn is_dir(&self, _location: &Path) -> bool {
        true
    }
}

pub fn backend_for<'a>(
    backends: &'a [Box<dyn EditorIo>],
    location: &Path,
) -> Option<&'a dyn EditorIo> {
    backends
        .iter()
        .find(|io| io.can_open_location(location))
        .map(|io| io.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gzip_round_trip_is_transparent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt.gz");
        let backends = default_backends();
        let io = backend_for(&backends, &path).unwrap();
        io.write(&path, "compressed text\n").unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(io.read(&path).unwrap(), "compressed text\n");
    }

    #[test]
    fn directory_listing_puts_dirs_first() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zsub")).unwrap();
        fs::write(dir.path().join("a.txt"), "x").unwrap();

        let backends = default_backends();
        let io = backend_for(&backends, dir.path()).unwrap();
        assert!(io.is_dir(dir.path()));
        let listing = io.read(dir.path()).unwrap();
        let entries: Vec<&str> = listing.lines().skip(5).collect();
        assert_eq!(entries, vec!["../", "./", "zsub/", "a.txt"]);
        assert!(io.write(dir.path(), "").is_err());
    }

    #[test]
    fn remote_locations_have_no_backend() {
        let backends = default_backends();
        assert!(backend_for(&backends, Path::new("http://example.com/x")).is_none());
    }
}
