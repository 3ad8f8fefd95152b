//! Zip a directory into an archive for packaging.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zip every regular file under `source_dir` into `writer`.
///
/// Entry names are relative to `source_dir` and always `/`-separated.
/// Entries are written in file name order so the archive is stable for a
/// given tree. Returns the number of entries.
pub fn zip_directory<W: Write + io::Seek>(source_dir: &Path, writer: W) -> Result<usize> {
    let mut zip = ZipWriter::new(writer);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut count = 0;
    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .with_context(|| format!("{} is outside the source", entry.path().display()))?;
        let name = entry_name(relative);

        zip.start_file(name.as_str(), options)?;
        let mut file = File::open(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        io::copy(&mut file, &mut zip)?;
        count += 1;
    }
    zip.finish()?.flush()?;

    debug!(source = %source_dir.display(), entries = count, "directory zipped");
    Ok(count)
}

/// Zip `source_dir` into a temporary file, removed when the handle drops.
pub fn pack_directory(source_dir: &Path) -> Result<NamedTempFile> {
    let temp = tempfile::Builder::new()
        .prefix("crx-source-")
        .suffix(".zip")
        .tempfile()
        .context("Failed to create temporary archive")?;
    let writer = BufWriter::new(temp.reopen()?);
    zip_directory(source_dir, writer)?;
    Ok(temp)
}

fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Read};
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("manifest.json"), br#"{"name":"demo"}"#).unwrap();
        std::fs::create_dir_all(dir.path().join("js/lib")).unwrap();
        std::fs::write(dir.path().join("js/lib/util.js"), b"export {}").unwrap();
        std::fs::create_dir_all(dir.path().join("empty")).unwrap();
        dir
    }

    #[test]
    fn test_zip_directory_entries() {
        let dir = tree();
        let mut buf = Cursor::new(Vec::new());
        let count = zip_directory(dir.path(), &mut buf).unwrap();
        assert_eq!(count, 2);

        let mut archive = ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["js/lib/util.js", "manifest.json"]);

        let mut contents = String::new();
        archive
            .by_name("manifest.json")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, r#"{"name":"demo"}"#);
    }

    #[test]
    fn test_pack_directory_to_temp_file() {
        let dir = tree();
        let temp = pack_directory(dir.path()).unwrap();
        let archive = ZipArchive::new(File::open(temp.path()).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        let mut buf = Cursor::new(Vec::new());
        assert_eq!(zip_directory(dir.path(), &mut buf).unwrap(), 0);
        assert!(ZipArchive::new(Cursor::new(buf.into_inner())).unwrap().is_empty());
    }
}
