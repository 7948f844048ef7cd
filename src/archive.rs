//! Local packaging of built documentation.
//!
//! Runs the documentation build and packs the rendered HTML tree into a
//! gzip-compressed tarball whose entries sit at the archive root, ready to
//! be extracted in place on the web host.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::{debug, info};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tar::{Archive, Builder};

use crate::error::{Error, Result};

/// A packed archive on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub size_bytes: u64,
    /// Lowercase hex SHA-256 of the archive file
    pub sha256: String,
}

impl ArchiveInfo {
    /// Reads size and digest of an existing archive.
    pub fn inspect(path: &Path) -> Result<Self> {
        let size_bytes = fs::metadata(path)
            .map_err(|e| {
                Error::Io(io::Error::new(
                    e.kind(),
                    format!("cannot read archive {}: {}", path.display(), e),
                ))
            })?
            .len();

        Ok(Self {
            path: path.to_path_buf(),
            size_bytes,
            sha256: sha256_file(path)?,
        })
    }
}

/// Streams a file through SHA-256 and returns the lowercase hex digest.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Runs a local build command through `sh -c` in `workdir`.
pub fn run_build(command: &str, workdir: &Path) -> Result<()> {
    info!("Running '{}' in {}", command, workdir.display());

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .current_dir(workdir)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| Error::Build(format!("failed to start '{}': {}", command, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Build(format!(
            "'{}' exited with {}: {}",
            command,
            output.status,
            stderr.trim()
        )));
    }

    debug!("Build output: {}", String::from_utf8_lossy(&output.stdout).trim_end());
    Ok(())
}

/// Packs the contents of `source_dir` into a `.tar.gz` at `output`.
///
/// Entries are stored relative to `source_dir` itself, so extracting the
/// archive inside the documentation root recreates the tree directly there.
pub fn create_archive(source_dir: &Path, output: &Path) -> Result<ArchiveInfo> {
    if !source_dir.is_dir() {
        return Err(Error::Build(format!(
            "{} is not a directory",
            source_dir.display()
        )));
    }

    let mut entries: Vec<_> = fs::read_dir(source_dir)?
        .collect::<std::result::Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect();
    entries.sort();

    if entries.is_empty() {
        return Err(Error::Build(format!(
            "{} is empty; was the documentation built?",
            source_dir.display()
        )));
    }

    let source_abs = source_dir.canonicalize()?;
    // A bare file name lands in the current directory
    let parent = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;
    if parent.canonicalize()?.starts_with(&source_abs) {
        return Err(Error::Build(format!(
            "archive {} must not be written inside {}",
            output.display(),
            source_dir.display()
        )));
    }

    debug!(
        "Creating tarball: {} -> {}",
        source_dir.display(),
        output.display()
    );

    let tar_gz = File::create(output)?;
    let enc = GzEncoder::new(tar_gz, Compression::default());
    let mut tar = Builder::new(enc);

    for path in &entries {
        let name = path
            .file_name()
            .ok_or_else(|| Error::Build(format!("unexpected entry {}", path.display())))?;
        if path.is_dir() {
            tar.append_dir_all(name, path)?;
        } else {
            tar.append_path_with_name(path, name)?;
        }
    }

    tar.into_inner()?.finish()?;

    let info = ArchiveInfo::inspect(output)?;
    info!(
        "Packed {} entries from {} into {} ({} bytes)",
        entries.len(),
        source_dir.display(),
        output.display(),
        info.size_bytes
    );
    Ok(info)
}

/// Lists the entry paths stored in a `.tar.gz`.
pub fn list_entries(path: &Path) -> Result<Vec<String>> {
    let mut archive = Archive::new(GzDecoder::new(File::open(path)?));
    let mut names = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        names.push(entry.path()?.to_string_lossy().to_string());
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_html_tree(root: &Path) -> PathBuf {
        let html = root.join("_build").join("html");
        fs::create_dir_all(html.join("_static")).unwrap();
        fs::write(html.join("index.html"), "<html>index</html>").unwrap();
        fs::write(html.join("_static").join("site.css"), "body {}").unwrap();
        html
    }

    #[test]
    fn test_sha256_known_value() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("abc.txt");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            sha256_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_create_archive_entries_at_root() {
        let temp_dir = TempDir::new().unwrap();
        let html = build_html_tree(temp_dir.path());
        let output = temp_dir.path().join("out").join("docs.tar.gz");

        let info = create_archive(&html, &output).unwrap();
        assert!(output.exists());
        assert_eq!(info.size_bytes, fs::metadata(&output).unwrap().len());
        assert_eq!(info.sha256, sha256_file(&output).unwrap());

        let names = list_entries(&output).unwrap();
        assert!(names.iter().any(|n| n == "index.html"));
        assert!(names.iter().any(|n| n == "_static/site.css"));
        assert!(names.iter().all(|n| !n.contains("_build")));
    }

    #[test]
    fn test_create_archive_rejects_empty_or_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let empty = temp_dir.path().join("empty");
        fs::create_dir(&empty).unwrap();
        let output = temp_dir.path().join("docs.tar.gz");

        assert!(matches!(create_archive(&empty, &output), Err(Error::Build(_))));
        assert!(matches!(
            create_archive(&temp_dir.path().join("missing"), &output),
            Err(Error::Build(_))
        ));
    }

    #[test]
    fn test_create_archive_rejects_output_inside_source() {
        let temp_dir = TempDir::new().unwrap();
        let html = build_html_tree(temp_dir.path());
        let output = html.join("docs.tar.gz");
        assert!(matches!(create_archive(&html, &output), Err(Error::Build(_))));
    }

    #[test]
    fn test_create_archive_rejects_bare_output_name_in_current_source() {
        // Tests run from the package root, which is not empty
        let output = Path::new("packed-into-itself.tar.gz");
        assert!(matches!(
            create_archive(Path::new("."), output),
            Err(Error::Build(_))
        ));
        assert!(!output.exists());
    }

    #[test]
    fn test_run_build() {
        let temp_dir = TempDir::new().unwrap();
        run_build("echo built > marker.txt", temp_dir.path()).unwrap();
        assert!(temp_dir.path().join("marker.txt").exists());

        let err = run_build("echo oops >&2; exit 3", temp_dir.path()).unwrap_err();
        match err {
            Error::Build(msg) => assert!(msg.contains("oops")),
            other => panic!("expected build error, got {:?}", other),
        }
    }

    #[test]
    fn test_inspect_missing_archive() {
        let temp_dir = TempDir::new().unwrap();
        assert!(ArchiveInfo::inspect(&temp_dir.path().join("nope.tar.gz")).is_err());
    }
}
