//! Cache payload archives
//!
//! A payload is a gzip-compressed tar. Entry `N/...` holds the contents of
//! the N-th cached path, so restoring does not depend on absolute paths
//! stored in the archive.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, EntryType};
use tracing::{debug, warn};

/// Archive every existing path into `dest`, returning the archive size in bytes
pub fn pack(paths: &[PathBuf], dest: &Path) -> io::Result<u64> {
    let file = File::create(dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = Builder::new(encoder);

    for (index, path) in paths.iter().enumerate() {
        let name = index.to_string();
        if path.is_dir() {
            builder.append_dir_all(&name, path)?;
        } else if path.is_file() {
            builder.append_path_with_name(path, &name)?;
        } else {
            warn!(path = %path.display(), "Cache path does not exist, skipping");
        }
    }

    let mut writer = builder.into_inner()?.finish()?;
    writer.flush()?;
    drop(writer);

    let size = std::fs::metadata(dest)?.len();
    debug!(archive = %dest.display(), size, "Packed cache archive");
    Ok(size)
}

/// Restore an archive made by [`pack`] onto the same list of paths.
///
/// Every write must land inside its cache path: links pointing out of it
/// are refused, as are entries whose parent resolves outside it.
pub fn unpack(archive: &Path, paths: &[PathBuf]) -> io::Result<()> {
    let file = File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(BufReader::new(file)));

    for entry in tar.entries()? {
        let mut entry = entry?;
        let entry_path = entry.path()?.into_owned();
        let (root, relative) = split_entry(&entry_path, paths)?;

        let dest = if relative.as_os_str().is_empty() {
            root.to_path_buf()
        } else {
            root.join(&relative)
        };

        let dir = match entry.header().entry_type() {
            EntryType::Directory => dest.as_path(),
            EntryType::Link => return Err(escape(&entry_path, "hard links are not allowed")),
            EntryType::Symlink => {
                let target = entry
                    .link_name()?
                    .ok_or_else(|| escape(&entry_path, "symlink without a target"))?;
                if !link_stays_inside(&relative, &target) {
                    return Err(escape(&entry_path, "symlink points outside the cache path"));
                }
                dest.parent().unwrap_or(root)
            }
            _ => dest.parent().unwrap_or(root),
        };

        // A single cached file is written at the root path itself
        if !relative.as_os_str().is_empty() {
            std::fs::create_dir_all(root)?;
            ensure_within(root, dir, &entry_path)?;
        }
        std::fs::create_dir_all(dir)?;
        if entry.header().entry_type() == EntryType::Directory {
            continue;
        }
        entry.unpack(&dest)?;
    }

    debug!(archive = %archive.display(), "Unpacked cache archive");
    Ok(())
}

fn escape(entry: &Path, reason: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("{}: {}", reason, entry.display()),
    )
}

/// Fail unless `dir`, or its deepest existing ancestor, resolves below `root`
fn ensure_within(root: &Path, dir: &Path, entry: &Path) -> io::Result<()> {
    let root = root.canonicalize()?;
    let existing = dir
        .ancestors()
        .find(|a| a.symlink_metadata().is_ok())
        .unwrap_or(dir);
    if existing.canonicalize()?.starts_with(&root) {
        Ok(())
    } else {
        Err(escape(entry, "refusing to unpack outside the cache path"))
    }
}

/// Whether a symlink at `relative` pointing at `target` resolves below its root
fn link_stays_inside(relative: &Path, target: &Path) -> bool {
    // The link lives in relative's parent directory
    let mut depth = relative.components().count().saturating_sub(1) as isize;
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            Component::RootDir | Component::Prefix(_) => return false,
        }
    }
    true
}

/// Map `N/rest` to (`paths[N]`, `rest`), refusing anything that could escape
fn split_entry<'a>(entry: &Path, paths: &'a [PathBuf]) -> io::Result<(&'a Path, PathBuf)> {
    let invalid = |reason: &str| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{}: {}", reason, entry.display()),
        )
    };

    let mut components = entry.components();
    let root = match components.next() {
        Some(Component::Normal(index)) => index
            .to_str()
            .and_then(|s| s.parse::<usize>().ok())
            .and_then(|i| paths.get(i))
            .ok_or_else(|| invalid("unknown cache path index"))?,
        _ => return Err(invalid("unexpected archive entry")),
    };

    let relative = components.as_path().to_path_buf();
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(invalid("refusing to unpack outside the cache path"));
    }

    Ok((root.as_path(), relative))
}
