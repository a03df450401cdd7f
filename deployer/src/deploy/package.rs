//! Zip packaging of the staged application directory
//!
//! The bundle holds the application directory's contents at the archive root
//! (`appspec.yml`, hook scripts, the downloaded artifact), which is the layout
//! CodeDeploy expects for a zip revision.

use std::fs;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tokio::task::spawn_blocking;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::errors::DeployError;
use crate::filesys::dir::{walk_files, Dir, ScratchDir};
use crate::filesys::file::File;
use crate::models::revision::Revision;

/// Zip `app_dir` into `<scratch>/<revision>.zip`
pub async fn package_bundle(
    app_dir: &Dir,
    scratch: &ScratchDir,
    revision: &Revision,
) -> Result<File, DeployError> {
    let bundle = scratch.file(&revision.bundle_file_name());
    info!("Zipping {} into {}", app_dir.path().display(), bundle.path().display());

    let src = app_dir.path().to_path_buf();
    let dest = bundle.path().to_path_buf();
    let entries = spawn_blocking(move || zip_directory(&src, &dest))
        .await
        .map_err(|e| DeployError::Packaging(e.to_string()))?
        .map_err(|e| DeployError::Packaging(e.to_string()))?;

    info!("Packaged {} entries into {}", entries, revision.bundle_file_name());
    Ok(bundle)
}

fn zip_directory(src: &Path, dest: &Path) -> io::Result<usize> {
    let files = walk_files(src)?;
    let out = fs::File::create(dest)?;
    let mut zip = ZipWriter::new(out);

    for path in &files {
        let name = entry_name(src, path)?;
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(file_mode(path)?);

        debug!("Adding {}", name);
        zip.start_file(name, options)?;
        let mut reader = BufReader::new(fs::File::open(path)?);
        io::copy(&mut reader, &mut zip)?;
    }

    zip.finish()?.sync_all()?;
    Ok(files.len())
}

/// Archive entry name: path relative to `root`, always `/`-separated
fn entry_name(root: &Path, path: &Path) -> io::Result<String> {
    let relative: PathBuf = path
        .strip_prefix(root)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?
        .to_path_buf();

    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"))
}

#[cfg(unix)]
fn file_mode(path: &Path) -> io::Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o777)
}

#[cfg(not(unix))]
fn file_mode(_path: &Path) -> io::Result<u32> {
    Ok(0o644)
}
