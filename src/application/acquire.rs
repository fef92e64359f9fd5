use crate::domain::clip::SourceVideo;
use crate::domain::error::AcquisitionError;
use crate::ports::fetch::SourceFetcher;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Make sure a non-empty copy of the source video exists at `local_path`.
///
/// An existing non-empty file is used as-is without touching the network. Otherwise
/// the video is streamed into a `.part` sibling and renamed into place once
/// complete; on any failure the partial file is removed.
pub async fn ensure_source<F>(
    fetcher: &F,
    url: &str,
    local_path: &Path,
) -> Result<SourceVideo, AcquisitionError>
where
    F: SourceFetcher + ?Sized,
{
    match tokio::fs::metadata(local_path).await {
        Ok(meta) if meta.is_file() && meta.len() > 0 => {
            info!(path = %local_path.display(), "source video already cached");
            return Ok(SourceVideo::new(local_path.to_path_buf(), meta.len()));
        }
        Ok(meta) if meta.is_file() => {
            warn!(path = %local_path.display(), "cached source video is empty, downloading again");
            remove_if_present(local_path)
                .await
                .map_err(|source| io_error(local_path, source))?;
        }
        _ => {}
    }

    info!(%url, path = %local_path.display(), "source video not cached, downloading");

    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(parent, source))?;
    }

    let part_path = part_path(local_path);
    match download(fetcher, url, &part_path, local_path).await {
        Ok(size) => {
            info!(path = %local_path.display(), size_mb = size as f64 / (1024.0 * 1024.0), "source video downloaded");
            Ok(SourceVideo::new(local_path.to_path_buf(), size))
        }
        Err(e) => {
            if let Err(cleanup) = remove_if_present(&part_path).await {
                warn!(path = %part_path.display(), error = %cleanup, "could not remove partial download");
            }
            Err(e)
        }
    }
}

async fn download<F>(
    fetcher: &F,
    url: &str,
    part_path: &Path,
    local_path: &Path,
) -> Result<u64, AcquisitionError>
where
    F: SourceFetcher + ?Sized,
{
    let size = fetcher.fetch_to(url, part_path).await?;
    if size == 0 {
        return Err(AcquisitionError::Empty {
            url: url.to_string(),
        });
    }
    tokio::fs::rename(part_path, local_path)
        .await
        .map_err(|source| io_error(local_path, source))?;
    Ok(size)
}

fn part_path(local_path: &Path) -> PathBuf {
    let mut name = local_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("source"));
    name.push(".part");
    local_path.with_file_name(name)
}

async fn remove_if_present(path: &Path) -> io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

fn io_error(path: &Path, source: io::Error) -> AcquisitionError {
    AcquisitionError::Io {
        path: path.to_path_buf(),
        source,
    }
}
