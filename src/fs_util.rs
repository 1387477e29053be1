use std::fs;
use std::io::{Cursor, Read};

use camino::{Utf8Path, Utf8PathBuf};
use directories::UserDirs;
use zip::ZipArchive;

use crate::error::ZotlError;
use crate::transport::RawFile;

/// Turns a `file://` URI reported by the server into a native path.
///
/// On Windows the `file:///` prefix is stripped including the separator in
/// front of the drive letter; on POSIX systems `file://` is stripped and the
/// leading `/` stays. Percent-escapes are decoded before any path handling,
/// then redundant separators and `.` segments are collapsed. The filesystem
/// is never consulted.
pub fn normalize_file_uri(uri: &str) -> Result<Utf8PathBuf, ZotlError> {
    let prefix = if cfg!(windows) { "file:///" } else { "file://" };
    let raw = uri.strip_prefix(prefix).unwrap_or(uri);
    let decoded = urlencoding::decode(raw)
        .map_err(|err| ZotlError::InvalidFileUri(format!("{uri}: {err}")))?;
    Ok(Utf8Path::new(&decoded).components().collect())
}

/// Extracts the first entry of a zip archive. Compressed attachments carry
/// the target file as the first entry; anything after it is ignored and the
/// entry name is not validated against the expected filename.
pub fn unzip_first_entry(bytes: &[u8]) -> Result<Vec<u8>, ZotlError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| ZotlError::Archive(err.to_string()))?;
    if archive.is_empty() {
        return Err(ZotlError::Archive("attachment archive is empty".to_string()));
    }
    let mut entry = archive
        .by_index(0)
        .map_err(|err| ZotlError::Archive(err.to_string()))?;
    let mut content = Vec::new();
    entry
        .read_to_end(&mut content)
        .map_err(|err| ZotlError::Archive(err.to_string()))?;
    Ok(content)
}

/// Unwraps a file response into the attachment's bytes. Decompression
/// requires BOTH the zip content type AND the compression header; either
/// signal alone leaves the payload untouched.
pub fn unwrap_file_payload(raw: RawFile) -> Result<Vec<u8>, ZotlError> {
    let is_zip = raw
        .content_type
        .as_deref()
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim() == "application/zip")
        .unwrap_or(false);
    if is_zip && raw.compressed {
        return unzip_first_entry(&raw.bytes);
    }
    Ok(raw.bytes)
}

/// Copies `source` into `target_dir` under its original base filename,
/// creating the directory if needed and silently overwriting an existing
/// copy. Contents, permissions and file times are carried over; returns the
/// written path.
pub fn copy_into_dir(source: &Utf8Path, target_dir: &Utf8Path) -> Result<Utf8PathBuf, ZotlError> {
    let file_name = source
        .file_name()
        .ok_or_else(|| ZotlError::Filesystem(format!("no filename in {source}")))?;
    fs::create_dir_all(target_dir.as_std_path())
        .map_err(|err| ZotlError::Filesystem(format!("create {target_dir}: {err}")))?;
    let dest = target_dir.join(file_name);
    fs::copy(source.as_std_path(), dest.as_std_path())
        .map_err(|err| ZotlError::Filesystem(format!("copy {source} to {dest}: {err}")))?;
    copy_file_times(source, &dest)?;
    Ok(dest)
}

/// Carries the source's modification and access times onto the copy.
/// `fs::copy` already covers contents and permissions.
fn copy_file_times(source: &Utf8Path, dest: &Utf8Path) -> Result<(), ZotlError> {
    let metadata = fs::metadata(source.as_std_path())
        .map_err(|err| ZotlError::Filesystem(format!("stat {source}: {err}")))?;
    let mut times = fs::FileTimes::new();
    if let Ok(modified) = metadata.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = metadata.accessed() {
        times = times.set_accessed(accessed);
    }
    let file = fs::File::options()
        .write(true)
        .open(dest.as_std_path())
        .map_err(|err| ZotlError::Filesystem(format!("open {dest}: {err}")))?;
    file.set_times(times)
        .map_err(|err| ZotlError::Filesystem(format!("set times on {dest}: {err}")))?;
    Ok(())
}

/// The user's Downloads directory, used when no target is given.
pub fn default_download_dir() -> Result<Utf8PathBuf, ZotlError> {
    let dirs = UserDirs::new()
        .ok_or_else(|| ZotlError::Filesystem("unable to resolve home directory".to_string()))?;
    let dir = dirs
        .download_dir()
        .map(|path| path.to_path_buf())
        .unwrap_or_else(|| dirs.home_dir().join("Downloads"));
    Utf8PathBuf::from_path_buf(dir)
        .map_err(|_| ZotlError::Filesystem("downloads directory is not UTF-8".to_string()))
}
