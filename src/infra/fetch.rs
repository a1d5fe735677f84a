//! Release artifact download and unpack.
//!
//! The yagna release ships as a zip for Windows and a tar.gz for Linux;
//! the tarball carries a version-qualified top-level folder that must be
//! flattened into the unpack location.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;

use crate::domain::{ProvisionConfig, ProvisionError};

/// Pinned release tag. Release artifacts are assumed stable, so a failed
/// download is an environment problem, not a transient — no retry.
pub const YAGNA_VERSION: &str = "pre-rel-v0.17.1-allocation4";

const RELEASE_BASE_URL: &str = "https://github.com/golemfactory/yagna/releases/download";

/// Host OS families with a published release artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    Windows,
}

impl Platform {
    /// Detect the host platform.
    ///
    /// # Errors
    ///
    /// Any other OS is [`ProvisionError::UnsupportedPlatform`] — fatal,
    /// and raised before any network call.
    pub fn detect() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    /// # Errors
    ///
    /// See [`Platform::detect`].
    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "linux" => Ok(Self::Linux),
            "windows" => Ok(Self::Windows),
            other => Err(ProvisionError::UnsupportedPlatform(other.to_string()).into()),
        }
    }

    /// Release asset filename for this platform.
    #[must_use]
    pub fn archive_name(self) -> String {
        match self {
            Self::Linux => format!("golem-requestor-linux-{YAGNA_VERSION}.tar.gz"),
            Self::Windows => format!("golem-requestor-windows-{YAGNA_VERSION}.zip"),
        }
    }

    /// Full download URL for this platform's asset.
    #[must_use]
    pub fn release_url(self) -> String {
        format!("{RELEASE_BASE_URL}/{YAGNA_VERSION}/{}", self.archive_name())
    }

    /// Top-level folder name inside the Linux tarball.
    fn archive_root(self) -> String {
        match self {
            Self::Linux => format!("golem-requestor-linux-{YAGNA_VERSION}"),
            Self::Windows => format!("golem-requestor-windows-{YAGNA_VERSION}"),
        }
    }
}

/// Download and unpack the pinned release into `cfg.yagna_root()`.
///
/// # Errors
///
/// Fails if the unpack location already exists, the download fails, or the
/// archive cannot be extracted. The downloaded archive is removed on
/// success.
pub fn prepare_release(cfg: &ProvisionConfig, platform: Platform, quiet: bool) -> Result<()> {
    let dest = cfg.yagna_root();
    if dest.exists() {
        return Err(ProvisionError::UnpackDestExists(dest.display().to_string()).into());
    }

    let archive = cfg.service_base_dir().join(platform.archive_name());
    download(&platform.release_url(), &archive, quiet)?;
    unpack(&archive, &dest, platform)?;
    std::fs::remove_file(&archive).with_context(|| format!("removing {}", archive.display()))?;
    Ok(())
}

/// Streamed GET of `url` into `dest`.
///
/// Writes in 64 KiB chunks to a `.partial` sibling, renamed into place on
/// success, so memory use is bounded regardless of archive size.
///
/// # Errors
///
/// Any transport failure or non-2xx status is fatal.
pub fn download(url: &str, dest: &Path, quiet: bool) -> Result<()> {
    let partial = partial_path(dest);

    let response = match ureq::get(url).call() {
        Ok(r) => r,
        Err(ureq::Error::Status(code, _)) => anyhow::bail!("download failed: HTTP {code} ({url})"),
        Err(e) => return Err(anyhow::anyhow!(e).context(format!("downloading {url}"))),
    };

    let total = response
        .header("Content-Length")
        .and_then(|v| v.parse::<u64>().ok());
    let pb = make_progress_bar(quiet, total);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&partial)
        .with_context(|| format!("opening {}", partial.display()))?;

    let mut reader = response.into_reader();
    let copy_result = copy_stream(&mut reader, &mut file, &pb);
    pb.finish_and_clear();
    drop(file);

    // There is no resume; a truncated partial is useless, so don't leave
    // it lying around in the node tree.
    if let Err(e) = copy_result {
        let _ = std::fs::remove_file(&partial);
        return Err(e);
    }

    std::fs::rename(&partial, dest).context("failed to finalize downloaded archive")?;
    Ok(())
}

fn copy_stream(
    reader: &mut impl Read,
    file: &mut File,
    pb: &indicatif::ProgressBar,
) -> Result<()> {
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).context("download interrupted")?;
        if n == 0 {
            return Ok(());
        }
        file.write_all(&buf[..n]).context("download interrupted")?;
        pb.inc(n as u64);
    }
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut s = dest.as_os_str().to_owned();
    s.push(".partial");
    PathBuf::from(s)
}

fn make_progress_bar(quiet: bool, total: Option<u64>) -> indicatif::ProgressBar {
    if quiet {
        return indicatif::ProgressBar::hidden();
    }
    if let Some(t) = total {
        let pb = indicatif::ProgressBar::new(t);
        pb.set_style(
            indicatif::ProgressStyle::default_bar()
                .template("[{bar:40}] {percent}% ({bytes}/{total_bytes})")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        pb
    } else {
        indicatif::ProgressBar::new_spinner()
    }
}

/// Extract `archive` into `dest`.
///
/// `dest` must not already exist — unpacking into an existing tree risks
/// mixing stale and fresh binaries, so this fails rather than merges. On
/// Linux the tarball's version-qualified root folder is flattened into
/// `dest` and the emptied staging area removed.
///
/// # Errors
///
/// Fails on an existing destination or any extraction error.
pub fn unpack(archive: &Path, dest: &Path, platform: Platform) -> Result<()> {
    if dest.exists() {
        return Err(ProvisionError::UnpackDestExists(dest.display().to_string()).into());
    }
    std::fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;

    match platform {
        Platform::Windows => {
            let file =
                File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
            let mut zip = zip::ZipArchive::new(file)
                .with_context(|| format!("reading {}", archive.display()))?;
            zip.extract(dest)
                .with_context(|| format!("extracting into {}", dest.display()))?;
        }
        Platform::Linux => {
            let staging = staging_path(dest)?;
            std::fs::create_dir_all(&staging)
                .with_context(|| format!("creating {}", staging.display()))?;
            let file =
                File::open(archive).with_context(|| format!("opening {}", archive.display()))?;
            let mut tar = tar::Archive::new(GzDecoder::new(file));
            tar.unpack(&staging)
                .with_context(|| format!("extracting into {}", staging.display()))?;
            flatten_into(&staging, dest, &platform.archive_root())?;
            std::fs::remove_dir_all(&staging)
                .with_context(|| format!("removing {}", staging.display()))?;
        }
    }
    Ok(())
}

fn staging_path(dest: &Path) -> Result<PathBuf> {
    let parent = dest
        .parent()
        .with_context(|| format!("{} has no parent directory", dest.display()))?;
    Ok(parent.join(".unpack-staging"))
}

/// Move the archive contents from `staging` into `dest`, stripping the
/// expected version-qualified root folder when present.
fn flatten_into(staging: &Path, dest: &Path, expected_root: &str) -> Result<()> {
    let root = staging.join(expected_root);
    let source = if root.is_dir() { root } else { staging.to_path_buf() };
    let entries =
        std::fs::read_dir(&source).with_context(|| format!("reading {}", source.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("reading {}", source.display()))?;
        let target = dest.join(entry.file_name());
        std::fs::rename(entry.path(), &target)
            .with_context(|| format!("moving {} into {}", entry.path().display(), dest.display()))?;
    }
    Ok(())
}
