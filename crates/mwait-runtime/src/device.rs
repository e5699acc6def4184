//! Host device registration and the create/close request handler
//!
//! `FsDeviceHost` registers the engine under a directory:
//! - the device endpoint is a file `<dir>/<name>.dev`, created exclusively
//! - the alias is a symlink `<dir>/<name>` pointing at the endpoint

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use mwait_core::{AliasHandle, DeviceError, DeviceHandle, DeviceHost};

/// Endpoint file suffix
pub const DEVICE_SUFFIX: &str = "dev";

fn os_error(e: &io::Error) -> DeviceError {
    DeviceError::Os(e.raw_os_error().unwrap_or(0))
}

fn check_name(name: &str) -> Result<(), DeviceError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(DeviceError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Filesystem-backed device registration
#[derive(Debug, Clone)]
pub struct FsDeviceHost {
    dir: PathBuf,
}

impl FsDeviceHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[cfg(unix)]
    fn link(target: &Path, alias: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, alias)
    }

    #[cfg(not(unix))]
    fn link(target: &Path, alias: &Path) -> io::Result<()> {
        fs::hard_link(target, alias)
    }
}

impl DeviceHost for FsDeviceHost {
    fn create_device(&self, name: &str) -> Result<DeviceHandle, DeviceError> {
        check_name(name)?;
        let location = self.dir.join(format!("{}.{}", name, DEVICE_SUFFIX));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&location)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => DeviceError::Exists(name.to_string()),
                _ => os_error(&e),
            })?;
        // Owner pid, for humans inspecting the directory
        let _ = writeln!(file, "{}", std::process::id());

        Ok(DeviceHandle {
            name: name.to_string(),
            location,
        })
    }

    fn create_alias(&self, alias: &str, device: &DeviceHandle) -> Result<AliasHandle, DeviceError> {
        check_name(alias)?;
        let location = self.dir.join(alias);

        Self::link(&device.location, &location).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => DeviceError::Exists(alias.to_string()),
            _ => os_error(&e),
        })?;

        Ok(AliasHandle {
            name: alias.to_string(),
            location,
        })
    }

    fn delete_alias(&self, alias: AliasHandle) {
        if let Err(e) = fs::remove_file(&alias.location) {
            mwait_core::kwarn!("Unable to delete alias {}: {}", alias.location.display(), e);
        }
    }

    fn delete_device(&self, device: DeviceHandle) {
        if let Err(e) = fs::remove_file(&device.location) {
            mwait_core::kwarn!("Unable to delete device {}: {}", device.location.display(), e);
        }
    }
}

/// Requests accepted by the device endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Create,
    Close,
}

/// Completion of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoStatus {
    pub status: Result<(), DeviceError>,
    /// Bytes transferred
    pub information: usize,
}

impl IoStatus {
    pub fn success() -> Self {
        Self {
            status: Ok(()),
            information: 0,
        }
    }
}

/// Create/close handler: always succeeds with a zero-length result and
/// touches no engine state.
pub fn dispatch(request: Request) -> IoStatus {
    mwait_core::ktrace!("Request {:?}", request);
    IoStatus::success()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mwait-device-{}-{}", tag, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_create_and_delete_device_and_alias() {
        let dir = scratch_dir("roundtrip");
        let host = FsDeviceHost::new(&dir);

        let device = host.create_device("Mwait").unwrap();
        assert_eq!(device.location, dir.join("Mwait.dev"));
        assert!(device.location.exists());

        let alias = host.create_alias("Mwait", &device).unwrap();
        assert_eq!(alias.location, dir.join("Mwait"));
        assert!(alias.location.exists());

        host.delete_alias(alias.clone());
        host.delete_device(device.clone());
        assert!(!alias.location.exists());
        assert!(!device.location.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_second_device_with_same_name_fails() {
        let dir = scratch_dir("exists");
        let host = FsDeviceHost::new(&dir);

        let device = host.create_device("Mwait").unwrap();
        assert_eq!(
            host.create_device("Mwait"),
            Err(DeviceError::Exists("Mwait".into()))
        );
        host.delete_device(device);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let host = FsDeviceHost::new(std::env::temp_dir());
        assert!(matches!(host.create_device(""), Err(DeviceError::InvalidName(_))));
        assert!(matches!(host.create_device("../x"), Err(DeviceError::InvalidName(_))));
    }

    #[test]
    fn test_missing_directory_is_os_error() {
        let host = FsDeviceHost::new("/nonexistent/mwait/dir");
        assert!(matches!(host.create_device("Mwait"), Err(DeviceError::Os(_))));
    }

    #[test]
    fn test_dispatch_is_trivial_success() {
        assert_eq!(dispatch(Request::Create), IoStatus::success());
        let status = dispatch(Request::Close);
        assert!(status.status.is_ok());
        assert_eq!(status.information, 0);
    }
}
