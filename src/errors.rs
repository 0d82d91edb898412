use std::path::{Path, PathBuf};
use std::string::FromUtf8Error;

/// All error types that can occur when working with bulbs and profiles.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to serialize data to JSON.
    #[error("failed to dump json: {0:?}")]
    JsonDump(serde_json::Error),

    /// Failed to deserialize JSON data.
    #[error("failed to load json: {0:?}")]
    JsonLoad(serde_json::Error),

    /// A network socket operation failed while communicating with a bulb.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: std::io::Error },

    /// The UDP response from a bulb contained invalid UTF-8.
    #[error("utf8 decoding error: {0:?}")]
    Utf8Decode(FromUtf8Error),

    /// The bulb answered with an error object instead of a result.
    #[error("bulb rejected request with code {code}: {message}")]
    Device { code: i64, message: String },

    /// Attempted to send a method that only a bulb may originate.
    #[error("method {0} is inbound only and cannot be sent to a bulb")]
    InboundOnly(String),

    /// A hardware address string could not be parsed.
    #[error("invalid mac address: {0:?}")]
    InvalidMac(String),

    /// The bulb handle does not know its hardware address yet.
    #[error("bulb has no known mac address")]
    MissingMac,

    /// The profile document does not exist.
    #[error("profile not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The directory to enumerate profiles in does not exist.
    #[error("directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// No target path (or directory) was configured for the operation.
    #[error("no target path specified")]
    UnspecifiedTarget,

    /// A file system operation failed.
    #[error("io error on {}: {err:?}", path.display())]
    Io { path: PathBuf, err: std::io::Error },
}

impl Error {
    /// Create a new socket error
    pub fn socket(action: &str, err: std::io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }

    /// Create a new file system error
    pub fn io(path: &Path, err: std::io::Error) -> Self {
        Error::Io {
            path: path.to_path_buf(),
            err,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
