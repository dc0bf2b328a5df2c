//! Startup errors. Every variant is fatal: the main loop is never entered.

use std::fmt;

use crate::shader::{ProgramError, SourceError};
use crate::volume::VolumeError;

#[derive(Debug)]
pub enum StartupError {
    /// The platform event loop could not be created.
    WindowSystemInit(String),
    WindowCreation(String),
    /// No adapter/device/surface could be set up for the window.
    ContextInit(String),
    ShaderFileUnreadable(SourceError),
    ShaderBuild(ProgramError),
    VolumeUpload(VolumeError),
}

impl StartupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        -1
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::WindowSystemInit(msg) => {
                write!(f, "failed to initialize the window system: {msg}")
            }
            StartupError::WindowCreation(msg) => write!(f, "failed to create window: {msg}"),
            StartupError::ContextInit(msg) => {
                write!(f, "failed to initialize the graphics context: {msg}")
            }
            StartupError::ShaderFileUnreadable(e) => e.fmt(f),
            StartupError::ShaderBuild(e) => e.fmt(f),
            StartupError::VolumeUpload(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::ShaderFileUnreadable(e) => Some(e),
            StartupError::ShaderBuild(e) => Some(e),
            StartupError::VolumeUpload(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SourceError> for StartupError {
    fn from(e: SourceError) -> Self {
        StartupError::ShaderFileUnreadable(e)
    }
}

impl From<ProgramError> for StartupError {
    fn from(e: ProgramError) -> Self {
        StartupError::ShaderBuild(e)
    }
}

impl From<VolumeError> for StartupError {
    fn from(e: VolumeError) -> Self {
        StartupError::VolumeUpload(e)
    }
}
