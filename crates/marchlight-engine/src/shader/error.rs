use std::fmt;
use std::io;
use std::path::PathBuf;

use super::ShaderStage;

/// A shader file could not be read.
#[derive(Debug)]
pub struct SourceError {
    pub stage: ShaderStage,
    pub path: PathBuf,
    pub source: io::Error,
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to read {} shader `{}`: {}",
            self.stage,
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for SourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Stage compilation or program linking failed.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramError {
    Compile {
        stage: ShaderStage,
        path: PathBuf,
        log: String,
    },
    Link {
        log: String,
    },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::Compile { stage, path, log } => write!(
                f,
                "{stage} shader `{}` failed to compile:\n{log}",
                path.display()
            ),
            ProgramError::Link { log } => write!(f, "shader program failed to link:\n{log}"),
        }
    }
}

impl std::error::Error for ProgramError {}
