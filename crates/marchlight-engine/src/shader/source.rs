use std::fmt;
use std::path::{Path, PathBuf};

use super::SourceError;

/// Pipeline stage a source is bound to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// WGSL entry point the stage must declare.
    pub const fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vs_main",
            ShaderStage::Fragment => "fs_main",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        })
    }
}

/// How shader read/compile/link failures are treated.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ShaderPolicy {
    /// Failures abort startup with a diagnostic.
    #[default]
    Strict,
    /// Legacy behavior: unreadable files become empty sources, compile and
    /// link failures are logged, and the (unusable) program is kept.
    Lenient,
}

/// Text of one shader stage.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSource {
    pub stage: ShaderStage,
    pub path: PathBuf,
    pub text: String,
}

impl ShaderSource {
    pub fn new(stage: ShaderStage, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            stage,
            path: path.into(),
            text: text.into(),
        }
    }

    /// Reads the whole file. No partial reads: either the full text or an error.
    pub fn read(stage: ShaderStage, path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                log::debug!("read {stage} shader `{}` ({} bytes)", path.display(), text.len());
                Ok(Self::new(stage, path, text))
            }
            Err(source) => Err(SourceError {
                stage,
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Reads the file, falling back to an empty source.
    ///
    /// A failure is logged once, naming the path.
    pub fn read_lenient(stage: ShaderStage, path: impl AsRef<Path>) -> Self {
        Self::read_or_report(stage, path, |e| log::error!("{e}"))
    }

    fn read_or_report(
        stage: ShaderStage,
        path: impl AsRef<Path>,
        report: impl FnOnce(&SourceError),
    ) -> Self {
        let path = path.as_ref();
        Self::read(stage, path).unwrap_or_else(|e| {
            report(&e);
            Self::new(stage, path, String::new())
        })
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Locations of the two shader files.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    pub fn new(vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        Self {
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// `<dir>/raymarch.vert.wgsl` and `<dir>/raymarch.frag.wgsl`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join("raymarch.vert.wgsl"), dir.join("raymarch.frag.wgsl"))
    }
}

/// Vertex + fragment source pair.
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderSources {
    pub vertex: ShaderSource,
    pub fragment: ShaderSource,
}

impl ShaderSources {
    pub fn load(paths: &ShaderPaths, policy: ShaderPolicy) -> Result<Self, SourceError> {
        let (vertex, fragment) = match policy {
            ShaderPolicy::Strict => (
                ShaderSource::read(ShaderStage::Vertex, &paths.vertex)?,
                ShaderSource::read(ShaderStage::Fragment, &paths.fragment)?,
            ),
            ShaderPolicy::Lenient => (
                ShaderSource::read_lenient(ShaderStage::Vertex, &paths.vertex),
                ShaderSource::read_lenient(ShaderStage::Fragment, &paths.fragment),
            ),
        };
        Ok(Self { vertex, fragment })
    }

    pub fn from_text(vertex: &str, fragment: &str) -> Self {
        Self {
            vertex: ShaderSource::new(ShaderStage::Vertex, "<inline vertex>", vertex),
            fragment: ShaderSource::new(ShaderStage::Fragment, "<inline fragment>", fragment),
        }
    }
}
