use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use marchlight_engine::shader::{ShaderPaths, ShaderPolicy};
use marchlight_engine::volume::GridExtent;

/// Environment variable naming the directory the default shader pair is read from.
pub const SHADER_DIR_ENV: &str = "MARCHLIGHT_SHADER_DIR";

/// Bundled shader pair, so `cargo run` works from any directory.
const DEFAULT_SHADER_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/shaders");

/// Largest grid edge accepted on the command line.
const MAX_GRID_EDGE: u32 = 256;

pub const USAGE: &str = "\
usage: marchlight [--vertex <path>] [--fragment <path>] [--grid <n>] [--lenient]

  --vertex <path>    vertex stage WGSL (default: $MARCHLIGHT_SHADER_DIR/raymarch.vert.wgsl,
                     falling back to the bundled shaders)
  --fragment <path>  fragment stage WGSL (default: $MARCHLIGHT_SHADER_DIR/raymarch.frag.wgsl)
  --grid <n>         edge length of the cubic voxel grid (default: 32)
  --lenient          keep running with missing or broken shaders";

/// Command-line options of the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerArgs {
    pub shaders: ShaderPaths,
    pub grid: GridExtent,
    pub policy: ShaderPolicy,
    pub help: bool,
}

impl ViewerArgs {
    /// Parses arguments (without the program name).
    ///
    /// `shader_dir` is the value of [`SHADER_DIR_ENV`], if set; explicit
    /// `--vertex`/`--fragment` paths take precedence over it.
    pub fn parse<I>(args: I, shader_dir: Option<PathBuf>) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let dir = shader_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_SHADER_DIR));
        let mut shaders = ShaderPaths::in_dir(&dir);
        let mut grid = GridExtent::default();
        let mut policy = ShaderPolicy::Strict;
        let mut help = false;

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "--vertex" => shaders.vertex = PathBuf::from(value(&mut it, &arg)?),
                "--fragment" => shaders.fragment = PathBuf::from(value(&mut it, &arg)?),
                "--grid" => {
                    let raw = value(&mut it, &arg)?;
                    let n: u32 = raw
                        .parse()
                        .with_context(|| format!("--grid expects a positive integer, got `{raw}`"))?;
                    if n == 0 || n > MAX_GRID_EDGE {
                        bail!("--grid must be in 1..={MAX_GRID_EDGE}, got {n}");
                    }
                    grid = GridExtent::cube(n);
                }
                "--lenient" => policy = ShaderPolicy::Lenient,
                "-h" | "--help" => help = true,
                other => bail!("unknown argument `{other}`"),
            }
        }

        Ok(Self {
            shaders,
            grid,
            policy,
            help,
        })
    }
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String> {
    it.next()
        .with_context(|| format!("{flag} expects a value"))
}
