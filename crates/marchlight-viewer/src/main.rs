mod args;

use marchlight_engine::device::GpuInit;
use marchlight_engine::frame::PipelineConfig;
use marchlight_engine::logging::{init_logging, LoggingConfig};
use marchlight_engine::window::{Runtime, RuntimeConfig};

use args::{ViewerArgs, SHADER_DIR_ENV, USAGE};

/// Exit code for command-line errors.
const EXIT_USAGE: i32 = 2;

fn main() {
    init_logging(LoggingConfig::default());

    let shader_dir = std::env::var_os(SHADER_DIR_ENV).map(Into::into);
    let args = match ViewerArgs::parse(std::env::args().skip(1), shader_dir) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("marchlight: {e:#}\n\n{USAGE}");
            std::process::exit(EXIT_USAGE);
        }
    };
    if args.help {
        println!("{USAGE}");
        return;
    }

    log::info!(
        "shaders: {} + {}, grid {}",
        args.shaders.vertex.display(),
        args.shaders.fragment.display(),
        args.grid
    );

    let pipeline = PipelineConfig {
        shaders: args.shaders,
        policy: args.policy,
        grid_extent: args.grid,
        ..PipelineConfig::default()
    };

    if let Err(e) = Runtime::run(RuntimeConfig::default(), GpuInit::default(), pipeline) {
        log::error!("{e}");
        std::process::exit(e.exit_code());
    }
}
