use clap::{ArgAction, Args, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use vcshim_build::{Pipeline, ShimConfig};

#[derive(Parser)]
#[command(name = "vcshim")]
#[command(author, version, about = "Build a cl launcher with the MSVC environment baked in")]
struct Cli {
    #[command(flatten)]
    options: Options,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct Options {
    /// Config file (default: vcshim.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// vcvars script to use instead of asking vswhere
    #[arg(long, global = true)]
    bootstrap: Option<PathBuf>,

    /// Directory for the generated source and launcher
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Generated source file name
    #[arg(long, global = true)]
    source: Option<PathBuf>,

    /// Launcher executable name
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Real compiler to forward to
    #[arg(long, global = true)]
    compiler: Option<String>,

    /// Less output
    #[arg(short, long, action(ArgAction::Count), global = true)]
    quiet: u8,

    /// More output
    #[arg(short, long, action(ArgAction::Count), global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate, harvest, generate and compile the launcher (default)
    Build,

    /// Print the vcvars script that would be used
    Locate,

    /// Print the harvested environment
    Env,

    /// Write the launcher source without compiling it
    Generate,
}

impl Options {
    fn load_config(&self) -> Result<ShimConfig> {
        let mut config = ShimConfig::discover(self.config.as_deref())?;

        if let Some(bootstrap) = &self.bootstrap {
            config.locate.bootstrap = Some(bootstrap.clone());
        }
        if let Some(out_dir) = &self.out_dir {
            config.launcher.out_dir = out_dir.clone();
        }
        if let Some(source) = &self.source {
            config.launcher.source = source.clone();
        }
        if let Some(output) = &self.output {
            config.launcher.output = output.clone();
        }
        if let Some(compiler) = &self.compiler {
            config.launcher.compiler = compiler.clone();
        }

        Ok(config)
    }

    fn log_level(&self) -> log::LevelFilter {
        let base = std::env::var("RUST_LOG")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(log::LevelFilter::Info);
        shift_level(base, i16::from(self.verbose) - i16::from(self.quiet))
    }
}

fn shift_level(base: log::LevelFilter, by: i16) -> log::LevelFilter {
    let levels = log::LevelFilter::iter().collect::<Vec<_>>();
    let index = (base as i16 + by).clamp(0, levels.len() as i16 - 1);
    levels[index as usize]
}

fn initialize_logging(level: log::LevelFilter) -> Result<()> {
    simple_logger::SimpleLogger::new()
        .with_colors(true)
        .with_level(level)
        .init()
        .into_diagnostic()
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    initialize_logging(cli.options.log_level())?;

    let pipeline = Pipeline::new(cli.options.load_config()?);

    match cli.command.unwrap_or(Commands::Build) {
        Commands::Build => {
            let artifacts = pipeline.run()?;
            println!(
                "Built {} ({} variables)",
                artifacts.executable.display(),
                artifacts.vars.len()
            );
        }

        Commands::Locate => {
            println!("{}", pipeline.locate()?.display());
        }

        Commands::Env => {
            let bootstrap = pipeline.locate()?;
            for var in pipeline.harvest(&bootstrap)? {
                println!("{}={}", var.name, var.value);
            }
        }

        Commands::Generate => {
            let bootstrap = pipeline.locate()?;
            let vars = pipeline.harvest(&bootstrap)?;
            let source = pipeline.generate(&vars)?;
            println!("Wrote {}", source.display());
        }
    }

    Ok(())
}
