use std::{error::Error, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use colored::Colorize;
use compti::{BuildOptions, SiteConfig, publish};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the blog
    Build {
        /// Directory holding site.yaml, content/ and assets/
        #[arg(long, default_value = ".")]
        input: PathBuf,
        /// Output directory, relative to the input directory
        #[arg(long, default_value = "_site")]
        output: PathBuf,
        /// Remove the previous output before building
        #[arg(long)]
        clean: bool,
        /// Don't print build logs
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        // `--quiet` is picked up by the logger directly
        Commands::Build {
            input,
            output,
            clean,
            quiet: _,
        } => {
            let options = BuildOptions {
                output_dir: input.join(output),
                input_dir: input,
                clean_output_dir: clean,
                ..Default::default()
            };

            match build(&options) {
                Ok(_) => ExitCode::SUCCESS,
                Err(err) => {
                    report(err.as_ref());
                    ExitCode::FAILURE
                }
            }
        }
    }
}

fn build(options: &BuildOptions) -> Result<compti::BuildOutput, Box<dyn Error>> {
    let config = SiteConfig::load(&options.site_config_path())?;
    publish(&config, options)
}

fn report(err: &dyn Error) {
    eprintln!("{} {}", "error:".red().bold(), err);

    let mut source = err.source();
    while let Some(cause) = source {
        eprintln!("  {} {}", "caused by:".dimmed(), cause);
        source = cause.source();
    }
}
