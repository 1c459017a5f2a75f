use clap::Parser;
use color_eyre::eyre::Result;

use pybundle::{
    cli, command, config::ProjectJsonLookup, error, lock::PoetryExporter,
};

fn initialize_logger(debug: bool) -> error::Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("pybundle")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli_args = cli::Args::parse();

    initialize_logger(cli_args.debug)?;

    match cli_args.command {
        cli::Command::Build(args) => {
            let options = args.to_options()?;
            let exporter = PoetryExporter::new(args.poetry.clone());
            let config_lookup = ProjectJsonLookup::new();
            command::build::execute(&options, &exporter, &config_lookup)?;
        }
    }

    Ok(())
}
