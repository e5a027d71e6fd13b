use clap::Parser;
use votebot::cli::{self, Cli, Command, ConfigCommand};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let config_path = args.config.as_deref();

    match args.command {
        Command::Run { scenario } => cli::handle_run(config_path, &scenario).await?,
        Command::Config(ConfigCommand::Show) => cli::handle_config_show(config_path)?,
        Command::Config(ConfigCommand::Path) => cli::handle_config_path(config_path),
        Command::Version => cli::handle_version(),
    }
    Ok(())
}
