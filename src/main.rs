//! Главный исполняемый файл txsim

use txsim::cli::Cli;

fn main() -> anyhow::Result<()> {
    let cli = Cli::init();
    let config = cli.load_config()?;

    env_logger::Builder::new()
        .filter_level(config.level_filter()?)
        .parse_default_env()
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    cli.execute(&config, &mut out)
}
