use garden_app::app::{run, AppConfig, Command};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let result = AppConfig::from_env().and_then(|config| {
        let command = Command::from_args(std::env::args().skip(1))?;
        run(&config, &command)
    });
    match result {
        Ok(output) => println!("{output}"),
        Err(err) => {
            eprintln!("garden: {err:#}");
            std::process::exit(1);
        }
    }
}
