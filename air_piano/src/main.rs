//! air_piano entry point.
//!
//! Usage: `air_piano [--config path/to/air_piano.toml]`

use std::path::PathBuf;

use air_piano::app::run;
use air_piano::config::AppConfig;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    #[cfg(feature = "camera")]
    log::info!("Air Piano, camera mode");
    #[cfg(not(feature = "camera"))]
    log::info!("Air Piano, simulation mode (build with --features camera for hardware)");

    let config_path = match parse_args(std::env::args().skip(1)) {
        Ok(p)  => p,
        Err(msg) => {
            eprintln!("{}", msg);
            eprintln!("usage: air_piano [--config <path>]");
            std::process::exit(2);
        }
    };

    let result = AppConfig::load_or_default(config_path.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(run);

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Option<PathBuf>, String> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let p = args.next().ok_or("--config needs a path")?;
                path = Some(PathBuf::from(p));
            }
            other => return Err(format!("unrecognised argument: {}", other)),
        }
    }
    Ok(path)
}
