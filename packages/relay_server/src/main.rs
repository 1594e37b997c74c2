#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use chess_relay_server::config::ServerConfig;

fn main() -> Result<(), std::io::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from_env().map_err(std::io::Error::other)?;
    let threads = config.max_threads;

    actix_web::rt::System::with_tokio_rt(move || {
        log::debug!("Running with {threads} max blocking threads");
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .max_blocking_threads(threads)
            .build()
            .expect("Failed to build tokio runtime")
    })
    .block_on(chess_relay_server::run(config))
}
