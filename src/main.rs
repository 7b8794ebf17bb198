use crate::config::Config;
use crate::session::RoomRegistry;
use crate::ws::accept_connection;
use anyhow::Context;
use tokio::net::TcpListener;

mod api;
mod client;
mod config;
mod error;
mod game;
mod session;
mod time;
mod ws;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::try_init().ok();

    let config = Config::from_env().context("invalid configuration")?;
    let registry: &'static RoomRegistry = Box::leak(Box::default());

    let api_addr = config.api_addr();
    tokio::spawn(async move {
        if let Err(err) = api::serve(api_addr, registry).await {
            log::error!("HTTP API stopped: {}", err);
        }
    });

    let addr = config.ws_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind to {}", addr))?;
    log::info!("Listening on: {:?}", addr);

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(accept_connection(stream, registry, config));
    }

    Ok(())
}
