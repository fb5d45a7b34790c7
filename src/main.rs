mod app;
mod chat;
mod client;
mod commands;
mod config;
mod logging;
mod playback;
mod recording;
mod session;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
