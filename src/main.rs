use std::io;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use voice_remote::channel::StatusChannel;
use voice_remote::cli::{Args, Command};
use voice_remote::config::Config;
use voice_remote::endpoint::{redacted_url, SessionKey};
use voice_remote::logging::init_logging;
use voice_remote::now_playing::NowPlayingClient;
use voice_remote::render::Renderer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?.apply(args.overrides());
    init_logging(&config.log_filter);

    let endpoint = config.endpoint()?;
    let key = config.session_key()?;
    let client = NowPlayingClient::new(endpoint, config.request_timeout());
    let mut renderer = Renderer::stdout();

    match args.command {
        Command::Watch => watch(&client, &key, &mut renderer).await?,
        Command::Playing => {
            let playing = client.fetch(&key).await?;
            renderer.now_playing(playing.as_ref())?;
        }
        other => {
            if let Some(command) = other.audio_command() {
                client.send(command, &key).await?;
                renderer.command_sent(command)?;
            }
        }
    }

    Ok(())
}

/// Follow the session until the server ends it or the user presses Ctrl-C.
async fn watch(
    client: &NowPlayingClient,
    key: &SessionKey,
    renderer: &mut Renderer<io::Stdout>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (refresh_tx, mut refresh_rx) = mpsc::unbounded_channel::<()>();

    let handle = StatusChannel::builder(client.endpoint(), key.clone())
        .on_track_ended(move || {
            let _ = refresh_tx.send(());
        })
        .build()?
        .start();

    info!(panel = %redacted_url(&client.endpoint().panel_url(key)), "watching session");
    redraw(client, key, renderer).await?;
    renderer.controls(client.endpoint(), key)?;

    let mut stopped_by_user = false;
    loop {
        tokio::select! {
            biased;
            Some(()) = refresh_rx.recv() => redraw(client, key, renderer).await?,
            _ = handle.wait_final() => break,
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    warn!(error = %e, "cannot listen for Ctrl-C");
                }
                stopped_by_user = true;
                handle.stop();
                break;
            }
        }
    }

    handle.join().await;
    if !stopped_by_user {
        renderer.session_ended()?;
    }
    Ok(())
}

async fn redraw(
    client: &NowPlayingClient,
    key: &SessionKey,
    renderer: &mut Renderer<io::Stdout>,
) -> io::Result<()> {
    match client.fetch(key).await {
        Ok(playing) => renderer.now_playing(playing.as_ref()),
        Err(e) => {
            warn!(error = %e, "now playing refresh failed");
            renderer.error(&e.to_string())
        }
    }
}
