//! Plays a Media Monarchy stream headlessly and prints every state change
//!
//! The HTTP engine keeps the stream open without decoding it, so this is a
//! handy way to watch the retry and hand-off machinery against the real
//! server.
//!
//! Usage:
//!   cargo run --example now_playing -- [stream] [config.yaml]
//!
//! Exemple:
//!   cargo run --example now_playing -- onair
//!   RUST_LOG=pmomonarchy=debug cargo run --example now_playing -- rock

use pmomonarchy::constants::TEXT_EPISODE_LINK;
use pmomonarchy::{MonarchyConfig, PlayerBuilder, PlayerStatus, ALL_STREAMS};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let stream = args.get(1).cloned().unwrap_or_else(|| "onair".to_string());
    let config_path = args.get(2).map(Path::new);

    let mut config = MonarchyConfig::load(config_path)?;
    config.player.stream = stream;

    let kind = match config.player.stream_kind() {
        Ok(kind) => kind,
        Err(err) => {
            eprintln!("Error: {err}");
            eprintln!();
            eprintln!("Streams:");
            for descriptor in ALL_STREAMS.iter() {
                eprintln!("  {:<10} {}", descriptor.slug, descriptor.display_title);
            }
            std::process::exit(1);
        }
    };

    println!("📻 {} ({})", kind.display_title(), config.api.base_url);

    let player = PlayerBuilder::from_config(config).spawn()?;
    player.toggle_play();

    let mut state = player.subscribe();
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = state.borrow_and_update().clone();
                println!(
                    "[{:?}{}] {}",
                    snapshot.status,
                    if snapshot.loading { " ⏳" } else { "" },
                    snapshot.now_playing
                );
                if let Some(link) = &snapshot.episode_link {
                    println!("    {TEXT_EPISODE_LINK}: {link}");
                }
                if snapshot.status == PlayerStatus::OffAir {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\n⏹  Stopping");
                break;
            }
        }
    }

    player.destroy().await;
    Ok(())
}
