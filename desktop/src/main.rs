//! Huddle Desktop Client
//!
//! Chat, simulated calls and an activity dashboard.
//! Built with iced GUI framework.

mod app;
mod config;
mod database;
mod messages;
mod screens;
mod state;
mod theme;

use huddle_core::HuddleClient;
use iced::{Application, Settings, Size};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "huddle_desktop=info,huddle_core=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Huddle Desktop v{}", env!("CARGO_PKG_VERSION"));

    // Get data directory
    let data_dir = dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("huddle");

    std::fs::create_dir_all(&data_dir)?;

    tracing::info!("Data directory: {:?}", data_dir);

    // Load or create config
    let config = config::AppConfig::load(&data_dir).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        config::AppConfig::default()
    });

    // Call timers and store polling run here, independent of the UI executor
    let runtime = tokio::runtime::Runtime::new()?;
    let client = Arc::new(HuddleClient::new(
        config.client.clone(),
        runtime.handle().clone(),
    )?);

    let flags = app::Flags {
        data_dir,
        config,
        client,
    };
    app::Huddle::run(settings(flags))?;

    Ok(())
}

fn settings(flags: app::Flags) -> Settings<app::Flags> {
    Settings {
        window: iced::window::Settings {
            size: Size::new(1200.0, 800.0),
            min_size: Some(Size::new(800.0, 600.0)),
            position: iced::window::Position::Centered,
            ..Default::default()
        },
        default_font: iced::Font::DEFAULT,
        default_text_size: iced::Pixels(flags.config.ui.font_size),
        antialiasing: true,
        id: None,
        fonts: Vec::new(),
        flags,
    }
}
