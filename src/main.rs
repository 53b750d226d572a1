// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app;
mod charts;
mod config;
mod connection;
mod dashboard;
mod decoder;
mod error;
mod port_scanner;
mod readout;
mod sample;
mod timeseries;
mod transport;
mod ui;

use app::PulseScope;
use config::Config;
use connection::ConnectionManager;
use iced::Theme;
use transport::TransportEvent;

fn main() -> iced::Result {
    // On Windows, force wgpu to use Vulkan backend instead of DirectX 12
    #[cfg(target_os = "windows")]
    std::env::set_var("WGPU_BACKEND", "vulkan");

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load().unwrap_or_else(|e| {
        log::warn!("{}, using default settings", e);
        Config::default()
    });
    log::info!("Telemetry host: {}", config.device_host);

    // Transport events flow from the connection thread to the UI thread
    let (sender, receiver) = crossbeam_channel::unbounded::<TransportEvent>();

    let (manager, command_sender) = ConnectionManager::new(sender, &config);

    std::thread::spawn(move || {
        manager.run();
    });

    iced::application(
        "pulse-scope: Pulse Oximetry Telemetry",
        PulseScope::update,
        PulseScope::view,
    )
    .subscription(PulseScope::subscription)
    .theme(|_| Theme::Dark)
    .window_size((1280.0, 860.0))
    .run_with(move || PulseScope::new(receiver, command_sender, &config))
}
