// Hides the console window on Windows in release builds.
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod hotkey;
mod overlay;
mod power;
mod status;
#[cfg(windows)]
mod tray;
#[cfg(windows)]
mod win;

#[cfg(windows)]
fn main() -> anyhow::Result<()> {
    use anyhow::Context;

    use crate::hotkey::{HotkeyCommand, KeyboardHook};
    use crate::overlay::{OverlayConfig, OverlayManager, register_overlay_class};
    use crate::power::SystemPowerSource;
    use crate::tray::AppEvent;

    tracing_subscriber::fmt::init();
    tracing::info!("starting Desk HUD");

    // Make sure only one instance is running.
    if !win::create_single_instance_mutex() {
        tracing::warn!("another Desk HUD instance is already running");
        return Ok(());
    }

    // Register the Win32 overlay window class (once, before the window is
    // created).
    unsafe {
        register_overlay_class().context("failed to register overlay window class")?;
    }

    // Bring up the overlay on its own thread.
    let manager = OverlayManager::spawn(
        OverlayConfig::default(),
        Box::new(SystemPowerSource::new()),
    )?;

    let (event_tx, event_rx) = crossbeam_channel::unbounded();

    // The toggle hotkey is a primary feature, so a hook that cannot be
    // installed aborts startup.
    let mut hook = KeyboardHook::default();
    let hotkey_tx = event_tx.clone();
    hook.activate(move |command| match command {
        HotkeyCommand::ToggleOverlay => {
            let _ = hotkey_tx.send(AppEvent::ToggleOverlay);
        }
    })
    .context("failed to install the global hotkey hook")?;

    // Create the tray icon and start the application event loop.
    tray::run_tray_event_loop(manager, hook, event_tx, event_rx)?;

    // Run the main Windows message loop.
    win::message_loop();
    Ok(())
}

#[cfg(not(windows))]
fn main() {
    eprintln!("Desk HUD only runs on Windows.");
    std::process::exit(1);
}
