use std::thread;

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use trayicon::{Icon, MenuBuilder, TrayIconBuilder};

use crate::hotkey::KeyboardHook;
use crate::overlay::OverlayManager;

/// Events handled by the application event loop. The tray icon and the
/// global hotkey both feed this channel.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum AppEvent {
    ShowMenu,
    ToggleOverlay,
    Exit,
}

/// Creates the tray icon and spawns the application event loop.
///
/// The event thread takes ownership of the overlay manager and the keyboard
/// hook; on [`AppEvent::Exit`] it releases both, drops the tray icon, and
/// terminates the process. The `Drop` impls of the manager and hook make a
/// second release attempt harmless.
pub fn run_tray_event_loop(
    mut manager: OverlayManager,
    mut hook: KeyboardHook,
    event_tx: Sender<AppEvent>,
    event_rx: Receiver<AppEvent>,
) -> Result<()> {
    let icon = Icon::from_buffer(include_bytes!("../res/app.ico"), None, None)
        .map_err(|e| anyhow!("failed to load tray icon: {e:?}"))?;

    let menu = MenuBuilder::new().item("Exit", AppEvent::Exit);

    let tray_icon = TrayIconBuilder::new()
        .sender(move |e| {
            let _ = event_tx.send(*e);
        })
        .icon(icon)
        .tooltip("Desk HUD")
        .on_click(AppEvent::ShowMenu)
        .on_right_click(AppEvent::ShowMenu)
        .menu(menu)
        .build()
        .map_err(|e| anyhow!("failed to build tray icon: {e:?}"))?;

    thread::spawn(move || {
        let mut tray_icon = Some(tray_icon);

        for event in event_rx.iter() {
            match event {
                AppEvent::ShowMenu => {
                    if let Some(tray) = tray_icon.as_mut() {
                        let _ = tray.show_menu();
                    }
                }
                AppEvent::ToggleOverlay => manager.toggle(),
                AppEvent::Exit => {
                    tracing::info!("exit requested from tray");
                    hook.deactivate();
                    manager.shutdown();
                    drop(tray_icon.take());
                    std::process::exit(0);
                }
            }
        }
    });

    Ok(())
}
