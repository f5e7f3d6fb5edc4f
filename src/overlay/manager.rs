use std::ffi::c_void;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result};
use windows::Win32::Foundation::{HWND, LPARAM, WPARAM};
use windows::Win32::UI::WindowsAndMessaging::{PostMessageW, WM_CLOSE};

use crate::overlay::config::{OverlayConfig, TeardownGuard};
use crate::overlay::window::{WM_TOGGLE_OVERLAY, spawn_overlay};
use crate::power::PowerStatusProvider;

/// Raw window handle that can cross threads (only ever used with
/// `PostMessageW`, which is safe from any thread).
#[derive(Clone, Copy)]
struct SendHwnd(isize);

unsafe impl Send for SendHwnd {}

impl SendHwnd {
    fn to_hwnd(self) -> HWND {
        HWND(self.0 as *mut c_void)
    }
}

/// High-level handle that controls the lifecycle of the overlay window.
///
/// It bridges the gap between the application event loop (hotkey toggles,
/// tray exit) and the low-level Win32 window living on its own thread.
pub struct OverlayManager {
    hwnd: Option<SendHwnd>,
    thread: Option<JoinHandle<()>>,
    teardown: TeardownGuard,
}

impl OverlayManager {
    /// Spawn the overlay window thread and wait for it to come up.
    pub fn spawn(config: OverlayConfig, power: Box<dyn PowerStatusProvider>) -> Result<Self> {
        let (hwnd_tx, hwnd_rx) = mpsc::channel::<usize>();
        let handle = spawn_overlay(config, power, hwnd_tx);

        let ptr = hwnd_rx
            .recv_timeout(Duration::from_secs(2))
            .context("overlay window did not start")?;

        Ok(Self {
            hwnd: Some(SendHwnd(ptr as isize)),
            thread: Some(handle),
            teardown: TeardownGuard::new(),
        })
    }

    /// Flip the overlay between shown and hidden.
    ///
    /// This is non-blocking — it posts the toggle message to the overlay's
    /// message loop which applies the change asynchronously.
    pub fn toggle(&self) {
        if let Some(hwnd) = self.hwnd {
            unsafe {
                let _ = PostMessageW(
                    Some(hwnd.to_hwnd()),
                    WM_TOGGLE_OVERLAY,
                    WPARAM(0),
                    LPARAM(0),
                );
            }
        }
    }

    /// Close the overlay window and join its thread.
    ///
    /// Safe to call any number of times, and called again from `Drop`; only
    /// the first call releases anything.
    pub fn shutdown(&mut self) {
        if !self.teardown.begin() {
            return;
        }
        if let Some(hwnd) = self.hwnd.take() {
            unsafe {
                let _ = PostMessageW(Some(hwnd.to_hwnd()), WM_CLOSE, WPARAM(0), LPARAM(0));
            }
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for OverlayManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
