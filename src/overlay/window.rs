use std::ffi::c_void;
use std::sync::{Mutex, MutexGuard, mpsc};

use anyhow::{Context, Result, anyhow};
use chrono::Local;
use windows::Win32::Foundation::{COLORREF, HWND, LPARAM, LRESULT, SIZE, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BeginPaint, CreateFontIndirectW, CreateSolidBrush, DeleteObject, EndPaint, FW_NORMAL, FillRect,
    GetDC, GetTextExtentPoint32W, HBRUSH, HFONT, InvalidateRect, LOGFONTW, PAINTSTRUCT, ReleaseDC,
    SelectObject, SetBkMode, SetTextColor, TRANSPARENT, TextOutW, UpdateWindow,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CS_HREDRAW, CS_VREDRAW, CreateWindowExW, DefWindowProcW, DispatchMessageW, GetMessageW,
    HWND_TOPMOST, KillTimer, LWA_ALPHA, MSG, PostQuitMessage, RegisterClassW, SW_HIDE, SW_SHOW,
    SWP_NOACTIVATE, SWP_NOSIZE, SWP_SHOWWINDOW, SetLayeredWindowAttributes, SetTimer, SetWindowPos,
    ShowWindow, TranslateMessage, WINDOW_EX_STYLE, WM_DESTROY, WM_PAINT, WM_TIMER, WM_USER,
    WNDCLASSW, WS_DISABLED, WS_EX_LAYERED, WS_EX_NOACTIVATE, WS_EX_TOOLWINDOW, WS_EX_TOPMOST,
    WS_EX_TRANSPARENT, WS_POPUP,
};
use windows::core::PCWSTR;

use super::config::{OverlayConfig, OverlayState};
use crate::power::PowerStatusProvider;
use crate::status;

/// Custom window message that toggles the overlay's visibility.
pub const WM_TOGGLE_OVERLAY: u32 = WM_USER + 1;

/// Identifier of the repeating refresh timer.
const TICK_TIMER_ID: usize = 1;

/// Global window class atom — registered once, reused for the overlay window.
static mut WINDOW_CLASS_ATOM: u16 = 0;

// ─── Runtime state ──────────────────────────────────────────────────────────

/// State owned by the overlay thread, shared with its window procedure.
struct OverlayRuntime {
    config: OverlayConfig,
    state: OverlayState,
    text: String,
    /// `HFONT` stored as an integer so the cell stays `Send`.
    font: isize,
    power: Box<dyn PowerStatusProvider>,
}

static RUNTIME: Mutex<Option<OverlayRuntime>> = Mutex::new(None);

/// Locks the runtime cell, recovering from a poisoned mutex.
fn lock_runtime() -> MutexGuard<'static, Option<OverlayRuntime>> {
    RUNTIME.lock().unwrap_or_else(|e| e.into_inner())
}

fn font_handle(raw: isize) -> HFONT {
    HFONT(raw as *mut c_void)
}

// ─── Window procedure ───────────────────────────────────────────────────────

/// Window procedure callback for the overlay window.
///
/// Handles four messages:
/// * `WM_PAINT`          — fills the window with solid black and draws the
///   current status text in white.
/// * `WM_TIMER`          — recomputes the status text and refits the window.
/// * `WM_TOGGLE_OVERLAY` — flips visibility (driven by the global hotkey).
/// * `WM_DESTROY`        — stops the timer, releases the font, and posts a
///   quit message to end the thread's message loop.
unsafe extern "system" fn wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    unsafe {
        match msg {
            WM_PAINT => {
                paint_overlay(hwnd);
                LRESULT(0)
            }
            WM_TIMER if wparam.0 == TICK_TIMER_ID => {
                refresh_overlay(hwnd);
                LRESULT(0)
            }
            WM_TOGGLE_OVERLAY => {
                let visible = lock_runtime().as_mut().map(|rt| rt.state.toggle());
                if let Some(visible) = visible {
                    let _ = ShowWindow(hwnd, if visible { SW_SHOW } else { SW_HIDE });
                }
                LRESULT(0)
            }
            WM_DESTROY => {
                let _ = KillTimer(Some(hwnd), TICK_TIMER_ID);
                if let Some(rt) = lock_runtime().take()
                    && rt.font != 0
                {
                    let _ = DeleteObject(font_handle(rt.font).into());
                }
                PostQuitMessage(0);
                LRESULT(0)
            }
            _ => DefWindowProcW(hwnd, msg, wparam, lparam),
        }
    }
}

// ─── Painting and refresh ───────────────────────────────────────────────────

/// Paints the whole region black, then the status text in white on top.
fn paint_overlay(hwnd: HWND) {
    let (text, font) = match lock_runtime().as_ref() {
        Some(rt) => (rt.text.clone(), rt.font),
        None => (String::new(), 0),
    };

    unsafe {
        let mut ps = PAINTSTRUCT::default();
        let hdc = BeginPaint(hwnd, &mut ps);
        if hdc.is_invalid() {
            return;
        }

        let brush = CreateSolidBrush(COLORREF(0x0000_0000)); // solid black
        if !brush.is_invalid() {
            let _ = FillRect(hdc, &ps.rcPaint, brush);
            let _ = DeleteObject(brush.into());
        }

        if !text.is_empty() && font != 0 {
            let wide: Vec<u16> = text.encode_utf16().collect();
            let old_font = SelectObject(hdc, font_handle(font).into());
            let _ = SetBkMode(hdc, TRANSPARENT);
            let _ = SetTextColor(hdc, COLORREF(0x00FF_FFFF)); // white
            let _ = TextOutW(hdc, 0, 0, &wide);
            SelectObject(hdc, old_font);
        }

        let _ = EndPaint(hwnd, &ps);
    }
}

/// Recomputes the status line, refits the window to it, and schedules a
/// repaint. Runs once at startup and then on every timer tick. Visibility is
/// never touched here, so a hidden overlay stays hidden while it refreshes.
fn refresh_overlay(hwnd: HWND) {
    let (text, font, config) = {
        let mut guard = lock_runtime();
        let Some(rt) = guard.as_mut() else { return };
        let reading = rt.power.read();
        rt.text = status::status_line(Local::now().time(), reading.as_ref());
        (rt.text.clone(), rt.font, rt.config.clone())
    };

    let (text_w, text_h) = measure_text(hwnd, font_handle(font), &text);
    let (w, h) = config.window_size(text_w, text_h);

    unsafe {
        let _ = SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            config.x,
            config.y,
            w,
            h,
            SWP_NOACTIVATE,
        );
        let _ = InvalidateRect(Some(hwnd), None, true);
    }
}

/// Measures the text with the overlay font selected into the window's DC.
fn measure_text(hwnd: HWND, font: HFONT, text: &str) -> (i32, i32) {
    let wide: Vec<u16> = text.encode_utf16().collect();
    let mut size = SIZE::default();
    unsafe {
        let hdc = GetDC(Some(hwnd));
        if hdc.is_invalid() {
            return (0, 0);
        }
        let old_font = SelectObject(hdc, font.into());
        let _ = GetTextExtentPoint32W(hdc, &wide, &mut size);
        SelectObject(hdc, old_font);
        let _ = ReleaseDC(Some(hwnd), hdc);
    }
    (size.cx, size.cy)
}

fn create_overlay_font(height: i32) -> HFONT {
    let mut lf = LOGFONTW::default();
    lf.lfHeight = height;
    lf.lfWeight = FW_NORMAL.0 as i32;
    let face: Vec<u16> = "Segoe UI".encode_utf16().collect();
    lf.lfFaceName[..face.len()].copy_from_slice(&face);
    unsafe { CreateFontIndirectW(&lf) }
}

// ─── Class registration ─────────────────────────────────────────────────────

/// Register the `DeskHudOverlayClass` window class.
///
/// This is idempotent — the class is only registered on the first call.
pub unsafe fn register_overlay_class() -> Result<()> {
    if unsafe { WINDOW_CLASS_ATOM } != 0 {
        return Ok(());
    }

    let hinstance = windows::Win32::Foundation::HINSTANCE(std::ptr::null_mut());
    let class_name: Vec<u16> = "DeskHudOverlayClass\0".encode_utf16().collect();

    let wc = WNDCLASSW {
        lpfnWndProc: Some(wnd_proc),
        hInstance: hinstance,
        lpszClassName: PCWSTR(class_name.as_ptr()),
        style: CS_HREDRAW | CS_VREDRAW,
        hbrBackground: HBRUSH(std::ptr::null_mut()),
        ..Default::default()
    };

    let atom = unsafe { RegisterClassW(&wc) };
    if atom == 0 {
        return Err(anyhow!("failed to register overlay window class"));
    }

    unsafe {
        WINDOW_CLASS_ATOM = atom;
    }
    Ok(())
}

// ─── Window creation ────────────────────────────────────────────────────────

/// Create the overlay window and run its message loop **on the current
/// thread**.
///
/// The window is:
/// * Layered (`WS_EX_LAYERED`) with alpha-based transparency.
/// * Click-through (`WS_EX_TRANSPARENT`, `WS_DISABLED`).
/// * Always on top (`WS_EX_TOPMOST`).
/// * Hidden from the taskbar (`WS_EX_TOOLWINDOW`).
/// * Never steals focus (`WS_EX_NOACTIVATE`).
///
/// Once the window is created its `HWND` (as a `usize`) is sent through
/// `hwnd_tx` so the manager can reference it later.
fn create_overlay_window(
    config: OverlayConfig,
    power: Box<dyn PowerStatusProvider>,
    hwnd_tx: mpsc::Sender<usize>,
) -> Result<()> {
    let font = create_overlay_font(config.font_height);

    {
        let mut guard = lock_runtime();
        *guard = Some(OverlayRuntime {
            config: config.clone(),
            state: OverlayState::new(),
            text: String::new(),
            font: font.0 as isize,
            power,
        });
    }

    unsafe {
        let hinstance = windows::Win32::Foundation::HINSTANCE(std::ptr::null_mut());
        let class_name: Vec<u16> = "DeskHudOverlayClass\0".encode_utf16().collect();
        let window_name: Vec<u16> = "Desk HUD\0".encode_utf16().collect();

        let ex_style = WINDOW_EX_STYLE(
            WS_EX_LAYERED.0
                | WS_EX_TRANSPARENT.0
                | WS_EX_TOPMOST.0
                | WS_EX_TOOLWINDOW.0
                | WS_EX_NOACTIVATE.0,
        );

        let hwnd = match CreateWindowExW(
            ex_style,
            PCWSTR(class_name.as_ptr()),
            PCWSTR(window_name.as_ptr()),
            WS_POPUP | WS_DISABLED,
            config.x,
            config.y,
            200,
            40,
            None,
            None,
            Some(hinstance),
            None,
        ) {
            Ok(hwnd) if !hwnd.0.is_null() => hwnd,
            Ok(_) => {
                drop_runtime_and_font();
                return Err(anyhow!("overlay window handle is null"));
            }
            Err(e) => {
                drop_runtime_and_font();
                return Err(e).context("failed to create overlay window");
            }
        };

        // Notify the caller about the new window handle.
        let _ = hwnd_tx.send(hwnd.0 as usize);

        // Apply the fixed opacity. Losing it leaves the overlay fully opaque
        // but otherwise functional.
        if let Err(e) = SetLayeredWindowAttributes(hwnd, COLORREF(0), config.opacity, LWA_ALPHA) {
            tracing::warn!("failed to apply overlay opacity: {e}");
        }

        // First refresh before the window is shown, so it appears already
        // sized to its text.
        refresh_overlay(hwnd);

        // Show and position the window.
        let _ = ShowWindow(hwnd, SW_SHOW);
        let _ = SetWindowPos(
            hwnd,
            Some(HWND_TOPMOST),
            config.x,
            config.y,
            0,
            0,
            SWP_SHOWWINDOW | SWP_NOACTIVATE | SWP_NOSIZE,
        );
        let _ = UpdateWindow(hwnd);

        let _ = SetTimer(Some(hwnd), TICK_TIMER_ID, config.tick_ms, None);

        // Run the message loop until WM_DESTROY / WM_CLOSE.
        let mut msg = MSG::default();
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }

        Ok(())
    }
}

/// Failure path before the window exists: release what was set up so far.
fn drop_runtime_and_font() {
    if let Some(rt) = lock_runtime().take()
        && rt.font != 0
    {
        unsafe {
            let _ = DeleteObject(font_handle(rt.font).into());
        }
    }
}

// ─── Thread helper ──────────────────────────────────────────────────────────

/// Spawn the overlay on a dedicated background thread.
///
/// Returns the [`JoinHandle`](std::thread::JoinHandle) for the thread so the
/// caller can track its lifetime. The thread exits when the overlay window is
/// closed.
pub fn spawn_overlay(
    config: OverlayConfig,
    power: Box<dyn PowerStatusProvider>,
    hwnd_tx: mpsc::Sender<usize>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || match create_overlay_window(config, power, hwnd_tx) {
        Ok(()) => {}
        Err(e) => tracing::error!("overlay thread error: {e:#}"),
    })
}
