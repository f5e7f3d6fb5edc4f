//! Process-wide Win32 helpers.

use windows::Win32::Foundation::{CloseHandle, ERROR_ALREADY_EXISTS, GetLastError};
use windows::Win32::System::Threading::CreateMutexW;
use windows::Win32::UI::WindowsAndMessaging::{
    DispatchMessageW, GetMessageW, MSG, TranslateMessage,
};
use windows::core::PCWSTR;

/// Creates a named mutex so only one instance runs at a time.
///
/// Returns false when another instance already holds the name. The handle is
/// deliberately kept open for the life of the process.
pub fn create_single_instance_mutex() -> bool {
    let name: Vec<u16> = "DeskHudAppMutex\0".encode_utf16().collect();
    unsafe {
        let Ok(handle) = CreateMutexW(None, false, PCWSTR(name.as_ptr())) else {
            return false;
        };
        if GetLastError() == ERROR_ALREADY_EXISTS {
            let _ = CloseHandle(handle);
            return false;
        }
    }
    true
}

/// Runs the main Windows message loop.
///
/// This is required for the tray icon to receive events.
pub fn message_loop() {
    let mut msg = MSG::default();
    unsafe {
        while GetMessageW(&mut msg, None, 0, 0).as_bool() {
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}
