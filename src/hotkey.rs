use anyhow::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCode {
    L,
    Other,
}

/// A key-down observed by the global hook, with the modifier that matters
/// for the toggle chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub win_held: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyCommand {
    ToggleOverlay,
}

/// Maps a key event to a command. Only LWin+L maps to anything; a mapped
/// event is consumed by the hook, which also keeps the chord from reaching
/// the shell's lock-workstation handler.
pub fn map_key_event_to_command(event: KeyEvent) -> Option<HotkeyCommand> {
    match (event.key, event.win_held) {
        (KeyCode::L, true) => Some(HotkeyCommand::ToggleOverlay),
        _ => None,
    }
}

/// Process-wide low-level keyboard hook that drives the overlay toggle.
#[derive(Debug, Default)]
pub struct KeyboardHook {
    active: bool,
    #[cfg(windows)]
    backend: platform::KeyboardHookBackend,
}

impl KeyboardHook {
    /// Installs the hook and registers `sink` to receive mapped commands.
    ///
    /// A no-op when already active. Failure here means the toggle hotkey
    /// cannot work at all, so callers treat it as fatal.
    pub fn activate(
        &mut self,
        sink: impl Fn(HotkeyCommand) + Send + Sync + 'static,
    ) -> Result<()> {
        if self.active {
            return Ok(());
        }

        #[cfg(windows)]
        self.backend.install(Box::new(sink))?;
        #[cfg(not(windows))]
        let _ = sink;

        self.active = true;
        Ok(())
    }

    /// Removes the hook. Idempotent; also runs from `Drop`.
    pub fn deactivate(&mut self) {
        if !self.active {
            return;
        }

        #[cfg(windows)]
        if let Err(err) = self.backend.uninstall() {
            tracing::warn!("failed to uninstall keyboard hook: {err}");
        }

        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        #[cfg(windows)]
        {
            self.active && self.backend.is_installed()
        }
        #[cfg(not(windows))]
        {
            self.active
        }
    }
}

impl Drop for KeyboardHook {
    fn drop(&mut self) {
        self.deactivate();
    }
}

#[cfg(windows)]
mod platform {
    use super::{HotkeyCommand, KeyCode, KeyEvent, map_key_event_to_command};
    use anyhow::{Result, anyhow};
    use once_cell::sync::Lazy;
    use std::sync::Mutex;
    use std::thread::JoinHandle;
    use std::time::Duration;
    use windows::Win32::UI::Input::KeyboardAndMouse::{GetAsyncKeyState, VK_L, VK_LWIN};

    type CommandSink = Box<dyn Fn(HotkeyCommand) + Send + Sync>;

    static COMMAND_SINK: Lazy<Mutex<Option<CommandSink>>> = Lazy::new(|| Mutex::new(None));

    #[derive(Debug)]
    struct HookThread {
        thread_id: u32,
        join: JoinHandle<()>,
    }

    #[derive(Debug, Default)]
    pub struct KeyboardHookBackend {
        hook_thread: Option<HookThread>,
    }

    impl KeyboardHookBackend {
        pub fn install(&mut self, sink: CommandSink) -> Result<()> {
            if self.hook_thread.is_some() {
                return Ok(());
            }

            if let Ok(mut guard) = COMMAND_SINK.lock() {
                *guard = Some(sink);
            }

            use windows::Win32::System::LibraryLoader::GetModuleHandleW;
            use windows::Win32::System::Threading::GetCurrentThreadId;
            use windows::Win32::UI::WindowsAndMessaging::{
                DispatchMessageW, GetMessageW, MSG, PM_NOREMOVE, PeekMessageW, SetWindowsHookExW,
                TranslateMessage, UnhookWindowsHookEx, WH_KEYBOARD_LL,
            };

            let (ready_tx, ready_rx) = std::sync::mpsc::sync_channel::<Result<u32>>(1);

            let join = std::thread::spawn(move || {
                let mut msg = MSG::default();
                // Force-create this thread's message queue before reporting
                // readiness.
                unsafe {
                    let _ = PeekMessageW(&mut msg, None, 0, 0, PM_NOREMOVE);
                }

                let thread_id = unsafe { GetCurrentThreadId() };
                let hmodule = match unsafe { GetModuleHandleW(None) } {
                    Ok(h) => h,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        return;
                    }
                };

                let keyboard_hook = match unsafe {
                    SetWindowsHookExW(WH_KEYBOARD_LL, Some(keyboard_hook_proc), Some(hmodule.into()), 0)
                } {
                    Ok(h) if !h.0.is_null() => h,
                    Ok(_) => {
                        let _ = ready_tx.send(Err(anyhow!(windows::core::Error::from_win32())));
                        return;
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow!(err)));
                        return;
                    }
                };

                let _ = ready_tx.send(Ok(thread_id));

                loop {
                    let r = unsafe { GetMessageW(&mut msg, None, 0, 0) };
                    if r.0 <= 0 {
                        break;
                    }
                    unsafe {
                        let _ = TranslateMessage(&msg);
                        DispatchMessageW(&msg);
                    }
                }

                unsafe {
                    let _ = UnhookWindowsHookEx(keyboard_hook);
                }
            });

            let thread_id = ready_rx
                .recv_timeout(Duration::from_secs(2))
                .map_err(|_| anyhow!("keyboard hook thread did not signal readiness"))??;

            self.hook_thread = Some(HookThread { thread_id, join });
            Ok(())
        }

        pub fn uninstall(&mut self) -> Result<()> {
            if let Ok(mut guard) = COMMAND_SINK.lock() {
                *guard = None;
            }

            if let Some(th) = self.hook_thread.take() {
                use windows::Win32::Foundation::{LPARAM, WPARAM};
                use windows::Win32::UI::WindowsAndMessaging::{PostThreadMessageW, WM_QUIT};
                unsafe {
                    let _ = PostThreadMessageW(th.thread_id, WM_QUIT, WPARAM(0), LPARAM(0));
                }
                let _ = th.join.join();
            }

            Ok(())
        }

        pub fn is_installed(&self) -> bool {
            self.hook_thread.is_some()
        }
    }

    fn win_key_held() -> bool {
        unsafe { GetAsyncKeyState(VK_LWIN.0 as i32) < 0 }
    }

    fn map_vk_to_keycode(vk_code: u32) -> KeyCode {
        if vk_code == VK_L.0 as u32 {
            KeyCode::L
        } else {
            KeyCode::Other
        }
    }

    unsafe extern "system" fn keyboard_hook_proc(
        n_code: i32,
        w_param: windows::Win32::Foundation::WPARAM,
        l_param: windows::Win32::Foundation::LPARAM,
    ) -> windows::Win32::Foundation::LRESULT {
        use windows::Win32::UI::WindowsAndMessaging::{
            CallNextHookEx, HC_ACTION, KBDLLHOOKSTRUCT, KBDLLHOOKSTRUCT_FLAGS, WM_KEYDOWN,
            WM_SYSKEYDOWN,
        };

        if n_code == HC_ACTION as i32 {
            let msg = w_param.0 as u32;
            if msg == WM_KEYDOWN || msg == WM_SYSKEYDOWN {
                let info = unsafe { &*(l_param.0 as *const KBDLLHOOKSTRUCT) };
                let injected =
                    (info.flags & KBDLLHOOKSTRUCT_FLAGS(0x10)) != KBDLLHOOKSTRUCT_FLAGS(0);
                if !injected {
                    let event = KeyEvent {
                        key: map_vk_to_keycode(info.vkCode),
                        win_held: win_key_held(),
                    };

                    if let Some(command) = map_key_event_to_command(event) {
                        if let Ok(guard) = COMMAND_SINK.lock() {
                            if let Some(sink) = guard.as_ref() {
                                sink(command);
                            }
                        }
                        // Nonzero swallows the keystroke, so Win+L never
                        // reaches the lock-workstation handler.
                        return windows::Win32::Foundation::LRESULT(1);
                    }
                }
            }
        }

        unsafe { CallNextHookEx(None, n_code, w_param, l_param) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_win_l_to_toggle() {
        assert_eq!(
            map_key_event_to_command(KeyEvent {
                key: KeyCode::L,
                win_held: true,
            }),
            Some(HotkeyCommand::ToggleOverlay)
        );
    }

    #[test]
    fn plain_l_is_ignored() {
        assert_eq!(
            map_key_event_to_command(KeyEvent {
                key: KeyCode::L,
                win_held: false,
            }),
            None
        );
    }

    #[test]
    fn win_with_other_keys_is_ignored() {
        assert_eq!(
            map_key_event_to_command(KeyEvent {
                key: KeyCode::Other,
                win_held: true,
            }),
            None
        );
    }

    #[test]
    fn activate_then_deactivate_round_trips() {
        let mut hook = KeyboardHook::default();
        assert!(!hook.is_active());

        hook.activate(|_| {})
            .expect("hook activate should not fail in tests");
        assert!(hook.is_active());

        hook.deactivate();
        assert!(!hook.is_active());

        // Second deactivation must be a no-op.
        hook.deactivate();
        assert!(!hook.is_active());
    }
}
