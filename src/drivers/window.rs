//! Foreground window inspection
//!
//! OBS identifies a captured window as `title:class:executable`, with `#` and
//! `:` inside each part escaped as `#22` and `#3A`.

use super::{EffectorError, WindowPort};

fn escape_part(part: &str) -> String {
    part.replace('#', "#22").replace(':', "#3A")
}

/// Build an OBS window-capture descriptor
pub fn window_descriptor(title: &str, class: &str, exe: &str) -> String {
    format!(
        "{}:{}:{}",
        escape_part(title),
        escape_part(class),
        escape_part(exe)
    )
}

pub struct ForegroundWindow;

impl ForegroundWindow {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ForegroundWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl WindowPort for ForegroundWindow {
    fn foreground_window(&self) -> Result<Option<String>, EffectorError> {
        platform::foreground_window()
    }
}

#[cfg(windows)]
mod platform {
    use super::{window_descriptor, EffectorError};
    use std::path::Path;
    use windows::core::PWSTR;
    use windows::Win32::Foundation::{CloseHandle, HWND};
    use windows::Win32::System::Threading::{
        OpenProcess, QueryFullProcessImageNameW, PROCESS_NAME_WIN32,
        PROCESS_QUERY_LIMITED_INFORMATION,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetClassNameW, GetForegroundWindow, GetWindowTextW, GetWindowThreadProcessId,
    };

    pub fn foreground_window() -> Result<Option<String>, EffectorError> {
        // SAFETY: all calls receive valid buffers sized by their slice length.
        unsafe {
            let hwnd = GetForegroundWindow();
            if hwnd == HWND::default() {
                return Ok(None);
            }

            let mut title = [0u16; 512];
            let len = GetWindowTextW(hwnd, &mut title).max(0) as usize;
            let title = String::from_utf16_lossy(&title[..len]);

            let mut class = [0u16; 256];
            let len = GetClassNameW(hwnd, &mut class).max(0) as usize;
            let class = String::from_utf16_lossy(&class[..len]);

            let mut pid = 0u32;
            GetWindowThreadProcessId(hwnd, Some(&mut pid));
            let exe = executable_name(pid)?;

            Ok(Some(window_descriptor(&title, &class, &exe)))
        }
    }

    unsafe fn executable_name(pid: u32) -> Result<String, EffectorError> {
        let process = OpenProcess(PROCESS_QUERY_LIMITED_INFORMATION, false, pid)
            .map_err(|e| EffectorError::Backend(format!("OpenProcess({}): {}", pid, e)))?;

        let mut buf = [0u16; 1024];
        let mut size = buf.len() as u32;
        let result = QueryFullProcessImageNameW(
            process,
            PROCESS_NAME_WIN32,
            PWSTR(buf.as_mut_ptr()),
            &mut size,
        );
        let _ = CloseHandle(process);
        result.map_err(|e| EffectorError::Backend(format!("QueryFullProcessImageName: {}", e)))?;

        let path = String::from_utf16_lossy(&buf[..size as usize]);
        Ok(Path::new(&path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or(path))
    }
}

#[cfg(not(windows))]
mod platform {
    use super::EffectorError;

    pub fn foreground_window() -> Result<Option<String>, EffectorError> {
        Err(EffectorError::Unsupported("foreground window lookup"))
    }
}
