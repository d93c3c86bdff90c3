//! Keyboard simulation (media keys and virtual-key codes)

use super::{EffectorError, InputPort, MediaKey};
use tracing::debug;

/// Parse a virtual-key code: decimal (`65`) or hex (`0x41`), 1-254
pub fn parse_key_code(code: &str) -> Result<u8, EffectorError> {
    let trimmed = code.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => trimmed.parse::<u8>(),
    };

    match parsed {
        Ok(vk) if (1..=254).contains(&vk) => Ok(vk),
        _ => Err(EffectorError::InvalidKeyCode(code.to_string())),
    }
}

/// Synthesizes key presses through the OS input queue
pub struct KeyboardInput;

impl KeyboardInput {
    pub fn new() -> Self {
        Self
    }
}

impl Default for KeyboardInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputPort for KeyboardInput {
    fn press_media_key(&self, key: MediaKey) -> Result<(), EffectorError> {
        debug!("Media key {:?}", key);
        platform::press(platform::media_vk(key), true)
    }

    fn press_key(&self, code: &str) -> Result<(), EffectorError> {
        let vk = parse_key_code(code)?;
        debug!("Key press vk=0x{:02X}", vk);
        platform::press(vk, false)
    }
}

#[cfg(windows)]
mod platform {
    use super::{EffectorError, MediaKey};
    use windows::Win32::UI::Input::KeyboardAndMouse::{
        keybd_event, KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, VK_MEDIA_NEXT_TRACK,
        VK_MEDIA_PLAY_PAUSE, VK_MEDIA_PREV_TRACK, VK_MEDIA_STOP,
    };

    pub fn media_vk(key: MediaKey) -> u8 {
        let vk = match key {
            MediaKey::PlayPause => VK_MEDIA_PLAY_PAUSE,
            MediaKey::Next => VK_MEDIA_NEXT_TRACK,
            MediaKey::Prev => VK_MEDIA_PREV_TRACK,
            MediaKey::Stop => VK_MEDIA_STOP,
        };
        vk.0 as u8
    }

    pub fn press(vk: u8, extended: bool) -> Result<(), EffectorError> {
        let base = if extended {
            KEYEVENTF_EXTENDEDKEY
        } else {
            KEYBD_EVENT_FLAGS(0)
        };
        // SAFETY: keybd_event only enqueues input; it has no pointer arguments.
        unsafe {
            keybd_event(vk, 0, base, 0);
            keybd_event(vk, 0, base | KEYEVENTF_KEYUP, 0);
        }
        Ok(())
    }
}

#[cfg(not(windows))]
mod platform {
    use super::{EffectorError, MediaKey};

    pub fn media_vk(key: MediaKey) -> u8 {
        match key {
            MediaKey::PlayPause => 0xB3,
            MediaKey::Next => 0xB0,
            MediaKey::Prev => 0xB1,
            MediaKey::Stop => 0xB2,
        }
    }

    pub fn press(_vk: u8, _extended: bool) -> Result<(), EffectorError> {
        Err(EffectorError::Unsupported("keyboard input"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_code() {
        assert_eq!(parse_key_code("65").unwrap(), 65);
        assert_eq!(parse_key_code("0x41").unwrap(), 0x41);
        assert_eq!(parse_key_code(" 0XB3 ").unwrap(), 0xB3);
    }

    #[test]
    fn test_parse_key_code_rejects_out_of_range() {
        for bad in ["", "0", "255", "256", "-1", "A", "0xZZ"] {
            assert!(
                matches!(parse_key_code(bad), Err(EffectorError::InvalidKeyCode(_))),
                "{:?}",
                bad
            );
        }
    }

    #[test]
    fn test_media_key_codes() {
        assert_eq!(platform::media_vk(MediaKey::PlayPause), 0xB3);
        assert_eq!(platform::media_vk(MediaKey::Next), 0xB0);
        assert_eq!(platform::media_vk(MediaKey::Prev), 0xB1);
        assert_eq!(platform::media_vk(MediaKey::Stop), 0xB2);
    }
}
