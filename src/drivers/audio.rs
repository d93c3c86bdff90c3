//! System master volume (default playback device)

use super::{AudioPort, EffectorError};
use tracing::debug;

pub struct SystemAudio;

impl SystemAudio {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPort for SystemAudio {
    fn set_volume(&self, fraction: f32) -> Result<(), EffectorError> {
        let fraction = fraction.clamp(0.0, 1.0);
        debug!("System volume → {:.3}", fraction);
        platform::set_master_volume(fraction)
    }

    fn volume(&self) -> Result<f32, EffectorError> {
        platform::master_volume()
    }
}

#[cfg(windows)]
mod platform {
    use super::EffectorError;
    use windows::Win32::Media::Audio::Endpoints::IAudioEndpointVolume;
    use windows::Win32::Media::Audio::{
        eMultimedia, eRender, IMMDeviceEnumerator, MMDeviceEnumerator,
    };
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CLSCTX_ALL, COINIT_MULTITHREADED,
    };

    fn backend(e: windows::core::Error) -> EffectorError {
        EffectorError::Backend(format!("Core Audio: {}", e))
    }

    /// Run `f` against the default render endpoint's volume control
    ///
    /// COM is initialized on the calling thread; repeated initialization
    /// (or a thread already in another apartment) is harmless here.
    fn with_endpoint<T>(
        f: impl FnOnce(&IAudioEndpointVolume) -> windows::core::Result<T>,
    ) -> Result<T, EffectorError> {
        // SAFETY: plain COM calls on interfaces we own for this scope.
        unsafe {
            let _ = CoInitializeEx(None, COINIT_MULTITHREADED);
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(backend)?;
            let device = enumerator
                .GetDefaultAudioEndpoint(eRender, eMultimedia)
                .map_err(backend)?;
            let volume: IAudioEndpointVolume =
                device.Activate(CLSCTX_ALL, None).map_err(backend)?;
            f(&volume).map_err(backend)
        }
    }

    pub fn set_master_volume(fraction: f32) -> Result<(), EffectorError> {
        // SAFETY: a null event context GUID is allowed.
        with_endpoint(|v| unsafe { v.SetMasterVolumeLevelScalar(fraction, std::ptr::null()) })
    }

    pub fn master_volume() -> Result<f32, EffectorError> {
        // SAFETY: see with_endpoint.
        with_endpoint(|v| unsafe { v.GetMasterVolumeLevelScalar() })
    }
}

#[cfg(not(windows))]
mod platform {
    use super::EffectorError;

    pub fn set_master_volume(_fraction: f32) -> Result<(), EffectorError> {
        Err(EffectorError::Unsupported("system volume"))
    }

    pub fn master_volume() -> Result<f32, EffectorError> {
        Err(EffectorError::Unsupported("system volume"))
    }
}
