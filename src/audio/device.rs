//! Input device resolution and stream configuration

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, SampleFormat, StreamConfig, SupportedStreamConfig};

use crate::config::VoiceConfig;
use crate::error::AudioError;

/// Resolve the configured capture device: `"Default"` selects the
/// platform default input, anything else is matched against the active
/// input device names.
pub fn resolve_input_device(name: &str) -> Result<Device, AudioError> {
    let host = cpal::default_host();

    if name == VoiceConfig::DEFAULT_DEVICE {
        return host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()));
    }

    let devices = host
        .input_devices()
        .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(format!(
        "could not find device '{name}' (it may have been removed)"
    )))
}

/// The device's native input configuration. Any channel count is
/// accepted (the callback downmixes to mono); a non-float native sample
/// format is rejected.
pub fn native_input_config(device: &Device) -> Result<(StreamConfig, u16, u32), AudioError> {
    let supported: SupportedStreamConfig = device
        .default_input_config()
        .map_err(|e| AudioError::StreamError(e.to_string()))?;

    if supported.sample_format() != SampleFormat::F32 {
        return Err(AudioError::UnsupportedFormat(format!(
            "native sample format is {:?}, expected f32",
            supported.sample_format()
        )));
    }

    let channels = supported.channels();
    let sample_rate = supported.sample_rate().0;
    Ok((supported.config(), channels, sample_rate))
}

/// Names of the active input devices, for device pickers and logs.
pub fn list_input_devices() -> Vec<String> {
    let host = cpal::default_host();
    let mut names = Vec::new();
    if let Ok(devices) = host.input_devices() {
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
    }
    names
}

/// Mix one interleaved input buffer down to mono and append it to `out`.
/// Stereo is the equal-weight channel average; higher counts use
/// `sum / n`.
pub fn downmix_to_mono(interleaved: &[f32], channels: u16, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => out.extend_from_slice(interleaved),
        2 => {
            out.extend(
                interleaved
                    .chunks_exact(2)
                    .map(|pair| (pair[0] + pair[1]) * 0.5),
            );
        }
        n => {
            let n = n as usize;
            let scale = 1.0 / n as f32;
            out.extend(
                interleaved
                    .chunks_exact(n)
                    .map(|frame| frame.iter().sum::<f32>() * scale),
            );
        }
    }
}
