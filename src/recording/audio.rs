//! Microphone capture with a two-state recording toggle.
//!
//! This module handles audio input device management and PCM sample capture.
//! Audio is captured from the configured input device, converted to mono, and
//! packaged as an in-memory WAV payload when recording stops.

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};

use super::wav::encode_wav;

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Recording toggle state. There are no other states; a failed start leaves
/// the recorder idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Recording,
}

/// Records audio from a specified or default input device.
///
/// Features:
/// - Captures from a specified input device or system default at its native sample rate
/// - Converts multi-channel audio to mono by averaging channels
/// - Clears the capture buffer at the start of each recording
/// - Packages captured samples as a WAV payload on stop
pub struct AudioRecorder {
    /// Actual recording sample rate from device
    sample_rate: u32,
    /// Recorded audio samples (i16 PCM mono)
    samples: Arc<Mutex<Vec<i16>>>,
    /// Active audio input stream (kept alive during recording)
    stream: Option<cpal::Stream>,
    /// Device name or "default" to use the system default device
    device_name: String,
    state: RecorderState,
}

impl AudioRecorder {
    /// Creates a new idle audio recorder.
    ///
    /// # Arguments
    /// * `requested_sample_rate` - The desired sample rate in Hz (actual may differ based on device)
    /// * `device_name` - Device name/ID to use. Use "default" for system default device
    ///
    /// Note: The actual recording sample rate may differ based on device capabilities.
    /// Call `sample_rate()` after `start()` to get the actual rate.
    pub fn new(requested_sample_rate: u32, device_name: String) -> Self {
        Self {
            sample_rate: requested_sample_rate,
            samples: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            device_name,
            state: RecorderState::Idle,
        }
    }

    /// Returns the current toggle state.
    pub fn state(&self) -> RecorderState {
        self.state
    }

    /// Starts recording from the configured input device, clearing any
    /// previously captured samples.
    ///
    /// On failure the recorder stays idle.
    ///
    /// # Errors
    /// - If the specified device is not available
    /// - If device configuration fails
    /// - If audio stream creation fails
    pub fn start(&mut self) -> Result<()> {
        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            let host = cpal::default_host();

            if self.device_name == "default" {
                host.default_input_device()
                    .ok_or_else(|| anyhow!("No audio input device available"))
            } else {
                // Try to find device by name or index
                find_device_by_name(&host, &self.device_name)
            }
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let device_config = device.default_input_config()?;
        let device_sample_rate = device_config.sample_rate().0;
        let num_channels = device_config.channels() as usize;

        // Warn if requested sample rate doesn't match device
        if device_sample_rate != self.sample_rate {
            tracing::warn!(
                "Requested sample rate {}Hz but device uses {}Hz. Recording at device rate.",
                self.sample_rate,
                device_sample_rate
            );
        }

        tracing::debug!(
            "Device configuration: {}Hz, {} channels",
            device_sample_rate,
            num_channels
        );

        self.sample_rate = device_sample_rate;
        self.samples.lock().unwrap().clear();

        // Set up audio callback with a cloned Arc reference
        let samples_arc = Arc::clone(&self.samples);
        let callback_channels = num_channels;

        let stream = device.build_input_stream(
            &device_config.into(),
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let mut samples = samples_arc.lock().unwrap();
                downmix_into(data, &mut samples, callback_channels);
            },
            |err| {
                tracing::error!("Audio stream error: {}", err);
            },
            None,
        )?;

        stream.play()?;
        self.stream = Some(stream);
        self.state = RecorderState::Recording;

        tracing::debug!("Audio stream started");
        Ok(())
    }

    /// Stops recording and returns the captured audio as a WAV payload.
    ///
    /// The microphone stream is released by dropping it. An immediate stop
    /// with no captured samples still returns a well-formed (empty) payload.
    ///
    /// # Errors
    /// - If WAV encoding fails
    pub fn stop(&mut self) -> Result<Vec<u8>> {
        // Dropping the stream releases the microphone
        self.stream = None;
        self.state = RecorderState::Idle;

        let samples = std::mem::take(&mut *self.samples.lock().unwrap());
        let sample_count = samples.len();

        let duration_secs = sample_count as f32 / self.sample_rate as f32;
        tracing::info!(
            "Recording stopped: {:.2}s ({} samples at {}Hz)",
            duration_secs,
            sample_count,
            self.sample_rate
        );

        encode_wav(&samples, self.sample_rate)
    }

    /// Returns a clone of the samples captured so far (for level metering).
    pub fn samples(&self) -> Vec<i16> {
        self.samples.lock().unwrap().clone()
    }

    /// Returns the number of captured samples.
    pub fn sample_count(&self) -> usize {
        self.samples.lock().unwrap().len()
    }

    /// Returns the actual sample rate of the recording.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Appends incoming device samples to the capture buffer as mono.
///
/// Multi-channel audio is converted to mono by averaging all channels.
fn downmix_into(data: &[i16], samples: &mut Vec<i16>, num_channels: usize) {
    match num_channels {
        1 => {
            // Mono: use samples directly
            samples.extend_from_slice(data);
        }
        2 => {
            // Stereo: average pairs of samples
            for chunk in data.chunks_exact(2) {
                let left = chunk[0] as i32;
                let right = chunk[1] as i32;
                let mono = ((left + right) / 2) as i16;
                samples.push(mono);
            }
        }
        _ => {
            // Multi-channel: average all channels per sample
            for chunk in data.chunks_exact(num_channels) {
                let sum: i32 = chunk.iter().map(|&s| s as i32).sum();
                let mono = (sum / num_channels as i32) as i16;
                samples.push(mono);
            }
        }
    }
}

/// Finds an audio input device by name or numeric index.
///
/// # Arguments
/// * `host` - The cpal audio host
/// * `device_spec` - Either "default" for system default, a device name, or a numeric index (0, 1, 2, etc.)
///
/// # Errors
/// - If no device with the specified name/index is found
fn find_device_by_name(host: &cpal::Host, device_spec: &str) -> Result<cpal::Device> {
    // Try to parse as a numeric index first
    if let Ok(index) = device_spec.parse::<usize>() {
        let devices: Vec<_> = host
            .input_devices()
            .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?
            .collect();

        if index < devices.len() {
            return Ok(devices.into_iter().nth(index).unwrap());
        } else {
            return Err(anyhow!(
                "Device index {} is out of range (0-{})",
                index,
                devices.len().saturating_sub(1)
            ));
        }
    }

    // Try to find by name
    let devices = host
        .input_devices()
        .map_err(|e| anyhow!("Failed to enumerate devices: {e}"))?;

    for device in devices {
        if let Ok(name) = device.name() {
            if name == device_spec {
                return Ok(device);
            }
        }
    }

    Err(anyhow!(
        "Audio input device '{device_spec}' not found. Use 'parley list-devices' to see available devices."
    ))
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    // Open /dev/null for writing
    let dev_null = OpenOptions::new()
        .write(true)
        .open("/dev/null")
        .map_err(|e| anyhow!("Failed to open /dev/null: {e}"))?;

    let dev_null_fd = dev_null.as_raw_fd();

    // Save the current stderr file descriptor
    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return Err(anyhow!("Failed to duplicate stderr"));
    }

    // Redirect stderr to /dev/null
    let redirect_result = unsafe { libc::dup2(dev_null_fd, libc::STDERR_FILENO) };
    if redirect_result == -1 {
        unsafe { libc::close(old_stderr) };
        return Err(anyhow!("Failed to redirect stderr"));
    }

    // Execute the closure
    let result = f();

    // Restore the original stderr
    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

/// On non-Linux platforms, no stderr suppression is needed since ALSA doesn't exist.
#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    f()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_starts_idle() {
        let recorder = AudioRecorder::new(16000, "default".to_string());
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.sample_count(), 0);
    }

    #[test]
    fn test_start_with_unknown_device_fails_and_stays_idle() {
        let mut recorder = AudioRecorder::new(16000, "no-such-device-xyz".to_string());

        assert!(recorder.start().is_err());
        assert_eq!(recorder.state(), RecorderState::Idle);
        assert_eq!(recorder.sample_count(), 0);
    }

    #[test]
    fn test_stop_without_samples_yields_empty_payload() {
        let mut recorder = AudioRecorder::new(16000, "default".to_string());
        let payload = recorder.stop().unwrap();

        assert_eq!(recorder.state(), RecorderState::Idle);
        let reader = hound::WavReader::new(std::io::Cursor::new(payload)).unwrap();
        assert_eq!(reader.len(), 0);
    }

    #[test]
    fn test_downmix_mono_passthrough() {
        let mut samples = Vec::new();
        downmix_into(&[1, 2, 3], &mut samples, 1);
        assert_eq!(samples, vec![1, 2, 3]);
    }

    #[test]
    fn test_downmix_stereo_averages_pairs() {
        let mut samples = Vec::new();
        downmix_into(&[100, 200, -100, 100], &mut samples, 2);
        assert_eq!(samples, vec![150, 0]);
    }

    #[test]
    fn test_downmix_multichannel_averages_all() {
        let mut samples = Vec::new();
        downmix_into(&[30, 60, 90], &mut samples, 3);
        assert_eq!(samples, vec![60]);
    }
}
