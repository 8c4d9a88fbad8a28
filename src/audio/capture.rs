//! Microphone acquisition via `cpal`.
//!
//! [`Microphone`] is the seam the capture session opens a stream through.
//! [`CpalMicrophone`] is the production implementation: it builds the cpal
//! input stream on a dedicated thread (the stream handle is not `Send` on
//! every platform) and forwards mono `f32` frames over a tokio channel.
//! The returned [`MicStream`] keeps the device open; dropping it stops the
//! stream and releases the microphone.

use std::any::Any;
use std::sync::mpsc as std_mpsc;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors raised while acquiring the microphone.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CaptureError {
    /// The user declined microphone access, or there is no input device.
    #[error("microphone access denied or no input device available")]
    PermissionDenied,

    /// Hardware or driver failure while opening the input stream.
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
}

impl CaptureError {
    /// Classify a backend error message. Platforms report a refused
    /// microphone permission as an ordinary backend error string.
    fn from_backend(message: String) -> Self {
        let lower = message.to_lowercase();
        if ["permission", "denied", "not authorized"]
            .iter()
            .any(|needle| lower.contains(needle))
        {
            CaptureError::PermissionDenied
        } else {
            CaptureError::DeviceUnavailable(message)
        }
    }
}

// ---------------------------------------------------------------------------
// MicStream
// ---------------------------------------------------------------------------

/// An open microphone: mono frames plus whatever keeps the device alive.
pub struct MicStream {
    /// Mono `f32` frames in `[-1.0, 1.0]`, in arrival order.
    pub frames: mpsc::UnboundedReceiver<Vec<f32>>,
    /// Sample rate of the frames in Hz.
    pub sample_rate: u32,
    /// Dropped together with the stream; releases the device.
    handle: Box<dyn Any + Send>,
}

impl MicStream {
    pub fn new(
        frames: mpsc::UnboundedReceiver<Vec<f32>>,
        sample_rate: u32,
        handle: Box<dyn Any + Send>,
    ) -> Self {
        Self {
            frames,
            sample_rate,
            handle,
        }
    }

    /// Stop the device and drop any undelivered frames.
    pub fn close(mut self) {
        self.frames.close();
        drop(self.handle);
    }
}

// ---------------------------------------------------------------------------
// Microphone trait
// ---------------------------------------------------------------------------

/// Source of microphone streams.
///
/// Implementors must be `Send + Sync` so they can be shared behind
/// `Arc<dyn Microphone>`.
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Acquire the input device and start streaming frames.
    async fn open(&self) -> Result<MicStream, CaptureError>;
}

// ---------------------------------------------------------------------------
// downmix
// ---------------------------------------------------------------------------

/// Average interleaved channels into a single mono channel.
///
/// ```
/// use loan_voice::audio::downmix;
///
/// let stereo = [0.5_f32, -0.5, 1.0, 0.0];
/// assert_eq!(downmix(&stereo, 2), vec![0.0, 0.5]);
/// ```
pub fn downmix(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    if channels == 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

// ---------------------------------------------------------------------------
// CpalMicrophone
// ---------------------------------------------------------------------------

/// Keeps the capture thread (and with it the cpal stream) alive.
///
/// Dropping this value signals the thread, which drops the stream and exits
/// on its own.  The drop never waits for the thread.
struct StreamHandle {
    stop_tx: std_mpsc::Sender<()>,
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
        log::debug!("capture: microphone released");
    }
}

/// Microphone backed by the default cpal host.
#[derive(Debug, Clone, Default)]
pub struct CpalMicrophone {
    /// Input device name; `None` selects the host default.
    device_name: Option<String>,
}

impl CpalMicrophone {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn find_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, CaptureError> {
        match name {
            None => host
                .default_input_device()
                .ok_or(CaptureError::PermissionDenied),
            Some(wanted) => host
                .input_devices()
                .map_err(|e| CaptureError::from_backend(e.to_string()))?
                .find(|d| d.name().map(|n| n == wanted).unwrap_or(false))
                .ok_or_else(|| {
                    CaptureError::DeviceUnavailable(format!("input device {wanted:?} not found"))
                }),
        }
    }

    /// Runs on the capture thread: open the device, report the outcome, then
    /// hold the stream until told to stop.
    fn run_stream(
        device_name: Option<String>,
        frame_tx: mpsc::UnboundedSender<Vec<f32>>,
        ready_tx: oneshot::Sender<Result<u32, CaptureError>>,
        stop_rx: std_mpsc::Receiver<()>,
    ) {
        let opened = (|| -> Result<(cpal::Stream, u32, u16), CaptureError> {
            let host = cpal::default_host();
            let device = Self::find_device(&host, device_name.as_deref())?;
            let supported = device
                .default_input_config()
                .map_err(|e| CaptureError::from_backend(e.to_string()))?;

            let sample_format = supported.sample_format();
            let config: cpal::StreamConfig = supported.into();

            let stream = match sample_format {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, frame_tx),
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, frame_tx),
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, frame_tx),
                other => {
                    return Err(CaptureError::DeviceUnavailable(format!(
                        "unsupported sample format {other:?}"
                    )))
                }
            }
            .map_err(|e| CaptureError::from_backend(e.to_string()))?;

            stream
                .play()
                .map_err(|e| CaptureError::from_backend(e.to_string()))?;
            Ok((stream, config.sample_rate.0, config.channels))
        })();

        match opened {
            Ok((stream, sample_rate, channels)) => {
                log::info!("capture: microphone open ({sample_rate} Hz, {channels} ch)");
                if ready_tx.send(Ok(sample_rate)).is_err() {
                    return;
                }
                // Blocks until the handle sends a stop or is dropped.
                let _ = stop_rx.recv();
                drop(stream);
            }
            Err(e) => {
                let _ = ready_tx.send(Err(e));
            }
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    frame_tx: mpsc::UnboundedSender<Vec<f32>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = config.channels;
    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            let samples: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
            // Ignore send errors; the session may already have stopped reading.
            let _ = frame_tx.send(downmix(&samples, channels));
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None,
    )
}

#[async_trait]
impl Microphone for CpalMicrophone {
    async fn open(&self) -> Result<MicStream, CaptureError> {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel();
        let device_name = self.device_name.clone();

        std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || Self::run_stream(device_name, frame_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;

        let handle = StreamHandle { stop_tx };

        let sample_rate = ready_rx.await.map_err(|_| {
            CaptureError::DeviceUnavailable("capture thread exited before the stream opened".into())
        })??;

        Ok(MicStream::new(frame_rx, sample_rate, Box::new(handle)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downmix_mono_is_identity() {
        let mono = [0.1_f32, 0.2, 0.3];
        assert_eq!(downmix(&mono, 1), mono.to_vec());
    }

    #[test]
    fn downmix_stereo_averages_pairs() {
        let stereo = [1.0_f32, 0.0, 0.25, 0.75];
        assert_eq!(downmix(&stereo, 2), vec![0.5, 0.5]);
    }

    #[test]
    fn downmix_zero_channels_treated_as_mono() {
        assert_eq!(downmix(&[0.4_f32], 0), vec![0.4]);
    }

    #[test]
    fn backend_permission_message_maps_to_permission_denied() {
        let err = CaptureError::from_backend("Access denied by the user".into());
        assert_eq!(err, CaptureError::PermissionDenied);
    }

    #[test]
    fn backend_driver_message_maps_to_device_unavailable() {
        let err = CaptureError::from_backend("ALSA function failed".into());
        assert!(matches!(err, CaptureError::DeviceUnavailable(m) if m.contains("ALSA")));
    }

    #[test]
    fn dropping_stream_handle_signals_without_waiting_for_the_thread() {
        use std::time::Duration;

        let (stop_tx, stop_rx) = std_mpsc::channel();
        let (done_tx, done_rx) = std_mpsc::channel();
        std::thread::spawn(move || {
            let _ = stop_rx.recv();
            std::thread::sleep(Duration::from_millis(300));
            let _ = done_tx.send(());
        });

        drop(StreamHandle { stop_tx });

        assert!(done_rx.try_recv().is_err());
        assert!(done_rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn mic_stream_close_runs_handle_drop() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        struct Flag(Arc<AtomicBool>);
        impl Drop for Flag {
            fn drop(&mut self) {
                self.0.store(true, Ordering::SeqCst);
            }
        }

        let released = Arc::new(AtomicBool::new(false));
        let (_tx, rx) = mpsc::unbounded_channel();
        let stream = MicStream::new(rx, 16_000, Box::new(Flag(Arc::clone(&released))));
        stream.close();
        assert!(released.load(Ordering::SeqCst));
    }

    #[test]
    fn cpal_microphone_is_object_safe() {
        let _mic: Box<dyn Microphone> = Box::new(CpalMicrophone::new(None));
    }
}
