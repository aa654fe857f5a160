//! Capture worker
//!
//! Owns the microphone session and the outbound voice pipeline. The cpal
//! callback runs on a host-owned thread and only downmixes and appends
//! into the hand-off buffer; the worker thread drains it every 2 ms,
//! applies gain, frames, encodes and sends. The worker announces its
//! stream on startup and re-announces every 2 s so late joiners learn
//! the codec rate and stream id.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use cpal::traits::{DeviceTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::audio::device::{downmix_to_mono, native_input_config, resolve_input_device};
use crate::audio::handoff::HandoffBuffer;
use crate::audio::level::MicLevel;
use crate::codec::pick_codec_rate;
use crate::config::VoiceConfig;
use crate::constants::{CAPTURE_LOOP_SLEEP, HANDSHAKE_INTERVAL, MAX_PENDING_SAMPLES};
use crate::control::{control_channel, ControlMsg, VoiceEvent, STREAM_FLAG_RENEW};
use crate::error::Error;
use crate::net::send::OutboundVoice;
use crate::net::socket::{resolve_server_addr, Datagram};

/// Handle to a running capture worker.
pub struct CaptureHandle {
    /// Control queue: volume changes and shutdown.
    pub control: Sender<ControlMsg>,
    /// Smoothed input level for UI meters.
    pub level: Arc<MicLevel>,
    join: JoinHandle<()>,
}

impl CaptureHandle {
    /// Wait for the worker to exit. Set the shared shutdown flag (or send
    /// [`ControlMsg::Shutdown`]) first.
    pub fn join(self) {
        let _ = self.join.join();
    }
}

pub struct CaptureWorker {
    config: VoiceConfig,
    socket: Arc<dyn Datagram>,
    events: Sender<VoiceEvent>,
    control: Receiver<ControlMsg>,
    shutdown: Arc<AtomicBool>,
    level: Arc<MicLevel>,
}

impl CaptureWorker {
    /// Spawn the capture worker on its own named thread. `shutdown` is
    /// the flag shared with the receive worker; setting it stops the
    /// loop within one iteration.
    pub fn spawn(
        config: VoiceConfig,
        socket: Arc<dyn Datagram>,
        events: Sender<VoiceEvent>,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<CaptureHandle> {
        let (control_tx, control_rx) = control_channel();
        let level = Arc::new(MicLevel::new());
        let worker = CaptureWorker {
            config,
            socket,
            events,
            control: control_rx,
            shutdown,
            level: level.clone(),
        };

        let join = thread::Builder::new()
            .name("voice-capture".to_string())
            .spawn(move || worker.run())?;

        Ok(CaptureHandle {
            control: control_tx,
            level,
            join,
        })
    }

    fn run(mut self) {
        tracing::info!("voice capture worker started");

        if let Err(e) = self.run_inner() {
            tracing::error!("voice capture worker failed: {e}");
            let _ = self.events.send(VoiceEvent::Log(format!("voice capture: {e}")));
        }

        self.level.reset();
        let _ = self.events.send(VoiceEvent::StreamEnded);
        tracing::info!("voice capture worker finished");
    }

    fn run_inner(&mut self) -> Result<(), Error> {
        let device = resolve_input_device(&self.config.input_device_name)?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let _ = self.events.send(VoiceEvent::Log(format!(
            "chose audio input device: '{device_name}'"
        )));

        let (stream_config, channels, capture_rate) = native_input_config(&device)?;

        let handoff = Arc::new(HandoffBuffer::new(MAX_PENDING_SAMPLES));
        let callback_handoff = handoff.clone();
        // Reused across callbacks; the real-time thread must not allocate
        // or block beyond the hand-off mutex.
        let mut mono: Vec<f32> = Vec::with_capacity(4096);
        let stream = device
            .build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    mono.clear();
                    downmix_to_mono(data, channels, &mut mono);
                    callback_handoff.append(&mono);
                },
                |err| tracing::warn!("capture stream error: {err}"),
                None,
            )
            .map_err(|e| crate::error::AudioError::StreamError(e.to_string()))?;
        stream
            .play()
            .map_err(|e| crate::error::AudioError::StreamError(e.to_string()))?;

        let _ = self.events.send(VoiceEvent::Log(format!(
            "listening on '{device_name}': {capture_rate} hz, {channels} channels, volume scale {:.2}",
            self.config.initial_volume_scale
        )));

        let codec_rate = pick_codec_rate(capture_rate);
        let stream_id = OsRng.next_u32();

        let _ = self.events.send(VoiceEvent::StreamStarted {
            sampling_rate: codec_rate,
            flags: 0,
            stream_id,
        });

        // Server address is resolved once; the first result is used for
        // every packet of the stream.
        let server_addr = resolve_server_addr(&self.config.server_host, self.config.server_port)?;

        let mut outbound = OutboundVoice::new(
            self.socket.clone(),
            server_addr,
            capture_rate,
            self.config.client_avatar_uid as u32,
            self.config.initial_volume_scale,
        )?;

        let mut last_handshake = Instant::now();

        while !self.shutdown.load(Ordering::Acquire) {
            thread::sleep(CAPTURE_LOOP_SLEEP);

            while let Ok(msg) = self.control.try_recv() {
                match msg {
                    ControlMsg::VolumeChanged(scale) => outbound.set_gain(scale),
                    ControlMsg::Shutdown => self.shutdown.store(true, Ordering::Release),
                }
            }

            if last_handshake.elapsed() >= HANDSHAKE_INTERVAL {
                // Re-announce so clients that connected after the first
                // announcement still learn about this stream.
                let _ = self.events.send(VoiceEvent::StreamStarted {
                    sampling_rate: outbound.codec_rate(),
                    flags: STREAM_FLAG_RENEW,
                    stream_id,
                });
                last_handshake = Instant::now();
            }

            // Drain while data is immediately available.
            while !self.shutdown.load(Ordering::Acquire) {
                let Some(max_abs) = outbound.drain_from(&handoff) else {
                    break;
                };
                self.level.update(max_abs);
                outbound.pump();
            }
        }

        // Encoder and resampler are dropped with the pipeline; stop the
        // device before returning.
        drop(outbound);
        let _ = stream.pause();
        drop(stream);
        Ok(())
    }
}
