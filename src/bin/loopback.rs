//! Loopback demo
//!
//! Captures the default microphone, streams voice packets to a local UDP
//! port, and feeds them straight back into a receive worker as if they
//! came from the relay server. Useful for checking the whole pipeline on
//! one machine: watch the mic level and the avatar source queue fill.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use worldvoice::audio::{list_input_devices, CaptureWorker};
use worldvoice::control::{event_channel, ControlMsg, VoiceEvent};
use worldvoice::mixer::AudioSource;
use worldvoice::net::{bind_voice_socket, Datagram, ReceiveWorker};
use worldvoice::world::{Avatar, WorldState};
use worldvoice::VoiceConfig;

const AVATAR_UID: u64 = 1;
const RUN_SECONDS: u64 = 10;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("worldvoice loopback demo");

    println!("\n=== Available input devices ===");
    for name in list_input_devices() {
        println!("  {name}");
    }
    println!();

    // Two sockets stand in for client and server ends of the relay.
    let capture_socket: Arc<dyn Datagram> = Arc::new(bind_voice_socket()?);
    let receive_socket: Arc<dyn Datagram> = Arc::new(bind_voice_socket()?);

    let receive_port = receive_socket.local_addr()?.port();
    let capture_port = capture_socket.local_addr()?.port();

    let config = VoiceConfig {
        server_host: "127.0.0.1".to_string(),
        server_port: receive_port,
        client_avatar_uid: AVATAR_UID,
        ..VoiceConfig::default()
    };

    // Our own avatar, receiving our own stream back.
    let world = Arc::new(WorldState::new());
    let source = Arc::new(AudioSource::new());
    world.upsert_avatar(Avatar {
        uid: AVATAR_UID,
        audio_source: Some(source.clone()),
        audio_stream_id: 0,
        audio_stream_sampling_rate: 48_000,
    });

    let shutdown = Arc::new(AtomicBool::new(false));
    let (event_tx, event_rx) = event_channel();

    let receive_handle = ReceiveWorker::spawn(
        receive_socket,
        format!("127.0.0.1:{capture_port}").parse()?,
        world.clone(),
        shutdown.clone(),
    )?;

    let capture_handle =
        CaptureWorker::spawn(config, capture_socket, event_tx, shutdown.clone())?;

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut volume_dropped = false;
    while started.elapsed() < Duration::from_secs(RUN_SECONDS) {
        // Relay stream announcements into the world state, standing in
        // for the server's avatar updates.
        while let Ok(event) = event_rx.try_recv() {
            match event {
                VoiceEvent::StreamStarted {
                    sampling_rate,
                    flags,
                    stream_id,
                } => {
                    tracing::info!(
                        "stream announcement: rate {sampling_rate}, flags {flags}, id {stream_id:#010x}"
                    );
                    world.note_stream_started(AVATAR_UID, stream_id, sampling_rate);
                }
                VoiceEvent::StreamEnded => tracing::info!("stream ended"),
                VoiceEvent::Log(text) => tracing::info!("{text}"),
            }
        }

        if !volume_dropped && started.elapsed() >= Duration::from_secs(RUN_SECONDS / 2) {
            tracing::info!("halving input volume");
            let _ = capture_handle.control.send(ControlMsg::VolumeChanged(0.5));
            volume_dropped = true;
        }

        if last_report.elapsed() >= Duration::from_secs(1) {
            tracing::info!(
                "mic level {:.3}, source queue {} samples, source level {:.3}",
                capture_handle.level.current(),
                source.queued_samples(),
                source.smoothed_level()
            );
            // Drain the queue the way a mixer would.
            let mut sink = vec![0.0f32; source.queued_samples()];
            source.read_samples(&mut sink);
            last_report = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(20));
    }

    tracing::info!("shutting down");
    shutdown.store(true, Ordering::Release);
    receive_handle.stop();
    capture_handle.join();
    Ok(())
}
