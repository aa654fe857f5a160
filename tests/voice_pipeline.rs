//! End-to-end pipeline tests over real loopback UDP sockets.
//!
//! An `OutboundVoice` plays the client's send half against a spawned
//! `ReceiveWorker` standing in for a peer: packets cross a real socket
//! pair, decode with a real Opus decoder, and land in the avatar's
//! mixer queue.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use worldvoice::mixer::AudioSource;
use worldvoice::net::{bind_voice_socket, Datagram, OutboundVoice, ReceiveWorker};
use worldvoice::world::{Avatar, WorldState};

const AVATAR_UID: u64 = 7;

struct Harness {
    sender_socket: Arc<dyn Datagram>,
    receiver_addr: SocketAddr,
    world: Arc<WorldState>,
    source: Arc<AudioSource>,
    handle: Option<worldvoice::net::ReceiveHandle>,
}

impl Harness {
    fn start() -> Self {
        let sender_socket: Arc<dyn Datagram> = Arc::new(bind_voice_socket().unwrap());
        let receiver_socket: Arc<dyn Datagram> = Arc::new(bind_voice_socket().unwrap());

        let sender_port = sender_socket.local_addr().unwrap().port();
        let receiver_port = receiver_socket.local_addr().unwrap().port();

        let world = Arc::new(WorldState::new());
        let source = Arc::new(AudioSource::new());
        world.upsert_avatar(Avatar {
            uid: AVATAR_UID,
            audio_source: Some(source.clone()),
            audio_stream_id: 0,
            audio_stream_sampling_rate: 48_000,
        });

        let handle = ReceiveWorker::spawn(
            receiver_socket,
            format!("127.0.0.1:{sender_port}").parse().unwrap(),
            world.clone(),
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();

        Self {
            sender_socket,
            receiver_addr: format!("127.0.0.1:{receiver_port}").parse().unwrap(),
            world,
            source,
            handle: Some(handle),
        }
    }

    fn outbound(&self, stream_id: u32) -> OutboundVoice {
        self.world
            .note_stream_started(AVATAR_UID, stream_id, 48_000);
        OutboundVoice::new(
            self.sender_socket.clone(),
            self.receiver_addr,
            48_000,
            AVATAR_UID as u32,
            1.0,
        )
        .unwrap()
    }

    fn wait_for_queued(&self, at_least: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let queued = self.source.queued_samples();
            if queued >= at_least {
                return queued;
            }
            assert!(
                Instant::now() < deadline,
                "timed out waiting for {at_least} queued samples, have {queued}"
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn stop(mut self) {
        self.handle.take().unwrap().stop();
    }
}

#[test]
fn frames_cross_the_wire_into_the_source_queue() {
    let harness = Harness::start();
    let mut outbound = harness.outbound(1);

    // 50 ms of silence: 5 frames, sequence 0..5.
    outbound.ingest(&vec![0.0f32; 5 * 480]);
    assert_eq!(outbound.pump(), 5);
    assert_eq!(outbound.sequence(), 5);

    let queued = harness.wait_for_queued(5 * 480);
    assert_eq!(queued, 5 * 480);

    harness.stop();
}

#[test]
fn renewal_stream_is_accepted_from_sequence_zero() {
    let harness = Harness::start();

    let mut first = harness.outbound(1);
    first.ingest(&vec![0.0f32; 3 * 480]);
    assert_eq!(first.pump(), 3);
    harness.wait_for_queued(3 * 480);
    drop(first);

    // New stream for the same avatar: fresh id, sequence restarts at 0.
    // The receiver must rebuild its decoder and accept the new stream.
    let mut second = harness.outbound(2);
    assert_eq!(second.sequence(), 0);
    second.ingest(&vec![0.0f32; 2 * 480]);
    assert_eq!(second.pump(), 2);
    harness.wait_for_queued(5 * 480);

    harness.stop();
}

#[test]
fn packets_from_a_rogue_sender_are_ignored() {
    let harness = Harness::start();
    let mut outbound = harness.outbound(1);

    // A third socket posing as the server; same payload shape.
    let rogue = bind_voice_socket().unwrap();
    let mut rogue_pipe = OutboundVoice::new(
        Arc::new(rogue),
        harness.receiver_addr,
        48_000,
        AVATAR_UID as u32,
        1.0,
    )
    .unwrap();
    rogue_pipe.ingest(&vec![0.0f32; 480]);
    assert_eq!(rogue_pipe.pump(), 1);

    // The legitimate sender's frame still lands; the rogue's never does.
    outbound.ingest(&vec![0.0f32; 480]);
    assert_eq!(outbound.pump(), 1);
    let queued = harness.wait_for_queued(480);
    assert_eq!(queued, 480);

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(harness.source.queued_samples(), 480);

    harness.stop();
}

#[test]
fn stop_unblocks_the_blocking_read() {
    let harness = Harness::start();
    // No packets in flight: the worker is parked in recv_from. stop()
    // must return promptly via the zero-length self-datagram.
    let started = Instant::now();
    harness.stop();
    assert!(started.elapsed() < Duration::from_secs(2));
}
