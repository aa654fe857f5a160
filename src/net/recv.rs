//! Receive worker
//!
//! Blocks on the shared UDP socket, demultiplexes voice packets by
//! sender avatar id, and decodes them into per-avatar mixer queues. The
//! per-peer decoder map is reconciled against the world-state avatar set
//! whenever the changed flag is raised, so decoders exist exactly for
//! avatars that currently have an audio source.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::codec::VoiceDecoder;
use crate::constants::RECV_BUFFER_SIZE;
use crate::error::CodecError;
use crate::mixer::AudioSource;
use crate::net::socket::Datagram;
use crate::protocol::{self, VoiceHeader, PACKET_TYPE_VOICE, VOICE_HEADER_LEN};
use crate::world::WorldState;

/// Decode state for one peer's voice stream.
struct PeerStream {
    source: Arc<AudioSource>,
    decoder: VoiceDecoder,
    sampling_rate: u32,
    stream_id: u32,
    next_seq_expected: u32,
}

/// Handle to a running receive worker.
pub struct ReceiveHandle {
    shutdown: Arc<AtomicBool>,
    socket: Arc<dyn Datagram>,
    join: JoinHandle<()>,
}

impl ReceiveHandle {
    /// Stop the worker: set the shutdown flag, unblock the pending read
    /// with a zero-length datagram to the socket's own port, and join.
    pub fn stop(self) {
        self.shutdown.store(true, Ordering::Release);
        if let Err(e) = self.socket.unblock_read() {
            tracing::warn!("failed to unblock voice receive read: {e}");
        }
        let _ = self.join.join();
    }
}

pub struct ReceiveWorker {
    socket: Arc<dyn Datagram>,
    /// Only datagrams from this address are accepted.
    server_addr: SocketAddr,
    world: Arc<WorldState>,
    shutdown: Arc<AtomicBool>,
    streams: HashMap<u32, PeerStream>,
    /// Stale or out-of-order packets dropped; diagnostics only.
    stale_packets: u64,
}

impl ReceiveWorker {
    pub fn new(
        socket: Arc<dyn Datagram>,
        server_addr: SocketAddr,
        world: Arc<WorldState>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            socket,
            server_addr,
            world,
            shutdown,
            streams: HashMap::new(),
            stale_packets: 0,
        }
    }

    /// Spawn the receive worker on its own named thread.
    pub fn spawn(
        socket: Arc<dyn Datagram>,
        server_addr: SocketAddr,
        world: Arc<WorldState>,
        shutdown: Arc<AtomicBool>,
    ) -> std::io::Result<ReceiveHandle> {
        let worker = Self::new(socket.clone(), server_addr, world, shutdown.clone());
        let join = thread::Builder::new()
            .name("voice-receive".to_string())
            .spawn(move || worker.run())?;
        Ok(ReceiveHandle {
            shutdown,
            socket,
            join,
        })
    }

    fn run(mut self) {
        tracing::info!("voice receive worker started");
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        while !self.shutdown.load(Ordering::Acquire) {
            let (len, from) = match self.socket.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) => {
                    if self.shutdown.load(Ordering::Acquire) {
                        tracing::debug!("voice receive read cancelled at shutdown");
                    } else {
                        tracing::error!("voice receive read failed: {e}");
                    }
                    break;
                }
            };

            if self.world.avatars_changed() {
                self.reconcile();
            }

            self.handle_packet(from, &buf[..len]);
        }

        tracing::info!(
            "voice receive worker finished ({} stale packets dropped)",
            self.stale_packets
        );
    }

    /// Align the per-peer decoder map with the current avatar set:
    /// create entries for avatars that gained an audio source, rebuild
    /// the decoder when an avatar's stream id changed, and drop entries
    /// whose avatar vanished or lost its source.
    fn reconcile(&mut self) {
        let avatars = self.world.lock_avatars();

        for (uid, avatar) in avatars.iter() {
            let Some(source) = &avatar.audio_source else {
                continue;
            };
            let key = *uid as u32;

            let rebuild = match self.streams.get(&key) {
                None => true,
                Some(stream) if stream.stream_id != avatar.audio_stream_id => {
                    tracing::info!("stream id changed for avatar {uid}, rebuilding decoder");
                    true
                }
                Some(_) => false,
            };
            if !rebuild {
                continue;
            }

            let sampling_rate = avatar.audio_stream_sampling_rate;
            match VoiceDecoder::new(sampling_rate) {
                Ok(decoder) => {
                    tracing::info!(
                        "creating voice decoder for avatar {uid}, sampling rate {sampling_rate}"
                    );
                    self.streams.insert(
                        key,
                        PeerStream {
                            source: source.clone(),
                            decoder,
                            sampling_rate,
                            stream_id: avatar.audio_stream_id,
                            next_seq_expected: 0,
                        },
                    );
                }
                Err(e) => {
                    tracing::error!("failed to create decoder for avatar {uid}: {e}");
                    self.streams.remove(&key);
                }
            }
        }

        self.streams.retain(|key, _| {
            let keep = avatars
                .get(&(*key as u64))
                .map_or(false, |avatar| avatar.audio_source.is_some());
            if !keep {
                tracing::info!("destroying voice decoder for avatar {key}");
            }
            keep
        });

        self.world.clear_avatars_changed(&avatars);
    }

    /// Dispatch one datagram. Anything not from the server, too short,
    /// of an unknown type, for an unknown peer, or stale is dropped.
    fn handle_packet(&mut self, from: SocketAddr, packet: &[u8]) {
        if from != self.server_addr {
            return;
        }
        let Some(packet_type) = protocol::packet_type(packet) else {
            return;
        };
        if packet_type != PACKET_TYPE_VOICE {
            return;
        }
        let Some(header) = VoiceHeader::parse(packet) else {
            return;
        };

        let Some(stream) = self.streams.get_mut(&header.sender_avatar_id) else {
            tracing::trace!(
                "voice packet for avatar {} without stream context",
                header.sender_avatar_id
            );
            return;
        };

        if header.sequence_number < stream.next_seq_expected {
            // No reordering buffer; late packets are dropped outright.
            self.stale_packets += 1;
            tracing::debug!(
                "discarding stale voice packet from avatar {} (seq {} < {})",
                header.sender_avatar_id,
                header.sequence_number,
                stream.next_seq_expected
            );
            return;
        }

        match stream.decoder.decode(&packet[VOICE_HEADER_LEN..]) {
            Ok(samples) => {
                let max_abs = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
                stream.source.append_frame(samples, max_abs);
                stream.next_seq_expected = header.sequence_number.wrapping_add(1);
            }
            Err(CodecError::UnexpectedFrameLength(n)) => {
                tracing::warn!(
                    "unexpected decoded frame length {n} from avatar {} (rate {})",
                    header.sender_avatar_id,
                    stream.sampling_rate
                );
            }
            Err(e) => {
                tracing::warn!("voice decode failed for avatar {}: {e}", header.sender_avatar_id);
            }
        }
    }

    /// Stale packets dropped so far; diagnostics only.
    pub fn stale_packets(&self) -> u64 {
        self.stale_packets
    }
}
