//! Outbound voice pipeline
//!
//! Owns the capture-side pending buffer and everything between raw mono
//! samples and voice datagrams: gain, resampling to the codec rate,
//! 10 ms Opus framing, header packing and the UDP send. One instance
//! lives inside each capture worker.

use std::net::SocketAddr;
use std::sync::Arc;

use crate::audio::handoff::HandoffBuffer;
use crate::codec::{pick_codec_rate, samples_per_frame, StreamResampler, VoiceEncoder};
use crate::constants::MAX_PENDING_SAMPLES;
use crate::error::Error;
use crate::net::socket::Datagram;
use crate::protocol::write_voice_packet;

pub struct OutboundVoice {
    socket: Arc<dyn Datagram>,
    server_addr: SocketAddr,
    encoder: VoiceEncoder,
    /// Present only when the capture rate is not codec-supported.
    resampler: Option<StreamResampler>,
    /// Mono samples awaiting framing, gain already applied.
    pending: Vec<f32>,
    /// Scratch frame for resampler output.
    resampled: Vec<f32>,
    /// Reusable packet buffer.
    packet: Vec<u8>,
    gain: f32,
    sender_avatar_id: u32,
    sequence: u32,
    frame_samples: usize,
}

impl OutboundVoice {
    pub fn new(
        socket: Arc<dyn Datagram>,
        server_addr: SocketAddr,
        capture_rate_hz: u32,
        sender_avatar_id: u32,
        gain: f32,
    ) -> Result<Self, Error> {
        let codec_rate = pick_codec_rate(capture_rate_hz);
        let frame_samples = samples_per_frame(codec_rate);

        let resampler = if capture_rate_hz != codec_rate {
            Some(StreamResampler::new(capture_rate_hz, codec_rate, frame_samples)?)
        } else {
            None
        };
        let encoder = VoiceEncoder::new(codec_rate)?;

        Ok(Self {
            socket,
            server_addr,
            encoder,
            resampler,
            pending: Vec::with_capacity(MAX_PENDING_SAMPLES),
            resampled: vec![0.0; frame_samples],
            packet: Vec::new(),
            gain,
            sender_avatar_id,
            sequence: 0,
            frame_samples,
        })
    }

    /// Codec rate the stream is encoded at; announced in the handshake.
    pub fn codec_rate(&self) -> u32 {
        self.encoder.sample_rate()
    }

    pub fn resampling(&self) -> bool {
        self.resampler.is_some()
    }

    /// Next sequence number to be assigned.
    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Update the gain applied to subsequently ingested samples.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    /// Pull whatever the device callback has handed off into the pending
    /// buffer. Returns the max-abs level of the newly added samples, or
    /// `None` when nothing was immediately available.
    pub fn drain_from(&mut self, handoff: &HandoffBuffer) -> Option<f32> {
        let start = self.pending.len();
        if handoff.drain_into(&mut self.pending, MAX_PENDING_SAMPLES) == 0 {
            return None;
        }
        Some(self.apply_gain_from(start))
    }

    /// Append raw mono samples directly, bounded like the hand-off path.
    /// Returns the max-abs level of what was added.
    pub fn ingest(&mut self, samples: &[f32]) -> f32 {
        let start = self.pending.len();
        let space = MAX_PENDING_SAMPLES - start;
        let take = space.min(samples.len());
        self.pending.extend_from_slice(&samples[..take]);
        self.apply_gain_from(start)
    }

    fn apply_gain_from(&mut self, start: usize) -> f32 {
        let mut max_abs = 0.0f32;
        for sample in &mut self.pending[start..] {
            *sample = (*sample * self.gain).clamp(-1.0, 1.0);
            max_abs = max_abs.max(sample.abs());
        }
        max_abs
    }

    /// Emit as many encoded frames as the pending buffer supports,
    /// then compact away the consumed prefix. Per-frame failures
    /// (resample, encode, send) are logged and the frame dropped; the
    /// stream continues. Returns the number of packets sent.
    pub fn pump(&mut self) -> usize {
        let mut cur = 0usize;
        let mut sent = 0usize;

        loop {
            let needed = match &self.resampler {
                Some(rs) => rs.samples_needed(),
                None => self.frame_samples,
            };
            if self.pending.len() - cur < needed {
                break;
            }

            let src = &self.pending[cur..cur + needed];
            let frame: &[f32] = match self.resampler.as_mut() {
                Some(rs) => {
                    if let Err(e) = rs.resample(&mut self.resampled, src) {
                        tracing::warn!("resample failed, dropping frame: {e}");
                        cur += needed;
                        continue;
                    }
                    &self.resampled
                }
                None => src,
            };

            match self.encoder.encode(frame) {
                Ok(payload) => {
                    write_voice_packet(
                        &mut self.packet,
                        self.sender_avatar_id,
                        self.sequence,
                        payload,
                    );
                    self.sequence = self.sequence.wrapping_add(1);

                    match self.socket.send_to(&self.packet, self.server_addr) {
                        Ok(_) => sent += 1,
                        Err(e) => tracing::warn!("voice packet send failed: {e}"),
                    }
                }
                Err(e) => tracing::warn!("encode failed, dropping frame: {e}"),
            }

            cur += needed;
        }

        self.pending.drain(..cur);
        sent
    }

    /// Samples currently awaiting framing; test and diagnostics use.
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::net::{Ipv4Addr, SocketAddrV4};
    use std::sync::Mutex;

    /// Collects sent packets instead of hitting the network.
    struct CapturingSocket {
        packets: Mutex<Vec<Vec<u8>>>,
    }

    impl CapturingSocket {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                packets: Mutex::new(Vec::new()),
            })
        }

        fn packets(&self) -> Vec<Vec<u8>> {
            self.packets.lock().unwrap().clone()
        }
    }

    impl Datagram for CapturingSocket {
        fn send_to(&self, buf: &[u8], _addr: SocketAddr) -> io::Result<usize> {
            self.packets.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn recv_from(&self, _buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "capture only"))
        }

        fn local_addr(&self) -> io::Result<SocketAddr> {
            Ok(SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 0)))
        }

        fn unblock_read(&self) -> io::Result<()> {
            Ok(())
        }
    }

    fn server_addr() -> SocketAddr {
        "127.0.0.1:7700".parse().unwrap()
    }

    #[test]
    fn matched_rate_skips_resampler() {
        let socket = CapturingSocket::new();
        let out = OutboundVoice::new(socket, server_addr(), 48_000, 1, 1.0).unwrap();
        assert!(!out.resampling());
        assert_eq!(out.codec_rate(), 48_000);
    }

    #[test]
    fn mismatched_rate_engages_resampler() {
        let socket = CapturingSocket::new();
        let out = OutboundVoice::new(socket, server_addr(), 44_100, 1, 1.0).unwrap();
        assert!(out.resampling());
        assert_eq!(out.codec_rate(), 48_000);
    }

    #[test]
    fn silent_second_yields_full_packet_train() {
        let socket = CapturingSocket::new();
        let mut out = OutboundVoice::new(socket.clone(), server_addr(), 48_000, 42, 1.0).unwrap();

        // One second of silence in callback-sized batches.
        let batch = vec![0.0f32; 480];
        let mut sent = 0;
        for _ in 0..100 {
            out.ingest(&batch);
            sent += out.pump();
        }
        assert!(sent >= 95, "sent only {sent} packets");

        let packets = socket.packets();
        assert_eq!(packets.len(), sent);
        for (i, packet) in packets.iter().enumerate() {
            let header = crate::protocol::VoiceHeader::parse(packet).unwrap();
            assert_eq!(header.packet_type, crate::protocol::PACKET_TYPE_VOICE);
            assert_eq!(header.sender_avatar_id, 42);
            assert_eq!(header.sequence_number, i as u32);
            assert!(packet.len() > crate::protocol::VOICE_HEADER_LEN);
        }
    }

    #[test]
    fn extreme_gain_clamps_into_unit_range() {
        let socket = CapturingSocket::new();
        let mut out = OutboundVoice::new(socket, server_addr(), 48_000, 1, 1000.0).unwrap();

        let noisy: Vec<f32> = (0..480).map(|i| ((i as f32) * 0.01).sin() * 0.01).collect();
        let max_abs = out.ingest(&noisy);
        assert!(max_abs <= 1.0);
        assert!(out.pending.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn pending_is_bounded() {
        let socket = CapturingSocket::new();
        let mut out = OutboundVoice::new(socket, server_addr(), 48_000, 1, 1.0).unwrap();

        let big = vec![0.1f32; MAX_PENDING_SAMPLES + 5000];
        out.ingest(&big);
        assert_eq!(out.pending_samples(), MAX_PENDING_SAMPLES);
    }

    #[test]
    fn rate_mismatch_packet_count_over_100ms() {
        let socket = CapturingSocket::new();
        let mut out = OutboundVoice::new(socket.clone(), server_addr(), 44_100, 1, 0.5).unwrap();

        // 100 ms of a 1 kHz tone at 44.1 kHz.
        let tone: Vec<f32> = (0..4410)
            .map(|i| (2.0 * std::f32::consts::PI * 1000.0 * i as f32 / 44_100.0).sin())
            .collect();
        out.ingest(&tone);
        let sent = out.pump();
        assert!(
            (9..=10).contains(&sent),
            "expected ~10 packets from 4410 samples, got {sent}"
        );
    }

    #[test]
    fn volume_change_applies_to_next_batch() {
        let socket = CapturingSocket::new();
        let mut out = OutboundVoice::new(socket, server_addr(), 48_000, 1, 1.0).unwrap();

        let max1 = out.ingest(&[0.5; 8]);
        assert!((max1 - 0.5).abs() < 1e-6);

        out.set_gain(0.1);
        let max2 = out.ingest(&[0.5; 8]);
        assert!((max2 - 0.05).abs() < 1e-6);
    }
}
