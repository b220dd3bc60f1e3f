//! Lifecycle controller
//!
//! Owns every resource of a running pipeline: the transport, the worker
//! threads and the audio stream. Startup acquires them in order and any
//! failure tears down what was acquired so far through the same path as a
//! normal [`Pipeline::stop`].

use bytes::Bytes;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::audio::buffer::{create_shared_queue, SharedQueue};
use crate::audio::{AudioStream, CaptureCallback, PlaybackCallback};
use crate::codec::{CodecFactory, FrameDecoder, FrameEncoder, OpusCodec};
use crate::config::AppConfig;
use crate::error::{AudioError, Result};
use crate::network::udp::{bind_receiver, bind_sender, TransportHandle};
use crate::network::{NetworkReceiver, NetworkSender};
use crate::pipeline::decode::DecodeWorker;
use crate::pipeline::shutdown::ShutdownSignal;
use crate::pipeline::stats::{PipelineStats, StatsSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Created,
    Running,
    Stopping,
    Stopped,
}

/// What the pipeline does with audio
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Capture, encode, decode and play back locally; no network
    Loopback,
    /// Receive packets on `listen_port` and play them
    Receiver { listen_port: u16 },
    /// Capture and send packets to `target`
    Sender { target: SocketAddr },
}

impl Mode {
    fn captures(&self) -> bool {
        matches!(self, Mode::Loopback | Mode::Sender { .. })
    }

    fn plays(&self) -> bool {
        matches!(self, Mode::Loopback | Mode::Receiver { .. })
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Loopback => write!(f, "loopback"),
            Mode::Receiver { listen_port } => write!(f, "receiver on port {}", listen_port),
            Mode::Sender { target } => write!(f, "sender to {}", target),
        }
    }
}

/// Where the callbacks are driven from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioBackend {
    /// Configured (or default) cpal devices
    Default,
    /// No audio device; callers drive the queues directly
    Headless,
}

pub struct Pipeline {
    mode: Mode,
    state: PipelineState,
    shutdown: ShutdownSignal,
    stats: Arc<PipelineStats>,
    /// Jitter buffer feeding the decode worker
    packet_queue: SharedQueue<Bytes>,
    /// Playback buffer
    sample_queue: SharedQueue<i16>,
    /// Encoded packets waiting to be sent. Same queue as
    /// `packet_queue` in loopback mode.
    outbound_queue: SharedQueue<Bytes>,
    transport: Option<Arc<TransportHandle>>,
    /// Joined in push order: receiver, sender, decoder
    workers: Vec<(&'static str, JoinHandle<()>)>,
    stream: Option<AudioStream>,
}

impl Pipeline {
    /// Start with the Opus codec and the configured audio devices
    pub fn start(config: &AppConfig, mode: Mode) -> Result<Self> {
        Self::launch(config, mode, &OpusCodec, AudioBackend::Default)
    }

    pub fn launch<C: CodecFactory>(
        config: &AppConfig,
        mode: Mode,
        codec: &C,
        backend: AudioBackend,
    ) -> Result<Self> {
        config.validate()?;

        let params = config.codec_params();
        let encoder = if mode.captures() {
            Some(codec.encoder(&params)?)
        } else {
            None
        };
        let decoder = if mode.plays() {
            Some(codec.decoder(&params)?)
        } else {
            None
        };

        let mut pipeline = Self::new(config, mode);
        match pipeline.bring_up(config, encoder, decoder, backend) {
            Ok(()) => {
                pipeline.state = PipelineState::Running;
                tracing::info!("Pipeline running ({})", mode);
                Ok(pipeline)
            }
            Err(e) => {
                tracing::error!("Pipeline failed to start ({}): {}", mode, e);
                if let Err(teardown) = pipeline.stop() {
                    tracing::warn!("Teardown after failed start: {}", teardown);
                }
                Err(e)
            }
        }
    }

    fn new(config: &AppConfig, mode: Mode) -> Self {
        let packet_queue = create_shared_queue(config.buffers.packet_queue_capacity);
        let outbound_queue = match mode {
            Mode::Loopback => packet_queue.clone(),
            _ => create_shared_queue(config.buffers.outbound_queue_capacity),
        };

        Self {
            mode,
            state: PipelineState::Created,
            shutdown: ShutdownSignal::new(),
            stats: Arc::new(PipelineStats::default()),
            packet_queue,
            sample_queue: create_shared_queue(config.sample_queue_capacity()),
            outbound_queue,
            transport: None,
            workers: Vec::new(),
            stream: None,
        }
    }

    fn bring_up<E, D>(
        &mut self,
        config: &AppConfig,
        encoder: Option<E>,
        decoder: Option<D>,
        backend: AudioBackend,
    ) -> Result<()>
    where
        E: FrameEncoder + 'static,
        D: FrameDecoder + 'static,
    {
        match self.mode {
            Mode::Receiver { listen_port } => {
                let (socket, handle) = bind_receiver(
                    config.network.bind_address,
                    listen_port,
                    config.network.recv_buffer_size,
                    config.read_timeout(),
                )?;
                let transport = Arc::new(handle);
                self.transport = Some(transport.clone());

                let worker = NetworkReceiver::new(
                    socket,
                    transport,
                    self.packet_queue.clone(),
                    self.shutdown.clone(),
                    self.stats.clone(),
                    config.poll_interval(),
                )
                .spawn()?;
                self.workers.push(("net-receiver", worker));
            }
            Mode::Sender { target } => {
                let (socket, handle) = bind_sender(target)?;
                self.transport = Some(Arc::new(handle));

                let worker = NetworkSender::new(
                    socket,
                    target,
                    self.outbound_queue.clone(),
                    self.shutdown.clone(),
                    self.stats.clone(),
                    config.poll_interval(),
                )
                .spawn()?;
                self.workers.push(("net-sender", worker));
            }
            Mode::Loopback => {}
        }

        if let Some(decoder) = decoder {
            let worker = DecodeWorker::new(
                decoder,
                self.packet_queue.clone(),
                self.sample_queue.clone(),
                self.shutdown.clone(),
                self.stats.clone(),
                config.poll_interval(),
            )
            .spawn()?;
            self.workers.push(("decoder", worker));
        }

        if backend == AudioBackend::Headless {
            tracing::debug!("Headless pipeline, no audio device opened");
            return Ok(());
        }

        let capture =
            encoder.map(|e| CaptureCallback::new(e, self.outbound_queue.clone(), self.stats.clone()));
        let playback = self.mode.plays().then(|| self.playback_callback());

        let stream = self
            .stream
            .insert(AudioStream::open(&config.audio, config.frame_len(), capture, playback)?);
        stream.start()?;
        tracing::info!("Audio stream started");

        Ok(())
    }

    /// Stop every worker and release every resource. Safe to call more
    /// than once; later calls do nothing.
    pub fn stop(&mut self) -> Result<()> {
        if matches!(self.state, PipelineState::Stopping | PipelineState::Stopped) {
            return Ok(());
        }
        self.state = PipelineState::Stopping;
        tracing::info!("Stopping pipeline");

        self.shutdown.trigger();
        if let Some(transport) = &self.transport {
            transport.close();
        }

        for (name, handle) in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::error!("{} thread panicked", name);
            }
        }

        let mut result = Ok(());
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.stop() {
                result = Err(e.into());
            }
            stream.close();
        }

        self.state = PipelineState::Stopped;
        tracing::info!("Pipeline stopped");
        result
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Counters plus current queue levels
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            packet_queue_len: self.packet_queue.len(),
            packets_dropped: self.packet_queue.dropped_count(),
            sample_queue_len: self.sample_queue.len(),
            samples_dropped: self.sample_queue.dropped_count(),
            ..self.stats.snapshot()
        }
    }

    /// Bound address of the transport, if this mode has one
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.transport.as_deref().map(TransportHandle::local_addr)
    }

    /// Next error reported by the audio driver, if any
    pub fn check_audio_error(&self) -> Option<AudioError> {
        self.stream.as_ref().and_then(AudioStream::check_errors)
    }

    pub fn packet_queue(&self) -> &SharedQueue<Bytes> {
        &self.packet_queue
    }

    pub fn sample_queue(&self) -> &SharedQueue<i16> {
        &self.sample_queue
    }

    pub fn outbound_queue(&self) -> &SharedQueue<Bytes> {
        &self.outbound_queue
    }

    /// Playback callback over this pipeline's sample queue, for driving
    /// a headless pipeline
    pub fn playback_callback(&self) -> PlaybackCallback {
        PlaybackCallback::new(self.sample_queue.clone(), self.stats.clone())
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            tracing::warn!("Error while stopping pipeline: {}", e);
        }
    }
}
