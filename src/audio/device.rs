//! Audio device access
//!
//! `cpal::Stream` cannot move between threads on every host, so each
//! [`AudioStream`] gets a dedicated owner thread. The controller talks to it
//! over a command channel: the thread builds the streams and reports back
//! (open), then plays or pauses them on request (start / stop), and drops
//! them when the channel closes (close).

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::audio::{CaptureCallback, PlaybackCallback};
use crate::codec::FrameEncoder;
use crate::config::AudioConfig;
use crate::constants::CHANNELS;
use crate::error::AudioError;

/// Summary of a device for listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_input: bool,
    pub is_output: bool,
    pub is_default: bool,
}

/// List all available audio devices
pub fn list_devices() -> Vec<AudioDeviceInfo> {
    let host = cpal::default_host();
    let mut devices: Vec<AudioDeviceInfo> = Vec::new();

    let default_input_name = host.default_input_device().and_then(|d| d.name().ok());
    let default_output_name = host.default_output_device().and_then(|d| d.name().ok());

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                let is_default = default_input_name.as_ref() == Some(&name);
                devices.push(AudioDeviceInfo {
                    name,
                    is_input: true,
                    is_output: false,
                    is_default,
                });
            }
        }
    }

    if let Ok(output_devices) = host.output_devices() {
        for device in output_devices {
            if let Ok(name) = device.name() {
                let is_default = default_output_name.as_ref() == Some(&name);
                // Merge duplex devices into one entry
                if let Some(existing) = devices.iter_mut().find(|d| d.name == name) {
                    existing.is_output = true;
                    existing.is_default |= is_default;
                } else {
                    devices.push(AudioDeviceInfo {
                        name,
                        is_input: false,
                        is_output: true,
                        is_default,
                    });
                }
            }
        }
    }

    devices
}

/// Input device by name, or the host default
pub fn find_input_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AudioError> {
    match name {
        None => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string())),
        Some(name) => {
            let devices = host
                .input_devices()
                .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;
            find_by_name(devices, name)
        }
    }
}

/// Output device by name, or the host default
pub fn find_output_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device, AudioError> {
    match name {
        None => host
            .default_output_device()
            .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string())),
        Some(name) => {
            let devices = host
                .output_devices()
                .map_err(|e| AudioError::DeviceNotFound(e.to_string()))?;
            find_by_name(devices, name)
        }
    }
}

fn find_by_name(
    mut devices: impl Iterator<Item = cpal::Device>,
    name: &str,
) -> Result<cpal::Device, AudioError> {
    devices
        .find(|device| device.name().map(|n| n == name).unwrap_or(false))
        .ok_or_else(|| AudioError::DeviceNotFound(name.to_string()))
}

#[derive(Debug, Clone, Copy)]
enum StreamCommand {
    Start,
    Stop,
}

/// Input and/or output stream driven by the pipeline callbacks
pub struct AudioStream {
    commands: Option<Sender<StreamCommand>>,
    replies: Receiver<Result<(), AudioError>>,
    errors: Receiver<AudioError>,
    thread_handle: Option<JoinHandle<()>>,
    running: bool,
}

impl AudioStream {
    /// Open the devices and build their streams without starting them.
    /// Fails if a device is missing or rejects the mono/sample-rate config.
    pub fn open<E: FrameEncoder + 'static>(
        config: &AudioConfig,
        frame_len: usize,
        capture: Option<CaptureCallback<E>>,
        playback: Option<PlaybackCallback>,
    ) -> Result<Self, AudioError> {
        let (command_tx, command_rx) = bounded::<StreamCommand>(4);
        let (reply_tx, reply_rx) = bounded::<Result<(), AudioError>>(1);
        let (error_tx, error_rx) = bounded::<AudioError>(16);

        let stream_config = StreamConfig {
            channels: CHANNELS,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: if config.fixed_buffer {
                cpal::BufferSize::Fixed(frame_len as u32)
            } else {
                cpal::BufferSize::Default
            },
        };
        let input_name = config.input_device.clone();
        let output_name = config.output_device.clone();

        let handle = thread::Builder::new()
            .name("audio-stream".into())
            .spawn(move || {
                let streams = match build_streams(
                    &stream_config,
                    input_name.as_deref(),
                    output_name.as_deref(),
                    capture,
                    playback,
                    error_tx,
                ) {
                    Ok(streams) => streams,
                    Err(e) => {
                        let _ = reply_tx.send(Err(e));
                        return;
                    }
                };
                if reply_tx.send(Ok(())).is_err() {
                    return;
                }

                for command in command_rx.iter() {
                    let result = streams.iter().try_for_each(|stream| match command {
                        StreamCommand::Start => stream
                            .play()
                            .map_err(|e| AudioError::PlayError(e.to_string())),
                        StreamCommand::Stop => stream
                            .pause()
                            .map_err(|e| AudioError::PauseError(e.to_string())),
                    });
                    if reply_tx.send(result).is_err() {
                        break;
                    }
                }

                // Streams are dropped here, closing the devices
                tracing::debug!("Audio stream thread finished");
            })
            .map_err(|e| AudioError::StreamError(e.to_string()))?;

        match reply_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                commands: Some(command_tx),
                replies: reply_rx,
                errors: error_rx,
                thread_handle: Some(handle),
                running: false,
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(AudioError::StreamThreadGone)
            }
        }
    }

    pub fn start(&mut self) -> Result<(), AudioError> {
        self.command(StreamCommand::Start)?;
        self.running = true;
        Ok(())
    }

    /// Pause the streams. In-flight callbacks run to completion first.
    pub fn stop(&mut self) -> Result<(), AudioError> {
        if !self.running {
            return Ok(());
        }
        self.running = false;
        self.command(StreamCommand::Stop)
    }

    /// Release the devices and join the owner thread
    pub fn close(&mut self) {
        // Disconnecting the command channel ends the owner thread's loop
        self.commands.take();
        if let Some(handle) = self.thread_handle.take() {
            if handle.join().is_err() {
                tracing::error!("Audio stream thread panicked");
            }
        }
    }

    /// Next error reported by the driver, if any
    pub fn check_errors(&self) -> Option<AudioError> {
        self.errors.try_recv().ok()
    }

    fn command(&self, command: StreamCommand) -> Result<(), AudioError> {
        let commands = self.commands.as_ref().ok_or(AudioError::StreamThreadGone)?;
        commands
            .send(command)
            .map_err(|_| AudioError::StreamThreadGone)?;
        self.replies
            .recv()
            .map_err(|_| AudioError::StreamThreadGone)?
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        self.close();
    }
}

fn build_streams<E: FrameEncoder + 'static>(
    config: &StreamConfig,
    input_name: Option<&str>,
    output_name: Option<&str>,
    capture: Option<CaptureCallback<E>>,
    playback: Option<PlaybackCallback>,
    error_tx: Sender<AudioError>,
) -> Result<Vec<cpal::Stream>, AudioError> {
    let host = cpal::default_host();
    let mut streams = Vec::new();

    if let Some(mut capture) = capture {
        let device = find_input_device(&host, input_name)?;
        tracing::info!(
            "Opening input device {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        let errors = error_tx.clone();
        let stream = device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| capture.on_input_f32(data),
                move |err| {
                    let _ = errors.try_send(AudioError::StreamError(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        // Some hosts start a stream as soon as it is built
        let _ = stream.pause();
        streams.push(stream);
    }

    if let Some(playback) = playback {
        let device = find_output_device(&host, output_name)?;
        tracing::info!(
            "Opening output device {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );
        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    playback.render_f32(data);
                },
                move |err| {
                    let _ = error_tx.try_send(AudioError::StreamError(err.to_string()));
                },
                None,
            )
            .map_err(|e| AudioError::StreamError(e.to_string()))?;
        let _ = stream.pause();
        streams.push(stream);
    }

    Ok(streams)
}
