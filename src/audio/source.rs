// Audio capture backends: a cpal-driven direct device capture and a
// subprocess-piped decoder capture, both exposing the same bounded,
// drop-on-full producer/consumer contract to the session controller.
//
// The real-time cpal callback must never block or allocate unnecessarily;
// it pushes onto a bounded sync_channel with `try_send`, dropping the block
// silently on overflow. The subprocess backend's reader thread follows the
// same contract so the controller sees one uniform `AudioSource` interface.

use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};

use crate::audio::PcmBlock;
use crate::error::AudioError;

const QUEUE_CAPACITY: usize = 256;

pub trait AudioSource {
    fn start(&mut self) -> Result<(), AudioError>;
    fn stop(&mut self);
    fn read(&self, timeout: Duration) -> Option<PcmBlock>;
    fn clear(&self);
}

/// Lists `(name, is_default)` pairs for input or output devices, used by
/// `--list-devices`.
pub fn list_devices(input: bool) -> anyhow::Result<Vec<(String, bool)>> {
    let host = cpal::default_host();
    let default_name = if input {
        host.default_input_device()
    } else {
        host.default_output_device()
    }
    .and_then(|d| d.name().ok())
    .unwrap_or_default();

    let devices = if input {
        host.input_devices()?
    } else {
        host.output_devices()?
    };

    let mut out = Vec::new();
    for device in devices {
        if let Ok(name) = device.name() {
            let is_default = name == default_name;
            out.push((name, is_default));
        }
    }
    Ok(out)
}

fn find_input_device(name: Option<&str>) -> Result<Device, AudioError> {
    let host = cpal::default_host();
    match name {
        None | Some("default") => host
            .default_input_device()
            .ok_or_else(|| AudioError::DeviceUnavailable("no default input device".to_string())),
        Some(name) => {
            let mut devices = host
                .input_devices()
                .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
            devices
                .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                .ok_or_else(|| AudioError::DeviceUnavailable(format!("input device not found: {name}")))
        }
    }
}

fn push_i16(sender: &SyncSender<PcmBlock>, staging: &mut Vec<i16>, block_size: usize, sample_rate: u32) {
    while staging.len() >= block_size {
        let block: Vec<i16> = staging.drain(..block_size).collect();
        let _ = sender.try_send(PcmBlock {
            samples: block,
            sample_rate,
        });
    }
}

/// Direct device capture via `cpal`. Mirrors the mono-preferring config
/// selection and per-format callback dispatch used throughout the examples
/// pack, generalized to push fixed-size `PcmBlock`s.
pub struct CpalSource {
    device_name: Option<String>,
    sample_rate: u32,
    block_size: usize,
    stream: Option<Stream>,
    sender: SyncSender<PcmBlock>,
    receiver: Receiver<PcmBlock>,
}

impl CpalSource {
    pub fn new(device_name: Option<String>, sample_rate: u32, block_size: usize) -> Self {
        let (sender, receiver) = sync_channel(QUEUE_CAPACITY);
        Self {
            device_name,
            sample_rate,
            block_size,
            stream: None,
            sender,
            receiver,
        }
    }

    fn select_config(device: &Device) -> Result<(StreamConfig, SampleFormat), AudioError> {
        if let Ok(supported) = device.supported_input_configs() {
            for range in supported {
                if range.channels() == 1 {
                    let cfg = range.with_max_sample_rate();
                    return Ok((cfg.clone().into(), cfg.sample_format()));
                }
            }
        }
        let cfg = device
            .default_input_config()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        Ok((cfg.clone().into(), cfg.sample_format()))
    }
}

impl AudioSource for CpalSource {
    fn start(&mut self) -> Result<(), AudioError> {
        let device = find_input_device(self.device_name.as_deref())?;
        let (config, sample_format) = Self::select_config(&device)?;
        let channels = config.channels as usize;
        let sample_rate = self.sample_rate;
        let block_size = self.block_size;
        let sender = self.sender.clone();
        let staging = Arc::new(std::sync::Mutex::new(Vec::<i16>::with_capacity(block_size * 2)));

        let error_callback = |err| {
            tracing::error!("audio input stream error: {err}");
        };

        let stream = match sample_format {
            SampleFormat::F32 => {
                let staging = staging.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[f32], _| {
                        let mut staging = staging.lock().unwrap();
                        for chunk in data.chunks(channels) {
                            staging.push((chunk[0] * i16::MAX as f32) as i16);
                        }
                        push_i16(&sender, &mut staging, block_size, sample_rate);
                    },
                    error_callback,
                    None,
                )
            }
            SampleFormat::I16 => {
                let staging = staging.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[i16], _| {
                        let mut staging = staging.lock().unwrap();
                        for chunk in data.chunks(channels) {
                            staging.push(chunk[0]);
                        }
                        push_i16(&sender, &mut staging, block_size, sample_rate);
                    },
                    error_callback,
                    None,
                )
            }
            SampleFormat::U16 => {
                let staging = staging.clone();
                device.build_input_stream(
                    &config,
                    move |data: &[u16], _| {
                        let mut staging = staging.lock().unwrap();
                        for chunk in data.chunks(channels) {
                            staging.push((chunk[0] as i32 - i16::MAX as i32 - 1) as i16);
                        }
                        push_i16(&sender, &mut staging, block_size, sample_rate);
                    },
                    error_callback,
                    None,
                )
            }
            other => {
                return Err(AudioError::DeviceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?;
        self.stream = Some(stream);
        Ok(())
    }

    fn stop(&mut self) {
        self.stream = None;
    }

    fn read(&self, timeout: Duration) -> Option<PcmBlock> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn clear(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Subprocess-piped capture: spawns an `ffmpeg` decoder reading from a PulseAudio
/// source and emitting raw `s16le` mono at the requested rate on stdout. A reader
/// thread slices the byte stream into fixed-size blocks; a second thread drains
/// stderr so the subprocess never blocks on a full diagnostic pipe.
pub struct SubprocessSource {
    source: String,
    sample_rate: u32,
    block_size: usize,
    child: Option<Child>,
    reader_handle: Option<std::thread::JoinHandle<()>>,
    stderr_handle: Option<std::thread::JoinHandle<()>>,
    stop_flag: Arc<std::sync::atomic::AtomicBool>,
    sender: SyncSender<PcmBlock>,
    receiver: Receiver<PcmBlock>,
}

impl SubprocessSource {
    pub fn new(source: String, sample_rate: u32, block_size: usize) -> Self {
        let (sender, receiver) = sync_channel(QUEUE_CAPACITY);
        Self {
            source,
            sample_rate,
            block_size,
            child: None,
            reader_handle: None,
            stderr_handle: None,
            stop_flag: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            sender,
            receiver,
        }
    }
}

impl AudioSource for SubprocessSource {
    fn start(&mut self) -> Result<(), AudioError> {
        let mut child = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-f",
                "pulse",
                "-i",
                &self.source,
                "-ac",
                "1",
                "-ar",
                &self.sample_rate.to_string(),
                "-f",
                "s16le",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| AudioError::DeviceUnavailable(format!("failed to spawn ffmpeg: {e}")))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AudioError::DeviceUnavailable("ffmpeg stdout not piped".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AudioError::DeviceUnavailable("ffmpeg stderr not piped".to_string()))?;

        self.stop_flag.store(false, std::sync::atomic::Ordering::Relaxed);

        let sender = self.sender.clone();
        let block_size = self.block_size;
        let sample_rate = self.sample_rate;
        let stop_flag = self.stop_flag.clone();
        self.reader_handle = Some(
            std::thread::Builder::new()
                .name("audio-pipe-reader".into())
                .spawn(move || reader_loop(stdout, sender, block_size, sample_rate, stop_flag))
                .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?,
        );

        self.stderr_handle = Some(
            std::thread::Builder::new()
                .name("audio-pipe-stderr".into())
                .spawn(move || drain_stderr(stderr))
                .map_err(|e| AudioError::DeviceUnavailable(e.to_string()))?,
        );

        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(mut child) = self.child.take() {
            wait_bounded_then_kill(&mut child, Duration::from_secs(2));
        }
        if let Some(h) = self.reader_handle.take() {
            let _ = h.join();
        }
        if let Some(h) = self.stderr_handle.take() {
            let _ = h.join();
        }
    }

    fn read(&self, timeout: Duration) -> Option<PcmBlock> {
        self.receiver.recv_timeout(timeout).ok()
    }

    fn clear(&self) {
        while self.receiver.try_recv().is_ok() {}
    }
}

fn reader_loop(
    mut stdout: impl Read,
    sender: SyncSender<PcmBlock>,
    block_size: usize,
    sample_rate: u32,
    stop_flag: Arc<std::sync::atomic::AtomicBool>,
) {
    let block_bytes = block_size * 2;
    let mut buf = vec![0u8; block_bytes];
    let mut staged: Vec<u8> = Vec::with_capacity(block_bytes * 2);

    while !stop_flag.load(std::sync::atomic::Ordering::Relaxed) {
        let n = match stdout.read(&mut buf) {
            Ok(0) => {
                tracing::warn!("audio subprocess stream ended");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("audio subprocess read error: {e}");
                break;
            }
        };
        staged.extend_from_slice(&buf[..n]);
        while staged.len() >= block_bytes {
            let frame: Vec<u8> = staged.drain(..block_bytes).collect();
            let samples: Vec<i16> = frame
                .chunks_exact(2)
                .map(|b| i16::from_le_bytes([b[0], b[1]]))
                .collect();
            let _ = sender.try_send(PcmBlock {
                samples,
                sample_rate,
            });
        }
    }
}

/// Gives the child up to `deadline` to exit on its own (polling `try_wait`),
/// then force-kills it. Mirrors the reference `PulseAudioIn.stop`'s
/// terminate -> bounded wait -> kill sequence.
fn wait_bounded_then_kill(child: &mut Child, deadline: Duration) {
    let poll_interval = Duration::from_millis(50);
    let start = std::time::Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("error polling ffmpeg exit status: {e}");
                return;
            }
        }
        if start.elapsed() >= deadline {
            break;
        }
        std::thread::sleep(poll_interval);
    }

    if let Err(e) = child.kill() {
        tracing::warn!("failed to kill ffmpeg after bounded wait: {e}");
        return;
    }
    if let Err(e) = child.wait() {
        tracing::warn!("error waiting for ffmpeg to exit after kill: {e}");
    }
}

fn drain_stderr(mut stderr: impl Read) {
    let mut buf = [0u8; 4096];
    loop {
        match stderr.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                for line in text.lines() {
                    if !line.trim().is_empty() {
                        tracing::warn!("audio subprocess stderr: {line}");
                    }
                }
            }
            Err(_) => break,
        }
    }
}

/// Resolves the configured input backend, consulting the `PULSE_SERVER`
/// environment hint when set to `auto`. The only place the core depends on
/// process environment.
pub fn resolve_backend(configured: &str) -> String {
    if configured.eq_ignore_ascii_case("auto") {
        if std::env::var_os("PULSE_SERVER").is_some() {
            "subprocess".to_string()
        } else {
            "direct".to_string()
        }
    } else {
        configured.to_lowercase()
    }
}
