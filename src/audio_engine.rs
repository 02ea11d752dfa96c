use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tracing::{debug, warn};

use crate::sound::{NoiseShape, SoundCue, MASTER_GAIN};
use crate::transport::AudioOutput;
use crate::types::Snapshot;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no default audio output device found")]
    NoDevice,
    #[error("failed to read default output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build output stream: {0}")]
    Build(#[from] cpal::BuildStreamError),
    #[error("unsupported output sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),
}

#[derive(Clone)]
struct SharedAudioState {
    cue: Arc<RwLock<SoundCue>>,
    muted: Arc<AtomicBool>,
}

// stream is built paused until resume()
pub struct AudioEngine {
    shared: SharedAudioState,
    stream: cpal::Stream,
    pub device_name: String,
    pub sample_rate: u32,
}

impl AudioEngine {
    pub fn new(muted: bool) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown output device".to_owned());

        let supported_config = device.default_output_config()?;
        let config = supported_config.config();
        let sample_rate = config.sample_rate.0;

        let shared = SharedAudioState {
            cue: Arc::new(RwLock::new(SoundCue::default())),
            muted: Arc::new(AtomicBool::new(muted)),
        };

        let stream = match supported_config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, shared.clone())?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, shared.clone())?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, shared.clone())?,
            other => return Err(AudioError::UnsupportedFormat(other)),
        };

        if let Err(err) = stream.pause() {
            debug!(%err, "output stream could not be paused after creation");
        }

        debug!(device = %device_name, sample_rate, "audio engine ready");
        Ok(Self {
            shared,
            stream,
            device_name,
            sample_rate,
        })
    }

    pub fn projection(&self) -> impl FnMut(&Snapshot) + 'static {
        let cue = self.shared.cue.clone();
        move |snapshot| write_copy(&cue, SoundCue::from_snapshot(snapshot))
    }

    pub fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Relaxed)
    }

    pub fn toggle_mute(&self) -> bool {
        let muted = !self.shared.muted.fetch_xor(true, Ordering::Relaxed);
        debug!(muted, "audio mute toggled");
        muted
    }
}

impl AudioOutput for AudioEngine {
    fn resume(&self) {
        if let Err(err) = self.stream.play() {
            warn!(%err, "failed to resume audio stream");
        }
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: SharedAudioState,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0 as f32;
    let mut voice = ProcessVoice::new(sample_rate);

    let cue_handle = shared.cue.clone();
    let muted_handle = shared.muted.clone();

    device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let cue = read_copy(&cue_handle);
            let muted = muted_handle.load(Ordering::Relaxed);
            write_audio_buffer(data, channels, &mut voice, cue, muted);
        },
        move |err| {
            warn!(%err, "audio stream error");
        },
        None,
    )
}

fn write_audio_buffer<T>(
    output: &mut [T],
    channels: usize,
    voice: &mut ProcessVoice,
    cue: SoundCue,
    muted: bool,
) where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    for frame in output.chunks_mut(channels) {
        let (left, right) = voice.next_sample(cue, muted);
        frame[0] = T::from_sample(left);

        if channels > 1 {
            frame[1] = T::from_sample(right);
            if channels > 2 {
                for sample in &mut frame[2..] {
                    *sample = T::from_sample(0.5 * (left + right));
                }
            }
        }
    }
}

// hum, noise bed, flow noise and pressure whistle; gains are smoothed across step changes
struct ProcessVoice {
    sample_rate: f32,
    hum_phase: f32,
    hum_freq: f32,
    lfo_phase: f32,
    cue_phase: f32,
    cue_freq: f32,
    noise_state: u64,
    bed: OnePole,
    bed_high: HighPass,
    flow: OnePole,
    hum_gain: Smoothed,
    bed_gain: Smoothed,
    flow_gain: Smoothed,
    cue_gain: Smoothed,
    master: Smoothed,
    limiter: Limiter,
}

impl ProcessVoice {
    fn new(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            hum_phase: 0.0,
            hum_freq: 50.0,
            lfo_phase: 0.0,
            cue_phase: 0.0,
            cue_freq: 300.0,
            noise_state: 0xA7F4_19B3_14C0_77E1,
            bed: OnePole::new(),
            bed_high: HighPass::new(),
            flow: OnePole::new(),
            hum_gain: Smoothed::new(0.0005),
            bed_gain: Smoothed::new(0.0005),
            flow_gain: Smoothed::new(0.0003),
            cue_gain: Smoothed::new(0.002),
            master: Smoothed::new(0.0004),
            limiter: Limiter::new(),
        }
    }

    fn next_sample(&mut self, cue: SoundCue, muted: bool) -> (f32, f32) {
        let audible = cue.active && !muted;
        let master = self.master.next(if audible { MASTER_GAIN } else { 0.0 });

        self.hum_freq += (cue.hum_hz - self.hum_freq) * 0.0008;
        self.hum_phase = wrap_phase(self.hum_phase + TAU * self.hum_freq / self.sample_rate);
        let hum = if cue.hum_buzz {
            // saw-like buzz from three partials
            let phase = self.hum_phase;
            phase.sin() + 0.5 * (2.0 * phase).sin() + 0.33 * (3.0 * phase).sin()
        } else {
            self.hum_phase.sin()
        };
        let hum = hum * self.hum_gain.next(cue.hum_gain);

        self.lfo_phase = wrap_phase(self.lfo_phase + TAU * cue.lfo_hz / self.sample_rate);
        let lfo = 1.0 - cue.lfo_depth * (0.5 + 0.5 * self.lfo_phase.sin());

        let noise = self.next_noise();
        let cutoff = cue.noise_cutoff_hz;
        let low = self.bed.process(noise, cutoff, self.sample_rate);
        let bed = match cue.noise_shape {
            NoiseShape::LowPass => low,
            NoiseShape::HighPass => self.bed_high.process(noise, cutoff, self.sample_rate),
            NoiseShape::BandPass => self.bed_high.process(low, cutoff * 0.5, self.sample_rate),
        };
        let bed = bed * self.bed_gain.next(cue.noise_gain) * lfo;

        let flow = self.flow.process(noise, 300.0, self.sample_rate);
        let flow = flow * self.flow_gain.next(cue.flow_gain);

        self.cue_freq += (cue.pressure_cue_hz - self.cue_freq) * 0.002;
        self.cue_phase = wrap_phase(self.cue_phase + TAU * self.cue_freq / self.sample_rate);
        let whistle = self.cue_phase.sin() * self.cue_gain.next(cue.pressure_cue_gain);

        let mono = hum + bed + flow;
        let left = mono + whistle * 0.7;
        let right = mono + whistle * 0.3;
        self.limiter.process(left, right, master)
    }

    fn next_noise(&mut self) -> f32 {
        self.noise_state ^= self.noise_state << 13;
        self.noise_state ^= self.noise_state >> 7;
        self.noise_state ^= self.noise_state << 17;
        let normalized = (self.noise_state as f64 / u64::MAX as f64) as f32;
        normalized * 2.0 - 1.0
    }
}

struct Smoothed {
    value: f32,
    rate: f32,
}

impl Smoothed {
    fn new(rate: f32) -> Self {
        Self { value: 0.0, rate }
    }

    fn next(&mut self, target: f32) -> f32 {
        self.value += (target - self.value) * self.rate;
        self.value
    }
}

struct OnePole {
    y1: f32,
}

impl OnePole {
    fn new() -> Self {
        Self { y1: 0.0 }
    }

    fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let cutoff = cutoff_hz.clamp(20.0, sample_rate * 0.45);
        let alpha = 1.0 - (-TAU * cutoff / sample_rate).exp();
        self.y1 += (input - self.y1) * alpha;
        self.y1
    }
}

struct HighPass {
    x1: f32,
    y1: f32,
}

impl HighPass {
    fn new() -> Self {
        Self { x1: 0.0, y1: 0.0 }
    }

    fn process(&mut self, input: f32, cutoff_hz: f32, sample_rate: f32) -> f32 {
        let rc = 1.0 / (TAU * cutoff_hz.max(20.0));
        let dt = 1.0 / sample_rate;
        let alpha = rc / (rc + dt);
        let output = alpha * (self.y1 + input - self.x1);
        self.x1 = input;
        self.y1 = output;
        output
    }
}

struct Limiter {
    envelope: f32,
}

impl Limiter {
    fn new() -> Self {
        Self { envelope: 0.0 }
    }

    fn process(&mut self, left: f32, right: f32, gain: f32) -> (f32, f32) {
        let peak = left.abs().max(right.abs());
        if peak > self.envelope {
            self.envelope = peak;
        } else {
            self.envelope *= 0.999;
        }

        let threshold = 0.92;
        let limiter_gain = if self.envelope > threshold {
            threshold / self.envelope
        } else {
            1.0
        };

        (
            (left * limiter_gain * gain).clamp(-1.0, 1.0),
            (right * limiter_gain * gain).clamp(-1.0, 1.0),
        )
    }
}

fn read_copy<T: Copy>(lock: &RwLock<T>) -> T {
    match lock.read() {
        Ok(guard) => *guard,
        Err(poisoned) => *poisoned.into_inner(),
    }
}

fn write_copy<T: Copy>(lock: &RwLock<T>, value: T) {
    match lock.write() {
        Ok(mut guard) => *guard = value,
        Err(poisoned) => *poisoned.into_inner() = value,
    }
}

fn wrap_phase(mut phase: f32) -> f32 {
    while phase >= TAU {
        phase -= TAU;
    }
    phase
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_cue_fades_to_silence() {
        let mut voice = ProcessVoice::new(48_000.0);
        let cue = SoundCue {
            active: false,
            hum_gain: 0.2,
            noise_gain: 0.2,
            ..SoundCue::default()
        };
        let mut last = (1.0, 1.0);
        for _ in 0..48_000 {
            last = voice.next_sample(cue, false);
        }
        assert_eq!(last, (0.0, 0.0));
    }

    #[test]
    fn muted_voice_is_silent_and_playing_voice_is_not() {
        let cue = SoundCue {
            active: true,
            hum_gain: 0.2,
            noise_gain: 0.1,
            ..SoundCue::default()
        };

        let mut muted = ProcessVoice::new(48_000.0);
        let mut loud = ProcessVoice::new(48_000.0);
        let mut peak_loud: f32 = 0.0;
        for _ in 0..24_000 {
            assert_eq!(muted.next_sample(cue, true), (0.0, 0.0));
            let (l, r) = loud.next_sample(cue, false);
            peak_loud = peak_loud.max(l.abs()).max(r.abs());
            assert!(l.abs() <= 1.0 && r.abs() <= 1.0);
        }
        assert!(peak_loud > 0.001);
    }

    #[test]
    fn smoothed_converges_to_target() {
        let mut value = Smoothed::new(0.01);
        for _ in 0..5_000 {
            value.next(0.5);
        }
        assert!((value.value - 0.5).abs() < 1e-3);
    }
}
