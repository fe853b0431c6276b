use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_queue::ArrayQueue;

/// Host audio sink: the emulation thread pushes mono i16 samples, the
/// cpal callback drains them into whatever format the device wants.
pub struct AudioOutput {
    queue: Arc<ArrayQueue<i16>>,
    _stream: cpal::Stream,
    sample_rate: u32,
}

impl AudioOutput {
    pub fn new() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().or_else(|| {
            log::warn!("no audio output device, running silent");
            None
        })?;
        let supported = device.default_output_config().ok()?;

        let config: cpal::StreamConfig = supported.config();
        let sample_rate = config.sample_rate.0;
        let channels = config.channels as usize;

        // a quarter second of buffer between emulation and callback
        let queue = Arc::new(ArrayQueue::new(sample_rate as usize / 4));

        let err_fn = |err| log::error!("audio stream error: {}", err);
        let stream = match supported.sample_format() {
            cpal::SampleFormat::F32 => {
                let queue = queue.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [f32], _: &_| {
                            for frame in data.chunks_mut(channels) {
                                let s = queue.pop().unwrap_or(0) as f32 / i16::MAX as f32;
                                frame.fill(s);
                            }
                        },
                        err_fn,
                        None,
                    )
                    .ok()?
            }
            cpal::SampleFormat::I16 => {
                let queue = queue.clone();
                device
                    .build_output_stream(
                        &config,
                        move |data: &mut [i16], _: &_| {
                            for frame in data.chunks_mut(channels) {
                                frame.fill(queue.pop().unwrap_or(0));
                            }
                        },
                        err_fn,
                        None,
                    )
                    .ok()?
            }
            other => {
                log::warn!("unsupported audio sample format {:?}", other);
                return None;
            }
        };

        stream.play().ok()?;
        log::info!("audio: {} Hz, {} channels", sample_rate, channels);

        Some(Self {
            queue,
            _stream: stream,
            sample_rate,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn push(&self, samples: &[i16]) {
        for &s in samples {
            let _ = self.queue.force_push(s);
        }
    }
}
