//! Audio resampling shared by every sound source (YM2612, PSG, RF5C164): each
//! source runs at its own native rate and the frontend wants a single
//! device-chosen output rate.

use bincode::{Decode, Encode};
use std::collections::VecDeque;

pub const DEFAULT_OUTPUT_FREQUENCY: u64 = 48000;

// Scale frequencies by 1e9 before dividing so that non-integer source rates
// (e.g. NTSC FM clocks) don't accumulate rounding error over a long session.
const RESAMPLE_SCALING_FACTOR: u64 = 1_000_000_000;

/// 4-point cubic Hermite interpolation.
/// <https://yehar.com/blog/wp-content/uploads/2009/08/deip.pdf>
#[must_use]
pub fn interpolate_cubic_hermite_4p([ym1, y0, y1, y2]: [f64; 4], x: f64) -> f64 {
    let c0 = y0;
    let c1 = 0.5 * (y1 - ym1);
    let c2 = ym1 - 2.5 * y0 + 2.0 * y1 - 0.5 * y2;
    let c3 = 0.5 * (y2 - ym1) + 1.5 * (y0 - y1);

    ((c3 * x + c2) * x + c1) * x + c0
}

/// Per-source resampler: collects native-rate samples and emits samples at
/// the configured output rate using cubic Hermite interpolation.
#[derive(Debug, Clone, Encode, Decode)]
pub struct CubicResampler {
    scaled_source_frequency: u64,
    output_frequency: u64,
    cycle_counter_product: u64,
    scaled_x_counter: u64,
    input_samples_l: [f64; 4],
    input_samples_r: [f64; 4],
    output_samples: VecDeque<(f64, f64)>,
}

impl CubicResampler {
    #[must_use]
    pub fn new(source_frequency: f64) -> Self {
        Self {
            scaled_source_frequency: scale_source_frequency(source_frequency),
            output_frequency: DEFAULT_OUTPUT_FREQUENCY,
            cycle_counter_product: 0,
            scaled_x_counter: 0,
            input_samples_l: [0.0; 4],
            input_samples_r: [0.0; 4],
            output_samples: VecDeque::with_capacity(48000 / 60 * 2),
        }
    }

    pub fn collect_sample(&mut self, sample_l: f64, sample_r: f64) {
        push_sample(&mut self.input_samples_l, sample_l);
        push_sample(&mut self.input_samples_r, sample_r);

        let scaled_output_frequency = self.output_frequency * RESAMPLE_SCALING_FACTOR;
        self.cycle_counter_product += scaled_output_frequency;
        while self.cycle_counter_product >= self.scaled_source_frequency {
            self.cycle_counter_product -= self.scaled_source_frequency;

            self.scaled_x_counter += self.scaled_source_frequency;
            while self.scaled_x_counter >= scaled_output_frequency {
                self.scaled_x_counter -= scaled_output_frequency;
            }

            let x = (self.scaled_x_counter as f64) / (scaled_output_frequency as f64);
            let output_l = interpolate_cubic_hermite_4p(self.input_samples_l, x).clamp(-1.0, 1.0);
            let output_r = interpolate_cubic_hermite_4p(self.input_samples_r, x).clamp(-1.0, 1.0);
            self.output_samples.push_back((output_l, output_r));
        }
    }

    #[must_use]
    pub fn output_buffer_len(&self) -> usize {
        self.output_samples.len()
    }

    pub fn output_buffer_pop_front(&mut self) -> Option<(f64, f64)> {
        self.output_samples.pop_front()
    }

    pub fn update_source_frequency(&mut self, source_frequency: f64) {
        self.scaled_source_frequency = scale_source_frequency(source_frequency);
    }

    pub fn update_output_frequency(&mut self, output_frequency: u64) {
        self.output_frequency = output_frequency;
    }
}

fn scale_source_frequency(source_frequency: f64) -> u64 {
    (source_frequency * RESAMPLE_SCALING_FACTOR as f64).round() as u64
}

fn push_sample(samples: &mut [f64; 4], sample: f64) {
    samples.copy_within(1.., 0);
    samples[3] = sample;
}

/// Single-pole / two-pole IIR filter used for the low-pass filters on the
/// YM2612 and RF5C164 audio paths.
#[derive(Debug, Clone, Encode, Decode)]
pub struct IirFilter<const N: usize> {
    b0: f64,
    b: [f64; N],
    a: [f64; N],
    prev_samples: [f64; N],
    prev_outputs: [f64; N],
}

impl<const N: usize> IirFilter<N> {
    #[must_use]
    pub fn new(b: &[f64], a: &[f64]) -> Self {
        assert!(N > 0);
        assert_eq!(b.len(), N + 1);
        assert_eq!(a.len(), N + 1);

        Self {
            b0: b[0],
            b: b[1..].try_into().unwrap(),
            a: a[1..].try_into().unwrap(),
            prev_samples: [0.0; N],
            prev_outputs: [0.0; N],
        }
    }

    #[must_use]
    pub fn filter(&mut self, sample: f64) -> f64 {
        let output = self.b0 * sample
            + std::iter::zip(&self.b, &self.prev_samples).map(|(&c, &n)| c * n).sum::<f64>()
            - std::iter::zip(&self.a, &self.prev_outputs).map(|(&c, &n)| c * n).sum::<f64>();

        for i in (1..N).rev() {
            self.prev_samples[i] = self.prev_samples[i - 1];
            self.prev_outputs[i] = self.prev_outputs[i - 1];
        }
        self.prev_samples[0] = sample;
        self.prev_outputs[0] = output;

        output
    }

    pub fn reset(&mut self) {
        self.prev_samples.fill(0.0);
        self.prev_outputs.fill(0.0);
    }
}

pub type FirstOrderIirFilter = IirFilter<1>;
pub type SecondOrderIirFilter = IirFilter<2>;

// Arbitrary power of 2 to keep total sample count small-ish for better f64 precision
const SAMPLE_COUNT_MODULO: u64 = 1 << 27;

/// FIR low-pass filter plus fixed-ratio decimation, for sources (YM2612, PSG, RF5C164) whose
/// native rate is a simple multiple of 48 KHz rather than an arbitrary ratio that needs
/// interpolation like [`CubicResampler`]. `ZERO_PADDING` upsamples by interleaving that many
/// zero samples between each input sample before filtering, for sources whose native rate is
/// below the output rate.
#[derive(Debug, Clone, Encode, Decode)]
pub struct SignalResampler<const LPF_TAPS: usize, const ZERO_PADDING: usize> {
    samples_l: VecDeque<f64>,
    samples_r: VecDeque<f64>,
    output: VecDeque<(f64, f64)>,
    sample_count: u64,
    next_sample: u64,
    next_sample_float: f64,
    downsampling_ratio: f64,
    hpf_charge_factor: f64,
    hpf_capacitor_l: f64,
    hpf_capacitor_r: f64,
    lpf_coefficient_0: f64,
    lpf_coefficients: [f64; LPF_TAPS],
}

impl<const LPF_TAPS: usize, const ZERO_PADDING: usize> SignalResampler<LPF_TAPS, ZERO_PADDING> {
    #[must_use]
    pub fn new(
        source_frequency: f64,
        lpf_coefficient_0: f64,
        lpf_coefficients: [f64; LPF_TAPS],
        hpf_charge_factor: f64,
    ) -> Self {
        let downsampling_ratio = source_frequency * (ZERO_PADDING + 1) as f64
            / DEFAULT_OUTPUT_FREQUENCY as f64;
        Self {
            samples_l: VecDeque::new(),
            samples_r: VecDeque::new(),
            output: VecDeque::new(),
            sample_count: 0,
            next_sample: downsampling_ratio.round() as u64,
            next_sample_float: downsampling_ratio,
            downsampling_ratio,
            hpf_charge_factor,
            hpf_capacitor_l: 0.0,
            hpf_capacitor_r: 0.0,
            lpf_coefficient_0,
            lpf_coefficients,
        }
    }

    fn buffer_sample(&mut self, sample_l: f64, sample_r: f64) {
        self.samples_l.push_back(sample_l);
        self.samples_r.push_back(sample_r);

        if self.samples_l.len() > self.lpf_coefficients.len() {
            self.samples_l.pop_front();
        }
        if self.samples_r.len() > self.lpf_coefficients.len() {
            self.samples_r.pop_front();
        }

        self.sample_count = (self.sample_count + 1) % SAMPLE_COUNT_MODULO;
        if self.sample_count == self.next_sample {
            self.next_sample_float =
                (self.next_sample_float + self.downsampling_ratio) % SAMPLE_COUNT_MODULO as f64;
            self.next_sample = (self.next_sample_float.round() as u64) % SAMPLE_COUNT_MODULO;

            let sample_l = Self::filtered_sample(&self.samples_l, self.lpf_coefficient_0, &self.lpf_coefficients);
            let sample_r = Self::filtered_sample(&self.samples_r, self.lpf_coefficient_0, &self.lpf_coefficients);
            self.output.push_back((sample_l, sample_r));
        }
    }

    fn filtered_sample(
        buffer: &VecDeque<f64>,
        lpf_coefficient_0: f64,
        lpf_coefficients: &[f64; LPF_TAPS],
    ) -> f64 {
        let sample = lpf_coefficient_0
            + lpf_coefficients.iter().copied().zip(buffer.iter().copied()).map(|(a, b)| a * b).sum::<f64>();
        (sample * (ZERO_PADDING + 1) as f64).clamp(-1.0, 1.0)
    }

    #[inline]
    pub fn collect_sample(&mut self, sample_l: f64, sample_r: f64) {
        let sample_l =
            high_pass_filter(sample_l, self.hpf_charge_factor, &mut self.hpf_capacitor_l);
        let sample_r =
            high_pass_filter(sample_r, self.hpf_charge_factor, &mut self.hpf_capacitor_r);

        self.buffer_sample(sample_l, sample_r);
        for _ in 0..ZERO_PADDING {
            self.buffer_sample(0.0, 0.0);
        }
    }

    #[inline]
    #[must_use]
    pub fn output_buffer_len(&self) -> usize {
        self.output.len()
    }

    #[inline]
    pub fn output_buffer_pop_front(&mut self) -> Option<(f64, f64)> {
        self.output.pop_front()
    }
}

fn high_pass_filter(sample: f64, charge_factor: f64, capacitor: &mut f64) -> f64 {
    let filtered_sample = sample - *capacitor;
    *capacitor = sample - charge_factor * filtered_sample;
    filtered_sample
}

/// Dynamic audio-sync rate controller: nudges the output sample rate by a few
/// tenths of a percent to keep the cross-thread ring buffer near its target
/// fullness instead of underflowing or overflowing.
#[derive(Debug, Clone)]
pub struct DynamicResamplingRate {
    base_output_frequency: u32,
    dynamic_output_frequency: u32,
    dynamic_update_counter: u32,
    target_audio_buffer_size: u32,
}

impl DynamicResamplingRate {
    #[must_use]
    pub fn new(base_output_frequency: u32, target_audio_buffer_size: u32) -> Self {
        Self {
            base_output_frequency,
            dynamic_output_frequency: base_output_frequency,
            dynamic_update_counter: 0,
            target_audio_buffer_size,
        }
    }

    pub fn update_config(&mut self, base_output_frequency: u32, target_audio_buffer_size: u32) {
        *self = Self::new(base_output_frequency, target_audio_buffer_size);
    }

    #[must_use]
    pub fn current_output_frequency(&self) -> u32 {
        self.dynamic_output_frequency
    }

    pub fn adjust(&mut self, audio_buffer_len: u32) {
        const MAX_DELTA: f64 = 0.005;
        const UPDATE_PERIOD: u32 = 20;

        self.dynamic_update_counter += 1;
        if self.dynamic_update_counter != UPDATE_PERIOD {
            return;
        }
        self.dynamic_update_counter = 0;

        let target_len: f64 = self.target_audio_buffer_size.into();
        let current_len: f64 = audio_buffer_len.into();
        let difference = ((target_len - current_len) / target_len).clamp(-1.0, 1.0);
        let adjustment = 1.0 + MAX_DELTA * difference;

        self.dynamic_output_frequency =
            (adjustment * f64::from(self.base_output_frequency)).round() as u32;

        log::debug!(
            "Adjusted dynamic output frequency to {}; target={target_len}, current={current_len}",
            self.dynamic_output_frequency
        );
    }
}
