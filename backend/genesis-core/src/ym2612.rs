//! YM2612 FM synthesis sound chip, also known as the OPN2
//!
//! Based on community research documented here:
//! <http://gendev.spritesmind.net/forum/viewtopic.php?f=24&t=386>

mod envelope;
mod lfo;
mod phase;
mod timer;

use crate::ym2612::envelope::EnvelopeGenerator;
use crate::ym2612::lfo::LowFrequencyOscillator;
use crate::ym2612::phase::PhaseGenerator;
use crate::ym2612::timer::{TimerA, TimerB, TimerTickEffect};
use bincode::{Decode, Encode};
use mc_common::num::GetBit;
use std::array;
use std::sync::LazyLock;

const FM_SAMPLE_DIVIDER: u8 = 24;

// Phase is 10 bits
const PHASE_MASK: u16 = 0x03FF;
const HALF_PHASE_MASK: u16 = PHASE_MASK >> 1;

// Operator output is signed 14-bit
const OPERATOR_OUTPUT_MIN: i16 = -0x2000;
const OPERATOR_OUTPUT_MAX: i16 = 0x1FFF;

// Group 1 is channels 1-3 (idx 0-2), group 2 is channels 4-6 (idx 3-5)
const GROUP_1_BASE_CHANNEL: usize = 0;
const GROUP_2_BASE_CHANNEL: usize = 3;

// The YM2612 always raises the BUSY line for exactly 32 internal cycles after a register write
const WRITE_BUSY_CYCLES: u8 = 32;

fn compute_key_code(f_number: u16, block: u8) -> u8 {
    // Bits 4-2: Block
    // Bit 1: F11
    // Bit 0: (F11 & (F10 | F9 | F8)) | (!F11 & F10 & F9 & F8)
    let f11 = f_number.bit(10);
    let f10 = f_number.bit(9);
    let f9 = f_number.bit(8);
    let f8 = f_number.bit(7);
    (block << 2)
        | (u8::from(f11) << 1)
        | u8::from((f11 && (f10 || f9 || f8)) || (!f11 && f10 && f9 && f8))
}

#[derive(Debug, Clone, Default, Encode, Decode)]
struct FmOperator {
    phase: PhaseGenerator,
    envelope: EnvelopeGenerator,
    am_enabled: bool,
    current_output: i16,
    last_output: i16,
    // Copied here from the channel for convenience during sample generation
    lfo_counter: u8,
    am_sensitivity: u8,
}

impl FmOperator {
    fn update_frequency(&mut self, f_number: u16, block: u8) {
        self.phase.f_number = f_number;
        self.phase.block = block;
        self.envelope.update_key_scale_rate(f_number, block);
    }

    fn update_key_scale(&mut self, key_scale: u8) {
        self.envelope.key_scale = key_scale;
        self.envelope.update_key_scale_rate(self.phase.f_number, self.phase.block);
    }

    fn key_on_or_off(&mut self, value: bool) {
        if value {
            if !self.envelope.is_key_on() {
                self.phase.reset();
                self.envelope.key_on();
            }
        } else {
            self.envelope.key_off();
        }
    }

    fn sample_clock(&mut self, modulation_input: i16) -> i16 {
        let phase = self.phase.current_phase().wrapping_add_signed(modulation_input);

        // Phase is a 10-bit value representing an angle from 0 to 2*PI. Hardware splits this into
        // a sign bit and a half-phase value from 0 to PI, computes the amplitude based on the
        // half-phase, then applies the sign bit to the final output.
        let sign = phase.bit(9);
        let sine_attenuation = phase_to_attenuation(phase);

        let envelope_attenuation = self.envelope.current_attenuation();
        let envelope_am_attenuation = if self.am_enabled {
            let am_attenuation = lfo::amplitude_modulation(self.lfo_counter, self.am_sensitivity);
            (envelope_attenuation + am_attenuation).clamp(0, envelope::MAX_ATTENUATION)
        } else {
            envelope_attenuation
        };

        // Phase attenuation (4.8 fixed-point) plus envelope/AM attenuation (4.6 fixed-point)
        let total_attenuation = sine_attenuation + (envelope_am_attenuation << 2);

        let amplitude = attenuation_to_amplitude(total_attenuation);
        let output = if sign { -(amplitude as i16) } else { amplitude as i16 };

        self.last_output = self.current_output;
        self.current_output = output;

        output
    }
}

// Logic based on http://gendev.spritesmind.net/forum/viewtopic.php?p=6114#p6114
#[inline]
fn phase_to_attenuation(phase: u16) -> u16 {
    // Hardware has a 256-entry quarter-sine table; this uses a half-sine table for simplicity,
    // computed with the same formula.
    static LOG_SINE_TABLE: LazyLock<[u16; 512]> = LazyLock::new(|| {
        array::from_fn(|mut i| {
            use std::f64::consts::PI;

            if i.bit(8) {
                // Second quarter-phase
                i = (!i) & 0xFF;
            }

            // Table indices represent numbers in the range 0 to PI/2, slightly offset to avoid
            // computing log2(0)
            let n = ((i << 1) | 1) as f64;
            let sine = (n / 512.0 * PI / 2.0).sin();

            // Attenuation on a log2 scale instead of log10
            let attenuation = -sine.log2();

            // 12-bit values representing 4.8 fixed-point
            (attenuation * f64::from(1 << 8)).round() as u16
        })
    });

    LOG_SINE_TABLE[(phase & HALF_PHASE_MASK) as usize]
}

// Logic based on http://gendev.spritesmind.net/forum/viewtopic.php?p=6114#p6114
#[inline]
fn attenuation_to_amplitude(attenuation: u16) -> u16 {
    static POW2_TABLE: LazyLock<[u16; 256]> = LazyLock::new(|| {
        array::from_fn(|i| {
            // Lookup table for 2^(-n), where n is (i + 1) / 256
            let n = ((i + 1) as f64) / 256.0;
            let inverse_pow2 = 2.0_f64.powf(-n);

            // 11-bit values representing 0.11 fixed-point
            (inverse_pow2 * f64::from(1 << 11)).round() as u16
        })
    });

    // Attenuation is interpreted as a 5.8 fixed-point number on a log2 scale
    let int_part = (attenuation >> 8) & 0x1F;
    if int_part >= 13 {
        // Result is guaranteed to shift down to 0
        return 0;
    }

    let fract_part = attenuation & 0xFF;
    let fract_pow2 = POW2_TABLE[fract_part as usize];
    (fract_pow2 << 2) >> int_part
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
enum FrequencyMode {
    #[default]
    Single,
    Multiple,
}

#[derive(Debug, Clone, Encode, Decode)]
struct FmChannel {
    operators: [FmOperator; 4],
    mode: FrequencyMode,
    pending_ch_f_number_high: u8,
    channel_f_number: u16,
    pending_ch_block: u8,
    channel_block: u8,
    pending_op_f_numbers_high: [u8; 3],
    operator_f_numbers: [u16; 3],
    pending_op_blocks: [u8; 3],
    operator_blocks: [u8; 3],
    algorithm: u8,
    feedback_level: u8,
    am_sensitivity: u8,
    fm_sensitivity: u8,
    l_output: bool,
    r_output: bool,
    current_output: i16,
}

impl FmChannel {
    fn new() -> Self {
        Self {
            operators: array::from_fn(|_| FmOperator::default()),
            mode: FrequencyMode::Single,
            pending_ch_f_number_high: 0,
            channel_f_number: 0,
            pending_ch_block: 0,
            channel_block: 0,
            pending_op_f_numbers_high: [0; 3],
            operator_f_numbers: [0; 3],
            pending_op_blocks: [0; 3],
            operator_blocks: [0; 3],
            algorithm: 0,
            feedback_level: 0,
            am_sensitivity: 0,
            fm_sensitivity: 0,
            l_output: true,
            r_output: true,
            current_output: 0,
        }
    }

    #[inline]
    fn clock(&mut self, lfo_counter: u8, quantization_mask: i16) {
        for operator in &mut self.operators {
            operator.phase.fm_clock(lfo_counter, self.fm_sensitivity);
            operator.envelope.fm_clock(&mut operator.phase);

            operator.lfo_counter = lfo_counter;
            operator.am_sensitivity = self.am_sensitivity;
        }

        self.generate_sample(quantization_mask);
    }

    fn generate_sample(&mut self, out_mask: i16) {
        macro_rules! carrier_sum {
            ($($carrier:expr),*) => {
                {
                    let mut sum = 0;
                    $(sum += $carrier & out_mask;)*
                    sum.clamp(OPERATOR_OUTPUT_MIN & out_mask, OPERATOR_OUTPUT_MAX & out_mask)
                }
            }
        }

        let op1_feedback = match self.feedback_level {
            0 => 0,
            f => (self.operators[0].current_output + self.operators[0].last_output) >> (10 - f),
        };

        // Operator order is 1 -> 3 -> 2 -> 4, per http://gendev.spritesmind.net/forum/viewtopic.php?p=30063#p30063
        // When two operators run back to back and the first modulates the second, the second
        // uses the first's previous-cycle output rather than its current-cycle output, due to how
        // the chip pipelines operator evaluation internally.
        let sample = match self.algorithm {
            0 => {
                // O1 -> O2 -> O3 -> O4 -> Output
                let m1 = self.operators[0].sample_clock(op1_feedback);

                let m2_old = self.operators[1].current_output;
                self.operators[1].sample_clock(m1 >> 1);

                let m3 = self.operators[2].sample_clock(m2_old >> 1);
                let c4 = self.operators[3].sample_clock(m3 >> 1);

                c4 & out_mask
            }
            1 => {
                // O1, O2 -> O3 -> O4 -> Output
                let m1_old = self.operators[0].current_output;
                self.operators[0].sample_clock(op1_feedback);

                let m2_old = self.operators[1].current_output;
                self.operators[1].sample_clock(0);

                let m3 = self.operators[2].sample_clock((m1_old + m2_old) >> 1);
                let c4 = self.operators[3].sample_clock(m3 >> 1);

                c4 & out_mask
            }
            2 => {
                // O1, (O2 -> O3) -> O4 -> Output
                let m1 = self.operators[0].sample_clock(op1_feedback);

                let m2_old = self.operators[1].current_output;
                self.operators[1].sample_clock(0);

                let m3 = self.operators[2].sample_clock(m2_old >> 1);
                let c4 = self.operators[3].sample_clock((m1 + m3) >> 1);

                c4 & out_mask
            }
            3 => {
                // (O1 -> O2), O3 -> O4 -> Output
                let m1 = self.operators[0].sample_clock(op1_feedback);

                let m2_old = self.operators[1].current_output;
                self.operators[1].sample_clock(m1 >> 1);

                let m3 = self.operators[2].sample_clock(0);
                let c4 = self.operators[3].sample_clock((m2_old + m3) >> 1);

                c4 & out_mask
            }
            4 => {
                // (O1 -> O2), (O3 -> O4) -> Output
                let m1 = self.operators[0].sample_clock(op1_feedback);
                let c2 = self.operators[1].sample_clock(m1 >> 1);
                let m3 = self.operators[2].sample_clock(0);
                let c4 = self.operators[3].sample_clock(m3 >> 1);

                carrier_sum!(c2, c4)
            }
            5 => {
                // O1 -> (O2, O3, O4) -> Output
                let m1_old = self.operators[0].current_output;
                let m1 = self.operators[0].sample_clock(op1_feedback);
                let c2 = self.operators[1].sample_clock(m1 >> 1);
                let c3 = self.operators[2].sample_clock(m1_old >> 1);
                let c4 = self.operators[3].sample_clock(m1 >> 1);

                carrier_sum!(c2, c3, c4)
            }
            6 => {
                // (O1 -> O2), O3, O4 -> Output
                let m1 = self.operators[0].sample_clock(op1_feedback);
                let c2 = self.operators[1].sample_clock(m1 >> 1);
                let c3 = self.operators[2].sample_clock(0);
                let c4 = self.operators[3].sample_clock(0);

                carrier_sum!(c2, c3, c4)
            }
            7 => {
                // O1, O2, O3, O4 -> Output
                let c1 = self.operators[0].sample_clock(op1_feedback);
                let c2 = self.operators[1].sample_clock(0);
                let c3 = self.operators[2].sample_clock(0);
                let c4 = self.operators[3].sample_clock(0);

                carrier_sum!(c1, c2, c3, c4)
            }
            _ => unreachable!("algorithm is always masked to 0..=7"),
        };

        self.current_output = sample;
    }

    // Re-apply F-number/block to the phase generators after a channel-level or operator-level
    // frequency register write, or after the channel's frequency mode changes
    fn update_phase_generators(&mut self) {
        match self.mode {
            FrequencyMode::Single => {
                let f_number = self.channel_f_number;
                let block = self.channel_block;
                for operator in &mut self.operators {
                    operator.update_frequency(f_number, block);
                }
            }
            FrequencyMode::Multiple => {
                for i in 0..3 {
                    let f_number = self.operator_f_numbers[i];
                    let block = self.operator_blocks[i];

                    self.operators[i].update_frequency(f_number, block);
                }

                let last_f_number = self.channel_f_number;
                let last_block = self.channel_block;

                self.operators[3].update_frequency(last_f_number, last_block);
            }
        }
    }
}

impl Default for FmChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YmTickEffect {
    None,
    OutputSample,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct Ym2612 {
    channels: [FmChannel; 6],
    dac_channel_enabled: bool,
    dac_channel_sample: u8,
    lfo: LowFrequencyOscillator,
    group1_register: u8,
    group2_register: u8,
    pending_timer_a_high: u8,
    sample_divider: u8,
    busy_cycles_remaining: u8,
    timer_a: TimerA,
    timer_b: TimerB,
    csm_enabled: bool,
    quantize_output: bool,
    current_sample: (f64, f64),
}

impl Ym2612 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            channels: array::from_fn(|_| FmChannel::default()),
            dac_channel_enabled: false,
            dac_channel_sample: 0,
            lfo: LowFrequencyOscillator::new(),
            group1_register: 0,
            group2_register: 0,
            pending_timer_a_high: 0,
            sample_divider: FM_SAMPLE_DIVIDER,
            busy_cycles_remaining: 0,
            timer_a: TimerA::new(),
            timer_b: TimerB::new(),
            csm_enabled: false,
            // Real hardware's output is effectively a 9-bit DAC despite 14-bit internal precision
            quantize_output: true,
            current_sample: (0.0, 0.0),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // Set the register address for the next write to the group 1 data port ($4000/$4001)
    pub fn write_address_1(&mut self, value: u8) {
        self.group1_register = value;
    }

    // Set the register address for the next write to the group 2 data port ($4002/$4003)
    pub fn write_address_2(&mut self, value: u8) {
        self.group2_register = value;
    }

    // Write to the group 1 data port (system registers + channels 1-3)
    pub fn write_data_1(&mut self, value: u8) {
        let register = self.group1_register;
        self.busy_cycles_remaining = WRITE_BUSY_CYCLES;

        match register {
            0x22 => {
                self.lfo.set_enabled(value.bit(3));
                self.lfo.set_frequency(value & 0x07);
            }
            0x24 => {
                // Timer A interval bits 9-2
                self.pending_timer_a_high = value;
            }
            0x25 => {
                // Timer A interval bits 1-0; combines with the last-written high byte
                let interval =
                    (u32::from(self.pending_timer_a_high) << 2) | u32::from(value & 0x03);
                self.timer_a.set_interval(interval);
            }
            0x26 => {
                self.timer_b.set_interval(value.into());
            }
            0x27 => {
                // Channel 3 frequency mode + timer control
                let mode =
                    if value & 0xC0 != 0 { FrequencyMode::Multiple } else { FrequencyMode::Single };
                self.csm_enabled = value & 0xC0 == 0x80;

                // Mode applies only to channel 3
                let channel = &mut self.channels[2];
                channel.mode = mode;
                channel.update_phase_generators();

                self.timer_a.set_enabled(value.bit(0));
                self.timer_a.set_overflow_flag_enabled(value.bit(2));
                if value.bit(4) {
                    self.timer_a.clear_overflow_flag();
                }

                self.timer_b.set_enabled(value.bit(1));
                self.timer_b.set_overflow_flag_enabled(value.bit(3));
                if value.bit(5) {
                    self.timer_b.clear_overflow_flag();
                }
            }
            0x28 => {
                let base_channel =
                    if value.bit(2) { GROUP_2_BASE_CHANNEL } else { GROUP_1_BASE_CHANNEL };
                let offset = value & 0x03;
                if offset < 3 {
                    let channel_idx = base_channel + offset as usize;
                    let channel = &mut self.channels[channel_idx];
                    channel.operators[0].key_on_or_off(value.bit(4));
                    channel.operators[1].key_on_or_off(value.bit(5));
                    channel.operators[2].key_on_or_off(value.bit(6));
                    channel.operators[3].key_on_or_off(value.bit(7));
                }
            }
            0x2A => {
                self.dac_channel_sample = value;
            }
            0x2B => {
                self.dac_channel_enabled = value.bit(7);
            }
            0x30..=0x9F => {
                self.write_operator_level_register(register, value, GROUP_1_BASE_CHANNEL);
            }
            0xA0..=0xBF => {
                self.write_channel_level_register(register, value, GROUP_1_BASE_CHANNEL);
            }
            _ => {}
        }
    }

    // Write to the group 2 data port (channels 4-6)
    pub fn write_data_2(&mut self, value: u8) {
        let register = self.group2_register;
        self.busy_cycles_remaining = WRITE_BUSY_CYCLES;

        match register {
            0x30..=0x9F => {
                self.write_operator_level_register(register, value, GROUP_2_BASE_CHANNEL);
            }
            0xA0..=0xBF => {
                self.write_channel_level_register(register, value, GROUP_2_BASE_CHANNEL);
            }
            _ => {}
        }
    }

    // All four YM2612 register addresses ($4000-$4003) read back the same status byte
    #[must_use]
    pub fn read_register(&self) -> u8 {
        (u8::from(self.busy_cycles_remaining != 0) << 7)
            | (u8::from(self.timer_b.overflow_flag()) << 1)
            | u8::from(self.timer_a.overflow_flag())
    }

    #[must_use]
    pub fn tick(&mut self) -> YmTickEffect {
        self.busy_cycles_remaining = self.busy_cycles_remaining.saturating_sub(1);

        self.sample_divider -= 1;
        if self.sample_divider != 0 {
            return YmTickEffect::None;
        }
        self.sample_divider = FM_SAMPLE_DIVIDER;

        self.lfo.tick();

        self.timer_b.tick();
        let timer_a_effect = self.timer_a.tick();

        if self.csm_enabled && timer_a_effect == TimerTickEffect::Overflowed {
            // CSM: whenever Timer A overflows, instantaneously key on & off all channel 3
            // operators that aren't already keyed on
            for operator in &mut self.channels[2].operators {
                if !operator.envelope.is_key_on() {
                    operator.key_on_or_off(true);
                    operator.key_on_or_off(false);
                }
            }
        }

        self.clock();
        self.current_sample = self.compute_sample();

        YmTickEffect::OutputSample
    }

    #[must_use]
    pub fn sample(&self) -> (f64, f64) {
        self.current_sample
    }

    fn compute_sample(&self) -> (f64, f64) {
        let mut sum_l = 0;
        let mut sum_r = 0;
        for (i, channel) in self.channels.iter().enumerate() {
            let sample = if i == 5 && self.dac_channel_enabled {
                // Channel 6 is in DAC mode; play the PCM sample instead of FM output.
                // Convert unsigned 8-bit sample to a signed 14-bit sample
                (i16::from(self.dac_channel_sample) - 128) << 6
            } else {
                channel.current_output
            };

            sum_l += i32::from(if channel.l_output { sample } else { 0 });
            sum_r += i32::from(if channel.r_output { sample } else { 0 });
        }

        // Each channel has a range of [-8192, 8191], so divide the sums by 6*8192 to get [-1.0, 1.0]
        (f64::from(sum_l) / 49152.0, f64::from(sum_r) / 49152.0)
    }

    fn write_operator_level_register(&mut self, register: u8, value: u8, base_channel_idx: usize) {
        let channel_offset = register & 0x03;
        if channel_offset == 3 {
            // Invalid; only 3 channels per group
            return;
        }

        let channel_idx = base_channel_idx + channel_offset as usize;
        // Operator comes from bits 2 and 3 of register, swapped (01=Operator 3, 10=Operator 2)
        let operator_idx = (((register & 0x08) >> 3) | ((register & 0x04) >> 1)) as usize;

        let operator = &mut self.channels[channel_idx].operators[operator_idx];
        match register >> 4 {
            0x03 => {
                operator.phase.multiple = value & 0x0F;
                operator.phase.detune = (value >> 4) & 0x07;
            }
            0x04 => {
                operator.envelope.total_level = value & 0x7F;
            }
            0x05 => {
                operator.envelope.attack_rate = value & 0x1F;
                operator.update_key_scale(value >> 6);
            }
            0x06 => {
                operator.envelope.decay_rate = value & 0x1F;
                operator.am_enabled = value.bit(7);
            }
            0x07 => {
                operator.envelope.sustain_rate = value & 0x1F;
            }
            0x08 => {
                operator.envelope.release_rate = value & 0x0F;
                operator.envelope.sustain_level = value >> 4;
            }
            0x09 => {
                operator.envelope.write_ssg_register(value);
            }
            _ => {}
        }
    }

    fn write_channel_level_register(&mut self, register: u8, value: u8, base_channel_idx: usize) {
        match register {
            0xA0..=0xA2 => {
                // F-number low bits
                let channel_idx = base_channel_idx + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];

                channel.channel_f_number =
                    u16::from_le_bytes([value, channel.pending_ch_f_number_high]);
                channel.channel_block = channel.pending_ch_block;

                channel.update_phase_generators();
            }
            0xA4..=0xA6 => {
                // F-number high bits and block; doesn't take effect until the low bits are written
                let channel_idx = base_channel_idx + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];
                channel.pending_ch_f_number_high = value & 7;
                channel.pending_ch_block = (value >> 3) & 7;
            }
            0xA8..=0xAA => {
                // Operator-level F-number low bits for channel 3
                let channel_idx = base_channel_idx + 2;
                let operator_idx = match register {
                    0xA8 => 2,
                    0xA9 => 0,
                    0xAA => 1,
                    _ => unreachable!("nested match expressions"),
                };
                let channel = &mut self.channels[channel_idx];

                let f_num_high = channel.pending_op_f_numbers_high[operator_idx];
                channel.operator_f_numbers[operator_idx] = u16::from_le_bytes([value, f_num_high]);
                channel.operator_blocks[operator_idx] = channel.pending_op_blocks[operator_idx];
                if channel.mode == FrequencyMode::Multiple {
                    channel.update_phase_generators();
                }
            }
            0xAC..=0xAE => {
                // Operator-level F-number high bits and block for channel 3
                let channel_idx = base_channel_idx + 2;
                let operator_idx = match register {
                    0xAC => 2,
                    0xAD => 0,
                    0xAE => 1,
                    _ => unreachable!("nested match expressions"),
                };
                let channel = &mut self.channels[channel_idx];
                channel.pending_op_f_numbers_high[operator_idx] = value & 7;
                channel.pending_op_blocks[operator_idx] = (value >> 3) & 7;
            }
            0xB0..=0xB2 => {
                // Algorithm and operator 1 feedback level
                let channel_idx = base_channel_idx + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];
                channel.algorithm = value & 0x07;
                channel.feedback_level = (value >> 3) & 0x07;
            }
            0xB4..=0xB6 => {
                // Stereo control and LFO sensitivity
                let channel_idx = base_channel_idx + (register & 0x03) as usize;
                let channel = &mut self.channels[channel_idx];
                channel.l_output = value.bit(7);
                channel.r_output = value.bit(6);
                channel.am_sensitivity = (value >> 4) & 0x03;
                channel.fm_sensitivity = value & 0x07;
            }
            _ => {}
        }
    }

    #[inline]
    fn clock(&mut self) {
        let lfo_counter = self.lfo.counter();
        let quantization_mask: i16 = if self.quantize_output {
            // Simulate a 9-bit DAC by masking out the lowest 5 bits of the 14-bit channel outputs
            !((1 << 5) - 1)
        } else {
            !0
        };

        for channel in &mut self.channels {
            channel.clock(lfo_counter, quantization_mask);
        }
    }
}

impl Default for Ym2612 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_flag() {
        let mut ym2612 = Ym2612::new();

        ym2612.write_address_1(0x30);
        ym2612.write_data_1(0xFF);

        assert_eq!(ym2612.read_register() & 0x80, 0x80);

        for _ in 0..WRITE_BUSY_CYCLES {
            ym2612.tick();
        }

        assert_eq!(ym2612.read_register() & 0x80, 0);
    }

    #[test]
    fn key_on_off_advances_envelope() {
        let mut ym2612 = Ym2612::new();

        ym2612.write_address_1(0x30);
        ym2612.write_data_1(0x71); // multiple=1
        ym2612.write_address_1(0xB0);
        ym2612.write_data_1(0x00); // algorithm 0

        ym2612.write_address_1(0x28);
        ym2612.write_data_1(0xF0); // key on all operators, channel 1

        assert!(ym2612.channels[0].operators[0].envelope.is_key_on());

        ym2612.write_address_1(0x28);
        ym2612.write_data_1(0x00); // key off all operators, channel 1

        assert!(!ym2612.channels[0].operators[0].envelope.is_key_on());
    }

    #[test]
    fn dac_sample_affects_channel_6() {
        let mut ym2612 = Ym2612::new();

        ym2612.write_address_1(0x2B);
        ym2612.write_data_1(0x80); // enable DAC
        ym2612.write_address_1(0x2A);
        ym2612.write_data_1(0xFF); // max DAC sample

        for _ in 0..FM_SAMPLE_DIVIDER {
            ym2612.tick();
        }

        let (l, _) = ym2612.sample();
        assert!(l > 0.0);
    }
}
