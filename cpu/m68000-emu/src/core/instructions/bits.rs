use crate::core::instructions::ShiftCount;
use crate::core::{
    AddressingMode, ConditionCodes, DataRegister, ExecuteResult, InstructionExecutor, OpSize,
};
use crate::traits::BusInterface;
use mc_common::num::GetBit;

use super::ShiftDirection;

impl<B: BusInterface> InstructionExecutor<'_, '_, B> {
    fn bit_number(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u8> {
        let raw = self.read_byte(source)?;
        let modulo = if dest.is_data_direct() { 32 } else { 8 };
        Ok((raw % modulo) as u8)
    }

    pub(super) fn btst(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let bit = self.bit_number(source, dest)?;
        let value = self.read_operand_for_bit_op(dest)?;

        self.registers.ccr = ConditionCodes { zero: !value.bit(bit), ..self.registers.ccr };

        Ok(self.bit_op_cycles(source, dest))
    }

    pub(super) fn bchg(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let bit = self.bit_number(source, dest)?;
        let value = self.read_operand_for_bit_op(dest)?;

        self.registers.ccr = ConditionCodes { zero: !value.bit(bit), ..self.registers.ccr };
        self.write_operand_for_bit_op(dest, value ^ (1 << bit))?;

        Ok(self.bit_op_cycles(source, dest) + if dest.is_data_direct() { 4 } else { 0 })
    }

    pub(super) fn bclr(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let bit = self.bit_number(source, dest)?;
        let value = self.read_operand_for_bit_op(dest)?;

        self.registers.ccr = ConditionCodes { zero: !value.bit(bit), ..self.registers.ccr };
        self.write_operand_for_bit_op(dest, value & !(1 << bit))?;

        Ok(self.bit_op_cycles(source, dest) + if dest.is_data_direct() { 6 } else { 0 })
    }

    pub(super) fn bset(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let bit = self.bit_number(source, dest)?;
        let value = self.read_operand_for_bit_op(dest)?;

        self.registers.ccr = ConditionCodes { zero: !value.bit(bit), ..self.registers.ccr };
        self.write_operand_for_bit_op(dest, value | (1 << bit))?;

        Ok(self.bit_op_cycles(source, dest) + if dest.is_data_direct() { 4 } else { 0 })
    }

    fn read_operand_for_bit_op(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        if dest.is_data_direct() { self.read_long_word(dest) } else { self.read_byte(dest) }
    }

    fn write_operand_for_bit_op(&mut self, dest: AddressingMode, value: u32) -> ExecuteResult<()> {
        if dest.is_data_direct() {
            self.write_long_word(dest, value)
        } else {
            self.write_byte(dest, value as u8)
        }
    }

    fn bit_op_cycles(&self, source: AddressingMode, dest: AddressingMode) -> u32 {
        let source_cycles = if source == AddressingMode::Immediate { 4 } else { 0 };
        let dest_cycles = if dest.is_data_direct() {
            4
        } else {
            4 + dest.address_calculation_cycles(OpSize::Byte)
        };
        source_cycles + dest_cycles
    }

    pub(super) fn clr_byte(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_clr(OpSize::Byte, dest)
    }

    pub(super) fn clr_word(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_clr(OpSize::Word, dest)
    }

    pub(super) fn clr_long_word(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_clr(OpSize::LongWord, dest)
    }

    fn do_clr(&mut self, size: OpSize, dest: AddressingMode) -> ExecuteResult<u32> {
        // Reading the destination first, even though the result is discarded, matches real
        // hardware: CLR performs a read-modify-write bus cycle.
        let _ = match size {
            OpSize::Byte => self.read_byte(dest)?,
            OpSize::Word => self.read_word(dest)?,
            OpSize::LongWord => self.read_long_word(dest)?,
        };

        match size {
            OpSize::Byte => self.write_byte(dest, 0)?,
            OpSize::Word => self.write_word(dest, 0)?,
            OpSize::LongWord => self.write_long_word(dest, 0)?,
        }

        self.registers.ccr =
            ConditionCodes { carry: false, overflow: false, zero: true, negative: false, ..self.registers.ccr };

        let mut cycles = match size {
            OpSize::Byte | OpSize::Word => 4,
            OpSize::LongWord => 8,
        };
        cycles += dest.address_calculation_cycles(size);
        if !dest.is_data_direct() {
            cycles += 4;
        }
        Ok(cycles)
    }

    pub(super) fn ext(&mut self, size: OpSize, register: DataRegister) -> u32 {
        let value = register.read_from(self.registers);
        let extended = match size {
            OpSize::Word => (value as i8) as i16 as u16 as u32,
            OpSize::LongWord => (value as i16) as i32 as u32,
            OpSize::Byte => panic!("EXT does not support size byte"),
        };

        match size {
            OpSize::Word => register.write_word_to(self.registers, extended as u16),
            OpSize::LongWord => register.write_long_word_to(self.registers, extended),
            OpSize::Byte => unreachable!(),
        }

        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: extended == 0,
            negative: match size {
                OpSize::Word => extended.bit(15),
                OpSize::LongWord => extended.bit(31),
                OpSize::Byte => unreachable!(),
            },
            ..self.registers.ccr
        };

        4
    }

    pub(super) fn swap(&mut self, register: DataRegister) -> u32 {
        let value = register.read_from(self.registers);
        let swapped = (value << 16) | (value >> 16);
        register.write_long_word_to(self.registers, swapped);

        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: swapped == 0,
            negative: swapped.bit(31),
            ..self.registers.ccr
        };

        4
    }

    pub(super) fn tas(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_byte(dest)? as u8;

        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: value == 0,
            negative: value.bit(7),
            ..self.registers.ccr
        };

        self.write_byte(dest, value | 0x80)?;

        Ok(if dest.is_data_direct() { 4 } else { 10 + dest.address_calculation_cycles(OpSize::Byte) })
    }

    fn shift_count_for(&self, count: ShiftCount) -> u32 {
        u32::from(count.get(self.registers))
    }

    pub(super) fn asd_register(
        &mut self,
        size: OpSize,
        direction: ShiftDirection,
        register: DataRegister,
        count: ShiftCount,
    ) -> u32 {
        let shift = self.shift_count_for(count);
        let value = sized_value(register.read_from(self.registers), size);

        let (result, carry, overflow) = arithmetic_shift(size, direction, value, shift);
        write_sized_register(self, register, size, result);

        self.registers.ccr = ConditionCodes {
            carry,
            overflow,
            zero: result == 0,
            negative: msb_of(size, result),
            extend: if shift == 0 { self.registers.ccr.extend } else { carry },
        };

        shift_register_cycles(size, shift)
    }

    pub(super) fn asd_memory(&mut self, direction: ShiftDirection, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_word(dest)?;
        let (result, carry, overflow) = arithmetic_shift(OpSize::Word, direction, value, 1);
        self.write_word(dest, result as u16)?;

        self.registers.ccr = ConditionCodes {
            carry,
            overflow,
            zero: result == 0,
            negative: msb_of(OpSize::Word, result),
            extend: carry,
        };

        Ok(8 + dest.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn lsd_register(
        &mut self,
        size: OpSize,
        direction: ShiftDirection,
        register: DataRegister,
        count: ShiftCount,
    ) -> u32 {
        let shift = self.shift_count_for(count);
        let value = sized_value(register.read_from(self.registers), size);

        let (result, carry) = logical_shift(size, direction, value, shift);
        write_sized_register(self, register, size, result);

        self.registers.ccr = ConditionCodes {
            carry,
            overflow: false,
            zero: result == 0,
            negative: msb_of(size, result),
            extend: if shift == 0 { self.registers.ccr.extend } else { carry },
        };

        shift_register_cycles(size, shift)
    }

    pub(super) fn lsd_memory(&mut self, direction: ShiftDirection, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_word(dest)?;
        let (result, carry) = logical_shift(OpSize::Word, direction, value, 1);
        self.write_word(dest, result as u16)?;

        self.registers.ccr = ConditionCodes {
            carry,
            overflow: false,
            zero: result == 0,
            negative: msb_of(OpSize::Word, result),
            extend: carry,
        };

        Ok(8 + dest.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn rod_register(
        &mut self,
        size: OpSize,
        direction: ShiftDirection,
        register: DataRegister,
        count: ShiftCount,
    ) -> u32 {
        let shift = self.shift_count_for(count) % bit_width(size);
        let value = sized_value(register.read_from(self.registers), size);

        let (result, carry) = rotate(size, direction, value, shift);
        write_sized_register(self, register, size, result);

        self.registers.ccr = ConditionCodes {
            carry: if shift == 0 { false } else { carry },
            overflow: false,
            zero: result == 0,
            negative: msb_of(size, result),
            ..self.registers.ccr
        };

        shift_register_cycles(size, shift)
    }

    pub(super) fn rod_memory(&mut self, direction: ShiftDirection, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_word(dest)?;
        let (result, carry) = rotate(OpSize::Word, direction, value, 1);
        self.write_word(dest, result as u16)?;

        self.registers.ccr = ConditionCodes {
            carry,
            overflow: false,
            zero: result == 0,
            negative: msb_of(OpSize::Word, result),
            ..self.registers.ccr
        };

        Ok(8 + dest.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn roxd_register(
        &mut self,
        size: OpSize,
        direction: ShiftDirection,
        register: DataRegister,
        count: ShiftCount,
    ) -> u32 {
        let shift = self.shift_count_for(count);
        let value = sized_value(register.read_from(self.registers), size);
        let extend_in = self.registers.ccr.extend;

        let (result, extend_out) = rotate_through_extend(size, direction, value, shift, extend_in);
        write_sized_register(self, register, size, result);

        self.registers.ccr = ConditionCodes {
            carry: extend_out,
            overflow: false,
            zero: result == 0,
            negative: msb_of(size, result),
            extend: extend_out,
        };

        shift_register_cycles(size, shift)
    }

    pub(super) fn roxd_memory(&mut self, direction: ShiftDirection, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_word(dest)?;
        let extend_in = self.registers.ccr.extend;
        let (result, extend_out) = rotate_through_extend(OpSize::Word, direction, value, 1, extend_in);
        self.write_word(dest, result as u16)?;

        self.registers.ccr = ConditionCodes {
            carry: extend_out,
            overflow: false,
            zero: result == 0,
            negative: msb_of(OpSize::Word, result),
            extend: extend_out,
        };

        Ok(8 + dest.address_calculation_cycles(OpSize::Word))
    }
}

fn bit_width(size: OpSize) -> u32 {
    size.size_in_bytes() * 8
}

fn sized_value(value: u32, size: OpSize) -> u32 {
    match size {
        OpSize::Byte => value & 0xFF,
        OpSize::Word => value & 0xFFFF,
        OpSize::LongWord => value,
    }
}

fn msb_of(size: OpSize, value: u32) -> bool {
    value.bit(bit_width(size) as u8 - 1)
}

fn write_sized_register<B: BusInterface>(
    executor: &mut InstructionExecutor<'_, '_, B>,
    register: DataRegister,
    size: OpSize,
    value: u32,
) {
    match size {
        OpSize::Byte => register.write_byte_to(executor.registers, value as u8),
        OpSize::Word => register.write_word_to(executor.registers, value as u16),
        OpSize::LongWord => register.write_long_word_to(executor.registers, value),
    }
}

fn shift_register_cycles(size: OpSize, shift: u32) -> u32 {
    let base = match size {
        OpSize::Byte | OpSize::Word => 6,
        OpSize::LongWord => 8,
    };
    base + 2 * shift
}

fn arithmetic_shift(size: OpSize, direction: ShiftDirection, value: u32, shift: u32) -> (u32, bool, bool) {
    let width = bit_width(size);
    if shift == 0 {
        return (value, false, false);
    }
    let effective_shift = shift.min(width);

    match direction {
        ShiftDirection::Left => {
            let mut overflow = false;
            let original_msb = msb_of(size, value);
            let mut result = value;
            let mut carry = false;
            for _ in 0..effective_shift {
                carry = msb_of(size, result);
                result = sized_value(result << 1, size);
                if msb_of(size, result) != original_msb {
                    overflow = true;
                }
            }
            (result, carry, overflow)
        }
        ShiftDirection::Right => {
            let sign = msb_of(size, value);
            let mut result = value;
            let mut carry = false;
            for _ in 0..effective_shift {
                carry = result & 1 != 0;
                result >>= 1;
                if sign {
                    result |= 1 << (width - 1);
                }
            }
            (sized_value(result, size), carry, false)
        }
    }
}

fn logical_shift(size: OpSize, direction: ShiftDirection, value: u32, shift: u32) -> (u32, bool) {
    let width = bit_width(size);
    if shift == 0 {
        return (value, false);
    }

    match direction {
        ShiftDirection::Left => {
            if shift > width {
                (0, false)
            } else {
                let carry = shift <= width && value.bit((width - shift) as u8);
                (sized_value(value << shift.min(width), size), carry)
            }
        }
        ShiftDirection::Right => {
            if shift > width {
                (0, false)
            } else {
                let carry = value.bit((shift - 1) as u8);
                (sized_value(value >> shift.min(width), size), carry)
            }
        }
    }
}

fn rotate(size: OpSize, direction: ShiftDirection, value: u32, shift: u32) -> (u32, bool) {
    let width = bit_width(size);
    let shift = shift % width;
    if shift == 0 {
        return (value, false);
    }

    match direction {
        ShiftDirection::Left => {
            let result = sized_value((value << shift) | (value >> (width - shift)), size);
            (result, result.bit(0))
        }
        ShiftDirection::Right => {
            let result = sized_value((value >> shift) | (value << (width - shift)), size);
            (result, msb_of(size, result))
        }
    }
}

fn rotate_through_extend(
    size: OpSize,
    direction: ShiftDirection,
    value: u32,
    shift: u32,
    extend_in: bool,
) -> (u32, bool) {
    let width = bit_width(size);
    let total_bits = width + 1;
    let shift = shift % total_bits;

    let mut bits = value;
    let mut extend = extend_in;
    for _ in 0..shift {
        match direction {
            ShiftDirection::Left => {
                let carry_out = msb_of(size, bits);
                bits = sized_value((bits << 1) | u32::from(extend), size);
                extend = carry_out;
            }
            ShiftDirection::Right => {
                let carry_out = bits & 1 != 0;
                bits = sized_value((bits >> 1) | (u32::from(extend) << (width - 1)), size);
                extend = carry_out;
            }
        }
    }

    (bits, extend)
}
