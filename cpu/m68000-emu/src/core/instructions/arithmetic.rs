use crate::core::{AddressingMode, ConditionCodes, DataRegister, ExecuteResult, InstructionExecutor, OpSize};
use crate::traits::BusInterface;
use mc_common::num::SignBit;

fn sign_extend_to_i64(value: u32, size: OpSize) -> i64 {
    match size {
        OpSize::Byte => (value as u8) as i8 as i64,
        OpSize::Word => (value as u16) as i16 as i64,
        OpSize::LongWord => (value as i32) as i64,
    }
}

fn mask(size: OpSize) -> u32 {
    match size {
        OpSize::Byte => 0xFF,
        OpSize::Word => 0xFFFF,
        OpSize::LongWord => 0xFFFF_FFFF,
    }
}

fn msb(size: OpSize, value: u32) -> bool {
    match size {
        OpSize::Byte => value.bit(7),
        OpSize::Word => value.bit(15),
        OpSize::LongWord => value.bit(31),
    }
}

use mc_common::num::GetBit;

struct AddResult {
    value: u32,
    carry: bool,
    overflow: bool,
}

fn add_with_flags(size: OpSize, source: u32, dest: u32, carry_in: u32) -> AddResult {
    let m = mask(size);
    let sum = (u64::from(dest & m)) + u64::from(source & m) + u64::from(carry_in);
    let value = (sum as u32) & m;

    let carry = sum > u64::from(m);
    let overflow = msb(size, dest) == msb(size, source) && msb(size, value) != msb(size, dest);

    AddResult { value, carry, overflow }
}

fn sub_with_flags(size: OpSize, source: u32, dest: u32, borrow_in: u32) -> AddResult {
    let m = mask(size);
    let diff = i64::from(dest & m) - i64::from(source & m) - i64::from(borrow_in);
    let value = (diff as u32) & m;

    let carry = diff < 0;
    let overflow = msb(size, dest) != msb(size, source) && msb(size, value) != msb(size, dest);

    AddResult { value, carry, overflow }
}

macro_rules! impl_binary_op {
    ($name_byte:ident, $name_word:ident, $name_long:ident, $apply:ident) => {
        pub(super) fn $name_byte(
            &mut self,
            source: AddressingMode,
            dest: AddressingMode,
            with_extend: bool,
        ) -> ExecuteResult<u32> {
            self.$apply(OpSize::Byte, source, dest, with_extend)
        }

        pub(super) fn $name_word(
            &mut self,
            source: AddressingMode,
            dest: AddressingMode,
            with_extend: bool,
        ) -> ExecuteResult<u32> {
            self.$apply(OpSize::Word, source, dest, with_extend)
        }

        pub(super) fn $name_long(
            &mut self,
            source: AddressingMode,
            dest: AddressingMode,
            with_extend: bool,
        ) -> ExecuteResult<u32> {
            self.$apply(OpSize::LongWord, source, dest, with_extend)
        }
    };
}

impl<B: BusInterface> InstructionExecutor<'_, '_, B> {
    fn read_sized(&mut self, mode: AddressingMode, size: OpSize) -> ExecuteResult<u32> {
        match size {
            OpSize::Byte => self.read_byte(mode),
            OpSize::Word => self.read_word(mode),
            OpSize::LongWord => self.read_long_word(mode),
        }
    }

    fn write_sized(&mut self, mode: AddressingMode, size: OpSize, value: u32) -> ExecuteResult<()> {
        match size {
            OpSize::Byte => self.write_byte(mode, value as u8),
            OpSize::Word => self.write_word(mode, value as u16),
            OpSize::LongWord => self.write_long_word(mode, value),
        }
    }

    fn do_add(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        let source_value = self.read_sized(source, size)?;
        let dest_value = self.read_sized(dest, size)?;

        let carry_in = if with_extend && self.registers.ccr.extend { 1 } else { 0 };
        let result = add_with_flags(size, source_value, dest_value, carry_in);

        self.write_sized(dest, size, result.value)?;

        let zero = result.value & mask(size) == 0;
        self.registers.ccr = ConditionCodes {
            carry: result.carry,
            overflow: result.overflow,
            zero: if with_extend { self.registers.ccr.zero && zero } else { zero },
            negative: msb(size, result.value),
            extend: result.carry,
        };

        Ok(binary_op_cycles(size, source, dest))
    }

    fn do_sub(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        let source_value = self.read_sized(source, size)?;
        let dest_value = self.read_sized(dest, size)?;

        let borrow_in = if with_extend && self.registers.ccr.extend { 1 } else { 0 };
        let result = sub_with_flags(size, source_value, dest_value, borrow_in);

        self.write_sized(dest, size, result.value)?;

        let zero = result.value & mask(size) == 0;
        self.registers.ccr = ConditionCodes {
            carry: result.carry,
            overflow: result.overflow,
            zero: if with_extend { self.registers.ccr.zero && zero } else { zero },
            negative: msb(size, result.value),
            extend: result.carry,
        };

        Ok(binary_op_cycles(size, source, dest))
    }

    fn do_and(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        let value = self.read_sized(source, size)? & self.read_sized(dest, size)?;
        self.write_sized(dest, size, value)?;
        self.set_logic_flags(size, value);
        Ok(binary_op_cycles(size, source, dest))
    }

    fn do_or(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        let value = self.read_sized(source, size)? | self.read_sized(dest, size)?;
        self.write_sized(dest, size, value)?;
        self.set_logic_flags(size, value);
        Ok(binary_op_cycles(size, source, dest))
    }

    fn do_eor(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        let value = self.read_sized(source, size)? ^ self.read_sized(dest, size)?;
        self.write_sized(dest, size, value)?;
        self.set_logic_flags(size, value);
        Ok(binary_op_cycles(size, source, dest))
    }

    fn set_logic_flags(&mut self, size: OpSize, value: u32) {
        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: value & mask(size) == 0,
            negative: msb(size, value),
            ..self.registers.ccr
        };
    }

    impl_binary_op!(add_byte_inner, add_word_inner, add_long_word_inner, do_add);
    impl_binary_op!(sub_byte_inner, sub_word_inner, sub_long_word_inner, do_sub);

    pub(super) fn add_byte(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.add_byte_inner(source, dest, with_extend)
    }

    pub(super) fn add_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.add_word_inner(source, dest, with_extend)
    }

    pub(super) fn add_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.add_long_word_inner(source, dest, with_extend)
    }

    pub(super) fn sub_byte(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.sub_byte_inner(source, dest, with_extend)
    }

    pub(super) fn sub_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.sub_word_inner(source, dest, with_extend)
    }

    pub(super) fn sub_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        with_extend: bool,
    ) -> ExecuteResult<u32> {
        self.sub_long_word_inner(source, dest, with_extend)
    }

    fn do_add_quick(&mut self, size: OpSize, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        let source_value = if data == 0 { 8 } else { data as u32 };
        let dest_value = self.read_sized(dest, size)?;
        let result = add_with_flags(size, source_value, dest_value, 0);

        self.write_sized(dest, size, result.value)?;

        if !dest.is_address_direct() {
            self.registers.ccr = ConditionCodes {
                carry: result.carry,
                overflow: result.overflow,
                zero: result.value & mask(size) == 0,
                negative: msb(size, result.value),
                extend: result.carry,
            };
        }

        Ok(quick_op_cycles(size, dest))
    }

    fn do_sub_quick(&mut self, size: OpSize, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        let source_value = if data == 0 { 8 } else { data as u32 };
        let dest_value = self.read_sized(dest, size)?;
        let result = sub_with_flags(size, source_value, dest_value, 0);

        self.write_sized(dest, size, result.value)?;

        if !dest.is_address_direct() {
            self.registers.ccr = ConditionCodes {
                carry: result.carry,
                overflow: result.overflow,
                zero: result.value & mask(size) == 0,
                negative: msb(size, result.value),
                extend: result.carry,
            };
        }

        Ok(quick_op_cycles(size, dest))
    }

    pub(super) fn add_quick_byte(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_add_quick(OpSize::Byte, data, dest)
    }

    pub(super) fn add_quick_word(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_add_quick(OpSize::Word, data, dest)
    }

    pub(super) fn add_quick_long_word(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_add_quick(OpSize::LongWord, data, dest)
    }

    pub(super) fn sub_quick_byte(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_sub_quick(OpSize::Byte, data, dest)
    }

    pub(super) fn sub_quick_word(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_sub_quick(OpSize::Word, data, dest)
    }

    pub(super) fn sub_quick_long_word(&mut self, data: u8, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_sub_quick(OpSize::LongWord, data, dest)
    }

    pub(super) fn and_byte(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_and(OpSize::Byte, source, dest)
    }

    pub(super) fn and_word(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_and(OpSize::Word, source, dest)
    }

    pub(super) fn and_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        self.do_and(OpSize::LongWord, source, dest)
    }

    pub(super) fn or_byte(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_or(OpSize::Byte, source, dest)
    }

    pub(super) fn or_word(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_or(OpSize::Word, source, dest)
    }

    pub(super) fn or_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        self.do_or(OpSize::LongWord, source, dest)
    }

    pub(super) fn eor_byte(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_eor(OpSize::Byte, source, dest)
    }

    pub(super) fn eor_word(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_eor(OpSize::Word, source, dest)
    }

    pub(super) fn eor_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        self.do_eor(OpSize::LongWord, source, dest)
    }

    pub(super) fn andi_to_ccr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr & operand).into();
        Ok(20)
    }

    pub(super) fn ori_to_ccr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr | operand).into();
        Ok(20)
    }

    pub(super) fn eori_to_ccr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()? as u8;
        let ccr: u8 = self.registers.ccr.into();
        self.registers.ccr = (ccr ^ operand).into();
        Ok(20)
    }

    pub(super) fn andi_to_sr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr & operand);
        Ok(20)
    }

    pub(super) fn ori_to_sr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr | operand);
        Ok(20)
    }

    pub(super) fn eori_to_sr(&mut self) -> ExecuteResult<u32> {
        let operand = self.fetch_operand()?;
        let sr = self.registers.status_register();
        self.registers.set_status_register(sr ^ operand);
        Ok(20)
    }

    pub(super) fn cmp_byte(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_cmp(OpSize::Byte, source, dest)
    }

    pub(super) fn cmp_word(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_cmp(OpSize::Word, source, dest)
    }

    pub(super) fn cmp_long_word(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        self.do_cmp(OpSize::LongWord, source, dest)
    }

    fn do_cmp(
        &mut self,
        size: OpSize,
        source: AddressingMode,
        dest: AddressingMode,
    ) -> ExecuteResult<u32> {
        let source_value = self.read_sized(source, size)?;
        let dest_value = self.read_sized(dest, size)?;
        let result = sub_with_flags(size, source_value, dest_value, 0);

        self.registers.ccr = ConditionCodes {
            carry: result.carry,
            overflow: result.overflow,
            zero: result.value & mask(size) == 0,
            negative: msb(size, result.value),
            ..self.registers.ccr
        };

        let base = match size {
            OpSize::Byte | OpSize::Word => 4,
            OpSize::LongWord => 6,
        };
        Ok(base + source.address_calculation_cycles(size) + dest.address_calculation_cycles(size))
    }

    pub(super) fn neg_byte(&mut self, dest: AddressingMode, with_extend: bool) -> ExecuteResult<u32> {
        self.do_neg(OpSize::Byte, dest, with_extend)
    }

    pub(super) fn neg_word(&mut self, dest: AddressingMode, with_extend: bool) -> ExecuteResult<u32> {
        self.do_neg(OpSize::Word, dest, with_extend)
    }

    pub(super) fn neg_long_word(&mut self, dest: AddressingMode, with_extend: bool) -> ExecuteResult<u32> {
        self.do_neg(OpSize::LongWord, dest, with_extend)
    }

    fn do_neg(&mut self, size: OpSize, dest: AddressingMode, with_extend: bool) -> ExecuteResult<u32> {
        let dest_value = self.read_sized(dest, size)?;
        let borrow_in = if with_extend && self.registers.ccr.extend { 1 } else { 0 };
        let result = sub_with_flags(size, dest_value, 0, borrow_in);

        self.write_sized(dest, size, result.value)?;

        let zero = result.value & mask(size) == 0;
        self.registers.ccr = ConditionCodes {
            carry: result.value & mask(size) != 0,
            overflow: result.overflow,
            zero: if with_extend { self.registers.ccr.zero && zero } else { zero },
            negative: msb(size, result.value),
            extend: result.value & mask(size) != 0,
        };

        Ok(unary_op_cycles(size, dest))
    }

    pub(super) fn not_byte(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_not(OpSize::Byte, dest)
    }

    pub(super) fn not_word(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_not(OpSize::Word, dest)
    }

    pub(super) fn not_long_word(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        self.do_not(OpSize::LongWord, dest)
    }

    fn do_not(&mut self, size: OpSize, dest: AddressingMode) -> ExecuteResult<u32> {
        let value = !self.read_sized(dest, size)? & mask(size);
        self.write_sized(dest, size, value)?;
        self.set_logic_flags(size, value);
        Ok(unary_op_cycles(size, dest))
    }

    pub(super) fn tst_byte(&mut self, source: AddressingMode) -> ExecuteResult<u32> {
        self.do_tst(OpSize::Byte, source)
    }

    pub(super) fn tst_word(&mut self, source: AddressingMode) -> ExecuteResult<u32> {
        self.do_tst(OpSize::Word, source)
    }

    pub(super) fn tst_long_word(&mut self, source: AddressingMode) -> ExecuteResult<u32> {
        self.do_tst(OpSize::LongWord, source)
    }

    fn do_tst(&mut self, size: OpSize, source: AddressingMode) -> ExecuteResult<u32> {
        let value = self.read_sized(source, size)?;
        self.set_logic_flags(size, value);
        Ok(4 + source.address_calculation_cycles(size))
    }

    pub(super) fn abcd(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let (result, cycles) = self.do_bcd(source, dest, true)?;
        self.write_byte(dest, result)?;
        Ok(cycles)
    }

    pub(super) fn sbcd(&mut self, source: AddressingMode, dest: AddressingMode) -> ExecuteResult<u32> {
        let (result, cycles) = self.do_bcd(source, dest, false)?;
        self.write_byte(dest, result)?;
        Ok(cycles)
    }

    fn do_bcd(
        &mut self,
        source: AddressingMode,
        dest: AddressingMode,
        add: bool,
    ) -> ExecuteResult<(u8, u32)> {
        let source_value = self.read_byte(source)? as u8;
        let dest_value = self.read_byte(dest)? as u8;
        let extend = u8::from(self.registers.ccr.extend);

        let (result, carry) = if add {
            bcd_add(dest_value, source_value, extend)
        } else {
            bcd_sub(dest_value, source_value, extend)
        };

        let zero = result == 0;
        self.registers.ccr = ConditionCodes {
            carry,
            zero: self.registers.ccr.zero && zero,
            negative: result.bit(7),
            extend: carry,
            ..self.registers.ccr
        };

        let cycles = if matches!(
            (source, dest),
            (AddressingMode::AddressIndirectPredecrement(..), AddressingMode::AddressIndirectPredecrement(..))
        ) {
            18
        } else {
            6
        };

        Ok((result, cycles))
    }

    pub(super) fn nbcd(&mut self, dest: AddressingMode) -> ExecuteResult<u32> {
        let dest_value = self.read_byte(dest)? as u8;
        let extend = u8::from(self.registers.ccr.extend);

        let (result, carry) = bcd_sub(0, dest_value, extend);
        self.write_byte(dest, result)?;

        let zero = result == 0;
        self.registers.ccr = ConditionCodes {
            carry,
            zero: self.registers.ccr.zero && zero,
            negative: result.bit(7),
            extend: carry,
            ..self.registers.ccr
        };

        Ok(unary_op_cycles(OpSize::Byte, dest))
    }

    pub(super) fn muls(&mut self, register: DataRegister, source: AddressingMode) -> ExecuteResult<u32> {
        let source_value = self.read_word(source)? as u16 as i16 as i32;
        let dest_value = register.read_from(self.registers) as u16 as i16 as i32;
        let result = source_value.wrapping_mul(dest_value);

        register.write_long_word_to(self.registers, result as u32);
        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: result == 0,
            negative: result < 0,
            ..self.registers.ccr
        };

        Ok(70 + source.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn mulu(&mut self, register: DataRegister, source: AddressingMode) -> ExecuteResult<u32> {
        let source_value = self.read_word(source)?;
        let dest_value = register.read_from(self.registers) & 0xFFFF;
        let result = source_value.wrapping_mul(dest_value);

        register.write_long_word_to(self.registers, result);
        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: result == 0,
            negative: result.bit(31),
            ..self.registers.ccr
        };

        Ok(70 + source.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn divs(&mut self, register: DataRegister, source: AddressingMode) -> ExecuteResult<u32> {
        let divisor = self.read_word(source)? as u16 as i16 as i64;
        if divisor == 0 {
            return Err(crate::core::Exception::ZeroDivide);
        }

        let dividend = sign_extend_to_i64(register.read_from(self.registers), OpSize::LongWord);
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;

        if quotient > i64::from(i16::MAX) || quotient < i64::from(i16::MIN) {
            self.registers.ccr = ConditionCodes { overflow: true, ..self.registers.ccr };
            return Ok(158 + source.address_calculation_cycles(OpSize::Word));
        }

        let value = (((remainder as u32) & 0xFFFF) << 16) | ((quotient as u32) & 0xFFFF);
        register.write_long_word_to(self.registers, value);

        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: quotient == 0,
            negative: quotient < 0,
            ..self.registers.ccr
        };

        Ok(158 + source.address_calculation_cycles(OpSize::Word))
    }

    pub(super) fn divu(&mut self, register: DataRegister, source: AddressingMode) -> ExecuteResult<u32> {
        let divisor = u32::from(self.read_word(source)? as u16);
        if divisor == 0 {
            return Err(crate::core::Exception::ZeroDivide);
        }

        let dividend = register.read_from(self.registers);
        let quotient = dividend / divisor;
        let remainder = dividend % divisor;

        if quotient > 0xFFFF {
            self.registers.ccr = ConditionCodes { overflow: true, ..self.registers.ccr };
            return Ok(140 + source.address_calculation_cycles(OpSize::Word));
        }

        let value = (remainder << 16) | quotient;
        register.write_long_word_to(self.registers, value);

        self.registers.ccr = ConditionCodes {
            carry: false,
            overflow: false,
            zero: quotient == 0,
            negative: quotient.bit(15),
            ..self.registers.ccr
        };

        Ok(140 + source.address_calculation_cycles(OpSize::Word))
    }
}

fn bcd_add(dest: u8, source: u8, extend: u8) -> (u8, bool) {
    let low = (dest & 0x0F) + (source & 0x0F) + extend;
    let low_carry = low > 9;
    let low_digit = if low_carry { (low - 10) & 0x0F } else { low };

    let high = (dest >> 4) + (source >> 4) + u8::from(low_carry);
    let high_carry = high > 9;
    let high_digit = if high_carry { (high - 10) & 0x0F } else { high };

    (((high_digit << 4) | low_digit) & 0xFF, high_carry)
}

fn bcd_sub(dest: u8, source: u8, extend: u8) -> (u8, bool) {
    let low = i16::from(dest & 0x0F) - i16::from(source & 0x0F) - i16::from(extend);
    let low_borrow = low < 0;
    let low_digit = if low_borrow { (low + 10) as u8 } else { low as u8 };

    let high = i16::from(dest >> 4) - i16::from(source >> 4) - i16::from(low_borrow);
    let high_borrow = high < 0;
    let high_digit = if high_borrow { (high + 10) as u8 } else { high as u8 };

    (((high_digit << 4) | low_digit) & 0xFF, high_borrow)
}

fn unary_op_cycles(size: OpSize, dest: AddressingMode) -> u32 {
    let mut cycles = match size {
        OpSize::Byte | OpSize::Word => 4,
        OpSize::LongWord => 8,
    };
    cycles += dest.address_calculation_cycles(size);
    if size == OpSize::LongWord && dest.is_data_direct() {
        cycles -= 2;
    }
    if !dest.is_data_direct() {
        cycles += 4;
    }
    cycles
}

fn quick_op_cycles(size: OpSize, dest: AddressingMode) -> u32 {
    if dest.is_address_direct() {
        return 8;
    }

    if dest.is_data_direct() {
        return match size {
            OpSize::Byte | OpSize::Word => 4,
            OpSize::LongWord => 8,
        };
    }

    let base = match size {
        OpSize::Byte | OpSize::Word => 8,
        OpSize::LongWord => 12,
    };
    base + dest.address_calculation_cycles(size)
}

fn binary_op_cycles(size: OpSize, source: AddressingMode, dest: AddressingMode) -> u32 {
    let mut cycles = match size {
        OpSize::Byte | OpSize::Word => 4,
        OpSize::LongWord => 8,
    };
    if size == OpSize::Word && dest.is_address_direct() {
        cycles += 4;
    }
    cycles += source.address_calculation_cycles(size);
    cycles += dest.address_calculation_cycles(size);
    if size == OpSize::LongWord
        && source.is_memory()
        && (dest.is_data_direct() || dest.is_address_direct())
    {
        cycles -= 2;
    }
    if dest.is_memory() {
        cycles += 4;
    }
    cycles
}
