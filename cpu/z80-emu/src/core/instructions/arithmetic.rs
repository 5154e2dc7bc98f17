use crate::core::instructions::InstructionExecutor;
use crate::core::{Flags, GetBit, IndexRegister, Register16};
use crate::traits::BusInterface;

fn add(a: u8, value: u8, carry_in: bool, flags: &mut Flags) -> u8 {
    let carry_in = u8::from(carry_in);
    let (partial, carry1) = a.overflowing_add(value);
    let (result, carry2) = partial.overflowing_add(carry_in);

    let half_carry = (a & 0x0F) + (value & 0x0F) + carry_in > 0x0F;
    let overflow = (a.bit(7) == value.bit(7)) && (result.bit(7) != a.bit(7));

    flags
        .set_sign_from(result)
        .set_zero_from(result)
        .set_half_carry(half_carry)
        .set_overflow(overflow)
        .set_subtract(false)
        .set_carry(carry1 || carry2);

    result
}

fn sub(a: u8, value: u8, carry_in: bool, flags: &mut Flags) -> u8 {
    let carry_in = u8::from(carry_in);
    let (partial, borrow1) = a.overflowing_sub(value);
    let (result, borrow2) = partial.overflowing_sub(carry_in);

    let half_carry = (a & 0x0F) < (value & 0x0F) + carry_in;
    let overflow = (a.bit(7) != value.bit(7)) && (result.bit(7) != a.bit(7));

    flags
        .set_sign_from(result)
        .set_zero_from(result)
        .set_half_carry(half_carry)
        .set_overflow(overflow)
        .set_subtract(true)
        .set_carry(borrow1 || borrow2);

    result
}

fn and(a: u8, value: u8, flags: &mut Flags) -> u8 {
    let result = a & value;

    flags
        .set_sign_from(result)
        .set_zero_from(result)
        .set_half_carry(true)
        .set_parity_from(result)
        .set_subtract(false)
        .set_carry(false);

    result
}

fn or(a: u8, value: u8, flags: &mut Flags) -> u8 {
    let result = a | value;

    flags
        .set_sign_from(result)
        .set_zero_from(result)
        .set_half_carry(false)
        .set_parity_from(result)
        .set_subtract(false)
        .set_carry(false);

    result
}

fn xor(a: u8, value: u8, flags: &mut Flags) -> u8 {
    let result = a ^ value;

    flags
        .set_sign_from(result)
        .set_zero_from(result)
        .set_half_carry(false)
        .set_parity_from(result)
        .set_subtract(false)
        .set_carry(false);

    result
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    fn alu_operand(&mut self, opcode: u8, index: Option<IndexRegister>) -> u8 {
        let register = super::parse_register_from_opcode(opcode, index).expect("invalid opcode");
        register.read_from(self.registers)
    }

    pub(super) fn add_a_r(
        &mut self,
        opcode: u8,
        index: Option<IndexRegister>,
        with_carry: bool,
    ) -> u32 {
        let operand = self.alu_operand(opcode, index);
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = add(self.registers.a, operand, carry_in, &mut self.registers.f);
        4
    }

    pub(super) fn add_a_hl(&mut self, index: Option<IndexRegister>, with_carry: bool) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = add(self.registers.a, operand, carry_in, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn add_a_immediate(&mut self, with_carry: bool) -> u32 {
        let operand = self.fetch_operand();
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = add(self.registers.a, operand, carry_in, &mut self.registers.f);
        7
    }

    pub(super) fn sub_a_r(
        &mut self,
        opcode: u8,
        index: Option<IndexRegister>,
        with_carry: bool,
    ) -> u32 {
        let operand = self.alu_operand(opcode, index);
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = sub(self.registers.a, operand, carry_in, &mut self.registers.f);
        4
    }

    pub(super) fn sub_a_hl(&mut self, index: Option<IndexRegister>, with_carry: bool) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = sub(self.registers.a, operand, carry_in, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn sub_a_immediate(&mut self, with_carry: bool) -> u32 {
        let operand = self.fetch_operand();
        let carry_in = with_carry && self.registers.f.carry();
        self.registers.a = sub(self.registers.a, operand, carry_in, &mut self.registers.f);
        7
    }

    pub(super) fn and_a_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let operand = self.alu_operand(opcode, index);
        self.registers.a = and(self.registers.a, operand, &mut self.registers.f);
        4
    }

    pub(super) fn and_a_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        self.registers.a = and(self.registers.a, operand, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn and_a_immediate(&mut self) -> u32 {
        let operand = self.fetch_operand();
        self.registers.a = and(self.registers.a, operand, &mut self.registers.f);
        7
    }

    pub(super) fn or_a_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let operand = self.alu_operand(opcode, index);
        self.registers.a = or(self.registers.a, operand, &mut self.registers.f);
        4
    }

    pub(super) fn or_a_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        self.registers.a = or(self.registers.a, operand, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn or_a_immediate(&mut self) -> u32 {
        let operand = self.fetch_operand();
        self.registers.a = or(self.registers.a, operand, &mut self.registers.f);
        7
    }

    pub(super) fn xor_a_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let operand = self.alu_operand(opcode, index);
        self.registers.a = xor(self.registers.a, operand, &mut self.registers.f);
        4
    }

    pub(super) fn xor_a_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        self.registers.a = xor(self.registers.a, operand, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn xor_a_immediate(&mut self) -> u32 {
        let operand = self.fetch_operand();
        self.registers.a = xor(self.registers.a, operand, &mut self.registers.f);
        7
    }

    pub(super) fn cp_a_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let operand = self.alu_operand(opcode, index);
        sub(self.registers.a, operand, false, &mut self.registers.f);
        4
    }

    pub(super) fn cp_a_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let operand = self.bus.read_memory(address);
        sub(self.registers.a, operand, false, &mut self.registers.f);

        match index {
            Some(_) => 19,
            None => 7,
        }
    }

    pub(super) fn cp_a_immediate(&mut self) -> u32 {
        let operand = self.fetch_operand();
        sub(self.registers.a, operand, false, &mut self.registers.f);
        7
    }

    pub(super) fn inc_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let register =
            super::parse_register_from_opcode(opcode >> 3, index).expect("invalid opcode");
        let value = register.read_from(self.registers);
        let result = value.wrapping_add(1);
        register.write_to(result, self.registers);

        self.registers
            .f
            .set_sign_from(result)
            .set_zero_from(result)
            .set_half_carry(value & 0x0F == 0x0F)
            .set_overflow(value == 0x7F)
            .set_subtract(false);

        4
    }

    pub(super) fn dec_r(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let register =
            super::parse_register_from_opcode(opcode >> 3, index).expect("invalid opcode");
        let value = register.read_from(self.registers);
        let result = value.wrapping_sub(1);
        register.write_to(result, self.registers);

        self.registers
            .f
            .set_sign_from(result)
            .set_zero_from(result)
            .set_half_carry(value & 0x0F == 0x00)
            .set_overflow(value == 0x80)
            .set_subtract(true);

        4
    }

    pub(super) fn inc_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let value = self.bus.read_memory(address);
        let result = value.wrapping_add(1);
        self.bus.write_memory(address, result);

        self.registers
            .f
            .set_sign_from(result)
            .set_zero_from(result)
            .set_half_carry(value & 0x0F == 0x0F)
            .set_overflow(value == 0x7F)
            .set_subtract(false);

        match index {
            Some(_) => 23,
            None => 11,
        }
    }

    pub(super) fn dec_hl(&mut self, index: Option<IndexRegister>) -> u32 {
        let address = self.fetch_indirect_hl_address(index);
        let value = self.bus.read_memory(address);
        let result = value.wrapping_sub(1);
        self.bus.write_memory(address, result);

        self.registers
            .f
            .set_sign_from(result)
            .set_zero_from(result)
            .set_half_carry(value & 0x0F == 0x00)
            .set_overflow(value == 0x80)
            .set_subtract(true);

        match index {
            Some(_) => 23,
            None => 11,
        }
    }

    pub(super) fn inc_ss(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let register = super::parse_dd_register(opcode, index);
        let value = register.read_from(self.registers);
        register.write_to(value.wrapping_add(1), self.registers);
        6
    }

    pub(super) fn dec_ss(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let register = super::parse_dd_register(opcode, index);
        let value = register.read_from(self.registers);
        register.write_to(value.wrapping_sub(1), self.registers);
        6
    }

    pub(super) fn add_hl_ss(&mut self, opcode: u8, index: Option<IndexRegister>) -> u32 {
        let dest = index.map_or(Register16::HL, IndexRegister::into);
        let source = super::parse_dd_register(opcode, index);

        let hl = dest.read_from(self.registers);
        let operand = source.read_from(self.registers);

        let (result, carry) = hl.overflowing_add(operand);
        let half_carry = (hl & 0x0FFF) + (operand & 0x0FFF) > 0x0FFF;

        dest.write_to(result, self.registers);

        self.registers
            .f
            .set_half_carry(half_carry)
            .set_subtract(false)
            .set_carry(carry);

        match index {
            Some(_) => 15,
            None => 11,
        }
    }

    pub(super) fn adc_hl_ss(&mut self, opcode: u8) -> u32 {
        let source = super::parse_dd_register(opcode, None);
        let hl = Register16::HL.read_from(self.registers);
        let operand = source.read_from(self.registers);
        let carry_in = u16::from(self.registers.f.carry());

        let (partial, carry1) = hl.overflowing_add(operand);
        let (result, carry2) = partial.overflowing_add(carry_in);

        let half_carry = (hl & 0x0FFF) + (operand & 0x0FFF) + carry_in > 0x0FFF;
        let overflow = (hl.bit(15) == operand.bit(15)) && (result.bit(15) != hl.bit(15));

        Register16::HL.write_to(result, self.registers);

        self.registers
            .f
            .set_sign(result.bit(15))
            .set_zero(result == 0)
            .set_half_carry(half_carry)
            .set_overflow(overflow)
            .set_subtract(false)
            .set_carry(carry1 || carry2);

        15
    }

    pub(super) fn sbc_hl_ss(&mut self, opcode: u8) -> u32 {
        let source = super::parse_dd_register(opcode, None);
        let hl = Register16::HL.read_from(self.registers);
        let operand = source.read_from(self.registers);
        let carry_in = u16::from(self.registers.f.carry());

        let (partial, borrow1) = hl.overflowing_sub(operand);
        let (result, borrow2) = partial.overflowing_sub(carry_in);

        let half_carry = (hl & 0x0FFF) < (operand & 0x0FFF) + carry_in;
        let overflow = (hl.bit(15) != operand.bit(15)) && (result.bit(15) != hl.bit(15));

        Register16::HL.write_to(result, self.registers);

        self.registers
            .f
            .set_sign(result.bit(15))
            .set_zero(result == 0)
            .set_half_carry(half_carry)
            .set_overflow(overflow)
            .set_subtract(true)
            .set_carry(borrow1 || borrow2);

        15
    }

    pub(super) fn daa(&mut self) -> u32 {
        let a = self.registers.a;
        let subtract = self.registers.f.subtract();
        let half_carry = self.registers.f.half_carry();
        let carry = self.registers.f.carry();

        let mut correction = 0u8;
        let mut new_carry = carry;

        if half_carry || (!subtract && a & 0x0F > 9) {
            correction |= 0x06;
        }
        if carry || (!subtract && a > 0x99) {
            correction |= 0x60;
            new_carry = true;
        }

        let result = if subtract { a.wrapping_sub(correction) } else { a.wrapping_add(correction) };

        let half_carry_out = if subtract {
            half_carry && (a & 0x0F) < 6
        } else {
            a & 0x0F > 9
        };

        self.registers.a = result;
        self.registers
            .f
            .set_sign_from(result)
            .set_zero_from(result)
            .set_half_carry(half_carry_out)
            .set_parity_from(result)
            .set_carry(new_carry);

        4
    }

    pub(super) fn cpl(&mut self) -> u32 {
        self.registers.a = !self.registers.a;
        self.registers.f.set_half_carry(true).set_subtract(true);
        4
    }

    pub(super) fn scf(&mut self) -> u32 {
        self.registers.f.set_half_carry(false).set_subtract(false).set_carry(true);
        4
    }

    pub(super) fn ccf(&mut self) -> u32 {
        let carry = self.registers.f.carry();
        self.registers
            .f
            .set_half_carry(carry)
            .set_subtract(false)
            .set_carry(!carry);
        4
    }

    pub(super) fn neg(&mut self) -> u32 {
        let a = self.registers.a;
        self.registers.a = sub(0, a, false, &mut self.registers.f);
        8
    }
}
