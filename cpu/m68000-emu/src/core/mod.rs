//! Register file, addressing-mode resolution, and the exception/trap model
//! that the instruction implementations in [`instructions`] build on.

pub(crate) mod instructions;

use crate::traits::BusInterface;
pub use instructions::{Instruction, cycles_if_move_or_btst};
use mc_common::num::GetBit;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpSize {
    Byte,
    Word,
    LongWord,
}

impl OpSize {
    #[must_use]
    pub fn size_in_bytes(self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Word => 2,
            Self::LongWord => 4,
        }
    }
}

impl Display for OpSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Byte => write!(f, "b"),
            Self::Word => write!(f, "w"),
            Self::LongWord => write!(f, "l"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRegister(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRegister(pub u8);

impl DataRegister {
    #[must_use]
    pub fn read_from(self, registers: &Registers) -> u32 {
        registers.data[self.0 as usize]
    }

    pub fn write_to(self, registers: &mut Registers, value: u32) {
        registers.data[self.0 as usize] = value;
    }

    pub fn write_byte_to(self, registers: &mut Registers, value: u8) {
        let existing = registers.data[self.0 as usize];
        registers.data[self.0 as usize] = (existing & 0xFFFF_FF00) | u32::from(value);
    }

    pub fn write_word_to(self, registers: &mut Registers, value: u16) {
        let existing = registers.data[self.0 as usize];
        registers.data[self.0 as usize] = (existing & 0xFFFF_0000) | u32::from(value);
    }

    pub fn write_long_word_to(self, registers: &mut Registers, value: u32) {
        registers.data[self.0 as usize] = value;
    }
}

impl AddressRegister {
    #[must_use]
    pub fn is_stack_pointer(self) -> bool {
        self.0 == 7
    }

    #[must_use]
    pub fn read_from(self, registers: &Registers) -> u32 {
        if self.is_stack_pointer() { registers.sp() } else { registers.address[self.0 as usize] }
    }

    pub fn write_word_to(self, registers: &mut Registers, value: u16) {
        self.write_long_word_to(registers, value as i16 as u32);
    }

    pub fn write_long_word_to(self, registers: &mut Registers, value: u32) {
        if self.is_stack_pointer() {
            registers.set_sp(value);
        } else {
            registers.address[self.0 as usize] = value;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct ConditionCodes {
    pub carry: bool,
    pub overflow: bool,
    pub zero: bool,
    pub negative: bool,
    pub extend: bool,
}

impl From<u8> for ConditionCodes {
    fn from(byte: u8) -> Self {
        Self {
            carry: byte.bit(0),
            overflow: byte.bit(1),
            zero: byte.bit(2),
            negative: byte.bit(3),
            extend: byte.bit(4),
        }
    }
}

impl From<ConditionCodes> for u8 {
    fn from(ccr: ConditionCodes) -> Self {
        (u8::from(ccr.carry))
            | (u8::from(ccr.overflow) << 1)
            | (u8::from(ccr.zero) << 2)
            | (u8::from(ccr.negative) << 3)
            | (u8::from(ccr.extend) << 4)
    }
}

/// Full register file, including the shadow supervisor/user stack pointers
/// and the handful of status bits that live outside the CCR.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct Registers {
    pub data: [u32; 8],
    pub address: [u32; 7],
    pub usp: u32,
    pub ssp: u32,
    pub pc: u32,
    pub ccr: ConditionCodes,
    pub interrupt_priority_mask: u8,
    pub supervisor_mode: bool,
    pub trace_enabled: bool,
    pub stopped: bool,
    pub last_instruction_was_muldiv: bool,
}

impl Registers {
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: [0; 8],
            address: [0; 7],
            usp: 0,
            ssp: 0,
            pc: 0,
            ccr: ConditionCodes::default(),
            interrupt_priority_mask: 7,
            supervisor_mode: true,
            trace_enabled: false,
            stopped: false,
            last_instruction_was_muldiv: false,
        }
    }

    #[must_use]
    pub fn sp(&self) -> u32 {
        if self.supervisor_mode { self.ssp } else { self.usp }
    }

    pub fn set_sp(&mut self, value: u32) {
        if self.supervisor_mode { self.ssp = value } else { self.usp = value }
    }

    #[must_use]
    pub fn status_register(&self) -> u16 {
        let ccr_byte: u8 = self.ccr.into();
        u16::from(ccr_byte)
            | (u16::from(self.interrupt_priority_mask) << 8)
            | (u16::from(self.supervisor_mode) << 13)
            | (u16::from(self.trace_enabled) << 15)
    }

    pub fn set_status_register(&mut self, sr: u16) {
        self.ccr = (sr as u8).into();
        self.interrupt_priority_mask = ((sr >> 8) & 0x07) as u8;

        let new_supervisor_mode = sr.bit(13);
        if new_supervisor_mode != self.supervisor_mode {
            // The active stack pointer swaps when supervisor mode changes, so save the
            // outgoing mode's SP into its shadow register before flipping the flag.
            if self.supervisor_mode {
                self.ssp = self.address[6];
            } else {
                self.usp = self.address[6];
            }
            self.address[6] = if new_supervisor_mode { self.ssp } else { self.usp };
        }
        self.supervisor_mode = new_supervisor_mode;

        self.trace_enabled = sr.bit(15);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    DataDirect(DataRegister),
    AddressDirect(AddressRegister),
    AddressIndirect(AddressRegister),
    AddressIndirectPostincrement(AddressRegister),
    AddressIndirectPredecrement(AddressRegister),
    AddressIndirectDisplacement(AddressRegister),
    AddressIndirectIndexed(AddressRegister),
    PcRelativeDisplacement,
    PcRelativeIndexed,
    AbsoluteShort,
    AbsoluteLong,
    Immediate,
}

impl AddressingMode {
    #[must_use]
    pub fn is_data_direct(self) -> bool {
        matches!(self, Self::DataDirect(..))
    }

    #[must_use]
    pub fn is_address_direct(self) -> bool {
        matches!(self, Self::AddressDirect(..))
    }

    #[must_use]
    pub fn is_memory(self) -> bool {
        !matches!(self, Self::DataDirect(..) | Self::AddressDirect(..))
    }

    /// Extra bus cycles to compute the effective address and, for memory
    /// operands, to fetch/store the operand itself. Register-direct and
    /// immediate modes cost nothing extra beyond the base instruction timing.
    #[must_use]
    pub fn address_calculation_cycles(self, size: OpSize) -> u32 {
        let long = size == OpSize::LongWord;
        match self {
            Self::DataDirect(..) | Self::AddressDirect(..) => 0,
            Self::AddressIndirect(..) => {
                if long {
                    8
                } else {
                    4
                }
            }
            Self::AddressIndirectPostincrement(..) => {
                if long {
                    8
                } else {
                    4
                }
            }
            Self::AddressIndirectPredecrement(..) => {
                if long {
                    10
                } else {
                    6
                }
            }
            Self::AddressIndirectDisplacement(..) | Self::PcRelativeDisplacement => {
                if long {
                    12
                } else {
                    8
                }
            }
            Self::AddressIndirectIndexed(..) | Self::PcRelativeIndexed => {
                if long {
                    14
                } else {
                    10
                }
            }
            Self::AbsoluteShort => {
                if long {
                    12
                } else {
                    8
                }
            }
            Self::AbsoluteLong => {
                if long {
                    16
                } else {
                    12
                }
            }
            Self::Immediate => {
                if long {
                    8
                } else {
                    4
                }
            }
        }
    }
}

impl Display for AddressingMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DataDirect(r) => write!(f, "D{}", r.0),
            Self::AddressDirect(r) => write!(f, "A{}", r.0),
            Self::AddressIndirect(r) => write!(f, "(A{})", r.0),
            Self::AddressIndirectPostincrement(r) => write!(f, "(A{})+", r.0),
            Self::AddressIndirectPredecrement(r) => write!(f, "-(A{})", r.0),
            Self::AddressIndirectDisplacement(r) => write!(f, "(d, A{})", r.0),
            Self::AddressIndirectIndexed(r) => write!(f, "(d, A{}, Xn)", r.0),
            Self::PcRelativeDisplacement => write!(f, "(d, PC)"),
            Self::PcRelativeIndexed => write!(f, "(d, PC, Xn)"),
            Self::AbsoluteShort => write!(f, "(xxx).w"),
            Self::AbsoluteLong => write!(f, "(xxx).l"),
            Self::Immediate => write!(f, "#<d>"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedAddress {
    DataRegister(DataRegister),
    AddressRegister(AddressRegister),
    Memory(u32),
    MemoryPostincrement { address: u32, register: AddressRegister, size: OpSize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusOpType {
    Jump,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exception {
    Reset,
    BusError,
    AddressError(u32, BusOpType),
    IllegalInstruction(u16),
    ZeroDivide,
    CheckRegister { cycles: u32 },
    TrapvInstruction,
    PrivilegeViolation,
    Trace,
    Trap(u32),
    Interrupt(u8),
}

impl Exception {
    /// 68000 exception vector number, per the standard vector table layout.
    #[must_use]
    pub fn vector_number(self) -> u32 {
        match self {
            Self::Reset => 1,
            Self::BusError => 2,
            Self::AddressError(..) => 3,
            Self::IllegalInstruction(..) => 4,
            Self::ZeroDivide => 5,
            Self::CheckRegister { .. } => 6,
            Self::TrapvInstruction => 7,
            Self::PrivilegeViolation => 8,
            Self::Trace => 9,
            Self::Trap(vector) => vector,
            Self::Interrupt(level) => 24 + u32::from(level),
        }
    }
}

pub type ExecuteResult<T> = Result<T, Exception>;

/// Borrows the register file and bus for the duration of a single
/// instruction decode-and-execute step.
pub struct InstructionExecutor<'registers, 'bus, B> {
    pub(crate) registers: &'registers mut Registers,
    pub(crate) bus: &'bus mut B,
    pub(crate) opcode: u16,
    pub(crate) instruction: Option<Instruction>,
    pub(crate) name: &'static str,
}

impl<'registers, 'bus, B: BusInterface> InstructionExecutor<'registers, 'bus, B> {
    pub fn new(registers: &'registers mut Registers, bus: &'bus mut B, name: &'static str) -> Self {
        Self { registers, bus, opcode: 0, instruction: None, name }
    }

    pub(crate) fn fetch_operand(&mut self) -> ExecuteResult<u16> {
        let pc = self.registers.pc;
        if pc % 2 != 0 {
            return Err(Exception::AddressError(pc, BusOpType::Other));
        }

        let value = self.bus.read_word(pc);
        self.registers.pc = pc.wrapping_add(2);
        Ok(value)
    }

    pub(crate) fn read_bus_word(&mut self, address: u32) -> ExecuteResult<u16> {
        if address % 2 != 0 {
            return Err(Exception::AddressError(address, BusOpType::Other));
        }
        Ok(self.bus.read_word(address))
    }

    pub(crate) fn write_bus_word(&mut self, address: u32, value: u16) -> ExecuteResult<()> {
        if address % 2 != 0 {
            return Err(Exception::AddressError(address, BusOpType::Other));
        }
        self.bus.write_word(address, value);
        Ok(())
    }

    pub(crate) fn read_bus_long_word(&mut self, address: u32) -> ExecuteResult<u32> {
        let high = self.read_bus_word(address)?;
        let low = self.read_bus_word(address.wrapping_add(2))?;
        Ok((u32::from(high) << 16) | u32::from(low))
    }

    pub(crate) fn write_bus_long_word(&mut self, address: u32, value: u32) -> ExecuteResult<()> {
        self.write_bus_word(address, (value >> 16) as u16)?;
        self.write_bus_word(address.wrapping_add(2), value as u16)
    }

    fn post_size(mode: AddressingMode, register: AddressRegister, size: OpSize) -> u32 {
        let _ = mode;
        if register.is_stack_pointer() && size == OpSize::Byte {
            // Predecrement/postincrement on the stack pointer always moves by 2, even for
            // byte-size operands, to keep the stack word-aligned.
            2
        } else {
            size.size_in_bytes()
        }
    }

    pub(crate) fn resolve_address(
        &mut self,
        mode: AddressingMode,
        size: OpSize,
    ) -> ExecuteResult<ResolvedAddress> {
        Ok(match mode {
            AddressingMode::DataDirect(r) => ResolvedAddress::DataRegister(r),
            AddressingMode::AddressDirect(r) => ResolvedAddress::AddressRegister(r),
            AddressingMode::AddressIndirect(r) => ResolvedAddress::Memory(r.read_from(self.registers)),
            AddressingMode::AddressIndirectPostincrement(r) => {
                let address = r.read_from(self.registers);
                ResolvedAddress::MemoryPostincrement { address, register: r, size }
            }
            AddressingMode::AddressIndirectPredecrement(r) => {
                let amount = Self::post_size(mode, r, size);
                let address = r.read_from(self.registers).wrapping_sub(amount);
                r.write_long_word_to(self.registers, address);
                ResolvedAddress::Memory(address)
            }
            AddressingMode::AddressIndirectDisplacement(r) => {
                let displacement = self.fetch_operand()? as i16;
                ResolvedAddress::Memory(r.read_from(self.registers).wrapping_add(displacement as u32))
            }
            AddressingMode::AddressIndirectIndexed(r) => {
                let base = r.read_from(self.registers);
                ResolvedAddress::Memory(self.resolve_brief_extension(base)?)
            }
            AddressingMode::PcRelativeDisplacement => {
                let base = self.registers.pc;
                let displacement = self.fetch_operand()? as i16;
                ResolvedAddress::Memory(base.wrapping_add(displacement as u32))
            }
            AddressingMode::PcRelativeIndexed => {
                let base = self.registers.pc;
                ResolvedAddress::Memory(self.resolve_brief_extension(base)?)
            }
            AddressingMode::AbsoluteShort => {
                let address = self.fetch_operand()? as i16 as u32;
                ResolvedAddress::Memory(address)
            }
            AddressingMode::AbsoluteLong => {
                let high = self.fetch_operand()?;
                let low = self.fetch_operand()?;
                ResolvedAddress::Memory((u32::from(high) << 16) | u32::from(low))
            }
            AddressingMode::Immediate => {
                panic!("Immediate addressing mode does not resolve to an address")
            }
        })
    }

    /// Resolves a memory-only addressing mode, advancing any postincrement
    /// register as a side effect. Used by instructions that only accept a
    /// subset of modes (e.g. `LEA`, `JMP`) where the caller has already
    /// guaranteed a memory-class mode was decoded.
    pub(crate) fn resolve_address_with_post(
        &mut self,
        mode: AddressingMode,
        size: OpSize,
    ) -> ExecuteResult<ResolvedAddress> {
        let resolved = self.resolve_address(mode, size)?;
        if let ResolvedAddress::MemoryPostincrement { address, register, size } = resolved {
            register.write_long_word_to(self.registers, address.wrapping_add(size.size_in_bytes()));
        }
        Ok(resolved)
    }

    fn resolve_brief_extension(&mut self, base: u32) -> ExecuteResult<u32> {
        let extension = self.fetch_operand()?;
        let register_index = ((extension >> 12) & 0x07) as u8;
        let is_address_register = extension.bit(15);
        let is_long = extension.bit(11);
        let displacement = (extension as i8) as i32 as u32;

        let register_value = if is_address_register {
            AddressRegister(register_index).read_from(self.registers)
        } else {
            let raw = DataRegister(register_index).read_from(self.registers);
            if is_long { raw } else { raw as i16 as u32 }
        };

        Ok(base.wrapping_add(displacement).wrapping_add(register_value))
    }

    fn finish_postincrement(&mut self, resolved: ResolvedAddress) {
        if let ResolvedAddress::MemoryPostincrement { address, register, size } = resolved {
            register.write_long_word_to(self.registers, address.wrapping_add(size.size_in_bytes()));
        }
    }

    pub(crate) fn read_byte(&mut self, mode: AddressingMode) -> ExecuteResult<u32> {
        if mode == AddressingMode::Immediate {
            return Ok(u32::from(self.fetch_operand()? as u8));
        }

        let resolved = self.resolve_address(mode, OpSize::Byte)?;
        let value = self.read_byte_resolved(resolved)?;
        self.finish_postincrement(resolved);
        Ok(value)
    }

    fn read_byte_resolved(&mut self, resolved: ResolvedAddress) -> ExecuteResult<u32> {
        Ok(match resolved {
            ResolvedAddress::DataRegister(r) => r.read_from(self.registers) & 0xFF,
            ResolvedAddress::AddressRegister(r) => r.read_from(self.registers) & 0xFF,
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                u32::from(self.bus.read_byte(address))
            }
        })
    }

    pub(crate) fn write_byte(&mut self, mode: AddressingMode, value: u8) -> ExecuteResult<()> {
        let resolved = self.resolve_address(mode, OpSize::Byte)?;
        match resolved {
            ResolvedAddress::DataRegister(r) => r.write_byte_to(self.registers, value),
            ResolvedAddress::AddressRegister(_) => {
                panic!("byte-size writes to address registers are not supported by hardware")
            }
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                self.bus.write_byte(address, value);
            }
        }
        self.finish_postincrement(resolved);
        Ok(())
    }

    pub(crate) fn read_word(&mut self, mode: AddressingMode) -> ExecuteResult<u32> {
        if mode == AddressingMode::Immediate {
            return Ok(u32::from(self.fetch_operand()?));
        }

        let resolved = self.resolve_address(mode, OpSize::Word)?;
        let value = self.read_word_resolved(resolved)?;
        self.finish_postincrement(resolved);
        Ok(value)
    }

    pub(crate) fn read_word_resolved(&mut self, resolved: ResolvedAddress) -> ExecuteResult<u32> {
        Ok(match resolved {
            ResolvedAddress::DataRegister(r) => r.read_from(self.registers) & 0xFFFF,
            ResolvedAddress::AddressRegister(r) => r.read_from(self.registers) & 0xFFFF,
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                u32::from(self.read_bus_word(address)?)
            }
        })
    }

    pub(crate) fn write_word(&mut self, mode: AddressingMode, value: u16) -> ExecuteResult<()> {
        let resolved = self.resolve_address(mode, OpSize::Word)?;
        self.write_word_resolved(resolved, value)?;
        self.finish_postincrement(resolved);
        Ok(())
    }

    pub(crate) fn write_word_resolved(
        &mut self,
        resolved: ResolvedAddress,
        value: u16,
    ) -> ExecuteResult<()> {
        match resolved {
            ResolvedAddress::DataRegister(r) => r.write_word_to(self.registers, value),
            ResolvedAddress::AddressRegister(r) => r.write_word_to(self.registers, value),
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                self.write_bus_word(address, value)?;
            }
        }
        Ok(())
    }

    pub(crate) fn read_long_word(&mut self, mode: AddressingMode) -> ExecuteResult<u32> {
        if mode == AddressingMode::Immediate {
            let high = self.fetch_operand()?;
            let low = self.fetch_operand()?;
            return Ok((u32::from(high) << 16) | u32::from(low));
        }

        let resolved = self.resolve_address(mode, OpSize::LongWord)?;
        let value = match resolved {
            ResolvedAddress::DataRegister(r) => r.read_from(self.registers),
            ResolvedAddress::AddressRegister(r) => r.read_from(self.registers),
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                self.read_bus_long_word(address)?
            }
        };
        self.finish_postincrement(resolved);
        Ok(value)
    }

    pub(crate) fn write_long_word(&mut self, mode: AddressingMode, value: u32) -> ExecuteResult<()> {
        let resolved = self.resolve_address(mode, OpSize::LongWord)?;
        match resolved {
            ResolvedAddress::DataRegister(r) => r.write_long_word_to(self.registers, value),
            ResolvedAddress::AddressRegister(r) => r.write_long_word_to(self.registers, value),
            ResolvedAddress::Memory(address) | ResolvedAddress::MemoryPostincrement { address, .. } => {
                self.write_bus_long_word(address, value)?;
            }
        }
        self.finish_postincrement(resolved);
        Ok(())
    }

    pub(crate) fn push_stack_u32(&mut self, value: u32) -> ExecuteResult<()> {
        let sp = self.registers.sp().wrapping_sub(4);
        self.registers.set_sp(sp);
        self.write_bus_long_word(sp, value)
    }

    pub(crate) fn push_stack_u16(&mut self, value: u16) -> ExecuteResult<()> {
        let sp = self.registers.sp().wrapping_sub(2);
        self.registers.set_sp(sp);
        self.write_bus_word(sp, value)
    }

    pub(crate) fn pop_stack_u32(&mut self) -> ExecuteResult<u32> {
        let sp = self.registers.sp();
        let value = self.read_bus_long_word(sp)?;
        self.registers.set_sp(sp.wrapping_add(4));
        Ok(value)
    }

    pub(crate) fn pop_stack_u16(&mut self) -> ExecuteResult<u16> {
        let sp = self.registers.sp();
        let value = self.read_bus_word(sp)?;
        self.registers.set_sp(sp.wrapping_add(2));
        Ok(value)
    }

    pub fn execute(mut self) -> (ExecuteResult<u32>, Option<Instruction>) {
        let result = self.do_execute_checked();
        (result, self.instruction)
    }

    fn do_execute_checked(&mut self) -> ExecuteResult<u32> {
        self.do_execute()
    }
}

/// The 68000 CPU core: register file plus a thin dispatch loop. All bus
/// access goes through the caller-supplied [`BusInterface`].
///
/// `name` is a logging tag only (a system with two 68000s, like Sega CD's main/sub CPU pair,
/// gives each a distinct name); it carries no emulation state and is not part of save states.
#[derive(Debug, Clone)]
pub struct M68000 {
    registers: Registers,
    name: &'static str,
}

#[cfg(feature = "bincode")]
impl bincode::Encode for M68000 {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        bincode::Encode::encode(&self.registers, encoder)
    }
}

#[cfg(feature = "bincode")]
impl<Context> bincode::Decode<Context> for M68000 {
    fn decode<D: bincode::de::Decoder<Context = Context>>(
        decoder: &mut D,
    ) -> Result<Self, bincode::error::DecodeError> {
        Ok(Self { registers: bincode::Decode::decode(decoder)?, name: "68000" })
    }
}

impl M68000 {
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self { registers: Registers::new(), name }
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    /// Reads the reset vector (SSP at $000000, PC at $000004) and enters
    /// supervisor mode with interrupts masked, matching real hardware.
    pub fn reset<B: BusInterface>(&mut self, bus: &mut B) {
        self.registers = Registers::new();
        self.registers.ssp = bus.read_long_word(0);
        self.registers.pc = bus.read_long_word(4);
    }

    /// Executes exactly one instruction (or services a pending
    /// exception/interrupt) and returns the bus cycles it consumed.
    pub fn execute_instruction<B: BusInterface>(&mut self, bus: &mut B) -> u32 {
        if bus.reset() {
            self.reset(bus);
            return 0;
        }

        if bus.halt() {
            // Bus master (e.g. a VDP running a DMA transfer) holds the CPU off the bus; idle
            // without fetching until it releases HALT.
            return 4;
        }

        let interrupt_level = bus.interrupt_level();
        if interrupt_level > self.registers.interrupt_priority_mask
            || (interrupt_level == 7 && !self.registers.stopped)
        {
            if interrupt_level > 0 {
                self.registers.stopped = false;
                let cycles = self.service_exception(bus, Exception::Interrupt(interrupt_level));
                bus.acknowledge_interrupt(interrupt_level);
                return cycles;
            }
        }

        if self.registers.stopped {
            return 4;
        }

        let executor = InstructionExecutor::new(&mut self.registers, bus, self.name);
        let (result, _instruction) = executor.execute();

        match result {
            Ok(cycles) => cycles,
            Err(exception) => self.service_exception(bus, exception),
        }
    }

    fn service_exception<B: BusInterface>(&mut self, bus: &mut B, exception: Exception) -> u32 {
        log::trace!("[{}] servicing exception {exception:?}", self.name);

        let sr = self.registers.status_register();
        let pc = self.registers.pc;

        let was_user_mode = !self.registers.supervisor_mode;
        self.registers.supervisor_mode = true;
        if was_user_mode {
            self.registers.usp = self.registers.address[6];
            self.registers.address[6] = self.registers.ssp;
        }

        let sp = self.registers.sp().wrapping_sub(6);
        self.registers.set_sp(sp);
        bus.write_long_word(sp.wrapping_add(2), pc);
        bus.write_word(sp, sr);

        if let Exception::Interrupt(level) = exception {
            self.registers.interrupt_priority_mask = level;
        }
        self.registers.trace_enabled = false;

        let vector_address = exception.vector_number() * 4;
        self.registers.pc = bus.read_long_word(vector_address);

        match exception {
            Exception::CheckRegister { cycles } => cycles,
            Exception::Interrupt(..) => 44,
            Exception::AddressError(..) | Exception::BusError => 50,
            _ => 34,
        }
    }
}
