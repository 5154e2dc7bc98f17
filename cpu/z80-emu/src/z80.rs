//! A stateful CPU handle wrapping the free-function instruction interpreter in [`crate::core`].
//!
//! Backend crates juggle the Z80 alongside a 68000 (or tick it directly as a system's sole CPU)
//! and need a single long-lived value to hold in their save state, so this wraps `Registers` plus
//! the BUSREQ/RESET bus-grant handling described in the Z80 core's host contract.

use crate::core::{execute, InterruptMode, Registers};
use crate::traits::BusInterface;

#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "bincode", derive(bincode::Encode, bincode::Decode))]
pub struct Z80 {
    registers: Registers,
}

impl Z80 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
        }
    }

    #[must_use]
    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }

    pub fn set_pc(&mut self, pc: u16) {
        self.registers.set_pc(pc);
    }

    pub fn set_sp(&mut self, sp: u16) {
        self.registers.set_sp(sp);
    }

    pub fn set_interrupt_mode(&mut self, interrupt_mode: InterruptMode) {
        self.registers.set_interrupt_mode(interrupt_mode);
    }

    #[must_use]
    pub fn stalled(&self, bus_busreq: bool) -> bool {
        bus_busreq
    }

    /// Execute one instruction (or, while held by RESET/BUSREQ, advance by a single idle step)
    /// and return the number of Z80 T-cycles consumed.
    pub fn execute_instruction<B: BusInterface>(&mut self, bus: &mut B) -> u32 {
        if bus.reset() {
            self.registers = Registers::new();
            return 3;
        }

        if bus.busreq() {
            return 4;
        }

        execute(&mut self.registers, bus).t_cycles
    }
}
