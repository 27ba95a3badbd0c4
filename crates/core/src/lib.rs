//! # i8080-core
//!
//! Instruction-level emulation core for the Intel 8080 (v0.2.0).
//!
//! Emulates the 8080 register file, flags, stack and branch discipline,
//! and all 256 opcode byte values (including the undocumented NOP and
//! JMP/RET/CALL aliases) over a flat 64 KB memory bus at a 2 MHz clock.
//! The core executes exactly one instruction per step and reports its
//! cycle cost; pacing, interrupt generation, and device behavior belong
//! to the host.
//!
//! ## Architecture
//!
//! - [`Machine`] — Top-level emulator wiring CPU, memory bus, and the
//!   I/O-port boundary together
//! - [`Cpu`] — Register file, flags, pointers, and run-state
//! - [`Bus`] — Flat 64 KB byte-addressable memory
//! - [`opcodes`] — Decoder and the 256-entry dispatch table
//! - [`disasm`] — Instruction disassembler for debug views
//! - [`image`] — Count-prefixed program image loader
//! - [`display`] — Memory-mapped raster region rendering
//! - [`savestate`] — Machine snapshots (bincode + deflate)
//!
//! ## Host contract
//!
//! The host drives [`Machine::step`] (or [`Machine::run`]) while the CPU
//! is not halted, reads the raster region between steps, and may deliver
//! interrupts through [`Machine::interrupt`]. The `halted` flag is
//! terminal: further steps report [`StepError::Halted`] instead of
//! executing.

pub mod bus;
pub mod cpu;
pub mod disasm;
pub mod display;
pub mod image;
pub mod opcodes;
pub mod savestate;

pub use bus::Bus;
pub use cpu::{Cpu, Flags};
pub use opcodes::{Op, OpInfo, OpTable};

use thiserror::Error;

/// Size of the flat address space: the full 16-bit range.
pub const MEM_SIZE: usize = 0x10000;
/// CPU clock frequency: 2 MHz.
pub const CLOCK_HZ: u32 = 2_000_000;

/// Base address of the memory-mapped raster region.
pub const DISPLAY_BASE: u16 = 0xF000;
/// Raster width in pixels (one byte per pixel, row-major).
pub const DISPLAY_WIDTH: usize = 64;
/// Raster height in pixels.
pub const DISPLAY_HEIGHT: usize = 64;
/// Size of the raster region in bytes.
pub const DISPLAY_SIZE: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

/// Error outcome of [`Machine::step`], distinct from any cycle count.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StepError {
    /// The opcode byte has no instruction mapping.
    #[error("illegal opcode 0x{opcode:02X} at 0x{pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },
    /// The CPU has executed HLT; the halted state is terminal.
    #[error("processor is halted")]
    Halted,
}

/// I/O port boundary.
///
/// The core forwards the port number (and, for OUT, the accumulator)
/// here; device behavior lives entirely outside the core.
pub trait PortBus {
    /// IN: produce the byte the device drives for `port`.
    fn port_in(&mut self, port: u8) -> u8 {
        let _ = port;
        0xFF // unconnected ports float high
    }

    /// OUT: accept the accumulator byte written to `port`.
    fn port_out(&mut self, port: u8, val: u8) {
        let _ = (port, val);
    }
}

/// Default port bus with no devices attached.
pub struct NullPorts;

impl PortBus for NullPorts {}

/// The emulated machine: CPU state plus the shared memory bus and the
/// port boundary.
pub struct Machine {
    pub cpu: Cpu,
    pub bus: Bus,
    pub ports: Box<dyn PortBus>,
}

impl Machine {
    /// Machine with zeroed CPU, zeroed memory, and no port devices.
    pub fn new() -> Self {
        Machine {
            cpu: Cpu::new(),
            bus: Bus::new(),
            ports: Box::new(NullPorts),
        }
    }

    /// Machine with a port device model in place of the inert default.
    pub fn with_ports(ports: Box<dyn PortBus>) -> Self {
        Machine {
            cpu: Cpu::new(),
            bus: Bus::new(),
            ports,
        }
    }

    /// Reset CPU state and clear memory. The port bus is untouched.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.bus.fill(0);
    }

    /// Execute exactly one instruction at the current PC and return its
    /// cycle cost.
    ///
    /// Both error outcomes are host decisions, not internal recovery: a
    /// halted CPU refuses to step, and an unmapped opcode byte reports
    /// [`StepError::IllegalOpcode`] instead of guessing at semantics.
    pub fn step(&mut self) -> Result<u32, StepError> {
        if self.cpu.halted {
            return Err(StepError::Halted);
        }
        let base = self.cpu.pc;
        let opcode = self.bus.read(base);
        let info = OpTable::get()
            .lookup(opcode)
            .ok_or(StepError::IllegalOpcode { opcode, pc: base })?;
        self.cpu.pc = base.wrapping_add(info.len as u16);
        let cycles = self.execute(info, base);
        self.cpu.tick += cycles as u64;
        Ok(cycles)
    }

    /// Step until `max_cycles` cycles are consumed or the CPU halts.
    /// Returns the cycles actually consumed.
    pub fn run(&mut self, max_cycles: u64) -> Result<u64, StepError> {
        let mut consumed = 0u64;
        while consumed < max_cycles && !self.cpu.halted {
            consumed += self.step()? as u64;
        }
        Ok(consumed)
    }

    /// Deliver an external interrupt as RST to `vector & 0x38`.
    ///
    /// Honored only while interrupts are enabled (EI); delivery disables
    /// them again until the handler re-enables. A halted CPU stays
    /// halted regardless.
    pub fn interrupt(&mut self, vector: u8) {
        if self.cpu.halted || !self.cpu.inte {
            log::debug!(
                "interrupt 0x{:02X} ignored (inte={}, halted={})",
                vector,
                self.cpu.inte,
                self.cpu.halted
            );
            return;
        }
        self.cpu.inte = false;
        let pc = self.cpu.pc;
        self.push_word(pc);
        self.cpu.pc = (vector & 0x38) as u16;
    }

    /// Load a count-prefixed program image at address 0 and reset the
    /// CPU. Returns the number of program bytes loaded.
    pub fn load_image(&mut self, data: &[u8]) -> Result<usize, image::ImageError> {
        self.bus.fill(0);
        let size = image::parse_image(data, &mut self.bus)?;
        self.cpu = Cpu::new();
        log::info!("loaded {} byte program image", size);
        Ok(size)
    }

    pub fn halted(&self) -> bool {
        self.cpu.halted
    }

    /// The raster region as raw bytes. Read between steps only.
    pub fn display_region(&self) -> &[u8] {
        self.bus.slice(DISPLAY_BASE, DISPLAY_SIZE)
    }

    /// Render the raster region as 0xRRGGBB pixels.
    pub fn framebuffer_u32(&self) -> Vec<u32> {
        display::to_pixels(self.display_region())
    }

    /// Capture the full machine state.
    pub fn save_state(&self) -> savestate::SaveState {
        savestate::SaveState {
            cpu: self.cpu.clone(),
            mem: self.bus.as_bytes().to_vec(),
        }
    }

    /// Restore a previously captured state. The port bus is untouched.
    pub fn restore_state(&mut self, state: &savestate::SaveState) {
        self.cpu = state.cpu.clone();
        self.bus.load(0, &state.mem);
    }

    /// Disassemble the instruction at the current PC without executing.
    pub fn disasm_at_pc(&self) -> String {
        let pc = self.cpu.pc;
        let opcode = self.bus.read(pc);
        match OpTable::get().lookup(opcode) {
            Some(info) => {
                let imm = [
                    self.bus.read(pc.wrapping_add(1)),
                    self.bus.read(pc.wrapping_add(2)),
                ];
                let used = info.len as usize - 1;
                format!("0x{:04X}: {}", pc, disasm::disassemble(info.op, &imm[..used]))
            }
            None => format!("0x{:04X}: DB 0x{:02X}", pc, opcode),
        }
    }

    /// Execute one instruction and return its disassembly (step
    /// debugger).
    pub fn step_one(&mut self) -> Result<String, StepError> {
        let line = self.disasm_at_pc();
        self.step()?;
        Ok(line)
    }

    /// Format a register and flag dump for debug views.
    pub fn dump_regs(&self) -> String {
        let c = &self.cpu;
        let f = &c.flags;
        format!(
            "A={:02X} B={:02X} C={:02X} D={:02X} E={:02X} H={:02X} L={:02X}\n\
             PC={:04X} SP={:04X} S={} Z={} AC={} P={} CY={}{}{}",
            c.a,
            c.b,
            c.c,
            c.d,
            c.e,
            c.h,
            c.l,
            c.pc,
            c.sp,
            f.sign as u8,
            f.zero as u8,
            f.aux_carry as u8,
            f.parity as u8,
            f.carry as u8,
            if c.inte { " INTE" } else { "" },
            if c.halted { " HALTED" } else { "" },
        )
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_opcode_steps_and_terminates() {
        // Every opcode byte value executes exactly one instruction and
        // reports a documented cycle count; none are unclassified.
        for opcode in 0..=255u8 {
            let mut m = Machine::new();
            m.cpu.sp = 0x8000;
            m.bus.write(0, opcode);
            let cycles = m
                .step()
                .unwrap_or_else(|e| panic!("opcode 0x{:02X}: {}", opcode, e));
            assert!((4..=18).contains(&cycles), "opcode 0x{:02X}", opcode);
        }
    }

    #[test]
    fn test_nop_changes_nothing_but_pc() {
        let mut m = Machine::new();
        m.cpu.sp = 0x8000;
        m.cpu.a = 0x12;
        m.cpu.flags.carry = true;
        m.bus.write(0x0100, 0x55);
        m.cpu.pc = 0x0000;
        let before = m.cpu.clone();
        let cycles = m.step().unwrap();
        assert_eq!(cycles, 4);
        assert_eq!(m.cpu.pc, before.pc.wrapping_add(1));
        assert_eq!(m.cpu.a, before.a);
        assert_eq!(m.cpu.sp, before.sp);
        assert_eq!(m.cpu.flags, before.flags);
        assert_eq!(m.bus.read(0x0100), 0x55);
    }

    #[test]
    fn test_end_to_end_add_store_halt() {
        // MVI B,0x0A / MVI A,0x01 / ADD B / STA 0x0001 / HLT
        let program = [0x06, 0x0A, 0x3E, 0x01, 0x80, 0x32, 0x01, 0x00, 0x76];
        let mut m = Machine::new();
        m.bus.load(0, &program);
        m.cpu.sp = 0x8000;
        while !m.halted() {
            m.step().unwrap();
        }
        assert_eq!(m.cpu.a, 0x0B);
        assert_eq!(m.bus.read(0x0001), 0x0B);
    }

    #[test]
    fn test_step_after_halt_is_an_error() {
        let mut m = Machine::new();
        m.bus.write(0, 0x76);
        m.step().unwrap();
        assert!(m.halted());
        assert_eq!(m.step(), Err(StepError::Halted));
    }

    #[test]
    fn test_run_respects_cycle_budget() {
        // An infinite JMP 0 loop; each iteration costs 10 cycles
        let mut m = Machine::new();
        m.bus.load(0, &[0xC3, 0x00, 0x00]);
        let consumed = m.run(100).unwrap();
        assert_eq!(consumed, 100);
        assert_eq!(m.cpu.tick, 100);
        assert!(!m.halted());
    }

    #[test]
    fn test_run_stops_at_halt() {
        let mut m = Machine::new();
        m.bus.load(0, &[0x00, 0x76]);
        let consumed = m.run(1_000_000).unwrap();
        assert_eq!(consumed, 4 + 7);
        assert!(m.halted());
        // Further runs are inert rather than errors
        assert_eq!(m.run(1_000_000).unwrap(), 0);
    }

    #[test]
    fn test_interrupt_delivery() {
        let mut m = Machine::new();
        m.cpu.sp = 0x8000;
        m.bus.load(0, &[0xFB, 0x00]); // EI / NOP
        m.step().unwrap();
        m.step().unwrap();
        m.interrupt(0x10); // RST 2 vector
        assert_eq!(m.cpu.pc, 0x0010);
        assert!(!m.cpu.inte, "delivery disables further interrupts");
        assert_eq!(m.bus.read_word(m.cpu.sp), 0x0002);
    }

    #[test]
    fn test_interrupt_ignored_when_disabled() {
        let mut m = Machine::new();
        m.cpu.sp = 0x8000;
        m.cpu.pc = 0x0123;
        m.interrupt(0x08);
        assert_eq!(m.cpu.pc, 0x0123);
        assert_eq!(m.cpu.sp, 0x8000);
    }

    #[test]
    fn test_interrupt_does_not_wake_halted() {
        let mut m = Machine::new();
        m.bus.load(0, &[0xFB, 0x76]); // EI / HLT
        m.step().unwrap();
        m.step().unwrap();
        m.interrupt(0x00);
        assert!(m.halted());
        assert_eq!(m.step(), Err(StepError::Halted));
    }

    #[test]
    fn test_framebuffer_maps_region() {
        let mut m = Machine::new();
        m.bus.write(DISPLAY_BASE, 1);
        m.bus.write(DISPLAY_BASE + DISPLAY_WIDTH as u16, 0xFF);
        let fb = m.framebuffer_u32();
        assert_eq!(fb.len(), DISPLAY_SIZE);
        assert_ne!(fb[0], 0);
        assert_ne!(fb[DISPLAY_WIDTH], 0, "second row starts one width in");
        assert_eq!(fb[1], 0);
    }

    #[test]
    fn test_load_image_and_run() {
        let program = [0x3E, 0x42, 0x32, 0x00, 0xF0, 0x76]; // MVI A / STA 0xF000 / HLT
        let mut m = Machine::new();
        let size = m.load_image(&image::wrap_image(&program)).unwrap();
        assert_eq!(size, program.len());
        m.cpu.sp = 0x8000;
        m.run(u64::MAX).unwrap();
        assert_eq!(m.display_region()[0], 0x42);
        assert_ne!(m.framebuffer_u32()[0], 0);
    }

    #[test]
    fn test_save_restore_state() {
        let mut m = Machine::new();
        m.bus.load(0, &[0x3E, 0x42, 0x76]); // MVI A,0x42 / HLT
        m.cpu.sp = 0x8000;
        m.step().unwrap();
        let state = m.save_state();
        m.step().unwrap();
        assert!(m.halted());
        m.restore_state(&state);
        assert!(!m.halted());
        assert_eq!(m.cpu.a, 0x42);
        assert_eq!(m.cpu.pc, 0x0002);
        m.step().unwrap();
        assert!(m.halted());
    }

    #[test]
    fn test_port_forwarding() {
        use std::cell::RefCell;
        use std::rc::Rc;

        struct Recorder {
            out: Rc<RefCell<Vec<(u8, u8)>>>,
        }
        impl PortBus for Recorder {
            fn port_in(&mut self, port: u8) -> u8 {
                port.wrapping_add(1)
            }
            fn port_out(&mut self, port: u8, val: u8) {
                self.out.borrow_mut().push((port, val));
            }
        }

        let out = Rc::new(RefCell::new(Vec::new()));
        let mut m = Machine::with_ports(Box::new(Recorder { out: out.clone() }));
        m.bus.load(0, &[0xDB, 0x10, 0xD3, 0x20]); // IN 0x10 / OUT 0x20
        m.step().unwrap();
        assert_eq!(m.cpu.a, 0x11);
        m.step().unwrap();
        assert_eq!(out.borrow().as_slice(), &[(0x20, 0x11)]);
    }
}
