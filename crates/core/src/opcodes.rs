//! Intel 8080 instruction decoder and dispatch table.
//!
//! Decodes opcode bytes into a typed [`Op`] enum with operands embedded,
//! plus the timing metadata the stepping loop needs: instruction length
//! (the implicit PC advance) and cycle cost, including the separate cost
//! for taken conditional branches. The 256-entry [`OpTable`] is built
//! once per process by filling instruction families programmatically;
//! an empty slot is the illegal-opcode outcome. With the 8080 family
//! set every slot is occupied, including the undocumented aliases
//! (eight NOPs, JMP 0xCB, RET 0xD9, CALL 0xDD/0xED/0xFD).

use std::sync::OnceLock;

/// Addressable 8-bit operand field (DDD / SSS).
///
/// Seven register cells plus `M`, the memory byte addressed through the
/// H:L pair. `M` is an alias, not storage: the executor resolves it to
/// an address before any read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    B,
    C,
    D,
    E,
    H,
    L,
    M,
    A,
}

impl Operand {
    /// Decode a 3-bit register field.
    pub fn from_bits(bits: u8) -> Operand {
        match bits & 0x07 {
            0 => Operand::B,
            1 => Operand::C,
            2 => Operand::D,
            3 => Operand::E,
            4 => Operand::H,
            5 => Operand::L,
            6 => Operand::M,
            _ => Operand::A,
        }
    }

    /// True for the memory-aliased pseudo-register.
    pub fn is_mem(self) -> bool {
        self == Operand::M
    }
}

/// 16-bit register pair field (RP). `SP` is the stack pointer itself,
/// not a pairing of register cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    BC,
    DE,
    HL,
    SP,
}

impl Pair {
    /// Decode a 2-bit register-pair field.
    pub fn from_bits(bits: u8) -> Pair {
        match bits & 0x03 {
            0 => Pair::BC,
            1 => Pair::DE,
            2 => Pair::HL,
            _ => Pair::SP,
        }
    }
}

/// Condition codes for conditional jump/call/return (CCC field):
/// zero, carry, parity, and sign, each in both polarities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    NZ,
    Z,
    NC,
    C,
    PO,
    PE,
    P,
    M,
}

impl Cond {
    /// Decode a 3-bit condition field.
    pub fn from_bits(bits: u8) -> Cond {
        match bits & 0x07 {
            0 => Cond::NZ,
            1 => Cond::Z,
            2 => Cond::NC,
            3 => Cond::C,
            4 => Cond::PO,
            5 => Cond::PE,
            6 => Cond::P,
            _ => Cond::M,
        }
    }
}

/// Decoded 8080 instruction.
///
/// Register, pair, and condition operands are embedded; immediate bytes
/// stay in memory and are fetched by the executor relative to the
/// instruction's base address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Nop,
    // Data transfer
    Mov { dst: Operand, src: Operand },
    Mvi { dst: Operand },
    Lxi { pair: Pair },
    Lda,
    Sta,
    Lhld,
    Shld,
    Ldax { pair: Pair },
    Stax { pair: Pair },
    Xchg,
    // Arithmetic
    Add { src: Operand },
    Adc { src: Operand },
    Sub { src: Operand },
    Sbb { src: Operand },
    Adi,
    Aci,
    Sui,
    Sbi,
    Inr { dst: Operand },
    Dcr { dst: Operand },
    Inx { pair: Pair },
    Dcx { pair: Pair },
    Dad { pair: Pair },
    Daa,
    // Logical
    Ana { src: Operand },
    Xra { src: Operand },
    Ora { src: Operand },
    Cmp { src: Operand },
    Ani,
    Xri,
    Ori,
    Cpi,
    Cma,
    Stc,
    Cmc,
    // Rotate
    Rlc,
    Rrc,
    Ral,
    Rar,
    // Branch
    Jmp,
    Jcc { cond: Cond },
    Call,
    Ccc { cond: Cond },
    Ret,
    Rcc { cond: Cond },
    Rst { vector: u8 },
    Pchl,
    // Stack
    Push { pair: Pair },
    Pop { pair: Pair },
    PushPsw,
    PopPsw,
    Xthl,
    Sphl,
    // I/O and interrupt control
    In,
    Out,
    Ei,
    Di,
    Hlt,
}

/// Dispatch metadata for one opcode byte.
#[derive(Debug, Clone, Copy)]
pub struct OpInfo {
    pub op: Op,
    /// Encoded length in bytes (1-3): the PC advance when the handler
    /// does not set the PC explicitly.
    pub len: u8,
    /// Base cycle cost; the not-taken cost for conditional branches.
    pub cycles: u8,
    /// Cycle cost when a conditional branch is taken.
    pub cycles_taken: u8,
}

impl OpInfo {
    const fn fixed(op: Op, len: u8, cycles: u8) -> OpInfo {
        OpInfo { op, len, cycles, cycles_taken: cycles }
    }

    const fn branch(op: Op, len: u8, cycles: u8, cycles_taken: u8) -> OpInfo {
        OpInfo { op, len, cycles, cycles_taken }
    }
}

/// The opcode dispatch table: every one of the 256 opcode byte values
/// maps to `Some(OpInfo)` or to the illegal-opcode outcome (`None`).
pub struct OpTable([Option<OpInfo>; 256]);

impl OpTable {
    /// The process-wide table, built on first use.
    pub fn get() -> &'static OpTable {
        static TABLE: OnceLock<OpTable> = OnceLock::new();
        TABLE.get_or_init(OpTable::build)
    }

    /// Total decode function for an opcode byte.
    pub fn lookup(&self, opcode: u8) -> Option<OpInfo> {
        self.0[opcode as usize]
    }

    fn build() -> OpTable {
        let mut t: [Option<OpInfo>; 256] = [None; 256];

        // NOP and its seven undocumented aliases
        for op in [0x00, 0x08, 0x10, 0x18, 0x20, 0x28, 0x30, 0x38] {
            t[op] = Some(OpInfo::fixed(Op::Nop, 1, 4));
        }

        // Register-pair families: LXI / INX / DAD / DCX
        for bits in 0..4u8 {
            let pair = Pair::from_bits(bits);
            let base = (bits as usize) << 4;
            t[base | 0x01] = Some(OpInfo::fixed(Op::Lxi { pair }, 3, 10));
            t[base | 0x03] = Some(OpInfo::fixed(Op::Inx { pair }, 1, 5));
            t[base | 0x09] = Some(OpInfo::fixed(Op::Dad { pair }, 1, 10));
            t[base | 0x0B] = Some(OpInfo::fixed(Op::Dcx { pair }, 1, 5));
        }

        // Indirect accumulator load/store, BC and DE rows only
        for bits in 0..2u8 {
            let pair = Pair::from_bits(bits);
            let base = (bits as usize) << 4;
            t[base | 0x02] = Some(OpInfo::fixed(Op::Stax { pair }, 1, 7));
            t[base | 0x0A] = Some(OpInfo::fixed(Op::Ldax { pair }, 1, 7));
        }

        // INR / DCR / MVI across all eight operands; M costs more
        for bits in 0..8u8 {
            let dst = Operand::from_bits(bits);
            let row = (bits as usize) << 3;
            let rm = if dst.is_mem() { 10 } else { 5 };
            t[row | 0x04] = Some(OpInfo::fixed(Op::Inr { dst }, 1, rm));
            t[row | 0x05] = Some(OpInfo::fixed(Op::Dcr { dst }, 1, rm));
            t[row | 0x06] = Some(OpInfo::fixed(Op::Mvi { dst }, 2, if dst.is_mem() { 10 } else { 7 }));
        }

        // Rotates and accumulator/carry specials
        t[0x07] = Some(OpInfo::fixed(Op::Rlc, 1, 4));
        t[0x0F] = Some(OpInfo::fixed(Op::Rrc, 1, 4));
        t[0x17] = Some(OpInfo::fixed(Op::Ral, 1, 4));
        t[0x1F] = Some(OpInfo::fixed(Op::Rar, 1, 4));
        t[0x27] = Some(OpInfo::fixed(Op::Daa, 1, 4));
        t[0x2F] = Some(OpInfo::fixed(Op::Cma, 1, 4));
        t[0x37] = Some(OpInfo::fixed(Op::Stc, 1, 4));
        t[0x3F] = Some(OpInfo::fixed(Op::Cmc, 1, 4));

        // Direct-address loads and stores
        t[0x22] = Some(OpInfo::fixed(Op::Shld, 3, 16));
        t[0x2A] = Some(OpInfo::fixed(Op::Lhld, 3, 16));
        t[0x32] = Some(OpInfo::fixed(Op::Sta, 3, 13));
        t[0x3A] = Some(OpInfo::fixed(Op::Lda, 3, 13));

        // MOV block; 0x76 in the middle is HLT
        for opcode in 0x40..=0x7Fusize {
            if opcode == 0x76 {
                t[opcode] = Some(OpInfo::fixed(Op::Hlt, 1, 7));
                continue;
            }
            let dst = Operand::from_bits((opcode >> 3) as u8);
            let src = Operand::from_bits(opcode as u8);
            let cycles = if dst.is_mem() || src.is_mem() { 7 } else { 5 };
            t[opcode] = Some(OpInfo::fixed(Op::Mov { dst, src }, 1, cycles));
        }

        // ALU block: ADD/ADC/SUB/SBB/ANA/XRA/ORA/CMP with each operand
        for opcode in 0x80..=0xBFusize {
            let src = Operand::from_bits(opcode as u8);
            let cycles = if src.is_mem() { 7 } else { 4 };
            let op = match (opcode >> 3) & 0x07 {
                0 => Op::Add { src },
                1 => Op::Adc { src },
                2 => Op::Sub { src },
                3 => Op::Sbb { src },
                4 => Op::Ana { src },
                5 => Op::Xra { src },
                6 => Op::Ora { src },
                _ => Op::Cmp { src },
            };
            t[opcode] = Some(OpInfo::fixed(op, 1, cycles));
        }

        // Conditional return/jump/call and RST, one row per condition
        for bits in 0..8u8 {
            let cond = Cond::from_bits(bits);
            let row = 0xC0 | (bits as usize) << 3;
            t[row] = Some(OpInfo::branch(Op::Rcc { cond }, 1, 5, 11));
            t[row | 0x02] = Some(OpInfo::branch(Op::Jcc { cond }, 3, 10, 10));
            t[row | 0x04] = Some(OpInfo::branch(Op::Ccc { cond }, 3, 11, 17));
            t[row | 0x07] = Some(OpInfo::fixed(Op::Rst { vector: bits * 8 }, 1, 11));
        }

        // PUSH / POP; the fourth slot is the accumulator+flags pseudo-pair
        for bits in 0..4u8 {
            let row = 0xC0 | (bits as usize) << 4;
            let (push, pop) = if bits == 3 {
                (Op::PushPsw, Op::PopPsw)
            } else {
                let pair = Pair::from_bits(bits);
                (Op::Push { pair }, Op::Pop { pair })
            };
            t[row | 0x05] = Some(OpInfo::fixed(push, 1, 11));
            t[row | 0x01] = Some(OpInfo::fixed(pop, 1, 10));
        }

        // Unconditional transfers, including the alias encodings
        for op in [0xC3, 0xCB] {
            t[op] = Some(OpInfo::fixed(Op::Jmp, 3, 10));
        }
        for op in [0xC9, 0xD9] {
            t[op] = Some(OpInfo::fixed(Op::Ret, 1, 10));
        }
        for op in [0xCD, 0xDD, 0xED, 0xFD] {
            t[op] = Some(OpInfo::fixed(Op::Call, 3, 17));
        }

        // Immediate ALU forms
        t[0xC6] = Some(OpInfo::fixed(Op::Adi, 2, 7));
        t[0xCE] = Some(OpInfo::fixed(Op::Aci, 2, 7));
        t[0xD6] = Some(OpInfo::fixed(Op::Sui, 2, 7));
        t[0xDE] = Some(OpInfo::fixed(Op::Sbi, 2, 7));
        t[0xE6] = Some(OpInfo::fixed(Op::Ani, 2, 7));
        t[0xEE] = Some(OpInfo::fixed(Op::Xri, 2, 7));
        t[0xF6] = Some(OpInfo::fixed(Op::Ori, 2, 7));
        t[0xFE] = Some(OpInfo::fixed(Op::Cpi, 2, 7));

        // I/O, pointer specials, interrupt control
        t[0xD3] = Some(OpInfo::fixed(Op::Out, 2, 10));
        t[0xDB] = Some(OpInfo::fixed(Op::In, 2, 10));
        t[0xE3] = Some(OpInfo::fixed(Op::Xthl, 1, 18));
        t[0xE9] = Some(OpInfo::fixed(Op::Pchl, 1, 5));
        t[0xEB] = Some(OpInfo::fixed(Op::Xchg, 1, 5));
        t[0xF3] = Some(OpInfo::fixed(Op::Di, 1, 4));
        t[0xF9] = Some(OpInfo::fixed(Op::Sphl, 1, 5));
        t[0xFB] = Some(OpInfo::fixed(Op::Ei, 1, 4));

        OpTable(t)
    }
}
