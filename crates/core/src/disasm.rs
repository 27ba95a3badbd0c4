//! Intel 8080 disassembler.
//!
//! Formats decoded [`Op`] values back to assembly text for the step
//! debugger and register-dump views. Pure formatting, no execution.

use crate::opcodes::{Cond, Op, Operand, Pair};

fn operand_name(operand: Operand) -> &'static str {
    match operand {
        Operand::B => "B",
        Operand::C => "C",
        Operand::D => "D",
        Operand::E => "E",
        Operand::H => "H",
        Operand::L => "L",
        Operand::M => "M",
        Operand::A => "A",
    }
}

// 8080 assembly names pairs by their high register; SP stays SP.
fn pair_name(pair: Pair) -> &'static str {
    match pair {
        Pair::BC => "B",
        Pair::DE => "D",
        Pair::HL => "H",
        Pair::SP => "SP",
    }
}

fn cond_name(cond: Cond) -> &'static str {
    match cond {
        Cond::NZ => "NZ",
        Cond::Z => "Z",
        Cond::NC => "NC",
        Cond::C => "C",
        Cond::PO => "PO",
        Cond::PE => "PE",
        Cond::P => "P",
        Cond::M => "M",
    }
}

/// Format one instruction. `imm` holds the operand bytes that follow
/// the opcode in memory (empty for one-byte instructions).
pub fn disassemble(op: Op, imm: &[u8]) -> String {
    let d8 = imm.first().copied().unwrap_or(0);
    let d16 = d8 as u16 | (imm.get(1).copied().unwrap_or(0) as u16) << 8;

    match op {
        Op::Nop => "NOP".into(),
        Op::Mov { dst, src } => format!("MOV {},{}", operand_name(dst), operand_name(src)),
        Op::Mvi { dst } => format!("MVI {},0x{:02X}", operand_name(dst), d8),
        Op::Lxi { pair } => format!("LXI {},0x{:04X}", pair_name(pair), d16),
        Op::Lda => format!("LDA 0x{:04X}", d16),
        Op::Sta => format!("STA 0x{:04X}", d16),
        Op::Lhld => format!("LHLD 0x{:04X}", d16),
        Op::Shld => format!("SHLD 0x{:04X}", d16),
        Op::Ldax { pair } => format!("LDAX {}", pair_name(pair)),
        Op::Stax { pair } => format!("STAX {}", pair_name(pair)),
        Op::Xchg => "XCHG".into(),
        Op::Add { src } => format!("ADD {}", operand_name(src)),
        Op::Adc { src } => format!("ADC {}", operand_name(src)),
        Op::Sub { src } => format!("SUB {}", operand_name(src)),
        Op::Sbb { src } => format!("SBB {}", operand_name(src)),
        Op::Adi => format!("ADI 0x{:02X}", d8),
        Op::Aci => format!("ACI 0x{:02X}", d8),
        Op::Sui => format!("SUI 0x{:02X}", d8),
        Op::Sbi => format!("SBI 0x{:02X}", d8),
        Op::Inr { dst } => format!("INR {}", operand_name(dst)),
        Op::Dcr { dst } => format!("DCR {}", operand_name(dst)),
        Op::Inx { pair } => format!("INX {}", pair_name(pair)),
        Op::Dcx { pair } => format!("DCX {}", pair_name(pair)),
        Op::Dad { pair } => format!("DAD {}", pair_name(pair)),
        Op::Daa => "DAA".into(),
        Op::Ana { src } => format!("ANA {}", operand_name(src)),
        Op::Xra { src } => format!("XRA {}", operand_name(src)),
        Op::Ora { src } => format!("ORA {}", operand_name(src)),
        Op::Cmp { src } => format!("CMP {}", operand_name(src)),
        Op::Ani => format!("ANI 0x{:02X}", d8),
        Op::Xri => format!("XRI 0x{:02X}", d8),
        Op::Ori => format!("ORI 0x{:02X}", d8),
        Op::Cpi => format!("CPI 0x{:02X}", d8),
        Op::Cma => "CMA".into(),
        Op::Stc => "STC".into(),
        Op::Cmc => "CMC".into(),
        Op::Rlc => "RLC".into(),
        Op::Rrc => "RRC".into(),
        Op::Ral => "RAL".into(),
        Op::Rar => "RAR".into(),
        Op::Jmp => format!("JMP 0x{:04X}", d16),
        Op::Jcc { cond } => format!("J{} 0x{:04X}", cond_name(cond), d16),
        Op::Call => format!("CALL 0x{:04X}", d16),
        Op::Ccc { cond } => format!("C{} 0x{:04X}", cond_name(cond), d16),
        Op::Ret => "RET".into(),
        Op::Rcc { cond } => format!("R{}", cond_name(cond)),
        Op::Rst { vector } => format!("RST {}", vector / 8),
        Op::Pchl => "PCHL".into(),
        Op::Push { pair } => format!("PUSH {}", pair_name(pair)),
        Op::Pop { pair } => format!("POP {}", pair_name(pair)),
        Op::PushPsw => "PUSH PSW".into(),
        Op::PopPsw => "POP PSW".into(),
        Op::Xthl => "XTHL".into(),
        Op::Sphl => "SPHL".into(),
        Op::In => format!("IN 0x{:02X}", d8),
        Op::Out => format!("OUT 0x{:02X}", d8),
        Op::Ei => "EI".into(),
        Op::Di => "DI".into(),
        Op::Hlt => "HLT".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opcodes::OpTable;

    fn dis(opcode: u8, imm: &[u8]) -> String {
        disassemble(OpTable::get().lookup(opcode).unwrap().op, imm)
    }

    #[test]
    fn test_basic_mnemonics() {
        assert_eq!(dis(0x00, &[]), "NOP");
        assert_eq!(dis(0x41, &[]), "MOV B,C");
        assert_eq!(dis(0x7E, &[]), "MOV A,M");
        assert_eq!(dis(0x06, &[0x0A]), "MVI B,0x0A");
        assert_eq!(dis(0x01, &[0x34, 0x12]), "LXI B,0x1234");
        assert_eq!(dis(0x31, &[0x00, 0x24]), "LXI SP,0x2400");
    }

    #[test]
    fn test_branch_mnemonics() {
        assert_eq!(dis(0xC3, &[0x00, 0x10]), "JMP 0x1000");
        assert_eq!(dis(0xC2, &[0x00, 0x10]), "JNZ 0x1000");
        assert_eq!(dis(0xFA, &[0xCD, 0xAB]), "JM 0xABCD");
        assert_eq!(dis(0xC8, &[]), "RZ");
        assert_eq!(dis(0xDC, &[0x00, 0x20]), "CC 0x2000");
        assert_eq!(dis(0xEF, &[]), "RST 5");
    }

    #[test]
    fn test_stack_and_io_mnemonics() {
        assert_eq!(dis(0xC5, &[]), "PUSH B");
        assert_eq!(dis(0xF5, &[]), "PUSH PSW");
        assert_eq!(dis(0xF1, &[]), "POP PSW");
        assert_eq!(dis(0xDB, &[0x10]), "IN 0x10");
        assert_eq!(dis(0xD3, &[0x20]), "OUT 0x20");
    }
}
