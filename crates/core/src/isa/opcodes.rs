//! Canonical opcode table.
//!
//! Opcodes are assigned in the exact declaration order of the original
//! assembler grammar's instruction list, not by any grouping convenience;
//! implementers must never resort by mnemonic.

/// How one operand slot of an instruction word is interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    /// The slot is unused; its word is ignored.
    None,
    /// The slot names a register. The raw word is a register index and is
    /// bounds-checked during decode (must be `<= REG_RSVD` and not equal to
    /// `REG_RSVD` itself).
    Reg,
    /// The slot carries a raw 32-bit value used directly as either an
    /// immediate operand or an absolute address. No decode-time validation
    /// beyond "the word exists" applies.
    Raw,
}

/// Static description of one opcode: its mnemonic (for diagnostics) and the
/// shape of its three operand slots.
#[derive(Clone, Copy, Debug)]
pub struct OpcodeInfo {
    /// Mnemonic, used only in trace/error output.
    pub name: &'static str,
    /// Operand kinds for (op1, op2, op3).
    pub args: [ArgKind; 3],
}

const NONE3: [ArgKind; 3] = [ArgKind::None, ArgKind::None, ArgKind::None];

macro_rules! op {
    ($name:literal, $a:ident, $b:ident, $c:ident) => {
        OpcodeInfo {
            name: $name,
            args: [ArgKind::$a, ArgKind::$b, ArgKind::$c],
        }
    };
}

/// The 71-entry canonical opcode table, indexed by opcode value.
pub const TABLE: [OpcodeInfo; 0x47] = [
    OpcodeInfo { name: "nop", args: NONE3 },        // 0x00
    op!("savew", Reg, Raw, None),                   // 0x01 (R, A)
    op!("loadw", Reg, Raw, None),                   // 0x02 (R, A)
    op!("saveb", Reg, Raw, None),                   // 0x03 (R, A)
    op!("loadb", Reg, Raw, None),                   // 0x04 (R, A)
    op!("savewr", Reg, Reg, None),                  // 0x05 (R, R addr)
    op!("loadwr", Reg, Reg, None),                  // 0x06 (R, R addr)
    op!("savebr", Reg, Reg, None),                  // 0x07 (R, R addr)
    op!("loadbr", Reg, Reg, None),                  // 0x08 (R, R addr)
    op!("savewi", Raw, Raw, None),                  // 0x09 (I, A)
    op!("loadwi", Reg, Raw, None),                  // 0x0a (R, I)
    op!("savebi", Raw, Raw, None),                  // 0x0b (I, A)
    op!("loadbi", Reg, Raw, None),                  // 0x0c (R, I)
    op!("savewri", Raw, Reg, None),                 // 0x0d (I, R addr)
    op!("savebri", Raw, Reg, None),                 // 0x0e (I, R addr)
    op!("add", Reg, Reg, Reg),                      // 0x0f
    op!("sub", Reg, Reg, Reg),                      // 0x10
    op!("mul", Reg, Reg, Reg),                      // 0x11
    op!("div", Reg, Reg, Reg),                      // 0x12
    op!("mod", Reg, Reg, Reg),                      // 0x13
    op!("addi", Reg, Raw, Reg),                     // 0x14
    op!("subi", Reg, Raw, Reg),                     // 0x15
    op!("muli", Reg, Raw, Reg),                     // 0x16
    op!("divi", Reg, Raw, Reg),                     // 0x17
    op!("modi", Reg, Raw, Reg),                     // 0x18
    op!("jmp", Raw, None, None),                    // 0x19 (A)
    op!("jmpr", Reg, None, None),                   // 0x1a (R addr)
    op!("jmplt", Reg, Reg, Raw),                    // 0x1b (R, R, A)
    op!("jmpgt", Reg, Reg, Raw),                     // 0x1c
    op!("jmple", Reg, Reg, Raw),                     // 0x1d
    op!("jmpge", Reg, Reg, Raw),                     // 0x1e
    op!("jmpeq", Reg, Reg, Raw),                     // 0x1f
    op!("jmpne", Reg, Reg, Raw),                     // 0x20
    op!("jmplti", Reg, Raw, Raw),                    // 0x21 (R, I, A)
    op!("jmpgti", Reg, Raw, Raw),                    // 0x22
    op!("jmplei", Reg, Raw, Raw),                    // 0x23
    op!("jmpgei", Reg, Raw, Raw),                    // 0x24
    op!("jmpeqi", Reg, Raw, Raw),                    // 0x25
    op!("jmpnei", Reg, Raw, Raw),                    // 0x26
    op!("jmpltr", Reg, Reg, Reg),                    // 0x27 (R, R, R addr)
    op!("jmpgtr", Reg, Reg, Reg),                    // 0x28
    op!("jmpler", Reg, Reg, Reg),                    // 0x29
    op!("jmpger", Reg, Reg, Reg),                    // 0x2a
    op!("jmpeqr", Reg, Reg, Reg),                     // 0x2b
    op!("jmpner", Reg, Reg, Reg),                     // 0x2c
    op!("jmpltri", Reg, Raw, Reg),                    // 0x2d (R, I, R addr)
    op!("jmpgtri", Reg, Raw, Reg),                    // 0x2e
    op!("jmpleri", Reg, Raw, Reg),                    // 0x2f
    op!("jmpgeri", Reg, Raw, Reg),                    // 0x30
    op!("jmpeqri", Reg, Raw, Reg),                    // 0x31
    op!("jmpneri", Reg, Raw, Reg),                    // 0x32
    OpcodeInfo { name: "halt", args: NONE3 },          // 0x33
    OpcodeInfo { name: "intr", args: NONE3 },          // 0x34
    OpcodeInfo { name: "rfe", args: NONE3 },           // 0x35
    OpcodeInfo { name: "wait", args: NONE3 },          // 0x36
    op!("swap", Reg, Reg, None),                       // 0x37
    op!("copy", Reg, Reg, None),                       // 0x38
    op!("and", Reg, Reg, Reg),                         // 0x39
    op!("or", Reg, Reg, Reg),                          // 0x3a
    op!("xor", Reg, Reg, Reg),                         // 0x3b
    op!("andi", Reg, Raw, Reg),                        // 0x3c
    op!("ori", Reg, Raw, Reg),                         // 0x3d
    op!("xori", Reg, Raw, Reg),                        // 0x3e
    op!("not", Reg, Reg, None),                        // 0x3f
    op!("shl", Reg, Reg, Reg),                         // 0x40
    op!("shr", Reg, Reg, Reg),                         // 0x41
    op!("shli", Reg, Raw, Reg),                        // 0x42
    op!("shri", Reg, Raw, Reg),                        // 0x43
    OpcodeInfo { name: "cpuid", args: NONE3 },         // 0x44
    op!("strapr", Reg, Raw, None),                     // 0x45 (R addr, A)
    op!("strapi", Raw, Raw, None),                     // 0x46 (I, A)
];

pub use self::names::*;

/// Numeric opcode constants, for use in `execute`'s dispatch match.
pub mod names {
    pub const NOP: u8 = 0x00;
    pub const SAVEW: u8 = 0x01;
    pub const LOADW: u8 = 0x02;
    pub const SAVEB: u8 = 0x03;
    pub const LOADB: u8 = 0x04;
    pub const SAVEWR: u8 = 0x05;
    pub const LOADWR: u8 = 0x06;
    pub const SAVEBR: u8 = 0x07;
    pub const LOADBR: u8 = 0x08;
    pub const SAVEWI: u8 = 0x09;
    pub const LOADWI: u8 = 0x0a;
    pub const SAVEBI: u8 = 0x0b;
    pub const LOADBI: u8 = 0x0c;
    pub const SAVEWRI: u8 = 0x0d;
    pub const SAVEBRI: u8 = 0x0e;
    pub const ADD: u8 = 0x0f;
    pub const SUB: u8 = 0x10;
    pub const MUL: u8 = 0x11;
    pub const DIV: u8 = 0x12;
    pub const MOD: u8 = 0x13;
    pub const ADDI: u8 = 0x14;
    pub const SUBI: u8 = 0x15;
    pub const MULI: u8 = 0x16;
    pub const DIVI: u8 = 0x17;
    pub const MODI: u8 = 0x18;
    pub const JMP: u8 = 0x19;
    pub const JMPR: u8 = 0x1a;
    pub const JMPLT: u8 = 0x1b;
    pub const JMPGT: u8 = 0x1c;
    pub const JMPLE: u8 = 0x1d;
    pub const JMPGE: u8 = 0x1e;
    pub const JMPEQ: u8 = 0x1f;
    pub const JMPNE: u8 = 0x20;
    pub const JMPLTI: u8 = 0x21;
    pub const JMPGTI: u8 = 0x22;
    pub const JMPLEI: u8 = 0x23;
    pub const JMPGEI: u8 = 0x24;
    pub const JMPEQI: u8 = 0x25;
    pub const JMPNEI: u8 = 0x26;
    pub const JMPLTR: u8 = 0x27;
    pub const JMPGTR: u8 = 0x28;
    pub const JMPLER: u8 = 0x29;
    pub const JMPGER: u8 = 0x2a;
    pub const JMPEQR: u8 = 0x2b;
    pub const JMPNER: u8 = 0x2c;
    pub const JMPLTRI: u8 = 0x2d;
    pub const JMPGTRI: u8 = 0x2e;
    pub const JMPLERI: u8 = 0x2f;
    pub const JMPGERI: u8 = 0x30;
    pub const JMPEQRI: u8 = 0x31;
    pub const JMPNERI: u8 = 0x32;
    pub const HALT: u8 = 0x33;
    pub const INTR: u8 = 0x34;
    pub const RFE: u8 = 0x35;
    pub const WAIT: u8 = 0x36;
    pub const SWAP: u8 = 0x37;
    pub const COPY: u8 = 0x38;
    pub const AND: u8 = 0x39;
    pub const OR: u8 = 0x3a;
    pub const XOR: u8 = 0x3b;
    pub const ANDI: u8 = 0x3c;
    pub const ORI: u8 = 0x3d;
    pub const XORI: u8 = 0x3e;
    pub const NOT: u8 = 0x3f;
    pub const SHL: u8 = 0x40;
    pub const SHR: u8 = 0x41;
    pub const SHLI: u8 = 0x42;
    pub const SHRI: u8 = 0x43;
    pub const CPUID: u8 = 0x44;
    pub const STRAPR: u8 = 0x45;
    pub const STRAPI: u8 = 0x46;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_length_matches_opcode_space() {
        assert_eq!(TABLE.len(), (STRAPI as usize) + 1);
    }

    #[test]
    fn spot_check_mnemonics() {
        assert_eq!(TABLE[JMP as usize].name, "jmp");
        assert_eq!(TABLE[SWAP as usize].name, "swap");
        assert_eq!(TABLE[CPUID as usize].name, "cpuid");
    }
}
