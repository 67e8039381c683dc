//! Two-pass assembler
//!
//! Pass 1 walks the source lines, binds labels to instruction
//! addresses, records `#sym` directives, and assigns each instruction
//! line its PC. Pass 2 parses operands, expands pseudo-instructions
//! and emits [`Instruction`] records with branch and jump targets
//! fully resolved (labels, then symbols, then numeric literals).
//!
//! Pass 1 must already know how many slots a line occupies, because
//! `li` with an out-of-range immediate expands to two instructions
//! and every later label would otherwise bind to the wrong address.

use std::collections::HashMap;

use thiserror::Error;

use crate::instr::{parse_register, Format, Instruction, Opcode};
use crate::program::Program;

/// Cap on emitted instructions
pub const MAX_INSTRUCTIONS: usize = 5000;
/// Cap on assembly source size in bytes
pub const MAX_SOURCE_BYTES: usize = 20_480;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {kind}")]
pub struct AsmError {
    /// 1-based source line
    pub line: usize,
    pub kind: AsmErrorKind,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AsmErrorKind {
    #[error("unknown instruction '{0}'")]
    UnknownMnemonic(String),
    #[error("bad register '{0}'")]
    BadRegister(String),
    #[error("bad immediate '{0}'")]
    BadImmediate(String),
    #[error("bad operand '{0}'")]
    BadOperand(String),
    #[error("wrong number of operands for '{0}'")]
    WrongOperandCount(String),
    #[error("unknown label '{0}'")]
    UnknownLabel(String),
    #[error("duplicate label '{0}'")]
    DuplicateLabel(String),
    #[error("branch target must be word-aligned")]
    MisalignedTarget,
    #[error("bad #sym format")]
    BadSymDirective,
    #[error("too many instructions (limit {0})")]
    TooManyInstructions(usize),
    #[error("source too large (limit {0} bytes)")]
    SourceTooLarge(usize),
}

fn err(line: usize, kind: AsmErrorKind) -> AsmError {
    AsmError { line, kind }
}

/// An instruction line carried from pass 1 to pass 2
struct PendingLine<'a> {
    text: &'a str,
    /// 1-based source line number
    line_no: usize,
    /// 0-based index into the preserved source lines
    src_line: usize,
    pc: u32,
}

/// Assemble source text into a [`Program`]
pub fn assemble(source: &str) -> Result<Program, AsmError> {
    if source.len() > MAX_SOURCE_BYTES {
        return Err(err(1, AsmErrorKind::SourceTooLarge(MAX_SOURCE_BYTES)));
    }

    let source_lines: Vec<String> = source.lines().map(str::to_owned).collect();

    let mut labels: HashMap<String, u32> = HashMap::new();
    let mut symbols: HashMap<String, u32> = HashMap::new();
    let mut pending: Vec<PendingLine> = Vec::new();

    // Pass 1: bind labels and symbols, assign PCs
    let mut pc: u32 = 0;
    for (index, raw_line) in source_lines.iter().enumerate() {
        let line_no = index + 1;
        let line = raw_line.trim();

        // #sym is recognised before comment stripping
        if is_sym_directive(line) {
            let (name, value) = parse_sym_directive(&line[4..])
                .ok_or_else(|| err(line_no, AsmErrorKind::BadSymDirective))?;
            symbols.insert(name.to_owned(), value);
            continue;
        }

        let mut rest = strip_comment(line).trim();
        while let Some((label, tail)) = split_label(rest) {
            if labels.contains_key(label) {
                return Err(err(line_no, AsmErrorKind::DuplicateLabel(label.to_owned())));
            }
            labels.insert(label.to_owned(), pc);
            rest = tail.trim();
        }
        if rest.is_empty() {
            continue;
        }

        let slots = slot_count(rest);
        pending.push(PendingLine {
            text: rest,
            line_no,
            src_line: index,
            pc,
        });
        pc += 4 * slots;
        if pc as usize / 4 > MAX_INSTRUCTIONS {
            return Err(err(line_no, AsmErrorKind::TooManyInstructions(MAX_INSTRUCTIONS)));
        }
    }

    // Pass 2: parse operands, expand pseudo-instructions, emit
    let mut instructions: Vec<Instruction> = Vec::with_capacity(pc as usize / 4);
    for line in &pending {
        debug_assert_eq!(4 * instructions.len() as u32, line.pc);
        emit_line(line, &labels, &symbols, &mut instructions)?;
    }

    Ok(Program {
        instructions,
        source_lines,
        labels,
        symbols,
    })
}

/// Number of PC slots an instruction line occupies. Only `li` with an
/// immediate outside the ADDI range takes two; a malformed `li` is
/// reported by pass 2, not here.
fn slot_count(text: &str) -> u32 {
    let (mnemonic, operands) = split_mnemonic(text);
    if !mnemonic.eq_ignore_ascii_case("li") {
        return 1;
    }
    let operands = split_operands(operands);
    match operands.as_slice() {
        [_, imm] => match parse_immediate(imm) {
            Some(value) if !addi_range(value) => 2,
            _ => 1,
        },
        _ => 1,
    }
}

fn addi_range(value: i32) -> bool {
    (-2048..=2047).contains(&value)
}

fn emit_line(
    line: &PendingLine,
    labels: &HashMap<String, u32>,
    symbols: &HashMap<String, u32>,
    out: &mut Vec<Instruction>,
) -> Result<(), AsmError> {
    let (raw_mnemonic, operand_text) = split_mnemonic(line.text);
    let mnemonic = raw_mnemonic.to_ascii_lowercase();
    let operands = split_operands(operand_text);
    let line_no = line.line_no;

    let expect = |n: usize| -> Result<(), AsmError> {
        if operands.len() == n {
            Ok(())
        } else {
            Err(err(line_no, AsmErrorKind::WrongOperandCount(mnemonic.clone())))
        }
    };
    let reg = |token: &str| -> Result<u8, AsmError> {
        parse_register(token).ok_or_else(|| err(line_no, AsmErrorKind::BadRegister(token.to_owned())))
    };
    let imm = |token: &str| -> Result<i32, AsmError> {
        parse_immediate(token).ok_or_else(|| err(line_no, AsmErrorKind::BadImmediate(token.to_owned())))
    };
    let target = |token: &str| resolve_target(token, labels, symbols, line_no);

    // Pseudo-instructions first
    match mnemonic.as_str() {
        "nop" => {
            expect(0)?;
            out.push(Instruction::new(Opcode::Addi, line.src_line));
            return Ok(());
        }
        "mv" => {
            expect(2)?;
            let mut inst = Instruction::new(Opcode::Addi, line.src_line);
            inst.rd = reg(&operands[0])?;
            inst.rs1 = reg(&operands[1])?;
            out.push(inst);
            return Ok(());
        }
        "j" => {
            expect(1)?;
            let mut inst = Instruction::new(Opcode::Jal, line.src_line);
            inst.target_pc = target(&operands[0])?;
            out.push(inst);
            return Ok(());
        }
        "ret" => {
            expect(0)?;
            let mut inst = Instruction::new(Opcode::Jalr, line.src_line);
            inst.rs1 = 1;
            out.push(inst);
            return Ok(());
        }
        "call" => {
            expect(1)?;
            let mut inst = Instruction::new(Opcode::Jal, line.src_line);
            inst.rd = 1;
            inst.target_pc = target(&operands[0])?;
            out.push(inst);
            return Ok(());
        }
        "li" => {
            expect(2)?;
            let rd = reg(&operands[0])?;
            let value = imm(&operands[1])?;
            if addi_range(value) {
                let mut inst = Instruction::new(Opcode::Addi, line.src_line);
                inst.rd = rd;
                inst.imm = value;
                out.push(inst);
            } else {
                let hi = value.wrapping_add(0x800) >> 12;
                let lo = value.wrapping_sub(hi.wrapping_shl(12));
                let mut lui = Instruction::new(Opcode::Lui, line.src_line);
                lui.rd = rd;
                lui.imm = hi;
                out.push(lui);
                let mut addi = Instruction::new(Opcode::Addi, line.src_line);
                addi.rd = rd;
                addi.rs1 = rd;
                addi.imm = lo;
                out.push(addi);
            }
            return Ok(());
        }
        _ => {}
    }

    let op = Opcode::from_mnemonic(&mnemonic)
        .ok_or_else(|| err(line_no, AsmErrorKind::UnknownMnemonic(raw_mnemonic.to_owned())))?;
    let mut inst = Instruction::new(op, line.src_line);

    match op.format() {
        Format::RegReg => {
            expect(3)?;
            inst.rd = reg(&operands[0])?;
            inst.rs1 = reg(&operands[1])?;
            inst.rs2 = reg(&operands[2])?;
        }
        Format::RegImm => {
            expect(3)?;
            inst.rd = reg(&operands[0])?;
            inst.rs1 = reg(&operands[1])?;
            inst.imm = imm(&operands[2])?;
        }
        Format::Load => {
            expect(2)?;
            inst.rd = reg(&operands[0])?;
            let (offset, base) = mem_operand(&operands[1], line_no)?;
            inst.imm = offset;
            inst.rs1 = reg(base)?;
        }
        Format::Store => {
            expect(2)?;
            inst.rs2 = reg(&operands[0])?;
            let (offset, base) = mem_operand(&operands[1], line_no)?;
            inst.imm = offset;
            inst.rs1 = reg(base)?;
        }
        Format::Branch => {
            expect(3)?;
            inst.rs1 = reg(&operands[0])?;
            inst.rs2 = reg(&operands[1])?;
            inst.target_pc = target(&operands[2])?;
        }
        Format::Jal => {
            expect(2)?;
            inst.rd = reg(&operands[0])?;
            inst.target_pc = target(&operands[1])?;
        }
        Format::Jalr => {
            expect(2)?;
            inst.rd = reg(&operands[0])?;
            let (offset, base) = mem_operand(&operands[1], line_no)?;
            inst.imm = offset;
            inst.rs1 = reg(base)?;
        }
        Format::UpperImm => {
            expect(2)?;
            inst.rd = reg(&operands[0])?;
            inst.imm = imm(&operands[1])?;
        }
        Format::Ecall => {
            expect(0)?;
        }
    }

    out.push(inst);
    Ok(())
}

/// Comments start at `#` or `//`, whichever comes first
fn strip_comment(line: &str) -> &str {
    let cut = match (line.find('#'), line.find("//")) {
        (Some(h), Some(s)) => Some(h.min(s)),
        (Some(h), None) => Some(h),
        (None, Some(s)) => Some(s),
        (None, None) => None,
    };
    match cut {
        Some(i) => &line[..i],
        None => line,
    }
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a leading `name:` label off an instruction line
fn split_label(text: &str) -> Option<(&str, &str)> {
    let end = text.find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))?;
    if end == 0 {
        return None;
    }
    let (name, rest) = text.split_at(end);
    let rest = rest.strip_prefix(':')?;
    if !is_ident(name) {
        return None;
    }
    Some((name, rest))
}

fn split_mnemonic(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim_start()),
        None => (text, ""),
    }
}

fn split_operands(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }
    text.split(',').map(|part| part.trim().to_owned()).collect()
}

fn is_sym_directive(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes.len() > 4
        && bytes[..4].eq_ignore_ascii_case(b"#sym")
        && bytes[4].is_ascii_whitespace()
}

/// Parse `NAME = VALUE` or `NAME VALUE` after the `#sym` keyword.
/// An inline comment after the value is discarded.
fn parse_sym_directive(rest: &str) -> Option<(&str, u32)> {
    let rest = strip_sym_comment(rest).trim();
    let (name, value_text) = match rest.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => {
            let (name, value) = rest.split_at(rest.find(char::is_whitespace)?);
            (name, value.trim())
        }
    };
    if !is_ident(name) || value_text.is_empty() || value_text.contains(char::is_whitespace) {
        return None;
    }
    let value = parse_immediate(value_text)?;
    Some((name, value as u32))
}

/// Strip a trailing comment from a `#sym` payload. The directive's own
/// leading `#` has already been consumed, so any later `#` or `//`
/// starts a comment.
fn strip_sym_comment(rest: &str) -> &str {
    strip_comment(rest)
}

/// Decimal or `0x` hex, optionally negated. Values wider than 32 bits
/// wrap; range checking is the interpreter's business, not the parser's.
fn parse_immediate(token: &str) -> Option<i32> {
    let (negative, rest) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let magnitude = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        rest.parse::<i64>().ok()?
    };
    let value = if negative { -magnitude } else { magnitude };
    Some(value as i32)
}

/// Split an `offset(base)` operand. An empty offset means zero.
fn mem_operand(token: &str, line_no: usize) -> Result<(i32, &str), AsmError> {
    let bad = || err(line_no, AsmErrorKind::BadOperand(token.to_owned()));
    let open = token.find('(').ok_or_else(bad)?;
    if !token.ends_with(')') || token.len() < open + 2 {
        return Err(bad());
    }
    let offset_text = &token[..open];
    let base = &token[open + 1..token.len() - 1];
    let offset = if offset_text.is_empty() {
        0
    } else {
        parse_immediate(offset_text)
            .ok_or_else(|| err(line_no, AsmErrorKind::BadImmediate(offset_text.to_owned())))?
    };
    Ok((offset, base))
}

/// Resolve a branch/jump target: label, then symbol, then a numeric
/// absolute PC (which must be word-aligned)
fn resolve_target(
    token: &str,
    labels: &HashMap<String, u32>,
    symbols: &HashMap<String, u32>,
    line_no: usize,
) -> Result<u32, AsmError> {
    if is_ident(token) {
        if let Some(&pc) = labels.get(token) {
            return Ok(pc);
        }
        if let Some(&addr) = symbols.get(token) {
            return Ok(addr);
        }
        return Err(err(line_no, AsmErrorKind::UnknownLabel(token.to_owned())));
    }
    let value = parse_immediate(token)
        .ok_or_else(|| err(line_no, AsmErrorKind::BadImmediate(token.to_owned())))?;
    let pc = value as u32;
    if pc % 4 != 0 {
        return Err(err(line_no, AsmErrorKind::MisalignedTarget));
    }
    Ok(pc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(source: &str) -> Vec<Opcode> {
        assemble(source).unwrap().instructions.iter().map(|i| i.op).collect()
    }

    fn kind(source: &str) -> AsmErrorKind {
        assemble(source).unwrap_err().kind
    }

    #[test]
    fn simple_program_assembles_in_order() {
        let program = assemble("addi x1, x0, 5\naddi x2, x0, 7\nadd x3, x1, x2").unwrap();
        assert_eq!(program.len(), 3);
        assert_eq!(program.instructions[0].op, Opcode::Addi);
        assert_eq!(program.instructions[0].rd, 1);
        assert_eq!(program.instructions[0].imm, 5);
        assert_eq!(program.instructions[2].op, Opcode::Add);
        assert_eq!(program.instructions[2].rs1, 1);
        assert_eq!(program.instructions[2].rs2, 2);
        assert_eq!(program.instructions[2].src_line, 2);
    }

    #[test]
    fn abi_aliases_and_hex_immediates() {
        let program = assemble("addi sp, sp, -16\nandi a0, t1, 0x7f").unwrap();
        assert_eq!(program.instructions[0].rd, 2);
        assert_eq!(program.instructions[0].rs1, 2);
        assert_eq!(program.instructions[0].imm, -16);
        assert_eq!(program.instructions[1].rd, 10);
        assert_eq!(program.instructions[1].rs1, 6);
        assert_eq!(program.instructions[1].imm, 0x7f);
    }

    #[test]
    fn wide_hex_immediate_wraps_to_negative() {
        let program = assemble("li x1, 0xFFFFFFFF").unwrap();
        assert_eq!(program.len(), 1);
        assert_eq!(program.instructions[0].op, Opcode::Addi);
        assert_eq!(program.instructions[0].imm, -1);
    }

    #[test]
    fn comments_in_both_styles_are_stripped() {
        let program = assemble("addi x1, x0, 1 # hash comment\naddi x2, x0, 2 // slash comment\n// whole line\n# whole line").unwrap();
        assert_eq!(program.len(), 2);
    }

    #[test]
    fn labels_bind_to_the_next_instruction() {
        let program = assemble("start:\n  addi x1, x0, 1\nloop: beq x1, x1, loop").unwrap();
        assert_eq!(program.labels["start"], 0);
        assert_eq!(program.labels["loop"], 4);
        assert_eq!(program.instructions[1].target_pc, 4);
    }

    #[test]
    fn multiple_labels_on_one_line() {
        let program = assemble("a: b: addi x1, x0, 1").unwrap();
        assert_eq!(program.labels["a"], 0);
        assert_eq!(program.labels["b"], 0);
    }

    #[test]
    fn label_at_end_of_program_is_legal() {
        let program = assemble("beq x0, x0, done\ndone:").unwrap();
        assert_eq!(program.labels["done"], 4);
        assert_eq!(program.end_pc(), 4);
    }

    #[test]
    fn duplicate_label_fails() {
        assert_eq!(
            kind("a: addi x1, x0, 1\na: addi x2, x0, 2"),
            AsmErrorKind::DuplicateLabel("a".into())
        );
    }

    #[test]
    fn unknown_target_fails() {
        assert_eq!(kind("beq x0, x0, nowhere"), AsmErrorKind::UnknownLabel("nowhere".into()));
    }

    #[test]
    fn numeric_targets_must_be_word_aligned() {
        assert_eq!(kind("jal x0, 6"), AsmErrorKind::MisalignedTarget);
        let program = assemble("jal x0, 8").unwrap();
        assert_eq!(program.instructions[0].target_pc, 8);
    }

    #[test]
    fn sym_directive_both_grammars() {
        let program = assemble("#sym buf = 0x40\n#SYM far 16\naddi x1, x0, 1").unwrap();
        assert_eq!(program.symbols["buf"], 0x40);
        assert_eq!(program.symbols["far"], 16);
    }

    #[test]
    fn sym_directive_with_inline_comment() {
        let program = assemble("#sym buf = 64 # scratch space\n#sym far 16 // landing pad").unwrap();
        assert_eq!(program.symbols["buf"], 64);
        assert_eq!(program.symbols["far"], 16);
    }

    #[test]
    fn malformed_sym_directive_fails() {
        assert_eq!(kind("#sym 9bad = 4"), AsmErrorKind::BadSymDirective);
        assert_eq!(kind("#sym onlyname"), AsmErrorKind::BadSymDirective);
        assert_eq!(kind("#sym name = what"), AsmErrorKind::BadSymDirective);
    }

    #[test]
    fn symbols_resolve_as_branch_targets_after_labels() {
        let program = assemble("#sym far = 16\nbne x1, x0, far").unwrap();
        assert_eq!(program.instructions[0].target_pc, 16);
    }

    #[test]
    fn pseudo_nop_mv_j_ret_call() {
        assert_eq!(ops("nop"), vec![Opcode::Addi]);
        let program = assemble("mv x5, x6\nj end\nret\ncall end\nend:").unwrap();
        let mv = program.instructions[0];
        assert_eq!((mv.op, mv.rd, mv.rs1, mv.imm), (Opcode::Addi, 5, 6, 0));
        let j = program.instructions[1];
        assert_eq!((j.op, j.rd, j.target_pc), (Opcode::Jal, 0, 16));
        let ret = program.instructions[2];
        assert_eq!((ret.op, ret.rd, ret.rs1, ret.imm), (Opcode::Jalr, 0, 1, 0));
        let call = program.instructions[3];
        assert_eq!((call.op, call.rd, call.target_pc), (Opcode::Jal, 1, 16));
    }

    #[test]
    fn small_li_is_one_addi() {
        let program = assemble("li x1, -2048\nli x2, 2047").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.instructions[0].imm, -2048);
        assert_eq!(program.instructions[1].imm, 2047);
    }

    #[test]
    fn large_li_splits_into_lui_addi() {
        let program = assemble("li x1, 0x12345678").unwrap();
        assert_eq!(ops("li x1, 0x12345678"), vec![Opcode::Lui, Opcode::Addi]);
        let lui = program.instructions[0];
        let addi = program.instructions[1];
        // lui places hi<<12, addi adds the (possibly negative) low part
        assert_eq!(lui.imm.wrapping_shl(12).wrapping_add(addi.imm), 0x12345678);
        assert_eq!(addi.rs1, 1);
        assert_eq!(addi.rd, 1);
    }

    #[test]
    fn large_negative_li_round_trips() {
        let program = assemble("li x1, -266465").unwrap();
        let lui = program.instructions[0];
        let addi = program.instructions[1];
        assert_eq!(lui.imm.wrapping_shl(12).wrapping_add(addi.imm), -266465);
    }

    #[test]
    fn labels_after_large_li_account_for_both_slots() {
        let program = assemble("li x1, 0x10000\ntail: addi x2, x0, 1\nbeq x0, x0, tail").unwrap();
        assert_eq!(program.labels["tail"], 8);
        assert_eq!(program.instructions[3].target_pc, 8);
    }

    #[test]
    fn load_store_and_jalr_operands() {
        let program = assemble("lw x3, 8(x1)\nsb x4, -1(sp)\njalr x2, 1(x1)\nlw x5, (x1)").unwrap();
        let lw = program.instructions[0];
        assert_eq!((lw.rd, lw.rs1, lw.imm), (3, 1, 8));
        let sb = program.instructions[1];
        assert_eq!((sb.rs2, sb.rs1, sb.imm), (4, 2, -1));
        let jalr = program.instructions[2];
        assert_eq!((jalr.rd, jalr.rs1, jalr.imm), (2, 1, 1));
        assert_eq!(program.instructions[3].imm, 0);
    }

    #[test]
    fn operand_shape_errors() {
        assert_eq!(kind("addi x1, x0"), AsmErrorKind::WrongOperandCount("addi".into()));
        assert_eq!(kind("lw x1, 4"), AsmErrorKind::BadOperand("4".into()));
        assert_eq!(kind("addi x1, x99, 0"), AsmErrorKind::BadRegister("x99".into()));
        assert_eq!(kind("addi x1, x0, five"), AsmErrorKind::BadImmediate("five".into()));
        assert_eq!(kind("frobnicate x1"), AsmErrorKind::UnknownMnemonic("frobnicate".into()));
    }

    #[test]
    fn error_reports_one_based_line() {
        let error = assemble("addi x1, x0, 1\naddi x2, x0\n").unwrap_err();
        assert_eq!(error.line, 2);
        assert_eq!(error.to_string(), "line 2: wrong number of operands for 'addi'");
    }

    #[test]
    fn source_size_cap() {
        let big = "# filler\n".repeat(MAX_SOURCE_BYTES / 9 + 1);
        assert_eq!(kind(&big), AsmErrorKind::SourceTooLarge(MAX_SOURCE_BYTES));
    }

    #[test]
    fn instruction_count_cap() {
        let source = "nop\n".repeat(MAX_INSTRUCTIONS + 1);
        assert_eq!(kind(&source), AsmErrorKind::TooManyInstructions(MAX_INSTRUCTIONS));
        let source = "nop\n".repeat(MAX_INSTRUCTIONS);
        assert!(assemble(&source).is_ok());
    }

    #[test]
    fn source_lines_preserved_verbatim() {
        let source = "  addi x1, x0, 1 # keep me";
        let program = assemble(source).unwrap();
        assert_eq!(program.source_lines[0], source);
    }

    #[test]
    fn labels_shadow_symbols_when_resolving_targets() {
        let program = assemble("#sym foo = 32\nfoo: nop\nj foo").unwrap();
        assert_eq!(program.instructions[1].target_pc, 0);
    }

    #[test]
    fn crlf_sources_assemble() {
        let program = assemble("addi x1, x0, 1\r\naddi x2, x0, 2\r\n").unwrap();
        assert_eq!(program.len(), 2);
        assert_eq!(program.source_lines.len(), 2);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        let program = assemble("ADDI x1, x0, 5\nLI x2, 3").unwrap();
        assert_eq!(program.instructions[0].op, Opcode::Addi);
        assert_eq!(program.instructions[1].imm, 3);
    }
}
