use crate::ast::*;
use crate::error::Error;
use crate::lexer::{lex, Token};
use crate::sol_type::{parse_base_type, SolArg, SolType};
use alloy_primitives::U256;
use huff_evm::Opcode;

/// Parses a complete Huff source file (after include resolution has already
/// concatenated its dependencies) into a [`Root`].
pub fn parse(src: &str) -> Result<Root<'_>, Vec<Error>> {
    let tokens = lex(src).map_err(|errs| {
        errs.into_iter()
            .map(|e| Error::Lex(e.to_string()))
            .collect::<Vec<_>>()
    })?;

    let mut p = Cursor { toks: &tokens, pos: 0 };
    let mut sections = Vec::new();
    while p.peek().is_some() {
        match p.parse_section() {
            Ok(section) => sections.push(section),
            Err(e) => return Err(vec![e]),
        }
    }
    Ok(Root(sections.into_boxed_slice()))
}

struct Cursor<'t, 'src> {
    toks: &'t [Spanned<Token<'src>>],
    pos: usize,
}

impl<'t, 'src> Cursor<'t, 'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.toks.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.toks
            .get(self.pos)
            .map(|(_, s)| *s)
            .unwrap_or_else(|| self.eof_span())
    }

    fn eof_span(&self) -> Span {
        self.toks
            .last()
            .map(|(_, s)| Span::new(s.end, s.end))
            .unwrap_or_else(|| Span::new(0, 0))
    }

    fn bump(&mut self) -> Option<Spanned<Token<'src>>> {
        let t = self.toks.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn unexpected(&self, expected: &str) -> Error {
        match self.toks.get(self.pos) {
            Some((tok, span)) => Error::UnexpectedToken {
                span: *span,
                expected: expected.to_string(),
                found: tok.to_string(),
            },
            None => Error::UnexpectedEof(expected.to_string()),
        }
    }

    fn expect_punct(&mut self, c: char) -> Result<Span, Error> {
        match self.peek() {
            Some(Token::Punct(p)) if *p == c => {
                let (_, span) = self.bump().unwrap();
                Ok(span)
            }
            _ => Err(self.unexpected(&format!("'{c}'"))),
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if matches!(self.peek(), Some(Token::Punct(p)) if *p == c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_one_of_keywords(&mut self, words: &[&str]) -> Result<Spanned<&'src str>, Error> {
        match self.peek() {
            Some(Token::Keyword(k)) if words.contains(k) => {
                let (tok, span) = self.bump().unwrap();
                let Token::Keyword(k) = tok else { unreachable!() };
                Ok((k, span))
            }
            _ => Err(self.unexpected(&format!("one of {words:?}"))),
        }
    }

    fn expect_ident(&mut self) -> Result<Spanned<&'src str>, Error> {
        match self.peek() {
            Some(Token::Ident(s)) => {
                let (tok, span) = self.bump().unwrap();
                let Token::Ident(s) = tok else { unreachable!() };
                let _ = s;
                Ok((s, span))
            }
            _ => Err(self.unexpected("an identifier")),
        }
    }

    /// Consumes the next token as plain text if it's an identifier whose text
    /// equals `word` exactly -- used for grammar words (`indexed`, `takes`,
    /// `returns`, `view`, `payable`, `nonpayable`) that aren't real keywords.
    fn eat_ident_text(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Token::Ident(s)) if *s == word) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect_ident_text(&mut self, word: &str) -> Result<Span, Error> {
        if self.eat_ident_text(word) {
            Ok(self.toks[self.pos - 1].1)
        } else {
            Err(self.unexpected(&format!("\"{word}\"")))
        }
    }

    fn expect_hex(&mut self) -> Result<Spanned<&'src str>, Error> {
        match self.peek() {
            Some(Token::Hex(s)) => {
                let (tok, span) = self.bump().unwrap();
                let Token::Hex(s) = tok else { unreachable!() };
                let _ = s;
                Ok((s, span))
            }
            _ => Err(self.unexpected("a hex literal")),
        }
    }

    fn expect_dec(&mut self) -> Result<Spanned<&'src str>, Error> {
        match self.peek() {
            Some(Token::Dec(s)) => {
                let (tok, span) = self.bump().unwrap();
                let Token::Dec(s) = tok else { unreachable!() };
                let _ = s;
                Ok((s, span))
            }
            _ => Err(self.unexpected("a number")),
        }
    }

    fn expect_string(&mut self) -> Result<Spanned<String>, Error> {
        match self.peek() {
            Some(Token::String(_)) => {
                let (tok, span) = self.bump().unwrap();
                let Token::String(s) = tok else { unreachable!() };
                Ok((s, span))
            }
            _ => Err(self.unexpected("a string literal")),
        }
    }
}

fn u256_from_hex(text: &str, span: Span) -> Result<U256, Error> {
    let digits = &text[2..];
    if digits.len() > 64 {
        return Err(Error::HexLiteralTooLarge(span));
    }
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    Ok(U256::from_str_radix(digits, 16).expect("lexer guarantees hex digits"))
}

fn literal_to_bytes(text: &str) -> Box<[u8]> {
    let digits = &text[2..];
    let padded = if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    };
    hex::decode(padded)
        .expect("lexer guarantees hex digits")
        .into_boxed_slice()
}

const DEFINE_KINDS: &[&str] = &[
    "macro", "fn", "constant", "table", "jumptable", "function", "event", "error",
];

impl<'t, 'src> Cursor<'t, 'src> {
    fn parse_section(&mut self) -> Result<RootSection<'src>, Error> {
        match self.peek() {
            Some(Token::Keyword("include")) => {
                self.bump();
                let (path, _) = self.expect_string()?;
                Ok(RootSection::Include((path, self.toks[self.pos - 1].1)))
            }
            Some(Token::Keyword("define")) => {
                self.bump();
                self.parse_definition().map(RootSection::Definition)
            }
            _ => Err(self.unexpected("\"#define\" or \"#include\"")),
        }
    }

    fn parse_definition(&mut self) -> Result<Definition<'src>, Error> {
        // `jumptable__packed` lexes as one identifier, not the keyword `jumptable`.
        if let Some(Token::Ident("jumptable__packed")) = self.peek() {
            self.bump();
            return self.parse_jumptable(true).map(Definition::Jumptable);
        }

        let (kind, kind_span) = self.expect_one_of_keywords(DEFINE_KINDS)?;
        match kind {
            "macro" => self.parse_macro().map(Definition::Macro),
            "fn" => Err(Error::UnexpectedToken {
                span: kind_span,
                expected: "\"macro\"".to_string(),
                found: "\"fn\" (unsupported macro kind)".to_string(),
            }),
            "constant" => self.parse_constant(),
            "table" => self.parse_table(),
            "jumptable" => self.parse_jumptable(false).map(Definition::Jumptable),
            "function" => self.parse_function().map(Definition::Function),
            "event" => self.parse_event().map(Definition::Event),
            "error" => self.parse_error().map(Definition::Error),
            _ => unreachable!("expect_one_of_keywords restricted to DEFINE_KINDS"),
        }
    }

    fn parse_constant(&mut self) -> Result<Definition<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('=')?;
        let expr = if self.eat_ident_text("FREE_STORAGE_POINTER") {
            let start = self.toks[self.pos - 1].1;
            self.expect_punct('(')?;
            let end = self.expect_punct(')')?;
            (ConstExpr::FreeStoragePointer, Span::new(start.start, end.end))
        } else {
            let (text, span) = self.expect_hex()?;
            (ConstExpr::Value(u256_from_hex(text, span)?), span)
        };
        Ok(Definition::Constant { name, expr })
    }

    fn parse_table(&mut self) -> Result<Definition<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;
        let (text, span) = self.expect_hex()?;
        let _ = span;
        self.expect_punct('}')?;
        Ok(Definition::Table {
            name,
            data: literal_to_bytes(text),
        })
    }

    fn parse_jumptable(&mut self, packed: bool) -> Result<Jumptable<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('{')?;
        let mut labels = Vec::new();
        labels.push(self.expect_ident()?);
        while !matches!(self.peek(), Some(Token::Punct('}'))) {
            labels.push(self.expect_ident()?);
        }
        self.expect_punct('}')?;
        Ok(Jumptable {
            name,
            size: if packed { 1 } else { 2 },
            labels: labels.into_boxed_slice(),
        })
    }

    fn parse_macro(&mut self) -> Result<Macro<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('(')?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Some(Token::Punct(')'))) {
            params.push(self.expect_ident()?);
            while self.eat_punct(',') {
                params.push(self.expect_ident()?);
            }
        }
        self.expect_punct(')')?;
        self.expect_punct('=')?;
        self.expect_ident_text("takes")?;
        self.expect_punct('(')?;
        let (takes_text, takes_span) = self.expect_dec()?;
        self.expect_punct(')')?;
        self.expect_ident_text("returns")?;
        self.expect_punct('(')?;
        let (returns_text, returns_span) = self.expect_dec()?;
        self.expect_punct(')')?;
        let takes_returns = Some((
            (takes_text.parse().expect("lexer guarantees digits"), takes_span),
            (returns_text.parse().expect("lexer guarantees digits"), returns_span),
        ));

        self.expect_punct('{')?;
        let mut body = Vec::new();
        while !matches!(self.peek(), Some(Token::Punct('}'))) {
            body.push(self.parse_macro_statement()?);
        }
        self.expect_punct('}')?;

        Ok(Macro {
            name,
            params: params.into_boxed_slice(),
            takes_returns,
            body: body.into_boxed_slice(),
        })
    }

    fn parse_macro_statement(&mut self) -> Result<MacroStatement<'src>, Error> {
        if let Some(Token::Ident(_)) = self.peek() {
            if matches!(self.toks.get(self.pos + 1).map(|(t, _)| t), Some(Token::Punct(':'))) {
                let name = self.expect_ident()?;
                self.expect_punct(':')?;
                return Ok(MacroStatement::LabelDefinition(name));
            }
            if matches!(self.toks.get(self.pos + 1).map(|(t, _)| t), Some(Token::Punct('('))) {
                return self.parse_invoke().map(MacroStatement::Invoke);
            }
        }
        self.parse_instruction().map(MacroStatement::Instruction)
    }

    /// Parses one macro-body or call-argument element that isn't a label
    /// definition or an invocation: a hex literal, `pushN 0xHEX`, `<arg>`,
    /// `[CONST]`, or a bare identifier (opcode mnemonic or reference).
    fn parse_instruction(&mut self) -> Result<Instruction<'src>, Error> {
        match self.peek() {
            Some(Token::Hex(text)) => {
                let (text, span) = (*text, self.peek_span());
                self.bump();
                Ok(Instruction::VariablePush(
                    (u256_from_hex(text, span)?, span),
                    None,
                ))
            }
            Some(Token::Punct('<')) => {
                self.bump();
                let name = self.expect_ident()?;
                self.expect_punct('>')?;
                Ok(Instruction::MacroArgReference(name))
            }
            Some(Token::Punct('[')) => {
                self.bump();
                let name = self.expect_ident()?;
                self.expect_punct(']')?;
                Ok(Instruction::ConstantReference(name))
            }
            Some(Token::Ident(name)) if is_push_n_mnemonic(name) => {
                let width: u8 = name[4..].parse().expect("validated by is_push_n_mnemonic");
                let span = self.peek_span();
                self.bump();
                let (text, hex_span) = self.expect_hex()?;
                let value = u256_from_hex(text, hex_span)?;
                Ok(Instruction::VariablePush((value, span), Some(width)))
            }
            Some(Token::Ident(name)) => {
                let span = self.peek_span();
                self.bump();
                if let Some(op) = Opcode::from_mnemonic(name) {
                    Ok(Instruction::Op((op, span)))
                } else {
                    Ok(Instruction::LabelReference((name, span)))
                }
            }
            _ => Err(self.unexpected("a macro body element")),
        }
    }

    fn parse_invoke(&mut self) -> Result<Invoke<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('(')?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::Punct(')'))) {
            args.push(self.parse_instruction()?);
            while self.eat_punct(',') {
                args.push(self.parse_instruction()?);
            }
        }
        self.expect_punct(')')?;
        let args = args.into_boxed_slice();
        if is_builtin_name(name.0) {
            Ok(Invoke::Builtin { name, args })
        } else {
            Ok(Invoke::Macro { name, args })
        }
    }

    fn parse_type(&mut self) -> Result<SolType<'static>, Error> {
        let base = if self.eat_punct('(') {
            self.pos -= 1;
            SolType::Tuple(self.parse_tuple()?)
        } else {
            let (name, span) = self.expect_ident()?;
            parse_base_type(name).map_err(|e| match e {
                Error::UnknownSolType(_) => Error::UnexpectedToken {
                    span,
                    expected: "a Solidity type".to_string(),
                    found: name.to_string(),
                },
                other => other,
            })?
        };
        if self.eat_punct('[') {
            let size = if let Some(Token::Dec(d)) = self.peek() {
                let d = *d;
                let span = self.peek_span();
                self.bump();
                let n: u64 = d.parse().expect("lexer guarantees digits");
                if n == 0 {
                    return Err(Error::ZeroSizedArray(span));
                }
                Some(n)
            } else {
                None
            };
            self.expect_punct(']')?;
            return Ok(match size {
                Some(n) => SolType::FixedArray(Box::new(base), n),
                None => SolType::Array(Box::new(base)),
            });
        }
        Ok(base)
    }

    fn parse_tuple(&mut self) -> Result<Box<[SolArg<'src>]>, Error> {
        self.expect_punct('(')?;
        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::Punct(')'))) {
            args.push(self.parse_sol_arg(false)?);
            while self.eat_punct(',') {
                args.push(self.parse_sol_arg(false)?);
            }
        }
        self.expect_punct(')')?;
        Ok(args.into_boxed_slice())
    }

    fn parse_sol_arg(&mut self, allow_indexed: bool) -> Result<SolArg<'src>, Error> {
        let ty = self.parse_type()?;
        let indexed = allow_indexed && self.eat_ident_text("indexed");
        let name = if let Some(Token::Ident(n)) = self.peek() {
            let n = *n;
            self.bump();
            Some(n)
        } else {
            None
        };
        Ok(SolArg { name, indexed, ty })
    }

    fn parse_function(&mut self) -> Result<SolFunction<'src>, Error> {
        let name = self.expect_ident()?;
        let inputs = self.parse_tuple()?;
        let mutability = match self.peek() {
            Some(Token::Ident("view")) => StateMutability::View,
            Some(Token::Ident("payable")) => StateMutability::Payable,
            Some(Token::Ident("nonpayable")) => StateMutability::NonPayable,
            _ => return Err(self.unexpected("\"view\", \"payable\", or \"nonpayable\"")),
        };
        self.bump();
        self.expect_ident_text("returns")?;
        let outputs = self.parse_tuple()?;
        Ok(SolFunction {
            name,
            inputs,
            outputs,
            mutability,
        })
    }

    fn parse_event(&mut self) -> Result<SolEvent<'src>, Error> {
        let name = self.expect_ident()?;
        self.expect_punct('(')?;
        let mut inputs = Vec::new();
        if !matches!(self.peek(), Some(Token::Punct(')'))) {
            inputs.push(self.parse_sol_arg(true)?);
            while self.eat_punct(',') {
                inputs.push(self.parse_sol_arg(true)?);
            }
        }
        self.expect_punct(')')?;
        Ok(SolEvent {
            name,
            inputs: inputs.into_boxed_slice(),
        })
    }

    fn parse_error(&mut self) -> Result<SolError<'src>, Error> {
        let name = self.expect_ident()?;
        let inputs = self.parse_tuple()?;
        Ok(SolError { name, inputs })
    }
}

fn is_push_n_mnemonic(name: &str) -> bool {
    name != "push0"
        && name
            .strip_prefix("push")
            .and_then(|n| n.parse::<u8>().ok())
            .is_some_and(|n| (1..=32).contains(&n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_main_macro() {
        let src = "#define macro MAIN() = takes(0) returns(0) {\n0x00 0x00 return\n}";
        let root = parse(src).unwrap();
        assert_eq!(root.0.len(), 1);
        let RootSection::Definition(Definition::Macro(m)) = &root.0[0] else {
            panic!("expected macro");
        };
        assert_eq!(m.ident(), "MAIN");
        assert_eq!(m.body.len(), 3);
    }

    #[test]
    fn parses_constant_and_override_target() {
        let src = "#define constant OWNER = FREE_STORAGE_POINTER()";
        let root = parse(src).unwrap();
        let RootSection::Definition(Definition::Constant { name, expr }) = &root.0[0] else {
            panic!("expected constant");
        };
        assert_eq!(name.0, "OWNER");
        assert_eq!(expr.0, ConstExpr::FreeStoragePointer);
    }

    #[test]
    fn parses_label_and_jump() {
        let src = "#define macro M() = takes(0) returns(0) {\ndest: jump jumpdest\n}";
        let root = parse(src).unwrap();
        let RootSection::Definition(Definition::Macro(m)) = &root.0[0] else {
            panic!("expected macro");
        };
        assert!(matches!(m.body[0], MacroStatement::LabelDefinition(("dest", _))));
    }

    #[test]
    fn parses_explicit_push_width() {
        let src = "#define macro M() = takes(0) returns(0) { push2 0x0102 }";
        let root = parse(src).unwrap();
        let RootSection::Definition(Definition::Macro(m)) = &root.0[0] else {
            panic!("expected macro");
        };
        let MacroStatement::Instruction(Instruction::VariablePush(_, Some(width))) = &m.body[0]
        else {
            panic!("expected explicit push");
        };
        assert_eq!(*width, 2);
    }

    #[test]
    fn parses_function_signature() {
        let src =
            "#define function transfer(address,uint256) nonpayable returns (bool)";
        let root = parse(src).unwrap();
        let RootSection::Definition(Definition::Function(f)) = &root.0[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name.0, "transfer");
        assert_eq!(f.inputs.len(), 2);
        assert_eq!(f.outputs.len(), 1);
        assert_eq!(f.mutability, StateMutability::NonPayable);
    }

    #[test]
    fn parses_packed_jumptable() {
        let src = "#define jumptable__packed DISPATCH {\na b c\n}";
        let root = parse(src).unwrap();
        let RootSection::Definition(Definition::Jumptable(jt)) = &root.0[0] else {
            panic!("expected jumptable");
        };
        assert_eq!(jt.size, 1);
        assert_eq!(jt.labels.len(), 3);
    }

    #[test]
    fn rejects_oversized_hex_literal() {
        let src = format!(
            "#define macro M() = takes(0) returns(0) {{ 0x{} }}",
            "ff".repeat(33)
        );
        assert!(parse(&src).is_err());
    }
}
