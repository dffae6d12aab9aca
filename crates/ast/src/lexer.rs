use crate::Spanned;
use chumsky::{
    error::Rich,
    extra,
    primitive::{any, choice, just, none_of, one_of},
    text::{self, ascii::keyword},
    IterParser, Parser,
};
use std::fmt;

/// Lex the given source code string into tokens.
pub(crate) fn lex(src: &str) -> Result<Vec<Spanned<Token<'_>>>, Vec<Rich<'_, char>>> {
    lexer().parse(src).into_result()
}

/// Lexer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    Keyword(&'src str),
    Ident(&'src str),
    Punct(char),
    Dec(&'src str),
    Hex(&'src str),
    String(String),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Keyword(s) | Token::Ident(s) | Token::Dec(s) | Token::Hex(s) => {
                write!(f, "{s}")
            }
            Token::String(s) => write!(f, "{s}"),
            Token::Punct(c) => write!(f, "{c}"),
        }
    }
}

fn lexer<'src>() -> impl Parser<'src, &'src str, Vec<Spanned<Token<'src>>>, extra::Err<Rich<'src, char>>>
{
    let validate_end = any()
        .or_not()
        .rewind()
        .validate(|c: Option<char>, e, emitter| {
            if let Some(c) = c {
                if !(c.is_whitespace() || "(){}[]<>:=,/\"".contains(c)) {
                    emitter.emit(Rich::custom(e.span(), "invalid token"));
                }
            }
        });

    let directive = just("#")
        .ignore_then(choice((keyword("define"), keyword("include"))))
        .then_ignore(validate_end)
        .map(Token::Keyword);

    let define_keyword = choice((
        keyword("macro"),
        keyword("fn"),
        keyword("constant"),
        keyword("table"),
        keyword("jumptable"),
        keyword("function"),
        keyword("event"),
        keyword("error"),
    ))
    .then_ignore(validate_end)
    .map(Token::Keyword);

    let ident = text::ident().then_ignore(validate_end).map(Token::Ident);

    let punct = one_of("(){}[]<>:=,").map(Token::Punct);

    let hex = just("0x")
        .ignore_then(text::digits(16))
        .to_slice()
        .then_ignore(validate_end)
        .map(Token::Hex);

    let dec = text::digits(10)
        .then_ignore(validate_end)
        .to_slice()
        .map(Token::Dec);

    let string = none_of("\\\"")
        .or(just('\\').ignore_then(just('"')))
        .repeated()
        .to_slice()
        .map(|s: &str| Token::String(s.to_string().replace("\\\"", "\"")))
        .delimited_by(just('"'), just('"'));

    let token = choice((directive, define_keyword, ident, punct, hex, dec, string));

    let single_line_comment = just("//").then(any().and_is(just('\n').not()).repeated()).padded();
    let multi_line_comment = just("/*")
        .then(any().and_is(just("*/").not()).repeated())
        .then_ignore(just("*/"))
        .padded();
    let comment = single_line_comment.or(multi_line_comment);

    token
        .map_with(|tok, ex| (tok, ex.span()))
        .padded_by(comment.repeated())
        .padded()
        .repeated()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chumsky::span::SimpleSpan;

    macro_rules! assert_ok {
        ($input:expr, $($expected:tt)*) => {
            assert_eq!(lexer().parse($input).into_result(), Ok(vec![$($expected)*]));
        };
    }

    #[test]
    fn lex_directive_and_keyword() {
        assert_ok!(
            "#define macro",
            (Token::Keyword("define"), SimpleSpan::new(0, 7)),
            (Token::Keyword("macro"), SimpleSpan::new(8, 13))
        );
    }

    #[test]
    fn lex_ident_and_punct() {
        assert_ok!(
            "MAIN()",
            (Token::Ident("MAIN"), SimpleSpan::new(0, 4)),
            (Token::Punct('('), SimpleSpan::new(4, 5)),
            (Token::Punct(')'), SimpleSpan::new(5, 6))
        );
    }

    #[test]
    fn lex_hex_and_dec() {
        assert_ok!("0x1234", (Token::Hex("0x1234"), SimpleSpan::new(0, 6)));
        assert_ok!("32", (Token::Dec("32"), SimpleSpan::new(0, 2)));
    }

    #[test]
    fn lex_string_literal() {
        assert_ok!(
            "\"a.huff\"",
            (Token::String("a.huff".to_string()), SimpleSpan::new(0, 8))
        );
    }

    #[test]
    fn lex_strips_comments() {
        assert_ok!(
            "add // adds\nsub",
            (Token::Ident("add"), SimpleSpan::new(0, 3)),
            (Token::Ident("sub"), SimpleSpan::new(12, 15))
        );
    }
}
