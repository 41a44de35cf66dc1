use lode::lexer::lex;
use lode::lexer::token::{decode_int, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    lex(source)
        .expect("lex should succeed")
        .into_iter()
        .map(|tok| tok.kind)
        .collect()
}

#[test]
fn lexes_operator_and_keyword_stream() {
    use TokenKind::*;
    let source = "\
;,()[]{} \\
+= -= *= /= %= |= ^= &= <<= >>= &&= ||= \\
=+-*/%!|^&<> \\
<<>>&&||<=>===!= \\
else extern fn for if ns pub return struct type union var variadic break continue
fooBar _ _foo foo_ \\
FooBar \\
\"\" 'a' 0 1 0. .0 0.0 1.1 -1.1 \\
";
    assert_eq!(
        kinds(source),
        vec![
            Semi,
            Comma,
            LParen,
            RParen,
            LBracket,
            RBracket,
            LBrace,
            RBrace,
            PlusEq,
            MinusEq,
            StarEq,
            SlashEq,
            PercentEq,
            PipeEq,
            CaretEq,
            AmpEq,
            ShlEq,
            ShrEq,
            AndAndEq,
            OrOrEq,
            Equals,
            Plus,
            Minus,
            Star,
            Slash,
            Percent,
            Bang,
            Pipe,
            Caret,
            Amp,
            Less,
            Greater,
            Shl,
            Shr,
            AndAnd,
            OrOr,
            LessEq,
            GreaterEq,
            EqEq,
            BangEq,
            Else,
            Extern,
            Fn,
            For,
            If,
            Ns,
            Pub,
            Return,
            Struct,
            Type,
            Union,
            Var,
            Variadic,
            Break,
            Continue,
            Ident("fooBar".into()),
            Ident("_".into()),
            Ident("_foo".into()),
            Ident("foo_".into()),
            TypeName("FooBar".into()),
            Str(Vec::new()),
            Rune('a'),
            Int("0".into()),
            Int("1".into()),
            Float("0.".into()),
            Float(".0".into()),
            Float("0.0".into()),
            Float("1.1".into()),
            Float("-1.1".into()),
            Eof,
        ]
    );
}

#[test]
fn keywords_do_not_match_inside_identifiers() {
    assert_eq!(
        kinds("elseexternfnforifnspubreturnstructtypeunionvarvariadic"),
        vec![
            TokenKind::Ident("elseexternfnforifnspubreturnstructtypeunionvarvariadic".into()),
            TokenKind::Eof,
        ]
    );
}

#[test]
fn repeated_tokenization_is_deterministic() {
    let source = "pub fn main() I32 {\n\treturn (1 + 10*2) * 2\n}\n";
    let first = lex(source).expect("lex should succeed");
    let second = lex(source).expect("lex should succeed");
    assert_eq!(first, second);
}

#[test]
fn records_byte_offsets() {
    let tokens = lex("foo Bar").expect("lex should succeed");
    assert_eq!(tokens[0].offset, 0);
    assert_eq!(tokens[1].offset, 4);
}

#[test]
fn newline_becomes_semicolon_after_expression_enders() {
    use TokenKind::*;
    let enders = [
        (")", RParen),
        ("]", RBracket),
        ("}", RBrace),
        ("foo", Ident("foo".into())),
        ("Foo", TypeName("Foo".into())),
        ("\"s\"", Str(b"s".to_vec())),
        ("'a'", Rune('a')),
        ("0", Int("0".into())),
        ("0.", Float("0.".into())),
    ];
    for (text, kind) in enders {
        let got = kinds(&format!("{}\n", text));
        assert_eq!(got, vec![kind, Semi, Eof], "after {:?}", text);
    }

    // `x++` and `x--` end an expression too.
    assert_eq!(
        kinds("x++\n"),
        vec![Ident("x".into()), PlusPlus, Semi, Eof]
    );
    assert_eq!(
        kinds("x--\n"),
        vec![Ident("x".into()), MinusMinus, Semi, Eof]
    );
}

#[test]
fn newline_is_discarded_after_everything_else() {
    use TokenKind::*;
    let cases = [
        (";", Semi),
        (",", Comma),
        ("(", LParen),
        ("[", LBracket),
        ("{", LBrace),
        ("=", Equals),
        ("+", Plus),
        ("<<", Shl),
        ("&&", AndAnd),
        ("==", EqEq),
        ("else", Else),
        ("return", Return),
        ("var", Var),
        ("break", Break),
    ];
    for (text, kind) in cases {
        let got = kinds(&format!("{}\n", text));
        assert_eq!(got, vec![kind, Eof], "after {:?}", text);
    }
}

#[test]
fn backslash_suppresses_semicolon_insertion() {
    use TokenKind::*;
    assert_eq!(
        kinds("foo \\\nbar\n"),
        vec![Ident("foo".into()), Ident("bar".into()), Semi, Eof]
    );
}

#[test]
fn comments_and_blank_lines_do_not_insert_semicolons() {
    use TokenKind::*;
    assert_eq!(
        kinds("// a comment\n\nfoo\n// trailing\n"),
        vec![Ident("foo".into()), Semi, Eof]
    );
}

#[test]
fn decodes_string_escapes() {
    let toks = lex(r#""\e\n\r\t\\\"\'""#).expect("lex should succeed");
    assert_eq!(
        toks[0].kind,
        TokenKind::Str(vec![0x1b, b'\n', b'\r', b'\t', b'\\', b'"', b'\''])
    );

    let toks = lex(r#""\x41\101""#).expect("lex should succeed");
    assert_eq!(toks[0].kind, TokenKind::Str(b"AA".to_vec()));

    let toks = lex(r#""é""#).expect("lex should succeed");
    assert_eq!(toks[0].kind, TokenKind::Str(vec![0xc3, 0xa9]));

    let toks = lex(r#""\U0001f600""#).expect("lex should succeed");
    assert_eq!(
        toks[0].kind,
        TokenKind::Str(vec![0xf0, 0x9f, 0x98, 0x80])
    );
}

#[test]
fn decodes_rune_escapes() {
    assert_eq!(kinds("'\\n'")[0], TokenKind::Rune('\n'));
    assert_eq!(kinds("'\\''")[0], TokenKind::Rune('\''));
    assert_eq!(kinds("'\\x41'")[0], TokenKind::Rune('A'));
    assert_eq!(kinds("'é'")[0], TokenKind::Rune('é'));
}

#[test]
fn rejects_invalid_escapes() {
    let err = lex(r#""\q""#).expect_err("escape should be rejected");
    assert!(err.message.contains("Invalid escape sequence"));

    let err = lex(r#""unterminated"#).expect_err("string should be rejected");
    assert!(err.message.contains("Unterminated string literal"));
}

#[test]
fn unknown_characters_become_invalid_tokens() {
    assert_eq!(kinds("#"), vec![TokenKind::Invalid('#'), TokenKind::Eof]);
}

#[test]
fn lexes_integer_bases_and_separators() {
    use TokenKind::*;
    assert_eq!(
        kinds("0x1F 0b1_01 017 1_000"),
        vec![
            Int("0x1F".into()),
            Int("0b1_01".into()),
            Int("017".into()),
            Int("1_000".into()),
            Eof,
        ]
    );

    assert_eq!(decode_int("0x1F"), Some(31));
    assert_eq!(decode_int("0b1_01"), Some(5));
    assert_eq!(decode_int("017"), Some(15));
    assert_eq!(decode_int("1_000"), Some(1000));
    assert_eq!(decode_int("-42"), Some(-42));
    assert_eq!(decode_int("+7"), Some(7));
    assert_eq!(decode_int("0"), Some(0));
}

#[test]
fn sign_binds_to_numeric_literals() {
    use TokenKind::*;
    // Directly before digits a sign is part of the literal; otherwise it
    // stays an operator.
    assert_eq!(
        kinds("a - 1"),
        vec![Ident("a".into()), Minus, Int("1".into()), Eof]
    );
    assert_eq!(kinds("-1"), vec![Int("-1".into()), Eof]);
    assert_eq!(kinds("-.5"), vec![Float("-.5".into()), Eof]);
}
