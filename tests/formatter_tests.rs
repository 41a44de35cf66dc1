use lode::formatter::format_program;
use lode::parser::parse;

fn format(source: &str) -> String {
    let program = parse(source).expect("parse should succeed");
    format_program(&program)
}

#[test]
fn formatting_is_a_fixed_point() {
    let source = r#"
type Point struct { x, y I32; z I64 }
type Bytes = [U8]
type Handle I64

extern var errno I32
var scratch [I8 16]

variadic fn printf(fmt [I8]) I32
fn puts(s [I8])

ns counters {
  var hits I64
  fn bump() {
    hits += 1
    return
  }
}

pub fn main() I32 {
    var p Point
    var q [Point]
    q = &p
    q.x = 7
    p.y = -(3)
    p.z = cast(p.x, I64)

    var i I32
    for i = 0; i < 10 && p.x != 0; i++ {
        if i == 5 {
            break
        } else if i > 7 {
            continue
        } else {
            counters.bump()
        }
    }

    for !(i == 0) {
        i -= 1
    }

    _ = printf("%d \n", 'x')
    puts("done")
    return 0
}
"#;

    let once = format(source);
    let twice = format(&once);
    assert_eq!(once, twice);
}

#[test]
fn binary_expressions_are_parenthesized() {
    let out = format("pub fn main() I32 {\n_ = a + b * c\nreturn 0\n}\n");
    assert!(out.contains("_ = (a + (b * c))"), "got:\n{}", out);
}

#[test]
fn statements_and_types_print_in_source_form() {
    let out = format(concat!(
        "type Pair struct { a I32; b I64 }\n",
        "fn f(x I32) [I8]\n",
        "pub fn main() I32 {\n",
        "var p [Pair 4]\n",
        "if 1 { return 0 } else { return 1 }\n",
        "}\n",
    ));

    assert!(out.contains("type Pair struct { a I32; b I64 }"), "got:\n{}", out);
    assert!(out.contains("fn f(I32) [I8]"), "got:\n{}", out);
    assert!(out.contains("var p [Pair 4]"), "got:\n{}", out);
    assert!(out.contains("} else {"), "got:\n{}", out);
}

#[test]
fn for_shapes_survive_a_round_trip() {
    let shapes = [
        "for { break }",
        "for x { break }",
        "for var i I32; i; i += 1 { break }",
        "for ;; { break }",
    ];
    for shape in shapes {
        let source = format!("pub fn main() I32 {{\n{}\nreturn 0\n}}\n", shape);
        let once = format(&source);
        assert_eq!(once, format(&once), "shape {:?}", shape);
    }
}

#[test]
fn string_and_rune_escapes_reformat_losslessly() {
    let source = "pub fn main() I32 {\nputs(\"a\\n\\e\\\"\\x7f\\xff\")\n_ = '\\n'\nreturn 0\n}\n";
    let once = format(source);
    let twice = format(&once);
    assert_eq!(once, twice);
    assert!(once.contains(r#""a\n\e\"\x7f\xff""#), "got:\n{}", once);
    assert!(once.contains(r"'\n'"), "got:\n{}", once);
}

#[test]
fn declarations_keep_their_declaration_syntax() {
    let out = format("variadic fn printf(fmt [I8]) I32\nfn exit(code I32)\n");
    assert_eq!(out, "variadic fn printf([I8]) I32\nfn exit(I32)\n");
}
