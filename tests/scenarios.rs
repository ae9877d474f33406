use std::path::Path;

use hwgen::{compile, default_output_path, Failure, Options, Output, Session};

fn compile_ok(text: &str) -> Output {
    match compile("test.hw", text, &Options::default()) {
        Ok(output) => output,
        Err(failure) => panic!("{}\n{}", failure, text),
    }
}

fn compile_errs(text: &str) -> Vec<String> {
    match compile("test.hw", text, &Options::default()) {
        Err(Failure::Errors(msgs)) => msgs,
        other => panic!("expected errors, got {:?}", other.map(|o| o.text)),
    }
}

fn lines(text: &str) -> Vec<&str> {
    text.lines().map(str::trim).collect()
}

#[test]
fn test_bitfield_register() {
    let output = compile_ok("package hw\ntype default Reg uint32\ntype T {\n\tflag [0]\n\tfield [7:1]\n}\n");
    let lines = lines(&output.text);
    for expected in vec![
        "pub struct T_reg(pub u8);",
        "pub flag: bool,",
        "pub field: u8,",
        "pub const T_flag: u8 = 1 << 0;",
        "pub const T_field_shift: u32 = 1;",
        "pub const T_field_mask: u8 = 0x7f;",
    ] {
        assert!(lines.contains(&expected), "missing {}:\n{}", expected, output.text);
    }
    assert_eq!(output.package, "hw");
}

#[test]
fn test_struct_gap() {
    for text in vec![
        "package hw\ntype default Reg uint32\ntype S struct {\n\ta uint8\n\t... 1\n\tb uint32\n}\n",
        "package hw\ntype S struct {\n\ta uint8\n\t... 4\n\tb uint32\n}\n",
    ] {
        let output = compile_ok(text);
        let lines = lines(&output.text);
        let a = lines.iter().position(|l| *l == "pub a: u8,").unwrap();
        assert_eq!(lines[a + 1], "_pad0: [u8; 3],", "{}", output.text);
        assert_eq!(lines[a + 2], "pub b: u32,", "{}", output.text);

        let s = output.dump["types"]["types"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "S")
            .unwrap();
        assert_eq!(s["size"], 64);
        assert_eq!(s["fields"][1]["offset"], 32);
    }
}

#[test]
fn test_self_reference_is_a_cycle() {
    let msgs = compile_errs("package hw\ntype T struct {\n\ta uint8\n\tt T\n}\n");
    assert_eq!(msgs, vec!["test.hw:2:6: cycle in type reference T"]);
}

#[test]
fn test_cycle_variants() {
    for (text, expected) in vec![
        (
            "type A struct {\n\tb B\n}\ntype B struct {\n\ta A\n}\n",
            vec![
                "test.hw:2:6: cycle in type reference A",
                "test.hw:5:6: cycle in type reference B",
            ],
        ),
        (
            "type A struct {\n\tb B\n}\ntype B struct {\n\tc C\n}\ntype C struct {\n\ta A\n}\n",
            vec![
                "test.hw:2:6: cycle in type reference A",
                "test.hw:5:6: cycle in type reference B",
                "test.hw:8:6: cycle in type reference C",
            ],
        ),
        (
            "type R {\n\tr R\n}\n",
            vec!["test.hw:2:6: cycle in type reference R"],
        ),
    ] {
        assert_eq!(compile_errs(&format!("package hw\n{}", text)), expected, "{}", text);
    }
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let output = compile_ok(
        "package hw\ntype D struct {\n\tl L\n\tr R\n}\ntype L struct {\n\tb B\n}\ntype R struct {\n\tb B\n}\ntype B struct {\n\tx uint8\n}\n",
    );
    assert!(output.text.contains("pub struct D {"), "{}", output.text);
}

#[test]
fn test_bailout() {
    let text: String = std::iter::once("package hw\n".to_string())
        .chain((0..20).map(|i| format!("const C{} = = 1\n", i)))
        .collect();
    let msgs = compile_errs(&text);
    assert_eq!(msgs.len(), 12, "{:?}", msgs);
    assert_eq!(msgs[0], "test.hw:2:12: expected expression, found '='");
    assert_eq!(msgs[11], "too many errors");
}

#[test]
fn test_error_limit_option() {
    let text = "package hw\nconst A = = 1\nconst B = = 1\nconst C = = 1\n";
    let options = Options {
        error_limit: 1,
        ..Options::default()
    };
    match compile("test.hw", text, &options) {
        Err(Failure::Errors(msgs)) => assert_eq!(msgs.len(), 3, "{:?}", msgs),
        other => panic!("{:?}", other.map(|o| o.text)),
    }
}

#[test]
fn test_errors_on_one_line_collapse() {
    let msgs = compile_errs("package hw\nconst A, B = X, Y\n");
    assert_eq!(msgs.len(), 1, "{:?}", msgs);
    assert!(msgs[0].starts_with("test.hw:2:14: "), "{:?}", msgs);
}

#[test]
fn test_unsupported_construct_is_internal() {
    match compile("test.hw", "package hw\ntype T (8)\n", &Options::default()) {
        Err(Failure::Internal(msg)) => {
            assert!(msg.contains("internal error: unsupported construct"), "{}", msg)
        }
        other => panic!("{:?}", other.map(|o| o.text)),
    }
}

#[test]
fn test_no_output_after_errors() {
    let msgs = compile_errs("package hw\ntype S struct {\n\ta uint8\n\t... 1\n\tb Missing\n}\n");
    assert_eq!(msgs.len(), 1, "{:?}", msgs);
}

#[test]
fn test_session_phases() {
    let mut session = Session::new(
        "test.hw",
        "package hw\nconst N = 4\ntype S struct {\n\tregs [N]uint32\n}\n",
        &Options::default(),
    )
    .unwrap();
    let file = session.parse().unwrap();
    let consts = session.evaluate_constants(&file).unwrap();
    assert_eq!(consts.len(), 1);
    let table = session.size_types(&file, &consts).unwrap();
    assert_eq!(table.get("S").unwrap().size, 128);
    session.check_cycles(&table).unwrap();
    let text = session.generate(&file, &table).unwrap();
    assert!(text.starts_with("// autogenerated: do not edit!\n// generated from test.hw\n"));
    assert!(text.contains("pub regs: [u32; 4],"), "{}", text);
}

#[test]
fn test_default_output_path() {
    for (input, expected) in vec![
        ("regs.hw", "regs_hwgen.rs"),
        ("dev/uart.hw", "dev/uart_hwgen.rs"),
        ("noext", "noext_hwgen.rs"),
    ] {
        assert_eq!(default_output_path(Path::new(input)), Path::new(expected));
    }
}
