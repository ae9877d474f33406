#[cfg(test)]
mod tests {
    use crate::compiler::ast::*;
    use crate::compiler::{ErrorList, Halt, Lexer, SourceMap, StringTable};

    use super::super::parse;

    fn parse_text(text: &str, st: &StringTable) -> (Result<File, Halt>, Vec<String>) {
        let mut sm = SourceMap::new();
        sm.add_string(text, "/test".into()).unwrap();
        let src = sm.get(0).unwrap().read();
        let end = src.high();
        let lexed = Lexer::new(src, st).tokenize();
        assert!(lexed.errors.is_empty(), "{:?}", lexed.errors);

        let mut errors = ErrorList::new(10);
        let file = parse(&lexed, end, &sm, st, &mut errors, false);
        let msgs = errors.messages(&sm, st);
        (file, msgs)
    }

    fn parse_ok(text: &str, st: &StringTable) -> File {
        let (file, msgs) = parse_text(text, st);
        assert!(msgs.is_empty(), "{:?}", msgs);
        file.unwrap()
    }

    fn name(st: &StringTable, id: &Ident) -> String {
        st.get(id.name).unwrap()
    }

    fn only_type(file: &File) -> &TypeSpec {
        let specs: Vec<_> = file.type_specs().collect();
        assert_eq!(specs.len(), 1);
        specs[0].0
    }

    #[test]
    fn test_package_clause() {
        let st = StringTable::new();
        let file = parse_ok("package hw\n", &st);
        assert_eq!(name(&st, &file.package), "hw");
        assert!(file.decls.is_empty());
    }

    #[test]
    fn test_bad_package_clause() {
        for (text, expected) in vec![
            ("type X uint8\n", "/test:1:1: expected 'package', found 'type'"),
            ("package _\n", "/test:1:9: invalid package name _"),
            ("package 5\n", "/test:1:9: expected identifier, found literal 5"),
        ] {
            let st = StringTable::new();
            let (file, msgs) = parse_text(text, &st);
            assert_eq!(file.err(), Some(Halt::Errors), "{}", text);
            assert_eq!(msgs, vec![expected.to_string()], "{}", text);
        }
    }

    #[test]
    fn test_const_decls() {
        let st = StringTable::new();
        let file = parse_ok(
            "package hw\nconst A = 1\nconst (\n\tB, C = 2, 3\n\tD\n)\n",
            &st,
        );

        let consts: Vec<_> = file.const_specs().collect();
        assert_eq!(consts.len(), 3);
        assert_eq!(consts[0].names.len(), 1);
        assert_eq!(consts[1].names.len(), 2);
        assert_eq!(consts[1].values.len(), 2);
        assert!(consts[2].values.is_empty());

        let c = st.find("C").unwrap();
        let obj = file.scope.lookup(c).unwrap();
        assert_eq!(obj.kind, ObjKind::Const);
        assert_eq!(
            obj.decl,
            DeclRef {
                decl: 1,
                spec: 0,
                index: 1
            }
        );
    }

    #[test]
    fn test_expression_precedence() {
        let st = StringTable::new();
        let file = parse_ok("package hw\nconst A = 1 + 2 * 3 << 1 | 4\n", &st);
        let spec = file.const_specs().next().unwrap();

        // (1 + ((2 * 3) << 1)) | 4
        match &spec.values[0] {
            Expr::Binary(l, BinaryOp::Or, r, _) => {
                assert!(matches!(**r, Expr::Int(..)));
                match &**l {
                    Expr::Binary(one, BinaryOp::Add, shl, _) => {
                        assert!(matches!(**one, Expr::Int(..)));
                        match &**shl {
                            Expr::Binary(mul, BinaryOp::Shl, _, _) => {
                                assert!(matches!(**mul, Expr::Binary(_, BinaryOp::Mul, _, _)))
                            }
                            e => panic!("unexpected {:?}", e),
                        }
                    }
                    e => panic!("unexpected {:?}", e),
                }
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn test_unary_and_paren() {
        let st = StringTable::new();
        let file = parse_ok("package hw\nconst A = -(1 + 2)\n", &st);
        let spec = file.const_specs().next().unwrap();
        match &spec.values[0] {
            Expr::Unary(UnaryOp::Negate, inner, _) => {
                assert!(matches!(**inner, Expr::Paren(..)))
            }
            e => panic!("unexpected {:?}", e),
        }
    }

    #[test]
    fn test_default_decl() {
        for text in vec![
            "package hw\ntype default Reg uint32\n",
            "package hw\ntype default Reg (32)\n",
        ] {
            let st = StringTable::new();
            let file = parse_ok(text, &st);
            let spec = only_type(&file);
            assert!(spec.is_default);
            assert_eq!(name(&st, &spec.name), "Reg");
        }
    }

    #[test]
    fn test_bitfield_array_lengths() {
        let st = StringTable::new();
        let file = parse_ok(
            "package hw\ntype T {\n\ta [3]\n\tb [7:4]\n\tc [2]uint8\n}\n",
            &st,
        );
        let fields = match &only_type(&file).ty {
            TypeExpr::Struct {
                bitfield: true,
                fields,
                ..
            } => fields,
            ty => panic!("unexpected {:?}", ty),
        };
        assert_eq!(fields.len(), 3);

        let lens: Vec<_> = fields
            .iter()
            .map(|f| match f {
                FieldDecl::Field {
                    ty: Some(TypeExpr::Array { len, .. }),
                    ..
                } => len.clone(),
                f => panic!("unexpected {:?}", f),
            })
            .collect();
        assert!(matches!(lens[0], Some(ArrayLen::BitPosition(_))));
        assert!(matches!(lens[1], Some(ArrayLen::BitRange { .. })));
        assert!(matches!(lens[2], Some(ArrayLen::BitPosition(_))));
    }

    #[test]
    fn test_struct_array_lengths() {
        let st = StringTable::new();
        let file = parse_ok(
            "package hw\ntype T struct {\n\ta [4]uint8\n\tb {\n\t\tx [1]\n\t}\n\tc []\n}\n",
            &st,
        );
        let fields = match &only_type(&file).ty {
            TypeExpr::Struct {
                bitfield: false,
                fields,
                ..
            } => fields,
            ty => panic!("unexpected {:?}", ty),
        };

        match &fields[0] {
            FieldDecl::Field {
                ty:
                    Some(TypeExpr::Array {
                        len: Some(ArrayLen::Count(_)),
                        elem: Some(_),
                        ..
                    }),
                ..
            } => (),
            f => panic!("unexpected {:?}", f),
        }

        // The bitfield context applies to fields directly inside the braces.
        match &fields[1] {
            FieldDecl::Field {
                ty: Some(TypeExpr::Struct {
                    bitfield: true,
                    fields: inner,
                    ..
                }),
                ..
            } => assert!(matches!(
                inner[0],
                FieldDecl::Field {
                    ty: Some(TypeExpr::Array {
                        len: Some(ArrayLen::BitPosition(_)),
                        ..
                    }),
                    ..
                }
            )),
            f => panic!("unexpected {:?}", f),
        }

        match &fields[2] {
            FieldDecl::Field {
                ty: Some(TypeExpr::Array {
                    len: None,
                    elem: None,
                    ..
                }),
                ..
            } => (),
            f => panic!("unexpected {:?}", f),
        }
    }

    #[test]
    fn test_fields_tags_and_offsets() {
        let st = StringTable::new();
        let file = parse_ok(
            "package hw\n// Control block.\nfunc CTRL struct {\n\t// Enable bit.\n\ten, run Reg /rw/volatile\n\t... 0x10 Reg\n\tstatus\n}\ntype Reg uint32\n",
            &st,
        );
        let (spec, keyword) = file.type_specs().next().unwrap();
        assert_eq!(keyword, Keyword::Func);
        assert_eq!(
            st.get(file.decls[0].doc.unwrap()).unwrap().trim(),
            "Control block."
        );

        let fields = match &spec.ty {
            TypeExpr::Struct { fields, .. } => fields,
            ty => panic!("unexpected {:?}", ty),
        };
        assert_eq!(fields.len(), 3);
        match &fields[0] {
            FieldDecl::Field {
                doc,
                names,
                tags,
                ty: Some(TypeExpr::Name(_)),
                ..
            } => {
                assert_eq!(st.get(doc.unwrap()).unwrap().trim(), "Enable bit.");
                assert_eq!(names.len(), 2);
                let tags: Vec<_> = tags.iter().map(|t| name(&st, t)).collect();
                assert_eq!(tags, vec!["rw", "volatile"]);
            }
            f => panic!("unexpected {:?}", f),
        }
        assert!(matches!(fields[1], FieldDecl::Offset { unit: Some(_), .. }));
        assert!(matches!(fields[2], FieldDecl::Field { ty: None, .. }));
    }

    #[test]
    fn test_spec_docs() {
        for (text, expected) in vec![
            ("// One.\ntype A uint8\n", vec![Some("One.")]),
            ("// One.\nfunc A {\n\ten\n}\n", vec![Some("One.")]),
            ("type A uint8\n", vec![None]),
            (
                "// Group.\ntype (\n\t// First.\n\tA uint8\n\tB uint8\n)\n",
                vec![Some("First."), None],
            ),
        ] {
            let st = StringTable::new();
            let file = parse_ok(&format!("package hw\n{}", text), &st);
            let docs: Vec<_> = file
                .type_specs()
                .map(|(spec, _)| spec.doc.map(|d| st.get(d).unwrap().trim().to_string()))
                .collect();
            let expected: Vec<_> = expected.into_iter().map(|d| d.map(String::from)).collect();
            assert_eq!(docs, expected, "{}", text);
        }
    }

    #[test]
    fn test_semicolon_before_closing_brace() {
        let st = StringTable::new();
        let file = parse_ok("package hw; type T { a; b [3:1] }; const (A = 1)\n", &st);
        assert_eq!(file.decls.len(), 2);
    }

    #[test]
    fn test_redeclared() {
        let st = StringTable::new();
        let (file, msgs) = parse_text("package hw\nconst A = 1\ntype A uint8\n", &st);
        assert!(file.is_ok());
        assert_eq!(
            msgs,
            vec!["/test:3:6: A redeclared in this block\n\tprevious declaration at /test:2:7"]
        );
    }

    #[test]
    fn test_redeclared_field() {
        let st = StringTable::new();
        let (_, msgs) = parse_text("package hw\ntype T {\n\ta\n\tb, a\n\t_, _\n}\n", &st);
        assert_eq!(
            msgs,
            vec!["/test:4:5: a redeclared in this block\n\tprevious declaration at /test:3:2"]
        );
    }

    #[test]
    fn test_blank_is_never_declared() {
        let st = StringTable::new();
        let file = parse_ok("package hw\ntype _ uint8\ntype _ uint16\n", &st);
        assert!(file.scope.lookup(st.find("_").unwrap()).is_none());
    }

    #[test]
    fn test_undefined() {
        for (text, expected) in vec![
            ("package hw\ntype T Missing\n", vec!["/test:2:8: undefined: Missing"]),
            ("package hw\nconst A = B + 1\n", vec!["/test:2:11: undefined: B"]),
            ("package hw\ntype T {\n\t... 4 Unit\n}\n", vec!["/test:3:8: undefined: Unit"]),
            ("package hw\ntype T uint12\n", vec![]),
            ("package hw\ntype T U\ntype U uint8\n", vec![]),
            ("package hw\ntype T T\n", vec![]),
        ] {
            let st = StringTable::new();
            let (_, msgs) = parse_text(text, &st);
            assert_eq!(msgs, expected, "{}", text);
        }
    }

    #[test]
    fn test_recovery_continues_at_next_decl() {
        let st = StringTable::new();
        let (file, msgs) = parse_text(
            "package hw\nconst A = = 1\ntype T uint8\nconst B = )\ntype U uint8\n",
            &st,
        );
        assert_eq!(
            msgs,
            vec![
                "/test:2:11: expected expression, found '='",
                "/test:4:11: expected expression, found ')'",
            ]
        );
        let file = file.unwrap();
        assert!(file.scope.lookup(st.find("T").unwrap()).is_some());
        assert!(file.scope.lookup(st.find("U").unwrap()).is_some());
    }

    #[test]
    fn test_recovery_continues_at_next_field() {
        let st = StringTable::new();
        let (_, msgs) = parse_text(
            "package hw\ntype T {\n\ta / 3\n\tb [1]\n\tc / 5\n}\n",
            &st,
        );
        assert_eq!(msgs.len(), 2, "{:?}", msgs);
        assert!(msgs[0].starts_with("/test:3:6: expected attribute name after '/'"));
        assert!(msgs[1].starts_with("/test:5:6: expected attribute name after '/'"));
    }

    #[test]
    fn test_error_limit_halts() {
        let st = StringTable::new();
        let text: String = std::iter::once("package hw\n".to_string())
            .chain((0..20).map(|i| format!("type T{} Missing{}\n", i, i)))
            .collect();
        let (file, msgs) = parse_text(&text, &st);
        assert_eq!(file.err(), Some(Halt::TooManyErrors));
        assert_eq!(msgs.len(), 11);
    }
}
