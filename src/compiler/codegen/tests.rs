#[cfg(test)]
mod tests {
    use crate::compiler::eval::evaluate_constants;
    use crate::compiler::layout::{check_cycles, size_types, TypeTable};
    use crate::compiler::parser::parse;
    use crate::compiler::{ErrorList, Lexer, SourceMap, StringTable};

    use std::collections::HashMap;

    use proc_macro2::{TokenStream, TokenTree};
    use quote::ToTokens;
    use syn::{Expr, ImplItem, Item, Lit, Type};

    use super::super::names::{const_ident, hex, ident, mask, reg_ident, words};
    use super::super::runtime::{get1, get_range, get_words, set1, set_range, set_words};
    use super::super::{access_plan, generate, module_tokens, Access, Backing};

    fn table(text: &str) -> TypeTable {
        let st = StringTable::new();
        let mut sm = SourceMap::new();
        sm.add_string(text, "/test".into()).unwrap();
        let src = sm.get(0).unwrap().read();
        let end = src.high();
        let lexed = Lexer::new(src, &st).tokenize();

        let mut errors = ErrorList::new(10);
        let file = parse(&lexed, end, &sm, &st, &mut errors, false).unwrap();
        let consts = evaluate_constants(&file, &sm, &st, &mut errors).unwrap();
        let table = size_types(&file, &consts, &sm, &st, &mut errors).unwrap();
        check_cycles(&table, &sm, &mut errors).unwrap();
        assert!(errors.is_empty(), "{:?}", errors.messages(&sm, &st));
        table
    }

    fn generated(text: &str) -> String {
        let table = table(&format!("package hw\n{}", text));
        generate(&table, "hw", "test.hw").unwrap()
    }

    fn lines(code: &str) -> Vec<&str> {
        code.lines().map(str::trim).collect()
    }

    fn assert_lines(code: &str, expected: &[&str]) {
        let lines = lines(code);
        for line in expected {
            assert!(lines.contains(line), "missing `{}` in:\n{}", line, code);
        }
    }

    #[test]
    fn test_header() {
        let code = generated("type T uint8\n");
        let lines = lines(&code);
        assert_eq!(lines[0], "// autogenerated: do not edit!");
        assert_eq!(lines[1], "// generated from test.hw");
        assert!(lines.contains(&"pub mod hw {"), "{}", code);
        assert!(lines.contains(&"pub type T = u8;"), "{}", code);
    }

    #[test]
    fn test_bitfield_items() {
        let code = generated("type default Reg uint32\ntype T {\n\tflag\n\tfield uint7\n}\n");
        assert_lines(
            &code,
            &[
                "pub type Reg = u32;",
                "pub struct T {",
                "pub flag: bool,",
                "pub field: u8,",
                "#[repr(transparent)]",
                "pub struct T_reg(pub u8);",
                "pub const T_flag: u8 = 1 << 0;",
                "pub const T_field_shift: u32 = 1;",
                "pub const T_field_mask: u8 = 0x7f;",
            ],
        );
        // Neither declared with func nor used by another type.
        assert!(!code.contains("fn get"), "{}", code);
    }

    #[test]
    fn test_func_register_accessors() {
        let code = generated("type default Reg uint32\nfunc Ctl {\n\ten\n\tmode [3:1]\n}\n");
        assert_lines(
            &code,
            &[
                "pub struct Ctl_reg(pub Reg);",
                "pub const Ctl_en: Reg = 1 << 0;",
                "pub const Ctl_mode_mask: Reg = 0x7;",
                "pub fn get(&self) -> Ctl {",
                "pub fn set(&mut self, v: Ctl) {",
            ],
        );
        assert!(code.contains("read_volatile"), "{}", code);
        assert!(code.contains("write_volatile"), "{}", code);
        assert!(!code.contains("fn get_range"), "{}", code);
    }

    #[test]
    fn test_wide_bitfield_uses_words() {
        let code = generated(
            "type W {\n\tlo [31:0]\n\tmid [79:32]\n\tflag [95]\n}\ntype S struct {\n\tw W\n}\n",
        );
        assert_lines(
            &code,
            &[
                "pub struct W_reg(pub [u32; 3]);",
                "pub lo: u32,",
                "pub mid: u64,",
                "pub flag: bool,",
                "pub const W_mid_lo: u32 = 32;",
                "pub const W_mid_hi: u32 = 79;",
                "pub const W_mid_size: u32 = 48;",
                "pub w: W_reg,",
            ],
        );
        assert!(code.contains("fn get(&self) -> W"), "{}", code);
        assert!(code.contains("pub fn get_range("), "{}", code);
        assert!(code.contains("pub fn set_words("), "{}", code);
    }

    #[test]
    fn test_struct_byte_padding() {
        let code = generated("type default Reg uint32\ntype S struct {\n\ta uint8\n\t... 1\n\tb uint32\n}\n");
        assert_lines(
            &code,
            &["#[repr(C)]", "pub struct S {", "pub a: u8,", "_pad0: [u8; 3],", "pub b: u32,"],
        );
        assert!(code.contains("size_of"), "{}", code);
        assert!(code.contains("== 8"), "{}", code);
    }

    #[test]
    fn test_struct_register_padding() {
        let code = generated(
            "type default Reg uint32\ntype S struct {\n\ta\n\t... 3\n\tb\n\t... 6\n}\n",
        );
        assert_lines(
            &code,
            &["pub a: Reg,", "_pad0: [Reg; 2],", "pub b: Reg,", "_pad1: [Reg; 2],"],
        );
    }

    #[test]
    fn test_struct_repr() {
        for (text, expected) in vec![
            ("type S struct {\n\ta, b uint32\n}\n", "#[repr(C)]"),
            ("type S struct {\n\ta uint8\n\tb uint32\n}\n", "#[repr(C, packed)]"),
            ("type S struct {\n\ta uint32\n\tb uint8\n}\n", "#[repr(C, packed)]"),
            ("type S struct {\n\ta [3]uint8\n}\n", "#[repr(C)]"),
        ] {
            let code = generated(text);
            assert_lines(&code, &[expected]);
        }
    }

    #[test]
    fn test_struct_arrays_and_aliases() {
        let code = generated(
            "type Bank [4]struct {\n\ta, b uint16\n}\ntype Ctl [8]{\n\ten\n}\ntype Ctls [2]Ctl\ntype Words [3]uint32\ntype Odd [12]\n",
        );
        assert_lines(
            &code,
            &[
                "pub struct Bank_elem {",
                "pub type Bank = [Bank_elem; 4];",
                "pub type Ctls = [Ctl_reg; 2];",
                "pub type Words = [u32; 3];",
                "pub type Odd = u16;",
            ],
        );
        // Ctl is the element of another type.
        assert!(code.contains("fn get(&self) -> Ctl"), "{}", code);
    }

    #[test]
    fn test_byte_sized_aliases_keep_their_width() {
        for (text, expected) in vec![
            (
                "type u24 uint24\ntype S struct {\n\ta u24\n\tb uint8\n}\n",
                vec!["pub type u24 = [u8; 3];", "size_of::<S>() == 4"],
            ),
            (
                "type default Reg (32)\ntype X [48]\ntype S struct {\n\tx X\n}\n",
                vec!["pub type X = [u8; 6];", "size_of::<S>() == 6"],
            ),
            (
                "type Odd [12]\ntype Wide [128]\n",
                vec!["pub type Odd = u16;", "pub type Wide = u128;"],
            ),
        ] {
            let code = generated(text);
            for e in expected {
                assert!(code.contains(e), "missing `{}` in:\n{}", e, code);
            }
        }
    }

    /// The items of a generated module.
    struct Module {
        items: Vec<Item>,
        aliases: HashMap<String, Type>,
        structs: HashMap<String, Vec<(String, Type)>>,
    }

    fn module(table: &TypeTable) -> Module {
        let file = syn::parse2::<syn::File>(module_tokens(table, "hw").unwrap()).unwrap();
        let items = match file.items.into_iter().next() {
            Some(Item::Mod(m)) => m.content.map(|(_, items)| items).unwrap_or_default(),
            item => panic!("unexpected {:?}", item.map(|i| i.to_token_stream().to_string())),
        };

        let mut aliases = HashMap::new();
        let mut structs = HashMap::new();
        for item in &items {
            match item {
                Item::Type(t) => {
                    aliases.insert(t.ident.to_string(), (*t.ty).clone());
                }
                Item::Struct(st) => {
                    let fields = st
                        .fields
                        .iter()
                        .map(|f| {
                            let name = f.ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
                            (name, f.ty.clone())
                        })
                        .collect();
                    structs.insert(st.ident.to_string(), fields);
                }
                _ => (),
            }
        }
        Module {
            items,
            aliases,
            structs,
        }
    }

    impl Module {
        /// The number of bits a Rust type occupies in memory.
        fn bits(&self, ty: &Type) -> u64 {
            match ty {
                Type::Array(a) => {
                    let len = match &a.len {
                        Expr::Lit(l) => match &l.lit {
                            Lit::Int(n) => n.base10_parse::<u64>().unwrap(),
                            _ => panic!("bad length"),
                        },
                        _ => panic!("bad length"),
                    };
                    len * self.bits(&a.elem)
                }
                Type::Path(p) => {
                    let name = p.path.segments.last().unwrap().ident.to_string();
                    if let Some(t) = self.aliases.get(&name) {
                        self.bits(t)
                    } else if let Some(fields) = self.structs.get(&name) {
                        fields.iter().map(|(_, t)| self.bits(t)).sum()
                    } else {
                        name.strip_prefix('u')
                            .and_then(|w| w.parse().ok())
                            .unwrap_or_else(|| panic!("unknown type {}", name))
                    }
                }
                t => panic!("unexpected type {}", t.to_token_stream()),
            }
        }

        fn field(&self, parent: &str, name: &str) -> &Type {
            let fields = &self.structs[parent];
            &fields.iter().find(|(n, _)| n == name).unwrap().1
        }

        /// The body of `method` in the `impl` block of `reg`.
        fn method(&self, reg: &str, method: &str) -> Vec<syn::Stmt> {
            for item in &self.items {
                if let Item::Impl(i) = item {
                    if i.self_ty.to_token_stream().to_string() != reg {
                        continue;
                    }
                    for it in &i.items {
                        if let ImplItem::Fn(f) = it {
                            if f.sig.ident == method {
                                return f.block.stmts.clone();
                            }
                        }
                    }
                }
            }
            panic!("no {}::{}", reg, method)
        }
    }

    #[test]
    fn test_struct_fields_match_sizes() {
        let text = "package hw\ntype default Reg uint32\ntype u24 uint24\ntype X [48]\ntype F {\n\ta [4:0]\n}\ntype Words [3]uint16\ntype S struct {\n\ta u24\n\tb X\n\tc uint8\n\tf F\n\tw Words\n\txs [2]X\n\t... 8\n\tq uint64\n}\n";
        let t = table(text);
        let m = module(&t);

        let s = t.get("S").unwrap();
        assert_eq!(s.size, 320);
        let mut checked = 0;
        for f in s.fields.iter().filter(|f| !f.is_blank()) {
            let ty = m.field("S", &f.name);
            assert_eq!(m.bits(ty), f.size, "{}: {}", f.name, ty.to_token_stream());
            checked += 1;
        }
        assert_eq!(checked, 7);

        // Padding fills everything between the fields.
        let all: u64 = m.structs["S"].iter().map(|(_, ty)| m.bits(ty)).sum();
        assert_eq!(all, s.size);
        for name in vec!["u24", "X", "Words"] {
            assert_eq!(m.bits(&m.aliases[name]), t.get(name).unwrap().size, "{}", name);
        }
    }

    /// Splits a statement into its tokens, dropping the delimiters of groups.
    fn flatten(tokens: TokenStream, out: &mut Vec<String>) {
        for tt in tokens {
            match tt {
                TokenTree::Group(g) => flatten(g.stream(), out),
                tt => out.push(tt.to_string()),
            }
        }
    }

    fn int(text: &str) -> Option<u64> {
        match text.strip_prefix("0x") {
            Some(h) => u64::from_str_radix(&h.replace('_', ""), 16).ok(),
            None => text.parse().ok(),
        }
    }

    /// The field path and integer literals of each statement which moves a
    /// field of the value struct `v`.
    fn moves(stmts: &[syn::Stmt]) -> Vec<(Vec<String>, Vec<u64>)> {
        stmts
            .iter()
            .filter_map(|stmt| {
                let mut toks = vec![];
                flatten(stmt.to_token_stream(), &mut toks);
                let at = toks.windows(2).position(|w| w[0] == "v" && w[1] == ".")?;
                let path = toks[at + 1..]
                    .chunks(2)
                    .take_while(|c| c.len() == 2 && c[0] == ".")
                    .map(|c| c[1].clone())
                    .collect();
                let lits = toks.iter().filter_map(|t| int(t)).collect();
                Some((path, lits))
            })
            .collect()
    }

    #[test]
    fn test_scalar_accessors_follow_the_plan() {
        let t = table("package hw\ntype default Reg uint32\ntype In {\n\ta [1:0]\n\tb\n}\nfunc Ctl {\n\ten\n\tmode [3:1]\n\tinner In\n\tcount [31:8]\n}\n");
        let plan = access_plan(&t, t.get("Ctl").unwrap());
        assert_eq!(plan.len(), 5);
        let m = module(&t);

        let gets = moves(&m.method("Ctl_reg", "get"));
        let sets = moves(&m.method("Ctl_reg", "set"));
        assert_eq!(gets.len(), plan.len());
        assert_eq!(sets.len(), plan.len());
        for ((a, get), set) in plan.iter().zip(gets).zip(sets) {
            let (get_lits, set_lits) = if a.size == 1 {
                (vec![1, a.lo, 0], vec![1, a.lo])
            } else {
                (vec![a.lo, mask(a.size)], vec![mask(a.size), a.lo])
            };
            assert_eq!(get, (a.path.clone(), get_lits), "{:?}", a.path);
            assert_eq!(set, (a.path.clone(), set_lits), "{:?}", a.path);
        }

        let code = generate(&t, "hw", "test.hw").unwrap();
        assert_lines(&code, &["v.count = ((reg >> 8) & 0xffffff) as u32;"]);
    }

    #[test]
    fn test_word_accessors_follow_the_plan() {
        let t = table("package hw\ntype W {\n\tlo [31:0]\n\tmid [79:32]\n\tflag [95]\n\tbig [191:96]\n}\ntype S struct {\n\tw W\n}\n");
        let plan = access_plan(&t, t.get("W").unwrap());
        let m = module(&t);

        let gets = moves(&m.method("W_reg", "get"));
        let sets = moves(&m.method("W_reg", "set"));
        assert_eq!(gets.len(), plan.len());
        assert_eq!(sets.len(), plan.len());
        for ((a, get), set) in plan.iter().zip(gets).zip(sets) {
            let lits = if a.size == 1 { vec![a.lo] } else { vec![a.lo, a.hi()] };
            assert_eq!(get, (a.path.clone(), lits.clone()), "{:?}", a.path);
            assert_eq!(set, (a.path.clone(), lits), "{:?}", a.path);
        }
        assert_eq!(
            plan.iter().map(|a| (a.lo, a.hi())).collect::<Vec<_>>(),
            vec![(0, 31), (32, 79), (95, 95), (96, 191)]
        );
    }

    #[test]
    fn test_nested_types_come_first() {
        let code = generated("type S struct {\n\tctl {\n\t\ten\n\t}\n\tx uint32\n}\n");
        assert_lines(
            &code,
            &["pub struct S_ctl {", "pub struct S_ctl_reg(pub u32);", "pub ctl: S_ctl_reg,"],
        );
        let nested = code.find("pub struct S_ctl {").unwrap();
        let outer = code.find("pub struct S {").unwrap();
        assert!(nested < outer, "{}", code);
    }

    #[test]
    fn test_docs_and_tags() {
        let code = generated("// Control bits.\ntype T {\n\t// Enables it.\n\ten /ro\n}\n");
        assert!(code.contains("Control bits."), "{}", code);
        assert!(code.contains("Enables it."), "{}", code);
        assert!(code.contains("Tags: ro."), "{}", code);
    }

    #[test]
    fn test_emission_is_stable() {
        let text = "type B struct {\n\tx uint16\n}\ntype A struct {\n\tb B\n}\ntype C {\n\ton\n}\n";
        assert_eq!(generated(text), generated(text));
        let code = generated(text);
        assert!(code.find("pub struct B").unwrap() < code.find("pub struct A").unwrap());
    }

    #[test]
    fn test_idents() {
        for (name, expected) in vec![
            ("ctl", "ctl"),
            ("type", "r#type"),
            ("match", "r#match"),
            ("self", "self_"),
            ("Self", "Self_"),
            ("crate", "crate_"),
        ] {
            assert_eq!(ident(name).to_string(), expected);
        }
        assert_eq!(reg_ident("T").to_string(), "T_reg");
        assert_eq!(const_ident("T", "f", "_mask").to_string(), "T_f_mask");
        assert_eq!(hex(0x7f).to_string(), "0x7f");
        assert_eq!(mask(7), 0x7f);
        assert_eq!(mask(64), u64::MAX);
        assert_eq!(words(33), 2);
    }

    #[test]
    fn test_backing() {
        let t = table("package hw\ntype default Reg uint16\nfunc F {\n\ta\n}\ntype B {\n\ta [11:0]\n}\ntype W {\n\ta [69]\n}\n");
        for (name, expected) in vec![
            ("F", Backing::Scalar(16)),
            ("B", Backing::Scalar(16)),
            ("W", Backing::Words(3)),
        ] {
            assert_eq!(Backing::of(&t, t.get(name).unwrap()), expected, "{}", name);
        }
    }

    #[test]
    fn test_access_plan_flattens_bitfields() {
        let t = table("package hw\ntype In {\n\ta [2:0]\n\tb\n}\ntype Out {\n\tx\n\tinner In\n\t_ [5]\n\ty [7:6]\n}\n");
        let plan = access_plan(&t, t.get("Out").unwrap());
        let expected = vec![
            (vec!["x"], 0, 1),
            (vec!["inner", "a"], 1, 3),
            (vec!["inner", "b"], 4, 1),
            (vec!["y"], 6, 2),
        ];
        assert_eq!(plan.len(), expected.len());
        for (a, (path, lo, size)) in plan.iter().zip(expected) {
            assert_eq!(a.path, path);
            assert_eq!((a.lo, a.size), (lo, size));
        }
    }

    /// Writes `values` into a zeroed register following `plan`, the way the
    /// generated `set` does.
    fn store(plan: &[Access], values: &[u64]) -> [u32; 4] {
        let mut reg = [0u32; 4];
        for (a, v) in plan.iter().zip(values) {
            set_range(&mut reg, a.lo as u32, a.hi() as u32, *v & mask(a.size));
        }
        reg
    }

    fn load(plan: &[Access], reg: &[u32]) -> Vec<u64> {
        plan.iter()
            .map(|a| get_range(reg, a.lo as u32, a.hi() as u32))
            .collect()
    }

    #[test]
    fn test_access_plan_round_trip() {
        let t = table(
            "package hw\ntype In {\n\ta [2:0]\n\tb\n}\ntype R {\n\tx\n\tinner In\n\tlong [69:10]\n\ty [99:90]\n}\n",
        );
        let plan = access_plan(&t, t.get("R").unwrap());

        for values in vec![
            vec![0, 0, 0, 0, 0],
            vec![1, 5, 1, 0x0fff_ffff_ffff_ffff, 0x3ff],
            vec![1, 7, 0, 0x0123_4567_89ab_cdef, 0x155],
        ] {
            let reg = store(&plan, &values);
            assert_eq!(load(&plan, &reg), values);
            // Storing what was loaded leaves the register unchanged.
            assert_eq!(store(&plan, &load(&plan, &reg)), reg);
        }
    }

    #[test]
    fn test_scalar_and_word_access_agree() {
        let t = table("package hw\ntype R {\n\ten\n\tmode [7:4]\n\tcount [47:20]\n}\n");
        let plan = access_plan(&t, t.get("R").unwrap());
        let values = vec![1, 0xa, 0x0abc_def1];

        let mut scalar = 0u64;
        for (a, v) in plan.iter().zip(&values) {
            scalar |= (v & mask(a.size)) << a.lo;
        }
        let words = store(&plan, &values);
        assert_eq!(words[0] as u64 | (words[1] as u64) << 32, scalar);
        for (a, v) in plan.iter().zip(&values) {
            assert_eq!((scalar >> a.lo) & mask(a.size), *v);
        }
    }

    #[test]
    fn test_single_bits() {
        let mut r = [0u32; 2];
        for bit in vec![0, 5, 31, 32, 63] {
            set1(&mut r, bit, true);
            assert!(get1(&r, bit), "{}", bit);
        }
        assert_eq!(r, [0x8000_0021, 0x8000_0001]);
        set1(&mut r, 31, false);
        assert!(!get1(&r, 31));
        assert_eq!(r[0], 0x21);
    }

    #[test]
    fn test_ranges() {
        for (lo, hi, v) in vec![
            (0, 7, 0xa5),
            (28, 35, 0xff),
            (30, 93, 0xdead_beef_cafe_f00d),
            (64, 95, 0xffff_ffff),
        ] {
            let mut r = [0u32; 3];
            set_range(&mut r, lo, hi, v);
            assert_eq!(get_range(&r, lo, hi), v, "[{}:{}]", hi, lo);
            if lo > 0 {
                assert_eq!(get_range(&r, 0, lo - 1), 0, "[{}:{}]", hi, lo);
            }
        }

        let mut r = [u32::MAX; 2];
        set_range(&mut r, 16, 47, 0);
        assert_eq!(r, [0x0000_ffff, 0xffff_0000]);
    }

    #[test]
    fn test_words() {
        let mut r = [0u32; 4];
        set_words(&mut r, 8, 87, &[0x1111_1111, 0x2222_2222, 0x33]);
        assert_eq!(get_words::<3>(&r, 8, 87), [0x1111_1111, 0x2222_2222, 0x33]);
        assert_eq!(r[0], 0x1111_1100);
        assert_eq!(get_range(&r, 0, 7), 0);
    }
}
