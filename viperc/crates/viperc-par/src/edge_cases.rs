//! End-to-end parser and type-check tests over real source snippets.

use viperc_lex::{scan_invalid_tokens, Lexer};
use viperc_sem::Context;
use viperc_util::Diagnostics;

use crate::ast::{AstNode, BinaryOp, UnaryOp};
use crate::{Parser, TypeChecker};

/// Lex and parse `source`, without the type-check pass.
fn parse_source(source: &str) -> (Vec<AstNode>, Context, Diagnostics) {
    let mut ctx = Context::new();
    let mut diag = Diagnostics::new();
    diag.set_file_name("test.vpr");
    diag.set_text(source);

    let tokens = Lexer::new(source, &ctx.types, &mut diag).lex();
    scan_invalid_tokens(&tokens, &mut diag);
    let nodes = Parser::new(tokens, &mut ctx, &mut diag).parse();
    (nodes, ctx, diag)
}

/// Full front-end: lex, parse, type-check.
fn check_source(source: &str) -> (Vec<AstNode>, Context, Diagnostics) {
    let (mut nodes, mut ctx, mut diag) = parse_source(source);
    TypeChecker::new(&mut ctx, &mut diag).check(&mut nodes);
    (nodes, ctx, diag)
}

// ============================================================================
// Whole-program scenarios
// ============================================================================

#[test]
fn test_minimal_return() {
    let (nodes, ctx, diag) = check_source("i32 main() { return 0; }");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert_eq!(diag.error_count(), 0);
    assert_eq!(nodes.len(), 1);

    let i32_ty = ctx.types.get("i32").unwrap();
    match &nodes[0] {
        AstNode::Function {
            return_type,
            name,
            params,
            body,
            ..
        } => {
            assert_eq!(name, "main");
            assert_eq!(*return_type, i32_ty);
            assert!(params.is_empty());
            match body.as_deref().unwrap() {
                AstNode::Compound { children, .. } => {
                    assert_eq!(children.len(), 1);
                    match &children[0] {
                        AstNode::Return {
                            value,
                            return_type: captured,
                            ..
                        } => {
                            assert_eq!(*captured, Some(i32_ty));
                            assert!(matches!(
                                value.as_deref(),
                                Some(AstNode::IntegerLiteral { value: 0, .. })
                            ));
                        }
                        other => panic!("expected return, got {:?}", other),
                    }
                }
                other => panic!("expected compound body, got {:?}", other),
            }
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_precedence_mul_binds_tighter() {
    let (nodes, ctx, diag) = check_source("let i32 x = 1 + 2 * 3;");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i32_ty = ctx.types.get("i32").unwrap();
    match &nodes[0] {
        AstNode::VariableDecl { init, .. } => match init.as_deref().unwrap() {
            AstNode::Binary {
                lhs, op, rhs, ty, ..
            } => {
                assert_eq!(*op, BinaryOp::Add);
                assert_eq!(*ty, i32_ty);
                assert!(matches!(
                    lhs.as_ref(),
                    AstNode::IntegerLiteral { value: 1, .. }
                ));
                match rhs.as_ref() {
                    AstNode::Binary { lhs, op, rhs, .. } => {
                        assert_eq!(*op, BinaryOp::Mul);
                        assert!(matches!(
                            lhs.as_ref(),
                            AstNode::IntegerLiteral { value: 2, .. }
                        ));
                        assert!(matches!(
                            rhs.as_ref(),
                            AstNode::IntegerLiteral { value: 3, .. }
                        ));
                    }
                    other => panic!("expected 2 * 3, got {:?}", other),
                }
            }
            other => panic!("expected binary init, got {:?}", other),
        },
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_struct_and_member_access() {
    let (nodes, ctx, diag) =
        check_source("struct P { i32 x; i32 y; }; let i32 f(P* p) = return p.x + p.y;");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert_eq!(nodes.len(), 2);

    let i32_ty = ctx.types.get("i32").unwrap();
    let p_ty = ctx.types.get("P").expect("P registered");
    assert_eq!(ctx.types.struct_field(p_ty, "x"), Some((0, i32_ty)));
    assert_eq!(ctx.types.struct_field(p_ty, "y"), Some((1, i32_ty)));
    assert!(matches!(&nodes[0], AstNode::StructDecl { ty, .. } if *ty == p_ty));

    match &nodes[1] {
        AstNode::Function { body, .. } => match body.as_deref().unwrap() {
            AstNode::Return { value, .. } => match value.as_deref().unwrap() {
                AstNode::Binary { lhs, op, rhs, .. } => {
                    assert_eq!(*op, BinaryOp::Add);
                    for (side, field) in [(lhs, "x"), (rhs, "y")] {
                        match side.as_ref() {
                            AstNode::Member {
                                object, field: f, ty, ..
                            } => {
                                assert_eq!(f, field);
                                assert_eq!(*ty, i32_ty);
                                assert!(matches!(
                                    object.as_ref(),
                                    AstNode::Variable { name, .. } if name == "p"
                                ));
                            }
                            other => panic!("expected member access, got {:?}", other),
                        }
                    }
                }
                other => panic!("expected binary, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_class_with_method() {
    let (nodes, ctx, diag) = check_source("class C { i32 v; i32 get() = return this.v; };");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i32_ty = ctx.types.get("i32").unwrap();
    let c_ty = ctx.types.get("C").expect("C registered");
    assert_eq!(ctx.types.struct_field(c_ty, "v"), Some((0, i32_ty)));
    let sig = ctx.types.struct_method(c_ty, "get").expect("method signature");
    assert_eq!(sig.return_type, Some(i32_ty));

    match &nodes[0] {
        AstNode::ClassDefinition {
            name,
            fields,
            methods,
            ..
        } => {
            assert_eq!(name, "C");
            assert_eq!(fields.len(), 1);
            assert_eq!(methods.len(), 1);
            let method = &methods[0];
            assert_eq!(method.name, "get");
            assert_eq!(method.return_type, Some(i32_ty));

            // The method scope binds `this` as a pointer to C.
            let this = ctx
                .scopes
                .find_variable(method.scope, "this")
                .expect("this in method scope");
            let this_ty = ctx.scopes.local(this).ty;
            assert_eq!(ctx.types.pointee(this_ty), Some(c_ty));
        }
        other => panic!("expected class definition, got {:?}", other),
    }
}

#[test]
fn test_class_constructor_sees_this_by_value() {
    let (nodes, ctx, diag) = check_source("class C { i32 v; C(i32 start) = { this.v = start; }; };");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let c_ty = ctx.types.get("C").unwrap();
    match &nodes[0] {
        AstNode::ClassDefinition { methods, .. } => {
            let ctor = &methods[0];
            assert_eq!(ctor.name, "C");
            assert_eq!(ctor.return_type, None);
            let this = ctx
                .scopes
                .find_variable(ctor.scope, "this")
                .expect("this in constructor scope");
            assert_eq!(ctx.scopes.local(this).ty, c_ty);
        }
        other => panic!("expected class definition, got {:?}", other),
    }
}

#[test]
fn test_pointer_array_type_suffixes() {
    let (nodes, mut ctx, diag) = check_source("let i8*[4] buf;");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i8_ty = ctx.types.get("i8").unwrap();
    let ptr = ctx.types.create_pointer(i8_ty);
    let expected = ctx.types.create_array(4, ptr);
    match &nodes[0] {
        AstNode::VariableDecl { ty, name, .. } => {
            assert_eq!(name, "buf");
            assert_eq!(*ty, expected);
        }
        other => panic!("expected variable declaration, got {:?}", other),
    }
}

#[test]
fn test_error_recovery_continues_parsing() {
    let (nodes, _, diag) = parse_source("let i32 a = ; let i32 b = 1;");
    assert_eq!(diag.error_count(), 1, "{}", diag.render_all());
    assert_eq!(nodes.len(), 2);

    match &nodes[1] {
        AstNode::VariableDecl { name, init, .. } => {
            assert_eq!(name, "b");
            assert!(matches!(
                init.as_deref(),
                Some(AstNode::IntegerLiteral { value: 1, .. })
            ));
        }
        other => panic!("expected second declaration, got {:?}", other),
    }
}

// ============================================================================
// Boundary behaviors
// ============================================================================

#[test]
fn test_empty_input() {
    let (nodes, _, diag) = check_source("");
    assert!(nodes.is_empty());
    assert!(!diag.had_errors());
    assert_eq!(diag.warning_count(), 0);
}

#[test]
fn test_function_with_empty_body() {
    let (nodes, ctx, diag) = check_source("let i32 f() = { };");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i32_ty = ctx.types.get("i32").unwrap();
    match &nodes[0] {
        AstNode::Function {
            return_type, body, ..
        } => {
            assert_eq!(*return_type, i32_ty);
            match body.as_deref().unwrap() {
                AstNode::Compound { children, .. } => assert!(children.is_empty()),
                other => panic!("expected compound, got {:?}", other),
            }
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_else_recognized_across_semicolon() {
    let source = "let i32 f(bool c) = { let i32 x = 0; if (c) x = 1; else x = 2; return x; };";
    let (nodes, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());

    match &nodes[0] {
        AstNode::Function { body, .. } => match body.as_deref().unwrap() {
            AstNode::Compound { children, .. } => {
                assert_eq!(children.len(), 3);
                match &children[1] {
                    AstNode::If { else_branch, .. } => {
                        assert!(else_branch.is_some());
                    }
                    other => panic!("expected if, got {:?}", other),
                }
            }
            other => panic!("expected compound, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_else_after_brace_body() {
    let source = "let i32 f(bool c) = { let i32 x = 0; if (c) { x = 1; } else { x = 2; }; return x; };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_forward_declaration_has_no_body() {
    let (nodes, _, diag) = check_source("let i32 f();");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert!(matches!(
        &nodes[0],
        AstNode::Function { body: None, .. }
    ));
}

// ============================================================================
// Expressions and operators
// ============================================================================

#[test]
fn test_assignment_is_right_associative() {
    let source = "let i32 f(i32 a, i32 b, i32 c) = { a = b = c; return a; };";
    let (nodes, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());

    match &nodes[0] {
        AstNode::Function { body, .. } => match body.as_deref().unwrap() {
            AstNode::Compound { children, .. } => match &children[0] {
                AstNode::Binary { op, lhs, rhs, .. } => {
                    assert_eq!(*op, BinaryOp::Assign);
                    assert!(matches!(
                        lhs.as_ref(),
                        AstNode::Variable { name, .. } if name == "a"
                    ));
                    assert!(matches!(
                        rhs.as_ref(),
                        AstNode::Binary { op: BinaryOp::Assign, .. }
                    ));
                }
                other => panic!("expected assignment, got {:?}", other),
            },
            other => panic!("expected compound, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_subtraction_is_left_associative() {
    let (nodes, _, diag) = check_source("let i32 x = 10 - 3 - 2;");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    match &nodes[0] {
        AstNode::VariableDecl { init, .. } => match init.as_deref().unwrap() {
            AstNode::Binary { lhs, op, rhs, .. } => {
                assert_eq!(*op, BinaryOp::Sub);
                // ((10 - 3) - 2)
                assert!(matches!(
                    lhs.as_ref(),
                    AstNode::Binary { op: BinaryOp::Sub, .. }
                ));
                assert!(matches!(
                    rhs.as_ref(),
                    AstNode::IntegerLiteral { value: 2, .. }
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        },
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_unary_operators() {
    let source = "let bool f(bool b, i32 n, i32* p) = { let i32 m = -n; let i32 v = #p; let i32* q = @m; return !b; };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_new_produces_pointer() {
    let source = "class C { i32 v; }; let C* make() = return new C;";
    let (nodes, ctx, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let c_ty = ctx.types.get("C").unwrap();
    match &nodes[1] {
        AstNode::Function { body, .. } => match body.as_deref().unwrap() {
            AstNode::Return { value, .. } => match value.as_deref().unwrap() {
                AstNode::Unary { op, ty, .. } => {
                    assert_eq!(*op, UnaryOp::New);
                    assert_eq!(ctx.types.pointee(*ty), Some(c_ty));
                }
                other => panic!("expected new expression, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_call_expression() {
    let source = "import i32 putchar(i32 c); let i32 main() = return putchar(65);";
    let (nodes, ctx, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());

    assert!(ctx.functions.contains("putchar"));
    let i32_ty = ctx.types.get("i32").unwrap();
    match &nodes[1] {
        AstNode::Function { body, .. } => match body.as_deref().unwrap() {
            AstNode::Return { value, .. } => match value.as_deref().unwrap() {
                AstNode::Call {
                    callee, args, ty, ..
                } => {
                    assert_eq!(args.len(), 1);
                    assert_eq!(*ty, i32_ty);
                    assert!(matches!(
                        callee.as_ref(),
                        AstNode::Variable { name, .. } if name == "putchar"
                    ));
                }
                other => panic!("expected call, got {:?}", other),
            },
            other => panic!("expected return, got {:?}", other),
        },
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_trailing_comma_rejected() {
    let (_, _, diag) = parse_source("import i32 f(i32 a); let i32 g() = return f(1,);");
    assert!(diag.had_errors());
}

#[test]
fn test_method_call_resolves_through_signatures() {
    let source =
        "class C { i32 v; i32 get() = return this.v; }; let i32 f(C* c) = return c.get();";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_index_on_array_and_pointer() {
    let source = "let i32 f(i32* p, i32 i) = { let i32[4] a; a[0] = 1; return p[i] + a[0]; };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_while_loop() {
    let source = "let i32 f() = { let i32 i = 0; while (i < 10) i += 1; return i; };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_integer_literal_value_matches_text() {
    let (nodes, _, _) = parse_source("let i32 x = 12345;");
    match &nodes[0] {
        AstNode::VariableDecl { init, .. } => {
            assert!(matches!(
                init.as_deref(),
                Some(AstNode::IntegerLiteral { value: 12345, .. })
            ));
        }
        other => panic!("expected declaration, got {:?}", other),
    }
}

#[test]
fn test_string_literal_bytes() {
    let (nodes, _, diag) = parse_source(r#"let i8* s = "hi\n";"#);
    assert!(!diag.had_errors());
    match &nodes[0] {
        AstNode::VariableDecl { init, .. } => match init.as_deref().unwrap() {
            AstNode::StringLiteral { value, .. } => assert_eq!(value, b"hi\n"),
            other => panic!("expected string literal, got {:?}", other),
        },
        other => panic!("expected declaration, got {:?}", other),
    }
}

// ============================================================================
// Other top-level forms
// ============================================================================

#[test]
fn test_extern_function() {
    let (nodes, ctx, diag) = check_source("extern i32 write(i32 fd);");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert!(ctx.functions.contains("write"));
    assert!(matches!(&nodes[0], AstNode::ExternFunction { name, .. } if name == "write"));
}

#[test]
fn test_func_definition_with_arrow() {
    let (nodes, ctx, diag) = check_source("func add(i32 a, i32 b) -> i32 { return a + b; }");
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i32_ty = ctx.types.get("i32").unwrap();
    match &nodes[0] {
        AstNode::Function {
            name, return_type, ..
        } => {
            assert_eq!(name, "add");
            assert_eq!(*return_type, i32_ty);
        }
        other => panic!("expected function, got {:?}", other),
    }
    assert_eq!(ctx.functions.lookup("add").unwrap().params.len(), 2);
}

#[test]
fn test_func_without_arrow_returns_void() {
    let (nodes, ctx, diag) = check_source("func noop() { return; }");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    match &nodes[0] {
        AstNode::Function { return_type, .. } => {
            assert_eq!(*return_type, ctx.types.void());
        }
        other => panic!("expected function, got {:?}", other),
    }
}

#[test]
fn test_global_declaration() {
    let source = "global i64 counter = 0; let i64 get() = return counter;";
    let (nodes, ctx, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());

    let i64_ty = ctx.types.get("i64").unwrap();
    assert_eq!(ctx.globals.lookup("counter").unwrap().ty, i64_ty);
    assert!(matches!(&nodes[0], AstNode::GlobalDecl { name, .. } if name == "counter"));
}

#[test]
fn test_recursive_function_resolves() {
    let source = "let i32 fact(i32 n) = { if (n < 2) return 1; return n * fact(n - 1); };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_function_scope_parents_global() {
    let (nodes, ctx, diag) = parse_source("let i32 f(i32 a) = return a;");
    assert!(!diag.had_errors());
    match &nodes[0] {
        AstNode::Function { scope, .. } => {
            assert_eq!(ctx.scopes.parent(*scope), Some(ctx.scopes.root()));
        }
        other => panic!("expected function, got {:?}", other),
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

#[test]
fn test_undeclared_identifier() {
    let (_, _, diag) = parse_source("let i32 x = y;");
    assert_eq!(diag.error_count(), 1);
    let rendered = diag.render_all();
    assert!(rendered.contains("undeclared identifier 'y'"), "{}", rendered);
}

#[test]
fn test_redeclaration_in_same_scope() {
    let (_, _, diag) = parse_source("let i32 f() = { let i32 a = 0; let i32 a = 1; return a; };");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.render_all().contains("redeclaration of 'a'"));
}

#[test]
fn test_shadowing_outer_scope_is_allowed() {
    let source = "let i32 f(i32 a) = { let i32 r = a; { let i32 a = 1; r = a; }; return r; };";
    let (_, _, diag) = check_source(source);
    assert!(!diag.had_errors(), "{}", diag.render_all());
}

#[test]
fn test_unknown_type_name() {
    let (_, _, diag) = parse_source("let Matrix m;");
    assert!(diag.had_errors());
    assert!(diag.render_all().contains("unknown type name 'Matrix'"));
}

#[test]
fn test_duplicate_struct_name() {
    let (_, _, diag) = parse_source("struct P { i32 x; }; struct P { i32 y; };");
    assert_eq!(diag.error_count(), 1);
    assert!(diag.render_all().contains("already defined"));
}

#[test]
fn test_return_type_mismatch() {
    let (_, _, diag) = check_source("let bool f() = return 1;");
    assert!(diag.had_errors());
    assert!(diag.render_all().contains("return type mismatch"));
}

#[test]
fn test_condition_must_be_bool() {
    let (_, _, diag) = check_source("let i32 f(i32 x) = { if (x) return 1; return 0; };");
    assert!(diag.had_errors());
    assert!(diag.render_all().contains("must be bool"));
}

#[test]
fn test_member_access_on_non_struct() {
    let (_, _, diag) = check_source("let i32 f(i32 x) = return x.y;");
    assert!(diag.had_errors());
    assert!(diag.render_all().contains("non-struct"));
}

#[test]
fn test_invalid_assignment_target() {
    let (_, _, diag) = check_source("let i32 f() = { 1 = 2; return 0; };");
    assert!(diag.had_errors());
    assert!(diag.render_all().contains("invalid assignment target"));
}

#[test]
fn test_unused_variable_warning() {
    let (_, _, diag) = check_source("let i32 f() = { let i32 a; return 0; };");
    assert!(!diag.had_errors());
    assert_eq!(diag.warning_count(), 1);
    assert!(diag.render_all().contains("unused variable 'a'"));
}

#[test]
fn test_assign_only_variable_still_warns() {
    // A local that is only ever written is never read.
    let (_, _, diag) = check_source("let i32 f() = { let i32 a; a = 5; return 0; };");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert_eq!(diag.warning_count(), 1);
    assert!(diag.render_all().contains("unused variable 'a'"));
}

#[test]
fn test_compound_assignment_reads_its_target() {
    // `a += 1` reads the old value of `a`, so it counts as a use.
    let (_, _, diag) = check_source("let i32 f() = { let i32 a = 0; a += 1; return 0; };");
    assert!(!diag.had_errors(), "{}", diag.render_all());
    assert_eq!(diag.warning_count(), 0);
}

#[test]
fn test_unused_variable_warning_can_be_disabled() {
    let source = "let i32 f() = { let i32 a; return 0; };";
    let (mut nodes, mut ctx, mut diag) = parse_source(source);
    diag.set_warning(false, "unused-variable");
    TypeChecker::new(&mut ctx, &mut diag).check(&mut nodes);
    assert_eq!(diag.warning_count(), 0);
}

#[test]
fn test_errors_do_not_cascade() {
    // One bad identifier inside an expression: a single report, not a
    // column of follow-up type errors.
    let (_, _, diag) = check_source("let i32 f() = { let i32 a = nope + 1; return a; };");
    assert_eq!(diag.error_count(), 1, "{}", diag.render_all());
}

#[test]
fn test_stray_top_level_tokens_recover() {
    let (nodes, _, diag) = parse_source("+ ; let i32 x = 1;");
    assert!(diag.had_errors());
    assert_eq!(nodes.len(), 1);
}
