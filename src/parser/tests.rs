use super::*;
use crate::ast::{BlockStatement, ExpressionStatement, Operator};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn parse(input: &str) -> ast::Program {
    Parser::new(Lexer::new(input.to_owned()))
        .parse_program()
        .expect("Parse errors found")
}

fn parse_errors(input: &str) -> Vec<String> {
    let (_, errors) = Parser::new(Lexer::new(input.to_owned())).parse();
    errors
}

fn single_expression(input: &str) -> Expression {
    let mut program = parse(input);
    assert_eq!(program.statements.len(), 1, "program: {}", program);
    match program.statements.remove(0) {
        Statement::Expr(stmt) => stmt.expression,
        stmt => panic!("expected expression statement, got {:?}", stmt),
    }
}

fn ident(name: &str) -> Expression {
    Expression::Identifier(name.into())
}

fn int(value: i64) -> Expression {
    Expression::IntegerLiteral(value)
}

fn infix(left: Expression, operator: Operator, right: Expression) -> Expression {
    Expression::Infix(ast::InfixExpression {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    })
}

fn expr_stmt(expression: Expression) -> Statement {
    Statement::Expr(ExpressionStatement { expression })
}

#[test]
fn test_let_statements() {
    let cases = [
        ("let x = 5;", "x", int(5)),
        ("let y = true;", "y", Expression::Boolean(true.into())),
        ("let foobar = y;", "foobar", ident("y")),
        ("let z = 1 + 2", "z", infix(int(1), Operator::Plus, int(2))),
    ];

    for (input, name, value) in cases.iter() {
        let program = parse(input);
        assert_eq!(
            program.statements,
            vec![Statement::Let(ast::LetStatement {
                name: (*name).into(),
                value: value.clone(),
            })]
        );
    }
}

#[test]
fn test_return_statements() {
    let cases = [
        ("return 5;", Some(int(5))),
        ("return x", Some(ident("x"))),
        ("return;", None),
        ("return", None),
    ];

    for (input, value) in cases.iter() {
        let program = parse(input);
        assert_eq!(
            program.statements,
            vec![Statement::Return(ast::ReturnStatement {
                return_value: value.clone(),
            })]
        );
    }
}

#[test]
fn test_bare_return_inside_block() {
    let program = parse("fn() { return }");
    assert_eq!(program.to_string(), "fn() { return; };");
}

#[test]
fn test_literal_expressions() {
    assert_eq!(single_expression("foobar;"), ident("foobar"));
    assert_eq!(single_expression("5;"), int(5));
    assert_eq!(
        single_expression("\"hello world\";"),
        Expression::String("hello world".into())
    );
    assert_eq!(
        single_expression("false"),
        Expression::Boolean(false.into())
    );
}

#[test]
fn test_prefix_expressions() {
    let cases = [
        ("!5;", Operator::Bang, int(5)),
        ("-15;", Operator::Minus, int(15)),
        ("!true;", Operator::Bang, Expression::Boolean(true.into())),
        ("-x", Operator::Minus, ident("x")),
    ];

    for (input, operator, right) in cases.iter() {
        assert_eq!(
            single_expression(input),
            Expression::Prefix(ast::PrefixExpression {
                operator: *operator,
                right: Box::new(right.clone()),
            })
        );
    }
}

#[test]
fn test_infix_expressions() {
    let cases = [
        ("5 + 5;", Operator::Plus),
        ("5 - 5;", Operator::Minus),
        ("5 * 5;", Operator::Asterisk),
        ("5 / 5;", Operator::Slash),
        ("5 ^ 5;", Operator::Caret),
        ("5 > 5;", Operator::GT),
        ("5 < 5;", Operator::LT),
        ("5 == 5;", Operator::Eq),
        ("5 != 5;", Operator::NotEq),
    ];

    for (input, operator) in cases.iter() {
        assert_eq!(single_expression(input), infix(int(5), *operator, int(5)));
    }
}

#[test]
fn test_operator_precedence() {
    let cases = [
        ("-a * b", "((-a) * b);"),
        ("!-a", "(!(-a));"),
        ("a + b + c", "((a + b) + c);"),
        ("a + b - c", "((a + b) - c);"),
        ("a * b * c", "((a * b) * c);"),
        ("a * b / c", "((a * b) / c);"),
        ("a + b / c", "(a + (b / c));"),
        ("a + b * c + d / e - f", "(((a + (b * c)) + (d / e)) - f);"),
        ("3 + 4; -5 * 5", "(3 + 4); ((-5) * 5);"),
        ("5 > 4 == 3 < 4", "((5 > 4) == (3 < 4));"),
        ("5 < 4 != 3 > 4", "((5 < 4) != (3 > 4));"),
        (
            "3 + 4 * 5 == 3 * 1 + 4 * 5",
            "((3 + (4 * 5)) == ((3 * 1) + (4 * 5)));",
        ),
        ("3 > 5 == false", "((3 > 5) == false);"),
        ("1 + (2 + 3) + 4", "((1 + (2 + 3)) + 4);"),
        ("(5 + 5) * 2", "((5 + 5) * 2);"),
        ("-(5 + 5)", "(-(5 + 5));"),
        ("!(true == true)", "(!(true == true));"),
        ("a + add(b * c) + d", "((a + add((b * c))) + d);"),
        (
            "add(a, b, 1, 2 * 3, 4 + 5, add(6, 7 * 8))",
            "add(a, b, 1, (2 * 3), (4 + 5), add(6, (7 * 8)));",
        ),
        (
            "add(a + b + c * d / f + g)",
            "add((((a + b) + ((c * d) / f)) + g));",
        ),
        (
            "a * [1, 2, 3, 4][b * c] * d",
            "((a * ([1, 2, 3, 4][(b * c)])) * d);",
        ),
        (
            "add(a * b[2], b[1], 2 * [1, 2][1])",
            "add((a * (b[2])), (b[1]), (2 * ([1, 2][1])));",
        ),
        ("2 * 3 ^ 2", "(2 * (3 ^ 2));"),
        ("2 ^ 3 ^ 2", "((2 ^ 3) ^ 2);"),
        ("-2 ^ 2", "((-2) ^ 2);"),
        ("x = y = 1 + 2", "(x = (y = (1 + 2)));"),
        ("x = 1 == 2", "(x = (1 == 2));"),
        ("f(x = 1)", "f((x = 1));"),
    ];

    for (input, expected) in cases.iter() {
        assert_eq!(parse(input).to_string(), *expected, "input: {}", input);
    }
}

#[test]
fn test_if_expression() {
    let expression = single_expression("if (x < y) { x }");

    assert_eq!(
        expression,
        Expression::If(ast::IfExpression {
            condition: Box::new(infix(ident("x"), Operator::LT, ident("y"))),
            consequence: BlockStatement {
                statements: vec![expr_stmt(ident("x"))],
            },
            alternative: None,
        })
    );
}

#[test]
fn test_if_else_expression() {
    let expression = single_expression("if (x < y) { x } else { y; z }");

    match expression {
        Expression::If(if_expr) => {
            assert_eq!(if_expr.consequence.statements, vec![expr_stmt(ident("x"))]);
            assert_eq!(
                if_expr.alternative,
                Some(BlockStatement {
                    statements: vec![expr_stmt(ident("y")), expr_stmt(ident("z"))],
                })
            );
        }
        other => panic!("expected if expression, got {}", other),
    }
}

#[test]
fn test_function_literal() {
    let expression = single_expression("fn(x, y) { x + y; }");

    assert_eq!(
        expression,
        Expression::Function(ast::FunctionLiteral {
            parameters: vec!["x".into(), "y".into()],
            body: Rc::new(BlockStatement {
                statements: vec![expr_stmt(infix(ident("x"), Operator::Plus, ident("y")))],
            }),
        })
    );
}

#[test]
fn test_function_parameters() {
    let cases: [(&str, &[&str]); 3] = [
        ("fn() {};", &[]),
        ("fn(x) {};", &["x"]),
        ("fn(x, y, z) {};", &["x", "y", "z"]),
    ];

    for (input, expected) in cases.iter() {
        match single_expression(input) {
            Expression::Function(func) => {
                let names: Vec<&str> = func.parameters.iter().map(|p| p.value.as_str()).collect();
                assert_eq!(names, expected.to_vec());
            }
            other => panic!("expected function literal, got {}", other),
        }
    }
}

#[test]
fn test_call_expression() {
    let expression = single_expression("add(1, 2 * 3, 4 + 5);");

    assert_eq!(
        expression,
        Expression::Call(ast::CallExpression {
            function: Box::new(ident("add")),
            arguments: vec![
                int(1),
                infix(int(2), Operator::Asterisk, int(3)),
                infix(int(4), Operator::Plus, int(5)),
            ],
        })
    );
}

#[test]
fn test_array_and_index_expressions() {
    assert_eq!(
        single_expression("[1, 2 * 2, 3 + 3]"),
        Expression::Array(
            vec![
                int(1),
                infix(int(2), Operator::Asterisk, int(2)),
                infix(int(3), Operator::Plus, int(3)),
            ]
            .into()
        )
    );
    assert_eq!(single_expression("[]"), Expression::Array(Vec::<Expression>::new().into()));
    assert_eq!(
        single_expression("myArray[1 + 1]"),
        Expression::Index(ast::IndexExpression {
            left: Box::new(ident("myArray")),
            index: Box::new(infix(int(1), Operator::Plus, int(1))),
        })
    );
}

#[test]
fn test_assign_expression() {
    assert_eq!(
        single_expression("count = count + 1;"),
        Expression::Assign(ast::AssignExpression {
            name: "count".into(),
            value: Box::new(infix(ident("count"), Operator::Plus, int(1))),
        })
    );
}

#[test]
fn test_block_statement() {
    let program = parse("{ let a = 1; a } a");

    assert_eq!(
        program.statements,
        vec![
            Statement::Block(BlockStatement {
                statements: vec![
                    Statement::Let(ast::LetStatement {
                        name: "a".into(),
                        value: int(1),
                    }),
                    expr_stmt(ident("a")),
                ],
            }),
            expr_stmt(ident("a")),
        ]
    );
}

#[test]
fn test_comments_are_dropped() {
    let program = parse(
        "// setup
let a = 1; // one
// result
a",
    );

    assert_eq!(program.to_string(), "let a = 1; a;");
}

#[test]
fn test_let_errors_are_all_reported() {
    assert_eq!(
        parse_errors("let x 5; let = 10; let 838383;"),
        vec![
            "expected next token to be Assign, got Int instead",
            "expected next token to be Ident, got Assign instead",
            "no prefix parse function for token Assign",
            "expected next token to be Ident, got Int instead",
        ]
    );
}

#[test]
fn test_lexical_errors() {
    assert_eq!(
        parse_errors("let s = \"abc"),
        vec!["unterminated string literal starting at byte 8"]
    );
    assert_eq!(parse_errors("1 @ 2"), vec!["illegal character: '@'"]);
    assert_eq!(parse_errors("x é"), vec!["illegal character: 'é'"]);
}

#[test]
fn test_deeply_nested_blocks_within_limit() {
    let depth = 300;
    let input = format!("{}1{}", "{".repeat(depth), "}".repeat(depth));
    let program = parse(&input);

    let mut block = match &program.statements[0] {
        Statement::Block(block) => block,
        stmt => panic!("expected block, got {:?}", stmt),
    };
    for _ in 1..depth {
        block = match &block.statements[0] {
            Statement::Block(inner) => inner,
            stmt => panic!("expected block, got {:?}", stmt),
        };
    }
    assert_eq!(block.statements, vec![expr_stmt(int(1))]);
}

#[test]
fn test_nesting_limit() {
    let too_deep = format!("{}1{}", "{".repeat(5000), "}".repeat(5000));
    let (program, errors) = Parser::new(Lexer::new(too_deep)).parse();
    assert_eq!(errors, vec!["nesting exceeds the limit of 512 levels"]);
    assert_eq!(program.statements.len(), 1);

    let cases = [
        format!("{}true", "!".repeat(200_000)),
        format!("1{}", " + 1".repeat(100_000)),
        format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)),
        format!("f{}", "(1)".repeat(10_000)),
        format!("let f = fn() {{ {} }}; f()", "[".repeat(3_000)),
    ];
    for input in cases.iter() {
        let (program, errors) = Parser::new(Lexer::new(input.clone())).parse();
        assert_eq!(
            errors,
            vec!["nesting exceeds the limit of 512 levels"],
            "input starts with: {}",
            &input[..20]
        );
        let _ = program.to_string();
    }
}

#[test]
fn test_deepest_accepted_expression_renders() {
    let input = format!("{}1", "-".repeat(MAX_NESTING - 1));
    let expression = single_expression(&input);

    let rendered = expression.to_string();
    assert!(rendered.starts_with("(-(-"));
    assert!(rendered.ends_with("1))"));
}

#[test]
fn test_syntax_errors() {
    let cases = [
        ("fn(x { x }", "expected next token to be RParen, got LBrace instead"),
        ("if (x) { 1", "expected RBrace to close block, got Eof instead"),
        ("(1 + 2) = 3", "invalid assignment target: (1 + 2)"),
        ("99999999999999999999", "could not parse 99999999999999999999 as integer"),
        ("[1, 2", "expected next token to be RBracket, got Eof instead"),
        ("add(1 2)", "expected next token to be RParen, got Int instead"),
    ];

    for (input, expected) in cases.iter() {
        let errors = parse_errors(input);
        assert_eq!(errors.first().map(String::as_str), Some(*expected), "input: {}", input);
    }
}

#[test]
fn test_parse_program_rejects_diagnostics() {
    let result = Parser::new(Lexer::new("let = 1".to_owned())).parse_program();
    assert!(result.is_err());
}

fn identifier() -> impl Strategy<Value = ast::Identifier> {
    prop::sample::select(vec!["a", "b", "foo", "bar_baz", "x"]).prop_map(ast::Identifier::from)
}

fn block(inner: BoxedStrategy<Expression>) -> impl Strategy<Value = BlockStatement> {
    let statement = prop_oneof![
        inner.clone().prop_map(expr_stmt),
        prop::option::of(inner).prop_map(|return_value| {
            Statement::Return(ast::ReturnStatement { return_value })
        }),
    ];
    prop::collection::vec(statement, 0..3).prop_map(|statements| BlockStatement { statements })
}

fn expression() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![
        identifier().prop_map(Expression::Identifier),
        (0..i64::MAX).prop_map(Expression::IntegerLiteral),
        "[a-z ]{0,8}".prop_map(|s| Expression::String(s.into())),
        any::<bool>().prop_map(|b| Expression::Boolean(b.into())),
    ];
    let prefix_operator = prop::sample::select(vec![Operator::Bang, Operator::Minus]);
    let infix_operator = prop::sample::select(vec![
        Operator::Plus,
        Operator::Minus,
        Operator::Asterisk,
        Operator::Slash,
        Operator::Caret,
        Operator::LT,
        Operator::GT,
        Operator::Eq,
        Operator::NotEq,
    ]);

    leaf.prop_recursive(4, 32, 3, move |inner| {
        prop_oneof![
            (prefix_operator.clone(), inner.clone()).prop_map(|(operator, right)| {
                Expression::Prefix(ast::PrefixExpression {
                    operator,
                    right: Box::new(right),
                })
            }),
            (inner.clone(), infix_operator.clone(), inner.clone())
                .prop_map(|(left, operator, right)| infix(left, operator, right)),
            (
                inner.clone(),
                block(inner.clone()),
                prop::option::of(block(inner.clone()))
            )
                .prop_map(|(condition, consequence, alternative)| {
                    Expression::If(ast::IfExpression {
                        condition: Box::new(condition),
                        consequence,
                        alternative,
                    })
                }),
            (prop::collection::vec(identifier(), 0..3), block(inner.clone())).prop_map(
                |(parameters, body)| {
                    Expression::Function(ast::FunctionLiteral {
                        parameters,
                        body: Rc::new(body),
                    })
                }
            ),
            (inner.clone(), prop::collection::vec(inner.clone(), 0..3)).prop_map(
                |(function, arguments)| {
                    Expression::Call(ast::CallExpression {
                        function: Box::new(function),
                        arguments,
                    })
                }
            ),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|elements| Expression::Array(elements.into())),
            (inner.clone(), inner.clone()).prop_map(|(left, index)| {
                Expression::Index(ast::IndexExpression {
                    left: Box::new(left),
                    index: Box::new(index),
                })
            }),
            (identifier(), inner).prop_map(|(name, value)| {
                Expression::Assign(ast::AssignExpression {
                    name,
                    value: Box::new(value),
                })
            }),
        ]
    })
}

fn program() -> impl Strategy<Value = ast::Program> {
    let statement = prop_oneof![
        expression().prop_map(expr_stmt),
        (identifier(), expression())
            .prop_map(|(name, value)| Statement::Let(ast::LetStatement { name, value })),
        prop::option::of(expression())
            .prop_map(|return_value| Statement::Return(ast::ReturnStatement { return_value })),
        block(expression().boxed()).prop_map(Statement::Block),
    ];
    prop::collection::vec(statement, 0..4).prop_map(|statements| ast::Program { statements })
}

proptest! {
    #[test]
    fn rendered_program_parses_back_to_itself(program in program()) {
        let rendered = program.to_string();
        let (reparsed, errors) = Parser::new(Lexer::new(rendered.clone())).parse();

        prop_assert!(errors.is_empty(), "{:?} while parsing {}", errors, rendered);
        prop_assert_eq!(reparsed, program);
    }
}
