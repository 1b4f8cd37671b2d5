mod common;

use chatjinja::ast::*;
use chatjinja::{ErrorKind, Value};
use similar_asserts::assert_eq;

use common::*;

#[test]
fn test_truthy_and_or() {
    // {{ 0 or 'x' }}
    assert_eq!(render(vec![emit(binop(BinOpKind::ScOr, lit(0), lit("x")))]), "x");
    // {{ [] or 'x' }}
    assert_eq!(
        render(vec![emit(binop(BinOpKind::ScOr, list(vec![]), lit("x")))]),
        "x"
    );
    // {{ 'y' and 'z' }}
    assert_eq!(
        render(vec![emit(binop(BinOpKind::ScAnd, lit("y"), lit("z")))]),
        "z"
    );
    // the right side must not run when short-circuited
    assert_eq!(
        render(vec![emit(binop(
            BinOpKind::ScAnd,
            lit(0),
            call(var("raise_exception"), vec![lit("boom")]),
        ))]),
        "0"
    );
}

#[test]
fn test_undefined_lookup() {
    assert_eq!(
        render(vec![emit(is_test(var("missing"), "defined", vec![], false))]),
        "false"
    );
    assert_eq!(
        render(vec![emit(binop(BinOpKind::ScOr, var("missing"), lit("fb")))]),
        "fb"
    );
    // undefined emits nothing
    assert_eq!(render(vec![text("a"), emit(var("missing")), text("b")]), "ab");
}

#[test]
fn test_if_elif_else() {
    let tmpl = |n: i64| {
        vec![if_stmt(
            binop(BinOpKind::Eq, lit(n), lit(1)),
            vec![text("one")],
            vec![if_stmt(
                binop(BinOpKind::Eq, lit(n), lit(2)),
                vec![text("two")],
                vec![text("many")],
            )],
        )]
    };
    assert_eq!(render(tmpl(1)), "one");
    assert_eq!(render(tmpl(2)), "two");
    assert_eq!(render(tmpl(5)), "many");
}

#[test]
fn test_for_with_else() {
    let tmpl = vec![for_stmt(
        var("x"),
        var("xs"),
        vec![emit(var("x"))],
        vec![text("none")],
    )];

    let env = fresh_env();
    env.set("xs", Vec::<i64>::new());
    assert_eq!(render_with(env, tmpl.clone()).unwrap(), "none");

    let env = fresh_env();
    env.set("xs", vec![1, 2]);
    assert_eq!(render_with(env, tmpl).unwrap(), "12");
}

#[test]
fn test_for_loop_metadata() {
    // {{ loop.index }}:{{ loop.revindex0 }};
    let env = fresh_env();
    env.set("xs", vec![10, 20, 30]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![
                emit(getattr(var("loop"), "index")),
                text(":"),
                emit(getattr(var("loop"), "revindex0")),
                text(";"),
            ],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "1:2;2:1;3:0;");

    // index0 + revindex0 + 1 == length at every iteration
    let env = fresh_env();
    env.set("xs", vec![10, 20, 30]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![emit(binop(
                BinOpKind::Eq,
                binop(
                    BinOpKind::Add,
                    binop(
                        BinOpKind::Add,
                        getattr(var("loop"), "index0"),
                        getattr(var("loop"), "revindex0"),
                    ),
                    lit(1),
                ),
                getattr(var("loop"), "length"),
            ))],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "truetruetrue");
}

#[test]
fn test_for_previtem_nextitem() {
    let env = fresh_env();
    env.set("xs", vec![1, 2]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![
                emit(getattr(var("loop"), "previtem")),
                text("<"),
                emit(var("x")),
                text(">"),
                emit(getattr(var("loop"), "nextitem")),
                text(";"),
            ],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "<1>2;1<2>;");
}

#[test]
fn test_for_loop_cycle() {
    let env = fresh_env();
    env.set("xs", vec![1, 2, 3]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![emit(call(
                getattr(var("loop"), "cycle"),
                vec![lit("a"), lit("b")],
            ))],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "aba");
}

#[test]
fn test_for_destructuring() {
    let env = fresh_env();
    env.set("items", serde_json::json!([["a", 1], ["b", 2]]));
    let rv = render_with(
        env,
        vec![for_stmt(
            tuple(vec![var("k"), var("v")]),
            var("items"),
            vec![emit(var("k")), text("="), emit(var("v")), text(";")],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "a=1;b=2;");
}

#[test]
fn test_for_destructuring_arity_mismatch() {
    let env = fresh_env();
    env.set("items", serde_json::json!([["a", 1, 2]]));
    let err = render_with(
        env,
        vec![for_stmt(
            tuple(vec![var("k"), var("v")]),
            var("items"),
            vec![],
            vec![],
        )],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CannotUnpack);
}

#[test]
fn test_for_over_object_keys() {
    let env = fresh_env();
    env.set("data", serde_json::json!({"b": 1, "a": 2}));
    let rv = render_with(
        env,
        vec![for_stmt(var("k"), var("data"), vec![emit(var("k"))], vec![])],
    )
    .unwrap();
    assert_eq!(rv, "ba");
}

#[test]
fn test_for_over_string_code_points() {
    let rv = render(vec![for_stmt(
        var("c"),
        lit("héllo"),
        vec![emit(var("c")), text(".")],
        vec![],
    )]);
    assert_eq!(rv, "h.é.l.l.o.");
}

#[test]
fn test_for_with_inline_condition() {
    // {% for x in xs if x % 2 == 1 %}{{ x }}{% endfor %}
    let env = fresh_env();
    env.set("xs", vec![1, 2, 3, 4, 5]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            ternary(
                binop(
                    BinOpKind::Eq,
                    binop(BinOpKind::Rem, var("x"), lit(2)),
                    lit(1),
                ),
                var("xs"),
                None,
            ),
            vec![emit(var("x"))],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "135");

    // the filtered loop still sees the full length
    let env = fresh_env();
    env.set("xs", vec![1, 2, 3, 4, 5]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            ternary(
                binop(
                    BinOpKind::Eq,
                    binop(BinOpKind::Rem, var("x"), lit(2)),
                    lit(1),
                ),
                var("xs"),
                None,
            ),
            vec![emit(getattr(var("loop"), "length")), text(";")],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "3;3;3;");
}

#[test]
fn test_break_and_continue() {
    let env = fresh_env();
    env.set("xs", vec![1, 2, 3, 4]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![
                if_stmt(
                    binop(BinOpKind::Eq, var("x"), lit(3)),
                    vec![Stmt::Break],
                    vec![],
                ),
                emit(var("x")),
            ],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "12");

    let env = fresh_env();
    env.set("xs", vec![1, 2, 3, 4]);
    let rv = render_with(
        env,
        vec![for_stmt(
            var("x"),
            var("xs"),
            vec![
                if_stmt(
                    binop(BinOpKind::Eq, var("x"), lit(2)),
                    vec![Stmt::Continue],
                    vec![],
                ),
                emit(var("x")),
            ],
            vec![],
        )],
    )
    .unwrap();
    assert_eq!(rv, "134");
}

#[test]
fn test_break_outside_loop_is_error() {
    let err = render_with(fresh_env(), vec![Stmt::Break]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
}

#[test]
fn test_set_and_scoping() {
    // {% set x = 1 %}{% for i in [1] %}{% set x = 2 %}{{ x }}{% endfor %}{{ x }}
    let rv = render(vec![
        set_stmt(var("x"), lit(1)),
        for_stmt(
            var("i"),
            list(vec![lit(1)]),
            vec![set_stmt(var("x"), lit(2)), emit(var("x"))],
            vec![],
        ),
        emit(var("x")),
    ]);
    assert_eq!(rv, "21");
}

#[test]
fn test_set_destructuring() {
    let rv = render(vec![
        set_stmt(
            tuple(vec![var("a"), var("b")]),
            list(vec![lit("x"), lit("y")]),
        ),
        emit(var("b")),
        emit(var("a")),
    ]);
    assert_eq!(rv, "yx");
}

#[test]
fn test_set_block_form() {
    // {% set x %}ab{{ 1 }}{% endset %}{{ x }}
    let rv = render(vec![
        set_block(var("x"), vec![text("ab"), emit(lit(1))]),
        emit(var("x")),
    ]);
    assert_eq!(rv, "ab1");
}

#[test]
fn test_set_member_through_namespace() {
    // {% set ns = namespace() %}{% set ns.count = 0 %}
    // {% for x in xs %}{% set ns.count = ns.count + x %}{% endfor %}{{ ns.count }}
    let env = fresh_env();
    env.set("xs", vec![1, 2, 3]);
    let rv = render_with(
        env,
        vec![
            set_stmt(var("ns"), call(var("namespace"), vec![])),
            set_stmt(getattr(var("ns"), "count"), lit(0)),
            for_stmt(
                var("x"),
                var("xs"),
                vec![set_stmt(
                    getattr(var("ns"), "count"),
                    binop(BinOpKind::Add, getattr(var("ns"), "count"), var("x")),
                )],
                vec![],
            ),
            emit(getattr(var("ns"), "count")),
        ],
    )
    .unwrap();
    assert_eq!(rv, "6");
}

#[test]
fn test_set_member_on_non_object_fails() {
    let err = render_with(
        fresh_env(),
        vec![
            set_stmt(var("x"), lit(1)),
            set_stmt(getattr(var("x"), "y"), lit(2)),
        ],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_macro_defaults_and_caller() {
    // {% macro m(a, b=2) %}{{ a }}-{{ b }}-{{ caller() }}{% endmacro %}
    // {% call m(1) %}hi{% endcall %}
    let rv = render(vec![
        macro_stmt(
            "m",
            vec![var("a"), kwarg("b", lit(2))],
            vec![
                emit(var("a")),
                text("-"),
                emit(var("b")),
                text("-"),
                emit(call(var("caller"), vec![])),
            ],
        ),
        Stmt::CallBlock(Box::new(CallBlock {
            call: Call {
                expr: var("m"),
                args: vec![lit(1)],
            },
            caller_args: vec![],
            body: vec![text("hi")],
        })),
    ]);
    assert_eq!(rv, "1-2-hi");
}

#[test]
fn test_macro_keyword_invocation() {
    let tmpl = |args: Vec<Expr>| {
        vec![
            macro_stmt(
                "greet",
                vec![var("name"), kwarg("punct", lit("!"))],
                vec![text("Hi "), emit(var("name")), emit(var("punct"))],
            ),
            emit(call(var("greet"), args)),
        ]
    };
    assert_eq!(render(tmpl(vec![kwarg("name", lit("Ann"))])), "Hi Ann!");
    assert_eq!(
        render(tmpl(vec![lit("Bo"), kwarg("punct", lit("?"))])),
        "Hi Bo?"
    );

    let err = render_with(fresh_env(), tmpl(vec![])).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingArgument);
}

#[test]
fn test_macro_sees_call_site_scope() {
    // macros resolve free names against the scope of the call, not of
    // the definition
    let rv = render(vec![
        macro_stmt("show", vec![], vec![emit(var("who"))]),
        set_stmt(var("who"), lit("late-bound")),
        emit(call(var("show"), vec![])),
    ]);
    assert_eq!(rv, "late-bound");
}

#[test]
fn test_caller_with_parameters() {
    // {% call(item) render_list(xs) %}*{{ item }}{% endcall %}
    let env = fresh_env();
    env.set("xs", vec![1, 2]);
    let rv = render_with(
        env,
        vec![
            macro_stmt(
                "render_list",
                vec![var("items")],
                vec![for_stmt(
                    var("it"),
                    var("items"),
                    vec![emit(call(var("caller"), vec![var("it")]))],
                    vec![],
                )],
            ),
            Stmt::CallBlock(Box::new(CallBlock {
                call: Call {
                    expr: var("render_list"),
                    args: vec![var("xs")],
                },
                caller_args: vec![var("item")],
                body: vec![text("*"), emit(var("item"))],
            })),
        ],
    )
    .unwrap();
    assert_eq!(rv, "*1*2");
}

#[test]
fn test_filter_block() {
    // {% filter upper %}ab{{ 'c' }}{% endfilter %}
    let rv = render(vec![Stmt::FilterBlock(Box::new(FilterBlock {
        name: "upper".into(),
        args: vec![],
        body: vec![text("ab"), emit(lit("c"))],
    }))]);
    assert_eq!(rv, "ABC");
}

#[test]
fn test_slicing() {
    // {{ "abcde"[::-1] }}
    assert_eq!(
        render(vec![emit(slice(lit("abcde"), None, None, Some(lit(-1))))]),
        "edcba"
    );
    // {{ [1,2,3,4][1:3] | join }}
    assert_eq!(
        render(vec![emit(filter(
            slice(
                list(vec![lit(1), lit(2), lit(3), lit(4)]),
                Some(lit(1)),
                Some(lit(3)),
                None,
            ),
            "join",
            vec![],
        ))]),
        "23"
    );
    // s[:i] ~ s[i:] == s
    assert_eq!(
        render(vec![emit(binop(
            BinOpKind::Concat,
            slice(lit("héllo"), None, Some(lit(2)), None),
            slice(lit("héllo"), Some(lit(2)), None, None),
        ))]),
        "héllo"
    );
}

#[test]
fn test_arithmetic_and_comparisons() {
    assert_eq!(render(vec![emit(binop(BinOpKind::Add, lit(2), lit(3)))]), "5");
    assert_eq!(
        render(vec![emit(binop(BinOpKind::Div, lit(7), lit(2)))]),
        "3.5"
    );
    assert_eq!(render(vec![emit(binop(BinOpKind::Rem, lit(7), lit(2)))]), "1");
    assert_eq!(
        render(vec![emit(binop(BinOpKind::Lt, lit(1), lit(2.5)))]),
        "true"
    );
    // string concatenation via +
    assert_eq!(
        render(vec![emit(binop(BinOpKind::Add, lit("a"), lit(1)))]),
        "a1"
    );
    // array concatenation via +
    assert_eq!(
        render(vec![emit(filter(
            binop(
                BinOpKind::Add,
                list(vec![lit(1)]),
                list(vec![lit(2), lit(3)]),
            ),
            "join",
            vec![],
        ))]),
        "123"
    );
}

#[test]
fn test_concat_operator() {
    assert_eq!(
        render(vec![emit(binop(BinOpKind::Concat, lit(1), lit("a")))]),
        "1a"
    );
    // none does not participate in operators, concatenation included
    let err = render_with(
        fresh_env(),
        vec![emit(binop(BinOpKind::Concat, lit("a"), var("none")))],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_containment() {
    assert_eq!(
        render(vec![emit(binop(
            BinOpKind::In,
            lit("a"),
            list(vec![lit("a"), lit("b")]),
        ))]),
        "true"
    );
    assert_eq!(
        render(vec![emit(binop(BinOpKind::In, lit("ell"), lit("hello")))]),
        "true"
    );
    let env = fresh_env();
    env.set("data", serde_json::json!({"k": 1}));
    assert_eq!(
        render_with(
            env,
            vec![emit(binop(BinOpKind::In, lit("k"), var("data")))]
        )
        .unwrap(),
        "true"
    );
    // `x not in missing` holds
    assert_eq!(
        render(vec![emit(binop(BinOpKind::NotIn, lit("a"), var("missing")))]),
        "true"
    );
}

#[test]
fn test_ternary_and_select() {
    assert_eq!(
        render(vec![emit(ternary(lit(false), lit("x"), Some(lit("y"))))]),
        "y"
    );
    // the select form yields undefined (renders empty) when the test fails
    assert_eq!(
        render(vec![text("a"), emit(ternary(lit(false), lit("x"), None)), text("b")]),
        "ab"
    );
    // only the taken branch evaluates
    assert_eq!(
        render(vec![emit(ternary(
            lit(true),
            lit("ok"),
            Some(call(var("raise_exception"), vec![lit("boom")])),
        ))]),
        "ok"
    );
}

#[test]
fn test_tests_and_negation() {
    assert_eq!(
        render(vec![emit(is_test(lit(3), "odd", vec![], false))]),
        "true"
    );
    assert_eq!(
        render(vec![emit(is_test(lit(3), "even", vec![], true))]),
        "true"
    );
    assert_eq!(
        render(vec![emit(is_test(lit(1), "eq", vec![lit(1.0)], false))]),
        "true"
    );
    let err = render_with(
        fresh_env(),
        vec![emit(is_test(lit(1), "nonsense", vec![], false))],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownTest);
}

#[test]
fn test_member_access() {
    let env = fresh_env();
    env.set("user", serde_json::json!({"name": "Ann", "tags": ["a", "b"]}));
    let rv = render_with(
        env,
        vec![
            emit(getattr(var("user"), "name")),
            text(":"),
            emit(getitem(getattr(var("user"), "tags"), lit(-1))),
            // missing members render empty, they never fail
            emit(getattr(var("user"), "missing")),
        ],
    )
    .unwrap();
    assert_eq!(rv, "Ann:b");
}

#[test]
fn test_builtin_method_through_member_call() {
    // {{ "hello world".title() }} and {{ msg.upper() }}
    assert_eq!(
        render(vec![emit(call(getattr(lit("hello world"), "title"), vec![]))]),
        "Hello World"
    );
    let env = fresh_env();
    env.set("msg", "abc");
    assert_eq!(
        render_with(env, vec![emit(call(getattr(var("msg"), "upper"), vec![]))]).unwrap(),
        "ABC"
    );
    // length is an attribute, not a call
    assert_eq!(render(vec![emit(getattr(lit("héllo"), "length"))]), "5");
}

#[test]
fn test_call_spread_and_kwargs() {
    // {{ range(*[1, 4]) | join(",") }}
    assert_eq!(
        render(vec![emit(filter(
            call(var("range"), vec![spread(list(vec![lit(1), lit(4)]))]),
            "join",
            vec![lit(",")],
        ))]),
        "1,2,3"
    );

    let err = render_with(
        fresh_env(),
        vec![emit(call(
            var("range"),
            vec![kwarg("stop", lit(3)), lit(1)],
        ))],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArguments);
}

#[test]
fn test_calling_non_function_fails() {
    let err = render_with(fresh_env(), vec![emit(call(lit(1), vec![]))]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[test]
fn test_raise_exception_aborts() {
    let err = render_with(
        fresh_env(),
        vec![
            text("before"),
            emit(call(var("raise_exception"), vec![lit("nope")])),
        ],
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RaisedException);
    assert_eq!(err.to_string(), "exception raised: nope");
}

#[test]
fn test_comment_produces_nothing() {
    assert_eq!(render(vec![text("a"), Stmt::Comment, text("b")]), "ab");
}

#[test]
fn test_run_returns_string_value() {
    let env = fresh_env();
    let interpreter = chatjinja::Interpreter::new(Some(env));
    let rv = interpreter
        .run(&program(vec![emit(lit(42))]))
        .unwrap();
    assert_eq!(rv, Value::from("42"));
}
