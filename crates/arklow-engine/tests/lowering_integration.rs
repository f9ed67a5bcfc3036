//! End-to-end lowering tests: source text in, method bodies out

use arklow_engine::ir::signature::{DEFAULT_CLASS, DEFAULT_METHOD};
use arklow_engine::ir::{LocalKind, MarkerKind, MethodBody, Reference, StmtKind, Type, Value};
use arklow_engine::{lower_source, ArklowConfig, FileModel, PrettyPrint, SourceFile};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn config(origin_text: bool) -> ArklowConfig {
    let mut config = ArklowConfig::default();
    config.lower.jobs = 1;
    config.lower.origin_text = origin_text;
    config
}

fn lower(source: &str) -> FileModel {
    lower_source(&SourceFile::new("main.ets", source), &config(false)).unwrap()
}

fn main_body(model: &FileModel) -> &MethodBody {
    model.body(DEFAULT_CLASS, DEFAULT_METHOD).unwrap()
}

fn lines(body: &MethodBody) -> Vec<String> {
    body.stmts
        .iter()
        .filter(|stmt| {
            !matches!(
                &stmt.kind,
                StmtKind::Assign {
                    right: Value::Ref(Reference::This { .. }),
                    ..
                }
            )
        })
        .map(|stmt| stmt.to_string())
        .collect()
}

const PROGRAM: &str = r#"
type Score = number;

class Account {
    static count: number = 0;
    owner: string;
    balance: number = 0;

    constructor(owner: string) {
        this.owner = owner;
        Account.count++;
    }

    deposit(amount: number): number {
        if (amount <= 0) {
            throw new Error(`bad amount ${amount}`);
        }
        this.balance += amount;
        return this.balance;
    }

    get label(): string {
        return this.balance > 100 ? `${this.owner}*` : this.owner;
    }
}

function total(accounts: Account[]): number {
    let sum = 0;
    for (const account of accounts) {
        sum += account.balance;
    }
    const fees = accounts.map((a) => a.balance * 0.01);
    let i = 0;
    while (i < fees.length) {
        sum -= fees[i++];
    }
    return sum;
}

async function load(name: string) {
    const response = await fetch(name);
    return response;
}

let accounts = [new Account("ann"), new Account("bob")];
accounts[0].deposit(50);
const summary = { total: total(accounts), size: accounts.length };
"#;

// ============================================================================
// Whole programs
// ============================================================================

#[test]
fn test_program_lowers_without_failures() {
    let model = lower(PROGRAM);
    assert!(model.failures.is_empty(), "failures: {:?}", model.failures);

    let mut lowered = 0;
    for method in model.methods() {
        let body = method
            .body
            .as_ref()
            .unwrap_or_else(|| panic!("{} has no body", method.signature));
        if let Err(message) = body.validate() {
            panic!("{} is not three-address: {}", method.signature, message);
        }
        lowered += 1;
    }
    assert!(lowered >= 9);
}

#[test]
fn test_program_model_shape() {
    let model = lower(PROGRAM);

    let account = model.class("Account").unwrap();
    for method in ["constructor", "deposit", "%get-label", "%instInit", "%statInit"] {
        assert!(account.method(method).is_some(), "missing Account.{}", method);
    }
    assert!(account.fields.iter().any(|f| f.name == "count" && f.is_static));

    let defaults = model.default_class().unwrap();
    for method in [DEFAULT_METHOD, "total", "load", "%AM0$total"] {
        assert!(defaults.method(method).is_some(), "missing %dflt.{}", method);
    }
    assert!(defaults.method("load").unwrap().is_async);
    assert!(model.class("%AC0$%dflt").is_some());
}

#[test]
fn test_parallel_lowering_is_deterministic() {
    let source = SourceFile::new("main.ets", PROGRAM);
    let mut parallel = config(true);
    parallel.lower.jobs = 8;
    let expected = lower_source(&source, &config(true)).unwrap().pretty_print();
    for _ in 0..4 {
        let model = lower_source(&source, &parallel).unwrap();
        assert_eq!(model.pretty_print(), expected);
    }
}

#[test]
fn test_async_return_type_is_promise() {
    let model = lower("async function ping() { return 1; }\nasync function idle() {}");
    assert_eq!(
        model.function_body("ping").unwrap().return_type,
        Type::promise(Type::Number)
    );
    assert_eq!(
        model.function_body("idle").unwrap().return_type,
        Type::promise(Type::Void)
    );
}

// ============================================================================
// Statement groups
// ============================================================================

#[test]
fn test_markers_unique_per_method() {
    let model = lower(
        r#"
        let n = 0;
        while (n < 10) { n = n > 5 ? n + 2 : n + 1; }
        for (let k = 0; k < 3; k++) { n = k ? n : 0; }
        "#,
    );
    let body = main_body(&model);
    assert!(body.validate().is_ok());

    let markers: Vec<_> = body.stmts.iter().filter_map(|stmt| stmt.marker()).collect();
    let loops: Vec<u32> = markers
        .iter()
        .filter(|m| m.kind == MarkerKind::LoopInit)
        .map(|m| m.index)
        .collect();
    let ternaries: Vec<u32> = markers
        .iter()
        .filter(|m| m.kind == MarkerKind::TernaryTrue)
        .map(|m| m.index)
        .collect();
    assert_eq!(loops, vec![0, 1]);
    assert_eq!(ternaries, vec![0, 1]);
}

#[test]
fn test_origin_text_on_first_statement() {
    let source = SourceFile::new("main.ets", "let x = a.b + 1;\nfoo(x);\n");
    let model = lower_source(&source, &config(true)).unwrap();
    let body = main_body(&model);

    let tagged: Vec<_> = body
        .stmts
        .iter()
        .filter_map(|stmt| stmt.origin.as_ref().map(|origin| (stmt.to_string(), origin)))
        .collect();
    assert_eq!(tagged.len(), 2);
    assert_eq!(tagged[0].0, "%0 = a.b");
    assert!(tagged[0].1.text.contains("x = a.b + 1"));
    assert_eq!(tagged[0].1.line, 1);
    assert!(tagged[1].0.starts_with("staticinvoke"));
    assert!(tagged[1].1.text.contains("foo(x)"));
    assert_eq!(tagged[1].1.line, 2);
}

#[test]
fn test_positions_cover_operands() {
    let model = lower("let y = a + b;");
    let body = main_body(&model);
    let stmt = body.stmts.last().unwrap();
    assert_eq!(stmt.to_string(), "y = a + b");
    // y, the sum, then one per operand
    assert_eq!(stmt.positions.len(), 4);
    assert!(stmt.positions.iter().all(|p| p.line == 1));
    assert_eq!(stmt.positions[2].column, 9);
    assert_eq!(stmt.positions[3].column, 13);
}

#[test]
fn test_failing_method_does_not_stop_the_file() {
    let model = lower("function bad() { 1 = 2; }\nfunction good() { return 1; }");
    assert_eq!(model.failures.len(), 1);
    assert!(model.failures[0].method.contains("bad"));
    assert!(model.function_body("bad").is_none());
    assert!(model.function_body("good").is_some());
}

// ============================================================================
// Properties
// ============================================================================

fn arithmetic() -> impl Strategy<Value = (String, usize)> {
    let leaf = prop_oneof![
        (0i64..100).prop_map(|n| (n.to_string(), 0)),
        prop::sample::select(vec!["a", "b", "c"]).prop_map(|name| (name.to_string(), 0)),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        (inner.clone(), prop::sample::select(vec!["+", "-", "*"]), inner).prop_map(
            |((left, left_ops), op, (right, right_ops))| {
                (format!("({} {} {})", left, op, right), left_ops + right_ops + 1)
            },
        )
    })
}

proptest! {
    #[test]
    fn prop_expressions_become_three_address((expr, ops) in arithmetic()) {
        let model = lower(&format!("let r = {};", expr));
        let body = main_body(&model);
        prop_assert!(body.validate().is_ok());

        let temps = body
            .locals
            .iter()
            .filter(|(_, info)| info.kind == LocalKind::Temp)
            .count();
        prop_assert_eq!(temps, ops.saturating_sub(1));

        let lines = lines(body);
        prop_assert_eq!(lines.len(), ops.max(1));
        let last = lines.last().unwrap();
        prop_assert!(last.starts_with("r = "));
    }
}

fn leaf() -> impl Strategy<Value = String> {
    prop_oneof![
        (0i64..100).prop_map(|n| n.to_string()),
        prop::sample::select(vec!["a", "b", "xs"]).prop_map(str::to_string),
        prop::sample::select(vec!["`s${a}`", "`${f(a)}-${b.p}`", "`n${xs[0]}t`"])
            .prop_map(str::to_string),
    ]
}

/// Expressions mixing every value shape that needs materialization.
fn expression() -> impl Strategy<Value = String> {
    leaf().prop_recursive(4, 48, 3, |inner| {
        prop_oneof![
            (
                inner.clone(),
                prop::sample::select(vec!["+", "*", "<", "===", "&&"]),
                inner.clone()
            )
                .prop_map(|(left, op, right)| format!("({} {} {})", left, op, right)),
            inner.clone().prop_map(|object| format!("({}).p", object)),
            (inner.clone(), inner.clone())
                .prop_map(|(object, index)| format!("({})[{}]", object, index)),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|args| format!("f({})", args.join(", "))),
            (inner.clone(), inner.clone())
                .prop_map(|(object, arg)| format!("({}).m({})", object, arg)),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(test, yes, no)| format!("({} ? {} : {})", test, yes, no)),
            (inner.clone(), inner.clone())
                .prop_map(|(first, second)| format!("[...xs, {}, {}]", first, second)),
            inner.prop_map(|value| format!("({{ k: {} }})", value)),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_mixed_expressions_become_three_address(
        value in expression(),
        index in expression(),
        delta in expression(),
    ) {
        let source = format!("let r = {};\na[{}] += {};", value, index, delta);
        let model = lower(&source);
        prop_assert!(model.failures.is_empty(), "{:?}", model.failures);
        for body in model.methods().filter_map(|method| method.body.as_ref()) {
            prop_assert!(body.validate().is_ok(), "{}", body.pretty_print());
        }

        let body = main_body(&model);
        let mut ternaries: Vec<u32> = body
            .stmts
            .iter()
            .filter_map(|stmt| stmt.marker())
            .filter(|marker| marker.kind == MarkerKind::TernaryTrue)
            .map(|marker| marker.index)
            .collect();
        ternaries.sort_unstable();
        let expected = (value.matches('?').count()
            + index.matches('?').count()
            + delta.matches('?').count()) as u32;
        prop_assert_eq!(ternaries, (0..expected).collect::<Vec<u32>>());
    }
}
