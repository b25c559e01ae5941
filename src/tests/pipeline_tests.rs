//! End-to-end behaviour of the propagation pipeline

use approx::assert_relative_eq;
use rustc_hash::FxHashMap;

use crate::evaluator::evaluate;
use crate::parser::{ParseOptions, parse};
use crate::{
    CollisionPolicy, DomainCheck, Expr, ParseError, PropagationError, Propagator, Request, Stage,
    SymbolTable, uncertainty_symbol,
};

fn real(value: &crate::NumericValue) -> f64 {
    value.as_real().expect("numeric result should be real")
}

#[test]
fn test_ohms_law_values_and_formula() {
    let request = Request::new("I*R", "I, R")
        .measure("I", "2", "0.1")
        .measure("R", "3", "0.2");
    let result = Propagator::new().propagate(&request).unwrap();

    assert_eq!(result.formula.function.to_string(), "I*R");
    assert_eq!(
        result.formula.error.to_string(),
        "sqrt((R*ΔI)^2 + (I*ΔR)^2)"
    );
    assert_eq!(real(&result.value), 6.0);
    assert_relative_eq!(real(&result.uncertainty), 0.5, epsilon = 1e-12);
}

#[test]
fn test_sqrt_of_negative_fails_before_square_root() {
    let request = Request::new("sqrt(x)", "x").measure("x", "-1", "0.1");
    let err = Propagator::new().propagate(&request).unwrap_err();
    match &err {
        PropagationError::Domain { check, value } => {
            assert_eq!(*check, DomainCheck::Variance);
            assert!(value.re < 0.0);
        }
        other => panic!("expected a domain error, got {:?}", other),
    }
    assert!(err.to_string().starts_with("[domain validation]"));
}

#[test]
fn test_zero_uncertainties_give_zero_error() {
    for function in ["I*R", "sin(x)*exp(y)", "x^y", "ln(x) + sqrt(y)", "x/y - 3"] {
        let vars = if function.contains('I') { "I, R" } else { "x, y" };
        let mut request = Request::new(function, vars);
        for name in vars.split(", ") {
            request = request.measure(name, "1.5", "0");
        }
        let result = Propagator::new().propagate(&request).unwrap();
        assert_eq!(real(&result.uncertainty), 0.0, "Δf of {} should be 0", function);
    }
}

#[test]
fn test_collision_rejected_by_default() {
    let request = Request::new("g*h", "g, h")
        .constants("g = 9.81")
        .measure("g", "9.8", "0.01")
        .measure("h", "2", "0.1");
    let err = Propagator::new().propagate(&request).unwrap_err();
    assert_eq!(err.stage(), Stage::Input);
    assert!(err.to_string().contains("'g'"));
}

#[test]
fn test_collision_variable_wins() {
    let request = Request::new("g*h", "g, h")
        .constants("g = 9.81")
        .measure("g", "10", "0.5")
        .measure("h", "2", "0");
    let result = Propagator::new()
        .collision_policy(CollisionPolicy::VariableWins)
        .propagate(&request)
        .unwrap();

    // g is still differentiated and takes its measured value
    assert!(result.constants.is_empty());
    assert_eq!(result.formula.partials.len(), 2);
    assert_eq!(real(&result.value), 20.0);
    assert_relative_eq!(real(&result.uncertainty), 1.0, epsilon = 1e-12);
}

#[test]
fn test_empty_variable_list_fails_before_parsing() {
    // The function is unparsable too; the variable list is reported first
    let request = Request::new("((", "  ");
    let err = Propagator::new().propagate(&request).unwrap_err();
    assert!(matches!(err, PropagationError::Syntax { .. }));
}

#[test]
fn test_formula_round_trip() {
    let cases = [
        ("I*R", "I, R", vec![("I", 2.0, 0.1), ("R", 3.0, 0.2)]),
        ("x^2*sin(y)", "x, y", vec![("x", 1.3, 0.05), ("y", 0.4, 0.02)]),
        ("a/(b + c)", "a b c", vec![("a", 5.0, 0.1), ("b", 1.0, 0.3), ("c", 2.0, 0.1)]),
        ("exp(-t/tau)", "t, tau", vec![("t", 2.0, 0.1), ("tau", 4.0, 0.5)]),
    ];

    for (function, variables, values) in cases {
        let mut request = Request::new(function, variables);
        let mut bindings = FxHashMap::default();
        for (name, v, u) in &values {
            request = request.measure(*name, v.to_string(), u.to_string());
            bindings.insert(name.to_string(), *v);
            bindings.insert(uncertainty_symbol(name), *u);
        }
        let result = Propagator::new().propagate(&request).unwrap();

        // Σ (∂f/∂xᵢ σᵢ)², computed term by term
        let direct: f64 = result
            .formula
            .partials
            .iter()
            .zip(&values)
            .map(|(partial, (_, _, u))| {
                let p = evaluate(partial, &bindings).unwrap().re;
                (p * u).powi(2)
            })
            .sum::<f64>()
            .sqrt();

        assert_relative_eq!(real(&result.uncertainty), direct, max_relative = 1e-12);
    }
}

#[test]
fn test_formula_is_quadrature_of_partials() {
    let mut table = SymbolTable::new();
    table.declare_variable("x").unwrap();
    table.declare_variable("y").unwrap();
    let f = parse("x*y^2 + sin(x)", &table, &ParseOptions::default()).unwrap();

    let vars = vec!["x".to_string(), "y".to_string()];
    let formula = crate::ErrorFormula::build(&f, &vars, false).unwrap();

    let expected = Expr::func(
        "sqrt",
        Expr::sum(vars.iter().map(|v| {
            Expr::square(f.derive(v).unwrap() * Expr::symbol(uncertainty_symbol(v)))
        })),
    );

    let bindings: FxHashMap<String, f64> = [
        ("x", 0.7),
        ("y", -1.2),
        ("Δx", 0.03),
        ("Δy", 0.11),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let got = evaluate(&formula.error, &bindings).unwrap();
    let want = evaluate(&expected, &bindings).unwrap();
    assert_relative_eq!(got.re, want.re, max_relative = 1e-12);
    assert!(got.im.abs() < 1e-15);
}

#[test]
fn test_undeclared_symbol_is_parse_error() {
    let request = Request::new("k*x", "x").measure("x", "1", "0.1");
    let err = Propagator::new().propagate(&request).unwrap_err();
    assert_eq!(
        err,
        PropagationError::Parse(ParseError::UndeclaredSymbols {
            names: vec!["k".to_string()]
        })
    );
}

#[test]
fn test_unknown_function_is_parse_error() {
    let request = Request::new("foo(x)", "x").measure("x", "1", "0.1");
    let err = Propagator::new().propagate(&request).unwrap_err();
    assert!(matches!(
        err,
        PropagationError::Parse(ParseError::UnknownFunction { ref name, .. }) if name == "foo"
    ));
}

#[test]
fn test_constants_and_builtins() {
    let request = Request::new("pi*r^2*k", "r")
        .constants("k = 2")
        .measure("r", "1", "0.1");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.value), 2.0 * std::f64::consts::PI);
    // Δf = 2πkr Δr
    assert_relative_eq!(
        real(&result.uncertainty),
        0.4 * std::f64::consts::PI,
        max_relative = 1e-12
    );
}

#[test]
fn test_user_constant_shadows_builtin() {
    let request = Request::new("e*x", "x")
        .constants("e = 1.602e-19")
        .measure("x", "2", "0");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.value), 3.204e-19, max_relative = 1e-12);
}

#[test]
fn test_log_is_natural_logarithm() {
    let request = Request::new("log(x)", "x").measure("x", "2", "0.2");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.value), std::f64::consts::LN_2);
    assert_relative_eq!(real(&result.uncertainty), 0.1, max_relative = 1e-12);
}

#[test]
fn test_implicit_multiplication_toggle() {
    let request = Request::new("2x", "x").measure("x", "3", "0.5");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_eq!(real(&result.value), 6.0);
    assert_relative_eq!(real(&result.uncertainty), 1.0, epsilon = 1e-12);

    let err = Propagator::new()
        .implicit_multiplication(false)
        .propagate(&request)
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Parse);
}

#[test]
fn test_negative_uncertainty_is_squared() {
    let request = Request::new("3*x", "x").measure("x", "1", "-0.5");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.uncertainty), 1.5, epsilon = 1e-12);
}

#[test]
fn test_measurement_expressions() {
    let request = Request::new("x", "x")
        .constants("N = 6.022*10**23")
        .measure("x", "N/2", "1e21");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.value), 3.011e23, max_relative = 1e-12);
    assert_relative_eq!(real(&result.uncertainty), 1e21, max_relative = 1e-12);
}

#[test]
fn test_relative_uncertainty_needs_nonzero_value() {
    let request = Request::new("x - 1", "x").measure("x", "1", "0.1");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_eq!(real(&result.value), 0.0);
    assert_eq!(result.relative, None);
}

#[test]
fn test_tiny_coefficient_is_not_dropped() {
    let request = Request::new("6.67e-11*m", "m").measure("m", "1", "0.1");
    let result = Propagator::new().propagate(&request).unwrap();
    assert_relative_eq!(real(&result.value), 6.67e-11, max_relative = 1e-12);
    assert_relative_eq!(real(&result.uncertainty), 6.67e-12, max_relative = 1e-12);
}

#[test]
fn test_tiny_coefficient_without_simplification() {
    // Δf = 3.14e-15 * 2x * Δx
    let request = Request::new("3.14e-15*x^2", "x").measure("x", "2", "0.1");
    for simplify in [false, true] {
        let result = Propagator::new()
            .simplify(simplify)
            .propagate(&request)
            .unwrap();
        assert_relative_eq!(real(&result.uncertainty), 1.256e-15, max_relative = 1e-12);
    }
}

#[test]
fn test_long_sum_is_rejected_at_parse_time() {
    let function = vec!["x"; 3000].join(" + ");
    let request = Request::new(function, "x").measure("x", "1", "0.1");
    let err = Propagator::new().propagate(&request).unwrap_err();
    assert_eq!(err, PropagationError::Parse(ParseError::MaxDepthExceeded));
}
