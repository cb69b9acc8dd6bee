//! Property-based checks of compiled arithmetic against native i32 math.

mod common;

use common::run;
use proptest::prelude::*;

/// Operands that are valid integer literals (the lexer has no negative
/// literals, so negatives go through prefix `-`)
fn arb_operand() -> impl Strategy<Value = i32> {
    -1_000_000i32..1_000_000i32
}

fn lit(v: i32) -> String {
    if v < 0 {
        format!("(-{})", v.unsigned_abs())
    } else {
        v.to_string()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn integer_ops_wrap_like_i32(a in arb_operand(), b in arb_operand()) {
        let source = format!(
            "a = {}; b = {}; print(a + b); print(a - b); print(a * b);",
            lit(a),
            lit(b)
        );
        let expected = format!(
            "{}\n{}\n{}\n",
            a.wrapping_add(b),
            a.wrapping_sub(b),
            a.wrapping_mul(b)
        );
        prop_assert_eq!(run(&source), expected);
    }

    #[test]
    fn division_truncates(a in arb_operand(), b in arb_operand().prop_filter("non-zero", |b| *b != 0)) {
        let source = format!("print({} / {}); print({} % {});", lit(a), lit(b), lit(a), lit(b));
        prop_assert_eq!(run(&source), format!("{}\n{}\n", a / b, a % b));
    }

    #[test]
    fn multiplication_binds_tighter(a in arb_operand(), b in arb_operand(), c in arb_operand()) {
        let source = format!("print({} + {} * {});", lit(a), lit(b), lit(c));
        prop_assert_eq!(run(&source), format!("{}\n", a.wrapping_add(b.wrapping_mul(c))));
    }

    #[test]
    fn comparisons_match(a in arb_operand(), b in arb_operand()) {
        let source = format!(
            "a = {}; b = {}; print(a < b); print(a >= b); print(a == b);",
            lit(a),
            lit(b)
        );
        let expected = format!("{}\n{}\n{}\n", (a < b) as i32, (a >= b) as i32, (a == b) as i32);
        prop_assert_eq!(run(&source), expected);
    }
}
