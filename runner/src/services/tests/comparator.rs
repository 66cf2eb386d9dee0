//! StructuralComparator tests

use shared::{ErrorValue, Value};

use crate::services::comparator::line_diff;
use crate::services::StructuralComparator;
use crate::traits::Comparator;

#[test]
fn test_equal_structures() {
    let comparator = StructuralComparator::new();
    let a = Value::object([("list", Value::array([1, 2])), ("name", Value::from("x"))]);
    let b = Value::object([("list", Value::array([1, 2])), ("name", Value::from("x"))]);

    let comparison = comparator.compare(&a, &b);
    assert!(comparison.equal);
    assert!(comparison.diff.is_none());
}

#[test]
fn test_number_identity_semantics() {
    let comparator = StructuralComparator::new();
    assert!(comparator.compare(&Value::from(f64::NAN), &Value::from(f64::NAN)).equal);
    assert!(!comparator.compare(&Value::from(0.0), &Value::from(-0.0)).equal);
}

#[test]
fn test_errors_compare_by_shape() {
    let comparator = StructuralComparator::new();
    let a = ErrorValue::new("TypeError", "x").into_value();
    let b = ErrorValue::new("TypeError", "x").into_value();
    let c = ErrorValue::new("RangeError", "x").into_value();
    assert!(comparator.compare(&a, &b).equal);
    assert!(!comparator.compare(&a, &c).equal);
}

#[test]
fn test_diff_marks_changed_lines() {
    let comparator = StructuralComparator::new();
    let actual = Value::array([1, 3]);
    let expected = Value::array([1, 2]);

    let diff = comparator.compare(&actual, &expected).diff.unwrap();
    assert!(diff.contains("-  2,"), "diff was:\n{diff}");
    assert!(diff.contains("+  3,"), "diff was:\n{diff}");
    assert!(diff.contains("   1,"), "diff was:\n{diff}");
}

#[test]
fn test_line_diff_of_scalars() {
    assert_eq!(line_diff("1", "2"), "-1\n+2");
}
