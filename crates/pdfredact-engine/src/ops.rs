//! Operand access for content-stream operations.
//!
//! Missing or mistyped required operands are fatal: once an operator cannot
//! be interpreted, the output stream position can no longer be trusted, so
//! the whole conversion aborts with [`EngineError::MalformedOperator`].

use crate::error::EngineError;
use crate::show::ShowElement;
use lopdf::Object;
use lopdf::content::Operation;
use pdfredact_core::Ctm;

pub(crate) fn object_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

pub(crate) fn require_f64(op: &Operation, index: usize) -> Result<f64, EngineError> {
    op.operands
        .get(index)
        .and_then(object_f64)
        .ok_or_else(|| {
            EngineError::malformed(&op.operator, format!("expected number at operand {index}"))
        })
}

pub(crate) fn require_name(op: &Operation, index: usize) -> Result<String, EngineError> {
    match op.operands.get(index) {
        Some(Object::Name(name)) => Ok(String::from_utf8_lossy(name).into_owned()),
        _ => Err(EngineError::malformed(
            &op.operator,
            format!("expected name at operand {index}"),
        )),
    }
}

pub(crate) fn require_string(op: &Operation, index: usize) -> Result<Vec<u8>, EngineError> {
    match op.operands.get(index) {
        Some(Object::String(bytes, _)) => Ok(bytes.clone()),
        _ => Err(EngineError::malformed(
            &op.operator,
            format!("expected string at operand {index}"),
        )),
    }
}

/// Six numeric operands forming a matrix (cm, Tm).
pub(crate) fn require_matrix(op: &Operation) -> Result<Ctm, EngineError> {
    if op.operands.len() < 6 {
        return Err(EngineError::malformed(
            &op.operator,
            format!("expected 6 operands, found {}", op.operands.len()),
        ));
    }
    let mut values = [0.0f64; 6];
    for (i, slot) in values.iter_mut().enumerate() {
        *slot = require_f64(op, i)?;
    }
    Ok(Ctm::new(
        values[0], values[1], values[2], values[3], values[4], values[5],
    ))
}

/// The TJ operand array, decomposed into show elements. Non-string,
/// non-numeric entries are malformed.
pub(crate) fn tj_elements(op: &Operation) -> Result<Vec<ShowElement>, EngineError> {
    let array = match op.operands.first() {
        Some(Object::Array(array)) => array,
        _ => {
            return Err(EngineError::malformed(
                &op.operator,
                "expected array operand",
            ));
        }
    };
    array
        .iter()
        .map(|obj| match obj {
            Object::String(bytes, _) => Ok(ShowElement::Text(bytes.clone())),
            Object::Integer(i) => Ok(ShowElement::Adjustment(*i as f64)),
            Object::Real(f) => Ok(ShowElement::Adjustment(f64::from(*f))),
            other => Err(EngineError::malformed(
                &op.operator,
                format!("unexpected element in array: {other:?}"),
            )),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    #[test]
    fn require_f64_accepts_integer_and_real() {
        let op = Operation::new("Td", vec![Object::Integer(10), Object::Real(2.5)]);
        assert_eq!(require_f64(&op, 0).unwrap(), 10.0);
        assert_eq!(require_f64(&op, 1).unwrap(), 2.5);
    }

    #[test]
    fn require_f64_missing_operand_is_malformed() {
        let op = Operation::new("Td", vec![Object::Integer(10)]);
        let err = require_f64(&op, 1).unwrap_err();
        assert!(matches!(err, EngineError::MalformedOperator { .. }));
        assert!(err.to_string().contains("Td"));
    }

    #[test]
    fn require_name_rejects_string() {
        let op = Operation::new(
            "Do",
            vec![Object::String(b"Im0".to_vec(), StringFormat::Literal)],
        );
        assert!(require_name(&op, 0).is_err());

        let op = Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]);
        assert_eq!(require_name(&op, 0).unwrap(), "Im0");
    }

    #[test]
    fn require_matrix_needs_six_numbers() {
        let op = Operation::new(
            "cm",
            vec![
                Object::Integer(1),
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(1),
                Object::Integer(100),
                Object::Integer(200),
            ],
        );
        let m = require_matrix(&op).unwrap();
        assert_eq!(m.e, 100.0);
        assert_eq!(m.f, 200.0);

        let short = Operation::new("cm", vec![Object::Integer(1)]);
        assert!(require_matrix(&short).is_err());
    }

    #[test]
    fn tj_elements_mixes_strings_and_adjustments() {
        let op = Operation::new(
            "TJ",
            vec![Object::Array(vec![
                Object::String(b"AB".to_vec(), StringFormat::Literal),
                Object::Integer(-120),
                Object::String(b"C".to_vec(), StringFormat::Literal),
            ])],
        );
        let elements = tj_elements(&op).unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], ShowElement::Text(b"AB".to_vec()));
        assert_eq!(elements[1], ShowElement::Adjustment(-120.0));
    }

    #[test]
    fn tj_elements_rejects_non_array() {
        let op = Operation::new(
            "TJ",
            vec![Object::String(b"AB".to_vec(), StringFormat::Literal)],
        );
        assert!(tj_elements(&op).is_err());
    }

    #[test]
    fn tj_elements_rejects_nested_garbage() {
        let op = Operation::new(
            "TJ",
            vec![Object::Array(vec![Object::Name(b"oops".to_vec())])],
        );
        assert!(tj_elements(&op).is_err());
    }
}
