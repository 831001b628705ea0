use scc_core::errors::{ErrorInfo, SccError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("molecule", "dsgdb9nsd_000001")
        .with_context("fold", 2)
}

#[test]
fn schema_error_surface() {
    let err = SccError::Schema(sample_info("S001", "missing column"));
    assert_eq!(err.info().code, "S001");
    assert!(err.info().context.contains_key("molecule"));
}

#[test]
fn unmapped_type_error_surface() {
    let err = SccError::UnmappedType(sample_info("U001", "no mapping for 3JHN"));
    assert_eq!(err.info().code, "U001");
    assert_eq!(err.info().context.get("fold").map(String::as_str), Some("2"));
}

#[test]
fn shape_helper_records_widths() {
    let err = SccError::shape("W001", "coupling block too wide", 2856, 2877);
    assert!(matches!(err, SccError::ShapeMismatch(_)));
    assert_eq!(err.info().context["expected"], "2856");
    assert_eq!(err.info().context["found"], "2877");
}

#[test]
fn display_includes_context_and_hint() {
    let err = SccError::Config(ErrorInfo::new("C001", "bad batch size").with_hint("use >= 1"));
    let rendered = err.to_string();
    assert!(rendered.starts_with("config error: bad batch size (code: C001)"));
    assert!(rendered.ends_with("hint: use >= 1"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = SccError::Io(ErrorInfo::new("IO1", "denied"));
    let json = serde_json::to_value(&err).unwrap();
    assert_eq!(json["family"], "Io");
    let back: SccError = serde_json::from_value(json).unwrap();
    assert_eq!(back, err);
}
