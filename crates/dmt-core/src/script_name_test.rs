use super::*;

#[test]
fn test_validate_accepts_standard_name() {
    assert!(validate("V1__create_table.sql").is_ok());
    assert!(validate("V42__add_orders_index.SQL").is_ok());
    assert!(validate("V007__seed.data.sql").is_ok());
}

#[test]
fn test_validate_rejects_bad_names() {
    for name in [
        "invalid_file_name_.txt",
        "v1__lowercase_prefix.sql",
        "V__no_version.sql",
        "V1_single_underscore.sql",
        "V1__.sql",
        "V1__no_extension",
        "V1__bad_ext.s-q",
        "XV1__prefix.sql",
    ] {
        assert!(validate(name).is_err(), "expected {name} to be rejected");
    }
}

#[test]
fn test_validate_error_carries_name_and_hint() {
    let err = validate("invalid_file_name_.txt").unwrap_err();
    match &err {
        CoreError::InvalidScriptName { name, hint } => {
            assert_eq!(name, "invalid_file_name_.txt");
            assert!(hint.contains("V1__create_table.sql"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().contains("[C001]"));
}

#[test]
fn test_version_of() {
    assert_eq!(version_of("V1__create_table.sql"), "1");
    assert_eq!(version_of("V0012__pad.sql"), "0012");
}

#[test]
fn test_version_of_is_not_numeric_checked() {
    assert_eq!(version_of("Vabc__x.sql"), "abc");
    assert_eq!(version_of("V"), "");
}

#[test]
fn test_description_of_replaces_every_underscore() {
    assert_eq!(
        description_of("V5__cReated__231123312____TABLES.sql").unwrap(),
        "cReated  231123312    TABLES"
    );
}

#[test]
fn test_description_of_strips_only_last_extension() {
    assert_eq!(
        description_of("V2__load.users_v2.sql").unwrap(),
        "load.users v2"
    );
    assert_eq!(description_of("V3__no_extension").unwrap(), "no extension");
}

#[test]
fn test_description_of_requires_separator() {
    assert!(description_of("V1_create_table.sql").is_err());
}

#[test]
fn test_description_of_ignores_full_grammar() {
    // Only the separator is required here, not a valid prefix
    assert_eq!(description_of("junk__some_text.txt").unwrap(), "some text");
}

#[test]
fn test_script_name_parse() {
    let parsed = ScriptName::parse("V10__add_customer_email.sql").unwrap();
    assert_eq!(parsed.version, 10);
    assert_eq!(parsed.version_text, "10");
    assert_eq!(parsed.description, "add customer email");
    assert_eq!(parsed.file_name, "V10__add_customer_email.sql");
}

#[test]
fn test_script_name_parse_rejects_overflowing_version() {
    let err = ScriptName::parse("V99999999999999999999999__huge.sql").unwrap_err();
    assert!(matches!(err, CoreError::InvalidScriptName { .. }));
}
