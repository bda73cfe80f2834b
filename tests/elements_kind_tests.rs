use jsinspect::{ElementKind, EngineConfig, Session, Value, evaluate_script};

#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

fn kind_of(script: &str) -> ElementKind {
    let value = evaluate_script(script, None::<&std::path::Path>).unwrap();
    value.elements_kind().unwrap_or_else(|| panic!("not an array: {value:?}"))
}

#[test]
fn literals_pick_the_narrowest_kind() {
    assert_eq!(kind_of("[1, 2, 3]"), ElementKind::PackedSmi);
    assert_eq!(kind_of("[1, 2.5]"), ElementKind::PackedDouble);
    assert_eq!(kind_of("[1, 'x']"), ElementKind::PackedGeneric);
    assert_eq!(kind_of("[1, , 3]"), ElementKind::HoleySmi);
    assert_eq!(kind_of("[-0]"), ElementKind::PackedDouble);
}

#[test]
fn sized_construction_is_holey() {
    assert_eq!(kind_of("new Array(3)"), ElementKind::HoleySmi);
    assert_eq!(kind_of("new Array(0)"), ElementKind::PackedSmi);
    assert_eq!(kind_of("new Array(1, 2)"), ElementKind::PackedSmi);
}

#[test]
fn stores_and_deletes_only_generalize() {
    assert_eq!(kind_of("let a = [1, 2]; a[1] = 1.5; a"), ElementKind::PackedDouble);
    assert_eq!(kind_of("let a = [1.5]; a[0] = 1; a"), ElementKind::PackedDouble);
    assert_eq!(kind_of("let a = [1]; a[5] = 2; a"), ElementKind::HoleySmi);
    assert_eq!(kind_of("let a = [1, 2]; delete a[0]; a"), ElementKind::HoleySmi);
    assert_eq!(kind_of("let a = [1.5, 2]; a[0] = {}; a"), ElementKind::PackedGeneric);
    assert_eq!(kind_of("let a = [1]; a[1] = 2; a"), ElementKind::PackedSmi);
}

#[test]
fn allocation_site_seeds_later_arrays() {
    let mut session = Session::new();
    let script = r#"
function make() { return [1, 2, 3]; }
let first = make();
first[0] = 0.5;
let second = make();
"#;
    session.run_script(script, "sites.js").unwrap();
    let first = session.global("first").unwrap();
    let second = session.global("second").unwrap();
    assert_eq!(first.elements_kind(), Some(ElementKind::PackedDouble));
    assert_eq!(second.elements_kind(), Some(ElementKind::PackedDouble));

    let site = second.allocation_site().unwrap();
    assert!(std::rc::Rc::ptr_eq(&site, &first.allocation_site().unwrap()));
    assert_eq!(site.created_count(), 2);
    assert_eq!(site.transitions(), vec![(ElementKind::PackedSmi, ElementKind::PackedDouble)]);
}

#[test]
fn natives_report_the_current_kind() {
    let mut session = Session::with_config(EngineConfig::default().with_natives_syntax(true));
    let script = r#"
let a = [1, 2];
let smi = %HasSmiElements(a);
a[0] = 0.5;
let dbl = %HasDoubleElements(a);
delete a[1];
let holey = %HasHoleyElements(a);
a[0] = "s";
let obj = %HasObjectElements(a);
"#;
    session.run_script(script, "natives.js").unwrap();
    for name in ["smi", "dbl", "holey", "obj"] {
        assert!(matches!(session.global(name), Some(Value::Boolean(true))), "{name}");
    }
}

#[test]
fn natives_syntax_is_rejected_by_default() {
    let result = evaluate_script("%HasSmiElements([1])", None::<&std::path::Path>);
    assert!(matches!(result, Err(jsinspect::JSError::ParseError { .. }) | Err(jsinspect::JSError::TokenizationError { .. })));
}
