#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pixcat::build_field_expression;
use pixcat::config::TypeLinkMap;
use pixcat::debugger::memory::MemoryReference;
use pixcat::debugger::variables::parse_numeric;

#[derive(Arbitrary, Debug)]
struct ExpressionFuzzInput {
    variable: String,
    link: String,
    field: String,
    result: String,
    type_map: String,
}

fuzz_target!(|input: ExpressionFuzzInput| {
    let expression = build_field_expression(&input.variable, &input.link, &input.field);
    assert!(expression.contains(&input.variable));

    // Values reported by the adapter are untrusted text
    let _ = parse_numeric(&input.result);
    if let Ok(reference) = MemoryReference::parse(&input.result) {
        assert_eq!(reference.token(), input.result);
    }

    if let Ok(map) = TypeLinkMap::parse(&input.type_map) {
        let _ = map.link_for(&input.variable);
    }
});
