#![no_main]

use critlink_core::code::{compare, normalize};
use critlink_core::edge::tag;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, &str)| {
    let (a, b) = input;
    assert_eq!(compare(a, b), compare(b, a).reverse());

    let code = normalize(a);
    assert_eq!(normalize(&code), code);
    if !code.is_empty() {
        assert_eq!(normalize(&tag(&code)), code);
    }
});
