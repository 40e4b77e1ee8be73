#![no_main]

use std::path::Path;

use critlink_core::artifact::LinkArtifact;
use critlink_core::rewrite::rewrite_artifact;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(artifact) = LinkArtifact::from_json(data, Path::new("fuzz.json")) else {
        return;
    };
    let Ok(first) = rewrite_artifact(&artifact) else {
        return;
    };
    let second = rewrite_artifact(&first.artifact).expect("rewritten artifact rewrites again");
    assert_eq!(first.bytes, second.bytes);
});
