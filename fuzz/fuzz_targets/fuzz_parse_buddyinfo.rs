#![no_main]
use fraglevel::{parse_buddyinfo, render_text, EmptyZonePolicy};
use libfuzzer_sys::fuzz_target;

// Arbitrary text must either parse or fail with an error, never panic.
// Whatever parses must also render.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    for policy in [EmptyZonePolicy::Error, EmptyZonePolicy::Zero] {
        if let Ok(system) = parse_buddyinfo(text, policy) {
            let _ = render_text(&system);
        }
    }
});
