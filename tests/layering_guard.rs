//! Layering guardrails to keep the protocol crate free of IO.
//!
//! `wirecheck_proto` is pure framing and decoding; sockets, timers and the async runtime belong to the harness crate.
//! This test scans the proto crate's `Cargo.toml` and fails if an async runtime shows up in `[dependencies]`.

const FORBIDDEN: &[&str] = &["tokio", "async-std", "smol", "mio"];

#[test]
fn proto_crate_does_not_depend_on_an_async_runtime() {
    let manifest = include_str!("../crates/wirecheck_proto/Cargo.toml");
    let mut in_dependencies = false;

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the `[dependencies]` table.
        if line.starts_with('[') {
            in_dependencies = line == "[dependencies]";
            continue;
        }

        if !in_dependencies || line.is_empty() || line.starts_with('#') {
            continue;
        }

        let name = line.split(['=', '.']).next().unwrap_or("").trim();
        if FORBIDDEN.contains(&name) {
            panic!("`{name}` must not appear in wirecheck_proto's [dependencies]; keep IO in the harness crate");
        }
    }
}

#[test]
fn harness_depends_on_proto() {
    let manifest = include_str!("../Cargo.toml");
    assert!(
        manifest.lines().any(|line| line.trim_start().starts_with("wirecheck_proto")),
        "the harness must use wirecheck_proto for framing instead of reimplementing it"
    );
}
