use s2s::core::pipeline::scrub_arguments;
use std::path::Path;

fn argv(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_typical_compile_command() {
    let command_line = argv(&[
        "/usr/bin/clang",
        "-DNDEBUG",
        "-Iinclude",
        "-I../third_party",
        "-isystem",
        "/opt/sdk/include",
        "-o",
        "CMakeFiles/lib.dir/src/util.c.o",
        "-c",
        "/repo/src/util.c",
    ]);
    let args = scrub_arguments(
        &command_line,
        Path::new("/repo/src/util.c"),
        Path::new("/repo/build"),
        Path::new("/repo/src"),
    );

    assert_eq!(
        args,
        argv(&[
            "-I/repo/src",
            "-DNDEBUG",
            "-I/repo/build/include",
            "-I/repo/build/../third_party",
            "-isystem",
            "/opt/sdk/include",
        ])
    );
}

#[test]
fn test_only_first_occurrences_are_dropped() {
    let args = scrub_arguments(
        &argv(&["cc", "-c", "-c", "a.c", "a.c"]),
        Path::new("a.c"),
        Path::new("/w"),
        Path::new("/w"),
    );
    assert_eq!(args, argv(&["-I/w", "-c", "a.c"]));
}

#[test]
fn test_include_prefix_is_always_first() {
    let args = scrub_arguments(
        &argv(&["cc"]),
        Path::new("a.c"),
        Path::new("/w"),
        Path::new("/w/sub"),
    );
    assert_eq!(args, argv(&["-I/w/sub"]));
}

#[test]
fn test_empty_command_line() {
    let args = scrub_arguments(&[], Path::new("a.c"), Path::new("/w"), Path::new("/w"));
    assert_eq!(args, argv(&["-I/w"]));
}
