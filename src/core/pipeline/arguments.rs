//! Turning a recorded compiler invocation into arguments reusable from a temp location.

use std::path::Path;

const INCLUDE_FLAG: &str = "-I";

/// Strip a compiler command line down to the flags every stage can reuse.
///
/// Drops `argv[0]`, the first argument naming the source file, the first bare
/// `-c`, and the first `-o` with its value. Then prepends `-I<source_dir>` and
/// rewrites relative include paths against `directory`, since the working copy
/// lives somewhere else.
pub fn scrub_arguments(
    command_line: &[String],
    source: &Path,
    directory: &Path,
    source_dir: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = command_line.iter().skip(1).cloned().collect();

    if let Some(index) = args
        .iter()
        .position(|arg| names_source(arg, source, directory))
    {
        args.remove(index);
    }
    if let Some(index) = args.iter().position(|arg| arg == "-c") {
        args.remove(index);
    }
    if let Some(index) = args.iter().position(|arg| arg == "-o") {
        let end = (index + 2).min(args.len());
        args.drain(index..end);
    }

    let mut scrubbed = Vec::with_capacity(args.len() + 1);
    scrubbed.push(format!("{}{}", INCLUDE_FLAG, source_dir.display()));

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == INCLUDE_FLAG {
            scrubbed.push(arg);
            if let Some(value) = iter.next() {
                scrubbed.push(absolutize(&value, directory));
            }
        } else if let Some(value) = arg.strip_prefix(INCLUDE_FLAG) {
            scrubbed.push(format!("{}{}", INCLUDE_FLAG, absolutize(value, directory)));
        } else {
            scrubbed.push(arg);
        }
    }
    scrubbed
}

fn names_source(arg: &str, source: &Path, directory: &Path) -> bool {
    let candidate = Path::new(arg);
    if candidate == source {
        return true;
    }
    candidate.is_relative() && source.is_absolute() && directory.join(candidate) == source
}

fn absolutize(value: &str, directory: &Path) -> String {
    let path = Path::new(value);
    if path.is_relative() {
        directory.join(path).display().to_string()
    } else {
        value.to_string()
    }
}
