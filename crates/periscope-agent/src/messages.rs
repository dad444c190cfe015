//! Stable catalog of human-readable status formats.
//!
//! The control plane and the tests match on these strings (or on their
//! prefixes), so changing them is a wire-compatibility break.

/// No inventory entry matches the requested path.
pub const SOURCE_FILE_NOT_FOUND: &str =
    "A script matching the source file was not found in the working directory";

/// More than one inventory entry matches the requested path.
pub const SOURCE_FILE_AMBIGUOUS: &str = "Multiple files match the path specified";

/// The requested file extension is not a known source kind.
pub const UNSUPPORTED_EXTENSION: &str =
    "Breakpoints cannot be set in files with this extension";

/// Prefix for line-out-of-range errors; the basename:line pair is appended.
pub const INVALID_LINE_NUMBER: &str = "Invalid snapshot position: ";

/// The breakpoint is missing its id or location.
pub const INVALID_BREAKPOINT: &str = "Invalid snapshot - id or location missing";

/// A breakpoint with the same id is already registered.
pub const BREAKPOINT_EXISTS: &str = "A snapshot with this id is already active";

/// The condition failed to compile or validate.
pub const ERROR_COMPILING_CONDITION: &str = "Error compiling condition.";

/// A watch expression failed to compile or validate.
pub const ERROR_COMPILING_EXPRESSION: &str = "Error Compiling Expression";

/// The condition raised an error while being evaluated at a hit.
pub const ERROR_EVALUATING_CONDITION: &str = "Error evaluating condition";

/// Member truncation note; `$0` is the `capture.maxProperties` bound.
pub const TRUNCATED_PROPERTIES: &str =
    "Only first `capture.maxProperties=$0` properties were captured. Use a watch expression to see more";

/// String truncation note; `$0` is the `capture.maxStringLength` bound.
pub const TRUNCATED_STRING: &str =
    "Only first `capture.maxStringLength=$0` characters were captured";

/// Frames past `capture.maxExpandFrames` share one entry with this error.
pub const FRAME_NOT_EXPANDED: &str =
    "Locals and arguments are only displayed for the top `capture.maxExpandFrames=$0` stack frames";

/// A native-backed or getter property was skipped rather than invoked.
pub const VALUE_NOT_CAPTURED: &str =
    "Property is backed by a native accessor and was not captured";

/// Emitted by the registration loop when a breakpoint outlives
/// `breakpoint_expiration_secs`.
pub const SNAPSHOT_EXPIRED: &str = "The snapshot has expired";

/// Substitute `$0`…`$N` placeholders with `parameters`; `$$` escapes `$`.
pub fn expand(format: &str, parameters: &[String]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('$') => {
                chars.next();
                out.push('$');
            }
            Some(d) if d.is_ascii_digit() => {
                let mut index = 0usize;
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    chars.next();
                    index = index * 10 + (d as usize - '0' as usize);
                }
                match parameters.get(index) {
                    Some(p) => out.push_str(p),
                    // Out-of-range references stay literal
                    None => out.push_str(&format!("${index}")),
                }
            }
            _ => out.push('$'),
        }
    }
    out
}
