//! Native command-line composition.
//!
//! Windows hands a process one flat command-line string; the first token is
//! re-parsed by `CommandLineToArgvW`-compatible rules, so the application
//! path must be quoted defensively while the caller-supplied argument tail
//! is passed through verbatim.

/// Compose the command line for a launch: the quoted application path,
/// followed by the caller's argument string when one was supplied.
pub fn compose_command_line(application_path: &str, arguments: Option<&str>) -> String {
    let mut line = quote_argument(application_path);
    if let Some(arguments) = arguments {
        if !arguments.is_empty() {
            line.push(' ');
            line.push_str(arguments);
        }
    }
    line
}

/// Quote one argument per the platform's argv re-parsing rules.
///
/// Arguments without whitespace or quotes pass through unchanged.
/// Otherwise: surrounding quotes, `2n+1` backslashes before an embedded
/// quote, `2n` backslashes before the closing quote.
pub fn quote_argument(argument: &str) -> String {
    let needs_quoting = argument.is_empty()
        || argument
            .chars()
            .any(|c| matches!(c, ' ' | '\t' | '\n' | '\x0b' | '"'));
    if !needs_quoting {
        return argument.to_string();
    }

    let mut quoted = String::with_capacity(argument.len() + 2);
    quoted.push('"');
    let mut pending_backslashes = 0usize;
    for ch in argument.chars() {
        match ch {
            '\\' => pending_backslashes += 1,
            '"' => {
                quoted.extend(std::iter::repeat_n('\\', pending_backslashes * 2 + 1));
                quoted.push('"');
                pending_backslashes = 0;
            }
            other => {
                quoted.extend(std::iter::repeat_n('\\', pending_backslashes));
                pending_backslashes = 0;
                quoted.push(other);
            }
        }
    }
    quoted.extend(std::iter::repeat_n('\\', pending_backslashes * 2));
    quoted.push('"');
    quoted
}
