//! Bounded rendering of recorded calls for matcher failure messages.

use crate::calls::ArgumentList;
use crate::pretty::Formatter;
use crate::value::Value;

/// Calls shown by any-call matchers.
pub const CALL_PRINT_LIMIT: usize = 3;
/// Calls shown by last-call matchers.
pub const LAST_CALL_PRINT_LIMIT: usize = 1;

/// Renders at most `limit` calls, newest first, followed by a count of the
/// omitted older calls.
///
/// # Examples
///
/// ```rust
/// use specbridge::diagnostics::render_recent_calls;
/// use specbridge::pretty::PrettyPrinter;
/// use specbridge::value::Value;
///
/// let calls = vec![vec![Value::from(1)], vec![Value::from(2)]];
/// let text = render_recent_calls(&calls, 1, &PrettyPrinter::default());
/// assert_eq!(text, "\nActual calls:\n  [2]\nand 1 other call.");
/// ```
pub fn render_recent_calls(calls: &[ArgumentList], limit: usize, formatter: &dyn Formatter) -> String {
    let mut out = format!("\nActual {}:\n", pluralize("call", calls.len()));
    let shown: Vec<String> = calls
        .iter()
        .rev()
        .take(limit)
        .map(|args| format!("  {}", render_call(formatter, args)))
        .collect();
    out.push_str(&shown.join(",\n"));

    let omitted = calls.len().saturating_sub(limit);
    if omitted > 0 {
        out.push_str(&format!("\nand {omitted} other {}.", pluralize("call", omitted)));
    }
    out
}

/// One argument list, printed as an array.
pub fn render_call(formatter: &dyn Formatter, args: &[Value]) -> String {
    formatter.pretty_print(&Value::array(args.iter().cloned()))
}

pub fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
