//! Console rendering for compile-time errors.

/// Converts a byte offset into 1-based line and column numbers.
pub fn position(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

pub fn underline(line: &str, column: usize) -> String {
    let mut marker = String::new();
    for _ in 1..column {
        marker.push(' ');
    }
    marker.push('^');
    format!("{}\n{}", line, marker)
}

/// Renders an error with its source line when a byte offset is known.
pub fn render(source_label: &str, source: &str, err: &crate::Error) -> String {
    match err.offset() {
        Some(offset) => {
            let (line, column) = position(source, offset);
            let text = source.lines().nth(line - 1).unwrap_or_default();
            format!(
                "error: {}\n--> {}:{}:{}\n{}",
                err,
                source_label,
                line,
                column,
                underline(text, column),
            )
        }
        None => format!("error: {}\n--> {}", err, source_label),
    }
}
