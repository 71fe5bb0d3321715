use crate::Frame;

impl Frame {
    /// Creates a new frame.
    pub fn new(file: impl Into<String>, line: Option<u32>, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }

    /// Parses the textual rendering of a [`std::backtrace::Backtrace`] into
    /// frames.
    ///
    /// Each `N: symbol` line opens a frame; the first `at file:line[:col]` line
    /// that follows gives it a location. Anything else, including the
    /// "disabled backtrace" placeholder, is skipped, so unparseable input
    /// yields an empty sequence rather than an error.
    pub fn parse_backtrace(text: &str) -> Vec<Frame> {
        let mut frames: Vec<Frame> = Vec::new();
        let mut located = true;

        for line in text.lines().map(str::trim) {
            if let Some(function) = parse_symbol_line(line) {
                frames.push(Frame::new("", None, function));
                located = false;
                continue;
            }

            if located {
                continue;
            }

            if let (Some(location), Some(frame)) = (line.strip_prefix("at "), frames.last_mut()) {
                let (file, line) = split_location(location);
                frame.file = file.to_string();
                frame.line = line;
                located = true;
            }
        }

        frames
    }
}

/// Recognizes `12: some::function` and returns the symbol part.
fn parse_symbol_line(line: &str) -> Option<&str> {
    let (index, symbol) = line.split_once(": ")?;

    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let symbol = symbol.trim();
    if symbol.is_empty() {
        return None;
    }

    Some(symbol)
}

/// Splits `path/to/file.rs:12:5` into the path and the line number. Column
/// information is discarded.
fn split_location(location: &str) -> (&str, Option<u32>) {
    let mut parts = location.rsplitn(3, ':');
    let last = parts.next();
    let middle = parts.next();
    let rest = parts.next();

    match (rest, middle, last) {
        (Some(file), Some(line), Some(column))
            if is_number(line) && is_number(column) =>
        {
            (file, line.parse().ok())
        }
        _ => match location.rsplit_once(':') {
            Some((file, line)) if is_number(line) => (file, line.parse().ok()),
            _ => (location, None),
        },
    }
}

fn is_number(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}
