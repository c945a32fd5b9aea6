//! Vendor-neutral configuration line filtering.
//!
//! Each vendor classifies lines; this module applies the common layout
//! rule: separator lines collapse into exactly one blank line between kept
//! lines, never at the start or end of the result.

/// What to do with one line of retrieved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineClass {
    /// Configuration content, kept verbatim.
    Keep,
    /// Comment or delimiter marking a section boundary.
    Separator,
    /// Banner or noise, removed without a trace.
    Drop,
}

/// Filter `raw` with a vendor line classifier.
pub fn filter_lines(raw: &str, classify: impl Fn(&str) -> LineClass) -> String {
    let mut kept: Vec<&str> = Vec::new();
    let mut pending_separator = false;

    for line in raw.lines() {
        let class = if line.trim().is_empty() {
            LineClass::Separator
        } else {
            classify(line)
        };

        match class {
            LineClass::Keep => {
                if pending_separator && !kept.is_empty() {
                    kept.push("");
                }
                kept.push(line);
                pending_separator = false;
            }
            LineClass::Separator => pending_separator = true,
            LineClass::Drop => {}
        }
    }

    kept.join("\n")
}
