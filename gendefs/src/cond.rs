//! Conditional-compilation bookkeeping.
//!
//! Only `#if <version-symbol> <op> <number>` conditions are reproduced in
//! the generated fragments.  Any other `#if`/`#ifdef`/`#ifndef` still opens a
//! frame so that its `#endif` balances, but contributes no guard text: a
//! marker inside such a block is emitted unconditionally.

use regex::Regex;

use crate::error::Error;

/// One open conditional block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Guard expression, or empty when the condition is not tracked.
    pub guard: String,
}

impl Frame {
    /// `#else` negates a tracked guard.  Untracked frames stay untracked.
    fn flip(&mut self) {
        if !self.guard.is_empty() {
            self.guard = format!("!({})", self.guard);
        }
    }
}

/// What a source line did to the conditional stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Open,
    Else,
    Elif,
    Close,
    None,
}

/// Recognizes conditional directives and extracts tracked guards.
#[derive(Debug)]
pub struct DirectiveMatcher {
    open: Regex,
    version: Regex,
    else_: Regex,
    elif: Regex,
    close: Regex,
}

impl DirectiveMatcher {
    pub fn new(version_symbol: &str) -> Result<Self, Error> {
        Ok(DirectiveMatcher {
            open: Regex::new(r"^\s*#\s*if")?,
            version: Regex::new(&format!(
                r"^\s*#\s*if\s+({}\s*[<>=]{{1,2}}\s*[0-9]+)",
                regex::escape(version_symbol)
            ))?,
            else_: Regex::new(r"^\s*#\s*else\b")?,
            elif: Regex::new(r"^\s*#\s*elif\b")?,
            close: Regex::new(r"^\s*#\s*endif")?,
        })
    }

    /// Classify a line by the directive it starts with.  Directive text
    /// later on the line, e.g. in a trailing comment, is ignored.
    pub fn classify(&self, line: &str) -> Directive {
        if self.open.is_match(line) {
            Directive::Open
        } else if self.close.is_match(line) {
            Directive::Close
        } else if self.elif.is_match(line) {
            Directive::Elif
        } else if self.else_.is_match(line) {
            Directive::Else
        } else {
            Directive::None
        }
    }

    /// The tracked guard on an opening line, or empty.
    pub fn guard(&self, line: &str) -> String {
        self.version
            .captures(line)
            .map(|c| c[1].to_string())
            .unwrap_or_default()
    }
}

/// Stack of open conditional blocks for one source file.
#[derive(Debug, Default)]
pub struct ConditionalStack {
    frames: Vec<Frame>,
}

impl ConditionalStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one line's directive to the stack.
    pub fn update(&mut self, directives: &DirectiveMatcher, line: &str) -> Result<(), Error> {
        match directives.classify(line) {
            Directive::Open => self.push(directives.guard(line)),
            Directive::Close => {
                self.pop()?;
            }
            Directive::Else => self.top()?.flip(),
            Directive::Elif => self.top()?.guard.clear(),
            Directive::None => {}
        }
        Ok(())
    }

    pub fn push(&mut self, guard: String) {
        self.frames.push(Frame { guard });
    }

    pub fn pop(&mut self) -> Result<Frame, Error> {
        self.frames.pop().ok_or(Error::UnbalancedConditional)
    }

    fn top(&mut self) -> Result<&mut Frame, Error> {
        self.frames.last_mut().ok_or(Error::UnbalancedConditional)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// ` && `-join of every tracked guard, outermost first.
    pub fn combined_guard(&self) -> String {
        self.frames
            .iter()
            .filter(|f| !f.guard.is_empty())
            .map(|f| f.guard.as_str())
            .collect::<Vec<_>>()
            .join(" && ")
    }

    /// Check that every block opened in the file was closed.
    pub fn finish(self) -> Result<(), Error> {
        if self.frames.is_empty() {
            Ok(())
        } else {
            Err(Error::UnterminatedConditional {
                open: self.frames.len(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directives() -> DirectiveMatcher {
        DirectiveMatcher::new("__FreeBSD_version").unwrap()
    }

    fn feed(stack: &mut ConditionalStack, lines: &[&str]) {
        let d = directives();
        for line in lines {
            stack.update(&d, line).unwrap();
        }
    }

    #[test]
    fn version_guard_is_tracked() {
        let d = directives();
        assert_eq!(d.guard("#if __FreeBSD_version >= 500035"), "__FreeBSD_version >= 500035");
        assert_eq!(d.guard("# if __FreeBSD_version<700000 /* 7.x */"), "__FreeBSD_version<700000");
        assert_eq!(d.guard("#ifdef __amd64__"), "");
        assert_eq!(d.guard("#if defined(__FreeBSD_version)"), "");
    }

    #[test]
    fn nested_guards_join_in_push_order() {
        let mut stack = ConditionalStack::new();
        feed(
            &mut stack,
            &["#if __FreeBSD_version >= 500000", "#ifdef HAVE_X", "#if __FreeBSD_version < 800000"],
        );
        assert_eq!(stack.depth(), 3);
        assert_eq!(
            stack.combined_guard(),
            "__FreeBSD_version >= 500000 && __FreeBSD_version < 800000"
        );
        feed(&mut stack, &["#endif"]);
        assert_eq!(stack.combined_guard(), "__FreeBSD_version >= 500000");
        feed(&mut stack, &["#endif", "#endif"]);
        assert_eq!(stack.combined_guard(), "");
        stack.finish().unwrap();
    }

    #[test]
    fn else_negates_tracked_guard() {
        let mut stack = ConditionalStack::new();
        feed(&mut stack, &["#if __FreeBSD_version >= 500035", "#else"]);
        assert_eq!(stack.combined_guard(), "!(__FreeBSD_version >= 500035)");
        feed(&mut stack, &["#endif", "#ifdef __amd64__", "#else"]);
        assert_eq!(stack.combined_guard(), "");
    }

    #[test]
    fn elif_drops_tracking() {
        let mut stack = ConditionalStack::new();
        feed(&mut stack, &["#if __FreeBSD_version >= 500035", "#elif FOO"]);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.combined_guard(), "");
    }

    #[test]
    fn endif_on_empty_stack_is_an_error() {
        let mut stack = ConditionalStack::new();
        let err = stack.update(&directives(), "#endif").unwrap_err();
        assert!(matches!(err, Error::UnbalancedConditional));
    }

    #[test]
    fn else_and_elif_on_empty_stack_are_errors() {
        let d = directives();
        for line in ["#else", "#elif X", "  # else /* orphan */"] {
            let mut stack = ConditionalStack::new();
            let err = stack.update(&d, line).unwrap_err();
            assert!(matches!(err, Error::UnbalancedConditional), "{line}");
        }
    }

    #[test]
    fn only_the_leading_directive_counts() {
        let d = directives();
        assert_eq!(d.classify("#endif /* #if FOO */"), Directive::Close);
        assert_eq!(d.classify("  #  ifdef X"), Directive::Open);
        assert_eq!(d.classify("int x; /* #if notes */"), Directive::None);
        assert_eq!(d.guard("/* #if __FreeBSD_version >= 1 */"), "");

        let mut stack = ConditionalStack::new();
        feed(&mut stack, &["#if __FreeBSD_version >= 500000", "#endif /* #if FOO */"]);
        assert_eq!(stack.depth(), 0);
    }

    #[test]
    fn open_block_at_eof_is_an_error() {
        let mut stack = ConditionalStack::new();
        feed(&mut stack, &["#ifndef Py_RETURN_NONE"]);
        assert!(matches!(
            stack.finish().unwrap_err(),
            Error::UnterminatedConditional { open: 1 }
        ));
    }
}
