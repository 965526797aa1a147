//! Rendering errors at three verbosity levels
//!
//! - **Short**: one line for logs, the message or the inner error's text
//! - **Detailed**: `<code> message (inner)` plus a table of call frames
//! - **Verbose**: one block per error in the chain with origin and type
//!
//! The same levels are reachable through `fmt` on [`Error`]:
//!
//! | format    | level                                   |
//! |-----------|-----------------------------------------|
//! | `{}`      | short                                   |
//! | `{:#}`    | detailed, precision = frames (`{:#.5}`) |
//! | `{:?}`    | title line only                         |
//! | `{:#?}`   | verbose, precision = depth (`{:#.3?}`)  |

use crate::chain::{self, Link};
use crate::{CallStack, Error};
use std::fmt::{self, Write};

/// Frames printed by `{:#}` without a precision
pub const DEFAULT_MAX_FRAMES: usize = 1000;

/// Chain depth printed by verbose rendering when none (or 0) is given
pub const DEFAULT_MAX_DEPTH: usize = 1000;

const STACK_INDENT: &str = "  ";
const SEPARATOR: &str = "----------";

/// How much of an error to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// The message, else the inner error's text, else the code
    #[default]
    Short,
    /// Title line plus up to `max_frames` call frames (0 = no frames)
    Detailed { max_frames: usize },
    /// Every error in the chain, up to `max_depth` of them (0 = default)
    Verbose { max_depth: usize },
}

/// Render `err` at the given verbosity
pub fn render<'a>(err: impl Into<Link<'a>>, verbosity: Verbosity) -> String {
    let link = err.into();
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = match verbosity {
        Verbosity::Short => write_short(&mut out, link),
        Verbosity::Detailed { max_frames } => write_detailed(&mut out, link, max_frames),
        Verbosity::Verbose { max_depth } => write_verbose(&mut out, link, max_depth),
    };
    out
}

/// The message, else the inner error's text, else the code
pub fn short_form<'a>(err: impl Into<Link<'a>>) -> String {
    render(err, Verbosity::Short)
}

/// Title line plus up to `max_frames` call frames (0 = no frames)
pub fn detailed_form<'a>(err: impl Into<Link<'a>>, max_frames: usize) -> String {
    render(err, Verbosity::Detailed { max_frames })
}

/// Every error in the chain, up to `max_depth` of them (0 = default)
pub fn verbose_form<'a>(err: impl Into<Link<'a>>, max_depth: usize) -> String {
    render(err, Verbosity::Verbose { max_depth })
}

// =============================================================================
// Writers
// =============================================================================

fn write_short<W: Write + ?Sized>(w: &mut W, link: Link<'_>) -> fmt::Result {
    if let Some(message) = link.message() {
        return w.write_str(message);
    }

    let Some(report) = link.report() else {
        return write!(w, "{}", link);
    };

    let inner = report
        .inner()
        .map(ToString::to_string)
        .filter(|text| !text.is_empty());

    match (inner, report.code()) {
        (Some(text), _) => w.write_str(&text),
        (None, Some(code)) => write!(w, "{}", code),
        (None, None) => write!(w, "{}", link),
    }
}

fn write_title<W: Write + ?Sized>(w: &mut W, link: Link<'_>, with_inner: bool) -> fmt::Result {
    let Some(code) = link.code() else {
        return write!(w, "{}", link);
    };

    write!(w, "<{}>", code)?;
    if let Some(message) = link.message() {
        write!(w, " {}", message)?;
    }
    if with_inner {
        if let Some(inner) = link.unwrap() {
            write!(w, " ({})", inner)?;
        }
    }
    Ok(())
}

/// The stack of the last error in the unbroken run of stack-carrying errors
/// starting at `link`.
fn innermost_stack<'a>(link: Link<'a>) -> Option<&'a CallStack> {
    chain::chain(link)
        .map_while(|link| link.call_stack())
        .last()
}

fn write_detailed<W: Write + ?Sized>(w: &mut W, link: Link<'_>, max_frames: usize) -> fmt::Result {
    write_title(w, link, true)?;

    if max_frames == 0 {
        return Ok(());
    }
    let Some(stack) = innermost_stack(link) else {
        return Ok(());
    };

    let mut table = String::new();
    stack.write_indented(&mut table, max_frames, STACK_INDENT)?;
    if !table.is_empty() {
        write!(w, "\nstack:\n{}", table.trim_end_matches('\n'))?;
    }
    Ok(())
}

fn write_verbose<W: Write + ?Sized>(w: &mut W, link: Link<'_>, max_depth: usize) -> fmt::Result {
    let max_depth = if max_depth == 0 {
        DEFAULT_MAX_DEPTH
    } else {
        max_depth
    };

    for (i, link) in chain::chain(link).take(max_depth).enumerate() {
        if i > 0 {
            writeln!(w)?;
        }

        if link.code().is_some() {
            write_title(w, link, false)?;
            writeln!(w)?;
            if let Some(frame) = link.call_stack().and_then(CallStack::first) {
                writeln!(w, "originated:\n{}{}", STACK_INDENT, frame)?;
            }
        } else {
            match link.formatted() {
                Some(formatted) => writeln!(w, "{}", formatted.trim_end_matches('\n'))?,
                None => writeln!(w, "{}", link)?,
            }
        }

        writeln!(w, "type:\n{}{}", STACK_INDENT, link.type_name())?;
        write!(w, "{}", SEPARATOR)?;
    }
    Ok(())
}

// =============================================================================
// fmt integration
// =============================================================================

impl Error {
    /// Render this error at the given verbosity
    pub fn render(&self, verbosity: Verbosity) -> String {
        render(self, verbosity)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            let max_frames = f.precision().unwrap_or(DEFAULT_MAX_FRAMES);
            write_detailed(f, self.link(), max_frames)
        } else {
            write_short(f, self.link())
        }
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            let max_depth = f.precision().unwrap_or(DEFAULT_MAX_DEPTH);
            write_verbose(f, self.link(), max_depth)
        } else {
            write_title(f, self.link(), true)
        }
    }
}
