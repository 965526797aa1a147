//! Call stack capture and lazy frame resolution
//!
//! Capturing only records raw return addresses ([`Marker`]s). Turning them
//! into function names and source locations is deferred until someone asks
//! for [`CallStack::frames`], and then happens exactly once per stack.

use once_cell::sync::OnceCell;
use std::ffi::c_void;
use std::fmt;

/// Upper bound on frames belonging to the capture machinery itself
/// (the `backtrace` crate and [`CallStack::capture`]).
const MAX_INTERNAL_FRAMES: usize = 16;

/// One return address in a captured call path.
///
/// Markers are plain addresses: they hold no reference into the frame they
/// were taken from and stay valid after that frame has returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Marker(usize);

impl Marker {
    /// Wrap a raw instruction pointer
    pub fn from_ip(ip: usize) -> Self {
        Marker(ip)
    }

    /// The raw instruction pointer
    pub fn ip(&self) -> usize {
        self.0
    }

    fn as_ptr(&self) -> *mut c_void {
        self.0 as *mut c_void
    }
}

// =============================================================================
// CallFrame
// =============================================================================

/// A resolved frame: function name, source file and line.
///
/// Displays as `<function> <file>:<line>`. A width pads the function name,
/// which is how [`CallStack::write_indented`] aligns its table:
///
/// ```rust
/// use errtrail::CallFrame;
///
/// let frame = CallFrame::new("app::load", "src/app.rs", 12);
/// assert_eq!(format!("{}", frame), "app::load src/app.rs:12");
/// assert_eq!(format!("{:12}", frame), "app::load    src/app.rs:12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallFrame {
    function: String,
    file: String,
    line: u32,
}

impl CallFrame {
    /// Create a frame from already known symbol information
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
        }
    }

    fn from_symbol(symbol: &backtrace::Symbol, marker: Marker) -> Self {
        let function = match symbol.name() {
            // `{:#}` drops the trailing `::h<hash>`
            Some(name) => format!("{:#}", name),
            None => format!("{:#x}", marker.ip()),
        };
        let file = symbol
            .filename()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<unknown>".to_string());

        Self {
            function,
            file,
            line: symbol.lineno().unwrap_or(0),
        }
    }

    fn unresolved(marker: Marker) -> Self {
        Self::new(format!("{:#x}", marker.ip()), "<unknown>", 0)
    }

    /// Fully qualified function name
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Source file path
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Line number, 0 when unknown
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for CallFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.width() {
            Some(width) => write!(
                f,
                "{:<width$} {}:{}",
                self.function,
                self.file,
                self.line,
                width = width
            ),
            None => write!(f, "{} {}:{}", self.function, self.file, self.line),
        }
    }
}

// =============================================================================
// CallStack
// =============================================================================

/// The call path recorded when an error was created.
///
/// `offset` hides leading frames that belong to error constructors rather
/// than to the code that failed. It only ever grows.
#[derive(Clone, Default)]
pub struct CallStack {
    markers: Vec<Marker>,
    offset: usize,
    resolved: OnceCell<Vec<CallFrame>>,
}

impl CallStack {
    /// Record up to `max_depth` return addresses of the current call path.
    ///
    /// Frames of the capture machinery are never recorded; `skip` hides that
    /// many additional innermost frames (the first being the caller of
    /// `capture`). No symbols are resolved here.
    #[inline(never)]
    pub fn capture(skip: usize, max_depth: usize) -> Self {
        if max_depth == 0 {
            return Self::empty();
        }

        let own = Self::capture as *const () as usize;
        let limit = max_depth + skip + MAX_INTERNAL_FRAMES;
        let mut raw: Vec<(usize, usize)> = Vec::with_capacity(limit);

        backtrace::trace(|frame| {
            raw.push((frame.ip() as usize, frame.symbol_address() as usize));
            raw.len() < limit
        });

        // Without symbol addresses the platform cannot tell us where our own
        // frame is, so everything is kept.
        let start = raw
            .iter()
            .position(|&(_, symbol)| symbol == own)
            .map_or(0, |i| i + 1);

        let markers = raw[start..]
            .iter()
            .skip(skip)
            .take(max_depth)
            .map(|&(ip, _)| Marker(ip))
            .collect();

        Self {
            markers,
            offset: 0,
            resolved: OnceCell::new(),
        }
    }

    /// A call stack without any frames
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a call stack from markers captured elsewhere
    pub fn from_markers(markers: Vec<Marker>) -> Self {
        Self {
            markers,
            offset: 0,
            resolved: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn from_frames(frames: Vec<CallFrame>) -> Self {
        Self {
            markers: Vec::new(),
            offset: 0,
            resolved: OnceCell::with_value(frames),
        }
    }

    /// The raw recorded markers, ignoring the offset
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Number of leading frames hidden from [`frames`](Self::frames)
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn bump_offset(&mut self, n: usize) {
        self.offset += n;
    }

    /// Whether the markers have already been resolved into frames
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }

    /// Resolved frames after the offset.
    ///
    /// The first call resolves every marker and caches the result; later
    /// calls are free. Empty if fewer frames than the offset were recorded.
    pub fn frames(&self) -> &[CallFrame] {
        let all = self.resolved.get_or_init(|| resolve(&self.markers));
        all.get(self.offset..).unwrap_or(&[])
    }

    /// Number of frames after the offset (resolves the stack)
    pub fn len(&self) -> usize {
        self.frames().len()
    }

    /// Whether there are no frames after the offset (resolves the stack)
    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }

    /// The n-th frame after the offset, formatted
    pub fn at(&self, n: usize) -> Option<String> {
        self.frames().get(n).map(ToString::to_string)
    }

    /// The frame closest to where the error was created
    pub fn first(&self) -> Option<String> {
        self.at(0)
    }

    /// Write up to `max` frames (0 = all) as an aligned table, every line
    /// prefixed with `indent`.
    pub fn write_indented<W: fmt::Write + ?Sized>(
        &self,
        w: &mut W,
        max: usize,
        indent: &str,
    ) -> fmt::Result {
        let mut frames = self.frames();
        if max > 0 && frames.len() > max {
            frames = &frames[..max];
        }

        let width = frames
            .iter()
            .map(|frame| frame.function().len())
            .max()
            .unwrap_or(0);

        for frame in frames {
            writeln!(w, "{}{:width$}", indent, frame, width = width)?;
        }
        Ok(())
    }

    /// Write up to `max` frames (0 = all) as an aligned table
    pub fn write<W: fmt::Write + ?Sized>(&self, w: &mut W, max: usize) -> fmt::Result {
        self.write_indented(w, max, "")
    }
}

impl fmt::Display for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write(f, 0)
    }
}

impl fmt::Debug for CallStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallStack")
            .field("markers", &self.markers.len())
            .field("offset", &self.offset)
            .field("resolved", &self.is_resolved())
            .finish()
    }
}

fn resolve(markers: &[Marker]) -> Vec<CallFrame> {
    let mut frames = Vec::with_capacity(markers.len());

    for &marker in markers {
        let before = frames.len();
        // Inlined calls yield several symbols for one address, innermost first.
        backtrace::resolve(marker.as_ptr(), |symbol| {
            frames.push(CallFrame::from_symbol(symbol, marker));
        });
        if frames.len() == before {
            frames.push(CallFrame::unresolved(marker));
        }
    }

    tracing::debug!(
        markers = markers.len(),
        frames = frames.len(),
        "resolved call stack"
    );
    frames
}
