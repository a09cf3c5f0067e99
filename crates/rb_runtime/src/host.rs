//! Host I/O seam.
//!
//! The runtime never touches a device. Line output and line input go through a
//! [`Host`] supplied by whoever embeds the runtime.

use std::collections::VecDeque;

pub trait Host {
    fn write(&mut self, text: &str);
    /// Next input line without its terminator, `None` at end of input.
    fn read_line(&mut self) -> Option<String>;
    /// Drain whatever output the host buffered, if it buffers at all.
    fn take_output(&mut self) -> String {
        String::new()
    }
}

/// Buffers everything written and serves a fixed script of input lines.
#[derive(Default)]
pub struct CaptureHost {
    output: String,
    input: VecDeque<String>,
}

impl CaptureHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: String::new(),
            input: lines.into_iter().map(Into::into).collect(),
        }
    }
}

impl Host for CaptureHost {
    fn write(&mut self, text: &str) {
        self.output.push_str(text);
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }

    fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

/// Writes straight to the process's stdout and reads stdin.
pub struct StdHost;

impl Host for StdHost {
    fn write(&mut self, text: &str) {
        use std::io::Write;
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(text.as_bytes());
        let _ = out.flush();
    }

    fn read_line(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Some(line)
            }
        }
    }
}
