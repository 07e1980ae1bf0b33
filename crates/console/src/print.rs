use std::fmt::Display;
use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use bytes::Bytes;
use micro_forwarder::event::Observer;
use tracing::{error, info, warn};

const REQUEST_BANNER: &str = "--- REQUEST ---";
const RESPONSE_BANNER: &str = "--- RESPONSE ---";
const CLOSING_RULE: &str = "==================================================";

pub const USAGE_EXAMPLE: &str = "Example:
forwarder 8080 https://google.com:443
First argument is the port to listen on.
Second argument is the forwarding url (only scheme, host and port are used).";

/// Prints requests and responses as text blocks and logs everything else.
#[derive(Debug)]
pub struct ConsolePrinter<W = Stdout> {
    out: Mutex<W>,
}

impl ConsolePrinter {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsolePrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    fn print_block(&self, banner: &str, payload: &[u8]) {
        let Ok(mut out) = self.out.lock() else {
            return;
        };

        if let Err(e) = write_block(&mut *out, banner, payload) {
            warn!(cause = %e, "printing failed");
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> Observer for ConsolePrinter<W> {
    fn on_info(&self, message: &str) {
        info!("{message}");
    }

    fn on_error(&self, message: &str) {
        error!("{message}");
    }

    fn on_request(&self, request: &Bytes) {
        self.print_block(REQUEST_BANNER, request);
    }

    fn on_response(&self, response: &Bytes) {
        self.print_block(RESPONSE_BANNER, response);
    }
}

fn write_block<W: Write + ?Sized>(out: &mut W, banner: &str, payload: &[u8]) -> io::Result<()> {
    writeln!(out, "{banner}")?;
    writeln!(out)?;
    writeln!(out, "{}", to_ascii(payload))?;
    writeln!(out, "{CLOSING_RULE}")?;
    out.flush()
}

/// Payloads are shown as ASCII, anything else becomes `?`.
fn to_ascii(payload: &[u8]) -> String {
    payload.iter().map(|&b| if b.is_ascii() { b as char } else { '?' }).collect()
}

/// Writes a configuration error followed by the usage example.
pub fn write_usage_error<W: Write, E: Display>(out: &mut W, error: E) -> io::Result<()> {
    writeln!(out, "error: {error}")?;
    writeln!(out)?;
    writeln!(out, "{USAGE_EXAMPLE}")
}
