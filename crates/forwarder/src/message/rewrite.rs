use std::net::Ipv4Addr;

use crate::message::MessageBuffer;
use crate::scan::find_end;

const HTTP_SCHEME: &[u8] = b"http://";

/// Longest IPv4 literal, `255.255.255.255`.
const MAX_IP_LITERAL_LEN: usize = 15;

impl MessageBuffer {
    /// Rewrites every absolute `http://<ipv4>:<listen_port>` url in the body to
    /// `scheme_and_host`, returning how many were replaced.
    ///
    /// Clients that were handed the proxy's own address embed it in request bodies; the
    /// upstream expects its own origin there. Only the body is touched and the caller is
    /// expected to [`recompute_content_length`](MessageBuffer::recompute_content_length)
    /// afterwards.
    pub fn rewrite_ip_urls(&mut self, listen_port: u16, scheme_and_host: &str) -> usize {
        let Some(mut cursor) = self.header_length() else {
            return 0;
        };

        let port = format!(":{listen_port}");
        let mut replaced = 0;

        while let Some(host_start) = find_end(self.as_bytes(), HTTP_SCHEME, cursor) {
            let Some(port_end) = find_end(self.as_bytes(), port.as_bytes(), host_start) else {
                break;
            };

            let host_end = port_end - port.len();
            let scheme_start = host_start - HTTP_SCHEME.len();
            let port_complete = !self.as_bytes().get(port_end).is_some_and(u8::is_ascii_digit);

            cursor = if port_complete && is_ipv4_literal(&self.as_bytes()[host_start..host_end]) {
                self.splice(scheme_start, port_end - scheme_start, scheme_and_host.as_bytes());
                replaced += 1;
                scheme_start + scheme_and_host.len()
            } else {
                host_start
            };
        }

        replaced
    }
}

fn is_ipv4_literal(host: &[u8]) -> bool {
    host.len() <= MAX_IP_LITERAL_LEN && std::str::from_utf8(host).is_ok_and(|host| host.parse::<Ipv4Addr>().is_ok())
}
