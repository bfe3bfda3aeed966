//! Connection counts per TCP state from `/proc/net/tcp` and `/proc/net/tcp6`.
//!
//! Both files share one layout: a header line starting with `sl`, then one row per
//! socket whose fourth whitespace-separated field is the state as a hex byte:
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    0: 0100007F:0035 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 1234
//! ```
//!
//! Every state code the kernel can emit for these files maps to one [`TcpState`]; any
//! other code is malformed content, never a skipped row.

use serde::Serialize;

use super::source::{PseudoFile, PseudoFs};
use super::{Result, SensorError};

const HEADER_TOKEN: &str = "sl";
const STATE_FIELD: usize = 3;

/// Address family of a TCP table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    pub const ALL: [AddressFamily; 2] = [AddressFamily::Ipv4, AddressFamily::Ipv6];

    pub const fn pseudo_file(self) -> PseudoFile {
        match self {
            AddressFamily::Ipv4 => PseudoFile::ProcNetTcp,
            AddressFamily::Ipv6 => PseudoFile::ProcNetTcp6,
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AddressFamily::Ipv4 => "ipv4",
            AddressFamily::Ipv6 => "ipv6",
        };
        write!(f, "{name}")
    }
}

/// Linux TCP states, as numbered in `include/net/tcp_states.h`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TcpState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
}

impl TcpState {
    pub const ALL: [TcpState; 11] = [
        TcpState::Established,
        TcpState::SynSent,
        TcpState::SynRecv,
        TcpState::FinWait1,
        TcpState::FinWait2,
        TcpState::TimeWait,
        TcpState::Close,
        TcpState::CloseWait,
        TcpState::LastAck,
        TcpState::Listen,
        TcpState::Closing,
    ];

    pub const fn from_code(code: u8) -> Option<TcpState> {
        match code {
            0x01 => Some(TcpState::Established),
            0x02 => Some(TcpState::SynSent),
            0x03 => Some(TcpState::SynRecv),
            0x04 => Some(TcpState::FinWait1),
            0x05 => Some(TcpState::FinWait2),
            0x06 => Some(TcpState::TimeWait),
            0x07 => Some(TcpState::Close),
            0x08 => Some(TcpState::CloseWait),
            0x09 => Some(TcpState::LastAck),
            0x0A => Some(TcpState::Listen),
            0x0B => Some(TcpState::Closing),
            _ => None,
        }
    }
}

/// Number of sockets in each TCP state, for one address family at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TcpConnectionSnapshot {
    /// Sockets in state `ESTABLISHED` (`01`).
    pub established: u64,
    /// Sockets in state `SYN_SENT` (`02`).
    pub syn_sent: u64,
    /// Sockets in state `SYN_RECV` (`03`).
    pub syn_recv: u64,
    /// Sockets in state `FIN_WAIT1` (`04`).
    pub fin_wait1: u64,
    /// Sockets in state `FIN_WAIT2` (`05`).
    pub fin_wait2: u64,
    /// Sockets in state `TIME_WAIT` (`06`).
    pub time_wait: u64,
    /// Sockets in state `CLOSE` (`07`).
    pub close: u64,
    /// Sockets in state `CLOSE_WAIT` (`08`).
    pub close_wait: u64,
    /// Sockets in state `LAST_ACK` (`09`).
    pub last_ack: u64,
    /// Sockets in state `LISTEN` (`0A`).
    pub listen: u64,
    /// Sockets in state `CLOSING` (`0B`).
    pub closing: u64,
}

impl TcpConnectionSnapshot {
    pub fn count(&self, state: TcpState) -> u64 {
        match state {
            TcpState::Established => self.established,
            TcpState::SynSent => self.syn_sent,
            TcpState::SynRecv => self.syn_recv,
            TcpState::FinWait1 => self.fin_wait1,
            TcpState::FinWait2 => self.fin_wait2,
            TcpState::TimeWait => self.time_wait,
            TcpState::Close => self.close,
            TcpState::CloseWait => self.close_wait,
            TcpState::LastAck => self.last_ack,
            TcpState::Listen => self.listen,
            TcpState::Closing => self.closing,
        }
    }

    pub fn total(&self) -> u64 {
        TcpState::ALL.iter().map(|state| self.count(*state)).sum()
    }

    fn counter_mut(&mut self, state: TcpState) -> &mut u64 {
        match state {
            TcpState::Established => &mut self.established,
            TcpState::SynSent => &mut self.syn_sent,
            TcpState::SynRecv => &mut self.syn_recv,
            TcpState::FinWait1 => &mut self.fin_wait1,
            TcpState::FinWait2 => &mut self.fin_wait2,
            TcpState::TimeWait => &mut self.time_wait,
            TcpState::Close => &mut self.close,
            TcpState::CloseWait => &mut self.close_wait,
            TcpState::LastAck => &mut self.last_ack,
            TcpState::Listen => &mut self.listen,
            TcpState::Closing => &mut self.closing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TcpStateParser {
    fs: PseudoFs,
}

impl TcpStateParser {
    pub fn new(fs: PseudoFs) -> Self {
        Self { fs }
    }

    /// Scans the TCP table of `family` once and tallies its sockets by state.
    pub fn snapshot(&self, family: AddressFamily) -> Result<TcpConnectionSnapshot> {
        let file = family.pseudo_file();
        let buf = self.fs.read_all(file)?;
        parse_tcp_table(&buf)
            .map_err(|reason| SensorError::malformed(&self.fs.path(file), reason))
    }
}

fn parse_tcp_table(content: &str) -> std::result::Result<TcpConnectionSnapshot, String> {
    let mut lines = content.lines().filter(|line| !line.trim().is_empty());

    let header = lines.next().ok_or("missing header line")?;
    if !header.trim_start().starts_with(HEADER_TOKEN) {
        return Err(format!("expected header starting with '{HEADER_TOKEN}', got '{header}'"));
    }

    let mut snapshot = TcpConnectionSnapshot::default();
    for line in lines {
        let field = line
            .split_whitespace()
            .nth(STATE_FIELD)
            .ok_or_else(|| format!("missing state field in '{line}'"))?;
        let code = u8::from_str_radix(field, 16)
            .map_err(|_| format!("invalid state field '{field}' in '{line}'"))?;
        let state =
            TcpState::from_code(code).ok_or_else(|| format!("unknown TCP state 0x{code:02X}"))?;
        *snapshot.counter_mut(state) += 1;
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::StubReader;

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    fn row(sl: usize, state: &str) -> String {
        format!(
            "{sl:4}: 0100007F:0035 00000000:0000 {state} 00000000:00000000 00:00000000 00000000     0        0 {} 1 0000000000000000 100 0 0 10 0",
            1000 + sl
        )
    }

    fn table(states: &[&str]) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for (sl, state) in states.iter().enumerate() {
            out.push_str(&row(sl, state));
            out.push('\n');
        }
        out
    }

    fn parser(family: AddressFamily, content: &str) -> TcpStateParser {
        TcpStateParser::new(
            StubReader::new()
                .with_file(family.pseudo_file(), content)
                .into_fs(),
        )
    }

    #[test]
    fn test_listen_established_time_wait() {
        let tcp = parser(AddressFamily::Ipv4, &table(&["0A", "01", "06"]));
        let snapshot = tcp.snapshot(AddressFamily::Ipv4).unwrap();
        assert_eq!(
            snapshot,
            TcpConnectionSnapshot {
                listen: 1,
                established: 1,
                time_wait: 1,
                ..Default::default()
            }
        );
        assert_eq!(snapshot.total(), 3);
    }

    #[test]
    fn test_every_state_code() {
        let codes = ["01", "02", "03", "04", "05", "06", "07", "08", "09", "0A", "0B"];
        let tcp = parser(AddressFamily::Ipv6, &table(&codes));
        let snapshot = tcp.snapshot(AddressFamily::Ipv6).unwrap();
        for state in TcpState::ALL {
            assert_eq!(snapshot.count(state), 1, "{state:?}");
        }
    }

    #[test]
    fn test_lowercase_hex() {
        let tcp = parser(AddressFamily::Ipv4, &table(&["0a", "0b"]));
        let snapshot = tcp.snapshot(AddressFamily::Ipv4).unwrap();
        assert_eq!(snapshot.listen, 1);
        assert_eq!(snapshot.closing, 1);
    }

    #[test]
    fn test_header_only() {
        let tcp = parser(AddressFamily::Ipv4, &format!("{HEADER}\n"));
        let snapshot = tcp.snapshot(AddressFamily::Ipv4).unwrap();
        assert_eq!(snapshot, TcpConnectionSnapshot::default());
    }

    #[test]
    fn test_leading_blank_lines_before_header() {
        let tcp = parser(AddressFamily::Ipv4, &format!("\n\n{}", table(&["01"])));
        assert_eq!(tcp.snapshot(AddressFamily::Ipv4).unwrap().established, 1);
    }

    #[test]
    fn test_missing_header() {
        let tcp = parser(AddressFamily::Ipv4, &row(0, "01"));
        let err = tcp.snapshot(AddressFamily::Ipv4).unwrap_err();
        match err {
            SensorError::MalformedPseudoFile { path, reason } => {
                assert!(path.ends_with("proc/net/tcp"));
                assert!(reason.contains("header"));
            }
            other => panic!("Expected MalformedPseudoFile, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_file() {
        let tcp = parser(AddressFamily::Ipv4, "");
        assert!(tcp.snapshot(AddressFamily::Ipv4).unwrap_err().is_malformed());
    }

    #[test]
    fn test_unknown_state_code() {
        for code in ["00", "0C", "FF"] {
            let tcp = parser(AddressFamily::Ipv4, &table(&["01", code]));
            let err = tcp.snapshot(AddressFamily::Ipv4).unwrap_err();
            assert!(err.is_malformed(), "{code}");
        }
    }

    #[test]
    fn test_non_hex_state_field() {
        let tcp = parser(AddressFamily::Ipv4, &table(&["ZZ"]));
        assert!(tcp.snapshot(AddressFamily::Ipv4).unwrap_err().is_malformed());
    }

    #[test]
    fn test_truncated_row() {
        let content = format!("{HEADER}\n   0: 0100007F:0035 00000000:0000\n");
        let tcp = parser(AddressFamily::Ipv4, &content);
        assert!(tcp.snapshot(AddressFamily::Ipv4).unwrap_err().is_malformed());
    }

    #[test]
    fn test_same_content_same_snapshot() {
        let tcp = parser(AddressFamily::Ipv6, &table(&["01", "01", "0A"]));
        let first = tcp.snapshot(AddressFamily::Ipv6).unwrap();
        let second = tcp.snapshot(AddressFamily::Ipv6).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.established, 2);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let tcp = parser(AddressFamily::Ipv4, &table(&[]));
        let err = tcp.snapshot(AddressFamily::Ipv6).unwrap_err();
        assert!(err.is_unavailable());
        assert!(err.path().unwrap().ends_with("proc/net/tcp6"));
    }
}
