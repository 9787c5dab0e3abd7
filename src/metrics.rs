//! Metric accessors over the active backend.
//!
//! Every numeric read is coerced to `f64`; anything missing or non-numeric
//! comes back as NaN and callers are expected to check. In simulate mode no
//! accessor touches the backend.

use crate::backend::NdtBackend;

/// Remote host reported in simulate mode.
pub const SIMULATED_HOST: &str = "0.0.0.0";

pub const VAR_UPLOAD_SPEED: &str = "ClientToServerSpeed";
pub const VAR_DOWNLOAD_SPEED: &str = "ServerToClientSpeed";
pub const VAR_AVG_RTT: &str = "avgrtt";
pub const VAR_JITTER: &str = "Jitter";
pub const VAR_LOSS: &str = "loss";

#[derive(Clone, Copy)]
pub struct Metrics<'a> {
    backend: Option<&'a dyn NdtBackend>,
    simulate: bool,
}

impl<'a> Metrics<'a> {
    pub fn new(backend: Option<&'a dyn NdtBackend>, simulate: bool) -> Self {
        Self { backend, simulate }
    }

    pub fn is_simulated(&self) -> bool {
        self.simulate
    }

    fn numeric_var(&self, name: &str) -> f64 {
        if self.simulate {
            return 0.0;
        }
        self.backend
            .and_then(|b| b.ndt_var(name))
            .map(|v| parse_float(&v))
            .unwrap_or(f64::NAN)
    }

    /// Client-to-server throughput in kb/s.
    pub fn upload_speed(&self) -> f64 {
        self.numeric_var(VAR_UPLOAD_SPEED)
    }

    /// Server-to-client throughput in kb/s.
    pub fn download_speed(&self) -> f64 {
        self.numeric_var(VAR_DOWNLOAD_SPEED)
    }

    pub fn average_round_trip(&self) -> f64 {
        self.numeric_var(VAR_AVG_RTT)
    }

    pub fn jitter(&self) -> f64 {
        self.numeric_var(VAR_JITTER)
    }

    /// Fraction of packets lost, scaled to percent.
    pub fn packet_loss(&self) -> f64 {
        self.numeric_var(VAR_LOSS) * 100.0
    }

    /// Throughput ceiling implied by the client's buffers, in Mb/s.
    pub fn speed_limit(&self) -> f64 {
        if self.simulate {
            return 0.0;
        }
        self.backend
            .map(|b| parse_float(&b.pc_buff_spd_limit()))
            .unwrap_or(f64::NAN)
    }

    pub fn remote_server(&self) -> String {
        if self.simulate {
            return SIMULATED_HOST.to_string();
        }
        self.backend.map(|b| b.host()).unwrap_or_default()
    }

    /// Raw variable text, `-` when the backend has nothing for it.
    pub fn read_var(&self, name: &str) -> String {
        if self.simulate {
            return "0".to_string();
        }
        match self.backend.and_then(|b| b.ndt_var(name)) {
            Some(v) if !v.is_empty() => v,
            _ => "-".to_string(),
        }
    }

    pub fn errmsg(&self) -> String {
        self.backend.map(|b| b.errmsg()).unwrap_or_default()
    }

    pub fn diagnosis(&self) -> String {
        if self.simulate {
            return String::new();
        }
        self.backend.map(|b| b.diagnosis()).unwrap_or_default()
    }
}

/// Parse the leading decimal number of `text`, ignoring trailing junk.
/// Returns NaN when no number is present.
pub fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if end < bytes.len() && (bytes[end] == b'+' || bytes[end] == b'-') {
        end += 1;
    }
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        if digits > 0 {
            end = frac_end;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }

    // Optional exponent, only if it has digits.
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'+' || bytes[exp_end] == b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse().unwrap_or(f64::NAN)
}
