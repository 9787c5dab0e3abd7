//! Formatting of the final measurements.
//!
//! Produces display-ready pieces for the summary, details and advanced
//! result tabs. Nothing here knows about the terminal; the UI maps the
//! [`Tone`] of each fragment to a style.

use crate::metrics::Metrics;

pub const SPEED_UNITS: [&str; 6] = ["kb/s", "Mb/s", "Gb/s", "Tb/s", "Pb/s", "Eb/s"];

pub const SERVER_RESULTS_MARKER: &str = "=== Results sent by the server ===";

const SECURITY_ERROR: &str = "Security error. This error may be caused by firewall issues, \
make sure that port 843 is available on the NDT server, and that you can access it.";

/// A speed rescaled to the largest unit that keeps the value at or above 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledSpeed {
    pub value: f64,
    pub unit: &'static str,
}

impl ScaledSpeed {
    pub fn from_kbps(speed_kbps: f64) -> Self {
        let exponent = speed_exponent(speed_kbps);
        Self {
            value: speed_kbps / 1000f64.powi(exponent as i32),
            unit: SPEED_UNITS[exponent],
        }
    }

    /// Value with two decimals, `-` when unknown.
    pub fn value_text(&self) -> String {
        if self.value.is_finite() {
            format!("{:.2}", self.value)
        } else {
            "-".to_string()
        }
    }
}

/// Index into [`SPEED_UNITS`] for a speed given in kb/s.
fn speed_exponent(speed_kbps: f64) -> usize {
    let mut exponent = 0;
    let mut value = speed_kbps;
    while value >= 1000.0 && exponent < SPEED_UNITS.len() - 1 {
        value /= 1000.0;
        exponent += 1;
    }
    exponent
}

pub fn speed_unit(speed_kbps: f64) -> &'static str {
    SPEED_UNITS[speed_exponent(speed_kbps)]
}

/// Plain number text, `-` for NaN.
pub fn number_text(value: f64) -> String {
    if value.is_nan() {
        "-".to_string()
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jitter {
    pub value: String,
    pub unit: &'static str,
}

impl Jitter {
    pub fn from_ms(jitter_ms: f64) -> Self {
        if jitter_ms >= 1000.0 {
            Self {
                value: number_text(jitter_ms / 1000.0),
                unit: "sec",
            }
        } else {
            Self {
                value: number_text(jitter_ms),
                unit: "msec",
            }
        }
    }
}

impl std::fmt::Display for Jitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

pub fn format_jitter(jitter_ms: f64) -> String {
    Jitter::from_ms(jitter_ms).to_string()
}

/// Rounded latency in ms, `-` when unknown.
pub fn latency_text(rtt_ms: f64) -> String {
    number_text(rtt_ms.round())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Bold,
    Good,
    Bad,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub tone: Tone,
}

fn plain(text: impl Into<String>) -> Fragment {
    Fragment {
        text: text.into(),
        tone: Tone::Plain,
    }
}

fn bold(text: impl Into<String>) -> Fragment {
    Fragment {
        text: text.into(),
        tone: Tone::Bold,
    }
}

/// One line of the details report. An empty line is a spacer.
pub type DetailLine = Vec<Fragment>;

fn flag_line(flagged: bool, bad: &str, good: &str) -> DetailLine {
    if flagged {
        vec![Fragment {
            text: bad.to_string(),
            tone: Tone::Bad,
        }]
    } else {
        vec![Fragment {
            text: good.to_string(),
            tone: Tone::Good,
        }]
    }
}

/// The "details" report built from the named backend variables.
pub fn test_details(metrics: &Metrics<'_>) -> Vec<DetailLine> {
    if metrics.is_simulated() {
        return vec![vec![plain("Test details")]];
    }

    let var = |name: &str| metrics.read_var(name);
    let mut lines: Vec<DetailLine> = Vec::new();

    let errmsg = metrics.errmsg();
    if errmsg.contains("failed") {
        lines.push(vec![bold("Error occured while performing test:")]);
        let message = if errmsg.contains("#2048") {
            SECURITY_ERROR.to_string()
        } else {
            errmsg
        };
        lines.push(vec![Fragment {
            text: message,
            tone: Tone::Bad,
        }]);
        lines.push(Vec::new());
    }

    lines.push(vec![plain("Your system: "), bold(var("OperatingSystem"))]);
    lines.push(vec![
        plain("Plugin version: "),
        bold(format!(
            "{} ({})",
            var("PluginVersion"),
            var("OsArchitecture")
        )),
    ]);
    lines.push(Vec::new());

    lines.push(vec![
        plain("TCP receive window: "),
        bold(var("CurRwinRcvd")),
        plain(" current, "),
        bold(var("MaxRwinRcvd")),
        plain(" maximum"),
    ]);
    lines.push(vec![
        bold(loss_text(metrics.packet_loss())),
        plain(" % of packets lost during test"),
    ]);
    lines.push(vec![
        plain("Round trip time: "),
        bold(var("MinRTT")),
        plain(" msec (minimum), "),
        bold(var("MaxRTT")),
        plain(" msec (maximum), "),
        bold(latency_text(metrics.average_round_trip())),
        plain(" msec (average)"),
    ]);
    let jitter = Jitter::from_ms(metrics.jitter());
    lines.push(vec![
        plain("Jitter: "),
        bold(jitter.value),
        plain(format!(" {}", jitter.unit)),
    ]);
    lines.push(vec![
        bold(var("waitsec")),
        plain(" seconds spend waiting following a timeout"),
    ]);
    lines.push(vec![plain("TCP time-out counter: "), bold(var("CurRTO"))]);
    lines.push(vec![
        bold(var("SACKsRcvd")),
        plain(" selective acknowledgement packets received"),
    ]);
    lines.push(Vec::new());

    lines.push(flag_line(
        var("mismatch") == "yes",
        "A duplex mismatch condition was detected.",
        "No duplex mismatch condition was detected.",
    ));
    lines.push(flag_line(
        var("bad_cable") == "yes",
        "The test detected a cable fault.",
        "The test did not detect a cable fault.",
    ));
    lines.push(flag_line(
        var("congestion") == "yes",
        "Network congestion may be limiting the connection.",
        "No network congestion was detected.",
    ));
    lines.push(Vec::new());

    lines.push(vec![
        bold(var("cwndtime")),
        plain(" % of the time was not spent in a receiver limited or sender limited state."),
    ]);
    lines.push(vec![
        bold(var("rwintime")),
        plain(" % of the time the connection is limited by the client machine's receive buffer."),
    ]);
    lines.push(vec![
        plain("Optimal receive buffer: "),
        bold(var("optimalRcvrBuffer")),
        plain(" bytes"),
    ]);
    lines.push(vec![plain("Bottleneck link: "), bold(var("accessTech"))]);
    lines.push(vec![bold(var("DupAcksIn")), plain(" duplicate ACKs set")]);

    lines
}

fn loss_text(loss_percent: f64) -> String {
    if loss_percent.is_nan() {
        "-".to_string()
    } else {
        format!("{:.2}", loss_percent)
    }
}

/// Diagnostic text split into free text and the server's results table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnosis {
    pub text: String,
    pub table: Vec<Vec<String>>,
}

/// Split the backend's multi-line diagnosis.
///
/// Lines before the results marker are free text. After the marker every
/// line containing a colon becomes a table row of its colon-separated
/// fields; the first line without one ends the table and is appended to the
/// text. The marker itself is appended last.
pub fn parse_diagnosis(raw: &str) -> Diagnosis {
    let mut text = String::new();
    let mut table = Vec::new();
    let mut in_table = false;

    for line in raw.split('\n') {
        if in_table {
            if line.contains(':') {
                table.push(line.split(':').map(|cell| cell.trim().to_string()).collect());
            } else {
                in_table = false;
                text.push_str(line);
            }
        } else if line.contains(SERVER_RESULTS_MARKER) {
            table.clear();
            in_table = true;
        } else {
            text.push_str(line);
            text.push('\n');
        }
    }
    text.push_str(SERVER_RESULTS_MARKER);

    Diagnosis { text, table }
}

pub fn test_diagnosis(metrics: &Metrics<'_>) -> Diagnosis {
    if metrics.is_simulated() {
        return Diagnosis {
            text: "Test diagnosis".to_string(),
            table: Vec::new(),
        };
    }
    parse_diagnosis(&metrics.diagnosis())
}

/// Everything shown on the results page, computed once on entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub download: ScaledSpeed,
    pub upload: ScaledSpeed,
    pub latency: String,
    pub jitter: String,
    pub details: Vec<DetailLine>,
    pub diagnosis: Diagnosis,
}

pub fn render_results(metrics: &Metrics<'_>) -> ResultsView {
    ResultsView {
        download: ScaledSpeed::from_kbps(metrics.download_speed()),
        upload: ScaledSpeed::from_kbps(metrics.upload_speed()),
        latency: latency_text(metrics.average_round_trip()),
        jitter: format_jitter(metrics.jitter()),
        details: test_details(metrics),
        diagnosis: test_diagnosis(metrics),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::NdtBackend;
    use crate::test_utils::ScriptedBackend;

    fn line_text(line: &DetailLine) -> String {
        line.iter().map(|f| f.text.as_str()).collect()
    }

    #[test]
    fn test_speed_unit_boundaries() {
        assert_eq!(speed_unit(999.0), "kb/s");
        assert_eq!(speed_unit(1000.0), "Mb/s");
        assert_eq!(speed_unit(999_999.0), "Mb/s");
        assert_eq!(speed_unit(1_000_000.0), "Gb/s");
        assert_eq!(speed_unit(1e18), "Eb/s");
        assert_eq!(speed_unit(1e21), "Eb/s");
    }

    #[test]
    fn test_speed_unit_small_and_unknown() {
        assert_eq!(speed_unit(0.0), "kb/s");
        assert_eq!(speed_unit(0.5), "kb/s");
        assert_eq!(speed_unit(f64::NAN), "kb/s");
    }

    #[test]
    fn test_scaled_speed_value() {
        let speed = ScaledSpeed::from_kbps(94_250.0);
        assert_eq!(speed.unit, "Mb/s");
        assert_eq!(speed.value_text(), "94.25");

        let speed = ScaledSpeed::from_kbps(999.0);
        assert_eq!(speed.value_text(), "999.00");

        assert_eq!(ScaledSpeed::from_kbps(f64::NAN).value_text(), "-");
    }

    #[test]
    fn test_jitter_unit_switch() {
        assert_eq!(format_jitter(999.0), "999 msec");
        assert_eq!(format_jitter(1000.0), "1 sec");
        assert_eq!(format_jitter(2500.0), "2.5 sec");
        assert_eq!(format_jitter(f64::NAN), "- msec");
    }

    #[test]
    fn test_latency_rounding() {
        assert_eq!(latency_text(12.4), "12");
        assert_eq!(latency_text(12.5), "13");
        assert_eq!(latency_text(f64::NAN), "-");
    }

    #[test]
    fn test_parse_diagnosis_table() {
        let raw = "Client checks\nAll good\n=== Results sent by the server ===\nCurMSS: 1448\nMaxRTT: 40\ntrailing text\nafter";
        let diagnosis = parse_diagnosis(raw);

        assert_eq!(
            diagnosis.table,
            vec![
                vec!["CurMSS".to_string(), "1448".to_string()],
                vec!["MaxRTT".to_string(), "40".to_string()],
            ]
        );
        assert_eq!(
            diagnosis.text,
            "Client checks\nAll good\ntrailing textafter\n=== Results sent by the server ==="
        );
    }

    #[test]
    fn test_parse_diagnosis_without_marker() {
        let diagnosis = parse_diagnosis("a: 1\nb");
        assert!(diagnosis.table.is_empty());
        assert_eq!(diagnosis.text, "a: 1\nb\n=== Results sent by the server ===");
    }

    #[test]
    fn test_parse_diagnosis_table_to_end() {
        let diagnosis = parse_diagnosis("=== Results sent by the server ===\nx:1:2");
        assert_eq!(diagnosis.table, vec![vec!["x", "1", "2"]]);
    }

    #[test]
    fn test_simulated_details_and_diagnosis() {
        let metrics = Metrics::new(None, true);
        let details = test_details(&metrics);
        assert_eq!(details.len(), 1);
        assert_eq!(line_text(&details[0]), "Test details");
        assert_eq!(test_diagnosis(&metrics).text, "Test diagnosis");
    }

    #[test]
    fn test_details_flags_and_placeholders() {
        let backend = ScriptedBackend::new();
        backend.run_test("ndt.example.org").unwrap();
        backend.store().set_var("mismatch", "yes");
        backend.store().set_var("bad_cable", "no");
        backend.store().set_var("OperatingSystem", "Linux");

        let metrics = Metrics::new(Some(&backend), false);
        let details = test_details(&metrics);

        let mismatch = details
            .iter()
            .find(|l| line_text(l).contains("duplex mismatch"))
            .unwrap();
        assert_eq!(mismatch[0].tone, Tone::Bad);
        assert_eq!(line_text(mismatch), "A duplex mismatch condition was detected.");

        let cable = details
            .iter()
            .find(|l| line_text(l).contains("cable fault"))
            .unwrap();
        assert_eq!(cable[0].tone, Tone::Good);

        assert!(details
            .iter()
            .any(|l| line_text(l) == "Your system: Linux"));
        assert!(details
            .iter()
            .any(|l| line_text(l) == "TCP time-out counter: -"));
        assert!(!details
            .iter()
            .any(|l| line_text(l).contains("Error occured")));
    }

    #[test]
    fn test_details_security_error_banner() {
        let backend = ScriptedBackend::new();
        backend.store().set_errmsg("Test failed: Error #2048");

        let metrics = Metrics::new(Some(&backend), false);
        let details = test_details(&metrics);

        assert_eq!(line_text(&details[0]), "Error occured while performing test:");
        assert!(line_text(&details[1]).starts_with("Security error."));
        assert_eq!(details[1][0].tone, Tone::Bad);
    }

    #[test]
    fn test_details_generic_error_banner() {
        let backend = ScriptedBackend::new();
        backend.store().set_errmsg("Test failed: server busy");

        let metrics = Metrics::new(Some(&backend), false);
        let details = test_details(&metrics);
        assert_eq!(line_text(&details[1]), "Test failed: server busy");
    }

    #[test]
    fn test_render_results_summary() {
        let backend = ScriptedBackend::new();
        backend.store().set_var("ServerToClientSpeed", "94250");
        backend.store().set_var("ClientToServerSpeed", "850");
        backend.store().set_var("avgrtt", "23.6");
        backend.store().set_var("Jitter", "4");

        let metrics = Metrics::new(Some(&backend), false);
        let view = render_results(&metrics);

        assert_eq!(view.download.unit, "Mb/s");
        assert_eq!(view.download.value_text(), "94.25");
        assert_eq!(view.upload.unit, "kb/s");
        assert_eq!(view.latency, "24");
        assert_eq!(view.jitter, "4 msec");
    }
}
