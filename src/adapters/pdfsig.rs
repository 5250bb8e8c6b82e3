//! pdfsig tool adapter.
//!
//! PDF signature validation is delegated to the `pdfsig` CLI from the
//! Poppler suite. This adapter discovers the tool, runs it against a
//! scoped temporary file under a bounded timeout, and parses its textual
//! report.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use crate::infra::error::{ProcessorError, ProcessorResult};

/// Default bound on one pdfsig invocation
pub const DEFAULT_PDFSIG_TIMEOUT: Duration = Duration::from_secs(30);

/// Conventional install locations probed besides the search path
const KNOWN_LOCATIONS: &[&str] = &[
    "/usr/bin/pdfsig",
    "/opt/homebrew/bin/pdfsig",
    "/usr/local/bin/pdfsig",
];

/// Discovered pdfsig installation
#[derive(Debug, Clone)]
pub struct PdfsigTool {
    path: Option<PathBuf>,
}

impl PdfsigTool {
    /// Probe the conventional locations and the process search path
    #[must_use]
    pub fn detect() -> Self {
        for location in KNOWN_LOCATIONS {
            let path = Path::new(location);
            if path.is_file() {
                return PdfsigTool {
                    path: Some(path.to_path_buf()),
                };
            }
        }
        PdfsigTool {
            path: search_path("pdfsig"),
        }
    }

    /// Adapter for a known binary location (tests)
    #[must_use]
    pub fn at(path: PathBuf) -> Self {
        PdfsigTool { path: Some(path) }
    }

    /// Adapter representing a missing tool
    #[must_use]
    pub fn unavailable() -> Self {
        PdfsigTool { path: None }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }

    /// Detected binary path
    #[must_use]
    pub fn tool_path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write `pdf` to a temporary file, run `pdfsig -dump` on it and
    /// return stdout. The temporary file is removed on every exit path.
    pub async fn dump(&self, pdf: &[u8], timeout: Duration) -> ProcessorResult<String> {
        let Some(tool) = &self.path else {
            return Err(ProcessorError::ToolUnavailable("pdfsig".to_string()));
        };

        let mut tmp = tempfile::Builder::new()
            .prefix("verify-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| ProcessorError::Io(format!("failed to create temp file: {e}")))?;
        tmp.write_all(pdf)
            .map_err(|e| ProcessorError::Io(format!("failed to write temp file: {e}")))?;
        tmp.flush()
            .map_err(|e| ProcessorError::Io(format!("failed to write temp file: {e}")))?;

        let mut command = tokio::process::Command::new(tool);
        command.arg("-dump").arg(tmp.path());

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| {
                ProcessorError::ToolUnavailable(format!(
                    "pdfsig timed out after {}s",
                    timeout.as_secs()
                ))
            })?
            .map_err(|e| ProcessorError::Io(format!("pdfsig failed to start: {e}")))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        // pdfsig exits non-zero for some valid reports; only an empty
        // stdout is treated as failure
        if stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessorError::Io(format!(
                "pdfsig failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        Ok(stdout)
    }
}

fn search_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate = dir.join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Platform-specific install instructions shown when the tool is missing
#[must_use]
pub fn install_instructions() -> &'static str {
    "pdfsig is required for PDF signature verification.\n\
     \n\
     Installation:\n\
       - Ubuntu/Debian: sudo apt install poppler-utils\n\
       - macOS:         brew install poppler\n\
       - Fedora/RHEL:   sudo dnf install poppler-utils\n\
       - Windows:       install poppler from https://github.com/oschwartz10612/poppler-windows/releases\n\
     \n\
     After installation, ensure 'pdfsig' is in your PATH."
}

/// One signature block from a pdfsig report
#[derive(Debug, Clone, Default)]
pub struct PdfSignature {
    pub index: u32,
    pub signer_common_name: String,
    pub signer_distinguished_name: String,
    pub signing_time: Option<DateTime<Utc>>,
    pub hash_algorithm: String,
    pub signature_type: String,
    pub signature_valid: bool,
    pub cert_trusted: bool,
    pub error_message: String,
}

/// Parsed pdfsig report
#[derive(Debug, Clone, Default)]
pub struct PdfsigReport {
    pub signatures: Vec<PdfSignature>,
}

impl PdfsigReport {
    #[must_use]
    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }
}

/// Parse the line-oriented `pdfsig -dump` report
#[must_use]
pub fn parse_report(output: &str) -> PdfsigReport {
    let mut report = PdfsigReport::default();
    let mut current: Option<PdfSignature> = None;

    for raw_line in output.lines() {
        let line = raw_line.trim().trim_start_matches('-').trim();
        if line.is_empty() {
            continue;
        }

        if let Some(index) = parse_signature_header(line) {
            if let Some(sig) = current.take() {
                report.signatures.push(sig);
            }
            current = Some(PdfSignature {
                index,
                ..PdfSignature::default()
            });
            continue;
        }

        let Some(sig) = current.as_mut() else {
            continue;
        };

        if let Some(value) = line.strip_prefix("Signer Certificate Common Name:") {
            sig.signer_common_name = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Signer Certificate Full Distinguished Name:")
        {
            sig.signer_distinguished_name = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Signing Time:") {
            sig.signing_time = parse_signing_time(value.trim());
        } else if let Some(value) = line.strip_prefix("Signing Hash Algorithm:") {
            sig.hash_algorithm = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Signature Type:") {
            sig.signature_type = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("Signature Validation:") {
            let status = value.trim();
            let lowered = status.to_lowercase();
            sig.signature_valid =
                lowered.contains("valid") && !lowered.contains("invalid");
            if !sig.signature_valid {
                sig.error_message = status.to_string();
            }
        } else if let Some(value) = line.strip_prefix("Certificate Validation:") {
            let lowered = value.trim().to_lowercase();
            sig.cert_trusted =
                lowered.contains("trusted") && !lowered.contains("not trusted");
        }
    }

    if let Some(sig) = current.take() {
        report.signatures.push(sig);
    }
    report
}

fn parse_signature_header(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("Signature #")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() || !rest[digits.len()..].starts_with(':') {
        return None;
    }
    digits.parse().ok()
}

/// pdfsig prints signing times in several textual formats
fn parse_signing_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    const FORMATS: &[&str] = &[
        "%b %d %Y %H:%M:%S",
        "%b %e %Y %H:%M:%S",
        "%a %b %d %H:%M:%S %Y",
        "%a %b %e %H:%M:%S %Y",
        "%Y-%m-%dT%H:%M:%S",
    ];
    for fmt in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }
    None
}

/// Issuer organization from a distinguished name such as
/// `CN=...,OU=...,O=Issuer,C=VN`
#[must_use]
pub fn issuer_from_distinguished_name(dn: &str) -> String {
    dn.split(',')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("O="))
        .unwrap_or_default()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_REPORT: &str = "Digital Signature Info of: /tmp/verify-x.pdf\n\
Signature #1:\n\
  - Signer Certificate Common Name: NGUYEN VAN A\n\
  - Signer Certificate Full Distinguished Name: CN=NGUYEN VAN A,O=ABC Company,C=VN\n\
  - Signing Time: Jan 15 2026 10:30:00\n\
  - Signing Hash Algorithm: SHA-256\n\
  - Signature Type: adbe.pkcs7.detached\n\
  - Signed Ranges: [0 - 1234], [5678 - 9999]\n\
  - Signature Validation: Signature is Valid.\n\
  - Certificate Validation: Certificate issuer is Trusted.\n\
Signature #2:\n\
  - Signer Certificate Common Name: TRAN THI B\n\
  - Signature Validation: Signature is Invalid.\n\
  - Certificate Validation: Certificate issuer is not Trusted.\n";

    #[test]
    fn test_parse_report_blocks() {
        let report = parse_report(SAMPLE_REPORT);
        assert_eq!(report.signature_count(), 2);

        let first = &report.signatures[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.signer_common_name, "NGUYEN VAN A");
        assert_eq!(
            first.signer_distinguished_name,
            "CN=NGUYEN VAN A,O=ABC Company,C=VN"
        );
        assert_eq!(first.hash_algorithm, "SHA-256");
        assert_eq!(first.signature_type, "adbe.pkcs7.detached");
        assert!(first.signature_valid);
        assert!(first.cert_trusted);
        assert!(first.signing_time.is_some());

        let second = &report.signatures[1];
        assert_eq!(second.index, 2);
        assert!(!second.signature_valid);
        assert_eq!(second.error_message, "Signature is Invalid.");
        assert!(!second.cert_trusted);
    }

    #[test]
    fn test_verdict_wording() {
        // "Invalid" contains "valid" as a substring; the negative check
        // must win
        let report = parse_report("Signature #1:\n  - Signature Validation: Invalid\n");
        assert!(!report.signatures[0].signature_valid);

        let report = parse_report(
            "Signature #1:\n  - Certificate Validation: Certificate issuer is not trusted\n",
        );
        assert!(!report.signatures[0].cert_trusted);
    }

    #[test]
    fn test_parse_empty_report() {
        let report = parse_report("Digital Signature Info: no signatures\n");
        assert_eq!(report.signature_count(), 0);
    }

    #[test]
    fn test_signing_time_formats() {
        assert!(parse_signing_time("Jan 15 2026 10:30:00").is_some());
        assert!(parse_signing_time("Mon Jan 15 10:30:00 2026").is_some());
        assert!(parse_signing_time("2026-01-15T10:30:00Z").is_some());
        assert!(parse_signing_time("2026-01-15T10:30:00").is_some());
        assert!(parse_signing_time("whenever").is_none());
    }

    #[test]
    fn test_issuer_from_dn() {
        assert_eq!(
            issuer_from_distinguished_name("CN=X,OU=Y,O=Some CA,C=VN"),
            "Some CA"
        );
        assert_eq!(issuer_from_distinguished_name("CN=X"), "");
    }

    #[test]
    fn test_unavailable_tool() {
        let tool = PdfsigTool::unavailable();
        assert!(!tool.is_available());
        assert!(tool.tool_path().is_none());
    }

    #[tokio::test]
    async fn test_dump_without_tool_errors() {
        let tool = PdfsigTool::unavailable();
        let err = tool
            .dump(b"%PDF-1.7", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "TOOL_UNAVAILABLE");
    }
}
