//! Finding likely receipt printers among the spooler's queues.
//!
//! Queue names are free-form, so this is a name heuristic and nothing more.

use std::process::Stdio;

use tokio::process::Command;

use crate::error::TransportError;

/// Name fragments that usually mean a receipt printer.
pub const RECEIPT_KEYWORDS: &[&str] = &[
    "receipt", "thermal", "pos", "tm-", "xprinter", "rongta", "star", "epson",
];

/// Virtual printers that match a keyword by accident ("Microsoft Print to PDF").
pub const VIRTUAL_PRINTERS: &[&str] = &["pdf", "xps", "fax", "onenote"];

/// Whether `name` looks like a receipt printer.
///
/// ```
/// use rasid::discovery::looks_like_receipt_printer;
///
/// assert!(looks_like_receipt_printer("EPSON TM-T20II Receipt"));
/// assert!(!looks_like_receipt_printer("Microsoft Print to PDF"));
/// ```
pub fn looks_like_receipt_printer(name: &str) -> bool {
    let name = name.to_lowercase();
    if VIRTUAL_PRINTERS.iter().any(|v| name.contains(v)) {
        return false;
    }
    RECEIPT_KEYWORDS.iter().any(|k| name.contains(k))
}

/// Keep the names that look like receipt printers, in order.
pub fn filter_receipt_printers<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter(|name| looks_like_receipt_printer(name.as_ref()))
        .map(|name| name.as_ref().to_string())
        .collect()
}

/// Every queue `lpstat -e` reports.
pub async fn list_queues() -> Result<Vec<String>, TransportError> {
    let output = Command::new("lpstat")
        .arg("-e")
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| TransportError::Unavailable(format!("cannot run lpstat: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TransportError::Unavailable(format!("lpstat -e: {}", stderr.trim())));
    }
    let queues = parse_queue_list(&String::from_utf8_lossy(&output.stdout));
    tracing::debug!(count = queues.len(), "listed spooler queues");
    Ok(queues)
}

fn parse_queue_list(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_filter() {
        let names = [
            "Microsoft Print to PDF",
            "Kitchen_TM-T88V",
            "HP_LaserJet",
            "XPrinter_XP-58",
            "Fax",
            "Star_TSP100",
            "OneNote for Windows 10",
            "POS-80",
        ];
        assert_eq!(
            filter_receipt_printers(names),
            vec!["Kitchen_TM-T88V", "XPrinter_XP-58", "Star_TSP100", "POS-80"]
        );
    }

    #[test]
    fn test_virtual_printer_excluded_even_with_keyword() {
        assert!(!looks_like_receipt_printer("Receipt to PDF"));
        assert!(looks_like_receipt_printer("thermal"));
    }

    #[test]
    fn test_parse_queue_list() {
        assert_eq!(
            parse_queue_list("TM-T20\n\n  office  \n"),
            vec!["TM-T20".to_string(), "office".to_string()]
        );
    }
}
