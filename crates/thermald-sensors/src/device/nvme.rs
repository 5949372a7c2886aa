//! NVMe namespaces through `nvme-cli`.

use super::UNKNOWN;
use crate::{Error, Result};
use regex::Regex;
use std::sync::OnceLock;

fn number_pattern() -> &'static Regex {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER.get_or_init(|| Regex::new(r"\d+(\.\d+)?").expect("valid number pattern"))
}

/// Extracts the composite temperature from `nvme smart-log` output.
///
/// Lines look like `temperature                             : 35 °C (308 K)`.
/// The first line whose label mentions "temperature" and whose value holds a
/// number wins.
pub(crate) fn parse_smart_log(path: &str, output: &str) -> Result<f64> {
    output
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter(|(label, _)| label.to_lowercase().contains("temperature"))
        .find_map(|(_, value)| {
            number_pattern()
                .find(value)
                .and_then(|m| m.as_str().parse::<f64>().ok())
        })
        .ok_or_else(|| Error::not_found(path, "nvme temperature"))
}

/// Locates the row for `path` in `nvme list` output and returns its model.
///
/// Returns `None` when no row starts with `path`. Column spans come from the
/// dashed ruler below the header because model names contain spaces.
pub(crate) fn parse_list_model(path: &str, output: &str) -> Option<String> {
    let lines: Vec<&str> = output.lines().collect();
    let row = lines
        .iter()
        .find(|line| line.split_whitespace().next() == Some(path))?;

    let model = lines
        .iter()
        .position(|line| is_ruler(line))
        .filter(|&ruler| ruler > 0)
        .and_then(|ruler| {
            let (start, end) = column_span(lines[ruler - 1], lines[ruler], "Model")?;
            let end = end.min(row.len());
            row.get(start..end).map(str::trim)
        })
        .filter(|model| !model.is_empty())
        .unwrap_or(UNKNOWN);

    Some(model.to_string())
}

fn is_ruler(line: &str) -> bool {
    line.contains('-') && line.chars().all(|c| c == '-' || c == ' ')
}

/// Byte span of the column whose header text equals `name`. A column runs
/// from the start of its dash run to the start of the next one, so values
/// wider than the ruler are not cut off.
fn column_span(header: &str, ruler: &str, name: &str) -> Option<(usize, usize)> {
    let starts: Vec<usize> = ruler
        .char_indices()
        .filter(|&(i, c)| c == '-' && (i == 0 || ruler.as_bytes()[i - 1] == b' '))
        .map(|(i, _)| i)
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(n, &start)| (start, starts.get(n + 1).copied().unwrap_or(usize::MAX)))
        .find(|&(start, end)| {
            header
                .get(start..end.min(header.len()))
                .is_some_and(|title| title.trim() == name)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const SMART_LOG: &str = "\
Smart Log for NVME device:nvme0n1 namespace-id:ffffffff
critical_warning                        : 0
temperature                             : 38 °C (311 K)
available_spare                         : 100%
Temperature Sensor 1                    : 38 °C (311 K)
Temperature Sensor 2                    : 44 °C (317 K)
";

    const LIST_V2: &str = "\
Node                  Generic               SN                   Model                                    Namespace Usage                      Format           FW Rev
--------------------- --------------------- -------------------- ---------------------------------------- --------- -------------------------- ---------------- --------
/dev/nvme0n1          /dev/ng0n1            S4EWNX0R123456       Samsung SSD 970 EVO Plus 1TB             1         200.00  GB /   1.00  TB    512   B +  0 B   2B2QEXM7
/dev/nvme1n1          /dev/ng1n1            2032E4A1B2C3         WD_BLACK SN850X 2000GB                   1           1.20  TB /   2.00  TB    512   B +  0 B   620311WD
";

    #[test]
    fn test_parse_smart_log() {
        assert_eq!(parse_smart_log("/dev/nvme0n1", SMART_LOG).unwrap(), 38.0);
    }

    #[test]
    fn test_parse_smart_log_fractional() {
        let output = "Temperature: 41.5 C\n";
        assert_eq!(parse_smart_log("/dev/nvme0n1", output).unwrap(), 41.5);
    }

    #[test]
    fn test_parse_smart_log_skips_labels_without_number() {
        let output = "warning_temperature_time                : \n\
                      temperature                             : 36 °C\n";
        assert_eq!(parse_smart_log("/dev/nvme0n1", output).unwrap(), 36.0);
    }

    #[test]
    fn test_parse_smart_log_missing() {
        let output = "critical_warning : 0\navailable_spare : 100%\n";
        let err = parse_smart_log("/dev/nvme2n1", output).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("/dev/nvme2n1"));
    }

    #[test]
    fn test_parse_list_model() {
        assert_eq!(
            parse_list_model("/dev/nvme0n1", LIST_V2).as_deref(),
            Some("Samsung SSD 970 EVO Plus 1TB")
        );
        assert_eq!(
            parse_list_model("/dev/nvme1n1", LIST_V2).as_deref(),
            Some("WD_BLACK SN850X 2000GB")
        );
    }

    #[test]
    fn test_parse_list_legacy_layout() {
        let output = "\
Node             SN                   Model                                    Namespace Usage                      Format           FW Rev
---------------- -------------------- ---------------------------------------- --------- -------------------------- ---------------- --------
/dev/nvme0n1     S3EWNX0J123456       Samsung SSD 960 EVO 250GB                1          50.00  GB / 250.06  GB    512   B +  0 B   2B7QCXE7
";
        assert_eq!(
            parse_list_model("/dev/nvme0n1", output).as_deref(),
            Some("Samsung SSD 960 EVO 250GB")
        );
    }

    #[test]
    fn test_parse_list_missing_device() {
        assert_eq!(parse_list_model("/dev/nvme3n1", LIST_V2), None);
    }

    #[test]
    fn test_parse_list_without_ruler() {
        let output = "/dev/nvme0n1 S3EWNX0J123456 Samsung\n";
        assert_eq!(
            parse_list_model("/dev/nvme0n1", output).as_deref(),
            Some(UNKNOWN)
        );
    }
}
