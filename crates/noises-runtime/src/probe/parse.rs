//! Parsing diagnostic tool output.

use std::sync::OnceLock;

use noises_core::DriverVersion;
use regex::Regex;

fn cuda_version_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"CUDA Version:\s*([\d.]+)").ok())
        .as_ref()
}

/// Accelerator name: first non-empty line of the name query.
pub fn parse_device_name(output: &str) -> Option<String> {
    output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(ToString::to_string)
}

/// Highest toolkit version the driver supports, from the status banner.
pub fn parse_driver_version(output: &str) -> Option<DriverVersion> {
    let captures = cuda_version_regex()?.captures(output)?;
    captures.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATUS_BANNER: &str = "\
+-----------------------------------------------------------------------------------------+
| NVIDIA-SMI 550.54.14              Driver Version: 550.54.14      CUDA Version: 12.4     |
|-----------------------------------------+------------------------+----------------------+
| GPU  Name                 Persistence-M | Bus-Id          Disp.A | Volatile Uncorr. ECC |
";

    #[test]
    fn extracts_cuda_version_from_banner() {
        assert_eq!(
            parse_driver_version(STATUS_BANNER),
            Some(DriverVersion::new(12, 4))
        );
    }

    #[test]
    fn missing_version_line_yields_none() {
        assert_eq!(parse_driver_version("No devices were found"), None);
        assert_eq!(parse_driver_version("CUDA Version: N/A"), None);
    }

    #[test]
    fn device_name_is_first_non_empty_line() {
        let output = "\n  NVIDIA GeForce RTX 4070  \nNVIDIA GeForce GTX 1080\n";
        assert_eq!(
            parse_device_name(output).as_deref(),
            Some("NVIDIA GeForce RTX 4070")
        );
        assert_eq!(parse_device_name("   \n\n"), None);
    }
}
