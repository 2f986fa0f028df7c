//! Probe command handler.

use noises_core::ports::probe_or_absent;
use noises_core::{CapabilityReport, VariantTable};
use serde_json::json;

use crate::bootstrap::CliContext;
use crate::error::CliError;

/// Print the capability report and the runtime build it resolves to.
pub async fn execute(ctx: &CliContext, as_json: bool) -> Result<(), CliError> {
    let report = probe_or_absent(ctx.probe.as_ref()).await;
    let variant = resolved_variant(&ctx.config().variants, &report);

    if as_json {
        let value = json!({
            "report": report,
            "variant": variant,
        });
        println!("{value:#}");
    } else {
        println!("{report}");
        match variant {
            Some(tag) => println!("variant = {tag}"),
            None => println!("variant = none"),
        }
    }
    Ok(())
}

fn resolved_variant(table: &VariantTable, report: &CapabilityReport) -> Option<String> {
    if !report.accelerator_present {
        return None;
    }
    let driver = report.driver_version?;
    table.resolve(driver).ok().map(|v| v.variant_tag.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use noises_core::DriverVersion;

    #[test]
    fn variant_follows_driver() {
        let table = VariantTable::default();
        let report = CapabilityReport::present("RTX 4070", Some(DriverVersion::new(12, 9)));
        assert_eq!(resolved_variant(&table, &report).as_deref(), Some("cu128"));
    }

    #[test]
    fn no_variant_without_hardware_or_version() {
        let table = VariantTable::default();
        assert_eq!(resolved_variant(&table, &CapabilityReport::absent()), None);
        assert_eq!(
            resolved_variant(&table, &CapabilityReport::present("RTX 4070", None)),
            None
        );
        let old = CapabilityReport::present("GTX 970", Some(DriverVersion::new(10, 2)));
        assert_eq!(resolved_variant(&table, &old), None);
    }
}
