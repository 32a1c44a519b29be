//! Build collaborators from configuration.

use std::sync::Arc;

use anyhow::{Context, bail};

use herald_config::{HeraldConfig, SourceKind};
use herald_sheets::{JsonFileSource, RecordSource, SheetsSource};
use herald_sms::{DeliveryTransport, DryRunTransport, TwilioOptions, TwilioSms};

pub fn build_source(config: &HeraldConfig) -> anyhow::Result<Arc<dyn RecordSource>> {
    let source = &config.source;
    match source.kind {
        SourceKind::Sheets => {
            let (Some(id), Some(key)) = (&source.spreadsheet_id, &source.api_key) else {
                bail!("sheets source needs GOOGLE_SHEETS_ID and GOOGLE_API_KEY");
            };
            Ok(Arc::new(SheetsSource::new(id, key)?))
        }
        SourceKind::File => {
            let path = source
                .path
                .as_deref()
                .context("file source needs source.path")?;
            Ok(Arc::new(JsonFileSource::new(path)))
        }
    }
}

pub fn build_transport(
    config: &HeraldConfig,
    dry_run: bool,
) -> anyhow::Result<Arc<dyn DeliveryTransport>> {
    let sms = &config.sms;
    if dry_run {
        return Ok(Arc::new(DryRunTransport::new(&sms.country_code)));
    }
    let options = TwilioOptions::from_parts(
        sms.account_sid.as_deref(),
        sms.auth_token.as_deref(),
        sms.from_number.as_deref(),
        &sms.country_code,
    )
    .context("SMS delivery is not configured (use --dry-run to only log messages)")?;
    Ok(Arc::new(TwilioSms::new(options)?))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_sheets_source_requires_credentials() {
        let config = HeraldConfig::default();
        let err = build_source(&config).err().unwrap();
        assert!(err.to_string().contains("GOOGLE_SHEETS_ID"));
    }

    #[test]
    fn test_file_source() {
        let mut config = HeraldConfig::default();
        config.source.kind = SourceKind::File;
        assert!(build_source(&config).is_err());

        config.source.path = Some(PathBuf::from("events.json"));
        assert_eq!(build_source(&config).unwrap().source_type(), "file");
    }

    #[test]
    fn test_transport_selection() {
        let mut config = HeraldConfig::default();
        assert_eq!(build_transport(&config, true).unwrap().transport_type(), "dry-run");

        let err = build_transport(&config, false).err().unwrap();
        assert!(format!("{err:#}").contains("account_sid"));

        config.sms.account_sid = Some("AC123".into());
        config.sms.auth_token = Some("secret".into());
        config.sms.from_number = Some("+15005550006".into());
        assert_eq!(build_transport(&config, false).unwrap().transport_type(), "twilio");
    }
}
