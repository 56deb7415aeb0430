//! CLI flag overrides on top of the loaded configuration.

use inception_config::{Config, load_config, to_bridge_config};
use inception_core::{AreaSelector, BridgeConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the config file, apply flag overrides, and validate.
pub fn resolve(global: &GlobalOpts) -> Result<(Config, BridgeConfig), CliError> {
    let cfg = load_with_overrides(global)?;
    let bridge = to_bridge_config(&cfg)?;
    tracing::debug!(
        url = %bridge.base_url,
        area = %bridge.area,
        mode = %bridge.sync_mode,
        "configuration resolved"
    );
    Ok((cfg, bridge))
}

/// Like [`resolve`], but an unset area is allowed.
///
/// Listing never resolves the area, so the placeholder selector filled in
/// for validation is never used. The configured selector, if any, is
/// returned alongside.
pub fn resolve_for_listing(
    global: &GlobalOpts,
) -> Result<(BridgeConfig, Option<AreaSelector>), CliError> {
    let mut cfg = load_with_overrides(global)?;
    let selector = cfg.area.clone();
    cfg.area.get_or_insert(AreaSelector::Index(0));
    let bridge = to_bridge_config(&cfg)?;
    tracing::debug!(url = %bridge.base_url, "configuration resolved for listing");
    Ok((bridge, selector))
}

fn load_with_overrides(global: &GlobalOpts) -> Result<Config, CliError> {
    let mut cfg = load_config(global.config.as_deref())?;
    apply_overrides(&mut cfg, global);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut Config, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        cfg.panel.host.clone_from(host);
    }
    if let Some(ref area) = global.area {
        cfg.area = Some(AreaSelector::from(area.as_str()));
    }
    if let Some(ref name) = global.area_name {
        cfg.area = Some(AreaSelector::Name(name.clone()));
    }
    if global.insecure {
        cfg.panel.insecure = true;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "inception",
            "--host",
            "10.1.1.9",
            "--area",
            "Office",
            "-k",
            "status",
        ])
        .unwrap();

        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.global);

        assert_eq!(cfg.panel.host, "10.1.1.9");
        assert_eq!(cfg.area, Some(AreaSelector::Name("Office".into())));
        assert!(cfg.panel.insecure);
    }

    #[test]
    fn numeric_area_flag_selects_by_position() {
        let cli = Cli::try_parse_from(["inception", "--area", "2", "areas"]).unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.area, Some(AreaSelector::Index(2)));
    }

    #[test]
    fn area_name_flag_keeps_digit_names() {
        let cli = Cli::try_parse_from(["inception", "--area-name", "2", "status"]).unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.area, Some(AreaSelector::Name("2".into())));
    }

    #[test]
    fn no_area_flag_leaves_area_unset() {
        let cli = Cli::try_parse_from(["inception", "areas"]).unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, &cli.global);
        assert_eq!(cfg.area, None);
    }
}
