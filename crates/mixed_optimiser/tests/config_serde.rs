//! TOML loading of the adapter configuration.
#![cfg(feature = "serde")]

use mixed_optimiser::config::{AdapterConfig, ProfilerConfig};

#[test]
fn test_partial_toml_keeps_defaults() -> anyhow::Result<()> {
    let config: AdapterConfig = toml::from_str(
        r#"
        kkt_tolerance = 1e-9

        [profiler]
        max_iterations = 80
        "#,
    )?;
    assert_eq!(config.kkt_tolerance, 1e-9);
    assert_eq!(config.infinity_magnitude, AdapterConfig::default().infinity_magnitude);
    assert_eq!(config.profiler.max_iterations, 80);
    assert_eq!(config.profiler.tolerance, ProfilerConfig::default().tolerance);
    config.validate()?;
    Ok(())
}

#[test]
fn test_round_trip_through_toml() -> anyhow::Result<()> {
    let config = AdapterConfig::default().with_profiler(ProfilerConfig::high_precision());
    let text = toml::to_string(&config)?;
    let back: AdapterConfig = toml::from_str(&text)?;
    assert_eq!(back, config);
    Ok(())
}

#[test]
fn test_invalid_values_rejected_after_loading() -> anyhow::Result<()> {
    let config: AdapterConfig = toml::from_str("infinity_magnitude = -1.0")?;
    assert!(config.validate().is_err());
    Ok(())
}
