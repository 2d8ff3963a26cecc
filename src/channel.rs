//! Catalog of simulated decay channels and their display rendering.
//!
//! Channel identity is always the raw catalog string; the pretty form with
//! particle symbols exists only for terminal output and never feeds back
//! into filenames or bookkeeping.

/// Decay channels the chain knows how to simulate, in display order.
pub const CHANNELS: &[&str] = &[
    "etap_e+e-g",
    "etap_pi+pi-eta",
    "etap_rho0g",
    "etap_mu+mu-g",
    "etap_gg",
    "eta_e+e-g",
    "eta_pi+pi-g",
    "eta_pi+pi-pi0",
    "eta_mu+mu-g",
    "eta_gg",
    "omega_e+e-pi0",
    "omega_pi+pi-pi0",
    "omega_pi+pi-",
    "rho0_e+e-",
    "rho0_pi+pi-",
    "pi0_e+e-g",
    "pi0_gg",
    "pi+pi-pi0",
    "pi+pi-",
    "pi0pi0_4g",
    "pi0eta_4g",
    "etap_pi0pi0eta",
    "etap_pi0pi0pi0",
    "etap_pi+pi-pi0",
    "etap_omegag",
    "omega_etag",
];

pub fn is_known(channel: &str) -> bool {
    CHANNELS.contains(&channel)
}

/// Ordered longest-match-first substitutions; `etap` must fire before `eta`.
const SYMBOLS: &[(&str, &str)] = &[
    ("etap", "eta'"),
    ("eta", "η"),
    ("mu", "µ"),
    ("pi", "π"),
    ("omega", "ω"),
    ("rho", "ρ"),
    ("g", "γ"),
    ("0", "⁰"),
    ("+", "⁺"),
    ("-", "⁻"),
];

/// Render a channel identifier with particle symbols.
///
/// `aligned` pads the parent particle into a fixed column for catalog
/// listings; the unaligned form uses a plain ` --> ` separator.
pub fn display_channel(channel: &str, aligned: bool) -> String {
    let mut pretty = channel.to_string();
    for (from, to) in SYMBOLS {
        pretty = pretty.replace(from, to);
    }

    if aligned {
        match pretty.split_once('_') {
            Some((parent, decay)) => format!("  {parent:<4} -->  {decay}"),
            None => format!("  {pretty}"),
        }
    } else {
        pretty.replace('_', " --> ")
    }
}

/// Render an event count with a k/M/G suffix where it divides cleanly,
/// falling back to a decimal quotient otherwise (2500000 -> "2.5M").
pub fn unit_prefix(number: u64) -> String {
    for (magnitude, suffix) in [(1_000_000_000, "G"), (1_000_000, "M"), (1_000, "k")] {
        if number >= magnitude {
            return if number % magnitude == 0 {
                format!("{}{suffix}", number / magnitude)
            } else {
                format!("{}{suffix}", number as f64 / magnitude as f64)
            };
        }
    }
    number.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_contains_reference_channels() {
        assert!(is_known("pi0_gg"));
        assert!(is_known("etap_e+e-g"));
        assert!(!is_known("foo"));
        assert_eq!(CHANNELS.len(), 26);
    }

    #[test]
    fn display_substitutes_symbols() {
        assert_eq!(display_channel("pi0_gg", false), "π⁰ --> γγ");
        assert_eq!(display_channel("etap_e+e-g", false), "η' --> e⁺e⁻γ");
        assert_eq!(display_channel("eta_mu+mu-g", false), "η --> µ⁺µ⁻γ");
    }

    #[test]
    fn display_identity_is_not_affected() {
        // The raw identifier stays usable as a partition key.
        let raw = "omega_pi+pi-pi0";
        let _ = display_channel(raw, true);
        assert!(is_known(raw));
    }

    #[test]
    fn aligned_display_handles_missing_separator() {
        assert_eq!(display_channel("pi+pi-", true), "  π⁺π⁻");
    }

    #[test]
    fn unit_prefix_rounds_clean_magnitudes() {
        assert_eq!(unit_prefix(999), "999");
        assert_eq!(unit_prefix(1_000), "1k");
        assert_eq!(unit_prefix(2_500_000), "2.5M");
        assert_eq!(unit_prefix(58_000_000), "58M");
        assert_eq!(unit_prefix(1_000_000_000), "1G");
    }
}
