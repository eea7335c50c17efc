//! Instance type code parsing
//!
//! SKU codes look like `ecs.g8y.4xlarge`: a namespace, a family token
//! (series letters, generation digits, optional variant suffix) and a size.
//! Everything that needs the generation or a display label goes through
//! [`SkuCode`] instead of inspecting the raw string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse version band of an instance family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Generation(pub u8);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Parsed view of an instance type code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuCode<'a> {
    raw: &'a str,
    family: &'a str,
    size: Option<&'a str>,
}

impl<'a> SkuCode<'a> {
    pub fn parse(raw: &'a str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let _namespace = parts.next()?;
        let family = parts.next()?;
        let size = parts.next();

        if !family.chars().next()?.is_ascii_alphabetic() {
            return None;
        }

        Some(Self { raw, family, size })
    }

    pub fn raw(&self) -> &'a str {
        self.raw
    }

    /// Family token, e.g. `g8y`
    pub fn family(&self) -> &'a str {
        self.family
    }

    pub fn size(&self) -> Option<&'a str> {
        self.size
    }

    /// Leading letters of the family token
    pub fn series(&self) -> &'a str {
        let end = self
            .family
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(self.family.len());
        &self.family[..end]
    }

    pub fn generation(&self) -> Option<Generation> {
        let rest = &self.family[self.series().len()..];
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse::<u8>().ok().map(Generation)
    }

    /// Suffix after the generation digits, e.g. `y` in `g8y`
    pub fn variant(&self) -> &'a str {
        let rest = &self.family[self.series().len()..];
        let digits = rest.chars().take_while(|c| c.is_ascii_digit()).count();
        &rest[digits..]
    }
}

fn series_label(series: &str) -> Option<&'static str> {
    match series {
        "g" => Some("General Purpose"),
        "c" => Some("Compute Optimized"),
        "r" => Some("Memory Optimized"),
        "u" => Some("Universal"),
        _ => None,
    }
}

fn variant_label(variant: &str) -> Option<&'static str> {
    match variant {
        "a" => Some("AMD"),
        "y" => Some("ARM"),
        "i" => Some("Intel"),
        _ => None,
    }
}

/// Human-readable family label for ledgers and reports
pub fn instance_family_label(sku: &str) -> String {
    let code = match SkuCode::parse(sku) {
        Some(code) => code,
        None => return sku.trim().to_uppercase(),
    };

    let series = match series_label(code.series()) {
        Some(label) => label,
        None => return code.family().to_uppercase(),
    };

    if code.series() == "u" {
        return format!("{} ({})", series, code.family().to_uppercase());
    }

    match (code.generation(), variant_label(code.variant())) {
        (Some(gen), Some(variant)) => format!("{} (Gen {}, {})", series, gen.0, variant),
        (Some(gen), None) => format!("{} (Gen {})", series, gen.0),
        (None, _) => series.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_components() {
        let code = SkuCode::parse("ecs.g8y.4xlarge").unwrap();
        assert_eq!(code.family(), "g8y");
        assert_eq!(code.series(), "g");
        assert_eq!(code.generation(), Some(Generation(8)));
        assert_eq!(code.variant(), "y");
        assert_eq!(code.size(), Some("4xlarge"));
    }

    #[test]
    fn test_generation_extraction() {
        let cases = [
            ("ecs.g9i.xlarge", Some(9)),
            ("ecs.c8a.2xlarge", Some(8)),
            ("ecs.r7.large", Some(7)),
            ("ecs.g6.4xlarge", Some(6)),
            ("ecs.u1-c1m2.large", Some(1)),
            ("ecs.ebmg.large", None),
        ];
        for (sku, expected) in cases {
            let gen = SkuCode::parse(sku).and_then(|c| c.generation()).map(|g| g.0);
            assert_eq!(gen, expected, "generation of {}", sku);
        }
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(SkuCode::parse("g6").is_none());
        assert!(SkuCode::parse("ecs.").is_none());
        assert!(SkuCode::parse("ecs.9g.large").is_none());
    }

    #[test]
    fn test_family_labels() {
        assert_eq!(instance_family_label("ecs.g6.4xlarge"), "General Purpose (Gen 6)");
        assert_eq!(instance_family_label("ecs.c8y.2xlarge"), "Compute Optimized (Gen 8, ARM)");
        assert_eq!(instance_family_label("ecs.r9a.xlarge"), "Memory Optimized (Gen 9, AMD)");
        assert_eq!(instance_family_label("ecs.g9i.large"), "General Purpose (Gen 9, Intel)");
        assert_eq!(instance_family_label("ecs.u1.large"), "Universal (U1)");
        assert_eq!(instance_family_label("ecs.ebmhfg7.large"), "EBMHFG7");
        assert_eq!(instance_family_label("bogus"), "BOGUS");
    }
}
