use serde::{Deserialize, Deserializer, Serialize};

use crate::color::TemperatureRange;

/// Capability flags and Kelvin range of a product.
///
/// Unset fields mean "not specified here", so a set of features can be
/// layered over another with [`Features::or`].
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Features {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hev: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relays: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buttons: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrared: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multizone: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_multizone: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_temperature_range"
    )]
    pub temperature_range: Option<TemperatureRange>,
}

impl Features {
    /// Returns `self` with every unset field taken from `fallback`.
    ///
    /// ```
    /// use lifxlan::Features;
    ///
    /// let upgrade = Features { color: Some(true), ..Features::default() };
    /// let base = Features { color: Some(false), hev: Some(false), ..Features::default() };
    ///
    /// let merged = upgrade.or(base);
    /// assert_eq!(Some(true), merged.color);
    /// assert_eq!(Some(false), merged.hev);
    /// ```
    #[must_use]
    pub fn or(self, fallback: Features) -> Features {
        Features {
            hev: self.hev.or(fallback.hev),
            color: self.color.or(fallback.color),
            chain: self.chain.or(fallback.chain),
            matrix: self.matrix.or(fallback.matrix),
            relays: self.relays.or(fallback.relays),
            buttons: self.buttons.or(fallback.buttons),
            infrared: self.infrared.or(fallback.infrared),
            multizone: self.multizone.or(fallback.multizone),
            extended_multizone: self.extended_multizone.or(fallback.extended_multizone),
            temperature_range: self.temperature_range.or(fallback.temperature_range),
        }
    }

    /// Whether the product renders colour; unset means no.
    #[must_use]
    pub fn supports_color(&self) -> bool {
        self.color.unwrap_or(false)
    }

    /// Whether the product drives a chain of tiles; unset means no.
    #[must_use]
    pub fn supports_chain(&self) -> bool {
        self.chain.unwrap_or(false)
    }

    /// Whether the product is a pixel matrix; unset means no.
    #[must_use]
    pub fn supports_matrix(&self) -> bool {
        self.matrix.unwrap_or(false)
    }

    /// Whether the product switches relays; unset means no.
    #[must_use]
    pub fn supports_relays(&self) -> bool {
        self.relays.unwrap_or(false)
    }
}

/// Accepts any JSON array but keeps only well-formed `[min, max]` pairs.
fn lenient_temperature_range<'de, D>(deserializer: D) -> Result<Option<TemperatureRange>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<u16>>::deserialize(deserializer)?;
    Ok(match raw.as_deref() {
        Some(&[min, max]) => Some(TemperatureRange::new(min, max)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(r#"{"temperature_range": [2500, 9000]}"#, Some(TemperatureRange::new(2500, 9000)))]
    #[case(r#"{"temperature_range": []}"#, None)]
    #[case(r#"{"temperature_range": [2700]}"#, None)]
    #[case(r#"{"temperature_range": null}"#, None)]
    #[case("{}", None)]
    fn temperature_range_requires_exactly_two_values(
        #[case] json: &str,
        #[case] expected: Option<TemperatureRange>,
    ) {
        let features: Features = serde_json::from_str(json).expect("features should parse");
        assert_eq!(expected, features.temperature_range);
    }

    #[test]
    fn unset_fields_are_omitted_from_json() {
        let features = Features {
            chain: Some(true),
            ..Features::default()
        };
        insta::assert_snapshot!(
            serde_json::to_string(&features).expect("features should serialize"),
            @r#"{"chain":true}"#
        );
    }

    #[test]
    fn or_keeps_explicit_false() {
        let upgrade = Features {
            infrared: Some(false),
            ..Features::default()
        };
        let base = Features {
            infrared: Some(true),
            ..Features::default()
        };
        assert_eq!(Some(false), upgrade.or(base).infrared);
    }
}
