//! # Synthesis Parameters
//!
//! The configuration bundle sent to the backend alongside the two image
//! references. [`SynthesisParameters::default`] reproduces the values the
//! relay has always used; [`SynthesisOverrides`] lets a single request replace
//! any of them.

use serde::{Deserialize, Serialize};

/// Parameters for one try-on call.
///
/// # Example TOML
///
/// ```toml
/// [synthesis]
/// description = "A beautiful garment"
/// auto_mask = true
/// auto_crop = false
/// steps = 30
/// seed = 42
/// api_name = "/tryon"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisParameters {
    /// Garment description text shown to the model
    pub description: String,
    /// Let the backend compute the person mask
    pub auto_mask: bool,
    /// Let the backend crop and resize the person photo
    pub auto_crop: bool,
    /// Number of denoising steps
    pub steps: u32,
    /// Random seed
    pub seed: i64,
    /// Named remote operation (e.g. "/tryon")
    pub api_name: String,
}

impl Default for SynthesisParameters {
    fn default() -> Self {
        Self {
            description: "A beautiful garment".to_string(),
            auto_mask: true,
            auto_crop: false,
            steps: 30,
            seed: 42,
            api_name: "/tryon".to_string(),
        }
    }
}

/// Per-request replacements for [`SynthesisParameters`].
///
/// The backend operation name cannot be overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisOverrides {
    pub description: Option<String>,
    pub auto_mask: Option<bool>,
    pub auto_crop: Option<bool>,
    pub steps: Option<u32>,
    pub seed: Option<i64>,
}

impl SynthesisOverrides {
    #[cfg(test)]
    fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Parses a text form field into the matching override.
    ///
    /// # Returns
    /// - `Ok(true)`: the field was recognized and stored
    /// - `Ok(false)`: not an override field; the caller may ignore it
    /// - `Err(message)`: a recognized field with an unparseable value
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<bool, String> {
        let value = value.trim();
        match name {
            "garment_description" => {
                if !value.is_empty() {
                    self.description = Some(value.to_string());
                }
            }
            "auto_mask" => self.auto_mask = Some(parse_flag(name, value)?),
            "auto_crop" => self.auto_crop = Some(parse_flag(name, value)?),
            "denoise_steps" => {
                let steps: u32 = value
                    .parse()
                    .map_err(|_| invalid(name, value))?;
                if steps == 0 {
                    return Err(invalid(name, value));
                }
                self.steps = Some(steps);
            }
            "seed" => self.seed = Some(value.parse().map_err(|_| invalid(name, value))?),
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// Returns `base` with every set override applied.
    pub fn apply(&self, base: &SynthesisParameters) -> SynthesisParameters {
        SynthesisParameters {
            description: self
                .description
                .clone()
                .unwrap_or_else(|| base.description.clone()),
            auto_mask: self.auto_mask.unwrap_or(base.auto_mask),
            auto_crop: self.auto_crop.unwrap_or(base.auto_crop),
            steps: self.steps.unwrap_or(base.steps),
            seed: self.seed.unwrap_or(base.seed),
            api_name: base.api_name.clone(),
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn invalid(name: &str, value: &str) -> String {
    format!("Invalid value for {}: '{}'", name, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = SynthesisParameters::default();
        assert_eq!(params.description, "A beautiful garment");
        assert!(params.auto_mask);
        assert!(!params.auto_crop);
        assert_eq!(params.steps, 30);
        assert_eq!(params.seed, 42);
        assert_eq!(params.api_name, "/tryon");
    }

    #[test]
    fn test_overrides_apply_over_base() {
        let mut overrides = SynthesisOverrides::default();
        assert!(overrides.is_empty());
        assert_eq!(overrides.set_field("denoise_steps", "20"), Ok(true));
        assert_eq!(overrides.set_field("auto_crop", "yes"), Ok(true));
        assert_eq!(overrides.set_field("garment_description", " red shirt "), Ok(true));
        assert!(!overrides.is_empty());

        let params = overrides.apply(&SynthesisParameters::default());
        assert_eq!(params.steps, 20);
        assert!(params.auto_crop);
        assert!(params.auto_mask);
        assert_eq!(params.description, "red shirt");
        assert_eq!(params.seed, 42);
        assert_eq!(params.api_name, "/tryon");
    }

    #[test]
    fn test_unknown_field_is_not_consumed() {
        let mut overrides = SynthesisOverrides::default();
        assert_eq!(overrides.set_field("api_name", "/other"), Ok(false));
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut overrides = SynthesisOverrides::default();
        assert!(overrides.set_field("denoise_steps", "many").is_err());
        assert!(overrides.set_field("denoise_steps", "0").is_err());
        assert!(overrides.set_field("seed", "1.5").is_err());
        assert_eq!(
            overrides.set_field("auto_mask", "maybe"),
            Err("Invalid value for auto_mask: 'maybe'".to_string())
        );
        assert!(overrides.is_empty());
    }

    #[test]
    fn test_blank_description_keeps_default() {
        let mut overrides = SynthesisOverrides::default();
        assert_eq!(overrides.set_field("garment_description", "   "), Ok(true));
        assert!(overrides.is_empty());
    }
}
