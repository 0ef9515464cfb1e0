//! Renderer configuration: the key/value surface exposed to the front-end.
//! Unknown keys and unparsable values are fatal before any rendering begins.

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub struct ConfigError {
    pub key: String,
    pub message: String,
}

impl ConfigError {
    fn new(key: &str, message: impl Into<String>) -> ConfigError {
        ConfigError {
            key: key.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error for \"{}\": {}", self.key, self.message)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Config {
    /// Worker thread count; 0 means one per CPU.
    pub no_render_threads: u32,
    /// Bidirectional passes over the film; 0 means render until stopped.
    pub no_super_samples: u32,
    pub mlt_no_initial_paths: u32,
    pub mlt_max_depth: u32,
    pub mlt_max_consecutive_rejections: u32,
    pub mlt_bidir_path_mutation_prob: f32,
    pub mlt_lens_subpath_mutation_prob: f32,
    pub mlt_perturbation_path_mutation_prob: f32,
    pub mlt_filter_proposed: bool,
    pub filter: String,
    pub filter_support: f32,
    pub filter_sigma: f32,
    pub filter_b: f32,
    pub filter_c: f32,
    pub filter_tau: f32,
    pub tonemap: String,
    pub width: u32,
    pub height: u32,
    /// Seconds between periodic checkpoints; 0 disables them.
    pub save_period: u32,
    /// Clamp bidirectional samples to [0, 1] per spectral component.
    pub clamp_samples: bool,
    /// Wall-clock budget for the Metropolis chains.
    pub render_seconds: u32,
    pub seed: u64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            no_render_threads: 0,
            no_super_samples: 16,
            mlt_no_initial_paths: 10_000,
            mlt_max_depth: 10,
            mlt_max_consecutive_rejections: 500,
            mlt_bidir_path_mutation_prob: 1.0,
            mlt_lens_subpath_mutation_prob: 1.0,
            mlt_perturbation_path_mutation_prob: 1.0,
            mlt_filter_proposed: true,
            filter: "null".to_string(),
            filter_support: 2.0,
            filter_sigma: 1.0,
            filter_b: 1.0 / 3.0,
            filter_c: 1.0 / 3.0,
            filter_tau: 3.0,
            tonemap: "default".to_string(),
            width: 480,
            height: 480,
            save_period: 5,
            clamp_samples: false,
            render_seconds: 30,
            seed: 0,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .parse()
        .map_err(|_| ConfigError::new(key, format!("invalid value \"{}\"", value)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::new(
            key,
            format!("invalid boolean \"{}\"", value),
        )),
    }
}

impl Config {
    /// Apply one key/value override.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "noRenderThreads" => self.no_render_threads = parse(key, value)?,
            "noSuperSamples" => self.no_super_samples = parse(key, value)?,
            "mltNoInitialPaths" => self.mlt_no_initial_paths = parse(key, value)?,
            "mltMaxDepth" => self.mlt_max_depth = parse(key, value)?,
            "mltMaxConsequtiveRejections" => {
                self.mlt_max_consecutive_rejections = parse(key, value)?
            }
            "mltBidirPathMutationProb" => {
                self.mlt_bidir_path_mutation_prob = parse_prob(key, value)?
            }
            "mltLensSubpathMutationProb" => {
                self.mlt_lens_subpath_mutation_prob = parse_prob(key, value)?
            }
            "mltPerturbationPathMutationProb" => {
                self.mlt_perturbation_path_mutation_prob = parse_prob(key, value)?
            }
            "mltFilterProposed" => self.mlt_filter_proposed = parse_bool(key, value)?,
            "filter" => self.filter = value.to_string(),
            "support" => self.filter_support = parse(key, value)?,
            "sigma" => self.filter_sigma = parse(key, value)?,
            "B" => self.filter_b = parse(key, value)?,
            "C" => self.filter_c = parse(key, value)?,
            "tau" => self.filter_tau = parse(key, value)?,
            "tonemap" => self.tonemap = value.to_string(),
            "width" => self.width = parse(key, value)?,
            "height" => self.height = parse(key, value)?,
            "savePeriod" => self.save_period = parse(key, value)?,
            "clampSamples" => self.clamp_samples = parse_bool(key, value)?,
            "renderSeconds" => self.render_seconds = parse(key, value)?,
            "seed" => self.seed = parse(key, value)?,
            _ => return Err(ConfigError::new(key, "unknown key")),
        }
        Ok(())
    }

    /// Cross-field validation, run once before rendering.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::new("width", "image dimensions must be nonzero"));
        }
        match self.filter.as_str() {
            "null" | "box" | "triangle" | "gaussian" | "mitchell" | "lanczosSinc" => {}
            other => {
                return Err(ConfigError::new(
                    "filter",
                    format!("unknown filter \"{}\"", other),
                ))
            }
        }
        if self.filter != "null" && self.filter_support <= 0.0 {
            return Err(ConfigError::new("support", "filter support must be positive"));
        }
        match self.tonemap.as_str() {
            "default" | "linear" | "reinhard" => {}
            other => {
                return Err(ConfigError::new(
                    "tonemap",
                    format!("unknown tonemap \"{}\"", other),
                ))
            }
        }
        Ok(())
    }

    pub fn resolved_threads(&self) -> usize {
        if self.no_render_threads == 0 {
            num_cpus::get()
        } else {
            self.no_render_threads as usize
        }
    }
}

fn parse_prob(key: &str, value: &str) -> Result<f32, ConfigError> {
    let v: f32 = parse(key, value)?;
    if v < 0.0 {
        return Err(ConfigError::new(key, "mutation weight must be >= 0"));
    }
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_contract() {
        let c = Config::default();
        assert_eq!(c.mlt_no_initial_paths, 10_000);
        assert_eq!(c.mlt_max_depth, 10);
        assert_eq!(c.mlt_max_consecutive_rejections, 500);
        assert_eq!(c.save_period, 5);
        assert!(c.mlt_filter_proposed);
        assert!(!c.clamp_samples);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_set_known_keys() {
        let mut c = Config::default();
        c.set("width", "64").unwrap();
        c.set("height", "32").unwrap();
        c.set("filter", "gaussian").unwrap();
        c.set("sigma", "0.8").unwrap();
        c.set("mltFilterProposed", "false").unwrap();
        assert_eq!(c.width, 64);
        assert_eq!(c.height, 32);
        assert!(!c.mlt_filter_proposed);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_unknown_key_is_fatal() {
        let mut c = Config::default();
        assert!(c.set("noSuchKey", "1").is_err());
        assert!(c.set("width", "not-a-number").is_err());
        assert!(c.set("mltBidirPathMutationProb", "-1").is_err());
    }

    #[test]
    fn test_validate_rejects_bad_combinations() {
        let mut c = Config::default();
        c.set("filter", "vortex").unwrap();
        assert!(c.validate().is_err());

        let mut c = Config::default();
        c.set("width", "0").unwrap();
        assert!(c.validate().is_err());
    }
}
