//! Generic parameters functions
//!
//! Parameter files are TOML files living under the `params` directory of the
//! software root. Two styles of access are provided:
//!
//! - [`load`] deserialises a whole file into a typed struct, for modules with
//!   a flat parameter set.
//! - [`ParamSource`] keeps the parsed tree and resolves individual values by
//!   dotted key path, for modules which build their parameters field by field
//!   and want a missing key to name exactly what is missing.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;
use std::str::FromStr;
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A parameter file opened for key-by-key resolution.
///
/// Keys are dotted paths into the TOML tree, so with the file
///
/// ```toml
/// [stop_planning]
/// stop_margin = 5.0
/// ```
///
/// the key `"stop_planning.stop_margin"` resolves to `5.0`.
pub struct ParamSource {
    /// The parsed parameter tree
    root: toml::Value,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (DEIMOS_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parameter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),
}

/// An error that occurs while resolving a single parameter key.
#[derive(Debug, Error)]
pub enum ParamError {
    #[error("The parameter \"{0}\" is not present in the file")]
    MissingKey(String),

    #[error("The parameter \"{0}\" is not a {1}")]
    WrongType(String, &'static str),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "deimos_sw/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    // Get the params dir
    let mut path = crate::host::get_deimos_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    // Load the file into a string
    let params_str = match read_to_string(path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(e)),
    };

    // Parse the string into the parameter struct
    match toml::from_str(params_str.as_str()) {
        Ok(p) => Ok(p),
        Err(e) => Err(LoadError::DeserialiseError(e)),
    }
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ParamSource {
    /// Open a parameter file for key-by-key resolution.
    ///
    /// The file path is relative to the "deimos_sw/params" directory
    pub fn from_file(param_file_path: &str) -> Result<Self, LoadError> {
        Ok(Self {
            root: load(param_file_path)?,
        })
    }

    /// Get a floating point parameter.
    ///
    /// Integer values are accepted and widened to floats.
    pub fn get_double(&self, key: &str) -> Result<f64, ParamError> {
        match self.lookup(key) {
            Some(toml::Value::Float(f)) => Ok(*f),
            Some(toml::Value::Integer(i)) => Ok(*i as f64),
            Some(_) => Err(ParamError::WrongType(key.into(), "float")),
            None => Err(ParamError::MissingKey(key.into())),
        }
    }

    /// Get a floating point parameter, or the given default if the key is not
    /// present.
    pub fn get_double_or(&self, key: &str, default: f64) -> Result<f64, ParamError> {
        match self.lookup(key) {
            Some(_) => self.get_double(key),
            None => Ok(default),
        }
    }

    /// Get an integer parameter.
    pub fn get_integer(&self, key: &str) -> Result<i64, ParamError> {
        match self.lookup(key) {
            Some(toml::Value::Integer(i)) => Ok(*i),
            Some(_) => Err(ParamError::WrongType(key.into(), "integer")),
            None => Err(ParamError::MissingKey(key.into())),
        }
    }

    /// Get an integer parameter, or the given default if the key is not
    /// present.
    pub fn get_integer_or(&self, key: &str, default: i64) -> Result<i64, ParamError> {
        match self.lookup(key) {
            Some(_) => self.get_integer(key),
            None => Ok(default),
        }
    }

    /// Get a boolean parameter.
    pub fn get_bool(&self, key: &str) -> Result<bool, ParamError> {
        match self.lookup(key) {
            Some(toml::Value::Boolean(b)) => Ok(*b),
            Some(_) => Err(ParamError::WrongType(key.into(), "boolean")),
            None => Err(ParamError::MissingKey(key.into())),
        }
    }

    /// Get a boolean parameter, or the given default if the key is not
    /// present.
    pub fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, ParamError> {
        match self.lookup(key) {
            Some(_) => self.get_bool(key),
            None => Ok(default),
        }
    }

    /// Get a string parameter.
    pub fn get_string(&self, key: &str) -> Result<String, ParamError> {
        match self.lookup(key) {
            Some(toml::Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(ParamError::WrongType(key.into(), "string")),
            None => Err(ParamError::MissingKey(key.into())),
        }
    }

    /// Get a list of strings parameter.
    pub fn get_string_list(&self, key: &str) -> Result<Vec<String>, ParamError> {
        match self.lookup(key) {
            Some(toml::Value::Array(values)) => values
                .iter()
                .map(|value| match value {
                    toml::Value::String(s) => Ok(s.clone()),
                    _ => Err(ParamError::WrongType(key.into(), "list of strings")),
                })
                .collect(),
            Some(_) => Err(ParamError::WrongType(key.into(), "list of strings")),
            None => Err(ParamError::MissingKey(key.into())),
        }
    }

    /// Walk the tree along a dotted key path.
    fn lookup(&self, key: &str) -> Option<&toml::Value> {
        let mut value = &self.root;

        for part in key.split('.') {
            value = value.get(part)?;
        }

        Some(value)
    }
}

impl FromStr for ParamSource {
    type Err = LoadError;

    fn from_str(toml_str: &str) -> Result<Self, Self::Err> {
        Ok(Self {
            root: toml::from_str(toml_str).map_err(LoadError::DeserialiseError)?,
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const PARAM_FILE: &str = r#"
        top_level = 1.5

        [stop_planning]
        stop_margin = 5.0
        hold_stop = true
        name = "margin"

        [stop_planning.object_type_specified_params]
        types = ["default", "unknown"]
        count = 2
    "#;

    #[test]
    fn test_dotted_lookup() {
        let source: ParamSource = PARAM_FILE.parse().unwrap();

        assert!((source.get_double("top_level").unwrap() - 1.5).abs() < 1e-9);
        assert!(
            (source.get_double("stop_planning.stop_margin").unwrap() - 5.0).abs() < 1e-9
        );
        assert!(source.get_bool("stop_planning.hold_stop").unwrap());
        assert_eq!(source.get_string("stop_planning.name").unwrap(), "margin");
        assert_eq!(
            source
                .get_string_list("stop_planning.object_type_specified_params.types")
                .unwrap(),
            vec!["default".to_string(), "unknown".to_string()]
        );
    }

    #[test]
    fn test_integers_widen_to_floats() {
        let source: ParamSource = PARAM_FILE.parse().unwrap();

        let count = source
            .get_double("stop_planning.object_type_specified_params.count")
            .unwrap();
        assert!((count - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_keys() {
        let source: ParamSource = PARAM_FILE.parse().unwrap();

        match source.get_double("stop_planning.missing") {
            Err(ParamError::MissingKey(key)) => assert_eq!(key, "stop_planning.missing"),
            other => panic!("Expected MissingKey, got {:?}", other),
        }

        // Defaults only apply to missing keys
        let margin = source
            .get_double_or("stop_planning.missing", 2.5)
            .unwrap();
        assert!((margin - 2.5).abs() < 1e-9);

        let margin = source
            .get_double_or("stop_planning.stop_margin", 2.5)
            .unwrap();
        assert!((margin - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_wrong_types() {
        let source: ParamSource = PARAM_FILE.parse().unwrap();

        assert!(matches!(
            source.get_bool("stop_planning.stop_margin"),
            Err(ParamError::WrongType(_, "boolean"))
        ));

        // A present key of the wrong type is an error even with a default
        assert!(matches!(
            source.get_bool_or("stop_planning.stop_margin", true),
            Err(ParamError::WrongType(_, "boolean"))
        ));
    }
}
