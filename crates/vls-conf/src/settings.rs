use std::path::Path;

use config::Config;
use config::File;
use config::FileFormat;
use serde::Deserialize;

use crate::ConfigError;

/// User-facing settings consulted on every request.
///
/// Settings come either from layered TOML files ([`Settings::new`]) or from a
/// plain JSON object pushed by the client ([`Settings::from_value`]). Unknown
/// keys are ignored; no schema is enforced beyond field types.
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub validation: ValidationSettings,
    pub cache: CacheSettings,
    pub template: TemplateSettings,
    pub format: FormatSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ValidationSettings {
    /// Type-check expressions inside `<template>`.
    pub template: bool,
    pub script: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            template: true,
            script: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub max_age_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 10,
            max_age_secs: 180,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemplateSettings {
    /// Compiler checks switched off for the template engine. Template
    /// expressions reference loosely typed component context, so these checks
    /// mostly produce noise there.
    pub relaxed_checks: Vec<String>,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            relaxed_checks: vec![
                "noImplicitAny".to_string(),
                "noUnusedLocals".to_string(),
                "noUnusedParameters".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormatSettings {
    pub enabled: bool,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    pub fn new(project_root: &Path) -> Result<Self, ConfigError> {
        let user_config_file =
            crate::project_dirs().map(|proj_dirs| proj_dirs.config_dir().join("vls.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    /// Build settings from a client-supplied JSON object.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(ConfigError::Settings)
    }

    fn load_from_paths(
        project_root: &Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        builder = builder.add_source(
            File::from(project_root.join(".vls.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        builder = builder.add_source(
            File::from(project_root.join("vls.toml"))
                .format(FileFormat::Toml)
                .required(false),
        );

        let config = builder.build()?;
        let settings = config.try_deserialize()?;
        Ok(settings)
    }

    #[must_use]
    pub fn template_validation(&self) -> bool {
        self.validation.template
    }

    #[must_use]
    pub fn script_validation(&self) -> bool {
        self.validation.script
    }

    #[must_use]
    pub fn relaxed_checks(&self) -> &[String] {
        &self.template.relaxed_checks
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    mod defaults {
        use super::*;

        #[test]
        fn test_load_no_files() {
            let dir = tempdir().unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings, Settings::default());
            assert!(settings.template_validation());
            assert_eq!(settings.cache.capacity, 10);
            assert_eq!(settings.relaxed_checks().len(), 3);
        }
    }

    mod project_files {
        use super::*;

        #[test]
        fn test_load_vls_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(
                dir.path().join("vls.toml"),
                "[validation]\ntemplate = false\n",
            )
            .unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert!(!settings.template_validation());
            assert!(settings.script_validation());
        }

        #[test]
        fn test_vls_toml_overrides_dot_vls_toml() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".vls.toml"), "[cache]\ncapacity = 3\n").unwrap();
            fs::write(dir.path().join("vls.toml"), "[cache]\ncapacity = 7\n").unwrap();
            let settings = Settings::load_from_paths(dir.path(), None).unwrap();
            assert_eq!(settings.cache.capacity, 7);
            assert_eq!(settings.cache.max_age_secs, 180);
        }

        #[test]
        fn test_project_overrides_user() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("vls.toml");
            fs::write(&user_conf_path, "[format]\nenabled = false\n").unwrap();
            fs::write(
                project_dir.path().join("vls.toml"),
                "[format]\nenabled = true\n",
            )
            .unwrap();

            let settings =
                Settings::load_from_paths(project_dir.path(), Some(&user_conf_path)).unwrap();
            assert!(settings.format.enabled);
        }
    }

    mod client_settings {
        use super::*;

        #[test]
        fn test_from_value_partial_object() {
            let value = serde_json::json!({
                "validation": { "template": false },
                "template": { "relaxed_checks": ["noImplicitAny"] },
                "unknown": 1
            });
            let settings = Settings::from_value(value).unwrap();
            assert!(!settings.template_validation());
            assert_eq!(settings.relaxed_checks(), ["noImplicitAny".to_string()]);
        }

        #[test]
        fn test_from_value_wrong_type_is_error() {
            let value = serde_json::json!({ "cache": { "capacity": "many" } });
            assert!(matches!(
                Settings::from_value(value),
                Err(ConfigError::Settings(_))
            ));
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_invalid_toml_content() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("vls.toml"), "[validation]\ntemplate = nope").unwrap();
            let result = Settings::load_from_paths(dir.path(), None);
            assert!(matches!(result.unwrap_err(), ConfigError::Config(_)));
        }
    }
}
