#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LanguageId {
    Vue,
    JavaScript,
    JavaScriptReact,
    TypeScript,
    TypeScriptReact,
    Css,
    Other(String),
}

impl LanguageId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Vue => "vue",
            Self::JavaScript => "javascript",
            Self::JavaScriptReact => "javascriptreact",
            Self::TypeScript => "typescript",
            Self::TypeScriptReact => "typescriptreact",
            Self::Css => "css",
            Self::Other(language_id) => language_id,
        }
    }

    /// Best guess from a file extension, used for files read from disk.
    #[must_use]
    pub fn from_extension(extension: Option<&str>) -> Self {
        match extension {
            Some("vue") => Self::Vue,
            Some("js" | "mjs" | "cjs") => Self::JavaScript,
            Some("jsx") => Self::JavaScriptReact,
            Some("ts" | "mts" | "cts") => Self::TypeScript,
            Some("tsx") => Self::TypeScriptReact,
            Some("css") => Self::Css,
            Some(other) => Self::Other(other.to_string()),
            None => Self::Other(String::new()),
        }
    }
}

impl From<&str> for LanguageId {
    fn from(language_id: &str) -> Self {
        match language_id {
            "vue" => Self::Vue,
            "javascript" => Self::JavaScript,
            "javascriptreact" => Self::JavaScriptReact,
            "typescript" => Self::TypeScript,
            "typescriptreact" => Self::TypeScriptReact,
            "css" => Self::Css,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for LanguageId {
    fn from(language_id: String) -> Self {
        Self::from(language_id.as_str())
    }
}
