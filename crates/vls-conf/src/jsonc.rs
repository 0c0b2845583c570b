//! Comment and trailing-comma tolerant JSON, the dialect `tsconfig.json`
//! files are written in.

use jsonc_parser::ParseOptions;
use serde_json::Value;

/// Parse `text` into a JSON value. A document holding nothing but comments
/// reads as an empty object.
pub(crate) fn parse(text: &str) -> Result<Value, String> {
    match jsonc_parser::parse_to_serde_value(text, &ParseOptions::default()) {
        Ok(value) => Ok(value.unwrap_or_else(|| Value::Object(serde_json::Map::new()))),
        Err(err) => Err(err.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_inside_strings_are_kept() {
        let text = "{\n  // line\n  \"a\": \"http://x\", /* block */ \"b\": 1\n}";
        let value = parse(text).unwrap();
        assert_eq!(value["a"], "http://x");
        assert_eq!(value["b"], 1);
    }

    #[test]
    fn trailing_commas_are_accepted() {
        let value = parse("{ \"include\": [\"src\",], }").unwrap();
        assert_eq!(value["include"][0], "src");
    }

    #[test]
    fn comment_only_document_is_empty_object() {
        assert_eq!(parse("// nothing here\n").unwrap(), serde_json::json!({}));
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(parse("{ nope").is_err());
        assert!(parse("{} /* open").is_err());
    }
}
