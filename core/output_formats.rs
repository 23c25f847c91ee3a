use crate::error::{AppError, Result};
use serde::Serialize;

/// Output encodings every report (tree, context, metrics) can be rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Yaml,
    Xml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            "xml" => Ok(Self::Xml),
            other => Err(AppError::InvalidArgument(format!(
                "Unsupported output format '{}'",
                other
            ))),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Xml => "xml",
        }
    }
}

pub fn serialize_context_to_json<T: Serialize>(context: &T, pretty: bool) -> Result<String> {
    if pretty {
        serde_json::to_string_pretty(context).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(context).map_err(AppError::JsonSerialize)
    }
}

#[cfg(feature = "serde_support")]
pub fn serialize_context_to_yaml<T: Serialize>(context: &T) -> Result<String> {
    serde_yml::to_string(context).map_err(AppError::YamlError)
}

#[cfg(feature = "serde_support")]
pub fn serialize_context_to_xml<T: Serialize>(
    context: &T,
    root_name: &str,
    pretty: bool,
) -> Result<String> {
    if !pretty {
        return quick_xml::se::to_string_with_root(root_name, context)
            .map_err(|e| AppError::XmlSerialize(e.to_string()));
    }
    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::with_root(&mut buffer, Some(root_name))?;
    serializer.indent(' ', 2);
    context.serialize(serializer)?;
    Ok(buffer)
}

/// Serializes `value` in a structured format. `Text` has no generic
/// encoding; callers render it themselves.
pub fn serialize_structured<T: Serialize>(
    value: &T,
    format: OutputFormat,
    root_name: &str,
    json_minify: bool,
    xml_pretty: bool,
) -> Result<String> {
    match format {
        OutputFormat::Json => serialize_context_to_json(value, !json_minify),
        #[cfg(feature = "serde_support")]
        OutputFormat::Yaml => serialize_context_to_yaml(value),
        #[cfg(feature = "serde_support")]
        OutputFormat::Xml => serialize_context_to_xml(value, root_name, xml_pretty),
        #[cfg(not(feature = "serde_support"))]
        OutputFormat::Yaml | OutputFormat::Xml => {
            let _ = (root_name, xml_pretty);
            Err(AppError::Config(
                "YAML and XML output require the serde_support feature".to_string(),
            ))
        }
        OutputFormat::Text => Err(AppError::InvalidArgument(
            "Text output has no structured encoding".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextFile, GeneratedContext};
    use pretty_assertions::assert_eq;

    fn sample() -> GeneratedContext {
        GeneratedContext {
            text: "--- /a.txt ---\nhello\n".to_string(),
            file_count: 1,
            token_estimate: 1,
            files: vec![ContextFile {
                path: "/a.txt".to_string(),
                bytes: 5,
                token_estimate: 1,
                content: 15..20,
            }],
        }
    }

    #[test]
    fn formats_parse_case_insensitively() {
        assert_eq!(OutputFormat::parse("JSON").unwrap(), OutputFormat::Json);
        assert_eq!(OutputFormat::parse("yml").unwrap(), OutputFormat::Yaml);
        assert_eq!(OutputFormat::Xml.extension(), "xml");
        assert!(OutputFormat::parse("csv").is_err());
    }

    #[test]
    fn json_uses_camel_case_keys() {
        let json = serialize_structured(&sample(), OutputFormat::Json, "context", true, false)
            .unwrap();
        assert!(json.starts_with(r#"{"text":"--- /a.txt ---\nhello\n","fileCount":1,"tokenEstimate":1"#));
    }

    #[test]
    fn yaml_and_xml_carry_the_counts() {
        let yaml = serialize_structured(&sample(), OutputFormat::Yaml, "context", true, false)
            .unwrap();
        assert!(yaml.contains("fileCount: 1"));

        let xml = serialize_structured(&sample(), OutputFormat::Xml, "context", true, false)
            .unwrap();
        assert!(xml.starts_with("<context>"));
        assert!(xml.contains("<fileCount>1</fileCount>"));
    }

    #[test]
    fn text_has_no_structured_form() {
        assert!(matches!(
            serialize_structured(&sample(), OutputFormat::Text, "context", true, false),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
