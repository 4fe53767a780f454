//! Deterministic prompt assembly.
//!
//! The prompt template is configuration-driven: each section's content shape
//! (scalar, list, or map) is decided once when the configuration is loaded
//! and never re-inspected at render time. Rendering is pure string
//! construction with no I/O.

use serde_yaml::Value;

use crate::core::errors::ApiError;

/// Shape-resolved content of one prompt section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionContent {
    Scalar(String),
    List(Vec<String>),
    /// Key/value pairs in configuration insertion order.
    Map(Vec<(String, String)>),
}

impl SectionContent {
    pub fn empty_scalar() -> Self {
        SectionContent::Scalar(String::new())
    }

    pub fn empty_list() -> Self {
        SectionContent::List(Vec::new())
    }

    fn from_yaml(value: &Value) -> Result<Self, ApiError> {
        match value {
            Value::Null => Ok(SectionContent::empty_scalar()),
            Value::String(s) => Ok(SectionContent::Scalar(s.clone())),
            Value::Bool(b) => Ok(SectionContent::Scalar(b.to_string())),
            Value::Number(n) => Ok(SectionContent::Scalar(n.to_string())),
            Value::Sequence(items) => {
                let rendered = items.iter().map(yaml_scalar_to_string).collect::<Result<_, _>>()?;
                Ok(SectionContent::List(rendered))
            }
            Value::Mapping(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (key, val) in map {
                    pairs.push((yaml_scalar_to_string(key)?, yaml_scalar_to_string(val)?));
                }
                Ok(SectionContent::Map(pairs))
            }
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }
}

fn yaml_scalar_to_string(value: &Value) -> Result<String, ApiError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(ApiError::BadRequest(format!(
            "Prompt config entries must be scalars, got: {:?}",
            other
        ))),
    }
}

/// The configured prompt template: role, tone, instruction, and output
/// shaping. Missing keys fall back to empty content; their sections still
/// render with an empty body.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub role: SectionContent,
    pub style_or_tone: SectionContent,
    pub instruction: SectionContent,
    pub output_constraints: SectionContent,
    pub output_format: SectionContent,
}

impl PromptSpec {
    pub fn from_value(value: &Value) -> Result<Self, ApiError> {
        Ok(Self {
            role: section_or(value, "role", SectionContent::empty_scalar)?,
            style_or_tone: section_or(value, "style_or_tone", SectionContent::empty_list)?,
            instruction: section_or(value, "instruction", SectionContent::empty_scalar)?,
            output_constraints: section_or(value, "output_constraints", SectionContent::empty_list)?,
            output_format: section_or(value, "output_format", SectionContent::empty_list)?,
        })
    }
}

fn section_or(
    value: &Value,
    key: &str,
    default: fn() -> SectionContent,
) -> Result<SectionContent, ApiError> {
    match value.get(key) {
        Some(v) => SectionContent::from_yaml(v),
        None => Ok(default()),
    }
}

/// Render one titled section. Lists get one bullet per item, maps one
/// "key: value" bullet per entry, scalars a single bullet.
fn format_prompt_section(title: &str, content: &SectionContent) -> String {
    match content {
        SectionContent::Scalar(text) => format!("{}\n- {}", title, text),
        SectionContent::List(items) => {
            let body: Vec<String> = items.iter().map(|item| format!("- {}", item)).collect();
            format!("{}\n{}", title, body.join("\n"))
        }
        SectionContent::Map(pairs) => {
            let body: Vec<String> = pairs
                .iter()
                .map(|(key, value)| format!("- {}: {}", key, value))
                .collect();
            format!("{}\n{}", title, body.join("\n"))
        }
    }
}

/// Build the full prompt: fixed-order titled sections, retrieved context,
/// and the user's question, joined by blank lines.
pub fn build_prompt(
    spec: &PromptSpec,
    documents: &[String],
    query: &str,
    reasoning_instruction: Option<&str>,
) -> String {
    let context = documents.join("\n");
    let mut sections = Vec::with_capacity(8);

    sections.push(format_prompt_section("Role:", &spec.role));
    sections.push(format_prompt_section("Style / Tone:", &spec.style_or_tone));
    sections.push(format_prompt_section("Instruction:", &spec.instruction));
    sections.push(format_prompt_section(
        "Output Constraints:",
        &spec.output_constraints,
    ));
    sections.push(format_prompt_section("Output Format:", &spec.output_format));

    if let Some(instruction) = reasoning_instruction {
        sections.push(format_prompt_section(
            "Reasoning Strategy:",
            &SectionContent::Scalar(instruction.to_string()),
        ));
    }

    sections.push(format!("Context:\n{}", context));
    sections.push(format!("User's question:\n{}", query));

    sections.join("\n\n")
}
