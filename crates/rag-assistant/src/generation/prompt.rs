//! Prompt templates for RAG generation and index summaries

use crate::error::{Error, Result};
use crate::retrieval::SearchResult;

/// Template used to answer a question from retrieved context
pub const RAG_TEMPLATE: &str =
    "Answer the question based only on the following context:\n{context}\n\nQuestion: {question}";

/// Template used by the index builder to condense one document unit
pub const SUMMARY_TEMPLATE: &str = "Summarize the following text in clear, concise language. \
Keep the key terms, names, and numbers so the summary can be matched against questions.\n\n\
{text}\n\nSummary:";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Variable(String),
}

/// A `{name}`-style template; `{{` and `}}` produce literal braces
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<Segment>,
}

impl PromptTemplate {
    /// Parse a template string
    pub fn from_template(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some(ch) => name.push(ch),
                            None => {
                                return Err(Error::Config(format!(
                                    "Unclosed '{{' in prompt template: {}",
                                    template
                                )))
                            }
                        }
                    }
                    let name = name.trim().to_string();
                    if name.is_empty() || name.contains('{') {
                        return Err(Error::Config(format!(
                            "Invalid variable name in prompt template: {}",
                            template
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name));
                }
                '}' => {
                    return Err(Error::Config(format!(
                        "Unmatched '}}' in prompt template: {}",
                        template
                    )))
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Substitute every variable; a missing value is an error
    pub fn format(&self, values: &[(&str, &str)]) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Variable(name) => {
                    let value = values
                        .iter()
                        .find(|(key, _)| key == name)
                        .map(|(_, value)| *value)
                        .ok_or_else(|| {
                            Error::internal(format!("Missing prompt variable '{}'", name))
                        })?;
                    out.push_str(value);
                }
            }
        }
        Ok(out)
    }
}

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved passages into the `{context}` value
    pub fn build_context(results: &[SearchResult]) -> String {
        results
            .iter()
            .map(|r| r.text.trim())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rag_template_fills_both_variables() {
        let template = PromptTemplate::from_template(RAG_TEMPLATE).unwrap();
        let prompt = template
            .format(&[("context", "Attention is all you need."), ("question", "What?")])
            .unwrap();
        assert_eq!(
            prompt,
            "Answer the question based only on the following context:\nAttention is all you need.\n\nQuestion: What?"
        );
    }

    #[test]
    fn test_values_are_not_reinterpreted() {
        let template = PromptTemplate::from_template("Q: {question}").unwrap();
        let prompt = template.format(&[("question", "what is {context}?")]).unwrap();
        assert_eq!(prompt, "Q: what is {context}?");
    }

    #[test]
    fn test_escaped_braces() {
        let template = PromptTemplate::from_template("{{literal}} {x}").unwrap();
        assert_eq!(
            template.segments,
            vec![
                Segment::Literal("{literal} ".into()),
                Segment::Variable("x".into())
            ]
        );
        assert_eq!(template.format(&[("x", "1")]).unwrap(), "{literal} 1");
    }

    #[test]
    fn test_malformed_templates() {
        assert!(PromptTemplate::from_template("open {name").is_err());
        assert!(PromptTemplate::from_template("stray } brace").is_err());
        assert!(PromptTemplate::from_template("empty {}").is_err());
    }

    #[test]
    fn test_missing_value_is_error() {
        let template = PromptTemplate::from_template(RAG_TEMPLATE).unwrap();
        assert!(template.format(&[("question", "q")]).is_err());
    }

    #[test]
    fn test_build_context_keeps_retrieval_order() {
        let results = vec![
            SearchResult {
                position: 3,
                text: " best \n".into(),
                similarity: 0.9,
            },
            SearchResult {
                position: 0,
                text: "second".into(),
                similarity: 0.5,
            },
        ];
        assert_eq!(PromptBuilder::build_context(&results), "best\n\nsecond");
    }

    #[test]
    fn test_summary_template_embeds_text_verbatim() {
        let template = PromptTemplate::from_template(SUMMARY_TEMPLATE).unwrap();
        let unit = "Attention(Q, K, V) = softmax(QK^T / sqrt(d_k)) V, see {eq. 1}.";
        let prompt = template.format(&[("text", unit)]).unwrap();

        assert!(prompt.contains(unit));
        assert!(prompt.starts_with("Summarize the following text"));
        assert!(prompt.ends_with("Summary:"));
        assert!(template.format(&[]).is_err());
    }
}
