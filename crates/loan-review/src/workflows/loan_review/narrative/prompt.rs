use std::path::Path;

use tracing::warn;

use super::NarrativeRequest;

pub const DEFAULT_PROMPT: &str = "You are a senior credit analyst. Summarize the decision for a loan application in 120 words.

Application facts (JSON):
{facts}

Policy reasons (list):
{reasons}

Final recommendation: {action}
Explain in clear, business-friendly language with numbered points and a brief closing sentence.";

/// Number of characters of each excerpt quoted in the prompt.
pub const EXCERPT_PREVIEW_CHARS: usize = 200;

/// Prompt with `{facts}`, `{reasons}` and `{action}` substitution points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    body: String,
    cites_excerpts: bool,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptTemplate {
    pub fn builtin() -> Self {
        Self {
            body: DEFAULT_PROMPT.to_string(),
            cites_excerpts: false,
        }
    }

    pub fn custom(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            cites_excerpts: true,
        }
    }

    /// Load an operator supplied template, keeping the built-in prompt when absent or unreadable.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::builtin();
        };

        match std::fs::read_to_string(path) {
            Ok(body) => Self::custom(body),
            Err(err) => {
                if path.exists() {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "prompt template unreadable; using built-in prompt"
                    );
                }
                Self::builtin()
            }
        }
    }

    /// Substitute the placeholders and trim.
    ///
    /// Custom templates get a `Relevant policy excerpts` block when excerpts
    /// exist; the built-in prompt never carries one.
    pub fn render(&self, request: &NarrativeRequest) -> String {
        let mut prompt = self
            .body
            .replace("{facts}", &request.facts.to_string())
            .replace("{reasons}", &request.reasons.join("\n"))
            .replace("{action}", request.action.label())
            .trim()
            .to_string();

        if self.cites_excerpts && !request.excerpts.is_empty() {
            let citations: Vec<String> = request
                .excerpts
                .iter()
                .map(|excerpt| {
                    let preview: String =
                        excerpt.text.chars().take(EXCERPT_PREVIEW_CHARS).collect();
                    format!("- {}: {}", excerpt.title, preview)
                })
                .collect();
            prompt.push_str("\n\nRelevant policy excerpts:\n");
            prompt.push_str(&citations.join("\n"));
        }

        prompt
    }
}
