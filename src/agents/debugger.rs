use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    build_system_prompt, estimate_tokens, Capability, CapabilityInput, CapabilityKind,
    CapabilityReport,
};
use crate::parsing::CodeParser;
use crate::providers::{GenerateRequest, LlmService};

/// Debugging capability: finds issues in a code snippet and proposes
/// fixes. Shallow syntax findings from the heuristic parser are folded
/// into the prompt so the model starts from concrete leads.
pub struct DebuggerAgent {
    llm: Arc<LlmService>,
    parser: CodeParser,
}

impl DebuggerAgent {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self {
            llm,
            parser: CodeParser::new(),
        }
    }

    fn build_debug_prompt(
        &self,
        code: &str,
        language: &str,
        error_message: Option<&str>,
        context: Option<&str>,
        syntax_findings: &str,
    ) -> String {
        let mut prompt = format!(
            "Analyze the following {language} code and identify issues:\n\n```{language}\n{code}\n```\n\n"
        );

        if let Some(error) = error_message {
            prompt.push_str(&format!("Error message: {error}\n\n"));
        }
        if let Some(ctx) = context {
            prompt.push_str(&format!("Additional context: {ctx}\n\n"));
        }
        if !syntax_findings.is_empty() {
            prompt.push_str(&format!("Preliminary syntax findings:\n{syntax_findings}\n\n"));
        }

        prompt.push_str(
            "Provide:\n\
             1. Issue identification (what's wrong)\n\
             2. Root cause (why it's happening)\n\
             3. Solution (how to fix it)\n\
             4. Prevention (how to avoid it in future)",
        );

        prompt
    }
}

#[async_trait]
impl Capability for DebuggerAgent {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Debugger
    }

    async fn execute(&self, input: &CapabilityInput) -> CapabilityReport {
        let Some(code) = input.get_str("code") else {
            return CapabilityReport::fail("No code provided");
        };

        let language = match input.get_str("language") {
            Some(lang) => lang.to_string(),
            None => self.parser.detect_language(code, input.get_str("filename")),
        };
        let error_message = input.get_str("error_message");
        let context = input.get_str("context");

        let syntax_findings = self
            .parser
            .find_syntax_issues(code, &language)
            .iter()
            .map(|issue| match issue.line {
                Some(line) => format!("- line {}: {}", line, issue.message),
                None => format!("- {}", issue.message),
            })
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            language = %language,
            session_id = %input.session_id,
            has_error_message = error_message.is_some(),
            "running debugger agent"
        );

        let system_prompt = build_system_prompt(
            "Code Debugging Expert",
            "You are an expert debugger. Identify bugs, explain their root cause, and propose minimal fixes.",
        );
        let user_prompt =
            self.build_debug_prompt(code, &language, error_message, context, &syntax_findings);
        let full_prompt = format!("{system_prompt}\n\n{user_prompt}");

        let mut request = GenerateRequest::new(full_prompt.clone());
        request.temperature = 0.3;

        match self.llm.generate(&request).await {
            Ok((response, _provider)) => {
                let tokens = estimate_tokens(&full_prompt, &response);
                CapabilityReport::ok_with_tokens(response, tokens)
            }
            Err(err) => CapabilityReport::fail(format!("LLM generation failed: {err}")),
        }
    }
}
