use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use super::{
    build_system_prompt, estimate_tokens, Capability, CapabilityInput, CapabilityKind,
    CapabilityReport,
};
use crate::parsing::CodeParser;
use crate::providers::{GenerateRequest, LlmService};

/// Documentation generation capability. `doc_type` picks the scope
/// (function, class, module, api) and `style` the docstring convention
/// (google, numpy, sphinx).
pub struct DocsGeneratorAgent {
    llm: Arc<LlmService>,
    parser: CodeParser,
}

impl DocsGeneratorAgent {
    pub fn new(llm: Arc<LlmService>) -> Self {
        Self {
            llm,
            parser: CodeParser::new(),
        }
    }

    fn build_docs_prompt(
        &self,
        code: &str,
        language: &str,
        doc_type: &str,
        style: &str,
        context: Option<&str>,
        function_names: &[String],
    ) -> String {
        let mut prompt = format!(
            "Generate {style}-style {doc_type} documentation for this {language} code:\n\n```{language}\n{code}\n```\n\n"
        );

        if let Some(ctx) = context {
            prompt.push_str(&format!("Additional context: {ctx}\n\n"));
        }
        if !function_names.is_empty() {
            prompt.push_str(&format!(
                "Functions detected: {}.\n\n",
                function_names.join(", ")
            ));
        }

        prompt.push_str(
            "Include:\n\
             1. A concise summary of what the code does\n\
             2. Parameter and return value descriptions\n\
             3. Usage examples where helpful\n\
             4. Notes on errors or edge cases",
        );

        prompt
    }
}

#[async_trait]
impl Capability for DocsGeneratorAgent {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::DocsGenerator
    }

    async fn execute(&self, input: &CapabilityInput) -> CapabilityReport {
        let Some(code) = input.get_str("code") else {
            return CapabilityReport::fail("No code provided");
        };

        let language = match input.get_str("language") {
            Some(lang) => lang.to_string(),
            None => self.parser.detect_language(code, input.get_str("filename")),
        };
        let doc_type = input.get_str("doc_type").unwrap_or("function");
        let style = input.get_str("style").unwrap_or("google");

        let function_names: Vec<String> = self
            .parser
            .extract_functions(code, &language)
            .into_iter()
            .map(|f| f.name)
            .collect();

        debug!(
            language = %language,
            doc_type,
            style,
            session_id = %input.session_id,
            "running docs generator agent"
        );

        let system_prompt = build_system_prompt(
            "Technical Documentation Expert",
            &format!(
                "You are an expert at writing clear, comprehensive {style}-style documentation. \
                 Generate {doc_type} documentation that is easy to understand and follow."
            ),
        );
        let user_prompt = self.build_docs_prompt(
            code,
            &language,
            doc_type,
            style,
            input.get_str("context"),
            &function_names,
        );
        let full_prompt = format!("{system_prompt}\n\n{user_prompt}");

        let mut request = GenerateRequest::new(full_prompt.clone());
        request.temperature = 0.4;
        request.max_tokens = 3000;

        match self.llm.generate(&request).await {
            Ok((response, _provider)) => {
                let tokens = estimate_tokens(&full_prompt, &response);
                CapabilityReport::ok_with_tokens(response, tokens)
            }
            Err(err) => CapabilityReport::fail(format!("LLM generation failed: {err}")),
        }
    }
}
