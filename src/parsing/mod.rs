use regex::Regex;
use std::sync::OnceLock;

/// A function definition found in source code.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub params: String,
    pub line: usize,
}

/// A shallow syntax problem detected without a real parser.
#[derive(Debug, Clone)]
pub struct SyntaxIssue {
    pub message: String,
    pub line: Option<usize>,
    pub snippet: Option<String>,
}

/// Basic quality metrics over a code snippet.
#[derive(Debug, Clone)]
pub struct QualityMetrics {
    pub total_lines: usize,
    pub non_empty_lines: usize,
    pub comment_lines: usize,
    pub function_count: usize,
    pub long_lines: usize,
    pub mixed_indentation: bool,
}

/// Heuristic, regex-based code parser used to enrich agent prompts.
/// Not a real parser: it trades accuracy for zero setup across languages.
pub struct CodeParser;

const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    (".py", "python"),
    (".js", "javascript"),
    (".ts", "typescript"),
    (".jsx", "jsx"),
    (".tsx", "tsx"),
    (".java", "java"),
    (".cpp", "cpp"),
    (".c", "c"),
    (".go", "go"),
    (".rs", "rust"),
    (".rb", "ruby"),
    (".php", "php"),
    (".swift", "swift"),
    (".kt", "kotlin"),
    (".sh", "bash"),
    (".sql", "sql"),
];

/// (pattern, classification) pairs for well-known runtime error messages.
const PYTHON_ERRORS: &[(&str, &str)] = &[
    (r"IndentationError", "Indentation error - check spacing"),
    (r"SyntaxError", "Syntax error - check code structure"),
    (r"NameError", "Name error - variable not defined"),
    (r"TypeError", "Type error - operation not supported"),
    (r"ValueError", "Value error - invalid value"),
    (r"AttributeError", "Attribute error - object has no attribute"),
    (r"KeyError", "Key error - dictionary key not found"),
    (r"IndexError", "Index error - list index out of range"),
];

const JAVASCRIPT_ERRORS: &[(&str, &str)] = &[
    (r"SyntaxError", "Syntax error - check code structure"),
    (r"TypeError", "Type error - operation not supported"),
    (r"ReferenceError", "Reference error - variable not defined"),
    (r"RangeError", "Range error - value out of acceptable range"),
    (r"Cannot read propert(y|ies) of", "Property access error"),
];

const JAVA_ERRORS: &[(&str, &str)] = &[
    (r"NullPointerException", "Null pointer exception"),
    (r"ArrayIndexOutOfBoundsException", "Array index out of bounds"),
    (r"ClassNotFoundException", "Class not found"),
    (r"IOException", "IO error"),
];

fn function_patterns(language: &str) -> &'static [&'static str] {
    match language {
        "python" => &[r"(?m)^\s*def\s+(\w+)\s*\((.*?)\)"],
        "javascript" | "typescript" | "jsx" | "tsx" => &[
            r"(?m)function\s+(\w+)\s*\((.*?)\)",
            r"(?m)const\s+(\w+)\s*=\s*(?:async\s*)?\((.*?)\)\s*=>",
        ],
        "java" => {
            &[r"(?m)(?:public|private|protected)\s+(?:static\s+)?(?:final\s+)?\w+\s+(\w+)\s*\((.*?)\)"]
        }
        "rust" => &[r"(?m)fn\s+(\w+)\s*(?:<[^>]*>)?\((.*?)\)"],
        _ => &[],
    }
}

impl CodeParser {
    pub fn new() -> Self {
        Self
    }

    /// Detect the programming language of a snippet, preferring the file
    /// extension when a filename is available and falling back to keyword
    /// heuristics. Returns "text" when nothing matches.
    pub fn detect_language(&self, code: &str, filename: Option<&str>) -> String {
        if let Some(name) = filename {
            let lower = name.to_lowercase();
            for &(ext, lang) in EXTENSION_LANGUAGES {
                if lower.ends_with(ext) {
                    return lang.to_string();
                }
            }
        }

        let heuristics: &'static [(&'static str, &'static str)] = &[
            (r"(?m)^\s*def\s+\w+\s*\(|^\s*import\s+\w+$", "python"),
            (r"\bfn\s+\w+\s*\(|\blet\s+mut\b|::<", "rust"),
            (r"\bfunction\s+\w+\s*\(|=>\s*\{|\bconsole\.log\b", "javascript"),
            (r"\bpublic\s+(?:static\s+)?(?:void|class)\b", "java"),
            (r"\bfunc\s+\w+\s*\(|\bpackage\s+main\b", "go"),
            (r"#include\s*<", "cpp"),
        ];
        for &(pattern, lang) in heuristics {
            if cached_regex(pattern).is_match(code) {
                return lang.to_string();
            }
        }

        "text".to_string()
    }

    /// Extract function definitions via per-language regex tables.
    pub fn extract_functions(&self, code: &str, language: &str) -> Vec<FunctionInfo> {
        let mut functions = Vec::new();

        for &pattern in function_patterns(language) {
            for caps in cached_regex(pattern).captures_iter(code) {
                let m = caps.get(0).unwrap();
                functions.push(FunctionInfo {
                    name: caps.get(1).map(|g| g.as_str().to_string()).unwrap_or_default(),
                    params: caps.get(2).map(|g| g.as_str().to_string()).unwrap_or_default(),
                    line: code[..m.start()].matches('\n').count() + 1,
                });
            }
        }

        functions
    }

    /// Find shallow syntax problems: unbalanced brackets plus occurrences
    /// of well-known error-message text embedded in the snippet.
    pub fn find_syntax_issues(&self, code: &str, language: &str) -> Vec<SyntaxIssue> {
        let mut issues = Vec::new();

        for (open, close) in [('(', ')'), ('[', ']'), ('{', '}')] {
            let opens = code.matches(open).count();
            let closes = code.matches(close).count();
            if opens != closes {
                issues.push(SyntaxIssue {
                    message: format!("Mismatched {open}{close} brackets"),
                    line: None,
                    snippet: None,
                });
            }
        }

        let table = match language {
            "python" => PYTHON_ERRORS,
            "javascript" | "typescript" => JAVASCRIPT_ERRORS,
            "java" => JAVA_ERRORS,
            _ => &[],
        };
        for &(pattern, message) in table {
            let re = cached_regex(pattern);
            for (i, line) in code.lines().enumerate() {
                if re.is_match(line) {
                    issues.push(SyntaxIssue {
                        message: message.to_string(),
                        line: Some(i + 1),
                        snippet: Some(line.trim().to_string()),
                    });
                }
            }
        }

        issues
    }

    pub fn analyze_quality(&self, code: &str, language: &str) -> QualityMetrics {
        let lines: Vec<&str> = code.lines().collect();
        let comment_marker = if language == "python" { "#" } else { "//" };

        QualityMetrics {
            total_lines: lines.len(),
            non_empty_lines: lines.iter().filter(|l| !l.trim().is_empty()).count(),
            comment_lines: lines
                .iter()
                .filter(|l| l.trim_start().starts_with(comment_marker))
                .count(),
            function_count: self.extract_functions(code, language).len(),
            long_lines: lines.iter().filter(|l| l.len() > 100).count(),
            mixed_indentation: language == "python"
                && lines.iter().any(|l| l.starts_with('\t'))
                && lines.iter().any(|l| l.starts_with(' ')),
        }
    }
}

impl Default for CodeParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile-once regex cache keyed by the pattern's address in the static
/// tables above. Patterns are literals, so compilation cannot fail at
/// runtime once the tables pass the tests.
fn cached_regex(pattern: &'static str) -> &'static Regex {
    use std::collections::HashMap;
    use std::sync::Mutex;

    static CACHE: OnceLock<Mutex<HashMap<&'static str, &'static Regex>>> = OnceLock::new();
    let cache = CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().unwrap();
    *guard
        .entry(pattern)
        .or_insert_with(|| Box::leak(Box::new(Regex::new(pattern).unwrap())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_language_by_extension() {
        let parser = CodeParser::new();
        assert_eq!(parser.detect_language("whatever", Some("main.rs")), "rust");
        assert_eq!(parser.detect_language("whatever", Some("app.PY")), "python");
    }

    #[test]
    fn test_detect_language_by_content() {
        let parser = CodeParser::new();
        assert_eq!(
            parser.detect_language("def handler(event):\n    return 1\n", None),
            "python"
        );
        assert_eq!(
            parser.detect_language("fn main() { let mut x = 0; }", None),
            "rust"
        );
        assert_eq!(parser.detect_language("just prose, no code", None), "text");
    }

    #[test]
    fn test_extract_python_functions() {
        let parser = CodeParser::new();
        let code = "def one(a, b):\n    pass\n\ndef two():\n    pass\n";
        let functions = parser.extract_functions(code, "python");
        assert_eq!(functions.len(), 2);
        assert_eq!(functions[0].name, "one");
        assert_eq!(functions[0].params, "a, b");
        assert_eq!(functions[1].line, 4);
    }

    #[test]
    fn test_bracket_mismatch() {
        let parser = CodeParser::new();
        let issues = parser.find_syntax_issues("fn broken( {", "rust");
        assert_eq!(issues.len(), 2);
        assert!(issues[0].message.contains("()"));
    }

    #[test]
    fn test_error_pattern_classification() {
        let parser = CodeParser::new();
        let code = "x = data['missing']\n# raises KeyError here";
        let issues = parser.find_syntax_issues(code, "python");
        assert!(issues.iter().any(|i| i.message.contains("Key error")));
    }

    #[test]
    fn test_quality_metrics() {
        let parser = CodeParser::new();
        let code = "# comment\ndef f():\n    pass\n\n";
        let metrics = parser.analyze_quality(code, "python");
        assert_eq!(metrics.comment_lines, 1);
        assert_eq!(metrics.function_count, 1);
        assert_eq!(metrics.non_empty_lines, 3);
        assert!(!metrics.mixed_indentation);
    }
}
