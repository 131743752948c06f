//! Report Section Templates
//!
//! The orchestrator resolves a template id plus parameters into a filled
//! prompt through the [`TemplateSource`] trait. The authoring front-end owns
//! the real template catalog; [`TemplateRegistry`] is a small in-memory
//! implementation backing the CLI and tests.

use std::collections::HashMap;

use regex::Regex;
use std::sync::LazyLock;

/// Parameters substituted into a template body
pub type TemplateParams = HashMap<String, String>;

/// Supplies filled prompts for template ids. `None` signals "not found".
pub trait TemplateSource: Send + Sync {
    fn fill_template(&self, id: &str, params: &TemplateParams) -> Option<String>;
}

/// A prompt template for one report section
#[derive(Debug, Clone)]
pub struct Template {
    /// Stable identifier, e.g. "introduction-academic"
    pub id: String,
    /// Human-readable title for listings
    pub title: String,
    /// Body text with `{placeholder}` slots
    pub body: String,
}

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([a-z0-9_-]+)\}").expect("valid placeholder pattern"));

impl Template {
    pub fn new(id: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            body: body.into(),
        }
    }

    /// Substitute `{placeholder}` slots from `params`.
    ///
    /// Placeholders without a matching parameter are left intact so the
    /// missing slot is visible in the produced prompt.
    pub fn fill(&self, params: &TemplateParams) -> String {
        PLACEHOLDER
            .replace_all(&self.body, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                params
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

/// In-memory template catalog
#[derive(Debug, Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<String, Template>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in report section templates
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for template in builtin_templates() {
            registry.insert(template);
        }
        registry
    }

    pub fn insert(&mut self, template: Template) {
        self.templates.insert(template.id.clone(), template);
    }

    pub fn get(&self, id: &str) -> Option<&Template> {
        self.templates.get(id)
    }

    /// All templates, sorted by id for stable listings
    pub fn list(&self) -> Vec<&Template> {
        let mut all: Vec<&Template> = self.templates.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateSource for TemplateRegistry {
    fn fill_template(&self, id: &str, params: &TemplateParams) -> Option<String> {
        self.templates.get(id).map(|t| t.fill(params))
    }
}

fn builtin_templates() -> Vec<Template> {
    vec![
        Template::new(
            "introduction-academic",
            "Academic introduction",
            "Write the introduction section of an academic report on {topic}. \
             Establish the research context, state the problem being addressed, \
             and outline the structure of the report. Use a formal register and \
             do not include citations you cannot verify.",
        ),
        Template::new(
            "methods-summary",
            "Methods summary",
            "Summarize the methodology of a report on {topic}. Describe the \
             approach ({approach}) in enough detail that a reader could assess \
             its validity. Keep the summary under four paragraphs.",
        ),
        Template::new(
            "results-discussion",
            "Results discussion",
            "Draft the discussion section for a report on {topic}. Interpret \
             the key findings: {findings}. Address limitations explicitly and \
             avoid overstating conclusions.",
        ),
        Template::new(
            "conclusion-brief",
            "Brief conclusion",
            "Write a concise conclusion for a report on {topic}. Restate the \
             main contribution in one paragraph and suggest one direction for \
             future work.",
        ),
        Template::new(
            "improve-clarity",
            "Clarity rewrite",
            "Rewrite the following report passage to improve clarity and flow \
             while preserving its meaning and technical content:\n\n{text}",
        ),
    ]
}
