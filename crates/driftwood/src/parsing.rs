use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const DEFAULT_SYNTAX_THEME: &str = "base16-ocean.dark";
pub const EXCERPT_LENGTH: usize = 200;

pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme: Theme,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut theme_set = ThemeSet::load_defaults();
        let theme = theme_set
            .themes
            .remove(DEFAULT_SYNTAX_THEME)
            .unwrap_or_default();

        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
        }
    }

    pub fn render(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let parser = Parser::new_ext(content, options);
        let mut html_output = String::new();
        let mut code_block: Option<Option<String>> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    let lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => {
                            lang.split_whitespace().next().map(String::from)
                        }
                        _ => None,
                    };
                    code_block = Some(lang);
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let lang = code_block.take().flatten();
                    html_output.push_str(&self.highlight(lang.as_deref(), &code_block_content));
                }
                Event::Text(text) if code_block.is_some() => {
                    code_block_content.push_str(&text);
                }
                other => {
                    pulldown_cmark::html::push_html(&mut html_output, std::iter::once(other));
                }
            }
        }

        html_output
    }

    fn highlight(&self, lang: Option<&str>, code: &str) -> String {
        let Some(lang) = lang else {
            return format!("<pre><code>{}</code></pre>", escape_html(code));
        };

        self.syntax_set
            .find_syntax_by_token(lang)
            .and_then(|syntax| {
                highlighted_html_for_string(code, &self.syntax_set, syntax, &self.theme).ok()
            })
            .unwrap_or_else(|| {
                format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    escape_html(lang),
                    escape_html(code)
                )
            })
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn extract_excerpt(content: &str, max_chars: usize) -> Option<String> {
    if content.trim().is_empty() {
        return None;
    }

    let normalized = content.replace("\r\n", "\n");
    let first_paragraph = normalized
        .split("\n\n")
        .map(|paragraph| paragraph.trim())
        .find(|paragraph| !paragraph.is_empty())?;

    let text: String = first_paragraph
        .chars()
        .filter(|c| !['#', '*', '_', '`', '[', ']', '(', ')'].contains(c))
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect();

    let text = text.trim();

    if text.chars().count() <= max_chars {
        Some(text.to_string())
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        let cut = truncated.rfind(' ').unwrap_or(truncated.len());
        Some(format!("{}...", truncated[..cut].trim_end()))
    }
}
