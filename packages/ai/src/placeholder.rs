// ABOUTME: Placeholder content synthesized when the generation service is unavailable
// ABOUTME: Keeps the section usable with an outline chosen from keywords in its title

/// Marker line every placeholder carries, so callers can recognise one
pub const PLACEHOLDER_NOTICE: &str =
    "*This section requires manual content. AI generation was unavailable.*";

pub fn placeholder_content(title: &str, description: &str) -> String {
    let mut content = format!("## {}\n\n", title);

    if !description.trim().is_empty() {
        content.push_str(description.trim());
        content.push_str("\n\n");
    }

    content.push_str("---\n\n");
    content.push_str(PLACEHOLDER_NOTICE);
    content.push_str("\n\n### Suggested Content:\n");

    for item in suggested_outline(title) {
        content.push_str("- ");
        content.push_str(&item);
        content.push('\n');
    }

    content
}

fn suggested_outline(title: &str) -> Vec<String> {
    let lower = title.to_lowercase();
    let has = |keywords: &[&'static str]| contains_any(&lower, keywords);

    let items: &[&str] = if has(&["overview", "introduction"]) {
        &[
            "Project purpose and goals",
            "Key features and capabilities",
            "Target audience",
        ]
    } else if has(&["architecture", "design"]) {
        &[
            "System components and their relationships",
            "Data flow diagrams",
            "Technology stack decisions",
        ]
    } else if has(&["api"]) {
        &[
            "API endpoints and methods",
            "Request/response formats",
            "Authentication requirements",
            "Example requests",
        ]
    } else if has(&["install", "setup", "getting started"]) {
        &[
            "Prerequisites and requirements",
            "Installation steps",
            "Configuration options",
            "Verification steps",
        ]
    } else if has(&["usage", "guide"]) {
        &["Common use cases", "Code examples", "Best practices"]
    } else {
        return vec![
            format!("Details about {}", title),
            "Relevant code explanations".to_string(),
            "Examples and usage".to_string(),
        ];
    };

    items.iter().map(|s| s.to_string()).collect()
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| haystack.contains(k))
}
