//! Template parsing

use super::{
    BASE_BRANCH_PREFIX, DRAFT, ISSUES, READ_ONLY_SUFFIX, REVIEWERS, SUMMARY, TEST_PLAN, TITLE,
    TemplateFields,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Summary,
    TestPlan,
    Reviewers,
    Issues,
    Draft,
}

impl Section {
    fn from_marker(line: &str) -> Option<Self> {
        match line {
            TITLE => Some(Self::Title),
            SUMMARY => Some(Self::Summary),
            TEST_PLAN => Some(Self::TestPlan),
            REVIEWERS => Some(Self::Reviewers),
            ISSUES => Some(Self::Issues),
            DRAFT => Some(Self::Draft),
            _ => None,
        }
    }
}

/// `#` alone or followed by a space; markdown headings like `## Notes` are content
fn is_comment(line: &str) -> bool {
    line == "#" || line.starts_with("# ")
}

/// Whether a document has no content besides comments and whitespace
pub fn is_blank(document: &str) -> bool {
    document
        .lines()
        .map(str::trim_end)
        .all(|line| line.trim().is_empty() || is_comment(line))
}

/// Parse a template document
pub fn parse(document: &str) -> TemplateFields {
    let mut fields = TemplateFields::default();
    let mut current: Option<Section> = None;
    let mut buffer: Vec<&str> = Vec::new();

    for raw in document.lines() {
        let line = raw.trim_end();

        if let Some(next) = Section::from_marker(line.trim()) {
            if let Some(section) = current {
                commit(&mut fields, section, &buffer);
            }
            current = Some(next);
            buffer.clear();
            continue;
        }

        if let Some(rest) = line.strip_prefix(BASE_BRANCH_PREFIX) {
            let name = rest.trim().trim_end_matches(READ_ONLY_SUFFIX).trim();
            if !name.is_empty() {
                fields.base_branch = Some(name.to_string());
            }
            continue;
        }

        if is_comment(line) {
            continue;
        }

        if current.is_some() {
            buffer.push(line);
        }
    }

    if let Some(section) = current {
        commit(&mut fields, section, &buffer);
    }

    fields
}

fn commit(fields: &mut TemplateFields, section: Section, lines: &[&str]) {
    let text = lines.join("\n").trim().to_string();
    match section {
        Section::Title => fields.title = text.lines().next().unwrap_or_default().trim().to_string(),
        Section::Summary => fields.summary = text,
        Section::TestPlan => fields.test_plan = text,
        Section::Reviewers => fields.reviewers = split_tokens(&text),
        Section::Issues => fields.issues = split_tokens(&text),
        Section::Draft => fields.draft = parse_flag(&text),
    }
}

fn split_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.to_ascii_lowercase().as_str() {
        "" | "false" | "no" | "0" => Some(false),
        "true" | "yes" | "1" => Some(true),
        _ => None,
    }
}
