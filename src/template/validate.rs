//! Template validation

use super::TemplateFields;
use crate::types::ReviewRequest;

/// What a valid template must contain
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationRules<'a> {
    /// Whether the test plan must be filled in
    pub require_test_plan: bool,
    /// Parent request when stacking, named in the test plan message
    pub parent: Option<&'a ReviewRequest>,
}

/// Problems with the fields, empty when valid
pub fn validate(fields: &TemplateFields, rules: &ValidationRules<'_>) -> Vec<String> {
    let mut errors = Vec::new();

    if fields.title.trim().is_empty() {
        errors.push("Title is required".to_string());
    }

    if rules.require_test_plan && fields.test_plan.trim().is_empty() {
        errors.push(match rules.parent {
            Some(parent) => format!(
                "Test Plan is required; describe how this was tested on top of #{} ({}), \
                 which must merge first",
                parent.number, parent.head.name
            ),
            None => "Test Plan is required".to_string(),
        });
    }

    for token in &fields.reviewers {
        let well_formed = token
            .strip_prefix('@')
            .is_some_and(|handle| !handle.is_empty() && !handle.ends_with('/'));
        if !well_formed {
            errors.push(format!(
                "Reviewer '{token}' is malformed; use @login or @org/team"
            ));
        }
    }

    if fields.draft.is_none() {
        errors.push("Draft must be 'true' or 'false'".to_string());
    }

    errors
}
