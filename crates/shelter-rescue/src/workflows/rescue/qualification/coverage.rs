use std::collections::BTreeSet;

use super::super::domain::{IncidentReport, SkillTag, TrainingRequirement};

/// Requirements partitioned by whether the volunteer has completed them.
#[derive(Debug, Default)]
pub(crate) struct TrainingCoverage<'a> {
    pub satisfied_required: Vec<&'a TrainingRequirement>,
    pub missing_required: Vec<&'a TrainingRequirement>,
    pub satisfied_recommended: Vec<&'a TrainingRequirement>,
    pub missing_recommended: Vec<&'a TrainingRequirement>,
}

pub(crate) fn partition<'a>(
    report: &'a IncidentReport,
    completed: &BTreeSet<SkillTag>,
) -> TrainingCoverage<'a> {
    let mut coverage = TrainingCoverage::default();
    let mut seen: BTreeSet<(&SkillTag, bool)> = BTreeSet::new();

    for requirement in &report.requirements {
        // Duplicate rows for the same tag would otherwise be listed twice.
        if !seen.insert((&requirement.tag, requirement.required)) {
            continue;
        }

        let has = completed.contains(&requirement.tag);
        let bucket = match (requirement.required, has) {
            (true, true) => &mut coverage.satisfied_required,
            (true, false) => &mut coverage.missing_required,
            (false, true) => &mut coverage.satisfied_recommended,
            (false, false) => &mut coverage.missing_recommended,
        };
        bucket.push(requirement);
    }

    coverage
}

pub(crate) fn tags(requirements: &[&TrainingRequirement]) -> Vec<SkillTag> {
    requirements.iter().map(|req| req.tag.clone()).collect()
}

pub(crate) fn labels(requirements: &[&TrainingRequirement]) -> String {
    requirements
        .iter()
        .map(|req| req.label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
