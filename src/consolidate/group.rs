use crate::config::ProviderName;
use crate::schema::{Confidence, PersonaFinding, Severity, VerdictFinding};

/// A finding shape the engine can merge
pub trait Candidate {
    fn block_id(&self) -> &str;
    fn severity(&self) -> Severity;
    fn original(&self) -> &str;
    fn suggested(&self) -> &str;
    fn justification(&self) -> &str;

    fn confidence(&self) -> Option<Confidence> {
        None
    }

    fn debate_notes(&self) -> Option<&str> {
        None
    }
}

impl Candidate for PersonaFinding {
    fn block_id(&self) -> &str {
        &self.block_id
    }
    fn severity(&self) -> Severity {
        self.severity
    }
    fn original(&self) -> &str {
        &self.original
    }
    fn suggested(&self) -> &str {
        &self.suggested
    }
    fn justification(&self) -> &str {
        &self.justification
    }
}

impl Candidate for VerdictFinding {
    fn block_id(&self) -> &str {
        &self.block_id
    }
    fn severity(&self) -> Severity {
        self.severity
    }
    fn original(&self) -> &str {
        &self.original
    }
    fn suggested(&self) -> &str {
        &self.suggested
    }
    fn justification(&self) -> &str {
        &self.justification
    }
    fn confidence(&self) -> Option<Confidence> {
        Some(self.confidence)
    }
    fn debate_notes(&self) -> Option<&str> {
        self.debate_notes.as_deref()
    }
}

/// A finding tagged with the provider that produced it
#[derive(Debug)]
pub struct Sourced<'a, F> {
    pub provider: ProviderName,
    pub finding: &'a F,
}

/// Findings judged to describe the same issue, in arrival order
#[derive(Debug)]
pub struct Group<'a, F> {
    pub members: Vec<Sourced<'a, F>>,
}

impl<'a, F: Candidate> Group<'a, F> {
    fn accepts(&self, candidate: &F, max_distance: u8) -> bool {
        self.members.first().is_some_and(|first| {
            first.finding.block_id() == candidate.block_id()
                && first.finding.severity().distance(candidate.severity()) <= max_distance
        })
    }

    /// The most severe member; the earliest one wins a tie
    pub fn representative(&self) -> Option<&Sourced<'a, F>> {
        self.members.iter().min_by_key(|m| m.finding.severity())
    }
}

/// Greedy first-fit grouping: each finding joins the first existing group
/// whose first member shares its block and lies within `max_distance`
/// severity ranks, otherwise it opens a new group. Order matters, so
/// callers feed findings in provider name order.
pub fn group_findings<'a, F: Candidate>(
    items: impl IntoIterator<Item = Sourced<'a, F>>,
    max_distance: u8,
) -> Vec<Group<'a, F>> {
    let mut groups: Vec<Group<'a, F>> = Vec::new();

    for item in items {
        match groups
            .iter_mut()
            .find(|g| g.accepts(item.finding, max_distance))
        {
            Some(group) => group.members.push(item),
            None => groups.push(Group {
                members: vec![item],
            }),
        }
    }

    groups
}
