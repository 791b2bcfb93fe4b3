/// Result of an approval provider's evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Approved,
    /// Must carry non-empty `feedback` — enforced at construction via
    /// `Decision::rejected`.
    Rejected { feedback: String },
    /// A human must resolve this via `approve`/`reject`.
    Pending,
}

impl Decision {
    /// Construct a `Rejected` decision, refusing to build one with empty
    /// feedback. Providers should prefer this over the bare variant so
    /// the non-empty-feedback invariant cannot be violated by construction.
    pub fn rejected(feedback: impl Into<String>) -> Result<Self, &'static str> {
        let feedback = feedback.into();
        if feedback.trim().is_empty() {
            return Err("REJECTED decision requires non-empty feedback");
        }
        Ok(Decision::Rejected { feedback })
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, Decision::Approved)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Decision::Pending)
    }
}

/// Full result object returned by `ApprovalProvider::evaluate`.
#[derive(Debug, Clone)]
pub struct ApprovalResult {
    pub decision: Decision,
    /// Present on `Rejected` (required) and optionally on `Pending`.
    /// Never set for `Approved` except by convention (engine ignores it).
    pub feedback: Option<String>,
    /// Hint from an approver that supports rewrite suggestions. Treated
    /// strictly as a hint forwarded into the next `CALL_AI` context,
    /// never a direct file mutation.
    pub suggested_content: Option<String>,
}

impl ApprovalResult {
    pub fn approved() -> Self {
        Self {
            decision: Decision::Approved,
            feedback: None,
            suggested_content: None,
        }
    }

    pub fn pending(feedback: Option<String>) -> Self {
        Self {
            decision: Decision::Pending,
            feedback,
            suggested_content: None,
        }
    }

    pub fn rejected(feedback: impl Into<String>) -> Result<Self, &'static str> {
        let feedback = feedback.into();
        let decision = Decision::rejected(feedback.clone())?;
        Ok(Self {
            decision,
            feedback: Some(feedback),
            suggested_content: None,
        })
    }

    pub fn with_suggested_content(mut self, content: impl Into<String>) -> Self {
        self.suggested_content = Some(content.into());
        self
    }
}
