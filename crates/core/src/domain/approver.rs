use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApproverRole {
    Legal,
    Management,
    Approver,
}

impl ApproverRole {
    pub const ALL: [ApproverRole; 3] = [Self::Legal, Self::Management, Self::Approver];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Legal => "legal",
            Self::Management => "management",
            Self::Approver => "approver",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legal" => Some(Self::Legal),
            "management" => Some(Self::Management),
            "approver" | "final_approver" => Some(Self::Approver),
            _ => None,
        }
    }

    /// Human label used in timeline entries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Legal => "Legal",
            Self::Management => "Management",
            Self::Approver => "Final Approver",
        }
    }
}

impl std::fmt::Display for ApproverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLimits {
    pub legal: usize,
    pub management: usize,
    pub approver: usize,
}

impl RoleLimits {
    pub fn for_role(&self, role: ApproverRole) -> usize {
        match role {
            ApproverRole::Legal => self.legal,
            ApproverRole::Management => self.management,
            ApproverRole::Approver => self.approver,
        }
    }
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self { legal: 2, management: 5, approver: 1 }
    }
}

/// A person assigned to review a contract in one role slot.
///
/// `declined` means "sent back for revision". `approved` and `declined` are
/// never both set once a record has been repaired.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approver {
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub declined: bool,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub declined_at: Option<DateTime<Utc>>,
}

impl Approver {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            approved: false,
            declined: false,
            approved_at: None,
            declined_at: None,
        }
    }

    pub fn matches(&self, email: &str) -> bool {
        normalize_email(&self.email) == normalize_email(email)
    }

    pub fn is_unactioned(&self) -> bool {
        !self.approved && !self.declined
    }

    pub fn has_responded(&self) -> bool {
        self.approved || self.declined
    }

    pub fn mark_approved(&mut self, at: DateTime<Utc>) {
        self.approved = true;
        self.approved_at = Some(at);
        self.declined = false;
        self.declined_at = None;
    }

    pub fn mark_declined(&mut self, at: DateTime<Utc>) {
        self.declined = true;
        self.declined_at = Some(at);
        self.approved = false;
        self.approved_at = None;
    }

    pub fn reset(&mut self) {
        self.approved = false;
        self.approved_at = None;
        self.declined = false;
        self.declined_at = None;
    }

    /// Heals an approved record that still carries send-back state: approval wins.
    pub fn repair(&mut self) -> bool {
        if self.approved && (self.declined || self.declined_at.is_some()) {
            self.declined = false;
            self.declined_at = None;
            return true;
        }
        false
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub legal: Vec<Approver>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub management: Vec<Approver>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approver: Vec<Approver>,
}

impl ApproverSet {
    pub fn slot(&self, role: ApproverRole) -> &[Approver] {
        match role {
            ApproverRole::Legal => &self.legal,
            ApproverRole::Management => &self.management,
            ApproverRole::Approver => &self.approver,
        }
    }

    pub fn slot_mut(&mut self, role: ApproverRole) -> &mut Vec<Approver> {
        match role {
            ApproverRole::Legal => &mut self.legal,
            ApproverRole::Management => &mut self.management,
            ApproverRole::Approver => &mut self.approver,
        }
    }

    pub fn find(&self, role: ApproverRole, email: &str) -> Option<&Approver> {
        self.slot(role).iter().find(|approver| approver.matches(email))
    }

    pub fn find_mut(&mut self, role: ApproverRole, email: &str) -> Option<&mut Approver> {
        self.slot_mut(role).iter_mut().find(|approver| approver.matches(email))
    }

    /// Non-empty and every record approved.
    pub fn is_fully_approved(&self, role: ApproverRole) -> bool {
        let slot = self.slot(role);
        !slot.is_empty() && slot.iter().all(|approver| approver.approved)
    }

    pub fn any_declined(&self, role: ApproverRole) -> bool {
        self.slot(role).iter().any(|approver| approver.declined)
    }

    pub fn reset_all(&mut self) {
        for role in ApproverRole::ALL {
            self.slot_mut(role).iter_mut().for_each(Approver::reset);
        }
    }

    /// Returns the number of records that needed fixing.
    pub fn repair(&mut self) -> usize {
        ApproverRole::ALL
            .into_iter()
            .map(|role| {
                self.slot_mut(role)
                    .iter_mut()
                    .map(|approver| usize::from(approver.repair()))
                    .sum::<usize>()
            })
            .sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ApproverRole, &Approver)> {
        ApproverRole::ALL
            .into_iter()
            .flat_map(move |role| self.slot(role).iter().map(move |approver| (role, approver)))
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}
