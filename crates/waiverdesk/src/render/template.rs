//! Waiver wording.

use serde::{Deserialize, Serialize};

/// A statement the guest initials individually.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Stable identifier used to key the guest's initials.
    pub id: String,
    /// Short bold heading.
    pub heading: String,
    /// Full clause text.
    pub text: String,
}

impl Clause {
    fn new(id: &str, heading: &str, text: &str) -> Self {
        Self {
            id: id.to_string(),
            heading: heading.to_string(),
            text: text.to_string(),
        }
    }
}

/// The fixed legal content of the waiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaiverTemplate {
    /// Document title.
    pub title: String,
    /// Introductory legal paragraphs, printed before the clauses.
    pub paragraphs: Vec<String>,
    /// Clauses to be initialed, in print order.
    pub clauses: Vec<Clause>,
    /// Statement printed beside the age confirmation box.
    pub age_statement: String,
}

impl WaiverTemplate {
    /// Look up a clause by id.
    #[must_use]
    pub fn clause(&self, id: &str) -> Option<&Clause> {
        self.clauses.iter().find(|c| c.id == id)
    }
}

impl Default for WaiverTemplate {
    fn default() -> Self {
        Self {
            title: "Release of Liability, Waiver of Claims and Assumption of Risk".to_string(),
            paragraphs: vec![
                "In consideration of being permitted to rent and operate watercraft, \
                 paddle equipment and related gear (the \"Equipment\"), I, the undersigned \
                 guest, acknowledge and agree to the terms below. I have read this document \
                 carefully and understand that by signing it I give up substantial legal \
                 rights."
                    .to_string(),
                "This agreement binds me, my heirs, assigns and legal representatives, and \
                 remains in effect for every rental I make on the date shown below."
                    .to_string(),
            ],
            clauses: vec![
                Clause::new(
                    "risk",
                    "Assumption of Risk",
                    "I understand that operating the Equipment on open water involves \
                     inherent risks including capsizing, collision, changing weather, cold \
                     water immersion, serious injury and drowning. I knowingly and \
                     voluntarily assume all such risks, known and unknown.",
                ),
                Clause::new(
                    "rules",
                    "Safety Rules",
                    "I will wear a properly fitted personal flotation device at all times, \
                     stay within the posted operating area, follow every instruction given \
                     by staff, and never operate the Equipment under the influence of \
                     alcohol or drugs.",
                ),
                Clause::new(
                    "release",
                    "Release and Waiver",
                    "I release, waive and discharge the operator, its owners, employees and \
                     agents from any and all liability for injury, death or property loss \
                     arising from my use of the Equipment, including claims caused by \
                     ordinary negligence.",
                ),
                Clause::new(
                    "damage",
                    "Equipment Damage",
                    "I accept financial responsibility for loss of or damage to the \
                     Equipment occurring during my rental period, other than normal wear, \
                     and authorize charges for repair or replacement at current rates.",
                ),
                Clause::new(
                    "medical",
                    "Medical Treatment",
                    "I confirm I have no medical condition that makes participation unsafe, \
                     and I consent to emergency medical treatment deemed necessary by staff \
                     or first responders, at my own expense.",
                ),
                Clause::new(
                    "license",
                    "License Verification",
                    "I certify that the driver's license details provided on this form are \
                     my own, are accurate, and that I hold any boating certification \
                     required by law to operate the Equipment.",
                ),
            ],
            age_statement: "I confirm that I am 18 years of age or older and legally \
                            competent to sign this agreement."
                .to_string(),
        }
    }
}
