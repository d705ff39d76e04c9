use serde::{Deserialize, Serialize};

/// Normalized lead record extracted from a webhook payload.
///
/// Every field defaults to an empty string so row building never has to deal
/// with missing data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Lead {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub role: String,
    pub inquiry: String,
    pub market: String,
    pub deal_size: String,
    pub urgency: String,
    pub summary: String,
}

impl Lead {
    /// A lead is worth a row when anything besides the summary is known.
    pub fn is_meaningful(&self) -> bool {
        [
            &self.name,
            &self.phone,
            &self.email,
            &self.role,
            &self.inquiry,
            &self.market,
            &self.deal_size,
            &self.urgency,
        ]
        .iter()
        .any(|field| !field.is_empty())
    }

    /// Fills every empty field from `other`. Fields already set are kept, so
    /// merging sources in priority order gives first-non-empty-wins.
    pub fn fill_missing(&mut self, other: Lead) {
        fn fill(slot: &mut String, candidate: String) {
            if slot.is_empty() && !candidate.is_empty() {
                *slot = candidate;
            }
        }

        fill(&mut self.name, other.name);
        fill(&mut self.phone, other.phone);
        fill(&mut self.email, other.email);
        fill(&mut self.role, other.role);
        fill(&mut self.inquiry, other.inquiry);
        fill(&mut self.market, other.market);
        fill(&mut self.deal_size, other.deal_size);
        fill(&mut self.urgency, other.urgency);
        fill(&mut self.summary, other.summary);
    }

    /// Names of the non-empty fields, for logging.
    pub fn present_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("phone", &self.phone),
            ("email", &self.email),
            ("role", &self.role),
            ("inquiry", &self.inquiry),
            ("market", &self.market),
            ("dealSize", &self.deal_size),
            ("urgency", &self.urgency),
            ("summary", &self.summary),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Acknowledgement returned for every webhook delivery.
///
/// The HTTP status is always 200; `ok` and `skipped`/`error` carry the outcome.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wrote: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_range: Option<String>,
}

impl WebhookAck {
    pub fn written(updated_range: Option<String>) -> Self {
        Self {
            ok: true,
            wrote: Some(true),
            updated_range,
            ..Default::default()
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            ok: true,
            skipped: Some(reason.into()),
            ..Default::default()
        }
    }
}
