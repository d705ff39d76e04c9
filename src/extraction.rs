/// Lead extraction from Vapi webhook payloads
///
/// The payload shape has drifted over time, so extraction is a prioritized
/// list of `LeadSource` strategies, merged field by field (first non-empty
/// wins):
/// 1. Structured outputs (object or tagged array, at several nesting paths)
/// 2. Legacy `caller` / `qualifications` objects
/// 3. `structuredData` from the call analysis
/// 4. Regex fallback over summary and transcript text (email, phone, name)
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::str::FromStr;

use crate::config::{Config, DEFAULT_BROKERAGE};
use crate::webhook_models::Lead;

// JSON pointers searched for each concern, in priority order.
const CALL_ID_POINTERS: &[&str] = &[
    "/call_id",
    "/callId",
    "/call/id",
    "/message/call/id",
    "/message/callId",
    "/data/call_id",
    "/data/call/id",
    "/data/callId",
];

const BROKERAGE_POINTERS: &[&str] = &[
    "/brokerage",
    "/metadata/brokerage",
    "/assistant/metadata/brokerage",
    "/call/metadata/brokerage",
    "/message/call/metadata/brokerage",
    "/message/assistant/metadata/brokerage",
];

const STRUCTURED_OUTPUT_ROOTS: &[&str] = &[
    "",
    "/assistant",
    "/data",
    "/result",
    "/message",
    "/message/artifact",
    "/artifact",
    "/call/artifact",
];

const STRUCTURED_OUTPUT_KEYS: &[&str] = &[
    "structuredOutputs",
    "structured_outputs",
    "structuredOutput",
    "outputs",
    "output",
];

const STRUCTURED_DATA_POINTERS: &[&str] = &[
    "/analysis/structuredData",
    "/message/analysis/structuredData",
    "/structuredData",
    "/structured_data",
];

const SUMMARY_POINTERS: &[&str] = &[
    "/summary",
    "/analysis/summary",
    "/message/summary",
    "/message/analysis/summary",
];

const TRANSCRIPT_POINTERS: &[&str] = &[
    "/transcript",
    "/message/transcript",
    "/artifact/transcript",
    "/message/artifact/transcript",
];

// Field synonyms inside a lead-shaped object.
const NAME_KEYS: &[&str] = &["name", "fullName", "full_name"];
const PHONE_KEYS: &[&str] = &["phone", "phoneNumber", "phone_number"];
const EMAIL_KEYS: &[&str] = &["email", "emailAddress"];
const ROLE_KEYS: &[&str] = &["role"];
const INQUIRY_KEYS: &[&str] = &["inquiry", "inquiryType", "inquiry_type"];
const MARKET_KEYS: &[&str] = &["market", "location"];
const DEAL_SIZE_KEYS: &[&str] = &["deal_size", "dealSize", "budget"];
const URGENCY_KEYS: &[&str] = &["urgency", "timeline"];
const SUMMARY_KEYS: &[&str] = &["summary"];

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap());

/// Optional `+CC` or bare `1` prefix, then a 3-3-4 number with single
/// space, dot or dash separators.
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:\+\d{1,3}[ .-]?|1[ .-]?)?\(?\d{3}\)?[ .-]?\d{3}[ .-]?\d{4}\b").unwrap()
});

static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:my name is|this is)\s+([^.,;:!?\n]{1,40})").unwrap()
});

/// Words that end a spoken name ("this is Dana calling from ...").
const NAME_STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "at", "calling", "from", "here", "i", "i'm", "im", "in",
    "interested", "looking", "on", "regarding", "speaking", "the", "with",
];

/// Role words dropped from a spoken name ("this is buyer Dana Cole").
const NAME_ROLE_WORDS: &[&str] = &[
    "agent", "broker", "buyer", "homeowner", "investor", "landlord", "lender", "owner",
    "realtor", "seller", "tenant",
];

/// Transcript speaker labels whose lines never carry the caller's name.
const ASSISTANT_SPEAKERS: &[&str] = &["ai", "assistant", "bot"];

const MAX_NAME_TOKENS: usize = 3;
const MIN_PHONE_DIGITS: usize = 10;
const MAX_PHONE_DIGITS: usize = 15;

/// How the free-text `role` field is treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RolePolicy {
    /// Map onto `owner`, `buyer`, `lender`, `general`, or empty.
    #[default]
    Strict,
    /// Keep whatever the caller said, trimmed.
    Passthrough,
}

impl FromStr for RolePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(RolePolicy::Strict),
            "passthrough" | "free" => Ok(RolePolicy::Passthrough),
            other => Err(format!("unknown role policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub role_policy: RolePolicy,
    pub default_brokerage: String,
    pub raw_max_chars: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            role_policy: RolePolicy::Strict,
            default_brokerage: DEFAULT_BROKERAGE.to_string(),
            raw_max_chars: 1000,
        }
    }
}

impl From<&Config> for ExtractOptions {
    fn from(config: &Config) -> Self {
        Self {
            role_policy: config.role_policy,
            default_brokerage: config.default_brokerage.clone(),
            raw_max_chars: config.raw_max_chars,
        }
    }
}

/// Everything the handler needs from one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub lead: Lead,
    pub call_id: Option<String>,
    pub brokerage: String,
    /// Compact JSON of the normalized lead, truncated to the raw budget.
    pub raw: String,
}

/// One way of finding lead fields in a payload.
pub trait LeadSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns whatever this source can find; unknown fields stay empty.
    fn extract(&self, payload: &Value) -> Lead;
}

/// Assistant structured outputs tagged `lead`.
pub struct StructuredOutputSource;

impl LeadSource for StructuredOutputSource {
    fn name(&self) -> &'static str {
        "structured_output"
    }

    fn extract(&self, payload: &Value) -> Lead {
        find_structured_lead(payload)
            .map(lead_from_object)
            .unwrap_or_default()
    }
}

/// `caller` + `qualifications` objects sent by older assistant versions.
pub struct LegacyFieldsSource;

impl LeadSource for LegacyFieldsSource {
    fn name(&self) -> &'static str {
        "legacy_fields"
    }

    fn extract(&self, payload: &Value) -> Lead {
        let caller = payload.get("caller");
        let quals = payload.get("qualifications");

        Lead {
            name: first_field(caller, NAME_KEYS),
            phone: first_field(caller, PHONE_KEYS),
            email: first_field(caller, EMAIL_KEYS),
            role: first_field(quals, ROLE_KEYS),
            inquiry: first_field(quals, INQUIRY_KEYS),
            market: first_field(quals, MARKET_KEYS),
            deal_size: first_field(quals, DEAL_SIZE_KEYS),
            urgency: first_field(quals, URGENCY_KEYS),
            summary: first_at(payload, SUMMARY_POINTERS),
        }
    }
}

/// `structuredData` produced by the call analysis plan.
pub struct StructuredDataSource;

impl LeadSource for StructuredDataSource {
    fn name(&self) -> &'static str {
        "structured_data"
    }

    fn extract(&self, payload: &Value) -> Lead {
        STRUCTURED_DATA_POINTERS
            .iter()
            .filter_map(|pointer| payload.pointer(pointer))
            .find(|value| value.is_object())
            .map(lead_from_object)
            .unwrap_or_default()
    }
}

/// Regex fallback over summary and transcript text.
pub struct FreeTextSource;

impl LeadSource for FreeTextSource {
    fn name(&self) -> &'static str {
        "free_text"
    }

    fn extract(&self, payload: &Value) -> Lead {
        let text = SUMMARY_POINTERS
            .iter()
            .chain(TRANSCRIPT_POINTERS)
            .filter_map(|pointer| payload.pointer(pointer))
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Lead::default();
        }

        Lead {
            name: find_name(&without_assistant_lines(&text)).unwrap_or_default(),
            phone: find_phone(&text).unwrap_or_default(),
            email: find_email(&text).unwrap_or_default(),
            ..Default::default()
        }
    }
}

/// Runs the lead sources in priority order and normalizes the result.
pub struct LeadExtractor {
    sources: Vec<Box<dyn LeadSource>>,
    options: ExtractOptions,
}

impl LeadExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self {
            sources: vec![
                Box::new(StructuredOutputSource),
                Box::new(LegacyFieldsSource),
                Box::new(StructuredDataSource),
                Box::new(FreeTextSource),
            ],
            options,
        }
    }

    pub fn extract(&self, payload: &Value) -> Extraction {
        let mut lead = Lead::default();

        if payload.is_object() {
            for source in &self.sources {
                let found = source.extract(payload);
                let fields = found.present_fields();
                if !fields.is_empty() {
                    tracing::debug!("Lead source {} provided {:?}", source.name(), fields);
                }
                lead.fill_missing(found);
            }
        }

        lead.role = normalize_role(&lead.role, self.options.role_policy);
        if lead.summary.is_empty() {
            lead.summary = synthesize_summary(&lead);
        }

        let call_id = Some(first_at(payload, CALL_ID_POINTERS)).filter(|id| !id.is_empty());
        let brokerage = Some(first_at(payload, BROKERAGE_POINTERS))
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| self.options.default_brokerage.clone());
        let raw = compact_raw(&lead, self.options.raw_max_chars);

        Extraction {
            lead,
            call_id,
            brokerage,
            raw,
        }
    }
}

/// Convenience wrapper for one-off extraction.
pub fn extract_lead(payload: &Value, options: &ExtractOptions) -> Extraction {
    LeadExtractor::new(options.clone()).extract(payload)
}

/// Coerces a JSON scalar to a trimmed string. Null, arrays and objects are empty.
fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

fn first_field(object: Option<&Value>, keys: &[&str]) -> String {
    let Some(object) = object else {
        return String::new();
    };
    keys.iter()
        .filter_map(|key| object.get(key))
        .map(scalar)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn first_at(payload: &Value, pointers: &[&str]) -> String {
    pointers
        .iter()
        .filter_map(|pointer| payload.pointer(pointer))
        .map(scalar)
        .find(|value| !value.is_empty())
        .unwrap_or_default()
}

fn lead_from_object(object: &Value) -> Lead {
    let object = Some(object);
    Lead {
        name: first_field(object, NAME_KEYS),
        phone: first_field(object, PHONE_KEYS),
        email: first_field(object, EMAIL_KEYS),
        role: first_field(object, ROLE_KEYS),
        inquiry: first_field(object, INQUIRY_KEYS),
        market: first_field(object, MARKET_KEYS),
        deal_size: first_field(object, DEAL_SIZE_KEYS),
        urgency: first_field(object, URGENCY_KEYS),
        summary: first_field(object, SUMMARY_KEYS),
    }
}

fn find_structured_lead(payload: &Value) -> Option<&Value> {
    STRUCTURED_OUTPUT_ROOTS
        .iter()
        .filter_map(|root| payload.pointer(root))
        .flat_map(|root| {
            STRUCTURED_OUTPUT_KEYS
                .iter()
                .filter_map(move |key| root.get(key))
        })
        .find_map(lead_in_container)
        .map(|lead| match lead.get("lead") {
            Some(inner) if inner.is_object() => inner,
            _ => lead,
        })
}

fn lead_in_container(container: &Value) -> Option<&Value> {
    match container {
        Value::Object(map) => match map.get("lead") {
            Some(lead) if lead.is_object() => Some(lead),
            _ => lead_in_items(&map.values().collect::<Vec<_>>()),
        },
        Value::Array(items) => lead_in_items(&items.iter().collect::<Vec<_>>()),
        _ => None,
    }
}

/// Tagged items win over items that merely carry a `lead`/`data` object.
fn lead_in_items<'a>(items: &[&'a Value]) -> Option<&'a Value> {
    fn object_at<'v>(item: &'v Value, keys: &[&str]) -> Option<&'v Value> {
        keys.iter()
            .filter_map(|key| item.get(key))
            .find(|value| value.is_object())
    }

    items
        .iter()
        .copied()
        .filter(|item| is_tagged_lead(item))
        .find_map(|item| object_at(item, &["result", "data", "value", "lead"]))
        .or_else(|| {
            items
                .iter()
                .copied()
                .find_map(|item| object_at(item, &["lead", "data"]))
        })
}

fn is_tagged_lead(item: &Value) -> bool {
    ["name", "type", "id"].iter().any(|key| {
        item.get(key)
            .and_then(Value::as_str)
            .is_some_and(|tag| tag.trim().eq_ignore_ascii_case("lead"))
    })
}

/// First `local@domain.tld` address in the text.
pub fn find_email(text: &str) -> Option<String> {
    EMAIL_PATTERN.find(text).map(|m| m.as_str().to_string())
}

/// First phone-shaped token with 10 to 15 digits. Dollar amounts and tails
/// of longer digit runs are skipped.
pub fn find_phone(text: &str) -> Option<String> {
    PHONE_PATTERN
        .find_iter(text)
        .filter(|m| {
            let before = &text[..m.start()];
            !before.trim_end().ends_with('$')
                && !before.chars().next_back().is_some_and(|c| c.is_ascii_digit())
        })
        .find(|m| {
            let digits = m.as_str().chars().filter(char::is_ascii_digit).count();
            (MIN_PHONE_DIGITS..=MAX_PHONE_DIGITS).contains(&digits)
        })
        .map(|m| m.as_str().trim().to_string())
}

/// Drops `AI:` / `Assistant:` transcript lines so the assistant's own
/// greeting is not taken for the caller's introduction.
fn without_assistant_lines(text: &str) -> String {
    text.lines()
        .filter(|line| {
            !line.split_once(':').is_some_and(|(speaker, _)| {
                ASSISTANT_SPEAKERS.contains(&speaker.trim().to_ascii_lowercase().as_str())
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Name following "my name is" / "this is", title-cased, at most three words.
pub fn find_name(text: &str) -> Option<String> {
    NAME_PATTERN.captures_iter(text).find_map(|caps| {
        let spoken = caps.get(1)?.as_str();
        let mut tokens = Vec::new();

        for raw in spoken.split_whitespace() {
            let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
            let lower = word.to_lowercase();
            if word.is_empty() || NAME_STOP_WORDS.contains(&lower.as_str()) {
                break;
            }
            if NAME_ROLE_WORDS.contains(&lower.as_str()) {
                continue;
            }
            if !word.chars().all(|c| c.is_alphabetic() || c == '\'' || c == '-') {
                break;
            }
            tokens.push(title_case(word));
            if tokens.len() == MAX_NAME_TOKENS {
                break;
            }
        }

        (!tokens.is_empty()).then(|| tokens.join(" "))
    })
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Applies the role policy to a raw role string.
pub fn normalize_role(raw: &str, policy: RolePolicy) -> String {
    let raw = raw.trim();
    if policy == RolePolicy::Passthrough || raw.is_empty() {
        return raw.to_string();
    }

    let lower = raw.to_lowercase();
    let vocabulary: [(&str, &[&str]); 4] = [
        ("owner", &["owner", "seller", "landlord"]),
        ("buyer", &["buyer", "purchaser", "investor"]),
        ("lender", &["lender", "lending", "loan"]),
        ("general", &["general", "inquiry"]),
    ];

    vocabulary
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lower.contains(needle)))
        .map(|(role, _)| role.to_string())
        .unwrap_or_default()
}

/// Short sentence built from the qualification fields; empty when none are known.
pub fn synthesize_summary(lead: &Lead) -> String {
    if [
        &lead.role,
        &lead.inquiry,
        &lead.market,
        &lead.deal_size,
        &lead.urgency,
    ]
    .iter()
    .all(|field| field.is_empty())
    {
        return String::new();
    }

    let mut summary = if lead.role.is_empty() {
        "Caller".to_string()
    } else {
        title_case(&lead.role)
    };
    summary.push_str(" inquiry");
    if !lead.inquiry.is_empty() {
        summary.push_str(&format!(": {}", lead.inquiry));
    }
    if !lead.market.is_empty() {
        summary.push_str(&format!(" in {}", lead.market));
    }
    if !lead.deal_size.is_empty() {
        summary.push_str(&format!(", deal size {}", lead.deal_size));
    }
    if !lead.urgency.is_empty() {
        summary.push_str(&format!(", timeline {}", lead.urgency));
    }
    summary.push('.');
    summary
}

/// JSON of the normalized lead, cut to `max_chars` characters.
pub fn compact_raw(lead: &Lead, max_chars: usize) -> String {
    let raw = serde_json::to_string(lead).unwrap_or_default();
    match raw.char_indices().nth(max_chars) {
        Some((cut, _)) => raw[..cut].to_string(),
        None => raw,
    }
}
