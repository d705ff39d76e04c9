/// Property-based tests using proptest
/// Tests invariants of lead extraction that should hold for all inputs
use proptest::prelude::*;
use serde_json::json;
use vapi_lead_sheets::extraction::{
    compact_raw, extract_lead, find_email, find_phone, ExtractOptions,
};
use vapi_lead_sheets::webhook_models::Lead;

// Property: extraction never panics and never invents lead fields from noise
proptest! {
    #[test]
    fn extraction_never_panics_on_arbitrary_text(text in "\\PC*") {
        let payload = json!({"summary": text, "transcript": text});
        let _ = extract_lead(&payload, &ExtractOptions::default());
    }

    #[test]
    fn payloads_without_lead_fields_yield_empty_lead(
        status in "[a-z-]{1,20}",
        call_id in "[a-z0-9]{1,12}"
    ) {
        let payload = json!({
            "message": {"type": "status-update", "status": status, "call": {"id": call_id}}
        });
        let out = extract_lead(&payload, &ExtractOptions::default());
        prop_assert_eq!(out.lead, Lead::default());
        prop_assert_eq!(out.call_id, Some(call_id));
    }
}

// Property: an email that only appears in free text is recovered exactly
proptest! {
    #[test]
    fn email_recovered_from_free_text(
        local in "[a-z][a-z0-9._]{0,15}[a-z0-9]",
        domain in "[a-z][a-z0-9]{1,12}",
        tld in "[a-z]{2,6}",
        prefix in "[A-Za-z ]{0,30}"
    ) {
        let email = format!("{}@{}.{}", local, domain, tld);
        let payload = json!({
            "message": {"artifact": {"transcript": format!("{} you can email me at {} thanks", prefix, email)}}
        });
        let out = extract_lead(&payload, &ExtractOptions::default());
        prop_assert_eq!(find_email(&format!("reach {} today", email)), Some(email.clone()));
        prop_assert_eq!(out.lead.email, email);
    }
}

// Property: phone fallback requires at least ten digits
proptest! {
    #[test]
    fn short_digit_runs_are_not_phones(digits in "[0-9]{1,9}") {
        prop_assert_eq!(find_phone(&format!("my unit is {} on the left", digits)), None);
    }

    #[test]
    fn dashed_us_numbers_are_phones(
        area in 200u16..=999u16,
        exchange in 200u16..=999u16,
        line in 0u16..=9999u16
    ) {
        let phone = format!("{}-{}-{:04}", area, exchange, line);
        prop_assert_eq!(find_phone(&format!("call me at {} tonight", phone)), Some(phone));
    }

    #[test]
    fn trailing_numbers_are_not_absorbed(
        area in 200u16..=999u16,
        exchange in 200u16..=999u16,
        line in 0u16..=9999u16,
        sep in "[ .-]",
        count in 0u32..=99u32
    ) {
        let phone = format!("{area}{sep}{exchange}{sep}{line:04}");
        let text = format!("reach me at {}. {} bedrooms, or {}", phone, count, phone);
        prop_assert_eq!(find_phone(&text), Some(phone));
    }
}

// Property: the raw diagnostic re-parses to the same lead under the budget
proptest! {
    #[test]
    fn raw_round_trips_lead(
        name in "[A-Za-z ]{0,30}",
        phone in "[0-9+() -]{0,16}",
        market in "\\PC{0,20}",
        summary in "\\PC{0,60}"
    ) {
        let lead = Lead {
            name,
            phone,
            market,
            summary,
            ..Default::default()
        };
        let raw = compact_raw(&lead, 1000);
        let parsed: Lead = serde_json::from_str(&raw).unwrap();
        prop_assert_eq!(parsed, lead);
    }

    #[test]
    fn raw_never_exceeds_budget(summary in "\\PC{0,400}", budget in 1usize..200) {
        let lead = Lead { summary, ..Default::default() };
        prop_assert!(compact_raw(&lead, budget).chars().count() <= budget);
    }
}
