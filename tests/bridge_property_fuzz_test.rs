use page_bridge::{ConfigMessage, Embedding, Page, Result, SETTLE_DELAY_MS, install_form_guard};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::FileFailurePersistence;

const BRIDGE_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/bridge_property_fuzz_test.txt";
const DEFAULT_BRIDGE_PROPTEST_CASES: u32 = 128;

const AUTH_FORM_HTML: &str = r#"
<form id='login-form'>
  <input id='email' type='text'>
  <span id='email-error'></span>
  <input id='password' type='password'>
  <span id='password-error'></span>
</form>
"#;

const PREFERENCE_LABELS: &[&str] = &["Culture", "Food", "Nature", "Nightlife"];

fn bridge_proptest_cases() -> u32 {
    std::env::var("PAGE_BRIDGE_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_BRIDGE_PROPTEST_CASES)
}

fn email_segment_strategy(chars: &'static str, lengths: std::ops::RangeInclusive<usize>) -> BoxedStrategy<String> {
    let alphabet: Vec<char> = chars.chars().collect();
    vec(proptest::sample::select(alphabet), lengths)
        .prop_map(|chars| chars.into_iter().collect())
        .boxed()
}

/// Emails drawn from the accepted grammar: local part, `@`, dotted domain,
/// alphabetic top-level segment of length two or more.
fn valid_email_strategy() -> BoxedStrategy<String> {
    let local = email_segment_strategy("abcxyzABCXYZ0189._%+-", 1..=12);
    let domain = email_segment_strategy("abcxyz0189-", 1..=8);
    let tld = email_segment_strategy("abcdefghij", 2..=6);
    (local, domain, tld)
        .prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
        .boxed()
}

fn password_strategy() -> BoxedStrategy<String> {
    email_segment_strategy("abcxyz0189!?_", 1..=16)
}

fn preference_subset_strategy() -> BoxedStrategy<Vec<bool>> {
    vec(any::<bool>(), PREFERENCE_LABELS.len()).boxed()
}

fn planner_embed_html() -> String {
    let checkboxes: String = PREFERENCE_LABELS
        .iter()
        .enumerate()
        .map(|(idx, label)| format!("<label><input id='pref-{idx}' type='checkbox'> {label}</label>\n"))
        .collect();
    format!(
        "<input id='days-slider' type='range' min='1' max='30' value='1'>\n<div>{checkboxes}</div>"
    )
}

fn planner_embedding() -> Result<Embedding> {
    let host = Page::from_html("<div id='planner-frame'></div>")?;
    let mut embedded = Page::from_html(&planner_embed_html())?;
    page_bridge::EmbedBridge::install(&mut embedded);
    Ok(Embedding::new(host, embedded))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: bridge_proptest_cases(),
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct(
            BRIDGE_PROPTEST_REGRESSION_FILE,
        ))),
        .. ProptestConfig::default()
    })]

    /// Any email from the accepted grammar plus any non-empty password passes
    /// login validation: submission proceeds and no error slot is shown.
    #[test]
    fn valid_credentials_always_pass_login_validation(
        email in valid_email_strategy(),
        password in password_strategy(),
    ) {
        let mut page = Page::from_html(AUTH_FORM_HTML).unwrap();
        install_form_guard(&mut page).unwrap();
        page.type_text("#email", &email).unwrap();
        page.type_text("#password", &password).unwrap();

        prop_assert!(page.submit("#login-form").unwrap());
        prop_assert!(page.assert_display("#email-error", "none").is_ok());
        prop_assert!(page.assert_display("#password-error", "none").is_ok());
    }

    /// After an apply, the checked set equals exactly the chosen preference
    /// subset and the range control carries the day count, whatever the
    /// previous checkbox state was.
    #[test]
    fn applied_configuration_matches_the_message_exactly(
        days in 0i64..=30,
        chosen in preference_subset_strategy(),
        preset in preference_subset_strategy(),
    ) {
        let mut embedding = planner_embedding().unwrap();
        for (idx, checked) in preset.iter().enumerate() {
            if *checked {
                embedding
                    .embedded_mut()
                    .set_checked(&format!("#pref-{idx}"), true)
                    .unwrap();
            }
        }

        let preferences: Vec<&str> = PREFERENCE_LABELS
            .iter()
            .zip(&chosen)
            .filter(|(_, keep)| **keep)
            .map(|(label, _)| *label)
            .collect();
        embedding.post_config(&ConfigMessage::new(days, preferences));
        embedding.embedded_mut().advance_time(SETTLE_DELAY_MS).unwrap();

        let embedded = embedding.embedded();
        prop_assert!(embedded.assert_value("#days-slider", &days.to_string()).is_ok());
        for (idx, expected) in chosen.iter().enumerate() {
            let pref_selector = format!("#pref-{}", idx);
            prop_assert!(embedded.assert_checked(&pref_selector, *expected).is_ok());
        }
    }
}
