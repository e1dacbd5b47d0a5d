use super::*;

#[test]
fn login_accepts_valid_credentials() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#email", "traveler@example.com")?;
    page.type_text("#password", "hunter2")?;

    assert!(page.submit("#login-form")?);
    page.assert_display("#email-error", "none")?;
    page.assert_display("#password-error", "none")?;
    Ok(())
}

#[test]
fn login_requires_email() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#password", "hunter2")?;

    assert!(!page.submit("#login-form")?);
    page.assert_text("#email-error", MSG_EMAIL_REQUIRED)?;
    page.assert_display("#email-error", "block")?;
    page.assert_display("#password-error", "none")?;
    Ok(())
}

#[test]
fn login_rejects_malformed_email() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#email", "bad@")?;
    page.type_text("#password", "hunter2")?;

    assert!(!page.submit("#login-form")?);
    page.assert_text("#email-error", MSG_EMAIL_INVALID)?;
    page.assert_display("#email-error", "block")?;
    Ok(())
}

#[test]
fn login_reports_every_invalid_field_at_once() -> Result<()> {
    let mut page = auth_page()?;

    assert!(!page.submit("#login-form")?);
    page.assert_text("#email-error", MSG_EMAIL_REQUIRED)?;
    page.assert_display("#email-error", "block")?;
    page.assert_text("#password-error", MSG_PASSWORD_REQUIRED)?;
    page.assert_display("#password-error", "block")?;
    Ok(())
}

#[test]
fn login_requires_password() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#email", "traveler@example.com")?;

    assert!(!page.submit("#login-form")?);
    page.assert_display("#email-error", "none")?;
    page.assert_text("#password-error", MSG_PASSWORD_REQUIRED)?;
    Ok(())
}

#[test]
fn registration_accepts_matching_passwords() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#reg-email", "traveler@example.com")?;
    page.type_text("#reg-password", "abc123")?;
    page.type_text("#reg-confirm-password", "abc123")?;

    assert!(page.submit("#register-form")?);
    page.assert_display("#reg-email-error", "none")?;
    page.assert_display("#reg-password-error", "none")?;
    page.assert_display("#reg-confirm-password-error", "none")?;
    Ok(())
}

#[test]
fn registration_rejects_mismatched_confirmation() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#reg-email", "traveler@example.com")?;
    page.type_text("#reg-password", "abc123")?;
    page.type_text("#reg-confirm-password", "abc124")?;

    assert!(!page.submit("#register-form")?);
    page.assert_text("#reg-confirm-password-error", MSG_PASSWORD_MISMATCH)?;
    page.assert_display("#reg-confirm-password-error", "block")?;
    // The valid fields stay clean.
    page.assert_display("#reg-email-error", "none")?;
    page.assert_display("#reg-password-error", "none")?;
    Ok(())
}

#[test]
fn registration_requires_confirmation() -> Result<()> {
    let mut page = auth_page()?;
    page.type_text("#reg-email", "traveler@example.com")?;
    page.type_text("#reg-password", "abc123")?;

    assert!(!page.submit("#register-form")?);
    page.assert_text("#reg-confirm-password-error", MSG_CONFIRM_REQUIRED)?;
    Ok(())
}

#[test]
fn editing_an_input_hides_its_own_error_slot() -> Result<()> {
    let mut page = auth_page()?;
    assert!(!page.submit("#login-form")?);
    page.assert_display("#email-error", "block")?;
    page.assert_display("#password-error", "block")?;

    // Still invalid, but the edit alone hides the slot.
    page.type_text("#email", "still-bad")?;
    page.assert_display("#email-error", "none")?;
    // Other slots are untouched.
    page.assert_display("#password-error", "block")?;
    Ok(())
}

#[test]
fn hiding_an_error_keeps_its_text() -> Result<()> {
    let mut page = auth_page()?;
    assert!(!page.submit("#login-form")?);
    page.type_text("#email", "x")?;

    page.assert_display("#email-error", "none")?;
    page.assert_text("#email-error", MSG_EMAIL_REQUIRED)?;
    Ok(())
}

#[test]
fn resubmitting_with_valid_values_clears_errors() -> Result<()> {
    let mut page = auth_page()?;
    assert!(!page.submit("#login-form")?);
    page.assert_display("#email-error", "block")?;

    page.type_text("#email", "traveler@example.com")?;
    page.type_text("#password", "hunter2")?;
    assert!(page.submit("#login-form")?);
    page.assert_display("#email-error", "none")?;
    page.assert_display("#password-error", "none")?;
    Ok(())
}

#[test]
fn email_pattern_accepts_and_rejects_expected_shapes() {
    assert!(is_valid_email("a@b.co"));
    assert!(is_valid_email("first.last+tag@sub.domain.example"));
    assert!(is_valid_email("USER_1%x@host-name.org"));

    assert!(!is_valid_email(""));
    assert!(!is_valid_email("bad@"));
    assert!(!is_valid_email("@host.com"));
    assert!(!is_valid_email("user@host"));
    assert!(!is_valid_email("user@host.c"));
    assert!(!is_valid_email("user host@example.com"));
}

#[test]
fn validate_login_works_against_a_bare_dom() -> Result<()> {
    // The validators are pure functions over an injected document.
    let mut page = Page::from_html(AUTH_PAGE_HTML)?;
    let form = page.select_one("#login-form")?;
    let email = page.select_one("#email")?;
    page.dom_mut().set_value(email, "traveler@example.com");

    let mut event = EventState::new("submit", form);
    validate_login(page.dom_mut(), &mut event);

    assert!(event.default_prevented());
    page.assert_text("#password-error", MSG_PASSWORD_REQUIRED)?;
    Ok(())
}

#[test]
fn install_skips_absent_forms() -> Result<()> {
    let mut page = Page::from_html(
        r#"
        <form id='login-form'>
          <input id='email' type='text'>
          <span id='email-error'></span>
          <input id='password' type='password'>
          <span id='password-error'></span>
        </form>
        "#,
    )?;
    install_form_guard(&mut page)?;

    assert!(!page.submit("#login-form")?);
    page.assert_display("#email-error", "block")?;
    Ok(())
}

#[test]
fn install_tags_forms_with_entrance_animation() -> Result<()> {
    let page = auth_page()?;
    assert!(page.has_class("#login-form", "fade-in")?);
    assert!(page.has_class("#register-form", "fade-in")?);
    Ok(())
}

#[test]
fn switch_tab_moves_active_class() -> Result<()> {
    let mut page = auth_page()?;
    assert!(page.has_class("#login-tab", "active")?);

    switch_tab(page.dom_mut(), "register")?;
    assert!(!page.has_class("#login-tab", "active")?);
    assert!(page.has_class("#register-tab", "active")?);
    assert!(!page.has_class("#login-link", "active")?);
    assert!(page.has_class("#register-link", "active")?);

    switch_tab(page.dom_mut(), "login")?;
    assert!(page.has_class("#login-tab", "active")?);
    assert!(page.has_class("#login-link", "active")?);
    Ok(())
}
