/// Any one of these marks the page as a challenge.
const DEFINITE_MARKERS: &[&str] = &[
    "attention required! | cloudflare",
    "/cdn-cgi/challenge-platform/",
    "class=\"g-recaptcha\"",
    "class=\"h-captcha\"",
    "cf-turnstile",
    "captcha-container",
    "verify you are human",
    "are you a robot",
    "request unsuccessful. incapsula",
];

/// "Just a moment..." is ordinary prose on its own; it only counts next to
/// one of these.
const INTERSTITIAL_COMPANIONS: &[&str] = &["please enable cookies", "cf-chl-"];

/// `true` when a response body is an anti-automation interstitial rather
/// than the requested page.
#[must_use]
pub fn looks_like_bot_challenge(body: &str) -> bool {
    let lowered = body.to_ascii_lowercase();
    if DEFINITE_MARKERS.iter().any(|m| lowered.contains(m)) {
        return true;
    }
    lowered.contains("just a moment...")
        && INTERSTITIAL_COMPANIONS.iter().any(|m| lowered.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_cloudflare_interstitial() {
        let body = "<html><title>Just a moment...</title><script src=\"/cdn-cgi/challenge-platform/h/b\"></script></html>";
        assert!(looks_like_bot_challenge(body));
    }

    #[test]
    fn detects_recaptcha_widget() {
        let body = r#"<form><div class="g-recaptcha" data-sitekey="abc"></div></form>"#;
        assert!(looks_like_bot_challenge(body));
    }

    #[test]
    fn detects_incapsula_block() {
        assert!(looks_like_bot_challenge(
            "<html><body>Request unsuccessful. Incapsula incident ID: 123</body></html>"
        ));
    }

    #[test]
    fn ordinary_register_page_is_not_a_challenge() {
        let body = "<html><table><tr><th>Premises name</th></tr></table></html>";
        assert!(!looks_like_bot_challenge(body));
    }

    #[test]
    fn just_a_moment_alone_is_not_enough() {
        assert!(!looks_like_bot_challenge(
            "<p>Just a moment... while we load your results</p>"
        ));
    }
}
