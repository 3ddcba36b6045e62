//! Confirmation page presentation.
//!
//! [`Presentation`] is the state → UI mapping; [`render_page`] turns it into a
//! self-contained HTML document. The only script on the page drives the app
//! handoff (navigate to the deep link, then show the fallback notice if the
//! page is still visible after the delay).

use crate::tplatform::{
    confirmation::{ConfirmationResult, ConfirmationState},
    handoff::{CompanionApp, HandoffPlan},
};
use serde::Serialize;
use std::fmt::Write;
use utoipa::ToSchema;

pub const RETRY_PATH: &str = "/confirm/retry";
pub const CONFIRM_PATH: &str = "/confirm";
pub const OPEN_APP_PATH: &str = "/open-app";
pub const CONTACT_PATH: &str = "/contact";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryAction {
    OpenCompanionApp,
    Retry,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct Presentation {
    pub title: String,
    pub subtitle: String,
    pub spinner: bool,
    pub primary_action: Option<PrimaryAction>,
    pub action_label: Option<String>,
    pub secondary_text: Option<String>,
}

impl Presentation {
    #[must_use]
    pub fn for_result(result: &ConfirmationResult, app: &CompanionApp) -> Self {
        match result.state {
            ConfirmationState::Loading => Self {
                title: "Confirming Your Email...".to_string(),
                subtitle: "Please wait while we verify your email address".to_string(),
                spinner: true,
                primary_action: None,
                action_label: None,
                secondary_text: Some("Verifying...".to_string()),
            },
            ConfirmationState::Success => Self {
                title: "Email Confirmed Successfully!".to_string(),
                subtitle: format!("Your {} account is now verified and ready to use", app.name()),
                spinner: false,
                primary_action: Some(PrimaryAction::OpenCompanionApp),
                action_label: Some(format!("Open {} App", app.name())),
                secondary_text: result.display_email().map(str::to_string),
            },
            ConfirmationState::Error => Self {
                title: "Confirmation Failed".to_string(),
                subtitle: "We encountered an issue confirming your email".to_string(),
                spinner: false,
                primary_action: Some(PrimaryAction::Retry),
                action_label: Some("Try Again".to_string()),
                secondary_text: None,
            },
            ConfirmationState::Expired => Self {
                title: "Link Expired".to_string(),
                subtitle: "This confirmation link has expired".to_string(),
                spinner: false,
                primary_action: Some(PrimaryAction::Retry),
                action_label: Some("Try Again".to_string()),
                secondary_text: Some(
                    "Please request a new confirmation email from the app".to_string(),
                ),
            },
        }
    }
}

/// Render the full confirmation page.
///
/// `query` is the page's original query string, reused by the retry link.
/// `refresh_to` adds an immediate refresh, used by the retry page to reload
/// the confirmation after showing `loading`.
#[must_use]
pub fn render_page(
    result: &ConfirmationResult,
    app: &CompanionApp,
    query: &str,
    refresh_to: Option<&str>,
) -> String {
    let presentation = Presentation::for_result(result, app);
    let mut html = String::with_capacity(4096);

    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title} | {app}</title>\n",
        title = escape(&presentation.title),
        app = escape(app.name()),
    );

    if let Some(target) = refresh_to {
        let _ = writeln!(
            html,
            "<meta http-equiv=\"refresh\" content=\"0;url={}\">",
            escape(target)
        );
    }

    let _ = write!(
        html,
        "</head>\n<body>\n<main class=\"card state-{state}\" data-state=\"{state}\">\n\
         <h1>{title}</h1>\n<p class=\"subtitle\">{subtitle}</p>\n",
        state = result.state.as_str(),
        title = escape(&presentation.title),
        subtitle = escape(&presentation.subtitle),
    );

    if presentation.spinner {
        html.push_str("<div class=\"spinner\" role=\"status\" aria-busy=\"true\"></div>\n");
    }

    if !result.message.is_empty() {
        let _ = writeln!(html, "<div class=\"message\">{}</div>", escape(&result.message));
    }

    if let Some(text) = &presentation.secondary_text {
        let class = match result.state {
            ConfirmationState::Success => "email",
            _ => "note",
        };
        let _ = writeln!(html, "<p class=\"{class}\">{}</p>", escape(text));
    }

    match presentation.primary_action {
        Some(PrimaryAction::OpenCompanionApp) => {
            render_handoff(&mut html, &app.handoff(), presentation.action_label.as_deref());
        }
        Some(PrimaryAction::Retry) => {
            let href = if query.is_empty() {
                RETRY_PATH.to_string()
            } else {
                format!("{RETRY_PATH}?{query}")
            };
            let _ = writeln!(
                html,
                "<a class=\"btn-secondary\" href=\"{}\">{}</a>",
                escape(&href),
                escape(presentation.action_label.as_deref().unwrap_or_default()),
            );
        }
        None => {}
    }

    let _ = write!(
        html,
        "<footer>\n<p>Need help? Contact our support team</p>\n\
         <a href=\"{CONTACT_PATH}\">Get Support</a>\n</footer>\n</main>\n</body>\n</html>\n"
    );

    html
}

fn render_handoff(html: &mut String, plan: &HandoffPlan, label: Option<&str>) {
    let _ = write!(
        html,
        "<button id=\"open-app\" class=\"btn-primary\" data-deep-link=\"{link}\">{label}</button>\n\
         <p class=\"hint\">App will open automatically, or you can open it manually</p>\n\
         <p id=\"handoff-fallback\" class=\"note\" hidden>{notice}</p>\n\
         <noscript><a href=\"{OPEN_APP_PATH}\">{label}</a></noscript>\n",
        link = escape(&plan.deep_link),
        label = escape(label.unwrap_or_default()),
        notice = escape(&plan.fallback_notice),
    );

    let _ = writeln!(
        html,
        "<script>\n\
         document.getElementById('open-app').addEventListener('click', function () {{\n\
         \x20 window.location.href = this.dataset.deepLink;\n\
         \x20 setTimeout(function () {{\n\
         \x20   if (document.visibilityState === 'visible') {{\n\
         \x20     document.getElementById('handoff-fallback').hidden = false;\n\
         \x20   }}\n\
         \x20 }}, {delay});\n\
         }});\n\
         </script>",
        delay = plan.fallback_after_ms,
    );
}

/// Escape text for HTML element content and double-quoted attributes.
#[must_use]
pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
